//! Flow classification
//!
//! Pure predicates over a configuration, used only to select a renewal
//! strategy. Classification never mutates state.

use crate::config::Configuration;

const CODE_RESPONSE_TYPE: &str = "code";

/// Whether the configuration uses the authorization code flow
pub fn is_code_flow(config: &Configuration) -> bool {
    config.response_type == CODE_RESPONSE_TYPE
}

/// Whether the configuration uses the authorization code flow with refresh
/// tokens
///
/// Configurations classified this way are renewed through the refresh-token
/// exchange; all others fall back to iframe-based silent renewal.
pub fn is_code_flow_with_refresh_tokens(config: &Configuration) -> bool {
    is_code_flow(config) && config.use_refresh_token
}
