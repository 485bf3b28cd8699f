//! Client configurations and how the scheduler obtains them

use crate::{ClientId, ConfigId, ConfigIdRef};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

fn default_response_type() -> String {
    "code".to_owned()
}

fn default_token_refresh_in_seconds() -> u64 {
    30
}

fn default_trigger_refresh_when_id_token_expired() -> bool {
    true
}

/// The authentication settings of a single client configuration
///
/// A configuration is immutable for the lifetime of a session. Multiple
/// configurations may be registered with the scheduler at once; each is
/// evaluated independently on every tick.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// The unique identifier of this configuration
    pub config_id: ConfigId,

    /// Whether background silent renewal is enabled
    ///
    /// When disabled and the eligibility guard still detects stale tokens,
    /// the configuration's session is fully reset instead of renewed.
    #[serde(default)]
    pub silent_renew: bool,

    /// The period, in seconds, of the recurring token check
    #[serde(default = "default_token_refresh_in_seconds")]
    pub token_refresh_in_seconds: u64,

    /// The OAuth2 response type the client was configured with
    #[serde(default = "default_response_type")]
    pub response_type: String,

    /// Whether the authorization code flow uses refresh tokens
    #[serde(default)]
    pub use_refresh_token: bool,

    /// Whether an expired id token should trigger a renewal attempt
    #[serde(default = "default_trigger_refresh_when_id_token_expired")]
    pub trigger_refresh_when_id_token_expired: bool,

    /// Head start, in seconds, applied before a token's recorded expiry
    /// when deciding whether it counts as expired
    #[serde(default)]
    pub renew_time_before_token_expires_in_seconds: u64,

    /// The authority's token endpoint, used by the refresh-token renewer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_endpoint: Option<String>,

    /// The client ID presented to the authority
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,

    /// The scope requested on renewal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Configuration {
    /// Constructs a configuration with default settings for the given id
    pub fn new(config_id: impl Into<ConfigId>) -> Self {
        Self {
            config_id: config_id.into(),
            silent_renew: false,
            token_refresh_in_seconds: default_token_refresh_in_seconds(),
            response_type: default_response_type(),
            use_refresh_token: false,
            trigger_refresh_when_id_token_expired:
                default_trigger_refresh_when_id_token_expired(),
            renew_time_before_token_expires_in_seconds: 0,
            token_endpoint: None,
            client_id: None,
            scope: None,
        }
    }
}

/// Supplies the current value of a configuration
///
/// Configurations may be refreshed externally between ticks, so the
/// scheduler never caches them: the provider is asked again for every
/// configuration on every tick.
#[async_trait]
pub trait ConfigurationProvider: Send + Sync {
    /// Fetches the most recent value of the configuration, or `None` if the
    /// configuration is not (or no longer) known
    async fn get_current_config(&self, config_id: &ConfigIdRef) -> Option<Configuration>;
}

/// A provider serving configurations from an in-memory table
///
/// The table can be updated at any time; readers always observe the most
/// recently stored value.
#[derive(Debug, Default)]
pub struct StaticConfigurationProvider {
    configs: RwLock<HashMap<ConfigId, Configuration>>,
}

impl StaticConfigurationProvider {
    /// Constructs a provider preloaded with the given configurations
    pub fn new(configs: impl IntoIterator<Item = Configuration>) -> Self {
        Self {
            configs: RwLock::new(
                configs
                    .into_iter()
                    .map(|c| (c.config_id.clone(), c))
                    .collect(),
            ),
        }
    }

    /// Stores or replaces a configuration
    pub fn upsert(&self, config: Configuration) {
        let mut configs = self
            .configs
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        configs.insert(config.config_id.clone(), config);
    }
}

#[async_trait]
impl ConfigurationProvider for StaticConfigurationProvider {
    async fn get_current_config(&self, config_id: &ConfigIdRef) -> Option<Configuration> {
        let configs = self.configs.read().unwrap_or_else(PoisonError::into_inner);
        configs.get(config_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let config: Configuration =
            serde_json::from_str(r#"{ "configId": "configId1" }"#).unwrap();

        assert_eq!(config.config_id.as_str(), "configId1");
        assert!(!config.silent_renew);
        assert_eq!(config.token_refresh_in_seconds, 30);
        assert_eq!(config.response_type, "code");
        assert!(!config.use_refresh_token);
        assert!(config.trigger_refresh_when_id_token_expired);
        assert_eq!(config.renew_time_before_token_expires_in_seconds, 0);
    }

    #[tokio::test]
    async fn provider_returns_latest_value() {
        let provider = StaticConfigurationProvider::new([Configuration::new("configId1")]);

        let mut refreshed = Configuration::new("configId1");
        refreshed.silent_renew = true;
        provider.upsert(refreshed);

        let config_id = ConfigId::from("configId1");
        let current = provider.get_current_config(&config_id).await.unwrap();
        assert!(current.silent_renew);
    }

    #[tokio::test]
    async fn provider_returns_none_for_unknown_configuration() {
        let provider = StaticConfigurationProvider::default();

        let config_id = ConfigId::from("missing");
        assert!(provider.get_current_config(&config_id).await.is_none());
    }
}
