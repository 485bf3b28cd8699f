//! Renewal eligibility
//!
//! The gate evaluated for every configuration on every tick, against a
//! fresh [`SessionSnapshot`]. Skipping is silent: an ineligible
//! configuration causes no events and no state changes.

use crate::state::SessionSnapshot;

/// Decides whether a renewal attempt should be started this tick
///
/// The checks short-circuit in order: there must be a non-empty id token,
/// no renewal attempt may already be running, no interactive code exchange
/// may be in flight, user data must be present, and at least one token must
/// have expired.
pub fn should_start_renewal(snapshot: &SessionSnapshot) -> bool {
    if !snapshot.has_id_token {
        tracing::trace!("no id token in store, nothing to renew");
        return false;
    }

    if snapshot.silent_renew_running {
        tracing::trace!("silent renew already running, not starting another attempt");
        return false;
    }

    if snapshot.code_flow_in_progress {
        tracing::trace!("code flow in progress, renewal deferred");
        return false;
    }

    if !snapshot.has_user_data {
        tracing::trace!("no user data in store, nothing to renew");
        return false;
    }

    snapshot.id_token_expired_and_renew_check_enabled
        || snapshot.access_token_expired_if_expiry_exists
}
