//! Session reset coordination

use crate::config::Configuration;
use crate::state::{InMemorySessionStore, SessionStateStore};
use crate::ConfigIdRef;
use aliri_clock::Clock;
use std::sync::Arc;

/// Clears authentication state in response to scheduler decisions
pub trait SessionResetCoordinator: Send + Sync {
    /// Fully resets the configuration's authorization data
    ///
    /// Applied when tokens are stale but silent renewal is disabled for the
    /// configuration; the session is treated as terminally logged out
    /// rather than left stale.
    fn reset_authorization_data(&self, config: &Configuration, all_configs: &[Configuration]);

    /// Clears only the renewal-in-progress flag
    ///
    /// The rest of the session is preserved so a future tick can retry.
    fn reset_silent_renew_running(&self, config: &Configuration);
}

/// A coordinator operating on an [`InMemorySessionStore`]
#[derive(Debug)]
pub struct StoreResetCoordinator<C = aliri_clock::System> {
    store: Arc<InMemorySessionStore<C>>,
}

impl<C> StoreResetCoordinator<C> {
    /// Constructs a coordinator resetting state in `store`
    pub fn new(store: Arc<InMemorySessionStore<C>>) -> Self {
        Self { store }
    }
}

impl<C: Clock + Send + Sync> SessionResetCoordinator for StoreResetCoordinator<C> {
    fn reset_authorization_data(&self, config: &Configuration, all_configs: &[Configuration]) {
        let config_id: &ConfigIdRef = &config.config_id;
        self.store.clear(config_id);
        tracing::debug!(
            config_id = %config_id,
            configured = all_configs.len(),
            "authorization data reset"
        );
    }

    fn reset_silent_renew_running(&self, config: &Configuration) {
        self.store.set_silent_renew_running(&config.config_id, false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::IdToken;

    #[test]
    fn full_reset_clears_the_session() {
        let store = Arc::new(InMemorySessionStore::new());
        let coordinator = StoreResetCoordinator::new(Arc::clone(&store));
        let config = Configuration::new("configId1");
        store.set_id_token(&config.config_id, Some(IdToken::from_static("idToken")));

        coordinator.reset_authorization_data(&config, std::slice::from_ref(&config));

        assert!(store.id_token(&config.config_id).is_none());
    }

    #[test]
    fn partial_reset_only_clears_the_running_flag() {
        let store = Arc::new(InMemorySessionStore::new());
        let coordinator = StoreResetCoordinator::new(Arc::clone(&store));
        let config = Configuration::new("configId1");
        store.set_id_token(&config.config_id, Some(IdToken::from_static("idToken")));
        store.set_silent_renew_running(&config.config_id, true);

        coordinator.reset_silent_renew_running(&config);

        assert!(!store.is_silent_renew_running(&config.config_id));
        assert!(store.id_token(&config.config_id).is_some());
    }
}
