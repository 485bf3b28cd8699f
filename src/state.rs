//! Per-configuration session state

use crate::config::Configuration;
use crate::{ConfigId, ConfigIdRef, IdToken};
use aliri_clock::{Clock, DurationSecs, System, UnixTime};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Access to the session state backing a configuration
///
/// The renewal-in-progress flag is the only field this library writes; it is
/// set immediately before a renewal attempt is started and cleared only at
/// the attempt's terminal outcome. Implementations must serialize writers
/// for any one configuration.
pub trait SessionStateStore: Send + Sync {
    /// The current id token, if any
    fn id_token(&self, config_id: &ConfigIdRef) -> Option<IdToken>;

    /// Whether a renewal attempt is currently in flight
    fn is_silent_renew_running(&self, config_id: &ConfigIdRef) -> bool;

    /// Marks or clears the renewal-in-progress flag
    fn set_silent_renew_running(&self, config_id: &ConfigIdRef, running: bool);

    /// Whether an interactive authorization-code exchange is in flight
    fn is_code_flow_in_progress(&self, config_id: &ConfigIdRef) -> bool;

    /// The authenticated user's data, if present
    fn user_data(&self, config_id: &ConfigIdRef) -> Option<serde_json::Value>;

    /// Whether the id token has expired and renewal on id-token expiry is
    /// enabled for this configuration
    fn has_id_token_expired_and_renew_check_enabled(&self, config: &Configuration) -> bool;

    /// Whether the access token has expired, for configurations that record
    /// an access token expiry
    fn has_access_token_expired_if_expiry_exists(&self, config: &Configuration) -> bool;
}

/// The eligibility-guard inputs for one configuration, captured at a single
/// tick
#[derive(Clone, Copy, Debug, Default)]
pub struct SessionSnapshot {
    /// A non-empty id token is present
    pub has_id_token: bool,

    /// A renewal attempt is already in flight
    pub silent_renew_running: bool,

    /// An interactive authorization-code exchange is in flight
    pub code_flow_in_progress: bool,

    /// User data is present in the store
    pub has_user_data: bool,

    /// The id token has expired and the id-token expiry trigger is enabled
    pub id_token_expired_and_renew_check_enabled: bool,

    /// The access token has expired, where an expiry is recorded
    pub access_token_expired_if_expiry_exists: bool,
}

impl SessionSnapshot {
    /// Captures the guard inputs for `config` from `store`
    pub fn capture(store: &dyn SessionStateStore, config: &Configuration) -> Self {
        let config_id: &ConfigIdRef = &config.config_id;
        Self {
            has_id_token: store
                .id_token(config_id)
                .is_some_and(|token| !token.as_str().is_empty()),
            silent_renew_running: store.is_silent_renew_running(config_id),
            code_flow_in_progress: store.is_code_flow_in_progress(config_id),
            has_user_data: store.user_data(config_id).is_some(),
            id_token_expired_and_renew_check_enabled: store
                .has_id_token_expired_and_renew_check_enabled(config),
            access_token_expired_if_expiry_exists: store
                .has_access_token_expired_if_expiry_exists(config),
        }
    }
}

#[derive(Debug, Default)]
struct SessionEntry {
    id_token: Option<IdToken>,
    user_data: Option<serde_json::Value>,
    silent_renew_running: bool,
    code_flow_in_progress: bool,
    id_token_expiry: Option<UnixTime>,
    access_token_expiry: Option<UnixTime>,
}

/// A key-addressed in-memory session store
///
/// Writes for any one configuration are serialized by the store's lock.
/// Token expiry checks compare recorded expiries against the store's clock,
/// offset by the configuration's
/// [`renew_time_before_token_expires_in_seconds`][Configuration::renew_time_before_token_expires_in_seconds].
#[derive(Debug, Default)]
pub struct InMemorySessionStore<C = System> {
    entries: RwLock<HashMap<ConfigId, SessionEntry>>,
    clock: C,
}

impl InMemorySessionStore {
    /// Constructs an empty store using the system clock
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C> InMemorySessionStore<C> {
    /// Sets a custom clock to be used
    ///
    /// Useful for testing purposes
    pub fn with_clock<D>(self, clock: D) -> InMemorySessionStore<D> {
        InMemorySessionStore {
            entries: self.entries,
            clock,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<ConfigId, SessionEntry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<ConfigId, SessionEntry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn update(&self, config_id: &ConfigIdRef, apply: impl FnOnce(&mut SessionEntry)) {
        let mut entries = self.write();
        apply(entries.entry(config_id.to_owned()).or_default());
    }

    /// Stores or clears the id token for a configuration
    pub fn set_id_token(&self, config_id: &ConfigIdRef, id_token: Option<IdToken>) {
        self.update(config_id, |entry| entry.id_token = id_token);
    }

    /// Stores or clears the authenticated user's data
    pub fn set_user_data(&self, config_id: &ConfigIdRef, user_data: Option<serde_json::Value>) {
        self.update(config_id, |entry| entry.user_data = user_data);
    }

    /// Marks or clears an in-flight interactive code exchange
    pub fn set_code_flow_in_progress(&self, config_id: &ConfigIdRef, in_progress: bool) {
        self.update(config_id, |entry| entry.code_flow_in_progress = in_progress);
    }

    /// Records when the id token expires
    pub fn set_id_token_expiry(&self, config_id: &ConfigIdRef, expiry: Option<UnixTime>) {
        self.update(config_id, |entry| entry.id_token_expiry = expiry);
    }

    /// Records when the access token expires
    pub fn set_access_token_expiry(&self, config_id: &ConfigIdRef, expiry: Option<UnixTime>) {
        self.update(config_id, |entry| entry.access_token_expiry = expiry);
    }

    /// Removes all session state held for a configuration
    pub fn clear(&self, config_id: &ConfigIdRef) {
        self.write().remove(config_id);
    }
}

impl<C: Clock> InMemorySessionStore<C> {
    fn expired(&self, expiry: Option<UnixTime>, config: &Configuration) -> bool {
        let Some(expiry) = expiry else {
            return false;
        };
        let head_start = DurationSecs(config.renew_time_before_token_expires_in_seconds);
        self.clock.now() + head_start >= expiry
    }
}

impl<C: Clock + Send + Sync> SessionStateStore for InMemorySessionStore<C> {
    fn id_token(&self, config_id: &ConfigIdRef) -> Option<IdToken> {
        self.read()
            .get(config_id)
            .and_then(|entry| entry.id_token.clone())
    }

    fn is_silent_renew_running(&self, config_id: &ConfigIdRef) -> bool {
        self.read()
            .get(config_id)
            .is_some_and(|entry| entry.silent_renew_running)
    }

    fn set_silent_renew_running(&self, config_id: &ConfigIdRef, running: bool) {
        tracing::trace!(config_id = %config_id, running, "updating silent renew running flag");
        self.update(config_id, |entry| entry.silent_renew_running = running);
    }

    fn is_code_flow_in_progress(&self, config_id: &ConfigIdRef) -> bool {
        self.read()
            .get(config_id)
            .is_some_and(|entry| entry.code_flow_in_progress)
    }

    fn user_data(&self, config_id: &ConfigIdRef) -> Option<serde_json::Value> {
        self.read()
            .get(config_id)
            .and_then(|entry| entry.user_data.clone())
    }

    fn has_id_token_expired_and_renew_check_enabled(&self, config: &Configuration) -> bool {
        if !config.trigger_refresh_when_id_token_expired {
            return false;
        }
        let config_id: &ConfigIdRef = &config.config_id;
        let expiry = self
            .read()
            .get(config_id)
            .and_then(|entry| entry.id_token_expiry);
        self.expired(expiry, config)
    }

    fn has_access_token_expired_if_expiry_exists(&self, config: &Configuration) -> bool {
        let config_id: &ConfigIdRef = &config.config_id;
        let expiry = self
            .read()
            .get(config_id)
            .and_then(|entry| entry.access_token_expiry);
        self.expired(expiry, config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aliri_clock::TestClock;

    const NOW: UnixTime = UnixTime(1_600_000_000);

    fn store() -> InMemorySessionStore<TestClock> {
        InMemorySessionStore::new().with_clock(TestClock::new(NOW))
    }

    #[test]
    fn absent_expiry_is_not_expired() {
        let store = store();
        let config = Configuration::new("configId1");

        assert!(!store.has_access_token_expired_if_expiry_exists(&config));
        assert!(!store.has_id_token_expired_and_renew_check_enabled(&config));
    }

    #[test]
    fn past_expiry_is_expired() {
        let store = store();
        let config = Configuration::new("configId1");
        store.set_access_token_expiry(&config.config_id, Some(UnixTime(NOW.0 - 1)));

        assert!(store.has_access_token_expired_if_expiry_exists(&config));
    }

    #[test]
    fn future_expiry_is_not_expired_without_head_start() {
        let store = store();
        let config = Configuration::new("configId1");
        store.set_access_token_expiry(&config.config_id, Some(UnixTime(NOW.0 + 60)));

        assert!(!store.has_access_token_expired_if_expiry_exists(&config));
    }

    #[test]
    fn head_start_moves_the_expiry_threshold() {
        let store = store();
        let mut config = Configuration::new("configId1");
        config.renew_time_before_token_expires_in_seconds = 120;
        store.set_access_token_expiry(&config.config_id, Some(UnixTime(NOW.0 + 60)));

        assert!(store.has_access_token_expired_if_expiry_exists(&config));
    }

    #[test]
    fn disabled_id_token_trigger_short_circuits() {
        let store = store();
        let mut config = Configuration::new("configId1");
        config.trigger_refresh_when_id_token_expired = false;
        store.set_id_token_expiry(&config.config_id, Some(UnixTime(NOW.0 - 1)));

        assert!(!store.has_id_token_expired_and_renew_check_enabled(&config));
    }

    #[test]
    fn expired_id_token_triggers_when_enabled() {
        let store = store();
        let config = Configuration::new("configId1");
        store.set_id_token_expiry(&config.config_id, Some(UnixTime(NOW.0 - 1)));

        assert!(store.has_id_token_expired_and_renew_check_enabled(&config));
    }

    #[test]
    fn clear_removes_the_whole_session() {
        let store = store();
        let config_id = ConfigId::from("configId1");
        store.set_id_token(&config_id, Some(IdToken::from_static("idToken")));
        store.set_silent_renew_running(&config_id, true);

        store.clear(&config_id);

        assert!(store.id_token(&config_id).is_none());
        assert!(!store.is_silent_renew_running(&config_id));
    }

    #[test]
    fn silent_renew_running_round_trips() {
        let store = store();
        let config_id = ConfigId::from("configId1");

        assert!(!store.is_silent_renew_running(&config_id));
        store.set_silent_renew_running(&config_id, true);
        assert!(store.is_silent_renew_running(&config_id));
        store.set_silent_renew_running(&config_id, false);
        assert!(!store.is_silent_renew_running(&config_id));
    }

    #[test]
    fn snapshot_reflects_store_contents() {
        let store = store();
        let config = Configuration::new("configId1");
        store.set_id_token(&config.config_id, Some(IdToken::from_static("idToken")));
        store.set_user_data(&config.config_id, Some(serde_json::json!("some-userdata")));
        store.set_access_token_expiry(&config.config_id, Some(UnixTime(NOW.0 - 1)));

        let snapshot = SessionSnapshot::capture(&store, &config);

        assert!(snapshot.has_id_token);
        assert!(!snapshot.silent_renew_running);
        assert!(!snapshot.code_flow_in_progress);
        assert!(snapshot.has_user_data);
        assert!(!snapshot.id_token_expired_and_renew_check_enabled);
        assert!(snapshot.access_token_expired_if_expiry_exists);
    }

    #[test]
    fn snapshot_observes_an_in_flight_code_exchange() {
        let store = store();
        let config = Configuration::new("configId1");
        store.set_code_flow_in_progress(&config.config_id, true);

        let snapshot = SessionSnapshot::capture(&store, &config);
        assert!(snapshot.code_flow_in_progress);
    }

    #[test]
    fn empty_id_token_does_not_count_as_present() {
        let store = store();
        let config = Configuration::new("configId1");
        store.set_id_token(&config.config_id, Some(IdToken::from_static("")));

        let snapshot = SessionSnapshot::capture(&store, &config);
        assert!(!snapshot.has_id_token);
    }
}
