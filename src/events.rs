//! Public session events

use crate::{ConfigId, ConfigIdRef};
use std::error;
use std::sync::Arc;
use tokio::sync::broadcast;

/// An event emitted while the periodic token check runs
///
/// For any one configuration, `SilentRenewStarted` is emitted strictly
/// before the renewer is invoked, and exactly one terminal outcome follows
/// each start — either the session update on success or a
/// `SilentRenewFailed`.
#[derive(Clone, Debug)]
pub enum SessionEvent {
    /// A silent renewal attempt has started
    SilentRenewStarted {
        /// The configuration the attempt belongs to
        config_id: ConfigId,
    },
    /// A silent renewal attempt failed
    SilentRenewFailed {
        /// The configuration the attempt belonged to
        config_id: ConfigId,
        /// The error reported by the renewer
        error: Arc<dyn error::Error + Send + Sync + 'static>,
    },
}

impl SessionEvent {
    /// The configuration the event concerns
    pub fn config_id(&self) -> &ConfigIdRef {
        match self {
            Self::SilentRenewStarted { config_id }
            | Self::SilentRenewFailed { config_id, .. } => config_id,
        }
    }
}

/// An ordered sink for session events
pub trait EventSink: Send + Sync {
    /// Emits a single event
    fn raise(&self, event: SessionEvent);
}

/// An event sink fanning events out over a broadcast channel
///
/// Emission never blocks; events raised while no subscriber is listening
/// are dropped.
#[derive(Debug)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<SessionEvent>,
}

impl EventBroadcaster {
    /// Constructs a broadcaster buffering up to `capacity` events per
    /// subscriber
    ///
    /// `capacity` must be greater than zero.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Registers a new subscriber
    ///
    /// Only events raised after subscription are observed.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.tx.subscribe()
    }
}

impl EventSink for EventBroadcaster {
    fn raise(&self, event: SessionEvent) {
        // send only fails when no subscriber exists, which is fine
        let _ = self.tx.send(event);
    }
}
