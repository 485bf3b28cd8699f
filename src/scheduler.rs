use std::error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::config::{Configuration, ConfigurationProvider};
use crate::events::{EventSink, SessionEvent};
use crate::interval::IntervalMultiplexer;
use crate::renew::SessionRenewer;
use crate::reset::SessionResetCoordinator;
use crate::state::{SessionSnapshot, SessionStateStore};
use crate::{flow, guard, ConfigId, ConfigIdRef};

/// A silent renewal failure surfaced on the scheduler's fault channel
///
/// Faults are observable through
/// [`fault_watcher`][SilentRenewScheduler::fault_watcher]; they never stop
/// the recurring check.
#[derive(Clone, Debug)]
pub struct RenewalFault {
    config_id: ConfigId,
    error: Arc<dyn error::Error + Send + Sync + 'static>,
}

impl RenewalFault {
    /// The configuration whose renewal attempt failed
    pub fn config_id(&self) -> &ConfigIdRef {
        &self.config_id
    }

    /// The error reported by the renewer
    pub fn error(&self) -> &(dyn error::Error + Send + Sync + 'static) {
        &*self.error
    }
}

impl fmt::Display for RenewalFault {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "silent renewal failed for configuration `{}`: {}",
            self.config_id, self.error
        )
    }
}

impl error::Error for RenewalFault {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(self.error.as_ref() as &(dyn error::Error + 'static))
    }
}

struct Inner {
    configs: Arc<dyn ConfigurationProvider>,
    session: Arc<dyn SessionStateStore>,
    reset: Arc<dyn SessionResetCoordinator>,
    events: Arc<dyn EventSink>,
    refresh_renewer: Arc<dyn SessionRenewer>,
    iframe_renewer: Arc<dyn SessionRenewer>,
    interval: IntervalMultiplexer,
    faults: watch::Sender<Option<RenewalFault>>,
}

/// The periodic token check orchestrator
///
/// A single recurring timer drives evaluation of every registered
/// configuration. On each tick, a configuration is re-fetched from its
/// provider, gated through the eligibility guard, and — when eligible —
/// renewed with the strategy matching its flow: the refresh-token exchange
/// for code flows using refresh tokens, iframe-based silent renewal for
/// everything else. A configuration whose renewal is needed but disabled is
/// fully reset instead.
///
/// Configurations are processed independently: no configuration's failure
/// or reset affects its siblings, and a failed attempt never terminates the
/// recurring check.
#[derive(Clone)]
pub struct SilentRenewScheduler {
    inner: Arc<Inner>,
}

impl fmt::Debug for SilentRenewScheduler {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SilentRenewScheduler")
            .field("running", &self.inner.interval.is_running())
            .finish_non_exhaustive()
    }
}

impl SilentRenewScheduler {
    /// Constructs a scheduler from its collaborators
    ///
    /// The scheduler is inert until
    /// [`start_periodic_check`][Self::start_periodic_check] is called.
    pub fn new(
        configs: Arc<dyn ConfigurationProvider>,
        session: Arc<dyn SessionStateStore>,
        reset: Arc<dyn SessionResetCoordinator>,
        events: Arc<dyn EventSink>,
        refresh_renewer: Arc<dyn SessionRenewer>,
        iframe_renewer: Arc<dyn SessionRenewer>,
    ) -> Self {
        let (faults, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                configs,
                session,
                reset,
                events,
                refresh_renewer,
                iframe_renewer,
                interval: IntervalMultiplexer::new(),
                faults,
            }),
        }
    }

    /// Observes renewal faults
    ///
    /// The receiver holds the most recent fault, if any. Each failure is
    /// published exactly once; the recurring check keeps running
    /// regardless.
    pub fn fault_watcher(&self) -> watch::Receiver<Option<RenewalFault>> {
        self.inner.faults.subscribe()
    }

    /// Whether the periodic check is currently running
    pub fn is_running(&self) -> bool {
        self.inner.interval.is_running()
    }

    /// Starts the periodic token check over `all_configs`
    ///
    /// The tick period is taken from `current_config`'s
    /// [`token_refresh_in_seconds`][Configuration::token_refresh_in_seconds];
    /// per-configuration staleness is evaluated by the eligibility guard on
    /// every tick rather than by separate timers. Starting while a check is
    /// already running changes nothing.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_periodic_check(
        &self,
        all_configs: Vec<Configuration>,
        current_config: &Configuration,
    ) {
        let period = current_config.token_refresh_in_seconds;
        if period == 0 {
            tracing::warn!(
                config_id = %current_config.config_id,
                "no token refresh interval configured, periodic check not started"
            );
            return;
        }

        let inner = Arc::clone(&self.inner);
        let all_configs: Arc<[Configuration]> = all_configs.into();
        let started = self
            .inner
            .interval
            .start(Duration::from_secs(period), move || {
                let inner = Arc::clone(&inner);
                let all_configs = Arc::clone(&all_configs);
                async move { inner.run_tick(&all_configs).await }
            });

        if started {
            tracing::debug!(period_s = period, "periodic token check started");
        } else {
            tracing::debug!("periodic token check already running");
        }
    }

    /// Cancels the recurring check and releases the timer
    ///
    /// An attempt already in flight runs to its terminal outcome.
    pub fn stop(&self) {
        self.inner.interval.stop();
    }
}

impl Inner {
    async fn run_tick(&self, all_configs: &[Configuration]) {
        for config in all_configs {
            if let Err(fault) = self.check_config(config, all_configs).await {
                tracing::warn!(
                    config_id = %fault.config_id(),
                    error = %fault.error(),
                    "silent renewal attempt failed"
                );
                self.faults.send_replace(Some(fault));
            }
        }
    }

    async fn check_config(
        &self,
        registered: &Configuration,
        all_configs: &[Configuration],
    ) -> Result<(), RenewalFault> {
        let config_id: &ConfigIdRef = &registered.config_id;

        // the configuration may have been refreshed since the last tick
        let Some(config) = self.configs.get_current_config(config_id).await else {
            tracing::debug!(config_id = %config_id, "configuration not available, skipping");
            return Ok(());
        };

        let snapshot = SessionSnapshot::capture(&*self.session, &config);
        if !guard::should_start_renewal(&snapshot) {
            tracing::trace!(config_id = %config_id, "session not eligible for renewal this tick");
            return Ok(());
        }

        if !config.silent_renew {
            tracing::debug!(
                config_id = %config_id,
                "tokens are stale but silent renew is disabled, resetting authorization data"
            );
            self.reset.reset_authorization_data(&config, all_configs);
            return Ok(());
        }

        self.events.raise(SessionEvent::SilentRenewStarted {
            config_id: config.config_id.clone(),
        });
        self.session.set_silent_renew_running(config_id, true);

        let renewer = if flow::is_code_flow_with_refresh_tokens(&config) {
            tracing::debug!(config_id = %config_id, "renewing session with refresh tokens");
            &self.refresh_renewer
        } else {
            tracing::debug!(config_id = %config_id, "renewing session with silent iframe");
            &self.iframe_renewer
        };

        match renewer.renew(&config).await {
            Ok(context) => {
                tracing::debug!(
                    config_id = %config_id,
                    has_access_token = context.access_token().is_some(),
                    "silent renewal finished"
                );
                self.reset.reset_silent_renew_running(&config);
                Ok(())
            }
            Err(error) => {
                let error: Arc<dyn error::Error + Send + Sync + 'static> = Arc::from(error);
                self.events.raise(SessionEvent::SilentRenewFailed {
                    config_id: config.config_id.clone(),
                    error: Arc::clone(&error),
                });
                self.reset.reset_silent_renew_running(&config);
                Err(RenewalFault {
                    config_id: config.config_id.clone(),
                    error,
                })
            }
        }
    }
}
