//! Background silent token renewal for multi-configuration OpenID Connect
//! clients
//!
//! Once a session is established, tokens go stale without any user being
//! around to notice. This library keeps such sessions alive from the
//! background: a single shared timer periodically re-evaluates every
//! registered client configuration, decides whether its token set needs
//! renewing, and if so drives one of two renewal strategies — a
//! refresh-token exchange for authorization-code flows that use refresh
//! tokens, or a host-supplied silent re-authentication for everything else.
//!
//! Renewal only starts when a configuration is actually eligible: there must
//! be a session to renew (an id token and user data), no renewal or
//! interactive login may already be in flight, and at least one token must
//! have expired. Those checks are evaluated fresh on every tick so that
//! state changed by the host between ticks is always respected.
//!
//! Failures are recovered locally. A failed attempt emits a
//! [`SessionEvent::SilentRenewFailed`][events::SessionEvent] event, clears
//! the in-progress flag so a later tick can retry, and publishes the error
//! on the scheduler's fault channel — the recurring check itself keeps
//! running, and no configuration's failure affects its siblings.
//!
//! # Wiring it up
//!
//! The scheduler composes a handful of collaborators: a configuration
//! provider (re-read every tick), a session state store, a reset
//! coordinator, an event sink, and the two renewal strategies.
//!
//! ```no_run
//! use std::sync::Arc;
//! use renovigi::config::{Configuration, StaticConfigurationProvider};
//! use renovigi::events::EventBroadcaster;
//! use renovigi::renew::oauth2::RefreshTokenRenewer;
//! use renovigi::reset::StoreResetCoordinator;
//! use renovigi::state::InMemorySessionStore;
//! use renovigi::{RefreshToken, SilentRenewScheduler};
//! # use renovigi::renew::{CallbackContext, SessionRenewer};
//! # struct HostIframeRenewer;
//! # #[async_trait::async_trait]
//! # impl SessionRenewer for HostIframeRenewer {
//! #     async fn renew(
//! #         &self,
//! #         _config: &Configuration,
//! #     ) -> Result<CallbackContext, Box<dyn std::error::Error + Send + Sync + 'static>> {
//! #         Ok(CallbackContext::default())
//! #     }
//! # }
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut config = Configuration::new("main");
//! config.silent_renew = true;
//! config.use_refresh_token = true;
//! config.token_refresh_in_seconds = 30;
//! config.token_endpoint = Some("https://example.com/oauth/token".to_owned());
//!
//! let store = Arc::new(InMemorySessionStore::new());
//! let provider = Arc::new(StaticConfigurationProvider::new([config.clone()]));
//! let reset = Arc::new(StoreResetCoordinator::new(Arc::clone(&store)));
//! let events = Arc::new(EventBroadcaster::new(16));
//!
//! let refresh_renewer = Arc::new(RefreshTokenRenewer::new(reqwest::Client::new()));
//! refresh_renewer.set_refresh_token("main", RefreshToken::from_static("initial-refresh-token"));
//!
//! let scheduler = SilentRenewScheduler::new(
//!     provider,
//!     store,
//!     reset,
//!     events,
//!     refresh_renewer,
//!     Arc::new(HostIframeRenewer),
//! );
//!
//! scheduler.start_periodic_check(vec![config.clone()], &config);
//! # }
//! ```
//!
//! Calling [`SilentRenewScheduler::stop`] cancels the recurring check and
//! releases the timer; an attempt already in flight still runs to its
//! terminal outcome.
//!
//! # Features
//!
//! * `oauth2` (default): provides [`renew::oauth2::RefreshTokenRenewer`],
//!   a refresh-token exchange renewer backed by [reqwest].

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod braids;
pub mod config;
pub mod events;
pub mod flow;
pub mod guard;
pub mod interval;
pub mod renew;
pub mod reset;
mod scheduler;
pub mod state;

pub use braids::*;
pub use scheduler::{RenewalFault, SilentRenewScheduler};
