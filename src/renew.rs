//! Renewal strategies
//!
//! Two strategies implement the same contract: a refresh-token exchange
//! against the authority's token endpoint (provided by this crate behind
//! the `oauth2` feature), and iframe-based silent re-authentication, whose
//! transport lives with the host and is only consumed here through the
//! [`SessionRenewer`] trait.

use crate::config::Configuration;
use crate::{AccessToken, AccessTokenRef, IdToken, IdTokenRef};
use aliri_clock::DurationSecs;
use async_trait::async_trait;
use std::error;

#[cfg(feature = "oauth2")]
#[cfg_attr(docsrs, doc(cfg(feature = "oauth2")))]
pub mod oauth2;

/// The payload produced by a successful renewal attempt
///
/// Opaque to the scheduler: renewers persist their own side effects, and
/// the context is only consulted for logging before being discarded.
#[derive(Debug, Default)]
pub struct CallbackContext {
    access_token: Option<AccessToken>,
    id_token: Option<IdToken>,
    expires_in: Option<DurationSecs>,
}

impl CallbackContext {
    /// Constructs a context carrying the token set issued on renewal
    pub fn new(
        access_token: Option<AccessToken>,
        id_token: Option<IdToken>,
        expires_in: Option<DurationSecs>,
    ) -> Self {
        Self {
            access_token,
            id_token,
            expires_in,
        }
    }

    /// The renewed access token, if one was issued
    pub fn access_token(&self) -> Option<&AccessTokenRef> {
        self.access_token.as_deref()
    }

    /// The renewed id token, if one was issued
    pub fn id_token(&self) -> Option<&IdTokenRef> {
        self.id_token.as_deref()
    }

    /// The lifetime of the renewed token set, if reported
    pub fn expires_in(&self) -> Option<DurationSecs> {
        self.expires_in
    }
}

/// A strategy that obtains a fresh token set without user interaction
#[async_trait]
pub trait SessionRenewer: Send + Sync {
    /// Attempts to renew the session for the given configuration
    ///
    /// Implementations are responsible for persisting the renewed session;
    /// the returned context is evidence of the terminal outcome.
    async fn renew(
        &self,
        config: &Configuration,
    ) -> Result<CallbackContext, Box<dyn error::Error + Send + Sync + 'static>>;
}
