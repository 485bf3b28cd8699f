//! Session renewal against an OAuth2 token endpoint

use std::collections::HashMap;
use std::error;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use thiserror::Error;

use super::{CallbackContext, SessionRenewer};
use crate::config::Configuration;
use crate::{ConfigId, ConfigIdRef, RefreshToken};

mod dto;

/// A renewer performing the refresh-token exchange
///
/// The renewer holds the current refresh token for every configuration it
/// serves and rotates a token whenever the authority issues a replacement.
#[derive(Debug)]
pub struct RefreshTokenRenewer {
    client: reqwest::Client,
    refresh_tokens: Mutex<HashMap<ConfigId, RefreshToken>>,
}

impl RefreshTokenRenewer {
    /// Constructs a renewer using `client` for transport
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            refresh_tokens: Mutex::new(HashMap::new()),
        }
    }

    /// Seeds or replaces the refresh token used for a configuration
    pub fn set_refresh_token(&self, config_id: impl Into<ConfigId>, token: RefreshToken) {
        self.tokens().insert(config_id.into(), token);
    }

    fn tokens(&self) -> MutexGuard<'_, HashMap<ConfigId, RefreshToken>> {
        self.refresh_tokens
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[tracing::instrument(
        err,
        skip(self, config),
        fields(config_id = %config.config_id),
    )]
    async fn exchange(&self, config: &Configuration) -> Result<CallbackContext, TokenRefreshError> {
        let token_endpoint = config
            .token_endpoint
            .as_deref()
            .ok_or(TokenRefreshError::MissingTokenEndpoint)?;
        let client_id = config
            .client_id
            .as_deref()
            .ok_or(TokenRefreshError::MissingClientId)?;
        let config_id: &ConfigIdRef = &config.config_id;
        let refresh_token = self
            .tokens()
            .get(config_id)
            .cloned()
            .ok_or(TokenRefreshError::MissingRefreshToken)?;

        tracing::trace!("requesting fresh tokens from authority");

        let payload = dto::RefreshTokenRequest::new(client_id, &refresh_token, config.scope.as_deref());
        let resp = self
            .client
            .post(token_endpoint)
            .form(&payload)
            .send()
            .await
            .map_err(TokenRefreshError::RequestSend)?;

        tracing::debug!(
            response.status = resp.status().as_u16(),
            "received token response from authority"
        );

        if let Err(error) = resp.error_for_status_ref() {
            let body = resp.text().await.map_err(TokenRefreshError::BodyReadError)?;
            return Err(TokenRefreshError::ErrorWithBody {
                source: error,
                body,
            });
        }

        let body = resp.bytes().await.map_err(TokenRefreshError::BodyReadError)?;
        let resp: dto::TokenResponse = serde_json::from_slice(&body)?;

        tracing::info!(
            has_id_token = resp.id_token.is_some(),
            has_refresh_token = resp.refresh_token.is_some(),
            expires_in = resp.expires_in.0,
            "session renewed with refresh token"
        );

        if let Some(rotated) = resp.refresh_token {
            tracing::info!("received new refresh token");
            self.tokens().insert(config_id.to_owned(), rotated);
        }

        Ok(CallbackContext::new(
            Some(resp.access_token),
            resp.id_token,
            Some(resp.expires_in),
        ))
    }
}

#[async_trait]
impl SessionRenewer for RefreshTokenRenewer {
    async fn renew(
        &self,
        config: &Configuration,
    ) -> Result<CallbackContext, Box<dyn error::Error + Send + Sync + 'static>> {
        Ok(self.exchange(config).await?)
    }
}

/// An error while attempting the refresh-token exchange
#[derive(Debug, Error)]
pub enum TokenRefreshError {
    /// The configuration names no token endpoint
    #[error("configuration has no token endpoint")]
    MissingTokenEndpoint,
    /// The configuration names no client id
    #[error("configuration has no client id")]
    MissingClientId,
    /// No refresh token is held for the configuration
    #[error("no refresh token held for this configuration")]
    MissingRefreshToken,
    /// An error from the authority with an error body
    #[error("error requesting token from authority: {body}")]
    ErrorWithBody {
        /// The underlying request error
        source: reqwest::Error,
        /// The body of the error
        body: String,
    },
    /// Unable to deserialize the token body
    #[error("error deserializing token body from authority")]
    TokenBodyError(#[from] serde_json::Error),
    /// Unable to read the response
    #[error("error reading response body")]
    BodyReadError(reqwest::Error),
    /// Unable to send a token request to the authority
    #[error("error sending request to authority")]
    RequestSend(reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn renewal_without_a_seeded_refresh_token_fails() {
        let renewer = RefreshTokenRenewer::new(reqwest::Client::new());
        let mut config = Configuration::new("configId1");
        config.token_endpoint = Some("https://example.com/oauth/token".to_owned());
        config.client_id = Some(crate::ClientId::from_static("client"));

        let error = renewer.exchange(&config).await.unwrap_err();
        assert!(matches!(error, TokenRefreshError::MissingRefreshToken));
    }

    #[tokio::test]
    async fn renewal_without_a_token_endpoint_fails() {
        let renewer = RefreshTokenRenewer::new(reqwest::Client::new());
        let config = Configuration::new("configId1");

        let error = renewer.exchange(&config).await.unwrap_err();
        assert!(matches!(error, TokenRefreshError::MissingTokenEndpoint));
    }

    #[test]
    fn seeded_refresh_tokens_replace_prior_values() {
        let renewer = RefreshTokenRenewer::new(reqwest::Client::new());
        renewer.set_refresh_token("configId1", RefreshToken::from_static("first"));
        renewer.set_refresh_token("configId1", RefreshToken::from_static("second"));

        let config_id = ConfigId::from("configId1");
        let held = renewer.tokens().get(&config_id).cloned();
        assert_eq!(held.unwrap().as_str(), "second");
    }
}
