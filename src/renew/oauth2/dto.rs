//! DTOs for the refresh-token exchange

use aliri_clock::DurationSecs;
use serde::{Deserialize, Serialize};

use crate::{AccessToken, ClientIdRef, IdToken, RefreshToken, RefreshTokenRef};

#[derive(Debug, Serialize)]
pub(super) struct RefreshTokenRequest<'a> {
    grant_type: &'static str,
    client_id: &'a ClientIdRef,
    refresh_token: &'a RefreshTokenRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    scope: Option<&'a str>,
}

impl<'a> RefreshTokenRequest<'a> {
    pub(super) fn new(
        client_id: &'a ClientIdRef,
        refresh_token: &'a RefreshTokenRef,
        scope: Option<&'a str>,
    ) -> Self {
        Self {
            grant_type: "refresh_token",
            client_id,
            refresh_token,
            scope,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct TokenResponse {
    pub access_token: AccessToken,
    #[serde(default)]
    pub id_token: Option<IdToken>,
    #[serde(default)]
    pub refresh_token: Option<RefreshToken>,
    pub expires_in: DurationSecs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ClientId;
    use color_eyre::Result;

    #[test]
    fn request_carries_the_refresh_token_grant() -> Result<()> {
        let client_id = ClientId::from_static("client");
        let refresh_token = RefreshToken::from_static("refresh");
        let request = RefreshTokenRequest::new(&client_id, &refresh_token, Some("openid profile"));

        let value = serde_json::to_value(&request)?;
        assert_eq!(value["grant_type"], "refresh_token");
        assert_eq!(value["client_id"], "client");
        assert_eq!(value["refresh_token"], "refresh");
        assert_eq!(value["scope"], "openid profile");
        Ok(())
    }

    #[test]
    fn scope_is_omitted_when_absent() -> Result<()> {
        let client_id = ClientId::from_static("client");
        let refresh_token = RefreshToken::from_static("refresh");
        let request = RefreshTokenRequest::new(&client_id, &refresh_token, None);

        let value = serde_json::to_value(&request)?;
        assert!(value.get("scope").is_none());
        Ok(())
    }

    #[test]
    fn token_response_parses_optional_fields() -> Result<()> {
        let body = r#"{
            "access_token": "at",
            "token_type": "Bearer",
            "expires_in": 3600
        }"#;

        let resp: TokenResponse = serde_json::from_str(body)?;
        assert_eq!(resp.access_token.as_str(), "at");
        assert!(resp.id_token.is_none());
        assert!(resp.refresh_token.is_none());
        assert_eq!(resp.expires_in, DurationSecs(3600));
        Ok(())
    }

    #[test]
    fn token_response_parses_a_full_token_set() -> Result<()> {
        let body = r#"{
            "access_token": "at",
            "id_token": "it",
            "refresh_token": "rt",
            "expires_in": 86400
        }"#;

        let resp: TokenResponse = serde_json::from_str(body)?;
        assert_eq!(resp.id_token.map(|t| t.as_str().to_owned()), Some("it".to_owned()));
        assert_eq!(resp.refresh_token.map(|t| t.as_str().to_owned()), Some("rt".to_owned()));
        Ok(())
    }
}
