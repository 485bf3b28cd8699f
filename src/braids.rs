use aliri_braid::braid;
use std::fmt;

macro_rules! redact {
    ($ty:ty: $hidden:literal) => {
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(concat!("***", $hidden, "***"))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str(concat!("***", $hidden, "***"))
            }
        }
    };
}

/// An identifier naming one client configuration
#[braid(serde)]
pub struct ConfigId;

/// A client ID
#[braid(serde)]
pub struct ClientId;

/// An access token
#[braid(serde, debug = "owned", display = "owned")]
pub struct AccessToken;

redact!(AccessTokenRef: "ACCESS TOKEN");

/// An OIDC ID token
#[braid(serde)]
pub struct IdToken;

/// A refresh token
#[braid(serde, debug = "owned", display = "owned")]
pub struct RefreshToken;

redact!(RefreshTokenRef: "REFRESH TOKEN");
