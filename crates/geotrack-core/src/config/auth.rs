//! Bearer token verification configuration.
//!
//! Tokens are issued by the external identity provider; GeoTrack only
//! verifies them.

use serde::{Deserialize, Serialize};

/// Authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Shared HMAC secret used to verify HS256 tokens.
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    /// Allowed clock skew in seconds when checking `exp`.
    #[serde(default = "default_leeway")]
    pub leeway_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_jwt_secret(),
            leeway_seconds: default_leeway(),
        }
    }
}

fn default_jwt_secret() -> String {
    "CHANGE_ME_IN_PRODUCTION".to_string()
}

fn default_leeway() -> u64 {
    5
}
