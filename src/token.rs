//! OAuth token (persistable)

use std::fmt;

use chrono::{DateTime, Utc};
use oauth2::basic::{BasicTokenResponse, BasicTokenType};
use oauth2::TokenResponse;
use serde::{Deserialize, Serialize};

/// Refresh margin before expiry (5 minutes)
pub const TOKEN_REFRESH_MARGIN_SECS: i64 = 300;

/// OAuth2 credentials as persisted by the token store.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Absolute expiry; `None` means the token does not expire.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl OAuthToken {
    /// Converts a token endpoint response received at `issued_at`.
    pub fn from_response(response: &BasicTokenResponse, issued_at: DateTime<Utc>) -> Self {
        let token_type = match response.token_type() {
            BasicTokenType::Bearer => "Bearer".to_string(),
            BasicTokenType::Mac => "MAC".to_string(),
            BasicTokenType::Extension(other) => other.clone(),
        };
        let expiry = response
            .expires_in()
            .and_then(|lifetime| chrono::Duration::from_std(lifetime).ok())
            .and_then(|lifetime| issued_at.checked_add_signed(lifetime));

        Self {
            access_token: response.access_token().secret().clone(),
            token_type,
            refresh_token: response.refresh_token().map(|t| t.secret().clone()),
            expiry,
        }
    }

    /// Whether the token is expired, or will be within the refresh margin.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expiry {
            Some(expiry) => now.timestamp() >= expiry.timestamp() - TOKEN_REFRESH_MARGIN_SECS,
            None => false,
        }
    }

    /// Remaining lifetime in seconds, clamped at zero.
    pub fn remaining_seconds(&self) -> Option<i64> {
        self.expiry
            .map(|expiry| (expiry.timestamp() - Utc::now().timestamp()).max(0))
    }
}

impl fmt::Debug for OAuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthToken")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expiry", &self.expiry)
            .finish()
    }
}
