//! Identity provider client.
//!
//! The storefront never handles credentials. The browser signs in with
//! the provider directly and hands us its session token; this client
//! verifies that token server-side and can revoke the session (the
//! forced sign-out used when a blocked user is detected).

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use crate::config::IdentityConfig;

/// Errors that can occur when talking to the identity provider.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an error response.
    #[error("Identity API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The session token did not verify.
    #[error("invalid session token")]
    InvalidSession,

    /// Failed to build the client or parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Verified claims for one provider session.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionClaims {
    /// Provider session id (needed for revocation).
    pub session_id: String,
    /// Provider user id.
    pub user_id: String,
    /// Attested email address.
    pub email: String,
}

/// Identity provider API client.
#[derive(Clone)]
pub struct IdentityClient {
    client: reqwest::Client,
    api_url: String,
}

impl IdentityClient {
    /// Create a new identity client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.secret_key.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| IdentityError::Parse(format!("Invalid secret key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Verify a session token and return its claims.
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError::InvalidSession`] when the provider rejects
    /// the token, or a transport/API error otherwise.
    pub async fn verify_session(&self, token: &str) -> Result<SessionClaims, IdentityError> {
        let url = format!("{}/sessions/verify", self.api_url);
        let body = serde_json::json!({ "token": token });

        let response = self.client.post(&url).json(&body).send().await?;
        let status = response.status();

        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::NOT_FOUND {
            return Err(IdentityError::InvalidSession);
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json::<SessionClaims>()
            .await
            .map_err(|e| IdentityError::Parse(e.to_string()))
    }

    /// Revoke a provider session (forced sign-out).
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    pub async fn revoke_session(&self, session_id: &str) -> Result<(), IdentityError> {
        let url = format!("{}/sessions/{session_id}/revoke", self.api_url);

        let response = self.client.post(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(IdentityError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }
}
