//! File-storage provider client (Google Drive v3).
//!
//! Two concerns live here: the folder-tree walks behind the catalog sync
//! endpoints, and the per-file reader grants issued during fulfillment.
//! Auth is a service-account JWT assertion exchanged for a short-lived
//! bearer token, cached until shortly before expiry.

use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use paperstack_core::FileId;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::instrument;

use crate::config::StorageConfig;

const DRIVE_SCOPE: &str = "https://www.googleapis.com/auth/drive";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const FOLDER_MIME: &str = "application/vnd.google-apps.folder";

/// Errors that can occur when talking to the file-storage provider.
#[derive(Debug, Error)]
pub enum DriveError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider returned an error response.
    #[error("Storage API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The service-account key failed to parse or sign.
    #[error("Service account key error: {0}")]
    Key(#[from] jsonwebtoken::errors::Error),

    /// Token exchange failed.
    #[error("Token exchange error: {0}")]
    Token(String),

    /// Failed to parse a response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A file or folder entry from the storage provider.
#[derive(Debug, Clone, Deserialize)]
pub struct DriveFile {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

struct CachedToken {
    access_token: String,
    expires_at: i64,
}

/// File-storage provider API client.
#[derive(Clone)]
pub struct DriveClient {
    inner: Arc<DriveClientInner>,
}

struct DriveClientInner {
    client: reqwest::Client,
    api_url: String,
    token_url: String,
    service_account_email: String,
    private_key: SecretString,
    token: Mutex<Option<CachedToken>>,
}

impl DriveClient {
    /// Create a new file-storage client.
    ///
    /// The private key is parsed lazily at first use, so construction
    /// never fails.
    #[must_use]
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            inner: Arc::new(DriveClientInner {
                client: reqwest::Client::new(),
                api_url: config.api_url.trim_end_matches('/').to_string(),
                token_url: config.token_url.clone(),
                service_account_email: config.service_account_email.clone(),
                private_key: config.private_key.clone(),
                token: Mutex::new(None),
            }),
        }
    }

    /// Get a bearer token, reusing the cached one while it has at least a
    /// minute of validity left.
    async fn access_token(&self) -> Result<String, DriveError> {
        let mut guard = self.inner.token.lock().await;
        let now = Utc::now().timestamp();

        if let Some(cached) = guard.as_ref()
            && cached.expires_at - 60 > now
        {
            return Ok(cached.access_token.clone());
        }

        let key = EncodingKey::from_rsa_pem(self.inner.private_key.expose_secret().as_bytes())?;
        let claims = AssertionClaims {
            iss: &self.inner.service_account_email,
            scope: DRIVE_SCOPE,
            aud: &self.inner.token_url,
            iat: now,
            exp: now + 3600,
        };
        let assertion = encode(&Header::new(Algorithm::RS256), &claims, &key)?;

        let response = self
            .inner
            .client
            .post(&self.inner.token_url)
            .form(&[
                ("grant_type", JWT_BEARER_GRANT),
                ("assertion", assertion.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DriveError::Token(format!("{status}: {message}")));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| DriveError::Token(e.to_string()))?;

        let access_token = token.access_token.clone();
        *guard = Some(CachedToken {
            access_token: token.access_token,
            expires_at: now + token.expires_in,
        });

        Ok(access_token)
    }

    /// Grant read access on a file to the given email, without sending
    /// the provider's own notification email.
    ///
    /// # Errors
    ///
    /// Returns an error if the grant is rejected or the request fails.
    #[instrument(skip(self, email), fields(file = %file))]
    pub async fn grant_reader(&self, file: &FileId, email: &str) -> Result<(), DriveError> {
        let token = self.access_token().await?;
        let url = format!(
            "{}/files/{}/permissions",
            self.inner.api_url,
            urlencoding::encode(file.as_str())
        );

        let body = serde_json::json!({
            "role": "reader",
            "type": "user",
            "emailAddress": email,
        });

        let response = self
            .inner
            .client
            .post(&url)
            .query(&[("sendNotificationEmail", "false")])
            .bearer_auth(&token)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DriveError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        Ok(())
    }

    /// Find a folder by exact name anywhere in the corpus.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn find_folder_by_name(&self, name: &str) -> Result<Option<DriveFile>, DriveError> {
        let query = format!(
            "name = '{}' and mimeType = '{FOLDER_MIME}' and trashed = false",
            escape_query_term(name)
        );
        Ok(self.list(&query).await?.into_iter().next())
    }

    /// List the folders directly inside a parent folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn child_folders(&self, parent_id: &str) -> Result<Vec<DriveFile>, DriveError> {
        let query = format!(
            "'{}' in parents and mimeType = '{FOLDER_MIME}' and trashed = false",
            escape_query_term(parent_id)
        );
        self.list(&query).await
    }

    /// List the non-folder files directly inside a parent folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn child_files(&self, parent_id: &str) -> Result<Vec<DriveFile>, DriveError> {
        let query = format!(
            "'{}' in parents and mimeType != '{FOLDER_MIME}' and trashed = false",
            escape_query_term(parent_id)
        );
        self.list(&query).await
    }

    async fn list(&self, query: &str) -> Result<Vec<DriveFile>, DriveError> {
        let token = self.access_token().await?;
        let url = format!("{}/files", self.inner.api_url);

        let response = self
            .inner
            .client
            .get(&url)
            .query(&[("q", query), ("fields", "files(id, name)")])
            .bearer_auth(&token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DriveError::Api {
                status: status.as_u16(),
                message: message.chars().take(200).collect(),
            });
        }

        let list: FileList = response
            .json()
            .await
            .map_err(|e| DriveError::Parse(e.to_string()))?;

        Ok(list.files)
    }
}

/// Construct the public viewer URL for a stored file.
#[must_use]
pub fn viewer_link(file: &FileId) -> String {
    format!("https://drive.google.com/file/d/{file}/view")
}

/// Escape single quotes inside a storage query term.
fn escape_query_term(term: &str) -> String {
    term.replace('\'', "\\'")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_link() {
        let link = viewer_link(&FileId::from("1wY44azXq"));
        assert_eq!(link, "https://drive.google.com/file/d/1wY44azXq/view");
    }

    #[test]
    fn test_escape_query_term() {
        assert_eq!(escape_query_term("Bob's Files"), "Bob\\'s Files");
        assert_eq!(escape_query_term("plain"), "plain");
    }
}
