//! Google service-account authentication (OAuth2 JWT-bearer grant).

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::SpreadsheetAccessError;

/// Scopes needed to find a spreadsheet by name and edit it.
pub const SHEETS_SCOPES: [&str; 2] = [
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/drive",
];

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for each signed assertion (Google's maximum).
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh this long before the token actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Anything that can hand out a bearer token for Google APIs.
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, SpreadsheetAccessError>;
}

/// The fields of a service-account JSON key that the grant needs.
#[derive(Debug, Clone)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: SecretString,
    pub token_uri: String,
}

#[derive(Deserialize)]
struct KeyFile {
    client_email: String,
    private_key: String,
    #[serde(default)]
    token_uri: Option<String>,
}

impl ServiceAccountKey {
    /// Parse a key from its JSON text.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: KeyFile = serde_json::from_str(json)?;
        Ok(Self {
            client_email: file.client_email,
            private_key: SecretString::from(file.private_key),
            token_uri: file
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        })
    }

    /// Load a key downloaded from the Google Cloud console.
    pub fn from_file(path: &Path) -> Result<Self, SpreadsheetAccessError> {
        let failed = |reason: String| SpreadsheetAccessError::Credentials {
            path: path.to_path_buf(),
            reason,
        };
        let json = std::fs::read_to_string(path).map_err(|e| failed(e.to_string()))?;
        Self::from_json(&json).map_err(|e| failed(e.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: String,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

struct CachedToken {
    token: SecretString,
    expires_at: DateTime<Utc>,
}

/// Exchanges signed assertions for access tokens, caching until expiry.
pub struct ServiceAccountTokens {
    key: ServiceAccountKey,
    scopes: Vec<String>,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokens {
    pub fn new(key: ServiceAccountKey, scopes: &[&str]) -> Self {
        Self {
            key,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            http: reqwest::Client::new(),
            cached: Mutex::new(None),
        }
    }

    /// Build the RS256-signed JWT assertion.
    pub fn assertion(&self, now: DateTime<Utc>) -> Result<String, SpreadsheetAccessError> {
        let claims = Claims {
            iss: &self.key.client_email,
            scope: self.scopes.join(" "),
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };
        let key = EncodingKey::from_rsa_pem(self.key.private_key.expose_secret().as_bytes())
            .map_err(|e| SpreadsheetAccessError::Auth(format!("invalid private key: {e}")))?;

        jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
            .map_err(|e| SpreadsheetAccessError::Auth(format!("failed to sign assertion: {e}")))
    }

    async fn fetch(&self, now: DateTime<Utc>) -> Result<CachedToken, SpreadsheetAccessError> {
        let assertion = self.assertion(now)?;

        let resp = self
            .http
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| SpreadsheetAccessError::Auth(format!("token exchange failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SpreadsheetAccessError::Auth(format!(
                "token endpoint returned {status}: {body}"
            )));
        }

        let body: TokenResponse = resp.json().await.map_err(|e| {
            SpreadsheetAccessError::Auth(format!("failed to parse token response: {e}"))
        })?;

        let lifetime = body.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS);
        debug!(client = %self.key.client_email, lifetime, "Fetched Google access token");

        Ok(CachedToken {
            token: SecretString::from(body.access_token),
            expires_at: now + Duration::seconds(lifetime - EXPIRY_MARGIN_SECS),
        })
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountTokens {
    async fn access_token(&self) -> Result<String, SpreadsheetAccessError> {
        let now = Utc::now();
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref()
            && token.expires_at > now
        {
            return Ok(token.token.expose_secret().to_string());
        }

        let fresh = self.fetch(now).await?;
        let token = fresh.token.expose_secret().to_string();
        *cached = Some(fresh);
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;

    use super::*;

    const FIXTURE: &str = include_str!("../../tests/fixtures/service_account.json");

    #[test]
    fn parses_key_file() {
        let key = ServiceAccountKey::from_json(FIXTURE).unwrap();
        assert_eq!(key.client_email, "scraper@example-project.iam.gserviceaccount.com");
        assert_eq!(key.token_uri, "https://oauth2.googleapis.com/token");
        assert!(key.private_key.expose_secret().contains("PRIVATE KEY"));
    }

    #[test]
    fn token_uri_defaults_when_absent() {
        let key = ServiceAccountKey::from_json(
            r#"{"client_email": "a@b.c", "private_key": "pem"}"#,
        )
        .unwrap();
        assert_eq!(key.token_uri, DEFAULT_TOKEN_URI);
    }

    #[test]
    fn missing_key_file_is_credentials_error() {
        let err = ServiceAccountKey::from_file(Path::new("/nonexistent/key.json")).unwrap_err();
        assert!(matches!(err, SpreadsheetAccessError::Credentials { .. }));
    }

    #[test]
    fn loads_key_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service_account.json");
        std::fs::write(&path, FIXTURE).unwrap();

        let key = ServiceAccountKey::from_file(&path).unwrap();
        assert_eq!(key.client_email, "scraper@example-project.iam.gserviceaccount.com");
    }

    #[test]
    fn key_without_private_key_is_credentials_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("service_account.json");
        std::fs::write(&path, r#"{"client_email": "a@b.c"}"#).unwrap();

        let err = ServiceAccountKey::from_file(&path).unwrap_err();
        assert!(
            matches!(err, SpreadsheetAccessError::Credentials { reason, .. } if reason.contains("private_key"))
        );
    }

    #[test]
    fn assertion_is_signed_jwt() {
        let key = ServiceAccountKey::from_json(FIXTURE).unwrap();
        let tokens = ServiceAccountTokens::new(key, &SHEETS_SCOPES);
        let jwt = tokens.assertion(Utc::now()).unwrap();
        assert_eq!(jwt.split('.').count(), 3);
    }

    #[test]
    fn bad_private_key_is_auth_error() {
        let key = ServiceAccountKey::from_json(
            r#"{"client_email": "a@b.c", "private_key": "not a pem"}"#,
        )
        .unwrap();
        let tokens = ServiceAccountTokens::new(key, &SHEETS_SCOPES);
        assert!(matches!(
            tokens.assertion(Utc::now()),
            Err(SpreadsheetAccessError::Auth(_))
        ));
    }

    #[tokio::test]
    async fn exchanges_and_caches_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::UrlEncoded(
                "grant_type".into(),
                JWT_BEARER_GRANT.into(),
            ))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "ya29.test", "expires_in": 3599, "token_type": "Bearer"}"#)
            .expect(1)
            .create_async()
            .await;

        let mut key = ServiceAccountKey::from_json(FIXTURE).unwrap();
        key.token_uri = format!("{}/token", server.url());
        let tokens = ServiceAccountTokens::new(key, &SHEETS_SCOPES);

        assert_eq!(tokens.access_token().await.unwrap(), "ya29.test");
        assert_eq!(tokens.access_token().await.unwrap(), "ya29.test");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_exchange_is_auth_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant"}"#)
            .create_async()
            .await;

        let mut key = ServiceAccountKey::from_json(FIXTURE).unwrap();
        key.token_uri = format!("{}/token", server.url());
        let tokens = ServiceAccountTokens::new(key, &SHEETS_SCOPES);

        let err = tokens.access_token().await.unwrap_err();
        assert!(matches!(err, SpreadsheetAccessError::Auth(msg) if msg.contains("invalid_grant")));
    }
}
