use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use tracing::debug;

use crate::config::{CredentialSource, FcmConfig};
use crate::errors::FcmError;
use crate::token::{AccessToken, TokenProvider};
use crate::transport::build_http_client;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// Firebase Service Account Key
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("account_type", &self.account_type)
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .field("client_id", &self.client_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Parse a JSON key as downloaded from the Firebase console
    pub fn from_json(json: &[u8]) -> Result<Self, FcmError> {
        serde_json::from_slice(json).map_err(|e| {
            FcmError::Authentication(format!("Failed to parse service account key: {}", e))
        })
    }

    /// Build a key from `GOOGLE_*` environment variables
    pub fn from_env() -> Result<Self, FcmError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub(crate) fn from_vars<F>(var: F) -> Result<Self, FcmError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let account_type = var("GOOGLE_ACCOUNT_TYPE");
        if let Some(kind) = account_type.as_deref() {
            if kind != "service_account" {
                return Err(FcmError::Authentication(format!(
                    "GOOGLE_ACCOUNT_TYPE must be service_account, got {}",
                    kind
                )));
            }
        }

        let client_email = var("GOOGLE_CLIENT_EMAIL")
            .ok_or_else(|| FcmError::Authentication("GOOGLE_CLIENT_EMAIL not set".into()))?;
        let private_key = var("GOOGLE_PRIVATE_KEY")
            .ok_or_else(|| FcmError::Authentication("GOOGLE_PRIVATE_KEY not set".into()))?
            .replace("\\n", "\n");

        Ok(Self {
            account_type,
            project_id: None,
            private_key_id: None,
            private_key,
            client_email,
            client_id: var("GOOGLE_CLIENT_ID"),
            token_uri: var("GOOGLE_TOKEN_URI").unwrap_or_else(default_token_uri),
        })
    }
}

/// JWT Claims for Google OAuth2
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    pub iss: String,
    pub sub: String,
    pub scope: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

/// Exchanges a signed service-account assertion for an access token
pub struct ServiceAccountTokenProvider {
    key: ServiceAccountKey,
    scope: String,
    http_client: reqwest::Client,
}

impl ServiceAccountTokenProvider {
    pub fn new(key: ServiceAccountKey, scopes: &[String], http_client: reqwest::Client) -> Self {
        Self {
            key,
            scope: scopes.join(" "),
            http_client,
        }
    }

    /// Load the key from whichever source the configuration names
    pub fn from_config(config: &FcmConfig) -> Result<Self, FcmError> {
        let key = match &config.credentials {
            CredentialSource::File(path) => {
                let json = std::fs::read(path).map_err(|e| {
                    FcmError::Authentication(format!(
                        "Failed to read service account key {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                ServiceAccountKey::from_json(&json)?
            }
            CredentialSource::Json(json) => ServiceAccountKey::from_json(json)?,
            CredentialSource::Environment => ServiceAccountKey::from_env()?,
        };

        Ok(Self::new(key, &config.scopes, build_http_client(config)?))
    }

    pub fn key(&self) -> &ServiceAccountKey {
        &self.key
    }

    fn sign_assertion(&self) -> Result<String, FcmError> {
        let iat = Utc::now().timestamp();
        let claims = JwtClaims {
            iss: self.key.client_email.clone(),
            sub: self.key.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.key.token_uri.clone(),
            exp: iat + ASSERTION_LIFETIME_SECS,
            iat,
        };

        let encoding_key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| FcmError::Authentication(format!("Failed to parse private key: {}", e)))?;

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        encode(&header, &claims, &encoding_key)
            .map_err(|e| FcmError::Authentication(format!("Failed to encode JWT: {}", e)))
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    async fn fetch_token(&self) -> Result<AccessToken, FcmError> {
        let assertion = self.sign_assertion()?;
        let params = [("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)];

        debug!(
            client_email = %self.key.client_email,
            token_uri = %self.key.token_uri,
            "Exchanging service account assertion"
        );

        let response = self
            .http_client
            .post(&self.key.token_uri)
            .form(&params)
            .send()
            .await
            .map_err(|e| FcmError::Authentication(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(FcmError::Authentication(format!(
                "Token request failed with status: {} - {}",
                status, body
            )));
        }

        response.json::<AccessToken>().await.map_err(|e| {
            FcmError::Authentication(format!("Failed to parse token response: {}", e))
        })
    }
}
