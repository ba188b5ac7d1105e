use dotenvy::dotenv;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use crate::errors::FcmError;

/// OAuth scope required by the FCM HTTP v1 API
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

/// Message-send domain (push and batch)
pub const DEFAULT_DOMAIN: &str = "https://fcm.googleapis.com";

/// Instance-ID domain (topic subscribe / unsubscribe)
pub const DEFAULT_TOPIC_DOMAIN: &str = "https://iid.googleapis.com";

/// Where the service-account key comes from
#[derive(Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Path to a service-account JSON key file
    File(PathBuf),
    /// Service-account JSON key already loaded in memory
    Json(Vec<u8>),
    /// `GOOGLE_CLIENT_EMAIL` / `GOOGLE_PRIVATE_KEY` style variables
    Environment,
}

impl fmt::Debug for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::File(path) => f.debug_tuple("File").field(path).finish(),
            CredentialSource::Json(bytes) => write!(f, "Json(<{} bytes>)", bytes.len()),
            CredentialSource::Environment => f.write_str("Environment"),
        }
    }
}

/// Outbound proxy settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyConfig {
    /// Use `HTTP_PROXY` / `HTTPS_PROXY` / `NO_PROXY` from the environment
    Environment,
    /// Explicit proxy URI with optional basic-auth credentials
    Explicit {
        uri: String,
        user: Option<String>,
        password: Option<String>,
    },
}

impl ProxyConfig {
    /// Basic-auth credentials, if any.
    ///
    /// A blank user name disables basic auth; the password may be empty.
    pub fn basic_auth(&self) -> Option<(&str, &str)> {
        match self {
            ProxyConfig::Explicit {
                user: Some(user),
                password,
                ..
            } if !user.trim().is_empty() => {
                Some((user.as_str(), password.as_deref().unwrap_or("")))
            }
            _ => None,
        }
    }
}

/// FCM Client Configuration
///
/// A client clones this value at construction, so later changes to the
/// caller's copy never leak into an existing client.
#[derive(Debug, Clone)]
pub struct FcmConfig {
    pub credentials: CredentialSource,
    pub scopes: Vec<String>,
    pub open_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    /// `None` disables proxying entirely
    pub proxy: Option<ProxyConfig>,
    pub domain: String,
    pub topic_domain: String,
}

impl Default for FcmConfig {
    fn default() -> Self {
        Self {
            credentials: CredentialSource::Environment,
            scopes: vec![DEFAULT_SCOPE.to_string()],
            open_timeout: None,
            read_timeout: None,
            proxy: None,
            domain: DEFAULT_DOMAIN.to_string(),
            topic_domain: DEFAULT_TOPIC_DOMAIN.to_string(),
        }
    }
}

impl FcmConfig {
    /// Load configuration from environment variables (and `.env`)
    pub fn from_env() -> Result<Self, FcmError> {
        dotenv().ok();
        Self::from_vars(|key| env::var(key).ok())
    }

    pub(crate) fn from_vars<F>(var: F) -> Result<Self, FcmError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(path) = var("FCM_CREDENTIALS_PATH").filter(|p| !p.trim().is_empty()) {
            config.credentials = CredentialSource::File(PathBuf::from(path));
        }

        if let Some(scopes) = var("FCM_SCOPES") {
            let scopes = parse_list(&scopes);
            if !scopes.is_empty() {
                config.scopes = scopes;
            }
        }

        config.open_timeout = parse_secs(&var, "FCM_OPEN_TIMEOUT_SECS")?;
        config.read_timeout = parse_secs(&var, "FCM_READ_TIMEOUT_SECS")?;

        config.proxy = match var("FCM_PROXY").as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) if value.eq_ignore_ascii_case("env") => Some(ProxyConfig::Environment),
            Some(uri) => Some(ProxyConfig::Explicit {
                uri: uri.to_string(),
                user: var("FCM_PROXY_USER"),
                password: var("FCM_PROXY_PASSWORD"),
            }),
        };

        if let Some(domain) = var("FCM_DOMAIN") {
            config.domain = domain;
        }
        if let Some(domain) = var("FCM_TOPIC_DOMAIN") {
            config.topic_domain = domain;
        }

        Ok(config)
    }

    pub fn with_credentials_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials = CredentialSource::File(path.into());
        self
    }

    pub fn with_credentials_json(mut self, json: impl Into<Vec<u8>>) -> Self {
        self.credentials = CredentialSource::Json(json.into());
        self
    }

    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = Some(timeout);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Override the message-send domain (mainly for tests and emulators)
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// Override the instance-ID domain
    pub fn with_topic_domain(mut self, domain: impl Into<String>) -> Self {
        self.topic_domain = domain.into();
        self
    }
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn parse_secs<F>(var: &F, key: &str) -> Result<Option<Duration>, FcmError>
where
    F: Fn(&str) -> Option<String>,
{
    match var(key) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<u64>()
            .map(|secs| Some(Duration::from_secs(secs)))
            .map_err(|e| FcmError::Config(format!("{} must be a number of seconds: {}", key, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = FcmConfig::default();
        assert_eq!(config.scopes, vec![DEFAULT_SCOPE.to_string()]);
        assert_eq!(config.credentials, CredentialSource::Environment);
        assert_eq!(config.domain, DEFAULT_DOMAIN);
        assert_eq!(config.topic_domain, DEFAULT_TOPIC_DOMAIN);
        assert!(config.proxy.is_none());
        assert!(config.open_timeout.is_none());
    }

    #[test]
    fn test_from_vars_reads_everything() {
        let config = FcmConfig::from_vars(vars(&[
            ("FCM_CREDENTIALS_PATH", "/etc/fcm/key.json"),
            ("FCM_SCOPES", "scope-a, scope-b,"),
            ("FCM_OPEN_TIMEOUT_SECS", "5"),
            ("FCM_READ_TIMEOUT_SECS", "30"),
            ("FCM_PROXY", "http://proxy.local:3128"),
            ("FCM_PROXY_USER", "alice"),
            ("FCM_PROXY_PASSWORD", "secret"),
            ("FCM_DOMAIN", "http://localhost:9000"),
        ]))
        .unwrap();

        assert_eq!(
            config.credentials,
            CredentialSource::File(PathBuf::from("/etc/fcm/key.json"))
        );
        assert_eq!(config.scopes, vec!["scope-a", "scope-b"]);
        assert_eq!(config.open_timeout, Some(Duration::from_secs(5)));
        assert_eq!(config.read_timeout, Some(Duration::from_secs(30)));
        assert_eq!(config.domain, "http://localhost:9000");
        assert_eq!(config.topic_domain, DEFAULT_TOPIC_DOMAIN);

        let proxy = config.proxy.unwrap();
        assert_eq!(proxy.basic_auth(), Some(("alice", "secret")));
    }

    #[test]
    fn test_from_vars_env_proxy() {
        let config = FcmConfig::from_vars(vars(&[("FCM_PROXY", "ENV")])).unwrap();
        assert_eq!(config.proxy, Some(ProxyConfig::Environment));
    }

    #[test]
    fn test_from_vars_rejects_bad_timeout() {
        let result = FcmConfig::from_vars(vars(&[("FCM_READ_TIMEOUT_SECS", "soon")]));
        assert!(matches!(result, Err(FcmError::Config(_))));
    }

    #[test]
    fn test_blank_proxy_user_disables_basic_auth() {
        let proxy = ProxyConfig::Explicit {
            uri: "http://proxy.local:3128".into(),
            user: Some("  ".into()),
            password: Some("secret".into()),
        };
        assert_eq!(proxy.basic_auth(), None);

        let proxy = ProxyConfig::Explicit {
            uri: "http://proxy.local:3128".into(),
            user: Some("bob".into()),
            password: None,
        };
        assert_eq!(proxy.basic_auth(), Some(("bob", "")));
    }

    #[test]
    fn test_credential_debug_redacts_key_material() {
        let source = CredentialSource::Json(b"{\"private_key\":\"secret\"}".to_vec());
        let rendered = format!("{:?}", source);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("bytes"));
    }
}
