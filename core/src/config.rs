//! Client configuration and credential resolution.
//!
//! # Design
//! `ClientConfigBuilder` collects the raw inputs and `build()` validates
//! them once. A token provider is called inside `build()`, exactly once; the
//! resulting bearer token is frozen into the config and never refreshed.

use std::fmt;

use crate::error::{BoxError, FaceError};

/// User agent sent in `x-ms-useragent` when none is configured.
pub const DEFAULT_USER_AGENT: &str = "cu-face-sample-code";

pub const ENDPOINT_ENV: &str = "CONTENT_UNDERSTANDING_ENDPOINT";
pub const API_VERSION_ENV: &str = "CONTENT_UNDERSTANDING_API_VERSION";
pub const SUBSCRIPTION_KEY_ENV: &str = "CONTENT_UNDERSTANDING_SUBSCRIPTION_KEY";
pub const USER_AGENT_ENV: &str = "CONTENT_UNDERSTANDING_USER_AGENT";

pub(crate) const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
pub(crate) const AUTHORIZATION_HEADER: &str = "Authorization";
pub(crate) const USER_AGENT_HEADER: &str = "x-ms-useragent";

type TokenProvider = Box<dyn FnOnce() -> Result<String, BoxError>>;

enum CredentialSource {
    Key(String),
    Provider(TokenProvider),
}

/// How requests authenticate.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    SubscriptionKey(String),
    BearerToken(String),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::SubscriptionKey(_) => f.write_str("SubscriptionKey(<redacted>)"),
            Credential::BearerToken(_) => f.write_str("BearerToken(<redacted>)"),
        }
    }
}

/// Validated, immutable client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    endpoint: String,
    api_version: String,
    credential: Credential,
    user_agent: String,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Builder pre-populated from the `CONTENT_UNDERSTANDING_*` environment
    /// variables. Unset variables stay empty and are reported by `build()`.
    pub fn builder_from_env() -> ClientConfigBuilder {
        ClientConfigBuilder::from_lookup(|name| std::env::var(name).ok())
    }

    /// Base URL with any trailing slash removed.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// Authentication and user-agent headers attached to every request.
    pub fn headers(&self) -> Vec<(String, String)> {
        let auth = match &self.credential {
            Credential::SubscriptionKey(key) => (SUBSCRIPTION_KEY_HEADER.to_string(), key.clone()),
            Credential::BearerToken(token) => {
                (AUTHORIZATION_HEADER.to_string(), format!("Bearer {token}"))
            }
        };
        vec![
            auth,
            (USER_AGENT_HEADER.to_string(), self.user_agent.clone()),
        ]
    }
}

/// Collects configuration inputs; see `ClientConfig::builder`.
#[derive(Default)]
pub struct ClientConfigBuilder {
    endpoint: Option<String>,
    api_version: Option<String>,
    subscription_key: Option<String>,
    token_provider: Option<TokenProvider>,
    user_agent: Option<String>,
}

impl ClientConfigBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = Some(api_version.into());
        self
    }

    pub fn subscription_key(mut self, key: impl Into<String>) -> Self {
        self.subscription_key = Some(key.into());
        self
    }

    /// Source of a bearer token, called once by `build()`.
    pub fn token_provider<F, E>(mut self, provider: F) -> Self
    where
        F: FnOnce() -> Result<String, E> + 'static,
        E: Into<BoxError>,
    {
        self.token_provider = Some(Box::new(move || {
            provider().map_err(Into::<BoxError>::into)
        }));
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            endpoint: lookup(ENDPOINT_ENV),
            api_version: lookup(API_VERSION_ENV),
            subscription_key: lookup(SUBSCRIPTION_KEY_ENV),
            token_provider: None,
            user_agent: lookup(USER_AGENT_ENV),
        }
    }

    /// Validate the inputs and resolve the credential.
    ///
    /// Credentials are checked first, then the API version, then the
    /// endpoint. An empty subscription key counts as absent.
    pub fn build(self) -> Result<ClientConfig, FaceError> {
        let subscription_key = self.subscription_key.filter(|key| !key.is_empty());
        let credential_source = match (subscription_key, self.token_provider) {
            (None, None) => {
                return Err(FaceError::config(
                    "either subscription key or token provider must be provided",
                ))
            }
            (Some(_), Some(_)) => {
                return Err(FaceError::config(
                    "subscription key and token provider are mutually exclusive",
                ))
            }
            (Some(key), None) => CredentialSource::Key(key),
            (None, Some(provider)) => CredentialSource::Provider(provider),
        };

        let api_version = non_empty(self.api_version)
            .ok_or_else(|| FaceError::config("API version must be provided"))?;
        let endpoint = non_empty(self.endpoint)
            .ok_or_else(|| FaceError::config("endpoint must be provided"))?;

        let credential = match credential_source {
            CredentialSource::Key(key) => Credential::SubscriptionKey(key),
            CredentialSource::Provider(provider) => {
                let token = provider().map_err(FaceError::TokenProvider)?;
                Credential::BearerToken(token)
            }
        };

        Ok(ClientConfig {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_version,
            credential,
            user_agent: self
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        })
    }
}

impl fmt::Debug for ClientConfigBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfigBuilder")
            .field("endpoint", &self.endpoint)
            .field("api_version", &self.api_version)
            .field("subscription_key", &self.subscription_key.as_ref().map(|_| "<redacted>"))
            .field("token_provider", &self.token_provider.is_some())
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::rc::Rc;

    use super::*;

    fn base() -> ClientConfigBuilder {
        ClientConfig::builder()
            .endpoint("https://example.cognitiveservices.azure.com/")
            .api_version("2025-05-01-preview")
    }

    #[test]
    fn subscription_key_sets_key_header_only() {
        let config = base().subscription_key("secret").build().unwrap();
        let headers = config.headers();
        assert_eq!(
            headers,
            vec![
                ("Ocp-Apim-Subscription-Key".to_string(), "secret".to_string()),
                ("x-ms-useragent".to_string(), DEFAULT_USER_AGENT.to_string()),
            ]
        );
        assert!(!headers.iter().any(|(k, _)| k == "Authorization"));
    }

    #[test]
    fn token_provider_sets_bearer_header_and_runs_once() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let config = base()
            .token_provider(move || {
                counter.set(counter.get() + 1);
                Ok::<_, BoxError>("tok-123".to_string())
            })
            .user_agent("my-agent")
            .build()
            .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(config.credential(), &Credential::BearerToken("tok-123".to_string()));
        let headers = config.headers();
        assert!(headers.contains(&("Authorization".to_string(), "Bearer tok-123".to_string())));
        assert!(headers.contains(&("x-ms-useragent".to_string(), "my-agent".to_string())));
        assert!(!headers.iter().any(|(k, _)| k == "Ocp-Apim-Subscription-Key"));

        let _ = config.headers();
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn missing_credentials_is_a_config_error() {
        let err = base().build().unwrap_err();
        assert!(matches!(err, FaceError::Config(_)));
    }

    #[test]
    fn empty_subscription_key_counts_as_missing() {
        let err = base().subscription_key("").build().unwrap_err();
        assert!(matches!(err, FaceError::Config(_)));
    }

    #[test]
    fn both_credentials_is_a_config_error() {
        let err = base()
            .subscription_key("secret")
            .token_provider(|| Ok::<_, BoxError>("tok".to_string()))
            .build()
            .unwrap_err();
        assert!(matches!(err, FaceError::Config(_)));
    }

    #[test]
    fn empty_endpoint_or_version_is_a_config_error() {
        let err = ClientConfig::builder()
            .endpoint("")
            .api_version("2025-05-01-preview")
            .subscription_key("secret")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("endpoint"));

        let err = ClientConfig::builder()
            .endpoint("https://example.com")
            .api_version("")
            .subscription_key("secret")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("API version"));
    }

    #[test]
    fn credentials_are_checked_before_endpoint() {
        let err = ClientConfig::builder()
            .endpoint("")
            .api_version("2025-05-01-preview")
            .build()
            .unwrap_err();
        assert!(matches!(err, FaceError::Config(_)));
        let message = err.to_string();
        assert!(message.contains("subscription key"), "{message}");
        assert!(!message.contains("endpoint"), "{message}");
    }

    #[test]
    fn token_provider_not_called_when_endpoint_missing() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let err = ClientConfig::builder()
            .endpoint("")
            .api_version("2025-05-01-preview")
            .token_provider(move || {
                counter.set(counter.get() + 1);
                Ok::<_, BoxError>("tok".to_string())
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, FaceError::Config(_)));
        assert!(err.to_string().contains("endpoint"));
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn failing_token_provider_fails_build() {
        let err = base()
            .token_provider(|| Err::<String, _>("identity unavailable"))
            .build()
            .unwrap_err();
        assert!(matches!(err, FaceError::TokenProvider(_)));
        assert!(err.to_string().contains("identity unavailable"));
    }

    #[test]
    fn trailing_slash_is_stripped() {
        let config = base().subscription_key("secret").build().unwrap();
        assert_eq!(config.endpoint(), "https://example.cognitiveservices.azure.com");
    }

    #[test]
    fn builder_reads_environment_lookup() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENDPOINT_ENV, "https://env.example.com"),
            (API_VERSION_ENV, "2025-05-01-preview"),
            (SUBSCRIPTION_KEY_ENV, "env-key"),
        ]);
        let config = ClientConfigBuilder::from_lookup(|name| env.get(name).map(|v| v.to_string()))
            .build()
            .unwrap();
        assert_eq!(config.endpoint(), "https://env.example.com");
        assert_eq!(config.credential(), &Credential::SubscriptionKey("env-key".to_string()));
        assert_eq!(config.user_agent(), DEFAULT_USER_AGENT);
    }

    #[test]
    fn credential_debug_hides_secret() {
        let debug = format!("{:?}", Credential::SubscriptionKey("secret".to_string()));
        assert!(!debug.contains("secret"));
    }
}
