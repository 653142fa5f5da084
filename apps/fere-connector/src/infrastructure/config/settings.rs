//! Connector Configuration Settings
//!
//! Configuration types for the connector, loaded from environment variables.

use std::time::Duration;

use crate::application::services::SessionSettings;
use crate::application::services::idle::IdleTimeoutConfig;
use crate::domain::payload::{PayloadBuilder, RootSentinel};
use crate::domain::request::{
    AgentKind, AgentRequest, MarketSummaryTurn, ParentId, ThreadedChatTurn,
};
use crate::infrastructure::fere::endpoint::{DEFAULT_CHAT_PATH, DEFAULT_SUMMARY_PATH};

/// Default streaming host.
pub const DEFAULT_HOST: &str = "api.fereai.xyz";

/// Default base URL of the trading-agent REST API.
pub const DEFAULT_REST_BASE_URL: &str = "https://api.fereai.xyz/ta";

/// Fere API credentials.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    user_id: String,
}

impl Credentials {
    /// Create new credentials.
    #[must_use]
    pub const fn new(api_key: String, user_id: String) -> Self {
        Self { api_key, user_id }
    }

    /// Get the API key.
    #[must_use]
    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Get the user id.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[REDACTED]")
            .field("user_id", &self.user_id)
            .finish()
    }
}

/// Streaming endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSettings {
    /// Host serving the WebSocket endpoints.
    pub host: String,
    /// Path prefix of the threaded-chat endpoint.
    pub chat_path: String,
    /// Path prefix of the market-summary endpoint.
    pub summary_path: String,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            chat_path: DEFAULT_CHAT_PATH.to_string(),
            summary_path: DEFAULT_SUMMARY_PATH.to_string(),
        }
    }
}

/// The request the binary sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSettings {
    /// Agent to address.
    pub agent: AgentKind,
    /// Chat query text. Ignored by the market analyzer.
    pub query: String,
    /// Continuation token. Ignored by the market analyzer.
    pub parent: ParentId,
    /// Lookback window in hours.
    pub context_hours: u32,
    /// Whether to ask for incremental frames.
    pub stream: bool,
    /// Wire representation of the root parent.
    pub root_parent: RootSentinel,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            agent: AgentKind::ProAgent,
            query: String::new(),
            parent: ParentId::Root,
            context_hours: 1,
            stream: true,
            root_parent: RootSentinel::Text,
        }
    }
}

impl RequestSettings {
    /// Build the agent request these settings describe.
    #[must_use]
    pub fn to_request(&self) -> AgentRequest {
        match self.agent {
            AgentKind::ProAgent => ThreadedChatTurn::new(self.query.clone())
                .with_parent(self.parent.clone())
                .with_context_hours(self.context_hours)
                .streamed(self.stream)
                .into(),
            AgentKind::MarketAnalyzer => MarketSummaryTurn::new(self.context_hours)
                .streamed(self.stream)
                .into(),
        }
    }

    /// Payload builder using the configured root representation.
    #[must_use]
    pub const fn payload_builder(&self) -> PayloadBuilder {
        PayloadBuilder::new(self.root_parent)
    }
}

/// REST client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestSettings {
    /// Base URL, without a trailing slash.
    pub base_url: String,
    /// Per-request timeout.
    pub request_timeout: Duration,
}

impl Default for RestSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_REST_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Complete connector configuration.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// API credentials.
    pub credentials: Credentials,
    /// Streaming endpoint settings.
    pub endpoint: EndpointSettings,
    /// Request settings.
    pub request: RequestSettings,
    /// Session timing settings.
    pub session: SessionSettings,
    /// REST client settings.
    pub rest: RestSettings,
    /// Prometheus metrics port (0 = disabled).
    pub metrics_port: u16,
}

impl ConnectorConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or
    /// empty, or if the agent kind or root representation is unknown.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// See [`ConnectorConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup: &lookup };

        let api_key = env.required("FERE_API_KEY")?;
        let user_id = env.required("FERE_USER_ID")?;

        let endpoint_defaults = EndpointSettings::default();
        let endpoint = EndpointSettings {
            host: env.string_or("FERE_HOST", endpoint_defaults.host),
            chat_path: env.string_or("FERE_CHAT_WS_PATH", endpoint_defaults.chat_path),
            summary_path: env.string_or("FERE_SUMMARY_WS_PATH", endpoint_defaults.summary_path),
        };

        let request_defaults = RequestSettings::default();
        let request = RequestSettings {
            agent: env.parsed("FERE_AGENT", request_defaults.agent)?,
            query: env.get("FERE_QUERY").unwrap_or_default(),
            parent: env
                .get("FERE_PARENT_ID")
                .map_or(request_defaults.parent, |v| ParentId::parse(&v)),
            context_hours: env.number("FERE_CONTEXT_HOURS", request_defaults.context_hours),
            stream: env.flag("FERE_STREAM", request_defaults.stream),
            root_parent: env.parsed("FERE_ROOT_PARENT", request_defaults.root_parent)?,
        };

        let session_defaults = SessionSettings::default();
        let session = SessionSettings {
            idle: IdleTimeoutConfig::new(env.duration_secs(
                "FERE_IDLE_TIMEOUT_SECS",
                session_defaults.idle.idle_window,
            )),
            close_timeout: env
                .duration_secs("FERE_CLOSE_TIMEOUT_SECS", session_defaults.close_timeout),
        };

        let rest_defaults = RestSettings::default();
        let rest = RestSettings {
            base_url: env
                .string_or("FERE_REST_BASE_URL", rest_defaults.base_url)
                .trim_end_matches('/')
                .to_string(),
            request_timeout: env
                .duration_secs("FERE_REQUEST_TIMEOUT_SECS", rest_defaults.request_timeout),
        };

        Ok(Self {
            credentials: Credentials::new(api_key, user_id),
            endpoint,
            request,
            session,
            rest,
            metrics_port: env.number("FERE_METRICS_PORT", 0),
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable could not be interpreted.
    #[error("invalid value for {key}: {reason}")]
    Invalid {
        /// Variable name.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

// =============================================================================
// Variable Parsing
// =============================================================================

struct Env<'a, F: Fn(&str) -> Option<String>> {
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Trimmed, non-empty value.
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        let raw = (self.lookup)(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))?;
        let value = raw.trim();
        if value.is_empty() {
            return Err(ConfigError::EmptyValue(key.to_string()));
        }
        Ok(value.to_string())
    }

    fn string_or(&self, key: &str, default: String) -> String {
        self.get(key).unwrap_or(default)
    }

    fn parsed<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key: key.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    fn number<T: std::str::FromStr + Copy + std::fmt::Display>(&self, key: &str, default: T) -> T {
        match self.get(key) {
            None => default,
            Some(v) => v.parse().unwrap_or_else(|_| {
                tracing::warn!(key, value = %v, %default, "Ignoring unparseable value");
                default
            }),
        }
    }

    fn flag(&self, key: &str, default: bool) -> bool {
        match self.get(key).map(|v| v.to_lowercase()) {
            None => default,
            Some(v) => match v.as_str() {
                "true" | "1" | "yes" | "on" => true,
                "false" | "0" | "no" | "off" => false,
                _ => {
                    tracing::warn!(key, value = %v, default, "Ignoring unparseable flag");
                    default
                }
            },
        }
    }

    fn duration_secs(&self, key: &str, default: Duration) -> Duration {
        Duration::from_secs(self.number(key, default.as_secs()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use test_case::test_case;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<ConnectorConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ConnectorConfig::from_lookup(|key| map.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 2] = [("FERE_API_KEY", "key-123"), ("FERE_USER_ID", "u1")];

    #[test]
    fn defaults_with_only_required_vars() {
        let config = load(&REQUIRED).unwrap();

        assert_eq!(config.credentials.api_key(), "key-123");
        assert_eq!(config.credentials.user_id(), "u1");
        assert_eq!(config.endpoint, EndpointSettings::default());
        assert_eq!(config.endpoint.host, "api.fereai.xyz");
        assert_eq!(config.request, RequestSettings::default());
        assert_eq!(config.session, SessionSettings::default());
        assert_eq!(config.session.idle.idle_window, Duration::from_secs(300));
        assert_eq!(config.session.close_timeout, Duration::from_secs(5));
        assert_eq!(config.rest.base_url, "https://api.fereai.xyz/ta");
        assert_eq!(config.rest.request_timeout, Duration::from_secs(30));
        assert_eq!(config.metrics_port, 0);
    }

    #[test_case("FERE_API_KEY" ; "api key")]
    #[test_case("FERE_USER_ID" ; "user id")]
    fn missing_required_var(key: &str) {
        let vars: Vec<_> = REQUIRED.iter().copied().filter(|(k, _)| *k != key).collect();
        let err = load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(k) if k == key));
    }

    #[test]
    fn blank_required_var_is_empty_value() {
        let err = load(&[("FERE_API_KEY", "  "), ("FERE_USER_ID", "u1")]).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyValue(k) if k == "FERE_API_KEY"));
    }

    #[test]
    fn overrides_are_applied() {
        let mut vars = REQUIRED.to_vec();
        vars.extend([
            ("FERE_HOST", "staging.fereai.xyz"),
            ("FERE_AGENT", "MarketAnalyzerAgent"),
            ("FERE_CONTEXT_HOURS", "24"),
            ("FERE_STREAM", "no"),
            ("FERE_ROOT_PARENT", "number"),
            ("FERE_IDLE_TIMEOUT_SECS", "60"),
            ("FERE_CLOSE_TIMEOUT_SECS", "2"),
            ("FERE_REST_BASE_URL", "http://localhost:8000/ta/"),
            ("FERE_METRICS_PORT", "9102"),
        ]);
        let config = load(&vars).unwrap();

        assert_eq!(config.endpoint.host, "staging.fereai.xyz");
        assert_eq!(config.request.agent, AgentKind::MarketAnalyzer);
        assert_eq!(config.request.context_hours, 24);
        assert!(!config.request.stream);
        assert_eq!(config.request.root_parent, RootSentinel::Number);
        assert_eq!(config.session.idle.idle_window, Duration::from_secs(60));
        assert_eq!(config.session.close_timeout, Duration::from_secs(2));
        assert_eq!(config.rest.base_url, "http://localhost:8000/ta");
        assert_eq!(config.metrics_port, 9102);
    }

    #[test]
    fn unknown_agent_is_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("FERE_AGENT", "TraderAgent"));
        let err = load(&vars).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key, .. } if key == "FERE_AGENT"));
    }

    #[test]
    fn unparseable_number_falls_back_to_default() {
        let mut vars = REQUIRED.to_vec();
        vars.push(("FERE_CONTEXT_HOURS", "a day"));
        assert_eq!(load(&vars).unwrap().request.context_hours, 1);
    }

    #[test_case("0", ParentId::Root ; "textual zero is root")]
    #[test_case("turn-42", ParentId::Turn("turn-42".to_string()) ; "turn token")]
    fn parent_id_from_env(raw: &str, expected: ParentId) {
        let mut vars = REQUIRED.to_vec();
        vars.push(("FERE_PARENT_ID", raw));
        assert_eq!(load(&vars).unwrap().request.parent, expected);
    }

    #[test]
    fn request_settings_build_chat_turn() {
        let settings = RequestSettings {
            query: "What is BTC doing?".to_string(),
            parent: ParentId::Turn("t-1".to_string()),
            context_hours: 4,
            ..RequestSettings::default()
        };

        let request = settings.to_request();

        assert_eq!(request.kind(), AgentKind::ProAgent);
        assert_eq!(request.context_hours(), 4);
        assert!(request.stream());
        assert!(matches!(
            request,
            AgentRequest::ThreadedChat(ref turn) if turn.parent == ParentId::Turn("t-1".to_string())
        ));
    }

    #[test]
    fn request_settings_build_market_summary() {
        let settings = RequestSettings {
            agent: AgentKind::MarketAnalyzer,
            query: "ignored".to_string(),
            stream: false,
            ..RequestSettings::default()
        };

        let request = settings.to_request();

        assert_eq!(request.kind(), AgentKind::MarketAnalyzer);
        assert!(!request.stream());
    }

    #[test]
    fn credentials_redacted_debug() {
        let creds = Credentials::new("key123".to_string(), "user-9".to_string());
        let debug = format!("{creds:?}");
        assert!(!debug.contains("key123"));
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("user-9"));
    }
}
