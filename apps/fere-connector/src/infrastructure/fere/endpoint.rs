//! Endpoint Resolution
//!
//! Maps an agent kind to its streaming URL. Both endpoints carry the user id
//! as the last path segment and the API key as the `X-FRIDAY-KEY` query
//! parameter:
//!
//! - Chat: `wss://{host}/chat/v2/ws/{user_id}?X-FRIDAY-KEY={key}`
//! - Summary: `wss://{host}/market-analyzer/v2/ws/{user_id}?X-FRIDAY-KEY={key}`
//!
//! A host given with an explicit `ws://` or `wss://` scheme keeps it, which
//! lets local test servers run without TLS.

use crate::domain::request::{AgentKind, ConfigurationError};

/// Path prefix of the threaded-chat endpoint.
pub const DEFAULT_CHAT_PATH: &str = "/chat/v2/ws";

/// Path prefix of the market-summary endpoint.
pub const DEFAULT_SUMMARY_PATH: &str = "/market-analyzer/v2/ws";

/// Query parameter carrying the API key.
pub const API_KEY_PARAM: &str = "X-FRIDAY-KEY";

const DEFAULT_SCHEME: &str = "wss";

/// Resolves streaming URLs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointResolver {
    chat_path: String,
    summary_path: String,
}

impl Default for EndpointResolver {
    fn default() -> Self {
        Self::new(DEFAULT_CHAT_PATH, DEFAULT_SUMMARY_PATH)
    }
}

impl EndpointResolver {
    /// Create a resolver with custom path prefixes.
    #[must_use]
    pub fn new(chat_path: impl Into<String>, summary_path: impl Into<String>) -> Self {
        Self {
            chat_path: chat_path.into(),
            summary_path: summary_path.into(),
        }
    }

    /// Resolve the URL for an agent kind given by name.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::UnknownAgentKind` for an unrecognised
    /// name, or `ConfigurationError::EmptyValue` if the host or user id is
    /// blank.
    pub fn resolve(
        &self,
        agent_kind: &str,
        host: &str,
        user_id: &str,
        api_key: &str,
    ) -> Result<String, ConfigurationError> {
        let kind: AgentKind = agent_kind.parse()?;
        self.endpoint(kind, host, user_id, api_key)
    }

    /// Resolve the URL for an agent kind.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::EmptyValue` if the host or user id is
    /// blank.
    pub fn endpoint(
        &self,
        kind: AgentKind,
        host: &str,
        user_id: &str,
        api_key: &str,
    ) -> Result<String, ConfigurationError> {
        let (scheme, host) = split_scheme(host.trim());
        let host = host.trim_end_matches('/');
        if host.is_empty() {
            return Err(ConfigurationError::EmptyValue("host"));
        }

        let user_id = user_id.trim();
        if user_id.is_empty() {
            return Err(ConfigurationError::EmptyValue("user id"));
        }

        let path = match kind {
            AgentKind::ProAgent => &self.chat_path,
            AgentKind::MarketAnalyzer => &self.summary_path,
        };
        let path = path.trim_matches('/');

        let url = if path.is_empty() {
            format!("{scheme}://{host}/{}", urlencoding::encode(user_id))
        } else {
            format!("{scheme}://{host}/{path}/{}", urlencoding::encode(user_id))
        };

        Ok(format!(
            "{url}?{API_KEY_PARAM}={}",
            urlencoding::encode(api_key)
        ))
    }
}

fn split_scheme(host: &str) -> (&str, &str) {
    for scheme in ["wss", "ws"] {
        if let Some(rest) = host
            .strip_prefix(scheme)
            .and_then(|rest| rest.strip_prefix("://"))
        {
            return (scheme, rest);
        }
    }
    (DEFAULT_SCHEME, host)
}

/// Strip the API key from a URL before logging it.
#[must_use]
pub fn redact(url: &str) -> String {
    match url.split_once('?') {
        Some((base, _)) => format!("{base}?{API_KEY_PARAM}=[REDACTED]"),
        None => url.to_string(),
    }
}
