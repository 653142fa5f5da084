//! Trading-agent HTTP client.
//!
//! Every call resolves to `Some(body)` on a 2xx response and `None`
//! otherwise. Failures are logged and counted, never retried.

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use super::types::{CreateAgentParams, UpdateAgentParams};
use crate::infrastructure::config::{Credentials, RestSettings};
use crate::infrastructure::metrics::{self, RestOutcome};

/// Header carrying the API key. Header names are case-insensitive on the
/// wire; `http` requires the lowercase form.
const API_KEY_HEADER: HeaderName = HeaderName::from_static("x-friday-key");

/// Errors building the client or completing a call.
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// The API key cannot be sent as a header.
    #[error("API key is not a valid header value")]
    InvalidApiKey,

    /// The HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Build(String),

    /// The request did not complete.
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {body}")]
    Status {
        /// Status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The response body was not JSON.
    #[error("failed to decode response: {0}")]
    Decode(String),
}

/// Client for the managed trading-agent API.
#[derive(Debug, Clone)]
pub struct TradingAgentClient {
    client: Client,
    base_url: String,
    user_id: String,
}

impl TradingAgentClient {
    /// Create a client.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key cannot be used as a header or the
    /// HTTP client fails to build.
    pub fn new(settings: &RestSettings, credentials: &Credentials) -> Result<Self, RestError> {
        let mut key =
            HeaderValue::from_str(credentials.api_key()).map_err(|_| RestError::InvalidApiKey)?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(API_KEY_HEADER, key);

        let client = Client::builder()
            .timeout(settings.request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| RestError::Build(e.to_string()))?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            user_id: credentials.user_id().to_string(),
        })
    }

    // =========================================================================
    // Agent Lifecycle
    // =========================================================================

    /// Create an agent owned by this user.
    pub async fn create_agent(&self, params: CreateAgentParams) -> Option<Value> {
        let mut params = params;
        if params.user_id.is_empty() {
            params.user_id.clone_from(&self.user_id);
        }
        let path = format!("/agent/{}/", seg(&self.user_id));
        self.call("create_agent", Method::PUT, &path, Some(&params))
            .await
    }

    /// List this user's agents.
    pub async fn list_agents(&self) -> Option<Value> {
        let path = format!("/agent/{}/", seg(&self.user_id));
        self.call("list_agents", Method::GET, &path, None::<&()>).await
    }

    /// Update an agent's settings.
    pub async fn update_agent(&self, agent_id: &str, params: &UpdateAgentParams) -> Option<Value> {
        let path = format!("/agent/{}/", seg(agent_id));
        self.call("update_agent", Method::PATCH, &path, Some(params))
            .await
    }

    /// Delete an agent.
    pub async fn delete_agent(&self, agent_id: &str) -> Option<Value> {
        let path = format!("/agent/{}/", seg(agent_id));
        self.call("delete_agent", Method::DELETE, &path, None::<&()>)
            .await
    }

    // =========================================================================
    // Agent State
    // =========================================================================

    /// Current portfolio.
    pub async fn portfolio(&self, agent_id: &str) -> Option<Value> {
        self.agent_get("portfolio", agent_id).await
    }

    /// Current holdings.
    pub async fn holdings(&self, agent_id: &str) -> Option<Value> {
        self.agent_get("holdings", agent_id).await
    }

    /// Executed trades.
    pub async fn trades(&self, agent_id: &str) -> Option<Value> {
        self.agent_get("trades", agent_id).await
    }

    /// Trading decisions the agent has made.
    pub async fn decisions(&self, agent_id: &str) -> Option<Value> {
        self.agent_get("decisions", agent_id).await
    }

    // =========================================================================
    // Trading Tasks
    // =========================================================================

    /// Schedule a buy pass. The response carries a task id.
    pub async fn schedule_buy(&self, agent_id: &str) -> Option<Value> {
        let path = format!("/agent/{}/buy/", seg(agent_id));
        self.call("schedule_buy", Method::GET, &path, None::<&()>)
            .await
    }

    /// Schedule a sale of `quantity` units of a holding. The response
    /// carries a task id.
    pub async fn schedule_sell(
        &self,
        agent_id: &str,
        holding_id: &str,
        quantity: Decimal,
    ) -> Option<Value> {
        let path = format!(
            "/agent/{}/sell/{}/{}/",
            seg(agent_id),
            seg(holding_id),
            quantity.normalize()
        );
        self.call("schedule_sell", Method::POST, &path, Some(&serde_json::json!({})))
            .await
    }

    /// Status of a scheduled task.
    pub async fn task_status(&self, task_id: &str) -> Option<Value> {
        let path = format!("/task/status/{}/", seg(task_id));
        self.call("task_status", Method::GET, &path, None::<&()>)
            .await
    }

    // =========================================================================
    // Request Plumbing
    // =========================================================================

    async fn agent_get(&self, operation: &'static str, agent_id: &str) -> Option<Value> {
        let path = format!("/agent/{}/{operation}/", seg(agent_id));
        self.call(operation, Method::GET, &path, None::<&()>).await
    }

    async fn call<B: Serialize + Sync>(
        &self,
        operation: &'static str,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Option<Value> {
        match self.request(method, path, body).await {
            Ok(value) => {
                metrics::record_rest_request(operation, RestOutcome::Success);
                tracing::debug!(operation, "Trading-agent request succeeded");
                Some(value)
            }
            Err(e) => {
                let outcome = if matches!(e, RestError::Status { .. }) {
                    RestOutcome::Status
                } else {
                    RestOutcome::Failed
                };
                metrics::record_rest_request(operation, outcome);
                tracing::warn!(operation, error = %e, "Trading-agent request failed");
                None
            }
        }
    }

    async fn request<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Value, RestError> {
        let url = format!("{}{path}", self.base_url);
        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RestError::Network(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RestError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(RestError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).map_err(|e| RestError::Decode(e.to_string()))
    }
}

fn seg(value: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(value)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn settings(base_url: &str) -> RestSettings {
        RestSettings {
            base_url: base_url.to_string(),
            request_timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = TradingAgentClient::new(
            &settings("https://api.fereai.xyz/ta/"),
            &Credentials::new("k".to_string(), "u".to_string()),
        )
        .unwrap();
        assert_eq!(client.base_url, "https://api.fereai.xyz/ta");
    }

    #[test]
    fn newline_in_key_is_rejected() {
        let err = TradingAgentClient::new(
            &settings("https://api.fereai.xyz/ta"),
            &Credentials::new("bad\nkey".to_string(), "u".to_string()),
        )
        .unwrap_err();
        assert!(matches!(err, RestError::InvalidApiKey));
    }

    #[test]
    fn path_segments_are_encoded() {
        assert_eq!(seg("a/b c"), "a%2Fb%20c");
    }
}
