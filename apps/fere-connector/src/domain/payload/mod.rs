//! Wire Payload Construction
//!
//! Maps an [`AgentRequest`] to the single JSON object a session sends.
//!
//! # Wire Format
//!
//! ```json
//! {"agent":"ProAgent","stream":true,"x_hours":1,"message":"...","parent":"0"}
//! {"agent":"MarketAnalyzerAgent","stream":false,"x_hours":1,"parent":"0"}
//! ```
//!
//! The root-of-thread sentinel has been seen both as `"0"` and `0`. Which one
//! the builder emits is a [`RootSentinel`] setting; both request variants go
//! through the same conversion so they can never disagree.

use std::str::FromStr;

use serde::Serialize;

use super::request::{AgentRequest, ConfigurationError, ParentId, ROOT_PARENT_TOKEN};

// =============================================================================
// Root Sentinel
// =============================================================================

/// Wire representation of [`ParentId::Root`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RootSentinel {
    /// JSON string `"0"`.
    #[default]
    Text,
    /// JSON number `0`.
    Number,
}

impl RootSentinel {
    /// Get the configuration name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Number => "number",
        }
    }

    fn wire_value(self) -> WireParent {
        match self {
            Self::Text => WireParent::Text(ROOT_PARENT_TOKEN.to_string()),
            Self::Number => WireParent::Number(0),
        }
    }
}

impl FromStr for RootSentinel {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" | "string" => Ok(Self::Text),
            "number" | "numeric" => Ok(Self::Number),
            _ => Err(ConfigurationError::UnknownRootSentinel(s.to_string())),
        }
    }
}

// =============================================================================
// Wire Payload
// =============================================================================

/// The `parent` field as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum WireParent {
    /// String token (or the textual root sentinel).
    Text(String),
    /// Numeric root sentinel.
    Number(u64),
}

/// The JSON object sent exactly once per session. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WirePayload {
    agent: &'static str,
    stream: bool,
    x_hours: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    parent: WireParent,
}

impl WirePayload {
    /// The `agent` tag.
    #[must_use]
    pub const fn agent(&self) -> &'static str {
        self.agent
    }

    /// The `stream` flag.
    #[must_use]
    pub const fn stream(&self) -> bool {
        self.stream
    }

    /// The `x_hours` context window.
    #[must_use]
    pub const fn x_hours(&self) -> u32 {
        self.x_hours
    }

    /// The chat `message`, present only on threaded chat turns.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// The `parent` linkage.
    #[must_use]
    pub const fn parent(&self) -> &WireParent {
        &self.parent
    }

    /// Encode as a JSON text frame.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Encode as a JSON value.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

// =============================================================================
// Payload Builder
// =============================================================================

/// Builds [`WirePayload`]s. Holds the root sentinel representation.
#[derive(Debug, Clone, Copy, Default)]
pub struct PayloadBuilder {
    root: RootSentinel,
}

impl PayloadBuilder {
    /// Create a builder emitting `root` for the root-of-thread sentinel.
    #[must_use]
    pub const fn new(root: RootSentinel) -> Self {
        Self { root }
    }

    /// The configured root sentinel representation.
    #[must_use]
    pub const fn root_sentinel(&self) -> RootSentinel {
        self.root
    }

    /// Build the wire payload for `request`.
    #[must_use]
    pub fn build(&self, request: &AgentRequest) -> WirePayload {
        let agent = request.kind().as_str();
        let stream = request.stream();
        let x_hours = request.context_hours();

        match request {
            AgentRequest::ThreadedChat(turn) => WirePayload {
                agent,
                stream,
                x_hours,
                message: Some(turn.query_text.clone()),
                parent: self.parent(&turn.parent),
            },
            AgentRequest::MarketSummary(_) => WirePayload {
                agent,
                stream,
                x_hours,
                message: None,
                parent: self.parent(&ParentId::Root),
            },
        }
    }

    fn parent(&self, parent: &ParentId) -> WireParent {
        match parent {
            ParentId::Turn(token) if !ParentId::is_root_token(token) => {
                WireParent::Text(token.clone())
            }
            ParentId::Turn(_) | ParentId::Root => self.root.wire_value(),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use serde_json::json;
    use test_case::test_case;

    use super::*;
    use crate::domain::request::{MarketSummaryTurn, ThreadedChatTurn};

    const KOL_QUERY: &str = "Who are the top KOLs for $CHILLGUY?";

    fn keys(value: &serde_json::Value) -> Vec<String> {
        let mut keys: Vec<String> = value.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    #[test]
    fn chat_turn_payload() {
        let request = ThreadedChatTurn::new(KOL_QUERY)
            .with_parent(ParentId::Root)
            .with_context_hours(1)
            .streamed(true)
            .into();

        let payload = PayloadBuilder::default().build(&request);

        assert_eq!(
            payload.to_value().unwrap(),
            json!({
                "agent": "ProAgent",
                "stream": true,
                "x_hours": 1,
                "message": KOL_QUERY,
                "parent": "0",
            })
        );
    }

    #[test]
    fn chat_turn_carries_continuation_token() {
        let request = ThreadedChatTurn::new("and their reach?")
            .with_parent("5c2b9e0a-turn")
            .into();

        let payload = PayloadBuilder::new(RootSentinel::Number).build(&request);

        assert_eq!(
            payload.parent(),
            &WireParent::Text("5c2b9e0a-turn".to_string())
        );
    }

    #[test]
    fn market_summary_payload() {
        let request = MarketSummaryTurn::new(4).into();

        let payload = PayloadBuilder::default().build(&request);

        assert_eq!(
            payload.to_value().unwrap(),
            json!({
                "agent": "MarketAnalyzerAgent",
                "stream": false,
                "x_hours": 4,
                "parent": "0",
            })
        );
        assert_eq!(payload.message(), None);
    }

    #[test]
    fn empty_query_is_forwarded() {
        let request = ThreadedChatTurn::new("").into();
        let payload = PayloadBuilder::default().build(&request);
        assert_eq!(payload.message(), Some(""));
    }

    #[test_case(RootSentinel::Text, ParentId::parse("0"), json!("0") ; "text sentinel")]
    #[test_case(RootSentinel::Number, ParentId::parse("0"), json!(0) ; "numeric sentinel")]
    #[test_case(RootSentinel::Number, ParentId::Turn("0".to_string()), json!(0) ; "numeric sentinel from raw turn")]
    #[test_case(RootSentinel::Number, ParentId::Turn(" 0 ".to_string()), json!(0) ; "numeric sentinel from padded turn")]
    #[test_case(RootSentinel::Number, ParentId::Turn(String::new()), json!(0) ; "numeric sentinel from empty turn")]
    #[test_case(RootSentinel::Text, ParentId::Turn("0".to_string()), json!("0") ; "text sentinel from raw turn")]
    fn root_sentinel_is_consistent_across_variants(
        root: RootSentinel,
        parent: ParentId,
        expected: serde_json::Value,
    ) {
        let builder = PayloadBuilder::new(root);

        let chat = builder
            .build(&ThreadedChatTurn::new("q").with_parent(parent).into())
            .to_value()
            .unwrap();
        let summary = builder
            .build(&MarketSummaryTurn::new(1).into())
            .to_value()
            .unwrap();

        assert_eq!(chat["parent"], expected);
        assert_eq!(summary["parent"], expected);
        assert_eq!(chat["parent"], summary["parent"]);
    }

    #[test_case("text", RootSentinel::Text ; "text")]
    #[test_case("STRING", RootSentinel::Text ; "string alias")]
    #[test_case("number", RootSentinel::Number ; "number")]
    fn root_sentinel_parsing(input: &str, expected: RootSentinel) {
        assert_eq!(input.parse::<RootSentinel>().unwrap(), expected);
    }

    #[test]
    fn unknown_root_sentinel_rejected() {
        assert!("null".parse::<RootSentinel>().is_err());
    }

    #[test]
    fn json_text_keeps_field_order() {
        let payload = PayloadBuilder::default().build(&MarketSummaryTurn::new(1).streamed(true).into());
        assert_eq!(
            payload.to_json().unwrap(),
            r#"{"agent":"MarketAnalyzerAgent","stream":true,"x_hours":1,"parent":"0"}"#
        );
    }

    fn arb_request() -> impl Strategy<Value = AgentRequest> {
        let chat = (
            ".*",
            proptest::option::of("[a-z0-9-]{0,12}"),
            0u32..720,
            proptest::option::of(any::<bool>()),
        )
            .prop_map(|(query, parent, hours, stream)| {
                AgentRequest::ThreadedChat(ThreadedChatTurn {
                    query_text: query,
                    parent: parent.map_or(ParentId::Root, |p| ParentId::parse(&p)),
                    context_hours: hours,
                    stream,
                })
            });
        let summary = (0u32..720, proptest::option::of(any::<bool>())).prop_map(|(hours, stream)| {
            AgentRequest::MarketSummary(MarketSummaryTurn {
                context_hours: hours,
                stream,
            })
        });
        prop_oneof![chat, summary]
    }

    proptest! {
        #[test]
        fn payload_has_common_and_variant_fields(request in arb_request()) {
            let value = PayloadBuilder::default().build(&request).to_value().unwrap();

            prop_assert_eq!(&value["agent"], &json!(request.kind().as_str()));
            prop_assert_eq!(&value["x_hours"], &json!(request.context_hours()));
            match &request {
                AgentRequest::ThreadedChat(turn) => {
                    prop_assert_eq!(keys(&value), vec!["agent", "message", "parent", "stream", "x_hours"]);
                    prop_assert_eq!(&value["message"], &json!(turn.query_text));
                    prop_assert_eq!(&value["stream"], &json!(turn.stream.unwrap_or(false)));
                }
                AgentRequest::MarketSummary(turn) => {
                    prop_assert_eq!(keys(&value), vec!["agent", "parent", "stream", "x_hours"]);
                    prop_assert_eq!(&value["parent"], &json!("0"));
                    prop_assert_eq!(&value["stream"], &json!(turn.stream.unwrap_or(false)));
                }
            }
        }

        #[test]
        fn stream_defaults_to_false(hours in 0u32..720, query in ".*") {
            let builder = PayloadBuilder::default();
            let chat = builder.build(&ThreadedChatTurn::new(query).with_context_hours(hours).into());
            let summary = builder.build(&MarketSummaryTurn::new(hours).into());
            prop_assert!(!chat.stream());
            prop_assert!(!summary.stream());
        }
    }
}
