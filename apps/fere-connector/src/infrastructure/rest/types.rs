//! Trading-agent request bodies.

use rust_decimal::Decimal;
use serde::Serialize;

/// Body of `PUT /agent/{user_id}/`.
///
/// Numeric fields default to zero and `dry_run` to `false`, which is what
/// the backend expects when a caller leaves them out.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct CreateAgentParams {
    /// Owner of the agent. Filled from the client's credentials when empty.
    pub user_id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Persona prompt.
    pub persona: String,
    /// Data source identifier.
    pub data_source: String,
    /// Prompt used when picking from the token pool.
    pub decision_prompt_pool: String,
    /// Prompt used when managing the portfolio.
    pub decision_prompt_portfolio: String,
    /// Linked Twitter handle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_username: Option<String>,
    /// Linked Farcaster handle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fc_username: Option<String>,
    /// Simulate trades instead of executing them.
    pub dry_run: bool,
    /// Starting balance of a simulated agent, in USD.
    #[serde(with = "rust_decimal::serde::float")]
    pub dry_run_initial_usd: Decimal,
    /// Spend cap per trading session, in USD.
    #[serde(with = "rust_decimal::serde::float")]
    pub max_investment_per_session: Decimal,
    /// Stop loss as a fraction.
    #[serde(with = "rust_decimal::serde::float")]
    pub stop_loss: Decimal,
    /// Trailing stop loss as a fraction.
    #[serde(with = "rust_decimal::serde::float")]
    pub trailing_stop_loss: Decimal,
    /// Take profit as a fraction.
    #[serde(with = "rust_decimal::serde::float")]
    pub take_profit: Decimal,
}

impl CreateAgentParams {
    /// Create parameters with the required text fields.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        persona: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            persona: persona.into(),
            ..Self::default()
        }
    }

    /// Run the agent against a simulated balance.
    #[must_use]
    pub const fn simulated(mut self, initial_usd: Decimal) -> Self {
        self.dry_run = true;
        self.dry_run_initial_usd = initial_usd;
        self
    }
}

/// Body of `PATCH /agent/{agent_id}/`. Only set fields are sent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct UpdateAgentParams {
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Free-form description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Persona prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
    /// Data source identifier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
    /// Prompt used when picking from the token pool.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_prompt_pool: Option<String>,
    /// Prompt used when managing the portfolio.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_prompt_portfolio: Option<String>,
    /// Linked Twitter handle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub twitter_username: Option<String>,
    /// Linked Farcaster handle.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fc_username: Option<String>,
    /// Simulate trades instead of executing them.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    /// Starting balance of a simulated agent, in USD.
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub dry_run_initial_usd: Option<Decimal>,
    /// Spend cap per trading session, in USD.
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub max_investment_per_session: Option<Decimal>,
    /// Stop loss as a fraction.
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub stop_loss: Option<Decimal>,
    /// Trailing stop loss as a fraction.
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub trailing_stop_loss: Option<Decimal>,
    /// Take profit as a fraction.
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub take_profit: Option<Decimal>,
}

impl UpdateAgentParams {
    /// Check whether any field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
