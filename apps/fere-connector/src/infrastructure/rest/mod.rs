//! Trading-Agent REST Client
//!
//! Wraps the managed trading-agent API: agent lifecycle, portfolio state,
//! and scheduled buy/sell tasks.

mod client;
mod types;

pub use client::{RestError, TradingAgentClient};
pub use types::{CreateAgentParams, UpdateAgentParams};
