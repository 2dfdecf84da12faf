use serde::Serialize;

use crate::model::signal::{BreakoutEvent, TrendChange};
use crate::model::tick::PriceTick;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum WsConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
    Reconnecting { attempt: u32, delay_ms: u64 },
}

/// Everything the engine publishes to subscribers, tagged by `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MarketEvent {
    Price(PriceTick),
    TrendChange(TrendChange),
    Breakout(BreakoutEvent),
}

impl MarketEvent {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
