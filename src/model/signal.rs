use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confirmed flip of the fast/slow EMA ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendChange {
    pub symbol: String,
    pub trend: Direction,
    pub fast_ema: f64,
    pub slow_ema: f64,
    pub price: f64,
    pub timestamp_ms: u64,
}

/// A candle close beyond the recent high/low of the lookback window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakoutEvent {
    pub symbol: String,
    pub dir: Direction,
    pub price: f64,
    /// The broken high (up) or low (down).
    pub level: f64,
    pub pct: f64,
    pub lookback_ms: u64,
    pub candle_end_ms: u64,
    pub timestamp_ms: u64,
}
