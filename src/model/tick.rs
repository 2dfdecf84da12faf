use serde::{Deserialize, Serialize};

/// A single observed trade price for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceTick {
    pub symbol: String,
    pub price: f64,
    pub timestamp_ms: u64,
    pub source: String,
}

impl PriceTick {
    pub fn new(symbol: impl Into<String>, price: f64, timestamp_ms: u64, source: &str) -> Self {
        Self {
            symbol: symbol.into(),
            price,
            timestamp_ms,
            source: source.to_string(),
        }
    }

    /// Synthetic tick from a completed candle's close, used when replaying history.
    pub fn from_candle_close(candle: &super::candle::Candle) -> Self {
        Self {
            symbol: candle.symbol.clone(),
            price: candle.close,
            timestamp_ms: candle.close_time,
            source: "backtest".to_string(),
        }
    }
}
