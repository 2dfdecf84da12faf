use serde::Deserialize;
use serde_json::Value;

use crate::model::candle::Candle;
use crate::model::tick::PriceTick;

/// Deserialize Binance string-encoded numbers to f64. "NaN" and "inf" are rejected.
pub fn string_to_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let v = s.parse::<f64>().map_err(serde::de::Error::custom)?;
    if !v.is_finite() {
        return Err(serde::de::Error::custom(format!("non-finite number '{}'", s)));
    }
    Ok(v)
}

/// Binance aggregate trade stream event (symbol@aggTrade).
#[derive(Debug, Deserialize)]
pub struct BinanceAggTradeEvent {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "E")]
    pub event_time: u64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "p", deserialize_with = "string_to_f64")]
    pub price: f64,
    #[serde(rename = "T")]
    pub trade_time: u64,
}

impl BinanceAggTradeEvent {
    pub fn into_tick(self) -> PriceTick {
        PriceTick {
            symbol: self.symbol,
            price: self.price,
            timestamp_ms: self.trade_time,
            source: "binance".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BinanceApiErrorResponse {
    pub code: i64,
    pub msg: String,
}

fn value_to_f64(v: &Value) -> Option<f64> {
    let f = match v {
        Value::String(s) => s.parse::<f64>().ok()?,
        Value::Number(n) => n.as_f64()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

fn value_to_u64(v: &Value) -> Option<u64> {
    match v {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        _ => None,
    }
}

/// Map one `/api/v3/klines` row into a candle.
///
/// Row layout: `[openTime, open, high, low, close, volume, closeTime, ...]`.
/// Rows that are short or carry unparsable fields yield `None`.
pub fn parse_kline_row(symbol: &str, row: &[Value]) -> Option<Candle> {
    if row.len() < 7 {
        return None;
    }
    let close_time = value_to_u64(&row[6])?;
    Some(Candle {
        symbol: symbol.to_string(),
        open_time: value_to_u64(&row[0])?,
        close_time,
        open: value_to_f64(&row[1])?,
        high: value_to_f64(&row[2])?,
        low: value_to_f64(&row[3])?,
        close: value_to_f64(&row[4])?,
        last_tick_ms: close_time,
    })
}
