use serde::{Deserialize, Serialize};

use super::tick::PriceTick;

const DEFAULT_INTERVAL_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub symbol: String,
    pub open_time: u64,
    pub close_time: u64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub last_tick_ms: u64,
}

/// The candle currently being filled by ticks from one time bucket.
#[derive(Debug, Clone)]
pub struct CandleBuilder {
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub open_time: u64,
    pub close_time: u64,
    pub last_tick_ms: u64,
}

impl CandleBuilder {
    /// Start a new candle. The bucket is aligned to the interval.
    pub fn new(tick: &PriceTick, interval_ms: u64) -> Self {
        assert!(interval_ms > 0, "interval_ms must be > 0");
        let open_time = bucket_start(tick.timestamp_ms, interval_ms);
        Self {
            symbol: tick.symbol.clone(),
            open: tick.price,
            high: tick.price,
            low: tick.price,
            close: tick.price,
            open_time,
            close_time: open_time + interval_ms,
            last_tick_ms: tick.timestamp_ms,
        }
    }

    pub fn update(&mut self, tick: &PriceTick) {
        self.high = self.high.max(tick.price);
        self.low = self.low.min(tick.price);
        self.close = tick.price;
        self.last_tick_ms = tick.timestamp_ms;
    }

    pub fn finish(&self) -> Candle {
        Candle {
            symbol: self.symbol.clone(),
            open_time: self.open_time,
            close_time: self.close_time,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            last_tick_ms: self.last_tick_ms,
        }
    }
}

/// Truncates a timestamp down to a multiple of `interval_ms` from the epoch.
pub fn bucket_start(timestamp_ms: u64, interval_ms: u64) -> u64 {
    timestamp_ms - (timestamp_ms % interval_ms)
}

/// Folds ticks into fixed-interval candles aligned to wall-clock buckets.
///
/// A candle is handed out only once a tick from a different bucket arrives.
/// A late tick belonging to an already closed bucket simply opens a new
/// bucket at its own timestamp. Ticks with a non-finite price are dropped.
#[derive(Debug, Clone)]
pub struct CandleAggregator {
    interval_ms: u64,
    current: Option<CandleBuilder>,
}

impl CandleAggregator {
    pub fn new(interval_ms: u64) -> Self {
        let interval_ms = if interval_ms == 0 {
            DEFAULT_INTERVAL_MS
        } else {
            interval_ms
        };
        Self {
            interval_ms,
            current: None,
        }
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    /// The candle still being filled, if any.
    pub fn current(&self) -> Option<Candle> {
        self.current.as_ref().map(CandleBuilder::finish)
    }

    /// Push a tick; returns the previous candle when this tick closed it.
    pub fn push(&mut self, tick: &PriceTick) -> Option<Candle> {
        if !tick.price.is_finite() {
            return None;
        }
        let start = bucket_start(tick.timestamp_ms, self.interval_ms);
        if let Some(open) = self.current.as_mut() {
            if open.open_time == start {
                open.update(tick);
                return None;
            }
        }
        let completed = self.current.as_ref().map(CandleBuilder::finish);
        self.current = Some(CandleBuilder::new(tick, self.interval_ms));
        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(price: f64, ts: u64) -> PriceTick {
        PriceTick::new("BTCUSDT", price, ts, "test")
    }

    #[test]
    fn candle_builder_basics() {
        let mut cb = CandleBuilder::new(&tick(100.0, 60_500), 60_000);
        assert_eq!(cb.open_time, 60_000);
        assert_eq!(cb.close_time, 120_000);

        cb.update(&tick(105.0, 61_000));
        cb.update(&tick(95.0, 62_000));
        cb.update(&tick(102.0, 63_000));

        let candle = cb.finish();
        assert!((candle.open - 100.0).abs() < f64::EPSILON);
        assert!((candle.high - 105.0).abs() < f64::EPSILON);
        assert!((candle.low - 95.0).abs() < f64::EPSILON);
        assert!((candle.close - 102.0).abs() < f64::EPSILON);
        assert_eq!(candle.last_tick_ms, 63_000);
    }

    #[test]
    fn zero_interval_falls_back_to_default() {
        let agg = CandleAggregator::new(0);
        assert_eq!(agg.interval_ms(), DEFAULT_INTERVAL_MS);
    }

    #[test]
    #[should_panic(expected = "interval_ms must be > 0")]
    fn candle_builder_rejects_zero_interval() {
        let _ = CandleBuilder::new(&tick(100.0, 60_500), 0);
    }
}
