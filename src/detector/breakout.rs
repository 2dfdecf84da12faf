use std::collections::VecDeque;

use crate::model::candle::Candle;
use crate::model::signal::{BreakoutEvent, Direction};

const DEFAULT_LOOKBACK_MS: u64 = 5 * 60_000;

/// Flags a completed candle whose close clears the high (or low) of the
/// preceding candles in a rolling time window by at least `pct`.
#[derive(Debug, Clone)]
pub struct BreakoutDetector {
    lookback_ms: u64,
    pct: f64,
    cooldown_ms: u64,
    window: VecDeque<Candle>,
    last_signal_ms: Option<u64>,
}

impl BreakoutDetector {
    pub fn new(lookback_ms: u64, pct: f64, cooldown_ms: u64) -> Self {
        let lookback_ms = if lookback_ms == 0 {
            DEFAULT_LOOKBACK_MS
        } else {
            lookback_ms
        };
        let pct = if pct.is_finite() { pct.max(0.0) } else { 0.0 };
        Self {
            lookback_ms,
            pct,
            cooldown_ms,
            window: VecDeque::new(),
            last_signal_ms: None,
        }
    }

    pub fn push(&mut self, candle: &Candle) -> Option<BreakoutEvent> {
        self.window.push_back(candle.clone());
        let cut = candle.close_time.saturating_sub(self.lookback_ms);
        while self.window.front().is_some_and(|c| c.close_time < cut) {
            let _ = self.window.pop_front();
        }

        if self.window.len() < 2 {
            return None;
        }

        if let Some(last) = self.last_signal_ms {
            if self.cooldown_ms > 0 && candle.close_time.saturating_sub(last) < self.cooldown_ms {
                return None;
            }
        }

        let prior = self.window.len() - 1;
        let (high, low) = self
            .window
            .iter()
            .take(prior)
            .fold((f64::MIN, f64::MAX), |(h, l), c| (h.max(c.high), l.min(c.low)));

        let price = candle.close;
        let (dir, level) = if price > high * (1.0 + self.pct) {
            (Direction::Up, high)
        } else if price < low * (1.0 - self.pct) {
            (Direction::Down, low)
        } else {
            return None;
        };

        self.last_signal_ms = Some(candle.close_time);
        Some(BreakoutEvent {
            symbol: candle.symbol.clone(),
            dir,
            price,
            level,
            pct: self.pct,
            lookback_ms: self.lookback_ms,
            candle_end_ms: candle.close_time,
            timestamp_ms: candle.last_tick_ms,
        })
    }

    /// Number of candles currently retained in the lookback window.
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    pub fn lookback_ms(&self) -> u64 {
        self.lookback_ms
    }
}
