use std::fmt;

use crate::indicator::ema::Ema;
use crate::model::signal::{Direction, TrendChange};
use crate::model::tick::PriceTick;

const DEFAULT_FAST_PERIOD: usize = 20;
const DEFAULT_SLOW_PERIOD: usize = 50;

/// Fast/slow EMA crossover with hysteresis and a post-flip cooldown.
///
/// A flip is reported only after `confirm_ticks` consecutive qualifying ticks
/// agree on the new direction. While the cooldown after a flip is running,
/// ticks still move the EMAs but do not count toward the next flip.
#[derive(Debug, Clone)]
pub struct EmaTrendDetector {
    fast: Ema,
    slow: Ema,
    confirm_ticks: u32,
    min_rel_diff: f64,
    cooldown_ms: u64,

    confirmed: Option<Direction>,
    pending: Option<Direction>,
    pending_count: u32,
    last_flip_ms: Option<u64>,
}

impl EmaTrendDetector {
    pub fn new(
        fast_period: usize,
        slow_period: usize,
        confirm_ticks: u32,
        min_rel_diff: f64,
        cooldown_ms: u64,
    ) -> Self {
        let fast_period = if fast_period == 0 {
            DEFAULT_FAST_PERIOD
        } else {
            fast_period
        };
        let mut slow_period = if slow_period == 0 {
            DEFAULT_SLOW_PERIOD
        } else {
            slow_period
        };
        if fast_period >= slow_period {
            slow_period = fast_period + 1;
        }
        let min_rel_diff = if min_rel_diff.is_finite() {
            min_rel_diff.max(0.0)
        } else {
            0.0
        };
        Self {
            fast: Ema::new(fast_period),
            slow: Ema::new(slow_period),
            confirm_ticks: confirm_ticks.max(1),
            min_rel_diff,
            cooldown_ms,
            confirmed: None,
            pending: None,
            pending_count: 0,
            last_flip_ms: None,
        }
    }

    pub fn push(&mut self, tick: &PriceTick) -> Option<TrendChange> {
        let price = tick.price;
        if !price.is_finite() {
            return None;
        }

        if !self.is_ready() {
            self.fast.push(price);
            self.slow.push(price);
            return None;
        }

        let fast = self.fast.push(price);
        let slow = self.slow.push(price);

        if self.in_cooldown(tick.timestamp_ms) {
            return None;
        }

        let current = direction_of(fast, slow);
        let rel_sep = if price != 0.0 {
            (fast - slow).abs() / price.abs()
        } else {
            0.0
        };
        if rel_sep < self.min_rel_diff {
            return None;
        }

        let Some(confirmed) = self.confirmed else {
            self.confirmed = Some(current);
            self.pending_count = 0;
            return None;
        };

        if current == confirmed {
            self.pending_count = 0;
            return None;
        }

        if self.pending_count == 0 || self.pending != Some(current) {
            self.pending = Some(current);
            self.pending_count = 1;
        } else {
            self.pending_count += 1;
        }

        if self.pending_count < self.confirm_ticks {
            return None;
        }

        self.confirmed = Some(current);
        self.pending_count = 0;
        self.last_flip_ms = Some(tick.timestamp_ms);

        Some(TrendChange {
            symbol: tick.symbol.clone(),
            trend: current,
            fast_ema: fast,
            slow_ema: slow,
            price,
            timestamp_ms: tick.timestamp_ms,
        })
    }

    fn in_cooldown(&self, now_ms: u64) -> bool {
        match self.last_flip_ms {
            Some(last) if self.cooldown_ms > 0 => now_ms.saturating_sub(last) < self.cooldown_ms,
            _ => false,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.fast.is_ready() && self.slow.is_ready()
    }

    pub fn emas(&self) -> Option<(f64, f64)> {
        Some((self.fast.value()?, self.slow.value()?))
    }

    /// Live ordering of the two averages, independent of confirmation.
    pub fn current_direction(&self) -> Option<Direction> {
        self.emas().map(|(fast, slow)| direction_of(fast, slow))
    }

    pub fn confirmed_direction(&self) -> Option<Direction> {
        self.confirmed
    }

    pub fn periods(&self) -> (usize, usize) {
        (self.fast.period(), self.slow.period())
    }

    pub fn confirm_ticks(&self) -> u32 {
        self.confirm_ticks
    }
}

fn direction_of(fast: f64, slow: f64) -> Direction {
    if fast >= slow {
        Direction::Up
    } else {
        Direction::Down
    }
}

impl fmt::Display for EmaTrendDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some((fast, slow)) = self.emas() else {
            return f.write_str("EMA(n/a)");
        };
        match self.confirmed {
            Some(trend) => write!(f, "EMA fast={:.6} slow={:.6} trend={}", fast, slow, trend),
            None => write!(f, "EMA fast={:.6} slow={:.6}", fast, slow),
        }
    }
}
