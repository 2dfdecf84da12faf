use serde::Deserialize;

/// Parameters of one backtest run. Durations are in milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub initial_equity: f64,
    pub fee_rate: f64,
    pub slippage_rate: f64,
    pub allow_short: bool,
    pub stop_loss_pct: f64,
    pub take_profit_pct: f64,
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub trend_confirm: u32,
    pub trend_min_diff: f64,
    pub trend_cooldown_ms: u64,
    pub breakout_lookback_ms: u64,
    pub breakout_pct: f64,
    pub breakout_cooldown_ms: u64,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_equity: 1_000.0,
            fee_rate: 0.001,
            slippage_rate: 0.0002,
            allow_short: false,
            stop_loss_pct: 0.003,
            take_profit_pct: 0.006,
            ema_fast: 20,
            ema_slow: 50,
            trend_confirm: 3,
            trend_min_diff: 0.0,
            trend_cooldown_ms: 0,
            breakout_lookback_ms: 5 * 60_000,
            breakout_pct: 0.001,
            breakout_cooldown_ms: 0,
        }
    }
}

impl BacktestConfig {
    /// Replace non-positive settings with their defaults instead of rejecting them.
    pub fn normalized(mut self) -> Self {
        let d = Self::default();
        if !(self.initial_equity > 0.0) {
            self.initial_equity = d.initial_equity;
        }
        if !(self.stop_loss_pct > 0.0) {
            self.stop_loss_pct = d.stop_loss_pct;
        }
        if !(self.take_profit_pct > 0.0) {
            self.take_profit_pct = d.take_profit_pct;
        }
        if self.ema_fast == 0 {
            self.ema_fast = d.ema_fast;
        }
        if self.ema_slow == 0 {
            self.ema_slow = d.ema_slow;
        }
        if self.trend_confirm == 0 {
            self.trend_confirm = d.trend_confirm;
        }
        if self.breakout_lookback_ms == 0 {
            self.breakout_lookback_ms = d.breakout_lookback_ms;
        }
        self
    }
}
