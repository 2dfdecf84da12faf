use crate::detector::{BreakoutDetector, EmaTrendDetector};
use crate::error::ConfigError;
use crate::model::candle::Candle;
use crate::model::position::{ExitReason, Position, Side, Trade};
use crate::model::signal::Direction;
use crate::model::tick::PriceTick;

use super::config::BacktestConfig;
use super::report::BacktestResult;

pub const MIN_CANDLES: usize = 10;

/// Replay `candles` through the live signal logic and trade a single
/// all-in position on trend + breakout agreement.
///
/// Per candle: exits first (intrabar stop, then take-profit), then the trend
/// and breakout detectors, then entry if flat, then drawdown bookkeeping.
pub fn run(candles: &[Candle], config: &BacktestConfig) -> Result<BacktestResult, ConfigError> {
    if candles.len() < MIN_CANDLES {
        return Err(ConfigError::InsufficientData {
            have: candles.len(),
            need: MIN_CANDLES,
        });
    }
    let cfg = config.clone().normalized();
    let mut sim = Simulation::new(&cfg);

    for candle in candles {
        sim.step(candle);
    }

    if let Some(last) = candles.last() {
        sim.exit(last.close_time, last.close, ExitReason::EndOfData);
    }

    tracing::debug!(
        candles = candles.len(),
        trades = sim.trades.len(),
        final_equity = sim.equity,
        "Backtest finished"
    );

    Ok(BacktestResult::from_run(
        candles.len(),
        sim.trades,
        cfg.initial_equity,
        sim.equity,
        sim.max_drawdown,
    ))
}

struct Simulation<'a> {
    cfg: &'a BacktestConfig,
    trend: EmaTrendDetector,
    breakout: BreakoutDetector,
    trend_dir: Direction,
    position: Option<Position>,
    trades: Vec<Trade>,
    equity: f64,
    peak_equity: f64,
    max_drawdown: f64,
}

impl<'a> Simulation<'a> {
    fn new(cfg: &'a BacktestConfig) -> Self {
        Self {
            cfg,
            trend: EmaTrendDetector::new(
                cfg.ema_fast,
                cfg.ema_slow,
                cfg.trend_confirm,
                cfg.trend_min_diff,
                cfg.trend_cooldown_ms,
            ),
            breakout: BreakoutDetector::new(
                cfg.breakout_lookback_ms,
                cfg.breakout_pct,
                cfg.breakout_cooldown_ms,
            ),
            trend_dir: Direction::Up,
            position: None,
            trades: Vec::new(),
            equity: cfg.initial_equity,
            peak_equity: cfg.initial_equity,
            max_drawdown: 0.0,
        }
    }

    fn step(&mut self, candle: &Candle) {
        let trigger = self
            .position
            .as_ref()
            .and_then(|pos| pos.exit_trigger(candle.high, candle.low));
        if let Some((reason, level)) = trigger {
            self.exit(candle.close_time, level, reason);
        }

        let _ = self.trend.push(&PriceTick::from_candle_close(candle));
        if let Some(dir) = self.trend.current_direction() {
            self.trend_dir = dir;
        }

        if let Some(event) = self.breakout.push(candle) {
            if self.position.is_none() {
                match (event.dir, self.trend_dir) {
                    (Direction::Up, Direction::Up) => self.enter(Side::Long, candle),
                    (Direction::Down, Direction::Down) if self.cfg.allow_short => {
                        self.enter(Side::Short, candle)
                    }
                    _ => {}
                }
            }
        }

        if self.equity > self.peak_equity {
            self.peak_equity = self.equity;
        }
        let drawdown = (self.peak_equity - self.equity) / self.peak_equity;
        if drawdown > self.max_drawdown {
            self.max_drawdown = drawdown;
        }
    }

    fn enter(&mut self, side: Side, candle: &Candle) {
        let entry_price = self.slipped(candle.close, side, true);
        self.position = Some(Position::open(
            side,
            entry_price,
            candle.close_time,
            self.equity,
            self.cfg.stop_loss_pct,
            self.cfg.take_profit_pct,
        ));
    }

    fn exit(&mut self, time: u64, price: f64, reason: ExitReason) {
        let Some(pos) = self.position.take() else {
            return;
        };
        let exit_price = self.slipped(price, pos.side, false);
        let trade = pos.close(time, exit_price, reason, self.cfg.fee_rate);
        self.equity += trade.net_pnl;
        self.trades.push(trade);
    }

    /// Slippage always works against the trader.
    fn slipped(&self, price: f64, side: Side, is_entry: bool) -> f64 {
        let slip = self.cfg.slippage_rate;
        if slip <= 0.0 {
            return price;
        }
        let pays_up = matches!((side, is_entry), (Side::Long, true) | (Side::Short, false));
        if pays_up {
            price * (1.0 + slip)
        } else {
            price * (1.0 - slip)
        }
    }
}
