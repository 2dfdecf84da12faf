use market_signal_engine::backtest::{self, BacktestConfig, MIN_CANDLES};
use market_signal_engine::error::ConfigError;
use market_signal_engine::model::candle::Candle;
use market_signal_engine::model::position::{ExitReason, Side};

const MINUTE: u64 = 60_000;

fn candle(i: u64, high: f64, low: f64, close: f64) -> Candle {
    Candle {
        symbol: "BTCUSDT".to_string(),
        open_time: i * MINUTE,
        close_time: (i + 1) * MINUTE,
        open: close,
        high,
        low,
        close,
        last_tick_ms: (i + 1) * MINUTE - 1,
    }
}

/// Frictionless, fast-reacting settings with a single breakout per run.
fn config() -> BacktestConfig {
    BacktestConfig {
        fee_rate: 0.0,
        slippage_rate: 0.0,
        stop_loss_pct: 0.01,
        take_profit_pct: 0.02,
        ema_fast: 2,
        ema_slow: 4,
        trend_confirm: 1,
        breakout_pct: 0.0,
        breakout_cooldown_ms: 60 * MINUTE,
        ..BacktestConfig::default()
    }
}

fn rising(n: u64) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let c = 100.0 + i as f64;
            candle(i, c + 0.5, c - 0.5, c)
        })
        .collect()
}

fn falling(n: u64) -> Vec<Candle> {
    (0..n)
        .map(|i| {
            let c = 200.0 - i as f64;
            candle(i, c + 0.5, c - 0.5, c)
        })
        .collect()
}

/// Nine flat candles, then a candle closing at 101 that breaks out upward.
fn flat_then_breakout() -> Vec<Candle> {
    let mut candles: Vec<Candle> = (0..9).map(|i| candle(i, 100.0, 100.0, 100.0)).collect();
    candles.push(candle(9, 101.0, 100.0, 101.0));
    candles
}

#[test]
fn rejects_short_history() {
    let err = backtest::run(&rising(MIN_CANDLES as u64 - 1), &config()).unwrap_err();
    assert_eq!(
        err,
        ConfigError::InsufficientData {
            have: MIN_CANDLES - 1,
            need: MIN_CANDLES
        }
    );
}

#[test]
fn long_breakout_hits_take_profit() {
    let result = backtest::run(&rising(12), &config()).unwrap();

    assert_eq!(result.candles, 12);
    assert_eq!(result.trades.len(), 1);
    let t = &result.trades[0];
    assert_eq!(t.side, Side::Long);
    assert_eq!(t.reason, ExitReason::TakeProfit);
    assert_eq!(t.entry_time, 2 * MINUTE);
    assert_eq!(t.exit_time, 4 * MINUTE);
    assert!((t.entry_price - 101.0).abs() < 1e-9);
    assert!((t.exit_price - 103.02).abs() < 1e-9);
    assert!((t.net_pnl - 20.0).abs() < 1e-9);

    assert!((result.final_equity - 1_020.0).abs() < 1e-9);
    assert!((result.total_return - 0.02).abs() < 1e-12);
    assert!((result.win_rate - 1.0).abs() < f64::EPSILON);
    assert_eq!(result.profit_factor, 0.0);
    assert_eq!(result.max_drawdown, 0.0);
}

#[test]
fn fees_and_slippage_reduce_the_take_profit() {
    let cfg = BacktestConfig {
        fee_rate: 0.001,
        slippage_rate: 0.0002,
        ..config()
    };
    let result = backtest::run(&rising(12), &cfg).unwrap();

    assert_eq!(result.trades.len(), 1);
    let t = &result.trades[0];
    assert!((t.entry_price - 101.0202).abs() < 1e-9);
    assert!((t.exit_price - 101.0202 * 1.02 * (1.0 - 0.0002)).abs() < 1e-9);
    assert!(t.net_pnl < t.gross_pnl);
    assert!((result.final_equity - 1_017.776204).abs() < 1e-6);
}

#[test]
fn open_position_is_closed_at_end_of_data() {
    let mut candles = flat_then_breakout();
    candles.push(candle(10, 101.2, 101.1, 101.2));
    let result = backtest::run(&candles, &config()).unwrap();

    assert_eq!(result.trades.len(), 1);
    let t = &result.trades[0];
    assert_eq!(t.reason, ExitReason::EndOfData);
    assert_eq!(t.entry_time, 10 * MINUTE);
    assert_eq!(t.exit_time, 11 * MINUTE);
    assert!((t.exit_price - 101.2).abs() < 1e-9);
    assert!(t.net_pnl > 0.0);
}

#[test]
fn stop_wins_when_bar_spans_both_levels() {
    let mut candles = flat_then_breakout();
    candles.push(candle(10, 200.0, 50.0, 101.0));
    candles.push(candle(11, 101.0, 101.0, 101.0));
    let result = backtest::run(&candles, &config()).unwrap();

    assert_eq!(result.trades.len(), 1);
    let t = &result.trades[0];
    assert_eq!(t.reason, ExitReason::Stop);
    assert!((t.exit_price - 99.99).abs() < 1e-9);
    assert!((t.net_pnl + 10.0).abs() < 1e-9);
    assert!((result.max_drawdown - 0.01).abs() < 1e-9);
    assert_eq!(result.win_rate, 0.0);
}

#[test]
fn shorts_only_when_allowed() {
    let flat_only = backtest::run(&falling(12), &config()).unwrap();
    assert!(flat_only.trades.is_empty());
    assert_eq!(flat_only.final_equity, flat_only.initial_equity);

    let cfg = BacktestConfig {
        allow_short: true,
        ..config()
    };
    let result = backtest::run(&falling(12), &cfg).unwrap();
    assert_eq!(result.trades.len(), 1);
    let t = &result.trades[0];
    assert_eq!(t.side, Side::Short);
    assert_eq!(t.reason, ExitReason::TakeProfit);
    assert!((t.entry_price - 199.0).abs() < 1e-9);
    assert!((t.exit_price - 195.02).abs() < 1e-9);
    assert!((result.final_equity - 1_020.0).abs() < 1e-9);
}

#[test]
fn runs_are_deterministic() {
    let mut candles = rising(20);
    candles.extend(falling(20).into_iter().enumerate().map(|(i, mut c)| {
        c.open_time = (20 + i as u64) * MINUTE;
        c.close_time = c.open_time + MINUTE;
        c
    }));
    let cfg = BacktestConfig {
        allow_short: true,
        breakout_cooldown_ms: 0,
        ..BacktestConfig::default()
    };
    let a = backtest::run(&candles, &cfg).unwrap();
    let b = backtest::run(&candles, &cfg).unwrap();
    assert_eq!(a, b);
}

#[test]
fn result_summary_is_printable() {
    let result = backtest::run(&rising(12), &config()).unwrap();
    let text = result.to_string();
    assert!(text.contains("Trades: 1"));
    assert!(text.contains("Final equity: 1020.00"));
    assert!(text.contains("Total return: 2.00%"));
}
