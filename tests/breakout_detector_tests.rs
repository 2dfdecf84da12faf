use market_signal_engine::detector::BreakoutDetector;
use market_signal_engine::model::candle::Candle;
use market_signal_engine::model::signal::Direction;

const MINUTE: u64 = 60_000;

fn candle(close_time: u64, high: f64, low: f64, close: f64) -> Candle {
    Candle {
        symbol: "BTCUSDT".to_string(),
        open_time: close_time - MINUTE,
        close_time,
        open: close,
        high,
        low,
        close,
        last_tick_ms: close_time - 1,
    }
}

#[test]
fn needs_two_candles_in_window() {
    let mut det = BreakoutDetector::new(5 * MINUTE, 0.0, 0);
    assert!(det.push(&candle(MINUTE, 10.0, 9.0, 50.0)).is_none());
    assert_eq!(det.window_len(), 1);
}

#[test]
fn close_above_prior_high_breaks_up() {
    let mut det = BreakoutDetector::new(5 * MINUTE, 0.0, 0);
    det.push(&candle(MINUTE, 10.0, 9.0, 9.5));
    det.push(&candle(2 * MINUTE, 12.0, 10.0, 10.0));

    let bo = det.push(&candle(3 * MINUTE, 13.5, 12.0, 13.0)).unwrap();
    assert_eq!(bo.dir, Direction::Up);
    assert!((bo.level - 12.0).abs() < f64::EPSILON);
    assert!((bo.price - 13.0).abs() < f64::EPSILON);
    assert_eq!(bo.candle_end_ms, 3 * MINUTE);
    assert_eq!(bo.timestamp_ms, 3 * MINUTE - 1);
    assert_eq!(bo.lookback_ms, 5 * MINUTE);
    assert_eq!(bo.symbol, "BTCUSDT");
}

#[test]
fn close_inside_range_is_quiet() {
    let mut det = BreakoutDetector::new(5 * MINUTE, 0.0, 0);
    det.push(&candle(MINUTE, 10.0, 9.0, 9.5));
    det.push(&candle(2 * MINUTE, 12.0, 10.0, 10.0));
    assert!(det.push(&candle(3 * MINUTE, 11.5, 10.5, 11.0)).is_none());
}

#[test]
fn close_below_prior_low_breaks_down() {
    let mut det = BreakoutDetector::new(5 * MINUTE, 0.0, 0);
    det.push(&candle(MINUTE, 10.0, 9.0, 9.5));
    det.push(&candle(2 * MINUTE, 12.0, 8.5, 10.0));

    let bo = det.push(&candle(3 * MINUTE, 9.0, 7.0, 8.0)).unwrap();
    assert_eq!(bo.dir, Direction::Down);
    assert!((bo.level - 8.5).abs() < f64::EPSILON);
}

#[test]
fn threshold_must_be_cleared() {
    let mut det = BreakoutDetector::new(5 * MINUTE, 0.1, 0);
    det.push(&candle(MINUTE, 100.0, 99.0, 99.5));
    det.push(&candle(2 * MINUTE, 100.0, 99.0, 99.5));
    // 109 does not clear 100 * 1.1
    assert!(det.push(&candle(3 * MINUTE, 109.0, 108.0, 109.0)).is_none());
    assert!(det.push(&candle(4 * MINUTE, 125.0, 120.0, 121.0)).is_some());
}

#[test]
fn old_candles_fall_out_of_window() {
    let mut det = BreakoutDetector::new(2 * MINUTE, 0.0, 0);
    det.push(&candle(MINUTE, 50.0, 40.0, 45.0));
    det.push(&candle(2 * MINUTE, 12.0, 10.0, 11.0));
    det.push(&candle(3 * MINUTE, 12.0, 10.0, 11.0));

    // The 50 high at t=1m is older than 4m - 2m and must not cap the breakout.
    let bo = det.push(&candle(4 * MINUTE, 13.5, 12.0, 13.0)).unwrap();
    assert!((bo.level - 12.0).abs() < f64::EPSILON);
    assert_eq!(det.window_len(), 3);
}

#[test]
fn cooldown_suppresses_follow_up_breakouts() {
    let mut det = BreakoutDetector::new(10 * MINUTE, 0.0, 3 * MINUTE);
    det.push(&candle(MINUTE, 10.0, 9.0, 9.5));
    assert!(det.push(&candle(2 * MINUTE, 11.0, 10.0, 11.0)).is_some());
    assert!(det.push(&candle(3 * MINUTE, 13.0, 12.0, 13.0)).is_none());
    assert!(det.push(&candle(4 * MINUTE, 15.0, 14.0, 15.0)).is_none());
    assert!(det.push(&candle(5 * MINUTE, 17.0, 16.0, 17.0)).is_some());
}

#[test]
fn zero_lookback_uses_five_minutes() {
    let det = BreakoutDetector::new(0, -1.0, 0);
    assert_eq!(det.lookback_ms(), 5 * MINUTE);
}
