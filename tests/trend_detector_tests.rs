use market_signal_engine::detector::EmaTrendDetector;
use market_signal_engine::model::signal::{Direction, TrendChange};
use market_signal_engine::model::tick::PriceTick;

fn tick(price: f64, ts: u64) -> PriceTick {
    PriceTick::new("BTCUSDT", price, ts, "test")
}

/// Feed prices one second apart and collect `(index, change)` for every flip.
fn feed(det: &mut EmaTrendDetector, prices: &[f64]) -> Vec<(usize, TrendChange)> {
    prices
        .iter()
        .enumerate()
        .filter_map(|(i, p)| det.push(&tick(*p, i as u64 * 1_000)).map(|c| (i, c)))
        .collect()
}

fn falling_then_rising() -> Vec<f64> {
    let mut prices: Vec<f64> = (0..=10).map(|i| 100.0 - i as f64).collect();
    prices.extend((1..=30).map(|i| 90.0 + i as f64));
    prices
}

#[test]
fn first_direction_is_adopted_silently() {
    let mut det = EmaTrendDetector::new(2, 4, 1, 0.0, 0);
    let prices: Vec<f64> = (0..10).map(|i| 100.0 + i as f64).collect();
    assert!(feed(&mut det, &prices).is_empty());
    assert_eq!(det.confirmed_direction(), Some(Direction::Up));
}

#[test]
fn single_flip_after_sustained_reversal() {
    let mut det = EmaTrendDetector::new(2, 4, 2, 0.0, 0);
    let events = feed(&mut det, &falling_then_rising());

    assert_eq!(events.len(), 1);
    let (i, change) = &events[0];
    assert_eq!(*i, 13);
    assert_eq!(change.trend, Direction::Up);
    assert_eq!(change.symbol, "BTCUSDT");
    assert_eq!(change.timestamp_ms, 13_000);
    assert!((change.price - 93.0).abs() < f64::EPSILON);
    assert!(change.fast_ema >= change.slow_ema);
    assert_eq!(det.confirmed_direction(), Some(Direction::Up));
}

#[test]
fn interrupted_run_restarts_confirmation() {
    let mut det = EmaTrendDetector::new(2, 4, 3, 0.0, 0);
    let prices = [
        100.0, 99.0, 98.0, 97.0, 96.0, 95.0, 97.0, 99.0, 101.0, 96.0, 98.0, 100.0, 102.0, 104.0,
        106.0,
    ];
    let events = feed(&mut det, &prices);

    // Two up ticks at 7 and 8 are wiped out by the dip at 9.
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].0, 13);
    assert_eq!(events[0].1.trend, Direction::Up);
}

#[test]
fn cooldown_swallows_quick_reversal() {
    let mut prices: Vec<f64> = (0..=5).map(|i| 100.0 - i as f64).collect();
    prices.extend((1..=5).map(|i| 95.0 + i as f64));
    prices.extend((1..=7).map(|i| 100.0 - i as f64));

    let mut free = EmaTrendDetector::new(2, 4, 1, 0.0, 0);
    let free_events = feed(&mut free, &prices);
    assert_eq!(free_events.len(), 2);
    assert_eq!(free_events[0].1.trend, Direction::Up);
    assert_eq!(free_events[1].1.trend, Direction::Down);

    let mut cooled = EmaTrendDetector::new(2, 4, 1, 0.0, 60_000);
    let cooled_events = feed(&mut cooled, &prices);
    assert_eq!(cooled_events.len(), 1);
    assert_eq!(cooled_events[0].0, 7);
    assert_eq!(cooled.confirmed_direction(), Some(Direction::Up));
    assert_eq!(cooled.current_direction(), Some(Direction::Down));
}

#[test]
fn min_separation_blocks_confirmation() {
    let mut det = EmaTrendDetector::new(2, 4, 1, 0.5, 0);
    assert!(feed(&mut det, &falling_then_rising()).is_empty());
    assert_eq!(det.confirmed_direction(), None);
    assert!(det.is_ready());
}

#[test]
fn non_finite_prices_are_ignored() {
    let mut det = EmaTrendDetector::new(2, 4, 1, 0.0, 0);
    assert!(det.push(&tick(f64::NAN, 0)).is_none());
    assert!(det.push(&tick(f64::INFINITY, 1)).is_none());
    assert!(!det.is_ready());
    assert!(det.emas().is_none());

    det.push(&tick(100.0, 2));
    assert_eq!(det.emas(), Some((100.0, 100.0)));
}

#[test]
fn periods_are_normalized() {
    assert_eq!(EmaTrendDetector::new(0, 0, 0, -1.0, 0).periods(), (20, 50));
    assert_eq!(EmaTrendDetector::new(30, 10, 1, 0.0, 0).periods(), (30, 31));
    assert_eq!(EmaTrendDetector::new(5, 5, 0, 0.0, 0).confirm_ticks(), 1);
}

#[test]
fn display_reports_state() {
    let mut det = EmaTrendDetector::new(2, 4, 1, 0.0, 0);
    assert_eq!(det.to_string(), "EMA(n/a)");

    det.push(&tick(100.0, 0));
    assert_eq!(det.to_string(), "EMA fast=100.000000 slow=100.000000");

    det.push(&tick(103.0, 1_000));
    assert!(det.to_string().ends_with("trend=up"));
}
