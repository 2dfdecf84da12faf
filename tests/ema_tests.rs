use market_signal_engine::indicator::ema::Ema;

#[test]
fn first_sample_seeds_the_average() {
    let mut ema = Ema::new(3);
    assert!(!ema.is_ready());
    assert_eq!(ema.value(), None);

    let v = ema.push(2.0);
    assert!((v - 2.0).abs() < f64::EPSILON);
    assert!(ema.is_ready());

    let v = ema.push(5.0);
    assert!((v - 3.5).abs() < f64::EPSILON);

    let v = ema.push(8.0);
    assert!((v - 5.75).abs() < f64::EPSILON);
    assert!((ema.value().unwrap() - 5.75).abs() < f64::EPSILON);
}

#[test]
fn single_period_tracks_input() {
    let mut ema = Ema::new(1);
    assert!((ema.alpha() - 1.0).abs() < f64::EPSILON);
    assert!((ema.push(42.0) - 42.0).abs() < f64::EPSILON);
    assert!((ema.push(99.0) - 99.0).abs() < f64::EPSILON);
}

#[test]
fn constant_input_stays_constant() {
    let mut ema = Ema::new(20);
    for _ in 0..50 {
        assert!((ema.push(7.5) - 7.5).abs() < 1e-12);
    }
    assert_eq!(ema.period(), 20);
}

#[test]
#[should_panic(expected = "EMA period must be > 0")]
fn zero_period_panics() {
    Ema::new(0);
}
