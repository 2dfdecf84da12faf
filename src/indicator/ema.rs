/// Exponential Moving Average seeded from the first sample.
#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    alpha: f64,
    ema: Option<f64>,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "EMA period must be > 0");
        Self {
            period,
            alpha: 2.0 / (period as f64 + 1.0),
            ema: None,
        }
    }

    /// Push a new value and return the updated average.
    pub fn push(&mut self, value: f64) -> f64 {
        let next = match self.ema {
            Some(prev) => prev + self.alpha * (value - prev),
            None => value,
        };
        self.ema = Some(next);
        next
    }

    pub fn value(&self) -> Option<f64> {
        self.ema
    }

    pub fn is_ready(&self) -> bool {
        self.ema.is_some()
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}
