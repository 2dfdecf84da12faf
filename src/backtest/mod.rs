pub mod config;
pub mod engine;
pub mod report;

pub use config::BacktestConfig;
pub use engine::{run, MIN_CANDLES};
pub use report::BacktestResult;
