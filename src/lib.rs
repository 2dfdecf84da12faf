pub mod backtest;
pub mod binance;
pub mod config;
pub mod detector;
pub mod error;
pub mod event;
pub mod indicator;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod server;
pub mod store;
