pub mod candle;
pub mod position;
pub mod signal;
pub mod tick;
