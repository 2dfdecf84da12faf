pub mod breakout;
pub mod trend;

pub use breakout::BreakoutDetector;
pub use trend::EmaTrendDetector;
