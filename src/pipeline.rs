//! Per-symbol live signal pipeline.
//!
//! Each symbol owns its own aggregator and detectors; nothing here is shared
//! between symbols or tasks.

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::config::Config;
use crate::detector::{BreakoutDetector, EmaTrendDetector};
use crate::event::MarketEvent;
use crate::model::candle::CandleAggregator;
use crate::model::tick::PriceTick;
use crate::server::Hub;
use crate::store::PriceStore;

#[derive(Debug)]
pub struct SignalPipeline {
    symbol: String,
    aggregator: CandleAggregator,
    trend: EmaTrendDetector,
    breakout: BreakoutDetector,
}

impl SignalPipeline {
    pub fn new(
        symbol: &str,
        aggregator: CandleAggregator,
        trend: EmaTrendDetector,
        breakout: BreakoutDetector,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            aggregator,
            trend,
            breakout,
        }
    }

    pub fn from_config(symbol: &str, config: &Config) -> Result<Self> {
        let trend = EmaTrendDetector::new(
            config.trend.ema_fast,
            config.trend.ema_slow,
            config.trend.confirm_ticks,
            config.trend.min_diff,
            config.trend.cooldown_ms()?,
        );
        let breakout = BreakoutDetector::new(
            config.breakout.lookback_ms()?,
            config.breakout.pct,
            config.breakout.cooldown_ms()?,
        );
        let aggregator = CandleAggregator::new(config.candle.interval_ms()?);
        Ok(Self::new(symbol, aggregator, trend, breakout))
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn trend(&self) -> &EmaTrendDetector {
        &self.trend
    }

    /// Feed one tick through the aggregator and both detectors.
    ///
    /// Returns the price event first, then a breakout (if the tick closed a
    /// candle that broke out), then a trend flip.
    pub fn on_tick(&mut self, tick: &PriceTick) -> Vec<MarketEvent> {
        let mut events = vec![MarketEvent::Price(tick.clone())];

        if let Some(candle) = self.aggregator.push(tick) {
            if let Some(bo) = self.breakout.push(&candle) {
                tracing::info!(
                    symbol = %bo.symbol,
                    dir = %bo.dir,
                    price = bo.price,
                    level = bo.level,
                    "Breakout"
                );
                events.push(MarketEvent::Breakout(bo));
            }
        }

        if let Some(change) = self.trend.push(tick) {
            tracing::info!(
                symbol = %change.symbol,
                trend = %change.trend,
                fast_ema = change.fast_ema,
                slow_ema = change.slow_ema,
                "Trend change"
            );
            events.push(MarketEvent::TrendChange(change));
        }

        events
    }

    /// Drain `ticks` until the feed closes, recording prices and publishing
    /// every event.
    pub async fn run(
        mut self,
        mut ticks: mpsc::Receiver<PriceTick>,
        store: Arc<PriceStore>,
        hub: Hub,
    ) {
        tracing::info!(symbol = %self.symbol, "Signal pipeline started");
        while let Some(tick) = ticks.recv().await {
            store.update(&tick);
            for event in self.on_tick(&tick) {
                hub.publish_event(&event);
            }
        }
        tracing::info!(symbol = %self.symbol, state = %self.trend, "Signal pipeline stopped");
    }
}
