use anyhow::{Context, Result};
use futures_util::StreamExt;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite;

use super::types::BinanceAggTradeEvent;
use crate::error::AppError;
use crate::event::WsConnectionStatus;
use crate::model::tick::PriceTick;

/// Exponential backoff for reconnection.
#[derive(Debug)]
pub struct ExponentialBackoff {
    current: Duration,
    initial: Duration,
    max: Duration,
    factor: f64,
}

impl ExponentialBackoff {
    pub fn new(initial: Duration, max: Duration, factor: f64) -> Self {
        Self {
            current: initial,
            initial,
            max,
            factor,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = Duration::from_secs_f64(
            (self.current.as_secs_f64() * self.factor).min(self.max.as_secs_f64()),
        );
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Aggregate-trade feed for one symbol.
pub struct BinanceWsClient {
    symbol: String,
    url: String,
}

impl BinanceWsClient {
    pub fn agg_trade(ws_base_url: &str, symbol: &str) -> Self {
        Self {
            symbol: symbol.to_ascii_uppercase(),
            url: format!(
                "{}/{}@aggTrade",
                ws_base_url.trim_end_matches('/'),
                symbol.to_ascii_lowercase()
            ),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Connect and run the WebSocket loop with automatic reconnection until
    /// `shutdown` fires. Ticks go to `tick_tx`; the connection state is
    /// mirrored into `status_tx`.
    pub async fn connect_and_run(
        &self,
        tick_tx: mpsc::Sender<PriceTick>,
        status_tx: watch::Sender<WsConnectionStatus>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let mut backoff = ExponentialBackoff::new(
            Duration::from_millis(200),
            Duration::from_secs(5),
            2.0,
        );
        let mut attempt: u32 = 0;

        loop {
            if *shutdown.borrow() {
                break;
            }
            attempt += 1;
            let _ = status_tx.send(WsConnectionStatus::Connecting);
            match self
                .connect_once(&tick_tx, &status_tx, &mut backoff, &mut shutdown)
                .await
            {
                Ok(()) => {
                    // Clean shutdown requested
                    let _ = status_tx.send(WsConnectionStatus::Disconnected);
                    break;
                }
                Err(e) => {
                    let _ = status_tx.send(WsConnectionStatus::Disconnected);
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        symbol = %self.symbol,
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Feed disconnected, reconnecting"
                    );
                    let _ = status_tx.send(WsConnectionStatus::Reconnecting {
                        attempt,
                        delay_ms: delay.as_millis() as u64,
                    });

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => continue,
                        _ = shutdown.changed() => {
                            tracing::info!(symbol = %self.symbol, "Shutdown during reconnect");
                            let _ = status_tx.send(WsConnectionStatus::Disconnected);
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn connect_once(
        &self,
        tick_tx: &mpsc::Sender<PriceTick>,
        status_tx: &watch::Sender<WsConnectionStatus>,
        backoff: &mut ExponentialBackoff,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        tracing::debug!(url = %self.url, "Connecting to Binance");

        let (ws_stream, _resp) = tokio_tungstenite::connect_async(&self.url)
            .await
            .context("WebSocket connect failed")?;

        backoff.reset();
        let _ = status_tx.send(WsConnectionStatus::Connected);
        tracing::info!(symbol = %self.symbol, "Connected to Binance aggTrade");

        let (_write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            match serde_json::from_str::<BinanceAggTradeEvent>(&text) {
                                Ok(event) => {
                                    if tick_tx.try_send(event.into_tick()).is_err() {
                                        if tick_tx.is_closed() {
                                            return Ok(());
                                        }
                                        tracing::warn!(symbol = %self.symbol, "Tick channel full, dropping tick");
                                    }
                                }
                                Err(e) => {
                                    tracing::debug!(error = %e, "Failed to parse WS message");
                                }
                            }
                        }
                        Some(Ok(tungstenite::Message::Ping(_))) => {
                            // tokio-tungstenite handles pong automatically
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return Err(AppError::WebSocket(e.to_string()).into());
                        }
                        None => {
                            return Err(AppError::WebSocket("stream ended".to_string()).into());
                        }
                    }
                }
                _ = shutdown.changed() => {
                    return Ok(());
                }
            }
        }
    }
}
