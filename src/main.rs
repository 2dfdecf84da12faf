use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use market_signal_engine::binance::ws::BinanceWsClient;
use market_signal_engine::config::{Config, DEFAULT_CONFIG_PATH};
use market_signal_engine::event::WsConnectionStatus;
use market_signal_engine::logging;
use market_signal_engine::model::tick::PriceTick;
use market_signal_engine::pipeline::SignalPipeline;
use market_signal_engine::server::{self, AppState, Hub};
use market_signal_engine::store::PriceStore;

const TICK_CHANNEL_CAPACITY: usize = 1024;

#[derive(Parser, Debug)]
#[command(
    name = "market-signal-engine",
    about = "Stream exchange trades and publish trend and breakout signals"
)]
struct Cli {
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// HTTP listen address
    #[arg(long)]
    http: Option<String>,
    /// Primary symbol, e.g. BTCUSDT
    #[arg(long)]
    symbol: Option<String>,
    /// Fast EMA window (ticks)
    #[arg(long)]
    ema_fast: Option<usize>,
    /// Slow EMA window (ticks)
    #[arg(long)]
    ema_slow: Option<usize>,
    /// Confirm a trend flip after N consecutive ticks
    #[arg(long)]
    trend_confirm: Option<u32>,
    /// Minimum relative EMA separation abs(fast-slow)/price
    #[arg(long)]
    trend_min_diff: Option<f64>,
    /// Minimum time between trend flips, e.g. 10s or 1m30s
    #[arg(long)]
    trend_cooldown: Option<String>,
    /// Candle aggregation interval, e.g. 5s
    #[arg(long)]
    candle_interval: Option<String>,
    /// Breakout lookback window, e.g. 5m or 2.5m
    #[arg(long)]
    breakout_lookback: Option<String>,
    /// Breakout threshold as a fraction (0.001 = 0.1%)
    #[arg(long)]
    breakout_pct: Option<f64>,
    /// Minimum time between breakout signals, e.g. 30s
    #[arg(long)]
    breakout_cooldown: Option<String>,
}

impl Cli {
    /// Load the config file, layer the flags on top, then validate the result.
    fn into_config(self) -> Result<Config> {
        let mut config = Config::load(&self.config)?;
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn apply(self, config: &mut Config) {
        if let Some(v) = self.http {
            config.server.http_addr = v;
        }
        if let Some(v) = self.symbol {
            config.binance.symbol = v;
        }
        if let Some(v) = self.ema_fast {
            config.trend.ema_fast = v;
        }
        if let Some(v) = self.ema_slow {
            config.trend.ema_slow = v;
        }
        if let Some(v) = self.trend_confirm {
            config.trend.confirm_ticks = v;
        }
        if let Some(v) = self.trend_min_diff {
            config.trend.min_diff = v;
        }
        if let Some(v) = self.trend_cooldown {
            config.trend.cooldown = v;
        }
        if let Some(v) = self.candle_interval {
            config.candle.interval = v;
        }
        if let Some(v) = self.breakout_lookback {
            config.breakout.lookback = v;
        }
        if let Some(v) = self.breakout_pct {
            config.breakout.pct = v;
        }
        if let Some(v) = self.breakout_cooldown {
            config.breakout.cooldown = v;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (required by rustls 0.23+)
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = Cli::parse().into_config()?;

    logging::init(&config.logging)?;

    let symbols = config.binance.tradable_symbols();
    tracing::info!(
        symbols = ?symbols,
        ws_url = %config.binance.ws_base_url,
        http = %config.server.http_addr,
        "Starting market-signal-engine"
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let store = Arc::new(PriceStore::new());
    let hub = Hub::default();

    let mut feeds = Vec::with_capacity(symbols.len());
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();
    for symbol in &symbols {
        let pipeline = SignalPipeline::from_config(symbol, &config)?;
        let (tick_tx, tick_rx) = mpsc::channel::<PriceTick>(TICK_CHANNEL_CAPACITY);
        let (status_tx, status_rx) = watch::channel(WsConnectionStatus::Connecting);
        feeds.push((symbol.clone(), status_rx));

        let client = BinanceWsClient::agg_trade(&config.binance.ws_base_url, symbol);
        let feed_shutdown = shutdown_rx.clone();
        tasks.push(tokio::spawn(async move {
            if let Err(e) = client.connect_and_run(tick_tx, status_tx, feed_shutdown).await {
                tracing::error!(error = %e, "Feed task failed");
            }
        }));
        tasks.push(tokio::spawn(pipeline.run(tick_rx, store.clone(), hub.clone())));
    }

    let status_every = config.server.status_log_interval_ms()?;
    if status_every > 0 {
        tasks.push(tokio::spawn(log_prices(
            symbols.clone(),
            store.clone(),
            Duration::from_millis(status_every),
            shutdown_rx.clone(),
        )));
    }

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
        }
        let _ = shutdown_tx.send(true);
    });

    let state = AppState {
        store: store.clone(),
        hub,
        feeds,
    };
    server::serve(&config.server.http_addr, state, shutdown_rx)
        .await
        .context("engine stopped with error")?;

    for task in tasks {
        let _ = task.await;
    }
    tracing::info!("Engine stopped");
    Ok(())
}

/// Periodically log each symbol's last price and how old it is.
async fn log_prices(
    symbols: Vec<String>,
    store: Arc<PriceStore>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(every);
    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }
        let now_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
        for symbol in &symbols {
            match store.get(symbol) {
                Some(tick) => tracing::info!(
                    symbol = %symbol,
                    price = tick.price,
                    age_ms = now_ms.saturating_sub(tick.timestamp_ms),
                    "Last price"
                ),
                None => tracing::info!(symbol = %symbol, "Awaiting data"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn flags_override_invalid_file_values() {
        let file = config_file("[binance]\nsymbol = \"\"\n\n[trend]\ncooldown = \"soon\"\n");
        let path = file.path().to_str().unwrap();

        let bare = Cli::parse_from(["market-signal-engine", "--config", path]);
        assert!(bare.into_config().is_err());

        let cli = Cli::parse_from([
            "market-signal-engine",
            "--config",
            path,
            "--symbol",
            "ethusdt",
            "--trend-cooldown",
            "15s",
        ]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.binance.tradable_symbols(), vec!["ETHUSDT"]);
        assert_eq!(config.trend.cooldown_ms().unwrap(), 15_000);
    }
}
