use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;

use market_signal_engine::backtest::{self, BacktestConfig};
use market_signal_engine::binance::rest::BinanceRestClient;
use market_signal_engine::config::{parse_duration_ms, parse_interval_ms, LoggingConfig};
use market_signal_engine::logging;

#[derive(Parser, Debug)]
#[command(name = "backtest", about = "Replay Binance klines through the trend + breakout strategy")]
struct Args {
    #[arg(long, default_value = "BTCUSDT")]
    symbol: String,
    /// Binance kline interval (e.g. 1m, 5m)
    #[arg(long, default_value = "1m")]
    interval: String,
    /// Start time, RFC 3339 (e.g. 2026-01-01T00:00:00Z)
    #[arg(long)]
    start: String,
    /// End time, RFC 3339 (e.g. 2026-01-02T00:00:00Z)
    #[arg(long)]
    end: String,
    #[arg(long, default_value = "https://api.binance.com")]
    rest_base_url: String,

    /// Initial equity in quote currency
    #[arg(long, default_value_t = 1000.0)]
    equity: f64,
    /// Fee rate per side (0.001 = 0.1%)
    #[arg(long, default_value_t = 0.001)]
    fee: f64,
    /// Slippage rate per fill (0.0002 = 2 bps)
    #[arg(long, default_value_t = 0.0002)]
    slippage: f64,
    /// Allow short trades
    #[arg(long)]
    short: bool,

    /// Fast EMA window (candles)
    #[arg(long, default_value_t = 20)]
    ema_fast: usize,
    /// Slow EMA window (candles)
    #[arg(long, default_value_t = 50)]
    ema_slow: usize,
    /// Confirm a trend flip after N consecutive candles
    #[arg(long, default_value_t = 3)]
    trend_confirm: u32,
    /// Minimum relative EMA separation abs(fast-slow)/price
    #[arg(long, default_value_t = 0.0)]
    trend_min_diff: f64,
    /// Minimum time between trend flips, e.g. 30s or 1m30s ("0" disables)
    #[arg(long, default_value = "0")]
    trend_cooldown: String,

    /// Breakout lookback window, e.g. 5m or 1.5h
    #[arg(long, default_value = "5m")]
    breakout_lookback: String,
    /// Breakout threshold fraction
    #[arg(long, default_value_t = 0.001)]
    breakout_pct: f64,
    /// Minimum time between breakout signals ("0" disables)
    #[arg(long, default_value = "0")]
    breakout_cooldown: String,

    /// Stop loss fraction (0.003 = 0.3%)
    #[arg(long, default_value_t = 0.003)]
    sl: f64,
    /// Take profit fraction (0.006 = 0.6%)
    #[arg(long, default_value_t = 0.006)]
    tp: f64,
}

impl Args {
    fn backtest_config(&self) -> Result<BacktestConfig> {
        Ok(BacktestConfig {
            initial_equity: self.equity,
            fee_rate: self.fee,
            slippage_rate: self.slippage,
            allow_short: self.short,
            stop_loss_pct: self.sl,
            take_profit_pct: self.tp,
            ema_fast: self.ema_fast,
            ema_slow: self.ema_slow,
            trend_confirm: self.trend_confirm,
            trend_min_diff: self.trend_min_diff,
            trend_cooldown_ms: parse_duration_ms(&self.trend_cooldown)
                .context("invalid --trend-cooldown")?,
            breakout_lookback_ms: parse_duration_ms(&self.breakout_lookback)
                .context("invalid --breakout-lookback")?,
            breakout_pct: self.breakout_pct,
            breakout_cooldown_ms: parse_duration_ms(&self.breakout_cooldown)
                .context("invalid --breakout-cooldown")?,
        })
    }
}

fn parse_time_ms(flag: &str, s: &str) -> Result<u64> {
    let t = DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("invalid --{}: {}", flag, s))?
        .with_timezone(&Utc);
    u64::try_from(t.timestamp_millis()).with_context(|| format!("--{} is before the epoch", flag))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = rustls::crypto::ring::default_provider().install_default();
    logging::init(&LoggingConfig {
        level: "warn".to_string(),
        json: false,
    })?;

    let args = Args::parse();
    parse_interval_ms(&args.interval).context("invalid --interval")?;
    let start_ms = parse_time_ms("start", &args.start)?;
    let end_ms = parse_time_ms("end", &args.end)?;
    let config = args.backtest_config()?;

    let client = BinanceRestClient::new(&args.rest_base_url)?;
    let candles = client
        .fetch_klines(&args.symbol, &args.interval, start_ms, end_ms)
        .await
        .context("fetch klines")?;
    if candles.is_empty() {
        bail!("no candles fetched");
    }

    let result = backtest::run(&candles, &config).context("backtest")?;
    println!("{}", result);
    Ok(())
}
