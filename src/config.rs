use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub binance: BinanceConfig,
    pub trend: TrendConfig,
    pub candle: CandleConfig,
    pub breakout: BreakoutConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BinanceConfig {
    pub rest_base_url: String,
    pub ws_base_url: String,
    pub symbol: String,
    pub symbols: Vec<String>,
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            rest_base_url: "https://api.binance.com".to_string(),
            ws_base_url: "wss://stream.binance.com:9443/ws".to_string(),
            symbol: "BTCUSDT".to_string(),
            symbols: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrendConfig {
    pub ema_fast: usize,
    pub ema_slow: usize,
    pub confirm_ticks: u32,
    /// Minimum |fast - slow| / price before a direction counts.
    pub min_diff: f64,
    pub cooldown: String,
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            ema_fast: 20,
            ema_slow: 50,
            confirm_ticks: 3,
            min_diff: 0.00005,
            cooldown: "10s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CandleConfig {
    pub interval: String,
}

impl Default for CandleConfig {
    fn default() -> Self {
        Self {
            interval: "5s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BreakoutConfig {
    pub lookback: String,
    pub pct: f64,
    pub cooldown: String,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            lookback: "5m".to_string(),
            pct: 0.001,
            cooldown: "30s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub http_addr: String,
    /// Period of the last-price status log line; "0" disables it.
    pub status_log_interval: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            status_log_interval: "0".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Parse a Binance kline interval string (e.g. "1s", "1m", "1h", "1d", "1w", "1M") into milliseconds.
pub fn parse_interval_ms(s: &str) -> Result<u64> {
    if s.len() < 2 {
        bail!("invalid interval '{}': expected format like '1m'", s);
    }

    let (num_str, suffix) = s.split_at(s.len() - 1);
    let n: u64 = num_str.parse().with_context(|| {
        format!(
            "invalid interval '{}': quantity must be a positive integer",
            s
        )
    })?;
    if n == 0 {
        bail!("invalid interval '{}': quantity must be > 0", s);
    }

    let unit_ms = match suffix {
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        "w" => 7 * 86_400_000,
        "M" => 30 * 86_400_000,
        _ => bail!(
            "invalid interval '{}': unsupported suffix '{}', expected one of s/m/h/d/w/M",
            s,
            suffix
        ),
    };

    n.checked_mul(unit_ms)
        .with_context(|| format!("invalid interval '{}': value is too large", s))
}

/// Parse a duration such as "250ms", "10s", "1.5s" or "1m30s" into milliseconds.
///
/// Accepts a sequence of `<number><unit>` terms with units ms/s/m/h/d/w;
/// numbers may be fractional. "0" and the empty string mean zero. The total
/// is rounded to the nearest millisecond.
pub fn parse_duration_ms(s: &str) -> Result<u64> {
    let s = s.trim();
    if s.is_empty() || s == "0" {
        return Ok(0);
    }

    let is_number = |c: char| c.is_ascii_digit() || c == '.';
    let mut rest = s;
    let mut total_ms = 0.0_f64;
    while !rest.is_empty() {
        let (num, tail) = rest.split_at(rest.find(|c: char| !is_number(c)).unwrap_or(rest.len()));
        if num.is_empty() {
            bail!("invalid duration '{}': expected e.g. '250ms', '10s' or '1m30s'", s);
        }
        let value: f64 = num
            .parse()
            .with_context(|| format!("invalid duration '{}': bad number '{}'", s, num))?;

        let (unit, next) = tail.split_at(tail.find(is_number).unwrap_or(tail.len()));
        let unit_ms = match unit {
            "ms" => 1.0,
            "s" => 1_000.0,
            "m" => 60_000.0,
            "h" => 3_600_000.0,
            "d" => 86_400_000.0,
            "w" => 7.0 * 86_400_000.0,
            "" => bail!("invalid duration '{}': missing unit after '{}'", s, num),
            _ => bail!(
                "invalid duration '{}': unsupported unit '{}', expected one of ms/s/m/h/d/w",
                s,
                unit
            ),
        };
        total_ms += value * unit_ms;
        rest = next;
    }

    if !total_ms.is_finite() || total_ms >= u64::MAX as f64 {
        bail!("invalid duration '{}': value is too large", s);
    }
    Ok(total_ms.round() as u64)
}

impl BinanceConfig {
    pub fn tradable_symbols(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.symbol.trim().is_empty() {
            out.push(self.symbol.trim().to_ascii_uppercase());
        }
        for sym in &self.symbols {
            let s = sym.trim().to_ascii_uppercase();
            if !s.is_empty() && !out.iter().any(|v| v == &s) {
                out.push(s);
            }
        }
        out
    }
}

impl TrendConfig {
    pub fn cooldown_ms(&self) -> Result<u64> {
        parse_duration_ms(&self.cooldown).context("trend.cooldown is invalid")
    }
}

impl CandleConfig {
    pub fn interval_ms(&self) -> Result<u64> {
        parse_duration_ms(&self.interval).context("candle.interval is invalid")
    }
}

impl BreakoutConfig {
    pub fn lookback_ms(&self) -> Result<u64> {
        parse_duration_ms(&self.lookback).context("breakout.lookback is invalid")
    }

    pub fn cooldown_ms(&self) -> Result<u64> {
        parse_duration_ms(&self.cooldown).context("breakout.cooldown is invalid")
    }
}

impl ServerConfig {
    pub fn status_log_interval_ms(&self) -> Result<u64> {
        parse_duration_ms(&self.status_log_interval).context("server.status_log_interval is invalid")
    }
}

impl Config {
    /// Load from a TOML file. A missing file yields the defaults.
    ///
    /// Values are not validated here so that command-line overrides can be
    /// applied first; call [`Config::validate`] once the final config is built.
    pub fn load(path: &Path) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = if path.exists() {
            let config_str = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            Self::from_toml(&config_str)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            Self::default()
        };

        Ok(config)
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.trend.cooldown_ms()?;
        self.candle.interval_ms()?;
        self.breakout.lookback_ms()?;
        self.breakout.cooldown_ms()?;
        self.server.status_log_interval_ms()?;
        if self.binance.tradable_symbols().is_empty() {
            bail!("binance.symbol or binance.symbols must name at least one symbol");
        }
        Ok(())
    }
}
