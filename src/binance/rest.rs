use anyhow::{Context, Result};
use serde_json::Value;
use std::time::Duration;

use crate::error::AppError;
use crate::model::candle::Candle;

use super::types::{parse_kline_row, BinanceApiErrorResponse};

const KLINE_PAGE_LIMIT: usize = 1000;
const PAGE_PAUSE: Duration = Duration::from_millis(150);

/// Public market-data endpoints; nothing here is signed.
pub struct BinanceRestClient {
    http: reqwest::Client,
    base_url: String,
}

impl BinanceRestClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn ping(&self) -> Result<()> {
        let url = format!("{}/api/v3/ping", self.base_url);
        self.http
            .get(&url)
            .send()
            .await
            .context("ping failed")?
            .error_for_status()
            .context("ping returned error status")?;
        Ok(())
    }

    /// Fetch every kline between `start_ms` and `end_ms`, oldest first,
    /// paging through the 1000-row limit.
    pub async fn fetch_klines(
        &self,
        symbol: &str,
        interval: &str,
        start_ms: u64,
        end_ms: u64,
    ) -> Result<Vec<Candle>> {
        if symbol.trim().is_empty() {
            return Err(invalid("symbol", "required"));
        }
        if interval.trim().is_empty() {
            return Err(invalid("interval", "required"));
        }
        if end_ms <= start_ms {
            return Err(invalid("end", "must be after start"));
        }

        let url = format!("{}/api/v3/klines", self.base_url);
        let limit = KLINE_PAGE_LIMIT.to_string();
        let end = end_ms.to_string();
        let mut start_ms = start_ms;
        let mut out = Vec::new();

        loop {
            let start = start_ms.to_string();
            let resp = self
                .http
                .get(&url)
                .query(&[
                    ("symbol", symbol),
                    ("interval", interval),
                    ("limit", limit.as_str()),
                    ("startTime", start.as_str()),
                    ("endTime", end.as_str()),
                ])
                .send()
                .await
                .context("fetch_klines HTTP failed")?;

            if !resp.status().is_success() {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                if let Ok(err) = serde_json::from_str::<BinanceApiErrorResponse>(&body) {
                    return Err(AppError::BinanceApi {
                        code: err.code,
                        msg: err.msg,
                    }
                    .into());
                }
                return Err(anyhow::anyhow!("binance klines http {}: {}", status, body));
            }

            let rows: Vec<Vec<Value>> = resp.json().await.context("klines JSON parse failed")?;
            if rows.is_empty() {
                break;
            }
            let page_len = rows.len();
            let before = out.len();
            out.extend(rows.iter().filter_map(|row| parse_kline_row(symbol, row)));

            let Some(last_close) = out[before..].last().map(|c| c.close_time) else {
                break;
            };
            tracing::debug!(symbol, rows = page_len, last_close, "Fetched kline page");

            let next_start = last_close + 1;
            if next_start >= end_ms || page_len < KLINE_PAGE_LIMIT {
                break;
            }
            start_ms = next_start;
            tokio::time::sleep(PAGE_PAUSE).await;
        }

        tracing::info!(symbol, interval, count = out.len(), "Fetched historical klines");
        Ok(out)
    }
}

fn invalid(key: &str, reason: &str) -> anyhow::Error {
    AppError::InvalidSetting {
        key: key.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
