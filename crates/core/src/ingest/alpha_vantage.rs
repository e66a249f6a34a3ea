use crate::config::Settings;
use crate::ingest::error::ProviderError;
use crate::ingest::provider::{MarketDataProvider, PRIMARY_INDEX_SYMBOL};
use crate::ingest::types::{IndexQuote, IntradayBar, SectorPerformance};
use crate::time::us_market::parse_eastern_timestamp;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
// Public, heavily rate-limited key. Fine for a best-effort enrichment.
const DEMO_API_KEY: &str = "demo";
const INTRADAY_INTERVAL: &str = "5min";
const SECTOR_REALTIME_KEY: &str = "Rank A: Real-Time Performance";

#[derive(Debug, Clone)]
pub struct AlphaVantageClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl AlphaVantageClient {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let api_key = match settings.require_alpha_vantage_key() {
            Ok(k) => k.to_string(),
            Err(_) => {
                tracing::warn!("ALPHA_VANTAGE_KEY not set; using the public demo key");
                DEMO_API_KEY.to_string()
            }
        };
        let base_url = settings
            .alpha_vantage_base_url
            .clone()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout_secs = settings
            .alpha_vantage_timeout_secs
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self::new(base_url, api_key, Duration::from_secs(timeout_secs))
    }

    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            http,
            base_url,
            api_key,
        })
    }

    pub fn is_demo_key(&self) -> bool {
        self.api_key == DEMO_API_KEY
    }

    fn url(&self) -> String {
        format!("{}/query", self.base_url.trim_end_matches('/'))
    }

    async fn get_json(&self, endpoint: &'static str, params: &[(&str, &str)]) -> Result<Value> {
        let res = self
            .http
            .get(self.url())
            .query(&[("function", endpoint)])
            .query(params)
            .query(&[("apikey", self.api_key.as_str())])
            .send()
            .await
            .with_context(|| format!("{endpoint} request failed"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .with_context(|| format!("failed to read {endpoint} response"))?;
        let raw_json = serde_json::from_str::<Value>(&text)
            .with_context(|| format!("{endpoint} response is not valid JSON: {text}"))?;

        if !status.is_success() {
            anyhow::bail!("{endpoint} HTTP {status}: {raw_json}");
        }

        reject_api_notice(endpoint, &raw_json)?;
        Ok(raw_json)
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for AlphaVantageClient {
    fn provider_name(&self) -> &'static str {
        "alpha_vantage"
    }

    async fn fetch_index_quote(&self) -> Result<IndexQuote> {
        let raw = self
            .get_json("GLOBAL_QUOTE", &[("symbol", PRIMARY_INDEX_SYMBOL)])
            .await?;
        parse_global_quote(raw)
    }

    async fn fetch_sector_performance(&self) -> Result<SectorPerformance> {
        let raw = self.get_json("SECTOR", &[]).await?;
        parse_sector_performance(raw)
    }

    async fn fetch_intraday(&self, symbol: &str) -> Result<Vec<IntradayBar>> {
        let raw = self
            .get_json(
                "TIME_SERIES_INTRADAY",
                &[("symbol", symbol), ("interval", INTRADAY_INTERVAL)],
            )
            .await;
        if raw.is_err() && self.is_demo_key() {
            tracing::debug!(%symbol, "intraday fetch failed with the demo key; expect rate limits");
        }
        parse_intraday(raw?, INTRADAY_INTERVAL)
    }
}

/// Rate-limit and bad-request replies come back as HTTP 200 with a single message key.
fn reject_api_notice(endpoint: &'static str, raw: &Value) -> Result<()> {
    for key in ["Note", "Information", "Error Message"] {
        if let Some(msg) = raw.get(key).and_then(Value::as_str) {
            return Err(ProviderError {
                endpoint,
                stage: "api_notice",
                detail: msg.to_string(),
                raw_response_json: Some(raw.clone()),
            }
            .into());
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
struct GlobalQuoteEnvelope {
    #[serde(rename = "Global Quote")]
    quote: RawGlobalQuote,
}

#[derive(Debug, Deserialize)]
struct RawGlobalQuote {
    #[serde(rename = "01. symbol")]
    symbol: String,
    #[serde(rename = "05. price")]
    price: String,
    #[serde(rename = "06. volume")]
    volume: String,
    #[serde(rename = "07. latest trading day", default)]
    latest_trading_day: String,
    #[serde(rename = "08. previous close")]
    previous_close: String,
    #[serde(rename = "10. change percent")]
    change_percent: String,
}

pub fn parse_global_quote(raw: Value) -> Result<IndexQuote> {
    let env = serde_json::from_value::<GlobalQuoteEnvelope>(raw)
        .context("failed to parse GLOBAL_QUOTE response")?;
    let q = env.quote;

    Ok(IndexQuote {
        price: parse_num(&q.price).context("missing price")?,
        previous_close: parse_num(&q.previous_close).context("missing previous close")?,
        change_percent: parse_percent(&q.change_percent).context("missing change percent")?,
        volume: parse_num(&q.volume).context("missing volume")?.max(0.0) as u64,
        latest_trading_day: NaiveDate::parse_from_str(q.latest_trading_day.trim(), "%Y-%m-%d")
            .ok(),
        symbol: q.symbol,
    })
}

pub fn parse_sector_performance(raw: Value) -> Result<SectorPerformance> {
    let table = raw
        .get(SECTOR_REALTIME_KEY)
        .and_then(Value::as_object)
        .with_context(|| format!("SECTOR response has no {SECTOR_REALTIME_KEY:?} table"))?;

    let mut percent_by_sector = BTreeMap::new();
    for (name, v) in table {
        let pct = v
            .as_str()
            .and_then(parse_percent)
            .with_context(|| format!("sector {name} has a non-numeric change: {v}"))?;
        percent_by_sector.insert(name.clone(), pct);
    }
    anyhow::ensure!(!percent_by_sector.is_empty(), "sector table is empty");

    Ok(SectorPerformance { percent_by_sector })
}

#[derive(Debug, Deserialize)]
struct RawBar {
    #[serde(rename = "1. open")]
    open: String,
    #[serde(rename = "2. high")]
    high: String,
    #[serde(rename = "3. low")]
    low: String,
    #[serde(rename = "4. close")]
    close: String,
    #[serde(rename = "5. volume")]
    volume: String,
}

/// Returns bars sorted ascending by timestamp; the API lists them newest first.
pub fn parse_intraday(raw: Value, interval: &str) -> Result<Vec<IntradayBar>> {
    let key = format!("Time Series ({interval})");
    let series = raw
        .get(&key)
        .cloned()
        .with_context(|| format!("intraday response has no {key:?} series"))?;
    let series = serde_json::from_value::<BTreeMap<String, RawBar>>(series)
        .context("failed to parse intraday bars")?;

    let mut out = Vec::with_capacity(series.len());
    for (ts, bar) in series {
        let timestamp = parse_eastern_timestamp(&ts)
            .with_context(|| format!("invalid intraday timestamp: {ts}"))?;
        out.push(IntradayBar {
            timestamp,
            open: parse_num(&bar.open).context("missing open")?,
            high: parse_num(&bar.high).context("missing high")?,
            low: parse_num(&bar.low).context("missing low")?,
            close: parse_num(&bar.close).context("missing close")?,
            volume: parse_num(&bar.volume).unwrap_or(0.0).max(0.0) as u64,
        });
    }
    out.sort_by_key(|b| b.timestamp);
    Ok(out)
}

fn parse_num(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_percent(s: &str) -> Option<f64> {
    parse_num(s.trim().trim_end_matches('%'))
}
