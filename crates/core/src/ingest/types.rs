use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Primary index quote with the string-encoded API fields already parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexQuote {
    pub symbol: String,
    pub price: f64,
    pub previous_close: f64,
    pub change_percent: f64,
    pub volume: u64,
    pub latest_trading_day: Option<NaiveDate>,
}

/// Real-time sector performance in percent, keyed by the provider's sector name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SectorPerformance {
    pub percent_by_sector: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntradayBar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Everything a single refresh managed to fetch. Absent fields fall back to synthetic data.
#[derive(Debug, Clone, Default)]
pub struct MarketInputs {
    pub quote: Option<IndexQuote>,
    pub sectors: Option<SectorPerformance>,
    pub intraday: Option<Vec<IntradayBar>>,
}
