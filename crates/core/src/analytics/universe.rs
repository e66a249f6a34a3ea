/// Fixed sector taxonomy: display name and the provider's sector label.
pub const SECTORS: [(&str, &str); 10] = [
    ("Technology", "Information Technology"),
    ("Healthcare", "Health Care"),
    ("Financials", "Financials"),
    ("Consumer Discretionary", "Consumer Discretionary"),
    ("Communication Services", "Communication Services"),
    ("Industrials", "Industrials"),
    ("Energy", "Energy"),
    ("Utilities", "Utilities"),
    ("Materials", "Materials"),
    ("Real Estate", "Real Estate"),
];

#[derive(Debug, Clone, Copy)]
pub struct WatchlistEntry {
    pub symbol: &'static str,
    pub name: &'static str,
    pub base_price: f64,
    /// Billions of USD at `base_price`.
    pub market_cap_bn: f64,
    /// Typical daily move in percent; drives the volatility axis of the cluster view.
    pub typical_move_pct: f64,
}

pub const WATCHLIST: [WatchlistEntry; 10] = [
    WatchlistEntry { symbol: "AAPL", name: "Apple Inc.", base_price: 190.0, market_cap_bn: 2950.0, typical_move_pct: 1.4 },
    WatchlistEntry { symbol: "MSFT", name: "Microsoft Corporation", base_price: 410.0, market_cap_bn: 3050.0, typical_move_pct: 1.3 },
    WatchlistEntry { symbol: "GOOGL", name: "Alphabet Inc.", base_price: 165.0, market_cap_bn: 2050.0, typical_move_pct: 1.7 },
    WatchlistEntry { symbol: "AMZN", name: "Amazon.com Inc.", base_price: 180.0, market_cap_bn: 1880.0, typical_move_pct: 1.9 },
    WatchlistEntry { symbol: "META", name: "Meta Platforms Inc.", base_price: 480.0, market_cap_bn: 1220.0, typical_move_pct: 2.3 },
    WatchlistEntry { symbol: "TSLA", name: "Tesla Inc.", base_price: 220.0, market_cap_bn: 700.0, typical_move_pct: 3.6 },
    WatchlistEntry { symbol: "NVDA", name: "NVIDIA Corporation", base_price: 880.0, market_cap_bn: 2200.0, typical_move_pct: 3.1 },
    WatchlistEntry { symbol: "JPM", name: "JPMorgan Chase & Co.", base_price: 195.0, market_cap_bn: 560.0, typical_move_pct: 1.2 },
    WatchlistEntry { symbol: "V", name: "Visa Inc.", base_price: 275.0, market_cap_bn: 560.0, typical_move_pct: 1.0 },
    WatchlistEntry { symbol: "JNJ", name: "Johnson & Johnson", base_price: 155.0, market_cap_bn: 375.0, typical_move_pct: 0.8 },
];

pub fn watchlist_entry(symbol: &str) -> Option<&'static WatchlistEntry> {
    WATCHLIST.iter().find(|e| e.symbol == symbol)
}

pub const NEWS_HEADLINES: [&str; 10] = [
    "Federal Reserve Signals Interest Rate Decision",
    "Major Tech Companies Report Quarterly Earnings",
    "Oil Prices Surge Amid Global Supply Concerns",
    "Inflation Data Shows Unexpected Trend",
    "New Government Policy Impacts Market Sectors",
    "Retail Sales Data Exceeds Analyst Expectations",
    "Global Markets React to Economic Indicator Release",
    "Trade Negotiations Affect International Markets",
    "Banking Sector Faces Regulatory Changes",
    "Technology Innovation Drives Stock Movements",
];

pub const NEWS_SOURCES: [&str; 5] = [
    "Bloomberg",
    "Reuters",
    "CNBC",
    "Financial Times",
    "Wall Street Journal",
];

#[derive(Debug, Clone, Copy)]
pub struct Region {
    pub name: &'static str,
    pub index: &'static str,
    pub base_value: f64,
    /// How strongly the region follows the US move.
    pub us_beta: f64,
}

pub const GLOBAL_REGIONS: [Region; 5] = [
    Region { name: "United States", index: "S&P 500", base_value: 520.0, us_beta: 1.0 },
    Region { name: "Europe", index: "STOXX 600", base_value: 505.0, us_beta: 0.6 },
    Region { name: "United Kingdom", index: "FTSE 100", base_value: 8100.0, us_beta: 0.5 },
    Region { name: "Japan", index: "Nikkei 225", base_value: 38500.0, us_beta: 0.45 },
    Region { name: "Hong Kong", index: "Hang Seng", base_value: 17200.0, us_beta: 0.35 },
];

pub const PRIMARY_INDEX_NAME: &str = "S&P 500";
/// Synthetic level used when neither a quote nor intraday bars are available. The index is
/// tracked through SPY, so this sits on the SPY price scale like the real inputs.
pub const SYNTHETIC_INDEX_BASE: f64 = 520.0;
