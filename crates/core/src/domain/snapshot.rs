use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One complete, self-consistent set of market and sentiment figures.
///
/// Snapshots are built wholesale by the generator and shared as `Arc<SentimentSnapshot>`;
/// nothing mutates one after it has been handed to the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentSnapshot {
    pub timestamp: DateTime<Utc>,
    pub overall_sentiment: f64,
    pub market_index: String,
    pub current_value: f64,
    pub previous_close: f64,
    pub percent_change: f64,
    pub volume: u64,
    pub sectors: Vec<SectorSentiment>,
    pub top_stocks: Vec<StockSentiment>,
    pub recent_news: Vec<NewsItem>,
    pub sentiment_trend: Vec<TrendPoint>,
    pub volatility_index: f64,
    pub market_breadth: MarketBreadth,
    pub technical_indicators: TechnicalIndicators,
    pub global_markets: Vec<GlobalMarket>,
    pub price_correlation: PriceCorrelation,
    pub sentiment_prediction: SentimentPrediction,
    pub cluster_analysis: ClusterAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectorSentiment {
    pub name: String,
    pub sentiment: f64,
    pub percent_change: f64,
    pub volume: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSentiment {
    pub symbol: String,
    pub name: String,
    pub sentiment: f64,
    pub price: f64,
    pub percent_change: f64,
    pub volume: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsItem {
    pub id: String,
    pub title: String,
    pub source: String,
    pub published_at: DateTime<Utc>,
    pub url: String,
    pub sentiment: f64,
    pub impact_score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub timestamp: DateTime<Utc>,
    pub sentiment: f64,
    pub index_value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketBreadth {
    pub advancers: u32,
    pub decliners: u32,
    pub unchanged: u32,
    pub new_highs: u32,
    pub new_lows: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TechnicalIndicators {
    pub rsi: f64,
    pub macd: f64,
    pub moving_averages: MovingAverages,
    pub bollinger_bands: BollingerBands,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovingAverages {
    pub ma50: f64,
    pub ma200: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BollingerBands {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalMarket {
    pub name: String,
    pub index: String,
    pub value: f64,
    pub percent_change: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceCorrelation {
    pub stocks: Vec<CorrelatedStock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelatedStock {
    pub symbol: String,
    pub name: String,
    pub price: f64,
    pub percent_change: f64,
    /// Billions of USD.
    pub market_cap: f64,
    pub correlation_index: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentPrediction {
    pub historical_data: Vec<HistoricalSentimentPoint>,
    pub predictions: Vec<PredictionPoint>,
    /// Percent, e.g. `85.0`.
    pub confidence_level: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSentimentPoint {
    pub date: NaiveDate,
    pub actual: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lower: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upper: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionPoint {
    pub date: NaiveDate,
    pub predicted: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAnalysis {
    pub stocks: Vec<ClusteredStock>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusteredStock {
    pub symbol: String,
    pub name: String,
    pub volatility: f64,
    pub momentum: f64,
    pub market_cap: f64,
    pub cluster: Cluster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Cluster {
    HighGrowth,
    Value,
    Cyclical,
    Defensive,
}

impl Cluster {
    pub const ALL: [Cluster; 4] = [
        Cluster::HighGrowth,
        Cluster::Value,
        Cluster::Cyclical,
        Cluster::Defensive,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Cluster::HighGrowth => "High Growth",
            Cluster::Value => "Value",
            Cluster::Cyclical => "Cyclical",
            Cluster::Defensive => "Defensive",
        }
    }
}

/// Standalone volatility forecast (not part of the snapshot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolatilityForecast {
    pub historical: Vec<VolatilityObservation>,
    pub forecast: Vec<PredictionPoint>,
    pub long_term_mean: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolatilityObservation {
    pub date: NaiveDate,
    pub value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moving_average: Option<f64>,
}
