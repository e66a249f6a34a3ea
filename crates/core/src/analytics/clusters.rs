use crate::analytics::universe::watchlist_entry;
use crate::analytics::{clamp_sentiment, round2};
use crate::domain::snapshot::{
    Cluster, ClusterAnalysis, ClusteredStock, CorrelatedStock, PriceCorrelation, StockSentiment,
};
use rand::Rng;

/// Daily move (percent) treated as "very volatile" when normalizing the volatility axis.
const VOLATILITY_SCALE: f64 = 4.0;

// (normalized volatility, momentum)
const CENTROIDS: [(Cluster, f64, f64); 4] = [
    (Cluster::HighGrowth, 0.75, 0.5),
    (Cluster::Value, 0.25, 0.25),
    (Cluster::Cyclical, 0.75, -0.5),
    (Cluster::Defensive, 0.25, -0.25),
];

/// Scales a stock's base market cap by how far its price has moved from the reference price.
fn market_cap(stock: &StockSentiment) -> f64 {
    match watchlist_entry(&stock.symbol) {
        Some(entry) => round2(entry.market_cap_bn * stock.price / entry.base_price),
        None => 0.0,
    }
}

/// How closely a stock tracks the overall mood: 1 = identical sentiment, -1 = opposite extremes.
pub fn correlation_index(stock_sentiment: f64, overall: f64) -> f64 {
    clamp_sentiment(1.0 - (stock_sentiment - overall).abs())
}

pub fn price_correlation(stocks: &[StockSentiment], overall: f64) -> PriceCorrelation {
    PriceCorrelation {
        stocks: stocks
            .iter()
            .map(|s| CorrelatedStock {
                symbol: s.symbol.clone(),
                name: s.name.clone(),
                price: s.price,
                percent_change: s.percent_change,
                market_cap: market_cap(s),
                correlation_index: round2(correlation_index(s.sentiment, overall)),
            })
            .collect(),
    }
}

/// Nearest fixed centroid in (normalized volatility, momentum) space.
pub fn assign_cluster(volatility: f64, momentum: f64) -> Cluster {
    let v = (volatility / VOLATILITY_SCALE).clamp(0.0, 1.0);
    let mut best = Cluster::Value;
    let mut best_dist = f64::INFINITY;
    for (cluster, cv, cm) in CENTROIDS {
        let dist = (v - cv).powi(2) + (momentum - cm).powi(2);
        if dist < best_dist {
            best = cluster;
            best_dist = dist;
        }
    }
    best
}

pub fn cluster_analysis<R: Rng>(stocks: &[StockSentiment], rng: &mut R) -> ClusterAnalysis {
    ClusterAnalysis {
        stocks: stocks
            .iter()
            .map(|s| {
                let typical = watchlist_entry(&s.symbol)
                    .map(|e| e.typical_move_pct)
                    .unwrap_or(1.5);
                let volatility = round2(
                    (typical * (1.0 + s.percent_change.abs() / 5.0) * rng.random_range(0.85..1.15))
                        .max(0.0),
                );
                let momentum = round2(clamp_sentiment(s.percent_change / 5.0));

                ClusteredStock {
                    symbol: s.symbol.clone(),
                    name: s.name.clone(),
                    volatility,
                    momentum,
                    market_cap: market_cap(s),
                    cluster: assign_cluster(volatility, momentum),
                }
            })
            .collect(),
    }
}
