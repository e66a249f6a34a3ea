use crate::domain::snapshot::{
    PredictionPoint, SentimentSnapshot, TechnicalIndicators, VolatilityForecast,
};
use anyhow::ensure;

pub const SECTOR_COUNT: usize = 10;
pub const WATCHLIST_LEN: usize = 10;
pub const TREND_POINTS: usize = 24;
pub const GLOBAL_MARKET_COUNT: usize = 5;
pub const HISTORY_DAYS: usize = 14;
pub const PREDICTION_DAYS: usize = 5;

impl SentimentSnapshot {
    /// Checks every range and shape guarantee the chart layer relies on.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure_sentiment("overallSentiment", self.overall_sentiment)?;
        ensure!(
            self.current_value.is_finite() && self.previous_close.is_finite(),
            "index values must be finite"
        );
        ensure!(
            self.percent_change.is_finite(),
            "percentChange must be finite (got {})",
            self.percent_change
        );

        ensure!(
            self.sectors.len() == SECTOR_COUNT,
            "snapshot must contain exactly {SECTOR_COUNT} sectors (got {})",
            self.sectors.len()
        );
        for sector in &self.sectors {
            ensure_sentiment(&sector.name, sector.sentiment)?;
        }

        ensure!(
            self.top_stocks.len() == WATCHLIST_LEN,
            "snapshot must contain exactly {WATCHLIST_LEN} stocks (got {})",
            self.top_stocks.len()
        );
        for stock in &self.top_stocks {
            ensure_sentiment(&stock.symbol, stock.sentiment)?;
            ensure!(stock.price > 0.0, "{} price must be positive", stock.symbol);
        }

        for news in &self.recent_news {
            ensure_sentiment(&news.id, news.sentiment)?;
            ensure!(
                (0.0..=1.0).contains(&news.impact_score),
                "{} impactScore must be in [0, 1] (got {})",
                news.id,
                news.impact_score
            );
        }

        ensure!(
            self.sentiment_trend.len() == TREND_POINTS,
            "sentimentTrend must have {TREND_POINTS} points (got {})",
            self.sentiment_trend.len()
        );
        for pair in self.sentiment_trend.windows(2) {
            ensure!(
                pair[0].timestamp <= pair[1].timestamp,
                "sentimentTrend must be chronological"
            );
        }
        for point in &self.sentiment_trend {
            ensure_sentiment("trend point", point.sentiment)?;
        }

        ensure!(
            self.volatility_index.is_finite() && self.volatility_index >= 0.0,
            "volatilityIndex must be non-negative (got {})",
            self.volatility_index
        );

        validate_indicators(&self.technical_indicators)?;

        ensure!(
            self.global_markets.len() == GLOBAL_MARKET_COUNT,
            "globalMarkets must have {GLOBAL_MARKET_COUNT} regions (got {})",
            self.global_markets.len()
        );

        ensure!(
            self.price_correlation.stocks.len() == WATCHLIST_LEN,
            "priceCorrelation must cover the watchlist"
        );
        for stock in &self.price_correlation.stocks {
            ensure!(
                (-1.0..=1.0).contains(&stock.correlation_index),
                "{} correlationIndex out of range: {}",
                stock.symbol,
                stock.correlation_index
            );
        }

        let prediction = &self.sentiment_prediction;
        ensure!(
            prediction.historical_data.len() == HISTORY_DAYS,
            "sentimentPrediction history must span {HISTORY_DAYS} days (got {})",
            prediction.historical_data.len()
        );
        ensure!(
            prediction.predictions.len() == PREDICTION_DAYS,
            "sentimentPrediction must forecast {PREDICTION_DAYS} days (got {})",
            prediction.predictions.len()
        );
        for point in &prediction.historical_data {
            ensure_sentiment("historical actual", point.actual)?;
            if let (Some(p), Some(l), Some(u)) = (point.predicted, point.lower, point.upper) {
                ensure_band(point.date, l, p, u)?;
            }
        }
        for point in &prediction.predictions {
            ensure_sentiment("predicted", point.predicted)?;
            validate_prediction_point(point)?;
        }

        ensure!(
            self.cluster_analysis.stocks.len() == WATCHLIST_LEN,
            "clusterAnalysis must cover the watchlist"
        );
        for stock in &self.cluster_analysis.stocks {
            ensure!(
                stock.volatility >= 0.0,
                "{} volatility must be non-negative",
                stock.symbol
            );
            ensure!(
                (-1.0..=1.0).contains(&stock.momentum),
                "{} momentum out of range: {}",
                stock.symbol,
                stock.momentum
            );
        }

        Ok(())
    }
}

impl VolatilityForecast {
    pub fn validate(&self) -> anyhow::Result<()> {
        for point in &self.forecast {
            validate_prediction_point(point)?;
            ensure!(
                (5.0..=45.0).contains(&point.predicted),
                "volatility forecast out of [5, 45]: {}",
                point.predicted
            );
        }
        Ok(())
    }
}

fn validate_indicators(ind: &TechnicalIndicators) -> anyhow::Result<()> {
    ensure!(
        (0.0..=100.0).contains(&ind.rsi),
        "rsi must be in [0, 100] (got {})",
        ind.rsi
    );
    ensure!(ind.macd.is_finite(), "macd must be finite");
    let bands = &ind.bollinger_bands;
    ensure!(
        bands.lower <= bands.middle && bands.middle <= bands.upper,
        "bollinger bands out of order: lower={} middle={} upper={}",
        bands.lower,
        bands.middle,
        bands.upper
    );
    Ok(())
}

fn validate_prediction_point(point: &PredictionPoint) -> anyhow::Result<()> {
    ensure_band(point.date, point.lower, point.predicted, point.upper)
}

fn ensure_band(
    date: chrono::NaiveDate,
    lower: f64,
    predicted: f64,
    upper: f64,
) -> anyhow::Result<()> {
    ensure!(
        lower <= predicted && predicted <= upper,
        "prediction band out of order on {date}: lower={lower} predicted={predicted} upper={upper}"
    );
    Ok(())
}

fn ensure_sentiment(label: &str, v: f64) -> anyhow::Result<()> {
    ensure!(
        (-1.0..=1.0).contains(&v),
        "{label} sentiment must be in [-1, 1] (got {v})"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn rejects_inverted_band() {
        let p = PredictionPoint {
            date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            predicted: 0.2,
            lower: 0.3,
            upper: 0.5,
        };
        assert!(validate_prediction_point(&p).is_err());
    }

    #[test]
    fn rejects_out_of_range_sentiment() {
        assert!(ensure_sentiment("x", 1.01).is_err());
        assert!(ensure_sentiment("x", -1.0).is_ok());
        assert!(ensure_sentiment("x", f64::NAN).is_err());
    }
}
