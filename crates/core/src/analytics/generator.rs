use crate::analytics::clusters::{cluster_analysis, price_correlation};
use crate::analytics::forecast::{sentiment_prediction, VolatilityModel};
use crate::analytics::indicators::{market_breadth, technical_indicators, volatility_index};
use crate::analytics::round2;
use crate::analytics::sentiment::{
    index_from_bars, index_from_quote, overall_sentiment, recent_news, sector_sentiments,
    stock_sentiments, synthetic_index, synthetic_trend, trend_from_bars, IndexLevel,
};
use crate::analytics::universe::{GLOBAL_REGIONS, PRIMARY_INDEX_NAME};
use crate::config::Settings;
use crate::domain::snapshot::{GlobalMarket, SentimentSnapshot, VolatilityForecast};
use crate::ingest::alpha_vantage::AlphaVantageClient;
use crate::ingest::provider::{fetch_market_inputs, MarketDataProvider};
use crate::ingest::types::MarketInputs;
use crate::time::us_market::last_session_date;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Anything that can produce a fresh snapshot. The feed only depends on this seam.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn generate(&self) -> Result<SentimentSnapshot>;
}

pub struct SnapshotGenerator {
    provider: Arc<dyn MarketDataProvider>,
    rng: Mutex<StdRng>,
    volatility_model: VolatilityModel,
}

impl SnapshotGenerator {
    /// `seed = None` draws from the OS; a fixed seed makes every refresh reproducible.
    pub fn new(provider: Arc<dyn MarketDataProvider>, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            provider,
            rng: Mutex::new(rng),
            volatility_model: VolatilityModel::default(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let client = AlphaVantageClient::from_settings(settings)
            .context("failed to build market data client")?;
        Ok(Self::new(Arc::new(client), settings.rng_seed))
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Assembles a snapshot from whatever was fetched. Every missing input is synthesized.
    pub fn build(&self, now: DateTime<Utc>, inputs: MarketInputs) -> Result<SentimentSnapshot> {
        let mut rng = self.rng.lock();
        let rng = &mut *rng;

        // Quote first, then the intraday feed, so the level shares the trend's price scale.
        let index = match (inputs.quote.as_ref(), inputs.intraday.as_deref()) {
            (Some(q), _) if q.price > 0.0 => index_from_quote(q),
            (_, Some(bars)) => index_from_bars(bars).unwrap_or_else(|| synthetic_index(rng)),
            _ => synthetic_index(rng),
        };
        let overall = overall_sentiment(index.percent_change);

        let sectors = sector_sentiments(inputs.sectors.as_ref(), rng);
        let top_stocks = stock_sentiments(index.percent_change, rng);
        let sentiment_trend = match inputs.intraday.as_deref().and_then(trend_from_bars) {
            Some(trend) => trend,
            None => synthetic_trend(now, &index, overall, rng),
        };

        let technical_indicators = technical_indicators(&sentiment_trend, &index, rng);
        let volatility_index = volatility_index(&index, overall, rng);
        let market_breadth = market_breadth(overall, rng);
        let recent_news = recent_news(now, overall, rng);
        let global_markets = global_markets(&index, rng);
        let price_correlation = price_correlation(&top_stocks, overall);
        let cluster_analysis = cluster_analysis(&top_stocks, rng);
        let sentiment_prediction = sentiment_prediction(now.date_naive(), overall, rng);

        let snapshot = SentimentSnapshot {
            timestamp: now,
            overall_sentiment: round2(overall),
            market_index: PRIMARY_INDEX_NAME.to_string(),
            current_value: index.current_value,
            previous_close: index.previous_close,
            percent_change: index.percent_change,
            volume: index.volume,
            sectors,
            top_stocks,
            recent_news,
            sentiment_trend,
            volatility_index,
            market_breadth,
            technical_indicators,
            global_markets,
            price_correlation,
            sentiment_prediction,
            cluster_analysis,
        };

        snapshot
            .validate()
            .context("generated snapshot failed validation")?;
        Ok(snapshot)
    }

    /// Standalone volatility view anchored on the latest completed session.
    pub fn volatility_forecast(
        &self,
        now: DateTime<Utc>,
        current_volatility: f64,
    ) -> Result<VolatilityForecast> {
        let last_session = last_session_date(now)?;
        let mut rng = self.rng.lock();
        let history = self.volatility_model.synthetic_history(
            last_session,
            current_volatility,
            &mut *rng,
        );
        let forecast = self.volatility_model.forecast(&history, &mut *rng)?;
        forecast
            .validate()
            .context("volatility forecast failed validation")?;
        Ok(forecast)
    }
}

#[async_trait::async_trait]
impl SnapshotSource for SnapshotGenerator {
    async fn generate(&self) -> Result<SentimentSnapshot> {
        let inputs = fetch_market_inputs(self.provider.as_ref()).await;
        tracing::debug!(
            provider = self.provider.provider_name(),
            real_quote = inputs.quote.is_some(),
            real_sectors = inputs.sectors.is_some(),
            real_intraday = inputs.intraday.is_some(),
            "market inputs fetched"
        );
        self.build(Utc::now(), inputs)
    }
}

/// The US row mirrors the primary index; other regions follow it by beta plus local noise.
fn global_markets<R: Rng>(index: &IndexLevel, rng: &mut R) -> Vec<GlobalMarket> {
    GLOBAL_REGIONS
        .iter()
        .map(|region| {
            if region.index == PRIMARY_INDEX_NAME {
                return GlobalMarket {
                    name: region.name.to_string(),
                    index: region.index.to_string(),
                    value: index.current_value,
                    percent_change: index.percent_change,
                };
            }
            let percent_change =
                round2(index.percent_change * region.us_beta + rng.random_range(-1.5..1.5));
            GlobalMarket {
                name: region.name.to_string(),
                index: region.index.to_string(),
                value: round2(region.base_value * (1.0 + percent_change / 100.0)),
                percent_change,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::contract::{GLOBAL_MARKET_COUNT, TREND_POINTS};
    use crate::ingest::provider::NoopProvider;
    use crate::ingest::types::{IndexQuote, IntradayBar, SectorPerformance};
    use anyhow::bail;
    use chrono::{Duration, TimeZone};

    struct QuoteOnly(IndexQuote);

    #[async_trait::async_trait]
    impl MarketDataProvider for QuoteOnly {
        fn provider_name(&self) -> &'static str {
            "quote_only"
        }

        async fn fetch_index_quote(&self) -> Result<IndexQuote> {
            Ok(self.0.clone())
        }

        async fn fetch_sector_performance(&self) -> Result<SectorPerformance> {
            bail!("rate limited")
        }

        async fn fetch_intraday(&self, _symbol: &str) -> Result<Vec<IntradayBar>> {
            bail!("timeout")
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 8, 21, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn failing_provider_still_yields_complete_snapshot() {
        let generator = SnapshotGenerator::new(Arc::new(NoopProvider), Some(42));
        let snapshot = generator.generate().await.unwrap();
        snapshot.validate().unwrap();
        assert_eq!(snapshot.market_index, "S&P 500");
        assert_eq!(snapshot.global_markets.len(), GLOBAL_MARKET_COUNT);
        assert_eq!(snapshot.sentiment_trend.len(), TREND_POINTS);
    }

    #[tokio::test]
    async fn real_quote_of_100_over_95_saturates_sentiment() {
        let quote = IndexQuote {
            symbol: "SPY".to_string(),
            price: 100.0,
            previous_close: 95.0,
            change_percent: 5.2632,
            volume: 70_000_000,
            latest_trading_day: None,
        };
        let generator = SnapshotGenerator::new(Arc::new(QuoteOnly(quote)), Some(1));
        let snapshot = generator.generate().await.unwrap();

        assert_eq!(snapshot.percent_change, 5.26);
        assert_eq!(snapshot.overall_sentiment, 1.0);
        assert_eq!(snapshot.current_value, 100.0);
        assert_eq!(snapshot.volume, 70_000_000);

        let us = &snapshot.global_markets[0];
        assert_eq!(us.index, "S&P 500");
        assert_eq!(us.value, 100.0);
        assert_eq!(us.percent_change, 5.26);
    }

    #[test]
    fn flat_quote_gives_exactly_neutral_sentiment() {
        let generator = SnapshotGenerator::new(Arc::new(NoopProvider), Some(3));
        let inputs = MarketInputs {
            quote: Some(IndexQuote {
                symbol: "SPY".to_string(),
                price: 500.0,
                previous_close: 500.0,
                change_percent: 0.0,
                volume: 1,
                latest_trading_day: None,
            }),
            ..MarketInputs::default()
        };
        let snapshot = generator.build(now(), inputs).unwrap();
        assert_eq!(snapshot.overall_sentiment, 0.0);
    }

    #[test]
    fn real_intraday_bars_replace_the_synthetic_trend() {
        let generator = SnapshotGenerator::new(Arc::new(NoopProvider), Some(8));
        let start = now() - Duration::hours(3);
        let bars: Vec<IntradayBar> = (0..30)
            .map(|i| IntradayBar {
                timestamp: start + Duration::minutes(5 * i),
                open: 500.0,
                high: 501.0,
                low: 499.0,
                close: 500.0 + i as f64 * 0.1,
                volume: 10,
            })
            .collect();
        let inputs = MarketInputs {
            intraday: Some(bars.clone()),
            ..MarketInputs::default()
        };

        let snapshot = generator.build(now(), inputs).unwrap();
        assert_eq!(snapshot.sentiment_trend[0].timestamp, bars[6].timestamp);
        assert_eq!(
            snapshot.sentiment_trend[TREND_POINTS - 1].timestamp,
            bars[29].timestamp
        );
    }

    #[test]
    fn bars_without_quote_share_one_price_scale() {
        let generator = SnapshotGenerator::new(Arc::new(NoopProvider), Some(21));
        let start = now() - Duration::hours(3);
        let bars: Vec<IntradayBar> = (0..30)
            .map(|i| IntradayBar {
                timestamp: start + Duration::minutes(5 * i),
                open: 590.0 + i as f64 * 0.1,
                high: 591.5 + i as f64 * 0.1,
                low: 589.5 + i as f64 * 0.1,
                close: 590.1 + i as f64 * 0.1,
                volume: 1_000,
            })
            .collect();
        let inputs = MarketInputs {
            intraday: Some(bars),
            ..MarketInputs::default()
        };

        let snapshot = generator.build(now(), inputs).unwrap();
        let last_trend = snapshot.sentiment_trend[TREND_POINTS - 1].index_value;
        assert_eq!(snapshot.current_value, last_trend);
        assert_eq!(snapshot.previous_close, 590.0);
        assert_eq!(snapshot.volume, 30_000);

        let within = |v: f64| (v / snapshot.current_value - 1.0).abs() < 0.1;
        let ind = &snapshot.technical_indicators;
        assert!(within(ind.bollinger_bands.middle), "{ind:?}");
        assert!(within(ind.moving_averages.ma50), "{ind:?}");
        assert!(within(ind.moving_averages.ma200), "{ind:?}");
        assert_eq!(snapshot.global_markets[0].value, snapshot.current_value);
    }

    #[test]
    fn crash_quote_degrades_instead_of_failing() {
        let quote = IndexQuote {
            symbol: "SPY".to_string(),
            price: 30.0,
            previous_close: 100.0,
            change_percent: -70.0,
            volume: 1,
            latest_trading_day: None,
        };
        for seed in 0..50 {
            let generator = SnapshotGenerator::new(Arc::new(NoopProvider), Some(seed));
            let inputs = MarketInputs {
                quote: Some(quote.clone()),
                ..MarketInputs::default()
            };
            let snapshot = generator.build(now(), inputs).unwrap();
            assert_eq!(snapshot.overall_sentiment, -1.0);
            assert!(snapshot.top_stocks.iter().all(|s| s.price > 0.0));
        }
    }

    #[test]
    fn synthetic_level_matches_the_quoted_scale() {
        let generator = SnapshotGenerator::new(Arc::new(NoopProvider), Some(4));
        let snapshot = generator.build(now(), MarketInputs::default()).unwrap();
        assert!((400.0..700.0).contains(&snapshot.current_value));
    }

    #[test]
    fn invariants_hold_across_many_seeds() {
        for seed in 0..200 {
            let generator = SnapshotGenerator::new(Arc::new(NoopProvider), Some(seed));
            let snapshot = generator.build(now(), MarketInputs::default()).unwrap();
            assert!((5.0..=45.0).contains(&snapshot.volatility_index));
            assert!(snapshot
                .recent_news
                .windows(2)
                .all(|w| w[0].published_at >= w[1].published_at));
        }
    }

    #[test]
    fn same_seed_same_snapshot() {
        let a = SnapshotGenerator::new(Arc::new(NoopProvider), Some(99));
        let b = SnapshotGenerator::new(Arc::new(NoopProvider), Some(99));
        assert_eq!(
            a.build(now(), MarketInputs::default()).unwrap(),
            b.build(now(), MarketInputs::default()).unwrap()
        );
    }

    #[test]
    fn volatility_forecast_is_valid() {
        let generator = SnapshotGenerator::new(Arc::new(NoopProvider), Some(5));
        let forecast = generator.volatility_forecast(now(), 24.5).unwrap();
        assert_eq!(forecast.historical.last().map(|h| h.value), Some(24.5));
        assert!(forecast.forecast.iter().all(|p| p.date > now().date_naive()));
    }
}
