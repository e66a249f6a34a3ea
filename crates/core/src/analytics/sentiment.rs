use crate::analytics::universe::{
    NEWS_HEADLINES, NEWS_SOURCES, SECTORS, SYNTHETIC_INDEX_BASE, WATCHLIST,
};
use crate::analytics::{clamp_sentiment, round2};
use crate::domain::contract::TREND_POINTS;
use crate::domain::snapshot::{NewsItem, SectorSentiment, StockSentiment, TrendPoint};
use crate::ingest::types::{IndexQuote, IntradayBar, SectorPerformance};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// A ±5% index move spans the whole sentiment range.
pub const INDEX_MOVE_FOR_FULL_SENTIMENT: f64 = 5.0;
/// Single names move more, so they need ±10% to saturate.
pub const STOCK_MOVE_FOR_FULL_SENTIMENT: f64 = 10.0;
/// Floor on a synthesized single-name move so prices stay positive after a crash.
pub const MAX_STOCK_DROP_PCT: f64 = -99.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexLevel {
    pub current_value: f64,
    pub previous_close: f64,
    pub percent_change: f64,
    pub volume: u64,
}

pub fn overall_sentiment(percent_change: f64) -> f64 {
    clamp_sentiment(percent_change / INDEX_MOVE_FOR_FULL_SENTIMENT)
}

pub fn index_from_quote(q: &IndexQuote) -> IndexLevel {
    let percent_change = if q.previous_close > 0.0 {
        round2((q.price - q.previous_close) / q.previous_close * 100.0)
    } else {
        round2(q.change_percent)
    };

    IndexLevel {
        current_value: round2(q.price),
        previous_close: round2(q.previous_close),
        percent_change,
        volume: q.volume,
    }
}

/// Index level read off the intraday feed when the quote is missing: the latest close
/// against the prior day's last close, or against the session open if the feed starts today.
pub fn index_from_bars(bars: &[IntradayBar]) -> Option<IndexLevel> {
    let mut sorted: Vec<&IntradayBar> = bars.iter().filter(|b| b.close > 0.0).collect();
    sorted.sort_by_key(|b| b.timestamp);
    let last = *sorted.last()?;

    let session_day = last.timestamp.date_naive();
    let split = sorted.partition_point(|b| b.timestamp.date_naive() < session_day);
    let session = &sorted[split..];
    let previous_close = match split.checked_sub(1) {
        Some(i) => sorted[i].close,
        None if session[0].open > 0.0 => session[0].open,
        None => session[0].close,
    };

    Some(IndexLevel {
        current_value: round2(last.close),
        previous_close: round2(previous_close),
        percent_change: round2((last.close - previous_close) / previous_close * 100.0),
        volume: session.iter().map(|b| b.volume).sum(),
    })
}

pub fn synthetic_index<R: Rng>(rng: &mut R) -> IndexLevel {
    let current_value = round2(SYNTHETIC_INDEX_BASE * (1.0 + rng.random_range(-0.04..0.04)));
    let move_pct = rng.random_range(-3.0..3.0);
    let previous_close = round2(current_value / (1.0 + move_pct / 100.0));
    let percent_change = round2((current_value - previous_close) / previous_close * 100.0);

    IndexLevel {
        current_value,
        previous_close,
        percent_change,
        volume: rng.random_range(500_000_000..1_500_000_000),
    }
}

/// One entry per taxonomy sector. Real percentages win; gaps are synthesized.
pub fn sector_sentiments<R: Rng>(
    real: Option<&SectorPerformance>,
    rng: &mut R,
) -> Vec<SectorSentiment> {
    SECTORS
        .iter()
        .map(|(name, provider_name)| {
            let real_pct = real.and_then(|table| {
                table
                    .percent_by_sector
                    .get(*provider_name)
                    .or_else(|| table.percent_by_sector.get(*name))
                    .copied()
            });
            let percent_change = match real_pct {
                Some(pct) => round2(pct),
                None => round2(rng.random_range(-5.0..5.0)),
            };

            SectorSentiment {
                name: (*name).to_string(),
                sentiment: round2(clamp_sentiment(
                    percent_change / INDEX_MOVE_FOR_FULL_SENTIMENT,
                )),
                percent_change,
                volume: rng.random_range(500_000..10_500_000),
            }
        })
        .collect()
}

/// Stocks follow the index with a random beta in [0.5, 1.5) plus idiosyncratic noise.
pub fn stock_sentiments<R: Rng>(
    market_percent_change: f64,
    rng: &mut R,
) -> Vec<StockSentiment> {
    WATCHLIST
        .iter()
        .map(|entry| {
            let percent_change = round2(
                (market_percent_change * (0.5 + rng.random::<f64>())
                    + rng.random_range(-3.0..3.0))
                .max(MAX_STOCK_DROP_PCT),
            );
            let price = round2(entry.base_price * (1.0 + percent_change / 100.0));

            StockSentiment {
                symbol: entry.symbol.to_string(),
                name: entry.name.to_string(),
                sentiment: round2(clamp_sentiment(
                    percent_change / STOCK_MOVE_FOR_FULL_SENTIMENT,
                )),
                price,
                percent_change,
                volume: rng.random_range(100_000..5_100_000),
            }
        })
        .collect()
}

pub fn bar_sentiment(bar: &IntradayBar) -> f64 {
    if bar.open <= 0.0 {
        return 0.0;
    }
    clamp_sentiment((bar.close - bar.open) / bar.open * INDEX_MOVE_FOR_FULL_SENTIMENT)
}

/// The most recent `TREND_POINTS` bars in chronological order, or `None` if the feed is short.
pub fn trend_from_bars(bars: &[IntradayBar]) -> Option<Vec<TrendPoint>> {
    if bars.len() < TREND_POINTS {
        return None;
    }

    let mut sorted = bars.to_vec();
    sorted.sort_by_key(|b| b.timestamp);
    let recent = &sorted[sorted.len() - TREND_POINTS..];

    Some(
        recent
            .iter()
            .map(|bar| TrendPoint {
                timestamp: bar.timestamp,
                sentiment: round2(bar_sentiment(bar)),
                index_value: round2(bar.close),
            })
            .collect(),
    )
}

/// Hourly points over the last day: the index drifts from the previous close to the current
/// value while sentiment random-walks around the overall reading.
pub fn synthetic_trend<R: Rng>(
    now: DateTime<Utc>,
    index: &IndexLevel,
    overall: f64,
    rng: &mut R,
) -> Vec<TrendPoint> {
    let last = (TREND_POINTS - 1) as f64;
    let mut sentiment = clamp_sentiment(overall + rng.random_range(-0.3..0.3));
    let mut out = Vec::with_capacity(TREND_POINTS);

    for i in 0..TREND_POINTS {
        let t = i as f64 / last;
        let drift = index.previous_close + (index.current_value - index.previous_close) * t;
        let noise = if i + 1 == TREND_POINTS {
            0.0
        } else {
            rng.random_range(-0.002..0.002) * index.current_value
        };

        out.push(TrendPoint {
            timestamp: now - Duration::hours((TREND_POINTS - 1 - i) as i64),
            sentiment: round2(sentiment),
            index_value: round2(drift + noise),
        });

        let pull = (overall - sentiment) * 0.2;
        sentiment = clamp_sentiment(sentiment + pull + rng.random_range(-0.15..0.15));
    }

    out
}

/// Headlines tilted toward the overall mood, newest first.
pub fn recent_news<R: Rng>(
    now: DateTime<Utc>,
    overall: f64,
    rng: &mut R,
) -> Vec<NewsItem> {
    let mut out: Vec<NewsItem> = NEWS_HEADLINES
        .iter()
        .enumerate()
        .map(|(idx, title)| {
            let source = NEWS_SOURCES[rng.random_range(0..NEWS_SOURCES.len())];
            NewsItem {
                id: format!("news-{idx}"),
                title: (*title).to_string(),
                source: source.to_string(),
                published_at: now - Duration::seconds(rng.random_range(0..86_400)),
                url: "#".to_string(),
                sentiment: round2(clamp_sentiment(
                    overall * 0.5 + rng.random_range(-0.7..0.7),
                )),
                impact_score: round2(rng.random::<f64>()),
            }
        })
        .collect();

    out.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::BTreeMap;

    fn bar(minute: i64, open: f64, close: f64) -> IntradayBar {
        IntradayBar {
            timestamp: Utc.with_ymd_and_hms(2026, 1, 2, 15, 0, 0).unwrap()
                + Duration::minutes(minute),
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume: 1,
        }
    }

    #[test]
    fn quote_of_100_over_95_is_max_bullish() {
        let q = IndexQuote {
            symbol: "SPY".to_string(),
            price: 100.0,
            previous_close: 95.0,
            change_percent: 5.2632,
            volume: 1,
            latest_trading_day: None,
        };
        let level = index_from_quote(&q);
        assert_eq!(level.percent_change, 5.26);
        assert_eq!(overall_sentiment(level.percent_change), 1.0);
    }

    #[test]
    fn flat_market_is_exactly_neutral() {
        let s = overall_sentiment(0.0);
        assert_eq!(s, 0.0);
        assert!(!s.is_nan());
    }

    #[test]
    fn zero_previous_close_falls_back_to_reported_change() {
        let q = IndexQuote {
            symbol: "SPY".to_string(),
            price: 10.0,
            previous_close: 0.0,
            change_percent: -1.234,
            volume: 0,
            latest_trading_day: None,
        };
        assert_eq!(index_from_quote(&q).percent_change, -1.23);
    }

    #[test]
    fn real_sector_table_drives_sentiment_and_gaps_are_filled() {
        let mut table = BTreeMap::new();
        table.insert("Information Technology".to_string(), 2.5);
        table.insert("Energy".to_string(), -7.5);
        let perf = SectorPerformance {
            percent_by_sector: table,
        };
        let mut rng = StdRng::seed_from_u64(1);

        let sectors = sector_sentiments(Some(&perf), &mut rng);
        assert_eq!(sectors.len(), SECTORS.len());
        assert_eq!(sectors[0].name, "Technology");
        assert_eq!(sectors[0].percent_change, 2.5);
        assert_eq!(sectors[0].sentiment, 0.5);
        let energy = sectors.iter().find(|s| s.name == "Energy").unwrap();
        assert_eq!(energy.sentiment, -1.0);
        assert!(sectors
            .iter()
            .all(|s| (-1.0..=1.0).contains(&s.sentiment) && s.percent_change.abs() <= 7.5));
    }

    #[test]
    fn stock_sentiment_tracks_its_own_move() {
        let mut rng = StdRng::seed_from_u64(7);
        for s in stock_sentiments(4.0, &mut rng) {
            // beta in [0.5, 1.5) and noise in [-3, 3): move is within [-1, 9].
            assert!(s.percent_change >= -1.0 && s.percent_change <= 9.0, "{s:?}");
            assert_eq!(s.sentiment, round2(clamp_sentiment(s.percent_change / 10.0)));
            assert!(s.price > 0.0);
        }
    }

    #[test]
    fn crash_moves_keep_stock_prices_positive() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            for s in stock_sentiments(-95.0, &mut rng) {
                assert!(s.percent_change >= MAX_STOCK_DROP_PCT, "{s:?}");
                assert!(s.price > 0.0, "{s:?}");
                assert_eq!(s.sentiment, -1.0);
            }
        }
    }

    #[test]
    fn index_from_bars_uses_prior_day_close() {
        let prior = |minute: i64, close: f64| IntradayBar {
            timestamp: Utc.with_ymd_and_hms(2026, 1, 1, 20, 0, 0).unwrap()
                + Duration::minutes(minute),
            ..bar(0, close, close)
        };
        let bars = vec![
            bar(10, 591.0, 594.0),
            prior(0, 588.0),
            bar(0, 589.0, 591.0),
            prior(5, 590.0),
        ];
        let level = index_from_bars(&bars).unwrap();
        assert_eq!(level.current_value, 594.0);
        assert_eq!(level.previous_close, 590.0);
        assert_eq!(level.percent_change, 0.68);
        assert_eq!(level.volume, 2);

        // Single-day feed: compare against the session open.
        let today = vec![bar(0, 600.0, 603.0), bar(5, 603.0, 606.0)];
        let level = index_from_bars(&today).unwrap();
        assert_eq!(level.previous_close, 600.0);
        assert_eq!(level.percent_change, 1.0);

        assert!(index_from_bars(&[]).is_none());
    }

    #[test]
    fn trend_uses_latest_bars_in_order() {
        // Descending raw feed, 30 bars.
        let bars: Vec<_> = (0..30).rev().map(|m| bar(m * 5, 100.0, 100.0 + m as f64)).collect();
        let trend = trend_from_bars(&bars).unwrap();
        assert_eq!(trend.len(), TREND_POINTS);
        assert!(trend.windows(2).all(|w| w[0].timestamp < w[1].timestamp));
        // Oldest kept bar is the seventh one.
        assert_eq!(trend[0].index_value, 106.0);
        // +29% bar saturates.
        assert_eq!(trend[TREND_POINTS - 1].sentiment, 1.0);
    }

    #[test]
    fn short_intraday_feed_is_rejected() {
        let bars: Vec<_> = (0..10).map(|m| bar(m, 100.0, 100.0)).collect();
        assert!(trend_from_bars(&bars).is_none());
        assert_eq!(bar_sentiment(&bar(0, 0.0, 5.0)), 0.0);
    }

    #[test]
    fn synthetic_trend_is_hourly_and_ends_at_current_value() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 20, 0, 0).unwrap();
        let level = IndexLevel {
            current_value: 5000.0,
            previous_close: 4900.0,
            percent_change: 2.04,
            volume: 1,
        };
        let mut rng = StdRng::seed_from_u64(3);
        let trend = synthetic_trend(now, &level, 0.4, &mut rng);
        assert_eq!(trend.len(), TREND_POINTS);
        assert_eq!(trend[TREND_POINTS - 1].timestamp, now);
        assert_eq!(trend[TREND_POINTS - 1].index_value, 5000.0);
        assert_eq!(trend[1].timestamp - trend[0].timestamp, Duration::hours(1));
        assert!(trend.iter().all(|p| (-1.0..=1.0).contains(&p.sentiment)));
    }

    #[test]
    fn news_is_newest_first_and_bounded() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 20, 0, 0).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        let news = recent_news(now, -0.9, &mut rng);
        assert_eq!(news.len(), NEWS_HEADLINES.len());
        assert!(news.windows(2).all(|w| w[0].published_at >= w[1].published_at));
        assert!(news
            .iter()
            .all(|n| (0.0..=1.0).contains(&n.impact_score) && (-1.0..=1.0).contains(&n.sentiment)));
    }
}
