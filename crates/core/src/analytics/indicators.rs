//! Technical indicators over the intraday index series, plus the breadth and volatility
//! readings that accompany them on the dashboard.

use crate::analytics::round2;
use crate::analytics::sentiment::IndexLevel;
use crate::domain::snapshot::{
    BollingerBands, MarketBreadth, MovingAverages, TechnicalIndicators, TrendPoint,
};
use rand::Rng;

pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const BOLLINGER_PERIOD: usize = 20;
pub const BOLLINGER_STD_DEVS: f64 = 2.0;

/// Simple moving average of the last `period` values.
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if values.len() < period || period == 0 {
        return None;
    }
    let sum: f64 = values.iter().rev().take(period).sum();
    Some(sum / period as f64)
}

/// EMA seeded with the first observation, so short intraday windows still yield a value.
pub fn ema(values: &[f64], period: usize) -> Option<f64> {
    let (first, rest) = values.split_first()?;
    if period == 0 {
        return None;
    }
    let multiplier = 2.0 / (period as f64 + 1.0);
    Some(
        rest.iter()
            .fold(*first, |prev, v| (v - prev) * multiplier + prev),
    )
}

/// Wilder-smoothed RSI. Always within [0, 100].
pub fn rsi(values: &[f64], period: usize) -> Option<f64> {
    if values.len() < period + 1 || period == 0 {
        return None;
    }

    let changes: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();
    let (mut avg_gain, mut avg_loss) =
        changes
            .iter()
            .take(period)
            .fold((0.0, 0.0), |(g, l), &change| {
                if change > 0.0 {
                    (g + change, l)
                } else {
                    (g, l - change)
                }
            });
    avg_gain /= period as f64;
    avg_loss /= period as f64;

    for &change in changes.iter().skip(period) {
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain = (avg_gain * (period as f64 - 1.0) + gain) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + loss) / period as f64;
    }

    if avg_loss == 0.0 {
        // Flat series reads neutral, not overbought.
        return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - (100.0 / (1.0 + rs)))
}

pub fn macd(values: &[f64]) -> Option<f64> {
    Some(ema(values, MACD_FAST)? - ema(values, MACD_SLOW)?)
}

/// Bands over the last `BOLLINGER_PERIOD` values (or all of them if fewer).
pub fn bollinger(values: &[f64]) -> Option<BollingerBands> {
    if values.is_empty() {
        return None;
    }
    let window = &values[values.len().saturating_sub(BOLLINGER_PERIOD)..];
    let n = window.len() as f64;
    let mean = window.iter().sum::<f64>() / n;
    let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let width = variance.sqrt() * BOLLINGER_STD_DEVS;

    Some(BollingerBands {
        upper: mean + width,
        middle: mean,
        lower: mean - width,
    })
}

pub fn technical_indicators<R: Rng>(
    trend: &[TrendPoint],
    index: &IndexLevel,
    rng: &mut R,
) -> TechnicalIndicators {
    let closes: Vec<f64> = trend.iter().map(|p| p.index_value).collect();

    let rsi = rsi(&closes, RSI_PERIOD).unwrap_or(50.0).clamp(0.0, 100.0);
    let macd = macd(&closes).unwrap_or(0.0);
    let bands = bollinger(&closes).unwrap_or(BollingerBands {
        upper: index.current_value,
        middle: index.current_value,
        lower: index.current_value,
    });

    // Not enough history for long averages; place them plausibly around the current level.
    let ma50 = index.current_value
        * (1.0 - index.percent_change / 100.0 * 0.5 + rng.random_range(-0.015..0.015));
    let ma200 = index.current_value * (1.0 + rng.random_range(-0.08..0.02));

    TechnicalIndicators {
        rsi: round2(rsi),
        macd: round2(macd),
        moving_averages: MovingAverages {
            ma50: round2(ma50),
            ma200: round2(ma200),
        },
        bollinger_bands: BollingerBands {
            upper: round2(bands.upper),
            middle: round2(bands.middle),
            lower: round2(bands.lower),
        },
    }
}

/// Advancers/decliners split leans with the overall sentiment.
pub fn market_breadth<R: Rng>(overall: f64, rng: &mut R) -> MarketBreadth {
    let total: u32 = rng.random_range(2_800..3_200);
    let unchanged = (total as f64 * rng.random_range(0.02..0.06)).round() as u32;
    let moving = total - unchanged;

    let adv_share = (0.5 + overall * 0.35 + rng.random_range(-0.05..0.05)).clamp(0.05, 0.95);
    let advancers = (moving as f64 * adv_share).round() as u32;
    let decliners = moving - advancers;

    let new_highs = (adv_share * rng.random_range(40.0..160.0)).round() as u32;
    let new_lows = ((1.0 - adv_share) * rng.random_range(40.0..160.0)).round() as u32;

    MarketBreadth {
        advancers,
        decliners,
        unchanged,
        new_highs,
        new_lows,
    }
}

/// Synthetic VIX-style reading: big moves and bearish tone raise it.
pub fn volatility_index<R: Rng>(index: &IndexLevel, overall: f64, rng: &mut R) -> f64 {
    let raw = 14.0 + index.percent_change.abs() * 3.0 - overall * 4.0 + rng.random_range(-2.0..4.0);
    round2(raw.clamp(5.0, 45.0))
}
