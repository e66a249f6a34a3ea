//! Forward-looking series: the sentiment prediction embedded in every snapshot and the
//! standalone volatility forecast.

use crate::analytics::indicators::sma;
use crate::analytics::{clamp_sentiment, round2};
use crate::domain::contract::{HISTORY_DAYS, PREDICTION_DAYS};
use crate::domain::snapshot::{
    HistoricalSentimentPoint, PredictionPoint, SentimentPrediction, VolatilityForecast,
    VolatilityObservation,
};
use crate::time::us_market::{
    days_after, days_ending_at, sessions_after, sessions_ending_at, weekday_index,
};
use chrono::NaiveDate;
use rand::Rng;
use std::f64::consts::PI;

/// Trailing history days that also carry a back-tested prediction.
const BACKTEST_DAYS: usize = 4;

pub fn sentiment_prediction<R: Rng>(
    today: NaiveDate,
    overall: f64,
    rng: &mut R,
) -> SentimentPrediction {
    let dates = days_ending_at(today, HISTORY_DAYS);
    let phase = rng.random_range(0.0..(2.0 * PI));
    let last = (HISTORY_DAYS - 1) as f64;

    let mut historical_data = Vec::with_capacity(HISTORY_DAYS);
    let mut abs_errors = Vec::with_capacity(BACKTEST_DAYS);
    for (i, date) in dates.into_iter().enumerate() {
        // The wave fades into today's reading so the series ends near the current sentiment.
        let w = i as f64 / last;
        let wave = 0.4 * (2.0 * PI * i as f64 / HISTORY_DAYS as f64 + phase).sin();
        let actual = round2(clamp_sentiment(
            wave * (1.0 - w) + overall * w + rng.random_range(-0.1..0.1),
        ));

        let mut point = HistoricalSentimentPoint {
            date,
            actual,
            predicted: None,
            lower: None,
            upper: None,
        };

        if i + BACKTEST_DAYS >= HISTORY_DAYS {
            let predicted = clamp_sentiment(actual * 0.9 + rng.random_range(-0.1..0.1));
            let half_width = 0.1 + rng.random_range(0.0..0.05);
            let (lower, predicted, upper) = ordered_band(predicted, half_width);
            abs_errors.push((predicted - actual).abs());
            point.predicted = Some(predicted);
            point.lower = Some(lower);
            point.upper = Some(upper);
        }

        historical_data.push(point);
    }

    let direction = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
    let slope = direction * rng.random_range(0.02..0.08);
    let predictions = days_after(today, PREDICTION_DAYS)
        .into_iter()
        .enumerate()
        .map(|(k, date)| {
            let step = (k + 1) as f64;
            let predicted =
                clamp_sentiment(overall + slope * step + rng.random_range(-0.05..0.05));
            let (lower, predicted, upper) = ordered_band(predicted, 0.1 + 0.05 * step);
            PredictionPoint {
                date,
                predicted,
                lower,
                upper,
            }
        })
        .collect();

    let mean_abs_error = abs_errors.iter().sum::<f64>() / abs_errors.len().max(1) as f64;
    let confidence_level = (90.0 - mean_abs_error * 100.0).clamp(60.0, 95.0).round();

    SentimentPrediction {
        historical_data,
        predictions,
        confidence_level,
    }
}

/// Clamped and rounded `(lower, predicted, upper)`; both steps are monotone so order holds.
fn ordered_band(predicted: f64, half_width: f64) -> (f64, f64, f64) {
    (
        round2(clamp_sentiment(predicted - half_width)),
        round2(clamp_sentiment(predicted)),
        round2(clamp_sentiment(predicted + half_width)),
    )
}

pub const VOLATILITY_FLOOR: f64 = 5.0;
pub const VOLATILITY_CEILING: f64 = 45.0;

/// Mean-reversion + momentum + weekday seasonality model for the volatility index.
#[derive(Debug, Clone)]
pub struct VolatilityModel {
    pub long_term_mean: f64,
    /// Share of the gap to the long-term mean closed per step.
    pub reversion_strength: f64,
    pub momentum_factor: f64,
    /// Additive adjustment per weekday, Monday first.
    pub seasonality: [f64; 7],
    /// Noise amplitude added per step of horizon.
    pub noise_per_step: f64,
    pub band_base: f64,
    pub band_per_step: f64,
    pub history_len: usize,
    pub horizon: usize,
    pub sma_window: usize,
}

impl Default for VolatilityModel {
    fn default() -> Self {
        Self {
            long_term_mean: 19.5,
            reversion_strength: 0.15,
            momentum_factor: 0.3,
            seasonality: [0.8, 0.3, 0.0, -0.1, -0.5, 0.0, 0.0],
            noise_per_step: 0.35,
            band_base: 1.0,
            band_per_step: 0.9,
            history_len: 30,
            horizon: 5,
            sma_window: 5,
        }
    }
}

impl VolatilityModel {
    /// Synthetic AR(1) history over past sessions that lands on `current`.
    pub fn synthetic_history<R: Rng>(
        &self,
        last_session: NaiveDate,
        current: f64,
        rng: &mut R,
    ) -> Vec<(NaiveDate, f64)> {
        let dates = sessions_ending_at(last_session, self.history_len);
        let n = dates.len();
        let mut level = self.long_term_mean + rng.random_range(-4.0..4.0);
        let mut out = Vec::with_capacity(n);
        for (i, date) in dates.into_iter().enumerate() {
            let v = if i + 1 == n {
                current
            } else {
                level = level + (self.long_term_mean - level) * 0.1 + rng.random_range(-1.5..1.5);
                // Blend toward today's reading over the last week.
                let remaining = (n - 1 - i) as f64;
                if remaining < 5.0 {
                    level + (current - level) * (1.0 - remaining / 5.0)
                } else {
                    level
                }
            };
            out.push((date, round2(v.clamp(VOLATILITY_FLOOR, VOLATILITY_CEILING))));
        }
        out
    }

    pub fn forecast<R: Rng>(
        &self,
        history: &[(NaiveDate, f64)],
        rng: &mut R,
    ) -> anyhow::Result<VolatilityForecast> {
        let (last_date, last_value) = *history
            .last()
            .ok_or_else(|| anyhow::anyhow!("volatility history is empty"))?;

        let values: Vec<f64> = history.iter().map(|(_, v)| *v).collect();
        let lookback = self.sma_window.min(values.len() - 1).max(1);
        let momentum = if values.len() > lookback {
            (last_value - values[values.len() - 1 - lookback]) / lookback as f64
        } else {
            0.0
        };

        let historical = values
            .iter()
            .enumerate()
            .map(|(i, v)| VolatilityObservation {
                date: history[i].0,
                value: *v,
                moving_average: sma(&values[..=i], self.sma_window).map(round2),
            })
            .collect();

        let mut level = last_value;
        let mut forecast = Vec::with_capacity(self.horizon);
        for (i, date) in sessions_after(last_date, self.horizon).into_iter().enumerate() {
            let step = (i + 1) as f64;
            let noise = rng.random_range(-1.0..1.0) * self.noise_per_step * step;
            level = (level
                + (self.long_term_mean - level) * self.reversion_strength
                + momentum * self.momentum_factor
                + self.seasonality[weekday_index(date)]
                + noise)
                .clamp(VOLATILITY_FLOOR, VOLATILITY_CEILING);

            let half_width = self.band_base + self.band_per_step * step;
            forecast.push(PredictionPoint {
                date,
                predicted: round2(level),
                lower: round2((level - half_width).max(0.0)),
                upper: round2(level + half_width),
            });
        }

        Ok(VolatilityForecast {
            historical,
            forecast,
            long_term_mean: self.long_term_mean,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 1, 9).unwrap()
    }

    #[test]
    fn prediction_bands_are_ordered_and_bounded() {
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let overall = [-1.0, -0.4, 0.0, 0.7, 1.0][seed as usize % 5];
            let p = sentiment_prediction(today(), overall, &mut rng);

            assert_eq!(p.historical_data.len(), HISTORY_DAYS);
            assert_eq!(p.predictions.len(), PREDICTION_DAYS);
            assert_eq!(p.historical_data.last().unwrap().date, today());
            assert!((60.0..=95.0).contains(&p.confidence_level));

            let annotated = p
                .historical_data
                .iter()
                .filter(|h| h.predicted.is_some())
                .count();
            assert_eq!(annotated, BACKTEST_DAYS);

            for h in &p.historical_data {
                assert!((-1.0..=1.0).contains(&h.actual));
                if let (Some(l), Some(m), Some(u)) = (h.lower, h.predicted, h.upper) {
                    assert!(l <= m && m <= u);
                }
            }
            for f in &p.predictions {
                assert!(f.lower <= f.predicted && f.predicted <= f.upper, "{f:?}");
                assert!(f.lower >= -1.0 && f.upper <= 1.0);
            }
        }
    }

    #[test]
    fn forecast_bands_widen_with_horizon() {
        let model = VolatilityModel::default();
        let mut rng = StdRng::seed_from_u64(4);
        let history = model.synthetic_history(today(), 22.0, &mut rng);
        assert_eq!(history.len(), model.history_len);
        assert_eq!(history.last().unwrap().1, 22.0);

        let f = model.forecast(&history, &mut rng).unwrap();
        f.validate().unwrap();
        assert_eq!(f.forecast.len(), model.horizon);
        // Friday history -> Monday is the first forecast session.
        assert_eq!(
            f.forecast[0].date,
            NaiveDate::from_ymd_opt(2026, 1, 12).unwrap()
        );

        let widths: Vec<f64> = f
            .forecast
            .iter()
            .map(|p| p.upper - p.predicted)
            .collect();
        assert!(widths.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn moving_average_starts_after_window() {
        let model = VolatilityModel::default();
        let history: Vec<(NaiveDate, f64)> = sessions_ending_at(today(), 8)
            .into_iter()
            .zip([10.0, 12.0, 14.0, 16.0, 18.0, 20.0, 22.0, 24.0])
            .collect();
        let mut rng = StdRng::seed_from_u64(1);
        let f = model.forecast(&history, &mut rng).unwrap();
        assert_eq!(f.historical[3].moving_average, None);
        assert_eq!(f.historical[4].moving_average, Some(14.0));
        assert_eq!(f.historical[7].moving_average, Some(20.0));
    }

    #[test]
    fn forecast_stays_in_range_from_extremes() {
        let model = VolatilityModel::default();
        let mut rng = StdRng::seed_from_u64(2);
        for start in [5.0, 45.0] {
            let history = vec![(today(), start)];
            let f = model.forecast(&history, &mut rng).unwrap();
            assert!(f
                .forecast
                .iter()
                .all(|p| (VOLATILITY_FLOOR..=VOLATILITY_CEILING).contains(&p.predicted)));
        }
        assert!(model.forecast(&[], &mut rng).is_err());
    }
}
