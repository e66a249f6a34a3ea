//! Derived analytics: everything that turns an (optional) set of fetched quotes into a
//! complete [`SentimentSnapshot`](crate::domain::snapshot::SentimentSnapshot).
//!
//! The building blocks are plain functions over a caller-supplied RNG so they can be
//! exercised deterministically; [`generator::SnapshotGenerator`] wires them together.

pub mod clusters;
pub mod forecast;
pub mod generator;
pub mod indicators;
pub mod sentiment;
pub mod universe;

/// Sentiment scores live in [-1, 1]. NaN collapses to neutral.
pub fn clamp_sentiment(v: f64) -> f64 {
    if v.is_nan() {
        return 0.0;
    }
    v.clamp(-1.0, 1.0)
}

/// Two-decimal rounding used for every displayed figure.
pub fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
