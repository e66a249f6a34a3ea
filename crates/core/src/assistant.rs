//! Keyword-driven assistant that answers canned questions from the current snapshot.

use crate::domain::snapshot::SentimentSnapshot;
use crate::format::SentimentBand;

pub const GREETING: &str = "Hello! I'm your Market Sentiment AI assistant. How can I help you with understanding your dashboard data today?";

const FALLBACK: &str = "I'm not sure I understand your question. Try asking about market sentiment, sectors, stocks, or recent news.";

const HELP: &str = "I can help you with understanding your dashboard data. You can ask about:\n\
- Current market sentiment\n\
- Sector performance\n\
- Top stocks\n\
- Recent news impact\n\
- Market volatility\n\
- Technical indicators";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Market,
    Sectors,
    Stocks,
    News,
    Volatility,
    Help,
    Unknown,
}

impl Topic {
    /// First matching rule wins, so "market news" is a market question.
    pub fn classify(query: &str) -> Self {
        let q = query.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| q.contains(w));

        if has(&["market", "sentiment"]) {
            Topic::Market
        } else if has(&["sector", "industry"]) {
            Topic::Sectors
        } else if has(&["stock", "equity"]) {
            Topic::Stocks
        } else if has(&["news", "headline"]) {
            Topic::News
        } else if has(&["volatility", "vix"]) {
            Topic::Volatility
        } else if has(&["help", "can you"]) {
            Topic::Help
        } else {
            Topic::Unknown
        }
    }
}

pub fn answer(query: &str, snapshot: Option<&SentimentSnapshot>) -> String {
    match Topic::classify(query) {
        Topic::Market => match snapshot {
            Some(s) => format!(
                "The current market sentiment is {} with an index value of {:.2}, showing a {} of {:.2}%.",
                mood(s.overall_sentiment),
                s.current_value,
                direction(s.percent_change),
                s.percent_change.abs()
            ),
            None => "I don't have the current market sentiment data available.".to_string(),
        },
        Topic::Sectors => {
            let best = snapshot.and_then(|s| {
                s.sectors
                    .iter()
                    .max_by(|a, b| a.sentiment.total_cmp(&b.sentiment))
            });
            let worst = snapshot.and_then(|s| {
                s.sectors
                    .iter()
                    .min_by(|a, b| a.sentiment.total_cmp(&b.sentiment))
            });
            match (best, worst) {
                (Some(best), Some(worst)) => format!(
                    "The best performing sector is {} with a {:.2}% change. The worst performing sector is {} with a {:.2}% change.",
                    best.name, best.percent_change, worst.name, worst.percent_change
                ),
                _ => "I don't have sector analysis data available right now.".to_string(),
            }
        }
        Topic::Stocks => {
            let top = snapshot.and_then(|s| {
                s.top_stocks
                    .iter()
                    .max_by(|a, b| a.percent_change.total_cmp(&b.percent_change))
            });
            match top {
                Some(t) => format!(
                    "The top performing stock is {} ({}) with a {:.2}% change.",
                    t.name, t.symbol, t.percent_change
                ),
                None => "I don't have stock performance data available right now.".to_string(),
            }
        }
        Topic::News => match snapshot.and_then(|s| s.recent_news.first()) {
            Some(n) => format!("The latest market news: \"{}\" from {}.", n.title, n.source),
            None => "I don't have recent news data available.".to_string(),
        },
        Topic::Volatility => match snapshot {
            Some(s) => format!(
                "The current volatility index is at {:.2}.",
                s.volatility_index
            ),
            None => "I don't have volatility data available right now.".to_string(),
        },
        Topic::Help => HELP.to_string(),
        Topic::Unknown => FALLBACK.to_string(),
    }
}

fn mood(sentiment: f64) -> &'static str {
    match SentimentBand::of(sentiment) {
        SentimentBand::VeryBullish | SentimentBand::Bullish => "positive",
        SentimentBand::Neutral => "neutral",
        SentimentBand::Bearish | SentimentBand::VeryBearish => "negative",
    }
}

fn direction(percent_change: f64) -> &'static str {
    if percent_change > 0.0 {
        "gain"
    } else if percent_change < 0.0 {
        "loss"
    } else {
        "change"
    }
}
