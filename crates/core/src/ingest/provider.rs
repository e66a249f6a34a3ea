use crate::ingest::types::{IndexQuote, IntradayBar, MarketInputs, SectorPerformance};
use anyhow::Result;

pub const PRIMARY_INDEX_SYMBOL: &str = "SPY";

#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_index_quote(&self) -> Result<IndexQuote>;

    async fn fetch_sector_performance(&self) -> Result<SectorPerformance>;

    /// Bars in whatever order the provider returns them.
    async fn fetch_intraday(&self, symbol: &str) -> Result<Vec<IntradayBar>>;
}

/// Provider that never has data; every refresh runs fully synthetic.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProvider;

#[async_trait::async_trait]
impl MarketDataProvider for NoopProvider {
    fn provider_name(&self) -> &'static str {
        "synthetic"
    }

    async fn fetch_index_quote(&self) -> Result<IndexQuote> {
        anyhow::bail!("synthetic provider has no quotes")
    }

    async fn fetch_sector_performance(&self) -> Result<SectorPerformance> {
        anyhow::bail!("synthetic provider has no sector table")
    }

    async fn fetch_intraday(&self, _symbol: &str) -> Result<Vec<IntradayBar>> {
        anyhow::bail!("synthetic provider has no intraday bars")
    }
}

/// One attempt per field. Failures are logged and turned into `None`.
pub async fn fetch_market_inputs(provider: &dyn MarketDataProvider) -> MarketInputs {
    let (quote, sectors, intraday) = tokio::join!(
        provider.fetch_index_quote(),
        provider.fetch_sector_performance(),
        provider.fetch_intraday(PRIMARY_INDEX_SYMBOL),
    );

    let name = provider.provider_name();
    MarketInputs {
        quote: soften(name, "quote", quote),
        sectors: soften(name, "sectors", sectors),
        intraday: soften(name, "intraday", intraday),
    }
}

fn soften<T>(provider: &str, field: &'static str, res: Result<T>) -> Option<T> {
    match res {
        Ok(v) => Some(v),
        Err(err) => {
            tracing::warn!(
                provider,
                field,
                error = %err,
                "market data unavailable; using synthetic fallback"
            );
            None
        }
    }
}
