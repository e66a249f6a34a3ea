use serde_json::Value;
use std::fmt;

/// Diagnostic error for a provider response that arrived but could not be used.
#[derive(Debug, Clone)]
pub struct ProviderError {
    pub endpoint: &'static str,
    pub stage: &'static str,
    pub detail: String,
    pub raw_response_json: Option<Value>,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "market data error (endpoint={}, stage={}): {}",
            self.endpoint, self.stage, self.detail
        )
    }
}

impl std::error::Error for ProviderError {}
