pub mod analytics;
pub mod assistant;
pub mod domain;
pub mod format;
pub mod ingest;
pub mod notify;
pub mod service;
pub mod storage;
pub mod time;

pub mod config {
    use anyhow::Context;
    use std::path::PathBuf;
    use std::time::Duration;

    const DEFAULT_REFRESH_INTERVAL_MS: u64 = 30_000;
    const DEFAULT_STORE_PATH: &str = ".equora/store.json";
    const DEFAULT_NEWSLETTER_LATENCY_MS: u64 = 800;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub alpha_vantage_key: Option<String>,
        pub alpha_vantage_base_url: Option<String>,
        pub alpha_vantage_timeout_secs: Option<u64>,
        pub refresh_interval_ms: Option<u64>,
        pub store_path: Option<String>,
        pub newsletter_latency_ms: Option<u64>,
        pub rng_seed: Option<u64>,
        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Ok(Self {
                alpha_vantage_key: std::env::var("ALPHA_VANTAGE_KEY").ok(),
                alpha_vantage_base_url: std::env::var("ALPHA_VANTAGE_BASE_URL").ok(),
                alpha_vantage_timeout_secs: parse_env("ALPHA_VANTAGE_TIMEOUT_SECS")?,
                refresh_interval_ms: parse_env("EQUORA_REFRESH_INTERVAL_MS")?,
                store_path: std::env::var("EQUORA_STORE_PATH").ok(),
                newsletter_latency_ms: parse_env("EQUORA_NEWSLETTER_LATENCY_MS")?,
                rng_seed: parse_env("EQUORA_RNG_SEED")?,
                sentry_dsn: std::env::var("SENTRY_DSN").ok(),
            })
        }

        pub fn require_alpha_vantage_key(&self) -> anyhow::Result<&str> {
            self.alpha_vantage_key
                .as_deref()
                .filter(|k| !k.trim().is_empty())
                .context("ALPHA_VANTAGE_KEY is required")
        }

        pub fn refresh_interval(&self) -> Duration {
            Duration::from_millis(
                self.refresh_interval_ms
                    .unwrap_or(DEFAULT_REFRESH_INTERVAL_MS),
            )
        }

        pub fn store_path(&self) -> PathBuf {
            PathBuf::from(
                self.store_path
                    .as_deref()
                    .unwrap_or(DEFAULT_STORE_PATH),
            )
        }

        pub fn newsletter_latency(&self) -> Duration {
            Duration::from_millis(
                self.newsletter_latency_ms
                    .unwrap_or(DEFAULT_NEWSLETTER_LATENCY_MS),
            )
        }
    }

    fn parse_env<T: std::str::FromStr>(key: &str) -> anyhow::Result<Option<T>>
    where
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        match std::env::var(key) {
            Ok(s) if !s.trim().is_empty() => s
                .trim()
                .parse::<T>()
                .map(Some)
                .with_context(|| format!("{key} is not a valid number: {s}")),
            _ => Ok(None),
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn empty() -> Settings {
            Settings {
                alpha_vantage_key: None,
                alpha_vantage_base_url: None,
                alpha_vantage_timeout_secs: None,
                refresh_interval_ms: None,
                store_path: None,
                newsletter_latency_ms: None,
                rng_seed: None,
                sentry_dsn: None,
            }
        }

        #[test]
        fn defaults_apply_when_unset() {
            let s = empty();
            assert_eq!(s.refresh_interval(), Duration::from_secs(30));
            assert_eq!(s.newsletter_latency(), Duration::from_millis(800));
            assert_eq!(s.store_path(), PathBuf::from(".equora/store.json"));
        }

        #[test]
        fn blank_api_key_is_treated_as_missing() {
            let mut s = empty();
            s.alpha_vantage_key = Some("  ".to_string());
            assert!(s.require_alpha_vantage_key().is_err());
            s.alpha_vantage_key = Some("abc".to_string());
            assert_eq!(s.require_alpha_vantage_key().unwrap(), "abc");
        }
    }
}
