use crate::storage::kv::KeyValueStore;
use anyhow::{ensure, Result};
use std::sync::Arc;

pub const MAP_TOKEN_KEY: &str = "mapbox_token";

/// The map provider's public access token, as entered by the user.
pub struct MapTokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl MapTokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn get(&self) -> Result<Option<String>> {
        Ok(self
            .store
            .get(MAP_TOKEN_KEY)?
            .filter(|t| !t.trim().is_empty()))
    }

    pub fn set(&self, token: &str) -> Result<()> {
        let token = token.trim();
        ensure!(!token.is_empty(), "map token must not be empty");
        self.store.set(MAP_TOKEN_KEY, token)?;
        tracing::info!("map token saved");
        Ok(())
    }
}
