pub mod alpha_vantage;
pub mod error;
pub mod provider;
pub mod types;
