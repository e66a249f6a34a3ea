pub mod contract;
pub mod newsletter;
pub mod snapshot;
