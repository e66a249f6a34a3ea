pub mod kv;
pub mod map_token;
pub mod newsletter;
