pub mod client;
pub mod config;
pub mod error;
pub mod gc;
pub mod session;

pub use client::CacheClient;
pub use config::CacheConfig;
pub use error::CacheError;
pub use session::{ResponseSource, Session};
