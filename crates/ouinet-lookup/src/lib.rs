pub mod cache;
pub mod cell;
pub mod config;
pub mod error;

pub use cache::LookupCache;
pub use cell::LookupCell;
pub use config::LookupConfig;
pub use error::LookupError;
