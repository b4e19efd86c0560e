use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("dht error: {0}")]
    Dht(#[from] ouinet_dht::DhtError),
    #[error("dht lookup timed out")]
    TimedOut,
}
