use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnnouncerError {
    #[error("dht error: {0}")]
    Dht(#[from] ouinet_dht::DhtError),
}
