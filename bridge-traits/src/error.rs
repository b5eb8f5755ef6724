use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Bridge capability not available: {0}")]
    NotAvailable(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Metadata store error: {0}")]
    Store(String),

    #[error("Record publish failed: {0}")]
    StorePublish(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
