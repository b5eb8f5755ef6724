use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid sync configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Subscription connect failed: {0}")]
    SubscriptionConnect(String),

    #[error("Snapshot fetch failed: {0}")]
    SnapshotFetch(String),

    #[error("Delta fetch failed: {0}")]
    DeltaFetch(String),

    #[error("Record publish failed: {0}")]
    RecordPublish(String),

    #[error("Session cancelled")]
    Cancelled,

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

impl SyncError {
    /// Whether the next scheduled cycle may retry after this error.
    ///
    /// A record-publish failure means parsed records could not be applied to
    /// the store; retrying would replay the same invariant violation, so the
    /// session terminates instead.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            Self::RecordPublish(_) | Self::InvalidConfiguration(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
