//! Network Reachability Abstraction
//!
//! Surfaces connectivity so the sync engine can re-trigger a cycle when the
//! network comes back instead of waiting out the poll interval.

use async_trait::async_trait;

use crate::error::Result;

/// Network connection status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkStatus {
    /// Connected to a network
    Connected,
    /// Not connected to any network
    Disconnected,
    /// Connection status unknown or indeterminate
    Indeterminate,
}

impl NetworkStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Network monitor trait
///
/// # Platform Support
///
/// - **Desktop**: NetworkManager, SystemConfiguration, Windows Network List Manager
/// - **iOS**: Network framework, Reachability
/// - **Android**: ConnectivityManager
/// - **Web**: Navigator.onLine
#[async_trait]
pub trait NetworkMonitor: Send + Sync {
    /// Get the current connection status.
    async fn status(&self) -> Result<NetworkStatus>;

    /// Check if currently connected to any network.
    async fn is_connected(&self) -> bool {
        matches!(self.status().await, Ok(NetworkStatus::Connected))
    }

    /// Subscribe to connectivity changes.
    ///
    /// Implementations should emit an update whenever the status changes; the
    /// engine only reacts to transitions into `Connected`.
    async fn subscribe_changes(&self) -> Result<Box<dyn NetworkChangeStream>>;
}

/// Stream of connectivity changes
#[async_trait]
pub trait NetworkChangeStream: Send {
    /// Get the next status update. Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<NetworkStatus>;
}
