//! Application Lifecycle Abstraction
//!
//! Notifies the sync engine about foreground/background transitions so a
//! foregrounded app can catch up immediately instead of waiting for the next
//! poll.

use async_trait::async_trait;

use crate::error::Result;

/// Application lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Application is in the foreground and active
    Foreground,
    /// Application is in the background
    Background,
    /// Application is being suspended
    Suspended,
}

impl LifecycleState {
    pub fn is_foreground(&self) -> bool {
        matches!(self, Self::Foreground)
    }
}

/// Lifecycle observer trait
///
/// Sessions register on this observer explicitly at construction and
/// deregister deterministically on cancellation; there is no global
/// notification state involved.
///
/// # Platform Support
///
/// - **iOS**: UIApplication lifecycle notifications
/// - **Android**: Activity/Application lifecycle callbacks
/// - **Desktop**: Window focus events
/// - **Web**: Page Visibility API
#[async_trait]
pub trait LifecycleObserver: Send + Sync {
    /// Get the current lifecycle state.
    async fn state(&self) -> Result<LifecycleState>;

    /// Subscribe to lifecycle transitions.
    async fn subscribe_changes(&self) -> Result<Box<dyn LifecycleChangeStream>>;
}

/// Stream of lifecycle transitions
#[async_trait]
pub trait LifecycleChangeStream: Send {
    /// Get the next state update. Returns `None` when the stream is closed.
    async fn next(&mut self) -> Option<LifecycleState>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreground_detection() {
        assert!(LifecycleState::Foreground.is_foreground());
        assert!(!LifecycleState::Background.is_foreground());
        assert!(!LifecycleState::Suspended.is_foreground());
    }
}
