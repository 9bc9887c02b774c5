//! Error types for setup-flow-core.

/// Errors raised by the core event primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// The receiving side of a mailbox has been disposed or dropped.
    #[error("Mailbox has been closed")]
    MailboxClosed,
}

impl CoreError {
    /// Check if this error means the receiver is gone.
    ///
    /// Late callbacks treat this as a no-op rather than a failure.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::MailboxClosed)
    }
}

/// A specialized Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
