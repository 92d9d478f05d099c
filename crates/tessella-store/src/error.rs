//! Store error types

use tessella_board::PermId;

/// Errors surfaced by board stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No board exists under the given permanent identifier
    #[error("board {id} not found")]
    NotFound {
        /// The identifier that failed to resolve
        id: PermId,
    },

    /// The backing service could not be reached or failed mid-call
    #[error("transport failure: {0}")]
    Transport(#[source] anyhow::Error),

    /// The store rejected a write
    #[error("persist failed: {reason}")]
    Persist {
        /// What the store reported
        reason: String,
    },
}

impl StoreError {
    /// Whether this is a missing-board error, the one fetch failure callers
    /// may recover from
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Wrap an underlying transport failure
    pub fn transport(source: impl Into<anyhow::Error>) -> Self {
        Self::Transport(source.into())
    }

    /// Build a persist rejection
    pub fn persist(reason: impl Into<String>) -> Self {
        Self::Persist {
            reason: reason.into(),
        }
    }
}
