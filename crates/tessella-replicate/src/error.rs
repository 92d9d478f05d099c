//! Replication error types
//!
//! Fetch and persist failures abort a run; the caller rolls back its
//! optimistic bookkeeping and re-raises. Rewrite persist failures are
//! deliberately absent here: they are warnings on the rewrite report, not
//! errors, because the primary copies have already succeeded by then.

use tessella_board::BoardId;
use tessella_store::StoreError;

/// Fatal failures of a replication run
#[derive(Debug, thiserror::Error)]
pub enum ReplicationError {
    /// A board in the source graph could not be loaded
    #[error("failed to fetch board {id}")]
    Fetch {
        /// The board that could not be loaded
        id: BoardId,
        /// Underlying store failure; absent when a temporary-id board was
        /// simply not in the working set
        #[source]
        source: Option<StoreError>,
    },

    /// A replica could not be persisted
    #[error("failed to persist replica of board {original}")]
    Persist {
        /// The original whose copy failed
        original: BoardId,
        #[source]
        source: StoreError,
    },

    /// The run's own bookkeeping broke a guarantee it depends on
    #[error("replication invariant violated: {detail}")]
    InvariantViolation { detail: String },
}

impl ReplicationError {
    pub(crate) fn invariant(detail: impl Into<String>) -> Self {
        Self::InvariantViolation {
            detail: detail.into(),
        }
    }

    /// Whether the run died loading a source board
    #[must_use]
    pub const fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. })
    }

    /// Whether the run died persisting a replica
    #[must_use]
    pub const fn is_persist(&self) -> bool {
        matches!(self, Self::Persist { .. })
    }
}

#[cfg(test)]
mod tests {
    use tessella_board::{PermId, TempId};

    use super::*;

    #[test]
    fn fetch_errors_may_lack_a_store_cause() {
        let missing_local = ReplicationError::Fetch {
            id: BoardId::Temp(TempId::new()),
            source: None,
        };
        assert!(missing_local.is_fetch());
        assert!(std::error::Error::source(&missing_local).is_none());

        let from_store = ReplicationError::Fetch {
            id: BoardId::Perm(PermId::new(7)),
            source: Some(StoreError::NotFound { id: PermId::new(7) }),
        };
        assert!(std::error::Error::source(&from_store).is_some());
        assert_eq!(from_store.to_string(), "failed to fetch board 7");
    }

    #[test]
    fn persist_errors_carry_the_original_id() {
        let err = ReplicationError::Persist {
            original: BoardId::Perm(PermId::new(3)),
            source: StoreError::persist("quota exceeded"),
        };
        assert!(err.is_persist());
        assert!(!err.is_fetch());
        assert_eq!(err.to_string(), "failed to persist replica of board 3");
    }
}
