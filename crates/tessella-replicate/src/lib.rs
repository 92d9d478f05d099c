//! Tessella Replicate - Board Graph Replication Engine
//!
//! Copies the graph of boards reachable from a source board into a user's
//! own collection:
//! - Walks navigation links depth-first, collapsing cycles and diamonds so
//!   every board is copied exactly once
//! - Persists parents before children and records each original-to-replica
//!   pair in an explicit [`ReferenceLedger`]
//! - Backpatches navigation targets across the whole working set after
//!   every persist, so copy order never matters
//! - Rolls back its optimistic bookkeeping on failure while leaving
//!   already-persisted replicas untouched
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tessella_replicate::BoardImporter;
//! use tessella_store::{InMemoryBoardStore, WorkingSet};
//!
//! # async fn example() -> Result<(), tessella_replicate::ReplicationError> {
//! let store = Arc::new(InMemoryBoardStore::new());
//! let importer = BoardImporter::new(store);
//!
//! let owner = tessella_board::OwnerRef::new("Ada", "ada@example.org");
//! let source = tessella_board::PermId::new(42);
//! let mut working_set = WorkingSet::new();
//! let root = importer
//!     .import_public_board(source, &owner, &mut working_set)
//!     .await?;
//!
//! println!("Imported as {}", root);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod error;
pub mod ledger;
pub mod orchestrator;
pub mod replicator;
pub mod rewriter;

// Re-exports for convenience
pub use error::ReplicationError;
pub use ledger::{LedgerConflict, ReferenceLedger, RunId};
pub use orchestrator::{BoardImporter, GroupingError, GroupingService};
pub use replicator::GraphReplicator;
pub use rewriter::{ReferenceRewriter, RewriteReport, RewriteWarning};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the replication engine
    pub use crate::{
        BoardImporter, GraphReplicator, ReferenceLedger, ReferenceRewriter, ReplicationError,
        RewriteReport,
    };
    pub use tessella_board::{Board, BoardId, OwnerRef, PermId, TempId};
    pub use tessella_store::{BoardStore, WorkingSet};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
