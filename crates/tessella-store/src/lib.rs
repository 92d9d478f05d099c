//! Tessella Store
//!
//! Persistence seam for the board replication engine.
//!
//! # Core Concepts
//!
//! - [`BoardStore`]: Async trait a backend implements; speaks permanent
//!   identifiers only
//! - [`InMemoryBoardStore`]: Reference implementation for tests and local
//!   tooling
//! - [`WorkingSet`]: The caller's in-memory boards, walked by reference
//!   rewriting
//! - [`StoreError`]: Fetch and persist failures, with `NotFound` as the one
//!   recoverable case
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tessella_store::{BoardStore, InMemoryBoardStore};
//!
//! # async fn example() -> Result<(), tessella_store::StoreError> {
//! let store: Arc<dyn BoardStore> = Arc::new(InMemoryBoardStore::new());
//! let id = store.create_board(&tessella_board::Board::new("Home")).await?;
//! let board = store.fetch_board(id).await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod error;
pub mod memory;
pub mod store;
pub mod working_set;

// Re-exports for convenience
pub use error::StoreError;
pub use memory::InMemoryBoardStore;
pub use store::BoardStore;
pub use working_set::WorkingSet;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
