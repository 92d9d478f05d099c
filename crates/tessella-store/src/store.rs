//! Board persistence trait
//!
//! Stores only speak the permanent identifier space. Boards that exist
//! solely in memory under temporary identifiers never reach a store; the
//! type signatures enforce this.

use tessella_board::{Board, PermId};

use crate::error::StoreError;

/// Backing persistence for boards
///
/// Implement this trait to plug in a real database or remote API. The
/// replication engine drives it through `Arc<dyn BoardStore>`.
#[async_trait::async_trait]
pub trait BoardStore: Send + Sync {
    /// Fetch a board by permanent identifier
    ///
    /// # Errors
    /// `StoreError::NotFound` when no board exists under `id`;
    /// `StoreError::Transport` for infrastructure failures.
    async fn fetch_board(&self, id: PermId) -> Result<Board, StoreError>;

    /// Persist a new board and return its permanent identifier
    ///
    /// The board's own `id` field is ignored; the store assigns a fresh
    /// identifier and the caller re-keys its copy afterwards.
    ///
    /// # Errors
    /// `StoreError::Persist` when the write is rejected, `StoreError::Transport`
    /// for infrastructure failures.
    async fn create_board(&self, board: &Board) -> Result<PermId, StoreError>;

    /// Overwrite an already-persisted board in place
    ///
    /// # Errors
    /// `StoreError::Persist` when the board was never persisted or the write
    /// is rejected, `StoreError::NotFound` when it has since disappeared.
    async fn update_board(&self, board: &Board) -> Result<(), StoreError>;
}
