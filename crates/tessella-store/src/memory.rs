//! In-memory board store
//!
//! Reference `BoardStore` implementation used by tests and local tooling.
//! Assigns sequential permanent identifiers and stamps creation times the
//! way a real backend would.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use dashmap::DashMap;
use tessella_board::{Board, BoardId, PermId};

use crate::error::StoreError;
use crate::store::BoardStore;

/// Thread-safe in-memory store keyed by permanent identifier
#[derive(Debug, Default)]
pub struct InMemoryBoardStore {
    boards: DashMap<PermId, Board>,
    next_id: AtomicU64,
}

impl InMemoryBoardStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of boards held
    #[must_use]
    pub fn len(&self) -> usize {
        self.boards.len()
    }

    /// Whether the store holds no boards
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }

    /// Copy of the board under `id`, if any
    #[must_use]
    pub fn get(&self, id: PermId) -> Option<Board> {
        self.boards.get(&id).map(|entry| entry.value().clone())
    }

    /// Seed a board under a caller-chosen identifier
    ///
    /// Bumps the identifier counter past `id` so later `create_board` calls
    /// cannot collide. Meant for fixtures and imports of known data sets.
    pub fn insert_with_id(&self, id: PermId, mut board: Board) {
        self.next_id.fetch_max(id.as_u64(), Ordering::Relaxed);
        board.id = BoardId::Perm(id);
        if board.created_at.is_none() {
            board.created_at = Some(Utc::now());
        }
        self.boards.insert(id, board);
    }
}

#[async_trait::async_trait]
impl BoardStore for InMemoryBoardStore {
    async fn fetch_board(&self, id: PermId) -> Result<Board, StoreError> {
        self.boards
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound { id })
    }

    async fn create_board(&self, board: &Board) -> Result<PermId, StoreError> {
        let id = PermId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let mut stored = board.clone();
        stored.id = BoardId::Perm(id);
        if stored.created_at.is_none() {
            stored.created_at = Some(Utc::now());
        }
        self.boards.insert(id, stored);
        Ok(id)
    }

    async fn update_board(&self, board: &Board) -> Result<(), StoreError> {
        let Some(id) = board.id.as_perm() else {
            return Err(StoreError::persist(
                "cannot update a board that was never persisted",
            ));
        };
        let Some(mut existing) = self.boards.get_mut(&id) else {
            return Err(StoreError::NotFound { id });
        };
        // The original creation stamp survives updates.
        let created_at = existing.created_at;
        *existing = board.clone();
        existing.created_at = created_at.or(existing.created_at);
        Ok(())
    }
}
