//! Session working set
//!
//! Boards the caller currently holds in memory: the boards produced by a
//! replication run plus any unsaved local edits. Reference rewriting walks
//! this set, so a stale link in an unsaved board is repaired in the same
//! pass as the fresh replicas.

use indexmap::IndexMap;
use tessella_board::{Board, BoardId};

/// Insertion-ordered collection of in-memory boards, keyed by identifier
#[derive(Debug, Clone, Default)]
pub struct WorkingSet {
    boards: IndexMap<BoardId, Board>,
}

impl WorkingSet {
    /// Create an empty working set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a board under its own identifier, replacing any previous
    /// entry under that identifier
    pub fn insert_board(&mut self, board: Board) {
        self.boards.insert(board.id, board);
    }

    /// Board under `id`, if present
    #[must_use]
    pub fn get(&self, id: &BoardId) -> Option<&Board> {
        self.boards.get(id)
    }

    /// Whether a board is held under `id`
    #[must_use]
    pub fn contains(&self, id: &BoardId) -> bool {
        self.boards.contains_key(id)
    }

    /// Remove and return the board under `id`
    pub fn remove(&mut self, id: &BoardId) -> Option<Board> {
        self.boards.shift_remove(id)
    }

    /// Boards in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Board> {
        self.boards.values()
    }

    /// Mutable boards in insertion order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Board> {
        self.boards.values_mut()
    }

    /// Identifiers in insertion order
    pub fn ids(&self) -> impl Iterator<Item = &BoardId> {
        self.boards.keys()
    }

    /// Number of boards held
    #[must_use]
    pub fn len(&self) -> usize {
        self.boards.len()
    }

    /// Whether the set holds no boards
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boards.is_empty()
    }
}
