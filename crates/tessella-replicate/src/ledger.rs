//! Reference ledger
//!
//! The explicit original-to-replica mapping threaded through one
//! replication run. It doubles as the visited set of the graph walk: a
//! board is visited exactly when it has an entry, which is what collapses
//! cycles and diamonds into single copies.

use indexmap::IndexMap;
use tessella_board::{BoardId, PermId};
use ulid::Ulid;

/// Identifier of one replication run, for log correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(pub Ulid);

impl RunId {
    /// Generate a fresh run identifier
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A second mapping was recorded for an original already in the ledger
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("original {original} already mapped to replica {existing}")]
pub struct LedgerConflict {
    /// The original board recorded twice
    pub original: BoardId,
    /// The replica it was already mapped to
    pub existing: PermId,
}

/// Original-to-replica mapping for one replication run
///
/// Entries are recorded only after the replica has persisted, so every
/// value is a durable permanent identifier. One ledger belongs to one
/// top-level run; it is never shared across unrelated calls.
#[derive(Debug, Clone, Default)]
pub struct ReferenceLedger {
    run: RunId,
    entries: IndexMap<BoardId, PermId>,
}

impl ReferenceLedger {
    /// Start an empty ledger under a fresh run identifier
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run this ledger belongs to
    #[must_use]
    pub const fn run(&self) -> RunId {
        self.run
    }

    /// Whether `original` was already replicated in this run
    #[must_use]
    pub fn has(&self, original: &BoardId) -> bool {
        self.entries.contains_key(original)
    }

    /// Replica recorded for `original`, if any
    #[must_use]
    pub fn resolve(&self, original: &BoardId) -> Option<PermId> {
        self.entries.get(original).copied()
    }

    /// Record that `original` was replicated as `replica`
    ///
    /// # Errors
    /// `LedgerConflict` if `original` already has an entry; the walk never
    /// copies a board twice, so a conflict means broken bookkeeping.
    pub fn record(&mut self, original: BoardId, replica: PermId) -> Result<(), LedgerConflict> {
        if let Some(&existing) = self.entries.get(&original) {
            return Err(LedgerConflict { original, existing });
        }
        self.entries.insert(original, replica);
        Ok(())
    }

    /// Whether `id` is a replica this run produced
    ///
    /// Guards the walk against descending into its own output when a
    /// rewritten board is reached again through a later edge.
    #[must_use]
    pub fn was_produced(&self, id: PermId) -> bool {
        self.entries.values().any(|&replica| replica == id)
    }

    /// Recorded mappings in insertion order
    pub fn mappings(&self) -> impl Iterator<Item = (&BoardId, &PermId)> {
        self.entries.iter()
    }

    /// Number of boards copied so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been copied yet
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
