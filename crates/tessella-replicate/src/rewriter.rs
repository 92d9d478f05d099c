//! Reference rewriter
//!
//! Backpatch pass of the two-phase reconciliation: replicas persist first
//! under fresh permanent identifiers, then every board in the working set
//! has its navigation targets swapped from originals to replicas. Because
//! the whole set is scanned with the whole ledger, the pass is independent
//! of the order boards were copied in, and it also repairs stale links on
//! boards that were never part of the copied subtree.

use std::sync::Arc;

use tessella_board::{Board, BoardId, PermId};
use tessella_store::{BoardStore, StoreError, WorkingSet};

use crate::ledger::ReferenceLedger;

/// A rewritten board whose save failed; the in-memory copy is already
/// repaired, only the store lags behind
#[derive(Debug)]
pub struct RewriteWarning {
    /// Board whose save failed
    pub board: PermId,
    /// What the store reported
    pub source: StoreError,
}

impl std::fmt::Display for RewriteWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "board {} could not be saved after rewrite: {}",
            self.board, self.source
        )
    }
}

/// Outcome of one rewrite pass
#[derive(Debug, Default)]
pub struct RewriteReport {
    /// Navigation targets swapped to replica identifiers
    pub tiles_rewritten: usize,
    /// Changed boards saved back to the store
    pub boards_persisted: usize,
    /// Failed saves; the run carries on regardless
    pub warnings: Vec<RewriteWarning>,
}

/// Applies a run's ledger to a working set
pub struct ReferenceRewriter {
    store: Arc<dyn BoardStore>,
}

impl ReferenceRewriter {
    #[must_use]
    pub fn new(store: Arc<dyn BoardStore>) -> Self {
        Self { store }
    }

    /// Swap every navigation target the ledger maps, across the whole
    /// working set, then save the changed boards that live in the store.
    ///
    /// The shared-link flag is ignored here: a stale reference is stale no
    /// matter how the tile got it. Boards under temporary identifiers are
    /// rewritten in place but never saved. Save failures become warnings on
    /// the report, not errors; by this point the replicas themselves are
    /// already durable.
    pub async fn apply(
        &self,
        ledger: &ReferenceLedger,
        working_set: &mut WorkingSet,
    ) -> RewriteReport {
        let mut report = RewriteReport::default();
        if ledger.is_empty() {
            return report;
        }

        let mut changed: Vec<(PermId, Board)> = Vec::new();
        for board in working_set.iter_mut() {
            let rewritten = rewrite_board(board, ledger);
            if rewritten == 0 {
                continue;
            }
            report.tiles_rewritten += rewritten;
            tracing::debug!("Rewrote {} tile target(s) on board {}", rewritten, board.id);
            if let Some(id) = board.id.as_perm() {
                changed.push((id, board.clone()));
            }
        }

        for (id, board) in changed {
            match self.store.update_board(&board).await {
                Ok(()) => report.boards_persisted += 1,
                Err(err) => {
                    tracing::warn!("Keeping stale links on board {} in the store: {}", id, err);
                    report.warnings.push(RewriteWarning {
                        board: id,
                        source: err,
                    });
                }
            }
        }

        report
    }
}

/// Swap one board's mapped targets; returns the number of tiles changed
fn rewrite_board(board: &mut Board, ledger: &ReferenceLedger) -> usize {
    let mut rewritten = 0;
    for tile in &mut board.tiles {
        let Some(content) = tile.content_mut() else {
            continue;
        };
        let Some(nav) = content.nav.as_mut() else {
            continue;
        };
        if let Some(replica) = ledger.resolve(&nav.target) {
            nav.target = BoardId::Perm(replica);
            rewritten += 1;
        }
    }
    rewritten
}
