//! Import orchestrator
//!
//! Wraps a replication run in the caller-facing bookkeeping: a pending
//! shell in the working set while the copy runs, community-group
//! announcements, rollback of both on failure, and a final reconciliation
//! sweep once the graph is durable. Replicas themselves are never deleted
//! on failure; the store stays append-only and a half-copied graph is
//! abandoned, not unwound.

use std::sync::Arc;

use tessella_board::{Board, BoardId, NavLink, OwnerRef, PermId, TempId, TileContent};
use tessella_store::{BoardStore, WorkingSet};

use crate::error::ReplicationError;
use crate::ledger::ReferenceLedger;
use crate::replicator::GraphReplicator;
use crate::rewriter::ReferenceRewriter;

/// Failure reported by a grouping backend
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
#[error("grouping service failure: {0}")]
pub struct GroupingError(pub String);

/// Community-grouping integration
///
/// Imports are announced to the owner's group so copied boards show up in
/// shared listings. The importer treats every call as best-effort: a
/// grouping failure is logged and the import carries on.
#[async_trait::async_trait]
pub trait GroupingService: Send + Sync {
    /// Make sure the owner's group exists
    async fn ensure_grouping(&self, owner: &OwnerRef) -> Result<(), GroupingError>;

    /// Announce a board, possibly still under its temporary identifier
    async fn attach_board(&self, id: BoardId) -> Result<(), GroupingError>;

    /// Withdraw a previously announced board
    async fn detach_board(&self, id: BoardId) -> Result<(), GroupingError>;

    /// Swap an announced board's identifier once it has persisted
    async fn replace_board(&self, old: BoardId, new: PermId) -> Result<(), GroupingError>;
}

/// Drives a whole board import
pub struct BoardImporter {
    store: Arc<dyn BoardStore>,
    replicator: GraphReplicator,
    rewriter: ReferenceRewriter,
    grouping: Option<Arc<dyn GroupingService>>,
}

impl BoardImporter {
    #[must_use]
    pub fn new(store: Arc<dyn BoardStore>) -> Self {
        Self {
            replicator: GraphReplicator::new(Arc::clone(&store)),
            rewriter: ReferenceRewriter::new(Arc::clone(&store)),
            store,
            grouping: None,
        }
    }

    /// Attach a grouping backend
    #[must_use]
    pub fn with_grouping(mut self, grouping: Arc<dyn GroupingService>) -> Self {
        self.grouping = Some(grouping);
        self
    }

    /// Import the public board graph rooted at `source_id` into `owner`'s
    /// collection
    ///
    /// # Errors
    /// `ReplicationError::Fetch` if the root cannot be loaded, otherwise
    /// whatever the run raises.
    pub async fn import_public_board(
        &self,
        source_id: PermId,
        owner: &OwnerRef,
        working_set: &mut WorkingSet,
    ) -> Result<PermId, ReplicationError> {
        let source =
            self.store
                .fetch_board(source_id)
                .await
                .map_err(|err| ReplicationError::Fetch {
                    id: BoardId::Perm(source_id),
                    source: Some(err),
                })?;
        self.import_board(&source, owner, working_set).await
    }

    /// Import a graph from an already-loaded source board, such as a
    /// summary entry out of a public listing
    ///
    /// # Errors
    /// `ReplicationError` if the run fails; the pending shell and any group
    /// announcement are rolled back first.
    pub async fn import_board(
        &self,
        source: &Board,
        owner: &OwnerRef,
        working_set: &mut WorkingSet,
    ) -> Result<PermId, ReplicationError> {
        let mut ledger = ReferenceLedger::new();
        let temp_root = TempId::new();
        let pending_id = BoardId::Temp(temp_root);
        tracing::info!(
            "Importing board {} for {} (run {})",
            source.id,
            owner.email,
            ledger.run()
        );

        // Optimistic bookkeeping: a pending shell sits in the working set
        // and the group while the graph copies, so listings have something
        // to show immediately.
        working_set.insert_board(source.replica_shell(temp_root, owner));
        if let Some(grouping) = &self.grouping {
            if let Err(err) = grouping.ensure_grouping(owner).await {
                tracing::warn!("Grouping unavailable for {}: {}", owner.email, err);
            }
            if let Err(err) = grouping.attach_board(pending_id).await {
                tracing::warn!("Could not attach pending board {}: {}", pending_id, err);
            }
        }

        match self
            .replicator
            .replicate_from(source, owner, &mut ledger, working_set)
            .await
        {
            Ok(root) => {
                working_set.remove(&pending_id);

                // The ledger has the authoritative root mapping; disagreeing
                // with the walk's return value means the run cannot be
                // trusted.
                match ledger.resolve(&source.id) {
                    Some(mapped) if mapped == root => {}
                    mapped => {
                        self.detach_pending(pending_id).await;
                        let detail = format!(
                            "root {} recorded as {:?}, walk returned {}",
                            source.id, mapped, root
                        );
                        tracing::error!("Import of board {} failed: {}", source.id, detail);
                        return Err(ReplicationError::invariant(detail));
                    }
                }

                if let Some(grouping) = &self.grouping {
                    if let Err(err) = grouping.replace_board(pending_id, root).await {
                        tracing::warn!("Could not publish board {} to the group: {}", root, err);
                    }
                }

                // Final sweep: with the full ledger, any board the per-node
                // passes missed (or failed to save) gets one more chance.
                let report = self.rewriter.apply(&ledger, working_set).await;
                if !report.warnings.is_empty() {
                    tracing::warn!(
                        "{} board(s) kept stale links after import of {}",
                        report.warnings.len(),
                        source.id
                    );
                }

                tracing::info!(
                    "Imported board {} as {}: {} board(s) copied (run {})",
                    source.id,
                    root,
                    ledger.len(),
                    ledger.run()
                );
                Ok(root)
            }
            Err(err) => {
                working_set.remove(&pending_id);
                self.detach_pending(pending_id).await;
                tracing::error!("Import of board {} failed: {}", source.id, err);
                Err(err)
            }
        }
    }

    /// Import a graph, then drop a navigation tile for it onto an existing
    /// board, at the first free cell
    ///
    /// Link placement is best-effort: the import stands even if the target
    /// board cannot take the tile.
    ///
    /// # Errors
    /// `ReplicationError` only for the import itself.
    pub async fn import_and_link(
        &self,
        source_id: PermId,
        owner: &OwnerRef,
        working_set: &mut WorkingSet,
        link_on: PermId,
    ) -> Result<PermId, ReplicationError> {
        let root = self
            .import_public_board(source_id, owner, working_set)
            .await?;
        self.link_board(root, link_on, working_set).await;
        Ok(root)
    }

    async fn link_board(&self, root: PermId, link_on: PermId, working_set: &mut WorkingSet) {
        let home_id = BoardId::Perm(link_on);
        let mut home = match working_set.get(&home_id) {
            Some(board) => board.clone(),
            None => match self.store.fetch_board(link_on).await {
                Ok(board) => board,
                Err(err) => {
                    tracing::warn!("No board {} to place the link on: {}", link_on, err);
                    return;
                }
            },
        };

        let label = working_set
            .get(&BoardId::Perm(root))
            .map_or_else(|| root.to_string(), Board::display_name);
        let cell = home.place_tile(TileContent::new(label).with_nav(NavLink::to(root)));
        tracing::debug!("Placed link to board {} at {} on board {}", root, cell, link_on);

        match self.store.update_board(&home).await {
            Ok(()) => working_set.insert_board(home),
            Err(err) => {
                tracing::warn!("Could not save the link on board {}: {}", link_on, err);
            }
        }
    }

    async fn detach_pending(&self, pending_id: BoardId) {
        if let Some(grouping) = &self.grouping {
            if let Err(err) = grouping.detach_board(pending_id).await {
                tracing::warn!("Could not detach pending board {}: {}", pending_id, err);
            }
        }
    }
}
