//! Graph replicator
//!
//! Depth-first copy of the board graph reachable from a source board.
//! Parents persist before their children, every persisted replica is
//! recorded in the ledger, and each new mapping is immediately applied to
//! the whole working set. Cycles and diamonds collapse on the ledger's
//! visited check; a board is fetched and copied at most once per run.

use std::sync::Arc;

use futures::future::BoxFuture;
use tessella_board::{Board, BoardId, OwnerRef, PermId, TempId};
use tessella_store::{BoardStore, WorkingSet};

use crate::error::ReplicationError;
use crate::ledger::ReferenceLedger;
use crate::rewriter::ReferenceRewriter;

/// Copies board graphs one node at a time
///
/// The replicator is deliberately sequential: the ledger is threaded
/// through the walk as `&mut`, so sibling subtrees cannot race each other
/// into copying a shared descendant twice.
pub struct GraphReplicator {
    store: Arc<dyn BoardStore>,
    rewriter: ReferenceRewriter,
}

impl GraphReplicator {
    #[must_use]
    pub fn new(store: Arc<dyn BoardStore>) -> Self {
        let rewriter = ReferenceRewriter::new(Arc::clone(&store));
        Self { store, rewriter }
    }

    /// Replicate the graph reachable from `source_id` on behalf of `owner`
    ///
    /// Returns the permanent identifier of the root's replica. Calling
    /// again within the same run for an already-copied board returns the
    /// recorded replica without touching the store.
    ///
    /// # Errors
    /// `ReplicationError::Fetch` if the root cannot be loaded, otherwise
    /// whatever the walk raises.
    pub async fn replicate_board(
        &self,
        source_id: PermId,
        owner: &OwnerRef,
        ledger: &mut ReferenceLedger,
        working_set: &mut WorkingSet,
    ) -> Result<PermId, ReplicationError> {
        let original = BoardId::Perm(source_id);
        if let Some(replica) = ledger.resolve(&original) {
            return Ok(replica);
        }
        if ledger.was_produced(source_id) {
            return Ok(source_id);
        }
        let source = self
            .store
            .fetch_board(source_id)
            .await
            .map_err(|err| ReplicationError::Fetch {
                id: original,
                source: Some(err),
            })?;
        self.replicate_node(source, owner, ledger, working_set).await
    }

    /// Replicate starting from an already-loaded board, such as a summary
    /// entry out of a public listing
    ///
    /// # Errors
    /// `ReplicationError` as for [`Self::replicate_board`].
    pub async fn replicate_from(
        &self,
        source: &Board,
        owner: &OwnerRef,
        ledger: &mut ReferenceLedger,
        working_set: &mut WorkingSet,
    ) -> Result<PermId, ReplicationError> {
        self.replicate_node(source.clone(), owner, ledger, working_set)
            .await
    }

    fn replicate_node<'a>(
        &'a self,
        source: Board,
        owner: &'a OwnerRef,
        ledger: &'a mut ReferenceLedger,
        working_set: &'a mut WorkingSet,
    ) -> BoxFuture<'a, Result<PermId, ReplicationError>> {
        Box::pin(async move {
            let original_id = source.id;

            // 1. Re-visit guard: cycles and diamonds collapse here.
            if let Some(replica) = ledger.resolve(&original_id) {
                return Ok(replica);
            }
            if let Some(perm) = original_id.as_perm() {
                if ledger.was_produced(perm) {
                    return Ok(perm);
                }
            }

            // 2. Summary-form boards are hydrated before copying.
            let source = self.hydrate(source).await;

            // 3. Persist the shell first; the permanent identifier anchors
            //    the ledger entry and every later rewrite.
            let shell = source.replica_shell(TempId::new(), owner);
            let permanent =
                self.store
                    .create_board(&shell)
                    .await
                    .map_err(|err| ReplicationError::Persist {
                        original: original_id,
                        source: err,
                    })?;
            let replica = shell.into_persisted(permanent);
            tracing::info!(
                "Replicated board {} as {} (run {})",
                original_id,
                permanent,
                ledger.run()
            );

            // 4. The mapping becomes visible to every rewrite from here on.
            ledger
                .record(original_id, permanent)
                .map_err(|conflict| ReplicationError::invariant(conflict.to_string()))?;

            // 5. The replica joins the working set before the rewrite pass,
            //    so a board linking to itself is repaired in this same sweep.
            working_set.insert_board(replica);
            self.rewriter.apply(ledger, working_set).await;

            // 6. Children, sequentially; the ledger grows between visits.
            let targets: Vec<BoardId> = source.child_targets().collect();
            for target in targets {
                if ledger.has(&target) {
                    continue;
                }
                if let Some(perm) = target.as_perm() {
                    if ledger.was_produced(perm) {
                        continue;
                    }
                }
                let child = self.resolve_child(target, working_set).await?;
                self.replicate_node(child, owner, ledger, working_set)
                    .await?;
            }

            Ok(permanent)
        })
    }

    /// Fetch the full form of a board that arrived as a summary (no real
    /// tiles). Hydration failure is not fatal: the summary copies as a
    /// valid, childless board.
    async fn hydrate(&self, source: Board) -> Board {
        if !source.has_only_virtual_tiles() {
            return source;
        }
        let Some(id) = source.id.as_perm() else {
            return source;
        };
        match self.store.fetch_board(id).await {
            Ok(full) => full,
            Err(err) => {
                tracing::warn!("Copying board {} from summary data: {}", id, err);
                source
            }
        }
    }

    /// Load a child board for the walk
    ///
    /// A child missing from the store falls back to the caller's working
    /// set; an unsaved local copy is better than a broken run. Children
    /// under temporary identifiers never touch the store at all.
    async fn resolve_child(
        &self,
        target: BoardId,
        working_set: &WorkingSet,
    ) -> Result<Board, ReplicationError> {
        match target.as_perm() {
            Some(id) => match self.store.fetch_board(id).await {
                Ok(board) => Ok(board),
                Err(err) if err.is_not_found() => {
                    tracing::warn!("Board {} not in the store; trying the working set", id);
                    working_set
                        .get(&target)
                        .cloned()
                        .ok_or_else(|| ReplicationError::Fetch {
                            id: target,
                            source: Some(err),
                        })
                }
                Err(err) => Err(ReplicationError::Fetch {
                    id: target,
                    source: Some(err),
                }),
            },
            None => working_set
                .get(&target)
                .cloned()
                .ok_or_else(|| ReplicationError::Fetch {
                    id: target,
                    source: None,
                }),
        }
    }
}
