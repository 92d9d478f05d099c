//! Testing utilities for the Tessella workspace
//!
//! Graph fixtures, a call-recording store wrapper with scripted failures,
//! and randomized board graphs shared by the engine's test suites.

#![allow(missing_docs)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use rand::rngs::StdRng;
use rand::Rng;
use tessella_board::{Board, NavLink, OwnerRef, PermId, Tile, TileContent};
use tessella_store::{BoardStore, InMemoryBoardStore, StoreError};

pub fn test_owner() -> OwnerRef {
    OwnerRef::new("Test User", "test@example.org")
}

pub fn speech_tile(label: &str) -> Tile {
    Tile::Real(TileContent::new(label))
}

pub fn nav_tile(label: &str, target: PermId) -> Tile {
    Tile::Real(TileContent::new(label).with_nav(NavLink::to(target)))
}

pub fn shared_link_tile(label: &str, target: PermId) -> Tile {
    Tile::Real(TileContent::new(label).with_nav(NavLink::shared(target)))
}

/// Builds labelled board graphs in an in-memory store.
///
/// Labels map to sequential permanent identifiers, so tests can talk about
/// boards by name and still assert on exact ids.
pub struct GraphFixture {
    store: Arc<InMemoryBoardStore>,
    ids: HashMap<String, PermId>,
    next: u64,
}

impl GraphFixture {
    pub fn new() -> Self {
        Self {
            store: Arc::new(InMemoryBoardStore::new()),
            ids: HashMap::new(),
            next: 1,
        }
    }

    /// Identifier registered for `label`, assigning the next free one on
    /// first use. Registering without seeding leaves a dangling reference.
    pub fn id(&mut self, label: &str) -> PermId {
        if let Some(id) = self.ids.get(label) {
            return *id;
        }
        let id = PermId::new(self.next);
        self.next += 1;
        self.ids.insert(label.to_owned(), id);
        id
    }

    pub fn lookup(&self, label: &str) -> PermId {
        self.ids[label]
    }

    /// Seed a public board named `label` with one navigation tile per child.
    pub fn board(&mut self, label: &str, children: &[&str]) -> PermId {
        let id = self.id(label);
        let tiles = children
            .iter()
            .map(|child| {
                let target = self.id(child);
                nav_tile(&format!("go {child}"), target)
            })
            .collect();
        self.store
            .insert_with_id(id, Board::new(label).public().with_tiles(tiles));
        id
    }

    /// Seed a fully custom board under `label`'s identifier.
    pub fn insert(&mut self, label: &str, board: Board) -> PermId {
        let id = self.id(label);
        self.store.insert_with_id(id, board);
        id
    }

    pub fn store(&self) -> Arc<InMemoryBoardStore> {
        Arc::clone(&self.store)
    }
}

impl Default for GraphFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Wraps a store, counting calls and failing on script.
///
/// Fetch failures are keyed by identifier, create failures by board name
/// (replicas keep their source's display name), update failures by
/// identifier.
pub struct RecordingStore {
    inner: Arc<dyn BoardStore>,
    fetches: DashMap<PermId, usize>,
    creates: AtomicUsize,
    creates_by_name: DashMap<String, usize>,
    updates: AtomicUsize,
    updates_by_id: DashMap<PermId, usize>,
    create_failures: DashMap<String, ()>,
    fetch_failures: DashMap<PermId, ()>,
    update_failures: DashMap<PermId, ()>,
}

impl RecordingStore {
    pub fn wrapping(inner: Arc<dyn BoardStore>) -> Self {
        Self {
            inner,
            fetches: DashMap::new(),
            creates: AtomicUsize::new(0),
            creates_by_name: DashMap::new(),
            updates: AtomicUsize::new(0),
            updates_by_id: DashMap::new(),
            create_failures: DashMap::new(),
            fetch_failures: DashMap::new(),
            update_failures: DashMap::new(),
        }
    }

    pub fn fail_create_named(&self, name: &str) {
        self.create_failures.insert(name.to_owned(), ());
    }

    pub fn fail_fetch(&self, id: PermId) {
        self.fetch_failures.insert(id, ());
    }

    pub fn fail_update(&self, id: PermId) {
        self.update_failures.insert(id, ());
    }

    pub fn fetch_count(&self, id: PermId) -> usize {
        self.fetches.get(&id).map_or(0, |count| *count)
    }

    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::Relaxed)
    }

    pub fn create_count_named(&self, name: &str) -> usize {
        self.creates_by_name.get(name).map_or(0, |count| *count)
    }

    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::Relaxed)
    }

    pub fn update_count_for(&self, id: PermId) -> usize {
        self.updates_by_id.get(&id).map_or(0, |count| *count)
    }
}

#[async_trait::async_trait]
impl BoardStore for RecordingStore {
    async fn fetch_board(&self, id: PermId) -> Result<Board, StoreError> {
        *self.fetches.entry(id).or_insert(0) += 1;
        if self.fetch_failures.contains_key(&id) {
            return Err(StoreError::transport(anyhow::anyhow!(
                "scripted fetch failure for board {id}"
            )));
        }
        self.inner.fetch_board(id).await
    }

    async fn create_board(&self, board: &Board) -> Result<PermId, StoreError> {
        self.creates.fetch_add(1, Ordering::Relaxed);
        *self
            .creates_by_name
            .entry(board.name.clone())
            .or_insert(0) += 1;
        if self.create_failures.contains_key(&board.name) {
            return Err(StoreError::persist(format!(
                "scripted create failure for board \"{}\"",
                board.name
            )));
        }
        self.inner.create_board(board).await
    }

    async fn update_board(&self, board: &Board) -> Result<(), StoreError> {
        self.updates.fetch_add(1, Ordering::Relaxed);
        if let Some(id) = board.id.as_perm() {
            *self.updates_by_id.entry(id).or_insert(0) += 1;
            if self.update_failures.contains_key(&id) {
                return Err(StoreError::persist(format!(
                    "scripted update failure for board {id}"
                )));
            }
        }
        self.inner.update_board(board).await
    }
}

pub struct RandomGraph {
    pub store: Arc<InMemoryBoardStore>,
    pub root: PermId,
    pub board_ids: Vec<PermId>,
}

/// Seed a random connected board graph: a tree grown breadth-first from the
/// root, then extra edges thrown in so cycles, diamonds, and self-loops all
/// occur. Every board is reachable from the root.
pub fn random_graph(rng: &mut StdRng, depth: usize, branching: usize) -> RandomGraph {
    const MAX_NODES: usize = 40;

    let mut edges: Vec<Vec<usize>> = vec![Vec::new()];
    let mut frontier = vec![0usize];
    for _ in 0..depth {
        let mut next_frontier = Vec::new();
        for &node in &frontier {
            let fan = rng.random_range(1..=branching.max(1));
            for _ in 0..fan {
                if edges.len() >= MAX_NODES {
                    break;
                }
                let child = edges.len();
                edges.push(Vec::new());
                edges[node].push(child);
                next_frontier.push(child);
            }
        }
        if next_frontier.is_empty() {
            break;
        }
        frontier = next_frontier;
    }

    let node_count = edges.len();
    for _ in 0..rng.random_range(0..=node_count / 2) {
        let from = rng.random_range(0..node_count);
        let to = rng.random_range(0..node_count);
        if !edges[from].contains(&to) {
            edges[from].push(to);
        }
    }

    let store = Arc::new(InMemoryBoardStore::new());
    let board_ids: Vec<PermId> = (0..node_count)
        .map(|node| PermId::new(node as u64 + 1))
        .collect();
    for (node, targets) in edges.iter().enumerate() {
        let mut tiles: Vec<Tile> = targets
            .iter()
            .map(|&target| nav_tile(&format!("to {target}"), board_ids[target]))
            .collect();
        tiles.push(speech_tile("hello"));
        store.insert_with_id(
            board_ids[node],
            Board::new(format!("board {node}")).public().with_tiles(tiles),
        );
    }

    RandomGraph {
        store,
        root: board_ids[0],
        board_ids,
    }
}

/// Route engine logs through the test harness; safe to call repeatedly.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
