//! Behavioral tests for graph replication: cycles, diamonds, failure
//! rollback, backpatching, and grouping bookkeeping.

use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use tessella_board::{Board, BoardId, Cell, Layout, OwnerRef, PermId, Tile, TileContent};
use tessella_replicate::{
    BoardImporter, GraphReplicator, GroupingError, GroupingService, ReferenceLedger,
};
use tessella_store::{BoardStore, WorkingSet};
use tessella_test_utils::{
    init_test_logging, nav_tile, shared_link_tile, speech_tile, test_owner, GraphFixture,
    RecordingStore,
};

/// Followable navigation targets of a board, in tile order
fn child_links(board: &Board) -> Vec<BoardId> {
    board.child_targets().collect()
}

/// All navigation targets, shared links included
fn nav_targets(board: &Board) -> Vec<BoardId> {
    board
        .real_tiles()
        .filter_map(|content| content.nav.as_ref())
        .map(|nav| nav.target)
        .collect()
}

fn perm(id: BoardId) -> PermId {
    match id {
        BoardId::Perm(id) => id,
        BoardId::Temp(_) => panic!("link was not rewritten to a permanent id: {id}"),
    }
}

/// Grouping fake that records its call sequence
struct RecordingGrouping {
    events: Mutex<Vec<String>>,
    fail_replace: bool,
}

impl RecordingGrouping {
    fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            fail_replace: false,
        }
    }

    fn failing_replace() -> Self {
        Self {
            fail_replace: true,
            ..Self::new()
        }
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

#[async_trait::async_trait]
impl GroupingService for RecordingGrouping {
    async fn ensure_grouping(&self, owner: &OwnerRef) -> Result<(), GroupingError> {
        self.push(format!("ensure {}", owner.email));
        Ok(())
    }

    async fn attach_board(&self, id: BoardId) -> Result<(), GroupingError> {
        self.push(format!("attach {id}"));
        Ok(())
    }

    async fn detach_board(&self, id: BoardId) -> Result<(), GroupingError> {
        self.push(format!("detach {id}"));
        Ok(())
    }

    async fn replace_board(&self, old: BoardId, new: PermId) -> Result<(), GroupingError> {
        if self.fail_replace {
            return Err(GroupingError("group backend unavailable".to_owned()));
        }
        self.push(format!("replace {old} -> {new}"));
        Ok(())
    }
}

#[tokio::test]
async fn a_cycle_is_copied_once_and_stays_a_cycle() {
    init_test_logging();
    let mut fixture = GraphFixture::new();
    fixture.board("a", &["b"]);
    fixture.board("b", &["a"]);
    let store = fixture.store();

    let importer = BoardImporter::new(store.clone() as Arc<dyn BoardStore>);
    let mut working_set = WorkingSet::new();
    let root = importer
        .import_public_board(fixture.lookup("a"), &test_owner(), &mut working_set)
        .await
        .unwrap();

    // Two originals, two replicas; nobody copied twice.
    assert_eq!(store.len(), 4);
    let a_replica = store.get(root).unwrap();
    assert!(!a_replica.is_public);
    assert_eq!(a_replica.owner.as_ref().unwrap().email, "test@example.org");

    let b_replica_id = perm(child_links(&a_replica)[0]);
    assert_ne!(b_replica_id, fixture.lookup("b"));
    let b_replica = store.get(b_replica_id).unwrap();
    assert_eq!(child_links(&b_replica), vec![BoardId::Perm(root)]);

    // The originals still point at each other.
    let a_original = store.get(fixture.lookup("a")).unwrap();
    assert!(a_original.is_public);
    assert_eq!(
        child_links(&a_original),
        vec![BoardId::Perm(fixture.lookup("b"))]
    );
}

#[tokio::test]
async fn a_diamond_shares_one_copy_of_the_common_child() {
    init_test_logging();
    let mut fixture = GraphFixture::new();
    fixture.board("a", &["b", "c"]);
    fixture.board("b", &["d"]);
    fixture.board("c", &["d"]);
    fixture.board("d", &[]);
    let store = fixture.store();

    let importer = BoardImporter::new(store.clone() as Arc<dyn BoardStore>);
    let mut working_set = WorkingSet::new();
    let root = importer
        .import_public_board(fixture.lookup("a"), &test_owner(), &mut working_set)
        .await
        .unwrap();

    assert_eq!(store.len(), 8);
    let a_replica = store.get(root).unwrap();
    let children = child_links(&a_replica);
    let b_replica = store.get(perm(children[0])).unwrap();
    let c_replica = store.get(perm(children[1])).unwrap();

    let d_via_b = child_links(&b_replica);
    let d_via_c = child_links(&c_replica);
    assert_eq!(d_via_b, d_via_c);
    assert_ne!(d_via_b[0], BoardId::Perm(fixture.lookup("d")));
}

#[tokio::test]
async fn replicating_the_same_board_twice_in_one_run_is_a_no_op() {
    init_test_logging();
    let mut fixture = GraphFixture::new();
    fixture.board("a", &["b"]);
    fixture.board("b", &[]);
    let recording = Arc::new(RecordingStore::wrapping(
        fixture.store() as Arc<dyn BoardStore>
    ));

    let replicator = GraphReplicator::new(recording.clone() as Arc<dyn BoardStore>);
    let owner = test_owner();
    let mut ledger = ReferenceLedger::new();
    let mut working_set = WorkingSet::new();

    let root = replicator
        .replicate_board(fixture.lookup("a"), &owner, &mut ledger, &mut working_set)
        .await
        .unwrap();
    let fetches = recording.fetch_count(fixture.lookup("a"));
    let creates = recording.create_count();

    let again = replicator
        .replicate_board(fixture.lookup("a"), &owner, &mut ledger, &mut working_set)
        .await
        .unwrap();

    assert_eq!(again, root);
    assert_eq!(recording.fetch_count(fixture.lookup("a")), fetches);
    assert_eq!(recording.create_count(), creates);
    assert_eq!(ledger.len(), 2);
}

#[tokio::test]
async fn a_persist_failure_stops_the_descent_and_rolls_back_the_pending_shell() {
    init_test_logging();
    let mut fixture = GraphFixture::new();
    fixture.board("a", &["b"]);
    fixture.board("b", &["c"]);
    fixture.board("c", &[]);
    let recording = Arc::new(RecordingStore::wrapping(
        fixture.store() as Arc<dyn BoardStore>
    ));
    recording.fail_create_named("b");

    let importer = BoardImporter::new(recording.clone() as Arc<dyn BoardStore>);
    let mut working_set = WorkingSet::new();
    let err = importer
        .import_public_board(fixture.lookup("a"), &test_owner(), &mut working_set)
        .await
        .unwrap_err();

    assert!(err.is_persist());
    // Nothing below the failure was touched.
    assert_eq!(recording.fetch_count(fixture.lookup("c")), 0);
    assert_eq!(recording.create_count_named("c"), 0);
    // The replica of `a` is already durable and stays; only the pending
    // shell is rolled back.
    assert_eq!(recording.create_count_named("a"), 1);
    assert_eq!(working_set.len(), 1);
    assert!(working_set.ids().all(|id| id.is_perm()));
}

#[tokio::test]
async fn backpatch_reaches_boards_outside_the_copied_subtree() {
    init_test_logging();
    let mut fixture = GraphFixture::new();
    fixture.board("a", &["b"]);
    fixture.board("b", &[]);
    fixture.board("x", &["b"]);
    let store = fixture.store();
    let recording = Arc::new(RecordingStore::wrapping(
        store.clone() as Arc<dyn BoardStore>
    ));

    // `x` is not reachable from `a`; it just sits in the session with a
    // link about to go stale.
    let importer = BoardImporter::new(recording.clone() as Arc<dyn BoardStore>);
    let mut working_set = WorkingSet::new();
    working_set.insert_board(store.get(fixture.lookup("x")).unwrap());

    let root = importer
        .import_public_board(fixture.lookup("a"), &test_owner(), &mut working_set)
        .await
        .unwrap();

    let b_replica = child_links(&store.get(root).unwrap())[0];
    let x_in_session = working_set.get(&BoardId::Perm(fixture.lookup("x"))).unwrap();
    assert_eq!(child_links(x_in_session), vec![b_replica]);
    // And the repair was saved back.
    assert!(recording.update_count_for(fixture.lookup("x")) >= 1);
    assert_eq!(
        child_links(&store.get(fixture.lookup("x")).unwrap()),
        vec![b_replica]
    );
}

#[tokio::test]
async fn a_summary_only_board_copies_as_a_valid_empty_board() {
    init_test_logging();
    let mut fixture = GraphFixture::new();
    fixture.insert("sparse", Board::new("sparse").public());
    let store = fixture.store();

    let importer = BoardImporter::new(store.clone() as Arc<dyn BoardStore>);
    let mut working_set = WorkingSet::new();
    let root = importer
        .import_public_board(fixture.lookup("sparse"), &test_owner(), &mut working_set)
        .await
        .unwrap();

    let replica = store.get(root).unwrap();
    assert!(replica.tiles.is_empty());
    assert_eq!(replica.name, "sparse");
    assert!(!replica.is_public);
}

#[tokio::test]
async fn shared_links_are_not_followed_but_are_still_backpatchable() {
    init_test_logging();
    let mut fixture = GraphFixture::new();
    let food = fixture.id("food");
    let library = fixture.id("library");
    fixture.insert(
        "home",
        Board::new("home").public().with_tiles(vec![
            nav_tile("go food", food),
            shared_link_tile("library", library),
        ]),
    );
    fixture.board("food", &[]);
    fixture.board("library", &[]);
    let store = fixture.store();

    let importer = BoardImporter::new(store.clone() as Arc<dyn BoardStore>);
    let mut working_set = WorkingSet::new();
    let root = importer
        .import_public_board(fixture.lookup("home"), &test_owner(), &mut working_set)
        .await
        .unwrap();

    // Three originals plus replicas of home and food only; the library was
    // never copied.
    assert_eq!(store.len(), 5);
    let home_replica = store.get(root).unwrap();
    let targets = nav_targets(&home_replica);
    assert_eq!(targets.len(), 2);
    assert_ne!(targets[0], BoardId::Perm(food));
    assert_eq!(targets[1], BoardId::Perm(library));

    // The shared flag survives the copy.
    let shared = home_replica
        .real_tiles()
        .filter_map(|content| content.nav.as_ref())
        .find(|nav| nav.shared_link)
        .unwrap();
    assert_eq!(shared.target, BoardId::Perm(library));
}

#[tokio::test]
async fn a_child_missing_from_the_store_falls_back_to_the_working_set() {
    init_test_logging();
    let mut fixture = GraphFixture::new();
    let ghost = fixture.id("ghost");
    fixture.insert(
        "a",
        Board::new("a")
            .public()
            .with_tiles(vec![nav_tile("go ghost", ghost)]),
    );
    let store = fixture.store();

    // The session holds an unsaved copy under the dangling id.
    let mut working_set = WorkingSet::new();
    working_set.insert_board(
        Board::new("ghost")
            .with_tiles(vec![speech_tile("boo")])
            .into_persisted(ghost),
    );

    let importer = BoardImporter::new(store.clone() as Arc<dyn BoardStore>);
    let root = importer
        .import_public_board(fixture.lookup("a"), &test_owner(), &mut working_set)
        .await
        .unwrap();

    let ghost_replica_id = perm(child_links(&store.get(root).unwrap())[0]);
    assert_ne!(ghost_replica_id, ghost);
    let ghost_replica = store.get(ghost_replica_id).unwrap();
    assert_eq!(ghost_replica.real_tiles().count(), 1);
    assert_eq!(ghost_replica.real_tiles().next().unwrap().label, "boo");
}

#[tokio::test]
async fn a_child_missing_everywhere_aborts_the_run() {
    init_test_logging();
    let mut fixture = GraphFixture::new();
    let ghost = fixture.id("ghost");
    fixture.insert(
        "a",
        Board::new("a")
            .public()
            .with_tiles(vec![nav_tile("go ghost", ghost)]),
    );

    let importer = BoardImporter::new(fixture.store() as Arc<dyn BoardStore>);
    let mut working_set = WorkingSet::new();
    let err = importer
        .import_public_board(fixture.lookup("a"), &test_owner(), &mut working_set)
        .await
        .unwrap_err();

    assert!(err.is_fetch());
    assert!(working_set.ids().all(|id| id.is_perm()));
}

#[tokio::test]
async fn a_transport_error_on_a_child_aborts_even_with_a_local_copy() {
    init_test_logging();
    let mut fixture = GraphFixture::new();
    fixture.board("a", &["b"]);
    fixture.board("b", &[]);
    let store = fixture.store();
    let recording = Arc::new(RecordingStore::wrapping(
        store.clone() as Arc<dyn BoardStore>
    ));
    recording.fail_fetch(fixture.lookup("b"));

    let importer = BoardImporter::new(recording as Arc<dyn BoardStore>);
    let mut working_set = WorkingSet::new();
    working_set.insert_board(store.get(fixture.lookup("b")).unwrap());

    let err = importer
        .import_public_board(fixture.lookup("a"), &test_owner(), &mut working_set)
        .await
        .unwrap_err();

    // Only NotFound may fall back; infrastructure failures abort.
    assert!(err.is_fetch());
    assert_eq!(store.len(), 3);
}

#[tokio::test]
async fn a_board_linking_to_itself_replicates_once() {
    init_test_logging();
    let mut fixture = GraphFixture::new();
    let me = fixture.id("me");
    fixture.insert(
        "me",
        Board::new("me")
            .public()
            .with_tiles(vec![nav_tile("again", me)]),
    );
    let store = fixture.store();

    let importer = BoardImporter::new(store.clone() as Arc<dyn BoardStore>);
    let mut working_set = WorkingSet::new();
    let root = importer
        .import_public_board(me, &test_owner(), &mut working_set)
        .await
        .unwrap();

    assert_eq!(store.len(), 2);
    let replica = store.get(root).unwrap();
    assert_eq!(child_links(&replica), vec![BoardId::Perm(root)]);
}

#[tokio::test]
async fn a_backpatch_save_failure_does_not_fail_the_import() {
    init_test_logging();
    let mut fixture = GraphFixture::new();
    fixture.board("a", &["b"]);
    fixture.board("b", &[]);
    fixture.board("x", &["b"]);
    let store = fixture.store();
    let recording = Arc::new(RecordingStore::wrapping(
        store.clone() as Arc<dyn BoardStore>
    ));
    recording.fail_update(fixture.lookup("x"));

    let importer = BoardImporter::new(recording as Arc<dyn BoardStore>);
    let mut working_set = WorkingSet::new();
    working_set.insert_board(store.get(fixture.lookup("x")).unwrap());

    let root = importer
        .import_public_board(fixture.lookup("a"), &test_owner(), &mut working_set)
        .await
        .unwrap();

    // The in-session copy is repaired even though the save keeps failing.
    let b_replica = child_links(&store.get(root).unwrap())[0];
    let x_in_session = working_set.get(&BoardId::Perm(fixture.lookup("x"))).unwrap();
    assert_eq!(child_links(x_in_session), vec![b_replica]);
    assert_eq!(
        child_links(&store.get(fixture.lookup("x")).unwrap()),
        vec![BoardId::Perm(fixture.lookup("b"))]
    );
}

#[tokio::test]
async fn grouping_sees_attach_then_replace_on_success() {
    init_test_logging();
    let mut fixture = GraphFixture::new();
    fixture.board("a", &[]);
    let grouping = Arc::new(RecordingGrouping::new());

    let importer = BoardImporter::new(fixture.store() as Arc<dyn BoardStore>)
        .with_grouping(grouping.clone() as Arc<dyn GroupingService>);
    let mut working_set = WorkingSet::new();
    let root = importer
        .import_public_board(fixture.lookup("a"), &test_owner(), &mut working_set)
        .await
        .unwrap();

    let events = grouping.events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0], "ensure test@example.org");
    let pending = events[1].strip_prefix("attach ").unwrap();
    assert!(pending.starts_with("tmp-"));
    assert_eq!(events[2], format!("replace {pending} -> {root}"));
}

#[tokio::test]
async fn grouping_sees_a_detach_when_the_import_fails() {
    init_test_logging();
    let mut fixture = GraphFixture::new();
    fixture.board("a", &[]);
    let recording = Arc::new(RecordingStore::wrapping(
        fixture.store() as Arc<dyn BoardStore>
    ));
    recording.fail_create_named("a");
    let grouping = Arc::new(RecordingGrouping::new());

    let importer = BoardImporter::new(recording as Arc<dyn BoardStore>)
        .with_grouping(grouping.clone() as Arc<dyn GroupingService>);
    let mut working_set = WorkingSet::new();
    importer
        .import_public_board(fixture.lookup("a"), &test_owner(), &mut working_set)
        .await
        .unwrap_err();

    let events = grouping.events();
    assert_eq!(events.len(), 3);
    let attached = events[1].strip_prefix("attach ").unwrap();
    let detached = events[2].strip_prefix("detach ").unwrap();
    assert_eq!(attached, detached);
    assert!(working_set.is_empty());
}

#[tokio::test]
async fn a_grouping_replace_failure_is_not_fatal() {
    init_test_logging();
    let mut fixture = GraphFixture::new();
    fixture.board("a", &[]);
    let grouping = Arc::new(RecordingGrouping::failing_replace());

    let importer = BoardImporter::new(fixture.store() as Arc<dyn BoardStore>)
        .with_grouping(grouping as Arc<dyn GroupingService>);
    let mut working_set = WorkingSet::new();
    let root = importer
        .import_public_board(fixture.lookup("a"), &test_owner(), &mut working_set)
        .await;

    assert!(root.is_ok());
}

#[tokio::test]
async fn import_and_link_places_a_navigation_tile_at_the_first_free_cell() {
    init_test_logging();
    let mut fixture = GraphFixture::new();
    fixture.board("animals", &[]);
    let home_id = fixture.insert(
        "home",
        Board::new("home")
            .with_layout(Layout::new(2, 2).unwrap())
            .with_tiles(vec![Tile::Real(
                TileContent::new("existing").with_position(Cell::new(0, 0, 0)),
            )]),
    );
    let store = fixture.store();

    let importer = BoardImporter::new(store.clone() as Arc<dyn BoardStore>);
    let mut working_set = WorkingSet::new();
    let root = importer
        .import_and_link(
            fixture.lookup("animals"),
            &test_owner(),
            &mut working_set,
            home_id,
        )
        .await
        .unwrap();

    let home = store.get(home_id).unwrap();
    assert_eq!(home.tiles.len(), 2);
    let link = home
        .real_tiles()
        .find(|content| content.nav.is_some())
        .unwrap();
    assert_eq!(link.label, "animals");
    assert_eq!(link.position, Some(Cell::new(0, 0, 1)));
    assert_eq!(
        link.nav.as_ref().map(|nav| nav.target),
        Some(BoardId::Perm(root))
    );
    assert!(working_set.contains(&BoardId::Perm(home_id)));
}

#[tokio::test]
async fn a_summary_listing_entry_is_hydrated_before_copying() {
    init_test_logging();
    let mut fixture = GraphFixture::new();
    fixture.board("food", &[]);
    let home_id = fixture.insert(
        "home",
        Board::new("home").public().with_tiles(vec![
            nav_tile("go food", fixture.lookup("food")),
            speech_tile("hi"),
        ]),
    );
    let store = fixture.store();

    // What a public listing hands back: id and name, tiles virtual.
    let summary = Board::new("home")
        .public()
        .with_tiles(vec![Tile::Virtual])
        .into_persisted(home_id);

    let importer = BoardImporter::new(store.clone() as Arc<dyn BoardStore>);
    let mut working_set = WorkingSet::new();
    let root = importer
        .import_board(&summary, &test_owner(), &mut working_set)
        .await
        .unwrap();

    let replica = store.get(root).unwrap();
    assert_eq!(replica.real_tiles().count(), 2);
    // The child graph came along, via the hydrated tiles.
    assert_eq!(store.len(), 4);
    let food_replica = perm(child_links(&replica)[0]);
    assert_ne!(food_replica, fixture.lookup("food"));
}

#[tokio::test]
async fn duplicate_edges_collapse_to_one_copy() {
    init_test_logging();
    // `a` links to `b` twice through different tiles; the second visit hits
    // the ledger.
    let mut fixture = GraphFixture::new();
    let b = fixture.id("b");
    fixture.insert(
        "a",
        Board::new("a").public().with_tiles(vec![
            nav_tile("go b", b),
            nav_tile("b again", b),
        ]),
    );
    fixture.board("b", &[]);
    let store = fixture.store();

    let importer = BoardImporter::new(store.clone() as Arc<dyn BoardStore>);
    let mut working_set = WorkingSet::new();
    let root = importer
        .import_public_board(fixture.lookup("a"), &test_owner(), &mut working_set)
        .await
        .unwrap();

    assert_eq!(store.len(), 4);
    let replica = store.get(root).unwrap();
    let targets = child_links(&replica);
    assert_eq!(targets.len(), 2);
    assert_eq!(targets[0], targets[1]);
    assert_ne!(targets[0], BoardId::Perm(b));
}

#[tokio::test]
async fn a_working_set_child_rewritten_mid_run_never_copies_a_replica() {
    init_test_logging();
    // `a` links to an unsaved working-set board that links back to `a`. By
    // the time the child is visited, the backpatch has already rewritten
    // its return link to point at `a`'s replica; the walk must recognize
    // that replica as its own output and stop.
    let mut fixture = GraphFixture::new();
    let ghost = fixture.id("ghost");
    fixture.insert(
        "a",
        Board::new("a")
            .public()
            .with_tiles(vec![nav_tile("go ghost", ghost)]),
    );
    let store = fixture.store();

    let mut working_set = WorkingSet::new();
    working_set.insert_board(
        Board::new("ghost")
            .with_tiles(vec![nav_tile("back", fixture.lookup("a"))])
            .into_persisted(ghost),
    );

    let importer = BoardImporter::new(store.clone() as Arc<dyn BoardStore>);
    let root = importer
        .import_public_board(fixture.lookup("a"), &test_owner(), &mut working_set)
        .await
        .unwrap();

    // One original in the store plus exactly two replicas.
    assert_eq!(store.len(), 3);
    let ghost_replica_id = perm(child_links(&store.get(root).unwrap())[0]);
    let ghost_replica = store.get(ghost_replica_id).unwrap();
    assert_eq!(child_links(&ghost_replica), vec![BoardId::Perm(root)]);
}
