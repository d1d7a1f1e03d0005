//! End-to-end behaviour of the engine.
//!
//! Core guarantees exercised here:
//! - An item with several parents is shown once per path, and search finds
//!   it by its own text only.
//! - Every text-bearing command, undo and redo leaves the search index equal
//!   to a fresh build.
//! - Engines sharing a fragment store converge on the freshest document,
//!   while each keeps its own device workspace.

use pretty_assertions::assert_eq;
use std::sync::Arc;
use trellis_core::prelude::*;
use trellis_core::EngineConfig;
use trellis_model::{GraphError, WorkspaceId};
use trellis_search::SearchIndex;
use trellis_sync::FragmentStore;
use trellis_test_utils::{fixed_clock, init_tracing};

fn path(ids: &[ItemId]) -> ItemPath {
    ItemPath::new(ids.to_vec()).unwrap()
}

fn engine() -> Engine {
    Engine::new(EngineConfig::default()).unwrap().with_clock(fixed_clock)
}

/// Build root -> a("hello"), root -> b("world"), a -> c, then b -> c
fn transclusion(engine: &mut Engine, c_text: &str) -> (ItemId, ItemId, ItemId) {
    engine.begin_command();
    let a = engine.create_child(ROOT_ITEM_ID, Payload::text("hello"), None).unwrap();
    let b = engine.create_child(ROOT_ITEM_ID, Payload::text("world"), None).unwrap();
    let c = engine.create_child(a, Payload::text(c_text), None).unwrap();
    engine.add_parent(c, b, None).unwrap();
    engine.commit();
    (a, b, c)
}

/// Tenet: a transcluded item is displayed once under each parent.
///
/// C lives under both A and B, so the outline must show it at two distinct
/// paths, each rooted at the page and running through one parent.
#[test]
fn transcluded_item_has_one_path_per_parent() {
    init_tracing();
    let mut engine = engine();
    let (a, b, c) = transclusion(&mut engine, "note");

    assert_eq!(
        engine.displayed_paths(c),
        vec![path(&[ROOT_ITEM_ID, a, c]), path(&[ROOT_ITEM_ID, b, c])]
    );
}

/// Tenet: an item under two page roots is shown once under each page.
///
/// A and B are pages of their own; C hangs under both, so one displayed
/// path starts at A and the other at B. Search still goes by C's own text.
#[test]
fn item_under_two_pages_has_one_path_per_page() {
    let mut engine = engine();
    engine.begin_command();
    let a = engine.create_item(Payload::text("hello"));
    let b = engine.create_item(Payload::text("world"));
    for page in [a, b] {
        engine.make_page(page).unwrap();
        engine.mount_page(page).unwrap();
    }
    let c = engine.create_child(a, Payload::text("note"), None).unwrap();
    engine.add_parent(c, b, None).unwrap();
    engine.commit();

    let mut shown = engine.displayed_paths(c);
    shown.sort();
    assert_eq!(shown, vec![path(&[a, c]), path(&[b, c])]);
    assert!(shown.iter().all(|p| p.len() == 2 && p.focal() == c));
    assert_eq!(engine.search("wor"), vec![b]);

    engine.begin_command();
    engine.set_text(c, "a word").unwrap();
    engine.commit();
    assert_eq!(engine.search("wor"), vec![b, c]);
}

/// Tenet: search matches an item's own text, never its parents'.
///
/// C sits under B("world"), but `wor` finds C only when C's own text
/// contains it.
#[test]
fn search_does_not_inherit_parent_text() {
    let mut engine = engine();
    let (_, b, _) = transclusion(&mut engine, "note");
    assert_eq!(engine.search("wor"), vec![b]);

    let mut engine = self::engine();
    let (_, b, c) = transclusion(&mut engine, "a word");
    assert_eq!(engine.search("wor"), vec![b, c]);
}

/// Tenet: collapsing one occurrence hides the children of that occurrence only.
#[test]
fn collapse_is_per_occurrence() {
    let mut engine = engine();
    let (a, b, c) = transclusion(&mut engine, "note");
    engine.begin_command();
    let d = engine.create_child(c, Payload::text("deep"), None).unwrap();
    engine.set_collapsed(a, c, true).unwrap();
    engine.commit();

    assert_eq!(engine.displayed_paths(d), vec![path(&[ROOT_ITEM_ID, b, c, d])]);
    assert_eq!(engine.displayed_paths(c).len(), 2);
}

/// Tenet: the graph stays acyclic.
///
/// Attaching an ancestor below its own descendant is refused and leaves the
/// document unchanged.
#[test]
fn cycles_are_refused() {
    let mut engine = engine();
    let (a, _, c) = transclusion(&mut engine, "note");
    let before = engine.state().clone();

    let result = engine.add_parent(a, c, None);
    assert!(matches!(result, Err(EngineError::Graph(GraphError::CycleDetected { .. }))));
    assert_eq!(engine.state(), &before);
}

/// Tenet: removing one parent keeps a transcluded item alive.
#[test]
fn removing_one_parent_keeps_item() {
    let mut engine = engine();
    let (a, b, c) = transclusion(&mut engine, "note");
    engine.begin_command();
    engine.remove_parent(c, a).unwrap();
    engine.delete_item(a).unwrap();
    engine.commit();

    assert!(engine.state().contains_item(c));
    assert_eq!(engine.displayed_paths(c), vec![path(&[ROOT_ITEM_ID, b, c])]);
    assert_eq!(engine.search("note"), vec![c]);
}

/// Tenet: moving an item keeps its edge settings and its search entry.
#[test]
fn move_keeps_item_searchable() {
    let mut engine = engine();
    let (a, b, _) = transclusion(&mut engine, "note");
    engine.begin_command();
    let d = engine.create_child(a, Payload::text("movable"), None).unwrap();
    engine.set_collapsed(a, d, true).unwrap();
    engine.move_item(d, a, b, Some(0)).unwrap();
    engine.commit();

    let item = engine.state().item(d).unwrap();
    assert!(item.parents[&b].collapsed);
    assert_eq!(engine.state().item(b).unwrap().child_item_ids[0], d);
    assert_eq!(engine.search("movab"), vec![d]);
}

/// Tenet: undo and redo keep the search index exact.
#[test]
fn history_keeps_index_exact() {
    let mut engine = engine();
    let (a, _, c) = transclusion(&mut engine, "note");
    engine.begin_command();
    engine.set_text(c, "edited note").unwrap();
    engine.commit();
    engine.begin_command();
    engine.delete_item(a).unwrap();
    engine.commit();

    while engine.undo() {
        assert_eq!(engine.search_index(), &SearchIndex::build(engine.state()));
    }
    while engine.redo() {
        assert_eq!(engine.search_index(), &SearchIndex::build(engine.state()));
    }
    assert_eq!(engine.search("edited"), vec![c]);
}

/// Tenet: the first engine binds, the second absorbs the first's document.
///
/// Each device keeps its own workspace, so absorbing a document never
/// switches a device to another device's view.
#[tokio::test]
async fn second_engine_absorbs_shared_document() {
    init_tracing();
    let shared = MemoryStore::new();

    let laptop = EngineConfig::new().with_workspace(WorkspaceId::generate(), "Laptop");
    let (mut first, outcome) = Engine::open(laptop, Arc::new(shared.clone()), Arc::new(StaticIdentity::new()))
        .await
        .unwrap();
    assert!(matches!(outcome, SaveOutcome::Bound { .. }));
    let (_, _, c) = transclusion(&mut first, "shared thought");
    assert!(matches!(first.save().await.unwrap(), SaveOutcome::Written { .. }));

    let phone = EngineConfig::new().with_workspace(WorkspaceId::generate(), "Phone");
    let (mut second, outcome) = Engine::open(phone, Arc::new(shared.clone()), Arc::new(StaticIdentity::new()))
        .await
        .unwrap();
    assert!(outcome.is_restarted());
    assert_eq!(second.search("thought"), vec![c]);
    assert_eq!(second.workspace().unwrap().name, "Phone");
    assert!(second.state().workspace(&first.config().workspace_id).is_some());

    // The phone's workspace is new and still pending
    assert!(matches!(second.save().await.unwrap(), SaveOutcome::Written { .. }));
    assert!(first.save().await.unwrap().is_restarted());
    assert!(first.state().workspace(&second.config().workspace_id).is_some());
    assert_eq!(first.workspace().unwrap().name, "Laptop");
}

/// Tenet: exclusions are per device.
#[tokio::test]
async fn exclusion_only_hides_on_its_device() {
    let shared = MemoryStore::new();
    let (mut first, _) = Engine::open(EngineConfig::new(), Arc::new(shared.clone()), Arc::new(StaticIdentity::new()))
        .await
        .unwrap();
    let (_, b, c) = transclusion(&mut first, "private");
    first.begin_command();
    first.exclude_item(b).unwrap();
    first.commit();
    // c is still reachable through a, but excluding b hides b's subtree
    assert!(first.search("private").is_empty());
    first.save().await.unwrap();

    let (second, _) = Engine::open(EngineConfig::new(), Arc::new(shared), Arc::new(StaticIdentity::new()))
        .await
        .unwrap();
    assert_eq!(second.search("private"), vec![c]);
}

/// Tenet: a restarted process restores its own document from disk.
#[tokio::test]
async fn directory_store_survives_restart() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let shared: Arc<dyn FragmentStore> = Arc::new(DirectoryStore::new(dir.path().join("shared")));
    let identity_path = dir.path().join("identity.json");
    let config = EngineConfig::new();

    let c = {
        let identity = Arc::new(FileIdentity::open(&identity_path).await.unwrap());
        let (mut engine, _) = Engine::open(config.clone(), shared.clone(), identity).await.unwrap();
        let (_, _, c) = transclusion(&mut engine, "durable");
        engine.save().await.unwrap();
        c
    };

    let identity = Arc::new(FileIdentity::open(&identity_path).await.unwrap());
    let (engine, outcome) = Engine::open(config.clone(), shared, identity).await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Bound { .. }));
    assert_eq!(engine.search("durable"), vec![c]);
    assert_eq!(engine.displayed_paths(c).len(), 2);
    assert_eq!(engine.workspace().unwrap().id, config.workspace_id);
}

/// Tenet: a device's exclusions come back after a restart.
///
/// The workspace id names a file in the directory store, so ids that could
/// be read as a path are refused before anything is written.
#[tokio::test]
async fn exclusions_survive_restart_on_directory_store() {
    assert!(EngineConfig::from_toml_str(r#"workspace_id = "home/laptop""#).is_err());

    let dir = tempfile::tempdir().unwrap();
    let shared: Arc<dyn FragmentStore> = Arc::new(DirectoryStore::new(dir.path()));
    let identity = Arc::new(StaticIdentity::new());
    let config = EngineConfig::from_toml_str(r#"workspace_id = "home-laptop""#).unwrap();

    let (mut engine, _) = Engine::open(config.clone(), shared.clone(), identity.clone()).await.unwrap();
    engine.begin_command();
    let secret = engine.create_child(ROOT_ITEM_ID, Payload::text("secret"), None).unwrap();
    engine.exclude_item(secret).unwrap();
    engine.commit();
    engine.save().await.unwrap();
    drop(engine);

    let (engine, outcome) = Engine::open(config, shared, identity).await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Bound { .. }));
    assert!(engine.workspace().unwrap().excluded_item_ids.contains(&secret));
    assert!(engine.search("secret").is_empty());
}

/// Tenet: a failed save keeps every unsaved change for the next attempt.
#[tokio::test]
async fn failed_save_is_retried_later() {
    let shared = MemoryStore::new();
    let (mut engine, _) = Engine::open(EngineConfig::new(), Arc::new(shared.clone()), Arc::new(StaticIdentity::new()))
        .await
        .unwrap();
    let (_, _, c) = transclusion(&mut engine, "retry me");

    shared.set_fail_writes(true);
    assert!(matches!(engine.save().await, Err(EngineError::Sync(_))));
    assert!(engine.store().has_pending());

    shared.set_fail_writes(false);
    engine.save().await.unwrap();
    assert!(!engine.store().has_pending());

    let (other, _) = Engine::open(EngineConfig::new(), Arc::new(shared), Arc::new(StaticIdentity::new()))
        .await
        .unwrap();
    assert_eq!(other.search("retry"), vec![c]);
}
