//! Save/restart protocol between simulated instances
//!
//! Tenet: an instance never silently overwrites a foreign write it has not
//! absorbed, and a failed save never loses local changes.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use trellis_chunk::{create_all_chunks, ChunkId};
use trellis_model::{Field, Payload, Store, ROOT_ITEM_ID};
use trellis_path::Address;
use trellis_sync::{
    DirectoryStore, FragmentStore, IdentityProvider, MemoryStore, SaveOutcome, StaticIdentity,
    SyncError, SyncSession,
};
use trellis_test_utils::{init_tracing, new_store, store_with_texts};

struct Instance {
    session: SyncSession,
    store: Store,
    identity: Arc<StaticIdentity>,
}

async fn start(shared: &MemoryStore) -> Instance {
    start_with(shared, Arc::new(StaticIdentity::new())).await
}

async fn start_with(shared: &MemoryStore, identity: Arc<StaticIdentity>) -> Instance {
    let (session, restored) = SyncSession::load(Arc::new(shared.clone()), identity.clone())
        .await
        .unwrap();
    let store = restored.map_or_else(new_store, Store::new);
    Instance {
        session,
        store,
        identity,
    }
}

fn add_text(store: &mut Store, text: &str) -> trellis_model::ItemId {
    store.save_snapshot_for_undo();
    let id = store.create_item(Payload::text(text));
    store.add_edge(ROOT_ITEM_ID, id, None).unwrap();
    store.commit();
    id
}

#[tokio::test]
async fn first_save_binds_with_full_set() {
    init_tracing();
    let shared = MemoryStore::new();
    let mut a = start(&shared).await;
    add_text(&mut a.store, "alpha");

    let outcome = a.session.save(&mut a.store).await.unwrap();

    let expected = create_all_chunks(a.store.state()).unwrap().len();
    assert_eq!(outcome, SaveOutcome::Bound { written: expected });
    assert_eq!(shared.fragment_count(a.session.instance_id()), expected);
    assert!(!a.store.has_pending());
    assert_eq!(a.identity.current_sequence(), 1);
}

#[tokio::test]
async fn bound_session_writes_only_pending_chunks() {
    let shared = MemoryStore::new();
    let mut a = start(&shared).await;
    a.session.save(&mut a.store).await.unwrap();

    let id = add_text(&mut a.store, "beta");
    let outcome = a.session.save(&mut a.store).await.unwrap();

    let SaveOutcome::Written { written } = outcome else {
        panic!("expected a partial write, got {outcome:?}");
    };
    assert!(written.contains(&ChunkId::entry(Field::Items, id)));
    assert!(written.contains(&ChunkId::entry(Field::TextItems, id)));
    assert!(written.contains(&ChunkId::entry(Field::Items, ROOT_ITEM_ID)));
    assert!(written.contains(&ChunkId::Field(Field::NextItemId)));
    assert!(!written.contains(&ChunkId::entry(Field::Pages, ROOT_ITEM_ID)));
}

#[tokio::test]
async fn nothing_pending_is_unchanged() {
    let shared = MemoryStore::new();
    let mut a = start(&shared).await;
    a.session.save(&mut a.store).await.unwrap();
    let seq = a.identity.current_sequence();

    assert_eq!(a.session.save(&mut a.store).await.unwrap(), SaveOutcome::Unchanged);
    assert_eq!(a.identity.current_sequence(), seq);
}

#[tokio::test]
async fn new_instance_absorbs_existing_document() {
    init_tracing();
    let shared = MemoryStore::new();
    let mut a = start(&shared).await;
    add_text(&mut a.store, "from a");
    a.session.save(&mut a.store).await.unwrap();

    let mut b = start(&shared).await;
    let outcome = b.session.save(&mut b.store).await.unwrap();

    let SaveOutcome::Restarted { from, state, discarded } = outcome else {
        panic!("expected a restart, got {outcome:?}");
    };
    assert_eq!(from, a.session.instance_id());
    assert_eq!(&state, a.store.state());
    assert_eq!(b.store.state(), a.store.state());
    assert!(discarded.is_empty());
    assert_eq!(
        shared.fragment_count(b.session.instance_id()),
        shared.fragment_count(a.session.instance_id())
    );
}

#[tokio::test]
async fn restart_discards_local_pending_changes() {
    let shared = MemoryStore::new();
    let mut a = start(&shared).await;
    a.session.save(&mut a.store).await.unwrap();
    let mut b = start(&shared).await;
    b.session.save(&mut b.store).await.unwrap();

    add_text(&mut a.store, "a wins");
    a.session.save(&mut a.store).await.unwrap();

    let lost = add_text(&mut b.store, "b loses");
    let outcome = b.session.save(&mut b.store).await.unwrap();

    let SaveOutcome::Restarted { discarded, .. } = outcome else {
        panic!("expected a restart, got {outcome:?}");
    };
    assert!(discarded.contains(&ChunkId::entry(Field::Items, lost)));
    assert_eq!(b.store.state(), a.store.state());
    assert!(!b.store.has_pending());
    assert!(!b.store.can_undo());
}

#[tokio::test]
async fn absorbing_does_not_ping_pong() {
    let shared = MemoryStore::new();
    let mut a = start(&shared).await;
    a.session.save(&mut a.store).await.unwrap();
    let mut b = start(&shared).await;
    assert!(b.session.save(&mut b.store).await.unwrap().is_restarted());

    add_text(&mut a.store, "after");
    let outcome = a.session.save(&mut a.store).await.unwrap();
    assert!(matches!(outcome, SaveOutcome::Written { .. }));
}

#[tokio::test]
async fn freshest_foreign_marker_wins() {
    let shared = MemoryStore::new();
    let mut a = start(&shared).await;
    a.session.save(&mut a.store).await.unwrap();
    let mut b = start(&shared).await;
    b.session.save(&mut b.store).await.unwrap();

    add_text(&mut a.store, "older");
    a.session.save(&mut a.store).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    add_text(&mut b.store, "newer");
    // b restarts from a here, losing "newer"
    b.session.save(&mut b.store).await.unwrap();
    add_text(&mut b.store, "newest");
    b.session.save(&mut b.store).await.unwrap();

    let mut c = start(&shared).await;
    let SaveOutcome::Restarted { from, .. } = c.session.save(&mut c.store).await.unwrap() else {
        panic!("expected a restart");
    };
    assert_eq!(from, b.session.instance_id());
    assert_eq!(c.store.state(), b.store.state());
}

#[tokio::test]
async fn failed_write_keeps_pending() {
    let shared = MemoryStore::new();
    let mut a = start(&shared).await;
    a.session.save(&mut a.store).await.unwrap();
    add_text(&mut a.store, "unsaved");
    let before = a.store.pending_addresses().clone();
    let state = a.store.state().clone();

    shared.set_fail_writes(true);
    let result = a.session.save(&mut a.store).await;
    assert!(matches!(result, Err(SyncError::Store(_))));
    assert_eq!(a.store.pending_addresses(), &before);
    assert_eq!(a.store.state(), &state);

    shared.set_fail_writes(false);
    assert!(matches!(
        a.session.save(&mut a.store).await.unwrap(),
        SaveOutcome::Written { .. }
    ));
    assert!(!a.store.has_pending());
}

#[tokio::test]
async fn whole_collection_write_saves_everything() {
    let shared = MemoryStore::new();
    let (mut store, _) = store_with_texts(&["one", "two"]);
    let identity = Arc::new(StaticIdentity::new());
    let (mut session, _) = SyncSession::load(Arc::new(shared.clone()), identity.clone()).await.unwrap();
    session.save(&mut store).await.unwrap();

    store.mutate(&Address::field("workspaces"), json!({}));
    let outcome = session.save(&mut store).await.unwrap();

    let expected: Vec<ChunkId> = trellis_chunk::ChunkIter::new(store.state()).collect();
    assert_eq!(outcome, SaveOutcome::Written { written: expected.clone() });
    assert_eq!(shared.fragment_count(identity.instance_id()), expected.len());
}

#[tokio::test]
async fn reload_restores_own_document() {
    let shared = MemoryStore::new();
    let identity = Arc::new(StaticIdentity::new());
    let mut a = start_with(&shared, identity.clone()).await;
    add_text(&mut a.store, "persisted");
    a.session.save(&mut a.store).await.unwrap();
    let saved = a.store.state().clone();
    drop(a);

    let (session, restored) = SyncSession::load(Arc::new(shared.clone()), identity).await.unwrap();
    assert_eq!(restored, Some(saved));
    assert!(!session.is_bound());
}

#[tokio::test]
async fn corrupt_foreign_fragment_aborts_restart() {
    let shared = MemoryStore::new();
    let mut a = start(&shared).await;
    a.session.save(&mut a.store).await.unwrap();

    let mut bad = shared
        .read_fragment(a.session.instance_id(), &ChunkId::entry(Field::Items, ROOT_ITEM_ID))
        .await
        .unwrap()
        .unwrap();
    bad.payload = Some(json!({ "tampered": true }));
    shared.tamper(a.session.instance_id(), bad);

    let mut b = start(&shared).await;
    let id = add_text(&mut b.store, "mine");
    let result = b.session.save(&mut b.store).await;
    assert!(result.is_err());
    assert!(b.store.state().contains_item(id));
    assert!(b.store.has_pending());
}

#[tokio::test]
async fn directory_instances_exchange_documents() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let shared: Arc<dyn FragmentStore> = Arc::new(DirectoryStore::new(dir.path()));

    let (mut a, _) = SyncSession::load(shared.clone(), Arc::new(StaticIdentity::new()))
        .await
        .unwrap();
    let (mut a_store, _) = store_with_texts(&["on disk"]);
    a.save(&mut a_store).await.unwrap();

    let (mut b, restored) = SyncSession::load(shared.clone(), Arc::new(StaticIdentity::new()))
        .await
        .unwrap();
    assert!(restored.is_none());
    let mut b_store = new_store();
    assert!(b.save(&mut b_store).await.unwrap().is_restarted());
    assert_eq!(b_store.state(), a_store.state());

    let markers = shared.read_instance_markers().await.unwrap();
    let b_marker = markers
        .iter()
        .find(|m| m.instance_id == b.instance_id())
        .unwrap();
    assert_eq!(b_marker.observed.get(&a.instance_id()), Some(&1));
}
