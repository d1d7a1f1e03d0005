use pretty_assertions::assert_eq;
use proptest::prelude::*;
use trellis_model::{DocumentState, ItemId, Payload, Store, ROOT_ITEM_ID};

#[derive(Debug, Clone)]
enum Op {
    Create(String),
    AddEdge(usize, usize),
    RemoveEdge(usize, usize),
    Move(usize, usize, usize),
    SetText(usize, String),
    Collapse(usize, usize),
    Delete(usize),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        "[a-z ]{0,8}".prop_map(Op::Create),
        (0..12usize, 0..12usize).prop_map(|(p, c)| Op::AddEdge(p, c)),
        (0..12usize, 0..12usize).prop_map(|(p, c)| Op::RemoveEdge(p, c)),
        (0..12usize, 0..12usize, 0..12usize).prop_map(|(o, n, c)| Op::Move(o, n, c)),
        (0..12usize, "[a-z]{0,6}").prop_map(|(i, t)| Op::SetText(i, t)),
        (0..12usize, 0..12usize).prop_map(|(p, c)| Op::Collapse(p, c)),
        (1..12usize).prop_map(Op::Delete),
    ]
}

fn pick(store: &Store, i: usize) -> ItemId {
    let ids: Vec<ItemId> = store.state().items().map(|item| item.id).collect();
    ids[i % ids.len()]
}

/// Apply one op as its own command; rejected ops are fine
fn apply(store: &mut Store, op: &Op) {
    store.save_snapshot_for_undo();
    match op {
        Op::Create(text) => {
            let id = store.create_item(Payload::text(text.clone()));
            store.add_edge(ROOT_ITEM_ID, id, None).unwrap();
        }
        Op::AddEdge(p, c) => {
            let (p, c) = (pick(store, *p), pick(store, *c));
            let _ = store.add_edge(p, c, None);
        }
        Op::RemoveEdge(p, c) => {
            let (p, c) = (pick(store, *p), pick(store, *c));
            let _ = store.remove_edge(p, c);
        }
        Op::Move(o, n, c) => {
            let (o, n, c) = (pick(store, *o), pick(store, *n), pick(store, *c));
            let _ = store.move_edge(o, n, c, Some(0));
        }
        Op::SetText(i, text) => {
            let id = pick(store, *i);
            let _ = store.set_payload(id, Payload::text(text.clone()));
        }
        Op::Collapse(p, c) => {
            let (p, c) = (pick(store, *p), pick(store, *c));
            let _ = store.set_collapsed(p, c, true);
        }
        Op::Delete(i) => {
            let id = pick(store, *i);
            let _ = store.delete_item(id);
        }
    }
    store.commit();
}

proptest! {
    #[test]
    fn prop_integrity_holds_under_edits(ops in proptest::collection::vec(op(), 0..40)) {
        let mut store = Store::new(DocumentState::fresh(0)).with_clock(|| 0);
        for op in &ops {
            apply(&mut store, op);
            prop_assert!(store.state().check_integrity().is_ok());
        }
    }

    #[test]
    fn prop_undo_all_restores_initial_and_redo_all_restores_final(
        ops in proptest::collection::vec(op(), 1..25)
    ) {
        let mut store = Store::new(DocumentState::fresh(0)).with_clock(|| 0).with_undo_depth(100);
        let initial = store.state().clone();
        for op in &ops {
            apply(&mut store, op);
        }
        let last = store.state().clone();

        while store.undo().is_some() {}
        prop_assert_eq!(store.state(), &initial);

        while store.redo().is_some() {}
        prop_assert_eq!(store.state(), &last);
    }

    #[test]
    fn prop_undo_touched_covers_every_changed_entry(ops in proptest::collection::vec(op(), 1..10)) {
        let mut store = Store::new(DocumentState::fresh(0)).with_clock(|| 0);
        for op in &ops {
            apply(&mut store, op);
        }
        let before = store.state().clone();
        if let Some(touched) = store.undo() {
            let after = store.state();
            for item in before.items() {
                if after.item(item.id) != Some(item) {
                    let addr = trellis_model::Address::entry("items", item.id);
                    prop_assert!(touched.contains(&addr));
                }
            }
        }
    }
}

#[test]
fn multi_parent_edges_stay_symmetric() {
    let mut store = Store::new(DocumentState::fresh(0));
    let a = store.create_item(Payload::text("a"));
    let b = store.create_item(Payload::text("b"));
    let c = store.create_item(Payload::text("c"));
    store.add_edge(ROOT_ITEM_ID, a, None).unwrap();
    store.add_edge(ROOT_ITEM_ID, b, None).unwrap();
    store.add_edge(a, c, None).unwrap();
    store.add_edge(b, c, None).unwrap();
    store.commit();

    store.remove_edge(a, c).unwrap();
    store.commit();
    let c_item = store.state().item(c).unwrap();
    assert_eq!(c_item.parents.keys().copied().collect::<Vec<_>>(), vec![b]);
    assert!(store.state().item(a).unwrap().child_item_ids.is_empty());
    assert_eq!(store.state().item(b).unwrap().child_item_ids, vec![c]);
}
