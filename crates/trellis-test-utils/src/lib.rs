//! Testing utilities for the Trellis workspace
//!
//! Shared fixtures, document generators and tracing setup.

#![allow(missing_docs)]

use proptest::prelude::*;
use std::collections::BTreeSet;
use trellis_model::{
    CodePayload, DisplayMode, DocumentState, FormulaPayload, ImagePayload, ItemId, Payload, Store,
    WebPayload, Workspace, WorkspaceId, ROOT_ITEM_ID,
};

/// Fixed timestamp used by test stores
pub const TEST_TIME: i64 = 1_700_000_000_000;

pub fn fixed_clock() -> i64 {
    TEST_TIME
}

/// Install a `tracing` subscriber honouring `RUST_LOG`; safe to call from
/// every test
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Store over a fresh document with a fixed clock
pub fn new_store() -> Store {
    Store::new(DocumentState::fresh(TEST_TIME)).with_clock(fixed_clock)
}

/// Store whose root has one text child per entry of `texts`
pub fn store_with_texts(texts: &[&str]) -> (Store, Vec<ItemId>) {
    let mut store = new_store();
    let ids = texts
        .iter()
        .map(|text| {
            let id = store.create_item(Payload::text(*text));
            store.add_edge(ROOT_ITEM_ID, id, None).unwrap();
            id
        })
        .collect();
    store.commit();
    (store, ids)
}

/// Items of the transclusion fixture
#[derive(Debug, Clone, Copy)]
pub struct Transclusion {
    pub a: ItemId,
    pub b: ItemId,
    pub c: ItemId,
}

/// `a` and `b` under the root, `c` under both
///
/// ```text
/// root
/// ├── a  "hello"
/// │   └── c
/// └── b  "world"
///     └── c
/// ```
pub fn transclusion(c_text: &str) -> (Store, Transclusion) {
    let (mut store, ids) = store_with_texts(&["hello", "world"]);
    let (a, b) = (ids[0], ids[1]);
    let c = store.create_item(Payload::text(c_text));
    store.add_edge(a, c, None).unwrap();
    store.add_edge(b, c, None).unwrap();
    store.commit();
    (store, Transclusion { a, b, c })
}

/// One step of a generated document history
#[derive(Debug, Clone)]
pub enum DocOp {
    Create(Payload, usize),
    Link(usize, usize),
    Unlink(usize, usize),
    Collapse(usize, usize),
    Delete(usize),
    MakePage(usize),
    AddWorkspace(String),
    Exclude(usize),
    Label(usize, usize, String),
}

pub fn arb_payload() -> impl Strategy<Value = Payload> {
    let text = "[a-zA-Z ]{0,12}";
    prop_oneof![
        4 => text.prop_map(Payload::text),
        1 => (text, text, proptest::option::of(text)).prop_map(|(url, title, tab_title)| {
            Payload::Web(WebPayload { url, title, tab_title })
        }),
        1 => (text, text, proptest::option::of(1..2000u32)).prop_map(|(src, caption, width)| {
            Payload::Image(ImagePayload { src, caption, width, height: width })
        }),
        1 => (text, proptest::option::of("[a-z]{1,6}")).prop_map(|(code, language)| {
            Payload::Code(CodePayload { code, language })
        }),
        1 => text.prop_map(|source| Payload::Formula(FormulaPayload { source })),
    ]
}

pub fn arb_doc_op() -> impl Strategy<Value = DocOp> {
    prop_oneof![
        4 => (arb_payload(), 0..16usize).prop_map(|(p, i)| DocOp::Create(p, i)),
        2 => (0..16usize, 0..16usize).prop_map(|(p, c)| DocOp::Link(p, c)),
        1 => (0..16usize, 0..16usize).prop_map(|(p, c)| DocOp::Unlink(p, c)),
        1 => (0..16usize, 0..16usize).prop_map(|(p, c)| DocOp::Collapse(p, c)),
        1 => (0..16usize).prop_map(DocOp::Delete),
        1 => (0..16usize).prop_map(DocOp::MakePage),
        1 => "[a-z]{1,8}".prop_map(DocOp::AddWorkspace),
        1 => (0..16usize).prop_map(DocOp::Exclude),
        1 => (0..16usize, 0..16usize, "[a-z]{1,4}").prop_map(|(p, c, l)| DocOp::Label(p, c, l)),
    ]
}

fn pick(store: &Store, i: usize) -> ItemId {
    let ids: Vec<ItemId> = store.state().items().map(|item| item.id).collect();
    ids[i % ids.len()]
}

/// Apply one generated step as a command; rejected steps change nothing
pub fn apply_doc_op(store: &mut Store, op: &DocOp) {
    store.save_snapshot_for_undo();
    match op {
        DocOp::Create(payload, parent) => {
            let parent = pick(store, *parent);
            let id = store.create_item(payload.clone());
            store.add_edge(parent, id, None).unwrap();
        }
        DocOp::Link(p, c) => {
            let (p, c) = (pick(store, *p), pick(store, *c));
            let _ = store.add_edge(p, c, None);
        }
        DocOp::Unlink(p, c) => {
            let (p, c) = (pick(store, *p), pick(store, *c));
            let _ = store.remove_edge(p, c);
        }
        DocOp::Collapse(p, c) => {
            let (p, c) = (pick(store, *p), pick(store, *c));
            let _ = store.set_collapsed(p, c, true);
        }
        DocOp::Delete(i) => {
            let id = pick(store, *i);
            let _ = store.delete_item(id);
        }
        DocOp::MakePage(i) => {
            let id = pick(store, *i);
            store.make_page(id).unwrap();
            let _ = store.set_display_mode(id, DisplayMode::Document);
            store.mount_page(id, 20).unwrap();
        }
        DocOp::AddWorkspace(name) => {
            store.put_workspace(Workspace::new(WorkspaceId::generate(), name.clone()));
        }
        DocOp::Exclude(i) => {
            let id = pick(store, *i);
            let ws = store.state().workspaces().next().map(|w| w.id.clone());
            if let Some(ws) = ws {
                let _ = store.exclude_item(&ws, id);
            }
        }
        DocOp::Label(p, c, label) => {
            let (p, c) = (pick(store, *p), pick(store, *c));
            let _ = store.set_edge_labels(p, c, BTreeSet::from([label.clone()]));
        }
    }
    store.commit();
}

/// Store after a generated history
pub fn arb_store() -> impl Strategy<Value = Store> {
    proptest::collection::vec(arb_doc_op(), 0..30).prop_map(|ops| {
        let mut store = new_store();
        for op in &ops {
            apply_doc_op(&mut store, op);
        }
        store
    })
}

/// Document after a generated history
pub fn arb_document() -> impl Strategy<Value = DocumentState> {
    arb_store().prop_map(|store| store.state().clone())
}
