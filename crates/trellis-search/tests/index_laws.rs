//! Search index laws over generated documents
//!
//! Tenet: the incrementally maintained index always equals a fresh build,
//! every substring of visible text finds its item, and a query holding a
//! character no item contains finds nothing.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::BTreeSet;
use trellis_search::{affected_items, SearchIndex};
use trellis_test_utils::{apply_doc_op, arb_doc_op, arb_store, new_store};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn incremental_matches_rebuild(ops in proptest::collection::vec(arb_doc_op(), 0..30)) {
        let mut store = new_store();
        let mut index = SearchIndex::build(store.state());
        for op in &ops {
            apply_doc_op(&mut store, op);
            let pending = store.take_pending();
            match affected_items(&pending) {
                Some(ids) => {
                    for id in ids {
                        index.reindex_item(store.state(), id);
                    }
                }
                None => index = SearchIndex::build(store.state()),
            }
            prop_assert_eq!(&index, &SearchIndex::build(store.state()));
        }
    }

    #[test]
    fn undo_then_reindex_matches_rebuild(ops in proptest::collection::vec(arb_doc_op(), 1..20)) {
        let mut store = new_store();
        for op in &ops {
            apply_doc_op(&mut store, op);
        }
        let mut index = SearchIndex::build(store.state());
        while let Some(touched) = store.undo() {
            for id in affected_items(&touched).unwrap_or_default() {
                index.reindex_item(store.state(), id);
            }
            prop_assert_eq!(&index, &SearchIndex::build(store.state()));
        }
    }

    #[test]
    fn substring_of_text_finds_item(store in arb_store(), pick in any::<prop::sample::Index>(), start in 0..12usize, len in 1..6usize) {
        let state = store.state();
        let texts: Vec<(trellis_model::ItemId, String)> = state
            .items()
            .flat_map(|item| state.text_tracks(item.id).into_iter().map(move |t| (item.id, t)))
            .filter(|(_, t)| !t.trim().is_empty())
            .collect();
        prop_assume!(!texts.is_empty());

        let (id, text) = pick.get(&texts);
        let chars: Vec<char> = text.chars().collect();
        let start = start % chars.len();
        let end = (start + len).min(chars.len());
        let query: String = chars[start..end].iter().collect();
        prop_assume!(!query.trim().is_empty());

        let index = SearchIndex::build(state);
        let hits = index.search(state, &query, &BTreeSet::new(), None);
        prop_assert!(hits.contains(id), "{query:?} did not find {id} ({text:?})");
        for hit in &hits {
            let lowered = query.to_lowercase();
            prop_assert!(state.text_tracks(*hit).iter().any(|t| t.to_lowercase().contains(&lowered)));
        }
    }

    #[test]
    fn unknown_char_in_query_finds_nothing(
        store in arb_store(),
        prefix in "[a-zA-Z ]{0,4}",
        suffix in "[a-zA-Z ]{0,4}",
        stray in prop::sample::select(vec!['7', '#', 'ж', '€', '漢']),
    ) {
        let state = store.state();
        let known: BTreeSet<char> = state
            .items()
            .flat_map(|item| state.text_tracks(item.id))
            .flat_map(|t| t.to_lowercase().chars().collect::<Vec<_>>())
            .collect();
        prop_assume!(!known.contains(&stray));

        let query = format!("{prefix}{stray}{suffix}");
        let hits = SearchIndex::build(state).search(state, &query, &BTreeSet::new(), None);
        prop_assert!(hits.is_empty(), "{query:?} found {hits:?}");
    }

    #[test]
    fn results_are_ordered_newest_first(store in arb_store(), query in "[a-z]{1,2}") {
        let state = store.state();
        let hits = SearchIndex::build(state).search(state, &query, &BTreeSet::new(), None);
        let stamps: Vec<(i64, u64)> = hits
            .iter()
            .map(|id| (-state.item(*id).unwrap().timestamp, id.0))
            .collect();
        let mut sorted = stamps.clone();
        sorted.sort_unstable();
        assert_eq!(stamps, sorted);
    }
}
