use proptest::prelude::*;
use trellis_path::{Address, ItemId, ItemPath, Segment};

fn item_path() -> impl Strategy<Value = ItemPath> {
    proptest::collection::vec(0..50u64, 1..8)
        .prop_map(|ids| ItemPath::new(ids.into_iter().map(ItemId).collect()).unwrap())
}

fn segment() -> impl Strategy<Value = Segment> {
    prop_oneof![
        "[a-zA-Z0-9_-]{1,10}".prop_map(Segment::Key),
        (0..100usize).prop_map(Segment::Index),
    ]
}

proptest! {
    #[test]
    fn prop_common_prefix_with_self_is_identity(p in item_path()) {
        prop_assert_eq!(p.common_prefix(&p), Some(p.clone()));
    }

    #[test]
    fn prop_common_prefix_is_symmetric(p in item_path(), q in item_path()) {
        prop_assert_eq!(p.common_prefix(&q), q.common_prefix(&p));
    }

    #[test]
    fn prop_common_prefix_empty_for_different_roots(p in item_path(), q in item_path()) {
        prop_assume!(p.root() != q.root());
        prop_assert_eq!(p.common_prefix(&q), None);
    }

    #[test]
    fn prop_common_prefix_is_prefix_of_both(p in item_path(), q in item_path()) {
        if let Some(common) = p.common_prefix(&q) {
            prop_assert!(common.is_prefix_of(&p));
            prop_assert!(common.is_prefix_of(&q));
        }
    }

    #[test]
    fn prop_item_path_string_round_trip(p in item_path()) {
        let parsed: ItemPath = p.to_string().parse().unwrap();
        prop_assert_eq!(parsed, p);
    }

    #[test]
    fn prop_address_string_round_trip(
        field in "[a-zA-Z]{1,12}",
        rest in proptest::collection::vec(segment(), 0..5)
    ) {
        let addr = Address::field(field).extend(rest);
        let parsed: Address = addr.to_string().parse().unwrap();
        prop_assert_eq!(parsed, addr);
    }
}
