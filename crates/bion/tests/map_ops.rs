//! Ordering, duplicate and ownership properties of the map layer and the
//! generic sort/search primitives it is built on.

use proptest::prelude::*;
use rand::seq::SliceRandom;

use bion::node::Node;
use bion::sort::{self, SliceAccess, SliceRead};
use bion::{Error, OrderedMap};

fn backing_keys(map: &OrderedMap<i64, i64>) -> Vec<i64> {
    map.as_node()
        .child(0)
        .and_then(|keys| keys.scalars::<i64>().ok())
        .map(<[i64]>::to_vec)
        .unwrap_or_default()
}

#[test]
fn unique_insert_rejects_duplicates_and_stays_ordered() {
    let mut map = OrderedMap::<i64, i64>::new();
    map.insert(123, 0).unwrap();
    map.insert(10, 1).unwrap();
    map.insert(5, 2).unwrap();
    assert_eq!(map.insert(10, 3), Err(Error::DuplicateKey));

    assert_eq!(backing_keys(&map), vec![5, 10, 123]);
    assert_eq!(map.get(&10), Some(1));
}

#[test]
fn duplicate_allowed_insert_is_adjacent_and_stable() {
    let mut map = OrderedMap::<i64, i64>::new();
    map.insert_dup(10, 1).unwrap();
    map.insert_dup(5, 0).unwrap();
    map.insert_dup(10, 2).unwrap();

    assert_eq!(backing_keys(&map), vec![5, 10, 10]);
    // the second 10 landed after the first
    assert_eq!(map.value_at(1), Ok(1));
    assert_eq!(map.value_at(2), Ok(2));
}

#[test]
fn quicksort_yields_an_ordered_permutation() {
    let mut rng = rand::thread_rng();
    let mut items: Vec<i64> = (0..200).map(|i| i % 37).collect();
    items.shuffle(&mut rng);
    let mut expected = items.clone();
    expected.sort_unstable();

    sort::sort(&mut SliceAccess { items: &mut items });
    assert_eq!(items, expected);
}

#[test]
fn binary_search_after_sort_finds_every_residue() {
    let mut rng = rand::thread_rng();
    let mut items: Vec<i64> = (0..100).map(|i| i % 10).collect();
    items.shuffle(&mut rng);
    sort::sort(&mut SliceAccess { items: &mut items });

    let access = SliceRead { items: &items };
    for residue in 0..10i64 {
        let (found, pos) = sort::binary_search(&access, &residue, 0, items.len());
        assert!(found, "residue {residue} must be found");
        assert_eq!(items[pos], residue);
    }
    let (found, pos) = sort::binary_search(&access, &10, 0, items.len());
    assert!(!found);
    assert_eq!(pos, items.len());
}

#[test]
fn bulk_append_needs_an_explicit_sort() {
    let mut rng = rand::thread_rng();
    let mut keys: Vec<i32> = (0..64).collect();
    keys.shuffle(&mut rng);

    let mut map = OrderedMap::<i32, i32>::new();
    for &key in &keys {
        map.push_back(key, key * 2).unwrap();
    }
    map.sort().unwrap();

    for &key in &keys {
        assert_eq!(map.get(&key), Some(key * 2), "key {key} after bulk sort");
    }
    let node_keys: Vec<i32> = map.as_node().child(0).unwrap().scalars::<i32>().unwrap().to_vec();
    let mut expected: Vec<i32> = (0..64).collect();
    expected.sort_unstable();
    assert_eq!(node_keys, expected);
}

#[test]
fn erase_keeps_both_stores_aligned() {
    let mut map = OrderedMap::<u32, String>::new();
    for key in [4u32, 1, 3, 2] {
        map.insert(key, format!("v{key}")).unwrap();
    }
    assert_eq!(map.erase(&3), Ok(true));
    assert_eq!(map.erase(&3), Ok(false));

    assert_eq!(map.len(), 3);
    for (offset, key) in [1u32, 2, 4].into_iter().enumerate() {
        assert_eq!(map.key_at(offset), Ok(key));
        assert_eq!(map.value_at(offset), Ok(format!("v{key}")));
    }
}

#[test]
fn string_keyed_map_forbids_duplicates_and_keeps_insertion_order() {
    let mut map = OrderedMap::<String, Node>::new();
    map.insert("zed".into(), Node::from(1i32)).unwrap();
    map.insert("ada".into(), Node::from(2i32)).unwrap();
    assert_eq!(
        map.insert("zed".into(), Node::Null),
        Err(Error::DuplicateKey)
    );

    assert_eq!(map.key_at(0), Ok("zed".to_string()));
    assert_eq!(map.lower_bound(&"ada".to_string()), 1);
    assert_eq!(map.upper_bound(&"ada".to_string()), 2);
    assert_eq!(map.lower_bound(&"missing".to_string()), map.len());

    assert_eq!(map.erase(&"zed".to_string()), Ok(true));
    assert_eq!(map.len(), 1);
    assert_eq!(map.get(&"zed".to_string()), None);
}

#[test]
fn traversals_and_transform_stay_in_lock_step() {
    let mut map = OrderedMap::<i64, i64>::new();
    for key in [7, 3, 5] {
        map.insert(key, key * 100).unwrap();
    }

    let pairs = map
        .accumulate(Vec::new(), |mut acc, k, v| {
            acc.push((*k, *v));
            acc
        })
        .unwrap();
    assert_eq!(pairs, vec![(3, 300), (5, 500), (7, 700)]);

    map.transform(|_, v| v + 1).unwrap();
    let mut sum = 0;
    map.for_each(|_, v| sum += v).unwrap();
    assert_eq!(sum, 1503);
}

proptest! {
    /// Any interleaving of unique inserts and erases leaves the backing
    /// key array strictly ascending.
    #[test]
    fn ordering_invariant_holds(
        inserts in prop::collection::vec(-50i64..50, 1..40),
        erases in prop::collection::vec(-50i64..50, 0..20),
    ) {
        let mut map = OrderedMap::<i64, i64>::new();
        for (offset, key) in inserts.iter().enumerate() {
            match map.insert(*key, offset as i64) {
                Ok(()) | Err(Error::DuplicateKey) => {}
                Err(other) => prop_assert!(false, "unexpected insert error: {other}"),
            }
        }
        for key in &erases {
            map.erase(key).unwrap();
        }

        let keys = backing_keys(&map);
        for pair in keys.windows(2) {
            prop_assert!(pair[0] < pair[1], "keys must stay strictly ascending");
        }
        for key in inserts {
            let expect = !erases.contains(&key);
            prop_assert_eq!(map.find(&key).is_some(), expect);
        }
    }

    /// Sorting via the positional contract agrees with the standard
    /// library on any input.
    #[test]
    fn quicksort_matches_std_sort(mut items in prop::collection::vec(any::<i64>(), 0..64)) {
        let mut expected = items.clone();
        expected.sort_unstable();
        sort::sort(&mut SliceAccess { items: &mut items });
        prop_assert_eq!(items, expected);
    }
}
