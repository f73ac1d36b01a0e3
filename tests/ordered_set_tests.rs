//! Integration tests for `OrderedSet`.
//!
//! These tests exercise the public API the way a consumer would: building
//! versions, reading old versions after updates, and combining sets.

use ordset::{OrderedSet, ordered_set};
use rstest::rstest;

// =============================================================================
// Basic Operations
// =============================================================================

#[rstest]
fn test_new_set_is_empty() {
    let set: OrderedSet<i32> = OrderedSet::new();
    assert!(set.is_empty());
    assert_eq!(set.len(), 0);
    assert_eq!(set.iter().next(), None);
}

#[rstest]
fn test_insert_then_contains() {
    let set = OrderedSet::new().insert(10).insert(20).insert(30);

    assert_eq!(set.len(), 3);
    assert!(set.contains(&10));
    assert!(set.contains(&20));
    assert!(set.contains(&30));
    assert!(!set.contains(&25));
}

#[rstest]
fn test_remove_then_contains() {
    let set = OrderedSet::new().insert(10).insert(20).insert(30);
    let set = set.remove(&20);

    assert_eq!(set.len(), 2);
    assert!(set.contains(&10));
    assert!(!set.contains(&20));
    assert!(set.contains(&30));
}

#[rstest]
fn test_contains_with_borrowed_form() {
    let set = OrderedSet::new()
        .insert("apple".to_string())
        .insert("banana".to_string());

    // Search and remove using &str without allocating a String
    assert!(set.contains("apple"));
    assert!(!set.contains("cherry"));

    let set = set.remove("apple");
    assert!(!set.contains("apple"));
    assert!(set.contains("banana"));
}

// =============================================================================
// Versioning
// =============================================================================

#[rstest]
fn test_older_versions_observe_their_own_content() {
    let base = OrderedSet::new().insert(5).insert(3).insert(8).insert(1);

    let elements: Vec<&i32> = base.iter().collect();
    assert_eq!(elements, vec![&1, &3, &5, &8]);
    assert!(base.contains(&3));
    assert!(!base.contains(&4));

    let without_five = base.remove(&5);
    let remaining: Vec<&i32> = without_five.iter().collect();
    assert_eq!(remaining, vec![&1, &3, &8]);

    // The version taken before the removal still sees every element
    let unchanged: Vec<&i32> = base.iter().collect();
    assert_eq!(unchanged, vec![&1, &3, &5, &8]);
}

#[rstest]
fn test_every_intermediate_version_stays_valid() {
    let mut versions = vec![OrderedSet::new()];
    for i in 0..32 {
        let next = versions.last().unwrap().insert(i);
        versions.push(next);
    }

    for (expected_len, version) in versions.iter().enumerate() {
        assert_eq!(version.len(), expected_len);
        for i in 0..32 {
            assert_eq!(version.contains(&i), i < expected_len as i32);
        }
    }
}

#[rstest]
fn test_two_writers_from_one_base_produce_independent_versions() {
    let base: OrderedSet<i32> = (0..8).collect();

    let with_extra = base.insert(100);
    let with_less = base.remove(&0);

    assert!(with_extra.contains(&100));
    assert!(!with_extra.contains(&101));
    assert!(with_extra.contains(&0));

    assert!(!with_less.contains(&0));
    assert!(!with_less.contains(&100));

    assert_eq!(base.len(), 8);
    assert!(base.contains(&0));
    assert!(!base.contains(&100));
}

#[rstest]
fn test_reinsert_after_remove() {
    let set = OrderedSet::new().insert(1).insert(2);
    let set = set.remove(&1);
    assert!(!set.contains(&1));

    let set = set.insert(1);
    assert!(set.contains(&1));
    assert_eq!(set.len(), 2);
}

// =============================================================================
// Ordering and Iteration
// =============================================================================

#[rstest]
fn test_iteration_is_sorted_regardless_of_insertion_order() {
    let set: OrderedSet<i32> = [42, 7, 19, 3, 23, 11].into_iter().collect();
    let elements: Vec<i32> = set.iter().copied().collect();
    assert_eq!(elements, vec![3, 7, 11, 19, 23, 42]);
}

#[rstest]
fn test_concurrent_iterations_do_not_interfere() {
    let set: OrderedSet<i32> = (0..16).collect();

    let mut first = set.iter();
    let mut second = set.iter();

    assert_eq!(first.next(), Some(&0));
    assert_eq!(first.next(), Some(&1));
    assert_eq!(second.next(), Some(&0));
    assert_eq!(first.next(), Some(&2));
    assert_eq!(second.next(), Some(&1));
}

#[rstest]
fn test_min_and_max() {
    let set: OrderedSet<i32> = [42, 7, 19, 3].into_iter().collect();
    assert_eq!(set.min(), Some(&3));
    assert_eq!(set.max(), Some(&42));

    let empty: OrderedSet<i32> = OrderedSet::new();
    assert_eq!(empty.min(), None);
    assert_eq!(empty.max(), None);
}

#[rstest]
fn test_for_loop_over_reference() {
    let set = ordered_set![2, 1, 3];
    let mut sum = 0;
    for element in &set {
        sum += element;
    }
    assert_eq!(sum, 6);
}

#[rstest]
fn test_owned_iteration_moves_elements() {
    let set: OrderedSet<String> = ["b", "a"].into_iter().map(String::from).collect();
    let owned: Vec<String> = set.into_iter().collect();
    assert_eq!(owned, vec!["a".to_string(), "b".to_string()]);
}

// =============================================================================
// Idempotence
// =============================================================================

#[rstest]
fn test_double_insert_equals_single_insert() {
    let once = OrderedSet::new().insert(5);
    let twice = once.insert(5);
    assert_eq!(once, twice);
}

#[rstest]
fn test_remove_absent_equals_original() {
    let set = ordered_set![1, 2, 3];
    let same = set.remove(&99);
    assert_eq!(set, same);
}

// =============================================================================
// Set Algebra
// =============================================================================

#[rstest]
fn test_union_intersection_difference_relate() {
    let left = ordered_set![1, 2, 3, 4];
    let right = ordered_set![3, 4, 5, 6];

    let union = left.union(&right);
    let intersection = left.intersection(&right);
    let left_only = left.difference(&right);
    let right_only = right.difference(&left);

    assert_eq!(union, ordered_set![1, 2, 3, 4, 5, 6]);
    assert_eq!(intersection, ordered_set![3, 4]);
    assert_eq!(left_only, ordered_set![1, 2]);
    assert_eq!(right_only, ordered_set![5, 6]);

    // Union splits into the two differences plus the intersection
    assert_eq!(
        union.len(),
        left_only.len() + right_only.len() + intersection.len()
    );
    assert!(intersection.is_subset(&union));
    assert!(left_only.is_disjoint(&right_only));
}

#[rstest]
fn test_set_algebra_leaves_operands_untouched() {
    let left = ordered_set![1, 2];
    let right = ordered_set![2, 3];

    let _ = left.union(&right);
    let _ = left.intersection(&right);
    let _ = left.difference(&right);

    assert_eq!(left, ordered_set![1, 2]);
    assert_eq!(right, ordered_set![2, 3]);
}

// =============================================================================
// Larger Workloads
// =============================================================================

#[rstest]
fn test_grow_and_shrink_round_trip() {
    let mut set = OrderedSet::new();
    for i in 0..500 {
        set = set.insert(i);
    }
    assert_eq!(set.len(), 500);
    assert_eq!(set.min(), Some(&0));
    assert_eq!(set.max(), Some(&499));

    for i in (0..500).step_by(2) {
        set = set.remove(&i);
    }
    assert_eq!(set.len(), 250);
    assert!(set.iter().all(|element| element % 2 == 1));

    for i in (1..500).step_by(2) {
        set = set.remove(&i);
    }
    assert!(set.is_empty());
}

#[rstest]
fn test_height_bound_holds_for_adversarial_orders() {
    for count in [64_usize, 256, 512] {
        let ascending: OrderedSet<usize> = (0..count).collect();
        let descending: OrderedSet<usize> = (0..count).rev().collect();

        let bound = 2 * (usize::BITS - (count + 1).leading_zeros()) as usize;
        assert!(ascending.height() <= bound);
        assert!(descending.height() <= bound);
    }
}
