//! Unit tests for TransientVector: the mutating mirrors, copy-on-write
//! isolation from persistent versions, and the O(1) conversions.

use flexvec::{PersistentVector, TransientVector};
use rstest::rstest;

type SmallVector = PersistentVector<i32, 2, 2>;

fn counting(count: i32) -> SmallVector {
    let mut vector = SmallVector::new();
    for value in 0..count {
        vector = vector.push_back(value);
    }
    vector
}

// =============================================================================
// Round trips
// =============================================================================

#[rstest]
fn test_push_back_round_trip_matches_persistent() {
    let source = counting(666);

    let mut transient = source.transient();
    transient.push_back(666);
    transient.push_back(667);
    let from_transient = transient.persistent();

    let from_persistent = source.push_back(666).push_back(667);
    assert_eq!(from_transient, from_persistent);
    assert_eq!(source.len(), 666);
}

#[rstest]
fn test_build_from_scratch() {
    let mut transient: TransientVector<i32, 2, 2> = TransientVector::new();
    for value in 0..1000 {
        transient.push_back(value);
    }
    assert_eq!(transient.len(), 1000);
    assert_eq!(transient.get(0), Some(&0));
    assert_eq!(transient.get(999), Some(&999));
    assert_eq!(transient.get(1000), None);

    let vector = transient.persistent();
    for index in 0..1000 {
        assert_eq!(vector.get(index), Some(&(index as i32)));
    }
}

#[rstest]
fn test_conversion_is_repeatable() {
    let source = counting(100);
    let first = source.transient().persistent();
    let second = source.transient().persistent();
    assert_eq!(first, source);
    assert_eq!(second, source);
}

// =============================================================================
// Copy-on-write isolation
// =============================================================================

#[rstest]
fn test_mutation_does_not_leak_into_source() {
    let source = counting(500);
    let mut transient = source.transient();

    for index in 0..500 {
        transient.update(index, -1);
    }
    transient.push_back(-1);
    let mutated = transient.persistent();

    for index in 0..500 {
        assert_eq!(source.get(index), Some(&(index as i32)), "index {index}");
        assert_eq!(mutated.get(index), Some(&-1));
    }
    assert_eq!(mutated.len(), 501);
}

#[rstest]
fn test_two_sessions_in_sequence() {
    // nodes stamped by a finished session must not be mutable by the next
    let mut first = TransientVector::<i32, 2, 2>::new();
    for value in 0..40 {
        first.push_back(value);
    }
    let committed = first.persistent();

    let mut second = committed.transient();
    second.update(0, -1);
    let modified = second.persistent();

    assert_eq!(committed.get(0), Some(&0));
    assert_eq!(modified.get(0), Some(&-1));
}

#[rstest]
fn test_sibling_transients_from_one_source() {
    let source = counting(64);
    let mut left = source.transient();
    let mut right = source.transient();
    left.update(10, -1);
    right.update(10, -2);
    assert_eq!(left.persistent().get(10), Some(&-1));
    assert_eq!(right.persistent().get(10), Some(&-2));
    assert_eq!(source.get(10), Some(&10));
}

// =============================================================================
// Mutating mirrors
// =============================================================================

#[rstest]
fn test_update_with_and_fallible_update() {
    let mut transient = counting(30).transient();
    assert!(transient.update_with(3, |value| value * 100));
    assert!(!transient.update_with(30, |value| *value));

    let failed: Result<bool, &str> = transient.try_update_with(4, |_| Err("busy"));
    assert_eq!(failed, Err("busy"));
    let skipped: Result<bool, &str> = transient.try_update_with(99, |_| Err("busy"));
    assert_eq!(skipped, Ok(false));

    let vector = transient.persistent();
    assert_eq!(vector.get(3), Some(&300));
    assert_eq!(vector.get(4), Some(&4));
}

#[rstest]
fn test_take_mirrors_persistent() {
    for boundary in [1, 3, 4, 5, 16, 17, 100, 259, 260] {
        let source = counting(260);
        let expected = source.take(boundary);
        let mut transient = source.transient();
        transient.take(boundary);
        assert_eq!(transient.persistent(), expected, "boundary {boundary}");
    }
}

#[rstest]
fn test_skip_mirrors_persistent() {
    for boundary in [1, 3, 4, 5, 16, 17, 100, 259, 260] {
        let source = counting(260);
        let expected = source.skip(boundary);
        let mut transient = source.transient();
        transient.skip(boundary);
        assert_eq!(transient.persistent(), expected, "boundary {boundary}");
    }
}

#[rstest]
fn test_push_front_mirrors_persistent() {
    let source = counting(130);
    let expected = source.push_front(-1).push_front(-2);

    let mut transient = source.transient();
    transient.push_front(-1);
    transient.push_front(-2);
    assert_eq!(transient.persistent(), expected);
    assert_eq!(source.get(0), Some(&0));
}

#[rstest]
fn test_append_mirrors_persistent() {
    let left = counting(123);
    let right: SmallVector = (1000..1456).collect();
    let expected = left.append(&right);

    let mut transient = left.transient();
    transient.append(&right);
    assert_eq!(transient.persistent(), expected);
}

#[rstest]
fn test_interleaved_operations() {
    let mut transient: TransientVector<i32, 2, 2> = TransientVector::new();
    for value in 0..100 {
        transient.push_back(value);
    }
    transient.skip(10);
    for value in 100..120 {
        transient.push_back(value);
    }
    transient.take(90);
    transient.update(0, -10);

    let vector = transient.persistent();
    assert_eq!(vector.len(), 90);
    assert_eq!(vector.get(0), Some(&-10));
    assert_eq!(vector.get(1), Some(&11));
    assert_eq!(vector.get(89), Some(&99));
}

#[rstest]
fn test_take_to_zero_and_rebuild() {
    let mut transient = counting(50).transient();
    transient.take(0);
    assert!(transient.is_empty());
    for value in 0..20 {
        transient.push_back(value);
    }
    let vector = transient.persistent();
    assert_eq!(vector.len(), 20);
    assert_eq!(vector.get(19), Some(&19));
}
