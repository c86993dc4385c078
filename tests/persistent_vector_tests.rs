//! Unit tests for PersistentVector.
//!
//! Most tests run on a narrow geometry (`B = 2, BL = 2`, fan-out 4) so that
//! even small vectors exercise several tree levels, with spot checks on the
//! default geometry.

use flexvec::PersistentVector;
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
// Construction and indexed reads
// =============================================================================

#[rstest]
fn test_empty_vector() {
    let vector = SmallVector::new();
    assert!(vector.is_empty());
    assert_eq!(vector.len(), 0);
    assert_eq!(vector.get(0), None);
    assert_eq!(vector.first(), None);
    assert_eq!(vector.last(), None);
}

#[rstest]
fn test_push_back_many() {
    let vector = counting(666);
    assert_eq!(vector.len(), 666);
    assert_eq!(vector.get(0), Some(&0));
    assert_eq!(vector.get(665), Some(&665));
    assert_eq!(vector.get(666), None);
    for index in 0..666 {
        assert_eq!(vector.get(index as usize), Some(&index), "index {index}");
    }
}

#[rstest]
fn test_push_back_default_geometry() {
    let mut vector = PersistentVector::<i32>::new();
    for value in 0..2500 {
        vector = vector.push_back(value);
    }
    assert_eq!(vector.len(), 2500);
    for index in 0..2500 {
        assert_eq!(vector.get(index as usize), Some(&index));
    }
}

#[rstest]
fn test_first_and_last() {
    let vector = counting(37);
    assert_eq!(vector.first(), Some(&0));
    assert_eq!(vector.last(), Some(&36));
}

// =============================================================================
// Update
// =============================================================================

#[rstest]
fn test_update_leaves_source_untouched() {
    let source = counting(666);
    let updated = source.update(3, 13).unwrap();

    assert_eq!(updated.get(3), Some(&13));
    assert_eq!(updated.get(2), Some(&2));
    assert_eq!(updated.get(4), Some(&4));
    assert_eq!(source.get(3), Some(&3));
}

#[rstest]
fn test_update_every_position() {
    let source = counting(80);
    let mut current = source.clone();
    for index in 0..80 {
        current = current.update(index, -(index as i32)).unwrap();
    }
    for index in 0..80 {
        assert_eq!(current.get(index), Some(&-(index as i32)));
        assert_eq!(source.get(index), Some(&(index as i32)));
    }
}

#[rstest]
fn test_update_out_of_range() {
    let vector = counting(10);
    assert!(vector.update(10, 0).is_none());
    assert!(vector.update(usize::MAX, 0).is_none());
}

#[rstest]
fn test_try_update_with_failure_leaves_source() {
    let vector = counting(20);
    let failed: Result<_, &str> = vector.try_update_with(7, |_| Err("rejected"));
    assert_eq!(failed, Err("rejected"));
    for index in 0..20 {
        assert_eq!(vector.get(index), Some(&(index as i32)));
    }
}

// =============================================================================
// Take / skip / slice
// =============================================================================

#[rstest]
fn test_take_and_skip_at_one_hundred() {
    let vector = counting(666);

    let front = vector.take(100);
    assert_eq!(front.len(), 100);
    assert_eq!(front.get(99), Some(&99));
    assert_eq!(front.get(100), None);

    let back = vector.skip(100);
    assert_eq!(back.len(), 566);
    assert_eq!(back.get(0), Some(&100));
    assert_eq!(back.get(565), Some(&665));

    assert_eq!(front.append(&back), vector);
}

#[rstest]
fn test_take_skip_all_boundaries() {
    let vector = counting(260);
    for boundary in 0..=260 {
        let front = vector.take(boundary);
        let back = vector.skip(boundary);
        assert_eq!(front.len(), boundary);
        assert_eq!(back.len(), 260 - boundary);
        if boundary > 0 {
            assert_eq!(front.get(boundary - 1), Some(&((boundary - 1) as i32)));
        }
        if boundary < 260 {
            assert_eq!(back.get(0), Some(&(boundary as i32)));
        }
        assert_eq!(front.append(&back), vector, "boundary {boundary}");
    }
}

#[rstest]
fn test_take_and_skip_clamp() {
    let vector = counting(10);
    assert_eq!(vector.take(100), vector);
    assert!(vector.skip(100).is_empty());
    assert_eq!(vector.take(10), vector);
    assert_eq!(vector.skip(0), vector);
    assert!(vector.take(0).is_empty());
    assert!(vector.skip(10).is_empty());
}

#[rstest]
fn test_repeated_skip_narrows_to_each_suffix() {
    let vector = counting(120);
    let mut rest = vector.clone();
    for start in 0..120 {
        assert_eq!(rest.len(), 120 - start);
        assert_eq!(rest.first(), Some(&(start as i32)));
        rest = rest.skip(1);
    }
    assert!(rest.is_empty());
}

#[rstest]
fn test_slice_windows() {
    let vector = counting(200);
    for start in [0, 1, 7, 64, 130] {
        for length in [0, 1, 5, 33, 70] {
            let sliced = vector.slice(start, start + length);
            let expected_length = length.min(200 - start);
            assert_eq!(sliced.len(), expected_length);
            for offset in 0..expected_length {
                assert_eq!(
                    sliced.get(offset),
                    Some(&((start + offset) as i32)),
                    "start {start} length {length} offset {offset}"
                );
            }
        }
    }
}

// =============================================================================
// Concatenation
// =============================================================================

#[rstest]
fn test_append_two_thousand() {
    let mut left = SmallVector::new();
    let mut right = SmallVector::new();
    for value in 0..1000 {
        left = left.push_back(value);
    }
    for value in 1000..2000 {
        right = right.push_back(value);
    }

    let combined = left.append(&right);
    assert_eq!(combined.len(), 2000);
    for index in 0..2000 {
        assert_eq!(combined.get(index as usize), Some(&index), "index {index}");
    }
}

#[rstest]
fn test_append_identity() {
    let vector = counting(53);
    let empty = SmallVector::new();
    assert_eq!(vector.append(&empty), vector);
    assert_eq!(empty.append(&vector), vector);
    assert!(empty.append(&empty).is_empty());
}

#[rstest]
fn test_append_is_associative() {
    let first = counting(37);
    let second: SmallVector = (100..190).collect();
    let third: SmallVector = (500..511).collect();

    let left_grouped = first.append(&second).append(&third);
    let right_grouped = first.append(&second.append(&third));
    assert_eq!(left_grouped, right_grouped);
}

#[rstest]
fn test_append_mixed_shapes() {
    // join vectors whose trees went through slicing, so relaxed nodes meet
    // regular ones on both sides
    let base = counting(300);
    let ragged_left = base.skip(13).take(120);
    let ragged_right = base.skip(150).take(97);
    let combined = ragged_left.append(&ragged_right);

    assert_eq!(combined.len(), 217);
    for index in 0..120 {
        assert_eq!(combined.get(index), Some(&((13 + index) as i32)));
    }
    for index in 0..97 {
        assert_eq!(combined.get(120 + index), Some(&((150 + index) as i32)));
    }
}

#[rstest]
fn test_repeated_self_append_growth() {
    let mut vector = counting(7);
    let mut expected_length = 7;
    for _ in 0..7 {
        vector = vector.append(&vector);
        expected_length *= 2;
        assert_eq!(vector.len(), expected_length);
    }
    for index in 0..vector.len() {
        assert_eq!(vector.get(index), Some(&((index % 7) as i32)));
    }
}

#[rstest]
fn test_push_front_builds_reversed() {
    let mut vector = SmallVector::new();
    for value in 0..150 {
        vector = vector.push_front(value);
    }
    assert_eq!(vector.len(), 150);
    for index in 0..150 {
        assert_eq!(vector.get(index), Some(&(149 - index as i32)));
    }
}

// =============================================================================
// Chunked traversal and iteration
// =============================================================================

#[rstest]
fn test_chunks_cover_the_vector_in_order() {
    let vector = counting(666);
    let mut collected = Vec::new();
    vector.for_each_chunk(|chunk| {
        assert!(!chunk.is_empty());
        assert!(chunk.len() <= 4);
        collected.extend_from_slice(chunk);
    });
    assert_eq!(collected, (0..666).collect::<Vec<_>>());
}

#[rstest]
fn test_chunks_after_slicing() {
    let vector = counting(666).skip(5).take(400);
    let mut collected = Vec::new();
    vector.for_each_chunk(|chunk| collected.extend_from_slice(chunk));
    assert_eq!(collected, (5..405).collect::<Vec<_>>());
}

#[rstest]
fn test_empty_vector_has_no_chunks() {
    let vector = SmallVector::new();
    let mut calls = 0;
    vector.for_each_chunk(|_| calls += 1);
    assert_eq!(calls, 0);
}

#[rstest]
fn test_iterators() {
    let vector = counting(300);
    let by_reference: Vec<i32> = vector.iter().copied().collect();
    let by_value: Vec<i32> = vector.clone().into_iter().collect();
    let expected: Vec<i32> = (0..300).collect();
    assert_eq!(by_reference, expected);
    assert_eq!(by_value, expected);
}

#[rstest]
fn test_collect_and_extend() {
    let collected: SmallVector = (0..100).collect();
    assert_eq!(collected.len(), 100);

    let mut extended = collected.clone();
    extended.extend(100..150);
    assert_eq!(extended.len(), 150);
    assert_eq!(extended.get(149), Some(&149));
    assert_eq!(collected.len(), 100);
}

// =============================================================================
// Persistence across derived versions
// =============================================================================

#[rstest]
fn test_derived_versions_share_but_do_not_interfere() {
    let base = counting(400);
    let with_push = base.push_back(400);
    let with_update = base.update(200, -1).unwrap();
    let front = base.take(123);
    let back = base.skip(123);

    for index in 0..400 {
        assert_eq!(base.get(index), Some(&(index as i32)));
    }
    assert_eq!(with_push.len(), 401);
    assert_eq!(with_update.get(200), Some(&-1));
    assert_eq!(front.len(), 123);
    assert_eq!(back.len(), 277);
}

#[rstest]
fn test_pop_back_walks_the_whole_vector() {
    let mut stack = Vec::new();
    let mut vector = counting(70);
    while let Some((rest, element)) = vector.pop_back() {
        stack.push(element);
        vector = rest;
    }
    assert!(vector.is_empty());
    assert_eq!(stack, (0..70).rev().collect::<Vec<_>>());
}
