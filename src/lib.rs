//! # flexvec
//!
//! Persistent vectors backed by relaxed radix-balanced trees (RRB-trees).
//!
//! ## Overview
//!
//! [`PersistentVector`] is an immutable sequence with structural sharing:
//! every operation returns a new vector and leaves the original untouched,
//! while the two versions share almost all of their storage. Unlike a plain
//! radix-balanced trie, the *relaxed* tree tolerates the imbalance that
//! concatenation introduces, so splitting and joining are logarithmic too:
//!
//! - O(log n) indexed read and update
//! - O(log n) amortised O(1) `push_back` (tail buffer)
//! - O(log n) `take` / `skip` / `slice`
//! - O(log n) `append` and `push_front`
//!
//! [`TransientVector`] is the ephemerally mutable companion: it performs the
//! same operations with in-place mutation whenever it provably owns a node,
//! and converts to and from the persistent form in O(1). Use it for batch
//! construction and bulk edits.
//!
//! ## Feature Flags
//!
//! - `arc`: share structure through `Arc` instead of `Rc`, allowing
//!   persistent vectors to be sent across threads.
//!
//! ## Example
//!
//! ```rust
//! use flexvec::PersistentVector;
//!
//! let vector: PersistentVector<i32> = (0..1000).collect();
//! let updated = vector.update(500, -1).unwrap();
//!
//! assert_eq!(vector.get(500), Some(&500));   // original unchanged
//! assert_eq!(updated.get(500), Some(&-1));
//!
//! let front = vector.take(600);
//! let back = vector.skip(600);
//! assert_eq!(front.append(&back), vector);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// The tree code indexes child slices whose bounds are structural invariants;
// spelling each access as a checked one would bury the algorithm.
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::module_name_repetitions)]

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer used for structural sharing.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`, which is
/// thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

mod node;
mod operations;
mod position;
mod transient;
mod tree;
mod vector;

pub use transient::TransientVector;
pub use vector::PersistentVector;
pub use vector::PersistentVectorIntoIterator;
pub use vector::PersistentVectorIterator;
