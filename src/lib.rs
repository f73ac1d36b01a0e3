//! # ordset
//!
//! A persistent (immutable) ordered set for Rust, backed by a red-black
//! tree with structural sharing.
//!
//! ## Overview
//!
//! [`OrderedSet`] is an immutable collection of unique, totally ordered
//! elements. Every mutating operation returns a new set and leaves the
//! original untouched, so any number of versions can coexist and be read
//! concurrently. Versions share all unmodified subtrees, which keeps
//! updates at O(log N) time and space:
//!
//! - O(log N) `insert`
//! - O(log N) `remove`
//! - O(log N) `contains`
//! - O(1) `len` and `is_empty`
//! - O(1) `clone`
//!
//! ```rust
//! use ordset::OrderedSet;
//!
//! let set = OrderedSet::new().insert(5).insert(3).insert(8);
//! let smaller = set.remove(&5);
//!
//! // The original version is unaffected
//! assert!(set.contains(&5));
//! assert!(!smaller.contains(&5));
//!
//! // Iteration is always in ascending order
//! let elements: Vec<&i32> = smaller.iter().collect();
//! assert_eq!(elements, vec![&3, &8]);
//! ```
//!
//! ## Ordering
//!
//! Elements are ordered by their [`Ord`] implementation. The implementation
//! must be a lawful total order; a comparison that is not transitive or not
//! antisymmetric produces an inconsistent set (a logic error, never memory
//! unsafety). To order elements differently, wrap them in a newtype with the
//! desired `Ord`.
//!
//! ## Feature Flags
//!
//! - `arc`: store nodes behind `Arc` instead of `Rc`, making the set `Send`
//!   and `Sync` so versions can be shared and derived across threads
//! - `serde`: `Serialize`/`Deserialize` support

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

// =============================================================================
// Reference Counter Type Alias
// =============================================================================

/// Reference-counted smart pointer used for tree nodes.
///
/// When the `arc` feature is enabled, this is `std::sync::Arc`,
/// which is thread-safe but has slightly higher overhead.
///
/// When the `arc` feature is disabled (default), this is `std::rc::Rc`,
/// which is faster but not thread-safe.
#[cfg(feature = "arc")]
pub(crate) type ReferenceCounter<T> = std::sync::Arc<T>;

#[cfg(not(feature = "arc"))]
pub(crate) type ReferenceCounter<T> = std::rc::Rc<T>;

mod set;

pub use set::OrderedSet;
pub use set::OrderedSetIntoIterator;
pub use set::OrderedSetIterator;

// =============================================================================
// Tests
// =============================================================================
