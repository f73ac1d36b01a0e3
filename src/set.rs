//! Persistent (immutable) ordered set based on a red-black tree.
//!
//! This module provides [`OrderedSet`], an immutable set of unique elements
//! that uses structural sharing for efficient versioned updates.
//!
//! # Overview
//!
//! `OrderedSet` is based on a persistent red-black tree, a self-balancing
//! binary search tree. Every update rebuilds only the nodes on the path from
//! the root to the touched position and shares every other subtree with the
//! previous version, so old versions stay valid and cheap to keep around.
//!
//! - O(log N) `contains`
//! - O(log N) `insert`
//! - O(log N) `remove`
//! - O(log N) `min`/`max`
//! - O(1) `len` and `is_empty`
//! - O(1) `clone`
//!
//! # Examples
//!
//! ```rust
//! use ordset::OrderedSet;
//!
//! let set = OrderedSet::new()
//!     .insert(3)
//!     .insert(1)
//!     .insert(2);
//!
//! // Elements are always iterated in ascending order
//! let elements: Vec<&i32> = set.iter().collect();
//! assert_eq!(elements, vec![&1, &2, &3]);
//!
//! // Updates never touch existing versions
//! let without_two = set.remove(&2);
//! assert!(set.contains(&2));
//! assert!(!without_two.contains(&2));
//! ```
//!
//! # Internal Structure
//!
//! The red-black tree maintains the following invariants:
//! 1. Every node is either red or black
//! 2. The root is black
//! 3. Absent subtrees count as black
//! 4. Red nodes have only black children
//! 5. Every path from the root to an absent subtree has the same number of
//!    black nodes
//!
//! These invariants bound the tree height by `2 * log2(N + 1)`, so every
//! path-bound operation is O(log N) in the worst case. All nodes are
//! immutable once constructed; rebalancing allocates replacement nodes
//! instead of mutating, which is what makes concurrent readers of older
//! versions safe.

use crate::ReferenceCounter;
use smallvec::SmallVec;
use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Inline capacity of the iterator's descent stack.
///
/// The stack holds at most one node per tree level. With the height bound of
/// `2 * log2(N + 1)`, a capacity of 16 keeps iteration allocation-free for
/// trees of up to a few hundred elements.
const DESCENT_STACK_CAPACITY: usize = 16;

/// Creates an [`OrderedSet`] containing the given elements:
///
/// ```
/// use ordset::{ordered_set, OrderedSet};
///
/// let set = OrderedSet::new().insert(1).insert(2).insert(3);
///
/// assert_eq!(ordered_set![3, 1, 2], set);
/// ```
#[macro_export]
macro_rules! ordered_set {
    ($($element:expr),* $(,)?) => {
        {
            #[allow(unused_mut)]
            let mut set = $crate::OrderedSet::new();
            $(
                set = set.insert($element);
            )*
            set
        }
    };
}

// =============================================================================
// Color Definition
// =============================================================================

/// The color of a red-black tree node.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Color {
    Red,
    Black,
}

// =============================================================================
// Node Definition
// =============================================================================

/// Internal node structure for the red-black tree.
#[derive(Clone)]
struct Node<T> {
    value: T,
    color: Color,
    left: Option<ReferenceCounter<Self>>,
    right: Option<ReferenceCounter<Self>>,
}

impl<T> Node<T> {
    /// Creates a new red node with no children.
    const fn new_red(value: T) -> Self {
        Self {
            value,
            color: Color::Red,
            left: None,
            right: None,
        }
    }

    /// Creates a copy of this node with a new color.
    fn with_color(&self, color: Color) -> Self
    where
        T: Clone,
    {
        Self {
            value: self.value.clone(),
            color,
            left: self.left.clone(),
            right: self.right.clone(),
        }
    }

    /// Checks if this node is red.
    fn is_red(&self) -> bool {
        self.color == Color::Red
    }
}

/// Helper function to check if an optional node is red.
fn is_red<T>(node: Option<&ReferenceCounter<Node<T>>>) -> bool {
    node.is_some_and(|node| node.is_red())
}

// =============================================================================
// OrderedSet Definition
// =============================================================================

/// A persistent (immutable) ordered set based on a red-black tree.
///
/// `OrderedSet` stores unique elements sorted by their `Ord` implementation.
/// All operations are immutable: they return a new set and never modify the
/// receiver, so previously obtained versions remain valid. Versions share
/// every subtree that an update did not touch.
///
/// Because versions are immutable, any number of readers may traverse the
/// same version concurrently without synchronization. With the `arc` feature
/// the set is also `Send` and `Sync`, so versions can be shared across
/// threads and new versions derived from them in parallel; two writers that
/// derive from the same version simply produce two independent successors.
///
/// # Time Complexity
///
/// | Operation      | Complexity        |
/// |----------------|-------------------|
/// | `new`          | O(1)              |
/// | `contains`     | O(log N)          |
/// | `insert`       | O(log N)          |
/// | `remove`       | O(log N)          |
/// | `min`/`max`    | O(log N)          |
/// | `len`          | O(1)              |
/// | `is_empty`     | O(1)              |
/// | `clone`        | O(1)              |
///
/// The element count is maintained incrementally, which is why `len` is
/// O(1).
///
/// # Ordering precondition
///
/// The element type's `Ord` must be a lawful total order. The set does not
/// attempt to detect an unlawful ordering at runtime; using one produces an
/// inconsistent set (a logic error, never memory unsafety).
///
/// # Examples
///
/// ```rust
/// use ordset::OrderedSet;
///
/// let set = OrderedSet::singleton(42);
/// assert!(set.contains(&42));
///
/// let versions: Vec<OrderedSet<i32>> = (0..4)
///     .scan(OrderedSet::new(), |current, i| {
///         *current = current.insert(i);
///         Some(current.clone())
///     })
///     .collect();
///
/// // Every intermediate version is still observable
/// for (i, version) in versions.iter().enumerate() {
///     assert_eq!(version.len(), i + 1);
/// }
/// ```
#[derive(Clone)]
pub struct OrderedSet<T> {
    /// Root node of the tree
    root: Option<ReferenceCounter<Node<T>>>,
    /// Number of elements
    length: usize,
}

impl<T> OrderedSet<T> {
    /// Creates a new empty set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordset::OrderedSet;
    ///
    /// let set: OrderedSet<i32> = OrderedSet::new();
    /// assert!(set.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root: None,
            length: 0,
        }
    }

    /// Returns the number of elements in the set.
    ///
    /// # Complexity
    ///
    /// O(1)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordset::OrderedSet;
    ///
    /// let set = OrderedSet::new().insert(1).insert(2);
    /// assert_eq!(set.len(), 2);
    /// ```
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the set contains no elements.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordset::OrderedSet;
    ///
    /// let empty: OrderedSet<i32> = OrderedSet::new();
    /// assert!(empty.is_empty());
    ///
    /// let non_empty = empty.insert(42);
    /// assert!(!non_empty.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }
}

impl<T: Clone + Ord> OrderedSet<T> {
    /// Creates a set containing a single element.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordset::OrderedSet;
    ///
    /// let set = OrderedSet::singleton(42);
    /// assert_eq!(set.len(), 1);
    /// assert!(set.contains(&42));
    /// ```
    #[inline]
    #[must_use]
    pub fn singleton(value: T) -> Self {
        Self::new().insert(value)
    }

    /// Returns `true` if the set contains the given value.
    ///
    /// The value may be any borrowed form of the element type, but the
    /// ordering on the borrowed form must match the ordering on the element
    /// type.
    ///
    /// # Complexity
    ///
    /// O(log N), no allocation.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordset::OrderedSet;
    ///
    /// let set = OrderedSet::new()
    ///     .insert("hello".to_string())
    ///     .insert("world".to_string());
    ///
    /// // Can use &str to search String elements
    /// assert!(set.contains("hello"));
    /// assert!(!set.contains("other"));
    /// ```
    #[must_use]
    pub fn contains<Q>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        Self::contains_from_node(self.root.as_ref(), value)
    }

    /// Recursive helper for contains.
    fn contains_from_node<Q>(node: Option<&ReferenceCounter<Node<T>>>, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        node.is_some_and(|node_ref| match value.cmp(node_ref.value.borrow()) {
            Ordering::Less => Self::contains_from_node(node_ref.left.as_ref(), value),
            Ordering::Greater => Self::contains_from_node(node_ref.right.as_ref(), value),
            Ordering::Equal => true,
        })
    }

    /// Inserts a value into the set, returning a new set.
    ///
    /// If the value is already present, returns a clone of the current set,
    /// which shares its entire tree with the receiver (idempotent
    /// operation). Otherwise the nodes on the path from the root to the new
    /// leaf are rebuilt and every untouched subtree is shared with the
    /// receiver.
    ///
    /// # Complexity
    ///
    /// O(log N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordset::OrderedSet;
    ///
    /// let set = OrderedSet::new().insert(1);
    /// let bigger = set.insert(2);
    ///
    /// assert_eq!(set.len(), 1);    // Original unchanged
    /// assert_eq!(bigger.len(), 2); // New version
    ///
    /// // Duplicate insertion is idempotent
    /// let same = bigger.insert(2);
    /// assert_eq!(same, bigger);
    /// ```
    #[must_use]
    pub fn insert(&self, value: T) -> Self {
        if self.contains(&value) {
            return self.clone();
        }

        let new_root = Self::insert_into_node(self.root.as_ref(), value);

        // The root is always black
        let black_root = new_root.map(|node_ref| {
            if node_ref.is_red() {
                ReferenceCounter::new(node_ref.with_color(Color::Black))
            } else {
                node_ref
            }
        });

        Self {
            root: black_root,
            length: self.length + 1,
        }
    }

    /// Recursive helper for insert.
    ///
    /// The value is known to be absent from the subtree, so the descent
    /// never meets an equal element. The new leaf starts out red and each
    /// rebuilt ancestor is rebalanced on the way back up.
    fn insert_into_node(
        node: Option<&ReferenceCounter<Node<T>>>,
        value: T,
    ) -> Option<ReferenceCounter<Node<T>>> {
        match node {
            None => Some(ReferenceCounter::new(Node::new_red(value))),
            Some(node_ref) => match value.cmp(&node_ref.value) {
                Ordering::Less => {
                    let new_left = Self::insert_into_node(node_ref.left.as_ref(), value);
                    let rebuilt = Node {
                        value: node_ref.value.clone(),
                        color: node_ref.color,
                        left: new_left,
                        right: node_ref.right.clone(),
                    };
                    Some(ReferenceCounter::new(Self::balance(rebuilt)))
                }
                Ordering::Greater => {
                    let new_right = Self::insert_into_node(node_ref.right.as_ref(), value);
                    let rebuilt = Node {
                        value: node_ref.value.clone(),
                        color: node_ref.color,
                        left: node_ref.left.clone(),
                        right: new_right,
                    };
                    Some(ReferenceCounter::new(Self::balance(rebuilt)))
                }
                Ordering::Equal => Some(node_ref.clone()),
            },
        }
    }

    /// Balances a black node whose child carries a red-red violation.
    ///
    /// Handles the four configurations (left-left, left-right, right-left,
    /// right-right). Each resolves to the same shape: the middle value
    /// becomes a red root with two black children, preserving the black
    /// height of the subtree.
    fn balance(node: Node<T>) -> Node<T> {
        if node.is_red() {
            return node;
        }

        // Case 1: left child red, left-left grandchild red
        if let Some(left) = &node.left
            && left.is_red()
            && let Some(left_left) = &left.left
            && left_left.is_red()
        {
            return Node {
                value: left.value.clone(),
                color: Color::Red,
                left: Some(ReferenceCounter::new(left_left.with_color(Color::Black))),
                right: Some(ReferenceCounter::new(Node {
                    value: node.value.clone(),
                    color: Color::Black,
                    left: left.right.clone(),
                    right: node.right.clone(),
                })),
            };
        }

        // Case 2: left child red, left-right grandchild red
        if let Some(left) = &node.left
            && left.is_red()
            && let Some(left_right) = &left.right
            && left_right.is_red()
        {
            return Node {
                value: left_right.value.clone(),
                color: Color::Red,
                left: Some(ReferenceCounter::new(Node {
                    value: left.value.clone(),
                    color: Color::Black,
                    left: left.left.clone(),
                    right: left_right.left.clone(),
                })),
                right: Some(ReferenceCounter::new(Node {
                    value: node.value.clone(),
                    color: Color::Black,
                    left: left_right.right.clone(),
                    right: node.right.clone(),
                })),
            };
        }

        // Case 3: right child red, right-left grandchild red
        if let Some(right) = &node.right
            && right.is_red()
            && let Some(right_left) = &right.left
            && right_left.is_red()
        {
            return Node {
                value: right_left.value.clone(),
                color: Color::Red,
                left: Some(ReferenceCounter::new(Node {
                    value: node.value.clone(),
                    color: Color::Black,
                    left: node.left.clone(),
                    right: right_left.left.clone(),
                })),
                right: Some(ReferenceCounter::new(Node {
                    value: right.value.clone(),
                    color: Color::Black,
                    left: right_left.right.clone(),
                    right: right.right.clone(),
                })),
            };
        }

        // Case 4: right child red, right-right grandchild red
        if let Some(right) = &node.right
            && right.is_red()
            && let Some(right_right) = &right.right
            && right_right.is_red()
        {
            return Node {
                value: right.value.clone(),
                color: Color::Red,
                left: Some(ReferenceCounter::new(Node {
                    value: node.value.clone(),
                    color: Color::Black,
                    left: node.left.clone(),
                    right: right.left.clone(),
                })),
                right: Some(ReferenceCounter::new(right_right.with_color(Color::Black))),
            };
        }

        node
    }

    /// Removes a value from the set, returning a new set.
    ///
    /// If the value is absent, returns a clone of the current set, which
    /// shares its entire tree with the receiver. Otherwise the removed
    /// node's subtrees are joined, the black-height invariant is restored
    /// along the rebuilt path, and every untouched subtree is shared with
    /// the receiver.
    ///
    /// # Complexity
    ///
    /// O(log N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordset::OrderedSet;
    ///
    /// let set = OrderedSet::new().insert(1).insert(2);
    /// let removed = set.remove(&1);
    ///
    /// assert_eq!(set.len(), 2);     // Original unchanged
    /// assert_eq!(removed.len(), 1); // New version
    /// assert!(!removed.contains(&1));
    ///
    /// // Removing an absent value is a no-op
    /// let same = removed.remove(&1);
    /// assert_eq!(same, removed);
    /// ```
    #[must_use]
    pub fn remove<Q>(&self, value: &Q) -> Self
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let Some(root) = self.root.as_ref() else {
            return self.clone();
        };

        if !self.contains(value) {
            return self.clone();
        }

        let new_root = Self::remove_from_node(root, value);

        // The root is always black
        let black_root = new_root.map(|node_ref| {
            if node_ref.is_red() {
                ReferenceCounter::new(node_ref.with_color(Color::Black))
            } else {
                node_ref
            }
        });

        Self {
            root: black_root,
            length: self.length.saturating_sub(1),
        }
    }

    /// Recursive helper for remove.
    ///
    /// The value is known to be present in the subtree. When the descent
    /// leaves a black subtree, that side comes back one black short and the
    /// corresponding rebalance repairs it; a red subtree absorbs the
    /// removal without repair.
    fn remove_from_node<Q>(
        node: &ReferenceCounter<Node<T>>,
        value: &Q,
    ) -> Option<ReferenceCounter<Node<T>>>
    where
        T: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match value.cmp(node.value.borrow()) {
            Ordering::Less => {
                let left_is_black = node.left.as_ref().is_some_and(|left| !left.is_red());
                let new_left = node
                    .left
                    .as_ref()
                    .and_then(|left| Self::remove_from_node(left, value));
                // The rebuilt color does not matter when a rebalance follows
                let rebuilt = Node {
                    value: node.value.clone(),
                    color: Color::Red,
                    left: new_left,
                    right: node.right.clone(),
                };
                if left_is_black {
                    Some(Self::balance_left(&rebuilt))
                } else {
                    Some(ReferenceCounter::new(rebuilt))
                }
            }
            Ordering::Greater => {
                let right_is_black = node.right.as_ref().is_some_and(|right| !right.is_red());
                let new_right = node
                    .right
                    .as_ref()
                    .and_then(|right| Self::remove_from_node(right, value));
                let rebuilt = Node {
                    value: node.value.clone(),
                    color: Color::Red,
                    left: node.left.clone(),
                    right: new_right,
                };
                if right_is_black {
                    Some(Self::balance_right(&rebuilt))
                } else {
                    Some(ReferenceCounter::new(rebuilt))
                }
            }
            Ordering::Equal => Self::fuse(node.left.clone(), node.right.clone()),
        }
    }

    /// Joins the two subtrees of a removed node into one tree.
    ///
    /// All elements of `left` compare less than all elements of `right`,
    /// and both subtrees have equal black height. The join recurses down
    /// the facing spines and repairs the one case (two black roots whose
    /// joined middle surfaces no red) that loses a black level.
    fn fuse(
        left: Option<ReferenceCounter<Node<T>>>,
        right: Option<ReferenceCounter<Node<T>>>,
    ) -> Option<ReferenceCounter<Node<T>>> {
        let (left, right) = match (left, right) {
            (None, right) => return right,
            (left, None) => return left,
            (Some(left), Some(right)) => (left, right),
        };

        match (left.color, right.color) {
            (Color::Red, Color::Red) => {
                let fused = Self::fuse(left.right.clone(), right.left.clone());
                match fused {
                    Some(middle) if middle.is_red() => Some(ReferenceCounter::new(Node {
                        value: middle.value.clone(),
                        color: Color::Red,
                        left: Some(ReferenceCounter::new(Node {
                            value: left.value.clone(),
                            color: Color::Red,
                            left: left.left.clone(),
                            right: middle.left.clone(),
                        })),
                        right: Some(ReferenceCounter::new(Node {
                            value: right.value.clone(),
                            color: Color::Red,
                            left: middle.right.clone(),
                            right: right.right.clone(),
                        })),
                    })),
                    fused => Some(ReferenceCounter::new(Node {
                        value: left.value.clone(),
                        color: Color::Red,
                        left: left.left.clone(),
                        right: Some(ReferenceCounter::new(Node {
                            value: right.value.clone(),
                            color: Color::Red,
                            left: fused,
                            right: right.right.clone(),
                        })),
                    })),
                }
            }
            (Color::Black, Color::Black) => {
                let fused = Self::fuse(left.right.clone(), right.left.clone());
                match fused {
                    Some(middle) if middle.is_red() => Some(ReferenceCounter::new(Node {
                        value: middle.value.clone(),
                        color: Color::Red,
                        left: Some(ReferenceCounter::new(Node {
                            value: left.value.clone(),
                            color: Color::Black,
                            left: left.left.clone(),
                            right: middle.left.clone(),
                        })),
                        right: Some(ReferenceCounter::new(Node {
                            value: right.value.clone(),
                            color: Color::Black,
                            left: middle.right.clone(),
                            right: right.right.clone(),
                        })),
                    })),
                    fused => {
                        // The joined tree is one black short on this side
                        let rebuilt = Node {
                            value: left.value.clone(),
                            color: Color::Red,
                            left: left.left.clone(),
                            right: Some(ReferenceCounter::new(Node {
                                value: right.value.clone(),
                                color: Color::Black,
                                left: fused,
                                right: right.right.clone(),
                            })),
                        };
                        Some(Self::balance_left(&rebuilt))
                    }
                }
            }
            (Color::Black, Color::Red) => {
                let new_left = Self::fuse(Some(left), right.left.clone());
                Some(ReferenceCounter::new(Node {
                    value: right.value.clone(),
                    color: Color::Red,
                    left: new_left,
                    right: right.right.clone(),
                }))
            }
            (Color::Red, Color::Black) => {
                let new_right = Self::fuse(left.right.clone(), Some(right));
                Some(ReferenceCounter::new(Node {
                    value: left.value.clone(),
                    color: Color::Red,
                    left: left.left.clone(),
                    right: new_right,
                }))
            }
        }
    }

    /// Recoloring step shared by the deletion rebalances.
    ///
    /// A node with two red children passes its black level down by
    /// recoloring; anything else is handled by the insertion balance, whose
    /// input here is always a black node.
    fn balance_removal(node: Node<T>) -> Node<T> {
        if is_red(node.left.as_ref()) && is_red(node.right.as_ref()) {
            let left = node
                .left
                .as_ref()
                .map(|left| ReferenceCounter::new(left.with_color(Color::Black)));
            let right = node
                .right
                .as_ref()
                .map(|right| ReferenceCounter::new(right.with_color(Color::Black)));
            Node {
                value: node.value,
                color: Color::Red,
                left,
                right,
            }
        } else {
            debug_assert!(!node.is_red());
            Self::balance(node)
        }
    }

    /// Restores the black-height invariant after removing from the left
    /// subtree of `node`.
    ///
    /// `node.left` is one black short. Only `node`'s value and children are
    /// read; the result decides its own color.
    fn balance_left(node: &Node<T>) -> ReferenceCounter<Node<T>> {
        // A red deficient subtree absorbs the missing black by recoloring
        if let Some(left) = &node.left
            && left.is_red()
        {
            return ReferenceCounter::new(Node {
                value: node.value.clone(),
                color: Color::Red,
                left: Some(ReferenceCounter::new(left.with_color(Color::Black))),
                right: node.right.clone(),
            });
        }

        match &node.right {
            // Black sibling: pull it down to red and rebalance here
            Some(right) if !right.is_red() => {
                let lowered = Node {
                    value: node.value.clone(),
                    color: Color::Black,
                    left: node.left.clone(),
                    right: Some(ReferenceCounter::new(right.with_color(Color::Red))),
                };
                ReferenceCounter::new(Self::balance_removal(lowered))
            }
            // Red sibling: rotate its near child up, then rebalance below it
            Some(right) => {
                let (Some(right_left), Some(right_right)) = (&right.left, &right.right) else {
                    unreachable!("red node with an absent child in a balanced tree");
                };
                let new_left = Node {
                    value: node.value.clone(),
                    color: Color::Black,
                    left: node.left.clone(),
                    right: right_left.left.clone(),
                };
                let new_right = Self::balance_removal(Node {
                    value: right.value.clone(),
                    color: Color::Black,
                    left: right_left.right.clone(),
                    right: Some(ReferenceCounter::new(right_right.with_color(Color::Red))),
                });
                ReferenceCounter::new(Node {
                    value: right_left.value.clone(),
                    color: Color::Red,
                    left: Some(ReferenceCounter::new(new_left)),
                    right: Some(ReferenceCounter::new(new_right)),
                })
            }
            None => unreachable!("black-deficient subtree with no sibling"),
        }
    }

    /// Restores the black-height invariant after removing from the right
    /// subtree of `node`. Mirror image of [`Self::balance_left`].
    fn balance_right(node: &Node<T>) -> ReferenceCounter<Node<T>> {
        if let Some(right) = &node.right
            && right.is_red()
        {
            return ReferenceCounter::new(Node {
                value: node.value.clone(),
                color: Color::Red,
                left: node.left.clone(),
                right: Some(ReferenceCounter::new(right.with_color(Color::Black))),
            });
        }

        match &node.left {
            Some(left) if !left.is_red() => {
                let lowered = Node {
                    value: node.value.clone(),
                    color: Color::Black,
                    left: Some(ReferenceCounter::new(left.with_color(Color::Red))),
                    right: node.right.clone(),
                };
                ReferenceCounter::new(Self::balance_removal(lowered))
            }
            Some(left) => {
                let (Some(left_left), Some(left_right)) = (&left.left, &left.right) else {
                    unreachable!("red node with an absent child in a balanced tree");
                };
                let new_left = Self::balance_removal(Node {
                    value: left.value.clone(),
                    color: Color::Black,
                    left: Some(ReferenceCounter::new(left_left.with_color(Color::Red))),
                    right: left_right.left.clone(),
                });
                let new_right = Node {
                    value: node.value.clone(),
                    color: Color::Black,
                    left: left_right.right.clone(),
                    right: node.right.clone(),
                };
                ReferenceCounter::new(Node {
                    value: left_right.value.clone(),
                    color: Color::Red,
                    left: Some(ReferenceCounter::new(new_left)),
                    right: Some(ReferenceCounter::new(new_right)),
                })
            }
            None => unreachable!("black-deficient subtree with no sibling"),
        }
    }

    /// Returns a reference to the smallest element, or `None` if the set is
    /// empty.
    ///
    /// # Complexity
    ///
    /// O(log N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordset::OrderedSet;
    ///
    /// let set = OrderedSet::new().insert(3).insert(1).insert(5);
    /// assert_eq!(set.min(), Some(&1));
    /// ```
    #[must_use]
    pub fn min(&self) -> Option<&T> {
        Self::min_from_node(self.root.as_ref())
    }

    /// Recursive helper for min.
    fn min_from_node(node: Option<&ReferenceCounter<Node<T>>>) -> Option<&T> {
        node.and_then(|node_ref| {
            node_ref.left.as_ref().map_or_else(
                || Some(&node_ref.value),
                |left| Self::min_from_node(Some(left)),
            )
        })
    }

    /// Returns a reference to the largest element, or `None` if the set is
    /// empty.
    ///
    /// # Complexity
    ///
    /// O(log N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordset::OrderedSet;
    ///
    /// let set = OrderedSet::new().insert(3).insert(1).insert(5);
    /// assert_eq!(set.max(), Some(&5));
    /// ```
    #[must_use]
    pub fn max(&self) -> Option<&T> {
        Self::max_from_node(self.root.as_ref())
    }

    /// Recursive helper for max.
    fn max_from_node(node: Option<&ReferenceCounter<Node<T>>>) -> Option<&T> {
        node.and_then(|node_ref| {
            node_ref.right.as_ref().map_or_else(
                || Some(&node_ref.value),
                |right| Self::max_from_node(Some(right)),
            )
        })
    }

    /// Returns the height of the tree, counting nodes along the longest
    /// root-to-leaf path.
    ///
    /// An empty set has height 0. The red-black invariants bound the height
    /// by `2 * log2(N + 1)`. This is a diagnostic; it walks the whole tree.
    ///
    /// # Complexity
    ///
    /// O(N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordset::OrderedSet;
    ///
    /// let set: OrderedSet<i32> = (0..100).collect();
    /// assert!(set.height() <= 14); // 2 * log2(101) rounded up
    /// ```
    #[must_use]
    pub fn height(&self) -> usize {
        Self::height_from_node(self.root.as_ref())
    }

    /// Recursive helper for height.
    fn height_from_node(node: Option<&ReferenceCounter<Node<T>>>) -> usize {
        node.map_or(0, |node_ref| {
            1 + Self::height_from_node(node_ref.left.as_ref())
                .max(Self::height_from_node(node_ref.right.as_ref()))
        })
    }

    /// Returns an iterator over references to the elements in ascending
    /// order.
    ///
    /// The iterator is lazy: it keeps a stack of the current descent path
    /// and visits nodes on demand, so creating it is O(log N) and a full
    /// traversal is O(N). Iterating never changes the set, and any number
    /// of iterations over the same or different versions can run at the
    /// same time.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordset::OrderedSet;
    ///
    /// let set = OrderedSet::new().insert(3).insert(1).insert(2);
    ///
    /// let elements: Vec<&i32> = set.iter().collect();
    /// assert_eq!(elements, vec![&1, &2, &3]);
    /// ```
    #[must_use]
    pub fn iter(&self) -> OrderedSetIterator<'_, T> {
        let mut iterator = OrderedSetIterator {
            stack: SmallVec::new(),
            remaining: self.length,
        };
        iterator.descend_left(self.root.as_deref());
        iterator
    }

    /// Returns the union of the two sets.
    ///
    /// The result contains every element present in either set. Elements
    /// already present on one side are shared rather than rebuilt where
    /// possible.
    ///
    /// # Complexity
    ///
    /// O(M log(N + M)) where M is the size of `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordset::ordered_set;
    ///
    /// let union = ordered_set![1, 3, 5].union(&ordered_set![2, 3, 4]);
    /// assert_eq!(union, ordered_set![1, 2, 3, 4, 5]);
    /// ```
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        if self.is_empty() {
            return other.clone();
        }
        if other.is_empty() {
            return self.clone();
        }

        let mut result = self.clone();
        for element in other {
            result = result.insert(element.clone());
        }
        result
    }

    /// Returns the intersection of the two sets.
    ///
    /// The result contains every element present in both sets.
    ///
    /// # Complexity
    ///
    /// O(N log M) where M is the size of `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordset::ordered_set;
    ///
    /// let common = ordered_set![1, 2, 3].intersection(&ordered_set![2, 3, 4]);
    /// assert_eq!(common, ordered_set![2, 3]);
    /// ```
    #[must_use]
    pub fn intersection(&self, other: &Self) -> Self {
        if self.is_empty() || other.is_empty() {
            return Self::new();
        }

        let mut result = Self::new();
        for element in self {
            if other.contains(element) {
                result = result.insert(element.clone());
            }
        }
        result
    }

    /// Returns the difference of the two sets (`self` minus `other`).
    ///
    /// # Complexity
    ///
    /// O(N log M) where M is the size of `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordset::ordered_set;
    ///
    /// let rest = ordered_set![1, 2, 3, 4].difference(&ordered_set![2, 4]);
    /// assert_eq!(rest, ordered_set![1, 3]);
    /// ```
    #[must_use]
    pub fn difference(&self, other: &Self) -> Self {
        if other.is_empty() {
            return self.clone();
        }

        let mut result = Self::new();
        for element in self {
            if !other.contains(element) {
                result = result.insert(element.clone());
            }
        }
        result
    }

    /// Returns `true` if every element of `self` is contained in `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordset::ordered_set;
    ///
    /// assert!(ordered_set![1, 2].is_subset(&ordered_set![1, 2, 3]));
    /// assert!(!ordered_set![1, 4].is_subset(&ordered_set![1, 2, 3]));
    /// ```
    #[must_use]
    pub fn is_subset(&self, other: &Self) -> bool {
        self.length <= other.length && self.iter().all(|element| other.contains(element))
    }

    /// Returns `true` if every element of `other` is contained in `self`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordset::ordered_set;
    ///
    /// assert!(ordered_set![1, 2, 3].is_superset(&ordered_set![1, 2]));
    /// ```
    #[must_use]
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }

    /// Returns `true` if the two sets have no element in common.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ordset::ordered_set;
    ///
    /// assert!(ordered_set![1, 2].is_disjoint(&ordered_set![3, 4]));
    /// assert!(!ordered_set![1, 2].is_disjoint(&ordered_set![2, 3]));
    /// ```
    #[must_use]
    pub fn is_disjoint(&self, other: &Self) -> bool {
        // Iterate the smaller side, search the larger
        if self.length <= other.length {
            self.iter().all(|element| !other.contains(element))
        } else {
            other.iter().all(|element| !self.contains(element))
        }
    }
}

// =============================================================================
// Iterator Implementation
// =============================================================================

/// An iterator over references to the elements of an [`OrderedSet`] in
/// ascending order.
pub struct OrderedSetIterator<'a, T> {
    /// Nodes on the descent path whose value and right subtree are still
    /// pending, innermost last.
    stack: SmallVec<[&'a Node<T>; DESCENT_STACK_CAPACITY]>,
    remaining: usize,
}

impl<'a, T> OrderedSetIterator<'a, T> {
    /// Pushes `node` and its whole left spine onto the stack.
    fn descend_left(&mut self, mut node: Option<&'a Node<T>>) {
        while let Some(node_ref) = node {
            self.stack.push(node_ref);
            node = node_ref.left.as_deref();
        }
    }
}

impl<'a, T> Iterator for OrderedSetIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let node_ref = self.stack.pop()?;
        self.descend_left(node_ref.right.as_deref());
        self.remaining -= 1;
        Some(&node_ref.value)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for OrderedSetIterator<'_, T> {
    #[inline]
    fn len(&self) -> usize {
        self.remaining
    }
}

/// An owning iterator over the elements of an [`OrderedSet`] in ascending
/// order.
pub struct OrderedSetIntoIterator<T> {
    elements: std::vec::IntoIter<T>,
}

impl<T> Iterator for OrderedSetIntoIterator<T> {
    type Item = T;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.elements.next()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.elements.size_hint()
    }
}

impl<T> ExactSizeIterator for OrderedSetIntoIterator<T> {
    #[inline]
    fn len(&self) -> usize {
        self.elements.len()
    }
}

// =============================================================================
// Standard Trait Implementations
// =============================================================================

impl<T> Default for OrderedSet<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Ord> FromIterator<T> for OrderedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        for element in iter {
            set = set.insert(element);
        }
        set
    }
}

impl<T: Clone + Ord> IntoIterator for OrderedSet<T> {
    type Item = T;
    type IntoIter = OrderedSetIntoIterator<T>;

    fn into_iter(self) -> Self::IntoIter {
        let elements: Vec<T> = self.iter().cloned().collect();
        OrderedSetIntoIterator {
            elements: elements.into_iter(),
        }
    }
}

impl<'a, T: Clone + Ord> IntoIterator for &'a OrderedSet<T> {
    type Item = &'a T;
    type IntoIter = OrderedSetIterator<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Clone + Ord> PartialEq for OrderedSet<T> {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && self.iter().all(|element| other.contains(element))
    }
}

impl<T: Clone + Ord> Eq for OrderedSet<T> {}

/// Computes a hash value for this set.
///
/// The hash covers the length and then every element in ascending order, so
/// insertion order never affects the hash and equal sets hash equally.
impl<T: Clone + Ord + Hash> Hash for OrderedSet<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.length.hash(state);
        for element in self {
            element.hash(state);
        }
    }
}

impl<T: Clone + Ord + fmt::Debug> fmt::Debug for OrderedSet<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_set().entries(self.iter()).finish()
    }
}

impl<T: Clone + Ord + fmt::Display> fmt::Display for OrderedSet<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{{")?;
        let mut first = true;
        for element in self {
            if first {
                first = false;
            } else {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{element}")?;
        }
        write!(formatter, "}}")
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T> serde::Serialize for OrderedSet<T>
where
    T: serde::Serialize + Clone + Ord,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut sequence = serializer.serialize_seq(Some(self.len()))?;
        for element in self {
            sequence.serialize_element(element)?;
        }
        sequence.end()
    }
}

#[cfg(feature = "serde")]
struct OrderedSetVisitor<T> {
    element_marker: std::marker::PhantomData<T>,
}

#[cfg(feature = "serde")]
impl<T> OrderedSetVisitor<T> {
    const fn new() -> Self {
        Self {
            element_marker: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::de::Visitor<'de> for OrderedSetVisitor<T>
where
    T: serde::Deserialize<'de> + Clone + Ord,
{
    type Value = OrderedSet<T>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut access: A) -> Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        // Note: Sequential insert keeps memory usage gradual for large
        // inputs and collapses duplicate elements.
        let mut set = OrderedSet::new();
        while let Some(element) = access.next_element()? {
            set = set.insert(element);
        }
        Ok(set)
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for OrderedSet<T>
where
    T: serde::Deserialize<'de> + Clone + Ord,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(OrderedSetVisitor::new())
    }
}

// =============================================================================
// Auto Trait Expectations
// =============================================================================

#[cfg(feature = "arc")]
static_assertions::assert_impl_all!(OrderedSet<i32>: Send, Sync);

#[cfg(not(feature = "arc"))]
static_assertions::assert_not_impl_any!(OrderedSet<i32>: Send, Sync);

// =============================================================================
// Tests
// =============================================================================
