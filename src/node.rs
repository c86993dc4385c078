//! Heap nodes of the relaxed radix-balanced tree.
//!
//! A node is either a leaf holding elements, a *regular* inner node whose
//! child sizes are implicit (all but the rightmost child perfectly full), or
//! a *relaxed* inner node carrying an explicit cumulative size table. Nodes
//! are shared through [`ReferenceCounter`]; a node additionally remembers the
//! edit token of the transient session that created it, which is what
//! authorizes in-place mutation later on.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::ReferenceCounter;

/// Shared handle to a node.
pub(crate) type NodeRef<T, const B: usize, const BL: usize> =
    ReferenceCounter<Node<T, B, BL>>;

/// Fan-out of a node with the given branching bits.
pub(crate) const fn branches(bits: usize) -> usize {
    1 << bits
}

/// Bit mask extracting an index within a node of the given branching bits.
pub(crate) const fn mask(bits: usize) -> usize {
    (1 << bits) - 1
}

/// Number of children of a regular inner node at `shift` covering `size`
/// elements. `size` must be non-zero.
pub(crate) const fn regular_child_count(shift: usize, size: usize) -> usize {
    ((size - 1) >> shift) + 1
}

// =============================================================================
// Edit Tokens
// =============================================================================

/// Identity value naming a transient session.
///
/// A node whose `ownee` equals the session's token and whose reference count
/// is one may be mutated in place; everything else is copied on first touch.
/// Tokens are never reused, so nodes left over from a finished session simply
/// fail the comparison in the next one.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct EditToken(u64);

impl EditToken {
    /// Returns a token distinct from every token handed out before.
    pub(crate) fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        EditToken(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

// =============================================================================
// Node Definition
// =============================================================================

/// Tree node: an edit-token slot plus the tagged payload.
pub(crate) struct Node<T, const B: usize, const BL: usize> {
    ownee: Option<EditToken>,
    kind: Kind<T, B, BL>,
}

/// The three node shapes.
pub(crate) enum Kind<T, const B: usize, const BL: usize> {
    /// Up to `1 << BL` elements.
    Leaf(Vec<T>),
    /// Up to `1 << B` children; subtree sizes implicit.
    Inner(Vec<NodeRef<T, B, BL>>),
    /// Up to `1 << B` children with a cumulative size table;
    /// `sizes[i]` is the element count through child `i`.
    Relaxed {
        children: Vec<NodeRef<T, B, BL>>,
        sizes: Vec<usize>,
    },
}

impl<T: Clone, const B: usize, const BL: usize> Clone for Kind<T, B, BL> {
    fn clone(&self) -> Self {
        match self {
            Kind::Leaf(elements) => Kind::Leaf(elements.clone()),
            Kind::Inner(children) => Kind::Inner(children.clone()),
            Kind::Relaxed { children, sizes } => Kind::Relaxed {
                children: children.clone(),
                sizes: sizes.clone(),
            },
        }
    }
}

impl<T, const B: usize, const BL: usize> Node<T, B, BL> {
    /// Creates a leaf node.
    pub(crate) fn leaf(elements: Vec<T>) -> Self {
        debug_assert!(elements.len() <= branches(BL));
        Node {
            ownee: None,
            kind: Kind::Leaf(elements),
        }
    }

    /// Creates a regular inner node.
    pub(crate) fn inner(children: Vec<NodeRef<T, B, BL>>) -> Self {
        debug_assert!(children.len() <= branches(B));
        Node {
            ownee: None,
            kind: Kind::Inner(children),
        }
    }

    /// Creates a relaxed inner node with its size table.
    pub(crate) fn relaxed(children: Vec<NodeRef<T, B, BL>>, sizes: Vec<usize>) -> Self {
        debug_assert!(children.len() <= branches(B));
        debug_assert_eq!(children.len(), sizes.len());
        Node {
            ownee: None,
            kind: Kind::Relaxed { children, sizes },
        }
    }

    /// Stamps the node with an edit token, marking it owned by a transient
    /// session.
    pub(crate) fn stamped(mut self, token: EditToken) -> Self {
        self.ownee = Some(token);
        self
    }

    /// The edit token of the transient session that owns this node, if any.
    pub(crate) fn ownee(&self) -> Option<EditToken> {
        self.ownee
    }

    /// The tagged payload.
    pub(crate) fn kind(&self) -> &Kind<T, B, BL> {
        &self.kind
    }

    /// Mutable payload access; callers hold `&mut Node` only through
    /// [`ensure_editable`].
    pub(crate) fn kind_mut(&mut self) -> &mut Kind<T, B, BL> {
        &mut self.kind
    }

    /// Whether this node carries a size table.
    pub(crate) fn is_relaxed(&self) -> bool {
        matches!(self.kind, Kind::Relaxed { .. })
    }

    /// Size-table probe: children and cumulative sizes of a relaxed node.
    pub(crate) fn relaxed_parts(&self) -> Option<(&[NodeRef<T, B, BL>], &[usize])> {
        match &self.kind {
            Kind::Relaxed { children, sizes } => Some((children, sizes)),
            _ => None,
        }
    }

    /// Elements of a leaf node.
    pub(crate) fn leaf_slice(&self) -> &[T] {
        match &self.kind {
            Kind::Leaf(elements) => elements,
            _ => unreachable!("leaf access on an inner node"),
        }
    }

    /// Children of an inner node, regular or relaxed.
    pub(crate) fn children(&self) -> &[NodeRef<T, B, BL>] {
        match &self.kind {
            Kind::Inner(children) | Kind::Relaxed { children, .. } => children,
            Kind::Leaf(_) => unreachable!("child access on a leaf node"),
        }
    }

    /// Mutable leaf elements.
    pub(crate) fn leaf_mut(&mut self) -> &mut Vec<T> {
        match &mut self.kind {
            Kind::Leaf(elements) => elements,
            _ => unreachable!("leaf access on an inner node"),
        }
    }

    /// Mutable children of an inner node.
    pub(crate) fn children_mut(&mut self) -> &mut Vec<NodeRef<T, B, BL>> {
        match &mut self.kind {
            Kind::Inner(children) | Kind::Relaxed { children, .. } => children,
            Kind::Leaf(_) => unreachable!("child access on a leaf node"),
        }
    }

    /// Mutable children and size table of a relaxed node.
    pub(crate) fn relaxed_parts_mut(
        &mut self,
    ) -> (&mut Vec<NodeRef<T, B, BL>>, &mut Vec<usize>) {
        match &mut self.kind {
            Kind::Relaxed { children, sizes } => (children, sizes),
            _ => unreachable!("size table access on a non-relaxed node"),
        }
    }

    /// Builds the child to install under an inner node at `shift`: the leaf
    /// itself at the bottom level, otherwise a spine of single-child inner
    /// nodes down to it.
    pub(crate) fn make_child(
        shift: usize,
        leaf: NodeRef<T, B, BL>,
        ownee: Option<EditToken>,
    ) -> NodeRef<T, B, BL> {
        if shift == BL {
            leaf
        } else {
            let below = Self::make_child(shift - B, leaf, ownee);
            ReferenceCounter::new(Node {
                ownee,
                kind: Kind::Inner(vec![below]),
            })
        }
    }

    /// Builds a subtree rooted at `shift` containing exactly `leaf`.
    pub(crate) fn make_path(
        shift: usize,
        leaf: NodeRef<T, B, BL>,
        ownee: Option<EditToken>,
    ) -> NodeRef<T, B, BL> {
        let child = Self::make_child(shift, leaf, ownee);
        ReferenceCounter::new(Node {
            ownee,
            kind: Kind::Inner(vec![child]),
        })
    }
}

impl<T: Clone, const B: usize, const BL: usize> Node<T, B, BL> {
    /// Shallow copy stamped with `token`: leaf elements are cloned, children
    /// are adopted by reference.
    pub(crate) fn cloned_with_token(&self, token: EditToken) -> Self {
        Node {
            ownee: Some(token),
            kind: self.kind.clone(),
        }
    }
}

/// Grants mutable access to the node behind `node_ref` for the transient
/// session `token`, copying it first unless the session already owns the
/// only reference.
pub(crate) fn ensure_editable<'a, T: Clone, const B: usize, const BL: usize>(
    node_ref: &'a mut NodeRef<T, B, BL>,
    token: EditToken,
) -> &'a mut Node<T, B, BL> {
    let editable =
        ReferenceCounter::strong_count(node_ref) == 1 && node_ref.ownee == Some(token);
    if !editable {
        let copy = node_ref.cloned_with_token(token);
        *node_ref = ReferenceCounter::new(copy);
    }
    match ReferenceCounter::get_mut(node_ref) {
        Some(node) => node,
        None => unreachable!("sole owner after copy"),
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    type TestNodeRef = NodeRef<i32, 2, 2>;

    fn leaf_of(elements: Vec<i32>) -> TestNodeRef {
        ReferenceCounter::new(Node::leaf(elements))
    }

    #[rstest]
    fn test_make_child_at_bottom_is_the_leaf() {
        let leaf = leaf_of(vec![1, 2]);
        let child = Node::make_child(2, leaf.clone(), None);
        assert!(ReferenceCounter::ptr_eq(&leaf, &child));
    }

    #[rstest]
    fn test_make_path_builds_single_child_spine() {
        let leaf = leaf_of(vec![1, 2, 3, 4]);
        // Subtree rooted at shift 4: one spine node at shift 4, one at the
        // bottom level, then the leaf.
        let path = Node::make_path(4, leaf.clone(), None);
        let bottom = &path.children()[0];
        assert_eq!(path.children().len(), 1);
        assert_eq!(bottom.children().len(), 1);
        assert!(ReferenceCounter::ptr_eq(&bottom.children()[0], &leaf));
    }

    #[rstest]
    fn test_relaxed_probe() {
        let leaf = leaf_of(vec![1, 2, 3]);
        let relaxed: TestNodeRef =
            ReferenceCounter::new(Node::relaxed(vec![leaf.clone()], vec![3]));
        let regular: TestNodeRef = ReferenceCounter::new(Node::inner(vec![leaf]));

        assert!(relaxed.relaxed_parts().is_some());
        assert!(regular.relaxed_parts().is_none());
        assert_eq!(relaxed.relaxed_parts().map(|(_, sizes)| sizes), Some(&[3][..]));
    }

    #[rstest]
    fn test_ensure_editable_copies_shared_nodes() {
        let token = EditToken::fresh();
        let mut handle = leaf_of(vec![1, 2]);
        let alias = handle.clone();

        ensure_editable(&mut handle, token).leaf_mut().push(3);

        assert_eq!(handle.leaf_slice(), &[1, 2, 3]);
        assert_eq!(alias.leaf_slice(), &[1, 2]);
        assert_eq!(handle.ownee(), Some(token));
    }

    #[rstest]
    fn test_ensure_editable_reuses_owned_nodes() {
        let token = EditToken::fresh();
        let mut handle =
            ReferenceCounter::new(Node::<i32, 2, 2>::leaf(vec![1]).stamped(token));
        let before = ReferenceCounter::as_ptr(&handle);

        ensure_editable(&mut handle, token).leaf_mut().push(2);

        assert_eq!(ReferenceCounter::as_ptr(&handle), before);
        assert_eq!(handle.leaf_slice(), &[1, 2]);
    }

    #[rstest]
    fn test_ensure_editable_rejects_foreign_tokens() {
        let first = EditToken::fresh();
        let second = EditToken::fresh();
        let mut handle =
            ReferenceCounter::new(Node::<i32, 2, 2>::leaf(vec![1]).stamped(first));
        let before = ReferenceCounter::as_ptr(&handle);

        ensure_editable(&mut handle, second).leaf_mut().push(2);

        assert_ne!(ReferenceCounter::as_ptr(&handle), before);
        assert_eq!(handle.ownee(), Some(second));
    }
}
