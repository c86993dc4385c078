//! The RRB-tree façade: `(size, shift, root, tail)` plus the persistent
//! operations over it.
//!
//! The root owns the body, the first `tail_offset` elements; the tail is a
//! leaf buffer holding the rest. The empty tree is an empty regular root at
//! `shift == BL` with an empty tail.

use crate::ReferenceCounter;
use crate::node::{Kind, Node, NodeRef, branches, mask, regular_child_count};
use crate::operations::{
    ChunkVisitor, ConcatFrame, PushTailVisitor, SliceLeftVisitor, SliceRightVisitor,
    UpdateVisitor, concat_trees,
};
use crate::position::{LeafPos, RegularPos, RelaxedPos, Visitor, visit_maybe_relaxed_sub};

pub(crate) struct Tree<T, const B: usize, const BL: usize> {
    pub(crate) size: usize,
    pub(crate) shift: usize,
    pub(crate) root: NodeRef<T, B, BL>,
    pub(crate) tail: NodeRef<T, B, BL>,
}

impl<T, const B: usize, const BL: usize> Clone for Tree<T, B, BL> {
    fn clone(&self) -> Self {
        Tree {
            size: self.size,
            shift: self.shift,
            root: self.root.clone(),
            tail: self.tail.clone(),
        }
    }
}

pub(crate) fn empty_root<T, const B: usize, const BL: usize>() -> NodeRef<T, B, BL> {
    ReferenceCounter::new(Node::inner(Vec::new()))
}

pub(crate) fn empty_tail<T, const B: usize, const BL: usize>() -> NodeRef<T, B, BL> {
    ReferenceCounter::new(Node::leaf(Vec::new()))
}

/// First index held by the tail of a tree with this root and size.
pub(crate) fn tail_offset_of<T, const B: usize, const BL: usize>(
    root: &NodeRef<T, B, BL>,
    size: usize,
) -> usize {
    match root.relaxed_parts() {
        Some((_, sizes)) => sizes.last().copied().unwrap_or(0),
        None => {
            if size == 0 {
                0
            } else {
                (size - 1) & !mask(BL)
            }
        }
    }
}

/// Walks a tree body to the element at `index`.
pub(crate) fn lookup<'a, T, const B: usize, const BL: usize>(
    root: &'a NodeRef<T, B, BL>,
    shift: usize,
    index: usize,
) -> &'a T {
    let mut node = root;
    let mut shift = shift;
    let mut remaining = index;
    loop {
        match node.kind() {
            Kind::Leaf(elements) => return &elements[remaining],
            Kind::Inner(children) => {
                let child_index = remaining >> shift;
                remaining -= child_index << shift;
                node = &children[child_index];
            }
            Kind::Relaxed { children, sizes } => {
                let mut child_index = remaining >> shift;
                while sizes[child_index] <= remaining {
                    child_index += 1;
                }
                if child_index > 0 {
                    remaining -= sizes[child_index - 1];
                }
                node = &children[child_index];
            }
        }
        if shift > BL {
            shift -= B;
        }
    }
}

impl<T, const B: usize, const BL: usize> Tree<T, B, BL> {
    pub(crate) fn empty() -> Self {
        Tree {
            size: 0,
            shift: BL,
            root: empty_root(),
            tail: empty_tail(),
        }
    }

    /// First index held by the tail; everything before it lives in the root.
    pub(crate) fn tail_offset(&self) -> usize {
        tail_offset_of(&self.root, self.size)
    }

    pub(crate) fn tail_size(&self) -> usize {
        self.size - self.tail_offset()
    }

    /// Element at `index`; the caller has already bounds-checked.
    pub(crate) fn get(&self, index: usize) -> &T {
        debug_assert!(index < self.size);
        let tail_offset = self.tail_offset();
        if index >= tail_offset {
            &self.tail.leaf_slice()[index - tail_offset]
        } else {
            lookup(&self.root, self.shift, index)
        }
    }

    /// The leaf chunk containing `index` together with its base index.
    pub(crate) fn array_for(&self, index: usize) -> (&[T], usize) {
        debug_assert!(index < self.size);
        let tail_offset = self.tail_offset();
        if index >= tail_offset {
            return (self.tail.leaf_slice(), tail_offset);
        }
        let mut node = &self.root;
        let mut shift = self.shift;
        let mut remaining = index;
        loop {
            match node.kind() {
                Kind::Leaf(elements) => return (elements, index - remaining),
                Kind::Inner(children) => {
                    let child_index = remaining >> shift;
                    remaining -= child_index << shift;
                    node = &children[child_index];
                }
                Kind::Relaxed { children, sizes } => {
                    let mut child_index = remaining >> shift;
                    while sizes[child_index] <= remaining {
                        child_index += 1;
                    }
                    if child_index > 0 {
                        remaining -= sizes[child_index - 1];
                    }
                    node = &children[child_index];
                }
            }
            if shift > BL {
                shift -= B;
            }
        }
    }

    /// Invokes `function` once per leaf range, front to back.
    pub(crate) fn for_each_chunk<F>(&self, mut function: F)
    where
        F: FnMut(&[T]),
    {
        let tail_offset = self.tail_offset();
        if tail_offset > 0 {
            let mut visitor = ChunkVisitor {
                function: &mut function,
            };
            visit_maybe_relaxed_sub(&self.root, self.shift, tail_offset, &mut visitor, 0);
        }
        let tail = self.tail.leaf_slice();
        if !tail.is_empty() {
            function(tail);
        }
    }
}

impl<T: Clone, const B: usize, const BL: usize> Tree<T, B, BL> {
    pub(crate) fn push_back(&self, value: T) -> Self {
        let tail_size = self.tail_size();
        if tail_size < branches(BL) {
            let mut elements = Vec::with_capacity(tail_size + 1);
            elements.extend_from_slice(self.tail.leaf_slice());
            elements.push(value);
            Tree {
                size: self.size + 1,
                shift: self.shift,
                root: self.root.clone(),
                tail: ReferenceCounter::new(Node::leaf(elements)),
            }
        } else {
            let (shift, root) = self.push_tail();
            Tree {
                size: self.size + 1,
                shift,
                root,
                tail: ReferenceCounter::new(Node::leaf(vec![value])),
            }
        }
    }

    /// Installs the current tail into the root, growing the tree by a level
    /// when the root is out of room. Returns the new `(shift, root)`.
    pub(crate) fn push_tail(&self) -> (usize, NodeRef<T, B, BL>) {
        let tail_offset = self.tail_offset();
        let tail_size = self.size - tail_offset;
        if self.root.is_relaxed() {
            let mut visitor = PushTailVisitor::new(self.tail.clone(), tail_size);
            let position = RelaxedPos {
                node: &self.root,
                shift: self.shift,
            };
            match visitor.visit_relaxed(position, 0) {
                Some(root) => (self.shift, root),
                None => {
                    let path = Node::make_path(self.shift, self.tail.clone(), None);
                    let children = vec![self.root.clone(), path];
                    let sizes = vec![tail_offset, tail_offset + tail_size];
                    (
                        self.shift + B,
                        ReferenceCounter::new(Node::relaxed(children, sizes)),
                    )
                }
            }
        } else if tail_offset == branches(B) << self.shift {
            let path = Node::make_path(self.shift, self.tail.clone(), None);
            (
                self.shift + B,
                ReferenceCounter::new(Node::inner(vec![self.root.clone(), path])),
            )
        } else if tail_offset > 0 {
            let mut visitor = PushTailVisitor::new(self.tail.clone(), tail_size);
            let position = RegularPos {
                node: &self.root,
                shift: self.shift,
                size: tail_offset,
            };
            match visitor.visit_regular(position, 0) {
                Some(root) => (self.shift, root),
                None => unreachable!("regular root with spare capacity"),
            }
        } else {
            (self.shift, Node::make_path(self.shift, self.tail.clone(), None))
        }
    }

    /// Rebuilds the path to `index`, applying `function` to the element.
    pub(crate) fn try_update_with<F, E>(&self, index: usize, function: F) -> Result<Self, E>
    where
        F: FnOnce(&T) -> Result<T, E>,
    {
        debug_assert!(index < self.size);
        let tail_offset = self.tail_offset();
        let mut visitor = UpdateVisitor::new(function);
        if index >= tail_offset {
            let position = LeafPos {
                node: &self.tail,
                count: self.size - tail_offset,
            };
            let tail = visitor.visit_leaf(position, index - tail_offset)?;
            Ok(Tree {
                size: self.size,
                shift: self.shift,
                root: self.root.clone(),
                tail,
            })
        } else {
            let root =
                visit_maybe_relaxed_sub(&self.root, self.shift, tail_offset, &mut visitor, index)?;
            Ok(Tree {
                size: self.size,
                shift: self.shift,
                root,
                tail: self.tail.clone(),
            })
        }
    }

    /// Prefix of length `new_size`; the caller clamps.
    pub(crate) fn take(&self, new_size: usize) -> Self {
        if new_size == 0 {
            return Tree::empty();
        }
        if new_size >= self.size {
            return self.clone();
        }
        let tail_offset = self.tail_offset();
        if new_size > tail_offset {
            let kept = &self.tail.leaf_slice()[..new_size - tail_offset];
            return Tree {
                size: new_size,
                shift: self.shift,
                root: self.root.clone(),
                tail: ReferenceCounter::new(Node::leaf(kept.to_vec())),
            };
        }
        let last = new_size - 1;
        let mut visitor = SliceRightVisitor { collapse: true };
        let (shift, root, _tail_size, tail) =
            visit_maybe_relaxed_sub(&self.root, self.shift, tail_offset, &mut visitor, last);
        match root {
            Some(root) => Tree {
                size: new_size,
                shift,
                root,
                tail,
            },
            None => Tree {
                size: new_size,
                shift: BL,
                root: empty_root(),
                tail,
            },
        }
    }

    /// Suffix after dropping `count` elements; the caller clamps.
    pub(crate) fn skip(&self, count: usize) -> Self {
        if count == 0 {
            return self.clone();
        }
        if count >= self.size {
            return Tree::empty();
        }
        let tail_offset = self.tail_offset();
        if count == tail_offset {
            return Tree {
                size: self.size - count,
                shift: BL,
                root: empty_root(),
                tail: self.tail.clone(),
            };
        }
        if count > tail_offset {
            let kept = &self.tail.leaf_slice()[count - tail_offset..];
            return Tree {
                size: self.size - count,
                shift: BL,
                root: empty_root(),
                tail: ReferenceCounter::new(Node::leaf(kept.to_vec())),
            };
        }
        let mut visitor = SliceLeftVisitor { collapse: true };
        let (shift, root) =
            visit_maybe_relaxed_sub(&self.root, self.shift, tail_offset, &mut visitor, count);
        Tree {
            size: self.size - count,
            shift,
            root,
            tail: self.tail.clone(),
        }
    }

    pub(crate) fn concat(&self, other: &Self) -> Self {
        if self.size == 0 {
            return other.clone();
        }
        if other.size == 0 {
            return self.clone();
        }
        let tail_offset = self.tail_offset();
        let tail_size = self.size - tail_offset;
        let other_tail_offset = other.tail_offset();

        if other_tail_offset == 0 {
            // the right side is tail-only: merge at the tail
            let other_size = other.size;
            if tail_size == branches(BL) {
                let (shift, root) = self.push_tail();
                return Tree {
                    size: self.size + other_size,
                    shift,
                    root,
                    tail: other.tail.clone(),
                };
            }
            if tail_size + other_size <= branches(BL) {
                let mut elements = Vec::with_capacity(tail_size + other_size);
                elements.extend_from_slice(self.tail.leaf_slice());
                elements.extend_from_slice(other.tail.leaf_slice());
                return Tree {
                    size: self.size + other_size,
                    shift: self.shift,
                    root: self.root.clone(),
                    tail: ReferenceCounter::new(Node::leaf(elements)),
                };
            }
            // fill our tail to capacity, push it, and keep the remainder
            let remaining = branches(BL) - tail_size;
            let mut filled = Vec::with_capacity(branches(BL));
            filled.extend_from_slice(self.tail.leaf_slice());
            filled.extend_from_slice(&other.tail.leaf_slice()[..remaining]);
            let new_tail = other.tail.leaf_slice()[remaining..].to_vec();
            let filled_tree = Tree {
                size: tail_offset + branches(BL),
                shift: self.shift,
                root: self.root.clone(),
                tail: ReferenceCounter::new(Node::leaf(filled)),
            };
            let (shift, root) = filled_tree.push_tail();
            return Tree {
                size: self.size + other_size,
                shift,
                root,
                tail: ReferenceCounter::new(Node::leaf(new_tail)),
            };
        }

        // general case: join the bodies, threading our tail down to the
        // boundary; the other tail survives as the final tail
        let right = ConcatFrame::Tree {
            node: &other.root,
            shift: other.shift,
            size: other_tail_offset,
        };
        let (shift, root) = if tail_offset == 0 {
            let left = ConcatFrame::TailOnly {
                leaf: &self.tail,
                count: tail_size,
            };
            concat_trees(left, None, right)
        } else {
            let left = ConcatFrame::Tree {
                node: &self.root,
                shift: self.shift,
                size: tail_offset,
            };
            concat_trees(left, Some((&self.tail, tail_size)), right)
        };
        Tree {
            size: self.size + other.size,
            shift,
            root,
            tail: other.tail.clone(),
        }
    }
}

// =============================================================================
// Invariant Checking
// =============================================================================

impl<T, const B: usize, const BL: usize> Tree<T, B, BL> {
    /// Structural validation, used by `debug_assert!` and the test suite.
    pub(crate) fn check(&self) -> bool {
        if self.shift < BL {
            return false;
        }
        let tail_offset = self.tail_offset();
        if tail_offset > self.size {
            return false;
        }
        let tail_size = self.size - tail_offset;
        if tail_size > branches(BL) {
            return false;
        }
        if self.size > 0 && tail_size == 0 {
            return false;
        }
        if self.tail.leaf_slice().len() != tail_size {
            return false;
        }
        if tail_offset == 0 {
            return self.shift == BL && self.root.children().is_empty();
        }
        check_node(&self.root, self.shift, tail_offset)
    }
}

fn check_node<T, const B: usize, const BL: usize>(
    node: &NodeRef<T, B, BL>,
    shift: usize,
    size: usize,
) -> bool {
    if size == 0 {
        return false;
    }
    match node.kind() {
        Kind::Leaf(_) => false,
        Kind::Inner(children) => {
            let count = regular_child_count(shift, size);
            if children.len() != count {
                return false;
            }
            children.iter().enumerate().all(|(child_index, child)| {
                let child_size = if child_index == count - 1 {
                    size - (child_index << shift)
                } else {
                    1 << shift
                };
                check_child(child, shift, child_size)
            })
        }
        Kind::Relaxed { children, sizes } => {
            if children.len() != sizes.len() || children.is_empty() {
                return false;
            }
            if sizes.last() != Some(&size) {
                return false;
            }
            if !sizes.windows(2).all(|pair| pair[0] < pair[1]) {
                return false;
            }
            children.iter().enumerate().all(|(child_index, child)| {
                let before = if child_index == 0 {
                    0
                } else {
                    sizes[child_index - 1]
                };
                check_child(child, shift, sizes[child_index] - before)
            })
        }
    }
}

fn check_child<T, const B: usize, const BL: usize>(
    child: &NodeRef<T, B, BL>,
    parent_shift: usize,
    child_size: usize,
) -> bool {
    if parent_shift == BL {
        matches!(child.kind(), Kind::Leaf(elements)
            if elements.len() == child_size && child_size <= branches(BL))
    } else {
        check_node(child, parent_shift - B, child_size)
    }
}

// =============================================================================
// Tests
// =============================================================================
