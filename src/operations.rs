//! The structural operations: update, push-tail, the two slices, chunked
//! traversal, and concatenation with its rebalancing plan.
//!
//! Every operation builds fresh nodes and adopts reused children by
//! reference; nothing mutates shared state, so an early return (including a
//! `?` on a failed element function) releases exactly the nodes built so
//! far.

use std::marker::PhantomData;

use smallvec::SmallVec;

use crate::ReferenceCounter;
use crate::node::{Node, NodeRef, branches, regular_child_count};
use crate::position::{
    InnerPosition, LeafPos, RegularPos, RelaxedPos, Visitor, visit_maybe_relaxed_sub,
};

// =============================================================================
// Update
// =============================================================================

/// Rebuilds the path from the root to the element at the target index,
/// applying a fallible function to the element at the leaf. Infallible
/// callers instantiate the error as [`std::convert::Infallible`].
pub(crate) struct UpdateVisitor<F, E> {
    function: Option<F>,
    _error: PhantomData<fn() -> E>,
}

impl<F, E> UpdateVisitor<F, E> {
    pub(crate) fn new(function: F) -> Self {
        UpdateVisitor {
            function: Some(function),
            _error: PhantomData,
        }
    }
}

impl<T, const B: usize, const BL: usize, F, E> Visitor<T, B, BL> for UpdateVisitor<F, E>
where
    T: Clone,
    F: FnOnce(&T) -> Result<T, E>,
{
    type Output = Result<NodeRef<T, B, BL>, E>;

    fn visit_regular(
        &mut self,
        position: RegularPos<'_, T, B, BL>,
        index: usize,
    ) -> Self::Output {
        let child_index = position.index_for(index);
        let replacement = position.towards_child(self, index, child_index)?;
        let mut children = position.node.children().to_vec();
        children[child_index] = replacement;
        Ok(ReferenceCounter::new(Node::inner(children)))
    }

    fn visit_relaxed(
        &mut self,
        position: RelaxedPos<'_, T, B, BL>,
        index: usize,
    ) -> Self::Output {
        let child_index = position.index_for(index);
        let replacement = position.towards_child(self, index, child_index)?;
        let (source_children, source_sizes) = match position.node.relaxed_parts() {
            Some(parts) => parts,
            None => unreachable!("relaxed visit over a regular node"),
        };
        let mut children = source_children.to_vec();
        children[child_index] = replacement;
        Ok(ReferenceCounter::new(Node::relaxed(
            children,
            source_sizes.to_vec(),
        )))
    }

    fn visit_leaf(&mut self, position: LeafPos<'_, T, B, BL>, index: usize) -> Self::Output {
        let mut elements = position.node.leaf_slice().to_vec();
        let function = match self.function.take() {
            Some(function) => function,
            None => unreachable!("update reaches exactly one leaf"),
        };
        elements[index] = function(&elements[index])?;
        Ok(ReferenceCounter::new(Node::leaf(elements)))
    }
}

// =============================================================================
// Push Tail
// =============================================================================

/// Installs a full tail leaf as the new rightmost spine of a subtree.
/// Produces `None` when the subtree has no room, in which case the caller
/// grows the tree by a level.
pub(crate) struct PushTailVisitor<T, const B: usize, const BL: usize> {
    tail: NodeRef<T, B, BL>,
    tail_size: usize,
}

impl<T, const B: usize, const BL: usize> PushTailVisitor<T, B, BL> {
    pub(crate) fn new(tail: NodeRef<T, B, BL>, tail_size: usize) -> Self {
        PushTailVisitor { tail, tail_size }
    }

    /// The child to install under a node at `shift`: the tail itself at the
    /// bottom level, otherwise a fresh single-child spine down to it.
    fn spine_child(&self, shift: usize) -> NodeRef<T, B, BL> {
        Node::make_child(shift, self.tail.clone(), None)
    }
}

impl<T, const B: usize, const BL: usize> Visitor<T, B, BL> for PushTailVisitor<T, B, BL> {
    type Output = Option<NodeRef<T, B, BL>>;

    fn visit_regular(
        &mut self,
        position: RegularPos<'_, T, B, BL>,
        _index: usize,
    ) -> Self::Output {
        debug_assert_eq!(position.size % branches(BL), 0);
        let shift = position.shift;
        let last_index = position.index_for(position.size - 1);
        let new_index = position.index_for(position.size + branches(BL) - 1);

        let new_child = if last_index == new_index {
            // room below: extend the spine inside the last child
            let child = &position.node.children()[last_index];
            let child_size = position.child_size(last_index);
            match visit_maybe_relaxed_sub(child, shift - B, child_size, self, 0) {
                Some(created) => created,
                None => unreachable!("regular subtree has room on its spine"),
            }
        } else {
            self.spine_child(shift)
        };

        let mut children = position.node.children()[..new_index].to_vec();
        children.push(new_child);
        Some(ReferenceCounter::new(Node::inner(children)))
    }

    fn visit_relaxed(
        &mut self,
        position: RelaxedPos<'_, T, B, BL>,
        _index: usize,
    ) -> Self::Output {
        let shift = position.shift;
        let last_index = position.count() - 1;
        let child_size = position.child_size(last_index);
        let child_full = child_size == 1 << shift;
        let mut new_index = if child_full || shift == BL {
            last_index + 1
        } else {
            last_index
        };
        if new_index >= branches(B) {
            return None;
        }

        let new_child;
        if new_index == last_index {
            let child = &position.node.children()[last_index];
            if let Some(created) =
                visit_maybe_relaxed_sub(child, shift - B, child_size, self, 0)
            {
                new_child = created;
            } else if last_index + 1 < branches(B) {
                // the last child is out of room: open the next slot instead
                new_index = last_index + 1;
                new_child = self.spine_child(shift);
            } else {
                return None;
            }
        } else {
            new_child = self.spine_child(shift);
        }

        let (source_children, source_sizes) = match position.node.relaxed_parts() {
            Some(parts) => parts,
            None => unreachable!("relaxed visit over a regular node"),
        };
        let mut children = source_children[..new_index].to_vec();
        children.push(new_child);
        let mut sizes = source_sizes[..new_index].to_vec();
        sizes.push(position.size() + self.tail_size);
        Some(ReferenceCounter::new(Node::relaxed(children, sizes)))
    }

    fn visit_leaf(&mut self, _position: LeafPos<'_, T, B, BL>, _index: usize) -> Self::Output {
        unreachable!("push-tail descends inner nodes only")
    }
}

// =============================================================================
// Slice Right (take)
// =============================================================================

/// New shift, surviving subtree (if any), carved tail size, carved tail.
pub(crate) type SliceRight<T, const B: usize, const BL: usize> =
    (usize, Option<NodeRef<T, B, BL>>, usize, NodeRef<T, B, BL>);

/// Truncates a subtree after the element at the target index, carving the
/// containing leaf out as the new tail. `collapse` is enabled along the
/// outermost spine only: a node left with a single child there gives way to
/// the child and the tree loses a level.
pub(crate) struct SliceRightVisitor {
    pub(crate) collapse: bool,
}

impl<T, const B: usize, const BL: usize> Visitor<T, B, BL> for SliceRightVisitor
where
    T: Clone,
{
    type Output = SliceRight<T, B, BL>;

    fn visit_regular(
        &mut self,
        position: RegularPos<'_, T, B, BL>,
        last: usize,
    ) -> Self::Output {
        let child_index = position.index_for(last);
        if self.collapse && child_index == 0 {
            return position.towards_child(self, last, 0);
        }

        let mut sub_visitor = SliceRightVisitor { collapse: false };
        let (_, next, tail_size, tail) =
            position.towards_child(&mut sub_visitor, last, child_index);
        match next {
            Some(next) => {
                let mut children = position.node.children()[..child_index].to_vec();
                children.push(next);
                (
                    position.shift,
                    Some(ReferenceCounter::new(Node::inner(children))),
                    tail_size,
                    tail,
                )
            }
            None if child_index == 0 => (position.shift, None, tail_size, tail),
            None if self.collapse && child_index == 1 && position.shift > BL => (
                position.shift - B,
                Some(position.node.children()[0].clone()),
                tail_size,
                tail,
            ),
            None => {
                let children = position.node.children()[..child_index].to_vec();
                (
                    position.shift,
                    Some(ReferenceCounter::new(Node::inner(children))),
                    tail_size,
                    tail,
                )
            }
        }
    }

    fn visit_relaxed(
        &mut self,
        position: RelaxedPos<'_, T, B, BL>,
        last: usize,
    ) -> Self::Output {
        let child_index = position.index_for(last);
        if self.collapse && child_index == 0 {
            return position.towards_child(self, last, 0);
        }

        let mut sub_visitor = SliceRightVisitor { collapse: false };
        let (_, next, tail_size, tail) =
            position.towards_child(&mut sub_visitor, last, child_index);
        let (source_children, source_sizes) = match position.node.relaxed_parts() {
            Some(parts) => parts,
            None => unreachable!("relaxed visit over a regular node"),
        };
        match next {
            Some(next) => {
                let mut children = source_children[..child_index].to_vec();
                children.push(next);
                let mut sizes = source_sizes[..child_index].to_vec();
                sizes.push(last + 1 - tail_size);
                (
                    position.shift,
                    Some(ReferenceCounter::new(Node::relaxed(children, sizes))),
                    tail_size,
                    tail,
                )
            }
            None if child_index == 0 => (position.shift, None, tail_size, tail),
            None if self.collapse && child_index == 1 && position.shift > BL => (
                position.shift - B,
                Some(source_children[0].clone()),
                tail_size,
                tail,
            ),
            None => {
                let children = source_children[..child_index].to_vec();
                let sizes = source_sizes[..child_index].to_vec();
                (
                    position.shift,
                    Some(ReferenceCounter::new(Node::relaxed(children, sizes))),
                    tail_size,
                    tail,
                )
            }
        }
    }

    fn visit_leaf(&mut self, position: LeafPos<'_, T, B, BL>, last: usize) -> Self::Output {
        let new_tail_size = last + 1;
        let tail = if new_tail_size == position.count {
            position.node.clone()
        } else {
            ReferenceCounter::new(Node::leaf(
                position.node.leaf_slice()[..new_tail_size].to_vec(),
            ))
        };
        (0, None, new_tail_size, tail)
    }
}

// =============================================================================
// Slice Left (skip)
// =============================================================================

/// Drops every element before the target index. The rebuilt spine is always
/// relaxed: its leftmost child is partial, and a previously regular node
/// gains a freshly built size table.
pub(crate) struct SliceLeftVisitor {
    pub(crate) collapse: bool,
}

fn slice_left_inner<'a, T, const B: usize, const BL: usize, P>(
    visitor: &mut SliceLeftVisitor,
    position: &P,
    first: usize,
) -> (usize, NodeRef<T, B, BL>)
where
    T: Clone + 'a,
    P: InnerPosition<'a, T, B, BL>,
{
    let count = position.count();
    let child_index = position.index_for(first);
    if visitor.collapse && position.shift() > BL && child_index == count - 1 {
        // everything but the last child is dropped; collapse into it
        return position.towards_child(visitor, first, child_index);
    }

    let mut sub_visitor = SliceLeftVisitor { collapse: false };
    let (_, new_child) = position.towards_child(&mut sub_visitor, first, child_index);
    let dropped_in_child = first - position.size_before(child_index);
    let new_child_size = position.child_size(child_index) - dropped_in_child;

    let mut children = Vec::with_capacity(count - child_index);
    children.push(new_child);
    children.extend_from_slice(&position.node().children()[child_index + 1..]);
    let mut sizes = Vec::with_capacity(count - child_index);
    sizes.push(new_child_size);
    position.copy_sizes(
        child_index + 1,
        count - child_index - 1,
        new_child_size,
        &mut sizes,
    );
    (
        position.shift(),
        ReferenceCounter::new(Node::relaxed(children, sizes)),
    )
}

impl<T, const B: usize, const BL: usize> Visitor<T, B, BL> for SliceLeftVisitor
where
    T: Clone,
{
    type Output = (usize, NodeRef<T, B, BL>);

    fn visit_regular(
        &mut self,
        position: RegularPos<'_, T, B, BL>,
        first: usize,
    ) -> Self::Output {
        slice_left_inner(self, &position, first)
    }

    fn visit_relaxed(
        &mut self,
        position: RelaxedPos<'_, T, B, BL>,
        first: usize,
    ) -> Self::Output {
        slice_left_inner(self, &position, first)
    }

    fn visit_leaf(&mut self, position: LeafPos<'_, T, B, BL>, first: usize) -> Self::Output {
        let elements = position.node.leaf_slice()[first..position.count].to_vec();
        (0, ReferenceCounter::new(Node::leaf(elements)))
    }
}

// =============================================================================
// Chunked Traversal
// =============================================================================

/// Calls the wrapped function once per leaf range, in order.
pub(crate) struct ChunkVisitor<'f, F> {
    pub(crate) function: &'f mut F,
}

impl<T, const B: usize, const BL: usize, F> Visitor<T, B, BL> for ChunkVisitor<'_, F>
where
    F: FnMut(&[T]),
{
    type Output = ();

    fn visit_regular(&mut self, position: RegularPos<'_, T, B, BL>, _index: usize) {
        position.each(self);
    }

    fn visit_relaxed(&mut self, position: RelaxedPos<'_, T, B, BL>, _index: usize) {
        position.each(self);
    }

    fn visit_leaf(&mut self, position: LeafPos<'_, T, B, BL>, _index: usize) {
        (self.function)(&position.node.leaf_slice()[..position.count]);
    }
}

// =============================================================================
// Concatenation
// =============================================================================

/// One operand subtree of a concatenation: either a real tree body, or the
/// virtual single-child parent of a tail when the left tree is tail-only.
pub(crate) enum ConcatFrame<'a, T, const B: usize, const BL: usize> {
    Tree {
        node: &'a NodeRef<T, B, BL>,
        shift: usize,
        size: usize,
    },
    TailOnly {
        leaf: &'a NodeRef<T, B, BL>,
        count: usize,
    },
}

impl<T, const B: usize, const BL: usize> Clone for ConcatFrame<'_, T, B, BL> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, const B: usize, const BL: usize> Copy for ConcatFrame<'_, T, B, BL> {}

impl<'a, T, const B: usize, const BL: usize> ConcatFrame<'a, T, B, BL> {
    fn shift(&self) -> usize {
        match self {
            ConcatFrame::Tree { shift, .. } => *shift,
            ConcatFrame::TailOnly { .. } => BL,
        }
    }

    /// Children with their subtree sizes, in order.
    fn child_entries(&self) -> Vec<(NodeRef<T, B, BL>, usize)> {
        match self {
            ConcatFrame::Tree { node, shift, size } => child_entries(node, *shift, *size),
            ConcatFrame::TailOnly { leaf, count } => vec![((*leaf).clone(), *count)],
        }
    }

    fn last_child(&self) -> (NodeRef<T, B, BL>, usize) {
        match self {
            ConcatFrame::Tree { node, shift, size } => {
                let count = frame_child_count(node, *shift, *size);
                (
                    node.children()[count - 1].clone(),
                    child_size_of(node, *shift, *size, count - 1),
                )
            }
            ConcatFrame::TailOnly { leaf, count } => ((*leaf).clone(), *count),
        }
    }

    fn first_child(&self) -> (NodeRef<T, B, BL>, usize) {
        match self {
            ConcatFrame::Tree { node, shift, size } => {
                (node.children()[0].clone(), child_size_of(node, *shift, *size, 0))
            }
            ConcatFrame::TailOnly { leaf, count } => ((*leaf).clone(), *count),
        }
    }
}

fn frame_child_count<T, const B: usize, const BL: usize>(
    node: &NodeRef<T, B, BL>,
    shift: usize,
    size: usize,
) -> usize {
    match node.relaxed_parts() {
        Some((children, _)) => children.len(),
        None => regular_child_count(shift, size),
    }
}

pub(crate) fn child_size_of<T, const B: usize, const BL: usize>(
    node: &NodeRef<T, B, BL>,
    shift: usize,
    size: usize,
    child_index: usize,
) -> usize {
    match node.relaxed_parts() {
        Some((_, sizes)) => {
            let before = if child_index == 0 {
                0
            } else {
                sizes[child_index - 1]
            };
            sizes[child_index] - before
        }
        None => {
            let count = regular_child_count(shift, size);
            if child_index == count - 1 {
                size - (child_index << shift)
            } else {
                1 << shift
            }
        }
    }
}

/// Children of a maybe-relaxed inner node together with their sizes.
fn child_entries<T, const B: usize, const BL: usize>(
    node: &NodeRef<T, B, BL>,
    shift: usize,
    size: usize,
) -> Vec<(NodeRef<T, B, BL>, usize)> {
    let count = frame_child_count(node, shift, size);
    (0..count)
        .map(|child_index| {
            (
                node.children()[child_index].clone(),
                child_size_of(node, shift, size, child_index),
            )
        })
        .collect()
}

/// Concat center: one to three sibling nodes at `shift - B` awaiting a
/// parent, carried with their subtree sizes.
pub(crate) struct Center<T, const B: usize, const BL: usize> {
    shift: usize,
    nodes: SmallVec<[(NodeRef<T, B, BL>, usize); 3]>,
}

/// Concatenates two tree bodies, threading the left tail down to the leaf
/// level, and returns the realized `(shift, root)` of the joined body.
pub(crate) fn concat_trees<T, const B: usize, const BL: usize>(
    left: ConcatFrame<'_, T, B, BL>,
    left_tail: Option<(&NodeRef<T, B, BL>, usize)>,
    right: ConcatFrame<'_, T, B, BL>,
) -> (usize, NodeRef<T, B, BL>)
where
    T: Clone,
{
    realize(concat_inners(left, left_tail, right))
}

fn concat_inners<T, const B: usize, const BL: usize>(
    left: ConcatFrame<'_, T, B, BL>,
    left_tail: Option<(&NodeRef<T, B, BL>, usize)>,
    right: ConcatFrame<'_, T, B, BL>,
) -> Center<T, B, BL>
where
    T: Clone,
{
    let left_shift = left.shift();
    let right_shift = right.shift();
    if left_shift > right_shift {
        let (child, child_size) = left.last_child();
        let center = concat_inners(
            ConcatFrame::Tree {
                node: &child,
                shift: left_shift - B,
                size: child_size,
            },
            left_tail,
            right,
        );
        rebalance(Some(left), center, None)
    } else if left_shift < right_shift {
        let (child, child_size) = right.first_child();
        let center = concat_inners(
            left,
            left_tail,
            ConcatFrame::Tree {
                node: &child,
                shift: right_shift - B,
                size: child_size,
            },
        );
        rebalance(None, center, Some(right))
    } else if left_shift == BL {
        // both sides bottomed out: the center is the boundary leaves with
        // the pending left tail between them
        let (left_leaf, left_count) = left.last_child();
        let (right_leaf, right_count) = right.first_child();
        let mut nodes = SmallVec::new();
        nodes.push((left_leaf, left_count));
        if let Some((tail, tail_count)) = left_tail {
            nodes.push((tail.clone(), tail_count));
        }
        nodes.push((right_leaf, right_count));
        rebalance(
            Some(left),
            Center { shift: BL, nodes },
            Some(right),
        )
    } else {
        let (left_child, left_size) = left.last_child();
        let (right_child, right_size) = right.first_child();
        let center = concat_inners(
            ConcatFrame::Tree {
                node: &left_child,
                shift: left_shift - B,
                size: left_size,
            },
            left_tail,
            ConcatFrame::Tree {
                node: &right_child,
                shift: right_shift - B,
                size: right_size,
            },
        );
        rebalance(Some(left), center, Some(right))
    }
}

/// Rebalances one level of a concatenation: the sources are the left
/// frame's children minus its last, the center nodes, and the right frame's
/// children minus its first. The RRB-shuffle plans the target arities, the
/// merger regroups, and the result is the center for the level above.
fn rebalance<T, const B: usize, const BL: usize>(
    left: Option<ConcatFrame<'_, T, B, BL>>,
    center: Center<T, B, BL>,
    right: Option<ConcatFrame<'_, T, B, BL>>,
) -> Center<T, B, BL>
where
    T: Clone,
{
    let shift = center.shift;
    let leaf_level = shift == BL;

    let mut sources: Vec<(NodeRef<T, B, BL>, usize)> = Vec::new();
    if let Some(frame) = left {
        let mut entries = frame.child_entries();
        entries.pop();
        sources.extend(entries);
    }
    sources.extend(center.nodes);
    if let Some(frame) = right {
        sources.extend(frame.child_entries().into_iter().skip(1));
    }

    let bits = if leaf_level { BL } else { B };
    let counts = sources
        .iter()
        .map(|(node, _)| {
            if leaf_level {
                node.leaf_slice().len()
            } else {
                node.children().len()
            }
        })
        .collect();
    let plan = shuffle_plan(counts, bits);

    let merged = if leaf_level {
        merge_leaves(&sources, &plan)
    } else {
        merge_inners(&sources, shift, &plan)
    };

    let mut nodes = SmallVec::new();
    for group in merged.chunks(branches(B)) {
        let mut children = Vec::with_capacity(group.len());
        let mut sizes = Vec::with_capacity(group.len());
        let mut accumulated = 0;
        for (node, size) in group {
            children.push(node.clone());
            accumulated += size;
            sizes.push(accumulated);
        }
        nodes.push((
            ReferenceCounter::new(Node::relaxed(children, sizes)),
            accumulated,
        ));
    }
    Center {
        shift: shift + B,
        nodes,
    }
}

/// The RRB-shuffle: while the plan has two entries more than the optimal
/// node count, drain the first under-full entry into its right neighbours
/// and drop the emptied slot.
fn shuffle_plan(
    mut counts: SmallVec<[usize; 16]>,
    bits: usize,
) -> SmallVec<[usize; 16]> {
    const EXTRAS: usize = 2;
    const INVARIANT: usize = 1;
    let branch_count = branches(bits);
    let total: usize = counts.iter().sum();
    let optimal = ((total - 1) >> bits) + 1;

    let mut index = 0;
    while counts.len() >= optimal + EXTRAS {
        while counts[index] > branch_count - INVARIANT {
            index += 1;
        }
        let mut remaining = counts[index];
        loop {
            let merged = (remaining + counts[index + 1]).min(branch_count);
            counts[index] = merged;
            remaining = remaining + counts[index + 1] - merged;
            index += 1;
            if remaining == 0 {
                break;
            }
        }
        counts.remove(index);
        index -= 1;
    }
    counts
}

/// Regroups source leaves to the planned arities. A leaf whose count
/// already matches its slot is adopted by reference.
fn merge_leaves<T, const B: usize, const BL: usize>(
    sources: &[(NodeRef<T, B, BL>, usize)],
    plan: &[usize],
) -> Vec<(NodeRef<T, B, BL>, usize)>
where
    T: Clone,
{
    let mut merged = Vec::with_capacity(plan.len());
    let mut cursor = 0;
    let mut buffer: Vec<T> = Vec::new();
    for (node, size) in sources {
        let elements = node.leaf_slice();
        if buffer.is_empty() && plan[cursor] == elements.len() {
            merged.push((node.clone(), *size));
            cursor += 1;
            continue;
        }
        for element in elements {
            if buffer.is_empty() {
                buffer.reserve(plan[cursor]);
            }
            buffer.push(element.clone());
            if buffer.len() == plan[cursor] {
                let count = buffer.len();
                merged.push((
                    ReferenceCounter::new(Node::leaf(std::mem::take(&mut buffer))),
                    count,
                ));
                cursor += 1;
            }
        }
    }
    debug_assert!(buffer.is_empty());
    debug_assert_eq!(cursor, plan.len());
    merged
}

/// Regroups the children of inner sources to the planned arities, building
/// fresh size tables; a source whose arity already matches is adopted.
fn merge_inners<T, const B: usize, const BL: usize>(
    sources: &[(NodeRef<T, B, BL>, usize)],
    shift: usize,
    plan: &[usize],
) -> Vec<(NodeRef<T, B, BL>, usize)> {
    let mut merged = Vec::with_capacity(plan.len());
    let mut cursor = 0;
    let mut children: Vec<NodeRef<T, B, BL>> = Vec::new();
    let mut sizes: Vec<usize> = Vec::new();
    for (node, size) in sources {
        if children.is_empty() && plan[cursor] == node.children().len() {
            merged.push((node.clone(), *size));
            cursor += 1;
            continue;
        }
        for (grandchild, grandchild_size) in child_entries(node, shift - B, *size) {
            children.push(grandchild);
            sizes.push(sizes.last().copied().unwrap_or(0) + grandchild_size);
            if children.len() == plan[cursor] {
                let merged_size = sizes[sizes.len() - 1];
                merged.push((
                    ReferenceCounter::new(Node::relaxed(
                        std::mem::take(&mut children),
                        std::mem::take(&mut sizes),
                    )),
                    merged_size,
                ));
                cursor += 1;
            }
        }
    }
    debug_assert!(children.is_empty());
    debug_assert_eq!(cursor, plan.len());
    merged
}

/// Turns the final center into a root: its sole node, or a fresh relaxed
/// parent over the two or three of them.
fn realize<T, const B: usize, const BL: usize>(
    center: Center<T, B, BL>,
) -> (usize, NodeRef<T, B, BL>) {
    if center.nodes.len() == 1 {
        let shift = center.shift - B;
        match center.nodes.into_iter().next() {
            Some((node, _)) => (shift, node),
            None => unreachable!(),
        }
    } else {
        let shift = center.shift;
        let mut children = Vec::with_capacity(center.nodes.len());
        let mut sizes = Vec::with_capacity(center.nodes.len());
        let mut accumulated = 0;
        for (node, size) in center.nodes {
            children.push(node);
            accumulated += size;
            sizes.push(accumulated);
        }
        (shift, ReferenceCounter::new(Node::relaxed(children, sizes)))
    }
}

// =============================================================================
// Tests
// =============================================================================
