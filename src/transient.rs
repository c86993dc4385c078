//! Transient (ephemerally mutable) companion of the persistent vector.
//!
//! A transient carries an edit token naming its session. Every mutating
//! operation descends from the root and, at each node, either mutates in
//! place (allowed only when the node's reference count is one *and* it is
//! stamped with this session's token) or copies the node, stamps the copy,
//! and continues into the copy. Nodes shared with persistent vectors
//! therefore become copy-on-first-touch, and converting in either direction
//! costs O(1).

use crate::ReferenceCounter;
use crate::node::{EditToken, Kind, Node, NodeRef, branches, ensure_editable};
use crate::operations::child_size_of;
use crate::tree::{Tree, empty_root, lookup, tail_offset_of};
use crate::vector::PersistentVector;

// =============================================================================
// TransientVector Definition
// =============================================================================

/// A mutable vector sharing structure with [`PersistentVector`] versions.
///
/// Obtained from [`PersistentVector::transient`] or built from scratch with
/// [`TransientVector::new`]; converted back with
/// [`persistent`](TransientVector::persistent), which consumes the transient
/// and with it the right to mutate. A transient is single-owner: it is not
/// meant to be shared, and batching mutations through one is the intended
/// use.
///
/// If a fallible operation returns an error, the transient's contents are
/// still intact, but callers following the portable contract should discard
/// it.
///
/// # Examples
///
/// ```rust
/// use flexvec::TransientVector;
///
/// let mut transient = TransientVector::<i32>::new();
/// for value in 0..100 {
///     transient.push_back(value);
/// }
/// let vector = transient.persistent();
///
/// assert_eq!(vector.len(), 100);
/// assert_eq!(vector.get(42), Some(&42));
/// ```
pub struct TransientVector<T, const B: usize = 5, const BL: usize = 5> {
    size: usize,
    shift: usize,
    root: NodeRef<T, B, BL>,
    tail: NodeRef<T, B, BL>,
    token: EditToken,
}

impl<T, const B: usize, const BL: usize> TransientVector<T, B, BL> {
    /// Creates a new empty transient vector.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::from_tree(Tree::empty())
    }

    pub(crate) fn from_tree(tree: Tree<T, B, BL>) -> Self {
        TransientVector {
            size: tree.size,
            shift: tree.shift,
            root: tree.root,
            tail: tree.tail,
            token: EditToken::fresh(),
        }
    }

    /// Converts this transient back into a persistent vector.
    ///
    /// O(1): the current state is returned as-is and the session token goes
    /// out of use, so no later transient can touch the returned nodes.
    #[must_use]
    pub fn persistent(self) -> PersistentVector<T, B, BL> {
        PersistentVector::from_tree(Tree {
            size: self.size,
            shift: self.shift,
            root: self.root,
            tail: self.tail,
        })
    }

    /// Returns the number of elements.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    /// Returns `true` if the vector contains no elements.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Returns a reference to the element at the given index, or `None` if
    /// out of bounds.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.size {
            return None;
        }
        let tail_offset = self.tail_offset();
        if index >= tail_offset {
            Some(&self.tail.leaf_slice()[index - tail_offset])
        } else {
            Some(lookup(&self.root, self.shift, index))
        }
    }

    fn tail_offset(&self) -> usize {
        tail_offset_of(&self.root, self.size)
    }
}

impl<T: Clone, const B: usize, const BL: usize> TransientVector<T, B, BL> {
    /// Appends an element in place.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flexvec::TransientVector;
    ///
    /// let mut transient = TransientVector::<i32>::new();
    /// transient.push_back(1);
    /// transient.push_back(2);
    /// assert_eq!(transient.len(), 2);
    /// assert_eq!(transient.get(1), Some(&2));
    /// ```
    pub fn push_back(&mut self, element: T) {
        let tail_offset = self.tail_offset();
        let tail_size = self.size - tail_offset;
        if tail_size < branches(BL) {
            ensure_editable(&mut self.tail, self.token)
                .leaf_mut()
                .push(element);
            self.size += 1;
            return;
        }
        let fresh_tail =
            ReferenceCounter::new(Node::leaf(vec![element]).stamped(self.token));
        let full_tail = std::mem::replace(&mut self.tail, fresh_tail);
        self.push_tail(full_tail, tail_size, tail_offset);
        self.size += 1;
    }

    /// Prepends an element in place.
    ///
    /// A singleton joined onto the front through the shared concatenation
    /// core, mirroring the persistent counterpart.
    pub fn push_front(&mut self, element: T) {
        let front = Tree::empty().push_back(element);
        let joined = front.concat(&self.current_tree());
        self.install(joined);
    }

    /// Removes and returns the last element, or `None` when empty.
    pub fn pop_back(&mut self) -> Option<T> {
        if self.size == 0 {
            return None;
        }
        let element = {
            let tail = self.tail.leaf_slice();
            tail[tail.len() - 1].clone()
        };
        self.take(self.size - 1);
        Some(element)
    }

    /// Replaces the element at the given index in place.
    ///
    /// Returns `false` when the index is out of bounds.
    pub fn update(&mut self, index: usize, element: T) -> bool {
        self.update_with(index, move |_| element)
    }

    /// Replaces the element at the given index with the result of applying
    /// `function` to it.
    ///
    /// Returns `false` when the index is out of bounds.
    pub fn update_with<F>(&mut self, index: usize, function: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        let result: Result<bool, std::convert::Infallible> =
            self.try_update_with(index, |element| Ok(function(element)));
        match result {
            Ok(updated) => updated,
            Err(never) => match never {},
        }
    }

    /// Fallible [`update_with`](Self::update_with).
    ///
    /// `function` is applied before anything is replaced, so on `Err` the
    /// contents are unchanged.
    ///
    /// # Errors
    ///
    /// Propagates whatever `function` returns.
    pub fn try_update_with<F, E>(&mut self, index: usize, function: F) -> Result<bool, E>
    where
        F: FnOnce(&T) -> Result<T, E>,
    {
        if index >= self.size {
            return Ok(false);
        }
        let tail_offset = self.tail_offset();
        if index >= tail_offset {
            let offset = index - tail_offset;
            let replacement = function(&self.tail.leaf_slice()[offset])?;
            ensure_editable(&mut self.tail, self.token).leaf_mut()[offset] = replacement;
        } else {
            update_node(&mut self.root, self.shift, index, function, self.token)?;
        }
        Ok(true)
    }

    /// Truncates to the first `count` elements. A `count` past the end
    /// leaves the vector unchanged.
    pub fn take(&mut self, count: usize) {
        if count >= self.size {
            return;
        }
        if count == 0 {
            self.clear();
            return;
        }
        let tail_offset = self.tail_offset();
        if count > tail_offset {
            ensure_editable(&mut self.tail, self.token)
                .leaf_mut()
                .truncate(count - tail_offset);
            self.size = count;
            return;
        }
        let (shift, kept, _tail_size, tail) =
            slice_right_node(&mut self.root, self.shift, count - 1, true, self.token);
        if kept {
            self.shift = shift;
        } else {
            self.shift = BL;
            self.root = empty_root();
        }
        self.tail = tail;
        self.size = count;
    }

    /// Drops the first `count` elements. A `count` past the end empties the
    /// vector.
    pub fn skip(&mut self, count: usize) {
        if count == 0 {
            return;
        }
        if count >= self.size {
            self.clear();
            return;
        }
        let tail_offset = self.tail_offset();
        if count == tail_offset {
            self.root = empty_root();
            self.shift = BL;
            self.size -= count;
            return;
        }
        if count > tail_offset {
            ensure_editable(&mut self.tail, self.token)
                .leaf_mut()
                .drain(..count - tail_offset);
            self.root = empty_root();
            self.shift = BL;
            self.size -= count;
            return;
        }
        self.shift = slice_left_node(
            &mut self.root,
            self.shift,
            tail_offset,
            count,
            true,
            self.token,
        );
        self.size -= count;
    }

    /// Appends the contents of a persistent vector.
    ///
    /// Shares subtrees with `other` wherever the rebalancing allows.
    pub fn append(&mut self, other: &PersistentVector<T, B, BL>) {
        let joined = self.current_tree().concat(&other.tree);
        self.install(joined);
    }

    /// The current state as a tree view; O(1) reference clones.
    fn current_tree(&self) -> Tree<T, B, BL> {
        Tree {
            size: self.size,
            shift: self.shift,
            root: self.root.clone(),
            tail: self.tail.clone(),
        }
    }

    fn install(&mut self, tree: Tree<T, B, BL>) {
        self.size = tree.size;
        self.shift = tree.shift;
        self.root = tree.root;
        self.tail = tree.tail;
    }

    /// Installs a full tail into the root, growing a level when needed.
    fn push_tail(&mut self, tail: NodeRef<T, B, BL>, tail_size: usize, tail_offset: usize) {
        if tail_offset == 0 {
            debug_assert!(self.root.children().is_empty());
            self.root = Node::make_path(self.shift, tail, Some(self.token));
            return;
        }
        if !self.root.is_relaxed() && tail_offset == branches(B) << self.shift {
            let path = Node::make_path(self.shift, tail, Some(self.token));
            let old_root = std::mem::replace(&mut self.root, empty_root());
            self.root = ReferenceCounter::new(
                Node::inner(vec![old_root, path]).stamped(self.token),
            );
            self.shift += B;
            return;
        }
        let installed = push_tail_node(
            &mut self.root,
            self.shift,
            tail_offset,
            &tail,
            tail_size,
            self.token,
        );
        if !installed {
            let path = Node::make_path(self.shift, tail, Some(self.token));
            let old_root = std::mem::replace(&mut self.root, empty_root());
            let sizes = vec![tail_offset, tail_offset + tail_size];
            self.root = ReferenceCounter::new(
                Node::relaxed(vec![old_root, path], sizes).stamped(self.token),
            );
            self.shift += B;
        }
    }

    fn clear(&mut self) {
        self.size = 0;
        self.shift = BL;
        self.root = empty_root();
        self.tail = ReferenceCounter::new(Node::leaf(Vec::new()).stamped(self.token));
    }
}

impl<T, const B: usize, const BL: usize> Default for TransientVector<T, B, BL> {
    #[inline]
    fn default() -> Self {
        TransientVector::new()
    }
}

// =============================================================================
// Mutating Descent Helpers
// =============================================================================

/// Child containing `index` and the index made relative to that child.
fn locate<T, const B: usize, const BL: usize>(
    node: &NodeRef<T, B, BL>,
    shift: usize,
    index: usize,
) -> (usize, usize) {
    if let Some((_, sizes)) = node.relaxed_parts() {
        let mut child_index = index >> shift;
        while sizes[child_index] <= index {
            child_index += 1;
        }
        let before = if child_index == 0 {
            0
        } else {
            sizes[child_index - 1]
        };
        (child_index, index - before)
    } else {
        let child_index = index >> shift;
        (child_index, index - (child_index << shift))
    }
}

fn update_node<T: Clone, const B: usize, const BL: usize, F, E>(
    node_ref: &mut NodeRef<T, B, BL>,
    shift: usize,
    index: usize,
    function: F,
    token: EditToken,
) -> Result<(), E>
where
    F: FnOnce(&T) -> Result<T, E>,
{
    let (child_index, relative) = locate(node_ref, shift, index);
    if shift == BL {
        let replacement = {
            let child = &node_ref.children()[child_index];
            function(&child.leaf_slice()[relative])?
        };
        let node = ensure_editable(node_ref, token);
        ensure_editable(&mut node.children_mut()[child_index], token).leaf_mut()[relative] =
            replacement;
        Ok(())
    } else {
        let node = ensure_editable(node_ref, token);
        update_node(
            &mut node.children_mut()[child_index],
            shift - B,
            relative,
            function,
            token,
        )
    }
}

enum PushPlan {
    Descend { child_index: usize, child_size: usize },
    Install,
    NoRoom,
}

/// Installs a full tail leaf below `node_ref`, mutating owned nodes in
/// place. Returns `false` when the subtree is out of room.
fn push_tail_node<T: Clone, const B: usize, const BL: usize>(
    node_ref: &mut NodeRef<T, B, BL>,
    shift: usize,
    size: usize,
    tail: &NodeRef<T, B, BL>,
    tail_size: usize,
    token: EditToken,
) -> bool {
    let plan = if let Some((children, sizes)) = node_ref.relaxed_parts() {
        let last_index = children.len() - 1;
        let before = if last_index == 0 {
            0
        } else {
            sizes[last_index - 1]
        };
        let child_size = sizes[last_index] - before;
        if child_size != 1 << shift && shift > BL {
            PushPlan::Descend {
                child_index: last_index,
                child_size,
            }
        } else if last_index + 1 < branches(B) {
            PushPlan::Install
        } else {
            PushPlan::NoRoom
        }
    } else {
        debug_assert_eq!(size % branches(BL), 0);
        let last_index = (size - 1) >> shift;
        let new_index = (size + branches(BL) - 1) >> shift;
        if new_index == last_index {
            PushPlan::Descend {
                child_index: last_index,
                child_size: size - (last_index << shift),
            }
        } else if new_index < branches(B) {
            PushPlan::Install
        } else {
            PushPlan::NoRoom
        }
    };

    match plan {
        PushPlan::Descend {
            child_index,
            child_size,
        } => {
            let node = ensure_editable(node_ref, token);
            let installed = push_tail_node(
                &mut node.children_mut()[child_index],
                shift - B,
                child_size,
                tail,
                tail_size,
                token,
            );
            if installed {
                if node.is_relaxed() {
                    let (_, sizes) = node.relaxed_parts_mut();
                    sizes[child_index] += tail_size;
                }
                true
            } else if child_index + 1 < branches(B) {
                // the last child is out of room: open the next slot instead
                let child = Node::make_child(shift, tail.clone(), Some(token));
                node.children_mut().push(child);
                if node.is_relaxed() {
                    let (_, sizes) = node.relaxed_parts_mut();
                    let total = sizes[sizes.len() - 1] + tail_size;
                    sizes.push(total);
                }
                true
            } else {
                false
            }
        }
        PushPlan::Install => {
            let node = ensure_editable(node_ref, token);
            let child = Node::make_child(shift, tail.clone(), Some(token));
            node.children_mut().push(child);
            if node.is_relaxed() {
                let (_, sizes) = node.relaxed_parts_mut();
                let total = sizes[sizes.len() - 1] + tail_size;
                sizes.push(total);
            }
            true
        }
        PushPlan::NoRoom => false,
    }
}

/// In-place slice-right: truncates after the element at `last` and carves
/// the containing leaf out as the new tail. Returns the new shift, whether
/// any of the subtree survives, the carved tail size, and the carved tail.
fn slice_right_node<T: Clone, const B: usize, const BL: usize>(
    node_ref: &mut NodeRef<T, B, BL>,
    shift: usize,
    last: usize,
    collapse: bool,
    token: EditToken,
) -> (usize, bool, usize, NodeRef<T, B, BL>) {
    let (child_index, relative) = locate(node_ref, shift, last);
    if shift == BL {
        // children are leaves: the target leaf becomes the new tail
        let tail_size = relative + 1;
        let tail = {
            let child = &node_ref.children()[child_index];
            let elements = child.leaf_slice();
            if tail_size == elements.len() {
                child.clone()
            } else {
                ReferenceCounter::new(
                    Node::leaf(elements[..tail_size].to_vec()).stamped(token),
                )
            }
        };
        if child_index == 0 {
            return (shift, false, tail_size, tail);
        }
        let node = ensure_editable(node_ref, token);
        node.children_mut().truncate(child_index);
        if node.is_relaxed() {
            node.relaxed_parts_mut().1.truncate(child_index);
        }
        return (shift, true, tail_size, tail);
    }

    if collapse && child_index == 0 {
        let child = node_ref.children()[0].clone();
        *node_ref = child;
        return slice_right_node(node_ref, shift - B, relative, true, token);
    }

    let node = ensure_editable(node_ref, token);
    let (_, kept, tail_size, tail) = slice_right_node(
        &mut node.children_mut()[child_index],
        shift - B,
        relative,
        false,
        token,
    );
    if kept {
        node.children_mut().truncate(child_index + 1);
        if node.is_relaxed() {
            let (_, sizes) = node.relaxed_parts_mut();
            sizes.truncate(child_index + 1);
            sizes[child_index] = last + 1 - tail_size;
        }
        (shift, true, tail_size, tail)
    } else if child_index == 0 {
        (shift, false, tail_size, tail)
    } else if collapse && child_index == 1 && shift > BL {
        let collapsed = node.children()[0].clone();
        *node_ref = collapsed;
        (shift - B, true, tail_size, tail)
    } else {
        node.children_mut().truncate(child_index);
        if node.is_relaxed() {
            node.relaxed_parts_mut().1.truncate(child_index);
        }
        (shift, true, tail_size, tail)
    }
}

/// In-place slice-left: drops everything before `first`. The node keeps its
/// surviving children, gains a size table if it was regular, and collapses
/// into its last child along the outermost spine. Returns the new shift.
fn slice_left_node<T: Clone, const B: usize, const BL: usize>(
    node_ref: &mut NodeRef<T, B, BL>,
    shift: usize,
    size: usize,
    first: usize,
    collapse: bool,
    token: EditToken,
) -> usize {
    let (child_index, relative) = locate(node_ref, shift, first);
    let count = node_ref.children().len();

    if collapse && shift > BL && child_index == count - 1 {
        let child_size = child_size_of(node_ref, shift, size, child_index);
        let child = node_ref.children()[child_index].clone();
        *node_ref = child;
        return slice_left_node(node_ref, shift - B, child_size, relative, true, token);
    }

    // retained child sizes, computed before any restructuring
    let retained: Vec<usize> = (child_index..count)
        .map(|index| child_size_of(node_ref, shift, size, index))
        .collect();

    let node = ensure_editable(node_ref, token);
    if shift == BL {
        let child = &mut node.children_mut()[child_index];
        ensure_editable(child, token).leaf_mut().drain(..relative);
    } else {
        slice_left_node(
            &mut node.children_mut()[child_index],
            shift - B,
            retained[0],
            relative,
            false,
            token,
        );
    }
    node.children_mut().drain(..child_index);

    let mut sizes = Vec::with_capacity(retained.len());
    let mut accumulated = retained[0] - relative;
    sizes.push(accumulated);
    for extra in &retained[1..] {
        accumulated += extra;
        sizes.push(accumulated);
    }
    let kind = node.kind_mut();
    match kind {
        Kind::Relaxed { sizes: table, .. } => *table = sizes,
        Kind::Inner(children) => {
            let children = std::mem::take(children);
            *kind = Kind::Relaxed { children, sizes };
        }
        Kind::Leaf(_) => unreachable!("slice-left descends inner nodes only"),
    }
    shift
}

// =============================================================================
// Tests
// =============================================================================
