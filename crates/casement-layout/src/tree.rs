//! Arena-backed sash tree and its read-only queries.
//!
//! Nodes are stored in a `BTreeMap` keyed by [`SashId`], giving O(log n)
//! lookup and a deterministic iteration order for hashing and diagnostics.
//! Traversals are iterative so deep trees never grow the call stack.

use std::collections::{BTreeMap, BTreeSet};

use casement_core::geometry::Rect;
use rustc_hash::FxHashMap;

use crate::error::{InvariantViolation, SashError};
use crate::sash::{
    SashId, SashNodeKind, SashPosition, SashRecord, SashSize, SashStore, SplitAxis,
};

/// Computed minimum extent of a sash on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MinSize {
    pub width: u32,
    pub height: u32,
}

impl MinSize {
    /// Minimum along the given split axis.
    #[must_use]
    pub const fn along(self, axis: SplitAxis) -> u32 {
        match axis {
            SplitAxis::Horizontal => self.width,
            SplitAxis::Vertical => self.height,
        }
    }
}

/// Per-pass table of computed minimums.
pub(crate) type MinTable = FxHashMap<SashId, MinSize>;

/// The binary layout tree.
///
/// Every mutation goes through a validated working copy (see
/// [`SashTree::apply_operation`](crate::SashTree::apply_operation)), so a
/// tree observed from outside always satisfies [`SashTree::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SashTree {
    pub(crate) root: SashId,
    pub(crate) next_id: SashId,
    pub(crate) container: Rect,
    pub(crate) nodes: BTreeMap<SashId, SashRecord>,
}

impl SashTree {
    /// Build a single-leaf tree filling a `width` x `height` container.
    pub fn new(width: u32, height: u32, store: SashStore) -> Result<Self, SashError> {
        check_extent(width, height)?;
        let root = SashId::MIN;
        let mut nodes = BTreeMap::new();
        let _ = nodes.insert(
            root,
            SashRecord::leaf(root, None, SashPosition::Root, store),
        );
        let mut tree = Self {
            root,
            next_id: root.checked_next()?,
            container: Rect::from_size(width, height),
            nodes,
        };
        tree.layout_all();
        Ok(tree)
    }

    /// Build the empty state: a single placeholder leaf.
    pub fn placeholder(width: u32, height: u32) -> Result<Self, SashError> {
        Self::new(width, height, SashStore::placeholder())
    }

    #[must_use]
    pub const fn root(&self) -> SashId {
        self.root
    }

    /// The ID the allocator will hand out next.
    #[must_use]
    pub const fn next_id(&self) -> SashId {
        self.next_id
    }

    /// Rectangle the tree was last laid out into.
    #[must_use]
    pub const fn container(&self) -> Rect {
        self.container
    }

    /// Number of nodes (leaves and splits).
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false: a tree holds at least its root.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Iterate nodes in ID order.
    pub fn nodes(&self) -> impl Iterator<Item = &SashRecord> {
        self.nodes.values()
    }

    /// Arena lookup; `None` when the ID is not in the tree.
    #[must_use]
    pub fn get_by_id(&self, id: SashId) -> Option<&SashRecord> {
        self.nodes.get(&id)
    }

    /// Lookup restricted to the subtree rooted at `from`.
    ///
    /// Walks the parent chain upward from `id`, so the cost is bounded by the
    /// depth of `id` rather than the size of the subtree.
    #[must_use]
    pub fn find(&self, from: SashId, id: SashId) -> Option<&SashRecord> {
        let record = self.nodes.get(&id)?;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == from {
                return Some(record);
            }
            cursor = self.nodes.get(&current).and_then(|node| node.parent);
        }
        None
    }

    /// True iff `id` names a leaf.
    pub fn is_leaf(&self, id: SashId) -> Result<bool, SashError> {
        self.require(id).map(SashRecord::is_leaf)
    }

    /// Visit `from` and every descendant in pre-order (parent first, then
    /// the leading child's subtree, then the trailing child's).
    pub fn walk(
        &self,
        from: SashId,
        mut visitor: impl FnMut(&SashRecord),
    ) -> Result<(), SashError> {
        self.require(from)?;
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            let Some(record) = self.nodes.get(&id) else {
                continue;
            };
            visitor(record);
            if let SashNodeKind::Split(split) = &record.kind {
                stack.push(split.second);
                stack.push(split.first);
            }
        }
        Ok(())
    }

    /// Leaves under `from`, left-to-right / top-to-bottom.
    pub fn leaf_descendants(&self, from: SashId) -> Result<Vec<SashId>, SashError> {
        let mut leaves = Vec::new();
        self.walk(from, |record| {
            if record.is_leaf() {
                leaves.push(record.id);
            }
        })?;
        Ok(leaves)
    }

    /// Every leaf in the tree, in pre-order.
    #[must_use]
    pub fn leaves(&self) -> Vec<SashId> {
        self.leaf_descendants(self.root).unwrap_or_default()
    }

    /// The other child of `id`'s parent; `None` for the root or unknown IDs.
    #[must_use]
    pub fn sibling(&self, id: SashId) -> Option<SashId> {
        let parent = self.nodes.get(&id)?.parent?;
        self.nodes.get(&parent)?.split_payload()?.other(id)
    }

    /// Computed minimum width of `id`'s subtree.
    pub fn calc_min_width(&self, id: SashId) -> Result<u32, SashError> {
        self.min_size(id).map(|min| min.width)
    }

    /// Computed minimum height of `id`'s subtree.
    pub fn calc_min_height(&self, id: SashId) -> Result<u32, SashError> {
        self.min_size(id).map(|min| min.height)
    }

    /// Computed minimum size of `id`'s subtree, derived from the current
    /// shape on every call.
    pub fn min_size(&self, id: SashId) -> Result<MinSize, SashError> {
        self.require(id)?;
        let table = self.min_table(id);
        table
            .get(&id)
            .copied()
            .ok_or(SashError::NotFound { id })
    }

    /// True when the tree is a lone placeholder leaf.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.nodes.len() == 1
            && self
                .nodes
                .get(&self.root)
                .and_then(SashRecord::store)
                .is_some_and(SashStore::is_placeholder)
    }

    /// Full structural check.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        validate_tree(self.root, self.next_id, &self.nodes)
    }

    /// Deterministic FNV-1a hash over the full tree state.
    ///
    /// Equal hashes before and after a failed call are how tests assert that
    /// the tree was left untouched.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0001_0000_01b3;

        fn mix(hash: &mut u64, byte: u8) {
            *hash ^= u64::from(byte);
            *hash = hash.wrapping_mul(PRIME);
        }

        fn mix_bytes(hash: &mut u64, bytes: &[u8]) {
            for byte in bytes {
                mix(hash, *byte);
            }
        }

        fn mix_u32(hash: &mut u64, value: u32) {
            mix_bytes(hash, &value.to_le_bytes());
        }

        fn mix_u64(hash: &mut u64, value: u64) {
            mix_bytes(hash, &value.to_le_bytes());
        }

        fn mix_rect(hash: &mut u64, rect: Rect) {
            mix_u32(hash, rect.x);
            mix_u32(hash, rect.y);
            mix_u32(hash, rect.width);
            mix_u32(hash, rect.height);
        }

        fn mix_str(hash: &mut u64, value: &str) {
            mix_u64(hash, value.len() as u64);
            mix_bytes(hash, value.as_bytes());
        }

        fn mix_opt_str(hash: &mut u64, value: Option<&str>) {
            match value {
                Some(value) => {
                    mix(hash, 1);
                    mix_str(hash, value);
                }
                None => mix(hash, 0),
            }
        }

        fn mix_store(hash: &mut u64, store: &SashStore) {
            mix_opt_str(hash, store.title.as_deref());
            mix_opt_str(hash, store.icon.as_deref());
            mix_opt_str(hash, store.content.as_deref());
            mix_u64(hash, store.tabs.len() as u64);
            for tab in &store.tabs {
                mix_str(hash, tab);
            }
            mix(hash, u8::from(store.placeholder));
            mix_u64(hash, store.extensions.len() as u64);
            for (key, value) in &store.extensions {
                mix_str(hash, key);
                mix_str(hash, value);
            }
        }

        let mut hash = OFFSET_BASIS;
        mix_u64(&mut hash, self.root.get());
        mix_u64(&mut hash, self.next_id.get());
        mix_rect(&mut hash, self.container);
        mix_u64(&mut hash, self.nodes.len() as u64);

        for node in self.nodes.values() {
            mix_u64(&mut hash, node.id.get());
            mix_u64(&mut hash, node.parent.map_or(0, SashId::get));
            mix(&mut hash, position_byte(node.position));
            mix_u32(&mut hash, node.min_width);
            mix_u32(&mut hash, node.min_height);
            match node.size {
                Some(SashSize::Pixels(pixels)) => {
                    mix(&mut hash, 1);
                    mix_u32(&mut hash, pixels);
                }
                Some(SashSize::Share(bps)) => {
                    mix(&mut hash, 2);
                    mix_u32(&mut hash, u32::from(bps));
                }
                None => mix(&mut hash, 0),
            }
            mix_rect(&mut hash, node.rect);

            match &node.kind {
                SashNodeKind::Leaf(leaf) => {
                    mix(&mut hash, 1);
                    mix_store(&mut hash, &leaf.store);
                    mix_u64(&mut hash, leaf.render_target.map_or(0, |target| target.0));
                }
                SashNodeKind::Split(split) => {
                    mix(&mut hash, 2);
                    let axis_byte = match split.axis {
                        SplitAxis::Horizontal => 1,
                        SplitAxis::Vertical => 2,
                    };
                    mix(&mut hash, axis_byte);
                    mix_u64(&mut hash, split.first.get());
                    mix_u64(&mut hash, split.second.get());
                }
            }
        }

        hash
    }

    pub(crate) fn require(&self, id: SashId) -> Result<&SashRecord, SashError> {
        self.nodes.get(&id).ok_or(SashError::NotFound { id })
    }

    pub(crate) fn require_mut(&mut self, id: SashId) -> Result<&mut SashRecord, SashError> {
        self.nodes.get_mut(&id).ok_or(SashError::NotFound { id })
    }

    pub(crate) fn require_leaf(&self, id: SashId) -> Result<&SashRecord, SashError> {
        let record = self.require(id)?;
        if record.is_leaf() {
            Ok(record)
        } else {
            Err(SashError::NotLeaf { id })
        }
    }

    /// Hand out a fresh ID.
    pub(crate) fn allocate_id(&mut self) -> Result<SashId, SashError> {
        let id = self.next_id;
        self.next_id = id.checked_next()?;
        Ok(id)
    }

    /// Keep the allocator ahead of an externally chosen ID.
    pub(crate) fn reserve_id(&mut self, id: SashId) -> Result<(), SashError> {
        if id >= self.next_id {
            self.next_id = id.checked_next()?;
        }
        Ok(())
    }

    /// Point whatever referenced `old` (the root slot or a parent split) at
    /// `new` instead.
    pub(crate) fn replace_child_link(
        &mut self,
        parent: Option<SashId>,
        old: SashId,
        new: SashId,
    ) -> Result<(), SashError> {
        let Some(parent) = parent else {
            self.root = new;
            return Ok(());
        };
        let record = self.require_mut(parent)?;
        if let SashNodeKind::Split(split) = &mut record.kind {
            if split.first == old {
                split.first = new;
            } else if split.second == old {
                split.second = new;
            }
        }
        Ok(())
    }

    /// Remove `id` and every descendant from the arena.
    pub(crate) fn drop_subtree(&mut self, id: SashId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(record) = self.nodes.remove(&current) {
                stack.extend(record.children());
            }
        }
    }

    /// Bottom-up minimums for `from` and its descendants.
    pub(crate) fn min_table(&self, from: SashId) -> MinTable {
        let mut order = Vec::new();
        let mut stack = vec![from];
        while let Some(id) = stack.pop() {
            let Some(record) = self.nodes.get(&id) else {
                continue;
            };
            order.push(id);
            stack.extend(record.children());
        }

        let mut table = MinTable::default();
        table.reserve(order.len());
        // Reverse pre-order visits every child before its parent.
        for id in order.into_iter().rev() {
            let Some(record) = self.nodes.get(&id) else {
                continue;
            };
            let floor = MinSize {
                width: record.min_width,
                height: record.min_height,
            };
            let min = match &record.kind {
                SashNodeKind::Leaf(_) => floor,
                SashNodeKind::Split(split) => {
                    let first = table.get(&split.first).copied().unwrap_or_default();
                    let second = table.get(&split.second).copied().unwrap_or_default();
                    let (width, height) = match split.axis {
                        SplitAxis::Horizontal => (
                            first.width.saturating_add(second.width),
                            first.height.max(second.height),
                        ),
                        SplitAxis::Vertical => (
                            first.width.max(second.width),
                            first.height.saturating_add(second.height),
                        ),
                    };
                    MinSize {
                        width: floor.width.max(width),
                        height: floor.height.max(height),
                    }
                }
            };
            let _ = table.insert(id, min);
        }
        table
    }
}

pub(crate) fn check_extent(width: u32, height: u32) -> Result<(), SashError> {
    if width == 0 || height == 0 {
        return Err(SashError::InvalidGeometry {
            width,
            height,
            reason: "container extent must be positive",
        });
    }
    Ok(())
}

const fn position_byte(position: SashPosition) -> u8 {
    match position {
        SashPosition::Root => 0,
        SashPosition::Left => 1,
        SashPosition::Right => 2,
        SashPosition::Top => 3,
        SashPosition::Bottom => 4,
    }
}

fn validate_tree(
    root: SashId,
    next_id: SashId,
    nodes: &BTreeMap<SashId, SashRecord>,
) -> Result<(), InvariantViolation> {
    let Some(root_record) = nodes.get(&root) else {
        return Err(InvariantViolation::MissingRoot { root });
    };
    if let Some(parent) = root_record.parent {
        return Err(InvariantViolation::RootHasParent { root, parent });
    }
    if root_record.position != SashPosition::Root {
        return Err(InvariantViolation::PositionMismatch {
            node_id: root,
            expected: SashPosition::Root,
            actual: root_record.position,
        });
    }

    let max_existing = nodes.keys().next_back().copied().unwrap_or(root);
    if next_id <= max_existing {
        return Err(InvariantViolation::StaleAllocator {
            next_id,
            max_existing,
        });
    }

    let mut expected_parents = BTreeMap::new();
    let mut expected_positions = BTreeMap::new();

    for node in nodes.values() {
        let SashNodeKind::Split(split) = &node.kind else {
            continue;
        };
        if split.first == node.id || split.second == node.id {
            return Err(InvariantViolation::SelfReferentialSplit { node_id: node.id });
        }
        if split.first == split.second {
            return Err(InvariantViolation::DuplicateChild {
                node_id: node.id,
                child: split.first,
            });
        }
        let (first_position, second_position) = split.axis.positions();
        for (child, position) in [(split.first, first_position), (split.second, second_position)]
        {
            if !nodes.contains_key(&child) {
                return Err(InvariantViolation::MissingChild {
                    parent: node.id,
                    child,
                });
            }
            if let Some(first_parent) = expected_parents.insert(child, node.id)
                && first_parent != node.id
            {
                return Err(InvariantViolation::MultipleParents {
                    child,
                    first_parent,
                    second_parent: node.id,
                });
            }
            let _ = expected_positions.insert(child, position);
        }
    }

    for node in nodes.values() {
        let expected = if node.id == root {
            None
        } else {
            expected_parents.get(&node.id).copied()
        };
        if node.parent != expected {
            return Err(InvariantViolation::ParentMismatch {
                node_id: node.id,
                expected,
                actual: node.parent,
            });
        }
        if let Some(&expected) = expected_positions.get(&node.id)
            && node.position != expected
        {
            return Err(InvariantViolation::PositionMismatch {
                node_id: node.id,
                expected,
                actual: node.position,
            });
        }
    }

    let mut visited = BTreeSet::new();
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            return Err(InvariantViolation::CycleDetected { node_id: id });
        }
        if let Some(record) = nodes.get(&id) {
            stack.extend(record.children());
        }
    }

    if visited.len() != nodes.len()
        && let Some(node_id) = nodes.keys().find(|node_id| !visited.contains(node_id))
    {
        return Err(InvariantViolation::UnreachableNode { node_id: *node_id });
    }

    Ok(())
}
