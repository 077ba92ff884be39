//! Structural mutations.
//!
//! Every public mutation runs against a cloned working tree. The clone is
//! validated after the edit and only then swapped in, so callers observe
//! either the old valid tree or the new valid tree. A failed validation is
//! a defect in this module: it is logged at `error`, panics in debug
//! builds, and surfaces as [`SashError::Invariant`] in release builds.

use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, error};

use casement_core::geometry::Rect;

use crate::error::SashError;
use crate::sash::{
    DEFAULT_MIN_HEIGHT, DEFAULT_MIN_WIDTH, RenderTarget, SashId, SashLeaf, SashNodeKind,
    SashPosition, SashRecord, SashSize, SashSplit, SashStore,
};
use crate::solver::distribute;
use crate::tree::SashTree;

/// Description of a pane to insert.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaneSpec {
    #[serde(default)]
    pub store: SashStore,
    /// Initial extent of the new pane along the split axis.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SashSize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_height: Option<u32>,
    /// Reuse this ID instead of allocating one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<SashId>,
}

impl PaneSpec {
    #[must_use]
    pub fn new(store: SashStore) -> Self {
        Self {
            store,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_size(mut self, size: SashSize) -> Self {
        self.size = Some(size);
        self
    }

    #[must_use]
    pub fn with_min_size(mut self, width: u32, height: u32) -> Self {
        self.min_width = Some(width);
        self.min_height = Some(height);
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: SashId) -> Self {
        self.id = Some(id);
        self
    }
}

/// What `remove_pane` took out of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedPane {
    pub id: SashId,
    pub position: SashPosition,
    pub rect: Rect,
    /// Store of the removed leaf; `None` when a whole split was removed.
    pub store: Option<SashStore>,
    pub min_width: u32,
    pub min_height: u32,
    pub render_target: Option<RenderTarget>,
}

/// Extents after a divider drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DividerResize {
    /// Leading child of the split and its new extent.
    pub first: (SashId, u32),
    /// Trailing child of the split and its new extent.
    pub second: (SashId, u32),
    /// How far the divider actually moved after clamping.
    pub applied_delta: i64,
}

/// Serializable mutation, for replay logs and fuzzing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum SashOperation {
    AddPane {
        target: SashId,
        spec: PaneSpec,
        position: SashPosition,
    },
    RemovePane {
        id: SashId,
    },
    SwapPanes {
        first: SashId,
        second: SashId,
    },
    MovePane {
        id: SashId,
        target: SashId,
        position: SashPosition,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size: Option<SashSize>,
    },
    ResizeDivider {
        first: SashId,
        second: SashId,
        delta: i64,
    },
    SetStore {
        id: SashId,
        store: SashStore,
    },
    SetMinSize {
        id: SashId,
        width: u32,
        height: u32,
    },
    Resize {
        width: u32,
        height: u32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SashOperationKind {
    AddPane,
    RemovePane,
    SwapPanes,
    MovePane,
    ResizeDivider,
    SetStore,
    SetMinSize,
    Resize,
}

impl SashOperation {
    #[must_use]
    pub const fn kind(&self) -> SashOperationKind {
        match self {
            Self::AddPane { .. } => SashOperationKind::AddPane,
            Self::RemovePane { .. } => SashOperationKind::RemovePane,
            Self::SwapPanes { .. } => SashOperationKind::SwapPanes,
            Self::MovePane { .. } => SashOperationKind::MovePane,
            Self::ResizeDivider { .. } => SashOperationKind::ResizeDivider,
            Self::SetStore { .. } => SashOperationKind::SetStore,
            Self::SetMinSize { .. } => SashOperationKind::SetMinSize,
            Self::Resize { .. } => SashOperationKind::Resize,
        }
    }
}

/// Result of [`SashTree::apply_operation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SashOperationOutcome {
    pub kind: SashOperationKind,
    /// The sash the operation created or primarily affected.
    pub sash: Option<SashId>,
    pub before_hash: u64,
    pub after_hash: u64,
}

impl SashTree {
    /// Apply one serialized operation atomically, recording state hashes.
    pub fn apply_operation(
        &mut self,
        operation: SashOperation,
    ) -> Result<SashOperationOutcome, SashError> {
        let kind = operation.kind();
        let before_hash = self.state_hash();
        let sash = match operation {
            SashOperation::AddPane {
                target,
                spec,
                position,
            } => Some(self.add_pane(target, spec, position)?),
            SashOperation::RemovePane { id } => {
                self.remove_pane(id)?;
                Some(id)
            }
            SashOperation::SwapPanes { first, second } => {
                self.swap_panes(first, second)?;
                Some(first)
            }
            SashOperation::MovePane {
                id,
                target,
                position,
                size,
            } => Some(self.move_pane(id, target, position, size)?),
            SashOperation::ResizeDivider {
                first,
                second,
                delta,
            } => {
                self.resize_divider(first, second, delta)?;
                Some(first)
            }
            SashOperation::SetStore { id, store } => {
                self.update_store(id, |current| *current = store)?;
                Some(id)
            }
            SashOperation::SetMinSize { id, width, height } => {
                self.set_min_size(id, width, height)?;
                Some(id)
            }
            SashOperation::Resize { width, height } => {
                self.resize(width, height)?;
                None
            }
        };
        Ok(SashOperationOutcome {
            kind,
            sash,
            before_hash,
            after_hash: self.state_hash(),
        })
    }

    /// Split leaf `target`, inserting a new pane on the `position` side.
    ///
    /// The target keeps its ID and store and moves to the opposite side of a
    /// new split that takes over its slot. On a placeholder tree the
    /// placeholder leaf is filled in place instead.
    pub fn add_pane(
        &mut self,
        target: SashId,
        spec: PaneSpec,
        position: SashPosition,
    ) -> Result<SashId, SashError> {
        let _span = debug_span!("sash.add_pane", %target, ?position).entered();
        self.transact("add_pane", |tree| tree.add_pane_in_place(target, spec, position))
    }

    /// Remove the node `id` and promote its sibling into the parent's slot.
    ///
    /// Removing the root leaves a fresh placeholder leaf behind.
    pub fn remove_pane(&mut self, id: SashId) -> Result<RemovedPane, SashError> {
        let _span = debug_span!("sash.remove_pane", %id).entered();
        self.transact("remove_pane", |tree| tree.remove_pane_in_place(id))
    }

    /// Exchange the stores of two leaves. Tree shape and IDs do not change.
    pub fn swap_panes(&mut self, first: SashId, second: SashId) -> Result<(), SashError> {
        let _span = debug_span!("sash.swap_panes", %first, %second).entered();
        self.require_leaf(first)?;
        self.require_leaf(second)?;
        if first == second {
            return Ok(());
        }
        self.transact("swap_panes", |tree| {
            let first_store = take_store(tree, first)?;
            let second_store = take_store(tree, second)?;
            put_store(tree, first, second_store)?;
            put_store(tree, second, first_store)?;
            Ok(())
        })
    }

    /// Relocate leaf `id` next to `target`, keeping its ID, store and floors.
    pub fn move_pane(
        &mut self,
        id: SashId,
        target: SashId,
        position: SashPosition,
        size: Option<SashSize>,
    ) -> Result<SashId, SashError> {
        let _span = debug_span!("sash.move_pane", %id, %target, ?position).entered();
        self.require_leaf(id)?;
        self.require_leaf(target)?;
        if position == SashPosition::Root {
            return Err(SashError::InvalidPosition {
                position,
                reason: "a pane cannot be moved into the root slot",
            });
        }
        if id == target {
            return Err(SashError::InvalidPosition {
                position,
                reason: "a pane cannot be moved next to itself",
            });
        }
        self.transact("move_pane", |tree| {
            let removed = tree.remove_pane_in_place(id)?;
            let spec = PaneSpec {
                store: removed.store.unwrap_or_default(),
                size,
                min_width: Some(removed.min_width),
                min_height: Some(removed.min_height),
                id: Some(id),
            };
            let moved = tree.add_pane_in_place(target, spec, position)?;
            if let Some(SashNodeKind::Leaf(leaf)) =
                tree.nodes.get_mut(&moved).map(|record| &mut record.kind)
            {
                leaf.render_target = removed.render_target;
            }
            Ok(moved)
        })
    }

    /// Drag the divider between siblings `a` and `b` by `delta` pixels.
    ///
    /// Positive deltas move the divider right (or down). Only the two
    /// siblings' subtrees are laid out again.
    pub fn resize_divider(
        &mut self,
        a: SashId,
        b: SashId,
        delta: i64,
    ) -> Result<DividerResize, SashError> {
        let _span = debug_span!("sash.resize_divider", %a, %b, delta).entered();
        let parent = self.require(a)?.parent;
        self.require(b)?;
        let Some(parent) = parent.filter(|_| self.sibling(a) == Some(b)) else {
            return Err(SashError::InvalidPosition {
                position: self.require(a)?.position,
                reason: "divider resize needs two siblings of the same split",
            });
        };
        self.transact("resize_divider", |tree| {
            let parent_record = tree.require(parent)?;
            let rect = parent_record.rect;
            let Some(split) = parent_record.split_payload().copied() else {
                return Err(SashError::NotFound { id: parent });
            };
            let axis = split.axis;
            let current = tree
                .get_by_id(split.first)
                .map_or(0, |record| axis.extent(record.rect));
            let available = axis.extent(rect);
            let desired = i64::from(current)
                .saturating_add(delta)
                .clamp(0, i64::from(available)) as u32;

            let mins = tree.min_table(parent);
            let first_min = mins.get(&split.first).map_or(0, |min| min.along(axis));
            let second_min = mins.get(&split.second).map_or(0, |min| min.along(axis));
            let division = distribute(available, desired, first_min, second_min);

            let (first_area, second_area) = axis.divide(rect, division.first, division.second);
            let _ = tree.layout_from(split.first, first_area, &mins);
            let _ = tree.layout_from(split.second, second_area, &mins);

            Ok(DividerResize {
                first: (split.first, division.first),
                second: (split.second, division.second),
                applied_delta: i64::from(division.first) - i64::from(current),
            })
        })
    }

    /// Edit a leaf's store in place. Geometry is untouched.
    pub fn update_store(
        &mut self,
        id: SashId,
        edit: impl FnOnce(&mut SashStore),
    ) -> Result<(), SashError> {
        self.require_leaf(id)?;
        self.transact("update_store", |tree| {
            let store = tree
                .require_mut(id)?
                .store_mut()
                .ok_or(SashError::NotLeaf { id })?;
            edit(store);
            Ok(())
        })
    }

    /// Set a node's own minimum floor and relayout the whole tree.
    pub fn set_min_size(&mut self, id: SashId, width: u32, height: u32) -> Result<(), SashError> {
        self.transact("set_min_size", |tree| {
            let record = tree.require_mut(id)?;
            record.min_width = width;
            record.min_height = height;
            tree.layout_all();
            Ok(())
        })
    }

    /// Attach the host's render handle to a leaf.
    pub fn set_render_target(
        &mut self,
        id: SashId,
        target: Option<RenderTarget>,
    ) -> Result<(), SashError> {
        self.require_leaf(id)?;
        if let Some(SashNodeKind::Leaf(leaf)) = self.nodes.get_mut(&id).map(|record| &mut record.kind)
        {
            leaf.render_target = target;
        }
        Ok(())
    }

    /// Run `edit` on a working copy; keep the copy only if it validates.
    pub(crate) fn transact<T>(
        &mut self,
        operation: &'static str,
        edit: impl FnOnce(&mut SashTree) -> Result<T, SashError>,
    ) -> Result<T, SashError> {
        let mut working = self.clone();
        let value = edit(&mut working)?;
        if let Err(violation) = working.validate() {
            error!(operation, %violation, "mutation produced a malformed sash tree");
            if cfg!(debug_assertions) {
                panic!("{operation} produced a malformed sash tree: {violation}");
            }
            return Err(violation.into());
        }
        *self = working;
        debug!(operation, nodes = self.nodes.len(), "sash mutation applied");
        Ok(value)
    }

    pub(crate) fn add_pane_in_place(
        &mut self,
        target: SashId,
        spec: PaneSpec,
        position: SashPosition,
    ) -> Result<SashId, SashError> {
        let Some(axis) = position.axis() else {
            return Err(SashError::InvalidPosition {
                position,
                reason: "new panes must be placed beside an existing pane",
            });
        };
        let target_record = self.require_leaf(target)?;
        let parent = target_record.parent;
        let slot_position = target_record.position;
        let slot_rect = target_record.rect;
        let placeholder = self.is_placeholder();
        if let Some(id) = spec.id
            && self.nodes.contains_key(&id)
            && !(id == target && placeholder)
        {
            return Err(SashError::DuplicateId { id });
        }

        if placeholder {
            return self.fill_placeholder(spec);
        }

        let new_id = match spec.id {
            Some(id) => {
                self.reserve_id(id)?;
                id
            }
            None => self.allocate_id()?,
        };
        let split_id = self.allocate_id()?;

        let (first, second) = if position.is_leading() {
            (new_id, target)
        } else {
            (target, new_id)
        };
        let mut split = SashRecord::split(
            split_id,
            parent,
            slot_position,
            SashSplit {
                axis,
                first,
                second,
            },
        );
        split.rect = slot_rect;

        let mut leaf = SashRecord::leaf(new_id, Some(split_id), position, spec.store);
        leaf.min_width = spec.min_width.unwrap_or(DEFAULT_MIN_WIDTH);
        leaf.min_height = spec.min_height.unwrap_or(DEFAULT_MIN_HEIGHT);
        leaf.size = spec.size;

        let complement = position.complement().unwrap_or(position);
        {
            let target_record = self.require_mut(target)?;
            target_record.parent = Some(split_id);
            target_record.position = complement;
            target_record.size = None;
        }
        self.replace_child_link(parent, target, split_id)?;
        let _ = self.nodes.insert(split_id, split);
        let _ = self.nodes.insert(new_id, leaf);
        self.layout_all();
        Ok(new_id)
    }

    /// Replace the placeholder leaf with a real pane, keeping its rectangle.
    fn fill_placeholder(&mut self, spec: PaneSpec) -> Result<SashId, SashError> {
        let old = self.root;
        let Some(mut record) = self.nodes.remove(&old) else {
            return Err(SashError::NotFound { id: old });
        };
        let id = spec.id.unwrap_or(old);
        self.reserve_id(id)?;
        record.id = id;
        record.min_width = spec.min_width.unwrap_or(DEFAULT_MIN_WIDTH);
        record.min_height = spec.min_height.unwrap_or(DEFAULT_MIN_HEIGHT);
        record.size = None;
        record.kind = SashNodeKind::Leaf(SashLeaf::new(spec.store));
        self.root = id;
        let _ = self.nodes.insert(id, record);
        self.layout_all();
        Ok(id)
    }

    pub(crate) fn remove_pane_in_place(&mut self, id: SashId) -> Result<RemovedPane, SashError> {
        let record = self.require(id)?;
        let removed = RemovedPane {
            id,
            position: record.position,
            rect: record.rect,
            store: record.store().cloned(),
            min_width: record.min_width,
            min_height: record.min_height,
            render_target: record.leaf_payload().and_then(|leaf| leaf.render_target),
        };

        let Some(parent) = record.parent else {
            if self.is_placeholder() {
                return Err(SashError::InvalidPosition {
                    position: SashPosition::Root,
                    reason: "the placeholder pane cannot be removed",
                });
            }
            let placeholder = self.allocate_id()?;
            self.nodes.clear();
            let mut leaf =
                SashRecord::leaf(placeholder, None, SashPosition::Root, SashStore::placeholder());
            leaf.rect = self.container;
            let _ = self.nodes.insert(placeholder, leaf);
            self.root = placeholder;
            self.layout_all();
            return Ok(removed);
        };

        let parent_record = self.require(parent)?;
        let grandparent = parent_record.parent;
        let parent_position = parent_record.position;
        let parent_rect = parent_record.rect;
        let Some(sibling) = parent_record.split_payload().and_then(|split| split.other(id)) else {
            return Err(SashError::NotFound { id });
        };

        {
            let sibling_record = self.require_mut(sibling)?;
            sibling_record.parent = grandparent;
            sibling_record.position = parent_position;
            sibling_record.rect = parent_rect;
            sibling_record.size = None;
        }
        self.replace_child_link(grandparent, parent, sibling)?;
        let _ = self.nodes.remove(&parent);
        self.drop_subtree(id);
        self.layout_all();
        Ok(removed)
    }
}

fn take_store(tree: &mut SashTree, id: SashId) -> Result<SashStore, SashError> {
    tree.require_mut(id)?
        .store_mut()
        .map(std::mem::take)
        .ok_or(SashError::NotLeaf { id })
}

fn put_store(tree: &mut SashTree, id: SashId, store: SashStore) -> Result<(), SashError> {
    let slot = tree
        .require_mut(id)?
        .store_mut()
        .ok_or(SashError::NotLeaf { id })?;
    *slot = store;
    Ok(())
}
