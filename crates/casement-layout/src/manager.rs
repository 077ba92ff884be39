//! The window manager instance.
//!
//! [`WindowManager`] owns one sash tree together with the minimized
//! registry, focus and maximize state, and the event bus. Each mutation
//! emits its primary event followed by a `PaneResized` event for every
//! surviving pane whose rectangle changed, in pre-order.

use casement_core::geometry::Rect;
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::config::LayoutConfig;
use crate::error::SashError;
use crate::event::{EventBus, EventSink, PaneSnapshot, SashEvent, SubscriptionId};
use crate::minimize::{MinimizedRecord, MinimizedRegistry, RestorePlacement};
use crate::ops::{DividerResize, PaneSpec};
use crate::sash::{RenderTarget, SashId, SashPosition, SashSize, SashStore};
use crate::tree::SashTree;

/// Flat view of one visible pane for the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneView<'a> {
    pub id: SashId,
    pub rect: Rect,
    pub store: &'a SashStore,
    pub render_target: Option<RenderTarget>,
}

#[derive(Debug)]
pub struct WindowManager {
    tree: SashTree,
    minimized: MinimizedRegistry,
    events: EventBus,
    focused: Option<SashId>,
    maximized: Option<SashId>,
}

impl WindowManager {
    /// Build a manager from a declarative layout.
    pub fn new(config: &LayoutConfig) -> Result<Self, SashError> {
        let tree = SashTree::from_config(config)?;
        info!(
            width = config.width,
            height = config.height,
            panes = tree.leaves().len(),
            "window manager created"
        );
        Ok(Self::from_tree(tree))
    }

    /// Wrap an existing tree.
    #[must_use]
    pub fn from_tree(tree: SashTree) -> Self {
        Self {
            tree,
            minimized: MinimizedRegistry::new(),
            events: EventBus::new(),
            focused: None,
            maximized: None,
        }
    }

    #[must_use]
    pub const fn tree(&self) -> &SashTree {
        &self.tree
    }

    #[must_use]
    pub const fn focused(&self) -> Option<SashId> {
        self.focused
    }

    #[must_use]
    pub const fn maximized(&self) -> Option<SashId> {
        self.maximized
    }

    pub fn subscribe(&mut self, sink: impl EventSink + 'static) -> SubscriptionId {
        self.events.subscribe(sink)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Every leaf with its geometry, in pre-order. The placeholder is
    /// reported like any other pane so hosts can render an empty state.
    #[must_use]
    pub fn panes(&self) -> Vec<PaneView<'_>> {
        self.tree
            .leaves()
            .into_iter()
            .filter_map(|id| self.view(id))
            .collect()
    }

    /// Panes to paint: only the maximized pane (spanning the container)
    /// while one is maximized, otherwise the same as [`Self::panes`].
    #[must_use]
    pub fn visible_panes(&self) -> Vec<PaneView<'_>> {
        match self.maximized.and_then(|id| self.view(id)) {
            Some(view) => vec![PaneView {
                rect: self.tree.container(),
                ..view
            }],
            None => self.panes(),
        }
    }

    pub fn minimized(&self) -> impl Iterator<Item = &MinimizedRecord> {
        self.minimized.iter()
    }

    /// Relayout into a new container size.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), SashError> {
        let before = self.leaf_rects();
        self.tree.resize(width, height)?;
        self.emit_resized(&before);
        Ok(())
    }

    pub fn add_pane(
        &mut self,
        target: SashId,
        spec: PaneSpec,
        position: SashPosition,
    ) -> Result<SashId, SashError> {
        let before = self.leaf_rects();
        let id = self.tree.add_pane(target, spec, position)?;
        if let Some(pane) = self.snapshot(id) {
            self.events.emit(&SashEvent::PaneAdded {
                pane,
                target,
                position,
            });
        }
        self.emit_resized(&before);
        Ok(id)
    }

    /// Remove pane `id`, or a whole split subtree.
    ///
    /// Emits one `PaneRemoved` per leaf that left the tree, in pre-order.
    /// Removing the last pane leaves an unannounced placeholder behind; it
    /// shows up in [`Self::panes`] with its store's `placeholder` flag set.
    pub fn remove_pane(&mut self, id: SashId) -> Result<(), SashError> {
        let gone: Vec<PaneSnapshot> = self
            .tree
            .leaf_descendants(id)?
            .into_iter()
            .filter_map(|leaf| self.snapshot(leaf))
            .collect();
        let before = self.leaf_rects();
        let removed = self.tree.remove_pane(id)?;
        self.forget(removed.id);
        for pane in gone {
            self.events.emit(&SashEvent::PaneRemoved { pane });
        }
        self.emit_resized(&before);
        Ok(())
    }

    pub fn swap_panes(&mut self, first: SashId, second: SashId) -> Result<(), SashError> {
        self.tree.swap_panes(first, second)?;
        if first != second {
            self.events.emit(&SashEvent::PanesSwapped { first, second });
        }
        Ok(())
    }

    pub fn move_pane(
        &mut self,
        id: SashId,
        target: SashId,
        position: SashPosition,
        size: Option<SashSize>,
    ) -> Result<(), SashError> {
        let before = self.leaf_rects();
        self.tree.move_pane(id, target, position, size)?;
        if let Some(pane) = self.snapshot(id) {
            self.events.emit(&SashEvent::PaneMoved {
                pane,
                target,
                position,
            });
        }
        self.emit_resized(&before);
        Ok(())
    }

    /// Drag the divider between two sibling panes (or subtrees).
    pub fn resize_divider(
        &mut self,
        a: SashId,
        b: SashId,
        delta: i64,
    ) -> Result<DividerResize, SashError> {
        let before = self.leaf_rects();
        let outcome = self.tree.resize_divider(a, b, delta)?;
        self.emit_resized(&before);
        Ok(outcome)
    }

    pub fn set_min_size(&mut self, id: SashId, width: u32, height: u32) -> Result<(), SashError> {
        let before = self.leaf_rects();
        self.tree.set_min_size(id, width, height)?;
        self.emit_resized(&before);
        Ok(())
    }

    /// Replace a pane's title. Emits only when the title actually changes.
    pub fn set_title(&mut self, id: SashId, title: Option<String>) -> Result<(), SashError> {
        let mut previous = None;
        let next = title.clone();
        self.tree.update_store(id, |store| {
            previous = std::mem::replace(&mut store.title, next);
        })?;
        if previous != title {
            self.events.emit(&SashEvent::PaneTitleChanged {
                id,
                previous,
                current: title,
            });
        }
        Ok(())
    }

    pub fn set_render_target(
        &mut self,
        id: SashId,
        target: Option<RenderTarget>,
    ) -> Result<(), SashError> {
        self.tree.set_render_target(id, target)
    }

    /// Move focus to leaf `id`. Refocusing the focused pane is silent.
    pub fn focus(&mut self, id: SashId) -> Result<(), SashError> {
        self.tree.require_leaf(id)?;
        if self.focused == Some(id) {
            return Ok(());
        }
        let previous = self.focused.replace(id);
        if let Some(pane) = self.snapshot(id) {
            self.events.emit(&SashEvent::PaneFocused { pane, previous });
        }
        Ok(())
    }

    /// Minimize leaf `id` into the registry.
    pub fn minimize(&mut self, id: SashId) -> Result<(), SashError> {
        let before = self.leaf_rects();
        let record = self.tree.minimize(id)?;
        self.forget(id);
        self.events.emit(&SashEvent::PaneMinimized {
            pane: PaneSnapshot {
                id,
                rect: record.rect,
                title: record.store.title.clone(),
            },
        });
        debug!(%id, minimized = self.minimized.len() + 1, "pane minimized");
        self.minimized.insert(record);
        self.emit_resized(&before);
        Ok(())
    }

    /// Restore a minimized pane. The record stays in the registry if the
    /// restore fails.
    pub fn restore(&mut self, id: SashId) -> Result<RestorePlacement, SashError> {
        let Some(record) = self.minimized.get(id) else {
            return Err(SashError::NotFound { id });
        };
        let before = self.leaf_rects();
        let outcome = self.tree.restore(record)?;
        let _ = self.minimized.take(id);
        if let Some(pane) = self.snapshot(outcome.id) {
            self.events.emit(&SashEvent::PaneRestored {
                pane,
                placement: outcome.placement,
            });
        }
        self.emit_resized(&before);
        Ok(outcome.placement)
    }

    /// Show leaf `id` across the whole container. The tree is unchanged.
    pub fn maximize(&mut self, id: SashId) -> Result<(), SashError> {
        self.tree.require_leaf(id)?;
        if self.maximized == Some(id) {
            return Ok(());
        }
        let _ = self.unmaximize();
        self.maximized = Some(id);
        if let Some(pane) = self.snapshot(id) {
            self.events.emit(&SashEvent::PaneMaximized { pane });
        }
        Ok(())
    }

    /// Leave maximized mode, returning the pane that was maximized.
    pub fn unmaximize(&mut self) -> Option<SashId> {
        let id = self.maximized.take()?;
        if let Some(pane) = self.snapshot(id) {
            self.events.emit(&SashEvent::PaneUnmaximized { pane });
        }
        Some(id)
    }

    /// Current layout as a declarative description.
    #[must_use]
    pub fn export_config(&self) -> LayoutConfig {
        self.tree.to_config()
    }

    fn view(&self, id: SashId) -> Option<PaneView<'_>> {
        let record = self.tree.get_by_id(id)?;
        let leaf = record.leaf_payload()?;
        Some(PaneView {
            id,
            rect: record.rect,
            store: &leaf.store,
            render_target: leaf.render_target,
        })
    }

    fn snapshot(&self, id: SashId) -> Option<PaneSnapshot> {
        self.tree.get_by_id(id).map(PaneSnapshot::of)
    }

    fn leaf_rects(&self) -> FxHashMap<SashId, Rect> {
        self.tree
            .leaves()
            .into_iter()
            .filter_map(|id| self.tree.get_by_id(id).map(|record| (id, record.rect)))
            .collect()
    }

    fn emit_resized(&mut self, before: &FxHashMap<SashId, Rect>) {
        for id in self.tree.leaves() {
            let (Some(&old), Some(record)) = (before.get(&id), self.tree.get_by_id(id)) else {
                continue;
            };
            if old != record.rect {
                let event = SashEvent::PaneResized {
                    id,
                    before: old,
                    after: record.rect,
                };
                self.events.emit(&event);
            }
        }
    }

    /// Drop focus/maximize state pointing at a pane that left the tree.
    fn forget(&mut self, id: SashId) {
        if self.focused.is_some_and(|focused| self.tree.get_by_id(focused).is_none()) {
            self.focused = None;
        }
        if self.maximized == Some(id)
            || self
                .maximized
                .is_some_and(|maximized| self.tree.get_by_id(maximized).is_none())
        {
            self.maximized = None;
        }
    }
}
