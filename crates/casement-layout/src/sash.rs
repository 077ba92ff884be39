//! Sash node schema.
//!
//! A sash is one node of the binary layout tree: either a leaf carrying a
//! visible pane's [`SashStore`], or a split with exactly two children whose
//! positions form a complementary pair (`Left`/`Right` or `Top`/`Bottom`).
//! Nodes live in an arena keyed by [`SashId`]; parent and child links are IDs,
//! so ownership never forms a cycle.

use std::collections::BTreeMap;
use std::fmt;

use casement_core::geometry::Rect;
use serde::{Deserialize, Serialize};

use crate::error::SashError;

/// Minimum leaf width applied when a pane does not configure its own floor.
pub const DEFAULT_MIN_WIDTH: u32 = 50;

/// Minimum leaf height applied when a pane does not configure its own floor.
pub const DEFAULT_MIN_HEIGHT: u32 = 50;

/// Basis-point scale used by [`SashSize::Share`].
pub const SHARE_SCALE: u32 = 10_000;

/// Stable identifier for sash nodes.
///
/// `0` is reserved/invalid so IDs are always non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SashId(u64);

impl SashId {
    /// Lowest valid sash ID.
    pub const MIN: Self = Self(1);

    /// Create a new sash ID, rejecting 0.
    pub fn new(raw: u64) -> Result<Self, SashError> {
        if raw == 0 {
            return Err(SashError::ZeroId);
        }
        Ok(Self(raw))
    }

    /// Get the raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Return the next ID, or an error on overflow.
    pub fn checked_next(self) -> Result<Self, SashError> {
        let Some(next) = self.0.checked_add(1) else {
            return Err(SashError::IdOverflow { current: self });
        };
        Self::new(next)
    }
}

impl Default for SashId {
    fn default() -> Self {
        Self::MIN
    }
}

impl fmt::Display for SashId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sash-{}", self.0)
    }
}

/// Role of a sash relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SashPosition {
    #[default]
    Root,
    Left,
    Right,
    Top,
    Bottom,
}

impl SashPosition {
    /// Split axis implied by this position; `None` for the root.
    #[must_use]
    pub const fn axis(self) -> Option<SplitAxis> {
        match self {
            Self::Root => None,
            Self::Left | Self::Right => Some(SplitAxis::Horizontal),
            Self::Top | Self::Bottom => Some(SplitAxis::Vertical),
        }
    }

    /// The sibling position on the same axis; `None` for the root.
    #[must_use]
    pub const fn complement(self) -> Option<Self> {
        match self {
            Self::Root => None,
            Self::Left => Some(Self::Right),
            Self::Right => Some(Self::Left),
            Self::Top => Some(Self::Bottom),
            Self::Bottom => Some(Self::Top),
        }
    }

    /// True for the side laid out first along its axis (`Left`, `Top`).
    #[must_use]
    pub const fn is_leading(self) -> bool {
        matches!(self, Self::Left | Self::Top)
    }
}

/// Orientation of a split node.
///
/// `Horizontal` places children side by side (`Left`/`Right`); `Vertical`
/// stacks them (`Top`/`Bottom`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitAxis {
    Horizontal,
    Vertical,
}

impl SplitAxis {
    /// Positions of the (first, second) children on this axis.
    #[must_use]
    pub const fn positions(self) -> (SashPosition, SashPosition) {
        match self {
            Self::Horizontal => (SashPosition::Left, SashPosition::Right),
            Self::Vertical => (SashPosition::Top, SashPosition::Bottom),
        }
    }

    /// Extent of `rect` along this axis.
    #[must_use]
    pub const fn extent(self, rect: Rect) -> u32 {
        match self {
            Self::Horizontal => rect.width,
            Self::Vertical => rect.height,
        }
    }

    /// Divide `rect` into two adjacent rectangles with the given extents.
    ///
    /// The second rectangle starts where the first ends, so an oversized
    /// first extent pushes the second outside `rect` rather than overlapping.
    #[must_use]
    pub const fn divide(self, rect: Rect, first: u32, second: u32) -> (Rect, Rect) {
        match self {
            Self::Horizontal => (
                Rect::new(rect.x, rect.y, first, rect.height),
                Rect::new(rect.x.saturating_add(first), rect.y, second, rect.height),
            ),
            Self::Vertical => (
                Rect::new(rect.x, rect.y, rect.width, first),
                Rect::new(rect.x, rect.y.saturating_add(first), rect.width, second),
            ),
        }
    }
}

/// Initial-size hint for a sash within its parent split.
///
/// Only consulted when the split has no prior geometry; afterwards the solver
/// preserves the existing ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SashSize {
    /// Absolute extent in pixels.
    Pixels(u32),
    /// Share of the parent extent in basis points (`1..=9999`).
    Share(u16),
}

impl SashSize {
    /// Share hint from a fraction in `(0, 1)`; out-of-range values clamp.
    #[must_use]
    pub fn fraction(fraction: f64) -> Self {
        let bps = (fraction * f64::from(SHARE_SCALE))
            .round()
            .clamp(1.0, f64::from(SHARE_SCALE - 1));
        Self::Share(bps as u16)
    }

    /// Resolve the hint against an available extent, never exceeding it.
    #[must_use]
    pub fn resolve(self, available: u32) -> u32 {
        match self {
            Self::Pixels(pixels) => pixels.min(available),
            Self::Share(bps) => {
                let bps = u64::from(bps).min(u64::from(SHARE_SCALE));
                (u64::from(available) * bps / u64::from(SHARE_SCALE)) as u32
            }
        }
    }
}

/// Pane metadata preserved verbatim across structural mutations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SashStore {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Host-provided content handle (for example a DOM element key).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tabs: Vec<String>,
    /// Marks the stand-in leaf shown when no real pane remains.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub placeholder: bool,
    /// Forward-compatible extension bag.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extensions: BTreeMap<String, String>,
}

impl SashStore {
    /// Store with only a title.
    #[must_use]
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    /// The empty stand-in store.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            placeholder: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn with_tab(mut self, tab: impl Into<String>) -> Self {
        self.tabs.push(tab.into());
        self
    }

    #[must_use]
    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let _ = self.extensions.insert(key.into(), value.into());
        self
    }

    /// True for the stand-in leaf of an otherwise empty tree.
    #[must_use]
    pub const fn is_placeholder(&self) -> bool {
        self.placeholder
    }
}

/// Opaque handle to the host's render target for a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RenderTarget(pub u64);

/// Leaf payload.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SashLeaf {
    pub store: SashStore,
    pub render_target: Option<RenderTarget>,
}

impl SashLeaf {
    #[must_use]
    pub fn new(store: SashStore) -> Self {
        Self {
            store,
            render_target: None,
        }
    }
}

/// Split payload with child references.
///
/// `first` always holds the leading side (`Left` or `Top`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SashSplit {
    pub axis: SplitAxis,
    pub first: SashId,
    pub second: SashId,
}

impl SashSplit {
    /// Both children, leading side first.
    #[must_use]
    pub const fn children(&self) -> [SashId; 2] {
        [self.first, self.second]
    }

    /// The other child of this split, if `child` belongs to it.
    #[must_use]
    pub fn other(&self, child: SashId) -> Option<SashId> {
        if self.first == child {
            Some(self.second)
        } else if self.second == child {
            Some(self.first)
        } else {
            None
        }
    }
}

/// Node payload variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SashNodeKind {
    Leaf(SashLeaf),
    Split(SashSplit),
}

/// One arena node of the sash tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SashRecord {
    pub id: SashId,
    pub parent: Option<SashId>,
    pub position: SashPosition,
    /// Own width floor; splits add their children's minimums on top.
    pub min_width: u32,
    /// Own height floor; splits add their children's minimums on top.
    pub min_height: u32,
    /// Initial-size hint used before this sash has any geometry.
    pub size: Option<SashSize>,
    /// Geometry from the most recent layout pass, in root coordinates.
    pub rect: Rect,
    pub kind: SashNodeKind,
}

impl SashRecord {
    /// Construct a leaf record with default floors.
    #[must_use]
    pub fn leaf(
        id: SashId,
        parent: Option<SashId>,
        position: SashPosition,
        store: SashStore,
    ) -> Self {
        Self {
            id,
            parent,
            position,
            min_width: DEFAULT_MIN_WIDTH,
            min_height: DEFAULT_MIN_HEIGHT,
            size: None,
            rect: Rect::default(),
            kind: SashNodeKind::Leaf(SashLeaf::new(store)),
        }
    }

    /// Construct a split record with no own floor.
    #[must_use]
    pub fn split(
        id: SashId,
        parent: Option<SashId>,
        position: SashPosition,
        split: SashSplit,
    ) -> Self {
        Self {
            id,
            parent,
            position,
            min_width: 0,
            min_height: 0,
            size: None,
            rect: Rect::default(),
            kind: SashNodeKind::Split(split),
        }
    }

    #[must_use]
    pub const fn is_leaf(&self) -> bool {
        matches!(self.kind, SashNodeKind::Leaf(_))
    }

    /// Leaf payload, if this is a leaf.
    #[must_use]
    pub const fn leaf_payload(&self) -> Option<&SashLeaf> {
        match &self.kind {
            SashNodeKind::Leaf(leaf) => Some(leaf),
            SashNodeKind::Split(_) => None,
        }
    }

    /// Store of a leaf; `None` for splits.
    #[must_use]
    pub fn store(&self) -> Option<&SashStore> {
        self.leaf_payload().map(|leaf| &leaf.store)
    }

    pub(crate) fn store_mut(&mut self) -> Option<&mut SashStore> {
        match &mut self.kind {
            SashNodeKind::Leaf(leaf) => Some(&mut leaf.store),
            SashNodeKind::Split(_) => None,
        }
    }

    /// Split payload, if this is a split.
    #[must_use]
    pub const fn split_payload(&self) -> Option<&SashSplit> {
        match &self.kind {
            SashNodeKind::Split(split) => Some(split),
            SashNodeKind::Leaf(_) => None,
        }
    }

    /// Children in layout order; empty for leaves.
    #[must_use]
    pub fn children(&self) -> Vec<SashId> {
        self.split_payload()
            .map(|split| split.children().to_vec())
            .unwrap_or_default()
    }
}
