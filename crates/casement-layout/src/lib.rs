#![forbid(unsafe_code)]

//! Tiling layout engine for embeddable window managers.
//!
//! Panes are the leaves of a binary "sash" tree. Each split divides its
//! rectangle between two children, either side by side (`Left`/`Right`) or
//! stacked (`Top`/`Bottom`). The crate provides:
//!
//! - [`SashTree`]: the arena-backed tree, its queries and invariant checks
//! - the layout solver ([`SashTree::resize`]) honoring per-pane minimums
//! - structural mutations ([`SashTree::add_pane`], [`SashTree::remove_pane`],
//!   [`SashTree::swap_panes`], [`SashTree::move_pane`],
//!   [`SashTree::resize_divider`]), each applied atomically
//! - minimize/restore ([`SashTree::minimize`], [`SashTree::restore`])
//! - declarative JSON layouts ([`LayoutConfig`])
//! - [`WindowManager`], which ties a tree to focus, maximize, the minimized
//!   registry and lifecycle [`SashEvent`]s
//!
//! # Example
//!
//! ```
//! use casement_layout::{PaneSpec, SashPosition, SashSize, SashStore, SashTree};
//!
//! let mut tree = SashTree::new(800, 600, SashStore::titled("editor")).unwrap();
//! let editor = tree.root();
//! let preview = tree
//!     .add_pane(
//!         editor,
//!         PaneSpec::new(SashStore::titled("preview")).with_size(SashSize::Pixels(300)),
//!         SashPosition::Right,
//!     )
//!     .unwrap();
//! assert_eq!(tree.get_by_id(preview).unwrap().rect.width, 300);
//! assert_eq!(tree.get_by_id(editor).unwrap().rect.width, 500);
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod manager;
pub mod minimize;
pub mod ops;
pub mod sash;
pub mod solver;
pub mod tree;

pub use casement_core::geometry::Rect;
pub use config::{ConfigError, LayoutConfig, SashSpec};
pub use error::{InvariantViolation, SashError, SashErrorKind};
pub use event::{EventBus, EventSink, PaneSnapshot, SashEvent, SashEventKind, SubscriptionId};
pub use manager::{PaneView, WindowManager};
pub use minimize::{MinimizedRecord, MinimizedRegistry, RestoreOutcome, RestorePlacement};
pub use ops::{
    DividerResize, PaneSpec, RemovedPane, SashOperation, SashOperationKind, SashOperationOutcome,
};
pub use sash::{
    DEFAULT_MIN_HEIGHT, DEFAULT_MIN_WIDTH, RenderTarget, SashId, SashLeaf, SashNodeKind,
    SashPosition, SashRecord, SashSize, SashSplit, SashStore, SplitAxis,
};
pub use solver::{Division, distribute};
pub use tree::{MinSize, SashTree};
