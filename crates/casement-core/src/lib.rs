#![forbid(unsafe_code)]

//! Core: geometry primitives and logging bootstrap for casement.
//!
//! # Role in casement
//! `casement-core` holds the pieces shared by every layer that consumes pane
//! geometry: the pixel [`geometry::Rect`] used by the layout solver, the
//! restore heuristics and the presentation layer, plus the
//! [`logging`] helpers that wire `tracing` output for embedders.

pub mod geometry;
pub mod logging;

pub use geometry::Rect;
