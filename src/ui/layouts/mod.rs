//! Measure and layout algorithms.
//!
//! [`LayoutEngine`] drives both passes from the root. The container kinds
//! share one contract: given the inner size of the container, produce a
//! placement for every child plus the extent they occupy together, which is
//! the container's content size when it wraps its content.

pub mod engine;
mod linear;
mod stack;

use alloc::vec::Vec;
use embedded_graphics::prelude::*;

use crate::ui::core::ViewId;

pub use engine::LayoutEngine;

/// Resolved position of one child, relative to its container's top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Placement {
    pub child: ViewId,
    pub offset: Point,
    pub size: Size,
}

/// Result of arranging a container's children inside a given size.
#[derive(Debug, Default)]
pub(crate) struct Arrangement {
    pub placements: Vec<Placement>,
    /// Tightest size containing every child and its margins
    pub extent: Size,
}
