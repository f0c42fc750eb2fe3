//! View tree, measurement and drawing.
//!
//! - [`tree::ViewTree`] stores views in an arena and enforces ownership
//! - [`measure`] holds the per-view sizing preferences
//! - [`layouts::LayoutEngine`] resolves frames in a measure and a layout pass
//! - [`components`] provides the stock leaf widgets

pub mod components;
pub mod core;
pub mod layouts;
pub mod measure;
pub(crate) mod render;
pub mod tree;

pub use components::{ImageView, Surface, TextSize, TextView};
pub use self::core::{Damage, Env, FrameState, ViewId, ViewKind, Widget};
pub use layouts::LayoutEngine;
pub use measure::{Align, Alignment, Axis, Margin, Preference, SizePolicy};
pub use tree::ViewTree;
