#![cfg_attr(not(any(test, feature = "std")), no_std)]

//! Layout and redraw scheduling for grayscale e-paper displays.
//!
//! A [`Context`] owns a tree of views and a [`FrameBuffer`]. Each pass
//! measures and lays out the tree, repaints the damaged region and hands the
//! finished frame to a driver callback together with a [`RefreshHint`].

extern crate alloc;

pub mod config;
pub mod context;
pub mod error;
pub mod framebuffer;
pub mod refresh;
pub mod resources;
pub mod ui;

pub use config::{ContextConfig, RefreshPolicy};
pub use context::{Context, ContextHandle, ContextState, Redraw};
pub use error::Error;
pub use framebuffer::FrameBuffer;
pub use refresh::RefreshHint;
pub use resources::{Bitmap, MemoryResources, NoResources, ResourceProvider};
