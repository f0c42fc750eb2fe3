//! Core view types: identifiers, the variant tag, the leaf widget trait and
//! damage tracking.

use core::any::Any;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use slotmap::new_key_type;

use crate::error::Error;
use crate::framebuffer::FrameBuffer;
use crate::resources::ResourceProvider;
use crate::ui::measure::{Align, Alignment};

new_key_type! {
    /// Handle to a node in a [`ViewTree`](crate::ui::tree::ViewTree).
    ///
    /// Handles to removed nodes stay detectably stale after the slot is reused.
    pub struct ViewId;
}

/// The closed set of view variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    /// No children; draws its widget (if any) only
    Leaf,
    /// Children stacked over the same area, later ones on top
    Group(Alignment),
    /// Children placed top to bottom, aligned horizontally
    VGroup(Align),
    /// Children placed left to right, aligned vertically
    HGroup(Align),
}

impl ViewKind {
    pub fn is_container(&self) -> bool {
        !matches!(self, Self::Leaf)
    }
}

/// Lifecycle of a node's frame within the current pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Unset,
    Measured,
    LaidOut,
}

/// Shared, read-only state handed to widgets during measure and draw.
pub struct Env<'a> {
    pub resources: &'a dyn ResourceProvider,
    pub debug_bounds: bool,
}

/// Content of a view: how big it wants to be and how it paints itself.
///
/// Drawing happens with the framebuffer clipped to the widget's frame, so a
/// widget cannot paint over its siblings.
pub trait Widget: Any {
    /// Size the content needs, given at most `available`.
    fn intrinsic_size(&self, _available: Size, _env: &Env<'_>) -> Size {
        Size::zero()
    }

    /// Paint into `frame` (global canvas coordinates).
    fn draw(&self, _surface: &mut FrameBuffer, _frame: Rectangle, _env: &Env<'_>) -> Result<(), Error> {
        Ok(())
    }
}

/// Region of the canvas that must be repainted on the next pass.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Damage {
    bounds: Option<Rectangle>,
    full: bool,
}

impl Damage {
    pub fn is_empty(&self) -> bool {
        !self.full && self.bounds.is_none()
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn bounds(&self) -> Option<Rectangle> {
        self.bounds
    }

    pub fn mark_full(&mut self) {
        self.full = true;
    }

    /// Expand the damage to include `area`. Empty rectangles are ignored.
    pub fn include(&mut self, area: Rectangle) {
        if area.is_zero_sized() {
            return;
        }
        self.bounds = Some(match self.bounds {
            None => area,
            Some(bounds) => union(bounds, area),
        });
    }

    /// The area to repaint on a canvas, or `None` if nothing is damaged.
    pub fn resolve(&self, canvas: Rectangle) -> Option<Rectangle> {
        if self.full {
            return Some(canvas);
        }
        self.bounds
            .map(|bounds| bounds.intersection(&canvas))
            .filter(|area| !area.is_zero_sized())
    }

    pub(crate) fn take(&mut self) -> Damage {
        core::mem::take(self)
    }
}

/// Smallest rectangle containing both `a` and `b`.
pub(crate) fn union(a: Rectangle, b: Rectangle) -> Rectangle {
    let min_x = a.top_left.x.min(b.top_left.x);
    let min_y = a.top_left.y.min(b.top_left.y);

    let max_x = (a.top_left.x + a.size.width as i32).max(b.top_left.x + b.size.width as i32);
    let max_y = (a.top_left.y + a.size.height as i32).max(b.top_left.y + b.size.height as i32);

    Rectangle::new(
        Point::new(min_x, min_y),
        Size::new((max_x - min_x) as u32, (max_y - min_y) as u32),
    )
}
