//! Draw pass over a laid-out tree.
//!
//! Only nodes intersecting the damaged area are visited, and each one is
//! drawn with the framebuffer clipped to its frame within that area. A
//! failing subtree is rolled back so it shows up as an empty view; the rest
//! of the pass continues.

use embedded_graphics::pixelcolor::Gray8;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyleBuilder, Rectangle, StrokeAlignment};
use log::warn;

use crate::error::Error;
use crate::framebuffer::FrameBuffer;
use crate::ui::core::{Env, ViewId};
use crate::ui::tree::ViewTree;

/// Outline colour of debug bounds.
const DEBUG_BOUNDS_COLOR: Gray8 = Gray8::new(0x60);

/// Draw every node of `tree` that overlaps `area`.
///
/// An error is only returned when the root itself fails; failures below it
/// are logged and contained.
pub(crate) fn draw_tree(
    tree: &ViewTree,
    surface: &mut FrameBuffer,
    area: Rectangle,
    env: &Env<'_>,
) -> Result<(), Error> {
    let result = draw_node(tree, tree.root(), surface, area, env);
    surface.reset_clip();
    result
}

fn draw_node(
    tree: &ViewTree,
    id: ViewId,
    surface: &mut FrameBuffer,
    area: Rectangle,
    env: &Env<'_>,
) -> Result<(), Error> {
    let Some(node) = tree.get(id) else {
        return Ok(());
    };
    let Some(frame) = node.frame else {
        return Ok(());
    };
    let visible = frame.intersection(&area);
    if visible.is_zero_sized() {
        return Ok(());
    }

    if let Some(widget) = node.widget.as_deref() {
        surface.set_clip(visible);
        widget.draw(surface, frame, env)?;
    }

    for &child in &node.children {
        let Some(child_frame) = tree.frame(child) else {
            continue;
        };
        let snapshot = surface.snapshot(child_frame.intersection(&area));
        if let Err(err) = draw_node(tree, child, surface, area, env) {
            warn!("Drawing {:?} failed, leaving it empty: {}", child, err);
            surface.restore(snapshot);
        }
    }

    if env.debug_bounds {
        surface.set_clip(visible);
        frame
            .into_styled(
                PrimitiveStyleBuilder::new()
                    .stroke_color(DEBUG_BOUNDS_COLOR)
                    .stroke_width(1)
                    .stroke_alignment(StrokeAlignment::Inside)
                    .build(),
            )
            .draw(surface)?;
    }
    Ok(())
}
