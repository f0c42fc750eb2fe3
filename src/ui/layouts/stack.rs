//! Stacking arrangement for `Group`: every child gets the whole inner area.

use alloc::vec::Vec;
use embedded_graphics::prelude::*;

use super::engine::measure;
use super::{Arrangement, Placement};
use crate::ui::core::{Env, ViewId};
use crate::ui::measure::{fit_margin, Alignment, Axis};
use crate::ui::tree::ViewTree;

pub(super) fn arrange(
    tree: &mut ViewTree,
    children: &[ViewId],
    alignment: Alignment,
    inner: Size,
    env: &Env<'_>,
) -> Arrangement {
    let mut placements = Vec::with_capacity(children.len());
    let mut extent = Size::zero();

    for &child in children {
        let Some(preference) = tree.preference(child) else {
            continue;
        };
        let (left, right) = fit_margin(preference.margin.left, preference.margin.right, inner.width);
        let (top, bottom) = fit_margin(preference.margin.top, preference.margin.bottom, inner.height);
        let available = Size::new(inner.width - left - right, inner.height - top - bottom);

        let size = measure(tree, child, available, None, env);

        let align_h = preference
            .align_hint(Axis::Horizontal)
            .unwrap_or(alignment.horizontal);
        let align_v = preference
            .align_hint(Axis::Vertical)
            .unwrap_or(alignment.vertical);
        let x = left + align_h.offset(available.width.saturating_sub(size.width));
        let y = top + align_v.offset(available.height.saturating_sub(size.height));

        extent.width = extent.width.max(left + size.width + right);
        extent.height = extent.height.max(top + size.height + bottom);
        placements.push(Placement {
            child,
            offset: Point::new(x as i32, y as i32),
            size,
        });
    }

    Arrangement { placements, extent }
}
