//! The two-pass layout driver.
//!
//! `measure` resolves a node's size under its preference; `layout` assigns
//! frames top-down. Measurements are memoized per run, keyed by the space
//! offered, so arranging a container a second time during layout does not
//! re-measure unchanged subtrees.

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::trace;

use super::{linear, stack, Arrangement};
use crate::ui::core::{Damage, Env, FrameState, ViewId, ViewKind};
use crate::ui::measure::Axis;
use crate::ui::tree::{MeasureCache, ViewTree};

pub struct LayoutEngine;

impl LayoutEngine {
    /// Resolve the frame of every attached node against a canvas.
    ///
    /// The root always receives the whole canvas. Returns the damage
    /// accumulated since the previous run: invalidations, structural changes
    /// and the old and new area of every node whose frame moved. Running it
    /// again without mutating the tree yields identical frames and no damage.
    pub fn run(tree: &mut ViewTree, canvas: Size, env: &Env<'_>) -> Damage {
        for node in tree.nodes_mut() {
            node.cache = None;
            node.state = FrameState::Unset;
        }

        let root = tree.root();
        let measured = measure(tree, root, canvas, None, env);
        trace!("Root measured at {:?} on a {:?} canvas", measured, canvas);
        layout(tree, root, Rectangle::new(Point::zero(), canvas), env);

        tree.take_damage()
    }
}

/// Size of `id` when offered `available` (margins already removed).
///
/// `forced` pins the size along one axis; linear containers use it to hand
/// a weighted child its share.
pub(crate) fn measure(
    tree: &mut ViewTree,
    id: ViewId,
    available: Size,
    forced: Option<(Axis, u32)>,
    env: &Env<'_>,
) -> Size {
    let Some(node) = tree.get(id) else {
        return Size::zero();
    };
    if let Some(cache) = node.cache
        && cache.available == available
        && cache.forced == forced
    {
        return cache.size;
    }
    let kind = node.kind;
    let preference = node.preference;

    let pinned = |axis: Axis| match forced {
        Some((along, px)) if along == axis => Some(px),
        _ => None,
    };
    let bound = |axis: Axis| {
        pinned(axis).unwrap_or_else(|| preference.policy(axis).bound(axis.of(available)))
    };
    let bounds = Size::new(bound(Axis::Horizontal), bound(Axis::Vertical));

    let needs_content = [Axis::Horizontal, Axis::Vertical]
        .into_iter()
        .any(|axis| pinned(axis).is_none() && preference.policy(axis).depends_on_content());
    let content = if !needs_content {
        Size::zero()
    } else if kind.is_container() {
        arrange(tree, id, kind, bounds, env).extent
    } else {
        tree.get(id)
            .and_then(|node| node.widget.as_deref())
            .map_or(Size::zero(), |widget| widget.intrinsic_size(bounds, env))
    };

    let resolve = |axis: Axis| {
        pinned(axis).unwrap_or_else(|| {
            preference
                .policy(axis)
                .resolve(axis.of(available), axis.of(content))
        })
    };
    let size = Size::new(resolve(Axis::Horizontal), resolve(Axis::Vertical));

    if let Some(node) = tree.get_mut(id) {
        node.cache = Some(MeasureCache {
            available,
            forced,
            size,
        });
        if node.state == FrameState::Unset {
            node.state = FrameState::Measured;
        }
    }
    size
}

/// Assign `frame` to `id` and lay out its subtree inside it.
pub(crate) fn layout(tree: &mut ViewTree, id: ViewId, frame: Rectangle, env: &Env<'_>) {
    let Some(node) = tree.get_mut(id) else {
        return;
    };
    let previous = node.frame.replace(frame);
    node.state = FrameState::LaidOut;
    let kind = node.kind;

    match previous {
        Some(old) if old == frame => {}
        Some(old) => {
            trace!("{:?} moved from {:?} to {:?}", id, old, frame);
            tree.record_damage(old);
            tree.record_damage(frame);
        }
        None => tree.record_damage(frame),
    }

    if !kind.is_container() {
        return;
    }
    let arrangement = arrange(tree, id, kind, frame.size, env);
    for placement in arrangement.placements {
        let child_frame = Rectangle::new(frame.top_left + placement.offset, placement.size);
        layout(tree, placement.child, child_frame, env);
    }
}

/// Arrange the children of a container with the given inner size.
pub(crate) fn arrange(
    tree: &mut ViewTree,
    id: ViewId,
    kind: ViewKind,
    inner: Size,
    env: &Env<'_>,
) -> Arrangement {
    let children = tree.children(id).to_vec();
    match kind {
        ViewKind::Group(alignment) => stack::arrange(tree, &children, alignment, inner, env),
        ViewKind::VGroup(align) => linear::arrange(tree, &children, Axis::Vertical, align, inner, env),
        ViewKind::HGroup(align) => {
            linear::arrange(tree, &children, Axis::Horizontal, align, inner, env)
        }
        ViewKind::Leaf => Arrangement::default(),
    }
}
