//! Linear arrangement for `VGroup` and `HGroup`.
//!
//! Non-weighted children are measured first, in insertion order, each
//! against the primary-axis space its earlier siblings left over. Weighted
//! children are then sized from whatever remains.

use alloc::vec::Vec;
use embedded_graphics::prelude::*;
use log::trace;

use super::engine::measure;
use super::{Arrangement, Placement};
use crate::ui::core::{Env, ViewId};
use crate::ui::measure::{fit_margin, Align, Axis, Preference};
use crate::ui::tree::ViewTree;

struct Entry {
    child: ViewId,
    preference: Preference,
    /// Primary-axis margins after fitting
    margin: (u32, u32),
    /// Cross-axis margins after fitting
    cross_margin: (u32, u32),
    size: Size,
}

pub(super) fn arrange(
    tree: &mut ViewTree,
    children: &[ViewId],
    axis: Axis,
    cross_align: Align,
    inner: Size,
    env: &Env<'_>,
) -> Arrangement {
    let cross = axis.cross();
    let inner_primary = axis.of(inner);
    let inner_cross = cross.of(inner);

    let mut entries: Vec<Entry> = Vec::with_capacity(children.len());
    let mut weighted: Vec<(usize, f32)> = Vec::new();
    let mut remaining = inner_primary;

    for &child in children {
        let Some(preference) = tree.preference(child) else {
            continue;
        };
        let (cross_start, cross_end) = preference.margin.along(cross);
        let cross_margin = fit_margin(cross_start, cross_end, inner_cross);
        let cross_available = inner_cross - cross_margin.0 - cross_margin.1;

        if let Some(weight) = preference.policy(axis).weight() {
            weighted.push((entries.len(), weight));
            entries.push(Entry {
                child,
                preference,
                margin: (0, 0),
                cross_margin,
                size: Size::zero(),
            });
            continue;
        }

        let (start, end) = preference.margin.along(axis);
        let margin = fit_margin(start, end, remaining);
        let available = axis.size(remaining - margin.0 - margin.1, cross_available);
        let size = measure(tree, child, available, None, env);
        remaining = remaining.saturating_sub(margin.0 + margin.1 + axis.of(size));

        entries.push(Entry {
            child,
            preference,
            margin,
            cross_margin,
            size,
        });
    }

    if !weighted.is_empty() {
        let weights: Vec<f32> = weighted.iter().map(|&(_, weight)| weight).collect();
        let shares = distribute(remaining, &weights);
        trace!("Distributing {}px by weights {:?}: {:?}", remaining, weights, shares);

        for (&(index, _), share) in weighted.iter().zip(shares) {
            let entry = &mut entries[index];
            let (start, end) = entry.preference.margin.along(axis);
            entry.margin = fit_margin(start, end, share);
            let length = share - entry.margin.0 - entry.margin.1;
            let cross_available = inner_cross - entry.cross_margin.0 - entry.cross_margin.1;
            entry.size = measure(
                tree,
                entry.child,
                axis.size(length, cross_available),
                Some((axis, length)),
                env,
            );
        }
    }

    let mut placements = Vec::with_capacity(entries.len());
    let mut cursor = 0u32;
    let mut cross_extent = 0u32;
    for entry in &entries {
        let along = cursor + entry.margin.0;
        let size_cross = cross.of(entry.size);
        let cross_available = inner_cross - entry.cross_margin.0 - entry.cross_margin.1;
        let align = entry.preference.align_hint(cross).unwrap_or(cross_align);
        let across = entry.cross_margin.0 + align.offset(cross_available.saturating_sub(size_cross));

        placements.push(Placement {
            child: entry.child,
            offset: axis.point(along, across),
            size: entry.size,
        });
        cursor = along + axis.of(entry.size) + entry.margin.1;
        cross_extent = cross_extent.max(entry.cross_margin.0 + size_cross + entry.cross_margin.1);
    }

    Arrangement {
        placements,
        extent: axis.size(cursor, cross_extent),
    }
}

/// Split `remaining` pixels between weighted children.
///
/// A lone weighted child takes its fraction of the remaining space. Several
/// weighted children share all of it in proportion to their raw fractions,
/// with rounding carried forward so the shares sum exactly to `remaining`.
fn distribute(remaining: u32, weights: &[f32]) -> Vec<u32> {
    if let [weight] = weights {
        let share = (remaining as f64 * *weight as f64) as u32;
        return alloc::vec![share.min(remaining)];
    }

    let total: f64 = weights.iter().map(|&w| w as f64).sum();
    if total <= 0.0 {
        return alloc::vec![0; weights.len()];
    }
    let mut shares = Vec::with_capacity(weights.len());
    let mut accumulated = 0f64;
    let mut previous = 0u32;
    for (index, &weight) in weights.iter().enumerate() {
        accumulated += weight as f64;
        let boundary = if index + 1 == weights.len() {
            remaining
        } else {
            ((remaining as f64 * accumulated / total) as u32).clamp(previous, remaining)
        };
        shares.push(boundary - previous);
        previous = boundary;
    }
    shares
}
