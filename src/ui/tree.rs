//! Arena-backed view tree.
//!
//! A parent exclusively owns its children: removing a container removes its
//! whole subtree. Each node keeps a non-owning `parent` back-edge that is
//! only used for lookups such as [`ViewTree::relative_frame`].
//!
//! Every structural change records damage, which the next pass repaints.

use alloc::boxed::Box;
use alloc::vec::Vec;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::{debug, trace};
use slotmap::SlotMap;

use crate::error::Error;
use crate::ui::core::{Damage, FrameState, ViewId, ViewKind, Widget};
use crate::ui::measure::{Align, Alignment, Axis, Preference};

/// Memoized measurement, valid for one layout run.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MeasureCache {
    pub available: Size,
    pub forced: Option<(Axis, u32)>,
    pub size: Size,
}

pub(crate) struct Node {
    pub parent: Option<ViewId>,
    pub kind: ViewKind,
    pub preference: Preference,
    pub widget: Option<Box<dyn Widget>>,
    pub children: Vec<ViewId>,
    /// Last resolved frame, `None` until the node is laid out once
    pub frame: Option<Rectangle>,
    pub state: FrameState,
    pub cache: Option<MeasureCache>,
}

impl Node {
    fn new(kind: ViewKind, preference: Preference, widget: Option<Box<dyn Widget>>) -> Self {
        Self {
            parent: None,
            kind,
            preference,
            widget,
            children: Vec::new(),
            frame: None,
            state: FrameState::Unset,
            cache: None,
        }
    }
}

pub struct ViewTree {
    nodes: SlotMap<ViewId, Node>,
    root: ViewId,
    damage: Damage,
}

impl Default for ViewTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewTree {
    /// Create a tree whose root is a stacking group filling the canvas.
    pub fn new() -> Self {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::new(
            ViewKind::Group(Alignment::default()),
            Preference::fill(),
            None,
        ));
        let mut damage = Damage::default();
        damage.mark_full();
        Self {
            nodes,
            root,
            damage,
        }
    }

    pub fn root(&self) -> ViewId {
        self.root
    }

    /// Number of live nodes, attached or not, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: ViewId) -> bool {
        self.get(id).is_some()
    }

    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// A plain view: measures to nothing and draws nothing.
    pub fn view(&mut self, preference: Preference) -> ViewId {
        self.insert(Node::new(ViewKind::Leaf, preference, None))
    }

    /// A leaf view backed by a widget.
    pub fn leaf(&mut self, widget: impl Widget, preference: Preference) -> ViewId {
        self.insert(Node::new(ViewKind::Leaf, preference, Some(Box::new(widget))))
    }

    /// A group stacking its children over the same area.
    pub fn group(&mut self, alignment: Alignment, preference: Preference) -> ViewId {
        self.insert(Node::new(ViewKind::Group(alignment), preference, None))
    }

    /// A vertical linear group; `horizontal` aligns children across it.
    pub fn vgroup(&mut self, horizontal: Align, preference: Preference) -> ViewId {
        self.insert(Node::new(ViewKind::VGroup(horizontal), preference, None))
    }

    /// A horizontal linear group; `vertical` aligns children across it.
    pub fn hgroup(&mut self, vertical: Align, preference: Preference) -> ViewId {
        self.insert(Node::new(ViewKind::HGroup(vertical), preference, None))
    }

    /// Give a container its own content, drawn before its children.
    pub fn set_background(&mut self, container: ViewId, widget: impl Widget) -> Result<(), Error> {
        let node = self.get_mut(container).ok_or(STALE)?;
        if !node.kind.is_container() {
            return Err(Error::InvalidState("background requires a container"));
        }
        node.widget = Some(Box::new(widget));
        self.invalidate(Some(container));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Append `child` to `parent`'s children (drawn on top of earlier ones).
    ///
    /// Adding a child to the parent it already has is a no-op.
    pub fn add_view(&mut self, parent: ViewId, child: ViewId) -> Result<(), Error> {
        let parent_node = self.get(parent).ok_or(STALE)?;
        if !parent_node.kind.is_container() {
            return Err(Error::InvalidState("parent is not a container"));
        }
        let child_node = self.get(child).ok_or(STALE)?;
        match child_node.parent {
            Some(current) if current == parent => return Ok(()),
            Some(_) => return Err(Error::InvalidState("view already has a different parent")),
            None => {}
        }
        if child == self.root {
            return Err(Error::InvalidState("the root cannot be attached"));
        }
        if self.is_ancestor(child, parent) {
            return Err(Error::InvalidState("attaching would create a cycle"));
        }

        if let Some(node) = self.get_mut(child) {
            node.parent = Some(parent);
        }
        if let Some(node) = self.get_mut(parent) {
            node.children.push(child);
        }
        trace!("Attached {:?} to {:?}", child, parent);
        self.invalidate(Some(parent));
        Ok(())
    }

    pub fn add_views(&mut self, parent: ViewId, children: &[ViewId]) -> Result<(), Error> {
        children
            .iter()
            .try_for_each(|&child| self.add_view(parent, child))
    }

    /// Remove a view and its whole subtree, detaching it from its parent.
    pub fn remove(&mut self, id: ViewId) -> Result<(), Error> {
        if id == self.root {
            return Err(Error::InvalidState("the root cannot be removed"));
        }
        let node = self.get(id).ok_or(STALE)?;
        let (frame, parent) = (node.frame, node.parent);
        if let Some(frame) = frame {
            self.damage.include(frame);
        }
        if let Some(parent) = parent
            && let Some(parent_node) = self.get_mut(parent)
        {
            parent_node.children.retain(|&c| c != id);
        }

        let mut pending = alloc::vec![id];
        let mut removed = 0usize;
        while let Some(next) = pending.pop() {
            if let Some(node) = self.take(next) {
                pending.extend(node.children);
                removed += 1;
            }
        }
        debug!("Removed {:?} ({} nodes)", id, removed);
        Ok(())
    }

    /// Replace a view's preference; the view is re-measured on the next pass.
    pub fn set_preference(&mut self, id: ViewId, preference: Preference) -> Result<(), Error> {
        let node = self.get_mut(id).ok_or(STALE)?;
        node.preference = preference;
        self.invalidate(Some(id));
        Ok(())
    }

    /// Mark a view (or, with `None`, the whole canvas) for repaint.
    ///
    /// A view that has never been laid out is picked up by the layout pass
    /// on its own; stale ids are ignored.
    pub fn invalidate(&mut self, id: Option<ViewId>) {
        match id {
            None => self.damage.mark_full(),
            Some(id) => match self.get(id).map(|node| node.frame) {
                Some(Some(frame)) => self.damage.include(frame),
                Some(None) => {}
                None => debug!("Ignoring invalidation of stale view {:?}", id),
            },
        }
    }

    /// Mutable access to a view's widget, which is invalidated.
    pub fn widget_mut<W: Widget>(&mut self, id: ViewId) -> Option<&mut W> {
        self.invalidate(Some(id));
        let widget: &mut dyn Widget = self.get_mut(id)?.widget.as_deref_mut()?;
        (widget as &mut dyn core::any::Any).downcast_mut::<W>()
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn widget<W: Widget>(&self, id: ViewId) -> Option<&W> {
        let widget: &dyn Widget = self.get(id)?.widget.as_deref()?;
        (widget as &dyn core::any::Any).downcast_ref::<W>()
    }

    pub fn children(&self, id: ViewId) -> &[ViewId] {
        self.get(id).map_or(&[], |node| node.children.as_slice())
    }

    pub fn parent(&self, id: ViewId) -> Option<ViewId> {
        self.get(id)?.parent
    }

    pub fn kind(&self, id: ViewId) -> Option<ViewKind> {
        self.get(id).map(|node| node.kind)
    }

    pub fn preference(&self, id: ViewId) -> Option<Preference> {
        self.get(id).map(|node| node.preference)
    }

    /// Resolved frame in canvas coordinates, once laid out.
    pub fn frame(&self, id: ViewId) -> Option<Rectangle> {
        self.get(id)?.frame
    }

    /// Frame relative to the parent's frame.
    pub fn relative_frame(&self, id: ViewId) -> Option<Rectangle> {
        let frame = self.frame(id)?;
        let origin = self
            .parent(id)
            .and_then(|parent| self.frame(parent))
            .map_or(Point::zero(), |parent| parent.top_left);
        Some(Rectangle::new(frame.top_left - origin, frame.size))
    }

    pub fn frame_state(&self, id: ViewId) -> Option<FrameState> {
        self.get(id).map(|node| node.state)
    }

    /// Whether `ancestor` is `id` itself or lies on its parent chain.
    pub fn is_ancestor(&self, ancestor: ViewId, id: ViewId) -> bool {
        let mut current = Some(id);
        while let Some(next) = current {
            if next == ancestor {
                return true;
            }
            current = self.parent(next);
        }
        false
    }

    /// Damage recorded since the last call, reset afterwards.
    pub fn take_damage(&mut self) -> Damage {
        self.damage.take()
    }

    pub fn has_damage(&self) -> bool {
        !self.damage.is_empty()
    }

    // ------------------------------------------------------------------
    // Arena
    // ------------------------------------------------------------------

    pub(crate) fn get(&self, id: ViewId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: ViewId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> + '_ {
        self.nodes.values_mut()
    }

    pub(crate) fn record_damage(&mut self, area: Rectangle) {
        self.damage.include(area);
    }

    fn insert(&mut self, node: Node) -> ViewId {
        self.nodes.insert(node)
    }

    fn take(&mut self, id: ViewId) -> Option<Node> {
        self.nodes.remove(id)
    }
}

const STALE: Error = Error::InvalidState("unknown or removed view");

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::measure::SizePolicy;

    struct Marker(u8);
    impl Widget for Marker {}

    #[test]
    fn test_new_tree_has_root_group() {
        let tree = ViewTree::new();
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.kind(tree.root()), Some(ViewKind::Group(Alignment::default())));
        assert_eq!(tree.preference(tree.root()), Some(Preference::fill()));
        assert!(tree.has_damage());
    }

    #[test]
    fn test_add_view_keeps_insertion_order() {
        let mut tree = ViewTree::new();
        let root = tree.root();
        let a = tree.view(Preference::wrap());
        let b = tree.view(Preference::wrap());
        tree.add_views(root, &[a, b]).unwrap();

        assert_eq!(tree.children(root), &[a, b]);
        assert_eq!(tree.parent(a), Some(root));
    }

    #[test]
    fn test_reparenting_is_rejected() {
        let mut tree = ViewTree::new();
        let root = tree.root();
        let first = tree.vgroup(Align::Start, Preference::fill());
        let second = tree.hgroup(Align::Start, Preference::fill());
        let child = tree.view(Preference::wrap());
        tree.add_views(root, &[first, second]).unwrap();
        tree.add_view(first, child).unwrap();

        assert!(matches!(
            tree.add_view(second, child),
            Err(Error::InvalidState(_))
        ));
        // Same parent again is accepted without duplicating
        tree.add_view(first, child).unwrap();
        assert_eq!(tree.children(first), &[child]);
    }

    #[test]
    fn test_leaf_cannot_take_children() {
        let mut tree = ViewTree::new();
        let leaf = tree.view(Preference::wrap());
        let child = tree.view(Preference::wrap());
        assert!(tree.add_view(leaf, child).is_err());
    }

    #[test]
    fn test_cycles_and_root_attachment_are_rejected() {
        let mut tree = ViewTree::new();
        let root = tree.root();
        let outer = tree.group(Alignment::default(), Preference::fill());
        let inner = tree.group(Alignment::default(), Preference::fill());
        tree.add_view(root, outer).unwrap();
        tree.add_view(outer, inner).unwrap();

        assert!(tree.add_view(inner, root).is_err());
        let detached = tree.group(Alignment::default(), Preference::fill());
        assert!(tree.add_view(detached, detached).is_err());
    }

    #[test]
    fn test_remove_destroys_subtree_and_stales_ids() {
        let mut tree = ViewTree::new();
        let root = tree.root();
        let group = tree.vgroup(Align::Start, Preference::fill());
        let a = tree.view(Preference::wrap());
        let b = tree.view(Preference::wrap());
        tree.add_view(root, group).unwrap();
        tree.add_views(group, &[a, b]).unwrap();
        assert_eq!(tree.len(), 4);

        tree.remove(group).unwrap();
        assert_eq!(tree.len(), 1);
        assert!(tree.children(root).is_empty());
        assert!(!tree.contains(a));

        // Slot reuse does not revive old handles
        let reused = tree.view(Preference::wrap());
        assert!(tree.contains(reused));
        assert!(!tree.contains(group));
        assert!(tree.add_view(root, b).is_err());
        assert!(tree.remove(root).is_err());
    }

    #[test]
    fn test_stale_id_after_slot_reuse() {
        let mut tree = ViewTree::new();
        let old = tree.view(Preference::wrap());
        tree.remove(old).unwrap();
        let new = tree.view(Preference::wrap());
        assert_ne!(new, old);
        assert!(!tree.contains(old));
        assert!(tree.set_preference(old, Preference::fill()).is_err());
    }

    #[test]
    fn test_widget_downcast() {
        let mut tree = ViewTree::new();
        let id = tree.leaf(Marker(7), Preference::wrap());
        assert_eq!(tree.widget::<Marker>(id).map(|m| m.0), Some(7));

        tree.widget_mut::<Marker>(id).unwrap().0 = 9;
        assert_eq!(tree.widget::<Marker>(id).map(|m| m.0), Some(9));

        struct Other;
        impl Widget for Other {}
        assert!(tree.widget::<Other>(id).is_none());
    }

    #[test]
    fn test_background_only_on_containers() {
        let mut tree = ViewTree::new();
        let leaf = tree.view(Preference::wrap());
        let group = tree.group(Alignment::default(), Preference::fill());
        assert!(tree.set_background(leaf, Marker(1)).is_err());
        tree.set_background(group, Marker(1)).unwrap();
        assert!(tree.widget::<Marker>(group).is_some());
    }

    #[test]
    fn test_set_preference_updates() {
        let mut tree = ViewTree::new();
        let id = tree.view(Preference::wrap());
        let pref = Preference::wrap().with_height(SizePolicy::Fixed(12));
        tree.set_preference(id, pref).unwrap();
        assert_eq!(tree.preference(id), Some(pref));
    }
}
