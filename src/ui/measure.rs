//! Size policies, margins and alignment: the measurement preference every
//! view carries.
//!
//! Everything here is plain value computation. Resolution never fails: a
//! request that does not fit is shrunk to the space that is available.

use embedded_graphics::prelude::{Point, Size};
use log::debug;

use crate::error::Error;

/// Sizing rule for one axis of a view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SizePolicy {
    /// Exactly this many pixels, shrunk when less space is available
    Fixed(u32),
    /// All of the space the parent offers
    MatchParent,
    /// The space the content needs
    WrapContent,
    /// A fraction in `(0, 1]` of the space left over by non-weighted siblings.
    ///
    /// Only meaningful on the primary axis of a linear container; anywhere
    /// else it behaves like [`SizePolicy::WrapContent`].
    Weighted(f32),
}

impl SizePolicy {
    /// Checked constructor for [`SizePolicy::Weighted`].
    pub fn weighted(fraction: f32) -> Result<Self, Error> {
        if fraction > 0.0 && fraction <= 1.0 {
            Ok(Self::Weighted(fraction))
        } else {
            Err(Error::InvalidConfiguration(
                "weight fraction must be in (0, 1]",
            ))
        }
    }

    pub fn is_weighted(self) -> bool {
        matches!(self, Self::Weighted(_))
    }

    /// Weight fraction clamped to `[0, 1]`, non-positive and NaN as zero.
    /// `None` unless weighted.
    pub(crate) fn weight(self) -> Option<f32> {
        match self {
            Self::Weighted(fraction) if fraction > 0.0 => Some(fraction.min(1.0)),
            Self::Weighted(_) => Some(0.0),
            _ => None,
        }
    }

    /// The size this policy allows before content is known: definite
    /// policies resolve fully, content-driven ones are bounded by `available`.
    pub(crate) fn bound(self, available: u32) -> u32 {
        match self {
            Self::Fixed(px) => px.min(available),
            Self::MatchParent | Self::WrapContent | Self::Weighted(_) => available,
        }
    }

    /// Final size along one axis once the content size is known.
    pub(crate) fn resolve(self, available: u32, content: u32) -> u32 {
        match self {
            Self::Fixed(px) => px.min(available),
            Self::MatchParent => available,
            Self::WrapContent => content.min(available),
            Self::Weighted(_) => {
                debug!("Weighted policy outside a linear primary axis, treated as wrap-content");
                content.min(available)
            }
        }
    }

    pub(crate) fn depends_on_content(self) -> bool {
        matches!(self, Self::WrapContent | Self::Weighted(_))
    }
}

/// Layout axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

impl Axis {
    pub fn cross(self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }

    /// Extent of `size` along this axis.
    pub(crate) fn of(self, size: Size) -> u32 {
        match self {
            Self::Horizontal => size.width,
            Self::Vertical => size.height,
        }
    }

    /// Build a size from an extent along this axis and one across it.
    pub(crate) fn size(self, along: u32, across: u32) -> Size {
        match self {
            Self::Horizontal => Size::new(along, across),
            Self::Vertical => Size::new(across, along),
        }
    }

    /// Build a point from an offset along this axis and one across it.
    pub(crate) fn point(self, along: u32, across: u32) -> Point {
        match self {
            Self::Horizontal => Point::new(along as i32, across as i32),
            Self::Vertical => Point::new(across as i32, along as i32),
        }
    }
}

/// Margin around a view (top, right, bottom, left)
///
/// Margins sit outside the view's frame. When the parent cannot offer
/// enough space for both the margin and the view, the margin is reduced
/// proportionally instead of producing a negative size.
///
/// # Examples
///
/// ```ignore
/// // Equal margin on all sides
/// let m = Margin::all(4);
///
/// // 12px top/bottom, 16px left/right
/// let m = Margin::symmetric(12, 16);
///
/// // Individual control: top=5, right=5, bottom=2, left=10
/// let m = Margin::new(5, 5, 2, 10);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Margin {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Margin {
    pub const ZERO: Self = Self::all(0);

    /// Creates equal margin on all sides
    pub const fn all(value: u32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    /// Creates symmetric margin (vertical and horizontal)
    pub const fn symmetric(vertical: u32, horizontal: u32) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    /// Creates margin with individual control for each side
    pub const fn new(top: u32, right: u32, bottom: u32, left: u32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    /// Returns total horizontal margin (left + right)
    pub fn horizontal(&self) -> u32 {
        self.left + self.right
    }

    /// Returns total vertical margin (top + bottom)
    pub fn vertical(&self) -> u32 {
        self.top + self.bottom
    }

    /// `(start, end)` margins along an axis.
    pub(crate) fn along(&self, axis: Axis) -> (u32, u32) {
        match axis {
            Axis::Horizontal => (self.left, self.right),
            Axis::Vertical => (self.top, self.bottom),
        }
    }
}

/// Shrink a `(start, end)` margin pair so it fits in `available`.
///
/// Margins are kept as requested unless there is no space left for them,
/// in which case both sides shrink in proportion to their size.
pub(crate) fn fit_margin(start: u32, end: u32, available: u32) -> (u32, u32) {
    let total = start as u64 + end as u64;
    if total <= available as u64 {
        return (start, end);
    }
    let start_fit = (start as u64 * available as u64 / total) as u32;
    let end_fit = available - start_fit;
    debug!(
        "Margin ({}, {}) reduced to ({}, {}) in {}px",
        start, end, start_fit, end_fit, available
    );
    (start_fit, end_fit)
}

/// Position of a child along an axis that it does not fill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    /// Left for horizontal placement, top for vertical
    #[default]
    Start,
    Center,
    /// Right for horizontal placement, bottom for vertical
    End,
}

impl Align {
    /// Offset of an item inside `free` pixels of slack.
    pub(crate) fn offset(self, free: u32) -> u32 {
        match self {
            Self::Start => 0,
            Self::Center => free / 2,
            Self::End => free,
        }
    }
}

/// Alignment on both axes, used by stacking groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Alignment {
    pub horizontal: Align,
    pub vertical: Align,
}

impl Alignment {
    pub const fn new(horizontal: Align, vertical: Align) -> Self {
        Self {
            horizontal,
            vertical,
        }
    }

    pub const fn center() -> Self {
        Self::new(Align::Center, Align::Center)
    }
}

/// How a view prefers to be measured. The parent has the final say.
///
/// The optional alignment hints override the container's alignment for
/// this view only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Preference {
    pub width: SizePolicy,
    pub height: SizePolicy,
    pub margin: Margin,
    pub align_horizontal: Option<Align>,
    pub align_vertical: Option<Align>,
}

impl Default for Preference {
    fn default() -> Self {
        Self::wrap()
    }
}

impl Preference {
    pub const fn new(width: SizePolicy, height: SizePolicy) -> Self {
        Self {
            width,
            height,
            margin: Margin::ZERO,
            align_horizontal: None,
            align_vertical: None,
        }
    }

    /// Wrap content on both axes.
    pub const fn wrap() -> Self {
        Self::new(SizePolicy::WrapContent, SizePolicy::WrapContent)
    }

    /// Match the parent on both axes.
    pub const fn fill() -> Self {
        Self::new(SizePolicy::MatchParent, SizePolicy::MatchParent)
    }

    pub const fn fixed(width: u32, height: u32) -> Self {
        Self::new(SizePolicy::Fixed(width), SizePolicy::Fixed(height))
    }

    pub fn with_width(mut self, width: SizePolicy) -> Self {
        self.width = width;
        self
    }

    pub fn with_height(mut self, height: SizePolicy) -> Self {
        self.height = height;
        self
    }

    pub fn with_margin(mut self, margin: Margin) -> Self {
        self.margin = margin;
        self
    }

    pub fn with_align(mut self, horizontal: Option<Align>, vertical: Option<Align>) -> Self {
        self.align_horizontal = horizontal;
        self.align_vertical = vertical;
        self
    }

    pub fn policy(&self, axis: Axis) -> SizePolicy {
        match axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }

    pub(crate) fn align_hint(&self, axis: Axis) -> Option<Align> {
        match axis {
            Axis::Horizontal => self.align_horizontal,
            Axis::Vertical => self.align_vertical,
        }
    }
}
