//! Choice between partial and full e-paper refreshes.
//!
//! Partial refreshes only update the changed window and are quick, but each
//! one leaves a little ghosting. The scheduler promotes an update to a full
//! refresh when the panel state is unknown, when most of the panel changed
//! anyway, or when enough partial refreshes have piled up.

use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::debug;

use crate::config::RefreshPolicy;

/// What the display driver should do with a finished frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshHint {
    /// Nothing changed since the last presented frame
    Skip,
    /// Update only this window of the panel
    Partial(Rectangle),
    /// Refresh the whole panel
    Full,
}

impl RefreshHint {
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skip)
    }
}

#[derive(Debug, Clone)]
pub(crate) struct RefreshScheduler {
    policy: RefreshPolicy,
    canvas_area: u64,
    /// Partial refreshes since the last full one
    partials: u32,
    presented_full: bool,
}

impl RefreshScheduler {
    pub fn new(policy: RefreshPolicy, canvas: Size) -> Self {
        Self {
            policy,
            canvas_area: canvas.width as u64 * canvas.height as u64,
            partials: 0,
            presented_full: false,
        }
    }

    /// Decide how to show a frame whose pixels changed within `changed`.
    pub fn decide(&mut self, changed: Option<Rectangle>, force_full: bool) -> RefreshHint {
        let hint = if force_full || !self.presented_full {
            RefreshHint::Full
        } else {
            match changed {
                None => RefreshHint::Skip,
                Some(area) if self.covers_most(area) => {
                    debug!("Changed area {:?} promoted to a full refresh", area);
                    RefreshHint::Full
                }
                Some(_) if self.policy.full_every > 0 && self.partials >= self.policy.full_every => {
                    debug!("{} partial refreshes since the last full one", self.partials);
                    RefreshHint::Full
                }
                Some(area) => RefreshHint::Partial(area),
            }
        };

        match hint {
            RefreshHint::Full => {
                self.partials = 0;
                self.presented_full = true;
            }
            RefreshHint::Partial(_) => self.partials += 1,
            RefreshHint::Skip => {}
        }
        hint
    }

    fn covers_most(&self, area: Rectangle) -> bool {
        let changed = area.size.width as u64 * area.size.height as u64;
        changed * 100 >= self.canvas_area * self.policy.full_area_percent as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: i32, y: i32, w: u32, h: u32) -> Rectangle {
        Rectangle::new(Point::new(x, y), Size::new(w, h))
    }

    fn scheduler(full_every: u32) -> RefreshScheduler {
        let policy = RefreshPolicy {
            full_every,
            full_area_percent: 60,
        };
        RefreshScheduler::new(policy, Size::new(100, 100))
    }

    #[test]
    fn test_first_frame_is_full() {
        let mut refresh = scheduler(10);
        assert!(!refresh.decide(None, false).is_skip());
        assert!(refresh.decide(None, false).is_skip());
        assert!(!RefreshHint::Partial(rect(0, 0, 1, 1)).is_skip());
    }

    #[test]
    fn test_small_change_is_partial() {
        let mut refresh = scheduler(10);
        refresh.decide(None, false);
        let area = rect(10, 10, 20, 5);
        assert_eq!(refresh.decide(Some(area), false), RefreshHint::Partial(area));
        assert_eq!(refresh.decide(Some(area), true), RefreshHint::Full);
    }

    #[test]
    fn test_large_change_is_full() {
        let mut refresh = scheduler(10);
        refresh.decide(None, false);
        assert_eq!(refresh.decide(Some(rect(0, 0, 100, 59)), false), RefreshHint::Partial(rect(0, 0, 100, 59)));
        assert_eq!(refresh.decide(Some(rect(0, 0, 100, 60)), false), RefreshHint::Full);
    }

    #[test]
    fn test_periodic_full_refresh() {
        let mut refresh = scheduler(3);
        refresh.decide(None, false);
        let area = rect(0, 0, 4, 4);
        for _ in 0..3 {
            assert_eq!(refresh.decide(Some(area), false), RefreshHint::Partial(area));
        }
        assert_eq!(refresh.decide(Some(area), false), RefreshHint::Full);
        assert_eq!(refresh.decide(Some(area), false), RefreshHint::Partial(area));
    }

    #[test]
    fn test_periodic_full_refresh_disabled() {
        let mut refresh = scheduler(0);
        refresh.decide(None, false);
        let area = rect(0, 0, 4, 4);
        for _ in 0..50 {
            assert!(matches!(refresh.decide(Some(area), false), RefreshHint::Partial(_)));
        }
    }
}
