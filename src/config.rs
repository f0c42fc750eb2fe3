//! Runtime configuration for a [`Context`](crate::context::Context).

use embassy_time::Duration;
use embedded_graphics::prelude::Size;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Default canvas width, a common 7.5" e-paper panel.
pub const DEFAULT_WIDTH_PX: u32 = 800;
/// Default canvas height.
pub const DEFAULT_HEIGHT_PX: u32 = 480;

/// Interval between scheduling loop ticks when nothing wakes it earlier.
const DEFAULT_TICK_MS: u64 = 2000;
/// Delay between the first trigger and the pass, collecting further invalidations.
const DEFAULT_SETTLE_MS: u64 = 1000;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ContextConfig {
    pub width: u32,
    pub height: u32,
    pub tick_ms: u64,
    pub settle_ms: u64,
    /// Repaint the whole canvas on every tick, not only when invalidated
    pub redraw_on_tick: bool,
    /// Outline every view frame after drawing it
    pub debug_bounds: bool,
    pub refresh: RefreshPolicy,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH_PX,
            height: DEFAULT_HEIGHT_PX,
            tick_ms: DEFAULT_TICK_MS,
            settle_ms: DEFAULT_SETTLE_MS,
            redraw_on_tick: false,
            debug_bounds: false,
            refresh: RefreshPolicy::default(),
        }
    }
}

impl ContextConfig {
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_tick_ms(mut self, tick_ms: u64) -> Self {
        self.tick_ms = tick_ms;
        self
    }

    pub fn with_settle_ms(mut self, settle_ms: u64) -> Self {
        self.settle_ms = settle_ms;
        self
    }

    pub fn with_redraw_on_tick(mut self, enabled: bool) -> Self {
        self.redraw_on_tick = enabled;
        self
    }

    pub fn with_debug_bounds(mut self, enabled: bool) -> Self {
        self.debug_bounds = enabled;
        self
    }

    pub fn with_refresh(mut self, refresh: RefreshPolicy) -> Self {
        self.refresh = refresh;
        self
    }

    pub fn canvas_size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

/// When a partial e-paper update should be promoted to a full refresh.
///
/// Partial updates are fast but leave ghosting behind; a periodic full
/// refresh clears it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct RefreshPolicy {
    /// Force a full refresh after this many consecutive partial ones (0 = never)
    pub full_every: u32,
    /// Force a full refresh when the changed area covers at least this share of the panel
    pub full_area_percent: u8,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            full_every: 10,
            full_area_percent: 60,
        }
    }
}

impl ContextConfig {
    /// Reject configurations the runtime cannot work with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidConfiguration("canvas size must be non-zero"));
        }
        if self.refresh.full_area_percent > 100 {
            return Err(Error::InvalidConfiguration(
                "full_area_percent must be at most 100",
            ));
        }
        Ok(())
    }
}
