//! Filled or outlined rectangle covering its whole frame, typically placed
//! behind other views in a stacking group.

use embedded_graphics::pixelcolor::Gray8;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{
    PrimitiveStyle, PrimitiveStyleBuilder, Rectangle, RoundedRectangle, StrokeAlignment,
};

use crate::error::Error;
use crate::framebuffer::FrameBuffer;
use crate::ui::core::{Env, Widget};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Surface {
    fill: Option<Gray8>,
    outline: Option<(Gray8, u32)>,
    radius: u32,
}

impl Surface {
    pub fn filled(color: Gray8) -> Self {
        Self {
            fill: Some(color),
            ..Self::default()
        }
    }

    pub fn outlined(color: Gray8, width: u32) -> Self {
        Self {
            outline: Some((color, width)),
            ..Self::default()
        }
    }

    /// Add an outline, drawn inside the frame.
    pub fn with_outline(mut self, color: Gray8, width: u32) -> Self {
        self.outline = Some((color, width));
        self
    }

    /// Round the corners. A radius of 0 keeps them square.
    pub fn with_radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    pub fn set_fill(&mut self, color: Option<Gray8>) {
        self.fill = color;
    }

    fn style(&self) -> PrimitiveStyle<Gray8> {
        let mut builder = PrimitiveStyleBuilder::new();
        if let Some(color) = self.fill {
            builder = builder.fill_color(color);
        }
        if let Some((color, width)) = self.outline {
            builder = builder
                .stroke_color(color)
                .stroke_width(width)
                .stroke_alignment(StrokeAlignment::Inside);
        }
        builder.build()
    }
}

impl Widget for Surface {
    fn draw(&self, surface: &mut FrameBuffer, frame: Rectangle, _env: &Env<'_>) -> Result<(), Error> {
        if self.fill.is_none() && self.outline.is_none() {
            return Ok(());
        }
        let corner = Size::new(self.radius, self.radius);
        RoundedRectangle::with_equal_corners(frame, corner)
            .into_styled(self.style())
            .draw(surface)?;
        Ok(())
    }
}
