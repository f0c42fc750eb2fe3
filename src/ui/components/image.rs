//! Named bitmap from the resource provider, centered in its frame.

use alloc::string::String;
use embedded_graphics::pixelcolor::Gray8;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{
    Line, PrimitiveStyle, PrimitiveStyleBuilder, Rectangle, StrokeAlignment,
};
use log::warn;

use crate::error::Error;
use crate::framebuffer::FrameBuffer;
use crate::resources::Bitmap;
use crate::ui::core::{Env, Widget};

const PLACEHOLDER_COLOR: Gray8 = Gray8::new(0x80);

#[derive(Debug, Clone, PartialEq)]
pub struct ImageView {
    name: String,
    /// Replaces the colour of every opaque pixel
    tint: Option<Gray8>,
}

impl ImageView {
    pub fn new(name: &str) -> Self {
        Self {
            name: String::from(name),
            tint: None,
        }
    }

    pub fn with_tint(mut self, tint: Gray8) -> Self {
        self.tint = Some(tint);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Switch to another resource. Returns whether it changed.
    pub fn set_name(&mut self, name: &str) -> bool {
        if self.name == name {
            return false;
        }
        self.name = String::from(name);
        true
    }

    fn blit(&self, bitmap: &Bitmap, surface: &mut FrameBuffer, frame: Rectangle) -> Result<(), Error> {
        let size = bitmap.size();
        let origin = frame.top_left
            + Point::new(
                (frame.size.width as i32 - size.width as i32) / 2,
                (frame.size.height as i32 - size.height as i32) / 2,
            );
        let pixels = (0..size.height).flat_map(|y| {
            (0..size.width).filter_map(move |x| {
                bitmap.pixel(x, y).map(|shade| {
                    let color = self.tint.unwrap_or(shade);
                    Pixel(origin + Point::new(x as i32, y as i32), color)
                })
            })
        });
        surface.draw_iter(pixels)?;
        Ok(())
    }

    /// Outlined box with both diagonals, drawn when the bitmap is missing.
    fn placeholder(surface: &mut FrameBuffer, frame: Rectangle) -> Result<(), Error> {
        let stroke = PrimitiveStyle::with_stroke(PLACEHOLDER_COLOR, 1);
        frame
            .into_styled(
                PrimitiveStyleBuilder::new()
                    .stroke_color(PLACEHOLDER_COLOR)
                    .stroke_width(1)
                    .stroke_alignment(StrokeAlignment::Inside)
                    .build(),
            )
            .draw(surface)?;
        if let Some(bottom_right) = frame.bottom_right() {
            let top_right = Point::new(bottom_right.x, frame.top_left.y);
            let bottom_left = Point::new(frame.top_left.x, bottom_right.y);
            Line::new(frame.top_left, bottom_right)
                .into_styled(stroke)
                .draw(surface)?;
            Line::new(bottom_left, top_right)
                .into_styled(stroke)
                .draw(surface)?;
        }
        Ok(())
    }
}

impl Widget for ImageView {
    fn intrinsic_size(&self, available: Size, env: &Env<'_>) -> Size {
        env.resources
            .image(&self.name)
            .map_or(Size::zero(), |bitmap| bitmap.size().component_min(available))
    }

    fn draw(&self, surface: &mut FrameBuffer, frame: Rectangle, env: &Env<'_>) -> Result<(), Error> {
        match env.resources.image(&self.name) {
            Ok(bitmap) => self.blit(bitmap, surface, frame),
            Err(err @ Error::ResourceUnavailable { .. }) => {
                warn!("{}, drawing placeholder", err);
                Self::placeholder(surface, frame)
            }
            Err(err) => Err(err),
        }
    }
}
