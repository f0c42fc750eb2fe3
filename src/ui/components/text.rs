//! Text leaf widget

use alloc::string::String;
use embedded_graphics::mono_font::{MonoFont, MonoTextStyle};
use embedded_graphics::pixelcolor::Gray8;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use embedded_graphics::text::{Alignment as TextAlignment, Baseline, Text, TextStyleBuilder};
use embedded_layout::align::{horizontal, vertical, Align as _};

use crate::error::Error;
use crate::framebuffer::FrameBuffer;
use crate::ui::core::{Env, Widget};
use crate::ui::measure::Align;

/// Text size variants
///
/// Provides three preset text sizes with corresponding embedded-graphics fonts:
/// - `Small`: 5x8 font
/// - `Medium`: 6x10 font (default)
/// - `Large`: 10x20 font
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextSize {
    Small,
    #[default]
    Medium,
    Large,
}

impl TextSize {
    pub fn font(&self) -> &'static MonoFont<'static> {
        match self {
            TextSize::Small => &embedded_graphics::mono_font::ascii::FONT_5X8,
            TextSize::Medium => &embedded_graphics::mono_font::ascii::FONT_6X10,
            TextSize::Large => &embedded_graphics::mono_font::ascii::FONT_10X20,
        }
    }
}

/// Text block positioned inside its frame.
///
/// `\n` starts a new line. Lines are aligned against each other with the
/// horizontal alignment, and the whole block is placed in the frame with
/// both alignments.
///
/// # Examples
/// ```ignore
/// let title = TextView::new("Living room", TextSize::Large)
///     .with_align(Align::Center, Align::Center);
/// let id = tree.leaf(title, Preference::wrap());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TextView {
    text: String,
    size: TextSize,
    color: Gray8,
    horizontal: Align,
    vertical: Align,
}

impl TextView {
    pub fn new(text: &str, size: TextSize) -> Self {
        Self {
            text: String::from(text),
            size,
            color: Gray8::BLACK,
            horizontal: Align::Start,
            vertical: Align::Start,
        }
    }

    pub fn with_color(mut self, color: Gray8) -> Self {
        self.color = color;
        self
    }

    pub fn with_align(mut self, horizontal: Align, vertical: Align) -> Self {
        self.horizontal = horizontal;
        self.vertical = vertical;
        self
    }

    /// Replace the text. Returns whether it changed.
    pub fn set_text(&mut self, text: &str) -> bool {
        if self.text == text {
            return false;
        }
        self.text.clear();
        self.text.push_str(text);
        true
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    fn styled(&self, position: Point) -> Text<'_, MonoTextStyle<'static, Gray8>> {
        let alignment = match self.horizontal {
            Align::Start => TextAlignment::Left,
            Align::Center => TextAlignment::Center,
            Align::End => TextAlignment::Right,
        };
        let style = TextStyleBuilder::new()
            .baseline(Baseline::Top)
            .alignment(alignment)
            .build();
        Text::with_text_style(
            &self.text,
            position,
            MonoTextStyle::new(self.size.font(), self.color),
            style,
        )
    }

    /// Place the text block inside `frame`.
    fn placed(&self, frame: Rectangle) -> Text<'_, MonoTextStyle<'static, Gray8>> {
        let text = self.styled(frame.top_left);
        let text = match self.horizontal {
            Align::Start => text.align_to(&frame, horizontal::Left, vertical::NoAlignment),
            Align::Center => text.align_to(&frame, horizontal::Center, vertical::NoAlignment),
            Align::End => text.align_to(&frame, horizontal::Right, vertical::NoAlignment),
        };
        match self.vertical {
            Align::Start => text.align_to(&frame, horizontal::NoAlignment, vertical::Top),
            Align::Center => text.align_to(&frame, horizontal::NoAlignment, vertical::Center),
            Align::End => text.align_to(&frame, horizontal::NoAlignment, vertical::Bottom),
        }
    }
}

impl Widget for TextView {
    fn intrinsic_size(&self, available: Size, _env: &Env<'_>) -> Size {
        if self.text.is_empty() {
            return Size::zero();
        }
        self.styled(Point::zero())
            .bounding_box()
            .size
            .component_min(available)
    }

    fn draw(&self, surface: &mut FrameBuffer, frame: Rectangle, _env: &Env<'_>) -> Result<(), Error> {
        if self.text.is_empty() {
            return Ok(());
        }
        self.placed(frame).draw(surface)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::NoResources;

    const ENV: Env<'static> = Env {
        resources: &NoResources,
        debug_bounds: false,
    };

    /// Bounding box of all non-white pixels.
    fn ink(fb: &FrameBuffer) -> Option<Rectangle> {
        let mut bounds: Option<Rectangle> = None;
        for y in 0..fb.height() {
            for x in 0..fb.width() {
                if fb.pixel(x, y) != Some(Gray8::WHITE) {
                    let dot = Rectangle::new(Point::new(x as i32, y as i32), Size::new(1, 1));
                    bounds = Some(match bounds {
                        Some(b) => crate::ui::core::union(b, dot),
                        None => dot,
                    });
                }
            }
        }
        bounds
    }

    #[test]
    fn test_intrinsic_size_from_font() {
        let text = TextView::new("abc", TextSize::Medium);
        assert_eq!(text.intrinsic_size(Size::new(800, 480), &ENV), Size::new(18, 10));

        let two_lines = TextView::new("ab\nlonger", TextSize::Small);
        assert_eq!(two_lines.intrinsic_size(Size::new(800, 480), &ENV), Size::new(30, 16));
    }

    #[test]
    fn test_intrinsic_size_clipped_to_available() {
        let text = TextView::new("a fairly long title", TextSize::Large);
        assert_eq!(text.intrinsic_size(Size::new(50, 8), &ENV), Size::new(50, 8));
        assert_eq!(TextView::new("", TextSize::Large).intrinsic_size(Size::new(50, 8), &ENV), Size::zero());
    }

    #[test]
    fn test_text_stays_inside_frame() {
        let frame = Rectangle::new(Point::new(100, 20), Size::new(200, 40));
        for (h, v) in [
            (Align::Start, Align::Start),
            (Align::Center, Align::Center),
            (Align::End, Align::End),
        ] {
            let mut fb = FrameBuffer::new(Size::new(400, 100));
            TextView::new("HELLO", TextSize::Medium)
                .with_align(h, v)
                .draw(&mut fb, frame, &ENV)
                .unwrap();
            let drawn = ink(&fb).unwrap();
            assert!(frame.contains(drawn.top_left));
            assert!(frame.contains(drawn.bottom_right().unwrap()));
        }
    }

    #[test]
    fn test_centered_text_is_centered() {
        let frame = Rectangle::new(Point::zero(), Size::new(200, 40));
        let mut fb = FrameBuffer::new(Size::new(200, 40));
        let text = TextView::new("HI", TextSize::Large).with_align(Align::Center, Align::Center);
        text.draw(&mut fb, frame, &ENV).unwrap();

        let text_box = text.placed(frame).bounding_box();
        assert_eq!(text_box.top_left, Point::new(90, 10));
        let drawn = ink(&fb).unwrap();
        assert!(text_box.contains(drawn.top_left));
        assert!(text_box.contains(drawn.bottom_right().unwrap()));
    }

    #[test]
    fn test_set_text_reports_change() {
        let mut text = TextView::new("12:00", TextSize::Small);
        assert!(!text.set_text("12:00"));
        assert!(text.set_text("12:01"));
        assert_eq!(text.text(), "12:01");
    }
}
