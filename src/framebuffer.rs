//! Grayscale framebuffer with clipping and change detection against the
//! last presented frame.
//!
//! All view drawing targets this RAM buffer. After a pass completes,
//! [`FrameBuffer::present`] reports the rectangle containing every pixel that
//! differs from what the panel currently shows, so the display driver can
//! choose between a partial and a full e-paper refresh.

use alloc::vec;
use alloc::vec::Vec;
use core::convert::Infallible;
use embedded_graphics::pixelcolor::Gray8;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::Rectangle;
use log::trace;

/// Bounding box of pixels that differ from the presented frame.
#[derive(Debug, Clone, Copy)]
struct DirtyRect {
    min_x: usize,
    min_y: usize,
    max_x: usize,
    max_y: usize,
}

impl DirtyRect {
    /// Expand the dirty region to include the given pixel coordinate.
    fn expand(&mut self, x: usize, y: usize) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Create a new dirty rect covering a single pixel.
    fn from_point(x: usize, y: usize) -> Self {
        Self {
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
        }
    }

    fn to_rectangle(self) -> Rectangle {
        Rectangle::new(
            Point::new(self.min_x as i32, self.min_y as i32),
            Size::new(
                (self.max_x - self.min_x + 1) as u32,
                (self.max_y - self.min_y + 1) as u32,
            ),
        )
    }
}

/// Saved pixels of one area, used to roll back a failed subtree draw.
#[derive(Debug, Clone)]
pub struct Snapshot {
    area: Rectangle,
    pixels: Vec<Gray8>,
}

/// Heap-allocated `Gray8` raster implementing `DrawTarget`.
///
/// Writes outside the current clip rectangle are discarded. The clip starts
/// out as the whole buffer.
pub struct FrameBuffer {
    size: Size,
    pixels: Vec<Gray8>,
    presented: Vec<Gray8>,
    clip: Rectangle,
}

impl FrameBuffer {
    /// Allocate a framebuffer filled with white, matching a freshly cleared panel.
    pub fn new(size: Size) -> Self {
        let count = size.width as usize * size.height as usize;
        Self {
            size,
            pixels: vec![Gray8::WHITE; count],
            presented: vec![Gray8::WHITE; count],
            clip: Rectangle::new(Point::zero(), size),
        }
    }

    pub fn width(&self) -> u32 {
        self.size.width
    }

    pub fn height(&self) -> u32 {
        self.size.height
    }

    /// The full buffer area.
    pub fn area(&self) -> Rectangle {
        Rectangle::new(Point::zero(), self.size)
    }

    /// Row-major pixels of the current frame.
    pub fn pixels(&self) -> &[Gray8] {
        &self.pixels
    }

    /// Pixel at `(x, y)`, or `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Gray8> {
        if x < self.size.width && y < self.size.height {
            Some(self.pixels[self.index(x as usize, y as usize)])
        } else {
            None
        }
    }

    /// One row of pixels, or `None` outside the buffer.
    pub fn row(&self, y: u32) -> Option<&[Gray8]> {
        if y >= self.size.height {
            return None;
        }
        let start = y as usize * self.size.width as usize;
        Some(&self.pixels[start..start + self.size.width as usize])
    }

    /// Copy the frame as one luma byte per pixel, the layout most panel drivers expect.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.pixels.iter().map(|p| p.luma()).collect()
    }

    /// Restrict subsequent writes to `area` (intersected with the buffer).
    pub fn set_clip(&mut self, area: Rectangle) {
        self.clip = area.intersection(&self.area());
    }

    pub fn clip(&self) -> Rectangle {
        self.clip
    }

    pub fn reset_clip(&mut self) {
        self.clip = self.area();
    }

    /// Save the pixels under `area` so they can be restored later.
    pub fn snapshot(&self, area: Rectangle) -> Snapshot {
        let area = area.intersection(&self.area());
        let mut pixels = Vec::with_capacity(area.size.width as usize * area.size.height as usize);
        for (x, y) in Self::coords(area) {
            pixels.push(self.pixels[self.index(x, y)]);
        }
        Snapshot { area, pixels }
    }

    /// Write a snapshot back, ignoring the clip rectangle.
    pub fn restore(&mut self, snapshot: Snapshot) {
        for ((x, y), color) in Self::coords(snapshot.area).zip(snapshot.pixels) {
            let idx = self.index(x, y);
            self.pixels[idx] = color;
        }
    }

    /// Record the current frame as shown on the panel and return the
    /// bounding rectangle of pixels that changed since the previous call.
    pub fn present(&mut self) -> Option<Rectangle> {
        let stride = self.size.width as usize;
        let mut dirty: Option<DirtyRect> = None;

        for (idx, (current, shown)) in self.pixels.iter().zip(self.presented.iter_mut()).enumerate() {
            if current != shown {
                *shown = *current;
                let (x, y) = (idx % stride, idx / stride);
                match &mut dirty {
                    Some(rect) => rect.expand(x, y),
                    None => dirty = Some(DirtyRect::from_point(x, y)),
                }
            }
        }

        let changed = dirty.map(DirtyRect::to_rectangle);
        trace!("Presented frame, changed region: {:?}", changed);
        changed
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        y * self.size.width as usize + x
    }

    #[inline]
    fn in_clip(&self, x: i32, y: i32) -> bool {
        self.clip.contains(Point::new(x, y))
    }

    /// Iterate the coordinates of an area that lies inside the buffer, row by row.
    fn coords(area: Rectangle) -> impl Iterator<Item = (usize, usize)> {
        let x0 = area.top_left.x.max(0) as usize;
        let y0 = area.top_left.y.max(0) as usize;
        let w = area.size.width as usize;
        let h = area.size.height as usize;
        (y0..y0 + h).flat_map(move |y| (x0..x0 + w).map(move |x| (x, y)))
    }
}

impl OriginDimensions for FrameBuffer {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for FrameBuffer {
    type Color = Gray8;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            if self.in_clip(coord.x, coord.y) {
                let idx = self.index(coord.x as usize, coord.y as usize);
                self.pixels[idx] = color;
            }
        }
        Ok(())
    }

    fn fill_contiguous<I>(&mut self, area: &Rectangle, colors: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Self::Color>,
    {
        let mut colors = colors.into_iter();
        for row in 0..area.size.height as i32 {
            let y = area.top_left.y + row;
            for col in 0..area.size.width as i32 {
                let x = area.top_left.x + col;
                let Some(color) = colors.next() else {
                    return Ok(());
                };
                if self.in_clip(x, y) {
                    let idx = self.index(x as usize, y as usize);
                    self.pixels[idx] = color;
                }
            }
        }
        Ok(())
    }

    fn fill_solid(&mut self, area: &Rectangle, color: Self::Color) -> Result<(), Self::Error> {
        let area = area.intersection(&self.clip);
        for (x, y) in Self::coords(area) {
            let idx = self.index(x, y);
            self.pixels[idx] = color;
        }
        Ok(())
    }

    /// Fill the current clip rectangle, which is the whole buffer unless a
    /// clip was set.
    fn clear(&mut self, color: Self::Color) -> Result<(), Self::Error> {
        let clip = self.clip;
        self.fill_solid(&clip, color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_graphics::primitives::{PrimitiveStyle, Rectangle};

    fn buffer() -> FrameBuffer {
        FrameBuffer::new(Size::new(40, 20))
    }

    #[test]
    fn test_fresh_buffer_presents_nothing() {
        let mut fb = buffer();
        assert_eq!(fb.present(), None);
        assert_eq!(fb.pixel(0, 0), Some(Gray8::WHITE));
    }

    #[test]
    fn test_present_reports_changed_bounds() {
        let mut fb = buffer();
        Rectangle::new(Point::new(5, 3), Size::new(4, 2))
            .into_styled(PrimitiveStyle::with_fill(Gray8::BLACK))
            .draw(&mut fb)
            .unwrap();

        assert_eq!(
            fb.present(),
            Some(Rectangle::new(Point::new(5, 3), Size::new(4, 2)))
        );
        // Already presented
        assert_eq!(fb.present(), None);
    }

    #[test]
    fn test_redrawing_identical_content_is_not_a_change() {
        let mut fb = buffer();
        let square = Rectangle::new(Point::new(1, 1), Size::new(3, 3))
            .into_styled(PrimitiveStyle::with_fill(Gray8::BLACK));
        square.draw(&mut fb).unwrap();
        fb.present();

        fb.clear(Gray8::WHITE).unwrap();
        square.draw(&mut fb).unwrap();
        assert_eq!(fb.present(), None);
    }

    #[test]
    fn test_clip_discards_outside_writes() {
        let mut fb = buffer();
        fb.set_clip(Rectangle::new(Point::new(10, 0), Size::new(5, 5)));
        fb.clear(Gray8::BLACK).unwrap();
        fb.reset_clip();

        assert_eq!(fb.pixel(9, 0), Some(Gray8::WHITE));
        assert_eq!(fb.pixel(10, 0), Some(Gray8::BLACK));
        assert_eq!(fb.pixel(14, 4), Some(Gray8::BLACK));
        assert_eq!(fb.pixel(15, 4), Some(Gray8::WHITE));
        assert_eq!(fb.pixel(10, 5), Some(Gray8::WHITE));
    }

    #[test]
    fn test_clip_is_bounded_by_buffer() {
        let mut fb = buffer();
        fb.set_clip(Rectangle::new(Point::new(-10, -10), Size::new(100, 100)));
        assert_eq!(fb.clip(), fb.area());
        // Off-buffer pixels are ignored rather than panicking
        fb.draw_iter([Pixel(Point::new(-1, 2), Gray8::BLACK), Pixel(Point::new(40, 2), Gray8::BLACK)])
            .unwrap();
        assert_eq!(fb.present(), None);
    }

    #[test]
    fn test_snapshot_restore_rolls_back() {
        let mut fb = buffer();
        let area = Rectangle::new(Point::new(2, 2), Size::new(6, 6));
        let snapshot = fb.snapshot(area);
        fb.fill_solid(&area, Gray8::new(100)).unwrap();
        assert_eq!(fb.pixel(3, 3), Some(Gray8::new(100)));

        fb.restore(snapshot);
        assert_eq!(fb.pixel(3, 3), Some(Gray8::WHITE));
        assert_eq!(fb.present(), None);
    }

    #[test]
    fn test_to_bytes_and_rows() {
        let mut fb = FrameBuffer::new(Size::new(3, 2));
        fb.fill_solid(&Rectangle::new(Point::new(1, 1), Size::new(1, 1)), Gray8::BLACK)
            .unwrap();
        assert_eq!(fb.to_bytes(), vec![255, 255, 255, 255, 0, 255]);
        assert_eq!(fb.row(1), Some(&[Gray8::WHITE, Gray8::BLACK, Gray8::WHITE][..]));
        assert_eq!(fb.row(2), None);
    }
}
