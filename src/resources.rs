//! Named bitmap lookup for image-bearing views.
//!
//! Decoding files is the caller's job; providers hand out already decoded
//! grayscale bitmaps.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;
use core::ops::Bound;
use embedded_graphics::pixelcolor::Gray8;
use embedded_graphics::prelude::*;

use crate::error::Error;

/// Maps a logical resource name (e.g. an icon key) to a decoded bitmap.
pub trait ResourceProvider {
    fn image(&self, name: &str) -> Result<&Bitmap, Error>;
}

/// Provider without any resources; every lookup fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoResources;

impl ResourceProvider for NoResources {
    fn image(&self, name: &str) -> Result<&Bitmap, Error> {
        Err(Error::resource(name))
    }
}

/// Decoded grayscale image, one luma byte per pixel, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    luma: Vec<u8>,
    /// Pixels with exactly this luma are not drawn
    transparent: Option<u8>,
}

impl Bitmap {
    pub fn new(width: u32, luma: Vec<u8>) -> Result<Self, Error> {
        if width == 0 || luma.len() % width as usize != 0 {
            return Err(Error::InvalidConfiguration(
                "bitmap data length must be a non-zero multiple of its width",
            ));
        }
        let height = (luma.len() / width as usize) as u32;
        Ok(Self {
            width,
            height,
            luma,
            transparent: None,
        })
    }

    /// Treat pixels of this luma as transparent.
    pub fn with_transparent(mut self, key: u8) -> Self {
        self.transparent = Some(key);
        self
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Opaque pixel at `(x, y)`; `None` when transparent or out of range.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Gray8> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let luma = self.luma[(y * self.width + x) as usize];
        match self.transparent {
            Some(key) if key == luma => None,
            _ => Some(Gray8::new(luma)),
        }
    }
}

/// In-memory provider.
///
/// A lookup matches the first registered name (in sorted order) that starts
/// with the requested name, so `"cat"` finds `"cat_sticker_0"`.
#[derive(Debug, Default, Clone)]
pub struct MemoryResources {
    images: BTreeMap<String, Bitmap>,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, bitmap: Bitmap) -> Option<Bitmap> {
        self.images.insert(String::from(name), bitmap)
    }

    pub fn with_image(mut self, name: &str, bitmap: Bitmap) -> Self {
        self.insert(name, bitmap);
        self
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl ResourceProvider for MemoryResources {
    fn image(&self, name: &str) -> Result<&Bitmap, Error> {
        self.images
            .range::<str, _>((Bound::Included(name), Bound::Unbounded))
            .next()
            .filter(|(key, _)| key.starts_with(name))
            .map(|(_, bitmap)| bitmap)
            .ok_or_else(|| Error::resource(name))
    }
}
