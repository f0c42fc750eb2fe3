//! Leaf widgets

pub mod image;
pub mod surface;
pub mod text;

pub use image::ImageView;
pub use surface::Surface;
pub use text::{TextSize, TextView};
