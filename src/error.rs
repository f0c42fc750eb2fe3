//! Error type shared by the tree, the widgets and the redraw runtime.
//!
//! Layout itself never fails: numeric edge cases are clamped. Errors only
//! surface from tree construction, resource lookups, widget drawing and the
//! display driver callback.

use alloc::string::String;
use core::convert::Infallible;
use thiserror_no_std::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A value outside its documented range, e.g. a weight fraction of zero
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(&'static str),
    /// A tree operation that would break the ownership rules
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),
    /// Resource lookup failed for the given name
    #[error("Resource unavailable: {name}")]
    ResourceUnavailable { name: String },
    /// The cross-thread request queue is saturated
    #[error("Request queue full (capacity: {capacity})")]
    QueueFull { capacity: usize },
    /// The redraw callback (display driver) reported a failure
    #[error("Display driver error: {0}")]
    Display(String),
    /// A widget failed while drawing
    #[error("Draw error: {0}")]
    Draw(String),
}

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

impl Error {
    pub(crate) fn resource(name: &str) -> Self {
        Self::ResourceUnavailable {
            name: String::from(name),
        }
    }
}
