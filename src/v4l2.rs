//! Thin layer over the kernel video interface
//!
//! Everything in here speaks in raw descriptors and the kernel structures from
//! [`crate::v4l_sys`]. The typed API on top lives in [`crate::device`].

mod api;
pub use api::*;

pub mod vidioc;
