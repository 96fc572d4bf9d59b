//! Buffer bookkeeping shared by both session directions

pub mod arena;
pub use arena::{Arena, Backing, Plane, Slot};

pub mod ring;
pub use ring::Ring;
