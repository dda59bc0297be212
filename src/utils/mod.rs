//! Utility Module
//!
//! - [`FpsCounter`]: frame rate sampling for the uniform block and the
//!   metrics overlay

pub mod fps_counter;

pub use fps_counter::FpsCounter;
