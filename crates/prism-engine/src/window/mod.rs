//! Window + runtime loop.
//!
//! Owns the `winit` EventLoop and the single window, and ties the window's
//! lifetime to the [`crate::renderer::Renderer`] presenting into it.

mod runtime;

pub use runtime::{Runtime, RuntimeConfig};
