//! Core engine-facing contracts.
//!
//! The runtime (platform loop) talks to the application only through
//! [`App`] and the per-frame [`FrameCtx`].

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::FrameCtx;
