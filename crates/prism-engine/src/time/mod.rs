//! Time subsystem.
//!
//! The renderer only ever consumes elapsed seconds; this module produces them.
//! - one `FrameClock` per render loop, `tick()` once per frame
//! - `FpsCounter` turns frame deltas into a once-per-second FPS sample

mod frame_clock;

pub use frame_clock::{FpsCounter, FrameClock, FrameTime};
