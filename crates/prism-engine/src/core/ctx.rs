use winit::window::Window;

use crate::camera::CameraControls;
use crate::input::{InputFrame, InputState, Key};
use crate::renderer::{FrameStatus, Renderer};
use crate::time::FrameTime;

use super::app::AppControl;

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Renderer<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: &'a Window,
    pub renderer: &'a mut Renderer<'w>,
    pub input: &'a InputState,
    pub input_frame: &'a InputFrame,
    pub time: FrameTime,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// True if `key` went down during this frame (repeats excluded).
    pub fn key_pressed(&self, key: Key) -> bool {
        self.input_frame.key_pressed(key)
    }

    /// Camera intent derived from the held keys and pointer motion.
    pub fn camera_controls(&self) -> CameraControls {
        CameraControls::from_input(self.input, self.input_frame)
    }

    /// Advances the scene by this frame's delta time, then draws and presents.
    ///
    /// Returns `Exit` only when the surface reported an unrecoverable error.
    pub fn update_and_render(&mut self) -> AppControl {
        let controls = self.camera_controls();
        self.renderer.update(self.time.dt, &controls);

        self.window.pre_present_notify();
        match self.renderer.render() {
            FrameStatus::Fatal => AppControl::Exit,
            FrameStatus::Presented | FrameStatus::Skipped | FrameStatus::Reconfigured => {
                AppControl::Continue
            }
        }
    }
}
