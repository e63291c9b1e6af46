//! Free-look camera.
//!
//! Left-handed, +Y up, looking down +Z at zero yaw/pitch, clip depth 0..1.
//! The renderer only consumes `update` and `view_projection`.

use glam::{Mat4, Vec2, Vec3};

use crate::input::{InputFrame, InputState, Key, MouseButton};

const MAX_PITCH: f32 = 89.0_f32 * (std::f32::consts::PI / 180.0);

/// Distance along the view direction covered by one wheel line, in seconds of normal movement.
const DOLLY_SECONDS_PER_LINE: f32 = 0.2;

/// Camera construction parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,

    /// Initial world position.
    pub position: Vec3,

    pub near: f32,
    pub far: f32,

    /// World units per second.
    pub move_speed: f32,

    /// Radians per physical pixel of pointer motion.
    pub look_sensitivity: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_degrees: 45.0,
            position: Vec3::new(0.0, 0.0, -50.0),
            near: 0.1,
            far: 1000.0,
            move_speed: 10.0,
            look_sensitivity: 0.004,
        }
    }
}

/// Per-frame camera intent, decoupled from the input backend.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraControls {
    /// Local-space movement axes in [-1, 1]: x = right, y = up, z = forward.
    pub movement: Vec3,

    /// Pointer motion in pixels (x = yaw, y = pitch).
    pub look: Vec2,

    /// Wheel lines; positive moves toward the view direction.
    pub dolly: f32,

    /// Multiplies movement speed by four.
    pub boost: bool,
}

impl CameraControls {
    /// Maps WASD/arrows, Q/E, Shift, the wheel and right-button drag onto camera intent.
    pub fn from_input(state: &InputState, frame: &InputFrame) -> Self {
        let axis = |pos: &[Key], neg: &[Key]| -> f32 {
            let p = pos.iter().any(|k| state.key_down(*k)) as i32;
            let n = neg.iter().any(|k| state.key_down(*k)) as i32;
            (p - n) as f32
        };

        let movement = Vec3::new(
            axis(&[Key::D, Key::ArrowRight], &[Key::A, Key::ArrowLeft]),
            axis(&[Key::E], &[Key::Q]),
            axis(&[Key::W, Key::ArrowUp], &[Key::S, Key::ArrowDown]),
        );

        let look = if state.button_down(MouseButton::Right) {
            Vec2::new(frame.pointer_delta.0, frame.pointer_delta.1)
        } else {
            Vec2::ZERO
        };

        Self {
            movement,
            look,
            dolly: frame.wheel,
            boost: state.key_down(Key::Shift),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    yaw: f32,
    pitch: f32,

    fov_y: f32,
    aspect: f32,
    near: f32,
    far: f32,

    move_speed: f32,
    look_sensitivity: f32,
}

impl Camera {
    /// Creates a camera with the default clip planes and speeds.
    pub fn new(fov_degrees: f32, position: Vec3, aspect: f32) -> Self {
        Self::with_config(
            &CameraConfig {
                fov_degrees,
                position,
                ..CameraConfig::default()
            },
            aspect,
        )
    }

    pub fn with_config(config: &CameraConfig, aspect: f32) -> Self {
        Self {
            position: config.position,
            yaw: 0.0,
            pitch: 0.0,
            fov_y: config.fov_degrees.to_radians(),
            aspect,
            near: config.near,
            far: config.far,
            move_speed: config.move_speed,
            look_sensitivity: config.look_sensitivity,
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Unit vector the camera looks along.
    pub fn forward(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        Vec3::new(sy * cp, sp, cy * cp)
    }

    pub fn right(&self) -> Vec3 {
        Vec3::Y.cross(self.forward()).normalize()
    }

    /// Applies one frame of movement and look input.
    pub fn update(&mut self, dt: f32, controls: &CameraControls) {
        self.yaw += controls.look.x * self.look_sensitivity;
        self.pitch = (self.pitch - controls.look.y * self.look_sensitivity)
            .clamp(-MAX_PITCH, MAX_PITCH);

        let speed = if controls.boost {
            self.move_speed * 4.0
        } else {
            self.move_speed
        };

        // Wheel steps are discrete and do not scale with frame time.
        if controls.dolly != 0.0 {
            self.position += self.forward() * controls.dolly * speed * DOLLY_SECONDS_PER_LINE;
        }

        let movement = controls.movement.clamp(Vec3::splat(-1.0), Vec3::splat(1.0));
        if movement == Vec3::ZERO {
            return;
        }

        let step = self.right() * movement.x + Vec3::Y * movement.y + self.forward() * movement.z;
        self.position += step * speed * dt;
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_to_lh(self.position, self.forward(), Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_lh(self.fov_y, self.aspect, self.near, self.far)
    }

    /// Combined matrix: `projection · view`.
    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }
}
