use glam::{Mat4, Vec3};

/// World transform of a mesh.
///
/// Column-vector convention: `world` maps object space to world space.
/// Translations compose in object space, rotations about the world origin.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    world: Mat4,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            world: Mat4::IDENTITY,
        }
    }
}

impl Transform {
    pub fn world(&self) -> Mat4 {
        self.world
    }

    pub fn set_world(&mut self, world: Mat4) {
        self.world = world;
    }

    /// `world' = world · T(offset)`
    pub fn translate(&mut self, offset: Vec3) {
        self.world *= Mat4::from_translation(offset);
    }

    /// `world' = Ry(angle) · world`
    pub fn rotate_y(&mut self, angle: f32) {
        self.world = Mat4::from_rotation_y(angle) * self.world;
    }

    pub fn world_view_projection(&self, view_projection: Mat4) -> Mat4 {
        view_projection * self.world
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn starts_at_identity() {
        assert_eq!(Transform::default().world(), Mat4::IDENTITY);
    }

    #[test]
    fn rotations_accumulate() {
        let mut split = Transform::default();
        split.rotate_y(0.3);
        split.rotate_y(0.5);

        let mut once = Transform::default();
        once.rotate_y(0.8);

        assert!(split.world().abs_diff_eq(once.world(), 1e-6));
    }

    #[test]
    fn translation_is_applied_in_object_space() {
        let offset = Vec3::new(10.0, 0.0, 0.0);
        let mut t = Transform::default();
        t.rotate_y(FRAC_PI_2);
        t.translate(offset);

        let origin = t.world().transform_point3(Vec3::ZERO);
        let expected = Mat4::from_rotation_y(FRAC_PI_2).transform_point3(offset);
        assert!(origin.abs_diff_eq(expected, 1e-5));

        // Pre-multiplying the translation would leave the origin at `offset`.
        let world_space = Mat4::from_translation(offset) * Mat4::from_rotation_y(FRAC_PI_2);
        assert!(!origin.abs_diff_eq(world_space.transform_point3(Vec3::ZERO), 1e-3));
    }

    #[test]
    fn rotation_orbits_the_world_origin() {
        let offset = Vec3::new(0.0, 0.0, 10.0);
        let mut t = Transform::default();
        t.translate(offset);
        t.rotate_y(FRAC_PI_2);

        let origin = t.world().transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(10.0, 0.0, 0.0), 1e-5));

        // Post-multiplying would spin the mesh in place instead.
        let in_place = Mat4::from_translation(offset) * Mat4::from_rotation_y(FRAC_PI_2);
        assert!(!origin.abs_diff_eq(in_place.transform_point3(Vec3::ZERO), 1e-3));
    }

    #[test]
    fn wvp_puts_world_last() {
        let mut t = Transform::default();
        t.translate(Vec3::new(1.0, 2.0, 3.0));
        let vp = Mat4::from_scale(Vec3::splat(2.0));
        let p = t.world_view_projection(vp).transform_point3(Vec3::ZERO);
        assert!(p.abs_diff_eq(Vec3::new(2.0, 4.0, 6.0), 1e-6));
    }
}
