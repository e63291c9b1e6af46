/// Viewport in physical pixels with its depth range.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Viewport {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub min_depth: f32,
    pub max_depth: f32,
}

impl Viewport {
    /// Covers a whole `width`×`height` target with depth range [0, 1].
    pub const fn full(width: u32, height: u32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: width as f32,
            height: height as f32,
            min_depth: 0.0,
            max_depth: 1.0,
        }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0.0
            && self.height > 0.0
            && self.width.is_finite()
            && self.height.is_finite()
            && (0.0..=1.0).contains(&self.min_depth)
            && (self.min_depth..=1.0).contains(&self.max_depth)
    }

    pub fn aspect(self) -> f32 {
        self.width / self.height.max(1.0)
    }

    pub fn apply(&self, render_pass: &mut wgpu::RenderPass<'_>) {
        render_pass.set_viewport(self.x, self.y, self.width, self.height, self.min_depth, self.max_depth);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_viewport_covers_the_target() {
        let vp = Viewport::full(640, 480);
        assert_eq!((vp.x, vp.y), (0.0, 0.0));
        assert_eq!((vp.width, vp.height), (640.0, 480.0));
        assert_eq!((vp.min_depth, vp.max_depth), (0.0, 1.0));
        assert!(vp.is_valid());
        assert!((vp.aspect() - 4.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn empty_viewport_is_invalid() {
        assert!(!Viewport::full(0, 480).is_valid());
    }
}
