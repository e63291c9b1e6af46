//! Meshes: immutable GPU geometry bound to one effect.
//!
//! A mesh owns its vertex and index buffers, its world transform and its
//! effect. Geometry is write-once; only the transform and the effect's
//! parameters change after construction.

mod geometry;
mod transform;
mod vertex;

use std::path::Path;

use glam::{Mat4, Vec3};
use thiserror::Error;
use wgpu::util::DeviceExt;

use crate::camera::Camera;
use crate::device::OutputFormats;
use crate::effect::{Effect, EffectError, MapSlot, PosColEffect, PosTexEffect, PosTexVariant, SHADED, TRANSPARENT};
use crate::texture::{SamplerState, Texture};

pub use geometry::{colored_cube, load_obj, quad, textured_cube, Geometry, GeometryError, GeometrySource};
pub use transform::Transform;
pub use vertex::{Semantic, Vertex, VertexElement, VertexPosCol, VertexPosTex};

/// Size of one index in bytes (`Uint32`).
pub const INDEX_STRIDE: u64 = std::mem::size_of::<u32>() as u64;

#[derive(Debug, Error)]
pub enum MeshError {
    #[error("mesh '{label}': {reason}")]
    Buffer { label: String, reason: String },

    #[error("mesh '{label}': {source}")]
    Geometry {
        label: String,
        #[source]
        source: GeometryError,
    },

    #[error("mesh '{label}': {source}")]
    Effect {
        label: String,
        #[source]
        source: EffectError,
    },
}

/// Draw bucket: opaque meshes are drawn before transparent ones.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MeshKind {
    Opaque,
    Transparent,
}

/// Byte size of a buffer holding `count` elements of `stride` bytes.
///
/// Rejects empty buffers and sizes over `max`.
pub fn buffer_size(count: usize, stride: u64, max: u64) -> Result<u64, String> {
    if count == 0 {
        return Err("buffer would be empty".to_owned());
    }
    let size = (count as u64)
        .checked_mul(stride)
        .ok_or_else(|| format!("{count} x {stride} bytes overflows"))?;
    if size > max {
        return Err(format!("{size} bytes exceeds the device limit of {max}"));
    }
    Ok(size)
}

/// One step of recording a mesh draw.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DrawStep {
    VertexBuffer { slot: u32, stride: u64, offset: u64 },
    IndexBuffer { format: wgpu::IndexFormat },
    ApplyPass { index: usize },
    DrawIndexed { index_count: u32 },
}

/// Recording order of a mesh draw: buffers once, then each pass applied and drawn.
pub fn draw_steps(pass_count: usize, index_count: u32, stride: u64) -> Vec<DrawStep> {
    let mut steps = Vec::with_capacity(2 + pass_count * 2);
    steps.push(DrawStep::VertexBuffer {
        slot: 0,
        stride,
        offset: 0,
    });
    steps.push(DrawStep::IndexBuffer {
        format: wgpu::IndexFormat::Uint32,
    });
    for index in 0..pass_count {
        steps.push(DrawStep::ApplyPass { index });
        steps.push(DrawStep::DrawIndexed { index_count });
    }
    steps
}

/// Field order is drop order: buffers before the effect.
pub struct Mesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    effect: Box<dyn Effect>,

    label: String,
    kind: MeshKind,
    vertex_stride: u64,
    index_count: u32,
    transform: Transform,
}

impl std::fmt::Debug for Mesh {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mesh")
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("effect", &self.effect.name())
            .field("index_count", &self.index_count)
            .finish_non_exhaustive()
    }
}

impl Mesh {
    /// Uploads `vertices` and `indices` into immutable buffers bound to `effect`.
    pub fn new<V: Vertex>(
        device: &wgpu::Device,
        label: impl Into<String>,
        vertices: &[V],
        indices: &[u32],
        effect: Box<dyn Effect>,
        kind: MeshKind,
    ) -> Result<Self, MeshError> {
        let label = label.into();
        let max = device.limits().max_buffer_size;
        let buffer_error = |reason: String| MeshError::Buffer {
            label: label.clone(),
            reason,
        };

        // Both sizes are checked before either buffer exists.
        let vertex_bytes = buffer_size(vertices.len(), V::STRIDE, max).map_err(|r| buffer_error(format!("vertex {r}")))?;
        let index_bytes = buffer_size(indices.len(), INDEX_STRIDE, max).map_err(|r| buffer_error(format!("index {r}")))?;
        let index_count =
            u32::try_from(indices.len()).map_err(|_| buffer_error(format!("{} indices exceed u32", indices.len())))?;

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&label),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(&label),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        log::debug!(
            "mesh '{label}': {} vertices ({vertex_bytes} B), {index_count} indices ({index_bytes} B)",
            vertices.len()
        );

        Ok(Self {
            vertex_buffer,
            index_buffer,
            effect,
            label,
            kind,
            vertex_stride: V::STRIDE,
            index_count,
            transform: Transform::default(),
        })
    }

    /// Colour-vertex mesh drawn with [`PosColEffect`].
    pub fn pos_col(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        formats: OutputFormats,
        label: impl Into<String>,
        geometry: &Geometry<VertexPosCol>,
        shader: &Path,
    ) -> Result<Self, MeshError> {
        let label = label.into();
        let effect = PosColEffect::new(device, queue, formats, shader).map_err(|source| MeshError::Effect {
            label: label.clone(),
            source,
        })?;
        Self::new(device, label, &geometry.vertices, &geometry.indices, Box::new(effect), MeshKind::Opaque)
    }

    /// Opaque textured mesh with the shaded effect, initially sampled with `sampler`.
    #[allow(clippy::too_many_arguments)]
    pub fn opaque(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        formats: OutputFormats,
        label: impl Into<String>,
        geometry: &Geometry<VertexPosTex>,
        shader: &Path,
        sampler: &SamplerState,
    ) -> Result<Self, MeshError> {
        let variant = (SHADED, MeshKind::Opaque);
        Self::textured(device, queue, formats, label.into(), geometry, shader, sampler, variant)
    }

    /// Alpha-blended textured mesh with the transparent effect.
    #[allow(clippy::too_many_arguments)]
    pub fn transparent(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        formats: OutputFormats,
        label: impl Into<String>,
        geometry: &Geometry<VertexPosTex>,
        shader: &Path,
        sampler: &SamplerState,
    ) -> Result<Self, MeshError> {
        let variant = (TRANSPARENT, MeshKind::Transparent);
        Self::textured(device, queue, formats, label.into(), geometry, shader, sampler, variant)
    }

    #[allow(clippy::too_many_arguments)]
    fn textured(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        formats: OutputFormats,
        label: String,
        geometry: &Geometry<VertexPosTex>,
        shader: &Path,
        sampler: &SamplerState,
        (variant, kind): (PosTexVariant, MeshKind),
    ) -> Result<Self, MeshError> {
        let effect =
            PosTexEffect::new(device, queue, formats, shader, variant, sampler).map_err(|source| MeshError::Effect {
                label: label.clone(),
                source,
            })?;
        Self::new(device, label, &geometry.vertices, &geometry.indices, Box::new(effect), kind)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> MeshKind {
        self.kind
    }

    pub fn effect(&self) -> &dyn Effect {
        self.effect.as_ref()
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    pub fn vertex_buffer_size(&self) -> u64 {
        self.vertex_buffer.size()
    }

    pub fn index_buffer_size(&self) -> u64 {
        self.index_buffer.size()
    }

    pub fn transform(&self) -> &Transform {
        &self.transform
    }

    pub fn world(&self) -> Mat4 {
        self.transform.world()
    }

    pub fn set_world(&mut self, world: Mat4) {
        self.transform.set_world(world);
    }

    pub fn translate(&mut self, offset: Vec3) {
        self.transform.translate(offset);
    }

    pub fn rotate_y(&mut self, angle: f32) {
        self.transform.rotate_y(angle);
    }

    /// Pushes `view_projection · world` and the camera position to the effect.
    pub fn set_matrices(&mut self, queue: &wgpu::Queue, camera: &Camera) {
        let world = self.transform.world();
        let wvp = self.transform.world_view_projection(camera.view_projection());
        self.effect
            .set_world_view_projection(queue, wvp, world, camera.position());
    }

    pub fn set_diffuse_map(&mut self, texture: &Texture) -> Result<(), EffectError> {
        self.set_map(MapSlot::Diffuse, texture)
    }

    pub fn set_map(&mut self, slot: MapSlot, texture: &Texture) -> Result<(), EffectError> {
        self.effect.set_map(slot, texture)
    }

    pub fn set_sampler_state(&mut self, sampler: &SamplerState) -> Result<bool, EffectError> {
        self.effect.set_sampler_state(sampler)
    }

    pub fn consumes_sampler(&self) -> bool {
        self.effect.consumes_sampler()
    }

    /// Records this mesh's draw into `render_pass`.
    pub fn render(&mut self, device: &wgpu::Device, render_pass: &mut wgpu::RenderPass<'_>) {
        let pass_count = self.effect.technique().pass_count();
        for step in draw_steps(pass_count, self.index_count, self.vertex_stride) {
            match step {
                DrawStep::VertexBuffer { slot, offset, .. } => {
                    render_pass.set_vertex_buffer(slot, self.vertex_buffer.slice(offset..));
                }
                DrawStep::IndexBuffer { format } => {
                    render_pass.set_index_buffer(self.index_buffer.slice(..), format);
                }
                DrawStep::ApplyPass { index } => self.effect.apply_pass(device, render_pass, index),
                DrawStep::DrawIndexed { index_count } => render_pass.draw_indexed(0..index_count, 0, 0..1),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_sizes_are_count_times_stride() {
        assert_eq!(buffer_size(24, VertexPosTex::STRIDE, u64::MAX), Ok(24 * 44));
        assert_eq!(buffer_size(8, VertexPosCol::STRIDE, u64::MAX), Ok(8 * 24));
        assert_eq!(buffer_size(36, INDEX_STRIDE, u64::MAX), Ok(144));
    }

    #[test]
    fn empty_or_oversized_buffers_are_rejected() {
        assert!(buffer_size(0, 24, u64::MAX).is_err());
        assert!(buffer_size(10, 24, 100).is_err());
        assert!(buffer_size(usize::MAX, u64::MAX, u64::MAX).is_err());
    }

    #[test]
    fn draw_binds_buffers_then_draws_each_pass() {
        let steps = draw_steps(2, 36, 44);
        assert_eq!(
            steps,
            vec![
                DrawStep::VertexBuffer {
                    slot: 0,
                    stride: 44,
                    offset: 0
                },
                DrawStep::IndexBuffer {
                    format: wgpu::IndexFormat::Uint32
                },
                DrawStep::ApplyPass { index: 0 },
                DrawStep::DrawIndexed { index_count: 36 },
                DrawStep::ApplyPass { index: 1 },
                DrawStep::DrawIndexed { index_count: 36 },
            ]
        );
    }

    #[test]
    fn single_pass_draws_once() {
        let draws = draw_steps(1, 6, 24)
            .into_iter()
            .filter(|s| matches!(s, DrawStep::DrawIndexed { .. }))
            .count();
        assert_eq!(draws, 1);
    }

    fn headless() -> Option<crate::renderer::Renderer<'static>> {
        let renderer = crate::renderer::Renderer::headless(64, 64, Default::default());
        renderer.is_initialized().then_some(renderer)
    }

    #[test]
    fn textured_mesh_on_a_device() {
        use crate::effect::bundled_shader;
        use crate::texture::{FilteringMethod, SamplerSet, TextureData};

        let Some(renderer) = headless() else {
            return;
        };
        let (Some(device), Some(queue), Some(formats)) = (renderer.device(), renderer.queue(), renderer.output_formats())
        else {
            return;
        };

        let cube = textured_cube(1.0);
        let samplers = SamplerSet::new(device);
        let point = samplers.get(FilteringMethod::Point);
        let shader = bundled_shader("shaded.wgsl");
        let mut mesh = Mesh::opaque(device, queue, formats, "cube", &cube, &shader, point).unwrap();

        assert_eq!(mesh.vertex_buffer_size(), cube.vertices.len() as u64 * VertexPosTex::STRIDE);
        assert_eq!(mesh.index_buffer_size(), cube.indices.len() as u64 * INDEX_STRIDE);
        assert_eq!(mesh.index_count() as usize, cube.indices.len());
        assert!(mesh.consumes_sampler());

        // Built with the point sampler already bound.
        assert!(!mesh.set_sampler_state(point).unwrap());
        let linear = samplers.get(FilteringMethod::Linear);
        assert!(mesh.set_sampler_state(linear).unwrap());
        assert!(!mesh.set_sampler_state(linear).unwrap());

        let flame = Texture::upload(device, queue, &TextureData::flame(16)).unwrap();
        mesh.set_diffuse_map(&flame).unwrap();

        mesh.set_world(Mat4::from_rotation_y(0.5));
        mesh.translate(Vec3::new(0.0, 2.0, 0.0));
        let origin = mesh.world().transform_point3(Vec3::ZERO);
        assert!(origin.abs_diff_eq(Vec3::new(0.0, 2.0, 0.0), 1e-6));
        mesh.set_matrices(queue, renderer.camera());
    }

    #[test]
    fn pos_col_mesh_exposes_no_sampler() {
        use crate::effect::bundled_shader;
        use crate::texture::{FilteringMethod, SamplerSet};

        let Some(renderer) = headless() else {
            return;
        };
        let (Some(device), Some(queue), Some(formats)) = (renderer.device(), renderer.queue(), renderer.output_formats())
        else {
            return;
        };

        let cube = colored_cube(1.0);
        let shader = bundled_shader("pos_col.wgsl");
        let mut mesh = Mesh::pos_col(device, queue, formats, "pos col", &cube, &shader).unwrap();
        assert_eq!(mesh.vertex_buffer_size(), cube.vertices.len() as u64 * VertexPosCol::STRIDE);
        assert!(!mesh.consumes_sampler());

        let samplers = SamplerSet::new(device);
        let err = mesh.set_sampler_state(samplers.get(FilteringMethod::Point)).unwrap_err();
        assert!(matches!(err, EffectError::UnsupportedParameter { parameter: "sampler", .. }));
    }

    #[test]
    fn widened_uniform_block_fails_mesh_creation() {
        use crate::effect::bundled_shader;

        let Some(renderer) = headless() else {
            return;
        };
        let (Some(device), Some(queue), Some(formats)) = (renderer.device(), renderer.queue(), renderer.output_formats())
        else {
            return;
        };

        let source = std::fs::read_to_string(bundled_shader("pos_col.wgsl"))
            .unwrap()
            .replace("camera_position: vec4<f32>,", "camera_position: vec4<f32>,\n    tint: vec4<f32>,");
        let path = std::env::temp_dir().join(format!("prism-widened-{}.wgsl", std::process::id()));
        std::fs::write(&path, source).unwrap();

        let result = Mesh::pos_col(device, queue, formats, "widened", &colored_cube(1.0), &path);
        let _ = std::fs::remove_file(&path);

        match result {
            Err(MeshError::Effect {
                source: EffectError::UniformSize { size, expected, .. },
                ..
            }) => {
                assert_eq!(size, 160);
                assert_eq!(expected, 144);
            }
            other => panic!("expected a uniform size error, got {other:?}"),
        }
    }
}
