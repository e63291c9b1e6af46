use std::path::PathBuf;

use glam::Vec3;

use crate::camera::CameraConfig;
use crate::device::GpuInit;
use crate::effect::{bundled_shader, MapSlot};
use crate::mesh::GeometrySource;
use crate::texture::{FilteringMethod, TextureSource};

/// Vertex structure (and therefore effect family) the scene is built with.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum VertexFormat {
    /// Unlit colour vertices.
    PosCol,
    /// Textured vertices: a shaded opaque mesh and a transparent one.
    #[default]
    PosTex,
}

/// Shader, geometry and maps of one scene mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshAssets {
    pub label: String,
    pub shader: PathBuf,
    pub geometry: GeometrySource,
    pub maps: Vec<(MapSlot, TextureSource)>,
}

/// Everything the renderer loads after initialization.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneAssets {
    /// Used when the vertex format is [`VertexFormat::PosCol`].
    pub pos_col: MeshAssets,
    /// Used when the vertex format is [`VertexFormat::PosTex`].
    pub opaque: MeshAssets,
    /// Used when the vertex format is [`VertexFormat::PosTex`].
    pub transparent: MeshAssets,
}

impl Default for SceneAssets {
    fn default() -> Self {
        Self {
            pos_col: MeshAssets {
                label: "colour cube".to_owned(),
                shader: bundled_shader("pos_col.wgsl"),
                geometry: GeometrySource::Cube { size: 10.0 },
                maps: Vec::new(),
            },
            opaque: MeshAssets {
                label: "textured cube".to_owned(),
                shader: bundled_shader("shaded.wgsl"),
                geometry: GeometrySource::Cube { size: 10.0 },
                maps: vec![(MapSlot::Diffuse, TextureSource::Checkerboard { size: 256, cells: 8 })],
            },
            transparent: MeshAssets {
                label: "flame".to_owned(),
                shader: bundled_shader("transparent.wgsl"),
                geometry: GeometrySource::Quad {
                    width: 8.0,
                    height: 8.0,
                    center: Vec3::new(0.0, 2.0, -8.0),
                },
                maps: vec![(MapSlot::Diffuse, TextureSource::Flame { size: 128 })],
            },
        }
    }
}

/// Renderer configuration.
///
/// Keep this structure stable and minimal. Add configuration flags only when a
/// concrete requirement exists.
#[derive(Debug, Clone)]
pub struct RendererConfig {
    /// Adapter, device and surface options.
    pub gpu: GpuInit,

    /// Selects the effect family and which scene assets are loaded.
    pub vertex_format: VertexFormat,

    pub assets: SceneAssets,

    pub camera: CameraConfig,

    /// Colour the back buffer is cleared to each frame.
    pub clear_color: wgpu::Color,

    /// Whether meshes spin around the world Y axis from the first frame.
    pub rotate: bool,

    /// Filtering of the initially bound sampler.
    pub filtering: FilteringMethod,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            gpu: GpuInit::default(),
            vertex_format: VertexFormat::default(),
            assets: SceneAssets::default(),
            camera: CameraConfig::default(),
            clear_color: wgpu::Color {
                r: 0.0,
                g: 0.0,
                b: 0.3,
                a: 1.0,
            },
            rotate: true,
            filtering: FilteringMethod::default(),
        }
    }
}
