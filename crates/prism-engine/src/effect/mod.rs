//! Effects: a compiled shader program, one technique and a derived input layout.
//!
//! An effect is created from a WGSL asset when its mesh is built and is owned
//! by that mesh. The program is parsed and validated with naga before any GPU
//! object exists, so a bad asset surfaces as an `EffectError` instead of a
//! device error.

mod layout;
mod parameters;
mod program;
mod technique;
mod variants;

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use glam::{Mat4, Vec3};
use thiserror::Error;

use crate::device::OutputFormats;
use crate::mesh::Vertex;
use crate::texture::{SamplerState, Texture, TextureError};

pub use layout::InputLayout;
pub use parameters::{oversized_uniform, BindingState, EffectUniforms, MapSlot, ParameterBlock, UNIFORM_SIZE};
pub use program::{CompileFlags, ResourceKind, ShaderProgram, ShaderResource, SignatureInput};
pub use technique::{PassBlend, PassDesc, Technique, TechniqueDesc, DEFAULT_TECHNIQUE};
pub use variants::{PosColEffect, PosTexEffect, PosTexVariant, SHADED, TRANSPARENT};

/// Path of a shader shipped with this crate.
pub fn bundled_shader(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("shaders").join(name)
}

#[derive(Debug, Error)]
pub enum EffectError {
    #[error("failed to load effect '{path}': {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to compile effect '{path}':\n{diagnostics}")]
    Compile { path: PathBuf, diagnostics: String },

    #[error("technique '{technique}' of '{path}' is not valid: {reason}")]
    InvalidTechnique {
        path: PathBuf,
        technique: String,
        reason: String,
    },

    #[error("input layout for '{path}' rejected: {reason}")]
    InputLayout { path: PathBuf, reason: String },

    #[error("'{path}' declares @group({group}) @binding({binding}) ({kind:?}), which the effect does not provide")]
    ResourceBinding {
        path: PathBuf,
        group: u32,
        binding: u32,
        kind: ResourceKind,
    },

    #[error("'{path}' declares a {size}-byte uniform block at @binding({binding}); the effect binds {expected} bytes")]
    UniformSize {
        path: PathBuf,
        binding: u32,
        size: u32,
        expected: u64,
    },

    #[error("device rejected effect '{path}': {message}")]
    Pipeline { path: PathBuf, message: String },

    #[error("effect '{effect}' has no {parameter} parameter")]
    UnsupportedParameter {
        effect: String,
        parameter: &'static str,
    },

    #[error(transparent)]
    Texture(#[from] TextureError),
}

/// Everything needed to build an [`EffectCore`] besides the device.
#[derive(Debug, Clone, Copy)]
pub struct EffectDesc<'a> {
    pub path: &'a Path,
    pub techniques: &'static [TechniqueDesc],
    pub maps: &'static [MapSlot],
    /// Shared sampler bound at creation; `None` for effects without one.
    pub sampler: Option<&'a SamplerState>,
    pub flags: CompileFlags,
}

/// State shared by every effect variant: one render pipeline per technique pass.
#[derive(Debug)]
pub struct EffectCore {
    program: ShaderProgram,
    technique: Technique,
    pipelines: Vec<wgpu::RenderPipeline>,
    input_layout: InputLayout,
    parameters: ParameterBlock,
}

impl EffectCore {
    pub fn new<V: Vertex>(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        formats: OutputFormats,
        desc: &EffectDesc<'_>,
    ) -> Result<Self, EffectError> {
        let program = ShaderProgram::load(desc.path, desc.flags)?;
        let technique = Technique::resolve(&program, desc.techniques, DEFAULT_TECHNIQUE)?;
        let input_layout = InputLayout::derive(&program, &technique, V::ELEMENTS, V::STRIDE)?;

        let label = program.label();
        let mut parameters = ParameterBlock::new(
            device,
            queue,
            label.as_deref().unwrap_or("prism effect"),
            desc.maps,
            desc.sampler,
        )?;

        let resources = program.resources();
        if let Some(missing) = parameters.state().first_unprovided(&resources) {
            return Err(EffectError::ResourceBinding {
                path: program.path().to_path_buf(),
                group: missing.group,
                binding: missing.binding,
                kind: missing.kind,
            });
        }
        if let Some(oversized) = oversized_uniform(&resources) {
            return Err(EffectError::UniformSize {
                path: program.path().to_path_buf(),
                binding: oversized.binding,
                size: oversized.size.unwrap_or_default(),
                expected: UNIFORM_SIZE,
            });
        }

        // Anything naga accepts but the device still rejects is reported here
        // instead of reaching the uncaptured error handler.
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: label.as_deref(),
            source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(program.source())),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: label.as_deref(),
            bind_group_layouts: &[parameters.layout()],
            immediate_size: 0,
        });

        let pipelines: Vec<wgpu::RenderPipeline> = technique
            .passes()
            .iter()
            .map(|pass| {
                create_pass_pipeline(
                    device,
                    &pipeline_layout,
                    &shader,
                    &input_layout,
                    pass,
                    formats,
                    label.as_deref(),
                )
            })
            .collect();

        parameters.bind_group(device);

        if let Some(err) = pollster::block_on(scope.pop()) {
            log::error!("device rejected effect '{}': {err}", program.path().display());
            return Err(EffectError::Pipeline {
                path: program.path().to_path_buf(),
                message: err.to_string(),
            });
        }

        log::debug!(
            "effect '{}' ready: {} pass(es), {} vertex input(s)",
            program.path().display(),
            technique.pass_count(),
            input_layout.attributes().len()
        );

        Ok(Self {
            program,
            technique,
            pipelines,
            input_layout,
            parameters,
        })
    }

    pub fn program(&self) -> &ShaderProgram {
        &self.program
    }

    pub fn technique(&self) -> &Technique {
        &self.technique
    }

    pub fn input_layout(&self) -> &InputLayout {
        &self.input_layout
    }

    pub fn parameters(&self) -> &ParameterBlock {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut ParameterBlock {
        &mut self.parameters
    }

    pub fn write_matrices(&self, queue: &wgpu::Queue, world_view_projection: Mat4, world: Mat4, camera_position: Vec3) {
        self.parameters
            .write_uniforms(queue, &EffectUniforms::new(world_view_projection, world, camera_position));
    }

    /// Binds pass `index`'s pipeline and the current parameters.
    pub fn apply_pass(&mut self, device: &wgpu::Device, render_pass: &mut wgpu::RenderPass<'_>, index: usize) {
        let Some(pipeline) = self.pipelines.get(index) else {
            log::warn!(
                "'{}' has no pass {index} (technique has {})",
                self.program.path().display(),
                self.pipelines.len()
            );
            return;
        };
        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, self.parameters.bind_group(device), &[]);
    }
}

fn create_pass_pipeline(
    device: &wgpu::Device,
    layout: &wgpu::PipelineLayout,
    shader: &wgpu::ShaderModule,
    input_layout: &InputLayout,
    pass: &PassDesc,
    formats: OutputFormats,
    label: Option<&str>,
) -> wgpu::RenderPipeline {
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label,
        layout: Some(layout),

        vertex: wgpu::VertexState {
            module: shader,
            entry_point: Some(pass.vertex_entry),
            compilation_options: Default::default(),
            buffers: &[input_layout.buffer_layout()],
        },

        fragment: Some(wgpu::FragmentState {
            module: shader,
            entry_point: Some(pass.fragment_entry),
            compilation_options: Default::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: formats.color,
                blend: pass.blend.state(),
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),

        // Left-handed geometry: clockwise triangles face the viewer.
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleList,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Cw,
            cull_mode: pass.cull_mode,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },

        depth_stencil: Some(wgpu::DepthStencilState {
            format: formats.depth,
            depth_write_enabled: pass.depth_write,
            depth_compare: wgpu::CompareFunction::Less,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }),
        multisample: wgpu::MultisampleState::default(),

        multiview_mask: None,
        cache: None,
    })
}

/// Capability interface every effect variant implements.
///
/// Parameters an effect does not expose report
/// [`EffectError::UnsupportedParameter`] instead of being silently ignored.
pub trait Effect {
    fn core(&self) -> &EffectCore;
    fn core_mut(&mut self) -> &mut EffectCore;

    fn name(&self) -> &'static str;

    fn technique(&self) -> &Technique {
        self.core().technique()
    }

    fn input_layout(&self) -> &InputLayout {
        self.core().input_layout()
    }

    /// Uploads the per-object matrices immediately.
    fn set_world_view_projection(
        &mut self,
        queue: &wgpu::Queue,
        world_view_projection: Mat4,
        world: Mat4,
        camera_position: Vec3,
    ) {
        self.core()
            .write_matrices(queue, world_view_projection, world, camera_position);
    }

    fn set_map(&mut self, slot: MapSlot, texture: &Texture) -> Result<(), EffectError> {
        let _ = texture;
        Err(EffectError::UnsupportedParameter {
            effect: self.name().to_owned(),
            parameter: slot.name(),
        })
    }

    /// Returns whether the bound sampler changed.
    fn set_sampler_state(&mut self, sampler: &SamplerState) -> Result<bool, EffectError> {
        let _ = sampler;
        Err(EffectError::UnsupportedParameter {
            effect: self.name().to_owned(),
            parameter: "sampler",
        })
    }

    fn consumes_sampler(&self) -> bool {
        false
    }

    fn apply_pass(&mut self, device: &wgpu::Device, render_pass: &mut wgpu::RenderPass<'_>, index: usize) {
        self.core_mut().apply_pass(device, render_pass, index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `pos_col.wgsl` with one more field in its uniform block.
    fn widened_pos_col() -> String {
        std::fs::read_to_string(bundled_shader("pos_col.wgsl"))
            .unwrap()
            .replace("camera_position: vec4<f32>,", "camera_position: vec4<f32>,\n    tint: vec4<f32>,")
    }

    #[test]
    fn widened_uniform_block_is_rejected_before_pipeline_creation() {
        let program = ShaderProgram::from_source("widened.wgsl", widened_pos_col(), CompileFlags::RELEASE).unwrap();
        let oversized = oversized_uniform(&program.resources()).unwrap();
        assert_eq!(oversized.binding, 0);
        assert_eq!(oversized.size, Some(160));

        let shipped = ShaderProgram::load(&bundled_shader("pos_col.wgsl"), CompileFlags::RELEASE).unwrap();
        assert_eq!(oversized_uniform(&shipped.resources()), None);
    }
}
