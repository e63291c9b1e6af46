//! WGSL loading, validation and reflection.

use std::fs;
use std::path::{Path, PathBuf};

use naga::valid::{Capabilities, ValidationFlags, Validator};

use super::EffectError;
use crate::logging::SHADER_TARGET;

/// Compilation behaviour of shader programs.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct CompileFlags {
    /// Label GPU objects with the asset path and log reflected signatures.
    pub debug: bool,
}

impl CompileFlags {
    pub const DEBUG: Self = Self { debug: true };
    pub const RELEASE: Self = Self { debug: false };

    pub fn from_build_config() -> Self {
        if cfg!(debug_assertions) {
            Self::DEBUG
        } else {
            Self::RELEASE
        }
    }
}

impl Default for CompileFlags {
    fn default() -> Self {
        Self::from_build_config()
    }
}

/// One `@location` input of a vertex entry point.
#[derive(Debug, Clone, PartialEq)]
pub struct SignatureInput {
    pub name: String,
    pub location: u32,
    /// `None` when the WGSL type has no vertex format equivalent.
    pub format: Option<wgpu::VertexFormat>,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ResourceKind {
    Uniform,
    Sampler,
    Texture,
    Other,
}

/// A `@group/@binding` resource declared by the program.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ShaderResource {
    pub group: u32,
    pub binding: u32,
    pub kind: ResourceKind,
    /// Byte size of the bound type, for uniform buffers.
    pub size: Option<u32>,
}

/// A parsed and validated WGSL program.
#[derive(Debug)]
pub struct ShaderProgram {
    path: PathBuf,
    source: String,
    module: naga::Module,
    flags: CompileFlags,
}

impl ShaderProgram {
    /// Reads and compiles the WGSL file at `path`.
    pub fn load(path: &Path, flags: CompileFlags) -> Result<Self, EffectError> {
        let source = fs::read_to_string(path).map_err(|source| EffectError::Load {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_source(path, source, flags)
    }

    /// Compiles WGSL text; `path` is only used for labels and diagnostics.
    pub fn from_source(
        path: impl Into<PathBuf>,
        source: String,
        flags: CompileFlags,
    ) -> Result<Self, EffectError> {
        let path = path.into();

        let module = naga::front::wgsl::parse_str(&source)
            .map_err(|err| compile_error(&path, err.emit_to_string(&source)))?;

        Validator::new(ValidationFlags::all(), Capabilities::empty())
            .validate(&module)
            .map_err(|err| compile_error(&path, err.emit_to_string(&source)))?;

        let program = Self {
            path,
            source,
            module,
            flags,
        };

        if flags.debug {
            for ep in &program.module.entry_points {
                log::debug!(
                    target: SHADER_TARGET,
                    "{}: entry point '{}' ({:?})",
                    program.path.display(),
                    ep.name,
                    ep.stage
                );
            }
        }

        Ok(program)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn module(&self) -> &naga::Module {
        &self.module
    }

    /// GPU object label, present only in debug compilation.
    pub fn label(&self) -> Option<String> {
        self.flags.debug.then(|| self.path.display().to_string())
    }

    pub fn entry_point(&self, name: &str) -> Option<&naga::EntryPoint> {
        self.module.entry_points.iter().find(|ep| ep.name == name)
    }

    /// The `@location` inputs of a vertex entry point, sorted by location.
    ///
    /// Returns `None` if `entry` is not a vertex entry point.
    pub fn vertex_inputs(&self, entry: &str) -> Option<Vec<SignatureInput>> {
        let ep = self
            .entry_point(entry)
            .filter(|ep| ep.stage == naga::ShaderStage::Vertex)?;

        let mut inputs = Vec::new();
        for arg in &ep.function.arguments {
            match &arg.binding {
                Some(naga::Binding::Location { location, .. }) => inputs.push(SignatureInput {
                    name: arg.name.clone().unwrap_or_default(),
                    location: *location,
                    format: vertex_format(&self.module.types[arg.ty].inner),
                }),
                Some(naga::Binding::BuiltIn(_)) => {}
                None => {
                    if let naga::TypeInner::Struct { members, .. } = &self.module.types[arg.ty].inner {
                        for member in members {
                            if let Some(naga::Binding::Location { location, .. }) = &member.binding {
                                inputs.push(SignatureInput {
                                    name: member.name.clone().unwrap_or_default(),
                                    location: *location,
                                    format: vertex_format(&self.module.types[member.ty].inner),
                                });
                            }
                        }
                    }
                }
            }
        }

        inputs.sort_by_key(|input| input.location);
        Some(inputs)
    }

    /// Every bound global resource, in declaration order.
    pub fn resources(&self) -> Vec<ShaderResource> {
        self.module
            .global_variables
            .iter()
            .filter_map(|(_, var)| {
                let binding = var.binding.as_ref()?;
                let kind = match (var.space, &self.module.types[var.ty].inner) {
                    (naga::AddressSpace::Uniform, _) => ResourceKind::Uniform,
                    (_, naga::TypeInner::Sampler { .. }) => ResourceKind::Sampler,
                    (_, naga::TypeInner::Image { .. }) => ResourceKind::Texture,
                    _ => ResourceKind::Other,
                };
                let size = (kind == ResourceKind::Uniform)
                    .then(|| self.module.types[var.ty].inner.try_size(self.module.to_ctx()))
                    .flatten();
                Some(ShaderResource {
                    group: binding.group,
                    binding: binding.binding,
                    kind,
                    size,
                })
            })
            .collect()
    }
}

fn compile_error(path: &Path, diagnostics: String) -> EffectError {
    log::error!("failed to compile '{}':\n{diagnostics}", path.display());
    log::debug!(target: SHADER_TARGET, "{diagnostics}");
    EffectError::Compile {
        path: path.to_path_buf(),
        diagnostics,
    }
}

/// 32-bit scalar and vector types map onto vertex formats; nothing else does.
fn vertex_format(inner: &naga::TypeInner) -> Option<wgpu::VertexFormat> {
    use naga::{ScalarKind as K, VectorSize as S};
    use wgpu::VertexFormat as F;

    match *inner {
        naga::TypeInner::Scalar(naga::Scalar { kind, width: 4 }) => match kind {
            K::Float => Some(F::Float32),
            K::Uint => Some(F::Uint32),
            K::Sint => Some(F::Sint32),
            _ => None,
        },
        naga::TypeInner::Vector {
            size,
            scalar: naga::Scalar { kind, width: 4 },
        } => match (kind, size) {
            (K::Float, S::Bi) => Some(F::Float32x2),
            (K::Float, S::Tri) => Some(F::Float32x3),
            (K::Float, S::Quad) => Some(F::Float32x4),
            (K::Uint, S::Bi) => Some(F::Uint32x2),
            (K::Uint, S::Tri) => Some(F::Uint32x3),
            (K::Uint, S::Quad) => Some(F::Uint32x4),
            (K::Sint, S::Bi) => Some(F::Sint32x2),
            (K::Sint, S::Tri) => Some(F::Sint32x3),
            (K::Sint, S::Quad) => Some(F::Sint32x4),
            _ => None,
        },
        _ => None,
    }
}
