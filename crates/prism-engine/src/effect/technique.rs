use super::program::ShaderProgram;
use super::EffectError;

/// Name of the only technique an effect exposes.
pub const DEFAULT_TECHNIQUE: &str = "DefaultTechnique";

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum PassBlend {
    Opaque,
    Alpha,
}

impl PassBlend {
    pub fn state(self) -> Option<wgpu::BlendState> {
        match self {
            PassBlend::Opaque => None,
            PassBlend::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
        }
    }
}

/// Pipeline state of one pass.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PassDesc {
    pub vertex_entry: &'static str,
    pub fragment_entry: &'static str,
    pub blend: PassBlend,
    pub depth_write: bool,
    pub cull_mode: Option<wgpu::Face>,
}

impl PassDesc {
    pub const OPAQUE: Self = Self {
        vertex_entry: "vs_main",
        fragment_entry: "fs_main",
        blend: PassBlend::Opaque,
        depth_write: true,
        cull_mode: Some(wgpu::Face::Back),
    };

    /// Depth-tested but not depth-written, both faces visible.
    pub const ALPHA_BLENDED: Self = Self {
        vertex_entry: "vs_main",
        fragment_entry: "fs_main",
        blend: PassBlend::Alpha,
        depth_write: false,
        cull_mode: None,
    };
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TechniqueDesc {
    pub name: &'static str,
    pub passes: &'static [PassDesc],
}

/// A technique whose passes were checked against a program's entry points.
#[derive(Debug, Clone, PartialEq)]
pub struct Technique {
    name: String,
    passes: Vec<PassDesc>,
}

impl Technique {
    /// Looks up `name` among `declared` and checks every pass against `program`.
    pub fn resolve(
        program: &ShaderProgram,
        declared: &[TechniqueDesc],
        name: &str,
    ) -> Result<Self, EffectError> {
        let invalid = |reason: String| EffectError::InvalidTechnique {
            path: program.path().to_path_buf(),
            technique: name.to_owned(),
            reason,
        };

        let desc = declared
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| invalid("technique is not declared by the effect".to_owned()))?;

        if desc.passes.is_empty() {
            return Err(invalid("technique has no passes".to_owned()));
        }

        for (index, pass) in desc.passes.iter().enumerate() {
            for (entry, stage) in [
                (pass.vertex_entry, naga::ShaderStage::Vertex),
                (pass.fragment_entry, naga::ShaderStage::Fragment),
            ] {
                match program.entry_point(entry) {
                    None => {
                        return Err(invalid(format!("pass {index}: entry point '{entry}' not found")));
                    }
                    Some(ep) if ep.stage != stage => {
                        return Err(invalid(format!(
                            "pass {index}: '{entry}' is a {:?} entry point, expected {stage:?}",
                            ep.stage
                        )));
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(Self {
            name: desc.name.to_owned(),
            passes: desc.passes.to_vec(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn passes(&self) -> &[PassDesc] {
        &self.passes
    }

    pub fn pass_count(&self) -> usize {
        self.passes.len()
    }

    /// Non-empty by construction.
    pub fn first_pass(&self) -> &PassDesc {
        &self.passes[0]
    }
}
