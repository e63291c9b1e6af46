use std::path::Path;

use super::{
    CompileFlags, Effect, EffectCore, EffectDesc, EffectError, MapSlot, PassDesc, TechniqueDesc,
    DEFAULT_TECHNIQUE,
};
use crate::device::OutputFormats;
use crate::mesh::{VertexPosCol, VertexPosTex};
use crate::texture::{SamplerState, Texture};

const OPAQUE_TECHNIQUES: &[TechniqueDesc] = &[TechniqueDesc {
    name: DEFAULT_TECHNIQUE,
    passes: &[PassDesc::OPAQUE],
}];

/// Unlit effect for [`VertexPosCol`] meshes. Exposes no maps and no sampler.
#[derive(Debug)]
pub struct PosColEffect {
    core: EffectCore,
}

impl PosColEffect {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        formats: OutputFormats,
        path: &Path,
    ) -> Result<Self, EffectError> {
        let desc = EffectDesc {
            path,
            techniques: OPAQUE_TECHNIQUES,
            maps: &[],
            sampler: None,
            flags: CompileFlags::from_build_config(),
        };
        Ok(Self {
            core: EffectCore::new::<VertexPosCol>(device, queue, formats, &desc)?,
        })
    }
}

impl Effect for PosColEffect {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EffectCore {
        &mut self.core
    }

    fn name(&self) -> &'static str {
        "PosCol"
    }
}

/// Technique and texture maps of a [`PosTexEffect`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct PosTexVariant {
    pub name: &'static str,
    pub techniques: &'static [TechniqueDesc],
    pub maps: &'static [MapSlot],
}

/// Opaque Phong shading with normal, specular and glossiness maps.
pub const SHADED: PosTexVariant = PosTexVariant {
    name: "PosTex/shaded",
    techniques: OPAQUE_TECHNIQUES,
    maps: &[MapSlot::Diffuse, MapSlot::Normal, MapSlot::Specular, MapSlot::Glossiness],
};

/// Alpha-blended diffuse only.
pub const TRANSPARENT: PosTexVariant = PosTexVariant {
    name: "PosTex/transparent",
    techniques: &[TechniqueDesc {
        name: DEFAULT_TECHNIQUE,
        passes: &[PassDesc::ALPHA_BLENDED],
    }],
    maps: &[MapSlot::Diffuse],
};

/// Textured effect for [`VertexPosTex`] meshes.
#[derive(Debug)]
pub struct PosTexEffect {
    core: EffectCore,
    variant: PosTexVariant,
}

impl PosTexEffect {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        formats: OutputFormats,
        path: &Path,
        variant: PosTexVariant,
        sampler: &SamplerState,
    ) -> Result<Self, EffectError> {
        let desc = EffectDesc {
            path,
            techniques: variant.techniques,
            maps: variant.maps,
            sampler: Some(sampler),
            flags: CompileFlags::from_build_config(),
        };
        Ok(Self {
            core: EffectCore::new::<VertexPosTex>(device, queue, formats, &desc)?,
            variant,
        })
    }
}

impl Effect for PosTexEffect {
    fn core(&self) -> &EffectCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut EffectCore {
        &mut self.core
    }

    fn name(&self) -> &'static str {
        self.variant.name
    }

    fn set_map(&mut self, slot: MapSlot, texture: &Texture) -> Result<(), EffectError> {
        match self.core.parameters_mut().set_map(slot, texture) {
            Some(_) => Ok(()),
            None => Err(EffectError::UnsupportedParameter {
                effect: self.name().to_owned(),
                parameter: slot.name(),
            }),
        }
    }

    fn set_sampler_state(&mut self, sampler: &SamplerState) -> Result<bool, EffectError> {
        self.core
            .parameters_mut()
            .set_sampler(sampler)
            .ok_or_else(|| EffectError::UnsupportedParameter {
                effect: self.name().to_owned(),
                parameter: "sampler",
            })
    }

    fn consumes_sampler(&self) -> bool {
        self.core.parameters().state().has_sampler()
    }
}
