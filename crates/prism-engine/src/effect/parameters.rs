//! Shader parameters: the per-object uniform block, texture maps and sampler.
//!
//! Layout of bind group 0 shared by every effect:
//! `@binding(0)` uniforms, `@binding(1)` sampler, `@binding(2..)` maps.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use super::program::{ResourceKind, ShaderResource};
use super::EffectError;
use crate::texture::{FilteringMethod, SamplerState, Texture, TextureData, TextureId};

pub const UNIFORM_BINDING: u32 = 0;
pub const SAMPLER_BINDING: u32 = 1;
pub const FIRST_MAP_BINDING: u32 = 2;

/// Byte size of the uniform buffer bound at [`UNIFORM_BINDING`].
pub const UNIFORM_SIZE: u64 = std::mem::size_of::<EffectUniforms>() as u64;

/// Per-object uniforms, matching `ObjectUniforms` in the shipped shaders.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct EffectUniforms {
    pub world_view_projection: [[f32; 4]; 4],
    pub world: [[f32; 4]; 4],
    pub camera_position: [f32; 4],
}

impl EffectUniforms {
    pub fn new(world_view_projection: Mat4, world: Mat4, camera_position: Vec3) -> Self {
        Self {
            world_view_projection: world_view_projection.to_cols_array_2d(),
            world: world.to_cols_array_2d(),
            camera_position: camera_position.extend(1.0).to_array(),
        }
    }
}

/// Texture map parameters an effect may expose.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MapSlot {
    Diffuse,
    Normal,
    Specular,
    Glossiness,
}

impl MapSlot {
    pub fn name(self) -> &'static str {
        match self {
            MapSlot::Diffuse => "diffuse map",
            MapSlot::Normal => "normal map",
            MapSlot::Specular => "specular map",
            MapSlot::Glossiness => "glossiness map",
        }
    }

    /// Pixel of the 1x1 texture bound until a real map is set.
    pub fn fallback_pixel(self) -> [u8; 4] {
        match self {
            MapSlot::Diffuse => [255, 255, 255, 255],
            MapSlot::Normal => [128, 128, 255, 255],
            MapSlot::Specular => [0, 0, 0, 255],
            MapSlot::Glossiness => [255, 255, 255, 255],
        }
    }
}

/// Which texture and sampler each binding currently refers to.
///
/// `generation` advances only when a binding actually changes, so callers can
/// rebuild bind groups lazily.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingState {
    maps: Vec<(MapSlot, Option<TextureId>)>,
    sampler: Option<FilteringMethod>,
    has_sampler: bool,
    generation: u64,
}

impl BindingState {
    pub fn new(maps: &[MapSlot], has_sampler: bool) -> Self {
        Self {
            maps: maps.iter().map(|slot| (*slot, None)).collect(),
            sampler: None,
            has_sampler,
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn slots(&self) -> impl Iterator<Item = MapSlot> + '_ {
        self.maps.iter().map(|(slot, _)| *slot)
    }

    pub fn map_index(&self, slot: MapSlot) -> Option<usize> {
        self.maps.iter().position(|(s, _)| *s == slot)
    }

    pub fn map(&self, slot: MapSlot) -> Option<TextureId> {
        self.maps.iter().find(|(s, _)| *s == slot).and_then(|(_, id)| *id)
    }

    pub fn sampler(&self) -> Option<FilteringMethod> {
        self.sampler
    }

    pub fn has_sampler(&self) -> bool {
        self.has_sampler
    }

    /// `None` if the slot is not exposed; otherwise whether the binding changed.
    pub fn set_map(&mut self, slot: MapSlot, texture: TextureId) -> Option<bool> {
        let index = self.map_index(slot)?;
        let changed = self.maps[index].1 != Some(texture);
        if changed {
            self.maps[index].1 = Some(texture);
            self.generation += 1;
        }
        Some(changed)
    }

    /// `None` if no sampler is exposed; otherwise whether the binding changed.
    pub fn set_sampler(&mut self, method: FilteringMethod) -> Option<bool> {
        if !self.has_sampler {
            return None;
        }
        let changed = self.sampler != Some(method);
        if changed {
            self.sampler = Some(method);
            self.generation += 1;
        }
        Some(changed)
    }

    /// Kind of resource provided at each binding of group 0.
    pub fn provided(&self) -> Vec<(u32, ResourceKind)> {
        let mut provided = vec![(UNIFORM_BINDING, ResourceKind::Uniform)];
        if self.has_sampler {
            provided.push((SAMPLER_BINDING, ResourceKind::Sampler));
        }
        provided.extend((0..self.maps.len() as u32).map(|i| (FIRST_MAP_BINDING + i, ResourceKind::Texture)));
        provided
    }

    /// First resource the program declares that these bindings do not provide.
    pub fn first_unprovided(&self, resources: &[ShaderResource]) -> Option<ShaderResource> {
        let provided = self.provided();
        resources
            .iter()
            .find(|r| r.group != 0 || !provided.contains(&(r.binding, r.kind)))
            .copied()
    }
}

/// First uniform block declared larger than the [`EffectUniforms`] buffer bound to it.
pub fn oversized_uniform(resources: &[ShaderResource]) -> Option<ShaderResource> {
    resources
        .iter()
        .find(|r| r.kind == ResourceKind::Uniform && r.size.is_some_and(|size| u64::from(size) > UNIFORM_SIZE))
        .copied()
}

/// GPU side of an effect's parameters: uniform buffer, layout and bind group.
#[derive(Debug)]
pub struct ParameterBlock {
    state: BindingState,
    bind_group: Option<wgpu::BindGroup>,
    bind_group_generation: u64,
    layout: wgpu::BindGroupLayout,
    uniforms: wgpu::Buffer,
    sampler: Option<wgpu::Sampler>,
    map_views: Vec<wgpu::TextureView>,
    _fallbacks: Vec<Texture>,
}

impl ParameterBlock {
    /// Creates the uniform buffer, layout and fallback maps.
    ///
    /// `sampler` is the initially bound sampler; it is shared with every other
    /// effect and only referenced here.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        maps: &[MapSlot],
        sampler: Option<&SamplerState>,
    ) -> Result<Self, EffectError> {
        let has_sampler = sampler.is_some();
        let mut state = BindingState::new(maps, has_sampler);
        if let Some(sampler) = sampler {
            state.set_sampler(sampler.method());
        }

        let fragment_only = wgpu::ShaderStages::FRAGMENT;
        let mut entries = vec![wgpu::BindGroupLayoutEntry {
            binding: UNIFORM_BINDING,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: wgpu::BufferSize::new(UNIFORM_SIZE),
            },
            count: None,
        }];
        if has_sampler {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: SAMPLER_BINDING,
                visibility: fragment_only,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }
        for i in 0..maps.len() as u32 {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: FIRST_MAP_BINDING + i,
                visibility: fragment_only,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(label),
            entries: &entries,
        });

        let uniforms = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: UNIFORM_SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let sampler = sampler.map(|s| s.sampler().clone());

        let fallbacks = maps
            .iter()
            .map(|slot| Texture::upload(device, queue, &TextureData::solid(slot.name(), slot.fallback_pixel())))
            .collect::<Result<Vec<_>, _>>()?;
        let map_views = fallbacks.iter().map(|t| t.view().clone()).collect();

        Ok(Self {
            state,
            bind_group: None,
            bind_group_generation: 0,
            layout,
            uniforms,
            sampler,
            map_views,
            _fallbacks: fallbacks,
        })
    }

    pub fn state(&self) -> &BindingState {
        &self.state
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn write_uniforms(&self, queue: &wgpu::Queue, uniforms: &EffectUniforms) {
        queue.write_buffer(&self.uniforms, 0, bytemuck::bytes_of(uniforms));
    }

    pub fn set_map(&mut self, slot: MapSlot, texture: &Texture) -> Option<bool> {
        let changed = self.state.set_map(slot, texture.id())?;
        if changed {
            let index = self.state.map_index(slot)?;
            self.map_views[index] = texture.view().clone();
        }
        Some(changed)
    }

    pub fn set_sampler(&mut self, sampler: &SamplerState) -> Option<bool> {
        let changed = self.state.set_sampler(sampler.method())?;
        if changed {
            self.sampler = Some(sampler.sampler().clone());
        }
        Some(changed)
    }

    /// Returns the bind group, rebuilding it if any binding changed since the last call.
    pub fn bind_group(&mut self, device: &wgpu::Device) -> &wgpu::BindGroup {
        let generation = self.state.generation();

        let group = match self.bind_group.take() {
            Some(group) if self.bind_group_generation == generation => group,
            _ => {
                let mut entries = vec![wgpu::BindGroupEntry {
                    binding: UNIFORM_BINDING,
                    resource: self.uniforms.as_entire_binding(),
                }];
                if let Some(sampler) = &self.sampler {
                    entries.push(wgpu::BindGroupEntry {
                        binding: SAMPLER_BINDING,
                        resource: wgpu::BindingResource::Sampler(sampler),
                    });
                }
                for (i, view) in self.map_views.iter().enumerate() {
                    entries.push(wgpu::BindGroupEntry {
                        binding: FIRST_MAP_BINDING + i as u32,
                        resource: wgpu::BindingResource::TextureView(view),
                    });
                }

                log::trace!("rebuilding bind group (generation {generation})");
                self.bind_group_generation = generation;
                device.create_bind_group(&wgpu::BindGroupDescriptor {
                    label: None,
                    layout: &self.layout,
                    entries: &entries,
                })
            }
        };

        self.bind_group.insert(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (TextureId, TextureId) {
        (TextureId::next(), TextureId::next())
    }

    #[test]
    fn uniforms_are_144_bytes() {
        assert_eq!(std::mem::size_of::<EffectUniforms>(), 144);
        let u = EffectUniforms::new(Mat4::IDENTITY, Mat4::IDENTITY, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(u.camera_position, [1.0, 2.0, 3.0, 1.0]);
    }

    #[test]
    fn same_sampler_twice_leaves_bindings_unchanged() {
        let mut state = BindingState::new(&[MapSlot::Diffuse], true);
        assert_eq!(state.set_sampler(FilteringMethod::Linear), Some(true));
        let generation = state.generation();
        let snapshot = state.clone();

        assert_eq!(state.set_sampler(FilteringMethod::Linear), Some(false));
        assert_eq!(state.generation(), generation);
        assert_eq!(state, snapshot);

        assert_eq!(state.set_sampler(FilteringMethod::Anisotropic), Some(true));
        assert_eq!(state.generation(), generation + 1);
    }

    #[test]
    fn maps_change_only_on_new_textures() {
        let (a, b) = ids();
        let mut state = BindingState::new(&[MapSlot::Diffuse, MapSlot::Normal], true);

        assert_eq!(state.set_map(MapSlot::Normal, a), Some(true));
        assert_eq!(state.set_map(MapSlot::Normal, a), Some(false));
        assert_eq!(state.set_map(MapSlot::Diffuse, b), Some(true));
        assert_eq!(state.generation(), 2);
        assert_eq!(state.map(MapSlot::Normal), Some(a));
    }

    #[test]
    fn unexposed_parameters_are_reported() {
        let (a, _) = ids();
        let mut state = BindingState::new(&[], false);
        assert_eq!(state.set_map(MapSlot::Diffuse, a), None);
        assert_eq!(state.set_sampler(FilteringMethod::Point), None);
        assert_eq!(state.generation(), 0);
    }

    #[test]
    fn provided_bindings_follow_the_slot_order() {
        let state = BindingState::new(&[MapSlot::Diffuse, MapSlot::Glossiness], true);
        assert_eq!(
            state.provided(),
            vec![
                (0, ResourceKind::Uniform),
                (1, ResourceKind::Sampler),
                (2, ResourceKind::Texture),
                (3, ResourceKind::Texture),
            ]
        );

        let extra = ShaderResource {
            group: 0,
            binding: 4,
            kind: ResourceKind::Texture,
            size: None,
        };
        assert_eq!(state.first_unprovided(&[extra]), Some(extra));
    }

    #[test]
    fn uniform_blocks_larger_than_the_buffer_are_found() {
        let uniform = |size| ShaderResource {
            group: 0,
            binding: UNIFORM_BINDING,
            kind: ResourceKind::Uniform,
            size: Some(size),
        };
        assert_eq!(oversized_uniform(&[uniform(144)]), None);
        assert_eq!(oversized_uniform(&[uniform(64)]), None);
        assert_eq!(oversized_uniform(&[uniform(160)]), Some(uniform(160)));
    }
}
