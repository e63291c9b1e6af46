//! Scene assembly: meshes, their textures and the shared samplers.

use crate::camera::Camera;
use crate::device::{Gpu, OutputFormats};
use crate::mesh::{Mesh, MeshError};
use crate::texture::{FilteringMethod, SamplerSet, SamplerState, Texture};

use super::config::{MeshAssets, RendererConfig, VertexFormat};

/// Field order is drop order: meshes release their effects before the
/// textures those effects reference.
#[derive(Debug, Default)]
pub(crate) struct Scene {
    pub meshes: Vec<Mesh>,
    pub textures: Vec<Texture>,
    pub samplers: Option<SamplerSet>,
}

enum Build<'a> {
    PosCol,
    Opaque(&'a SamplerState),
    Transparent(&'a SamplerState),
}

impl Scene {
    /// Builds every mesh the configuration asks for; failures are logged and skipped.
    pub fn load(gpu: &Gpu, formats: OutputFormats, config: &RendererConfig, camera: &Camera) -> Self {
        let mut scene = Scene::default();

        // One sampler per filtering method, shared by every textured effect.
        let mut samplers = None;

        let plan: Vec<(&MeshAssets, Build)> = match config.vertex_format {
            VertexFormat::PosCol => vec![(&config.assets.pos_col, Build::PosCol)],
            VertexFormat::PosTex => {
                let sampler = samplers.insert(SamplerSet::new(gpu.device())).get(config.filtering);
                vec![
                    (&config.assets.opaque, Build::Opaque(sampler)),
                    (&config.assets.transparent, Build::Transparent(sampler)),
                ]
            }
        };

        for (assets, build) in plan {
            match scene.build_mesh(gpu, formats, assets, build) {
                Ok(mesh) => scene.meshes.push(mesh),
                Err(err) => log::error!("skipping mesh: {err}"),
            }
        }

        if scene.meshes.iter().any(Mesh::consumes_sampler) {
            scene.samplers = samplers;
        }

        for mesh in &mut scene.meshes {
            mesh.set_matrices(gpu.queue(), camera);
        }

        log::info!(
            "scene loaded: {} mesh(es), {} texture(s)",
            scene.meshes.len(),
            scene.textures.len()
        );
        scene
    }

    fn build_mesh(
        &mut self,
        gpu: &Gpu,
        formats: OutputFormats,
        assets: &MeshAssets,
        build: Build<'_>,
    ) -> Result<Mesh, MeshError> {
        let (device, queue) = (gpu.device(), gpu.queue());
        let label = assets.label.as_str();
        let geometry_error = |source| MeshError::Geometry {
            label: label.to_owned(),
            source,
        };

        let mut mesh = match build {
            Build::PosCol => {
                let geometry = assets.geometry.load_pos_col().map_err(geometry_error)?;
                Mesh::pos_col(device, queue, formats, label, &geometry, &assets.shader)?
            }
            Build::Opaque(sampler) => {
                let geometry = assets.geometry.load_pos_tex().map_err(geometry_error)?;
                Mesh::opaque(device, queue, formats, label, &geometry, &assets.shader, sampler)?
            }
            Build::Transparent(sampler) => {
                let geometry = assets.geometry.load_pos_tex().map_err(geometry_error)?;
                Mesh::transparent(device, queue, formats, label, &geometry, &assets.shader, sampler)?
            }
        };

        for (slot, source) in &assets.maps {
            let texture = match source.load().and_then(|data| Texture::upload(device, queue, &data)) {
                Ok(texture) => texture,
                Err(err) => {
                    log::warn!("'{label}': keeping the default {}: {err}", slot.name());
                    continue;
                }
            };
            if let Err(err) = mesh.set_map(*slot, &texture) {
                log::warn!("'{label}': {err}");
                continue;
            }
            self.textures.push(texture);
        }

        Ok(mesh)
    }

    /// Binds the sampler for `method` on every mesh that samples textures.
    pub fn bind_samplers(&mut self, method: FilteringMethod) {
        let Some(samplers) = &self.samplers else {
            return;
        };
        let sampler = samplers.get(method);
        for mesh in self.meshes.iter_mut().filter(|m| m.consumes_sampler()) {
            if let Err(err) = mesh.set_sampler_state(sampler) {
                log::warn!("'{}': {err}", mesh.label());
            }
        }
    }
}
