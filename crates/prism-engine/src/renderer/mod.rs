//! The renderer: device, swap chain and depth buffer, plus the per-frame
//! clear → draw → present loop over a small scene.
//!
//! Initialization runs through [`InitStage`] in order and stops at the first
//! failing step. A renderer that did not reach [`InitStage::Ready`] stays
//! usable: `update` still advances its state, `render` does nothing.

mod config;
mod scene;

use winit::dpi::PhysicalSize;
use winit::window::Window;

use crate::camera::{Camera, CameraControls};
use crate::device::{
    DepthBuffer, Gpu, GpuInit, OutputFormats, RenderTarget, SurfaceErrorAction, SwapChain, Viewport,
};
use crate::mesh::{Mesh, MeshKind};
use crate::texture::FilteringMethod;

pub use config::{MeshAssets, RendererConfig, SceneAssets, VertexFormat};
pub use crate::device::RendererError;

use scene::Scene;

/// Initialization steps, in the order they complete.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub enum InitStage {
    Uninitialized,
    DeviceCreated,
    SwapChainCreated,
    DepthResourcesCreated,
    RenderTargetsCreated,
    PipelineBound,
    Ready,
}

/// Outcome of [`Renderer::render`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameStatus {
    Presented,
    /// Nothing was drawn: not initialized, or a transient surface error.
    Skipped,
    /// The surface was lost or outdated and has been reconfigured.
    Reconfigured,
    /// The surface cannot recover; the caller should shut down.
    Fatal,
}

impl From<SurfaceErrorAction> for FrameStatus {
    fn from(action: SurfaceErrorAction) -> Self {
        match action {
            SurfaceErrorAction::Reconfigured => FrameStatus::Reconfigured,
            SurfaceErrorAction::SkipFrame => FrameStatus::Skipped,
            SurfaceErrorAction::Fatal => FrameStatus::Fatal,
        }
    }
}

/// Mesh indices in draw order: every opaque mesh, then every transparent one.
pub fn draw_order(kinds: &[MeshKind]) -> Vec<usize> {
    let of_kind = |kind: MeshKind| {
        kinds
            .iter()
            .enumerate()
            .filter(move |(_, k)| **k == kind)
            .map(|(i, _)| i)
    };
    of_kind(MeshKind::Opaque)
        .chain(of_kind(MeshKind::Transparent))
        .collect()
}

enum Target<'w> {
    Window(&'w Window),
    Offscreen,
}

/// GPU objects owned once initialization succeeded.
///
/// Field order is teardown order: render target view, depth buffer, swap
/// chain, then the device.
#[derive(Debug)]
struct GpuState<'w> {
    render_target: RenderTarget,
    depth: DepthBuffer,
    swap_chain: SwapChain<'w>,
    gpu: Gpu,

    formats: OutputFormats,
    viewport: Viewport,
}

pub struct Renderer<'w> {
    // Dropped before `state` so no resource outlives its device.
    scene: Scene,
    state: Option<GpuState<'w>>,

    stage: InitStage,
    size: (u32, u32),
    camera: Camera,
    clear_color: wgpu::Color,
    filtering: FilteringMethod,
    rotating: bool,
    rotation_angle: f32,
    frames_presented: u64,
}

impl<'w> Renderer<'w> {
    /// Creates a renderer presenting to `window`.
    ///
    /// Never fails: on error the renderer is returned uninitialized and the
    /// failure is logged.
    pub fn new(window: &'w Window, config: RendererConfig) -> Self {
        let size = window.inner_size();
        Self::create(Target::Window(window), size.width, size.height, config)
    }

    fn create(target: Target<'w>, width: u32, height: u32, config: RendererConfig) -> Self {
        let aspect = width as f32 / height.max(1) as f32;

        let mut renderer = Self {
            scene: Scene::default(),
            state: None,
            stage: InitStage::Uninitialized,
            size: (width, height),
            camera: Camera::with_config(&config.camera, aspect),
            clear_color: config.clear_color,
            filtering: config.filtering,
            rotating: config.rotate,
            rotation_angle: 0.0,
            frames_presented: 0,
        };

        let mut stage = InitStage::Uninitialized;
        let result = pollster::block_on(initialize(target, width, height, &config.gpu, &mut stage));
        renderer.stage = stage;

        match result {
            Ok(state) => {
                renderer.stage = InitStage::Ready;
                log::info!("renderer initialized ({width}x{height}, {:?})", state.formats.color);
                renderer.scene = Scene::load(&state.gpu, state.formats, &config, &renderer.camera);
                renderer.state = Some(state);
            }
            Err(err) => {
                log::error!("renderer initialization failed after {stage:?}: {err}");
            }
        }

        renderer
    }

    pub fn is_initialized(&self) -> bool {
        self.stage == InitStage::Ready
    }

    /// Last initialization step that completed.
    pub fn stage(&self) -> InitStage {
        self.stage
    }

    /// Client size the renderer was created for.
    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    pub fn viewport(&self) -> Option<Viewport> {
        self.state.as_ref().map(|s| s.viewport)
    }

    pub fn depth_size(&self) -> Option<(u32, u32)> {
        self.state.as_ref().map(|s| s.depth.size())
    }

    pub fn output_formats(&self) -> Option<OutputFormats> {
        self.state.as_ref().map(|s| s.formats)
    }

    pub fn device(&self) -> Option<&wgpu::Device> {
        self.state.as_ref().map(|s| s.gpu.device())
    }

    pub fn queue(&self) -> Option<&wgpu::Queue> {
        self.state.as_ref().map(|s| s.gpu.queue())
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn meshes(&self) -> &[Mesh] {
        &self.scene.meshes
    }

    pub fn filtering_method(&self) -> FilteringMethod {
        self.filtering
    }

    pub fn is_rotating(&self) -> bool {
        self.rotating
    }

    /// Total rotation applied to the meshes, in radians.
    pub fn rotation_angle(&self) -> f32 {
        self.rotation_angle
    }

    pub fn frames_presented(&self) -> u64 {
        self.frames_presented
    }

    /// Advances the camera and, if enabled, spins every mesh at one radian per second.
    pub fn update(&mut self, dt: f32, controls: &CameraControls) {
        self.camera.update(dt, controls);

        if self.rotating {
            self.rotation_angle += dt;
            for mesh in &mut self.scene.meshes {
                mesh.rotate_y(dt);
            }
        }

        if let Some(state) = &self.state {
            for mesh in &mut self.scene.meshes {
                mesh.set_matrices(state.gpu.queue(), &self.camera);
            }
        }
    }

    /// Draws and presents one frame.
    pub fn render(&mut self) -> FrameStatus {
        let Some(state) = &self.state else {
            return FrameStatus::Skipped;
        };
        let device = state.gpu.device();

        let back_buffer = match state.swap_chain.acquire(&state.render_target) {
            Ok(back_buffer) => back_buffer,
            Err(err) => {
                log::warn!("failed to acquire back buffer: {err}");
                return state.swap_chain.handle_error(device, err).into();
            }
        };

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("prism frame encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("prism main pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: back_buffer.view(),
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(state.depth.attachment()),
                timestamp_writes: None,
                occlusion_query_set: None,
                multiview_mask: None,
            });

            state.viewport.apply(&mut pass);

            let kinds: Vec<MeshKind> = self.scene.meshes.iter().map(Mesh::kind).collect();
            for index in draw_order(&kinds) {
                self.scene.meshes[index].render(device, &mut pass);
            }
        }

        state.gpu.queue().submit(std::iter::once(encoder.finish()));
        back_buffer.present();

        self.frames_presented += 1;
        log::trace!("frame {} presented", self.frames_presented);
        FrameStatus::Presented
    }

    /// Point → Linear → Anisotropic → Point, rebinding the sampler on every textured mesh.
    pub fn toggle_filtering_method(&mut self) {
        self.filtering = self.filtering.next();
        log::info!("FILTER METHOD: {}", self.filtering);
        self.scene.bind_samplers(self.filtering);
    }

    pub fn toggle_rotation(&mut self) {
        self.rotating = !self.rotating;
        log::info!("ROTATION: {}", if self.rotating { "ON" } else { "OFF" });
    }
}

impl Renderer<'static> {
    /// Creates a renderer drawing into an offscreen `width`×`height` target.
    pub fn headless(width: u32, height: u32, config: RendererConfig) -> Self {
        Self::create(Target::Offscreen, width, height, config)
    }
}

impl Drop for Renderer<'_> {
    fn drop(&mut self) {
        if let Some(state) = &self.state {
            state.gpu.flush();
            log::debug!("renderer released after {} frame(s)", self.frames_presented);
        }
    }
}

/// Runs the initialization steps in order, recording each completed one in `stage`.
async fn initialize<'w>(
    target: Target<'w>,
    width: u32,
    height: u32,
    init: &GpuInit,
    stage: &mut InitStage,
) -> Result<GpuState<'w>, RendererError> {
    let instance = Gpu::create_instance();

    // The surface must exist before the adapter is chosen so the adapter can present to it.
    let surface = match target {
        Target::Window(window) => Some(
            instance
                .create_surface(window)
                .map_err(|err| RendererError::SwapChain(err.to_string()))?,
        ),
        Target::Offscreen => None,
    };

    let gpu = Gpu::request(instance, surface.as_ref(), init).await?;
    *stage = InitStage::DeviceCreated;

    let swap_chain = match surface {
        Some(surface) => SwapChain::for_window(
            surface,
            gpu.adapter(),
            gpu.device(),
            PhysicalSize::new(width, height),
            init,
        )?,
        None => SwapChain::offscreen(gpu.device(), width, height)?,
    };
    *stage = InitStage::SwapChainCreated;

    let depth = DepthBuffer::with_view(DepthBuffer::allocate(gpu.device(), width, height)?);
    *stage = InitStage::DepthResourcesCreated;

    let render_target = swap_chain.render_target()?;
    *stage = InitStage::RenderTargetsCreated;

    let viewport = Viewport::full(width, height);
    if !viewport.is_valid() {
        return Err(RendererError::Pipeline(format!("invalid viewport {viewport:?}")));
    }
    let formats = OutputFormats {
        color: swap_chain.format(),
        depth: depth.format(),
    };
    *stage = InitStage::PipelineBound;

    Ok(GpuState {
        render_target,
        depth,
        swap_chain,
        gpu,
        formats,
        viewport,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DEPTH_FORMAT;
    use crate::mesh::{Vertex, VertexPosTex, INDEX_STRIDE};
    use glam::Mat4;

    #[test]
    fn opaque_meshes_draw_first() {
        use MeshKind::{Opaque, Transparent};
        assert_eq!(draw_order(&[Transparent, Opaque, Transparent, Opaque]), vec![1, 3, 0, 2]);
        assert_eq!(draw_order(&[]), Vec::<usize>::new());
    }

    #[test]
    fn surface_errors_map_to_frame_status() {
        assert_eq!(FrameStatus::from(SurfaceErrorAction::Reconfigured), FrameStatus::Reconfigured);
        assert_eq!(FrameStatus::from(SurfaceErrorAction::SkipFrame), FrameStatus::Skipped);
        assert_eq!(FrameStatus::from(SurfaceErrorAction::Fatal), FrameStatus::Fatal);
    }

    #[test]
    fn init_stages_are_ordered() {
        assert!(InitStage::Uninitialized < InitStage::DeviceCreated);
        assert!(InitStage::RenderTargetsCreated < InitStage::PipelineBound);
        assert!(InitStage::PipelineBound < InitStage::Ready);
    }

    #[test]
    fn render_before_initialization_does_nothing() {
        // A zero-sized target fails before Ready whether or not an adapter exists.
        let mut renderer = Renderer::headless(0, 0, RendererConfig::default());
        assert!(!renderer.is_initialized());
        assert!(renderer.stage() < InitStage::SwapChainCreated);
        assert_eq!(renderer.render(), FrameStatus::Skipped);
        assert_eq!(renderer.frames_presented(), 0);
        assert!(renderer.meshes().is_empty());
    }

    #[test]
    fn update_accumulates_rotation() {
        let mut renderer = Renderer::headless(0, 0, RendererConfig::default());
        assert!(renderer.is_rotating());

        renderer.update(1.0, &CameraControls::default());
        assert_eq!(renderer.rotation_angle(), 1.0);

        renderer.toggle_rotation();
        renderer.update(1.0, &CameraControls::default());
        assert_eq!(renderer.rotation_angle(), 1.0);
    }

    #[test]
    fn filtering_toggles_without_a_device() {
        let mut renderer = Renderer::headless(0, 0, RendererConfig::default());
        renderer.toggle_filtering_method();
        assert_eq!(renderer.filtering_method(), FilteringMethod::Linear);
        renderer.toggle_filtering_method();
        renderer.toggle_filtering_method();
        assert_eq!(renderer.filtering_method(), FilteringMethod::Point);
    }

    #[test]
    fn headless_640x480_sizes_its_targets() {
        crate::logging::init_logging(Default::default());
        let mut renderer = Renderer::headless(640, 480, RendererConfig::default());
        if !renderer.is_initialized() {
            // No adapter on this machine; nothing past device creation can be checked.
            assert!(renderer.stage() < InitStage::Ready);
            return;
        }

        assert_eq!(renderer.size(), (640, 480));
        assert_eq!(renderer.depth_size(), Some((640, 480)));
        assert_eq!(renderer.output_formats().map(|f| f.depth), Some(DEPTH_FORMAT));
        assert_eq!(renderer.viewport(), Some(Viewport::full(640, 480)));

        let kinds: Vec<MeshKind> = renderer.meshes().iter().map(Mesh::kind).collect();
        assert_eq!(kinds, vec![MeshKind::Opaque, MeshKind::Transparent]);

        let config = RendererConfig::default();
        for (mesh, assets) in renderer.meshes().iter().zip([&config.assets.opaque, &config.assets.transparent]) {
            let geometry = assets.geometry.load_pos_tex().unwrap();
            assert_eq!(mesh.vertex_buffer_size(), geometry.vertices.len() as u64 * VertexPosTex::STRIDE);
            assert_eq!(mesh.index_buffer_size(), geometry.indices.len() as u64 * INDEX_STRIDE);
            assert!(mesh.consumes_sampler(), "{}", mesh.label());
        }

        let before: Vec<Mat4> = renderer.meshes().iter().map(Mesh::world).collect();
        renderer.update(0.25, &CameraControls::default());
        for (mesh, world) in renderer.meshes().iter().zip(before) {
            assert!(mesh.world().abs_diff_eq(Mat4::from_rotation_y(0.25) * world, 1e-6));
        }
        assert_eq!(renderer.render(), FrameStatus::Presented);
        assert_eq!(renderer.frames_presented(), 1);

        // Every filtering method, then back to the first.
        for _ in 0..3 {
            renderer.toggle_filtering_method();
            assert_eq!(renderer.render(), FrameStatus::Presented);
        }
        assert_eq!(renderer.filtering_method(), FilteringMethod::Point);
        assert_eq!(renderer.frames_presented(), 4);
    }
}
