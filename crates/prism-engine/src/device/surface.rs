use winit::dpi::PhysicalSize;

use super::{BackBuffer, GpuInit, RendererError, SurfaceErrorAction};

/// Format of the offscreen colour target.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Where frames are presented: a window surface or an offscreen texture.
#[derive(Debug)]
pub enum SwapChain<'w> {
    Window {
        /// Surface lifetime is tied to the window via `'w`.
        surface: wgpu::Surface<'w>,
        config: wgpu::SurfaceConfiguration,
    },
    Offscreen {
        texture: wgpu::Texture,
    },
}

/// Persistent render-target view.
///
/// Window surfaces hand out a fresh texture per frame, so only offscreen
/// swap chains keep a view here.
#[derive(Debug)]
pub struct RenderTarget {
    view: Option<wgpu::TextureView>,
}

impl<'w> SwapChain<'w> {
    /// Configures `surface` for presentation at `size`.
    pub fn for_window(
        surface: wgpu::Surface<'w>,
        adapter: &wgpu::Adapter,
        device: &wgpu::Device,
        size: PhysicalSize<u32>,
        init: &GpuInit,
    ) -> Result<Self, RendererError> {
        if size.width == 0 || size.height == 0 {
            return Err(RendererError::SwapChain("window has zero size".to_owned()));
        }

        let caps = surface.get_capabilities(adapter);
        let format = choose_surface_format(&caps, init.prefer_srgb)
            .ok_or_else(|| RendererError::SwapChain("no supported surface formats".to_owned()))?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: init.present_mode,
            alpha_mode: choose_alpha_mode(&caps, init.alpha_mode),
            view_formats: vec![],
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };

        surface.configure(device, &config);
        log::debug!("surface configured: {format:?} {}x{}", size.width, size.height);

        Ok(SwapChain::Window { surface, config })
    }

    pub fn offscreen(device: &wgpu::Device, width: u32, height: u32) -> Result<SwapChain<'static>, RendererError> {
        let max = device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(RendererError::SwapChain(format!(
                "offscreen size {width}x{height} outside 1..={max}"
            )));
        }

        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("prism offscreen target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        Ok(SwapChain::Offscreen { texture })
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        match self {
            SwapChain::Window { config, .. } => config.format,
            SwapChain::Offscreen { texture } => texture.format(),
        }
    }

    pub fn size(&self) -> (u32, u32) {
        match self {
            SwapChain::Window { config, .. } => (config.width, config.height),
            SwapChain::Offscreen { texture } => (texture.width(), texture.height()),
        }
    }

    pub fn render_target(&self) -> Result<RenderTarget, RendererError> {
        match self {
            SwapChain::Window { config, .. } => {
                if !config.usage.contains(wgpu::TextureUsages::RENDER_ATTACHMENT) {
                    return Err(RendererError::RenderTarget(
                        "surface textures are not render attachments".to_owned(),
                    ));
                }
                Ok(RenderTarget { view: None })
            }
            SwapChain::Offscreen { texture } => Ok(RenderTarget {
                view: Some(texture.create_view(&wgpu::TextureViewDescriptor {
                    label: Some("prism render target view"),
                    ..Default::default()
                })),
            }),
        }
    }

    /// Acquires the back buffer for the next frame.
    pub fn acquire(&self, target: &RenderTarget) -> Result<BackBuffer, wgpu::SurfaceError> {
        match (self, &target.view) {
            (_, Some(view)) => Ok(BackBuffer::offscreen(view.clone())),
            (SwapChain::Window { surface, .. }, None) => {
                Ok(BackBuffer::surface(surface.get_current_texture()?))
            }
            (SwapChain::Offscreen { .. }, None) => Err(wgpu::SurfaceError::Other),
        }
    }

    /// Converts a `SurfaceError` into a higher-level action.
    pub fn handle_error(&self, device: &wgpu::Device, err: wgpu::SurfaceError) -> SurfaceErrorAction {
        match self {
            SwapChain::Window { surface, config } => map_surface_error(surface, device, config, err),
            SwapChain::Offscreen { .. } => SurfaceErrorAction::SkipFrame,
        }
    }
}

pub(crate) fn choose_surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let preferred: &[wgpu::TextureFormat] = if prefer_srgb {
        &[wgpu::TextureFormat::Bgra8UnormSrgb, wgpu::TextureFormat::Rgba8UnormSrgb]
    } else {
        &[wgpu::TextureFormat::Bgra8Unorm, wgpu::TextureFormat::Rgba8Unorm]
    };

    preferred
        .iter()
        .copied()
        .find(|f| caps.formats.contains(f))
        .or_else(|| caps.formats.first().copied())
}

pub(crate) fn choose_alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|m| caps.alpha_modes.contains(m))
        .or_else(|| caps.alpha_modes.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

pub(crate) fn map_surface_error(
    surface: &wgpu::Surface,
    device: &wgpu::Device,
    config: &wgpu::SurfaceConfiguration,
    err: wgpu::SurfaceError,
) -> SurfaceErrorAction {
    match err {
        wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
            surface.configure(device, config);
            SurfaceErrorAction::Reconfigured
        }
        wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
        wgpu::SurfaceError::Timeout => SurfaceErrorAction::SkipFrame,
        wgpu::SurfaceError::Other => SurfaceErrorAction::SkipFrame,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps(formats: &[wgpu::TextureFormat]) -> wgpu::SurfaceCapabilities {
        wgpu::SurfaceCapabilities {
            formats: formats.to_vec(),
            ..Default::default()
        }
    }

    #[test]
    fn unorm_formats_are_preferred_by_default() {
        let caps = caps(&[wgpu::TextureFormat::Bgra8UnormSrgb, wgpu::TextureFormat::Bgra8Unorm]);
        assert_eq!(choose_surface_format(&caps, false), Some(wgpu::TextureFormat::Bgra8Unorm));
        assert_eq!(choose_surface_format(&caps, true), Some(wgpu::TextureFormat::Bgra8UnormSrgb));
    }

    #[test]
    fn falls_back_to_the_first_format() {
        let caps = caps(&[wgpu::TextureFormat::Rgb10a2Unorm]);
        assert_eq!(choose_surface_format(&caps, false), Some(wgpu::TextureFormat::Rgb10a2Unorm));
        assert_eq!(choose_surface_format(&super::tests::caps(&[]), false), None);
    }

    #[test]
    fn unsupported_alpha_mode_is_replaced() {
        let caps = wgpu::SurfaceCapabilities {
            alpha_modes: vec![wgpu::CompositeAlphaMode::Opaque],
            ..Default::default()
        };
        assert_eq!(
            choose_alpha_mode(&caps, Some(wgpu::CompositeAlphaMode::PreMultiplied)),
            wgpu::CompositeAlphaMode::Opaque
        );
    }
}
