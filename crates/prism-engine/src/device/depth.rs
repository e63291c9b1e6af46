use super::RendererError;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Descriptor of the depth texture matching a `width`×`height` colour target.
pub fn depth_texture_descriptor(width: u32, height: u32) -> wgpu::TextureDescriptor<'static> {
    wgpu::TextureDescriptor {
        label: Some("prism depth buffer"),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    }
}

/// Clear operations for a depth attachment: depth to 1.0, stencil to 0 when present.
pub fn depth_clear_ops(
    format: wgpu::TextureFormat,
) -> (wgpu::Operations<f32>, Option<wgpu::Operations<u32>>) {
    let depth = wgpu::Operations {
        load: wgpu::LoadOp::Clear(1.0),
        store: wgpu::StoreOp::Store,
    };
    let stencil = format.has_stencil_aspect().then_some(wgpu::Operations {
        load: wgpu::LoadOp::Clear(0),
        store: wgpu::StoreOp::Store,
    });
    (depth, stencil)
}

/// Depth texture and the view used as the pass's depth attachment.
#[derive(Debug)]
pub struct DepthBuffer {
    view: wgpu::TextureView,
    texture: wgpu::Texture,
}

impl DepthBuffer {
    /// Allocates the depth texture; the view is created separately.
    pub fn allocate(device: &wgpu::Device, width: u32, height: u32) -> Result<wgpu::Texture, RendererError> {
        let max = device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(RendererError::DepthBuffer(format!(
                "{width}x{height} outside 1..={max}"
            )));
        }
        Ok(device.create_texture(&depth_texture_descriptor(width, height)))
    }

    pub fn with_view(texture: wgpu::Texture) -> Self {
        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("prism depth view"),
            ..Default::default()
        });
        Self { view, texture }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        self.texture.format()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.texture.width(), self.texture.height())
    }

    pub fn attachment(&self) -> wgpu::RenderPassDepthStencilAttachment<'_> {
        let (depth_ops, stencil_ops) = depth_clear_ops(self.format());
        wgpu::RenderPassDepthStencilAttachment {
            view: &self.view,
            depth_ops: Some(depth_ops),
            stencil_ops,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_descriptor_matches_the_target() {
        let desc = depth_texture_descriptor(640, 480);
        assert_eq!(desc.size.width, 640);
        assert_eq!(desc.size.height, 480);
        assert_eq!(desc.size.depth_or_array_layers, 1);
        assert_eq!(desc.mip_level_count, 1);
        assert_eq!(desc.sample_count, 1);
        assert_eq!(desc.format, wgpu::TextureFormat::Depth32Float);
        assert!(desc.usage.contains(wgpu::TextureUsages::RENDER_ATTACHMENT));
    }

    #[test]
    fn stencil_is_cleared_only_when_present() {
        let (depth, stencil) = depth_clear_ops(DEPTH_FORMAT);
        assert_eq!(depth.load, wgpu::LoadOp::Clear(1.0));
        assert!(stencil.is_none());

        let (_, stencil) = depth_clear_ops(wgpu::TextureFormat::Depth24PlusStencil8);
        assert_eq!(stencil.map(|ops| ops.load), Some(wgpu::LoadOp::Clear(0)));
    }
}
