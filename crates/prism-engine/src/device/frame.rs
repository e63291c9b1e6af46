/// The colour target of a single frame.
///
/// Short-lived: holding a window back buffer prevents acquisition of the next
/// one. Call [`BackBuffer::present`] after submitting the frame's commands.
pub struct BackBuffer {
    view: wgpu::TextureView,
    surface_texture: Option<wgpu::SurfaceTexture>,
}

impl BackBuffer {
    pub(crate) fn surface(surface_texture: wgpu::SurfaceTexture) -> Self {
        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            view,
            surface_texture: Some(surface_texture),
        }
    }

    pub(crate) fn offscreen(view: wgpu::TextureView) -> Self {
        Self {
            view,
            surface_texture: None,
        }
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Queues the frame for display. No-op for offscreen targets.
    pub fn present(self) {
        if let Some(texture) = self.surface_texture {
            texture.present();
        }
    }
}
