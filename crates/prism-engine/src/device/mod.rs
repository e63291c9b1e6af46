//! GPU device, swap chain and output targets.
//!
//! This module is responsible for:
//! - creating the wgpu Instance/Adapter/Device/Queue
//! - creating the swap chain (window surface or offscreen texture)
//! - the depth buffer and viewport matching the swap chain

mod depth;
mod error;
mod frame;
mod gpu;
mod init;
mod surface;
mod viewport;

pub use depth::{depth_clear_ops, depth_texture_descriptor, DepthBuffer, DEPTH_FORMAT};
pub use error::{RendererError, SurfaceErrorAction};
pub use frame::BackBuffer;
pub use gpu::Gpu;
pub use init::GpuInit;
pub use surface::{RenderTarget, SwapChain, OFFSCREEN_FORMAT};
pub use viewport::Viewport;

/// Attachment formats every pipeline is built against.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct OutputFormats {
    pub color: wgpu::TextureFormat,
    pub depth: wgpu::TextureFormat,
}
