use thiserror::Error;

/// Failure of one renderer initialization step.
///
/// Each variant names the step that failed; steps run in declaration order.
#[derive(Debug, Error)]
pub enum RendererError {
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[source] wgpu::RequestAdapterError),

    #[error("failed to create the device: {0}")]
    Device(#[source] wgpu::RequestDeviceError),

    #[error("failed to create the swap chain: {0}")]
    SwapChain(String),

    #[error("failed to create the depth buffer: {0}")]
    DepthBuffer(String),

    #[error("failed to create the render target: {0}")]
    RenderTarget(String),

    #[error("failed to bind the output pipeline state: {0}")]
    Pipeline(String),
}

/// High-level response after a surface error.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// Surface was reconfigured; rendering may resume next frame.
    Reconfigured,
    /// Transient error; skip the current frame.
    SkipFrame,
    /// Fatal error (commonly OOM); terminate gracefully.
    Fatal,
}
