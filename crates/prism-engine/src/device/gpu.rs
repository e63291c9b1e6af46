use super::{GpuInit, RendererError};

/// Device-level wgpu objects.
///
/// Field order is drop order: the queue and device go before the adapter and
/// instance they came from.
#[derive(Debug)]
pub struct Gpu {
    /// Command queue (the immediate context).
    queue: wgpu::Queue,

    /// Logical device.
    device: wgpu::Device,

    /// Selected adapter.
    adapter: wgpu::Adapter,

    /// wgpu instance used to create the adapter and surface.
    instance: wgpu::Instance,
}

impl Gpu {
    /// Creates an instance with validation enabled in debug builds.
    pub fn create_instance() -> wgpu::Instance {
        wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::from_build_config(),
            ..Default::default()
        })
    }

    /// Selects an adapter and opens a device on it.
    ///
    /// `compatible_surface` must be created from `instance` when present.
    pub async fn request(
        instance: wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
        init: &GpuInit,
    ) -> Result<Self, RendererError> {
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface,
                force_fallback_adapter: init.force_fallback_adapter,
            })
            .await
            .map_err(RendererError::Adapter)?;

        let info = adapter.get_info();
        log::info!("adapter: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("prism device"),
                required_features: init.required_features,
                required_limits: init.required_limits.clone(),
                experimental_features: wgpu::ExperimentalFeatures::disabled(),
                memory_hints: wgpu::MemoryHints::Performance,
                trace: wgpu::Trace::Off,
            })
            .await
            .map_err(RendererError::Device)?;

        Ok(Self {
            queue,
            device,
            adapter,
            instance,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    /// Submits pending queue writes and lets the device retire finished work.
    pub fn flush(&self) {
        self.queue.submit(std::iter::empty::<wgpu::CommandBuffer>());
        if let Err(err) = self.device.poll(wgpu::PollType::Poll) {
            log::warn!("device poll failed during flush: {err}");
        }
    }
}
