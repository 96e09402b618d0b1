use std::sync::Arc;

/// Headless GPU device used by one compositor.
///
/// No surface is involved; rendering targets an offscreen texture that is
/// copied back to host memory after each draw.
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub adapter_name: String,
    /// Largest width or height a 2D texture may have on this device.
    pub max_texture_dimension: u32,
}

impl GpuContext {
    /// Create a new GPU context. Returns `None` if no suitable adapter is available.
    pub fn new() -> Option<Self> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))?;

        // Texture size limits follow the adapter so outputs above 2048 px fit.
        let required_limits = wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits());
        let max_texture_dimension = required_limits.max_texture_dimension_2d;

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("transition-device"),
                required_features: wgpu::Features::empty(),
                required_limits,
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .ok()?;

        device.on_uncaptured_error(Box::new(|e| {
            log::error!("Uncaptured GPU error: {e}");
        }));

        Some(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            adapter_name: adapter.get_info().name,
            max_texture_dimension,
        })
    }

    /// Runs `f` inside a validation error scope and returns the first
    /// validation error raised while it ran.
    pub fn capture_validation<T>(&self, f: impl FnOnce() -> T) -> (T, Option<wgpu::Error>) {
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f();
        let error = pollster::block_on(self.device.pop_error_scope());
        (value, error)
    }
}
