/// Device limits requested when the shared device is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimitsPreset {
    /// `wgpu::Limits::default()`, the WebGPU baseline.
    #[default]
    Default,
    /// Limits most GL ES 3 / older hardware can satisfy.
    Downlevel,
    /// The strictest preset, matching WebGL2.
    WebGl2,
    /// Whatever the selected adapter supports.
    Adapter,
}

impl LimitsPreset {
    pub(crate) fn resolve(self, adapter: &wgpu::Adapter) -> wgpu::Limits {
        match self {
            LimitsPreset::Default => wgpu::Limits::default(),
            LimitsPreset::Downlevel => wgpu::Limits::downlevel_defaults(),
            LimitsPreset::WebGl2 => wgpu::Limits::downlevel_webgl2_defaults(),
            LimitsPreset::Adapter => adapter.limits(),
        }
    }
}

/// Instance and device parameters for [`WgpuPlatform`](super::WgpuPlatform).
#[derive(Debug, Clone)]
pub struct WgpuOptions {
    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,
    pub force_fallback_adapter: bool,
    /// Debug label attached to the device.
    pub label: String,
    pub limits: LimitsPreset,
    pub required_features: wgpu::Features,
    pub memory_hints: wgpu::MemoryHints,
}

impl WgpuOptions {
    pub(crate) fn adapter_request(&self) -> wgpu::RequestAdapterOptions<'static, 'static> {
        wgpu::RequestAdapterOptions {
            power_preference: self.power_preference,
            compatible_surface: None,
            force_fallback_adapter: self.force_fallback_adapter,
        }
    }
}

impl Default for WgpuOptions {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::PRIMARY,
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback_adapter: false,
            label: "gpulease shared device".to_string(),
            limits: LimitsPreset::default(),
            required_features: wgpu::Features::empty(),
            memory_hints: wgpu::MemoryHints::Performance,
        }
    }
}
