use gpulease::backend::LimitsPreset;
use gpulease::surface::SurfaceOptions;
use gpulease::wgpu;
use gpulease::{TeardownPolicy, WgpuOptions};
use leaseconfig::{
    AlphaSetting, BackendSetting, DeviceSection, LimitsSetting, MemorySetting, PowerSetting,
    SurfaceSection, TeardownMode, TeardownSection,
};

pub fn wgpu_options(device: &DeviceSection) -> WgpuOptions {
    WgpuOptions {
        backends: map_backends(&device.backends),
        power_preference: map_power(device.power),
        force_fallback_adapter: device.fallback_adapter,
        label: device.label.clone(),
        limits: map_limits(device.limits),
        required_features: wgpu::Features::empty(),
        memory_hints: map_memory(device.memory),
    }
}

pub fn teardown_policy(teardown: &TeardownSection) -> TeardownPolicy {
    match teardown.mode {
        TeardownMode::Immediate => TeardownPolicy::Immediate,
        TeardownMode::Deferred => TeardownPolicy::Deferred {
            grace: teardown.resolved_grace(),
        },
    }
}

pub fn surface_options(surface: &SurfaceSection) -> SurfaceOptions {
    SurfaceOptions {
        alpha_mode: map_alpha(surface.alpha),
        prefer_srgb: surface.prefer_srgb,
        ..SurfaceOptions::default()
    }
}

pub fn map_backends(backends: &[BackendSetting]) -> wgpu::Backends {
    backends
        .iter()
        .fold(wgpu::Backends::empty(), |acc, backend| {
            acc | match backend {
                BackendSetting::Primary => wgpu::Backends::PRIMARY,
                BackendSetting::All => wgpu::Backends::all(),
                BackendSetting::Vulkan => wgpu::Backends::VULKAN,
                BackendSetting::Metal => wgpu::Backends::METAL,
                BackendSetting::Dx12 => wgpu::Backends::DX12,
                BackendSetting::Gl => wgpu::Backends::GL,
                BackendSetting::Webgpu => wgpu::Backends::BROWSER_WEBGPU,
            }
        })
}

fn map_power(power: PowerSetting) -> wgpu::PowerPreference {
    match power {
        PowerSetting::High => wgpu::PowerPreference::HighPerformance,
        PowerSetting::Low => wgpu::PowerPreference::LowPower,
        PowerSetting::None => wgpu::PowerPreference::None,
    }
}

fn map_limits(limits: LimitsSetting) -> LimitsPreset {
    match limits {
        LimitsSetting::Default => LimitsPreset::Default,
        LimitsSetting::Downlevel => LimitsPreset::Downlevel,
        LimitsSetting::Webgl2 => LimitsPreset::WebGl2,
        LimitsSetting::Adapter => LimitsPreset::Adapter,
    }
}

fn map_memory(memory: MemorySetting) -> wgpu::MemoryHints {
    match memory {
        MemorySetting::Performance => wgpu::MemoryHints::Performance,
        MemorySetting::Balanced => wgpu::MemoryHints::MemoryUsage,
    }
}

/// `Auto` leaves the choice to the surface's first supported mode.
fn map_alpha(alpha: AlphaSetting) -> Option<wgpu::CompositeAlphaMode> {
    match alpha {
        AlphaSetting::Auto => None,
        AlphaSetting::Opaque => Some(wgpu::CompositeAlphaMode::Opaque),
        AlphaSetting::Premultiplied => Some(wgpu::CompositeAlphaMode::PreMultiplied),
        AlphaSetting::Postmultiplied => Some(wgpu::CompositeAlphaMode::PostMultiplied),
        AlphaSetting::Inherit => Some(wgpu::CompositeAlphaMode::Inherit),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use leaseconfig::LeaseConfig;

    #[test]
    fn backends_are_combined() {
        let backends = map_backends(&[BackendSetting::Vulkan, BackendSetting::Gl]);
        assert_eq!(backends, wgpu::Backends::VULKAN | wgpu::Backends::GL);
        assert!(map_backends(&[]).is_empty());
    }

    #[test]
    fn default_config_matches_default_options() {
        let config = LeaseConfig::default();
        let options = wgpu_options(&config.device);
        let defaults = WgpuOptions::default();
        assert_eq!(options.backends, defaults.backends);
        assert_eq!(options.power_preference, defaults.power_preference);
        assert_eq!(options.label, defaults.label);
        assert_eq!(options.limits, defaults.limits);
        assert_eq!(teardown_policy(&config.teardown), TeardownPolicy::Immediate);
    }

    #[test]
    fn deferred_mode_uses_configured_grace() {
        let config = LeaseConfig::from_toml_str(
            r#"
version = 1

[teardown]
mode = "deferred"
grace = "300ms"
"#,
        )
        .unwrap();
        assert_eq!(
            teardown_policy(&config.teardown),
            TeardownPolicy::Deferred {
                grace: Duration::from_millis(300)
            }
        );
    }

    #[test]
    fn auto_alpha_defers_to_surface() {
        let surface = SurfaceSection {
            alpha: AlphaSetting::Auto,
            prefer_srgb: true,
        };
        let options = surface_options(&surface);
        assert_eq!(options.alpha_mode, None);
        assert!(options.prefer_srgb);
        assert_eq!(
            surface_options(&SurfaceSection::default()).alpha_mode,
            Some(wgpu::CompositeAlphaMode::PreMultiplied)
        );
    }
}
