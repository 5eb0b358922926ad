//! Surface helpers for consumers drawing with the shared device.

use winit::dpi::{LogicalSize, PhysicalSize};

use crate::backend::WgpuDevice;
use crate::error::PlatformError;

/// Fallback when a surface reports no formats at all.
pub const FALLBACK_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Bgra8Unorm;

#[derive(Debug, Clone)]
pub struct SurfaceOptions {
    /// Requested alpha mode; falls back to the first supported one.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,
    pub prefer_srgb: bool,
    pub present_mode: wgpu::PresentMode,
}

impl Default for SurfaceOptions {
    fn default() -> Self {
        Self {
            alpha_mode: Some(wgpu::CompositeAlphaMode::PreMultiplied),
            prefer_srgb: false,
            present_mode: wgpu::PresentMode::Fifo,
        }
    }
}

/// A surface configured against the shared device.
pub struct ConfiguredSurface<'w> {
    surface: wgpu::Surface<'w>,
    device: wgpu::Device,
    config: wgpu::SurfaceConfiguration,
}

pub fn preferred_format(formats: &[wgpu::TextureFormat], prefer_srgb: bool) -> wgpu::TextureFormat {
    formats
        .iter()
        .copied()
        .find(|format| format.is_srgb() == prefer_srgb)
        .or_else(|| formats.first().copied())
        .unwrap_or(FALLBACK_FORMAT)
}

pub fn choose_alpha_mode(
    supported: &[wgpu::CompositeAlphaMode],
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    requested
        .filter(|mode| supported.contains(mode))
        .or_else(|| supported.first().copied())
        .unwrap_or(wgpu::CompositeAlphaMode::Auto)
}

/// Physical pixel size for a logical size at `scale_factor`, rounded down.
pub fn display_size(logical: LogicalSize<f64>, scale_factor: f64) -> PhysicalSize<u32> {
    let scale = if scale_factor.is_finite() && scale_factor > 0.0 {
        scale_factor
    } else {
        1.0
    };
    PhysicalSize::new(
        (logical.width * scale).floor().max(0.0) as u32,
        (logical.height * scale).floor().max(0.0) as u32,
    )
}

/// Whether moving from `current` to `requested` needs a reconfigure.
/// Zero-area sizes never do.
pub fn needs_reconfigure(current: PhysicalSize<u32>, requested: PhysicalSize<u32>) -> bool {
    requested.width != 0 && requested.height != 0 && requested != current
}

/// Configures `surface` for the shared device.
pub fn configure_surface<'w>(
    surface: wgpu::Surface<'w>,
    device: &WgpuDevice,
    size: PhysicalSize<u32>,
    options: &SurfaceOptions,
) -> Result<ConfiguredSurface<'w>, PlatformError> {
    let caps = surface.get_capabilities(device.adapter());
    if caps.formats.is_empty() {
        return Err(PlatformError::Surface(format!(
            "surface is not compatible with adapter {}",
            device.profile()
        )));
    }

    let format = preferred_format(&caps.formats, options.prefer_srgb);
    let alpha_mode = choose_alpha_mode(&caps.alpha_modes, options.alpha_mode);
    let present_mode = if caps.present_modes.contains(&options.present_mode) {
        options.present_mode
    } else {
        tracing::warn!(
            requested = ?options.present_mode,
            "present mode unsupported by surface; using FIFO"
        );
        wgpu::PresentMode::Fifo
    };

    let config = wgpu::SurfaceConfiguration {
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        format,
        width: size.width.max(1),
        height: size.height.max(1),
        present_mode,
        alpha_mode,
        view_formats: vec![],
        desired_maximum_frame_latency: 2,
    };
    surface.configure(device.device(), &config);
    tracing::debug!(?format, ?alpha_mode, width = config.width, height = config.height, "configured surface");

    Ok(ConfiguredSurface {
        surface,
        device: device.device().clone(),
        config,
    })
}

impl<'w> ConfiguredSurface<'w> {
    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        PhysicalSize::new(self.config.width, self.config.height)
    }

    /// Reconfigures when `new_size` differs from the current size.
    ///
    /// Zero-sized requests are ignored since wgpu rejects them, so a
    /// minimised or collapsed window keeps its last configuration instead of
    /// shrinking the surface to nothing.
    pub fn resize(&mut self, new_size: PhysicalSize<u32>) -> bool {
        if !needs_reconfigure(self.size(), new_size) {
            return false;
        }
        self.config.width = new_size.width;
        self.config.height = new_size.height;
        self.surface.configure(&self.device, &self.config);
        true
    }

    pub fn resize_to_display_size(&mut self, logical: LogicalSize<f64>, scale_factor: f64) -> bool {
        self.resize(display_size(logical, scale_factor))
    }

    pub fn current_texture(&self) -> Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        self.surface.get_current_texture()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preferred_format_honours_srgb_preference() {
        let formats = [
            wgpu::TextureFormat::Bgra8UnormSrgb,
            wgpu::TextureFormat::Bgra8Unorm,
        ];
        assert_eq!(preferred_format(&formats, false), wgpu::TextureFormat::Bgra8Unorm);
        assert_eq!(preferred_format(&formats, true), wgpu::TextureFormat::Bgra8UnormSrgb);
    }

    #[test]
    fn preferred_format_falls_back() {
        assert_eq!(preferred_format(&[], false), FALLBACK_FORMAT);
        let only_srgb = [wgpu::TextureFormat::Rgba8UnormSrgb];
        assert_eq!(preferred_format(&only_srgb, false), wgpu::TextureFormat::Rgba8UnormSrgb);
    }

    #[test]
    fn alpha_mode_falls_back_to_supported() {
        let supported = [wgpu::CompositeAlphaMode::Opaque];
        assert_eq!(
            choose_alpha_mode(&supported, Some(wgpu::CompositeAlphaMode::PreMultiplied)),
            wgpu::CompositeAlphaMode::Opaque
        );
        assert_eq!(choose_alpha_mode(&[], None), wgpu::CompositeAlphaMode::Auto);
    }

    #[test]
    fn zero_sizes_never_reconfigure() {
        let current = PhysicalSize::new(800, 600);
        assert!(!needs_reconfigure(current, PhysicalSize::new(0, 600)));
        assert!(!needs_reconfigure(current, PhysicalSize::new(800, 0)));
        assert!(!needs_reconfigure(current, display_size(LogicalSize::new(0.4, 0.4), 2.0)));
        assert!(!needs_reconfigure(current, current));
        assert!(needs_reconfigure(current, PhysicalSize::new(1024, 768)));
    }

    #[test]
    fn display_size_floors_scaled_dimensions() {
        let size = display_size(LogicalSize::new(640.5, 360.0), 1.5);
        assert_eq!(size, PhysicalSize::new(960, 540));
        let fallback = display_size(LogicalSize::new(100.0, 50.0), f64::NAN);
        assert_eq!(fallback, PhysicalSize::new(100, 50));
    }
}
