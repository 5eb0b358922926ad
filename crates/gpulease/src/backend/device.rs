use std::fmt;

/// Summary of the adapter a device was created on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub driver: String,
    pub driver_info: String,
    pub max_texture_dimension_2d: u32,
}

impl AdapterProfile {
    pub fn from_wgpu(info: &wgpu::AdapterInfo, limits: &wgpu::Limits) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            driver: info.driver.clone(),
            driver_info: info.driver_info.clone(),
            max_texture_dimension_2d: limits.max_texture_dimension_2d,
        }
    }

    /// CPU rasterizers (llvmpipe, lavapipe, SwiftShader, WARP).
    pub fn is_software(&self) -> bool {
        if self.device_type == wgpu::DeviceType::Cpu {
            return true;
        }
        let name = self.name.to_ascii_lowercase();
        ["llvmpipe", "lavapipe", "swiftshader", "softpipe", "microsoft basic render"]
            .iter()
            .any(|marker| name.contains(marker))
    }
}

impl fmt::Display for AdapterProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?}, {:?})", self.name, self.backend, self.device_type)
    }
}

/// Device created by [`WgpuPlatform`](super::WgpuPlatform).
pub struct WgpuDevice {
    pub(crate) adapter: wgpu::Adapter,
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    pub(crate) profile: AdapterProfile,
}

impl WgpuDevice {
    pub fn adapter(&self) -> &wgpu::Adapter {
        &self.adapter
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn profile(&self) -> &AdapterProfile {
        &self.profile
    }
}

impl fmt::Debug for WgpuDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WgpuDevice")
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, device_type: wgpu::DeviceType) -> AdapterProfile {
        AdapterProfile {
            name: name.to_string(),
            backend: wgpu::Backend::Vulkan,
            device_type,
            driver: String::new(),
            driver_info: String::new(),
            max_texture_dimension_2d: 8192,
        }
    }

    #[test]
    fn detects_software_rasterizers() {
        assert!(profile("anything", wgpu::DeviceType::Cpu).is_software());
        assert!(profile("llvmpipe (LLVM 17.0.6, 256 bits)", wgpu::DeviceType::Other).is_software());
        assert!(!profile("AMD Radeon RX 7800 XT", wgpu::DeviceType::DiscreteGpu).is_software());
    }
}
