use std::sync::Arc;

use crate::cache::DeviceCache;

use super::WgpuDevice;

/// Rendering context derived from an existing device.
///
/// Holds cloned `wgpu` device/queue handles rather than the owning
/// [`WgpuDevice`], so a cached root does not keep that wrapper alive.
#[derive(Debug)]
pub struct GpuRoot {
    device: wgpu::Device,
    queue: wgpu::Queue,
    label: String,
}

pub type RootCache = DeviceCache<WgpuDevice, GpuRoot>;

impl GpuRoot {
    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn command_encoder(&self, purpose: &str) -> wgpu::CommandEncoder {
        let label = format!("{} {purpose}", self.label);
        self.device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some(label.as_str()),
            })
    }

    pub fn submit(&self, encoder: wgpu::CommandEncoder) {
        self.queue.submit(std::iter::once(encoder.finish()));
    }
}

/// Builds an uncached root for a device the caller already owns.
pub fn init_root_from_device(device: &WgpuDevice) -> GpuRoot {
    GpuRoot {
        device: device.device().clone(),
        queue: device.queue().clone(),
        label: format!("{} root", device.profile().name),
    }
}

/// Returns the root cached for `device`, creating it once per device.
pub fn get_or_create_root(cache: &RootCache, device: &Arc<WgpuDevice>) -> Arc<GpuRoot> {
    cache.get_or_create_for_device(device, |device| init_root_from_device(device))
}
