//! `wgpu` implementation of [`GpuPlatform`].
//!
//! Support is decided once, when the platform is probed: an empty backend set
//! means no graphics API is available at all, and a failed adapter request
//! means the host cannot reach a GPU (containers, CI, SSH sessions without a
//! render node). Device creation repeats the adapter request so a device lost
//! to a driver reset can land on a fresh adapter.

mod device;
mod options;
mod root;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::error::PlatformError;
use crate::platform::{GpuPlatform, LossSignal};
use crate::support::{Support, UnsupportedReason};

pub use device::{AdapterProfile, WgpuDevice};
pub use options::{LimitsPreset, WgpuOptions};
pub use root::{get_or_create_root, init_root_from_device, GpuRoot, RootCache};

pub struct WgpuPlatform {
    instance: wgpu::Instance,
    options: WgpuOptions,
    support: Support,
}

impl WgpuPlatform {
    /// Creates the instance and checks for a usable adapter.
    ///
    /// Blocks on the adapter request; call it once at start-up.
    pub fn probe(options: WgpuOptions) -> Self {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: options.backends,
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let support = if options.backends.is_empty() {
            Support::Unsupported(UnsupportedReason::NoGraphicsApi)
        } else {
            match pollster::block_on(instance.request_adapter(&options.adapter_request())) {
                Ok(adapter) => {
                    let info = adapter.get_info();
                    tracing::debug!(
                        name = %info.name,
                        backend = ?info.backend,
                        device_type = ?info.device_type,
                        "GPU adapter available"
                    );
                    Support::Available
                }
                Err(err) => {
                    tracing::warn!(error = %err, backends = ?options.backends, "no GPU adapter available");
                    Support::Unsupported(UnsupportedReason::HostEnvironment)
                }
            }
        };

        Self {
            instance,
            options,
            support,
        }
    }

    pub fn instance(&self) -> &wgpu::Instance {
        &self.instance
    }

    pub fn options(&self) -> &WgpuOptions {
        &self.options
    }
}

impl GpuPlatform for WgpuPlatform {
    type Device = WgpuDevice;

    fn support(&self) -> Support {
        self.support
    }

    fn create_device(&self) -> BoxFuture<'static, Result<WgpuDevice, PlatformError>> {
        let instance = self.instance.clone();
        let options = self.options.clone();

        async move {
            let adapter = instance
                .request_adapter(&options.adapter_request())
                .await
                .map_err(|err| PlatformError::Adapter(err.to_string()))?;

            let limits = options.limits.resolve(&adapter);
            let profile = AdapterProfile::from_wgpu(&adapter.get_info(), &limits);
            tracing::debug!(
                name = %profile.name,
                backend = ?profile.backend,
                device_type = ?profile.device_type,
                software = profile.is_software(),
                "selected GPU adapter"
            );

            let (device, queue) = adapter
                .request_device(&wgpu::DeviceDescriptor {
                    label: Some(options.label.as_str()),
                    required_features: options.required_features,
                    required_limits: limits,
                    memory_hints: options.memory_hints.clone(),
                    trace: wgpu::Trace::default(),
                })
                .await
                .map_err(|err| PlatformError::Device(err.to_string()))?;

            Ok(WgpuDevice {
                adapter,
                device,
                queue,
                profile,
            })
        }
        .boxed()
    }

    fn watch_device_lost(&self, device: &WgpuDevice, signal: LossSignal) {
        device
            .device
            .set_device_lost_callback(move |reason, message| {
                // `destroy` reports itself through the same callback.
                if matches!(reason, wgpu::DeviceLostReason::Destroyed) {
                    tracing::debug!(handle = %signal.handle(), "GPU device destroyed");
                    return;
                }
                signal.notify(&format!("{reason:?}: {message}"));
            });
    }

    fn release_device(&self, device: &WgpuDevice) -> Result<(), PlatformError> {
        device.device.destroy();
        Ok(())
    }
}
