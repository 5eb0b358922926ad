use crate::support::UnsupportedReason;

/// Failures reported by a [`GpuPlatform`](crate::GpuPlatform) implementation.
///
/// None of these escape [`LifecycleManager`](crate::LifecycleManager): the
/// manager logs them and hands consumers `None` instead.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("GPU access is unsupported: {0}")]
    Unsupported(UnsupportedReason),
    #[error("failed to find a suitable GPU adapter: {0}")]
    Adapter(String),
    #[error("failed to create GPU device: {0}")]
    Device(String),
    #[error("failed to release GPU device: {0}")]
    Teardown(String),
    #[error("failed to configure rendering surface: {0}")]
    Surface(String),
}
