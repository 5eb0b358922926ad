//! Shared GPU device leases.
//!
//! Several independent consumers (canvas renderers, previews, compute passes)
//! want the same expensive device. `gpulease` hands each of them a lease on
//! one shared device, creates that device at most once per lifecycle even
//! when acquisitions race, and tears it down when the last lease goes away:
//!
//! ```text
//!   consumer ─┐
//!   consumer ─┼─▶ LifecycleManager ──▶ GpuPlatform (wgpu, or any other API)
//!   consumer ─┘        │
//!                      └─ GpuLease ── Drop ──▶ share count ──▶ teardown
//! ```
//!
//! The manager is an ordinary value: build one at the composition root and
//! clone it into each consumer. [`DeviceCache`] is the separate path for
//! callers that already hold a device and only need a derived context per
//! device.

mod cache;
mod error;
mod handle;
mod lifecycle;
mod platform;
mod support;

#[cfg(feature = "wgpu-backend")]
pub mod backend;
#[cfg(feature = "wgpu-backend")]
pub mod surface;

pub use cache::DeviceCache;
pub use error::PlatformError;
pub use handle::{GpuHandle, HandleId};
pub use lifecycle::{GpuLease, LifecycleManager, LifecycleStats, LifecycleStatus, TeardownPolicy};
pub use platform::{GpuPlatform, LossSignal};
pub use support::{Support, UnsupportedReason};

#[cfg(feature = "wgpu-backend")]
pub use backend::{WgpuDevice, WgpuOptions, WgpuPlatform};
#[cfg(feature = "wgpu-backend")]
pub use wgpu;

/// Lease manager backed by `wgpu`.
#[cfg(feature = "wgpu-backend")]
pub type WgpuLeases = LifecycleManager<WgpuPlatform>;
