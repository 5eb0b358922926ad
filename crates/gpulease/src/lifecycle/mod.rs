//! Shared device lifecycle.
//!
//! One [`LifecycleManager`] owns at most one device at a time and hands it to
//! any number of consumers:
//!
//! ```text
//!   acquire ──▶ live handle? ──yes──▶ share_count += 1 ──▶ GpuLease
//!                  │ no
//!                  ▼
//!          pending init? ──yes──▶ await the same future ─┐
//!                  │ no                                   │
//!                  ▼                                      ▼
//!          create_device (single flight) ──▶ store ──▶ share_count += 1
//!
//!   GpuLease::drop ──▶ share_count -= 1 ──▶ zero? ──▶ teardown (now or after grace)
//! ```
//!
//! Device loss only marks the handle; the next `acquire` tears it down and
//! starts over. Nothing in here returns an error to consumers: an unsupported
//! platform, a failed initialization or a destroyed device all surface as
//! `None`.

mod lease;
mod state;


use std::fmt;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;

use crate::error::PlatformError;
use crate::handle::{GpuHandle, HandleId};
use crate::platform::GpuPlatform;
use crate::support::Support;

pub use lease::GpuLease;
pub use state::{LifecycleStats, LifecycleStatus};

use state::{LifecycleState, PendingInit};

/// When to tear the device down once the last lease is released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TeardownPolicy {
    #[default]
    Immediate,
    /// Keep the device for `grace` so a consumer that is rebuilt right away
    /// (surface recreation, reload) picks up the same instance.
    Deferred { grace: Duration },
}

impl TeardownPolicy {
    /// Grace period used by interactive development hosts.
    pub const DEVELOPMENT_GRACE: Duration = Duration::from_millis(100);

    pub fn development() -> Self {
        TeardownPolicy::Deferred {
            grace: Self::DEVELOPMENT_GRACE,
        }
    }
}

/// Reference-counted owner of the shared device.
///
/// Cloning is cheap and every clone manages the same device, so the manager
/// can be handed to each consumer instead of living in a global.
///
/// Dropping the last clone releases the device, including one kept alive by
/// a pending deferred teardown. Leases still held at that point become inert.
pub struct LifecycleManager<P: GpuPlatform> {
    inner: Arc<Inner<P>>,
}

pub(crate) struct Inner<P: GpuPlatform> {
    platform: Arc<P>,
    policy: TeardownPolicy,
    state: Mutex<LifecycleState<P::Device>>,
}

enum Acquisition<D> {
    Ready(Arc<GpuHandle<D>>),
    Pending(PendingInit<D>),
}

impl<P: GpuPlatform> LifecycleManager<P> {
    pub fn new(platform: P) -> Self {
        Self::with_policy(platform, TeardownPolicy::default())
    }

    pub fn with_policy(platform: P, policy: TeardownPolicy) -> Self {
        Self {
            inner: Arc::new(Inner {
                platform: Arc::new(platform),
                policy,
                state: Mutex::new(LifecycleState::new()),
            }),
        }
    }

    pub fn platform(&self) -> &P {
        &self.inner.platform
    }

    pub fn policy(&self) -> TeardownPolicy {
        self.inner.policy
    }

    pub fn is_supported(&self) -> bool {
        self.inner.platform.support().is_supported()
    }

    pub fn unsupported_reason(&self) -> String {
        self.inner.platform.support().reason()
    }

    /// Returns a lease on the shared device, creating it on first use.
    ///
    /// Concurrent callers that arrive while a creation is pending all wait on
    /// that same creation. Returns `None` when the platform is unsupported or
    /// the device could not be created; a later call retries from scratch.
    pub async fn acquire(&self) -> Option<GpuLease<P>> {
        if let Support::Unsupported(reason) = self.inner.platform.support() {
            tracing::debug!(%reason, "GPU unsupported; skipping acquisition");
            return None;
        }

        loop {
            let pending = match self.inner.begin_acquire() {
                Acquisition::Ready(handle) => return Some(self.lease(handle)),
                Acquisition::Pending(pending) => pending,
            };

            let handle = pending.await?;
            if self.inner.join_initialized(&handle) {
                return Some(self.lease(handle));
            }
            tracing::debug!(handle = %handle.id(), "device replaced before join; retrying");
        }
    }

    /// Gives back a lease. Equivalent to dropping it.
    pub fn release(&self, lease: GpuLease<P>) {
        lease.release();
    }

    /// Tears the device down regardless of outstanding leases.
    ///
    /// Idempotent. Errors from the platform release call are discarded.
    /// Leases still held become inert, and a creation still in flight is
    /// released as soon as it completes.
    pub fn destroy(&self) {
        let handle = self.inner.state.lock().take_for_teardown();
        if let Some(handle) = handle {
            self.inner.release_device(&handle);
        }
    }

    pub fn status(&self) -> LifecycleStatus {
        self.inner.state.lock().status()
    }

    pub fn share_count(&self) -> usize {
        self.inner.state.lock().share_count
    }

    pub fn current_handle(&self) -> Option<HandleId> {
        self.inner.state.lock().handle.as_ref().map(|handle| handle.id())
    }

    pub fn stats(&self) -> LifecycleStats {
        self.inner.state.lock().stats
    }

    fn lease(&self, handle: Arc<GpuHandle<P::Device>>) -> GpuLease<P> {
        GpuLease::new(Arc::downgrade(&self.inner), handle)
    }
}

impl<P: GpuPlatform> Clone for LifecycleManager<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P: GpuPlatform> fmt::Debug for LifecycleManager<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleManager")
            .field("policy", &self.inner.policy)
            .field("status", &self.status())
            .finish()
    }
}

impl<P: GpuPlatform> Drop for Inner<P> {
    fn drop(&mut self) {
        let handle = self.state.get_mut().take_for_teardown();
        if let Some(handle) = handle {
            tracing::debug!(handle = %handle.id(), "lifecycle manager dropped; releasing device");
            self.release_device(&handle);
        }
    }
}

impl<P: GpuPlatform> Inner<P> {
    fn begin_acquire(self: &Arc<Self>) -> Acquisition<P::Device> {
        loop {
            let stale = {
                let mut state = self.state.lock();
                match state.handle.clone() {
                    Some(handle) if handle.is_lost() => {
                        tracing::info!(handle = %handle.id(), "reclaiming lost GPU device");
                        state.stats.lost_devices_reclaimed += 1;
                        state.take_for_teardown()
                    }
                    Some(handle) => {
                        state.share_count += 1;
                        return Acquisition::Ready(handle);
                    }
                    None => {
                        let pending = match state.pending.clone() {
                            Some(pending) => pending,
                            None => self.start_initialization(&mut state),
                        };
                        return Acquisition::Pending(pending);
                    }
                }
            };

            if let Some(stale) = stale {
                self.release_device(&stale);
            }
        }
    }

    /// Creates the shared future. The platform is not touched until the
    /// future is first polled, which always happens outside the state lock.
    fn start_initialization(
        self: &Arc<Self>,
        state: &mut LifecycleState<P::Device>,
    ) -> PendingInit<P::Device> {
        let id = state.allocate_id();
        let epoch = state.epoch;
        let platform = Arc::clone(&self.platform);
        let manager = Arc::downgrade(self);

        let pending = async move {
            let result = platform.create_device().await;
            match manager.upgrade() {
                Some(inner) => inner.complete_initialization(id, epoch, result),
                None => {
                    if let Ok(device) = result {
                        if let Err(err) = platform.release_device(&device) {
                            tracing::debug!(
                                handle = %id,
                                error = %err,
                                "GPU device release failed after manager drop; abandoning it"
                            );
                        }
                    }
                    None
                }
            }
        }
        .boxed()
        .shared();

        tracing::debug!(handle = %id, "starting GPU device initialization");
        state.pending = Some(pending.clone());
        pending
    }

    fn complete_initialization(
        &self,
        id: HandleId,
        epoch: u64,
        result: Result<P::Device, PlatformError>,
    ) -> Option<Arc<GpuHandle<P::Device>>> {
        let device = match result {
            Ok(device) => device,
            Err(err) => {
                tracing::error!(handle = %id, error = %err, "failed to initialise GPU device");
                let mut state = self.state.lock();
                state.stats.initialization_failures += 1;
                if state.epoch == epoch {
                    state.pending = None;
                }
                return None;
            }
        };

        let handle = Arc::new(GpuHandle::new(id, device));
        self.platform
            .watch_device_lost(handle.device(), handle.loss_signal());

        let orphaned = {
            let mut state = self.state.lock();
            if state.epoch == epoch {
                state.pending = None;
                state.handle = Some(Arc::clone(&handle));
                state.stats.devices_created += 1;
                false
            } else {
                true
            }
        };

        if orphaned {
            tracing::debug!(handle = %id, "device finished initializing after teardown; releasing");
            self.release_device(&handle);
            return None;
        }

        tracing::info!(handle = %id, "GPU device ready");
        Some(handle)
    }

    /// Takes a share on a freshly initialized handle, unless it was torn
    /// down or lost in the meantime.
    fn join_initialized(&self, handle: &Arc<GpuHandle<P::Device>>) -> bool {
        let mut state = self.state.lock();
        if state.is_current(handle) && !handle.is_lost() {
            state.share_count += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn release_share(self: &Arc<Self>, handle: &Arc<GpuHandle<P::Device>>) {
        let mut state = self.state.lock();
        if !state.is_current(handle) {
            tracing::debug!(handle = %handle.id(), "ignoring release of a torn down device");
            return;
        }
        if state.share_count == 0 {
            tracing::debug!(handle = %handle.id(), "release without outstanding shares ignored");
            return;
        }

        state.share_count -= 1;
        if state.share_count > 0 {
            return;
        }

        match self.policy {
            TeardownPolicy::Immediate => {
                let released = state.take_for_teardown();
                drop(state);
                if let Some(released) = released {
                    self.release_device(&released);
                }
            }
            TeardownPolicy::Deferred { grace } => {
                drop(state);
                self.schedule_teardown(handle.id(), grace);
            }
        }
    }

    fn schedule_teardown(self: &Arc<Self>, id: HandleId, grace: Duration) {
        tracing::debug!(handle = %id, grace = ?grace, "scheduling deferred teardown");
        let manager = Arc::downgrade(self);
        let spawned = thread::Builder::new()
            .name("gpulease-teardown".into())
            .spawn(move || {
                thread::sleep(grace);
                if let Some(inner) = Weak::upgrade(&manager) {
                    inner.teardown_if_idle(id);
                }
            });

        if let Err(err) = spawned {
            tracing::warn!(handle = %id, error = %err, "failed to schedule deferred teardown; tearing down now");
            self.teardown_if_idle(id);
        }
    }

    /// Fire-time check for deferred teardown: only the same, still unused
    /// device is released.
    fn teardown_if_idle(&self, id: HandleId) {
        let released = {
            let mut state = self.state.lock();
            let idle = state.share_count == 0
                && state.handle.as_ref().is_some_and(|handle| handle.id() == id);
            if !idle {
                tracing::debug!(handle = %id, "deferred teardown cancelled");
                return;
            }
            state.take_for_teardown()
        };

        if let Some(released) = released {
            self.release_device(&released);
        }
    }

    fn release_device(&self, handle: &GpuHandle<P::Device>) {
        match self.platform.release_device(handle.device()) {
            Ok(()) => tracing::info!(handle = %handle.id(), "GPU device released"),
            Err(err) => tracing::debug!(
                handle = %handle.id(),
                error = %err,
                "GPU device release failed; abandoning it"
            ),
        }
    }
}
