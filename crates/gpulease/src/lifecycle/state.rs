use std::sync::Arc;

use futures::future::{BoxFuture, Shared};

use crate::handle::{GpuHandle, HandleId};

/// Single-flight initialization shared by every concurrent acquirer.
pub(crate) type PendingInit<D> = Shared<BoxFuture<'static, Option<Arc<GpuHandle<D>>>>>;

/// Coarse state of the shared device, as seen by `LifecycleManager::status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStatus {
    Uninitialized,
    Initializing,
    Ready { share_count: usize },
    /// The platform reported loss; cleanup waits for the next acquisition.
    Lost { share_count: usize },
}

/// Running counters, mostly useful for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleStats {
    pub devices_created: u64,
    pub initialization_failures: u64,
    pub teardowns: u64,
    pub lost_devices_reclaimed: u64,
}

pub(crate) struct LifecycleState<D> {
    pub(crate) handle: Option<Arc<GpuHandle<D>>>,
    pub(crate) share_count: usize,
    pub(crate) pending: Option<PendingInit<D>>,
    /// Bumped on every teardown so late initializations can tell they were
    /// orphaned.
    pub(crate) epoch: u64,
    pub(crate) stats: LifecycleStats,
    next_id: u64,
}

impl<D> LifecycleState<D> {
    pub(crate) fn new() -> Self {
        Self {
            handle: None,
            share_count: 0,
            pending: None,
            epoch: 0,
            stats: LifecycleStats::default(),
            next_id: 1,
        }
    }

    pub(crate) fn allocate_id(&mut self) -> HandleId {
        let id = HandleId::new(self.next_id);
        self.next_id += 1;
        id
    }

    pub(crate) fn is_current(&self, handle: &Arc<GpuHandle<D>>) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, handle))
    }

    /// Resets to the uninitialized state and returns the handle the caller
    /// must release once the lock is dropped.
    pub(crate) fn take_for_teardown(&mut self) -> Option<Arc<GpuHandle<D>>> {
        let handle = self.handle.take();
        self.share_count = 0;
        self.pending = None;
        self.epoch += 1;
        if handle.is_some() {
            self.stats.teardowns += 1;
        }
        handle
    }

    pub(crate) fn status(&self) -> LifecycleStatus {
        match (&self.handle, &self.pending) {
            (Some(handle), _) if handle.is_lost() => LifecycleStatus::Lost {
                share_count: self.share_count,
            },
            (Some(_), _) => LifecycleStatus::Ready {
                share_count: self.share_count,
            },
            (None, Some(_)) => LifecycleStatus::Initializing,
            (None, None) => LifecycleStatus::Uninitialized,
        }
    }
}
