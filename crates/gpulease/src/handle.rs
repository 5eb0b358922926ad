use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::platform::LossSignal;

/// Identity of one successful device creation.
///
/// Ids increase monotonically per manager, so a newer handle never compares
/// equal to one that has been torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl HandleId {
    pub(crate) fn new(raw: u64) -> Self {
        HandleId(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gpu#{}", self.0)
    }
}

/// The shared device plus its liveness flag.
pub struct GpuHandle<D> {
    id: HandleId,
    device: Arc<D>,
    lost: Arc<AtomicBool>,
}

impl<D> GpuHandle<D> {
    pub(crate) fn new(id: HandleId, device: D) -> Self {
        Self {
            id,
            device: Arc::new(device),
            lost: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }

    pub fn device(&self) -> &Arc<D> {
        &self.device
    }

    /// True once the platform reported the device as lost.
    pub fn is_lost(&self) -> bool {
        self.lost.load(Ordering::Acquire)
    }

    pub(crate) fn loss_signal(&self) -> LossSignal {
        LossSignal::new(self.id, Arc::clone(&self.lost))
    }
}

impl<D> fmt::Debug for GpuHandle<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GpuHandle")
            .field("id", &self.id)
            .field("lost", &self.is_lost())
            .finish_non_exhaustive()
    }
}
