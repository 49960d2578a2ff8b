//! Compute execution contexts and thread-bound scoped binding.
//!
//! An [`ExecutionContext`] identifies one compute device plus its queue. Exactly one context is
//! current per thread. [`ExecutionContext::scope`] makes a context current and hands back an
//! [`ExecScope`] guard that restores the previously current context when dropped, including
//! during unwinding.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static CURRENT: RefCell<Option<ExecutionContext>> = const { RefCell::new(None) };
}

/// Description of the compute device behind a context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceDesc {
    /// Device name as reported by the driver.
    pub name: String,
    /// Platform / vendor string.
    pub platform: String,
}

impl DeviceDesc {
    /// Create a description.
    pub fn new(name: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            platform: platform.into(),
        }
    }
}

#[derive(Debug)]
struct Inner {
    id: u64,
    device: DeviceDesc,
    use_compute: AtomicBool,
}

/// Shared handle to a compute context.
///
/// Cloning is cheap and yields a handle to the same context; equality compares context identity.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    inner: Arc<Inner>,
}

impl PartialEq for ExecutionContext {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ExecutionContext {}

impl ExecutionContext {
    /// Create a context for `device`. Compute is enabled by default.
    pub fn new(device: DeviceDesc) -> Self {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(id, device = %device.name, "execution context created");
        Self {
            inner: Arc::new(Inner {
                id,
                device,
                use_compute: AtomicBool::new(true),
            }),
        }
    }

    /// Process-unique identity.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Device behind this context.
    pub fn device(&self) -> &DeviceDesc {
        &self.inner.device
    }

    /// Enable or disable compute offload for work issued under this context.
    pub fn set_use_compute(&self, enabled: bool) {
        self.inner.use_compute.store(enabled, Ordering::Relaxed);
    }

    /// Whether compute offload is enabled.
    pub fn use_compute(&self) -> bool {
        self.inner.use_compute.load(Ordering::Relaxed)
    }

    /// Context current on the calling thread, if any.
    pub fn current() -> Option<ExecutionContext> {
        CURRENT.with(|c| c.borrow().clone())
    }

    /// Return `true` when this context is current on the calling thread.
    pub fn is_current(&self) -> bool {
        CURRENT.with(|c| c.borrow().as_ref().is_some_and(|cur| cur == self))
    }

    /// Make this context current on the calling thread, replacing whatever was current.
    ///
    /// Prefer [`ExecutionContext::scope`], which restores the previous binding.
    pub fn bind(&self) {
        CURRENT.with(|c| *c.borrow_mut() = Some(self.clone()));
    }

    /// Clear the calling thread's current context.
    pub fn unbind() {
        CURRENT.with(|c| *c.borrow_mut() = None);
    }

    /// Make this context current until the returned guard is dropped.
    pub fn scope(&self) -> ExecScope {
        let prev = CURRENT.with(|c| c.borrow_mut().replace(self.clone()));
        tracing::trace!(ctx = self.id(), prev = prev.as_ref().map(|p| p.id()), "enter scope");
        ExecScope {
            prev,
            _not_send: PhantomData,
        }
    }
}

/// Guard restoring the previously current context on drop.
///
/// Guards are tied to the thread that created them.
#[must_use = "the context is only current while the scope guard is alive"]
pub struct ExecScope {
    prev: Option<ExecutionContext>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ExecScope {
    fn drop(&mut self) {
        let prev = self.prev.take();
        // Thread-local storage may already be gone during thread teardown.
        let _ = CURRENT.try_with(|c| *c.borrow_mut() = prev);
    }
}

#[cfg(test)]
#[path = "../tests/unit/context.rs"]
mod tests;
