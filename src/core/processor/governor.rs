//! Per-call resource limits for decoding and resizing.
//!
//! [`ResourceGovernor::acquire`] installs limits for the current thread and
//! returns a guard; dropping the guard (on success, error or panic unwind)
//! puts the previous limits back. Limits live in a thread-local, so
//! concurrent decodes on different threads never see each other's budget.

use super::{MAX_DIMENSION, MAX_PIXELS};
use crate::error::DecodeError;
use std::cell::Cell;
use std::marker::PhantomData;

/// Default memory budget for a single allocation during decode or resize (256 MiB)
pub const DEFAULT_MEMORY_BYTES: u64 = 256 * 1024 * 1024;

thread_local! {
    static ACTIVE: Cell<Option<ResourceLimits>> = const { Cell::new(None) };
}

/// Bounds applied to one decode + resize
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceLimits {
    /// Largest accepted width or height
    pub max_dimension: u32,
    /// Largest accepted width * height
    pub max_pixels: u64,
    /// Largest single buffer the decoder or resizer may allocate
    pub memory_bytes: u64,
}

impl Default for ResourceLimits {
    fn default() -> Self {
        Self {
            max_dimension: MAX_DIMENSION,
            max_pixels: MAX_PIXELS,
            memory_bytes: DEFAULT_MEMORY_BYTES,
        }
    }
}

impl ResourceLimits {
    /// Translate into decoder limits for the `image` crate
    pub fn decoder_limits(&self) -> image::Limits {
        let mut limits = image::Limits::default();
        limits.max_image_width = Some(self.max_dimension);
        limits.max_image_height = Some(self.max_dimension);
        limits.max_alloc = Some(self.memory_bytes);
        limits
    }

    /// Fail if an allocation of `bytes` would exceed the budget
    pub fn charge(&self, bytes: u64) -> Result<(), DecodeError> {
        if bytes > self.memory_bytes {
            return Err(DecodeError::BudgetExceeded {
                required_bytes: bytes,
                limit_bytes: self.memory_bytes,
            });
        }
        Ok(())
    }
}

/// Installs scoped limits on the current thread
pub struct ResourceGovernor;

impl ResourceGovernor {
    /// Install `limits` until the returned guard is dropped
    pub fn acquire(limits: ResourceLimits) -> GovernorGuard {
        let previous = ACTIVE.with(|active| active.replace(Some(limits)));
        tracing::trace!(?limits, "resource limits installed");
        GovernorGuard {
            previous,
            _not_send: PhantomData,
        }
    }
}

/// Restores the previous thread limits on drop.
///
/// Not `Send`: it must be dropped on the thread that acquired it.
#[must_use = "limits are released as soon as the guard is dropped"]
pub struct GovernorGuard {
    previous: Option<ResourceLimits>,
    _not_send: PhantomData<*const ()>,
}

impl Drop for GovernorGuard {
    fn drop(&mut self) {
        ACTIVE.with(|active| active.set(self.previous));
    }
}

/// Limits in effect on this thread (defaults outside any guard)
pub fn active_limits() -> ResourceLimits {
    ACTIVE.with(|active| active.get()).unwrap_or_default()
}

/// Whether a guard is held on this thread
pub fn is_governed() -> bool {
    ACTIVE.with(|active| active.get()).is_some()
}
