//! Pluggable memory accounting.
//!
//! Column buffers are ordinary vectors; a [`MemoryResource`] grants the byte reservations those
//! buffers are charged against. Every temporary built during an aggregation and every returned
//! column holds a [`Reservation`] on the resource supplied by the caller, so arena-style budgets
//! or pooled accounting can be layered in without the kernels knowing about it.

use crate::error::{GroupbyError, Result};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// A granted byte reservation. Returned to the resource that issued it via
/// [`MemoryResource::deallocate`].
#[derive(Debug, PartialEq, Eq)]
pub struct Allocation {
    bytes: usize,
    align: usize,
}

impl Allocation {
    pub fn new(bytes: usize, align: usize) -> Self {
        Self { bytes, align }
    }

    pub fn bytes(&self) -> usize {
        self.bytes
    }

    pub fn align(&self) -> usize {
        self.align
    }
}

pub trait MemoryResource: Send + Sync + fmt::Debug {
    fn allocate(&self, bytes: usize, align: usize) -> Result<Allocation>;
    fn deallocate(&self, allocation: Allocation);
}

fn check_align(bytes: usize, align: usize) -> Result<()> {
    if align.is_power_of_two() {
        Ok(())
    } else {
        Err(GroupbyError::AllocationFailure {
            bytes,
            reason: format!("alignment {align} is not a power of two"),
        })
    }
}

/// Unbounded resource that tracks current and peak usage.
#[derive(Debug, Default)]
pub struct DefaultMemoryResource {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl DefaultMemoryResource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_bytes(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    pub fn peak_bytes(&self) -> usize {
        self.peak.load(Ordering::Relaxed)
    }
}

impl MemoryResource for DefaultMemoryResource {
    fn allocate(&self, bytes: usize, align: usize) -> Result<Allocation> {
        check_align(bytes, align)?;
        let now = self.current.fetch_add(bytes, Ordering::Relaxed) + bytes;
        self.peak.fetch_max(now, Ordering::Relaxed);
        Ok(Allocation::new(bytes, align))
    }

    fn deallocate(&self, allocation: Allocation) {
        self.current.fetch_sub(allocation.bytes, Ordering::Relaxed);
    }
}

/// Resource with a hard byte budget; requests that would exceed it fail.
#[derive(Debug)]
pub struct LimitedMemoryResource {
    limit: usize,
    used: AtomicUsize,
}

impl LimitedMemoryResource {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            used: AtomicUsize::new(0),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn used_bytes(&self) -> usize {
        self.used.load(Ordering::Relaxed)
    }
}

impl MemoryResource for LimitedMemoryResource {
    fn allocate(&self, bytes: usize, align: usize) -> Result<Allocation> {
        check_align(bytes, align)?;
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                used.checked_add(bytes).filter(|next| *next <= self.limit)
            })
            .map(|_| Allocation::new(bytes, align))
            .map_err(|used| GroupbyError::AllocationFailure {
                bytes,
                reason: format!("limit {} bytes, {used} in use", self.limit),
            })
    }

    fn deallocate(&self, allocation: Allocation) {
        self.used.fetch_sub(allocation.bytes, Ordering::AcqRel);
    }
}

static DEFAULT_RESOURCE: OnceLock<Arc<DefaultMemoryResource>> = OnceLock::new();

/// The process-wide resource used when a caller does not supply one.
pub fn default_resource() -> Arc<dyn MemoryResource> {
    DEFAULT_RESOURCE
        .get_or_init(|| Arc::new(DefaultMemoryResource::new()))
        .clone()
}

/// RAII guard over an [`Allocation`]; returns the bytes to its resource on drop.
pub struct Reservation {
    resource: Arc<dyn MemoryResource>,
    allocation: Option<Allocation>,
}

impl Reservation {
    pub fn new(resource: &Arc<dyn MemoryResource>, bytes: usize, align: usize) -> Result<Self> {
        let allocation = resource.allocate(bytes, align)?;
        Ok(Self {
            resource: Arc::clone(resource),
            allocation: Some(allocation),
        })
    }

    /// Reserve room for `len` elements of `T`.
    pub(crate) fn for_elements<T>(resource: &Arc<dyn MemoryResource>, len: usize) -> Result<Self> {
        let bytes = len
            .checked_mul(std::mem::size_of::<T>())
            .ok_or_else(|| GroupbyError::AllocationFailure {
                bytes: usize::MAX,
                reason: format!("{len} elements overflow the address space"),
            })?;
        Self::new(resource, bytes, std::mem::align_of::<T>())
    }

    pub fn bytes(&self) -> usize {
        self.allocation.as_ref().map_or(0, Allocation::bytes)
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if let Some(allocation) = self.allocation.take() {
            self.resource.deallocate(allocation);
        }
    }
}

impl fmt::Debug for Reservation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reservation")
            .field("bytes", &self.bytes())
            .finish()
    }
}

/// Allocate a host vector with exactly `len` capacity, reporting failure instead of aborting.
pub(crate) fn try_vec_with_capacity<T>(len: usize) -> Result<Vec<T>> {
    let mut out = Vec::new();
    out.try_reserve_exact(len)
        .map_err(|err| GroupbyError::AllocationFailure {
            bytes: len.saturating_mul(std::mem::size_of::<T>()),
            reason: err.to_string(),
        })?;
    Ok(out)
}
