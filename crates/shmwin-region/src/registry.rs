use std::sync::OnceLock;

use thiserror::Error;

use crate::{is_page_aligned, RegionDescriptor};

/// Rejection of a window descriptor at install time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InstallError {
    /// Base or size is zero.
    #[error("window descriptor is empty: base and size must both be non-zero")]
    Empty,
    /// Base or size is not a multiple of the page size.
    #[error("window descriptor is not page-aligned: base {base:#x}, size {size:#x}")]
    Unaligned { base: u64, size: u64 },
    /// A descriptor is already installed; the window is fixed for the
    /// process lifetime.
    #[error("a window descriptor is already installed")]
    AlreadyInstalled,
}

/// The registry holds no descriptor; the window feature is absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no shared window is configured")]
pub struct NotConfigured;

/// Write-once holder of the active window descriptor.
///
/// [`install`](Self::install) is called once during startup, before any
/// consumer exists; every later reader sees the same immutable descriptor.
/// Reads are lock-free, so any number of sessions can consult the region
/// concurrently.
#[derive(Debug, Default)]
pub struct RegionRegistry {
    slot: OnceLock<RegionDescriptor>,
}

impl RegionRegistry {
    pub const fn new() -> Self {
        Self {
            slot: OnceLock::new(),
        }
    }

    /// Validates and records the window descriptor.
    ///
    /// Checks run in a fixed order: an empty window is reported before a
    /// misaligned one, and only a descriptor that passes both may claim the
    /// slot. At most one install ever succeeds; later attempts fail with
    /// [`InstallError::AlreadyInstalled`] and leave the original in place.
    pub fn install(&self, descriptor: RegionDescriptor) -> Result<(), InstallError> {
        if descriptor.base == 0 || descriptor.size == 0 {
            return Err(InstallError::Empty);
        }
        if !is_page_aligned(descriptor.base) || !is_page_aligned(descriptor.size) {
            return Err(InstallError::Unaligned {
                base: descriptor.base,
                size: descriptor.size,
            });
        }
        self.slot
            .set(descriptor)
            .map_err(|_| InstallError::AlreadyInstalled)
    }

    /// Returns the installed descriptor.
    ///
    /// [`NotConfigured`] means the feature is absent: callers must not
    /// expose the window interface at all.
    pub fn get(&self) -> Result<&RegionDescriptor, NotConfigured> {
        self.slot.get().ok_or(NotConfigured)
    }
}
