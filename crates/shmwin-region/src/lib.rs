//! The shared window's identity: descriptor parsing, page-granularity
//! checks, and the process-wide write-once registry.
//!
//! The window is described by an `<address>,<size>` pair fixed at startup.
//! Parsing and installation are deliberately separate steps:
//! [`RegionDescriptor`] carries the two values as plain data, while
//! [`RegionRegistry::install`] enforces the non-empty and page-alignment
//! rules at the single point where a descriptor becomes authoritative.

#![forbid(unsafe_code)]

mod descriptor;
mod registry;

pub use descriptor::{ConfigError, RegionDescriptor};
pub use registry::{InstallError, NotConfigured, RegionRegistry};

/// Log2 of [`PAGE_SIZE`].
pub const PAGE_SHIFT: u32 = 12;

/// Page granularity the window's base and size must honor (x86-64 baseline).
pub const PAGE_SIZE: u64 = 1 << PAGE_SHIFT;

/// Returns whether `value` is a multiple of [`PAGE_SIZE`].
#[inline]
pub fn is_page_aligned(value: u64) -> bool {
    value & (PAGE_SIZE - 1) == 0
}
