//! Window validation and installation.
//!
//! A consumer asks for an `(offset, length)` sub-window of the shared
//! region. [`map_window`] turns that request into a bounds-checked,
//! page-aligned physical target with the fixed caching policy and attribute
//! set, then hands it to a [`PagingFacility`], the privileged backend that
//! actually wires physical pages into an address space.
//!
//! The validator and the facility are kept apart on purpose: a
//! [`MappingResult`] has no public constructor, so the only values a
//! facility ever receives are ones that passed validation. Facility failures
//! are propagated verbatim as [`MapError::InstallFailed`]; there is no retry
//! and no partial state to clean up.

use std::io;

use bitflags::bitflags;
use shmwin_region::{is_page_aligned, RegionDescriptor};
use thiserror::Error;

mod recording;
#[cfg(unix)]
mod unix;

pub use recording::RecordingFacility;
#[cfg(unix)]
pub use unix::{MappedWindow, PhysMapFile};

/// A consumer's request for a sub-window of the region.
///
/// Ephemeral: validated by [`map_window`] and discarded. Offsets are
/// region-relative; nothing here depends on any session cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingRequest {
    /// Byte offset of the window inside the region.
    pub offset: u64,
    /// Window length in bytes.
    pub length: u64,
}

/// Cache policy applied to installed windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachePolicy {
    /// Writes are buffered and coalesced for throughput; strict store
    /// ordering is given up. Chosen unconditionally for bulk host/consumer
    /// transfer. A fully-uncached policy would cost bandwidth for ordering
    /// guarantees this workload does not need.
    WriteCombining,
}

bitflags! {
    /// Attributes attached to every installed window.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MapAttrs: u32 {
        /// Pages stay resident; never swapped out.
        const NO_SWAP = 1 << 0;
        /// Excluded from core dumps.
        const NO_DUMP = 1 << 1;
        /// The mapping never grows past its original length.
        const NO_GROW = 1 << 2;
    }
}

impl MapAttrs {
    /// The full set applied to every window. Attributes are descriptive
    /// data attached after validation; applying them cannot fail a map.
    pub const WINDOW: Self = Self::NO_SWAP.union(Self::NO_DUMP).union(Self::NO_GROW);
}

/// Validated output of [`map_window`]: what the paging facility installs.
///
/// Purely descriptive: it carries no ownership of the mapping itself.
/// There is no public constructor: a `MappingResult` exists only for a
/// window that passed the bounds and alignment checks, which makes the
/// privileged install call unreachable for unvalidated requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingResult {
    target: u64,
    length: u64,
    policy: CachePolicy,
    attrs: MapAttrs,
}

impl MappingResult {
    /// Physical address the window begins at (`region.base + offset`).
    pub fn target(&self) -> u64 {
        self.target
    }

    /// Window length in bytes.
    pub fn length(&self) -> u64 {
        self.length
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn attrs(&self) -> MapAttrs {
        self.attrs
    }
}

/// Rejection or failure of a mapping request.
#[derive(Debug, Error)]
pub enum MapError {
    /// The window does not fit inside the region. Arithmetic overflow while
    /// sizing the window lands here too; it is never allowed to wrap.
    #[error("window out of bounds: offset {offset:#x} + length {length:#x} exceeds region size {size:#x}")]
    OutOfBounds { offset: u64, length: u64, size: u64 },
    /// The physical target of the window is not page-aligned.
    #[error("window target {target:#x} is not page-aligned")]
    Misaligned { target: u64 },
    /// The paging facility failed to install the validated window. The
    /// facility's own error is carried verbatim; the caller decides whether
    /// to try again.
    #[error("paging facility failed to install window: {0}")]
    InstallFailed(#[from] io::Error),
}

/// Privileged capability that wires a validated physical window into a
/// consumer-visible address space.
///
/// What an installed window *is* belongs to the implementation: the unix
/// backend returns a live RAII mapping, [`RecordingFacility`] just logs the
/// call. One facility instance serves every session of a device, so
/// implementations take `&self` and manage their own interior state.
pub trait PagingFacility {
    /// Artifact representing one installed window; dropped by the consumer
    /// to tear the window down.
    type Mapped;

    /// Installs the window described by `mapping`.
    ///
    /// # Safety
    ///
    /// `mapping` must have passed window validation against the region this
    /// facility exposes: in bounds, page-aligned target. [`map_window`] is
    /// the only constructor of [`MappingResult`] values, so every call
    /// routed through it upholds the contract and implementations may trust
    /// the range.
    unsafe fn install(&self, mapping: &MappingResult) -> io::Result<Self::Mapped>;
}

/// Validates `request` against `region` and installs the window through
/// `facility`.
///
/// The checks run in a fixed order:
///
/// 1. `offset + length` must not overflow and must stay within
///    `region.size`, otherwise [`MapError::OutOfBounds`]; alignment is not
///    even looked at for an oversized window.
/// 2. The physical target `region.base + offset` must not overflow
///    (out of bounds) and must be page-aligned, otherwise
///    [`MapError::Misaligned`]. With a page-aligned region base this can
///    only trip on an unaligned offset; the check runs regardless of what
///    the registry promised about the base.
///
/// Success returns the descriptive [`MappingResult`] together with the
/// facility's artifact for the installed window. Failure leaves nothing
/// behind: no partial mapping, no state to roll back.
pub fn map_window<F: PagingFacility>(
    region: RegionDescriptor,
    request: MappingRequest,
    facility: &F,
) -> Result<(MappingResult, F::Mapped), MapError> {
    let out_of_bounds = || MapError::OutOfBounds {
        offset: request.offset,
        length: request.length,
        size: region.size,
    };

    let window_end = request
        .offset
        .checked_add(request.length)
        .ok_or_else(out_of_bounds)?;
    if window_end > region.size {
        return Err(out_of_bounds());
    }

    let target = region
        .base
        .checked_add(request.offset)
        .ok_or_else(out_of_bounds)?;
    if !is_page_aligned(target) {
        return Err(MapError::Misaligned { target });
    }

    let result = MappingResult {
        target,
        length: request.length,
        policy: CachePolicy::WriteCombining,
        attrs: MapAttrs::WINDOW,
    };

    // Validation is complete; this is the one call site of the privileged
    // install.
    let mapped = unsafe { facility.install(&result) }?;
    Ok((result, mapped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use shmwin_region::PAGE_SIZE;

    const REGION: RegionDescriptor = RegionDescriptor {
        base: 0x1_0000_0000,
        size: 0x100_0000,
    };

    fn map(offset: u64, length: u64) -> Result<MappingResult, MapError> {
        let facility = RecordingFacility::new();
        map_window(REGION, MappingRequest { offset, length }, &facility).map(|(result, ())| result)
    }

    #[test]
    fn maps_full_region() {
        let result = map(0, REGION.size).unwrap();
        assert_eq!(result.target(), REGION.base);
        assert_eq!(result.length(), REGION.size);
        assert_eq!(result.policy(), CachePolicy::WriteCombining);
        assert_eq!(result.attrs(), MapAttrs::WINDOW);
    }

    #[test]
    fn maps_interior_window() {
        let result = map(PAGE_SIZE, PAGE_SIZE).unwrap();
        assert_eq!(result.target(), REGION.base + PAGE_SIZE);
        assert_eq!(result.length(), PAGE_SIZE);
    }

    #[test]
    fn zero_length_window_passes_validation() {
        // Whether a facility accepts an empty window is its own business;
        // the recording facility does.
        let result = map(PAGE_SIZE, 0).unwrap();
        assert_eq!(result.target(), REGION.base + PAGE_SIZE);
        assert_eq!(result.length(), 0);
    }

    #[test]
    fn rejects_window_past_the_end() {
        let err = map(0, REGION.size + 1).unwrap_err();
        assert!(matches!(err, MapError::OutOfBounds { .. }));

        let err = map(REGION.size, 1).unwrap_err();
        assert!(matches!(err, MapError::OutOfBounds { .. }));
    }

    #[test]
    fn rejects_overflowing_window_as_out_of_bounds() {
        let err = map(u64::MAX, 2).unwrap_err();
        assert!(matches!(err, MapError::OutOfBounds { .. }));
    }

    #[test]
    fn bounds_are_checked_before_alignment() {
        // Unaligned *and* oversized: bounds win.
        let err = map(1, REGION.size).unwrap_err();
        assert!(matches!(err, MapError::OutOfBounds { .. }));
    }

    #[test]
    fn rejects_unaligned_target() {
        let err = map(1, 1).unwrap_err();
        assert!(matches!(err, MapError::Misaligned { target } if target == REGION.base + 1));
    }

    #[test]
    fn overflowing_target_is_out_of_bounds() {
        // A region parked at the top of the address space: the window fits
        // inside `size`, but `base + offset` has nowhere to go.
        let region = RegionDescriptor {
            base: u64::MAX - PAGE_SIZE + 1,
            size: 4 * PAGE_SIZE,
        };
        let facility = RecordingFacility::new();
        let err = map_window(
            region,
            MappingRequest {
                offset: 2 * PAGE_SIZE,
                length: PAGE_SIZE,
            },
            &facility,
        )
        .unwrap_err();
        assert!(matches!(err, MapError::OutOfBounds { .. }));
    }

    #[test]
    fn facility_only_sees_validated_windows() {
        let facility = RecordingFacility::new();
        let _ = map_window(
            REGION,
            MappingRequest {
                offset: 0,
                length: REGION.size + 1,
            },
            &facility,
        );
        let _ = map_window(
            REGION,
            MappingRequest {
                offset: 1,
                length: 1,
            },
            &facility,
        );
        assert!(facility.installs().is_empty());

        map_window(
            REGION,
            MappingRequest {
                offset: 0,
                length: PAGE_SIZE,
            },
            &facility,
        )
        .unwrap();
        let installs = facility.installs();
        assert_eq!(installs.len(), 1);
        assert_eq!(installs[0].target(), REGION.base);
    }

    #[test]
    fn facility_failure_is_propagated_verbatim() {
        let facility = RecordingFacility::new();
        facility.fail_next_install();
        let err = map_window(
            REGION,
            MappingRequest {
                offset: 0,
                length: PAGE_SIZE,
            },
            &facility,
        )
        .unwrap_err();
        match err {
            MapError::InstallFailed(io_err) => {
                assert_eq!(io_err.kind(), io::ErrorKind::WouldBlock);
            }
            other => panic!("expected InstallFailed, got {other:?}"),
        }
        // Exactly one failure was primed; the next identical request goes
        // through untouched.
        let (result, ()) = map_window(
            REGION,
            MappingRequest {
                offset: 0,
                length: PAGE_SIZE,
            },
            &facility,
        )
        .unwrap();
        assert_eq!(result.target(), REGION.base);
    }

    #[test]
    fn attrs_cover_the_window_triple() {
        assert!(MapAttrs::WINDOW.contains(MapAttrs::NO_SWAP));
        assert!(MapAttrs::WINDOW.contains(MapAttrs::NO_DUMP));
        assert!(MapAttrs::WINDOW.contains(MapAttrs::NO_GROW));
    }
}
