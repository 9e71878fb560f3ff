//! Shared physical-memory window device core.
//!
//! One physically-backed, fixed-size region, configured once at startup
//! from an `<address>,<size>` descriptor and exposed to any number of
//! consumer sessions through bounds- and alignment-checked mapping requests.
//!
//! The workspace splits along the component seams: `shmwin-region` parses
//! and pins the window, `shmwin-mapper` validates requests and drives the
//! paging facility, `shmwin-device` binds consumer sessions to both. This
//! crate re-exports the lot for embedders that want a single dependency.

#![forbid(unsafe_code)]

pub use shmwin_device::{DeviceError, SeekError, Session, SessionId, Whence, WindowDevice};
#[cfg(unix)]
pub use shmwin_mapper::{MappedWindow, PhysMapFile};
pub use shmwin_mapper::{
    map_window, CachePolicy, MapAttrs, MapError, MappingRequest, MappingResult, PagingFacility,
    RecordingFacility,
};
pub use shmwin_region::{
    is_page_aligned, ConfigError, InstallError, NotConfigured, RegionDescriptor, RegionRegistry,
    PAGE_SHIFT, PAGE_SIZE,
};
