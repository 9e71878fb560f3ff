//! Consumer-facing binding of the shared window.
//!
//! [`WindowDevice`] is the stable seam between an OS interface registrar and
//! the window core: it owns the session table and forwards the four
//! interface operations (open, release, seek, map) to the session cursors
//! and the window mapper. It carries no domain logic of its own beyond
//! liveness tracking; device-node registration and access control stay on
//! the registrar's side of the seam.
//!
//! A device can only be activated against a configured registry. When no
//! window is installed the activation fails with *not configured* and the
//! interface is never exposed, so consumers cannot tell the feature apart
//! from one that was never built in.

#![forbid(unsafe_code)]

use std::collections::HashMap;
use std::fmt;

use shmwin_mapper::{map_window, MappingRequest, MappingResult, PagingFacility};
use shmwin_region::{RegionDescriptor, RegionRegistry};

mod error;
mod session;

pub use error::DeviceError;
pub use session::{SeekError, Session, Whence};

/// Identifier the interface layer hands to consumers; unique for the
/// lifetime of a device, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl SessionId {
    /// Rebuilds an id from its numeric form, e.g. one a registrar stashed
    /// in per-connection state.
    pub fn from_raw(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four-operation window device, generic over the paging facility that
/// installs validated windows.
#[derive(Debug)]
pub struct WindowDevice<F> {
    region: RegionDescriptor,
    facility: F,
    sessions: HashMap<SessionId, Session>,
    next_session: u64,
}

impl<F: PagingFacility> WindowDevice<F> {
    /// Binds the device to the configured window.
    ///
    /// Fails with [`DeviceError::NotConfigured`] when the registry holds no
    /// descriptor; the caller must then leave the interface unregistered.
    pub fn activate(registry: &RegionRegistry, facility: F) -> Result<Self, DeviceError> {
        let region = *registry.get()?;
        tracing::info!(
            "window device active: base {:#x}, size {:#x}",
            region.base,
            region.size
        );
        Ok(Self {
            region,
            facility,
            sessions: HashMap::new(),
            next_session: 1,
        })
    }

    /// The window this device serves.
    pub fn region(&self) -> RegionDescriptor {
        self.region
    }

    /// Live session count; liveness bookkeeping only.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Opens a consumer session with its cursor at zero.
    ///
    /// Never fails and never blocks: the region is immutable and shared,
    /// sessions are independent, and there is nothing to contend on.
    pub fn open(&mut self) -> SessionId {
        let id = SessionId(self.next_session);
        self.next_session += 1;
        self.sessions.insert(id, Session::new(self.region));
        tracing::debug!("session {id} opened");
        id
    }

    /// Releases a session and forgets its cursor.
    pub fn release(&mut self, id: SessionId) -> Result<(), DeviceError> {
        self.sessions
            .remove(&id)
            .ok_or(DeviceError::UnknownSession(id))?;
        tracing::debug!("session {id} released");
        Ok(())
    }

    /// Moves a session's cursor; other sessions never notice.
    pub fn seek(&mut self, id: SessionId, whence: Whence, offset: i64) -> Result<u64, DeviceError> {
        let session = self
            .sessions
            .get_mut(&id)
            .ok_or(DeviceError::UnknownSession(id))?;
        Ok(session.seek(whence, offset)?)
    }

    /// A session's current cursor position.
    pub fn position(&self, id: SessionId) -> Result<u64, DeviceError> {
        Ok(self
            .sessions
            .get(&id)
            .ok_or(DeviceError::UnknownSession(id))?
            .position())
    }

    /// Validates and installs a window for a session.
    ///
    /// The request carries its own offset; the session cursor plays no part
    /// here and is not moved. Failures are local to this call: nothing about
    /// the session, the region, or other sessions changes, and an identical
    /// retry is the caller's decision.
    pub fn map(
        &self,
        id: SessionId,
        request: MappingRequest,
    ) -> Result<(MappingResult, F::Mapped), DeviceError> {
        if !self.sessions.contains_key(&id) {
            return Err(DeviceError::UnknownSession(id));
        }
        match map_window(self.region, request, &self.facility) {
            Ok((result, mapped)) => {
                tracing::debug!(
                    "session {id} mapped window: target {:#x}, length {:#x}",
                    result.target(),
                    result.length()
                );
                Ok((result, mapped))
            }
            Err(err) => {
                tracing::error!("session {id} map rejected: {err}");
                Err(err.into())
            }
        }
    }
}
