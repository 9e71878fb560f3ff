use shmwin_mapper::MapError;
use shmwin_region::NotConfigured;
use thiserror::Error;

use crate::session::SeekError;
use crate::SessionId;

/// Per-call failure surfaced at the consumer interface.
///
/// Three boundary kinds plus unknown-session: feature absent (no window
/// configured), invalid argument (seek range, window bounds, alignment), and
/// temporarily unavailable (the paging facility failed an otherwise valid
/// install). Every failure is local to the call that made it; other sessions
/// and future calls are untouched.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// No window is configured; the interface must not be exposed at all.
    #[error(transparent)]
    NotConfigured(#[from] NotConfigured),
    /// The id does not name a live session.
    #[error("unknown session {0}")]
    UnknownSession(SessionId),
    /// The session cursor was asked to leave the window.
    #[error(transparent)]
    Seek(#[from] SeekError),
    /// The mapping request was rejected or its install failed.
    #[error(transparent)]
    Map(#[from] MapError),
}

impl DeviceError {
    /// The errno a unix interface registrar should hand to consumers.
    ///
    /// Mirrors the classic char-device contract: `ENODEV` for an absent
    /// feature, `EINVAL` for rejected arguments, `EAGAIN` for an install
    /// the facility could not complete right now, `EBADF` for a dead
    /// session id.
    #[cfg(unix)]
    pub fn raw_os_error(&self) -> i32 {
        match self {
            DeviceError::NotConfigured(_) => libc::ENODEV,
            DeviceError::UnknownSession(_) => libc::EBADF,
            DeviceError::Seek(_) => libc::EINVAL,
            DeviceError::Map(MapError::InstallFailed(_)) => libc::EAGAIN,
            DeviceError::Map(_) => libc::EINVAL,
        }
    }
}
