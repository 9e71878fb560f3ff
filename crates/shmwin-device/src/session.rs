use shmwin_region::RegionDescriptor;
use thiserror::Error;

/// Anchor for [`Session::seek`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Whence {
    /// From the start of the window.
    Start,
    /// From the current position.
    Current,
    /// From the end of the window, i.e. the region size.
    End,
}

/// Seek rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SeekError {
    /// The computed position falls outside `0..=size`. The window is a
    /// fixed-size object; there is no seeking past its end from any anchor,
    /// `End` included.
    #[error("seek out of range: computed position {requested}, window size {size}")]
    OutOfRange { requested: i128, size: u64 },
}

/// One consumer's cursor over the shared window.
///
/// Sessions are mutually independent: each is owned by exactly one consumer
/// connection, and nothing but that consumer's own seeks ever moves the
/// position. The cursor is bookkeeping for byte-stream style access; mapping
/// requests carry their own offsets and ignore it.
#[derive(Debug, Clone)]
pub struct Session {
    region: RegionDescriptor,
    position: u64,
}

impl Session {
    /// Opens a cursor at position zero. Never fails, never blocks.
    pub fn new(region: RegionDescriptor) -> Self {
        Self { region, position: 0 }
    }

    /// Current position, always within `0..=region.size`.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Moves the cursor to `anchor + offset` and returns the new position.
    ///
    /// Fails with [`SeekError::OutOfRange`] when the result leaves
    /// `0..=size`; a failed seek does not move the cursor. The arithmetic is
    /// widened so a large position plus a large offset can never wrap.
    pub fn seek(&mut self, whence: Whence, offset: i64) -> Result<u64, SeekError> {
        let anchor = match whence {
            Whence::Start => 0,
            Whence::Current => self.position,
            Whence::End => self.region.size,
        };
        let requested = i128::from(anchor) + i128::from(offset);
        if requested < 0 || requested > i128::from(self.region.size) {
            return Err(SeekError::OutOfRange {
                requested,
                size: self.region.size,
            });
        }
        self.position = requested as u64;
        Ok(self.position)
    }
}
