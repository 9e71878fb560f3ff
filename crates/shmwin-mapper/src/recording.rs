use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::{MappingResult, PagingFacility};

/// Deterministic in-process facility: records every install and can be
/// primed to fail the next one.
///
/// Backs unit and property tests on every platform, and dry-run validation
/// where touching real physical memory is unwanted. Installing produces no
/// artifact; the record itself is the observable effect.
#[derive(Debug, Default)]
pub struct RecordingFacility {
    installs: Mutex<Vec<MappingResult>>,
    fail_next: AtomicBool,
}

impl RecordingFacility {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next install fail with `WouldBlock`, once.
    pub fn fail_next_install(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Every install accepted so far, in call order.
    pub fn installs(&self) -> Vec<MappingResult> {
        self.installs.lock().unwrap().clone()
    }
}

impl PagingFacility for RecordingFacility {
    type Mapped = ();

    unsafe fn install(&self, mapping: &MappingResult) -> io::Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(io::Error::new(
                io::ErrorKind::WouldBlock,
                "install failure primed by test",
            ));
        }
        self.installs.lock().unwrap().push(*mapping);
        Ok(())
    }
}
