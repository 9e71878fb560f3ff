use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::io::AsRawFd;
use std::path::Path;

use crate::{MapAttrs, MappingResult, PagingFacility};

/// Paging facility backed by a physical-memory device file.
///
/// File offsets are physical addresses, `/dev/mem` convention; any file with
/// that shape works, which is what the tests exploit with sparse temp files.
/// The final memory type of a mapping is chosen by the backing file's
/// driver; the policy carried by the window is the request, not a guarantee
/// this side of the fd can enforce.
#[derive(Debug)]
pub struct PhysMapFile {
    file: File,
}

impl PhysMapFile {
    /// Opens `path` read/write for mapping.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }

    /// Wraps an already-open backing file.
    pub fn from_file(file: File) -> Self {
        Self { file }
    }
}

impl PagingFacility for PhysMapFile {
    type Mapped = MappedWindow;

    unsafe fn install(&self, mapping: &MappingResult) -> io::Result<MappedWindow> {
        MappedWindow::install(&self.file, mapping)
    }
}

/// One live window mapped into this process; unmapped on drop.
#[derive(Debug)]
pub struct MappedWindow {
    addr: *mut libc::c_void,
    len: usize,
    target: u64,
}

// SAFETY: the mapping is exclusively owned and points at no Rust-visible
// allocation; moving or sharing the handle across threads is no different
// from sharing the window with another process, which is the whole point.
unsafe impl Send for MappedWindow {}
unsafe impl Sync for MappedWindow {}

impl MappedWindow {
    fn install(file: &File, mapping: &MappingResult) -> io::Result<Self> {
        let len = usize::try_from(mapping.length()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "window length exceeds the host address space",
            )
        })?;
        let offset = libc::off_t::try_from(mapping.target()).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                "window target exceeds the backing file's offset range",
            )
        })?;

        // SAFETY: plain shared file mapping; the kernel validates the fd and
        // the range, and we only hand out the pointer behind length checks.
        let addr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                offset,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }

        let window = Self {
            addr,
            len,
            target: mapping.target(),
        };
        window.apply_attrs(mapping.attrs());
        Ok(window)
    }

    // Attribute application is best-effort: the window stays installed even
    // when the host refuses residency or dump exclusion (e.g. RLIMIT_MEMLOCK
    // or a non-linux host). A shared file mapping never grows, so NO_GROW
    // needs no syscall.
    fn apply_attrs(&self, attrs: MapAttrs) {
        if attrs.contains(MapAttrs::NO_SWAP) {
            // SAFETY: `addr..addr+len` is the mapping created above.
            let rc = unsafe { libc::mlock(self.addr, self.len) };
            if rc != 0 {
                let err = io::Error::last_os_error();
                tracing::warn!(
                    "mlock missed for window at {:#x} (+{:#x} bytes): {err}",
                    self.target,
                    self.len
                );
            }
        }
        #[cfg(any(target_os = "linux", target_os = "android"))]
        if attrs.contains(MapAttrs::NO_DUMP) {
            // SAFETY: same mapping as above.
            let rc = unsafe { libc::madvise(self.addr, self.len, libc::MADV_DONTDUMP) };
            if rc != 0 {
                let err = io::Error::last_os_error();
                tracing::warn!(
                    "madvise(MADV_DONTDUMP) missed for window at {:#x}: {err}",
                    self.target
                );
            }
        }
    }

    /// Physical address the window begins at.
    pub fn target(&self) -> u64 {
        self.target
    }

    /// Mapped length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.addr as *const u8
    }

    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.addr as *mut u8
    }

    /// Copies `buf.len()` bytes out of the window at `offset`.
    pub fn read_at(&self, offset: usize, buf: &mut [u8]) -> io::Result<()> {
        self.check_span(offset, buf.len())?;
        // SAFETY: span checked against the live mapping.
        unsafe {
            std::ptr::copy_nonoverlapping(
                (self.addr as *const u8).add(offset),
                buf.as_mut_ptr(),
                buf.len(),
            );
        }
        Ok(())
    }

    /// Copies `data` into the window at `offset`.
    pub fn write_at(&mut self, offset: usize, data: &[u8]) -> io::Result<()> {
        self.check_span(offset, data.len())?;
        // SAFETY: span checked against the live mapping.
        unsafe {
            std::ptr::copy_nonoverlapping(
                data.as_ptr(),
                (self.addr as *mut u8).add(offset),
                data.len(),
            );
        }
        Ok(())
    }

    fn check_span(&self, offset: usize, len: usize) -> io::Result<()> {
        if offset > self.len || len > self.len - offset {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "access beyond the mapped window",
            ));
        }
        Ok(())
    }
}

impl Drop for MappedWindow {
    fn drop(&mut self) {
        // SAFETY: `addr..addr+len` came from mmap in `install` and is
        // unmapped exactly once.
        let rc = unsafe { libc::munmap(self.addr, self.len) };
        if rc != 0 {
            let err = io::Error::last_os_error();
            tracing::warn!("munmap failed for window at {:#x}: {err}", self.target);
        }
    }
}
