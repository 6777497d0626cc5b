//! Page-granular memory mappings with explicit protection.
//!
//! Both the code buffer and the operand stack live in anonymous private
//! mappings obtained directly from the kernel. A region is mapped read-write;
//! callers change the protection of whole pages inside it with
//! [`MappedRegion::protect`].

use core::fmt;
use std::io;
use std::ptr::{self, NonNull};

use crate::error::{Error, Result};

/// Page protection of a mapped range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    /// No access; used for guard pages
    None,
    /// Readable and writable, never executable
    ReadWrite,
    /// Readable and executable, never writable
    ReadExecute,
}

impl Protection {
    fn flags(self) -> libc::c_int {
        match self {
            Protection::None => libc::PROT_NONE,
            Protection::ReadWrite => libc::PROT_READ | libc::PROT_WRITE,
            Protection::ReadExecute => libc::PROT_READ | libc::PROT_EXEC,
        }
    }
}

impl fmt::Display for Protection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protection::None => write!(f, "inaccessible"),
            Protection::ReadWrite => write!(f, "read-write"),
            Protection::ReadExecute => write!(f, "read-execute"),
        }
    }
}

/// Size of a virtual memory page on this host.
pub fn page_size() -> usize {
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as usize
    } else {
        4096
    }
}

/// An anonymous private mapping, unmapped on drop.
#[derive(Debug)]
pub struct MappedRegion {
    ptr: NonNull<u8>,
    len: usize,
}

impl MappedRegion {
    /// Map `len` bytes read-write. `len` must be a multiple of the page size.
    pub fn map(len: usize) -> Result<Self> {
        let ptr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                Protection::ReadWrite.flags(),
                libc::MAP_ANON | libc::MAP_PRIVATE,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(Error::Map {
                len,
                source: io::Error::last_os_error(),
            });
        }
        let ptr = NonNull::new(ptr as *mut u8).ok_or_else(|| Error::Map {
            len,
            source: io::Error::new(io::ErrorKind::Other, "mmap returned null"),
        })?;
        Ok(Self { ptr, len })
    }

    /// Change the protection of `len` bytes starting `offset` bytes into the
    /// region. Both must be page aligned.
    pub fn protect(&mut self, offset: usize, len: usize, protection: Protection) -> Result<()> {
        debug_assert!(offset + len <= self.len);
        let rc = unsafe {
            libc::mprotect(
                self.ptr.as_ptr().add(offset) as *mut libc::c_void,
                len,
                protection.flags(),
            )
        };
        if rc != 0 {
            return Err(Error::Protect {
                len,
                protection,
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }

    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        unsafe {
            libc::munmap(self.ptr.as_ptr() as *mut libc::c_void, self.len);
        }
    }
}
