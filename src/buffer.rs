//! The code buffer: one mapped region that generated code is written into.
//!
//! The buffer is either writable or executable, never both. Emission needs
//! `&mut CodeBuffer`, and the only way to make it executable is
//! [`CodeBuffer::make_executable`], which hands out an [`ExecutableCode`]
//! guard holding that same mutable borrow. While the guard lives nothing can be
//! emitted, and when it goes away the pages are writable again.

use crate::common::memory::{page_size, MappedRegion, Protection};
use crate::common::{Instruction, Slot};
use crate::error::{Error, Result};

/// Executable-capable region plus the emission cursor for one unit.
#[derive(Debug)]
pub struct CodeBuffer {
    region: MappedRegion,
    cursor: usize,
    pending: Option<u32>,
    protection: Protection,
}

impl CodeBuffer {
    /// Map a buffer of `pages` virtual memory pages.
    pub fn new(pages: usize) -> Result<Self> {
        if pages == 0 {
            return Err(Error::InvalidConfig("code buffer needs at least one page".into()));
        }
        let region = MappedRegion::map(pages * page_size())?;
        Ok(Self {
            region,
            cursor: 0,
            pending: None,
            protection: Protection::ReadWrite,
        })
    }

    /// Rewind to the start and forget any pending half-instruction.
    pub fn reset(&mut self) {
        self.cursor = 0;
        self.pending = None;
    }

    pub fn capacity(&self) -> usize {
        self.region.len()
    }

    /// Bytes written so far in this unit.
    pub fn len(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.cursor == 0
    }

    pub fn protection(&self) -> Protection {
        self.protection
    }

    /// The half-instruction waiting for a partner, if any.
    pub fn pending(&self) -> Option<u32> {
        self.pending
    }

    pub(crate) fn set_pending(&mut self, op: u32) {
        self.pending = Some(op);
    }

    pub(crate) fn take_pending(&mut self) -> Option<u32> {
        self.pending.take()
    }

    /// Append one slot at the cursor.
    pub fn write(&mut self, slot: Slot) -> Result<()> {
        debug_assert_eq!(self.protection, Protection::ReadWrite);
        if self.cursor + slot.size() > self.capacity() {
            return Err(Error::CodeBufferFull {
                capacity: self.capacity(),
            });
        }
        let bytes = slot.bytes();
        // SAFETY: bounds checked above and the region is writable.
        unsafe {
            std::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                self.region.as_ptr().add(self.cursor),
                bytes.len(),
            );
        }
        self.cursor += bytes.len();
        Ok(())
    }

    /// The code emitted for the current unit.
    pub fn bytes(&self) -> &[u8] {
        // SAFETY: the region is readable in both states and `cursor` never
        // exceeds its length.
        unsafe { std::slice::from_raw_parts(self.region.as_ptr(), self.cursor) }
    }

    /// Flip the whole buffer to read-execute.
    pub fn make_executable(&mut self) -> Result<ExecutableCode<'_>> {
        self.set_protection(Protection::ReadExecute)?;
        Ok(ExecutableCode {
            buffer: self,
            armed: true,
        })
    }

    fn set_protection(&mut self, protection: Protection) -> Result<()> {
        let len = self.region.len();
        self.region.protect(0, len, protection)?;
        self.protection = protection;
        Ok(())
    }
}

/// A code buffer that is currently executable.
///
/// Dropping the guard makes the buffer writable again. Prefer
/// [`ExecutableCode::finish`], which reports a failed flip instead of
/// aborting the process.
pub struct ExecutableCode<'a> {
    buffer: &'a mut CodeBuffer,
    armed: bool,
}

impl ExecutableCode<'_> {
    /// Address of the first instruction.
    pub fn entry(&self) -> *const u8 {
        self.buffer.region.as_ptr()
    }

    /// Make the buffer writable again.
    pub fn finish(mut self) -> Result<()> {
        self.armed = false;
        self.buffer.set_protection(Protection::ReadWrite)
    }
}

impl Drop for ExecutableCode<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = self.buffer.set_protection(Protection::ReadWrite) {
            // A buffer stuck executable can never be written again.
            eprintln!("rpnjit: {}", err);
            std::process::abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_buffer_is_writable_and_empty() {
        let buffer = CodeBuffer::new(1).expect("map code buffer");
        assert_eq!(buffer.capacity(), page_size());
        assert!(buffer.is_empty());
        assert_eq!(buffer.protection(), Protection::ReadWrite);
        assert_eq!(buffer.pending(), None);
    }

    #[test]
    fn test_zero_pages_rejected() {
        assert!(matches!(CodeBuffer::new(0), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_write_and_reset() {
        let mut buffer = CodeBuffer::new(1).expect("map code buffer");
        buffer.write(Slot::Wide(0x1122_3344_5566_7788)).unwrap();
        assert_eq!(buffer.len(), 8);
        assert_eq!(buffer.bytes(), &[0x88, 0x77, 0x66, 0x55, 0x44, 0x33, 0x22, 0x11]);

        buffer.set_pending(0x90);
        buffer.reset();
        assert!(buffer.is_empty());
        assert_eq!(buffer.pending(), None);
    }

    #[test]
    fn test_write_past_capacity_fails() {
        let mut buffer = CodeBuffer::new(1).expect("map code buffer");
        let slots = buffer.capacity() / 8;
        for _ in 0..slots {
            buffer.write(Slot::Wide(0)).unwrap();
        }
        let err = buffer.write(Slot::Wide(0)).unwrap_err();
        assert!(matches!(err, Error::CodeBufferFull { capacity } if capacity == page_size()));
        assert_eq!(buffer.len(), buffer.capacity());
    }

    #[test]
    fn test_finish_restores_writable() {
        let mut buffer = CodeBuffer::new(1).expect("map code buffer");
        buffer.write(Slot::Wide(0xc3)).unwrap();
        let code = buffer.make_executable().expect("flip to executable");
        assert!(!code.entry().is_null());
        code.finish().expect("flip back");
        assert_eq!(buffer.protection(), Protection::ReadWrite);
        buffer.write(Slot::Wide(0xc3)).unwrap();
    }

    #[test]
    fn test_drop_restores_writable() {
        let mut buffer = CodeBuffer::new(1).expect("map code buffer");
        {
            let _code = buffer.make_executable().expect("flip to executable");
        }
        assert_eq!(buffer.protection(), Protection::ReadWrite);
        buffer.write(Slot::Wide(0)).unwrap();
        assert_eq!(buffer.len(), 8);
    }
}
