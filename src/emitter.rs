//! Instruction emitter: slot packing on top of a [`CodeBuffer`].
//!
//! Narrow instructions are held back until a second one arrives, then both are
//! written as one wide slot. A wide instruction arriving while a narrow one is
//! held back forces the narrow one out, completed with the backend's no-op.
//! Packing changes the size of the generated code, never its meaning.

use core::marker::PhantomData;

use crate::buffer::CodeBuffer;
use crate::common::{Backend, Op, Slot};
use crate::error::Result;
use crate::runtime::Routine;

/// Emits code for backend `B` into a borrowed buffer.
pub struct Emitter<'a, B: Backend> {
    buffer: &'a mut CodeBuffer,
    backend: PhantomData<B>,
}

impl<'a, B: Backend> Emitter<'a, B> {
    pub fn new(buffer: &'a mut CodeBuffer) -> Self {
        Self {
            buffer,
            backend: PhantomData,
        }
    }

    /// Emit one instruction of either size class.
    ///
    /// A narrow instruction waits for a partner to share its wide slot; a
    /// wide one first pads any waiting narrow with the backend's no-op.
    pub fn emit(&mut self, slot: Slot) -> Result<()> {
        match slot {
            Slot::Narrow(op) => match self.buffer.take_pending() {
                Some(low) => self.buffer.write(Slot::pack(low, op)),
                None => {
                    self.buffer.set_pending(op);
                    Ok(())
                }
            },
            Slot::Wide(_) => {
                self.flush()?;
                self.buffer.write(slot)
            }
        }
    }

    /// Emit a 4-byte instruction.
    pub fn narrow(&mut self, op: u32) -> Result<()> {
        self.emit(Slot::Narrow(op))
    }

    /// Emit an 8-byte instruction or raw word.
    pub fn wide(&mut self, op: u64) -> Result<()> {
        self.emit(Slot::Wide(op))
    }

    /// Write out a pending narrow instruction, padded with a no-op.
    ///
    /// Afterwards the buffer ends on a wide slot boundary.
    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.pending().is_some() {
            self.narrow(B::NOP)?;
        }
        Ok(())
    }

    pub fn op(&mut self, op: Op) -> Result<()> {
        B::op(self, op)
    }

    /// Push a literal, picking the short encoding only when the value
    /// survives sign extension from 32 bits.
    pub fn literal(&mut self, value: i64) -> Result<()> {
        match i32::try_from(value) {
            Ok(imm) => B::push_imm32(self, imm),
            Err(_) => B::push_imm64(self, value),
        }
    }

    pub fn call(&mut self, routine: Routine) -> Result<()> {
        B::call(self, routine)
    }

    pub fn buffer(&self) -> &CodeBuffer {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::x86_64::{narrow, wide, X86_64Backend};

    fn slots(code: &[u8]) -> Vec<u64> {
        code.chunks(8)
            .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
            .collect()
    }

    #[test]
    fn test_first_narrow_is_held_back() {
        let mut buffer = CodeBuffer::new(1).unwrap();
        let mut e = Emitter::<X86_64Backend>::new(&mut buffer);
        e.narrow(narrow::DUP).unwrap();
        assert!(e.buffer().is_empty());
        assert_eq!(e.buffer().pending(), Some(narrow::DUP));
    }

    #[test]
    fn test_two_narrows_share_a_slot() {
        let mut buffer = CodeBuffer::new(1).unwrap();
        let mut e = Emitter::<X86_64Backend>::new(&mut buffer);
        e.narrow(narrow::DUP).unwrap();
        e.narrow(narrow::ADD).unwrap();
        assert_eq!(e.buffer().pending(), None);
        assert_eq!(slots(buffer.bytes()), vec![(narrow::ADD as u64) << 32 | narrow::DUP as u64]);
    }

    #[test]
    fn test_wide_pads_pending_narrow() {
        let mut buffer = CodeBuffer::new(1).unwrap();
        let mut e = Emitter::<X86_64Backend>::new(&mut buffer);
        e.narrow(narrow::NEG).unwrap();
        e.wide(wide::MUL).unwrap();
        assert_eq!(
            slots(buffer.bytes()),
            vec![(narrow::NOP as u64) << 32 | narrow::NEG as u64, wide::MUL]
        );
    }

    #[test]
    fn test_emit_takes_both_size_classes() {
        let mut buffer = CodeBuffer::new(1).unwrap();
        let mut e = Emitter::<X86_64Backend>::new(&mut buffer);
        e.emit(Slot::Narrow(narrow::DUP)).unwrap();
        e.emit(Slot::Wide(wide::MUL)).unwrap();
        e.emit(Slot::Narrow(narrow::NEG)).unwrap();
        e.emit(Slot::Narrow(narrow::ADD)).unwrap();
        assert_eq!(
            slots(buffer.bytes()),
            vec![
                (narrow::NOP as u64) << 32 | narrow::DUP as u64,
                wide::MUL,
                (narrow::ADD as u64) << 32 | narrow::NEG as u64,
            ]
        );
    }

    #[test]
    fn test_wide_without_pending_is_not_padded() {
        let mut buffer = CodeBuffer::new(1).unwrap();
        let mut e = Emitter::<X86_64Backend>::new(&mut buffer);
        e.wide(wide::SUB).unwrap();
        e.flush().unwrap();
        assert_eq!(slots(buffer.bytes()), vec![wide::SUB]);
    }

    #[test]
    fn test_flush_ends_on_slot_boundary() {
        let mut buffer = CodeBuffer::new(1).unwrap();
        let mut e = Emitter::<X86_64Backend>::new(&mut buffer);
        e.narrow(narrow::DROP).unwrap();
        e.narrow(narrow::DUP).unwrap();
        e.narrow(narrow::NOT).unwrap();
        e.flush().unwrap();
        e.flush().unwrap();
        assert_eq!(buffer.len(), 16);
        assert_eq!(buffer.pending(), None);
    }

    #[test]
    fn test_literal_selection_at_bounds() {
        let short = [0, -1, i32::MAX as i64, i32::MIN as i64];
        for value in short {
            let mut buffer = CodeBuffer::new(1).unwrap();
            let mut e = Emitter::<X86_64Backend>::new(&mut buffer);
            e.literal(value).unwrap();
            e.flush().unwrap();
            assert_eq!(
                slots(buffer.bytes()),
                vec![(value as i32 as u32 as u64) << 32 | narrow::PUSH_IMM32 as u64],
                "value {} should use the narrow form",
                value
            );
        }

        let long = [i32::MAX as i64 + 1, i32::MIN as i64 - 1, i64::MAX, i64::MIN];
        for value in long {
            let mut buffer = CodeBuffer::new(1).unwrap();
            let mut e = Emitter::<X86_64Backend>::new(&mut buffer);
            e.literal(value).unwrap();
            e.flush().unwrap();
            assert_eq!(
                slots(buffer.bytes()),
                vec![wide::PUSH_IMM64, value as u64],
                "value {} should use the wide form",
                value
            );
        }
    }

    #[test]
    fn test_narrow_literal_straddles_slots() {
        let mut buffer = CodeBuffer::new(1).unwrap();
        let mut e = Emitter::<X86_64Backend>::new(&mut buffer);
        e.narrow(narrow::DUP).unwrap();
        e.literal(0x1234).unwrap();
        e.flush().unwrap();
        let mut expected = Vec::new();
        expected.extend_from_slice(&narrow::DUP.to_le_bytes());
        expected.extend_from_slice(&narrow::PUSH_IMM32.to_le_bytes());
        expected.extend_from_slice(&0x1234u32.to_le_bytes());
        expected.extend_from_slice(&narrow::NOP.to_le_bytes());
        assert_eq!(buffer.bytes(), &expected[..]);
    }
}
