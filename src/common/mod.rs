//! Common types and traits shared across all target architectures.

use core::fmt;

use crate::emitter::Emitter;
use crate::error::Result;
use crate::runtime::Routine;

pub mod memory;

/// Width in bytes of a narrow instruction.
pub const NARROW: usize = 4;

/// Width in bytes of a wide instruction slot.
pub const WIDE: usize = 8;

/// A machine instruction that can be encoded to bytes
pub trait Instruction: Copy + Clone + fmt::Debug + fmt::Display {
    /// Get the instruction as bytes (little-endian)
    fn bytes(&self) -> Vec<u8>;

    /// Get the size of this instruction in bytes
    fn size(&self) -> usize;
}

/// One encoding slot of generated code.
///
/// Every backend encodes its operations into one of these two size classes.
/// Code is always written to the buffer in wide slots: two narrow
/// instructions emitted back to back are fused with [`Slot::pack`], and a lone
/// narrow is completed with the backend's no-op filler. The emitter takes
/// either class through [`Emitter::emit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    /// 4-byte instruction
    Narrow(u32),
    /// 8-byte instruction, or raw 64-bit data following a wide opcode
    Wide(u64),
}

impl Slot {
    /// Fuse two narrow instructions into one wide slot.
    ///
    /// `low` was emitted first and lands at the lower address.
    pub fn pack(low: u32, high: u32) -> Self {
        Self::Wide((high as u64) << 32 | low as u64)
    }
}

impl Instruction for Slot {
    fn bytes(&self) -> Vec<u8> {
        match self {
            Self::Narrow(val) => val.to_le_bytes().to_vec(),
            Self::Wide(val) => val.to_le_bytes().to_vec(),
        }
    }

    fn size(&self) -> usize {
        match self {
            Self::Narrow(_) => NARROW,
            Self::Wide(_) => WIDE,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Narrow(val) => write!(f, "0x{:08x}", val),
            Self::Wide(val) => write!(f, "0x{:016x}", val),
        }
    }
}

/// Stack operations of the calculator language.
///
/// Binary operations take the second item as the left operand and the top
/// as the right operand, so `10 3 -` is `7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    Drop,
    Dup,
    Swap,
    Neg,
    Add,
    Sub,
    Mul,
    Quo,
    Rem,
    Not,
    And,
    Or,
    Xor,
    Shl,
    Shr,
}

impl Op {
    /// Map a source character to its operation.
    pub fn from_char(c: char) -> Option<Self> {
        let op = match c {
            ';' => Self::Drop,
            ':' => Self::Dup,
            '\\' => Self::Swap,
            '_' => Self::Neg,
            '+' => Self::Add,
            '-' => Self::Sub,
            '*' => Self::Mul,
            '/' => Self::Quo,
            '%' => Self::Rem,
            '~' => Self::Not,
            '&' => Self::And,
            '|' => Self::Or,
            '^' => Self::Xor,
            '<' => Self::Shl,
            '>' => Self::Shr,
            _ => return None,
        };
        Some(op)
    }

    /// Number of values consumed and produced, in that order.
    pub fn arity(self) -> (usize, usize) {
        match self {
            Self::Drop => (1, 0),
            Self::Dup => (1, 2),
            Self::Swap => (2, 2),
            Self::Neg | Self::Not => (1, 1),
            Self::Add
            | Self::Sub
            | Self::Mul
            | Self::Quo
            | Self::Rem
            | Self::And
            | Self::Or
            | Self::Xor
            | Self::Shl
            | Self::Shr => (2, 1),
        }
    }
}

/// An instruction set backend.
///
/// A backend is the encoding table for one CPU architecture. The emitter owns
/// slot packing and literal selection; the backend only decides which bytes
/// implement each contract. Porting the calculator to another architecture
/// means implementing this trait and nothing else.
///
/// Every backend keeps the top of the operand stack cached in a register for
/// the duration of a unit, so the prologue loads it and the epilogue stores it
/// back.
pub trait Backend: Sized {
    /// Human readable architecture name
    const NAME: &'static str;

    /// Whether code from this backend can be executed on the current host
    const NATIVE: bool;

    /// Narrow no-op used to complete a half-filled wide slot
    const NOP: u32;

    /// Enter a unit: receives the operand stack top as its only argument.
    fn prologue(e: &mut Emitter<'_, Self>) -> Result<()>;

    /// Leave a unit: returns the new operand stack top.
    fn epilogue(e: &mut Emitter<'_, Self>) -> Result<()>;

    /// Encode one stack operation.
    fn op(e: &mut Emitter<'_, Self>, op: Op) -> Result<()>;

    /// Push a literal that fits a sign-extended 32-bit immediate.
    fn push_imm32(e: &mut Emitter<'_, Self>, imm: i32) -> Result<()>;

    /// Push a literal that needs the full 64-bit word.
    fn push_imm64(e: &mut Emitter<'_, Self>, value: i64) -> Result<()>;

    /// Call a support routine with the top of stack as its argument, then
    /// drop that value.
    fn call(e: &mut Emitter<'_, Self>, routine: Routine) -> Result<()>;
}

/// Render generated code one wide slot per line.
pub fn format_slots(code: &[u8]) -> String {
    code.chunks(WIDE)
        .enumerate()
        .map(|(i, slot)| {
            let bytes: Vec<String> = slot.iter().map(|b| format!("{:02x}", b)).collect();
            format!("{:04x}: {}", i * WIDE, bytes.join(" "))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pack_places_first_instruction_low() {
        let slot = Slot::pack(0x1122_3344, 0xaabb_ccdd);
        assert_eq!(slot, Slot::Wide(0xaabb_ccdd_1122_3344));
        assert_eq!(slot.bytes(), vec![0x44, 0x33, 0x22, 0x11, 0xdd, 0xcc, 0xbb, 0xaa]);
    }

    #[test]
    fn test_slot_sizes() {
        assert_eq!(Slot::Narrow(0).size(), 4);
        assert_eq!(Slot::Wide(0).size(), 8);
        assert_eq!(Slot::Narrow(0x90).bytes(), vec![0x90, 0, 0, 0]);
    }

    #[test]
    fn test_slot_display() {
        assert_eq!(Slot::Narrow(0x90666666).to_string(), "0x90666666");
        assert_eq!(Slot::Wide(0xc3).to_string(), "0x00000000000000c3");
    }

    #[test]
    fn test_op_table() {
        assert_eq!(Op::from_char(';'), Some(Op::Drop));
        assert_eq!(Op::from_char('\\'), Some(Op::Swap));
        assert_eq!(Op::from_char('>'), Some(Op::Shr));
        assert_eq!(Op::from_char('.'), None);
        assert_eq!(Op::from_char('a'), None);
    }

    #[test]
    fn test_op_arity() {
        assert_eq!(Op::Dup.arity(), (1, 2));
        assert_eq!(Op::Swap.arity(), (2, 2));
        assert_eq!(Op::Rem.arity(), (2, 1));
        assert_eq!(Op::Not.arity(), (1, 1));
        assert_eq!(Op::Drop.arity(), (1, 0));
    }

    #[test]
    fn test_format_slots() {
        let code = [0x55, 0x48, 0x89, 0xe5, 0x48, 0x89, 0xfc, 0x5f, 0xc3];
        assert_eq!(
            format_slots(&code),
            "0000: 55 48 89 e5 48 89 fc 5f\n0008: c3"
        );
    }
}
