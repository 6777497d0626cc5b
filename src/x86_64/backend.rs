//! Stack operations lowered to the x86-64 encoding table.

use super::instruction::{narrow, wide};
use crate::common::{Backend, Op};
use crate::emitter::Emitter;
use crate::error::Result;
use crate::runtime::Routine;

/// Backend for x86-64 hosts using the System V calling convention.
#[derive(Debug, Clone, Copy, Default)]
pub struct X86_64Backend;

impl Backend for X86_64Backend {
    const NAME: &'static str = "x86-64";
    const NATIVE: bool = cfg!(all(target_arch = "x86_64", unix));
    const NOP: u32 = narrow::NOP;

    fn prologue(e: &mut Emitter<'_, Self>) -> Result<()> {
        e.wide(wide::PROLOGUE)
    }

    fn epilogue(e: &mut Emitter<'_, Self>) -> Result<()> {
        e.wide(wide::EPILOGUE)?;
        e.wide(wide::RET)
    }

    fn op(e: &mut Emitter<'_, Self>, op: Op) -> Result<()> {
        match op {
            Op::Drop => e.narrow(narrow::DROP),
            Op::Dup => e.narrow(narrow::DUP),
            Op::Swap => e.narrow(narrow::SWAP),
            Op::Neg => e.narrow(narrow::NEG),
            Op::Add => e.narrow(narrow::ADD),
            Op::Sub => e.wide(wide::SUB),
            Op::Mul => e.wide(wide::MUL),
            Op::Quo => {
                e.wide(wide::DIV)?;
                e.narrow(narrow::QUO)
            }
            Op::Rem => {
                e.wide(wide::DIV)?;
                e.narrow(narrow::REM)
            }
            Op::Not => e.narrow(narrow::NOT),
            Op::And => e.narrow(narrow::AND),
            Op::Or => e.narrow(narrow::OR),
            Op::Xor => e.narrow(narrow::XOR),
            Op::Shl => e.wide(wide::SHL),
            Op::Shr => e.wide(wide::SHR),
        }
    }

    fn push_imm32(e: &mut Emitter<'_, Self>, imm: i32) -> Result<()> {
        // The immediate must directly follow the opcode head. Narrow
        // instructions are laid out in emission order, so this holds whether
        // or not the head starts a new slot.
        e.narrow(narrow::PUSH_IMM32)?;
        e.narrow(imm as u32)
    }

    fn push_imm64(e: &mut Emitter<'_, Self>, value: i64) -> Result<()> {
        e.wide(wide::PUSH_IMM64)?;
        e.wide(value as u64)
    }

    fn call(e: &mut Emitter<'_, Self>, routine: Routine) -> Result<()> {
        e.wide(wide::CALL_SETUP)?;
        e.wide(routine.address())?;
        e.wide(wide::CALL)
    }
}
