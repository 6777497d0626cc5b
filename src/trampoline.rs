//! Framing and invocation of compiled units.
//!
//! A unit is compiled as a function `extern "C" fn(top: *mut i64) -> *mut i64`:
//! it receives the operand stack's top pointer and returns the new one. The
//! backend's prologue and epilogue do the switch between the native stack and
//! the operand stack.

use crate::buffer::CodeBuffer;
use crate::common::Backend;
use crate::emitter::Emitter;
use crate::error::Result;
use crate::stack::OperandStack;

type UnitFn = unsafe extern "C" fn(*mut i64) -> *mut i64;

/// Emit the code that runs before a unit's body.
pub fn enter<B: Backend>(e: &mut Emitter<'_, B>) -> Result<()> {
    B::prologue(e)
}

/// Emit the code that returns from a unit. Leaves nothing pending.
pub fn leave<B: Backend>(e: &mut Emitter<'_, B>) -> Result<()> {
    B::epilogue(e)?;
    e.flush()
}

/// Run the unit in `code` against `stack`.
///
/// Returns whether the resulting top pointer had to be clamped to the stack
/// limit.
///
/// # Safety
///
/// `code` must hold a complete unit framed by [`enter`] and [`leave`] for the
/// host backend, and the stack must have room for everything the unit pushes
/// and hold everything it pops.
pub unsafe fn execute(code: &mut CodeBuffer, stack: &mut OperandStack) -> Result<bool> {
    let exec = code.make_executable()?;
    let entry = exec.entry();
    let unit: UnitFn = std::mem::transmute_copy(&entry);
    let top = unit(stack.top());
    let clamped = stack.set_top(top);
    exec.finish()?;
    Ok(clamped)
}
