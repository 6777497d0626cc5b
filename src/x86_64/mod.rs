//! x86-64 instruction set backend.
//!
//! This module provides the x86-64 encoding table for the calculator and the
//! [`X86_64Backend`] that maps stack operations onto it. Encoding is host
//! independent; executing the result requires an x86-64 System V host.
//!
//! ## Register Conventions
//!
//! - **RDI**: cached top of the operand stack (also the argument register,
//!   so support routines receive the top of stack for free)
//! - **RSP**: walks the operand stack while a unit runs
//! - **RBP**: holds the native stack pointer while a unit runs
//! - **RAX, RCX, RDX**: scratch
//!
//! ## Encodings
//!
//! Narrow instructions are exactly 4 bytes and wide ones exactly 8. Shorter
//! machine instructions are padded with redundant-prefix no-ops (`66 90`,
//! `66 66 90`, ...) so every encoding fills its size class.
//!
//! ```rust
//! use rpn_jit::buffer::CodeBuffer;
//! use rpn_jit::common::Op;
//! use rpn_jit::emitter::Emitter;
//! use rpn_jit::x86_64::{narrow, X86_64Backend};
//!
//! let mut buffer = CodeBuffer::new(1).unwrap();
//! let mut e = Emitter::<X86_64Backend>::new(&mut buffer);
//! e.op(Op::Dup).unwrap();
//! e.op(Op::Add).unwrap();
//! assert_eq!(buffer.len(), 8); // both packed into one slot
//! ```

pub mod backend;
pub mod instruction;


pub use backend::X86_64Backend;
pub use instruction::{narrow, wide};
