//! # RPN JIT Calculator
//!
//! A reverse-polish stack calculator that compiles each unit of input
//! straight to native machine code and runs it.
//!
//! ## Features
//!
//! - **No interpreter**: every unit becomes a function over a persistent
//!   operand stack
//! - **Strict W^X**: the code buffer is writable or executable, never both
//! - **Host-independent encoding**: code can be generated and inspected on
//!   any host; running it needs x86-64 System V
//! - **Checked units**: stack depth is computed at compile time, and units
//!   that would overflow (or underflow, if asked) are rejected before running
//!
//! ## Usage
//!
//! ```rust
//! use rpn_jit::runtime;
//! use rpn_jit::Engine;
//!
//! # #[cfg(all(target_arch = "x86_64", unix))] {
//! let mut engine: Engine = Engine::with_defaults().unwrap();
//! let (result, out) = runtime::capture(|| engine.run("3 4 + ."));
//! result.unwrap();
//! assert_eq!(out, "7\n");
//! # }
//! ```

// Encodings and traits shared across backends
pub mod common;

// Backends
pub mod x86_64;

pub mod buffer;
pub mod compiler;
pub mod config;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod runtime;
pub mod stack;
pub mod trampoline;

/// Backend whose code runs on the host.
pub type HostBackend = x86_64::X86_64Backend;

pub use common::{Backend, Op};
pub use compiler::{Radix, StackEffect};
pub use config::{EngineConfig, UnderflowPolicy};
pub use engine::Engine;
pub use error::{Error, Result};
