//! Runtime support routines called from generated code.
//!
//! These are ordinary native functions with fixed addresses. Generated code
//! reaches them by loading the address into a register and calling it with
//! the top of stack as the only argument; nothing is returned. Which routine
//! a print instruction targets is decided when it is compiled.
//!
//! Output goes to stdout unless the current thread is inside [`capture`].

use std::cell::RefCell;
use std::io::{self, Write};

use crate::compiler::Radix;

thread_local! {
    static CAPTURE: RefCell<Option<Vec<u8>>> = const { RefCell::new(None) };
}

/// A support routine callable from generated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Routine {
    Ascii,
    Binary,
    Octal,
    Decimal,
    Hex,
}

impl Routine {
    /// The numeric print routine for `radix`.
    pub fn for_radix(radix: Radix) -> Self {
        match radix {
            Radix::Binary => Routine::Binary,
            Radix::Octal => Routine::Octal,
            Radix::Decimal => Routine::Decimal,
            Radix::Hex => Routine::Hex,
        }
    }

    pub fn entry(self) -> extern "C" fn(i64) {
        match self {
            Routine::Ascii => rt_print_ascii,
            Routine::Binary => rt_print_bin,
            Routine::Octal => rt_print_oct,
            Routine::Decimal => rt_print_dec,
            Routine::Hex => rt_print_hex,
        }
    }

    /// Absolute address of the routine, as encoded into generated code.
    pub fn address(self) -> u64 {
        self.entry() as usize as u64
    }
}

extern "C" fn rt_print_ascii(value: i64) {
    emit(&[value as u8, b'\n']);
}

extern "C" fn rt_print_bin(value: i64) {
    emit(format!("{}\n", Radix::Binary.format(value)).as_bytes());
}

extern "C" fn rt_print_oct(value: i64) {
    emit(format!("{}\n", Radix::Octal.format(value)).as_bytes());
}

extern "C" fn rt_print_dec(value: i64) {
    emit(format!("{}\n", Radix::Decimal.format(value)).as_bytes());
}

extern "C" fn rt_print_hex(value: i64) {
    emit(format!("{}\n", Radix::Hex.format(value)).as_bytes());
}

// Called from generated code: must not unwind.
fn emit(bytes: &[u8]) {
    let captured = CAPTURE.with(|capture| match capture.borrow_mut().as_mut() {
        Some(buf) => {
            buf.extend_from_slice(bytes);
            true
        }
        None => false,
    });
    if !captured {
        let mut out = io::stdout().lock();
        let _ = out.write_all(bytes);
        let _ = out.flush();
    }
}

/// Run `f`, collecting everything the support routines print on this thread.
pub fn capture<R>(f: impl FnOnce() -> R) -> (R, String) {
    struct Restore(Option<Vec<u8>>);

    impl Drop for Restore {
        fn drop(&mut self) {
            let previous = self.0.take();
            CAPTURE.with(|capture| *capture.borrow_mut() = previous);
        }
    }

    let restore = Restore(CAPTURE.with(|capture| capture.borrow_mut().replace(Vec::new())));
    let result = f();
    let output = CAPTURE
        .with(|capture| capture.borrow_mut().take())
        .unwrap_or_default();
    drop(restore);
    (result, String::from_utf8_lossy(&output).into_owned())
}
