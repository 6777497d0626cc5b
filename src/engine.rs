//! The calculator engine: compiles units and runs them against a persistent
//! operand stack.

use core::marker::PhantomData;

use crate::buffer::CodeBuffer;
use crate::common::Backend;
use crate::compiler::{self, CompilerState, Radix, StackEffect};
use crate::config::{EngineConfig, UnderflowPolicy};
use crate::emitter::Emitter;
use crate::error::{Error, Result};
use crate::stack::OperandStack;
use crate::trampoline;
use crate::HostBackend;

/// Owns the code buffer, the operand stack and the radix that carries over
/// between units.
///
/// ```rust
/// # #[cfg(all(target_arch = "x86_64", unix))] {
/// use rpn_jit::Engine;
///
/// let mut engine: Engine = Engine::with_defaults().unwrap();
/// engine.run("6 7 *").unwrap();
/// engine.run("X").unwrap();
/// assert_eq!(engine.values(), vec![42]);
/// assert_eq!(engine.prompt(), "[2a] ");
/// # }
/// ```
#[derive(Debug)]
pub struct Engine<B: Backend = HostBackend> {
    config: EngineConfig,
    state: CompilerState,
    code: CodeBuffer,
    stack: OperandStack,
    backend: PhantomData<B>,
}

impl<B: Backend> Engine<B> {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            state: CompilerState {
                radix: config.radix,
            },
            code: CodeBuffer::new(config.code_pages)?,
            stack: OperandStack::new(config.stack_pages)?,
            config,
            backend: PhantomData,
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(EngineConfig::default())
    }

    /// Compile one unit into the code buffer without running it.
    ///
    /// On failure the radix is left as it was before the unit.
    pub fn compile(&mut self, text: &str) -> Result<StackEffect> {
        let saved = self.state;
        self.code.reset();
        let result = compile_unit::<B>(text, &mut self.state, &mut self.code);
        if result.is_err() {
            self.state = saved;
            self.code.reset();
        }
        result
    }

    /// Machine code of the last compiled unit.
    pub fn code(&self) -> &[u8] {
        self.code.bytes()
    }

    /// Compile and run one unit.
    ///
    /// A unit that cannot run safely is rejected before any of it executes,
    /// leaving the stack and the radix untouched.
    pub fn run(&mut self, text: &str) -> Result<StackEffect> {
        if !B::NATIVE {
            return Err(Error::ForeignBackend { backend: B::NAME });
        }
        let saved = self.state;
        let effect = self.compile(text)?;
        if let Err(err) = self.admit(&effect) {
            self.state = saved;
            return Err(err);
        }
        // SAFETY: the unit was framed by `compile_unit` for the host backend
        // and `admit` made sure the stack covers its whole stack effect.
        let clamped = unsafe { trampoline::execute(&mut self.code, &mut self.stack)? };
        debug_assert!(!clamped, "unit returned a top above the stack limit");
        Ok(effect)
    }

    /// Check a compiled unit against the stack. Under the zero policy the
    /// values it would read past the bottom are supplied as zeros there.
    fn admit(&mut self, effect: &StackEffect) -> Result<()> {
        let depth = self.stack.depth();
        let missing = effect.needs.saturating_sub(depth);
        if missing > 0 && self.config.underflow == UnderflowPolicy::Reject {
            return Err(Error::StackUnderflow {
                needed: effect.needs,
                available: depth,
            });
        }
        let required = depth + missing + effect.peak;
        if required > self.stack.capacity() {
            return Err(Error::StackOverflow {
                required,
                capacity: self.stack.capacity(),
            });
        }
        self.stack.pad_bottom(missing)
    }

    /// Stack contents, bottom first.
    pub fn values(&self) -> Vec<i64> {
        self.stack.values()
    }

    pub fn depth(&self) -> usize {
        self.stack.depth()
    }

    pub fn radix(&self) -> Radix {
        self.state.radix
    }

    pub fn set_radix(&mut self, radix: Radix) {
        self.state.radix = radix;
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Empty the operand stack. The radix is kept.
    pub fn clear(&mut self) {
        self.stack.clear();
    }

    /// The interactive prompt: the stack, bottom first, in the current radix.
    pub fn prompt(&self) -> String {
        let values: Vec<String> = self
            .values()
            .into_iter()
            .map(|v| self.state.radix.format(v))
            .collect();
        format!("[{}] ", values.join(" "))
    }
}

fn compile_unit<B: Backend>(
    text: &str,
    state: &mut CompilerState,
    code: &mut CodeBuffer,
) -> Result<StackEffect> {
    let mut e = Emitter::<B>::new(code);
    trampoline::enter(&mut e)?;
    let effect = compiler::compile(text, state, &mut e)?;
    trampoline::leave(&mut e)?;
    Ok(effect)
}
