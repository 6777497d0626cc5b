//! Lexer and compiler for the calculator language.
//!
//! The language is character driven: every operator is a single character,
//! and the only multi-character tokens are numerals and quoted characters.
//! Nothing is ever rejected; characters that mean nothing are skipped.
//!
//! | token                   | effect                                   |
//! |-------------------------|------------------------------------------|
//! | digits (active radix)   | push literal                             |
//! | `'` + char              | push the character's code point          |
//! | `B` `O` `D` `X`         | radix 2 / 8 / 10 / 16                    |
//! | `;` `:` `\` `_`         | drop / dup / swap / negate               |
//! | `+` `-` `*` `/` `%`     | add / sub / mul / quotient / remainder   |
//! | `~` `&` `\|` `^` `<` `>`| not / and / or / xor / shl / shr         |
//! | `,`                     | print top as a character                 |
//! | `.`                     | print top as a number in the active radix|

use core::fmt;
use core::str::FromStr;

use crate::common::{Backend, Op};
use crate::emitter::Emitter;
use crate::error::{Error, Result};
use crate::runtime::Routine;

/// Numeral base for literals, printing and the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Radix {
    Binary,
    Octal,
    #[default]
    Decimal,
    Hex,
}

impl Radix {
    /// The radix selected by a switch character, if `c` is one.
    pub fn from_switch(c: char) -> Option<Self> {
        match c {
            'B' => Some(Radix::Binary),
            'O' => Some(Radix::Octal),
            'D' => Some(Radix::Decimal),
            'X' => Some(Radix::Hex),
            _ => None,
        }
    }

    pub fn base(self) -> u32 {
        match self {
            Radix::Binary => 2,
            Radix::Octal => 8,
            Radix::Decimal => 10,
            Radix::Hex => 16,
        }
    }

    /// Format a value the way the print routines do. Decimal is signed; the
    /// other bases show the two's complement bit pattern.
    pub fn format(self, value: i64) -> String {
        match self {
            Radix::Binary => format!("{:b}", value),
            Radix::Octal => format!("{:o}", value),
            Radix::Decimal => format!("{}", value),
            Radix::Hex => format!("{:x}", value),
        }
    }

    /// Parse the numeral at the start of `s`.
    ///
    /// Returns the value and the number of bytes consumed, or `None` if `s`
    /// does not start with a digit of this radix. Digits are case
    /// insensitive, hex accepts a `0x` prefix, and values too large for a
    /// machine word saturate at `i64::MAX`.
    pub fn parse_prefix(self, s: &str) -> Option<(i64, usize)> {
        let bytes = s.as_bytes();
        let base = self.base();
        let digit = |i: usize| bytes.get(i).and_then(|&b| (b as char).to_digit(base));

        let mut i = 0;
        if self == Radix::Hex
            && bytes.len() > 2
            && bytes[0] == b'0'
            && (bytes[1] == b'x' || bytes[1] == b'X')
            && digit(2).is_some()
        {
            i = 2;
        }

        let start = i;
        let mut value: i64 = 0;
        while let Some(d) = digit(i) {
            value = value
                .checked_mul(base as i64)
                .and_then(|v| v.checked_add(d as i64))
                .unwrap_or(i64::MAX);
            i += 1;
        }
        (i > start).then_some((value, i))
    }
}

impl fmt::Display for Radix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base())
    }
}

impl TryFrom<u32> for Radix {
    type Error = Error;

    fn try_from(base: u32) -> Result<Self> {
        match base {
            2 => Ok(Radix::Binary),
            8 => Ok(Radix::Octal),
            10 => Ok(Radix::Decimal),
            16 => Ok(Radix::Hex),
            _ => Err(Error::InvalidConfig(format!(
                "radix must be 2, 8, 10 or 16, not {}",
                base
            ))),
        }
    }
}

impl FromStr for Radix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let base: u32 = s
            .trim()
            .parse()
            .map_err(|_| Error::InvalidConfig(format!("invalid radix '{}'", s)))?;
        Radix::try_from(base)
    }
}

/// State that outlives a single unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompilerState {
    pub radix: Radix,
}

/// How a unit moves the operand stack, measured from its starting depth.
///
/// The language has no branches, so this is exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StackEffect {
    /// Values the unit reads below its starting top
    pub needs: usize,
    /// Highest depth reached above the starting depth
    pub peak: usize,
    /// Final depth change
    pub net: isize,
}

impl StackEffect {
    fn apply(&mut self, pops: usize, pushes: usize) {
        self.net -= pops as isize;
        self.needs = self.needs.max((-self.net).max(0) as usize);
        self.net += pushes as isize;
        self.peak = self.peak.max(self.net.max(0) as usize);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    Literal(i64),
    Radix(Radix),
    Op(Op),
    PrintChar,
    PrintNumber,
}

/// Splits one unit of source into tokens.
///
/// The lexer follows radix switches itself, because they change how the
/// numerals after them are read.
pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    radix: Radix,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str, radix: Radix) -> Self {
        Self { src, pos: 0, radix }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.src[self.pos..].chars().next()?;
        self.pos += c.len_utf8();
        Some(c)
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            let start = self.pos;
            let c = self.bump()?;
            if c.is_whitespace() {
                continue;
            }
            if c == '\'' {
                // A quote at the very end quotes nothing.
                return self.bump().map(|q| Token::Literal(q as i64));
            }
            if let Some(radix) = Radix::from_switch(c) {
                self.radix = radix;
                return Some(Token::Radix(radix));
            }
            if let Some(op) = Op::from_char(c) {
                return Some(Token::Op(op));
            }
            match c {
                ',' => return Some(Token::PrintChar),
                '.' => return Some(Token::PrintNumber),
                _ => {}
            }
            if let Some((value, len)) = self.radix.parse_prefix(&self.src[start..]) {
                self.pos = start + len;
                return Some(Token::Literal(value));
            }
        }
    }
}

/// Compile the body of one unit.
///
/// Framing (prologue and epilogue) is the trampoline's job; this emits only
/// the unit's own instructions and leaves any half-instruction pending.
pub fn compile<B: Backend>(
    text: &str,
    state: &mut CompilerState,
    e: &mut Emitter<'_, B>,
) -> Result<StackEffect> {
    let mut effect = StackEffect::default();
    for token in Lexer::new(text, state.radix) {
        match token {
            Token::Literal(value) => {
                e.literal(value)?;
                effect.apply(0, 1);
            }
            Token::Radix(radix) => state.radix = radix,
            Token::Op(op) => {
                e.op(op)?;
                let (pops, pushes) = op.arity();
                effect.apply(pops, pushes);
            }
            Token::PrintChar => {
                e.call(Routine::Ascii)?;
                effect.apply(1, 0);
            }
            Token::PrintNumber => {
                e.call(Routine::for_radix(state.radix))?;
                effect.apply(1, 0);
            }
        }
    }
    Ok(effect)
}
