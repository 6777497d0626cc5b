//! Engine configuration
//!
//! Defaults, overridden by environment variables, overridden in turn by
//! whatever the front end sets explicitly.

use core::fmt;
use core::str::FromStr;

use crate::compiler::Radix;
use crate::error::{Error, Result};

/// Environment variable names
pub mod names {
    /// Usable operand stack pages: `RPNJIT_STACK_PAGES`
    pub const STACK_PAGES: &str = "RPNJIT_STACK_PAGES";

    /// Code buffer pages: `RPNJIT_CODE_PAGES`
    pub const CODE_PAGES: &str = "RPNJIT_CODE_PAGES";

    /// Underflow policy, `zero` or `reject`: `RPNJIT_UNDERFLOW`
    pub const UNDERFLOW: &str = "RPNJIT_UNDERFLOW";
}

/// What to do with a unit that pops more values than the stack holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnderflowPolicy {
    /// Missing values read as zero.
    #[default]
    Zero,
    /// The unit is rejected before any of it runs.
    Reject,
}

impl FromStr for UnderflowPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" => Ok(UnderflowPolicy::Zero),
            "reject" => Ok(UnderflowPolicy::Reject),
            other => Err(Error::InvalidConfig(format!(
                "unknown underflow policy '{}' (expected zero or reject)",
                other
            ))),
        }
    }
}

impl fmt::Display for UnderflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnderflowPolicy::Zero => write!(f, "zero"),
            UnderflowPolicy::Reject => write!(f, "reject"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Usable operand stack pages, not counting guard and slack pages
    pub stack_pages: usize,
    /// Code buffer pages
    pub code_pages: usize,
    pub underflow: UnderflowPolicy,
    /// Radix in effect before the first unit
    pub radix: Radix,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stack_pages: 4,
            code_pages: 1,
            underflow: UnderflowPolicy::Zero,
            radix: Radix::Decimal,
        }
    }
}

impl EngineConfig {
    /// Defaults with any `RPNJIT_*` environment variables applied.
    pub fn from_env() -> Result<Self> {
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    /// Apply overrides looked up by variable name.
    pub fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(value) = lookup(names::STACK_PAGES) {
            self.stack_pages = parse_pages(names::STACK_PAGES, &value)?;
        }
        if let Some(value) = lookup(names::CODE_PAGES) {
            self.code_pages = parse_pages(names::CODE_PAGES, &value)?;
        }
        if let Some(value) = lookup(names::UNDERFLOW) {
            self.underflow = value.parse()?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.stack_pages < 2 {
            return Err(Error::InvalidConfig(format!(
                "operand stack needs at least 2 pages, got {}",
                self.stack_pages
            )));
        }
        if self.code_pages == 0 {
            return Err(Error::InvalidConfig("code buffer needs at least one page".into()));
        }
        Ok(())
    }
}

fn parse_pages(name: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("{} must be a page count, not '{}'", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.stack_pages, 4);
        assert_eq!(config.code_pages, 1);
        assert_eq!(config.underflow, UnderflowPolicy::Zero);
        assert_eq!(config.radix, Radix::Decimal);
        config.validate().unwrap();
    }

    #[test]
    fn test_overlay() {
        let config = EngineConfig::default()
            .overlay(env(&[
                (names::STACK_PAGES, "8"),
                (names::CODE_PAGES, " 2 "),
                (names::UNDERFLOW, "Reject"),
            ]))
            .unwrap();
        assert_eq!(config.stack_pages, 8);
        assert_eq!(config.code_pages, 2);
        assert_eq!(config.underflow, UnderflowPolicy::Reject);
    }

    #[test]
    fn test_overlay_without_variables_keeps_defaults() {
        let config = EngineConfig::default().overlay(env(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_bad_values() {
        let err = EngineConfig::default()
            .overlay(env(&[(names::STACK_PAGES, "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains(names::STACK_PAGES));
        assert!(EngineConfig::default()
            .overlay(env(&[(names::UNDERFLOW, "wrap")]))
            .is_err());
    }

    #[test]
    fn test_validate() {
        let config = EngineConfig {
            stack_pages: 1,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
        let config = EngineConfig {
            code_pages: 0,
            ..EngineConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_policy_display_round_trips() {
        for policy in [UnderflowPolicy::Zero, UnderflowPolicy::Reject] {
            assert_eq!(policy.to_string().parse::<UnderflowPolicy>().unwrap(), policy);
        }
    }
}
