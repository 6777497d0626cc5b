use std::ffi::OsString;
use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use rpn_jit::common::format_slots;
use rpn_jit::{Engine, EngineConfig, Radix, StackEffect, UnderflowPolicy};

#[derive(Parser)]
#[command(
    name = "rpnjit",
    version,
    about = "RPN calculator that compiles every line to native code"
)]
struct Cli {
    /// Initial radix: 2, 8, 10 or 16
    #[arg(long, value_parser = parse_radix)]
    radix: Option<Radix>,

    /// Usable operand stack pages (also RPNJIT_STACK_PAGES)
    #[arg(long = "stack-pages")]
    stack_pages: Option<usize>,

    /// Code buffer pages (also RPNJIT_CODE_PAGES)
    #[arg(long = "code-pages")]
    code_pages: Option<usize>,

    /// What to do when a unit pops from an empty stack (also RPNJIT_UNDERFLOW)
    #[arg(long, value_enum)]
    underflow: Option<Underflow>,

    /// Write each unit's machine code to stderr
    #[arg(long)]
    dump: bool,

    /// Write per-unit diagnostics to stderr
    #[arg(long)]
    verbose: bool,

    /// Units to run in order; reads stdin interactively if none are given
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    units: Vec<OsString>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Underflow {
    /// Missing values read as zero
    Zero,
    /// Refuse to run the unit
    Reject,
}

impl From<Underflow> for UnderflowPolicy {
    fn from(value: Underflow) -> Self {
        match value {
            Underflow::Zero => UnderflowPolicy::Zero,
            Underflow::Reject => UnderflowPolicy::Reject,
        }
    }
}

fn parse_radix(s: &str) -> std::result::Result<Radix, String> {
    s.parse().map_err(|e: rpn_jit::Error| e.to_string())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = EngineConfig::from_env().context("Failed to read RPNJIT_* environment")?;
    if let Some(radix) = cli.radix {
        config.radix = radix;
    }
    if let Some(pages) = cli.stack_pages {
        config.stack_pages = pages;
    }
    if let Some(pages) = cli.code_pages {
        config.code_pages = pages;
    }
    if let Some(underflow) = cli.underflow {
        config.underflow = underflow.into();
    }
    if cli.verbose {
        eprintln!("rpnjit: config {:?}", config);
    }

    let mut engine: Engine = Engine::new(config).context("Failed to set up the engine")?;

    if cli.units.is_empty() {
        interactive(&mut engine, &cli, io::stdin().lock(), io::stdout())
    } else {
        batch(&mut engine, &cli)
    }
}

/// Run the command line units in order. Bytes that are not UTF-8 become
/// replacement characters, which the compiler skips.
fn batch(engine: &mut Engine, cli: &Cli) -> Result<()> {
    for (i, unit) in cli.units.iter().enumerate() {
        let text = unit.to_string_lossy();
        let effect = engine
            .run(&text)
            .with_context(|| format!("Unit {} ({:?}) failed", i + 1, text))?;
        report(engine, cli, effect);
    }
    Ok(())
}

/// Prompt, read one line, run it, until `input` runs dry.
///
/// Lines are raw bytes; only a failing read or write ends the session early.
fn interactive<R: BufRead, W: Write>(
    engine: &mut Engine,
    cli: &Cli,
    mut input: R,
    mut out: W,
) -> Result<()> {
    let mut line = Vec::new();
    loop {
        write!(out, "{}", engine.prompt()).context("Failed to write prompt")?;
        out.flush().context("Failed to flush stdout")?;

        line.clear();
        if input.read_until(b'\n', &mut line).context("Failed to read stdin")? == 0 {
            break;
        }
        let bytes = line.strip_suffix(b"\n").unwrap_or(&line[..]);
        let text = String::from_utf8_lossy(bytes);
        match engine.run(&text) {
            Ok(effect) => report(engine, cli, effect),
            Err(err) if err.is_recoverable() => eprintln!("rpnjit: {}", err),
            Err(err) => return Err(err).context("Engine failed"),
        }
    }
    Ok(())
}

fn report(engine: &Engine, cli: &Cli, effect: StackEffect) {
    if cli.verbose {
        eprintln!(
            "rpnjit: {} bytes, needs {}, peak {}, net {:+}, depth {}",
            engine.code().len(),
            effect.needs,
            effect.peak,
            effect.net,
            engine.depth()
        );
    }
    if cli.dump {
        eprintln!("{}", format_slots(engine.code()));
    }
}
