//! Cell language.
//!
//! A cell is a list of line-oriented statements against the design, bound to
//! the name `dut`:
//!
//! ```text
//! # drive the enable and run a few cycles
//! dut.en = 1
//! await 10
//! dut.count
//! ```
//!
//! Parsing happens on the kernel loop; [`Cell::run`] executes all statements
//! on the host as one unit.

use std::fmt;

use crate::design::Design;
use crate::error::{Error, Result};

/// One parsed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    /// `dut.<signal> = <value>`
    Write { signal: String, value: u64 },
    /// `dut.<signal>`
    Read { signal: String },
    /// `await <ticks>` or `step <ticks>`
    Advance(u64),
    /// `time`
    Time,
    /// `signals` or `dir(dut)`
    Signals,
    /// `raise <message>`
    Raise(String),
}

/// A parsed cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    statements: Vec<Statement>,
}

/// Text produced by a cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellOutput {
    pub lines: Vec<String>,
}

impl fmt::Display for CellOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.lines.join("\n"))
    }
}

impl Cell {
    /// Parse cell source.
    pub fn parse(code: &str) -> Result<Self> {
        let mut statements = Vec::new();
        for (index, raw) in code.lines().enumerate() {
            let line = strip_comment(raw).trim();
            if line.is_empty() {
                continue;
            }
            let statement = parse_statement(line).map_err(|message| Error::Parse {
                line: index + 1,
                message,
            })?;
            statements.push(statement);
        }
        Ok(Self { statements })
    }

    /// Parsed statements in source order.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// Whether the cell has nothing to run.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Execute every statement against `design`, stopping at the first error.
    pub fn run<D: Design + ?Sized>(&self, design: &mut D) -> Result<CellOutput> {
        let mut output = CellOutput::default();
        for statement in &self.statements {
            match statement {
                Statement::Write { signal, value } => design.write(signal, *value)?,
                Statement::Read { signal } => {
                    let value = design.read(signal)?;
                    output.lines.push(format!("{signal} = {value}"));
                }
                Statement::Advance(ticks) => design.advance(*ticks)?,
                Statement::Time => output.lines.push(format!("time = {}", design.time())),
                Statement::Signals => {
                    for info in design.signals() {
                        output.lines.push(format!("{} [{}]", info.name, info.width));
                    }
                }
                Statement::Raise(message) => return Err(Error::Execution(message.clone())),
            }
        }
        Ok(output)
    }
}

/// Drop a trailing `#` comment. A `#` inside quotes is kept.
fn strip_comment(line: &str) -> &str {
    let mut quote = None;
    for (i, c) in line.char_indices() {
        match (quote, c) {
            (None, '#') => return &line[..i],
            (None, '\'' | '"') => quote = Some(c),
            (Some(open), _) if c == open => quote = None,
            _ => {}
        }
    }
    line
}

fn parse_statement(line: &str) -> std::result::Result<Statement, String> {
    match line {
        "time" => return Ok(Statement::Time),
        "signals" | "dir(dut)" => return Ok(Statement::Signals),
        _ => {}
    }

    if let Some(rest) = line.strip_prefix("raise") {
        if rest.is_empty() || rest.starts_with(char::is_whitespace) {
            return Ok(Statement::Raise(raise_message(rest.trim())));
        }
    }

    for keyword in ["await", "step"] {
        if let Some(rest) = line.strip_prefix(keyword) {
            if !rest.starts_with(char::is_whitespace) {
                continue;
            }
            let ticks = parse_value(rest.trim())
                .ok_or_else(|| format!("expected a tick count after `{keyword}`"))?;
            return Ok(Statement::Advance(ticks));
        }
    }

    if let Some((lhs, rhs)) = line.split_once('=') {
        let signal = signal_name(lhs.trim())?;
        let value = parse_value(rhs.trim())
            .ok_or_else(|| format!("invalid value `{}`", rhs.trim()))?;
        return Ok(Statement::Write { signal, value });
    }

    if line.starts_with("dut.") {
        return Ok(Statement::Read {
            signal: signal_name(line)?,
        });
    }

    Err(format!("unrecognised statement `{line}`"))
}

fn signal_name(expr: &str) -> std::result::Result<String, String> {
    let name = expr
        .strip_prefix("dut.")
        .ok_or_else(|| format!("expected `dut.<signal>`, got `{expr}`"))?;

    let valid = !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(name.to_string())
    } else {
        Err(format!("invalid signal name `{name}`"))
    }
}

/// `ValueError('x')` and `"x"` both yield `x`; anything else is taken as-is.
fn raise_message(text: &str) -> String {
    let inner = match (text.find('('), text.ends_with(')')) {
        (Some(open), true) => &text[open + 1..text.len() - 1],
        _ => text,
    };
    let inner = inner.trim();
    for quote in ['\'', '"'] {
        if let Some(unquoted) = inner
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return unquoted.to_string();
        }
    }
    inner.to_string()
}

/// Parse decimal, `0x` hex or `0b` binary, allowing `_` separators.
pub fn parse_value(text: &str) -> Option<u64> {
    let digits: String = text.chars().filter(|c| *c != '_').collect();
    if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        u64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = digits
        .strip_prefix("0b")
        .or_else(|| digits.strip_prefix("0B"))
    {
        u64::from_str_radix(bin, 2).ok()
    } else {
        digits.parse().ok()
    }
}
