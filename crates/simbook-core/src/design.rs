//! Design handle exposed to notebook cells.
//!
//! [`Design`] is the host-side view of the simulated toplevel: named signals
//! that can be read and driven, and a simulation clock. Simulator bindings
//! implement it; [`SignalTable`] is the built-in model used for
//! `sim = "builtin"` and in tests.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::SimConfig;
use crate::error::{Error, Result};

/// A signal visible on the design.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalInfo {
    /// Hierarchical name below the toplevel (e.g. `count`, `core.state`).
    pub name: String,
    /// Width in bits.
    pub width: u32,
}

/// A simulated design the host scheduler owns.
pub trait Design: Send + 'static {
    /// Toplevel name.
    fn name(&self) -> &str;

    /// All signals, sorted by name.
    fn signals(&self) -> Vec<SignalInfo>;

    /// Current value of a signal.
    fn read(&self, signal: &str) -> Result<u64>;

    /// Drive a signal.
    fn write(&mut self, signal: &str, value: u64) -> Result<()>;

    /// Advance simulation time by `ticks`.
    fn advance(&mut self, ticks: u64) -> Result<()>;

    /// Current simulation time in ticks.
    fn time(&self) -> u64;
}

#[derive(Debug, Clone)]
struct Signal {
    width: u32,
    value: u64,
}

impl Signal {
    fn fits(&self, value: u64) -> bool {
        self.width >= 64 || value >> self.width == 0
    }
}

/// In-memory design: a table of fixed-width signals and a tick counter.
///
/// If a clock is configured it toggles once per tick.
#[derive(Debug, Clone)]
pub struct SignalTable {
    name: String,
    signals: BTreeMap<String, Signal>,
    clock: Option<String>,
    time: u64,
}

impl SignalTable {
    /// Create an empty design named `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            signals: BTreeMap::new(),
            clock: None,
            time: 0,
        }
    }

    /// Build the design described by `[signals]` and `clock` in a config.
    pub fn from_config(config: &SimConfig) -> Result<Self> {
        let mut table = Self::new(&config.hdl_toplevel);
        for (name, width) in &config.signals {
            table.add_signal(name, *width)?;
        }
        if let Some(clock) = &config.clock {
            table.set_clock(clock)?;
        }
        Ok(table)
    }

    /// Builder form of [`add_signal`](Self::add_signal).
    pub fn with_signal(mut self, name: &str, width: u32) -> Result<Self> {
        self.add_signal(name, width)?;
        Ok(self)
    }

    /// Add a signal initialised to zero.
    pub fn add_signal(&mut self, name: &str, width: u32) -> Result<()> {
        if !(1..=64).contains(&width) {
            return Err(Error::Config(format!(
                "signal {name} has width {width}, expected 1 to 64 bits"
            )));
        }
        self.signals
            .insert(name.to_string(), Signal { width, value: 0 });
        Ok(())
    }

    /// Make `name` a clock that toggles every tick.
    pub fn set_clock(&mut self, name: &str) -> Result<()> {
        if !self.signals.contains_key(name) {
            self.add_signal(name, 1)?;
        }
        self.clock = Some(name.to_string());
        Ok(())
    }

    fn signal(&self, name: &str) -> Result<&Signal> {
        self.signals
            .get(name)
            .ok_or_else(|| Error::SignalNotFound(name.to_string()))
    }
}

impl Design for SignalTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn signals(&self) -> Vec<SignalInfo> {
        self.signals
            .iter()
            .map(|(name, signal)| SignalInfo {
                name: name.clone(),
                width: signal.width,
            })
            .collect()
    }

    fn read(&self, signal: &str) -> Result<u64> {
        self.signal(signal).map(|s| s.value)
    }

    fn write(&mut self, signal: &str, value: u64) -> Result<()> {
        let entry = self
            .signals
            .get_mut(signal)
            .ok_or_else(|| Error::SignalNotFound(signal.to_string()))?;
        if !entry.fits(value) {
            return Err(Error::ValueOutOfRange {
                signal: signal.to_string(),
                value,
                width: entry.width,
            });
        }
        entry.value = value;
        Ok(())
    }

    fn advance(&mut self, ticks: u64) -> Result<()> {
        if let Some(clock) = &self.clock {
            if ticks % 2 == 1 {
                if let Some(signal) = self.signals.get_mut(clock) {
                    signal.value ^= 1;
                }
            }
        }
        self.time = self.time.saturating_add(ticks);
        Ok(())
    }

    fn time(&self) -> u64 {
        self.time
    }
}
