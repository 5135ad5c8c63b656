//! Project configuration.
//!
//! The kernel is configured by a `<name>.toml` file (default `simbook.toml`)
//! found by walking up from the working directory:
//!
//! ```toml
//! sim = "verilator"
//! hdl_toplevel = "counter"
//! hdl_toplevel_lang = "verilog"
//!
//! [parameters]
//! WIDTH = 8
//!
//! [build]
//! command = ["make", "-C", "{build_dir}", "TOPLEVEL={toplevel}"]
//! verilog_sources = ["rtl/*.sv"]
//!
//! [test]
//! command = ["./sim_build/Vcounter"]
//! extra_env = { SEED = "1" }
//! ```
//!
//! With `sim = "builtin"` no simulator is launched; the kernel runs in-process
//! against a [`SignalTable`](crate::design::SignalTable) described by
//! `[signals]` and `clock`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

/// Config name used when none is given.
pub const DEFAULT_CONFIG_NAME: &str = "simbook";

/// Simulator name selecting the in-process model.
pub const BUILTIN_SIM: &str = "builtin";

/// Parsed project configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    /// Simulator name, or `builtin`.
    pub sim: String,
    /// Toplevel module/entity.
    pub hdl_toplevel: String,
    /// `verilog` or `vhdl`.
    pub hdl_toplevel_lang: String,
    /// Toplevel parameters / generics.
    #[serde(default)]
    pub parameters: BTreeMap<String, toml::Value>,
    #[serde(default)]
    pub build: BuildOptions,
    #[serde(default)]
    pub test: TestOptions,
    /// Built-in model signals: name to width in bits.
    #[serde(default)]
    pub signals: BTreeMap<String, u32>,
    /// Built-in model clock signal.
    #[serde(default)]
    pub clock: Option<String>,

    /// Directory holding the config file. Relative paths resolve against it.
    #[serde(skip)]
    pub root: PathBuf,
}

/// `[build]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct BuildOptions {
    /// Build command argv template.
    #[serde(default)]
    pub command: Vec<String>,
    /// Verilog source globs.
    #[serde(default)]
    pub verilog_sources: Vec<String>,
    /// VHDL source globs.
    #[serde(default)]
    pub vhdl_sources: Vec<String>,
    /// Build output directory.
    #[serde(default = "default_build_dir")]
    pub build_dir: PathBuf,
}

fn default_build_dir() -> PathBuf {
    PathBuf::from("sim_build")
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            command: Vec::new(),
            verilog_sources: Vec::new(),
            vhdl_sources: Vec::new(),
            build_dir: default_build_dir(),
        }
    }
}

/// `[test]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestOptions {
    /// Simulator launch argv template.
    #[serde(default)]
    pub command: Vec<String>,
    /// Extra environment for the simulator process.
    #[serde(default)]
    pub extra_env: BTreeMap<String, String>,
}

impl SimConfig {
    /// Parse config text. `root` is the directory relative paths resolve to.
    pub fn parse(text: &str, root: impl Into<PathBuf>) -> Result<Self> {
        let mut config: Self =
            toml::from_str(text).map_err(|e| Error::Config(e.message().to_string()))?;
        config.root = root.into();
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let root = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        Self::parse(&text, root).map_err(|e| match e {
            Error::Config(message) => Error::Config(format!("{}: {}", path.display(), message)),
            other => other,
        })
    }

    /// Find `<name>.toml` from the current directory upwards and load it.
    pub fn discover(name: &str) -> Result<Self> {
        let start = std::env::current_dir()?;
        let path = find_config(&start, name).ok_or_else(|| Error::ConfigNotFound {
            name: name.to_string(),
            start: start.clone(),
        })?;
        tracing::info!("using config {}", path.display());
        Self::load(&path)
    }

    /// Whether the in-process model is selected.
    pub fn is_builtin(&self) -> bool {
        self.sim == BUILTIN_SIM
    }

    /// Build directory, resolved against the config root.
    pub fn build_dir(&self) -> PathBuf {
        self.root.join(&self.build.build_dir)
    }

    /// Parameters rendered as `NAME=VALUE`.
    pub fn parameter_args(&self) -> Vec<String> {
        self.parameters
            .iter()
            .map(|(name, value)| match value {
                toml::Value::String(s) => format!("{name}={s}"),
                other => format!("{name}={other}"),
            })
            .collect()
    }

    fn validate(&self) -> Result<()> {
        if self.hdl_toplevel.is_empty() {
            return Err(Error::Config("hdl_toplevel must not be empty".to_string()));
        }
        if self.is_builtin() {
            return Ok(());
        }
        if self.build.command.is_empty() {
            return Err(Error::Config(format!(
                "[build].command is required for sim = \"{}\"",
                self.sim
            )));
        }
        if self.test.command.is_empty() {
            return Err(Error::Config(format!(
                "[test].command is required for sim = \"{}\"",
                self.sim
            )));
        }
        Ok(())
    }
}

/// Look for `<name>.toml` in `start` and each of its ancestors.
pub fn find_config(start: &Path, name: &str) -> Option<PathBuf> {
    let file_name = format!("{name}.toml");
    start
        .ancestors()
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
}
