//! Launch command implementation for simbook CLI.
//!
//! Called by Jupyter through the kernelspec argv. Finds the project config,
//! then either hosts the built-in model in this process or builds the design
//! and runs the external simulator, which starts the kernel itself.

use std::path::Path;

use simbook_core::{CommandRunner, KernelOptions, SignalTable, SimConfig, kernel_entry};

use crate::colors;

/// Start a kernel for the config named `config_name`.
pub fn execute(connection_file: &Path, config_name: &str) -> anyhow::Result<()> {
    let config = SimConfig::discover(config_name)?;

    eprintln!(
        "{}simbook{} - {}{}{} on {}",
        colors::BOLD,
        colors::RESET,
        colors::CYAN,
        config.hdl_toplevel,
        colors::RESET,
        config.sim
    );

    if config.is_builtin() {
        let design = SignalTable::from_config(&config)?;
        let options = KernelOptions {
            banner: Some(format!("simbook {} ({})", env!("CARGO_PKG_VERSION"), config.hdl_toplevel)),
            ..KernelOptions::default()
        };
        kernel_entry(design, connection_file, options)?;
        return Ok(());
    }

    let runner = CommandRunner::new(&config)?;
    runner.build()?;
    runner.test(connection_file)?;
    Ok(())
}
