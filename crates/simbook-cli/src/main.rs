//! simbook CLI - notebook kernels inside a hardware simulator.

mod colors;
mod install;
mod launch;

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};
use simbook_core::config::DEFAULT_CONFIG_NAME;
use simbook_core::kernelspec::DEFAULT_KERNEL_NAME;

#[derive(Parser)]
#[command(name = "simbook")]
#[command(about = "Notebook kernels running inside a hardware simulator")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the kernelspec so Jupyter can start simbook kernels
    #[command(group(ArgGroup::new("location").args(["user", "sys_prefix", "prefix"])))]
    Install {
        /// Install for the current user instead of system-wide
        #[arg(long)]
        user: bool,

        /// Install into the active virtualenv or conda environment
        #[arg(long)]
        sys_prefix: bool,

        /// Install under <PREFIX>/share/jupyter
        #[arg(long)]
        prefix: Option<PathBuf>,

        /// Config file name (without .toml) the kernel looks for
        #[arg(long, default_value = DEFAULT_CONFIG_NAME)]
        config_name: String,

        /// Kernel name shown in Jupyter
        #[arg(long, default_value = DEFAULT_KERNEL_NAME)]
        kernel_name: String,
    },

    /// Build the design and start a kernel inside the simulator
    Launch {
        /// Connection file written by Jupyter
        #[arg(long)]
        connection_file: PathBuf,

        /// Config file name (without .toml) to look for
        #[arg(long, default_value = DEFAULT_CONFIG_NAME)]
        config_name: String,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::DEBUG.into())
    } else {
        tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // Helper to format simbook-core errors with recovery hints
    let format_error = |err: anyhow::Error| -> anyhow::Error {
        if let Some(core_err) = err.downcast_ref::<simbook_core::Error>() {
            anyhow::anyhow!("{}", core_err.with_hint())
        } else {
            err
        }
    };

    match cli.command {
        Commands::Install {
            user,
            sys_prefix,
            prefix,
            config_name,
            kernel_name,
        } => {
            let location = install::location(user, sys_prefix, prefix);
            install::execute(&location, &config_name, &kernel_name).map_err(format_error)?;
        }

        Commands::Launch {
            connection_file,
            config_name,
        } => {
            launch::execute(&connection_file, &config_name).map_err(format_error)?;
        }
    }

    Ok(())
}
