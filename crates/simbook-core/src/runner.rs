//! External simulator invocation.
//!
//! Builds the design and launches the simulator by running the argv
//! templates from `[build]` and `[test]`. The simulator is expected to embed
//! simbook and call [`kernel_entry_from_env`](crate::entry::kernel_entry_from_env)
//! from its test scheduler.
//!
//! Placeholders expanded in each argument:
//!
//! - `{toplevel}`, `{toplevel_lang}`, `{build_dir}`, `{connection_file}`
//! - `{verilog_sources}`, `{vhdl_sources}`, `{parameters}` - only as a whole
//!   argument; each expands to zero or more arguments

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::SimConfig;
use crate::entry::CONNECTION_FILE_ENV;
use crate::error::{Error, Result};

/// Expand glob patterns relative to `base` into sorted absolute paths.
///
/// A pattern that matches nothing is an error.
pub fn resolve_sources(base: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut resolved = Vec::new();
    for pattern in patterns {
        let full = if Path::new(pattern).is_absolute() {
            PathBuf::from(pattern)
        } else {
            base.join(pattern)
        };
        let full = full.to_string_lossy().to_string();

        let entries = glob::glob(&full)
            .map_err(|e| Error::Config(format!("invalid source pattern {pattern}: {e}")))?;
        let mut matched: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    tracing::warn!("skipping unreadable source: {}", e);
                    None
                }
            })
            .collect();

        if matched.is_empty() {
            return Err(Error::Config(format!("no sources match {pattern}")));
        }
        matched.sort();
        resolved.extend(matched);
    }
    Ok(resolved)
}

/// Runs the configured build and launch commands.
pub struct CommandRunner<'a> {
    config: &'a SimConfig,
    verilog_sources: Vec<String>,
    vhdl_sources: Vec<String>,
}

impl<'a> CommandRunner<'a> {
    /// Prepare a runner, resolving source globs up front.
    pub fn new(config: &'a SimConfig) -> Result<Self> {
        let to_strings = |paths: Vec<PathBuf>| {
            paths
                .into_iter()
                .map(|p| p.to_string_lossy().to_string())
                .collect()
        };
        Ok(Self {
            verilog_sources: to_strings(resolve_sources(
                &config.root,
                &config.build.verilog_sources,
            )?),
            vhdl_sources: to_strings(resolve_sources(&config.root, &config.build.vhdl_sources)?),
            config,
        })
    }

    /// Run the build command.
    pub fn build(&self) -> Result<()> {
        let argv = self.expand(&self.config.build.command, None);
        tracing::info!("building {}", self.config.hdl_toplevel);
        self.run(&argv, &[]).map_err(|e| match e {
            Error::Execution(message) => Error::Build(message),
            other => other,
        })
    }

    /// Launch the simulator, pointing it at `connection_file`.
    ///
    /// Blocks until the simulator exits, which happens when the kernel it
    /// hosts shuts down.
    pub fn test(&self, connection_file: &Path) -> Result<()> {
        let argv = self.expand(&self.config.test.command, Some(connection_file));

        let mut env: Vec<(String, String)> = self
            .config
            .test
            .extra_env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        env.push((
            CONNECTION_FILE_ENV.to_string(),
            connection_file.to_string_lossy().to_string(),
        ));

        tracing::info!("launching {} simulator", self.config.sim);
        self.run(&argv, &env).map_err(|e| match e {
            Error::Execution(message) => Error::Launch(message),
            other => other,
        })
    }

    /// Expand placeholders in an argv template.
    pub fn expand(&self, template: &[String], connection_file: Option<&Path>) -> Vec<String> {
        let build_dir = self.config.build_dir().to_string_lossy().to_string();
        let connection = connection_file
            .map(|p| p.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut argv = Vec::with_capacity(template.len());
        for arg in template {
            match arg.as_str() {
                "{verilog_sources}" => argv.extend(self.verilog_sources.iter().cloned()),
                "{vhdl_sources}" => argv.extend(self.vhdl_sources.iter().cloned()),
                "{parameters}" => argv.extend(self.config.parameter_args()),
                _ => argv.push(
                    arg.replace("{toplevel}", &self.config.hdl_toplevel)
                        .replace("{toplevel_lang}", &self.config.hdl_toplevel_lang)
                        .replace("{build_dir}", &build_dir)
                        .replace("{connection_file}", &connection),
                ),
            }
        }
        argv
    }

    /// Failures come back as `Error::Execution` for the caller to classify.
    fn run(&self, argv: &[String], env: &[(String, String)]) -> Result<()> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| Error::Config("empty command".to_string()))?;
        let program = self.locate(program)?;

        tracing::debug!("running {} {:?}", program.display(), args);
        let status = Command::new(&program)
            .args(args)
            .current_dir(&self.config.root)
            .env("TOPLEVEL", &self.config.hdl_toplevel)
            .env("TOPLEVEL_LANG", &self.config.hdl_toplevel_lang)
            .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .status()
            .map_err(|e| Error::Execution(format!("failed to start {}: {}", program.display(), e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(Error::Execution(format!(
                "{} exited with {}",
                program.display(),
                status
            )))
        }
    }

    /// Paths with a separator resolve against the config root, bare names
    /// through `PATH`.
    fn locate(&self, program: &str) -> Result<PathBuf> {
        if program.contains(std::path::MAIN_SEPARATOR) || program.contains('/') {
            return Ok(self.config.root.join(program));
        }
        which::which(program).map_err(|e| Error::Execution(format!("{program}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn project() -> (TempDir, SimConfig) {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("rtl")).unwrap();
        fs::write(temp.path().join("rtl/b.sv"), "").unwrap();
        fs::write(temp.path().join("rtl/a.sv"), "").unwrap();
        fs::write(temp.path().join("rtl/top.vhd"), "").unwrap();

        let text = r#"
sim = "icarus"
hdl_toplevel = "counter"
hdl_toplevel_lang = "verilog"

[parameters]
WIDTH = 8

[build]
command = ["iverilog", "-o", "{build_dir}/sim.vvp", "-s", "{toplevel}", "{parameters}", "{verilog_sources}"]
verilog_sources = ["rtl/*.sv"]
vhdl_sources = ["rtl/*.vhd"]

[test]
command = ["vvp", "{build_dir}/sim.vvp", "+conn={connection_file}"]
"#;
        let config = SimConfig::parse(text, temp.path()).unwrap();
        (temp, config)
    }

    #[test]
    fn test_resolve_sources_sorted() {
        let (temp, config) = project();
        let sources = resolve_sources(&config.root, &config.build.verilog_sources).unwrap();
        assert_eq!(
            sources,
            vec![temp.path().join("rtl/a.sv"), temp.path().join("rtl/b.sv")]
        );
    }

    #[test]
    fn test_resolve_sources_no_match() {
        let (_temp, config) = project();
        let err = resolve_sources(&config.root, &["rtl/*.v".to_string()]).unwrap_err();
        assert!(err.to_string().contains("no sources match rtl/*.v"));
    }

    #[test]
    fn test_expand_build_command() {
        let (temp, config) = project();
        let runner = CommandRunner::new(&config).unwrap();
        let argv = runner.expand(&config.build.command, None);

        let build_dir = temp.path().join("sim_build").to_string_lossy().to_string();
        assert_eq!(argv[0], "iverilog");
        assert_eq!(argv[2], format!("{build_dir}/sim.vvp"));
        assert_eq!(argv[4], "counter");
        assert_eq!(argv[5], "WIDTH=8");
        assert!(argv[6].ends_with("a.sv"));
        assert!(argv[7].ends_with("b.sv"));
        assert_eq!(argv.len(), 8);
    }

    #[test]
    fn test_expand_connection_file() {
        let (_temp, config) = project();
        let runner = CommandRunner::new(&config).unwrap();
        let argv = runner.expand(&config.test.command, Some(Path::new("/run/kernel-1.json")));
        assert_eq!(argv[2], "+conn=/run/kernel-1.json");
    }

    #[test]
    fn test_missing_program_is_launch_error() {
        let (_temp, mut config) = project();
        config.test.command = vec!["simbook-no-such-simulator".to_string()];
        let runner = CommandRunner::new(&config).unwrap();
        let err = runner.test(Path::new("kernel.json")).unwrap_err();
        assert!(matches!(err, Error::Launch(_)));
    }
}
