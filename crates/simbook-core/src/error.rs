//! Error types for simbook-core.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for simbook-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in simbook-core.
#[derive(Debug, Error)]
pub enum Error {
    /// A unit of work submitted over the bridge failed.
    #[error("execution error: {0}")]
    Execution(String),

    /// A unit of work (or the kernel thread) panicked.
    #[error("panicked: {0}")]
    Panicked(String),

    /// The bridge was used from the host scheduler's own thread.
    #[error("bridge called from the host scheduler thread")]
    WrongThread,

    /// The host scheduler is not running any more.
    #[error("host scheduler is not available")]
    HostUnavailable,

    /// The host scheduler has not started running yet.
    #[error("host scheduler is not running yet")]
    HostNotReady,

    /// Interrupting a running cell is not supported.
    #[error("interrupting execution is not supported by this kernel")]
    InterruptUnsupported,

    /// Failed to parse a cell.
    #[error("parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Signal not present in the design.
    #[error("signal not found: {0}")]
    SignalNotFound(String),

    /// Value does not fit the signal width.
    #[error("value {value:#x} does not fit in {width}-bit signal {signal}")]
    ValueOutOfRange {
        signal: String,
        value: u64,
        width: u32,
    },

    /// No config file found walking up from the working directory.
    #[error("couldn't find {name}.toml in {} or any parent directory", start.display())]
    ConfigNotFound { name: String, start: PathBuf },

    /// Config file is malformed or incomplete.
    #[error("config error: {0}")]
    Config(String),

    /// Connection file is malformed or unsupported.
    #[error("connection file error: {0}")]
    Connection(String),

    /// Building the design failed.
    #[error("an error occurred while building the design: {0}")]
    Build(String),

    /// Launching the simulator failed.
    #[error("an error occurred while launching the simulator: {0}")]
    Launch(String),

    /// Kernelspec generation or install failed.
    #[error("kernelspec error: {0}")]
    KernelSpec(String),

    /// Malformed protocol message.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Short name used as `ename` in error replies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Execution(_) => "ExecutionError",
            Self::Panicked(_) => "Panic",
            Self::WrongThread => "WrongThread",
            Self::HostUnavailable => "HostUnavailable",
            Self::HostNotReady => "HostNotReady",
            Self::InterruptUnsupported => "NotImplementedError",
            Self::Parse { .. } => "SyntaxError",
            Self::SignalNotFound(_) => "AttributeError",
            Self::ValueOutOfRange { .. } => "ValueError",
            Self::ConfigNotFound { .. } | Self::Config(_) => "ConfigError",
            Self::Connection(_) => "ConnectionError",
            Self::Build(_) => "BuildError",
            Self::Launch(_) => "LaunchError",
            Self::KernelSpec(_) => "KernelSpecError",
            Self::Protocol(_) | Self::Json(_) => "ProtocolError",
            Self::Io(_) => "IOError",
        }
    }

    /// Render the error with a recovery hint where one exists.
    pub fn with_hint(&self) -> String {
        let hint = match self {
            Self::ConfigNotFound { name, .. } => Some(format!(
                "create {name}.toml next to your notebook or pass --config-name"
            )),
            Self::WrongThread => {
                Some("use Bridge::submit from the kernel loop instead of run_on_host".to_string())
            }
            Self::HostNotReady => Some(
                "start HostScheduler::run before blocking on the bridge, or use Bridge::submit"
                    .to_string(),
            ),
            Self::Launch(_) => {
                Some("check that [test].command names a program on PATH".to_string())
            }
            Self::Build(_) => {
                Some("check [build].command and the source globs in your config".to_string())
            }
            Self::InterruptUnsupported => {
                Some("restart the kernel to stop a runaway cell".to_string())
            }
            _ => None,
        };

        match hint {
            Some(hint) => format!("{self}\n  hint: {hint}"),
            None => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hint_for_missing_config() {
        let err = Error::ConfigNotFound {
            name: "simbook".to_string(),
            start: PathBuf::from("/work"),
        };
        let text = err.with_hint();
        assert!(text.starts_with("couldn't find simbook.toml in /work"));
        assert!(text.contains("hint: create simbook.toml"));
    }

    #[test]
    fn test_no_hint_passthrough() {
        let err = Error::Execution("x".to_string());
        assert_eq!(err.with_hint(), "execution error: x");
        assert_eq!(err.kind(), "ExecutionError");
    }
}
