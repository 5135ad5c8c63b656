//! Kernel messages.
//!
//! One JSON object per line in each direction, tagged by `msg_type`. The
//! message names and reply fields follow the Jupyter messaging spec; the
//! framing does not (no ZMQ, no signatures).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::sched::InterruptMode;

/// Protocol version reported in `kernel_info_reply`.
pub const PROTOCOL_VERSION: &str = "5.3";

/// Requests from a front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "msg_type", rename_all = "snake_case")]
pub enum KernelRequest {
    /// Ask for kernel and language metadata.
    KernelInfoRequest,

    /// Run a cell.
    ExecuteRequest {
        /// Cell source.
        code: String,
        /// Silent executions do not bump the execution counter.
        #[serde(default)]
        silent: bool,
    },

    /// Interrupt the running cell. Always answered with an error.
    InterruptRequest,

    /// Stop the kernel.
    ShutdownRequest {
        #[serde(default)]
        restart: bool,
    },
}

/// Reply status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    Ok,
    Error,
}

/// Outcome of an execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExecuteOutcome {
    /// The cell ran; `output` holds its text.
    Ok { output: String },
    /// The cell failed.
    Error { ename: String, evalue: String },
}

/// `language_info` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub name: String,
    pub version: String,
    pub file_extension: String,
}

/// Replies to a front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "msg_type", rename_all = "snake_case")]
pub enum KernelReply {
    KernelInfoReply {
        protocol_version: String,
        implementation: String,
        implementation_version: String,
        session: String,
        language_info: LanguageInfo,
        banner: String,
        interrupt_mode: InterruptMode,
        toplevel: String,
    },

    ExecuteReply {
        execution_count: u32,
        #[serde(flatten)]
        outcome: ExecuteOutcome,
    },

    InterruptReply {
        status: ReplyStatus,
        ename: String,
        evalue: String,
    },

    ShutdownReply {
        status: ReplyStatus,
        restart: bool,
    },

    /// The request could not be decoded.
    Error {
        ename: String,
        evalue: String,
    },
}

impl KernelReply {
    /// Error reply for `error`.
    pub fn error(error: &Error) -> Self {
        Self::Error {
            ename: error.kind().to_string(),
            evalue: error.to_string(),
        }
    }

    /// Encode as a single line (no trailing newline).
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl KernelRequest {
    /// Decode one line.
    pub fn from_line(line: &str) -> Result<Self> {
        serde_json::from_str(line).map_err(|e| Error::Protocol(format!("bad request: {e}")))
    }
}
