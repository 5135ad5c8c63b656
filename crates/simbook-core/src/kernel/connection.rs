//! Jupyter connection files.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Parsed connection file. Only `ip` and `shell_port` are used; the other
/// ports are kept so the file round-trips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    #[serde(default = "default_transport")]
    pub transport: String,
    pub ip: String,
    pub shell_port: u16,
    #[serde(default)]
    pub iopub_port: u16,
    #[serde(default)]
    pub stdin_port: u16,
    #[serde(default)]
    pub control_port: u16,
    #[serde(default)]
    pub hb_port: u16,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub signature_scheme: String,
    #[serde(default)]
    pub kernel_name: String,
}

fn default_transport() -> String {
    "tcp".to_string()
}

impl ConnectionInfo {
    /// Parse connection JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        let info: Self = serde_json::from_str(text)
            .map_err(|e| Error::Connection(format!("invalid connection file: {e}")))?;
        if info.transport != "tcp" {
            return Err(Error::Connection(format!(
                "unsupported transport {:?}, only tcp is supported",
                info.transport
            )));
        }
        Ok(info)
    }

    /// Read and parse a connection file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            Error::Connection(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    /// Address the kernel listens on for requests.
    pub fn shell_addr(&self) -> String {
        if self.ip.contains(':') {
            format!("[{}]:{}", self.ip, self.shell_port)
        } else {
            format!("{}:{}", self.ip, self.shell_port)
        }
    }
}
