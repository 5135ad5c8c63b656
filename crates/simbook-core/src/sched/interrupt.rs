//! Interrupt capability negotiation.
//!
//! The simulator owns the process signal mask, and the kernel loop lives on a
//! worker thread that never sees `SIGINT`. Rather than swapping process-wide
//! handlers, the kernel declares up front that interrupts are not deliverable
//! and asks front-ends to send interrupt requests as messages, which it then
//! rejects explicitly.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::ForeignLoopOptions;

/// How a front-end should deliver interrupts (kernelspec `interrupt_mode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterruptMode {
    /// Send `SIGINT` to the kernel process.
    Signal,
    /// Send an `interrupt_request` message.
    Message,
}

/// What the kernel loop can honor, decided once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Interrupt delivery mode advertised to front-ends.
    pub interrupt_mode: InterruptMode,
    /// Whether a running cell can be interrupted.
    pub interrupts: bool,
    /// Whether the loop installed its own signal handlers.
    pub signal_handlers: bool,
}

impl Capabilities {
    /// Capabilities of a kernel loop running off the main thread.
    pub fn for_worker_loop(options: &ForeignLoopOptions) -> Self {
        Self {
            interrupt_mode: InterruptMode::Message,
            interrupts: false,
            signal_handlers: options.install_signal_handlers,
        }
    }

    /// Check an interrupt request against the negotiated capabilities.
    pub fn interrupt(&self) -> Result<()> {
        if self.interrupts {
            Ok(())
        } else {
            Err(Error::InterruptUnsupported)
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::for_worker_loop(&ForeignLoopOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_loop_rejects_interrupts() {
        let caps = Capabilities::default();
        assert_eq!(caps.interrupt_mode, InterruptMode::Message);
        assert!(!caps.signal_handlers);
        for _ in 0..100 {
            assert!(matches!(caps.interrupt(), Err(Error::InterruptUnsupported)));
        }
    }

    #[test]
    fn test_mode_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&InterruptMode::Message).unwrap(),
            "\"message\""
        );
    }
}
