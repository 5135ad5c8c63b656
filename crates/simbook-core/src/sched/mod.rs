//! The two cooperative schedulers joined by the bridge.
//!
//! - **`HostScheduler`** - single-threaded, run-to-completion scheduler that
//!   owns the design. Runs on the simulator's thread.
//! - **`ForeignLoop`** - dedicated worker thread with a current-thread tokio
//!   runtime hosting the notebook kernel.
//! - **`Capabilities`** - what the kernel loop can honor given where it runs
//!   (interrupts, signal handlers).

mod foreign;
mod host;
mod interrupt;

use std::any::Any;

pub use foreign::{ForeignLoop, ForeignLoopOptions};
pub use host::{HostContext, HostScheduler, HostTask};
pub use interrupt::{Capabilities, InterruptMode};

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
