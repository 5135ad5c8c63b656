//! Core engine for simbook.
//!
//! Runs a notebook kernel inside a hardware simulator's cooperative
//! scheduler. This crate provides:
//! - The cross-scheduler bridge that carries cell executions from the kernel
//!   loop to the simulator's thread
//! - The host scheduler and the kernel's worker-thread loop
//! - The design handle and cell language
//! - Kernel session, protocol and listener
//! - Project config, simulator launch and kernelspec install

pub mod bridge;
pub mod config;
pub mod design;
pub mod entry;
pub mod error;
pub mod eval;
pub mod kernel;
pub mod kernelspec;
pub mod runner;
pub mod sched;

pub use bridge::{Bridge, Pending, Ticket, UnitState};
pub use config::{SimConfig, find_config};
pub use design::{Design, SignalInfo, SignalTable};
pub use entry::{CONNECTION_FILE_ENV, KernelOptions, kernel_entry, kernel_entry_from_env};
pub use error::{Error, Result};
pub use eval::{Cell, CellOutput};
pub use kernel::{ConnectionInfo, KernelReply, KernelRequest, KernelSession};
pub use kernelspec::{InstallLocation, KernelSpec};
pub use runner::{CommandRunner, resolve_sources};
pub use sched::{Capabilities, ForeignLoop, ForeignLoopOptions, HostContext, HostScheduler, InterruptMode};
