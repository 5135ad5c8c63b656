//! Kernel entry point for an embedding simulator.
//!
//! The simulator calls [`kernel_entry`] from its test scheduler thread with
//! its design handle. That thread becomes the host scheduler; the kernel loop
//! is started on a worker thread and the call returns once the kernel has
//! shut down.

use std::path::{Path, PathBuf};

use crate::design::Design;
use crate::error::{Error, Result};
use crate::kernel::{ConnectionInfo, KernelSession, server};
use crate::sched::{Capabilities, ForeignLoop, ForeignLoopOptions, HostScheduler};

/// Environment variable carrying the connection file path to the simulator.
pub const CONNECTION_FILE_ENV: &str = "SIMBOOK_CONNECTION_FILE";

/// Options for [`kernel_entry`].
#[derive(Debug, Clone, Default)]
pub struct KernelOptions {
    /// Kernel loop thread options.
    pub foreign: ForeignLoopOptions,
    /// Banner shown by front-ends; defaults to the crate name and version.
    pub banner: Option<String>,
}

/// Serve notebook cells against `design` until the kernel is shut down.
///
/// Blocks the calling thread, which runs the host scheduler. Returns the
/// design in its final state.
pub fn kernel_entry<D: Design>(
    design: D,
    connection_file: &Path,
    options: KernelOptions,
) -> Result<D> {
    let connection = ConnectionInfo::load(connection_file)?;
    let addr = connection.shell_addr();
    let capabilities = Capabilities::for_worker_loop(&options.foreign);
    let banner = options.banner;

    let (host, bridge) = HostScheduler::new(design);

    tracing::info!("starting kernel for {}", host.design().name());
    let kernel = ForeignLoop::spawn(options.foreign, move || async move {
        let mut session = KernelSession::new(bridge, capabilities);
        if let Some(banner) = banner {
            session = session.with_banner(banner);
        }
        server::serve(session, &addr).await
    })?;

    let design = host.run()?;
    kernel.join()?;
    Ok(design)
}

/// [`kernel_entry`] with the connection file taken from
/// `SIMBOOK_CONNECTION_FILE`.
pub fn kernel_entry_from_env<D: Design>(design: D, options: KernelOptions) -> Result<D> {
    let path = std::env::var_os(CONNECTION_FILE_ENV)
        .map(PathBuf::from)
        .ok_or_else(|| Error::Connection(format!("{CONNECTION_FILE_ENV} is not set")))?;
    kernel_entry(design, &path, options)
}
