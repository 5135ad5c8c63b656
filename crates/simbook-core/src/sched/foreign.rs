//! Worker thread hosting the kernel's own event loop.

use std::future::Future;
use std::thread::{self, JoinHandle};

use crate::error::{Error, Result};

use super::panic_message;

/// Startup options for the kernel loop thread.
#[derive(Debug, Clone)]
pub struct ForeignLoopOptions {
    /// Name of the worker thread.
    pub thread_name: String,
    /// Install a Ctrl-C handler on the loop.
    ///
    /// Off for the bridged kernel: the simulator owns process signals and
    /// they are never routed to this thread.
    pub install_signal_handlers: bool,
}

impl Default for ForeignLoopOptions {
    fn default() -> Self {
        Self {
            thread_name: "simbook-kernel".to_string(),
            install_signal_handlers: false,
        }
    }
}

/// A kernel loop running on its own thread.
pub struct ForeignLoop {
    name: String,
    handle: JoinHandle<Result<()>>,
}

impl ForeignLoop {
    /// Spawn the worker thread and run the future returned by `main` on a
    /// current-thread runtime until it completes.
    ///
    /// The future is created on the worker thread, so it does not need to be
    /// `Send`.
    pub fn spawn<F, Fut>(options: ForeignLoopOptions, main: F) -> Result<Self>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + 'static,
    {
        let install_signal_handlers = options.install_signal_handlers;
        let name = options.thread_name;

        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || -> Result<()> {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()?;

                runtime.block_on(async move {
                    if install_signal_handlers {
                        tokio::select! {
                            result = main() => result,
                            signal = tokio::signal::ctrl_c() => {
                                signal?;
                                tracing::info!("received interrupt, stopping kernel loop");
                                Ok(())
                            }
                        }
                    } else {
                        main().await
                    }
                })
            })?;

        tracing::debug!(thread = %name, "kernel loop started");
        Ok(Self { name, handle })
    }

    /// Name of the worker thread.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the loop to exit and return its outcome.
    pub fn join(self) -> Result<()> {
        match self.handle.join() {
            Ok(result) => result,
            Err(payload) => Err(Error::Panicked(format!(
                "{} thread: {}",
                self.name,
                panic_message(payload.as_ref())
            ))),
        }
    }
}
