//! Kernel session: turns requests into bridge submissions.

use std::sync::atomic::{AtomicU32, Ordering};

use uuid::Uuid;

use crate::bridge::Bridge;
use crate::design::Design;
use crate::error::{Error, Result};
use crate::eval::Cell;
use crate::sched::Capabilities;

use super::protocol::{
    ExecuteOutcome, KernelReply, KernelRequest, LanguageInfo, PROTOCOL_VERSION, ReplyStatus,
};

/// What the server should do after sending a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Shutdown,
}

/// Per-kernel state shared by every front-end connection.
pub struct KernelSession<D> {
    bridge: Bridge<D>,
    capabilities: Capabilities,
    session_id: Uuid,
    banner: String,
    execution_count: AtomicU32,
}

impl<D: Design> KernelSession<D> {
    pub fn new(bridge: Bridge<D>, capabilities: Capabilities) -> Self {
        Self {
            bridge,
            capabilities,
            session_id: Uuid::new_v4(),
            banner: format!("simbook {}", env!("CARGO_PKG_VERSION")),
            execution_count: AtomicU32::new(0),
        }
    }

    pub fn with_banner(mut self, banner: impl Into<String>) -> Self {
        self.banner = banner.into();
        self
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn execution_count(&self) -> u32 {
        self.execution_count.load(Ordering::SeqCst)
    }

    pub fn bridge(&self) -> &Bridge<D> {
        &self.bridge
    }

    /// Handle one request.
    pub async fn handle(&self, request: KernelRequest) -> (KernelReply, Control) {
        match request {
            KernelRequest::KernelInfoRequest => (self.kernel_info().await, Control::Continue),
            KernelRequest::ExecuteRequest { code, silent } => {
                (self.execute(&code, silent).await, Control::Continue)
            }
            KernelRequest::InterruptRequest => (self.interrupt(), Control::Continue),
            KernelRequest::ShutdownRequest { restart } => {
                tracing::info!(restart, "shutdown requested");
                (
                    KernelReply::ShutdownReply {
                        status: ReplyStatus::Ok,
                        restart,
                    },
                    Control::Shutdown,
                )
            }
        }
    }

    /// Run a cell on the host and build the reply.
    ///
    /// Failures end the cell with an error reply; the session stays usable.
    pub async fn execute(&self, code: &str, silent: bool) -> KernelReply {
        let execution_count = if silent {
            self.execution_count()
        } else {
            self.execution_count.fetch_add(1, Ordering::SeqCst) + 1
        };

        let outcome = match self.run_cell(code).await {
            Ok(output) => ExecuteOutcome::Ok { output },
            Err(e) => {
                tracing::debug!(execution_count, "cell failed: {}", e);
                ExecuteOutcome::Error {
                    ename: e.kind().to_string(),
                    evalue: e.to_string(),
                }
            }
        };

        KernelReply::ExecuteReply {
            execution_count,
            outcome,
        }
    }

    async fn run_cell(&self, code: &str) -> Result<String> {
        let cell = Cell::parse(code)?;
        if cell.is_empty() {
            return Ok(String::new());
        }
        let output = self
            .bridge
            .submit(move |ctx| cell.run(ctx.design_mut()))
            .await?;
        Ok(output.to_string())
    }

    fn interrupt(&self) -> KernelReply {
        let err = self
            .capabilities
            .interrupt()
            .and_then(|()| self.bridge.interrupt())
            .err()
            .unwrap_or(Error::InterruptUnsupported);

        KernelReply::InterruptReply {
            status: ReplyStatus::Error,
            ename: err.kind().to_string(),
            evalue: err.to_string(),
        }
    }

    async fn kernel_info(&self) -> KernelReply {
        let toplevel = self
            .bridge
            .submit(|ctx| Ok(ctx.design().name().to_string()))
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("cannot query design name: {}", e);
                String::new()
            });

        KernelReply::KernelInfoReply {
            protocol_version: PROTOCOL_VERSION.to_string(),
            implementation: "simbook".to_string(),
            implementation_version: env!("CARGO_PKG_VERSION").to_string(),
            session: self.session_id.to_string(),
            language_info: LanguageInfo {
                name: "simbook".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                file_extension: ".sim".to_string(),
            },
            banner: self.banner.clone(),
            interrupt_mode: self.capabilities.interrupt_mode,
            toplevel,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::SignalTable;
    use crate::sched::HostScheduler;

    fn with_session<F, Fut>(test: F) -> SignalTable
    where
        F: FnOnce(KernelSession<SignalTable>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()>,
    {
        let design = SignalTable::new("counter").with_signal("count", 8).unwrap();
        let (host, bridge) = HostScheduler::new(design);

        let kernel = std::thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .unwrap();
            runtime.block_on(test(KernelSession::new(bridge, Capabilities::default())));
        });

        let design = host.run().unwrap();
        kernel.join().unwrap();
        design
    }

    #[test]
    fn test_execute_counts_and_outputs() {
        let design = with_session(|session| async move {
            let reply = session.execute("dut.count = 5\ndut.count", false).await;
            assert_eq!(
                reply,
                KernelReply::ExecuteReply {
                    execution_count: 1,
                    outcome: ExecuteOutcome::Ok {
                        output: "count = 5".to_string()
                    },
                }
            );

            let silent = session.execute("await 2", true).await;
            assert!(matches!(silent, KernelReply::ExecuteReply { execution_count: 1, .. }));
            assert_eq!(session.execution_count(), 1);
        });
        assert_eq!(design.time(), 2);
    }

    #[test]
    fn test_failed_cell_keeps_session_usable() {
        with_session(|session| async move {
            let failed = session.execute("raise ValueError('x')", false).await;
            match failed {
                KernelReply::ExecuteReply {
                    execution_count: 1,
                    outcome: ExecuteOutcome::Error { ename, evalue },
                } => {
                    assert_eq!(ename, "ExecutionError");
                    assert_eq!(evalue, "execution error: x");
                }
                other => panic!("unexpected reply: {other:?}"),
            }

            let syntax = session.execute("dut.count = ?", false).await;
            assert!(matches!(
                syntax,
                KernelReply::ExecuteReply { execution_count: 2, outcome: ExecuteOutcome::Error { ref ename, .. } }
                    if ename == "SyntaxError"
            ));

            let ok = session.execute("dut.count = 7\ndut.count", false).await;
            assert!(matches!(
                ok,
                KernelReply::ExecuteReply { execution_count: 3, outcome: ExecuteOutcome::Ok { ref output } }
                    if output == "count = 7"
            ));
        });
    }

    #[test]
    fn test_interrupt_and_shutdown() {
        with_session(|session| async move {
            let (reply, control) = session.handle(KernelRequest::InterruptRequest).await;
            assert_eq!(control, Control::Continue);
            assert!(matches!(
                reply,
                KernelReply::InterruptReply { status: ReplyStatus::Error, ref ename, .. }
                    if ename == "NotImplementedError"
            ));

            let (reply, control) = session
                .handle(KernelRequest::ShutdownRequest { restart: false })
                .await;
            assert_eq!(control, Control::Shutdown);
            assert_eq!(
                reply,
                KernelReply::ShutdownReply {
                    status: ReplyStatus::Ok,
                    restart: false
                }
            );
        });
    }

    #[test]
    fn test_kernel_info_reports_toplevel() {
        with_session(|session| async move {
            let (reply, _) = session.handle(KernelRequest::KernelInfoRequest).await;
            match reply {
                KernelReply::KernelInfoReply {
                    toplevel,
                    session: id,
                    interrupt_mode,
                    ..
                } => {
                    assert_eq!(toplevel, "counter");
                    assert_eq!(id, session.session_id().to_string());
                    assert_eq!(interrupt_mode, crate::sched::InterruptMode::Message);
                }
                other => panic!("unexpected reply: {other:?}"),
            }
        });
    }
}
