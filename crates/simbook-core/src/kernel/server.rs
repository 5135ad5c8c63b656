//! Line-delimited JSON front-end listener.
//!
//! Runs on the kernel loop. Each connection is handled by its own task;
//! requests on one connection are answered in order. A `shutdown_request`
//! from any connection stops the listener.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;

use crate::design::Design;
use crate::error::Result;

use super::protocol::{KernelReply, KernelRequest};
use super::session::{Control, KernelSession};

/// Bind `addr` and serve until shutdown.
pub async fn serve<D: Design>(session: KernelSession<D>, addr: &str) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_listener(session, listener).await
}

/// Serve on an already bound listener until shutdown.
pub async fn serve_listener<D: Design>(
    session: KernelSession<D>,
    listener: TcpListener,
) -> Result<()> {
    let session = Arc::new(session);
    let shutdown = Arc::new(Notify::new());
    tracing::info!(
        session = %session.session_id(),
        "kernel listening on {}",
        listener.local_addr()?
    );

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = accepted?;
                tracing::debug!("front-end connected from {}", peer);

                let session = session.clone();
                let shutdown = shutdown.clone();
                tokio::spawn(async move {
                    if let Err(e) = handle_connection(&session, stream, &shutdown).await {
                        tracing::warn!("connection from {} failed: {}", peer, e);
                    }
                });
            }
            _ = shutdown.notified() => break,
        }
    }

    tracing::info!("kernel stopped");
    Ok(())
}

async fn handle_connection<D: Design>(
    session: &KernelSession<D>,
    stream: TcpStream,
    shutdown: &Notify,
) -> Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let (reply, control) = match KernelRequest::from_line(&line) {
            Ok(request) => session.handle(request).await,
            Err(e) => (KernelReply::error(&e), Control::Continue),
        };

        let mut encoded = reply.to_line()?;
        encoded.push('\n');
        writer.write_all(encoded.as_bytes()).await?;
        writer.flush().await?;

        if control == Control::Shutdown {
            shutdown.notify_one();
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::SignalTable;
    use crate::sched::{Capabilities, HostScheduler};
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_shutdown_request_stops_listener() {
        let design = SignalTable::new("top").with_signal("led", 1).unwrap();
        let (host, bridge) = HostScheduler::new(design);
        let host = std::thread::spawn(move || host.run());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(serve_listener(
            KernelSession::new(bridge, Capabilities::default()),
            listener,
        ));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(
                b"{\"msg_type\":\"execute_request\",\"code\":\"dut.led = 1\\ndut.led\"}\n\
                  not json\n\
                  {\"msg_type\":\"shutdown_request\"}\n",
            )
            .await
            .unwrap();

        let mut received = String::new();
        stream.read_to_string(&mut received).await.unwrap();
        let replies: Vec<serde_json::Value> = received
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0]["output"], "led = 1");
        assert_eq!(replies[1]["ename"], "ProtocolError");
        assert_eq!(replies[2]["msg_type"], "shutdown_reply");

        server.await.unwrap().unwrap();
        let design = host.join().unwrap().unwrap();
        assert_eq!(crate::design::Design::read(&design, "led").unwrap(), 1);
    }
}
