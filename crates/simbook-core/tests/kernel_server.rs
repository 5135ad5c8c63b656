//! End-to-end kernel tests over TCP.
//!
//! The test thread plays the simulator: it calls `kernel_entry` with a
//! design and becomes the host scheduler. A client thread talks to the
//! kernel the way a front-end would.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::thread;
use std::time::Duration;

use serde_json::{Value, json};
use simbook_core::{Design, Error, KernelOptions, SignalTable, kernel_entry};
use tempfile::TempDir;

// =============================================================================
// Test Helpers
// =============================================================================

fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
    listener.local_addr().unwrap().port()
}

fn write_connection_file(dir: &Path, port: u16) -> std::path::PathBuf {
    let path = dir.join("kernel-test.json");
    let info = json!({
        "transport": "tcp",
        "ip": "127.0.0.1",
        "shell_port": port,
        "iopub_port": 0,
        "stdin_port": 0,
        "control_port": 0,
        "hb_port": 0,
        "key": "",
        "signature_scheme": "hmac-sha256",
        "kernel_name": "simbook"
    });
    std::fs::write(&path, info.to_string()).expect("failed to write connection file");
    path
}

/// Line-oriented front-end client.
struct Client {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
}

impl Client {
    fn connect(port: u16) -> Self {
        for _ in 0..200 {
            if let Ok(stream) = TcpStream::connect(("127.0.0.1", port)) {
                let writer = stream.try_clone().unwrap();
                return Self {
                    reader: BufReader::new(stream),
                    writer,
                };
            }
            thread::sleep(Duration::from_millis(25));
        }
        panic!("kernel never started listening on port {port}");
    }

    fn request(&mut self, message: Value) -> Value {
        let mut line = message.to_string();
        line.push('\n');
        self.writer.write_all(line.as_bytes()).unwrap();

        let mut reply = String::new();
        self.reader.read_line(&mut reply).unwrap();
        serde_json::from_str(&reply).expect("reply is not JSON")
    }

    fn execute(&mut self, code: &str) -> Value {
        self.request(json!({ "msg_type": "execute_request", "code": code }))
    }
}

fn counter() -> SignalTable {
    let mut design = SignalTable::new("counter")
        .with_signal("clk", 1)
        .unwrap()
        .with_signal("count", 8)
        .unwrap();
    design.set_clock("clk").unwrap();
    design
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_notebook_session_end_to_end() {
    let dir = TempDir::new().unwrap();
    let port = free_port();
    let connection_file = write_connection_file(dir.path(), port);

    let client = thread::spawn(move || {
        let mut client = Client::connect(port);

        let info = client.request(json!({ "msg_type": "kernel_info_request" }));
        assert_eq!(info["msg_type"], "kernel_info_reply");
        assert_eq!(info["toplevel"], "counter");
        assert_eq!(info["interrupt_mode"], "message");

        let reply = client.execute("dut.count = 0x2a\nawait 3\ndut.count\ntime");
        assert_eq!(reply["msg_type"], "execute_reply");
        assert_eq!(reply["status"], "ok");
        assert_eq!(reply["execution_count"], 1);
        assert_eq!(reply["output"], "count = 42\ntime = 3");

        let failed = client.execute("raise ValueError('x')");
        assert_eq!(failed["status"], "error");
        assert_eq!(failed["ename"], "ExecutionError");
        assert_eq!(failed["execution_count"], 2);

        let interrupt = client.request(json!({ "msg_type": "interrupt_request" }));
        assert_eq!(interrupt["status"], "error");
        assert_eq!(interrupt["ename"], "NotImplementedError");

        let after = client.execute("dut.count = 7\ndut.count");
        assert_eq!(after["status"], "ok");
        assert_eq!(after["output"], "count = 7");
        assert_eq!(after["execution_count"], 3);

        let shutdown = client.request(json!({ "msg_type": "shutdown_request" }));
        assert_eq!(shutdown["msg_type"], "shutdown_reply");
        assert_eq!(shutdown["status"], "ok");
        assert_eq!(shutdown["restart"], false);
    });

    let design = kernel_entry(counter(), &connection_file, KernelOptions::default()).unwrap();
    client.join().expect("client failed");

    assert_eq!(design.time(), 3);
    assert_eq!(design.read("count").unwrap(), 7);
    assert_eq!(design.read("clk").unwrap(), 1);
}

#[test]
fn test_malformed_request_gets_error_reply() {
    let dir = TempDir::new().unwrap();
    let port = free_port();
    let connection_file = write_connection_file(dir.path(), port);

    let client = thread::spawn(move || {
        let mut client = Client::connect(port);

        let reply = client.request(json!({ "msg_type": "comm_open" }));
        assert_eq!(reply["msg_type"], "error");
        assert_eq!(reply["ename"], "ProtocolError");

        let shutdown = client.request(json!({ "msg_type": "shutdown_request" }));
        assert_eq!(shutdown["msg_type"], "shutdown_reply");
    });

    kernel_entry(counter(), &connection_file, KernelOptions::default()).unwrap();
    client.join().expect("client failed");
}

#[test]
fn test_missing_connection_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.json");

    let err = kernel_entry(counter(), &missing, KernelOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Connection(_)));
}
