//! Raw-socket tests for the TCP listener.

use serde_json::{Value, json};
use std::io::Write;
use std::net::SocketAddr;
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use stabwire_proto::frame::{read_frame, write_frame};
use stabwire_proto::{Response, ResultExt};
use stabwire_server::{Config, Server};

fn test_config() -> Config {
    let mut config = Config::default();
    config.server.address = "127.0.0.1:0".to_string();
    config.server.max_message_size_bytes = 4096;
    config.server.shutdown_timeout_seconds = 1;
    config.engine.max_qubits = 256;
    config.engine.rng_seed = Some(2024);
    config
}

async fn start(config: Config) -> (SocketAddr, oneshot::Sender<()>, JoinHandle<()>) {
    let server = Server::bind(&config).await.unwrap();
    let addr = server.local_addr().unwrap();
    let (tx, rx) = oneshot::channel::<()>();
    let handle = tokio::spawn(async move {
        server
            .serve_with_shutdown(async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });
    (addr, tx, handle)
}

struct RawClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl RawClient {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (r, w) = stream.into_split();
        Self {
            reader: BufReader::new(r),
            writer: w,
        }
    }

    async fn send_raw(&mut self, bytes: &[u8]) -> Vec<u8> {
        write_frame(&mut self.writer, bytes).await.unwrap();
        read_frame(&mut self.reader, 1 << 20).await.unwrap().unwrap()
    }

    async fn call(&mut self, method: &str, params: Value) -> Result<Value, String> {
        let bytes = format!("{{\"method\":\"{method}\",\"parameters\":{params}}}\0");
        let reply = self.send_raw(bytes.as_bytes()).await;
        Response::decode(&reply).map_err(|e| e.to_string())
    }
}

#[tokio::test]
async fn test_teleport_over_tcp() {
    let (addr, stop, handle) = start(test_config()).await;
    let mut client = RawClient::connect(addr).await;

    for payload in ["i", "x"] {
        let sys = client.call("create_system", json!(["chp_state"])).await.unwrap();
        let init = format!("init 3\nh 1\nc 1,2\n{payload} 0\n");
        let state = client
            .call("create_state", json!([sys, "chpext", init, 10]))
            .await
            .unwrap();
        let bell = client
            .call("measure_state", json!([sys, state, "chpext", "c 0,1\nh 0\nm 0\nm 1\n", 10]))
            .await
            .unwrap()
            .outcomes()
            .unwrap();

        let mut fix = String::new();
        if bell.bit(1) == Some(true) {
            fix.push_str("x 2\n");
        }
        if bell.bit(0) == Some(true) {
            fix.push_str("z 2\n");
        }
        fix.push_str("m 2\n");
        let received = client
            .call("measure_state", json!([sys, state, "chpext", fix, 10]))
            .await
            .unwrap();
        let expected = if payload == "x" { "1" } else { "0" };
        assert_eq!(received, json!(expected));

        client.call("delete_state", json!([sys, state])).await.unwrap();
        client.call("delete_system", json!([sys])).await.unwrap();
        let err = client.call("delete_system", json!([sys])).await.unwrap_err();
        assert!(err.contains("System not found"));
    }

    stop.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_oversized_request_keeps_connection() {
    let (addr, stop, handle) = start(test_config()).await;
    let mut client = RawClient::connect(addr).await;

    let huge = "h 0\n".repeat(2000);
    let err = client
        .call("compute_result", json!([0, "chpext", huge, 10]))
        .await
        .unwrap_err();
    assert!(err.contains("exceeds 4096 bytes"));

    let sys = client.call("create_system", json!(["chp_state"])).await;
    assert!(sys.is_ok());

    stop.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_garbage_gets_error_reply() {
    let (addr, stop, handle) = start(test_config()).await;
    let mut client = RawClient::connect(addr).await;

    let reply = client.send_raw(b"this is not json\0").await;
    assert!(Response::decode(&reply).unwrap_err().is_server_error());

    let reply = client.send_raw(b"{\"parameters\":[]}\0").await;
    assert!(Response::decode(&reply).is_err());

    stop.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_connections_are_isolated() {
    let (addr, stop, handle) = start(test_config()).await;

    let tasks: Vec<_> = (0..4)
        .map(|i| {
            tokio::spawn(async move {
                let mut client = RawClient::connect(addr).await;
                let sys = client.call("create_system", json!(["chp_state"])).await.unwrap();
                let (text, expected) = if i % 2 == 0 {
                    ("init 1\nx 0\nm 0\n", "1")
                } else {
                    ("init 1\nm 0\n", "0")
                };
                for _ in 0..20 {
                    let out = client
                        .call("compute_result", json!([sys, "chpext", text, 10]))
                        .await
                        .unwrap();
                    assert_eq!(out, json!(expected));
                }
                client.call("delete_system", json!([sys])).await.unwrap();
                sys
            })
        })
        .collect();

    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap());
    }
    ids.sort_by_key(|v| v.as_u64());
    ids.dedup();
    assert_eq!(ids.len(), 4);

    stop.send(()).unwrap();
    handle.await.unwrap();
}

#[tokio::test]
async fn test_config_file_bind() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "server:\n  address: \"127.0.0.1:0\"\nengine:\n  max_qubits: 2\n  rng_seed: 5"
    )
    .unwrap();
    let config = Config::from_file(file.path()).unwrap();
    assert_eq!(config.engine.max_qubits, 2);

    let (addr, stop, handle) = start(config).await;
    let mut client = RawClient::connect(addr).await;
    let sys = client.call("create_system", json!(["chp_state"])).await.unwrap();
    let err = client
        .call("create_state", json!([sys, "chpext", "init 3\n", 10]))
        .await
        .unwrap_err();
    assert!(err.contains("exceeds the limit of 2"));

    stop.send(()).unwrap();
    handle.await.unwrap();
}
