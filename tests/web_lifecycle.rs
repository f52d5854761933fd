//! End-to-end lifecycle tests: staging, reconciliation and the runner group
//! with the real dispatch and gateway runners.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use web_node::assets::AssetStager;
use web_node::lifecycle;
use web_node::runner::RunnerError;
use web_node::{Shutdown, WebError};

mod common;

#[tokio::test]
async fn test_serves_and_stops_on_shutdown() {
    let dispatch_addr: SocketAddr = "127.0.0.1:28381".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:28382".parse().unwrap();

    let root = tempfile::tempdir().unwrap();
    let key = tempfile::NamedTempFile::new().unwrap();
    let cmd = common::command(dispatch_addr, gateway_addr.port(), key.path());
    let stager = AssetStager::embedded().with_root(root.path());

    let shutdown = Shutdown::new();
    let node = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { lifecycle::run(cmd, &stager, shutdown).await })
    };

    common::wait_for_listener(dispatch_addr).await;
    common::wait_for_listener(gateway_addr).await;

    let client = reqwest::Client::builder().no_proxy().build().unwrap();

    let info: serde_json::Value = client
        .get(format!("http://{}/api/v1/info", dispatch_addr))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(info["peer_url"], format!("http://{}", dispatch_addr));
    assert_eq!(info["version"], env!("CARGO_PKG_VERSION"));

    let manifest = client
        .get(format!("http://{}/api/v1/cli/manifest.json", dispatch_addr))
        .send()
        .await
        .unwrap();
    assert_eq!(manifest.status(), 200);

    // The gateway hands out the host of the dispatch peer URL.
    let mut socket = TcpStream::connect(gateway_addr).await.unwrap();
    socket.write_all(b"REGISTER worker-1\n").await.unwrap();
    let mut reply = String::new();
    BufReader::new(socket).read_line(&mut reply).await.unwrap();
    assert!(reply.starts_with("OK "), "unexpected reply {reply:?}");
    assert!(reply.trim_end().ends_with(" 127.0.0.1"));

    drop(client);
    shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), node)
        .await
        .expect("node did not stop")
        .unwrap();
    assert!(result.is_ok(), "{result:?}");

    assert!(TcpStream::connect(dispatch_addr).await.is_err());
    assert!(TcpStream::connect(gateway_addr).await.is_err());
}

#[tokio::test]
async fn test_gateway_failure_stops_dispatch() {
    let dispatch_addr: SocketAddr = "127.0.0.1:28383".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:28384".parse().unwrap();

    // Occupy the gateway port so its runner fails right after starting.
    let _occupied = TcpListener::bind(gateway_addr).await.unwrap();

    let root = tempfile::tempdir().unwrap();
    let key = tempfile::NamedTempFile::new().unwrap();
    let cmd = common::command(dispatch_addr, gateway_addr.port(), key.path());
    let stager = AssetStager::embedded().with_root(root.path());

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        lifecycle::run(cmd, &stager, Shutdown::new()),
    )
    .await
    .expect("node did not stop");

    match result {
        Err(WebError::RunnerExecution(e)) => {
            assert_eq!(e.member, "gateway");
            assert!(matches!(e.source, RunnerError::Io(_)));
        }
        other => panic!("expected gateway failure, got {other:?}"),
    }

    // Dispatch was drained with the group.
    assert!(TcpStream::connect(dispatch_addr).await.is_err());
}

#[tokio::test]
async fn test_staging_failure_starts_nothing() {
    let dispatch_addr: SocketAddr = "127.0.0.1:28385".parse().unwrap();
    let gateway_addr: SocketAddr = "127.0.0.1:28386".parse().unwrap();

    let root = tempfile::tempdir().unwrap();
    let occupied = root.path().join("occupied");
    std::fs::write(&occupied, b"file").unwrap();
    let key = tempfile::NamedTempFile::new().unwrap();
    let cmd = common::command(dispatch_addr, gateway_addr.port(), key.path());

    let result = lifecycle::run(
        cmd,
        &AssetStager::embedded().with_root(&occupied),
        Shutdown::new(),
    )
    .await;

    assert!(matches!(result, Err(WebError::Assets(_))));
    assert!(TcpStream::connect(dispatch_addr).await.is_err());
    assert!(TcpStream::connect(gateway_addr).await.is_err());
}
