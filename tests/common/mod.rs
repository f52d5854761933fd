//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use tokio::net::TcpStream;
use web_node::WebCommand;

/// Build a command for a node listening on `dispatch` and `gateway_port`.
pub fn command(dispatch: SocketAddr, gateway_port: u16, key: &Path) -> WebCommand {
    let bind_address = dispatch.to_string();
    let peer_url = format!("http://{}", dispatch);
    let gateway_port = gateway_port.to_string();

    WebCommand::try_parse_relaxed_from([
        "web",
        "--bind-address",
        bind_address.as_str(),
        "--peer-url",
        peer_url.as_str(),
        "--session-signing-key",
        key.to_str().unwrap(),
        "--gateway-bind-ip",
        "127.0.0.1",
        "--gateway-bind-port",
        gateway_port.as_str(),
    ])
    .unwrap()
}

/// Wait until something accepts connections on `addr`.
pub async fn wait_for_listener(addr: SocketAddr) {
    for _ in 0..100 {
        if TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("nothing listening on {addr}");
}
