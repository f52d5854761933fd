//! Worker registration gateway runner.
//!
//! # Protocol
//! ```text
//! worker → gateway:  REGISTER <worker-name>\n
//! gateway → worker:  OK <session-id> <peer-ip>\n
//!                 |  ERR <reason>\n
//! ```
//!
//! # Design Decisions
//! - One registration per connection, then the connection is closed
//! - Registrations are assigned to trusted dispatch URLs round-robin
//! - A stop request closes the listener and aborts pending handshakes

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use url::Url;
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::observability::metrics;
use crate::runner::{RunFuture, Runner, RunnerError, RunnerFactory, StopRequest};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_LINE: u64 = 1024;
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Runner accepting worker registrations.
pub struct GatewayRunner {
    bind_address: SocketAddr,
    registry: Arc<Registry>,
}

/// What every handshake needs to answer a worker.
struct Registry {
    peer_ip: String,
    dispatch_urls: Vec<Url>,
    next: AtomicUsize,
}

impl RunnerFactory for GatewayConfig {
    fn runner(&self, args: &[String]) -> Result<Box<dyn Runner>, RunnerError> {
        if !args.is_empty() {
            return Err(RunnerError::Construction(format!(
                "unexpected arguments: {}",
                args.join(" ")
            )));
        }

        let peer_ip = required(self.peer_ip.clone(), "--gateway-peer-ip")?;
        let key: PathBuf = required(self.session_signing_key.clone(), "--gateway-session-signing-key")?;
        if self.dispatch_urls.is_empty() {
            return Err(RunnerError::Construction(
                "missing required flag --gateway-dispatch-url".to_string(),
            ));
        }
        if !key.exists() {
            return Err(RunnerError::Construction(format!(
                "session signing key not found: {}",
                key.display()
            )));
        }

        if let Some(environment) = &self.metrics.environment {
            tracing::debug!(environment = %environment, "Gateway metrics environment");
        }

        Ok(Box::new(GatewayRunner {
            bind_address: SocketAddr::new(self.bind_ip, self.bind_port),
            registry: Arc::new(Registry {
                peer_ip,
                dispatch_urls: self.dispatch_urls.clone(),
                next: AtomicUsize::new(0),
            }),
        }))
    }
}

fn required<T>(value: Option<T>, flag: &str) -> Result<T, RunnerError> {
    value.ok_or_else(|| RunnerError::Construction(format!("missing required flag {flag}")))
}

impl Runner for GatewayRunner {
    fn run(self: Box<Self>, stop: StopRequest) -> RunFuture {
        Box::pin(async move {
            let listener = TcpListener::bind(self.bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Gateway listening");

            serve(listener, self.registry, stop).await;
            tracing::info!("Gateway stopped");
            Ok::<(), RunnerError>(())
        })
    }
}

/// Source of incoming worker connections.
trait Accept: Send + Sync + 'static {
    fn accept(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send;
}

impl Accept for TcpListener {
    fn accept(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }
}

/// Accept registrations until `stop` fires.
///
/// Accept errors such as EMFILE or ECONNABORTED are logged and retried after
/// [`ACCEPT_BACKOFF`]; only a stop request ends the loop.
async fn serve<A: Accept>(listener: A, registry: Arc<Registry>, mut stop: StopRequest) {
    let mut handshakes = JoinSet::new();
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (socket, addr) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed to accept connection");
                        tokio::select! {
                            _ = tokio::time::sleep(ACCEPT_BACKOFF) => continue,
                            _ = stop.requested() => break,
                        }
                    }
                };
                let registry = registry.clone();
                handshakes.spawn(async move {
                    if let Err(e) = handshake(socket, &registry).await {
                        tracing::warn!(remote = %addr, error = %e, "Registration failed");
                    }
                });
            }
            Some(_) = handshakes.join_next(), if !handshakes.is_empty() => {}
            _ = stop.requested() => break,
        }
    }

    handshakes.shutdown().await;
}

async fn handshake(socket: TcpStream, registry: &Registry) -> io::Result<()> {
    let (read, mut write) = socket.into_split();
    let mut reader = BufReader::new(read.take(MAX_LINE));

    let mut line = String::new();
    let read = tokio::time::timeout(HANDSHAKE_TIMEOUT, reader.read_line(&mut line))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "handshake timed out"))??;
    if read == 0 {
        return Ok(());
    }

    let reply = match registry.register(line.trim_end()) {
        Ok(reply) => reply,
        Err(reason) => format!("ERR {reason}"),
    };
    write.write_all(reply.as_bytes()).await?;
    write.write_all(b"\n").await?;
    write.shutdown().await
}

impl Registry {
    /// Handle one request line, returning the reply without newline.
    fn register(&self, line: &str) -> Result<String, &'static str> {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next(), parts.next()) {
            (Some("REGISTER"), Some(worker), None) => {
                let session = Uuid::new_v4();
                let index = self.next.fetch_add(1, Ordering::Relaxed) % self.dispatch_urls.len();
                tracing::info!(
                    worker = %worker,
                    session = %session,
                    dispatch_url = %self.dispatch_urls[index],
                    "Worker registered"
                );
                metrics::record_registration();
                Ok(format!("OK {} {}", session, self.peer_ip))
            }
            (Some("REGISTER"), _, _) => Err("expected REGISTER <worker-name>"),
            _ => Err("unknown command"),
        }
    }
}
