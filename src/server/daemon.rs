//! Search daemon: a Unix-socket server fronting the query executor.
//!
//! Connections are handled on their own threads; each query call inside a
//! connection is synchronous end-to-end. Frames follow `protocol`.

use std::io::{Read, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::model::permission::TieredOracle;
use crate::protocol::{
    ErrorCode, ErrorResponse, FramedMessage, HealthStatus, MAX_FRAME_LEN, PROTOCOL_VERSION,
    Request, Response, decode_message, default_socket_path, encode_message,
};
use crate::server::executor::QueryExecutor;

/// Configuration for the search daemon.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub socket_path: PathBuf,
    pub db_path: PathBuf,
    /// Document categories offered to the documents strategy.
    pub categories: Vec<String>,
    pub request_timeout: Duration,
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            db_path: crate::default_db_path(),
            categories: crate::server::executor::default_categories(),
            request_timeout: Duration::from_secs(30),
            max_connections: 16,
        }
    }
}

impl ServerConfig {
    /// Load config from environment variables.
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(path) = dotenvy::var("QPAL_SOCKET") {
            cfg.socket_path = PathBuf::from(path);
        }

        if let Ok(path) = dotenvy::var("QPAL_DB") {
            cfg.db_path = PathBuf::from(path);
        }

        if let Ok(val) = dotenvy::var("QPAL_CATEGORIES") {
            let categories: Vec<String> = val
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
            if !categories.is_empty() {
                cfg.categories = categories;
            }
        }

        if let Ok(val) = dotenvy::var("QPAL_REQUEST_TIMEOUT_SECS")
            && let Ok(secs) = val.parse()
        {
            cfg.request_timeout = Duration::from_secs(secs);
        }

        if let Ok(val) = dotenvy::var("QPAL_MAX_CONNECTIONS")
            && let Ok(n) = val.parse()
        {
            cfg.max_connections = n;
        }

        cfg
    }
}

/// Daemon server state.
pub struct SearchDaemon {
    config: ServerConfig,
    executor: Arc<QueryExecutor>,
    start_time: Instant,
    total_requests: AtomicU64,
    active_connections: AtomicU64,
    shutdown: AtomicBool,
}

impl SearchDaemon {
    pub fn new(config: ServerConfig, executor: Arc<QueryExecutor>) -> Self {
        Self {
            config,
            executor,
            start_time: Instant::now(),
            total_requests: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Ask the accept loop to stop after its current iteration.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Bind the socket and serve until shutdown is requested.
    pub fn run(self: &Arc<Self>) -> std::io::Result<()> {
        if self.config.socket_path.exists() {
            std::fs::remove_file(&self.config.socket_path)?;
        }
        if let Some(parent) = self.config.socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&self.config.socket_path)?;
        listener.set_nonblocking(true)?;

        info!(
            socket = %self.config.socket_path.display(),
            max_connections = self.config.max_connections,
            "search daemon listening"
        );

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("shutdown requested, stopping daemon");
                break;
            }

            match listener.accept() {
                Ok((stream, _addr)) => {
                    let active = self.active_connections.fetch_add(1, Ordering::SeqCst);
                    if active >= self.config.max_connections as u64 {
                        self.active_connections.fetch_sub(1, Ordering::SeqCst);
                        warn!(
                            active = active,
                            max = self.config.max_connections,
                            "max connections reached, rejecting"
                        );
                        continue;
                    }
                    let daemon = Arc::clone(self);
                    std::thread::spawn(move || {
                        if let Err(e) = daemon.handle_connection(stream) {
                            debug!(error = %e, "connection error");
                        }
                        daemon.active_connections.fetch_sub(1, Ordering::SeqCst);
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => {
                    error!(error = %e, "accept error");
                    std::thread::sleep(Duration::from_millis(100));
                }
            }
        }

        if self.config.socket_path.exists() {
            let _ = std::fs::remove_file(&self.config.socket_path);
        }
        info!("search daemon stopped");
        Ok(())
    }

    /// Handle one client connection: a loop of framed request/response pairs.
    fn handle_connection(&self, mut stream: UnixStream) -> std::io::Result<()> {
        stream.set_read_timeout(Some(self.config.request_timeout))?;
        stream.set_write_timeout(Some(self.config.request_timeout))?;

        loop {
            let mut len_buf = [0u8; 4];
            match stream.read_exact(&mut len_buf) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(()),
                Err(e) => return Err(e),
            }
            let len = u32::from_be_bytes(len_buf) as usize;
            if len > MAX_FRAME_LEN {
                warn!(len = len, "oversized frame, closing connection");
                return Ok(());
            }

            let mut payload = vec![0u8; len];
            stream.read_exact(&mut payload)?;

            let (request_id, response) = match decode_message::<Request>(&payload) {
                Ok(msg) if msg.version != PROTOCOL_VERSION => (
                    msg.request_id,
                    Response::Error(ErrorResponse {
                        code: ErrorCode::VersionMismatch,
                        message: format!(
                            "protocol version mismatch: expected {PROTOCOL_VERSION}, got {}",
                            msg.version
                        ),
                    }),
                ),
                Ok(msg) => {
                    self.total_requests.fetch_add(1, Ordering::Relaxed);
                    (msg.request_id.clone(), self.dispatch(msg.payload))
                }
                Err(e) => (
                    String::new(),
                    Response::Error(ErrorResponse {
                        code: ErrorCode::InvalidInput,
                        message: e.to_string(),
                    }),
                ),
            };

            let frame = FramedMessage::new(request_id, response);
            let encoded = encode_message(&frame)
                .map_err(|e| std::io::Error::other(e.to_string()))?;
            stream.write_all(&encoded)?;

            if self.shutdown.load(Ordering::SeqCst) {
                return Ok(());
            }
        }
    }

    fn dispatch(&self, request: Request) -> Response {
        match request {
            Request::Search {
                term,
                domain,
                context,
                requester,
            } => {
                let oracle = TieredOracle::from(requester);
                Response::Search(self.executor.execute(&term, domain, &context, &oracle))
            }
            Request::Bootstrap { requester } => {
                let oracle = TieredOracle::from(requester);
                Response::Bootstrap(self.executor.bootstrap(&oracle))
            }
            Request::Health => Response::Health(HealthStatus {
                uptime_secs: self.uptime_secs(),
                version: PROTOCOL_VERSION,
                ready: true,
                total_requests: self.total_requests.load(Ordering::Relaxed),
            }),
            Request::Shutdown => {
                self.shutdown.store(true, Ordering::SeqCst);
                Response::Shutdown {
                    message: "shutting down".into(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::permission::{PermissionLevel, Requester};
    use crate::model::types::{DomainId, Status};
    use crate::server::executor::default_categories;
    use crate::server::menu::MenuRegistry;
    use crate::storage::sqlite::Catalog;

    fn daemon() -> Arc<SearchDaemon> {
        let catalog = Catalog::open_in_memory().unwrap();
        catalog
            .insert_document("article", "Release Notes", Status::Published, 1, None, None)
            .unwrap();
        let executor = Arc::new(QueryExecutor::new(
            Arc::new(catalog),
            MenuRegistry::builtin(),
            default_categories(),
        ));
        Arc::new(SearchDaemon::new(ServerConfig::default(), executor))
    }

    #[test]
    fn dispatch_search_and_health() {
        let daemon = daemon();
        let requester = Requester {
            account_id: 1,
            level: PermissionLevel::Baseline,
        };
        let resp = daemon.dispatch(Request::Search {
            term: "release".into(),
            domain: DomainId::Documents,
            context: "palette".into(),
            requester,
        });
        match resp {
            Response::Search(r) => assert_eq!(r.total_count, 1),
            other => panic!("expected Search response, got {other:?}"),
        }

        match daemon.dispatch(Request::Health) {
            Response::Health(h) => {
                assert!(h.ready);
                assert_eq!(h.version, PROTOCOL_VERSION);
            }
            other => panic!("expected Health response, got {other:?}"),
        }
    }

    #[test]
    fn dispatch_shutdown_sets_flag() {
        let daemon = daemon();
        match daemon.dispatch(Request::Shutdown) {
            Response::Shutdown { .. } => {}
            other => panic!("expected Shutdown response, got {other:?}"),
        }
        assert!(daemon.shutdown.load(Ordering::SeqCst));
    }

    #[test]
    fn config_env_defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.max_connections, 16);
        assert_eq!(cfg.request_timeout, Duration::from_secs(30));
        assert_eq!(cfg.categories, default_categories());
    }
}
