//! TCP listener serving log streams
//!
//! Each connection starts with one request line, a URL query string such as
//! `maxLines=20&level=WARNING&includeEntity=unit-mysql-*`. The server answers
//! with a JSON ack line and, if the request was accepted, the matching log
//! lines until the stream ends.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use debuglog_stream::{LogStream, QueryParams, StreamError, StreamParams, TailerConfig, ack};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::config::Config;

/// Counter for generating connection IDs
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("connection closed before a request was sent")]
    NoRequest,

    #[error("request line exceeds {limit} bytes")]
    RequestTooLong { limit: usize },

    #[error(transparent)]
    Stream(#[from] StreamError),
}

/// Settings shared by all connections
#[derive(Debug, Clone)]
struct Settings {
    log_path: PathBuf,
    max_request_bytes: usize,
    tailer: TailerConfig,
}

pub struct Server {
    listen: String,
    settings: Arc<Settings>,
}

impl Server {
    pub fn new(config: &Config) -> Self {
        Self {
            listen: config.server.listen.clone(),
            settings: Arc::new(Settings {
                log_path: config.log_path(),
                max_request_bytes: config.server.max_request_bytes,
                tailer: config.tailer_config(),
            }),
        }
    }

    /// Bind the configured address and serve until the process exits
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = TcpListener::bind(&self.listen).await?;
        self.serve(listener).await
    }

    /// Accept connections from an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<(), ServerError> {
        info!(
            addr = %listener.local_addr()?,
            log = %self.settings.log_path.display(),
            "debug log server listening"
        );

        loop {
            match listener.accept().await {
                Ok((stream, peer)) => {
                    let conn_id = CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
                    let settings = Arc::clone(&self.settings);

                    tokio::spawn(async move {
                        info!(conn_id, %peer, "debug log handler starting");
                        match handle_connection(stream, &settings).await {
                            Ok(()) => info!(conn_id, "debug log stream finished"),
                            Err(ServerError::NoRequest) => {
                                debug!(conn_id, "peer closed without a request")
                            }
                            Err(ServerError::Stream(e)) if e.is_ack_level() => {
                                warn!(conn_id, error = %e, "debug log request refused")
                            }
                            Err(e) => error!(conn_id, error = %e, "debug-log handler error"),
                        }
                    });
                }
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                }
            }
        }
    }
}

async fn handle_connection(stream: TcpStream, settings: &Settings) -> Result<(), ServerError> {
    let (read_half, mut write_half) = stream.into_split();

    let query = match read_request(read_half, settings.max_request_bytes).await {
        Ok(query) => query,
        Err(ServerError::NoRequest) => return Err(ServerError::NoRequest),
        Err(e) => {
            let _ = ack::send_error(&mut write_half, &e).await;
            return Err(e);
        }
    };

    let params = match StreamParams::parse(&QueryParams::from_query(&query)) {
        Ok(params) => params,
        Err(e) => {
            let _ = ack::send_error(&mut write_half, &e).await;
            return Err(StreamError::from(e).into());
        }
    };
    debug!(?params, "debug log request accepted");

    LogStream::new(params)
        .with_config(settings.tailer.clone())
        .serve(&settings.log_path, write_half)
        .await?;
    Ok(())
}

/// Read the request line, without its terminator or a leading `?`
///
/// `limit` bounds the line itself; a `\n` or `\r\n` terminator is not counted.
async fn read_request<R>(reader: R, limit: usize) -> Result<String, ServerError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader.take(limit as u64 + 2));
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Err(ServerError::NoRequest);
    }

    let line = line.strip_suffix('\n').unwrap_or(&line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    if line.len() > limit {
        return Err(ServerError::RequestTooLong { limit });
    }

    Ok(line.strip_prefix('?').unwrap_or(line).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use debuglog_stream::AckRecord;
    use tokio::io::AsyncWriteExt;

    fn log_line(n: usize, level: &str) -> String {
        format!("unit-mysql-{n}: 2014-03-24 22:34:25 {level} juju.worker.uniter line {n}\n")
    }

    async fn start_server(contents: &str) -> (std::net::SocketAddr, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("all-machines.log"), contents).unwrap();

        let mut config = Config::default();
        config.server.log_dir = dir.path().to_path_buf();
        config.tail.poll_interval_ms = 10;

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = Server::new(&config);
        tokio::spawn(async move { server.serve(listener).await });
        (addr, dir)
    }

    async fn request(addr: std::net::SocketAddr, query: &str) -> (AckRecord, String) {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(format!("{query}\n").as_bytes())
            .await
            .unwrap();

        let mut reader = BufReader::new(stream);
        let mut ack_line = String::new();
        reader.read_line(&mut ack_line).await.unwrap();
        let ack = serde_json::from_str(ack_line.trim_end()).unwrap();
        let mut rest = String::new();
        reader.read_to_string(&mut rest).await.unwrap();
        (ack, rest)
    }

    #[tokio::test]
    async fn test_stream_with_max_lines() {
        let contents: String = (0..5).map(|n| log_line(n, "INFO")).collect();
        let (addr, _dir) = start_server(&contents).await;

        let (ack, out) = request(addr, "?replay=true&maxLines=3").await;
        assert_eq!(ack, AckRecord::ok());
        let expected: String = (0..3).map(|n| log_line(n, "INFO")).collect();
        assert_eq!(out, expected);
    }

    #[tokio::test]
    async fn test_validation_error_acked() {
        let (addr, _dir) = start_server("").await;

        let (ack, out) = request(addr, "maxLines=many").await;
        let message = ack.error.unwrap().message;
        assert_eq!(message, r#"maxLines value "many" is not a valid unsigned number"#);
        assert_eq!(out, "");
    }

    #[tokio::test]
    async fn test_missing_log_file_acked() {
        let (addr, dir) = start_server("").await;
        std::fs::remove_file(dir.path().join("all-machines.log")).unwrap();

        let (ack, _) = request(addr, "").await;
        assert!(ack.error.unwrap().message.starts_with("cannot open log file:"));
    }

    #[tokio::test]
    async fn test_request_too_long() {
        let limit = 16;
        let data = "a".repeat(64);
        let err = read_request(data.as_bytes(), limit).await.unwrap_err();
        assert!(matches!(err, ServerError::RequestTooLong { limit: 16 }));
    }

    #[tokio::test]
    async fn test_request_at_limit_with_crlf() {
        let query = read_request(&b"level=ERROR\r\n"[..], 11).await.unwrap();
        assert_eq!(query, "level=ERROR");

        let err = read_request(&b"level=ERRORS\r\n"[..], 11).await.unwrap_err();
        assert!(matches!(err, ServerError::RequestTooLong { limit: 11 }));
    }

    #[tokio::test]
    async fn test_closed_before_request() {
        let err = read_request(&b""[..], 64).await.unwrap_err();
        assert!(matches!(err, ServerError::NoRequest));

        // an empty line is still a request, for a default stream
        assert_eq!(read_request(&b"\n"[..], 64).await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_read_request_strips_prefix() {
        let query = read_request(&b"?level=ERROR\r\nignored"[..], 64).await.unwrap();
        assert_eq!(query, "level=ERROR");
    }
}
