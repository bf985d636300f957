//! Client for the remote log service
//!
//! Every call writes one JSON request line to the service's Unix socket and
//! reads one JSON response line back. Calls are serialized over a single
//! connection.

use crate::client::wire::{Request, Response};
use crate::client::{Fetcher, Ingestor, ViewStore};
use crate::config::ClientConfig;
use crate::types::{FilterSpec, Record, View};
use crate::{LogTailError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::debug;

type Connection = BufReader<UnixStream>;

/// Connection to the log service
#[derive(Clone)]
pub struct RemoteClient {
    config: ClientConfig,
    connection: Arc<Mutex<Option<Connection>>>,
    hostname: String,
}

impl RemoteClient {
    /// Connect to the service listening on `socket_path`
    pub async fn connect(socket_path: &str) -> Result<Self> {
        let config = ClientConfig {
            socket_path: socket_path.to_string(),
            ..Default::default()
        };

        Self::with_config(config).await
    }

    /// Connect with custom configuration
    pub async fn with_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let hostname = gethostname::gethostname()
            .to_string_lossy()
            .to_string();

        let connection = Self::dial(&config).await?;
        Ok(Self {
            config,
            connection: Arc::new(Mutex::new(Some(connection))),
            hostname,
        })
    }

    async fn dial(config: &ClientConfig) -> Result<Connection> {
        let connect_future = UnixStream::connect(&config.socket_path);
        let stream = timeout(Duration::from_secs(config.timeout_seconds), connect_future)
            .await
            .map_err(|_| LogTailError::Connection("Connection timeout".to_string()))?
            .map_err(|e| LogTailError::Connection(format!("Failed to connect: {}", e)))?;

        debug!(socket = %config.socket_path, "connected to log service");
        Ok(BufReader::new(stream))
    }

    /// Send one request and wait for its response.
    ///
    /// The connection is only put back after a complete exchange, so a call
    /// that fails, times out or is dropped midway leaves no stale response
    /// behind. The next call dials again when `auto_reconnect` is set.
    async fn call(&self, request: &Request) -> Result<Response> {
        let line = request.to_line()?;
        let mut conn_guard = self.connection.lock().await;

        let mut conn = match conn_guard.take() {
            Some(conn) => conn,
            None if self.config.auto_reconnect => Self::dial(&self.config).await?,
            None => return Err(LogTailError::Connection("Not connected".to_string())),
        };

        let response = timeout(
            Duration::from_secs(self.config.timeout_seconds),
            Self::exchange(&mut conn, &line),
        )
        .await
        .map_err(|_| LogTailError::Connection("Request timeout".to_string()))??;

        *conn_guard = Some(conn);
        response.into_result()
    }

    async fn exchange(conn: &mut Connection, line: &str) -> Result<Response> {
        conn.get_mut().write_all(line.as_bytes()).await?;
        conn.get_mut().flush().await?;

        let mut response = String::new();
        if conn.read_line(&mut response).await? == 0 {
            return Err(LogTailError::Connection(
                "Server closed the connection".to_string(),
            ));
        }

        Ok(serde_json::from_str(response.trim())?)
    }

    /// Close the connection to the service
    pub async fn close(&self) -> Result<()> {
        let mut conn_guard = self.connection.lock().await;
        if let Some(conn) = conn_guard.take() {
            conn.into_inner().shutdown().await.map_err(LogTailError::Io)?;
        }
        Ok(())
    }
}

#[async_trait]
impl Fetcher for RemoteClient {
    async fn fetch(&self, spec: &FilterSpec) -> Result<Vec<Record>> {
        let request = Request::Fetch {
            filter: spec.clone(),
        };
        Ok(self.call(&request).await?.records)
    }
}

#[async_trait]
impl Ingestor for RemoteClient {
    async fn ingest(&self, message: &str, source_token: &str) -> Result<()> {
        let request = Request::Ingest {
            source_token: source_token.to_string(),
            message: message.to_string(),
            hostname: self.hostname.clone(),
            pid: std::process::id(),
            timestamp: Utc::now(),
        };
        self.call(&request).await.map(|_| ())
    }
}

#[async_trait]
impl ViewStore for RemoteClient {
    async fn save_view(&self, view: &View) -> Result<String> {
        let request = Request::SaveView { view: view.clone() };
        self.call(&request)
            .await?
            .id
            .ok_or_else(|| LogTailError::Remote("Service returned no view id".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Source;
    use tempfile::tempdir;
    use tokio::net::UnixListener;

    async fn create_test_server(socket_path: &str) -> UnixListener {
        let _ = std::fs::remove_file(socket_path);
        UnixListener::bind(socket_path).unwrap()
    }

    /// Serve requests with `respond`, recording every request received
    fn spawn_service<F>(listener: UnixListener, seen: Arc<Mutex<Vec<Request>>>, respond: F)
    where
        F: Fn(&Request) -> Option<Response> + Send + Sync + 'static,
    {
        let respond = Arc::new(respond);
        tokio::spawn(async move {
            loop {
                if let Ok((stream, _)) = listener.accept().await {
                    let seen = seen.clone();
                    let respond = respond.clone();
                    tokio::spawn(async move {
                        let mut reader = BufReader::new(stream);
                        let mut line = String::new();
                        while let Ok(n) = reader.read_line(&mut line).await {
                            if n == 0 {
                                break;
                            }
                            let request: Request = serde_json::from_str(line.trim()).unwrap();
                            line.clear();
                            seen.lock().await.push(request.clone());
                            match respond(&request) {
                                Some(response) => {
                                    let out = response.to_line().unwrap();
                                    reader.get_mut().write_all(out.as_bytes()).await.unwrap();
                                }
                                None => break,
                            }
                        }
                    });
                }
            }
        });
    }

    fn spec() -> FilterSpec {
        FilterSpec {
            date_range: Default::default(),
            sources: vec![Source::new("1", "api", "team").at_offset(Some(41))],
            text_queries: vec!["error".to_string()],
            field_filter: None,
            batch_size: 10,
            scroll_direction: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_client_config_defaults() {
        let config = ClientConfig {
            socket_path: "/tmp/test.sock".to_string(),
            ..Default::default()
        };

        assert_eq!(config.socket_path, "/tmp/test.sock");
        assert_eq!(config.timeout_seconds, 5);
        assert!(config.auto_reconnect);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_connection_failure() {
        let config = ClientConfig {
            socket_path: "/tmp/nonexistent_logtail_socket_12345.sock".to_string(),
            timeout_seconds: 1,
            ..Default::default()
        };

        match RemoteClient::with_config(config).await {
            Err(LogTailError::Connection(_)) => {}
            _ => panic!("Expected Connection error"),
        }
    }

    #[tokio::test]
    async fn test_fetch_sends_filter_and_returns_records() {
        let temp_dir = tempdir().unwrap();
        let socket_str = temp_dir.path().join("fetch.sock").to_string_lossy().to_string();
        let listener = create_test_server(&socket_str).await;
        let seen = Arc::new(Mutex::new(Vec::new()));

        spawn_service(listener, seen.clone(), |_| {
            Some(Response::records(vec![
                Record::new("api", "info", "one", 42),
                Record::new("api", "info", "two", 43),
            ]))
        });

        let client = RemoteClient::connect(&socket_str).await.unwrap();
        let records = client.fetch(&spec()).await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].message, "two");

        let seen = seen.lock().await;
        match &seen[0] {
            Request::Fetch { filter } => {
                assert_eq!(filter.sources[0].starting_offset, Some(41));
                assert_eq!(filter.text_queries, vec!["error"]);
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_remote_failure_keeps_connection() {
        let temp_dir = tempdir().unwrap();
        let socket_str = temp_dir.path().join("failure.sock").to_string_lossy().to_string();
        let listener = create_test_server(&socket_str).await;
        let seen = Arc::new(Mutex::new(Vec::new()));

        spawn_service(listener, seen.clone(), |_| Some(Response::failure("bad filter")));

        let client = RemoteClient::connect(&socket_str).await.unwrap();
        let err = client.fetch(&spec()).await.unwrap_err();
        assert!(matches!(err, LogTailError::Remote(ref e) if e == "bad filter"));
        assert!(err.is_transient());
        assert!(client.connection.lock().await.is_some());
    }

    #[tokio::test]
    async fn test_ingest_carries_metadata() {
        let temp_dir = tempdir().unwrap();
        let socket_str = temp_dir.path().join("ingest.sock").to_string_lossy().to_string();
        let listener = create_test_server(&socket_str).await;
        let seen = Arc::new(Mutex::new(Vec::new()));

        spawn_service(listener, seen.clone(), |_| Some(Response::ack()));

        let client = RemoteClient::connect(&socket_str).await.unwrap();
        client.ingest("probe-token", "source-key").await.unwrap();

        let seen = seen.lock().await;
        match &seen[0] {
            Request::Ingest {
                source_token,
                message,
                hostname,
                pid,
                ..
            } => {
                assert_eq!(source_token, "source-key");
                assert_eq!(message, "probe-token");
                assert!(!hostname.is_empty());
                assert_eq!(*pid, std::process::id());
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_save_view_returns_id() {
        let temp_dir = tempdir().unwrap();
        let socket_str = temp_dir.path().join("view.sock").to_string_lossy().to_string();
        let listener = create_test_server(&socket_str).await;
        let seen = Arc::new(Mutex::new(Vec::new()));

        spawn_service(listener, seen.clone(), |request| match request {
            Request::SaveView { .. } => Some(Response::saved("view-7")),
            _ => Some(Response::ack()),
        });

        let client = RemoteClient::connect(&socket_str).await.unwrap();
        let id = client.save_view(&View::from_spec("errors", &spec())).await.unwrap();
        assert_eq!(id, "view-7");

        let seen = seen.lock().await;
        match &seen[0] {
            Request::SaveView { view } => {
                assert_eq!(view.name, "errors");
                assert_eq!(view.sources[0].starting_offset, None);
            }
            other => panic!("unexpected request {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reconnect_after_server_hangup() {
        let temp_dir = tempdir().unwrap();
        let socket_str = temp_dir.path().join("hangup.sock").to_string_lossy().to_string();
        let listener = create_test_server(&socket_str).await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let calls = Arc::new(std::sync::atomic::AtomicUsize::new(0));

        let counter = calls.clone();
        spawn_service(listener, seen.clone(), move |_| {
            // First request: hang up without answering.
            if counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst) == 0 {
                None
            } else {
                Some(Response::records(vec![Record::new("api", "info", "back", 1)]))
            }
        });

        let client = RemoteClient::connect(&socket_str).await.unwrap();
        let err = client.fetch(&spec()).await.unwrap_err();
        assert!(matches!(err, LogTailError::Connection(_)));
        assert!(client.connection.lock().await.is_none());

        let records = client.fetch(&spec()).await.unwrap();
        assert_eq!(records[0].message, "back");
    }

    #[tokio::test]
    async fn test_no_reconnect_when_disabled() {
        let temp_dir = tempdir().unwrap();
        let socket_str = temp_dir.path().join("noreconnect.sock").to_string_lossy().to_string();
        let listener = create_test_server(&socket_str).await;
        let seen = Arc::new(Mutex::new(Vec::new()));

        spawn_service(listener, seen.clone(), |_| Some(Response::ack()));

        let config = ClientConfig {
            socket_path: socket_str.clone(),
            auto_reconnect: false,
            ..Default::default()
        };
        let client = RemoteClient::with_config(config).await.unwrap();
        client.close().await.unwrap();

        let err = client.fetch(&spec()).await.unwrap_err();
        assert!(matches!(err, LogTailError::Connection(_)));
    }

    #[tokio::test]
    async fn test_request_timeout() {
        let temp_dir = tempdir().unwrap();
        let socket_str = temp_dir.path().join("silent.sock").to_string_lossy().to_string();
        let listener = create_test_server(&socket_str).await;

        // Accept and read, never answer.
        let _server_handle = tokio::spawn(async move {
            let mut held = Vec::new();
            loop {
                if let Ok((stream, _)) = listener.accept().await {
                    held.push(stream);
                }
            }
        });

        let config = ClientConfig {
            socket_path: socket_str.clone(),
            timeout_seconds: 1,
            ..Default::default()
        };
        let client = RemoteClient::with_config(config).await.unwrap();

        let started = std::time::Instant::now();
        let err = client.fetch(&spec()).await.unwrap_err();
        assert!(matches!(err, LogTailError::Connection(_)));
        assert!(started.elapsed() >= Duration::from_millis(900));
        assert!(client.connection.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_client_close() {
        let temp_dir = tempdir().unwrap();
        let socket_str = temp_dir.path().join("close.sock").to_string_lossy().to_string();
        let listener = create_test_server(&socket_str).await;
        let seen = Arc::new(Mutex::new(Vec::new()));

        spawn_service(listener, seen.clone(), |_| Some(Response::ack()));

        let client = RemoteClient::connect(&socket_str).await.unwrap();
        assert!(client.close().await.is_ok());
        assert!(client.connection.lock().await.is_none());

        // Default config dials again on the next call.
        client.ingest("after close", "key").await.unwrap();
        assert_eq!(seen.lock().await.len(), 1);
    }
}
