//! Output sinks for encoded protocol text.
//!
//! A session picks exactly one sink when it starts: a TCP stream to the
//! collection endpoint, or standard output when collection is disabled. The
//! session writes identical bytes to either.

use std::{
    io,
    sync::{Arc, Mutex},
};

use tokio::{
    io::{AsyncWrite, AsyncWriteExt, Stdout},
    net::TcpStream,
};
use tracing::{debug, info};

use super::{
    error::{OmlError, Result},
    target::CollectTarget,
};

/// Destination for header and data lines.
#[async_trait::async_trait]
pub trait Sink: Send {
    /// Writes and flushes `data` in full.
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Flushes and releases the underlying resource.
    async fn close(&mut self) -> io::Result<()>;

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

/// Streams protocol text to a collection endpoint over TCP.
pub struct NetworkSink {
    stream: TcpStream,
    target: CollectTarget,
}

impl NetworkSink {
    /// Opens the connection. There is no retry.
    ///
    /// # Errors
    ///
    /// Returns `OmlError::Connection` if the endpoint cannot be reached.
    pub async fn connect(target: &CollectTarget) -> Result<Self> {
        info!("Connecting to collection endpoint {}", target);
        let stream = TcpStream::connect(target.address())
            .await
            .map_err(|source| OmlError::Connection {
                target: target.to_string(),
                source,
            })?;
        // Each data line should leave as soon as it is written.
        if let Err(e) = stream.set_nodelay(true) {
            debug!("Could not disable Nagle on {}: {}", target, e);
        }
        Ok(NetworkSink {
            stream,
            target: target.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Sink for NetworkSink {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.stream.write_all(data).await?;
        self.stream.flush().await
    }

    async fn close(&mut self) -> io::Result<()> {
        self.stream.flush().await?;
        self.stream.shutdown().await
    }

    fn describe(&self) -> String {
        self.target.to_string()
    }
}

/// Writes protocol text to standard output (disabled mode).
///
/// The writer is a type parameter so the exact stdout bytes can be captured.
pub struct StdoutSink<W = Stdout> {
    out: W,
}

impl StdoutSink {
    pub fn new() -> Self {
        StdoutSink {
            out: tokio::io::stdout(),
        }
    }
}

impl<W> StdoutSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    /// Uses `out` in place of the process stdout.
    pub fn with_writer(out: W) -> Self {
        StdoutSink { out }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl<W> Sink for StdoutSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.out.write_all(data).await?;
        self.out.flush().await
    }

    async fn close(&mut self) -> io::Result<()> {
        self.out.flush().await
    }

    fn describe(&self) -> String {
        "stdout".to_string()
    }
}

/// Collects everything written into a shared in-memory buffer.
///
/// Clones share the buffer, so a caller can keep one handle and give the
/// other to a session.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    buffer: Arc<Mutex<Vec<u8>>>,
    closed: Arc<Mutex<bool>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.buffer.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Buffer contents as UTF-8 text (lossy).
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes()).into_owned()
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl Sink for MemorySink {
    async fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.buffer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend_from_slice(data);
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        *self.closed.lock().unwrap_or_else(|e| e.into_inner()) = true;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

#[cfg(test)]
mod tests {
    use tokio::{io::AsyncReadExt, net::TcpListener};

    use super::*;

    #[tokio::test]
    async fn memory_sink_shares_buffer_between_clones() {
        let handle = MemorySink::new();
        let mut sink = handle.clone();

        sink.write_all(b"line one\n").await.unwrap();
        sink.write_all(b"line two\n").await.unwrap();
        assert!(!handle.is_closed());
        sink.close().await.unwrap();

        assert_eq!(handle.contents(), "line one\nline two\n");
        assert!(handle.is_closed());
    }

    #[tokio::test]
    async fn stdout_sink_writes_through_its_writer() {
        let (writer, mut reader) = tokio::io::duplex(1024);
        let mut sink = StdoutSink::with_writer(writer);
        assert_eq!(sink.describe(), "stdout");

        sink.write_all(b"protocol: 4\n").await.unwrap();
        sink.close().await.unwrap();
        drop(sink);

        let mut received = Vec::new();
        reader.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"protocol: 4\n");
    }

    #[tokio::test]
    async fn network_sink_delivers_bytes_and_closes() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut received = Vec::new();
            socket.read_to_end(&mut received).await.unwrap();
            received
        });

        let target = CollectTarget {
            host: "127.0.0.1".into(),
            port,
        };
        let mut sink = NetworkSink::connect(&target).await.unwrap();
        assert_eq!(sink.describe(), format!("tcp:127.0.0.1:{}", port));
        sink.write_all(b"protocol: 4\n").await.unwrap();
        sink.close().await.unwrap();

        assert_eq!(server.await.unwrap(), b"protocol: 4\n");
    }

    #[tokio::test]
    async fn network_sink_reports_connection_failure() {
        // Bind then drop to obtain a port nobody listens on.
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            listener.local_addr().unwrap().port()
        };
        let target = CollectTarget {
            host: "127.0.0.1".into(),
            port,
        };

        match NetworkSink::connect(&target).await {
            Err(OmlError::Connection { target, .. }) => {
                assert_eq!(target, format!("tcp:127.0.0.1:{}", port))
            }
            Err(other) => panic!("unexpected error: {:?}", other),
            Ok(_) => panic!("connection should have failed"),
        }
    }
}
