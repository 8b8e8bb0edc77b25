//! Raw TCP (telnet-style) channel adapter.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::channel::{ChannelAdapter, DataCallback};
use crate::error::ChannelError;

/// Bytes of received history kept for replay.
pub const HISTORY_CAPACITY: usize = 100 * 1024;

const READ_CHUNK: usize = 4096;

/// A [`ChannelAdapter`] over a plain TCP stream.
///
/// A background task reads the socket and push-delivers every chunk to the
/// registered data callback, keeping the last [`HISTORY_CAPACITY`] bytes.
///
/// # Examples
///
/// ```no_run
/// use shell_catalog_discovery::{ChannelAdapter, ResponseBuffer, TcpChannel};
///
/// # async fn demo() -> Result<(), shell_catalog_discovery::ChannelError> {
/// let channel = TcpChannel::new();
/// let buffer = ResponseBuffer::new();
/// channel.set_data_callback(buffer.sink());
/// channel.connect("192.168.1.20:23").await?;
/// channel.send("help\n").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct TcpChannel {
    writer: tokio::sync::Mutex<Option<OwnedWriteHalf>>,
    open: Arc<AtomicBool>,
    callback: Arc<RwLock<Option<DataCallback>>>,
    history: Arc<Mutex<VecDeque<u8>>>,
    read_task: Mutex<Option<JoinHandle<()>>>,
}

impl TcpChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connects, replacing any existing connection.
    pub async fn connect(&self, addr: impl ToSocketAddrs) -> Result<(), ChannelError> {
        if self.is_open() {
            self.disconnect().await;
        }

        let stream = TcpStream::connect(addr).await?;
        let peer = stream.peer_addr().ok();
        let (reader, writer) = stream.into_split();
        *self.writer.lock().await = Some(writer);
        self.open.store(true, Ordering::SeqCst);

        let task = tokio::spawn(read_loop(
            reader,
            Arc::clone(&self.open),
            Arc::clone(&self.callback),
            Arc::clone(&self.history),
        ));
        if let Some(previous) = self.read_task.lock().replace(task) {
            previous.abort();
        }

        info!(peer = ?peer, "channel connected");
        Ok(())
    }

    /// Closes the connection and stops the read loop.
    pub async fn disconnect(&self) {
        self.open.store(false, Ordering::SeqCst);
        if let Some(task) = self.read_task.lock().take() {
            task.abort();
        }
        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(err) = writer.shutdown().await {
                debug!(error = %err, "error closing writer");
            }
        }
    }

    /// Registers the push-delivery target for inbound chunks.
    pub fn set_data_callback(&self, callback: DataCallback) {
        *self.callback.write() = Some(callback);
    }

    /// The most recent received bytes, oldest first.
    pub fn history(&self) -> Vec<u8> {
        self.history.lock().iter().copied().collect()
    }
}

#[async_trait]
impl ChannelAdapter for TcpChannel {
    async fn send(&self, text: &str) -> Result<(), ChannelError> {
        if !self.is_open() {
            return Err(ChannelError::NotOpen);
        }
        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(ChannelError::NotOpen)?;
        writer.write_all(text.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}

async fn read_loop(
    mut reader: OwnedReadHalf,
    open: Arc<AtomicBool>,
    callback: Arc<RwLock<Option<DataCallback>>>,
    history: Arc<Mutex<VecDeque<u8>>>,
) {
    let mut chunk = [0u8; READ_CHUNK];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) => {
                info!("connection closed by peer");
                break;
            }
            Ok(n) => {
                let data = &chunk[..n];
                {
                    let mut history = history.lock();
                    history.extend(data);
                    let excess = history.len().saturating_sub(HISTORY_CAPACITY);
                    history.drain(..excess);
                }
                let sink = callback.read().clone();
                if let Some(sink) = sink {
                    sink(data);
                }
            }
            Err(err) => {
                warn!(error = %err, "read loop failed");
                break;
            }
        }
    }
    open.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpListener;

    use super::*;
    use crate::buffer::ResponseBuffer;

    #[tokio::test]
    async fn test_send_without_connection_fails() {
        let channel = TcpChannel::new();
        assert!(!channel.is_open());
        assert!(matches!(
            channel.send("help\n").await,
            Err(ChannelError::NotOpen)
        ));
    }

    #[tokio::test]
    async fn test_round_trip_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            let (read, mut write) = socket.into_split();
            let mut lines = BufReader::new(read).lines();
            let line = lines.next_line().await.unwrap().unwrap();
            assert_eq!(line, "bypass --help");
            write
                .write_all(b"bypass - Bypass shell\r\nuart:~$ ")
                .await
                .unwrap();
            // keep the socket open until the client is done
            let _ = lines.next_line().await;
        });

        let channel = TcpChannel::new();
        let buffer = ResponseBuffer::new();
        channel.set_data_callback(buffer.sink());
        channel.connect(addr).await.unwrap();
        assert!(channel.is_open());

        buffer.begin();
        channel.send("bypass --help\n").await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while !buffer.snapshot().ends_with("uart:~$ ") {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert!(buffer.finish().starts_with("bypass - Bypass shell"));
        assert!(String::from_utf8(channel.history()).unwrap().contains("Bypass shell"));

        channel.disconnect().await;
        assert!(!channel.is_open());
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_peer_close_marks_channel_closed() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            drop(socket);
        });

        let channel = TcpChannel::new();
        channel.connect(addr).await.unwrap();
        server.await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while channel.is_open() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        assert!(matches!(
            channel.send("help\n").await,
            Err(ChannelError::NotOpen)
        ));
    }
}
