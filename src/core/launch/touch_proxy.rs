// ─── Touch Controller Proxy ───
// Unix socket the in-game touch controller mod connects to. The game finds
// it through `TOUCH_CONTROLLER_PROXY_SOCKET`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};

use super::lifecycle::PeripheralProxy;

/// Line-based proxy: each line from the game is one request; `vibrate`
/// requests are counted and logged with the configured pulse length.
pub struct TouchControllerProxy {
    socket_path: PathBuf,
    task: AsyncMutex<Option<JoinHandle<()>>>,
    vibrations: Arc<AtomicUsize>,
}

impl TouchControllerProxy {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            task: AsyncMutex::new(None),
            vibrations: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn vibration_count(&self) -> usize {
        self.vibrations.load(Ordering::SeqCst)
    }

    /// Dropping this future aborts every client task.
    async fn serve(listener: UnixListener, vibrate_ms: Option<u32>, vibrations: Arc<AtomicUsize>) {
        let mut clients = JoinSet::new();
        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    let stream = match accepted {
                        Ok((stream, _)) => stream,
                        Err(err) => {
                            warn!("Touch proxy accept failed: {}", err);
                            return;
                        }
                    };
                    info!("TouchController client connected");
                    clients.spawn(Self::handle_client(stream, vibrate_ms, Arc::clone(&vibrations)));
                }
                Some(_) = clients.join_next(), if !clients.is_empty() => {}
            }
        }
    }

    async fn handle_client(stream: UnixStream, vibrate_ms: Option<u32>, vibrations: Arc<AtomicUsize>) {
        let mut lines = BufReader::new(stream).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match line.trim() {
                    "vibrate" => {
                        vibrations.fetch_add(1, Ordering::SeqCst);
                        debug!("Vibrate request ({} ms)", vibrate_ms.unwrap_or(0));
                    }
                    other => debug!("Ignoring touch proxy message {:?}", other),
                },
                Ok(None) => break,
                Err(err) => {
                    warn!("Touch proxy client read failed: {}", err);
                    break;
                }
            }
        }
        debug!("TouchController client disconnected");
    }
}

#[async_trait]
impl PeripheralProxy for TouchControllerProxy {
    fn name(&self) -> &str {
        "TouchController proxy"
    }

    async fn start(&self, vibrate_duration_ms: Option<u32>) -> LauncherResult<String> {
        let mut task = self.task.lock().await;
        if task.is_some() {
            return Ok(self.socket_path.to_string_lossy().to_string());
        }

        if let Some(parent) = self.socket_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| LauncherError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }
        // A stale socket from a previous run blocks bind.
        let _ = tokio::fs::remove_file(&self.socket_path).await;
        let listener = UnixListener::bind(&self.socket_path).map_err(|source| LauncherError::Io {
            path: self.socket_path.clone(),
            source,
        })?;

        *task = Some(tokio::spawn(Self::serve(
            listener,
            vibrate_duration_ms,
            Arc::clone(&self.vibrations),
        )));
        info!("TouchController proxy listening on {:?}", self.socket_path);
        Ok(self.socket_path.to_string_lossy().to_string())
    }

    async fn stop(&self) {
        if let Some(task) = self.task.lock().await.take() {
            task.abort();
        }
        let _ = tokio::fs::remove_file(&self.socket_path).await;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    use super::*;

    #[tokio::test]
    async fn proxy_counts_vibrations_and_cleans_up() {
        let dir = std::env::temp_dir().join(format!("touch-proxy-{}", std::process::id()));
        let socket = dir.join("proxy.sock");
        let proxy = TouchControllerProxy::new(&socket);

        let endpoint = proxy.start(Some(120)).await.unwrap();
        assert_eq!(PathBuf::from(&endpoint), socket);

        let mut client = UnixStream::connect(&socket).await.unwrap();
        client.write_all(b"vibrate\nhello\nvibrate\n").await.unwrap();
        client.shutdown().await.unwrap();

        for _ in 0..50 {
            if proxy.vibration_count() == 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(proxy.vibration_count(), 2);

        proxy.stop().await;
        assert!(!socket.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn stop_disconnects_open_clients() {
        let dir = std::env::temp_dir().join(format!("touch-proxy-stop-{}", std::process::id()));
        let socket = dir.join("proxy.sock");
        let proxy = TouchControllerProxy::new(&socket);
        proxy.start(None).await.unwrap();

        let mut client = UnixStream::connect(&socket).await.unwrap();
        client.write_all(b"vibrate\n").await.unwrap();
        for _ in 0..50 {
            if proxy.vibration_count() == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(proxy.vibration_count(), 1);

        proxy.stop().await;
        let mut buf = [0u8; 8];
        let read = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
            .await
            .expect("client should be disconnected");
        assert_eq!(read.unwrap(), 0);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
