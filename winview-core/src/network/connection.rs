use std::time::Duration;

use bytes::BytesMut;
use futures::FutureExt;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::codec::framer::DEFAULT_MAX_PAYLOAD;
use crate::control::UiEvent;
use crate::error::WinViewError;
use crate::session::{Session, SessionObserver};

/// Per-connection tuning.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Largest package a client may announce.
    pub max_payload: u32,
    /// Close the session when the peer sends nothing for this long.
    pub idle_timeout: Option<Duration>,
    /// Initial capacity of the read buffer.
    pub read_chunk: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_payload: DEFAULT_MAX_PAYLOAD,
            idle_timeout: None,
            read_chunk: 64 * 1024,
        }
    }
}

/// Owner-side handle to a running session task.
#[derive(Debug)]
pub struct SessionHandle {
    id: u8,
    // Channel to hand UI events to the session task
    tx: mpsc::Sender<UiEvent>,
    task: JoinHandle<()>,
}

impl SessionHandle {
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Queue a UI event for the client. Fails once the session is dead.
    pub async fn send_event(&self, event: UiEvent) -> Result<(), WinViewError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| WinViewError::SessionClosed(self.id))
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Hang up and wait for the session task to end.
    ///
    /// Events already queued are still written before the connection closes.
    pub async fn join(self) -> Result<(), WinViewError> {
        let Self { id, tx, task } = self;
        drop(tx);
        task.await
            .map_err(|e| WinViewError::Other(format!("session {id} task failed: {e}")))
    }

    /// Drop the connection without notifying the client.
    pub fn abort(&self) {
        self.task.abort();
    }
}

/// Drives one [`Session`] over a byte stream.
pub struct SessionConnection<S, O> {
    stream: S,
    session: Session,
    commands: mpsc::Receiver<UiEvent>,
    observer: O,
    config: SessionConfig,
}

impl<S, O> SessionConnection<S, O>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    O: SessionObserver + Send + 'static,
{
    /// Start serving client `id` on `stream`.
    ///
    /// Returns immediately. The Init package is written by the spawned task
    /// on its first poll, before anything is read, so it is always the first
    /// thing the client sees but is not yet on the wire when this returns.
    pub fn spawn(stream: S, id: u8, config: SessionConfig, observer: O) -> SessionHandle {
        // UI -> Session
        let (tx, commands) = mpsc::channel(32);

        let conn = Self {
            stream,
            session: Session::new(id, config.max_payload),
            commands,
            observer,
            config,
        };
        let task = tokio::spawn(conn.run());

        SessionHandle { id, tx, task }
    }

    async fn run(mut self) {
        let id = self.session.id();

        if let Err(e) = self.handshake().await {
            warn!(session = id, "can not write init package: {e}");
            let _ = self.session.fail_handshake(&mut self.observer);
            return;
        }
        info!(session = id, "session active");

        let mut buf = BytesMut::with_capacity(self.config.read_chunk);
        let mut deadline = self.config.idle_timeout.map(|t| Instant::now() + t);

        loop {
            buf.clear();
            tokio::select! {
                // Bytes already sent by the peer are handled before any command.
                biased;

                read = read_some(&mut self.stream, &mut buf, deadline) => match read {
                    Ok(0) => {
                        info!(session = id, "peer disconnected");
                        break;
                    }
                    Ok(n) => {
                        debug!(session = id, bytes = n, "received");
                        deadline = self.config.idle_timeout.map(|t| Instant::now() + t);
                        if let Err(e) = self.session.receive(&buf, &mut self.observer) {
                            warn!(session = id, "dropping connection: {e}");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(session = id, "read failed: {e}");
                        break;
                    }
                },
                command = self.commands.recv() => match command {
                    Some(event) => {
                        if let Err(e) = self.write_event(event).await {
                            warn!(session = id, "can not write event: {e}");
                            break;
                        }
                    }
                    // Owner dropped the handle.
                    None => {
                        self.drain_ready(&mut buf);
                        break;
                    }
                },
            }
        }

        let _ = self.session.close(&mut self.observer);
        let _ = self.stream.shutdown().await;
    }

    /// Feed the session whatever the peer has already sent, without waiting
    /// for more.
    fn drain_ready(&mut self, buf: &mut BytesMut) {
        let id = self.session.id();
        loop {
            buf.clear();
            let read = self.stream.read_buf(buf).now_or_never();
            match read {
                Some(Ok(n)) if n > 0 => {
                    if let Err(e) = self.session.receive(buf, &mut self.observer) {
                        warn!(session = id, "dropping connection: {e}");
                        return;
                    }
                }
                _ => return,
            }
        }
    }

    async fn handshake(&mut self) -> Result<(), WinViewError> {
        let init = self.session.init_package()?;
        self.stream.write_all(&init).await?;
        self.stream.flush().await?;
        self.session.complete_handshake()
    }

    async fn write_event(&mut self, event: UiEvent) -> Result<(), WinViewError> {
        let package = self.session.event_package(event)?;
        self.stream.write_all(&package).await?;
        self.stream.flush().await?;
        debug!(session = self.session.id(), ?event, "event sent");
        Ok(())
    }
}

async fn read_some<S: AsyncRead + Unpin>(
    stream: &mut S,
    buf: &mut BytesMut,
    deadline: Option<Instant>,
) -> Result<usize, WinViewError> {
    match deadline {
        Some(at) => {
            let limit = at.saturating_duration_since(Instant::now());
            tokio::time::timeout_at(at, stream.read_buf(buf))
                .await
                .map_err(|_| WinViewError::Timeout(limit))?
                .map_err(WinViewError::from)
        }
        None => Ok(stream.read_buf(buf).await?),
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::framer::frame_package;
    use crate::frame::encode_present;
    use crate::message::PixelFormat;
    use crate::session::SessionEvent;
    use tokio_test::io::Builder;

    fn present(id: u8, w: u16, h: u16) -> Vec<u8> {
        let pixels = vec![1u8; w as usize * h as usize];
        let payload = encode_present(id, PixelFormat::Grayscale8, w, h, &pixels).unwrap();
        frame_package(&payload).unwrap().to_vec()
    }

    async fn drain(mut rx: mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Some(e) = rx.recv().await {
            events.push(e);
        }
        events
    }

    #[tokio::test]
    async fn init_goes_out_first_then_frames_are_read() {
        let bytes = present(5, 2, 2);
        let mock = Builder::new()
            .write(&[0, 0, 0, 2, 0, 5])
            .read(&bytes[..6])
            .read(&bytes[6..])
            .build();

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SessionConnection::spawn(mock, 5, SessionConfig::default(), tx);
        handle.join().await.unwrap();

        let events = drain(rx).await;
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], SessionEvent::DimensionsChanged { session: 5, .. }));
        match &events[1] {
            SessionEvent::FrameUpdated { frame, .. } => assert_eq!(frame.pixels, vec![1; 4]),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(events[2], SessionEvent::Dead { session: 5 });
    }

    #[tokio::test]
    async fn failed_init_write_kills_the_session() {
        let mock = Builder::new()
            .write_error(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone"))
            .build();

        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SessionConnection::spawn(mock, 1, SessionConfig::default(), tx);
        handle.join().await.unwrap();

        assert_eq!(drain(rx).await, vec![SessionEvent::Dead { session: 1 }]);
    }

    #[tokio::test]
    async fn invalid_present_is_skipped() {
        let mut bytes = present(9, 1, 1); // wrong id
        bytes.extend(present(3, 1, 1));
        let mock = Builder::new().write(&[0, 0, 0, 2, 0, 3]).read(&bytes).build();

        let (tx, rx) = mpsc::unbounded_channel();
        SessionConnection::spawn(mock, 3, SessionConfig::default(), tx)
            .join()
            .await
            .unwrap();

        let frames = drain(rx)
            .await
            .into_iter()
            .filter(|e| matches!(e, SessionEvent::FrameUpdated { .. }))
            .count();
        assert_eq!(frames, 1);
    }

    #[tokio::test]
    async fn oversized_package_closes_the_session() {
        let mock = Builder::new()
            .write(&[0, 0, 0, 2, 0, 0])
            .read(&[0xFF, 0xFF, 0xFF, 0xFF])
            .build();

        let config = SessionConfig {
            max_payload: 1024,
            ..SessionConfig::default()
        };
        let (tx, rx) = mpsc::unbounded_channel();
        SessionConnection::spawn(mock, 0, config, tx)
            .join()
            .await
            .unwrap();

        assert_eq!(drain(rx).await, vec![SessionEvent::Dead { session: 0 }]);
    }

    #[tokio::test]
    async fn events_are_written_after_init() {
        let (client, server) = tokio::io::duplex(1024);
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SessionConnection::spawn(server, 7, SessionConfig::default(), tx);

        handle.send_event(UiEvent::Close).await.unwrap();
        handle
            .send_event(UiEvent::Resize {
                width: 300,
                height: 200,
            })
            .await
            .unwrap();

        let mut client = client;
        let mut got = [0u8; 6 + 6 + 10];
        client.read_exact(&mut got).await.unwrap();
        assert_eq!(&got[..6], &[0, 0, 0, 2, 0, 7]);
        assert_eq!(&got[6..12], &[0, 0, 0, 2, 1, 0]);
        assert_eq!(&got[12..], &[0, 0, 0, 6, 1, 1, 0x01, 0x2C, 0x00, 0xC8]);

        drop(client);
        handle.join().await.unwrap();
        assert_eq!(drain(rx).await, vec![SessionEvent::Dead { session: 7 }]);
    }

    #[tokio::test]
    async fn frames_sent_before_hang_up_are_never_lost() {
        for _ in 0..50 {
            let mock = Builder::new()
                .write(&[0, 0, 0, 2, 0, 4])
                .read(&present(4, 2, 2))
                .build();

            let (tx, rx) = mpsc::unbounded_channel();
            SessionConnection::spawn(mock, 4, SessionConfig::default(), tx)
                .join()
                .await
                .unwrap();

            let frames = drain(rx)
                .await
                .into_iter()
                .filter(|e| matches!(e, SessionEvent::FrameUpdated { .. }))
                .count();
            assert_eq!(frames, 1);
        }
    }

    #[tokio::test]
    async fn buffered_frame_is_applied_when_the_handle_is_dropped() {
        let (mut client, server) = tokio::io::duplex(1024);
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = SessionConnection::spawn(server, 6, SessionConfig::default(), tx);

        let mut init = [0u8; 6];
        client.read_exact(&mut init).await.unwrap();
        client.write_all(&present(6, 2, 2)).await.unwrap();

        handle.join().await.unwrap();
        let events = drain(rx).await;
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::FrameUpdated { session: 6, .. })));
        assert_eq!(events.last(), Some(&SessionEvent::Dead { session: 6 }));
    }

    async fn next_dead(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Option<u8> {
        while let Some(event) = rx.recv().await {
            if let SessionEvent::Dead { session } = event {
                return Some(session);
            }
        }
        None
    }

    #[tokio::test]
    async fn idle_peer_is_dropped() {
        let (client, server) = tokio::io::duplex(64);
        let config = SessionConfig {
            idle_timeout: Some(Duration::from_millis(50)),
            ..SessionConfig::default()
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let started = Instant::now();
        let handle = SessionConnection::spawn(server, 2, config, tx);

        // Handle and client both stay alive: only the deadline can end it.
        let dead = tokio::time::timeout(Duration::from_secs(2), next_dead(&mut rx))
            .await
            .expect("idle session was not dropped");
        assert_eq!(dead, Some(2));
        assert!(started.elapsed() >= Duration::from_millis(50));
        handle.join().await.unwrap();
        drop(client);
    }

    #[tokio::test]
    async fn traffic_inside_the_window_keeps_the_session() {
        let (mut client, server) = tokio::io::duplex(1024);
        let config = SessionConfig {
            idle_timeout: Some(Duration::from_millis(200)),
            ..SessionConfig::default()
        };
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = SessionConnection::spawn(server, 8, config, tx);

        let mut init = [0u8; 6];
        client.read_exact(&mut init).await.unwrap();

        // 8 x 50 ms is twice the idle window.
        for _ in 0..8 {
            client.write_all(&present(8, 1, 1)).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        while let Ok(event) = rx.try_recv() {
            assert_ne!(event, SessionEvent::Dead { session: 8 });
        }
        assert!(!handle.is_finished());

        // Silence now ends it.
        let dead = tokio::time::timeout(Duration::from_secs(2), next_dead(&mut rx))
            .await
            .expect("session outlived its idle window");
        assert_eq!(dead, Some(8));
        drop(client);
    }

    #[tokio::test]
    async fn without_idle_timeout_a_silent_peer_stays() {
        let (client, server) = tokio::io::duplex(64);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = SessionConnection::spawn(server, 9, SessionConfig::default(), tx);

        let waited = tokio::time::timeout(Duration::from_millis(100), next_dead(&mut rx)).await;
        assert!(waited.is_err());
        assert!(!handle.is_finished());

        handle.join().await.unwrap();
        assert_eq!(next_dead(&mut rx).await, Some(9));
        drop(client);
    }
}
