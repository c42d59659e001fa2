//! Viewer server core logic.
//!
//! Accepts client connections, gives each one an id and a
//! [`SessionConnection`], and keeps the list of live sessions up to date
//! from the events they raise.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use winview_core::{SessionConnection, SessionEvent, SessionHandle, UiEvent};

use crate::config::ServerConfig;

// ── SessionRegistry ──────────────────────────────────────────────

/// A live session as the viewer sees it.
#[derive(Debug)]
pub struct SessionEntry {
    handle: SessionHandle,
    peer: SocketAddr,
    width: u16,
    height: u16,
    frames: u64,
}

impl SessionEntry {
    pub fn id(&self) -> u8 {
        self.handle.id()
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Size of the latest frame, `(0, 0)` until one arrives.
    pub fn dimensions(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn title(&self) -> String {
        format!("Client {}", self.id())
    }
}

/// Live sessions in connection order, plus the id counter.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    next_id: u8,
    sessions: Vec<SessionEntry>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next free id.
    ///
    /// The counter wraps at 256 and skips ids still in use. `None` when
    /// every id is taken.
    pub fn allocate_id(&mut self) -> Option<u8> {
        for _ in 0..=u8::MAX as usize {
            let id = self.next_id;
            self.next_id = self.next_id.wrapping_add(1);
            if self.get(id).is_none() {
                return Some(id);
            }
        }
        None
    }

    pub fn insert(&mut self, handle: SessionHandle, peer: SocketAddr) {
        info!("Client connected with id: {}", handle.id());
        self.sessions.push(SessionEntry {
            handle,
            peer,
            width: 0,
            height: 0,
            frames: 0,
        });
    }

    pub fn get(&self, id: u8) -> Option<&SessionEntry> {
        self.sessions.iter().find(|s| s.id() == id)
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SessionEntry> {
        self.sessions.iter()
    }

    /// Fold one session notification into the registry.
    pub fn apply(&mut self, event: SessionEvent) {
        let id = event.session();
        match event {
            SessionEvent::DimensionsChanged { width, height, .. } => {
                if let Some(entry) = self.get_mut(id) {
                    if let Some(w) = width {
                        entry.width = w;
                    }
                    if let Some(h) = height {
                        entry.height = h;
                    }
                    info!("{}: {}x{}", entry.title(), entry.width, entry.height);
                }
            }
            SessionEvent::FrameUpdated { frame, .. } => {
                if let Some(entry) = self.get_mut(id) {
                    entry.frames += 1;
                    debug!(
                        session = id,
                        format = %frame.pixel_format,
                        bytes = frame.pixels.len(),
                        "frame"
                    );
                }
            }
            SessionEvent::Dead { .. } => {
                if let Some(i) = self.sessions.iter().position(|s| s.id() == id) {
                    let entry = self.sessions.remove(i);
                    info!("Client with id {id} is dead ({} frames)", entry.frames);
                }
            }
        }
    }

    /// Send `event` to one session.
    pub async fn send(&self, id: u8, event: UiEvent) -> bool {
        match self.get(id) {
            Some(entry) => entry.handle.send_event(event).await.is_ok(),
            None => false,
        }
    }

    /// Ask every session to close, then wait for all of them to hang up.
    pub async fn close_all(&mut self) {
        for entry in &self.sessions {
            if let Err(e) = entry.handle.send_event(UiEvent::Close).await {
                debug!("close not delivered: {e}");
            }
        }
        for entry in self.sessions.drain(..) {
            let id = entry.id();
            if let Err(e) = entry.handle.join().await {
                warn!(session = id, "{e}");
            }
        }
    }

    fn get_mut(&mut self, id: u8) -> Option<&mut SessionEntry> {
        self.sessions.iter_mut().find(|s| s.id() == id)
    }
}

// ── ViewerServer ─────────────────────────────────────────────────

/// The top-level viewer server.
///
/// Owns the listener loop and the session registry. Runs until the stop
/// handle is cleared.
pub struct ViewerServer {
    config: ServerConfig,
    running: Arc<AtomicBool>,
}

impl ViewerServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Obtain a handle that can be used to stop the server from another
    /// task (the Ctrl-C handler).
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Bind the configured address and serve until stopped.
    pub async fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let listener = TcpListener::bind(self.config.listen_addr()).await?;
        self.serve(listener).await
    }

    /// Serve on an already-bound listener until stopped.
    ///
    /// On stop every live session is sent `Close` before its connection
    /// is dropped.
    pub async fn serve(&self, listener: TcpListener) -> Result<(), Box<dyn std::error::Error>> {
        self.running.store(true, Ordering::SeqCst);
        let addr = listener.local_addr()?;
        info!("Listening on port: {} (addr: {})", addr.port(), addr.ip());

        let session_config = self.config.to_session_config();
        let (events_tx, mut events) = mpsc::unbounded_channel();
        let mut registry = SessionRegistry::new();

        loop {
            tokio::select! {
                accept = listener.accept() => match accept {
                    Ok((stream, peer)) => {
                        let Some(id) = registry.allocate_id() else {
                            warn!("refusing {peer}: all session ids in use");
                            continue;
                        };
                        configure(&stream);
                        let handle = SessionConnection::spawn(
                            stream,
                            id,
                            session_config.clone(),
                            events_tx.clone(),
                        );
                        registry.insert(handle, peer);
                    }
                    Err(e) => warn!("accept error: {e}"),
                },
                Some(event) = events.recv() => registry.apply(event),
                _ = Self::wait_for_stop(&self.running) => break,
            }
        }

        info!("shutting down {} session(s)", registry.len());
        registry.close_all().await;
        // Dead notifications raised during close_all.
        while let Ok(event) = events.try_recv() {
            registry.apply(event);
        }

        self.running.store(false, Ordering::SeqCst);
        info!("viewer server stopped");
        Ok(())
    }

    /// Resolves when `running` becomes false.
    async fn wait_for_stop(running: &Arc<AtomicBool>) {
        loop {
            if !running.load(Ordering::SeqCst) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }
}

fn configure(stream: &TcpStream) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!("set_nodelay failed: {e}");
    }
}

// ── Tests ────────────────────────────────────────────────────────
