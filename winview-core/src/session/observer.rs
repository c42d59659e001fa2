//! Notifications a session raises towards the UI layer.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::frame::Frame;

/// Receives session notifications.
///
/// Called synchronously from the task driving the session, so
/// implementations must not block.
pub trait SessionObserver {
    /// A new frame replaced the previous one.
    fn frame_updated(&mut self, session: u8, frame: &Arc<Frame>);

    /// The frame size changed. Only the dimensions that changed are `Some`.
    fn dimensions_changed(&mut self, session: u8, width: Option<u16>, height: Option<u16>);

    /// The session is gone. Raised exactly once per session.
    fn session_dead(&mut self, session: u8);
}

/// A session notification as a value, for channel-based consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    FrameUpdated {
        session: u8,
        frame: Arc<Frame>,
    },
    DimensionsChanged {
        session: u8,
        width: Option<u16>,
        height: Option<u16>,
    },
    Dead {
        session: u8,
    },
}

impl SessionEvent {
    pub fn session(&self) -> u8 {
        match self {
            SessionEvent::FrameUpdated { session, .. }
            | SessionEvent::DimensionsChanged { session, .. }
            | SessionEvent::Dead { session } => *session,
        }
    }
}

/// Collects events in order. Handy for synchronous callers and tests.
impl SessionObserver for Vec<SessionEvent> {
    fn frame_updated(&mut self, session: u8, frame: &Arc<Frame>) {
        self.push(SessionEvent::FrameUpdated {
            session,
            frame: Arc::clone(frame),
        });
    }

    fn dimensions_changed(&mut self, session: u8, width: Option<u16>, height: Option<u16>) {
        self.push(SessionEvent::DimensionsChanged {
            session,
            width,
            height,
        });
    }

    fn session_dead(&mut self, session: u8) {
        self.push(SessionEvent::Dead { session });
    }
}

/// Forwards events to whoever owns the receiver (usually the registry).
///
/// A dropped receiver is not an error: nobody is watching any more.
impl SessionObserver for mpsc::UnboundedSender<SessionEvent> {
    fn frame_updated(&mut self, session: u8, frame: &Arc<Frame>) {
        let _ = self.send(SessionEvent::FrameUpdated {
            session,
            frame: Arc::clone(frame),
        });
    }

    fn dimensions_changed(&mut self, session: u8, width: Option<u16>, height: Option<u16>) {
        let _ = self.send(SessionEvent::DimensionsChanged {
            session,
            width,
            height,
        });
    }

    fn session_dead(&mut self, session: u8) {
        let _ = self.send(SessionEvent::Dead { session });
    }
}
