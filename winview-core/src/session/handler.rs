//! Per-connection protocol handler.
//!
//! [`Session`] is transport-agnostic: it is handed raw chunks and returns
//! the bytes to write. [`crate::network::SessionConnection`] drives it over
//! a real stream.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, warn};

use crate::codec::framer::{self, FramerState, PackageFramer};
use crate::control::{ControlMessage, UiEvent};
use crate::error::WinViewError;
use crate::frame::{Frame, decode_present};
use crate::session::observer::SessionObserver;
use crate::session::phase::SessionPhase;

/// Viewer-side state for one connected client.
#[derive(Debug)]
pub struct Session {
    id: u8,
    phase: SessionPhase,
    framer: PackageFramer,
    last_frame: Option<Arc<Frame>>,
    frames_applied: u64,
    payloads_discarded: u64,
    // Set once the Init package has been handed out.
    init_emitted: bool,
}

impl Session {
    /// Create a session for client `id`, capping packages at `max_payload` bytes.
    pub fn new(id: u8, max_payload: u32) -> Self {
        Self {
            id,
            phase: SessionPhase::Handshaking,
            framer: PackageFramer::with_max_payload(max_payload),
            last_frame: None,
            frames_applied: 0,
            payloads_discarded: 0,
            init_emitted: false,
        }
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    pub fn framer_state(&self) -> FramerState {
        self.framer.state()
    }

    /// The latest valid frame, if any arrived yet.
    pub fn last_frame(&self) -> Option<&Arc<Frame>> {
        self.last_frame.as_ref()
    }

    /// Width of the latest frame, 0 before the first one.
    pub fn width(&self) -> u16 {
        self.last_frame.as_ref().map_or(0, |f| f.width)
    }

    /// Height of the latest frame, 0 before the first one.
    pub fn height(&self) -> u16 {
        self.last_frame.as_ref().map_or(0, |f| f.height)
    }

    pub fn title(&self) -> String {
        format!("Client {}", self.id)
    }

    pub fn frames_applied(&self) -> u64 {
        self.frames_applied
    }

    pub fn payloads_discarded(&self) -> u64 {
        self.payloads_discarded
    }

    // ── Handshake ────────────────────────────────────────────────

    /// The framed Init package. Must be the first thing written to the peer.
    pub fn init_package(&mut self) -> Result<Bytes, WinViewError> {
        if self.phase != SessionPhase::Handshaking {
            return Err(self.misuse("init already sent"));
        }
        let package = framer::frame_package(&ControlMessage::Init { client_id: self.id }.encode())?;
        self.init_emitted = true;
        Ok(package)
    }

    /// The Init package reached the transport.
    ///
    /// Refused until [`init_package`](Self::init_package) has been called.
    pub fn complete_handshake(&mut self) -> Result<(), WinViewError> {
        if self.phase.is_closed() {
            return Err(WinViewError::SessionClosed(self.id));
        }
        if !self.init_emitted {
            return Err(WinViewError::ProtocolViolation("init package was never produced"));
        }
        self.phase.activate()
    }

    /// The Init package could not be written. Closes the session.
    pub fn fail_handshake(&mut self, observer: &mut impl SessionObserver) -> Result<(), WinViewError> {
        if self.phase != SessionPhase::Handshaking {
            return Err(self.misuse("handshake is not in progress"));
        }
        self.close(observer)
    }

    // ── Traffic ──────────────────────────────────────────────────

    /// Feed bytes read from the peer; returns how many frames were applied.
    ///
    /// Invalid presents are logged and dropped without touching the session.
    /// An error means the stream itself is unusable and the session should
    /// be closed.
    pub fn receive(
        &mut self,
        chunk: &[u8],
        observer: &mut impl SessionObserver,
    ) -> Result<usize, WinViewError> {
        self.ensure_active()?;

        let Self {
            id,
            framer,
            last_frame,
            frames_applied,
            payloads_discarded,
            ..
        } = self;

        let mut applied = 0;
        for package in framer.feed(chunk) {
            let package = package?;
            match decode_present(&package, *id) {
                Ok(frame) => {
                    Self::apply(*id, last_frame, frame, observer);
                    *frames_applied += 1;
                    applied += 1;
                }
                Err(e) => {
                    *payloads_discarded += 1;
                    warn!(session = *id, len = package.len(), "discarding present: {e}");
                }
            }
        }
        Ok(applied)
    }

    fn apply(
        id: u8,
        last_frame: &mut Option<Arc<Frame>>,
        frame: Frame,
        observer: &mut impl SessionObserver,
    ) {
        let (prev_w, prev_h) = last_frame
            .as_ref()
            .map_or((0, 0), |f| (f.width, f.height));
        let width = (frame.width != prev_w).then_some(frame.width);
        let height = (frame.height != prev_h).then_some(frame.height);

        debug!(
            session = id,
            width = frame.width,
            height = frame.height,
            format = %frame.pixel_format,
            "frame updated"
        );

        let frame = Arc::new(frame);
        *last_frame = Some(Arc::clone(&frame));

        if width.is_some() || height.is_some() {
            observer.dimensions_changed(id, width, height);
        }
        observer.frame_updated(id, &frame);
    }

    /// The framed package for a UI event.
    pub fn event_package(&self, event: UiEvent) -> Result<Bytes, WinViewError> {
        self.ensure_active()?;
        framer::frame_package(&ControlMessage::Event(event).encode())
    }

    // ── Teardown ─────────────────────────────────────────────────

    /// Close the session and raise the dead notification.
    ///
    /// Must not be called after the dead notification; doing so returns
    /// [`WinViewError::SessionClosed`] and notifies nobody.
    pub fn close(&mut self, observer: &mut impl SessionObserver) -> Result<(), WinViewError> {
        if self.phase.is_closed() {
            return Err(WinViewError::SessionClosed(self.id));
        }
        self.phase.close()?;
        // The partial package, if any, is abandoned.
        self.framer = PackageFramer::with_max_payload(self.framer.max_payload());
        observer.session_dead(self.id);
        Ok(())
    }

    fn ensure_active(&self) -> Result<(), WinViewError> {
        match self.phase {
            SessionPhase::Active { .. } => Ok(()),
            SessionPhase::Closed => Err(WinViewError::SessionClosed(self.id)),
            SessionPhase::Handshaking => Err(self.misuse("handshake not complete")),
        }
    }

    fn misuse(&self, what: &'static str) -> WinViewError {
        if self.phase.is_closed() {
            WinViewError::SessionClosed(self.id)
        } else {
            WinViewError::ProtocolViolation(what)
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::framer::{DEFAULT_MAX_PAYLOAD, frame_package};
    use crate::error::ValidationError;
    use crate::frame::{PresentHeader, encode_present};
    use crate::message::PixelFormat;
    use crate::session::observer::SessionEvent;

    fn active(id: u8) -> Session {
        let mut s = Session::new(id, DEFAULT_MAX_PAYLOAD);
        s.init_package().unwrap();
        s.complete_handshake().unwrap();
        s
    }

    fn gray(id: u8, w: u16, h: u16) -> Vec<u8> {
        let pixels = vec![0x7F; w as usize * h as usize];
        let payload = encode_present(id, PixelFormat::Grayscale8, w, h, &pixels).unwrap();
        frame_package(&payload).unwrap().to_vec()
    }

    #[test]
    fn init_package_is_framed_kind_and_id() {
        let mut s = Session::new(5, DEFAULT_MAX_PAYLOAD);
        assert_eq!(&s.init_package().unwrap()[..], &[0, 0, 0, 2, 0, 5]);
    }

    #[test]
    fn activation_requires_init() {
        let mut s = Session::new(6, DEFAULT_MAX_PAYLOAD);
        assert!(matches!(
            s.complete_handshake(),
            Err(WinViewError::ProtocolViolation(_))
        ));
        assert!(!s.phase().is_active());

        s.init_package().unwrap();
        s.complete_handshake().unwrap();
        assert!(s.phase().is_active());
    }

    #[test]
    fn receive_before_handshake_is_refused() {
        let mut s = Session::new(1, DEFAULT_MAX_PAYLOAD);
        let mut events = Vec::new();
        assert!(matches!(
            s.receive(&gray(1, 1, 1), &mut events),
            Err(WinViewError::ProtocolViolation(_))
        ));
        assert!(s.event_package(UiEvent::Close).is_err());
        assert!(events.is_empty());
    }

    #[test]
    fn valid_present_updates_frame_and_notifies() {
        let mut s = active(5);
        let mut events = Vec::new();
        let payload = [0, 5, 0, 0, 1, 0x00, 0x02, 0x00, 0x02, 1, 2, 3, 4];
        let bytes = frame_package(&payload).unwrap();

        assert_eq!(s.receive(&bytes, &mut events).unwrap(), 1);
        let frame = s.last_frame().unwrap();
        assert_eq!(frame.pixels, vec![1, 2, 3, 4]);
        assert_eq!((s.width(), s.height()), (2, 2));

        assert_eq!(
            events[0],
            SessionEvent::DimensionsChanged {
                session: 5,
                width: Some(2),
                height: Some(2)
            }
        );
        assert!(matches!(events[1], SessionEvent::FrameUpdated { session: 5, .. }));
    }

    #[test]
    fn dimensions_reported_only_when_they_change() {
        let mut s = active(2);
        let mut events = Vec::new();

        s.receive(&gray(2, 4, 3), &mut events).unwrap();
        s.receive(&gray(2, 4, 3), &mut events).unwrap();
        s.receive(&gray(2, 4, 8), &mut events).unwrap();

        let dims: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::DimensionsChanged { width, height, .. } => Some((*width, *height)),
                _ => None,
            })
            .collect();
        assert_eq!(dims, vec![(Some(4), Some(3)), (None, Some(8))]);
        assert_eq!(s.frames_applied(), 3);
    }

    #[test]
    fn wrong_id_is_discarded_and_session_survives() {
        let mut s = active(5);
        let mut events = Vec::new();
        s.receive(&gray(5, 2, 2), &mut events).unwrap();
        let before = Arc::clone(s.last_frame().unwrap());
        events.clear();

        let payload = [0, 6, 0, 0, 1, 0x00, 0x02, 0x00, 0x02, 9, 9, 9, 9];
        assert_eq!(s.receive(&frame_package(&payload).unwrap(), &mut events).unwrap(), 0);

        assert!(s.phase().is_active());
        assert!(Arc::ptr_eq(s.last_frame().unwrap(), &before));
        assert!(events.is_empty());
        assert_eq!(s.payloads_discarded(), 1);
    }

    #[test]
    fn bad_payload_does_not_desync_the_next_one() {
        let mut s = active(1);
        let mut events = Vec::new();

        let mut hdr = PresentHeader::new(1, PixelFormat::Argb32, 2, 2);
        hdr.bytes_per_pixel = 1;
        let mut bad = Vec::new();
        hdr.encode(&mut bad);
        bad.extend_from_slice(&[0; 4]);
        assert!(matches!(
            decode_present(&bad, 1),
            Err(ValidationError::PixelDepthMismatch { .. })
        ));

        let mut stream = frame_package(&bad).unwrap().to_vec();
        stream.extend(gray(1, 3, 1));
        // Split mid-way through the bad package.
        let (a, b) = stream.split_at(7);
        assert_eq!(s.receive(a, &mut events).unwrap(), 0);
        assert_eq!(s.receive(b, &mut events).unwrap(), 1);
        assert_eq!(s.width(), 3);
        assert_eq!(s.framer_state(), FramerState::AwaitingLength);
    }

    #[test]
    fn truncated_payload_is_discarded() {
        let mut s = active(1);
        let mut events = Vec::new();
        assert_eq!(s.receive(&frame_package(&[0, 1]).unwrap(), &mut events).unwrap(), 0);
        assert!(s.phase().is_active());
    }

    #[test]
    fn oversized_package_is_fatal() {
        let mut s = Session::new(1, 8);
        s.init_package().unwrap();
        s.complete_handshake().unwrap();
        let mut events = Vec::new();
        assert!(matches!(
            s.receive(&[0, 0, 1, 0], &mut events),
            Err(WinViewError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn event_packages() {
        let s = active(3);
        assert_eq!(&s.event_package(UiEvent::Close).unwrap()[..], &[0, 0, 0, 2, 1, 0]);
        assert_eq!(
            &s.event_package(UiEvent::Resize {
                width: 2,
                height: 1
            })
            .unwrap()[..],
            &[0, 0, 0, 6, 1, 1, 0, 2, 0, 1]
        );
    }

    #[test]
    fn dead_is_reported_exactly_once() {
        let mut s = active(4);
        let mut events = Vec::new();
        s.close(&mut events).unwrap();
        assert!(matches!(s.close(&mut events), Err(WinViewError::SessionClosed(4))));
        assert_eq!(events, vec![SessionEvent::Dead { session: 4 }]);

        assert!(matches!(
            s.receive(&gray(4, 1, 1), &mut events),
            Err(WinViewError::SessionClosed(4))
        ));
        assert!(matches!(
            s.event_package(UiEvent::Close),
            Err(WinViewError::SessionClosed(4))
        ));
        assert!(matches!(s.init_package(), Err(WinViewError::SessionClosed(4))));
    }

    #[test]
    fn failed_handshake_closes() {
        let mut s = Session::new(8, DEFAULT_MAX_PAYLOAD);
        let mut events = Vec::new();
        s.fail_handshake(&mut events).unwrap();
        assert!(s.phase().is_closed());
        assert_eq!(events, vec![SessionEvent::Dead { session: 8 }]);
        assert!(s.complete_handshake().is_err());
    }

    #[test]
    fn title_names_the_client() {
        assert_eq!(Session::new(12, DEFAULT_MAX_PAYLOAD).title(), "Client 12");
    }
}
