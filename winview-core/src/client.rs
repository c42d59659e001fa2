//! Client side of the protocol: the process whose window is being shown.
//!
//! Connects, waits for the Init handshake to learn its id, then presents
//! frames and receives UI events.

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use crate::codec::PackageCodec;
use crate::control::{ControlMessage, UiEvent};
use crate::error::WinViewError;
use crate::frame::encode_present;
use crate::message::PixelFormat;

/// A connection to a winview viewer.
#[derive(Debug)]
pub struct WinClient<S = TcpStream> {
    framed: Framed<S, PackageCodec>,
    id: u8,
}

impl WinClient<TcpStream> {
    /// Connect over TCP and complete the handshake.
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, WinViewError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Self::handshake(stream).await
    }
}

impl<S> WinClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wait for the Init package on an already-connected stream.
    pub async fn handshake(stream: S) -> Result<Self, WinViewError> {
        let mut framed = Framed::new(stream, PackageCodec::new());
        let payload = framed
            .next()
            .await
            .ok_or(WinViewError::ProtocolViolation("closed before init"))??;

        match ControlMessage::decode(&payload)? {
            ControlMessage::Init { client_id } => {
                debug!(client_id, "handshake complete");
                Ok(Self {
                    framed,
                    id: client_id,
                })
            }
            ControlMessage::Event(_) => Err(WinViewError::ProtocolViolation(
                "first package was not init",
            )),
        }
    }

    /// The id the viewer assigned to this client.
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Send one frame. `pixels` must hold `width * height * bpp` bytes.
    pub async fn present(
        &mut self,
        format: PixelFormat,
        width: u16,
        height: u16,
        pixels: &[u8],
    ) -> Result<(), WinViewError> {
        let payload = encode_present(self.id, format, width, height, pixels)?;
        self.framed.send(payload).await
    }

    /// Send an arbitrary payload. The viewer decides whether it is valid.
    pub async fn send_payload(&mut self, payload: Bytes) -> Result<(), WinViewError> {
        self.framed.send(payload).await
    }

    /// Next UI event, or `None` once the viewer hung up.
    ///
    /// Cancel-safe: can be used as a `tokio::select!` branch.
    pub async fn next_event(&mut self) -> Result<Option<UiEvent>, WinViewError> {
        while let Some(payload) = self.framed.next().await {
            match ControlMessage::decode(&payload?)? {
                ControlMessage::Event(event) => return Ok(Some(event)),
                ControlMessage::Init { client_id } => {
                    warn!(client_id, "ignoring repeated init");
                }
            }
        }
        Ok(None)
    }

    /// Consume the client and return the underlying stream.
    pub fn into_inner(self) -> S {
        self.framed.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::framer::frame_package;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn handshake_reads_the_id() {
        let mock = Builder::new().read(&[0, 0, 0, 2, 0, 42]).build();
        let client = WinClient::handshake(mock).await.unwrap();
        assert_eq!(client.id(), 42);
    }

    #[tokio::test]
    async fn handshake_rejects_an_event_first() {
        let mock = Builder::new().read(&[0, 0, 0, 2, 1, 0]).build();
        assert!(matches!(
            WinClient::handshake(mock).await,
            Err(WinViewError::ProtocolViolation(_))
        ));
    }

    #[tokio::test]
    async fn handshake_fails_on_eof() {
        let mock = Builder::new().build();
        assert!(WinClient::handshake(mock).await.is_err());
    }

    #[tokio::test]
    async fn present_writes_a_framed_payload() {
        let expected = frame_package(&[0, 1, 0, 0, 1, 0, 1, 0, 2, 8, 9]).unwrap();
        let mock = Builder::new()
            .read(&[0, 0, 0, 2, 0, 1])
            .write(&expected)
            .build();

        let mut client = WinClient::handshake(mock).await.unwrap();
        client
            .present(PixelFormat::Grayscale8, 1, 2, &[8, 9])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn present_refuses_a_wrong_buffer() {
        let mock = Builder::new().read(&[0, 0, 0, 2, 0, 1]).build();
        let mut client = WinClient::handshake(mock).await.unwrap();
        assert!(matches!(
            client.present(PixelFormat::Argb32, 2, 2, &[0; 3]).await,
            Err(WinViewError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn events_are_decoded() {
        let mock = Builder::new()
            .read(&[0, 0, 0, 2, 0, 3])
            .read(&[0, 0, 0, 6, 1, 1, 0, 10])
            .read(&[0, 20])
            .read(&[0, 0, 0, 2, 1, 0])
            .build();

        let mut client = WinClient::handshake(mock).await.unwrap();
        assert_eq!(
            client.next_event().await.unwrap(),
            Some(UiEvent::Resize {
                width: 10,
                height: 20
            })
        );
        assert_eq!(client.next_event().await.unwrap(), Some(UiEvent::Close));
        assert_eq!(client.next_event().await.unwrap(), None);
    }
}
