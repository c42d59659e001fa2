//! Presents a [`TestPattern`] at a fixed rate and reacts to viewer events.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use winview_core::{UiEvent, WinClient, WinViewError};

use crate::pattern::TestPattern;

/// Why [`stream`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The viewer sent Close.
    Closed,
    /// The viewer hung up without Close.
    Disconnected,
    /// The requested number of frames was sent.
    FrameLimit,
}

/// Present frames every `interval` until the viewer closes us or `limit`
/// frames were sent.
///
/// A Resize event restarts the pattern at the new size.
pub async fn stream<S>(
    client: &mut WinClient<S>,
    pattern: &mut TestPattern,
    interval: Duration,
    limit: Option<u64>,
) -> Result<StopReason, WinViewError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut sent: u64 = 0;

    loop {
        tokio::select! {
            // Viewer events win over the ticker.
            biased;

            event = client.next_event() => match event? {
                Some(UiEvent::Close) => {
                    info!("viewer closed the window after {sent} frames");
                    return Ok(StopReason::Closed);
                }
                Some(UiEvent::Resize { width, height }) => {
                    info!("viewer resized to {width}x{height}");
                    pattern.resize(width, height);
                }
                None => {
                    info!("viewer hung up");
                    return Ok(StopReason::Disconnected);
                }
            },
            _ = ticker.tick() => {
                if limit.is_some_and(|n| sent >= n) {
                    return Ok(StopReason::FrameLimit);
                }
                pattern.advance();
                client
                    .present(pattern.format(), pattern.width(), pattern.height(), pattern.pixels())
                    .await?;
                sent += 1;
                debug!(frame = sent, id = client.id(), "presented");
            }
        }
    }
}
