//! Per-connection I/O tasks
//!
//! The reader task turns socket bytes into frames for the event loop; the
//! writer task drains the connection's outbound queue onto the socket.
//! Neither touches room or registry state.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::FrameError;
use crate::frame;
use crate::types::ConnectionId;

/// Events delivered from connection tasks to the event loop
#[derive(Debug)]
pub enum ServerEvent {
    /// One complete frame arrived
    Frame {
        id: ConnectionId,
        payload: Vec<u8>,
    },
    /// The connection ended; `error` is None for a clean close
    Closed {
        id: ConnectionId,
        error: Option<FrameError>,
    },
}

/// Read frames until end-of-stream or error
pub async fn read_loop<R>(
    mut reader: R,
    id: ConnectionId,
    events: mpsc::Sender<ServerEvent>,
    max_frame_bytes: u64,
) where
    R: AsyncRead + Unpin,
{
    loop {
        let event = match frame::read_frame(&mut reader, max_frame_bytes).await {
            Ok(Some(payload)) => {
                debug!("Frame of {} bytes from {}", payload.len(), id);
                ServerEvent::Frame { id, payload }
            }
            Ok(None) => {
                debug!("Connection {} closed by peer", id);
                let _ = events.send(ServerEvent::Closed { id, error: None }).await;
                break;
            }
            Err(e) => {
                warn!("Read failed for {}: {}", id, e);
                let _ = events
                    .send(ServerEvent::Closed { id, error: Some(e) })
                    .await;
                break;
            }
        };

        if events.send(event).await.is_err() {
            debug!("Server closed, ending read task for {}", id);
            break;
        }
    }
    debug!("Read task ended for {}", id);
}

/// Write queued payloads until the queue closes or the socket fails
pub async fn write_loop<W>(mut writer: W, id: ConnectionId, mut outbound: mpsc::Receiver<String>)
where
    W: AsyncWrite + Unpin,
{
    while let Some(payload) = outbound.recv().await {
        if let Err(e) = frame::write_frame(&mut writer, payload.as_bytes()).await {
            debug!("Write failed for {}: {}", id, e);
            break;
        }
    }

    // Closing the queue means the connection was removed
    let _ = writer.shutdown().await;
    debug!("Write task ended for {}", id);
}
