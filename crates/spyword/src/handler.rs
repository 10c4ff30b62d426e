//! Per-connection handler: greeting, read loop, writer task, departure.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. The flow is:
//!   1. Register an outbox with the dispatcher (the client gets `connected`)
//!   2. Spawn a writer task that drains the outbox onto the socket
//!   3. Loop: receive frames → decode → dispatch
//!   4. On close, error or idle timeout: depart every room, stop the writer

use std::sync::Arc;
use std::time::Duration;

use spyword_protocol::{ClientEnvelope, Codec, PlayerId, ServerMessage};
use spyword_room::Clock;
use spyword_transport::{Connection, TransportError, WebSocketConnection};
use tokio::sync::mpsc;

use crate::SpywordError;
use crate::server::ServerState;

/// Runs departure when the handler exits, including by panic.
///
/// Unregistering also drops the registry's copy of the outbox sender,
/// which is what lets the writer task finish.
struct DepartureGuard<C: Clock, K: Codec> {
    player: PlayerId,
    state: Arc<ServerState<C, K>>,
}

impl<C: Clock, K: Codec> Drop for DepartureGuard<C, K> {
    fn drop(&mut self) {
        self.state.dispatcher.disconnect(self.player);
    }
}

/// Why the read loop stopped.
enum Ended {
    Closed,
    IdleTimeout,
    Failed(TransportError),
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C, K>(
    conn: WebSocketConnection,
    state: Arc<ServerState<C, K>>,
) -> Result<(), SpywordError>
where
    C: Clock,
    K: Codec,
{
    let player = PlayerId(conn.id().into_inner());
    let conn = Arc::new(conn);

    let (outbox, inbox) = mpsc::unbounded_channel();
    state.dispatcher.connect(player, outbox);
    let guard = DepartureGuard {
        player,
        state: Arc::clone(&state),
    };

    let writer = tokio::spawn(write_loop(
        Arc::clone(&conn),
        Arc::clone(&state),
        player,
        inbox,
    ));

    let ended = read_loop(conn.as_ref(), &state, player).await;

    drop(guard);
    if let Err(e) = writer.await {
        tracing::debug!(%player, error = %e, "writer task failed");
    }
    if let Err(e) = conn.close().await {
        tracing::debug!(%player, error = %e, "close failed");
    }

    match ended {
        Ended::Closed => {
            tracing::debug!(%player, "connection closed cleanly");
            Ok(())
        }
        Ended::IdleTimeout => {
            tracing::info!(%player, "connection idle, dropped");
            Ok(())
        }
        Ended::Failed(e) => Err(e.into()),
    }
}

async fn read_loop<C, K>(
    conn: &WebSocketConnection,
    state: &ServerState<C, K>,
    player: PlayerId,
) -> Ended
where
    C: Clock,
    K: Codec,
{
    loop {
        let data = match recv_frame(conn, state.idle_timeout).await {
            Ok(Ok(Some(data))) => data,
            Ok(Ok(None)) => return Ended::Closed,
            Ok(Err(e)) => return Ended::Failed(e),
            Err(_) => return Ended::IdleTimeout,
        };

        let envelope: ClientEnvelope = match state.codec.decode(&data) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!(%player, error = %e, "skipping undecodable frame");
                continue;
            }
        };

        tracing::trace!(%player, intent = envelope.intent.name(), "intent received");
        state.dispatcher.dispatch(player, envelope);
    }
}

/// Receives one frame, giving up after `idle` if set.
async fn recv_frame(
    conn: &WebSocketConnection,
    idle: Option<Duration>,
) -> Result<Result<Option<Vec<u8>>, TransportError>, tokio::time::error::Elapsed> {
    match idle {
        Some(limit) => tokio::time::timeout(limit, conn.recv()).await,
        None => Ok(conn.recv().await),
    }
}

/// Drains the outbox onto the socket until the outbox closes or a send
/// fails.
async fn write_loop<C, K>(
    conn: Arc<WebSocketConnection>,
    state: Arc<ServerState<C, K>>,
    player: PlayerId,
    mut inbox: mpsc::UnboundedReceiver<ServerMessage>,
) where
    C: Clock,
    K: Codec,
{
    while let Some(msg) = inbox.recv().await {
        let bytes = match state.codec.encode(&msg) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%player, error = %e, "failed to encode outbound message");
                continue;
            }
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%player, error = %e, "send failed, stopping writer");
            break;
        }
    }
}
