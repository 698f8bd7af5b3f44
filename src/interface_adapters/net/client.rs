use crate::domain::EntityState;
use crate::domain::ports::Clock;
use crate::interface_adapters::http::ErrorResponse;
use crate::interface_adapters::protocol::{EventKind, Frame, ProtocolError, encode_event};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::ids::{connection_id, session_identifier};
use crate::interface_adapters::utils::throttle::{log_slot, should_log};
use crate::use_cases::{JoinedRoom, RoomEvent, RoomHandle, RoomRegistry, RoomUpdate};

use axum::{
    Error, Json,
    body::Bytes,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures::SinkExt;
use std::{sync::Arc, time::Instant};
use tokio::sync::{broadcast, mpsc};
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

const MAX_INVALID_FRAMES: u32 = 10;
const MAX_ROOM_ID_LEN: usize = 64;

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Protocol(ProtocolError),
    InputClosed,
    FramesClosed,
}

#[derive(Debug, serde::Deserialize)]
pub struct RoomQuery {
    // The room the client wants to join.
    #[serde(default)]
    room_id: Option<String>,
}

pub async fn room_frame_serializer(
    room_id: Arc<str>,
    mut updates_rx: broadcast::Receiver<RoomUpdate>,
    frames_tx: broadcast::Sender<Bytes>,
) {
    // Encode each room update once and broadcast the shared bytes.
    loop {
        match updates_rx.recv().await {
            Ok(update) => {
                let (event, state) = match &update {
                    RoomUpdate::Moved(state) => (EventKind::UpdatedMovement, state),
                    RoomUpdate::Left(state) => (EventKind::Left, state),
                };
                match encode_event(event, state) {
                    Ok(bytes) => {
                        let _ = frames_tx.send(Bytes::from(bytes));
                    }
                    Err(e) => {
                        error!(
                            room_id = %room_id,
                            error = %e,
                            identifier = %state.identifier,
                            "failed to encode room update"
                        );
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(room_id = %room_id, missed = n, "room serializer lagged; skipping ahead");
            }
            Err(broadcast::error::RecvError::Closed) => {
                debug!(room_id = %room_id, "room updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub fn spawn_room_serializer(room: &RoomHandle, updates_rx: broadcast::Receiver<RoomUpdate>) {
    // Spawn a task that encodes room updates for this room.
    tokio::spawn(room_frame_serializer(
        room.room_id.clone(),
        updates_rx,
        room.frames_tx.clone(),
    ));
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<RoomQuery>,
) -> impl IntoResponse {
    let room_id = query
        .room_id
        .map(|id| id.trim().to_string())
        .unwrap_or_else(|| state.default_room_id.to_string());

    if room_id.is_empty() || room_id.len() > MAX_ROOM_ID_LEN {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("room_id must be 1 to {MAX_ROOM_ID_LEN} bytes"),
            }),
        )
            .into_response();
    }

    let room_registry = state.room_registry.clone();
    let clock = state.clock.clone();
    ws.on_upgrade(move |socket| {
        let conn_id = connection_id();
        let span = info_span!(
            "conn",
            conn_id,
            room_id = %room_id,
            identifier = tracing::field::Empty
        );
        handle_socket(socket, room_id, conn_id, room_registry, clock).instrument(span)
    })
}

async fn handle_socket(
    mut socket: WebSocket,
    room_id: String,
    conn_id: u64,
    room_registry: Arc<RoomRegistry>,
    clock: Arc<dyn Clock>,
) {
    // Registers the connection so the room stays alive while the socket is active.
    let JoinedRoom {
        handle: room,
        new_room_updates,
    } = room_registry.join_room(&room_id).await;
    if let Some(updates_rx) = new_room_updates {
        spawn_room_serializer(&room, updates_rx);
    }

    let mut ctx = match bootstrap_connection(&mut socket, &room, conn_id, clock.as_ref()).await {
        Ok(ctx) => ctx,
        Err(e) => {
            error!(error = ?e, "failed to bootstrap connection");
            let _ = socket
                .send(Message::Close(Some(CloseFrame {
                    code: close_code::ERROR,
                    reason: "bootstrap failed".into(),
                })))
                .await;
            let _ = socket.close().await;
            room_registry.leave_room(&room_id).await;
            return;
        }
    };

    Span::current().record("identifier", ctx.identifier.as_str());
    info!("client connected");

    // Main Client Loop
    if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
        warn!(error = ?e, "client loop exited with error");
    }

    room_registry.leave_room(&room_id).await;
}

async fn send_frame(socket: &mut WebSocket, bytes: Bytes) -> Result<usize, NetError> {
    let len = bytes.len();
    socket
        .send(Message::Binary(bytes))
        .await
        .map_err(NetError::Ws)?;
    Ok(len)
}

#[derive(Debug)]
struct ConnStats {
    msgs_in: u64,
    msgs_out: u64,
    bytes_in: u64,
    bytes_out: u64,
    invalid_frames: u32,
    last_input_full_log: Instant,
    last_frame_lag_log: Instant,
    last_invalid_frame_log: Instant,
}

struct ConnCtx {
    // Session identity; the key of this connection's character in the room.
    identifier: String,
    input_tx: mpsc::Sender<RoomEvent>,
    frames_rx: broadcast::Receiver<Bytes>,
    stats: ConnStats,
    close_frame: Option<CloseFrame>,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    room: &RoomHandle,
    conn_id: u64,
    clock: &dyn Clock,
) -> Result<ConnCtx, NetError> {
    // Subscribe to room frames *before* doing anything else (awaits) to not miss packets.
    let frames_rx = room.frames_tx.subscribe();

    // Identity Assignment
    let now = clock.now_epoch_millis();
    let identifier = session_identifier(conn_id, now as u64);
    let state = EntityState::spawn(identifier.clone(), now);

    // Send the joined frame to this client only: "This is who you are".
    let joined = encode_event(EventKind::Joined, &state).map_err(NetError::Protocol)?;
    let bytes_out = send_frame(socket, Bytes::from(joined)).await?;

    // Register the character with the room task.
    room.input_tx
        .send(RoomEvent::Join { state })
        .await
        .map_err(|_| NetError::InputClosed)?;

    let slot = log_slot();
    Ok(ConnCtx {
        identifier,
        input_tx: room.input_tx.clone(),
        frames_rx,
        stats: ConnStats {
            msgs_in: 0,
            msgs_out: 1,
            bytes_in: 0,
            bytes_out: bytes_out as u64,
            invalid_frames: 0,
            last_input_full_log: slot,
            last_frame_lag_log: slot,
            last_invalid_frame_log: slot,
        },
        close_frame: None,
    })
}

enum LoopControl {
    Continue,
    Disconnect,
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    // Split borrows so `tokio::select!` can hold them concurrently.
    let ConnCtx {
        identifier,
        input_tx,
        frames_rx,
        stats,
        close_frame,
    } = ctx;

    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            // Incoming Message from Client
            incoming = socket.recv() => {
                match handle_incoming_ws(incoming, identifier, input_tx, stats, close_frame) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            // Outgoing Room Frame
            frame = frames_rx.recv() => {
                match frame {
                    Ok(bytes) => match send_frame(socket, bytes).await {
                        Ok(len) => {
                            stats.msgs_out += 1;
                            stats.bytes_out += len as u64;
                            false
                        }
                        Err(err) => {
                            warn!(error = ?err, "failed to send room frame");
                            true
                        }
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Later updates carry full state, so skipping ahead is enough to resync.
                        if should_log(&mut stats.last_frame_lag_log) {
                            warn!(missed = n, "room frames lagged; skipping ahead");
                        }
                        false
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::FramesClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(identifier, input_tx, stats).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    if let Some(err) = fatal {
        Err(err)
    } else {
        Ok(())
    }
}

fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    identifier: &str,
    input_tx: &mpsc::Sender<RoomEvent>,
    stats: &mut ConnStats,
    close_frame: &mut Option<CloseFrame>,
) -> Result<LoopControl, NetError> {
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Binary(bytes) => {
                stats.msgs_in += 1;
                stats.bytes_in += bytes.len() as u64;

                match Frame::decode(&bytes) {
                    Ok(Frame {
                        event: EventKind::MovementUpdate,
                        state,
                    }) => forward_movement(identifier, input_tx, state, stats),
                    Ok(frame) => {
                        // Only movement uploads flow from clients to the room.
                        if should_log(&mut stats.last_invalid_frame_log) {
                            warn!(event = frame.event.name(), "unexpected client event ignored");
                        }
                        Ok(LoopControl::Continue)
                    }
                    Err(parse_err) => {
                        stats.invalid_frames += 1;
                        if should_log(&mut stats.last_invalid_frame_log) {
                            warn!(
                                bytes = bytes.len(),
                                error = %parse_err,
                                "failed to decode client frame"
                            );
                        }

                        if stats.invalid_frames > MAX_INVALID_FRAMES {
                            *close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid frames".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Text(_) => {
                *close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "text messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!("websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

fn forward_movement(
    identifier: &str,
    input_tx: &mpsc::Sender<RoomEvent>,
    state: EntityState,
    stats: &mut ConnStats,
) -> Result<LoopControl, NetError> {
    let ev = RoomEvent::Movement {
        identifier: identifier.to_string(),
        state,
    };
    match input_tx.try_send(ev) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_ev)) => {
            // The next tick re-sends full state, so dropping one upload is harmless.
            if should_log(&mut stats.last_input_full_log) {
                warn!("room input channel full; dropping movement update");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_ev)) => Err(NetError::InputClosed),
    }
}

async fn disconnect_cleanup(
    identifier: &str,
    input_tx: &mpsc::Sender<RoomEvent>,
    stats: &ConnStats,
) -> Result<(), NetError> {
    // The room broadcasts `left` with the last stored state before deleting it.
    input_tx
        .send(RoomEvent::Leave {
            identifier: identifier.to_string(),
        })
        .await
        .map_err(|_| NetError::InputClosed)?;

    debug!(
        msgs_in = stats.msgs_in,
        msgs_out = stats.msgs_out,
        bytes_in = stats.bytes_in,
        bytes_out = stats.bytes_out,
        invalid_frames = stats.invalid_frames,
        "connection stats"
    );
    info!("client disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn serializer_encodes_each_update_once_with_its_event() {
        let (updates_tx, updates_rx) = broadcast::channel(8);
        let (frames_tx, mut frames_rx) = broadcast::channel(8);
        let task = tokio::spawn(room_frame_serializer(
            Arc::from("room1"),
            updates_rx,
            frames_tx,
        ));

        let state = EntityState::spawn("ab12", 5.0);
        updates_tx
            .send(RoomUpdate::Moved(state.clone()))
            .expect("send moved");
        updates_tx
            .send(RoomUpdate::Left(state.clone()))
            .expect("send left");

        for expected in [EventKind::UpdatedMovement, EventKind::Left] {
            let bytes = tokio::time::timeout(Duration::from_secs(1), frames_rx.recv())
                .await
                .expect("frame in time")
                .expect("frame");
            let frame = Frame::decode(&bytes).expect("decode");
            assert_eq!(frame.event, expected);
            assert_eq!(frame.state, state);
        }

        drop(updates_tx);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("serializer exits")
            .expect("serializer join");
    }
}
