// Client-side peer: owns a reconciler and keeps it in sync with one room.

use crate::domain::tuning::movement::MovementTuning;
use crate::domain::{EntityState, EntityStore, MovementFlags};
use crate::interface_adapters::protocol::{EventKind, Frame, ProtocolError, encode_event};
use crate::interface_adapters::utils::throttle::{log_slot, should_log};
use crate::use_cases::{MergeOutcome, Reconciler};

use futures_util::{SinkExt, StreamExt};
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

pub type PeerSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    #[error("websocket error: {0}")]
    Ws(#[from] tungstenite::Error),
    #[error("failed to encode outbound frame: {0}")]
    Encode(#[from] ProtocolError),
}

/// What a renderer needs from the reconciled world.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldView {
    pub local_identity: Option<String>,
    /// Every known entity, sorted by identifier.
    pub entities: Vec<EntityState>,
}

impl WorldView {
    fn of(reconciler: &Reconciler) -> Self {
        Self {
            local_identity: reconciler.local_identity().map(str::to_string),
            entities: reconciler.snapshot(),
        }
    }

    pub fn local(&self) -> Option<&EntityState> {
        let id = self.local_identity.as_deref()?;
        self.entities.iter().find(|e| e.identifier == id)
    }
}

pub async fn connect(url: &str) -> Result<PeerSocket, PeerError> {
    let (socket, response) = connect_async(url).await?;
    debug!(status = %response.status(), url, "connected to room server");
    Ok(socket)
}

pub async fn run_peer(
    mut socket: PeerSocket,
    mut input_rx: mpsc::Receiver<MovementFlags>,
    world_tx: watch::Sender<WorldView>,
    tick_interval: Duration,
    tuning: MovementTuning,
) -> Result<(), PeerError> {
    let mut reconciler = Reconciler::new(EntityStore::new(), tuning);
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut input_open = true;
    let mut last_bad_frame_log = log_slot();

    loop {
        tokio::select! {
            incoming = socket.next() => match incoming {
                Some(Ok(Message::Binary(bytes))) => {
                    apply_frame(&mut reconciler, &bytes, &mut last_bad_frame_log);
                    world_tx.send_replace(WorldView::of(&reconciler));
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(?frame, "server closed the connection");
                    break;
                }
                // Pings are answered by tungstenite; text is not part of the protocol.
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => {
                    info!("server stream ended");
                    break;
                }
            },

            flags = input_rx.recv(), if input_open => match flags {
                Some(flags) => reconciler.set_local_movement(flags),
                None => {
                    debug!("input channel closed; keeping last movement");
                    input_open = false;
                }
            },

            _ = ticker.tick() => {
                if let Some(state) = reconciler.advance_local_tick() {
                    let bytes = encode_event(EventKind::MovementUpdate, &state)?;
                    socket.send(Message::binary(bytes)).await?;
                }
                reconciler.advance_interpolation();
                world_tx.send_replace(WorldView::of(&reconciler));
            }
        }
    }

    Ok(())
}

fn apply_frame(reconciler: &mut Reconciler, bytes: &[u8], last_bad_frame_log: &mut Instant) {
    let frame = match Frame::decode(bytes) {
        Ok(frame) => frame,
        Err(e) => {
            if should_log(last_bad_frame_log) {
                warn!(bytes = bytes.len(), error = %e, "discarding undecodable frame");
            }
            return;
        }
    };

    match frame.event {
        EventKind::Joined => {
            info!(identifier = %frame.state.identifier, "joined room");
            reconciler.set_local_identity(frame.state);
        }
        EventKind::UpdatedMovement => {
            let identifier = frame.state.identifier.clone();
            match reconciler.merge(frame.state) {
                MergeOutcome::Inserted => debug!(%identifier, "entity appeared"),
                outcome => trace!(%identifier, ?outcome, "merged update"),
            }
        }
        EventKind::Left => {
            if reconciler.remove(&frame.state.identifier) {
                debug!(identifier = %frame.state.identifier, "entity left");
            }
        }
        EventKind::MovementUpdate => {
            trace!("ignoring peer-bound movement upload");
        }
    }
}
