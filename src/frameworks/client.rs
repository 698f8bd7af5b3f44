// Framework bootstrap for the headless square client.

use crate::domain::MovementFlags;
use crate::domain::tuning::movement::MovementTuning;
use crate::frameworks::config;
use crate::frameworks::runtime::init_runtime;
use crate::interface_adapters::net::{PeerError, WorldView, connect, run_peer};
use crate::interface_adapters::utils::throttle::{log_slot, should_log};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

/// Maps one line of input to held keys: `w` up, `a` left, `s` down, `d` right.
/// Other characters are ignored and an empty line releases everything.
pub fn parse_movement(line: &str) -> MovementFlags {
    let mut flags = MovementFlags::default();
    for c in line.trim().chars() {
        match c.to_ascii_lowercase() {
            'w' => flags.up = true,
            'a' => flags.left = true,
            's' => flags.down = true,
            'd' => flags.right = true,
            _ => {}
        }
    }
    flags
}

pub async fn run_client_with_config() -> Result<(), PeerError> {
    init_runtime();

    let url = format!("{}?room_id={}", config::server_url(), config::room_id());
    let socket = connect(&url).await.inspect_err(|e| {
        tracing::error!(%url, error = %e, "failed to connect");
    })?;
    tracing::info!(%url, "connected");

    let (input_tx, input_rx) = mpsc::channel::<MovementFlags>(config::INPUT_QUEUE_CAPACITY);
    let (world_tx, world_rx) = watch::channel(WorldView::default());

    tokio::spawn(read_stdin(input_tx));
    tokio::spawn(report_world(world_rx));

    run_peer(
        socket,
        input_rx,
        world_tx,
        config::CLIENT_TICK_INTERVAL,
        MovementTuning::default(),
    )
    .await
}

async fn read_stdin(input_tx: mpsc::Sender<MovementFlags>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                if input_tx.send(parse_movement(&line)).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(error = %e, "stdin read failed");
                break;
            }
        }
    }
    tracing::debug!("stdin closed");
}

async fn report_world(mut world_rx: watch::Receiver<WorldView>) {
    let mut last_report = log_slot();
    while world_rx.changed().await.is_ok() {
        if !should_log(&mut last_report) {
            continue;
        }
        let view = world_rx.borrow_and_update().clone();
        match view.local() {
            Some(me) => tracing::info!(
                identifier = %me.identifier,
                x = me.x,
                y = me.y,
                direction = ?me.direction,
                squares = view.entities.len(),
                "world"
            ),
            None => tracing::info!(squares = view.entities.len(), "waiting for identity"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_held_keys() {
        let flags = parse_movement("wd");
        assert!(flags.up && flags.right);
        assert!(!flags.left && !flags.down);
    }

    #[test]
    fn empty_or_unknown_input_releases_keys() {
        assert!(parse_movement("").is_idle());
        assert!(parse_movement("  xyz \n").is_idle());
    }

    #[test]
    fn keys_are_case_insensitive() {
        let flags = parse_movement("AS");
        assert!(flags.left && flags.down);
    }
}
