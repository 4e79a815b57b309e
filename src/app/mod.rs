//! Client runtime: bootstrap, connect and drive the session

pub mod console;

use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::api::{ApiError, GameApiClient};
use crate::config::Config;
use crate::game::input::InputEvent;
use crate::game::session::Session;
use crate::util::time::SessionClock;
use crate::ws::channel::{ChannelError, InboundFrame, NetworkChannel, OutboundSink};

/// Inbound snapshots buffered between the reader task and the session
const INBOUND_BUFFER: usize = 64;
/// Input events buffered between listeners and the session
const INPUT_BUFFER: usize = 256;

/// Run one game session until `shutdown` resolves.
///
/// Bootstrap and connect failures are fatal. Once running, a lost
/// connection only freezes remote players; prediction and input keep going.
pub async fn run<F>(config: Config, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()>,
{
    let api = GameApiClient::new(&config);
    let bootstrap = api.initialize_session().await?;

    let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);
    let url = config.ws_url(bootstrap.player_id);
    let channel = NetworkChannel::connect(&url, inbound_tx).await?;

    // Detached: it exits on its next line once the session drops the receiver
    let (input_tx, input_rx) = mpsc::channel(INPUT_BUFFER);
    console::spawn_stdin_listener(input_tx).map_err(AppError::Console)?;

    let session = Session::new(bootstrap, &config.sync, SessionClock::system(), channel);

    let mut frames = interval(config.sync.frame_period());
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let session = run_session(session, inbound_rx, input_rx, frames, shutdown).await;

    let stats = session.stats();
    session.shutdown().close().await;
    info!(
        frames = stats.frames,
        sends_ok = stats.sends_ok,
        sends_dropped = stats.sends_dropped,
        "Client stopped"
    );
    Ok(())
}

/// Drive `session` from frame ticks, inbound frames and input events until
/// `shutdown` resolves, then hand it back for teardown.
///
/// When inbound closes the loop keeps running in degraded mode: frames still
/// predict the local player and sends are counted as dropped. The input
/// receiver is dropped on return, which releases the listeners.
pub async fn run_session<S, F>(
    mut session: Session<S>,
    mut inbound: mpsc::Receiver<InboundFrame>,
    mut input: mpsc::Receiver<InputEvent>,
    mut frames: Interval,
    shutdown: F,
) -> Session<S>
where
    S: OutboundSink,
    F: Future<Output = ()>,
{
    let period = frames.period().as_nanos().max(1);
    let status_every = (Duration::from_secs(1).as_nanos() / period).max(1) as u64;

    let mut inbound_open = true;
    let mut input_open = true;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,

            _ = frames.tick() => {
                session.on_frame();
                if session.stats().frames % status_every == 0 {
                    let frame = session.render();
                    debug!(
                        players = frame.players.len(),
                        dust = frame.dust.len(),
                        local_left = frame.local().map(|p| p.left),
                        local_top = frame.local().map(|p| p.top),
                        "Render frame"
                    );
                }
            }

            frame = inbound.recv(), if inbound_open => match frame {
                Some(InboundFrame::Text(text)) => session.on_inbound(&text),
                Some(InboundFrame::Closed) | None => {
                    inbound_open = false;
                    warn!("Connection to game server lost, remote players frozen");
                }
            },

            event = input.recv(), if input_open => match event {
                Some(event) => {
                    session.on_input(event);
                }
                None => input_open = false,
            },
        }
    }

    session
}

/// Fatal runtime errors
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Session bootstrap failed: {0}")]
    Bootstrap(#[from] ApiError),

    #[error("Could not open game channel: {0}")]
    Channel(#[from] ChannelError),

    #[error("Could not start console input: {0}")]
    Console(#[source] std::io::Error),
}
