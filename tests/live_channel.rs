//! Bootstrap and channel against an in-process game server

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, sleep, timeout};
use tokio_test::assert_ok;
use uuid::Uuid;

use swordplay_client::api::{ApiError, GameApiClient};
use swordplay_client::app::run_session;
use swordplay_client::config::{Config, SyncSettings};
use swordplay_client::game::input::{Action, InputEvent};
use swordplay_client::game::session::Session;
use swordplay_client::util::time::SessionClock;
use swordplay_client::ws::channel::{
    ChannelState, DropReason, InboundFrame, NetworkChannel, OutboundSink, SendOutcome,
};
use swordplay_client::ws::protocol::{decode_outbound, OutboundMsg};

const WAIT: Duration = Duration::from_secs(5);
const REMOTE_PLAYER: &str = "6a4f1c0e-2b7d-4e59-9a83-0d5c2f61b7e4";

/// How the mock server treats a connected client
#[derive(Clone, Copy, PartialEq)]
enum Behaviour {
    /// Push one snapshot and one garbage frame, then echo client messages to the test
    Serve,
    /// Close the socket straight away
    Hangup,
    /// Push one snapshot with a second player, then close
    SnapshotThenHangup,
}

struct MockServer {
    player_id: Uuid,
    map: Option<Value>,
    behaviour: Behaviour,
    received: mpsc::UnboundedSender<String>,
}

async fn initialize(State(server): State<Arc<MockServer>>) -> Json<Value> {
    Json(json!({
        "player_id": &server.player_id,
        "map": &server.map,
    }))
}

async fn game_socket(
    ws: WebSocketUpgrade,
    Path(player_id): Path<Uuid>,
    State(server): State<Arc<MockServer>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, player_id, server))
}

async fn handle_socket(mut socket: WebSocket, player_id: Uuid, server: Arc<MockServer>) {
    if server.behaviour == Behaviour::Hangup {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    let mut snapshot = json!({
        player_id.to_string(): {
            "x": 3.0,
            "y": 0.0,
            "speed": 30.0,
            "angle": 0.0,
            "pivot_points": {"l_ankle": [0.3, 0.1], "r_ankle": [0.7, 0.0]}
        }
    });
    if server.behaviour == Behaviour::SnapshotThenHangup {
        snapshot[REMOTE_PLAYER] = json!({"x": 8.0, "y": 2.0, "speed": 30.0, "angle": 0.25});
    }
    if socket.send(Message::Text(snapshot.to_string())).await.is_err() {
        return;
    }
    if server.behaviour == Behaviour::SnapshotThenHangup {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }
    if socket.send(Message::Text("not a snapshot".into())).await.is_err() {
        return;
    }

    while let Some(Ok(msg)) = socket.recv().await {
        match msg {
            Message::Text(text) => {
                let _ = server.received.send(text);
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
}

async fn spawn_server(server: MockServer) -> SocketAddr {
    let app = Router::new()
        .route("/api/game/initialize/", get(initialize))
        .route("/ws/game/:player_id/", get(game_socket))
        .with_state(Arc::new(server));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn map_json() -> Value {
    json!({
        "name": "arena",
        "width": 20,
        "height": 15,
        "tiles": [{"x": 0, "y": 14, "color": "#e79506", "layer": 1}]
    })
}

fn config_for(addr: SocketAddr) -> Config {
    Config {
        server_host: addr.ip().to_string(),
        api_base_url: format!("http://{}", addr),
        ws_port: addr.port(),
        ..Config::default()
    }
}

async fn next_frame(rx: &mut mpsc::Receiver<InboundFrame>) -> InboundFrame {
    timeout(WAIT, rx.recv())
        .await
        .expect("timed out waiting for a frame")
        .expect("reader task ended")
}

#[tokio::test]
async fn session_runs_against_a_live_server() {
    let player_id = Uuid::new_v4();
    let (received_tx, mut received_rx) = mpsc::unbounded_channel();
    let addr = spawn_server(MockServer {
        player_id,
        map: Some(map_json()),
        behaviour: Behaviour::Serve,
        received: received_tx,
    })
    .await;
    let config = config_for(addr);

    let api = GameApiClient::new(&config);
    let bootstrap = assert_ok!(api.initialize_session().await);
    assert_eq!(bootstrap.player_id, player_id);
    assert_eq!(bootstrap.map.width, 20);
    assert_eq!(bootstrap.map.tiles.len(), 1);

    let (inbound_tx, mut inbound_rx) = mpsc::channel(16);
    let channel = assert_ok!(NetworkChannel::connect(&config.ws_url(player_id), inbound_tx).await);
    assert_eq!(channel.state(), ChannelState::Open);

    let clock = SessionClock::manual();
    let mut session = Session::new(bootstrap, &SyncSettings::default(), clock.clone(), channel);

    for _ in 0..2 {
        match next_frame(&mut inbound_rx).await {
            InboundFrame::Text(text) => session.on_inbound(&text),
            InboundFrame::Closed => panic!("server closed early"),
        }
    }
    assert_eq!(session.stats().snapshots_applied, 1);
    assert_eq!(session.stats().snapshots_malformed, 1);
    assert_eq!(session.store().local_view().unwrap().x, 3.0);

    session.on_frame();
    let text = timeout(WAIT, received_rx.recv()).await.unwrap().unwrap();
    assert_eq!(
        assert_ok!(decode_outbound(&text)),
        OutboundMsg::Position {
            x: 3.0,
            running: false,
            crouching: false
        }
    );

    assert_eq!(
        session.on_input(InputEvent::Pressed(Action::Guard)),
        Some(SendOutcome::Sent)
    );
    let text = timeout(WAIT, received_rx.recv()).await.unwrap().unwrap();
    assert_eq!(text, r#"{"guard":true}"#);

    let channel = session.shutdown();
    assert_eq!(channel.stats().sent(), 2);
    channel.close().await;
}

#[tokio::test]
async fn bootstrap_without_a_map_fails() {
    let (received_tx, _received_rx) = mpsc::unbounded_channel();
    let addr = spawn_server(MockServer {
        player_id: Uuid::new_v4(),
        map: None,
        behaviour: Behaviour::Serve,
        received: received_tx,
    })
    .await;

    let api = GameApiClient::new(&config_for(addr));
    assert!(matches!(
        api.initialize_session().await,
        Err(ApiError::MissingMap)
    ));
}

#[tokio::test]
async fn bootstrap_reports_http_errors() {
    let (received_tx, _received_rx) = mpsc::unbounded_channel();
    let addr = spawn_server(MockServer {
        player_id: Uuid::new_v4(),
        map: Some(map_json()),
        behaviour: Behaviour::Serve,
        received: received_tx,
    })
    .await;

    let api = GameApiClient::with_base_url(&format!("http://{}/missing", addr));
    match api.initialize_session().await {
        Err(ApiError::Api { status, .. }) => assert_eq!(status, 404),
        other => panic!("expected an HTTP error, got {:?}", other.map(|b| b.player_id)),
    }
}

#[tokio::test]
async fn server_hangup_closes_the_channel() {
    let player_id = Uuid::new_v4();
    let (received_tx, _received_rx) = mpsc::unbounded_channel();
    let addr = spawn_server(MockServer {
        player_id,
        map: Some(map_json()),
        behaviour: Behaviour::Hangup,
        received: received_tx,
    })
    .await;

    let (inbound_tx, mut inbound_rx) = mpsc::channel(16);
    let url = config_for(addr).ws_url(player_id);
    let channel = assert_ok!(NetworkChannel::connect(&url, inbound_tx).await);

    assert_eq!(next_frame(&mut inbound_rx).await, InboundFrame::Closed);
    assert_eq!(channel.state(), ChannelState::Closed);
    assert_eq!(
        channel.send(&OutboundMsg::jump()),
        SendOutcome::Dropped(DropReason::ChannelNotOpen)
    );
    assert_eq!(channel.stats().dropped(), 1);
}

#[tokio::test]
async fn session_keeps_predicting_after_the_server_hangs_up() {
    let player_id = Uuid::new_v4();
    let remote: Uuid = REMOTE_PLAYER.parse().unwrap();
    let (received_tx, _received_rx) = mpsc::unbounded_channel();
    let addr = spawn_server(MockServer {
        player_id,
        map: Some(map_json()),
        behaviour: Behaviour::SnapshotThenHangup,
        received: received_tx,
    })
    .await;
    let config = config_for(addr);

    let bootstrap = assert_ok!(GameApiClient::new(&config).initialize_session().await);
    let (inbound_tx, inbound_rx) = mpsc::channel(16);
    let channel = assert_ok!(NetworkChannel::connect(&config.ws_url(player_id), inbound_tx).await);

    // Snapshot and close are both buffered before the loop starts
    let closed = timeout(WAIT, async {
        while channel.state() != ChannelState::Closed {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(closed.is_ok(), "server never hung up");

    let clock = SessionClock::manual();
    let session = Session::new(bootstrap, &SyncSettings::default(), clock.clone(), channel);
    let (input_tx, input_rx) = mpsc::channel(16);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();

    let driver = async {
        sleep(Duration::from_millis(50)).await;
        // same events the console produces for `down d` and `down space`
        input_tx
            .send(InputEvent::Pressed(Action::MoveRight))
            .await
            .unwrap();
        input_tx.send(InputEvent::Pressed(Action::Jump)).await.unwrap();
        sleep(Duration::from_millis(50)).await;
        clock.advance(Duration::from_millis(500));
        sleep(Duration::from_millis(100)).await;
        let _ = stop_tx.send(());
    };
    let frames = interval(Duration::from_millis(10));
    let shutdown = async {
        let _ = stop_rx.await;
    };
    let (session, ()) = tokio::join!(
        run_session(session, inbound_rx, input_rx, frames, shutdown),
        driver
    );

    let stats = session.stats();
    assert_eq!(stats.snapshots_applied, 1);
    assert!(stats.frames >= 5, "{} frames", stats.frames);
    assert_eq!(stats.sends_ok, 0);
    assert!(stats.sends_dropped >= 2, "{} dropped", stats.sends_dropped);

    let x = session.store().local_view().unwrap().x;
    assert!((x - 3.5).abs() < 1e-9, "x = {}", x);

    // remote player frozen at its last snapshot: (8 * 30, (15 - 2 - 2) * 30)
    let frame = session.render();
    let other = frame.player(&remote).unwrap();
    assert_eq!(other.left, 240.0);
    assert_eq!(other.top, 330.0);
    assert_eq!(other.angle, 0.25);

    // the loop released the input side on return
    assert!(input_tx.is_closed());

    let channel = session.shutdown();
    assert_eq!(channel.state(), ChannelState::Closed);
    channel.close().await;
}
