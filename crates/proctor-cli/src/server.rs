//! WebSocket ingress transport. One task per connection, each driving
//! its session's frames through `SessionManager` on a single logical
//! thread of control. Built on `axum`'s `ws` feature and `tower-http`'s
//! CORS layer.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use log::{debug, info, warn};
use proctor_core::frame::{Frame, Substream};
use proctor_core::ingress::{InboundMessage, OutboundMessage};
use proctor_core::manager::{SessionEvent, SessionManager};
use proctor_core::ProctorConfig;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use uuid::Uuid;

pub struct AppState {
    pub manager: Arc<SessionManager>,
    pub config: ProctorConfig,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Reap idle sessions on a fixed tick for as long as the server runs.
pub async fn run_idle_reaper(manager: Arc<SessionManager>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    loop {
        interval.tick().await;
        for (connection_id, report) in manager.reap_idle() {
            info!("reaped idle session on connection {connection_id}: risk={:?}", report.risk_level);
        }
    }
}

async fn ws_handler(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

async fn handle_connection(mut socket: WebSocket, state: Arc<AppState>) {
    let connection_id = Uuid::new_v4().to_string();
    info!("connection {connection_id} opened");

    while let Some(Ok(message)) = socket.recv().await {
        let Message::Text(text) = message else {
            continue;
        };

        let inbound: InboundMessage = match serde_json::from_str(&text) {
            Ok(msg) => msg,
            Err(err) => {
                debug!("connection {connection_id}: malformed inbound message: {err}");
                send(&mut socket, &OutboundMessage::Error { message: err.to_string() }).await;
                continue;
            }
        };

        if !dispatch(&mut socket, &state, &connection_id, inbound).await {
            break;
        }
    }

    if let Err(err) = state.manager.end(&connection_id) {
        debug!("connection {connection_id} closed without an active session: {err}");
    }
    info!("connection {connection_id} closed");
}

/// Handle one inbound message. Returns `false` when the connection
/// should close (an `end_proctoring` was processed).
async fn dispatch(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
    connection_id: &str,
    inbound: InboundMessage,
) -> bool {
    match inbound {
        InboundMessage::StartProctoring { student_id, exam_id } => {
            match state.manager.start(connection_id, student_id, exam_id) {
                Ok(session_id) => {
                    send(socket, &OutboundMessage::ConnectionResponse {
                        status: "ok".to_string(),
                        session_id,
                    })
                    .await;
                    send(socket, &OutboundMessage::ProctoringStarted {
                        status: "started".to_string(),
                        session_id,
                    })
                    .await;
                }
                Err(err) => send(socket, &OutboundMessage::Error { message: err.to_string() }).await,
            }
            true
        }
        InboundMessage::VideoFrame { frame, .. } => {
            route_frame(socket, state, connection_id, Substream::Camera, &frame).await;
            true
        }
        InboundMessage::ScreenFrame { frame, .. } => {
            route_frame(socket, state, connection_id, Substream::Screen, &frame).await;
            true
        }
        InboundMessage::EndProctoring => {
            match state.manager.end(connection_id) {
                Ok(report) => {
                    send(socket, &OutboundMessage::ProctoringEnded {
                        status: "ended".to_string(),
                        report,
                    })
                    .await;
                }
                Err(err) => send(socket, &OutboundMessage::Error { message: err.to_string() }).await,
            }
            false
        }
    }
}

async fn route_frame(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
    connection_id: &str,
    substream: Substream,
    data_url: &str,
) {
    // Decode failure is logged and the frame silently dropped; a
    // malformed single frame must not tear down the session.
    let frame = match Frame::decode_data_url(
        substream,
        data_url,
        state.config.frame_width,
        state.config.frame_height,
    ) {
        Ok(frame) => frame,
        Err(err) => {
            warn!("connection {connection_id}: dropping undecodable {} frame: {err}", substream.as_str());
            return;
        }
    };

    match state.manager.route_frame(connection_id, substream, &frame) {
        Ok(events) => {
            for event in events {
                send(socket, &to_outbound(event)).await;
            }
        }
        Err(err) => send(socket, &OutboundMessage::Error { message: err.to_string() }).await,
    }
}

fn to_outbound(event: SessionEvent) -> OutboundMessage {
    match event {
        SessionEvent::Violations(violations) => OutboundMessage::ViolationDetected {
            violations,
            timestamp: chrono::Utc::now(),
            source: None,
        },
        SessionEvent::Status {
            frames_processed,
            screen_frames_processed,
            total_violations,
            ghost_typing_count,
        } => OutboundMessage::ProctorStatus {
            frames_processed,
            screen_frames_processed,
            total_violations,
            ghost_typing_count,
        },
    }
}

async fn send(socket: &mut WebSocket, message: &OutboundMessage) {
    match serde_json::to_string(message) {
        Ok(text) => {
            if let Err(err) = socket.send(Message::Text(text)).await {
                debug!("failed to send outbound message: {err}");
            }
        }
        Err(err) => warn!("failed to serialize outbound message: {err}"),
    }
}
