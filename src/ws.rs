//! Live-update WebSocket transport.
//!
//! One persistent connection per viewer. The server pushes the single
//! opaque text message `"new data"` immediately on connect and again on
//! every change wake; no payload travels over this channel - the client
//! re-fetches measurement data through a separate request after each
//! signal. Incoming client messages are ignored apart from close frames.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tracing::{debug, info};

use crate::broadcast::Wake;
use crate::service::Monitor;

/// Message text the viewer script matches on; a refresh signal, nothing
/// more.
const REFRESH_MESSAGE: &str = "new data";

#[derive(Clone)]
struct AppState {
    monitor: Arc<Monitor>,
}

/// Build the live-update router: a single `/ws` route.
pub fn router(monitor: Arc<Monitor>) -> Router {
    Router::new()
        .route("/ws", get(handle_ws))
        .with_state(AppState { monitor })
}

/// Bind `addr` and serve the live-update endpoint until the monitor's
/// stop token fires.
pub async fn serve(addr: String, monitor: Arc<Monitor>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding live-update endpoint on {}", addr))?;

    info!("live-update endpoint listening on {}", addr);

    serve_with_listener(listener, monitor).await
}

/// Serve the live-update endpoint on an already-bound listener.
pub async fn serve_with_listener(
    listener: tokio::net::TcpListener,
    monitor: Arc<Monitor>,
) -> Result<()> {
    let stop = monitor.stop_token();

    axum::serve(listener, router(monitor))
        .with_graceful_shutdown(stop.cancelled_owned())
        .await
        .context("serving live-update endpoint")
}

async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(socket, state))
}

/// Per-subscriber loop.
///
/// The subscription's connect-time push delivers the first refresh; after
/// that the loop suspends until the next wake. A send failure or a close
/// frame removes only this subscriber.
async fn ws_connection(mut socket: WebSocket, state: AppState) {
    let mut sub = state.monitor.subscribe();
    debug!("live-update subscriber connected");

    loop {
        tokio::select! {
            biased;

            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => continue,
                }
            }

            wake = sub.changed() => {
                match wake {
                    Wake::Refresh => {
                        if socket
                            .send(Message::Text(REFRESH_MESSAGE.into()))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Wake::Closed => {
                        let _ = socket.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }
    }

    debug!("live-update subscriber disconnected");
}
