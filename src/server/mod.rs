//! HTTP surface: live HTML view, health, last prices and the WebSocket feed.

pub mod hub;

pub use hub::Hub;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, watch};

use crate::event::WsConnectionStatus;
use crate::model::tick::PriceTick;
use crate::store::PriceStore;

pub struct AppState {
    pub store: Arc<PriceStore>,
    pub hub: Hub,
    /// Connection status of each symbol's exchange feed.
    pub feeds: Vec<(String, watch::Receiver<WsConnectionStatus>)>,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/prices/{symbol}", get(price_by_symbol))
        .route("/ws", get(ws_upgrade))
        .with_state(Arc::new(state))
}

/// Serve until `shutdown` flips, then drain in-flight requests.
pub async fn serve(addr: &str, state: AppState, mut shutdown: watch::Receiver<bool>) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(addr, "HTTP server listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async move {
            let _ = shutdown.changed().await;
        })
        .await
        .context("HTTP server error")
}

async fn index() -> Html<&'static str> {
    Html(include_str!("index.html"))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let feeds: BTreeMap<&str, WsConnectionStatus> = state
        .feeds
        .iter()
        .map(|(symbol, rx)| (symbol.as_str(), rx.borrow().clone()))
        .collect();
    Json(serde_json::json!({ "status": "ok", "feeds": feeds }))
}

async fn price_by_symbol(
    State(state): State<Arc<AppState>>,
    Path(symbol): Path<String>,
) -> Result<Json<PriceTick>, (StatusCode, &'static str)> {
    state
        .store
        .get(&symbol.to_ascii_uppercase())
        .map(Json)
        .ok_or((StatusCode::NOT_FOUND, "not found"))
}

async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    let frames = state.hub.subscribe();
    ws.on_upgrade(move |socket| client_loop(socket, frames))
        .into_response()
}

async fn client_loop(socket: WebSocket, mut frames: broadcast::Receiver<String>) {
    let (mut sender, mut receiver) = socket.split();
    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Ok(text) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "WebSocket client too slow, disconnecting");
                    break;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    let _ = sender.close().await;
}
