// src/server/handler.rs
use crate::broadcast::Broadcaster;
use crate::config::Config;
use crate::registry::Registry;
use crate::server::badge::generate_badge;
use crate::snapshot::{self, uptime_percent};
use chrono::Utc;
use hyper::body::Bytes;
use hyper::{Body, Method, Request, Response, StatusCode};
use percent_encoding::percent_decode_str;
use std::sync::Arc;
use tower::Service;
use tracing::debug;

pub struct AppState {
    pub registry: Arc<Registry>,
    pub broadcaster: Arc<Broadcaster>,
    pub config: Config,
}

#[derive(Clone)]
pub struct RequestHandler {
    state: Arc<AppState>,
}

impl RequestHandler {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = Box<dyn std::error::Error + Send + Sync>;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let state = self.state.clone();
        Box::pin(async move { Ok(route(state, req).await) })
    }
}

async fn route(state: Arc<AppState>, req: Request<Body>) -> Response<Body> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/api/instances") => instances(state).await,
        (&Method::GET, "/api/stats") => stats(state).await,
        (&Method::GET, "/api/stream") => stream(state).await,
        (&Method::GET, "/health") => health(state).await,
        (&Method::GET, path) if path.starts_with("/api/badge/") => {
            badge(state, &path["/api/badge/".len()..]).await
        }
        _ => status_response(StatusCode::NOT_FOUND, "Not Found"),
    }
}

async fn instances(state: Arc<AppState>) -> Response<Body> {
    json_response(&snapshot::build_views(&state.registry).await)
}

async fn stats(state: Arc<AppState>) -> Response<Body> {
    json_response(&snapshot::build_stats(&state.registry).await)
}

async fn health(state: Arc<AppState>) -> Response<Body> {
    json_response(&serde_json::json!({
        "status": "healthy",
        "timestamp": Utc::now().timestamp(),
        "instances": state.registry.len().await,
    }))
}

/// Up/down badge for a single tracked URL, percent-encoded in the path.
async fn badge(state: Arc<AppState>, encoded: &str) -> Response<Body> {
    let url = match percent_decode_str(encoded).decode_utf8() {
        Ok(url) => url.into_owned(),
        Err(_) => return status_response(StatusCode::BAD_REQUEST, "Bad Request"),
    };

    let (status_code, svg) = match state.registry.find(&url).await {
        None => (
            StatusCode::NOT_FOUND,
            generate_badge("unknown", "not found", "#6b7280"),
        ),
        Some(ep) => {
            let ep_state = ep.read_state().await;
            let checks: Vec<_> = ep_state.checks.iter().cloned().collect();
            let is_up = checks.last().map(|c| c.success).unwrap_or(false);
            let svg = if is_up {
                generate_badge(
                    "status",
                    &format!("up {:.1}%", uptime_percent(&checks)),
                    "#22c55e",
                )
            } else {
                generate_badge("status", "down", "#ef4444")
            };
            (StatusCode::OK, svg)
        }
    };

    Response::builder()
        .status(status_code)
        .header("Content-Type", "image/svg+xml")
        .header("Cache-Control", "no-cache, no-store, must-revalidate")
        .header("Access-Control-Allow-Origin", "*")
        .body(Body::from(svg))
        .unwrap_or_default()
}

/// SSE stream of snapshot updates. The broadcaster pushes the current
/// state into the inbox at subscribe time, so the first event goes out
/// right away; after that the task forwards live updates and emits
/// keepalive comments while the stream is idle.
async fn stream(state: Arc<AppState>) -> Response<Body> {
    let mut subscription = state.broadcaster.subscribe().await;
    let broadcaster = state.broadcaster.clone();
    let keepalive = state.config.sse_keepalive;

    let (mut body_tx, body) = Body::channel();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(keepalive);
        ticker.tick().await;

        loop {
            let frame: Bytes = tokio::select! {
                msg = subscription.rx.recv() => match msg {
                    Some(payload) => {
                        let mut frame = Vec::with_capacity(payload.len() + 8);
                        frame.extend_from_slice(b"data: ");
                        frame.extend_from_slice(&payload);
                        frame.extend_from_slice(b"\n\n");
                        Bytes::from(frame)
                    }
                    None => break,
                },
                _ = ticker.tick() => Bytes::from_static(b":keepalive\n\n"),
            };

            // A failed send means the client went away.
            if body_tx.send_data(frame).await.is_err() {
                debug!("stream client disconnected");
                break;
            }
        }
        broadcaster.unsubscribe(subscription.id).await;
    });

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "text/event-stream")
        .header("Cache-Control", "no-cache")
        .header("Connection", "keep-alive")
        .header("Access-Control-Allow-Origin", "*")
        .body(body)
        .unwrap_or_default()
}

fn json_response<T: serde::Serialize>(value: &T) -> Response<Body> {
    match serde_json::to_vec(value) {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "application/json")
            .header("Access-Control-Allow-Origin", "*")
            .body(Body::from(body))
            .unwrap_or_default(),
        Err(_) => status_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error"),
    }
}

fn status_response(status: StatusCode, message: &'static str) -> Response<Body> {
    Response::builder()
        .status(status)
        .body(Body::from(message))
        .unwrap_or_default()
}
