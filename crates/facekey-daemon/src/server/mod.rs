//! Pairing / control HTTP server
//!
//! Serves the enrollment page and two token-gated endpoints to phones on the
//! local network:
//!
//! - `GET /` (optionally `?token=`): the enrollment page
//! - `POST /register` `{token, images}`: enroll faces from base64 images
//! - `POST /unlock` `{token}`: type the stored credential now
//!
//! Every other path is a 404; nothing is served from the filesystem. Bodies
//! are parsed by hand so that any malformed payload maps to `400 Invalid JSON`
//! instead of the extractor's default rejection.

mod bind;

pub use bind::{bind_with_retry, lan_ip};

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, RawQuery, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use facekey_core::frame::decode_base64_image;
use facekey_core::{FaceEncoder, FaceEncoding};

use crate::config::DaemonConfig;
use crate::error::{DaemonError, Result};
use crate::events::{DaemonEvent, EventBus};
use crate::state::StateStore;
use crate::unlock::UnlockExecutor;

const PAGE: &str = include_str!("page.html");

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub state: Arc<StateStore>,
    pub encoder: Option<Arc<dyn FaceEncoder>>,
    pub unlocker: Arc<UnlockExecutor>,
    pub events: EventBus,
    pub max_register_images: usize,
}

impl AppState {
    fn authorized(&self, token: Option<&str>) -> bool {
        token.map_or(false, |t| self.state.verify_token(t))
    }
}

#[derive(Debug, Deserialize)]
struct RegisterRequest {
    token: Option<String>,
    #[serde(default)]
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct UnlockRequest {
    token: Option<String>,
}

/// Route table
pub fn router(app: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/register", post(register))
        .route("/unlock", post(unlock))
        .fallback(not_found)
        .method_not_allowed_fallback(not_found)
        .with_state(app)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TraceLayer::new_for_http())
}

/// A bound, not yet running, pairing server
pub struct PairingServer {
    listener: TcpListener,
    router: Router,
}

impl PairingServer {
    /// Bind the first free port in the configured range
    pub async fn bind(config: &DaemonConfig, app: AppState) -> Result<Self> {
        let listener =
            bind_with_retry(&config.server_host, config.server_port, config.port_attempts).await?;
        Ok(Self {
            listener,
            router: router(app, config.max_body_bytes),
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until the task is dropped
    pub async fn run(self) -> Result<()> {
        axum::serve(self.listener, self.router)
            .await
            .map_err(DaemonError::Io)
    }
}

fn text(status: StatusCode, body: &'static str) -> Response {
    (status, body).into_response()
}

async fn index(RawQuery(query): RawQuery) -> Response {
    match query.as_deref() {
        None | Some("") => Html(PAGE).into_response(),
        Some(q) if q.starts_with("token=") => Html(PAGE).into_response(),
        Some(_) => not_found().await,
    }
}

async fn not_found() -> Response {
    text(StatusCode::NOT_FOUND, "Not Found")
}

async fn register(State(app): State<AppState>, body: Bytes) -> Response {
    let request: RegisterRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!("Rejected registration body: {}", e);
            return text(StatusCode::BAD_REQUEST, "Invalid JSON");
        }
    };

    if !app.authorized(request.token.as_deref()) {
        warn!("Registration rejected: invalid token");
        return text(StatusCode::FORBIDDEN, "Forbidden");
    }

    if request.images.len() > app.max_register_images {
        warn!(
            "Registration rejected: {} images exceeds limit of {}",
            request.images.len(),
            app.max_register_images
        );
        return text(StatusCode::BAD_REQUEST, "Too many images");
    }

    let Some(encoder) = app.encoder.clone() else {
        return text(StatusCode::SERVICE_UNAVAILABLE, "Face recognition unavailable");
    };

    info!("Received {} registration image(s)", request.images.len());
    let images = request.images;
    let state = Arc::clone(&app.state);

    let outcome = tokio::task::spawn_blocking(move || {
        let encodings = encode_images(encoder.as_ref(), &images);
        if encodings.is_empty() {
            return Ok(None);
        }
        let added = encodings.len();
        state.append_encodings(encodings).map(|total| Some((added, total)))
    })
    .await;

    match outcome {
        Ok(Ok(Some((added, total)))) => {
            info!("Enrolled {} face encoding(s), {} total", added, total);
            app.events.publish(DaemonEvent::Enrolled { added, total });
            text(StatusCode::OK, "Registered")
        }
        Ok(Ok(None)) => {
            info!("No faces found in registration images");
            text(StatusCode::BAD_REQUEST, "No faces found")
        }
        Ok(Err(e)) => {
            error!("Failed to persist enrollment: {}", e);
            text(StatusCode::INTERNAL_SERVER_ERROR, "Registration failed")
        }
        Err(e) => {
            error!("Registration task failed: {}", e);
            text(StatusCode::INTERNAL_SERVER_ERROR, "Registration failed")
        }
    }
}

/// First face of each decodable image; undecodable or faceless images are skipped
fn encode_images(encoder: &dyn FaceEncoder, images: &[String]) -> Vec<FaceEncoding> {
    images
        .iter()
        .enumerate()
        .filter_map(|(i, payload)| {
            let image = decode_base64_image(payload)
                .map_err(|e| debug!("Skipping image {}: {}", i, e))
                .ok()?;
            encoder
                .encode_first(&image)
                .map_err(|e| debug!("Encoder failed on image {}: {}", i, e))
                .ok()
                .flatten()
        })
        .collect()
}

async fn unlock(State(app): State<AppState>, body: Bytes) -> Response {
    let request: UnlockRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            debug!("Rejected unlock body: {}", e);
            return text(StatusCode::BAD_REQUEST, "Invalid JSON");
        }
    };

    if !app.authorized(request.token.as_deref()) {
        warn!("Unlock rejected: invalid token");
        return text(StatusCode::FORBIDDEN, "Forbidden");
    }

    info!("Unlock requested over the network");
    let unlocker = Arc::clone(&app.unlocker);
    match tokio::task::spawn_blocking(move || unlocker.unlock()).await {
        Ok(Ok(())) => text(StatusCode::OK, "Unlocked"),
        Ok(Err(e)) => {
            warn!("Network unlock failed: {}", e);
            text(StatusCode::INTERNAL_SERVER_ERROR, "Unlock failed")
        }
        Err(e) => {
            error!("Unlock task failed: {}", e);
            text(StatusCode::INTERNAL_SERVER_ERROR, "Unlock failed")
        }
    }
}
