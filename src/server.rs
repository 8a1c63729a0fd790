//!
//! StudioConnect edge server
//! -------------------------
//! This module defines the Axum-based HTTP surface of the StudioConnect site.
//! The route-protection gate runs as pre-routing middleware layered around the
//! whole router, so a rewrite re-enters routing and serves different content
//! under the originally requested address.
//!
//! Responsibilities:
//! - Per-navigation gating: redirect unauthenticated visitors off protected
//!   paths, rewrite non-admin visitors off admin paths.
//! - Auth endpoints: external-login callback, logout, session snapshot.
//! - Page handlers delegating data work to the backend API client.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::extract::{RawQuery, Request, State};
use axum::http::{header, HeaderMap, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Json, Router, ServiceExt};
use serde_json::json;
use tower::Layer;
use tracing::{error, info};

use crate::auth::cookie;
use crate::auth::gate::{EdgeGate, GateDecision};
use crate::auth::state::AuthState;
use crate::backend::BackendClient;
use crate::error::AppError;

pub mod pages;

pub const DEFAULT_HTTP_PORT: u16 = 7878;
pub const DEFAULT_BACKEND_URL: &str = "https://api.studioconnect.example";
pub const DEFAULT_STATE_DIR: &str = "state";

/// Shared server state injected into all handlers.
///
/// Holds the auth state container, the backend API client and the edge gate.
/// Everything is behind `Arc` so the router and the middleware can share one
/// instance.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthState>,
    pub backend: Arc<BackendClient>,
    pub gate: Arc<EdgeGate>,
}

impl AppState {
    pub fn new(auth: AuthState, backend: BackendClient, gate: EdgeGate) -> Self {
        AppState { auth: Arc::new(auth), backend: Arc::new(backend), gate: Arc::new(gate) }
    }
}

fn log_startup(state_dir: &str, backend_url: &str) {
    let cwd = std::env::current_dir().ok();
    let state_path = std::path::Path::new(state_dir);
    info!(
        target: "startup",
        "StudioConnect edge starting. cwd={:?}, state_dir={:?} (exists={}), backend='{}'",
        cwd, state_dir, state_path.exists(), backend_url
    );
}

/// Start the edge server with the default configuration.
pub async fn run() -> anyhow::Result<()> {
    run_with(DEFAULT_HTTP_PORT, DEFAULT_BACKEND_URL, DEFAULT_STATE_DIR, true).await
}

/// Start the edge server bound to the given port, talking to `backend_url`
/// and keeping its credential state under `state_dir`.
pub async fn run_with(
    http_port: u16,
    backend_url: &str,
    state_dir: &str,
    secure_cookies: bool,
) -> anyhow::Result<()> {
    log_startup(state_dir, backend_url);

    let auth = AuthState::open(std::path::Path::new(state_dir), secure_cookies)
        .with_context(|| format!("open auth state under '{state_dir}'"))?;
    if auth.is_authenticated() {
        info!("resuming stored session: {:?}", auth.snapshot().role);
    }
    let backend = BackendClient::new(backend_url)?;
    let app_state = AppState::new(auth, backend, EdgeGate::deployed());

    // The gate wraps the router instead of being a route layer: it must see
    // the request before routing so a rewritten URI is routed afresh.
    let app = axum::middleware::from_fn_with_state(app_state.clone(), edge_gate)
        .layer(router(app_state));

    let addr: SocketAddr = format!("0.0.0.0:{}", http_port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app)).await?;

    Ok(())
}

/// All routes of the edge server. Protection is not expressed here; the gate
/// decides from its own prefix table before routing happens.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(pages::home))
        .route("/health", get(|| async { "studioconnect ok" }))
        .route("/studios", get(pages::studios))
        .route("/studios/{id}", get(pages::studio_detail))
        .route("/acceso-denegado", get(pages::access_denied))
        .route("/login-error", get(pages::login_error))
        .route("/myStudio", get(pages::my_studio))
        .route("/owner", get(pages::owner_dashboard))
        .route("/profile", get(pages::profile))
        .route("/bookings", get(pages::bookings))
        .route("/admin", get(pages::admin_home))
        .route("/admin/studios", get(pages::admin_studios))
        .route("/admin/users", get(pages::admin_users))
        .route("/auth/callback", get(auth_callback))
        .route("/auth/logout", post(auth_logout))
        .route("/auth/session", get(auth_session))
        .with_state(state)
}

/// Pre-routing middleware running the gate on every request.
///
/// Pass-through forwards the request untouched. A redirect answers 307 with a
/// Location header. A rewrite swaps the request URI in place and forwards, so
/// the response carries the rewritten path's content under the original URL.
pub async fn edge_gate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let credential = cookie::access_token_from(req.headers());
    match state.gate.decide(req.uri().path(), credential.as_deref()) {
        GateDecision::PassThrough => next.run(req).await,
        GateDecision::Redirect(to) => Redirect::temporary(&to).into_response(),
        GateDecision::Rewrite(to) => match to.parse::<Uri>() {
            Ok(uri) => {
                *req.uri_mut() = uri;
                next.run(req).await
            }
            Err(_) => StatusCode::NOT_FOUND.into_response(),
        },
    }
}

/// Landing endpoint for the external identity flow. The token travels in the
/// `token` query parameter; every outcome ends in a redirect.
async fn auth_callback(State(state): State<AppState>, RawQuery(query): RawQuery) -> impl IntoResponse {
    let done = state.auth.complete_external_login(query.as_deref());
    let mut headers = HeaderMap::new();
    if let Some(set_cookie) = done.set_cookie {
        headers.insert(header::SET_COOKIE, set_cookie);
    }
    (headers, Redirect::to(done.navigate.path()))
}

async fn auth_logout(State(state): State<AppState>) -> impl IntoResponse {
    match state.auth.logout() {
        Ok(clear_cookie) => {
            let mut headers = HeaderMap::new();
            headers.insert(header::SET_COOKIE, clear_cookie);
            (headers, Redirect::to("/"))
        }
        Err(e) => {
            // The stored credential could not be removed; the browser still
            // lands on the public home page.
            error!("logout failed: {e:#}");
            (HeaderMap::new(), Redirect::to("/"))
        }
    }
}

async fn auth_session(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({"status": "ok", "session": state.auth.snapshot()}))
}

/// Uniform JSON error body shared by every handler that talks to the backend.
pub(crate) fn error_response(err: AppError) -> Response {
    let status =
        StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(json!({"status": "error", "code": err.code_str(), "message": err.message()})))
        .into_response()
}
