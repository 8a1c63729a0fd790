//! Page handlers for the StudioConnect site.
//!
//! Shell pages render a static HTML frame. Data pages call the backend API,
//! forwarding the stored credential as a bearer token, and normalize failures
//! into the shared JSON error body. A 401 from the backend means the
//! credential died server-side: the session is invalidated and the browser is
//! sent back to the public home page to sign in again.

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

use super::{error_response, AppState};
use crate::backend::ApiError;

pub async fn home() -> Html<&'static str> {
    Html(
        "<!doctype html><html><head><title>StudioConnect</title></head>\
         <body><h1>StudioConnect</h1>\
         <p>Encuentra y reserva salas de ensayo.</p>\
         <p><a href=\"/studios\">Ver salas</a></p></body></html>",
    )
}

pub async fn access_denied() -> Html<&'static str> {
    Html(
        "<!doctype html><html><head><title>Acceso denegado</title></head>\
         <body><h1>Acceso denegado</h1>\
         <p>No tienes permisos para ver esta p&aacute;gina.</p>\
         <p><a href=\"/\">Volver al inicio</a></p></body></html>",
    )
}

pub async fn login_error() -> Html<&'static str> {
    Html(
        "<!doctype html><html><head><title>Error de inicio de sesi&oacute;n</title></head>\
         <body><h1>Error de inicio de sesi&oacute;n</h1>\
         <p>No se pudo completar el inicio de sesi&oacute;n. Int&eacute;ntalo de nuevo.</p>\
         <p><a href=\"/\">Volver al inicio</a></p></body></html>",
    )
}

pub async fn my_studio() -> Html<&'static str> {
    Html(
        "<!doctype html><html><head><title>Mi estudio</title></head>\
         <body><h1>Mi estudio</h1><p>Tus salas y ensayos.</p></body></html>",
    )
}

pub async fn owner_dashboard() -> Html<&'static str> {
    Html(
        "<!doctype html><html><head><title>Panel del due&ntilde;o</title></head>\
         <body><h1>Panel del due&ntilde;o</h1><p>Gestiona tus salas publicadas.</p></body></html>",
    )
}

pub async fn profile() -> Html<&'static str> {
    Html(
        "<!doctype html><html><head><title>Perfil</title></head>\
         <body><h1>Perfil</h1><p>Tus datos de cuenta.</p></body></html>",
    )
}

pub async fn admin_home() -> Html<&'static str> {
    Html(
        "<!doctype html><html><head><title>Administraci&oacute;n</title></head>\
         <body><h1>Panel de administraci&oacute;n</h1>\
         <p><a href=\"/admin/studios\">Moderar salas</a> | \
         <a href=\"/admin/users\">Gestionar usuarios</a></p></body></html>",
    )
}

/// Public studio catalogue, no credential attached.
pub async fn studios(State(state): State<AppState>) -> Response {
    match state.backend.get_json("/studios", None).await {
        Ok(list) => Json(json!({"status": "ok", "studios": list})).into_response(),
        Err(err) => {
            error!("studios fetch error: {err}");
            error_response(err.into())
        }
    }
}

pub async fn studio_detail(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.backend.get_json(&format!("/studios/{id}"), None).await {
        Ok(studio) => Json(json!({"status": "ok", "studio": studio})).into_response(),
        Err(err) => {
            error!("studio detail error: {err}");
            error_response(err.into())
        }
    }
}

/// The visitor's bookings. Requires the stored credential; a backend 401 ends
/// the session and prompts a fresh login from the home page.
pub async fn bookings(State(state): State<AppState>) -> Response {
    let bearer = state.auth.credential();
    match state.backend.get_json("/bookings/mine", bearer.as_deref()).await {
        Ok(list) => Json(json!({"status": "ok", "bookings": list})).into_response(),
        Err(ApiError::Unauthorized) => session_expired(&state),
        Err(err) => {
            error!("bookings fetch error: {err}");
            error_response(err.into())
        }
    }
}

pub async fn admin_studios(State(state): State<AppState>) -> Response {
    let bearer = state.auth.credential();
    match state.backend.get_json("/admin/studios", bearer.as_deref()).await {
        Ok(list) => Json(json!({"status": "ok", "studios": list})).into_response(),
        Err(ApiError::Unauthorized) => session_expired(&state),
        Err(err) => {
            error!("admin studios fetch error: {err}");
            error_response(err.into())
        }
    }
}

pub async fn admin_users(State(state): State<AppState>) -> Response {
    let bearer = state.auth.credential();
    match state.backend.get_json("/admin/users", bearer.as_deref()).await {
        Ok(list) => Json(json!({"status": "ok", "users": list})).into_response(),
        Err(ApiError::Unauthorized) => session_expired(&state),
        Err(err) => {
            error!("admin users fetch error: {err}");
            error_response(err.into())
        }
    }
}

// Backend rejected the credential: flip to signed-out, drop the cookie mirror
// and send the browser home to log in again.
fn session_expired(state: &AppState) -> Response {
    let mut headers = HeaderMap::new();
    if let Some(clear_cookie) = state.auth.invalidate() {
        headers.insert(header::SET_COOKIE, clear_cookie);
    }
    (headers, Redirect::to("/")).into_response()
}
