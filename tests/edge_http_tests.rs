//! Whole-service tests: gate middleware layered around the router, the auth
//! endpoints, and page handlers against a stub backend. Requests are driven
//! through the composed service with oneshot, the way the deployed server
//! wires it.

use anyhow::Result;
use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tempfile::tempdir;
use tower::{Layer, ServiceExt};

use studioconnect::auth::credential::forge;
use studioconnect::auth::gate::EdgeGate;
use studioconnect::auth::state::AuthState;
use studioconnect::backend::BackendClient;
use studioconnect::server::{self, AppState};

fn test_state(dir: &tempfile::TempDir, backend_url: &str) -> AppState {
    AppState::new(
        AuthState::open(dir.path(), false).unwrap(),
        BackendClient::new(backend_url).unwrap(),
        EdgeGate::deployed(),
    )
}

// Backend that is never reached; gate decisions must not depend on it.
const UNREACHABLE_BACKEND: &str = "http://127.0.0.1:9";

async fn send(state: &AppState, req: Request<Body>) -> Response {
    let app = axum::middleware::from_fn_with_state(state.clone(), server::edge_gate)
        .layer(server::router(state.clone()));
    app.oneshot(req).await.unwrap()
}

fn get_req(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = cookie {
        builder = builder.header(header::COOKIE, format!("accessToken={token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_req(uri: &str) -> Request<Body> {
    Request::builder().method("POST").uri(uri).body(Body::empty()).unwrap()
}

async fn body_string(res: Response) -> String {
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
    String::from_utf8_lossy(&bytes).to_string()
}

fn authorization_echo(headers: &HeaderMap) -> String {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

/// Stub standing in for the StudioConnect backend: public studio data,
/// authorization echoes for admin data and booking writes, 401 for
/// everything else.
async fn spawn_backend() -> Result<String> {
    let stub = Router::new()
        .route("/studios", get(|| async { Json(json!([{"id": 1, "name": "Sala Norte"}])) }))
        .route("/studios/{id}", get(|| async { Json(json!({"id": 1, "name": "Sala Norte"})) }))
        .route(
            "/admin/users",
            get(|headers: HeaderMap| async move {
                Json(json!({"authorization": authorization_echo(&headers), "users": []}))
            }),
        )
        .route(
            "/bookings",
            post(|headers: HeaderMap, Json(body): Json<Value>| async move {
                Json(json!({"authorization": authorization_echo(&headers), "echo": body}))
            }),
        )
        .fallback(|| async { StatusCode::UNAUTHORIZED });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, stub).await;
    });
    Ok(format!("http://{addr}"))
}

#[tokio::test]
async fn protected_paths_redirect_anonymous_visitors_home() -> Result<()> {
    let dir = tempdir()?;
    let state = test_state(&dir, UNREACHABLE_BACKEND);
    for path in ["/myStudio", "/owner", "/profile", "/bookings", "/bookings/2026-03-01"] {
        let res = send(&state, get_req(path, None)).await;
        assert_eq!(res.status(), StatusCode::TEMPORARY_REDIRECT, "{path}");
        assert_eq!(res.headers()[header::LOCATION], "/", "{path}");
    }
    Ok(())
}

#[tokio::test]
async fn any_cookie_unlocks_authenticated_pages() -> Result<()> {
    let dir = tempdir()?;
    let state = test_state(&dir, UNREACHABLE_BACKEND);
    let res = send(&state, get_req("/myStudio", Some("whatever-opaque-value"))).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_string(res).await.contains("Mi estudio"));
    Ok(())
}

#[tokio::test]
async fn public_pages_need_no_cookie() -> Result<()> {
    let dir = tempdir()?;
    let state = test_state(&dir, UNREACHABLE_BACKEND);
    let res = send(&state, get_req("/", None)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_string(res).await.contains("StudioConnect"));
    let res = send(&state, get_req("/health", None)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(body_string(res).await, "studioconnect ok");
    Ok(())
}

#[tokio::test]
async fn admin_page_rewrites_to_access_denied_without_admin_role() -> Result<()> {
    let dir = tempdir()?;
    let state = test_state(&dir, UNREACHABLE_BACKEND);
    let musician = forge(&json!({"role": "Musico"}));
    for path in ["/admin", "/admin/users"] {
        let res = send(&state, get_req(path, Some(&musician))).await;
        // rewrite: denied content under the requested address, no redirect
        assert_eq!(res.status(), StatusCode::OK, "{path}");
        assert!(res.headers().get(header::LOCATION).is_none(), "{path}");
        assert!(body_string(res).await.contains("Acceso denegado"), "{path}");
    }
    Ok(())
}

#[tokio::test]
async fn admin_page_rewrites_when_claims_do_not_decode() -> Result<()> {
    let dir = tempdir()?;
    let state = test_state(&dir, UNREACHABLE_BACKEND);
    // middle segment decodes to "notjson"; the gate must fail closed
    let res = send(&state, get_req("/admin", Some("eyJhbGciOiJIUzI1NiJ9.bm90anNvbg.sig"))).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_string(res).await.contains("Acceso denegado"));
    let res = send(&state, get_req("/admin", None)).await;
    assert!(body_string(res).await.contains("Acceso denegado"));
    Ok(())
}

#[tokio::test]
async fn admin_role_reaches_the_admin_panel() -> Result<()> {
    let dir = tempdir()?;
    let state = test_state(&dir, UNREACHABLE_BACKEND);
    let admin = forge(&json!({"role": "Administrador"}));
    let res = send(&state, get_req("/admin", Some(&admin))).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_string(res).await.contains("administraci"));
    Ok(())
}

#[tokio::test]
async fn callback_with_token_sets_cookie_and_goes_home() -> Result<()> {
    let dir = tempdir()?;
    let state = test_state(&dir, UNREACHABLE_BACKEND);

    let res = send(&state, get_req("/auth/callback?token=abc123", None)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers()[header::LOCATION], "/");
    let set_cookie = res.headers()[header::SET_COOKIE].to_str()?.to_string();
    assert!(set_cookie.starts_with("accessToken=abc123;"));
    assert!(set_cookie.contains("SameSite=Lax"));

    let res = send(&state, get_req("/auth/session", None)).await;
    let v: Value = serde_json::from_str(&body_string(res).await)?;
    assert_eq!(v["session"]["authenticated"], json!(true));
    assert_eq!(state.auth.credential(), Some("abc123".to_string()));
    Ok(())
}

#[tokio::test]
async fn callback_without_token_lands_on_login_error() -> Result<()> {
    let dir = tempdir()?;
    let state = test_state(&dir, UNREACHABLE_BACKEND);

    for uri in ["/auth/callback", "/auth/callback?other=1", "/auth/callback?token="] {
        let res = send(&state, get_req(uri, None)).await;
        assert_eq!(res.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(res.headers()[header::LOCATION], "/login-error", "{uri}");
        assert!(res.headers().get(header::SET_COOKIE).is_none(), "{uri}");
    }
    assert!(!state.auth.is_authenticated());

    // the login-error page itself is public and renders
    let res = send(&state, get_req("/login-error", None)).await;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn callback_token_with_cookie_delimiters_is_refused() -> Result<()> {
    let dir = tempdir()?;
    let state = test_state(&dir, UNREACHABLE_BACKEND);

    // percent-encoded "x; Max-Age=0": a token shaped to smuggle attributes
    // into the Set-Cookie header
    let res = send(&state, get_req("/auth/callback?token=x%3B%20Max-Age%3D0", None)).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers()[header::LOCATION], "/login-error");
    assert!(res.headers().get(header::SET_COOKIE).is_none());

    // nothing was stored in any location
    assert!(!state.auth.is_authenticated());
    assert_eq!(state.auth.credential(), None);
    assert!(!dir.path().join("credential.json").exists());
    Ok(())
}

#[tokio::test]
async fn logout_clears_the_session_and_cookie() -> Result<()> {
    let dir = tempdir()?;
    let state = test_state(&dir, UNREACHABLE_BACKEND);

    send(&state, get_req("/auth/callback?token=abc123", None)).await;
    assert!(state.auth.is_authenticated());

    let res = send(&state, post_req("/auth/logout")).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers()[header::LOCATION], "/");
    let set_cookie = res.headers()[header::SET_COOKIE].to_str()?;
    assert!(set_cookie.contains("Max-Age=0"));
    assert!(!state.auth.is_authenticated());

    // logging out again stays calm
    let res = send(&state, post_req("/auth/logout")).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    Ok(())
}

#[tokio::test]
async fn studio_catalogue_flows_through_from_the_backend() -> Result<()> {
    let backend = spawn_backend().await?;
    let dir = tempdir()?;
    let state = test_state(&dir, &backend);

    let res = send(&state, get_req("/studios", None)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_string(res).await.contains("Sala Norte"));

    let res = send(&state, get_req("/studios/1", None)).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert!(body_string(res).await.contains("Sala Norte"));
    Ok(())
}

#[tokio::test]
async fn stored_credential_travels_as_bearer_to_the_backend() -> Result<()> {
    let backend = spawn_backend().await?;
    let dir = tempdir()?;
    let state = test_state(&dir, &backend);
    let admin = forge(&json!({"role": "Administrador"}));

    send(&state, get_req(&format!("/auth/callback?token={admin}"), None)).await;
    let res = send(&state, get_req("/admin/users", Some(&admin))).await;
    assert_eq!(res.status(), StatusCode::OK);
    // the handler wraps the backend body, so the echo sits under "users"
    let v: Value = serde_json::from_str(&body_string(res).await)?;
    assert_eq!(v["status"], json!("ok"));
    assert_eq!(v["users"]["authorization"], json!(format!("Bearer {admin}")));
    Ok(())
}

#[tokio::test]
async fn post_calls_carry_body_and_bearer_to_the_backend() -> Result<()> {
    let backend = spawn_backend().await?;
    let client = BackendClient::new(&backend)?;

    let booking = json!({"studio_id": 1, "slot": "2026-03-01T18:00"});
    let v = client.post_json("/bookings", Some("tok-1"), &booking).await?;
    assert_eq!(v["echo"], booking);
    assert_eq!(v["authorization"], json!("Bearer tok-1"));

    let anonymous = client.post_json("/bookings", None, &booking).await?;
    assert_eq!(anonymous["authorization"], json!(""));
    Ok(())
}

#[tokio::test]
async fn backend_rejection_ends_the_session() -> Result<()> {
    let backend = spawn_backend().await?;
    let dir = tempdir()?;
    let state = test_state(&dir, &backend);

    send(&state, get_req("/auth/callback?token=abc123", None)).await;
    assert!(state.auth.is_authenticated());

    // the stub answers /bookings/mine with 401
    let res = send(&state, get_req("/bookings", Some("abc123"))).await;
    assert_eq!(res.status(), StatusCode::SEE_OTHER);
    assert_eq!(res.headers()[header::LOCATION], "/");
    assert!(res.headers()[header::SET_COOKIE].to_str()?.contains("Max-Age=0"));

    assert!(!state.auth.is_authenticated());
    assert_eq!(state.auth.credential(), None);
    Ok(())
}

#[tokio::test]
async fn backend_failures_surface_as_upstream_errors() -> Result<()> {
    // backend that answers the catalogue with a 503
    let stub = Router::new().route("/studios", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, stub).await;
    });

    let dir = tempdir()?;
    let state = test_state(&dir, &format!("http://{addr}"));
    let res = send(&state, get_req("/studios", None)).await;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let v: Value = serde_json::from_str(&body_string(res).await)?;
    assert_eq!(v["status"], json!("error"));
    assert_eq!(v["code"], json!("backend_error"));
    Ok(())
}
