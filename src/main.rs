use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use studioconnect::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    let http_port: u16 = std::env::var("STUDIOCONNECT_HTTP_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(server::DEFAULT_HTTP_PORT);
    let backend_url = std::env::var("STUDIOCONNECT_BACKEND_URL")
        .unwrap_or_else(|_| server::DEFAULT_BACKEND_URL.to_string());
    let state_dir = std::env::var("STUDIOCONNECT_STATE_DIR")
        .unwrap_or_else(|_| server::DEFAULT_STATE_DIR.to_string());
    // Secure cookies stay on unless explicitly switched off for plain-HTTP dev
    let secure_cookies =
        !matches!(std::env::var("STUDIOCONNECT_COOKIE_SECURE").as_deref(), Ok("false") | Ok("0"));
    info!(
        target: "studioconnect",
        "StudioConnect edge starting: RUST_LOG='{}', http_port={}, backend='{}', state_dir='{}', secure_cookies={}",
        rust_log, http_port, backend_url, state_dir, secure_cookies
    );

    server::run_with(http_port, &backend_url, &state_dir, secure_cookies).await
}
