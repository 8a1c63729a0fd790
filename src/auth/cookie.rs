//! Access-token cookie contract shared by the gate and the auth handlers.

use anyhow::Context;
use axum::http::{header, HeaderMap, HeaderValue};

/// Cookie carrying the Session Credential on every navigation.
pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";

/// Cookie lifetime: seven days, matching the credential's own expiry horizon.
pub const ACCESS_TOKEN_MAX_AGE_SECS: i64 = 7 * 24 * 60 * 60;

/// Extract a cookie value by name from request headers.
pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie_hdr = headers.get(header::COOKIE)?.to_str().ok()?;
    for part in cookie_hdr.split(';') {
        let p = part.trim();
        if let Some(eq) = p.find('=') {
            let (k, v) = p.split_at(eq);
            if k == name {
                return Some(v[1..].to_string());
            }
        }
    }
    None
}

/// The Session Credential presented with this request, if any.
pub fn access_token_from(headers: &HeaderMap) -> Option<String> {
    parse_cookie(headers, ACCESS_TOKEN_COOKIE)
}

/// Set-Cookie value persisting `token` for a week across the whole site.
/// SameSite=Lax keeps the cookie on top-level navigations while blocking
/// cross-site subrequests; Secure is dropped only for plain-HTTP dev setups.
/// Tokens containing cookie delimiters (`;`, `,`, whitespace) are refused:
/// they cannot round-trip as a single cookie value.
pub fn set_access_cookie(token: &str, secure: bool) -> anyhow::Result<HeaderValue> {
    if token.chars().any(|c| c == ';' || c == ',' || c.is_whitespace()) {
        anyhow::bail!("credential contains cookie delimiter characters");
    }
    let mut value = format!(
        "{ACCESS_TOKEN_COOKIE}={token}; Path=/; Max-Age={ACCESS_TOKEN_MAX_AGE_SECS}; SameSite=Lax"
    );
    if secure {
        value.push_str("; Secure");
    }
    HeaderValue::from_str(&value).context("credential contains characters not allowed in a cookie")
}

/// Set-Cookie value that deletes the access-token cookie.
pub fn clear_access_cookie(secure: bool) -> HeaderValue {
    if secure {
        HeaderValue::from_static("accessToken=; Path=/; Max-Age=0; SameSite=Lax; Secure")
    } else {
        HeaderValue::from_static("accessToken=; Path=/; Max-Age=0; SameSite=Lax")
    }
}
