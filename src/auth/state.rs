//! Client auth state: a handle-passed container owning login, logout and the
//! authenticated flag. Consumers receive an [`AuthState`] handle instead of
//! reaching for globals, and can watch snapshots for changes.
//!
//! Every login flow resolves to a navigation outcome; nothing in here panics
//! or throws past the store boundary on bad input.

use axum::http::HeaderValue;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::Path;
use tokio::sync::watch;
use tracing::error;
use uuid::Uuid;

use super::credential;
use super::vault::CredentialVault;
use crate::tprintln;

/// Query parameter the external identity flow appends to the callback URL.
pub const TOKEN_PARAM: &str = "token";

/// Point-in-time view of the session, cheap to clone and safe to expose.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub authenticated: bool,
    pub session_id: Option<Uuid>,
    pub role: Option<String>,
    pub logged_in_at: Option<DateTime<Utc>>,
}

impl SessionSnapshot {
    fn unauthenticated() -> Self {
        SessionSnapshot { authenticated: false, session_id: None, role: None, logged_in_at: None }
    }

    /// Snapshot for a stored credential. The role is decoded opportunistically
    /// and stays `None` when the credential does not decode; presence alone
    /// makes the session authenticated.
    fn for_credential(token: &str, logged_in_at: Option<DateTime<Utc>>) -> Self {
        let role = credential::decode_claims(token)
            .ok()
            .and_then(|claims| claims.role().map(|r| r.to_string()));
        SessionSnapshot {
            authenticated: true,
            session_id: Some(Uuid::new_v4()),
            role,
            logged_in_at,
        }
    }
}

/// Where the caller should send the browser next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigate {
    Home,
    LoginError,
}

impl Navigate {
    pub fn path(self) -> &'static str {
        match self {
            Navigate::Home => "/",
            Navigate::LoginError => "/login-error",
        }
    }
}

/// Result of completing an external login: a navigation outcome plus the
/// Set-Cookie mirror when a credential was stored.
#[derive(Debug)]
pub struct LoginCompletion {
    pub navigate: Navigate,
    pub set_cookie: Option<HeaderValue>,
}

/// The auth state container. Owns the credential vault and publishes
/// [`SessionSnapshot`]s over a watch channel.
pub struct AuthState {
    vault: CredentialVault,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl AuthState {
    /// Open the container, deriving the starting state from whether a
    /// credential survived in the vault. Its validity is not checked here.
    pub fn open(state_dir: &Path, secure_cookies: bool) -> anyhow::Result<Self> {
        let vault = CredentialVault::open(state_dir, secure_cookies)?;
        let initial = match vault.current() {
            Some(token) => SessionSnapshot::for_credential(&token, None),
            None => SessionSnapshot::unauthenticated(),
        };
        let (snapshot, _) = watch::channel(initial);
        Ok(AuthState { vault, snapshot })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch for session changes. Selectors are plain closures over the
    /// received snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot.borrow().authenticated
    }

    /// Stored credential for outgoing backend calls.
    pub fn credential(&self) -> Option<String> {
        self.vault.current()
    }

    /// Complete a login that the external identity flow bounced back to us,
    /// `query` being the raw callback query string. With a token present the
    /// credential is stored everywhere and the caller navigates home; without
    /// one (or when storing fails) the caller navigates to the login-error
    /// page. All branches resolve to a navigation.
    pub fn complete_external_login(&self, query: Option<&str>) -> LoginCompletion {
        let Some(token) = extract_token_param(query) else {
            tprintln!("auth.login: callback without token param");
            return LoginCompletion { navigate: Navigate::LoginError, set_cookie: None };
        };
        match self.vault.persist(&token) {
            Ok(set_cookie) => {
                let snap = SessionSnapshot::for_credential(&token, Some(Utc::now()));
                tprintln!("auth.login sid={:?} role={:?}", snap.session_id, snap.role);
                self.snapshot.send_replace(snap);
                LoginCompletion { navigate: Navigate::Home, set_cookie: Some(set_cookie) }
            }
            Err(err) => {
                error!("storing credential after external login failed: {err:#}");
                LoginCompletion { navigate: Navigate::LoginError, set_cookie: None }
            }
        }
    }

    /// End the session: empty the vault everywhere and flip to
    /// unauthenticated. Safe to call when already signed out.
    pub fn logout(&self) -> anyhow::Result<HeaderValue> {
        let clear_cookie = self.vault.clear()?;
        self.snapshot.send_replace(SessionSnapshot::unauthenticated());
        tprintln!("auth.logout");
        Ok(clear_cookie)
    }

    /// React to the backend rejecting the credential: the session is
    /// observably over immediately, then the stored mirrors are dropped.
    /// Returns the cookie-clearing value when the mirrors could be emptied.
    pub fn invalidate(&self) -> Option<HeaderValue> {
        self.snapshot.send_replace(SessionSnapshot::unauthenticated());
        match self.vault.clear() {
            Ok(clear_cookie) => Some(clear_cookie),
            Err(err) => {
                error!("dropping rejected credential failed: {err:#}");
                None
            }
        }
    }
}

/// Pull the token out of a raw query string. Empty values read as absent.
fn extract_token_param(query: Option<&str>) -> Option<String> {
    for pair in query?.split('&') {
        let Some((key, value)) = pair.split_once('=') else { continue };
        if key == TOKEN_PARAM && !value.is_empty() {
            return urlencoding::decode(value)
                .ok()
                .map(|decoded| decoded.into_owned())
                .filter(|token| !token.is_empty());
        }
    }
    None
}
