//! Durable home of the Session Credential.
//!
//! The on-disk file is the single source of truth. The in-memory copy and the
//! browser cookie are mirrors: an update writes the file first and only then
//! commits the memory copy and hands back the Set-Cookie value, so a failed
//! write leaves every location unchanged.

use anyhow::Context;
use axum::http::HeaderValue;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::warn;

use super::cookie;

const CREDENTIAL_FILE: &str = "credential.json";

#[derive(Debug, Serialize, Deserialize)]
struct StoredCredential {
    #[serde(rename = "accessToken")]
    access_token: String,
}

pub struct CredentialVault {
    path: PathBuf,
    secure_cookies: bool,
    current: RwLock<Option<String>>,
}

impl CredentialVault {
    /// Open a vault under `state_dir`, loading any credential a previous run
    /// persisted. A file that no longer parses is treated as absent.
    pub fn open(state_dir: &Path, secure_cookies: bool) -> anyhow::Result<Self> {
        fs::create_dir_all(state_dir)
            .with_context(|| format!("create state dir {}", state_dir.display()))?;
        let path = state_dir.join(CREDENTIAL_FILE);
        let current = match fs::read(&path) {
            Ok(bytes) => match serde_json::from_slice::<StoredCredential>(&bytes) {
                Ok(stored) => Some(stored.access_token),
                Err(err) => {
                    warn!("ignoring unreadable credential file {}: {}", path.display(), err);
                    None
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => None,
            Err(err) => {
                return Err(err).with_context(|| format!("read credential file {}", path.display()))
            }
        };
        Ok(CredentialVault { path, secure_cookies, current: RwLock::new(current) })
    }

    /// Currently stored credential, if any.
    pub fn current(&self) -> Option<String> {
        self.current.read().clone()
    }

    /// Presence check. Nothing about the credential is validated.
    pub fn is_present(&self) -> bool {
        self.current.read().is_some()
    }

    /// Store `token` in all locations. Returns the Set-Cookie value for the
    /// browser mirror. On any error nothing has changed.
    pub fn persist(&self, token: &str) -> anyhow::Result<HeaderValue> {
        let set_cookie = cookie::set_access_cookie(token, self.secure_cookies)?;
        let body = serde_json::to_vec_pretty(&StoredCredential { access_token: token.to_string() })
            .context("encode credential file")?;
        let mut guard = self.current.write();
        fs::write(&self.path, body)
            .with_context(|| format!("write credential file {}", self.path.display()))?;
        *guard = Some(token.to_string());
        Ok(set_cookie)
    }

    /// Remove the credential from all locations. Returns the Set-Cookie value
    /// that deletes the browser mirror. Clearing an empty vault is a no-op
    /// that still succeeds.
    pub fn clear(&self) -> anyhow::Result<HeaderValue> {
        let clear_cookie = cookie::clear_access_cookie(self.secure_cookies);
        let mut guard = self.current.write();
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("remove credential file {}", self.path.display()))
            }
        }
        *guard = None;
        Ok(clear_cookie)
    }
}
