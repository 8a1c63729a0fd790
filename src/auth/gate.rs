//! Edge Request Gate: pure decision logic run before routing.
//!
//! The gate never performs IO and never logs. Given a path and the credential
//! presented with the request, it answers with one of three outcomes that the
//! HTTP layer then executes:
//!
//! * pass-through: serve the requested content
//! * redirect: send the browser elsewhere (address bar changes)
//! * rewrite: serve other content under the requested address
//!
//! Authenticated-tier paths only check that a credential is present. Admin-only
//! paths decode the claims and demand the administrator role; there the gate
//! fails closed, and a malformed credential is indistinguishable from a wrong
//! role.

use super::credential::{self, Claims};
use super::routes::{RouteTable, Tier};

/// Role claim value that grants access to admin-only paths.
pub const ADMIN_ROLE: &str = "Administrador";

/// Rewrite target for denied admin-only navigations.
pub const ACCESS_DENIED_PATH: &str = "/acceso-denegado";

/// Redirect target for unauthenticated navigations to protected paths.
pub const SITE_ROOT: &str = "/";

/// Outcome of a gate decision, in terms the HTTP layer executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    PassThrough,
    /// Send the browser to this path; the address bar changes.
    Redirect(String),
    /// Serve this path's content under the originally requested address.
    Rewrite(String),
}

/// Single opaque denial for admin authorization. Decode failures and wrong
/// roles both surface as this value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("not authorized for administrator content")]
pub struct NotAuthorized;

/// Presence check guarding authenticated-tier paths. The credential is not
/// decoded or validated here; any non-empty value passes.
#[derive(Debug, Clone)]
pub struct AccessGate {
    redirect_to: String,
}

impl AccessGate {
    pub fn new() -> Self {
        AccessGate { redirect_to: SITE_ROOT.to_string() }
    }

    pub fn with_redirect(mut self, to: &str) -> Self {
        self.redirect_to = to.to_string();
        self
    }

    pub fn decide(&self, credential: Option<&str>) -> GateDecision {
        match credential {
            Some(c) if !c.is_empty() => GateDecision::PassThrough,
            _ => GateDecision::Redirect(self.redirect_to.clone()),
        }
    }
}

impl Default for AccessGate {
    fn default() -> Self {
        AccessGate::new()
    }
}

/// Role check guarding admin-only paths. By default the claims are decoded
/// without verifying the signature; [`AdminGate::with_verification_key`] turns
/// signature checking on for deployments that share the signing secret with
/// the edge.
#[derive(Debug, Clone)]
pub struct AdminGate {
    denied_path: String,
    role: String,
    verification_key: Option<Vec<u8>>,
}

impl AdminGate {
    pub fn new() -> Self {
        AdminGate {
            denied_path: ACCESS_DENIED_PATH.to_string(),
            role: ADMIN_ROLE.to_string(),
            verification_key: None,
        }
    }

    pub fn with_denied_path(mut self, path: &str) -> Self {
        self.denied_path = path.to_string();
        self
    }

    pub fn with_role(mut self, role: &str) -> Self {
        self.role = role.to_string();
        self
    }

    pub fn with_verification_key(mut self, key: &[u8]) -> Self {
        self.verification_key = Some(key.to_vec());
        self
    }

    /// Decode and authorize `credential` for admin content. Fail-closed: only
    /// a decodable credential whose role claim equals the admin role passes.
    pub fn authorize(&self, credential: &str) -> Result<Claims, NotAuthorized> {
        if let Some(key) = &self.verification_key {
            if !credential::verify_signature(credential, key) {
                return Err(NotAuthorized);
            }
        }
        let claims = credential::decode_claims(credential).map_err(|_| NotAuthorized)?;
        match claims.role() {
            Some(role) if role == self.role => Ok(claims),
            _ => Err(NotAuthorized),
        }
    }

    pub fn decide(&self, credential: Option<&str>) -> GateDecision {
        match credential {
            Some(c) if self.authorize(c).is_ok() => GateDecision::PassThrough,
            _ => GateDecision::Rewrite(self.denied_path.clone()),
        }
    }
}

impl Default for AdminGate {
    fn default() -> Self {
        AdminGate::new()
    }
}

/// The whole per-navigation gate: classify the path, then apply the tier's
/// check. Public paths are never touched.
#[derive(Debug, Clone)]
pub struct EdgeGate {
    table: RouteTable,
    access: AccessGate,
    admin: AdminGate,
}

impl EdgeGate {
    pub fn new(table: RouteTable, access: AccessGate, admin: AdminGate) -> Self {
        EdgeGate { table, access, admin }
    }

    /// Gate configured as deployed on the StudioConnect site.
    pub fn deployed() -> Self {
        EdgeGate::new(RouteTable::deployed().clone(), AccessGate::new(), AdminGate::new())
    }

    pub fn decide(&self, path: &str, credential: Option<&str>) -> GateDecision {
        match self.table.classify(path) {
            Tier::Public => GateDecision::PassThrough,
            Tier::Authenticated => self.access.decide(credential),
            Tier::AdminOnly => self.admin.decide(credential),
        }
    }
}

impl Default for EdgeGate {
    fn default() -> Self {
        EdgeGate::deployed()
    }
}
