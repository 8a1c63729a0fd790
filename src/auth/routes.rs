//! Static classification of request paths into protection tiers.

use once_cell::sync::Lazy;

/// Protection tier of a path. Anything not listed in the table is public.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Public,
    Authenticated,
    AdminOnly,
}

/// Prefix table consulted on every navigation. Fixed at startup; per-request
/// work is a handful of prefix comparisons.
#[derive(Debug, Clone)]
pub struct RouteTable {
    authenticated: Vec<String>,
    admin: Vec<String>,
}

static DEPLOYED: Lazy<RouteTable> = Lazy::new(|| {
    RouteTable::new(&["/myStudio", "/owner", "/profile", "/bookings"], &["/admin"])
});

impl RouteTable {
    pub fn new(authenticated: &[&str], admin: &[&str]) -> Self {
        RouteTable {
            authenticated: authenticated.iter().map(|p| p.to_string()).collect(),
            admin: admin.iter().map(|p| p.to_string()).collect(),
        }
    }

    /// Table shipped with the StudioConnect site.
    pub fn deployed() -> &'static RouteTable {
        &DEPLOYED
    }

    /// Classify `path`. Admin prefixes win over authenticated ones so an
    /// overlapping entry can only tighten access, never loosen it.
    pub fn classify(&self, path: &str) -> Tier {
        if self.admin.iter().any(|p| prefix_matches(path, p)) {
            return Tier::AdminOnly;
        }
        if self.authenticated.iter().any(|p| prefix_matches(path, p)) {
            return Tier::Authenticated;
        }
        Tier::Public
    }
}

// "/owner" matches "/owner" and "/owner/studios/3" but not "/ownership".
fn prefix_matches(path: &str, prefix: &str) -> bool {
    path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}
