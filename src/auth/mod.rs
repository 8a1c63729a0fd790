//! Route protection and client auth state for StudioConnect.
//! Keep the public surface thin and split implementation across sub-modules.

pub mod cookie;
pub mod credential;
pub mod gate;
pub mod routes;
pub mod state;
pub mod vault;

pub use credential::{decode_claims, Claims, DecodeError};
pub use gate::{AccessGate, AdminGate, EdgeGate, GateDecision, ADMIN_ROLE};
pub use routes::{RouteTable, Tier};
pub use state::{AuthState, LoginCompletion, Navigate, SessionSnapshot};
pub use vault::CredentialVault;
