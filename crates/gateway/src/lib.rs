//! Wiring crate: the `nxclaw` binary's `AppState`, HTTP router, CLI
//! surface, and the collaborators (process-shelling session adapter,
//! file-backed auth provider, dashboard-token middleware) that only
//! this binary needs.

pub mod api;
pub mod auth_provider;
pub mod bootstrap;
pub mod cli;
pub mod http_auth;
pub mod session_adapter;
pub mod state;
