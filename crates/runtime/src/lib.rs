//! The runtime orchestrator crate: wires the lane queue, session registry,
//! memory store, objective queue, task manager, and skills registry into
//! a single `handle_incoming` entry point, plus the auxiliary operations a
//! channel adapter or dashboard process needs around it.

pub mod auth;
pub mod channel_health;
pub mod dashboard;
pub mod incoming;
pub mod orchestrator;
pub mod prompt;

pub use auth::{AlwaysAuthenticated, AuthSnapshotProvider, AUTH_REQUIRED_MESSAGE};
pub use channel_health::ChannelHealthRegistry;
pub use incoming::{IncomingMessage, SafeIncoming};
pub use orchestrator::{LaneSessionInfoDto, Runtime, RuntimeDeps, RuntimeState};
