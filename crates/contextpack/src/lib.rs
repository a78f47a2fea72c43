//! Deterministic prompt context-pack assembly.
//!
//! [`builder::ContextPackBuilder`] is a pure function: given pre-read
//! workspace files and size caps, it produces the assembled "core markdown
//! context" plus a machine-readable [`report::ContextReport`]. Compression
//! of that core text above a size threshold — and the SHA-1-keyed cache
//! that avoids repeating it — lives one layer up, in [`cache::SummaryCache`],
//! since compressing requires calling out to the agent session while the
//! builder itself must not.

pub mod builder;
pub mod cache;
pub mod injection;
pub mod report;
pub mod truncation;

pub use builder::{ContextPackBuilder, SessionMode, WorkspaceFile};
pub use cache::SummaryCache;
pub use report::{ContextReport, FileReport};
