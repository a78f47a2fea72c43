//! Authentication snapshot seam.
//!
//! Credential capture itself is an external collaborator — this crate
//! only needs to know, at the top of every `handle_incoming` call,
//! whether some LLM provider is currently authenticated. Callers that own
//! the actual credential store implement [`AuthSnapshotProvider`]; wiring
//! with no credential gate of its own can use [`AlwaysAuthenticated`].

use async_trait::async_trait;

#[async_trait]
pub trait AuthSnapshotProvider: Send + Sync {
    async fn is_authenticated(&self) -> bool;
}

pub struct AlwaysAuthenticated;

#[async_trait]
impl AuthSnapshotProvider for AlwaysAuthenticated {
    async fn is_authenticated(&self) -> bool {
        true
    }
}

/// Canonical reply returned when the authentication snapshot is negative.
pub const AUTH_REQUIRED_MESSAGE: &str =
    "Authentication required: no LLM provider is currently authenticated.";

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_authenticated_reports_true() {
        assert!(AlwaysAuthenticated.is_authenticated().await);
    }
}
