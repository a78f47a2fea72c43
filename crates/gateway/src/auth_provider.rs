//! Whether the agent has completed provider authentication, per the
//! orchestrator's [`AuthSnapshotProvider`] boundary. Backed by the
//! presence of a non-empty `<home>/agent/auth.json`, written by the
//! `auth` CLI command.

use std::path::PathBuf;

use async_trait::async_trait;
use nxa_runtime::AuthSnapshotProvider;

pub struct FileAuthProvider {
    auth_json: PathBuf,
}

impl FileAuthProvider {
    pub fn new(auth_json: PathBuf) -> Self {
        Self { auth_json }
    }
}

#[async_trait]
impl AuthSnapshotProvider for FileAuthProvider {
    async fn is_authenticated(&self) -> bool {
        match tokio::fs::metadata(&self.auth_json).await {
            Ok(meta) => meta.len() > 0,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_file_is_not_authenticated() {
        let provider = FileAuthProvider::new(PathBuf::from("/nonexistent/nxclaw/agent/auth.json"));
        assert!(!provider.is_authenticated().await);
    }

    #[tokio::test]
    async fn empty_file_is_not_authenticated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(&path, b"").unwrap();
        let provider = FileAuthProvider::new(path);
        assert!(!provider.is_authenticated().await);
    }

    #[tokio::test]
    async fn populated_file_is_authenticated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(&path, b"{\"provider\":\"anthropic\"}").unwrap();
        let provider = FileAuthProvider::new(path);
        assert!(provider.is_authenticated().await);
    }
}
