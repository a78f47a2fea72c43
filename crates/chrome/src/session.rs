use chrono::{DateTime, Utc};
use chromiumoxide::Page;
use serde::Serialize;
use uuid::Uuid;

/// One open tab, tracked so the controller can evict least-recently-used
/// sessions and knows whether it's responsible for closing the underlying
/// context (cdp-mode reuse leaves foreign contexts alone).
pub struct BrowserSession {
    pub id: Uuid,
    pub page: Page,
    pub owns_context: bool,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
    pub current_url: String,
}

impl BrowserSession {
    pub fn touch(&mut self) {
        self.last_used = Utc::now();
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            id: self.id,
            url: self.current_url.clone(),
            created_at: self.created_at,
            last_used: self.last_used,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub last_used: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum ChromeError {
    #[error("session {0} not found")]
    SessionNotFound(Uuid),
    #[error("Ref {0} not found. Run snapshot again.")]
    RefNotFound(u32),
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("failed to connect over cdp: {0}")]
    CdpConnect(String),
    #[error("navigation failed: {0}")]
    Navigate(String),
    #[error("evaluate failed: {0}")]
    Evaluate(String),
    #[error("element interaction failed: {0}")]
    Interact(String),
    #[error("screenshot failed: {0}")]
    Screenshot(String),
}
