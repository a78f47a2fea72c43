use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Dashboard / HTTP bind
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "d_host")]
    pub host: String,
    #[serde(default = "d_port")]
    pub port: u16,
    /// Shared dashboard token. `None` means non-loopback requests are
    /// rejected outright (no anonymous remote access).
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "d_sse_heartbeat_ms")]
    pub sse_heartbeat_ms: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            host: d_host(),
            port: d_port(),
            token: None,
            sse_heartbeat_ms: d_sse_heartbeat_ms(),
        }
    }
}

fn d_host() -> String {
    "127.0.0.1".into()
}
fn d_port() -> u16 {
    4610
}
fn d_sse_heartbeat_ms() -> u64 {
    15_000
}
