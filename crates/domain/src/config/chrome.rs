use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Chrome controller
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChromeMode {
    Cdp,
    Launch,
}

impl Default for ChromeMode {
    fn default() -> Self {
        Self::Launch
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChromeConfig {
    #[serde(default)]
    pub mode: ChromeMode,
    #[serde(default)]
    pub cdp_url: Option<String>,
    #[serde(default = "d_cdp_connect_timeout_ms")]
    pub cdp_connect_timeout_ms: u64,
    #[serde(default = "d_true")]
    pub cdp_reuse_existing_page: bool,
    #[serde(default = "d_true")]
    pub cdp_fallback_to_launch: bool,
    #[serde(default = "d_true")]
    pub headless: bool,
    #[serde(default)]
    pub executable_path: Option<String>,
    #[serde(default = "d_max_sessions")]
    pub max_sessions: usize,
    #[serde(default = "d_screenshot_dir")]
    pub screenshot_dir: String,
}

impl Default for ChromeConfig {
    fn default() -> Self {
        Self {
            mode: ChromeMode::default(),
            cdp_url: None,
            cdp_connect_timeout_ms: d_cdp_connect_timeout_ms(),
            cdp_reuse_existing_page: true,
            cdp_fallback_to_launch: true,
            headless: true,
            executable_path: None,
            max_sessions: d_max_sessions(),
            screenshot_dir: d_screenshot_dir(),
        }
    }
}

fn d_true() -> bool {
    true
}
fn d_cdp_connect_timeout_ms() -> u64 {
    5_000
}
fn d_max_sessions() -> usize {
    4
}
fn d_screenshot_dir() -> String {
    "chrome/shots".into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_mode_is_launch() {
        assert_eq!(ChromeConfig::default().mode, ChromeMode::Launch);
    }
}
