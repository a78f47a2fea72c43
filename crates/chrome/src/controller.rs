//! `ChromeController` — owns at most one browser process, lazily attached or
//! launched on first session open, and a registry of open tabs addressed by
//! session id.

use std::collections::HashMap;
use std::time::Duration;

use base64::Engine;
use chrono::Utc;
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotParams;
use chromiumoxide::cdp::browser_protocol::page::EnableParams as PageEnableParams;
use chromiumoxide::cdp::js_protocol::runtime::EnableParams as RuntimeEnableParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures_util::StreamExt;
use nxa_domain::config::{ChromeConfig, ChromeMode};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::session::{BrowserSession, ChromeError, SessionInfo};
use crate::snapshot::{build_snapshot_script, ref_selector, SnapshotResult};

const BLANK_URLS: &[&str] = ["about:blank", "chrome://newtab/", ""].as_slice();
const NAVIGATE_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ChromeController {
    config: ChromeConfig,
    browser: tokio::sync::Mutex<Option<Browser>>,
    sessions: RwLock<HashMap<Uuid, BrowserSession>>,
}

pub struct SnapshotOptions {
    pub include_invisible: bool,
    pub max_elements: usize,
}

impl ChromeController {
    pub fn new(config: ChromeConfig) -> Self {
        Self {
            config,
            browser: tokio::sync::Mutex::new(None),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Lazily attach (cdp mode) or launch (launch mode) the single browser
    /// process this controller owns, returning a clone of the handle.
    async fn ensure_browser(&self) -> Result<Browser, ChromeError> {
        let mut guard = self.browser.lock().await;
        if let Some(browser) = guard.as_ref() {
            return Ok(browser.clone());
        }

        let browser = match self.config.mode {
            ChromeMode::Cdp => match self.connect_cdp().await {
                Ok(b) => b,
                Err(err) if self.config.cdp_fallback_to_launch && self.config.executable_path.is_some() => {
                    tracing::warn!(error = %err, "cdp connect failed, falling back to launch mode");
                    self.launch_browser().await?
                }
                Err(err) => return Err(err),
            },
            ChromeMode::Launch => self.launch_browser().await?,
        };

        *guard = Some(browser.clone());
        Ok(browser)
    }

    async fn connect_cdp(&self) -> Result<Browser, ChromeError> {
        let url = self
            .config
            .cdp_url
            .clone()
            .ok_or_else(|| ChromeError::CdpConnect("no cdpUrl configured".into()))?;

        let connect = Browser::connect(&url);
        let (browser, mut handler) =
            tokio::time::timeout(Duration::from_millis(self.config.cdp_connect_timeout_ms), connect)
                .await
                .map_err(|_| ChromeError::CdpConnect("timed out".into()))?
                .map_err(|e| ChromeError::CdpConnect(e.to_string()))?;

        tokio::spawn(async move { while handler.next().await.is_some() {} });
        Ok(browser)
    }

    async fn launch_browser(&self) -> Result<Browser, ChromeError> {
        let mut builder = BrowserConfig::builder().args(["--no-sandbox", "--disable-gpu", "--disable-dev-shm-usage"]);
        if !self.config.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.config.executable_path {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder.build().map_err(ChromeError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| ChromeError::Launch(e.to_string()))?;
        tokio::spawn(async move { while handler.next().await.is_some() {} });
        Ok(browser)
    }

    fn is_blank(url: &str) -> bool {
        BLANK_URLS.contains(&url)
    }

    /// Evict the least-recently-used session to stay under `maxSessions`.
    async fn evict_if_at_capacity(&self) {
        let victim = {
            let sessions = self.sessions.read();
            if sessions.len() < self.config.max_sessions {
                None
            } else {
                sessions.values().min_by_key(|s| s.last_used).map(|s| s.id)
            }
        };
        if let Some(id) = victim {
            let _ = self.close_session(id).await;
        }
    }

    /// Picks or creates a page per the cdp-reuse / launch-mode policy, then
    /// enables CDP domains and optionally navigates.
    pub async fn open_session(&self, target_url: Option<&str>) -> Result<SessionInfo, ChromeError> {
        self.evict_if_at_capacity().await;
        let browser = self.ensure_browser().await?;

        let (page, owns_context) = match self.config.mode {
            ChromeMode::Cdp if self.config.cdp_reuse_existing_page => {
                self.pick_or_create_reused_page(&browser).await?
            }
            _ => {
                let page = browser
                    .new_page("about:blank")
                    .await
                    .map_err(|e| ChromeError::Navigate(e.to_string()))?;
                (page, true)
            }
        };

        let _ = page.execute(PageEnableParams::default()).await;
        let _ = page.execute(RuntimeEnableParams::default()).await;

        let mut current_url = page.url().await.ok().flatten().unwrap_or_else(|| "about:blank".to_string());
        if let Some(url) = target_url {
            if url != "about:blank" {
                let goto = page.goto(url);
                tokio::time::timeout(NAVIGATE_TIMEOUT, goto)
                    .await
                    .map_err(|_| ChromeError::Navigate("navigation timed out".into()))?
                    .map_err(|e| ChromeError::Navigate(e.to_string()))?;
                current_url = url.to_string();
            }
        }

        let now = Utc::now();
        let session = BrowserSession {
            id: Uuid::new_v4(),
            page,
            owns_context,
            created_at: now,
            last_used: now,
            current_url,
        };
        let info = session.info();
        self.sessions.write().insert(session.id, session);
        Ok(info)
    }

    async fn pick_or_create_reused_page(&self, browser: &Browser) -> Result<(Page, bool), ChromeError> {
        let claimed_ids: std::collections::HashSet<String> = {
            let sessions = self.sessions.read();
            let mut ids = std::collections::HashSet::new();
            for s in sessions.values() {
                if let Ok(target) = s.page.target_id().await {
                    ids.insert(target.to_string());
                }
            }
            ids
        };

        let pages = browser.pages().await.map_err(|e| ChromeError::Navigate(e.to_string()))?;
        let mut unclaimed = Vec::new();
        for page in pages {
            let Ok(target_id) = page.target_id().await else { continue };
            if claimed_ids.contains(&target_id.to_string()) {
                continue;
            }
            unclaimed.push(page);
        }

        let mut with_real_url = None;
        let mut any_unclaimed = None;
        for page in unclaimed {
            let url = page.url().await.ok().flatten().unwrap_or_default();
            if !Self::is_blank(&url) && with_real_url.is_none() {
                with_real_url = Some(page);
                continue;
            }
            if any_unclaimed.is_none() {
                any_unclaimed = Some(page);
            }
        }

        if let Some(page) = with_real_url.or(any_unclaimed) {
            return Ok((page, false));
        }

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ChromeError::Navigate(e.to_string()))?;
        Ok((page, false))
    }

    pub async fn close_session(&self, id: Uuid) -> Result<(), ChromeError> {
        let session = self.sessions.write().remove(&id).ok_or(ChromeError::SessionNotFound(id))?;
        // `owns_context` is tracked for future multi-context isolation; today
        // every session closes just its own page, leaving others untouched.
        let _ = session.owns_context;
        let _ = session.page.close().await;
        Ok(())
    }

    pub fn list_sessions(&self) -> Vec<SessionInfo> {
        self.sessions.read().values().map(|s| s.info()).collect()
    }

    pub async fn snapshot(&self, id: Uuid, opts: SnapshotOptions) -> Result<SnapshotResult, ChromeError> {
        let page = self.with_touched_page(id)?;
        let script = build_snapshot_script(opts.include_invisible, opts.max_elements);
        let result = page
            .evaluate(script)
            .await
            .map_err(|e| ChromeError::Evaluate(e.to_string()))?;
        result.into_value::<SnapshotResult>().map_err(|e| ChromeError::Evaluate(e.to_string()))
    }

    pub async fn click_by_ref(&self, id: Uuid, element_ref: u32) -> Result<(), ChromeError> {
        let page = self.with_touched_page(id)?;
        let selector = ref_selector(element_ref);
        let element = page
            .find_element(&selector)
            .await
            .map_err(|_| ChromeError::RefNotFound(element_ref))?;
        element.click().await.map_err(|e| ChromeError::Interact(e.to_string()))?;
        Ok(())
    }

    pub async fn type_by_ref(
        &self,
        id: Uuid,
        element_ref: u32,
        text: &str,
        clear: bool,
        press_enter: bool,
    ) -> Result<(), ChromeError> {
        let page = self.with_touched_page(id)?;
        let selector = ref_selector(element_ref);
        let element = page
            .find_element(&selector)
            .await
            .map_err(|_| ChromeError::RefNotFound(element_ref))?;

        let fill_script = format!(
            r#"(() => {{
                const el = document.querySelector('{selector}');
                if (!el) return false;
                if ({clear}) el.value = '';
                el.value = (el.value || '') + {text:?};
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return true;
            }})()"#,
        );
        let filled = page
            .evaluate(fill_script)
            .await
            .ok()
            .and_then(|r| r.into_value::<bool>().ok())
            .unwrap_or(false);

        if !filled {
            element.focus().await.map_err(|e| ChromeError::Interact(e.to_string()))?;
            element.type_str(text).await.map_err(|e| ChromeError::Interact(e.to_string()))?;
        }

        if press_enter {
            element.press_key("Enter").await.map_err(|e| ChromeError::Interact(e.to_string()))?;
        }
        Ok(())
    }

    pub async fn screenshot(&self, id: Uuid) -> Result<Vec<u8>, ChromeError> {
        let page = self.with_touched_page(id)?;
        match page.screenshot(chromiumoxide::page::ScreenshotParams::builder().build()).await {
            Ok(bytes) => Ok(bytes),
            Err(err) => {
                tracing::warn!(error = %err, "framework screenshot failed, falling back to cdp capture");
                let response = page
                    .execute(CaptureScreenshotParams::builder().build())
                    .await
                    .map_err(|e| ChromeError::Screenshot(e.to_string()))?;
                base64::engine::general_purpose::STANDARD
                    .decode(&response.data)
                    .map_err(|e| ChromeError::Screenshot(e.to_string()))
            }
        }
    }

    fn with_touched_page(&self, id: Uuid) -> Result<Page, ChromeError> {
        let mut sessions = self.sessions.write();
        let session = sessions.get_mut(&id).ok_or(ChromeError::SessionNotFound(id))?;
        session.touch();
        Ok(session.page.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_url_detection() {
        assert!(ChromeController::is_blank("about:blank"));
        assert!(!ChromeController::is_blank("https://example.com"));
    }

    #[tokio::test]
    async fn close_unknown_session_errors() {
        let controller = ChromeController::new(ChromeConfig::default());
        let result = controller.close_session(Uuid::new_v4()).await;
        assert!(matches!(result, Err(ChromeError::SessionNotFound(_))));
    }

    #[test]
    fn list_sessions_starts_empty() {
        let controller = ChromeController::new(ChromeConfig::default());
        assert!(controller.list_sessions().is_empty());
    }
}
