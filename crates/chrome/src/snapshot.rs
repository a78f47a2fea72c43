//! In-page accessibility snapshot: a JS routine evaluated via `Page::evaluate`
//! that tags interactive elements with stable `data-nx-ref` numbers so later
//! `clickByRef`/`typeByRef` calls can address them without re-querying the DOM.

use serde::{Deserialize, Serialize};

pub const MAX_ELEMENTS_HARD_CAP: usize = 500;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElementDescriptor {
    #[serde(rename = "ref")]
    pub element_ref: u32,
    pub tag: String,
    pub id: Option<String>,
    pub role: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub element_type: Option<String>,
    pub text: Option<String>,
    #[serde(rename = "ariaLabel")]
    pub aria_label: Option<String>,
    pub placeholder: Option<String>,
    pub href: Option<String>,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotResult {
    pub url: String,
    pub title: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub elements: Vec<ElementDescriptor>,
}

/// Builds the injected snapshot routine for a given call, with
/// `includeInvisible`/`maxElements` baked into the script so it runs as a
/// single `evaluate` round-trip.
pub fn build_snapshot_script(include_invisible: bool, max_elements: usize) -> String {
    let cap = max_elements.min(MAX_ELEMENTS_HARD_CAP);
    format!(
        r#"(() => {{
    const INCLUDE_INVISIBLE = {include_invisible};
    const MAX_ELEMENTS = {cap};
    const SELECTOR = [
        'a[href]', 'button', 'input', 'select', 'textarea',
        '[role="button"]', '[role="link"]', '[role="menuitem"]',
        '[onclick]', '[contenteditable="true"]',
        '[tabindex]', '[aria-label]'
    ].join(',');

    for (const el of document.querySelectorAll('[data-nx-ref]')) {{
        el.removeAttribute('data-nx-ref');
    }}

    function isVisible(el) {{
        const style = window.getComputedStyle(el);
        if (style.visibility === 'hidden' || style.display === 'none') return false;
        const rect = el.getBoundingClientRect();
        return rect.width > 0 && rect.height > 0;
    }}

    function normText(el) {{
        return (el.innerText || el.textContent || '').trim().replace(/\s+/g, ' ').slice(0, 160);
    }}

    const seen = new Set();
    const descriptors = [];
    const candidates = Array.from(document.querySelectorAll(SELECTOR));

    for (const el of candidates) {{
        if (descriptors.length >= MAX_ELEMENTS) break;

        const tabindex = el.getAttribute('tabindex');
        if (tabindex !== null && Number(tabindex) < 0 && !el.hasAttribute('aria-label')) continue;
        if (!INCLUDE_INVISIBLE && !isVisible(el)) continue;

        const rect = el.getBoundingClientRect();
        const text = normText(el);
        const dedupeKey = [
            el.tagName, el.id || '', el.getAttribute('name') || '',
            Math.round(rect.x / 4), Math.round(rect.y / 4), text.slice(0, 40)
        ].join('|');
        if (seen.has(dedupeKey)) continue;
        seen.add(dedupeKey);

        const n = descriptors.length + 1;
        el.setAttribute('data-nx-ref', String(n));
        descriptors.push({{
            ref: n,
            tag: el.tagName.toLowerCase(),
            id: el.id || null,
            role: el.getAttribute('role') || null,
            name: el.getAttribute('name') || null,
            type: el.getAttribute('type') || null,
            text: text || null,
            ariaLabel: el.getAttribute('aria-label') || null,
            placeholder: el.getAttribute('placeholder') || null,
            href: el.getAttribute('href') || null,
            x: rect.x, y: rect.y, width: rect.width, height: rect.height,
        }});
    }}

    return {{
        url: location.href,
        title: document.title,
        timestamp: new Date().toISOString(),
        elements: descriptors,
    }};
}})()"#
    )
}

pub fn ref_selector(element_ref: u32) -> String {
    format!(r#"[data-nx-ref="{element_ref}"]"#)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_embeds_clamped_cap_and_visibility_flag() {
        let script = build_snapshot_script(false, 10_000);
        assert!(script.contains("MAX_ELEMENTS = 500"));
        assert!(script.contains("INCLUDE_INVISIBLE = false"));
    }

    #[test]
    fn ref_selector_matches_data_attribute() {
        assert_eq!(ref_selector(7), r#"[data-nx-ref="7"]"#);
    }
}
