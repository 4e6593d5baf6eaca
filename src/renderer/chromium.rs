//! Chromium-backed driver using chromiumoxide.
//!
//! All element interaction goes through JS evaluation in the page context.
//! The remote application is a classic server-rendered postback UI, so a
//! DOM-level `click()` / change event is enough to trigger every transition.

use super::UiDriver;
use crate::error::DriverError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Poll interval for bounded waits.
const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. LEASEHAWK_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("LEASEHAWK_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. ~/.leasehawk/chromium/
    if let Some(home) = dirs::home_dir() {
        let candidates = if cfg!(target_os = "macos") {
            vec![
                home.join(".leasehawk/chromium/chrome-mac-arm64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".leasehawk/chromium/chrome-mac-x64/Google Chrome for Testing.app/Contents/MacOS/Google Chrome for Testing"),
                home.join(".leasehawk/chromium/chrome"),
            ]
        } else {
            vec![
                home.join(".leasehawk/chromium/chrome-linux64/chrome"),
                home.join(".leasehawk/chromium/chrome"),
            ]
        };
        for c in candidates {
            if c.exists() {
                return Some(c);
            }
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// A headless Chromium instance with one active window.
pub struct ChromiumDriver {
    browser: Browser,
    page: Page,
    wait_timeout: Duration,
}

impl ChromiumDriver {
    /// Launch headless Chromium and open a blank window.
    pub async fn launch(wait_timeout: Duration) -> Result<Self> {
        let chrome_path = find_chromium()
            .context("Chromium not found; set LEASEHAWK_CHROMIUM_PATH")?;

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Drain CDP events for the lifetime of the browser
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .context("failed to open initial window")?;

        Ok(Self {
            browser,
            page,
            wait_timeout,
        })
    }

    /// Run a JS snippet in the active page, deserializing the result.
    async fn eval<T: serde::de::DeserializeOwned>(&self, js: &str) -> Result<T, DriverError> {
        let result = self
            .page
            .evaluate(js)
            .await
            .map_err(|e| DriverError::Browser(format!("JS evaluation failed: {e}")))?;
        result
            .into_value()
            .map_err(|e| DriverError::Browser(format!("unexpected JS result: {e:?}")))
    }

    /// Run a snippet that reports `"ok"` on success and an element-missing
    /// marker otherwise.
    async fn eval_action(&self, js: &str, target: &str) -> Result<(), DriverError> {
        let outcome: String = self.eval(js).await?;
        if outcome == "ok" {
            Ok(())
        } else {
            Err(DriverError::NotFound(target.to_string()))
        }
    }

    /// Poll a boolean JS predicate until it holds or the bounded wait elapses.
    async fn wait_until(&self, js: &str, what: &str) -> Result<(), DriverError> {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            if self.eval::<bool>(js).await.unwrap_or(false) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout {
                    what: what.to_string(),
                    timeout: self.wait_timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl UiDriver for ChromiumDriver {
    async fn navigate(&mut self, url: &str) -> Result<(), DriverError> {
        let result = tokio::time::timeout(self.wait_timeout, self.page.goto(url)).await;
        match result {
            Ok(Ok(_)) => {
                let _ = self.page.wait_for_navigation().await;
                Ok(())
            }
            Ok(Err(e)) => Err(DriverError::Browser(format!("navigation failed: {e}"))),
            Err(_) => Err(DriverError::Timeout {
                what: format!("navigation to {url}"),
                timeout: self.wait_timeout,
            }),
        }
    }

    async fn click(&mut self, selector: &str) -> Result<(), DriverError> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector('{}');
                if (el) {{ el.click(); return 'ok'; }}
                return 'missing';
            }})()"#,
            sanitize_js_string(selector)
        );
        self.eval_action(&js, selector).await
    }

    async fn click_link_text(&mut self, text: &str) -> Result<(), DriverError> {
        let js = format!(
            r#"(() => {{
                const link = [...document.querySelectorAll('a')]
                    .find(a => a.textContent.trim() === '{}');
                if (link) {{ link.click(); return 'ok'; }}
                return 'missing';
            }})()"#,
            sanitize_js_string(text)
        );
        self.eval_action(&js, &format!("link \"{text}\"")).await
    }

    async fn click_nth_link(
        &mut self,
        container: &str,
        index: usize,
    ) -> Result<(), DriverError> {
        let js = format!(
            r#"(() => {{
                const c = document.querySelector('{}');
                if (!c) return 'missing';
                const links = c.querySelectorAll('a');
                if (links.length <= {index}) return 'missing';
                links[{index}].click();
                return 'ok';
            }})()"#,
            sanitize_js_string(container)
        );
        self.eval_action(&js, &format!("{container} a[{index}]")).await
    }

    async fn link_count(&mut self, container: &str) -> Result<usize, DriverError> {
        let js = format!(
            r#"(() => {{
                const c = document.querySelector('{}');
                return c ? c.querySelectorAll('a').length : 0;
            }})()"#,
            sanitize_js_string(container)
        );
        self.eval(&js).await
    }

    async fn type_into(&mut self, selector: &str, text: &str) -> Result<(), DriverError> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector('{}');
                if (!el) return 'missing';
                el.value = '{}';
                el.dispatchEvent(new Event('input', {{ bubbles: true }}));
                return 'ok';
            }})()"#,
            sanitize_js_string(selector),
            sanitize_js_string(text)
        );
        self.eval_action(&js, selector).await
    }

    async fn option_labels(&mut self, selector: &str) -> Result<Vec<String>, DriverError> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector('{}');
                if (!el) return [];
                return [...el.options].map(o => o.textContent.trim());
            }})()"#,
            sanitize_js_string(selector)
        );
        self.eval(&js).await
    }

    async fn select_option(
        &mut self,
        selector: &str,
        label: &str,
    ) -> Result<(), DriverError> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector('{}');
                if (!el) return 'missing';
                const opt = [...el.options].find(o => o.textContent.trim() === '{}');
                if (!opt) return 'missing';
                el.value = opt.value;
                el.dispatchEvent(new Event('change', {{ bubbles: true }}));
                return 'ok';
            }})()"#,
            sanitize_js_string(selector),
            sanitize_js_string(label)
        );
        self.eval_action(&js, &format!("{selector} option \"{label}\""))
            .await
    }

    async fn element_text(&mut self, selector: &str) -> Result<String, DriverError> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector('{}');
                return el ? el.textContent : '';
            }})()"#,
            sanitize_js_string(selector)
        );
        self.eval(&js).await
    }

    async fn page_html(&mut self) -> Result<String, DriverError> {
        self.eval("document.documentElement.outerHTML").await
    }

    async fn wait_for_visible(&mut self, selector: &str) -> Result<(), DriverError> {
        let js = format!(
            r#"(() => {{
                const el = document.querySelector('{}');
                return !!el && el.getClientRects().length > 0;
            }})()"#,
            sanitize_js_string(selector)
        );
        self.wait_until(&js, &format!("element {selector}")).await
    }

    async fn wait_for_window_count(&mut self, n: usize) -> Result<(), DriverError> {
        let deadline = Instant::now() + self.wait_timeout;
        loop {
            let pages = self
                .browser
                .pages()
                .await
                .map_err(|e| DriverError::Browser(format!("failed to list windows: {e}")))?;
            if pages.len() == n {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DriverError::Timeout {
                    what: format!("window count {n}"),
                    timeout: self.wait_timeout,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn wait_for_title(&mut self, title: &str) -> Result<(), DriverError> {
        let js = format!(
            "document.title === '{}'",
            sanitize_js_string(title)
        );
        self.wait_until(&js, &format!("title \"{title}\"")).await
    }

    async fn switch_to_new_window(&mut self) -> Result<(), DriverError> {
        let current = self.page.target_id().clone();
        let pages = self
            .browser
            .pages()
            .await
            .map_err(|e| DriverError::Browser(format!("failed to list windows: {e}")))?;
        let other = pages
            .into_iter()
            .rev()
            .find(|p| *p.target_id() != current)
            .ok_or_else(|| DriverError::NotFound("second window".to_string()))?;
        self.page = other;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), DriverError> {
        let _ = self.page.clone().close().await;
        self.browser
            .close()
            .await
            .map_err(|e| DriverError::Browser(format!("failed to close browser: {e}")))?;
        Ok(())
    }
}

/// Sanitize a string for safe injection into a JS string literal.
fn sanitize_js_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + 8);
    for ch in s.chars() {
        match ch {
            '\\' => result.push_str("\\\\"),
            '\'' => result.push_str("\\'"),
            '"' => result.push_str("\\\""),
            '`' => result.push_str("\\`"),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\0' => {}
            '<' => result.push_str("\\x3c"),
            '>' => result.push_str("\\x3e"),
            _ => result.push(ch),
        }
    }
    result
}
