//! Headless Chromium sandbox over the DevTools protocol.
//!
//! [`ChromiumSession`] owns one browser process and its CDP handler task.
//! It is a scoped guard: [`ChromiumSession::close`] shuts the browser down
//! cleanly, and dropping the session (for example when a run's future is
//! cancelled) aborts the handler and lets the browser handle kill the
//! child process.

use crate::render::assets;
use crate::render::{RenderError, RenderSandbox};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::emulation::SetDeviceMetricsOverrideParams;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::page::Page;
use futures::StreamExt;
use mg_protocol::config_models::Settings;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BrowserError {
    #[error("failed to launch browser: {0}")]
    Launch(String),
    #[error("browser command failed: {0}")]
    Command(String),
}

impl From<BrowserError> for RenderError {
    fn from(err: BrowserError) -> Self {
        match err {
            BrowserError::Launch(msg) => RenderError::Launch(msg),
            BrowserError::Command(msg) => RenderError::Sandbox(msg),
        }
    }
}

/// Launch options shared by the render sandbox and the recording surface.
#[derive(Debug, Clone, PartialEq)]
pub struct ChromiumOptions {
    pub chromium_path: Option<PathBuf>,
    pub mermaid_script_url: String,
    /// Surface used for rendering and measuring.
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// How long to wait for the diagram library to load.
    pub load_timeout: Duration,
}

impl ChromiumOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            chromium_path: settings.chromium_path.clone(),
            mermaid_script_url: settings.mermaid_script_url.clone(),
            viewport_width: settings.viewport_width,
            viewport_height: settings.viewport_height,
            load_timeout: Duration::from_secs(settings.request_timeout_secs),
        }
    }
}

/// A running browser plus its CDP event loop.
pub struct ChromiumSession {
    browser: Option<Browser>,
    handler: JoinHandle<()>,
}

impl ChromiumSession {
    pub async fn launch(options: &ChromiumOptions) -> Result<Self, BrowserError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .window_size(options.viewport_width, options.viewport_height)
            .arg("--hide-scrollbars")
            .arg("--disable-gpu");

        if let Some(path) = &options.chromium_path {
            builder = builder.chrome_executable(path);
        }

        let config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| BrowserError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        debug!("chromium session started");
        Ok(Self {
            browser: Some(browser),
            handler,
        })
    }

    /// Open a blank page emulating a `width` x `height` CSS-pixel screen.
    pub async fn open_page(&self, width: u32, height: u32) -> Result<Page, BrowserError> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| BrowserError::Command("browser already closed".to_string()))?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::Command(e.to_string()))?;

        page.execute(SetDeviceMetricsOverrideParams::new(width, height, 1.0, false))
            .await
            .map_err(|e| BrowserError::Command(e.to_string()))?;

        Ok(page)
    }

    /// Shut the browser down and wait for the process to exit.
    pub async fn close(mut self) {
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!(error = %e, "failed to close chromium cleanly");
            }
            let _ = browser.wait().await;
        }
        self.handler.abort();
        debug!("chromium session closed");
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Load `html` into the page.
pub async fn set_content(page: &Page, html: &str) -> Result<(), BrowserError> {
    page.set_content(html)
        .await
        .map_err(|e| BrowserError::Command(e.to_string()))?;
    Ok(())
}

/// Evaluate a JS expression, awaiting a returned promise, and deserialize
/// its value.
pub async fn evaluate<T: DeserializeOwned>(page: &Page, expression: String) -> Result<T, BrowserError> {
    let params = EvaluateParams::builder()
        .expression(expression)
        .await_promise(true)
        .return_by_value(true)
        .build()
        .map_err(BrowserError::Command)?;

    page.evaluate_expression(params)
        .await
        .map_err(|e| BrowserError::Command(e.to_string()))?
        .into_value()
        .map_err(|e| BrowserError::Command(e.to_string()))
}

#[derive(Debug, Deserialize)]
struct RenderOutcome {
    success: bool,
    svg: Option<String>,
    error: Option<String>,
}

/// [`RenderSandbox`] that runs the Mermaid library in headless Chromium.
///
/// Each render uses its own browser session, released before returning.
#[derive(Debug, Clone)]
pub struct ChromiumSandbox {
    options: ChromiumOptions,
}

impl ChromiumSandbox {
    pub fn new(options: ChromiumOptions) -> Self {
        Self { options }
    }

    async fn render_in(&self, session: &ChromiumSession, source: &str) -> Result<String, RenderError> {
        let page = session
            .open_page(self.options.viewport_width, self.options.viewport_height)
            .await?;
        set_content(&page, &assets::render_host_html(&self.options.mermaid_script_url)).await?;

        let script = assets::render_script(source, self.options.load_timeout.as_millis() as u64);
        let outcome: RenderOutcome = evaluate(&page, script).await?;

        if !outcome.success {
            return Err(RenderError::Rejected(
                outcome
                    .error
                    .unwrap_or_else(|| "unknown rendering error".to_string()),
            ));
        }
        outcome.svg.ok_or(RenderError::EmptyDocument)
    }
}

#[async_trait]
impl RenderSandbox for ChromiumSandbox {
    async fn render(&self, source: &str) -> Result<String, RenderError> {
        let session = ChromiumSession::launch(&self.options).await?;
        let result = self.render_in(&session, source).await;
        session.close().await;
        result
    }
}
