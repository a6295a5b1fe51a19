//! The driver capability traits

use crate::errors::DriverError;
use crate::types::{ClickOptions, Cookie, ExtractKind, Locator, StorageScope, Viewport};
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use stepflow_model::{BrowserConfig, WaitState, WaitUntil};

/// One live page (tab) of a browser session.
///
/// Every method is a suspension point; the engine does not proceed past a
/// call until it resolves or times out. Implementations translate
/// [`Locator`]s into their native query mechanism.
#[async_trait]
pub trait PageDriver: Send + Sync {
    // Navigation
    async fn navigate(&self, url: &str, wait_until: WaitUntil) -> Result<(), DriverError>;
    async fn reload(&self, wait_until: WaitUntil) -> Result<(), DriverError>;
    async fn current_url(&self) -> Result<String, DriverError>;
    async fn title(&self) -> Result<String, DriverError>;

    // Element resolution and state
    async fn count(&self, target: &Locator) -> Result<usize, DriverError>;
    async fn is_visible(&self, target: &Locator) -> Result<bool, DriverError>;
    async fn is_enabled(&self, target: &Locator) -> Result<bool, DriverError>;
    async fn scroll_into_view(&self, target: &Locator) -> Result<(), DriverError>;
    async fn wait_for(
        &self,
        target: &Locator,
        state: WaitState,
        timeout_ms: u64,
    ) -> Result<(), DriverError>;

    // Interaction
    async fn click(&self, target: &Locator, options: &ClickOptions) -> Result<(), DriverError>;
    async fn clear(&self, target: &Locator) -> Result<(), DriverError>;
    async fn fill(&self, target: &Locator, text: &str) -> Result<(), DriverError>;
    /// Type character by character with a fixed per-character delay.
    async fn type_text(
        &self,
        target: &Locator,
        text: &str,
        per_char_delay_ms: u64,
    ) -> Result<(), DriverError>;

    // Extraction
    async fn extract(
        &self,
        target: &Locator,
        kind: &ExtractKind,
    ) -> Result<Option<String>, DriverError>;
    /// Read a meta tag's content by name/property, or all meta tags as an
    /// object when `name` is absent.
    async fn meta(&self, name: Option<&str>) -> Result<Value, DriverError>;

    // Scripting
    async fn evaluate(&self, expression: &str) -> Result<Value, DriverError>;
    /// Evaluate an expression with one bound argument (transform pipelines).
    async fn evaluate_with_arg(&self, expression: &str, arg: Value) -> Result<Value, DriverError>;

    // Scrolling and page geometry
    async fn scroll_by(&self, offset: i64) -> Result<(), DriverError>;
    async fn page_height(&self) -> Result<u64, DriverError>;
    async fn viewport(&self) -> Result<Viewport, DriverError>;
    async fn set_viewport(&self, viewport: Viewport) -> Result<(), DriverError>;

    // State access
    async fn cookies(&self, url: Option<&str>) -> Result<Vec<Cookie>, DriverError>;
    async fn set_cookie(&self, cookie: Cookie) -> Result<(), DriverError>;
    async fn storage_get(
        &self,
        scope: StorageScope,
        key: Option<&str>,
    ) -> Result<Value, DriverError>;
    async fn storage_set(
        &self,
        scope: StorageScope,
        key: &str,
        value: &str,
    ) -> Result<(), DriverError>;

    // Artifacts
    async fn screenshot(
        &self,
        target: Option<&Locator>,
        path: &Path,
        full_page: bool,
    ) -> Result<(), DriverError>;
    async fn save_pdf(&self, path: &Path) -> Result<(), DriverError>;
    /// Click the target and persist the download it triggers.
    async fn download_via_click(&self, target: &Locator, path: &Path) -> Result<(), DriverError>;
    /// Fetch a URL (with the page's cookie jar) and persist the body.
    async fn download_url(&self, url: &str, path: &Path) -> Result<(), DriverError>;

    // Session
    /// Open a fresh tab in the same session.
    async fn open_tab(&self) -> Result<Box<dyn PageDriver>, DriverError>;
    async fn close(&self) -> Result<(), DriverError>;
}

/// A launched browser session, producer of pages.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn PageDriver>, DriverError>;
    async fn close(&self) -> Result<(), DriverError>;
}

/// Entry point: launches sessions from a [`BrowserConfig`].
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn launch(&self, config: &BrowserConfig) -> Result<Box<dyn BrowserSession>, DriverError>;
}
