//! Scripted in-memory driver for tests
//!
//! [`StubDriver`] answers the full [`PageDriver`] capability set from
//! scripted state: elements keyed by rendered locator, canned evaluate
//! results, queued DOM snapshots swapped in on click (pagination), and a
//! height sequence for scroll-advance checks. Everything observable is
//! recorded so tests can assert on the exact driver calls made.

use crate::driver::{BrowserDriver, BrowserSession, PageDriver};
use crate::errors::DriverError;
use crate::types::{ClickOptions, Cookie, ExtractKind, Locator, StorageScope, Viewport};
use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use stepflow_model::{BrowserConfig, WaitState, WaitUntil};

/// One scripted element.
#[derive(Debug, Clone, Default)]
pub struct StubElement {
    pub text: Option<String>,
    pub html: Option<String>,
    pub value: Option<String>,
    pub attrs: HashMap<String, String>,
    pub visible: bool,
    pub enabled: bool,
}

impl StubElement {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            visible: true,
            enabled: true,
            ..Default::default()
        }
    }

    pub fn with_html(mut self, html: impl Into<String>) -> Self {
        self.html = Some(html.into());
        self
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// A full scripted DOM: rendered locator key -> matched elements.
pub type Dom = HashMap<String, Vec<StubElement>>;

type TransformFn = Box<dyn Fn(Value) -> Value + Send + Sync>;

#[derive(Default)]
struct PageState {
    elements: Dom,
    url: String,
    title: String,
    meta: HashMap<String, String>,
    eval_results: HashMap<String, Value>,
    transforms: HashMap<String, TransformFn>,
    cookies: Vec<Cookie>,
    local_storage: HashMap<String, String>,
    session_storage: HashMap<String, String>,
    viewport: Viewport,
    heights: VecDeque<u64>,
    current_height: u64,
    /// Clicks on these keys fail while the counter is positive.
    failing_clicks: HashMap<String, u32>,
    /// DOM snapshots swapped in after a successful click on the key.
    dom_on_click: HashMap<String, VecDeque<Dom>>,
    /// Pre-scripted pages handed out by `open_tab`.
    queued_tabs: VecDeque<StubDriver>,

    // Recorded activity
    navigations: Vec<String>,
    reloads: u32,
    clicks: Vec<(String, ClickOptions)>,
    fills: Vec<(String, String)>,
    typed: Vec<(String, String, u64)>,
    cleared: Vec<String>,
    scrolls: Vec<i64>,
    scrolled_into_view: Vec<String>,
    waits: Vec<(String, WaitState)>,
    screenshots: Vec<PathBuf>,
    saved_pdfs: Vec<PathBuf>,
    downloads: Vec<(String, PathBuf)>,
    closed: bool,
}

/// Scripted page driver. Cloning shares the underlying state so a test can
/// keep a handle for assertions after the engine consumed the boxed trait
/// object.
#[derive(Clone, Default)]
pub struct StubDriver {
    state: Arc<Mutex<PageState>>,
}

fn elements_key(target: &Locator) -> String {
    let mut base = target.clone();
    base.nth = 0;
    base.to_string()
}

impl StubDriver {
    pub fn new() -> Self {
        let driver = Self::default();
        {
            let mut state = driver.state.lock().unwrap();
            state.url = "about:blank".to_string();
            state.current_height = 1000;
        }
        driver
    }

    // --- scripting -------------------------------------------------------

    /// Register the elements matched by a rendered locator key, e.g.
    /// `"css=.row"` or `"css=.row#1 >> css=.title"`.
    pub fn set_elements(&self, key: impl Into<String>, elements: Vec<StubElement>) {
        self.state.lock().unwrap().elements.insert(key.into(), elements);
    }

    pub fn set_url(&self, url: impl Into<String>) {
        self.state.lock().unwrap().url = url.into();
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.state.lock().unwrap().title = title.into();
    }

    pub fn set_meta(&self, name: impl Into<String>, content: impl Into<String>) {
        self.state.lock().unwrap().meta.insert(name.into(), content.into());
    }

    /// Can a canned result for an exact evaluate expression.
    pub fn set_eval(&self, expression: impl Into<String>, result: Value) {
        self.state
            .lock()
            .unwrap()
            .eval_results
            .insert(expression.into(), result);
    }

    /// Register a transform applied by `evaluate_with_arg`.
    pub fn set_transform(
        &self,
        expression: impl Into<String>,
        transform: impl Fn(Value) -> Value + Send + Sync + 'static,
    ) {
        self.state
            .lock()
            .unwrap()
            .transforms
            .insert(expression.into(), Box::new(transform));
    }

    /// Make the next `times` clicks on the key fail.
    pub fn fail_clicks(&self, key: impl Into<String>, times: u32) {
        self.state
            .lock()
            .unwrap()
            .failing_clicks
            .insert(key.into(), times);
    }

    /// Scripted failures left for the key; the difference from the scripted
    /// count is the number of attempts made.
    pub fn remaining_click_failures(&self, key: &str) -> u32 {
        self.state
            .lock()
            .unwrap()
            .failing_clicks
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    /// Queue a DOM snapshot swapped in after each successful click on the
    /// key (next-button pagination scripting).
    pub fn queue_dom_on_click(&self, key: impl Into<String>, dom: Dom) {
        self.state
            .lock()
            .unwrap()
            .dom_on_click
            .entry(key.into())
            .or_default()
            .push_back(dom);
    }

    /// Script successive `page_height` samples; the last one repeats.
    pub fn set_heights(&self, heights: Vec<u64>) {
        let mut state = self.state.lock().unwrap();
        state.heights = heights.into();
    }

    /// Queue a page handed out by the next `open_tab` call.
    pub fn queue_tab(&self, tab: StubDriver) {
        self.state.lock().unwrap().queued_tabs.push_back(tab);
    }

    // --- recorded activity ----------------------------------------------

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn clicks(&self) -> Vec<(String, ClickOptions)> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn fills(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().fills.clone()
    }

    pub fn typed(&self) -> Vec<(String, String, u64)> {
        self.state.lock().unwrap().typed.clone()
    }

    pub fn cleared(&self) -> Vec<String> {
        self.state.lock().unwrap().cleared.clone()
    }

    pub fn scrolls(&self) -> Vec<i64> {
        self.state.lock().unwrap().scrolls.clone()
    }

    pub fn scrolled_into_view(&self) -> Vec<String> {
        self.state.lock().unwrap().scrolled_into_view.clone()
    }

    pub fn waits(&self) -> Vec<(String, WaitState)> {
        self.state.lock().unwrap().waits.clone()
    }

    pub fn screenshots(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().screenshots.clone()
    }

    pub fn saved_pdfs(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().saved_pdfs.clone()
    }

    pub fn downloads(&self) -> Vec<(String, PathBuf)> {
        self.state.lock().unwrap().downloads.clone()
    }

    pub fn reload_count(&self) -> u32 {
        self.state.lock().unwrap().reloads
    }

    pub fn stored(&self, scope: StorageScope, key: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        match scope {
            StorageScope::Local => state.local_storage.get(key).cloned(),
            StorageScope::Session => state.session_storage.get(key).cloned(),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn element_at(
        &self,
        target: &Locator,
        f: impl FnOnce(&StubElement) -> Option<String>,
    ) -> Result<Option<String>, DriverError> {
        let state = self.state.lock().unwrap();
        let key = elements_key(target);
        match state.elements.get(&key).and_then(|els| els.get(target.nth)) {
            Some(element) => Ok(f(element)),
            None => Err(DriverError::NotFound(target.to_string())),
        }
    }

    fn element_flag(
        &self,
        target: &Locator,
        f: impl FnOnce(&StubElement) -> bool,
    ) -> Result<bool, DriverError> {
        let state = self.state.lock().unwrap();
        let key = elements_key(target);
        match state.elements.get(&key).and_then(|els| els.get(target.nth)) {
            Some(element) => Ok(f(element)),
            None => Err(DriverError::NotFound(target.to_string())),
        }
    }

    fn write_artifact(path: &Path) -> Result<(), DriverError> {
        std::fs::write(path, b"stub").map_err(|e| DriverError::Io(e.to_string()))
    }
}

#[async_trait]
impl PageDriver for StubDriver {
    async fn navigate(&self, url: &str, wait_until: WaitUntil) -> Result<(), DriverError> {
        debug!(url = %url, wait_until = ?wait_until, "stub navigate");
        let mut state = self.state.lock().unwrap();
        state.url = url.to_string();
        state.navigations.push(url.to_string());
        Ok(())
    }

    async fn reload(&self, _wait_until: WaitUntil) -> Result<(), DriverError> {
        self.state.lock().unwrap().reloads += 1;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn title(&self) -> Result<String, DriverError> {
        Ok(self.state.lock().unwrap().title.clone())
    }

    async fn count(&self, target: &Locator) -> Result<usize, DriverError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .elements
            .get(&elements_key(target))
            .map_or(0, |els| els.len()))
    }

    async fn is_visible(&self, target: &Locator) -> Result<bool, DriverError> {
        self.element_flag(target, |el| el.visible)
    }

    async fn is_enabled(&self, target: &Locator) -> Result<bool, DriverError> {
        self.element_flag(target, |el| el.enabled)
    }

    async fn scroll_into_view(&self, target: &Locator) -> Result<(), DriverError> {
        self.state
            .lock()
            .unwrap()
            .scrolled_into_view
            .push(target.to_string());
        Ok(())
    }

    async fn wait_for(
        &self,
        target: &Locator,
        state: WaitState,
        _timeout_ms: u64,
    ) -> Result<(), DriverError> {
        let satisfied = {
            let mut inner = self.state.lock().unwrap();
            let key = elements_key(target);
            let matched = inner.elements.get(&key);
            let attached = matched.is_some_and(|els| !els.is_empty());
            let visible = matched
                .and_then(|els| els.get(target.nth))
                .is_some_and(|el| el.visible);
            inner.waits.push((target.to_string(), state));
            match state {
                WaitState::Attached => attached,
                WaitState::Detached => !attached,
                WaitState::Visible => visible,
                WaitState::Hidden => !visible,
            }
        };
        if satisfied {
            Ok(())
        } else {
            Err(DriverError::Timeout(format!(
                "waiting for {target} to be {state:?}"
            )))
        }
    }

    async fn click(&self, target: &Locator, options: &ClickOptions) -> Result<(), DriverError> {
        let key = elements_key(target);
        let mut state = self.state.lock().unwrap();
        if !state.elements.contains_key(&key) {
            return Err(DriverError::NotFound(target.to_string()));
        }
        if let Some(remaining) = state.failing_clicks.get_mut(&key) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(DriverError::Timeout(format!("click on {target} timed out")));
            }
        }
        debug!(target = %target, "stub click");
        state.clicks.push((target.to_string(), options.clone()));
        if let Some(queue) = state.dom_on_click.get_mut(&key) {
            if let Some(dom) = queue.pop_front() {
                state.elements = dom;
            }
        }
        Ok(())
    }

    async fn clear(&self, target: &Locator) -> Result<(), DriverError> {
        let key = elements_key(target);
        let nth = target.nth;
        let mut state = self.state.lock().unwrap();
        match state.elements.get_mut(&key).and_then(|els| els.get_mut(nth)) {
            Some(element) => {
                element.value = Some(String::new());
                state.cleared.push(target.to_string());
                Ok(())
            }
            None => Err(DriverError::NotFound(target.to_string())),
        }
    }

    async fn fill(&self, target: &Locator, text: &str) -> Result<(), DriverError> {
        let key = elements_key(target);
        let nth = target.nth;
        let mut state = self.state.lock().unwrap();
        match state.elements.get_mut(&key).and_then(|els| els.get_mut(nth)) {
            Some(element) => {
                element.value = Some(text.to_string());
                state.fills.push((target.to_string(), text.to_string()));
                Ok(())
            }
            None => Err(DriverError::NotFound(target.to_string())),
        }
    }

    async fn type_text(
        &self,
        target: &Locator,
        text: &str,
        per_char_delay_ms: u64,
    ) -> Result<(), DriverError> {
        let key = elements_key(target);
        let nth = target.nth;
        let mut state = self.state.lock().unwrap();
        match state.elements.get_mut(&key).and_then(|els| els.get_mut(nth)) {
            Some(element) => {
                let existing = element.value.take().unwrap_or_default();
                element.value = Some(existing + text);
                state
                    .typed
                    .push((target.to_string(), text.to_string(), per_char_delay_ms));
                Ok(())
            }
            None => Err(DriverError::NotFound(target.to_string())),
        }
    }

    async fn extract(
        &self,
        target: &Locator,
        kind: &ExtractKind,
    ) -> Result<Option<String>, DriverError> {
        self.element_at(target, |el| match kind {
            ExtractKind::Text => el.text.clone(),
            ExtractKind::Html => el.html.clone(),
            ExtractKind::Value => el.value.clone(),
            ExtractKind::Attribute(name) => el.attrs.get(name).cloned(),
        })
    }

    async fn meta(&self, name: Option<&str>) -> Result<Value, DriverError> {
        let state = self.state.lock().unwrap();
        match name {
            Some(name) => Ok(state
                .meta
                .get(name)
                .map(|content| Value::String(content.clone()))
                .unwrap_or(Value::Null)),
            None => {
                let mut map = Map::new();
                for (name, content) in &state.meta {
                    map.insert(name.clone(), Value::String(content.clone()));
                }
                Ok(Value::Object(map))
            }
        }
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, DriverError> {
        let state = self.state.lock().unwrap();
        state
            .eval_results
            .get(expression)
            .cloned()
            .ok_or_else(|| DriverError::Script(format!("no scripted result for `{expression}`")))
    }

    async fn evaluate_with_arg(&self, expression: &str, arg: Value) -> Result<Value, DriverError> {
        let state = self.state.lock().unwrap();
        match state.transforms.get(expression) {
            Some(transform) => Ok(transform(arg)),
            None => Err(DriverError::Script(format!(
                "no scripted transform for `{expression}`"
            ))),
        }
    }

    async fn scroll_by(&self, offset: i64) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.scrolls.push(offset);
        Ok(())
    }

    async fn page_height(&self) -> Result<u64, DriverError> {
        let mut state = self.state.lock().unwrap();
        if let Some(next) = state.heights.pop_front() {
            state.current_height = next;
        }
        Ok(state.current_height)
    }

    async fn viewport(&self) -> Result<Viewport, DriverError> {
        Ok(self.state.lock().unwrap().viewport)
    }

    async fn set_viewport(&self, viewport: Viewport) -> Result<(), DriverError> {
        self.state.lock().unwrap().viewport = viewport;
        Ok(())
    }

    async fn cookies(&self, _url: Option<&str>) -> Result<Vec<Cookie>, DriverError> {
        Ok(self.state.lock().unwrap().cookies.clone())
    }

    async fn set_cookie(&self, cookie: Cookie) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        state.cookies.retain(|c| c.name != cookie.name);
        state.cookies.push(cookie);
        Ok(())
    }

    async fn storage_get(
        &self,
        scope: StorageScope,
        key: Option<&str>,
    ) -> Result<Value, DriverError> {
        let state = self.state.lock().unwrap();
        let storage = match scope {
            StorageScope::Local => &state.local_storage,
            StorageScope::Session => &state.session_storage,
        };
        match key {
            Some(key) => Ok(storage
                .get(key)
                .map(|v| Value::String(v.clone()))
                .unwrap_or(Value::Null)),
            None => {
                let mut map = Map::new();
                for (k, v) in storage {
                    map.insert(k.clone(), Value::String(v.clone()));
                }
                Ok(Value::Object(map))
            }
        }
    }

    async fn storage_set(
        &self,
        scope: StorageScope,
        key: &str,
        value: &str,
    ) -> Result<(), DriverError> {
        let mut state = self.state.lock().unwrap();
        let storage = match scope {
            StorageScope::Local => &mut state.local_storage,
            StorageScope::Session => &mut state.session_storage,
        };
        storage.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn screenshot(
        &self,
        _target: Option<&Locator>,
        path: &Path,
        _full_page: bool,
    ) -> Result<(), DriverError> {
        Self::write_artifact(path)?;
        self.state.lock().unwrap().screenshots.push(path.to_path_buf());
        Ok(())
    }

    async fn save_pdf(&self, path: &Path) -> Result<(), DriverError> {
        Self::write_artifact(path)?;
        self.state.lock().unwrap().saved_pdfs.push(path.to_path_buf());
        Ok(())
    }

    async fn download_via_click(&self, target: &Locator, path: &Path) -> Result<(), DriverError> {
        Self::write_artifact(path)?;
        self.state
            .lock()
            .unwrap()
            .downloads
            .push((target.to_string(), path.to_path_buf()));
        Ok(())
    }

    async fn download_url(&self, url: &str, path: &Path) -> Result<(), DriverError> {
        Self::write_artifact(path)?;
        self.state
            .lock()
            .unwrap()
            .downloads
            .push((url.to_string(), path.to_path_buf()));
        Ok(())
    }

    async fn open_tab(&self) -> Result<Box<dyn PageDriver>, DriverError> {
        let mut state = self.state.lock().unwrap();
        match state.queued_tabs.pop_front() {
            Some(tab) => Ok(Box::new(tab)),
            None => Err(DriverError::Unsupported(
                "no scripted tab queued for open_tab".to_string(),
            )),
        }
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

struct SessionState {
    pages: VecDeque<StubDriver>,
    closed: bool,
    launched_with: Option<BrowserConfig>,
}

/// Scripted browser session.
#[derive(Clone)]
pub struct StubSession {
    state: Arc<Mutex<SessionState>>,
}

impl StubSession {
    fn new(pages: Vec<StubDriver>) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState {
                pages: pages.into(),
                closed: false,
                launched_with: None,
            })),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    pub fn launched_with(&self) -> Option<BrowserConfig> {
        self.state.lock().unwrap().launched_with.clone()
    }
}

#[async_trait]
impl BrowserSession for StubSession {
    async fn new_page(&self) -> Result<Box<dyn PageDriver>, DriverError> {
        let mut state = self.state.lock().unwrap();
        match state.pages.pop_front() {
            Some(page) => Ok(Box::new(page)),
            None => Err(DriverError::Closed),
        }
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Scripted browser entry point: hands out one pre-built session.
#[derive(Clone)]
pub struct StubBrowser {
    session: StubSession,
}

impl StubBrowser {
    /// A browser whose session serves the given pages in order.
    pub fn with_pages(pages: Vec<StubDriver>) -> Self {
        Self {
            session: StubSession::new(pages),
        }
    }

    /// Convenience for the single-template case.
    pub fn with_page(page: StubDriver) -> Self {
        Self::with_pages(vec![page])
    }

    pub fn session(&self) -> StubSession {
        self.session.clone()
    }
}

#[async_trait]
impl BrowserDriver for StubBrowser {
    async fn launch(&self, config: &BrowserConfig) -> Result<Box<dyn BrowserSession>, DriverError> {
        self.session.state.lock().unwrap().launched_with = Some(config.clone());
        Ok(Box::new(self.session.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Query;

    #[tokio::test]
    async fn test_count_and_extract() {
        let driver = StubDriver::new();
        driver.set_elements(
            "css=.title",
            vec![StubElement::text("first"), StubElement::text("second")],
        );
        let base = Locator::new(Query::Css(".title".into()));
        assert_eq!(driver.count(&base).await.unwrap(), 2);
        let second = driver
            .extract(&base.clone().nth(1), &ExtractKind::Text)
            .await
            .unwrap();
        assert_eq!(second.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_click_swaps_queued_dom() {
        let driver = StubDriver::new();
        driver.set_elements("css=#next", vec![StubElement::text("next")]);
        let mut page2 = Dom::new();
        page2.insert("css=.row".into(), vec![StubElement::text("page two row")]);
        driver.queue_dom_on_click("css=#next", page2);

        let next = Locator::new(Query::Css("#next".into()));
        driver.click(&next, &ClickOptions::default()).await.unwrap();

        let rows = Locator::new(Query::Css(".row".into()));
        assert_eq!(driver.count(&rows).await.unwrap(), 1);
        assert_eq!(driver.count(&next).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_failing_clicks_consume_budget() {
        let driver = StubDriver::new();
        driver.set_elements("css=#btn", vec![StubElement::text("btn")]);
        driver.fail_clicks("css=#btn", 2);
        let btn = Locator::new(Query::Css("#btn".into()));
        assert!(driver.click(&btn, &ClickOptions::default()).await.is_err());
        assert!(driver.click(&btn, &ClickOptions::default()).await.is_err());
        assert!(driver.click(&btn, &ClickOptions::default()).await.is_ok());
        assert_eq!(driver.clicks().len(), 1);
    }

    #[test]
    fn test_height_sequence_repeats_last() {
        tokio_test::block_on(async {
            let driver = StubDriver::new();
            driver.set_heights(vec![1000, 1600]);
            assert_eq!(driver.page_height().await.unwrap(), 1000);
            assert_eq!(driver.page_height().await.unwrap(), 1600);
            assert_eq!(driver.page_height().await.unwrap(), 1600);
        });
    }
}
