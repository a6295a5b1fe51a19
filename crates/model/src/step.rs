//! Step definitions - one node of a workflow tree

use serde::{Deserialize, Serialize};

/// How a step's target selector is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorType {
    Id,
    Class,
    Tag,
    XPath,
}

/// What to pull out of a matched element during a `data` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Text,
    Html,
    Value,
    Attribute,
    #[default]
    Default,
}

/// Keyboard modifiers applied while clicking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClickModifier {
    Control,
    Meta,
    Shift,
    Alt,
}

/// Element state to wait for before acting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WaitState {
    #[default]
    Visible,
    Hidden,
    Attached,
    Detached,
}

/// Navigation settle point for `navigate`/`reload`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    #[default]
    Load,
    DomContentLoaded,
    NetworkIdle,
    Commit,
}

/// Closed set of step action kinds, resolved once at template-load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ActionKind {
    #[default]
    #[serde(rename = "navigate")]
    Navigate,
    #[serde(rename = "input")]
    Input,
    #[serde(rename = "click")]
    Click,
    #[serde(rename = "data")]
    Data,
    #[serde(rename = "scroll")]
    Scroll,
    #[serde(rename = "eventBaseDownload")]
    EventBaseDownload,
    #[serde(rename = "foreach")]
    ForEach,
    #[serde(rename = "open")]
    Open,
    #[serde(rename = "savePDF")]
    SavePdf,
    #[serde(rename = "printToPDF")]
    PrintToPdf,
    #[serde(rename = "downloadPDF")]
    DownloadPdf,
    #[serde(rename = "downloadFile")]
    DownloadFile,
    #[serde(rename = "reload")]
    Reload,
    #[serde(rename = "getUrl")]
    GetUrl,
    #[serde(rename = "getTitle")]
    GetTitle,
    #[serde(rename = "getMeta")]
    GetMeta,
    #[serde(rename = "getCookies")]
    GetCookies,
    #[serde(rename = "setCookies")]
    SetCookies,
    #[serde(rename = "getLocalStorage")]
    GetLocalStorage,
    #[serde(rename = "setLocalStorage")]
    SetLocalStorage,
    #[serde(rename = "getSessionStorage")]
    GetSessionStorage,
    #[serde(rename = "setSessionStorage")]
    SetSessionStorage,
    #[serde(rename = "getViewportSize")]
    GetViewportSize,
    #[serde(rename = "setViewportSize")]
    SetViewportSize,
    #[serde(rename = "screenshot")]
    Screenshot,
    #[serde(rename = "waitForSelector")]
    WaitForSelector,
    #[serde(rename = "evaluate")]
    Evaluate,
}

impl ActionKind {
    /// Wire-format name, used for logging and error context.
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::Navigate => "navigate",
            ActionKind::Input => "input",
            ActionKind::Click => "click",
            ActionKind::Data => "data",
            ActionKind::Scroll => "scroll",
            ActionKind::EventBaseDownload => "eventBaseDownload",
            ActionKind::ForEach => "foreach",
            ActionKind::Open => "open",
            ActionKind::SavePdf => "savePDF",
            ActionKind::PrintToPdf => "printToPDF",
            ActionKind::DownloadPdf => "downloadPDF",
            ActionKind::DownloadFile => "downloadFile",
            ActionKind::Reload => "reload",
            ActionKind::GetUrl => "getUrl",
            ActionKind::GetTitle => "getTitle",
            ActionKind::GetMeta => "getMeta",
            ActionKind::GetCookies => "getCookies",
            ActionKind::SetCookies => "setCookies",
            ActionKind::GetLocalStorage => "getLocalStorage",
            ActionKind::SetLocalStorage => "setLocalStorage",
            ActionKind::GetSessionStorage => "getSessionStorage",
            ActionKind::SetSessionStorage => "setSessionStorage",
            ActionKind::GetViewportSize => "getViewportSize",
            ActionKind::SetViewportSize => "setViewportSize",
            ActionKind::Screenshot => "screenshot",
            ActionKind::WaitForSelector => "waitForSelector",
            ActionKind::Evaluate => "evaluate",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Alternate selector tried when a preceding one matches nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackSelector {
    #[serde(rename = "object_type")]
    pub object_type: SelectorType,
    #[serde(rename = "object")]
    pub object: String,
}

/// Uniform random pre-action delay bounds, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomDelay {
    pub min: u64,
    pub max: u64,
}

/// A single workflow step.
///
/// Only `id` and `action` are required; everything else defaults to "off".
/// Failure policy precedence: `skipOnError` silences an error before
/// `terminateonerror` is consulted.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Step {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    // Target
    #[serde(rename = "object_type", skip_serializing_if = "Option::is_none")]
    pub object_type: Option<SelectorType>,
    #[serde(rename = "object", skip_serializing_if = "Option::is_none")]
    pub object: Option<String>,
    #[serde(rename = "fallbackSelectors", skip_serializing_if = "Option::is_none")]
    pub fallback_selectors: Option<Vec<FallbackSelector>>,

    pub action: ActionKind,

    // Action parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(rename = "data_type", skip_serializing_if = "Option::is_none")]
    pub data_type: Option<DataType>,

    // Children (foreach / open body)
    #[serde(rename = "subSteps", skip_serializing_if = "Option::is_none")]
    pub sub_steps: Option<Vec<Step>>,
    #[serde(rename = "autoScroll", skip_serializing_if = "Option::is_none")]
    pub auto_scroll: Option<bool>,

    // Retry
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,
    #[serde(rename = "retryDelay", skip_serializing_if = "Option::is_none")]
    pub retry_delay: Option<u64>,

    // Conditional execution
    #[serde(rename = "skipIf", skip_serializing_if = "Option::is_none")]
    pub skip_if: Option<String>,
    #[serde(rename = "onlyIf", skip_serializing_if = "Option::is_none")]
    pub only_if: Option<String>,

    // Auxiliary pre-action wait
    #[serde(rename = "waitForSelector", skip_serializing_if = "Option::is_none")]
    pub wait_for_selector: Option<String>,
    #[serde(
        rename = "waitForSelectorTimeout",
        skip_serializing_if = "Option::is_none"
    )]
    pub wait_for_selector_timeout: Option<u64>,
    #[serde(
        rename = "waitForSelectorState",
        skip_serializing_if = "Option::is_none"
    )]
    pub wait_for_selector_state: Option<WaitState>,

    // Click enhancements
    #[serde(rename = "clickModifiers", skip_serializing_if = "Option::is_none")]
    pub click_modifiers: Option<Vec<ClickModifier>>,
    #[serde(rename = "doubleClick", skip_serializing_if = "Option::is_none")]
    pub double_click: Option<bool>,
    #[serde(rename = "rightClick", skip_serializing_if = "Option::is_none")]
    pub right_click: Option<bool>,
    #[serde(rename = "forceClick", skip_serializing_if = "Option::is_none")]
    pub force_click: Option<bool>,

    // Input enhancements
    #[serde(rename = "clearBeforeInput", skip_serializing_if = "Option::is_none")]
    pub clear_before_input: Option<bool>,
    #[serde(rename = "inputDelay", skip_serializing_if = "Option::is_none")]
    pub input_delay: Option<u64>,

    // Extraction pipeline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(rename = "defaultValue", skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(rename = "regexGroup", skip_serializing_if = "Option::is_none")]
    pub regex_group: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transform: Option<String>,

    // Waits and timeout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(rename = "randomDelay", skip_serializing_if = "Option::is_none")]
    pub random_delay: Option<RandomDelay>,

    // Navigation
    #[serde(rename = "waitUntil", skip_serializing_if = "Option::is_none")]
    pub wait_until: Option<WaitUntil>,

    // Element state preconditions
    #[serde(rename = "requireVisible", skip_serializing_if = "Option::is_none")]
    pub require_visible: Option<bool>,
    #[serde(rename = "requireEnabled", skip_serializing_if = "Option::is_none")]
    pub require_enabled: Option<bool>,

    // Failure policy
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terminateonerror: Option<bool>,
    #[serde(rename = "skipOnError", skip_serializing_if = "Option::is_none")]
    pub skip_on_error: Option<bool>,
    #[serde(rename = "continueOnEmpty", skip_serializing_if = "Option::is_none")]
    pub continue_on_empty: Option<bool>,

    // Screenshot
    #[serde(rename = "fullPage", skip_serializing_if = "Option::is_none")]
    pub full_page: Option<bool>,
}

impl Step {
    /// Create a step with the two required fields set.
    pub fn new(id: impl Into<String>, action: ActionKind) -> Self {
        Self {
            id: id.into(),
            action,
            ..Default::default()
        }
    }

    /// Set the target selector.
    pub fn with_target(mut self, object_type: SelectorType, object: impl Into<String>) -> Self {
        self.object_type = Some(object_type);
        self.object = Some(object.into());
        self
    }

    /// Set the free-form action value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set the collector key the result is stored under.
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    /// Set the extraction data type.
    pub fn with_data_type(mut self, data_type: DataType) -> Self {
        self.data_type = Some(data_type);
        self
    }

    /// Set the children run per foreach iteration (or in an opened tab).
    pub fn with_sub_steps(mut self, sub_steps: Vec<Step>) -> Self {
        self.sub_steps = Some(sub_steps);
        self
    }

    /// Retry budget; 0 means a single attempt.
    pub fn retry_budget(&self) -> u32 {
        self.retry.unwrap_or(0)
    }

    /// Delay between retry attempts in milliseconds.
    pub fn retry_delay_ms(&self) -> u64 {
        self.retry_delay.unwrap_or(1000)
    }

    /// Collector key for stored results: `key`, else `id`, else the
    /// action-specific fallback.
    pub fn collector_key(&self, fallback: &str) -> String {
        if let Some(key) = self.key.as_deref().filter(|k| !k.is_empty()) {
            return key.to_string();
        }
        if !self.id.is_empty() {
            return self.id.clone();
        }
        fallback.to_string()
    }

    pub fn auto_scroll(&self) -> bool {
        self.auto_scroll.unwrap_or(true)
    }

    pub fn clear_before_input(&self) -> bool {
        self.clear_before_input.unwrap_or(true)
    }

    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }

    pub fn skips_on_error(&self) -> bool {
        self.skip_on_error.unwrap_or(false)
    }

    pub fn terminates_on_error(&self) -> bool {
        self.terminateonerror.unwrap_or(false)
    }

    pub fn children(&self) -> &[Step] {
        self.sub_steps.as_deref().unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_kind_roundtrip() {
        let json = serde_json::to_string(&ActionKind::EventBaseDownload).unwrap();
        assert_eq!(json, "\"eventBaseDownload\"");
        let back: ActionKind = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ActionKind::EventBaseDownload);
        assert_eq!(ActionKind::SavePdf.name(), "savePDF");
    }

    #[test]
    fn test_step_parses_wire_names() {
        let step: Step = serde_json::from_str(
            r#"{
                "id": "price",
                "action": "data",
                "object_type": "xpath",
                "object": "//span[@class='price']",
                "data_type": "text",
                "regexGroup": 1,
                "defaultValue": "N/A",
                "skipOnError": true,
                "terminateonerror": false
            }"#,
        )
        .unwrap();
        assert_eq!(step.action, ActionKind::Data);
        assert_eq!(step.object_type, Some(SelectorType::XPath));
        assert_eq!(step.regex_group, Some(1));
        assert_eq!(step.default_value.as_deref(), Some("N/A"));
        assert!(step.skips_on_error());
        assert!(!step.terminates_on_error());
    }

    #[test]
    fn test_collector_key_fallback_chain() {
        let mut step = Step::new("my_id", ActionKind::Data);
        assert_eq!(step.collector_key("data"), "my_id");
        step.key = Some("named".into());
        assert_eq!(step.collector_key("data"), "named");
        step.key = None;
        step.id.clear();
        assert_eq!(step.collector_key("data"), "data");
    }

    #[test]
    fn test_defaults() {
        let step = Step::new("s", ActionKind::Click);
        assert_eq!(step.retry_budget(), 0);
        assert_eq!(step.retry_delay_ms(), 1000);
        assert!(step.auto_scroll());
        assert!(step.clear_before_input());
        assert!(!step.is_required());
    }
}
