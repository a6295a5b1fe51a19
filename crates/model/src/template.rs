//! Template and pagination configuration

use crate::step::{SelectorType, Step};
use serde::{Deserialize, Serialize};

/// How the engine advances from one page to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PaginationStrategy {
    #[default]
    Next,
    Scroll,
}

/// Next-button pagination: click a selector, then wait.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NextButtonConfig {
    #[serde(rename = "object_type")]
    pub object_type: SelectorType,
    #[serde(rename = "object")]
    pub object: String,
    /// Post-click settle time in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait: Option<u64>,
}

/// Scroll pagination: scroll by an offset, then wait.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScrollConfig {
    /// Pixels to scroll by; the viewport height when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<i64>,
    /// Post-scroll settle time in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<u64>,
}

/// Pagination plan for a template.
///
/// Ordering flags: default is collect-then-advance; `paginationFirst`
/// advances before collecting (from the second cycle on); `paginateAllFirst`
/// advances through every page first and collects exactly once at the end.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PaginationConfig {
    pub strategy: PaginationStrategy,
    #[serde(rename = "nextButton", skip_serializing_if = "Option::is_none")]
    pub next_button: Option<NextButtonConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll: Option<ScrollConfig>,
    #[serde(rename = "maxPages", skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u32>,
    #[serde(rename = "paginationFirst")]
    pub pagination_first: bool,
    #[serde(rename = "paginateAllFirst")]
    pub paginate_all_first: bool,
}

/// One logical browsing session's plan.
///
/// Either a flat `steps` list, or `initSteps`/`perPageSteps` with a
/// pagination plan; `perPageSteps` drives iteration whenever pagination is
/// configured and falls back to `steps` when empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabTemplate {
    pub tab: String,
    #[serde(rename = "initSteps", default, skip_serializing_if = "Vec::is_empty")]
    pub init_steps: Vec<Step>,
    #[serde(
        rename = "perPageSteps",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub per_page_steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationConfig>,
}

impl TabTemplate {
    /// Create an empty template with the given name.
    pub fn new(tab: impl Into<String>) -> Self {
        Self {
            tab: tab.into(),
            init_steps: Vec::new(),
            per_page_steps: Vec::new(),
            steps: Vec::new(),
            pagination: None,
        }
    }

    pub fn with_steps(mut self, steps: Vec<Step>) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_init_steps(mut self, steps: Vec<Step>) -> Self {
        self.init_steps = steps;
        self
    }

    pub fn with_per_page_steps(mut self, steps: Vec<Step>) -> Self {
        self.per_page_steps = steps;
        self
    }

    pub fn with_pagination(mut self, pagination: PaginationConfig) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

/// Browser launch configuration, passed through to the driver.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    /// Per-operation slow-motion delay in milliseconds.
    #[serde(rename = "slowMo", skip_serializing_if = "Option::is_none")]
    pub slow_mo: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            proxy: None,
            slow_mo: None,
            args: Vec::new(),
        }
    }
}

/// Options for a whole engine run. Owned by the template runner and never
/// mutated while a run is in flight.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RunOptions {
    pub browser: BrowserConfig,
}
