//! Core types shared across driver implementations

use serde::{Deserialize, Serialize};
use stepflow_model::ClickModifier;

/// A native element query, as the underlying automation library sees it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Query {
    Css(String),
    XPath(String),
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Query::Css(selector) => write!(f, "css={selector}"),
            Query::XPath(expression) => write!(f, "xpath={expression}"),
        }
    }
}

/// A resolvable element reference: a query, an index into its matches, and
/// an optional enclosing scope (a foreach iteration element).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Locator {
    pub query: Query,
    pub nth: usize,
    pub scope: Option<Box<Locator>>,
}

impl Locator {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            nth: 0,
            scope: None,
        }
    }

    /// Select the n-th match (zero-based).
    pub fn nth(mut self, index: usize) -> Self {
        self.nth = index;
        self
    }

    /// Scope this locator inside another resolved element.
    pub fn within(mut self, scope: &Locator) -> Self {
        self.scope = Some(Box::new(scope.clone()));
        self
    }
}

impl std::fmt::Display for Locator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(scope) = &self.scope {
            write!(f, "{scope} >> ")?;
        }
        write!(f, "{}", self.query)?;
        if self.nth > 0 {
            write!(f, "#{}", self.nth)?;
        }
        Ok(())
    }
}

/// Mouse button for a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MouseButton {
    #[default]
    Left,
    Right,
}

/// Options for a click call.
#[derive(Debug, Clone, Default)]
pub struct ClickOptions {
    pub button: MouseButton,
    pub double: bool,
    pub modifiers: Vec<ClickModifier>,
    /// Bypass visibility/actionability checks in the driver.
    pub force: bool,
}

/// What to extract from a matched element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractKind {
    Text,
    Html,
    Value,
    Attribute(String),
}

/// A browser cookie.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

/// Which page storage area to touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageScope {
    Local,
    Session,
}

/// Viewport dimensions in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_display_includes_scope_chain() {
        let row = Locator::new(Query::Css(".row".into())).nth(2);
        let title = Locator::new(Query::Css(".title".into())).within(&row);
        assert_eq!(title.to_string(), "css=.row#2 >> css=.title");
    }

    #[test]
    fn test_query_display() {
        assert_eq!(Query::Css("#main".into()).to_string(), "css=#main");
        assert_eq!(
            Query::XPath("//a[@href]".into()).to_string(),
            "xpath=//a[@href]"
        );
    }
}
