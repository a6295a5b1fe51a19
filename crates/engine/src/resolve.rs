//! Selector resolution with ordered fallback
//!
//! A step targets elements through a `(type, value)` selector plus an
//! optional fallback list. Resolution tries the primary first, then each
//! fallback in order, and settles on the first query the driver reports at
//! least one match for.

use crate::collector::Collector;
use crate::errors::EngineError;
use crate::placeholders;
use stepflow_driver::{Locator, PageDriver, Query};
use stepflow_model::{SelectorType, Step};
use tracing::debug;

/// Translate a selector into the driver's native query form.
pub(crate) fn query_for(selector_type: Option<SelectorType>, value: &str) -> Query {
    match selector_type {
        Some(SelectorType::Id) => Query::Css(format!("#{value}")),
        Some(SelectorType::Class) => Query::Css(format!(".{value}")),
        Some(SelectorType::Tag) => Query::Css(value.to_string()),
        Some(SelectorType::XPath) => Query::XPath(value.to_string()),
        // No type behaves as a raw CSS selector.
        None => Query::Css(value.to_string()),
    }
}

/// Build a locator for a selector, scoped when inside a foreach element.
pub(crate) fn locator(
    scope: Option<&Locator>,
    selector_type: Option<SelectorType>,
    value: &str,
) -> Locator {
    let base = Locator::new(query_for(selector_type, value));
    match scope {
        Some(scope) => base.within(scope),
        None => base,
    }
}

/// Resolve a step's target: primary selector first, then fallbacks in
/// order. Placeholders in selector values are substituted before querying.
/// Returns the first locator with at least one match.
pub(crate) async fn find_with_fallbacks(
    driver: &dyn PageDriver,
    scope: Option<&Locator>,
    step: &Step,
    selector_override: Option<&str>,
    collector: &Collector,
    index: Option<usize>,
) -> Result<Locator, EngineError> {
    let primary_value = selector_override
        .or(step.object.as_deref())
        .unwrap_or_default();
    let primary_value = placeholders::resolve(primary_value, collector, index);
    let primary = locator(scope, step.object_type, &primary_value);
    if driver.count(&primary).await? > 0 {
        return Ok(primary);
    }

    for fallback in step.fallback_selectors.as_deref().unwrap_or(&[]) {
        let value = placeholders::resolve(&fallback.object, collector, index);
        let candidate = locator(scope, Some(fallback.object_type), &value);
        if driver.count(&candidate).await? > 0 {
            debug!(step = %step.id, fallback = %candidate, "primary selector empty, using fallback");
            return Ok(candidate);
        }
    }

    Err(EngineError::ElementNotFound {
        selector: primary.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepflow_driver::stub::{StubDriver, StubElement};
    use stepflow_model::{ActionKind, FallbackSelector};

    #[test]
    fn test_query_translation() {
        assert_eq!(
            query_for(Some(SelectorType::Id), "main"),
            Query::Css("#main".into())
        );
        assert_eq!(
            query_for(Some(SelectorType::Class), "row"),
            Query::Css(".row".into())
        );
        assert_eq!(
            query_for(Some(SelectorType::Tag), "h1"),
            Query::Css("h1".into())
        );
        assert_eq!(
            query_for(Some(SelectorType::XPath), "//a"),
            Query::XPath("//a".into())
        );
    }

    #[tokio::test]
    async fn test_primary_wins_when_present() {
        let driver = StubDriver::new();
        driver.set_elements("css=#main", vec![StubElement::text("x")]);
        let step = Step::new("s", ActionKind::Data).with_target(SelectorType::Id, "main");
        let collector = Collector::new();
        let found = find_with_fallbacks(&driver, None, &step, None, &collector, None)
            .await
            .unwrap();
        assert_eq!(found.to_string(), "css=#main");
    }

    #[tokio::test]
    async fn test_fallbacks_tried_in_order() {
        let driver = StubDriver::new();
        driver.set_elements("css=.second", vec![StubElement::text("x")]);
        let mut step = Step::new("s", ActionKind::Data).with_target(SelectorType::Id, "missing");
        step.fallback_selectors = Some(vec![
            FallbackSelector {
                object_type: SelectorType::Class,
                object: "first".into(),
            },
            FallbackSelector {
                object_type: SelectorType::Class,
                object: "second".into(),
            },
        ]);
        let collector = Collector::new();
        let found = find_with_fallbacks(&driver, None, &step, None, &collector, None)
            .await
            .unwrap();
        assert_eq!(found.to_string(), "css=.second");
    }

    #[tokio::test]
    async fn test_all_empty_is_element_not_found() {
        let driver = StubDriver::new();
        let step = Step::new("s", ActionKind::Click).with_target(SelectorType::Id, "gone");
        let collector = Collector::new();
        let err = find_with_fallbacks(&driver, None, &step, None, &collector, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ElementNotFound { .. }));
    }
}
