//! Data extraction pipeline: regex -> transform -> default -> required
//!
//! The regex captures first (so a transform runs against the captured
//! value, not the raw text), the default substitutes only when the final
//! value is empty, and `required` makes empty-after-default a hard error.

use crate::collector::Collector;
use crate::errors::EngineError;
use crate::placeholders;
use regex::Regex;
use serde_json::Value;
use stepflow_driver::PageDriver;
use stepflow_model::Step;
use tracing::warn;

/// Run the extraction pipeline over a raw extracted value.
pub(crate) async fn apply_pipeline(
    driver: &dyn PageDriver,
    step: &Step,
    key: &str,
    raw: Option<String>,
    collector: &Collector,
    index: Option<usize>,
) -> Result<Value, EngineError> {
    let mut value = match raw {
        Some(text) => Value::String(text),
        None => Value::Null,
    };

    if let (Some(pattern), Value::String(text)) = (&step.regex, &value) {
        if let Some(captured) = apply_regex(pattern, step.regex_group, text) {
            value = Value::String(captured);
        }
    }

    if let Some(transform) = &step.transform {
        if !value.is_null() {
            let expression = placeholders::resolve(transform, collector, index);
            match driver.evaluate_with_arg(&expression, value.clone()).await {
                Ok(transformed) => value = transformed,
                Err(err) => {
                    warn!(step = %step.id, error = %err, "transform failed, keeping untransformed value");
                }
            }
        }
    }

    if is_empty(&value) {
        if let Some(default) = &step.default_value {
            value = Value::String(default.clone());
        }
    }

    if step.is_required() && is_empty(&value) {
        return Err(EngineError::ExtractionRequired {
            key: key.to_string(),
        });
    }

    Ok(value)
}

fn apply_regex(pattern: &str, group: Option<usize>, text: &str) -> Option<String> {
    let re = match Regex::new(pattern) {
        Ok(re) => re,
        Err(err) => {
            warn!(pattern = %pattern, error = %err, "invalid extraction regex, skipping");
            return None;
        }
    };
    let captures = re.captures(text)?;
    let group = group.unwrap_or(0);
    let capture = captures
        .get(group)
        .or_else(|| captures.get(0))
        .map(|m| m.as_str().to_string());
    capture
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stepflow_driver::stub::StubDriver;
    use stepflow_model::ActionKind;

    fn data_step() -> Step {
        Step::new("price", ActionKind::Data)
    }

    #[tokio::test]
    async fn test_regex_captures_group_before_transform() {
        let driver = StubDriver::new();
        driver.set_transform("value.toUpperCase()", |v| {
            json!(v.as_str().unwrap_or_default().to_uppercase())
        });
        let mut step = data_step();
        step.regex = Some(r"\$(\d+\.\d+)".into());
        step.regex_group = Some(1);
        step.transform = Some("value.toUpperCase()".into());
        let collector = Collector::new();
        let value = apply_pipeline(
            &driver,
            &step,
            "price",
            Some("Price: $19.99".into()),
            &collector,
            None,
        )
        .await
        .unwrap();
        // Uppercasing digits is a no-op: the transform saw the captured
        // group, not the raw text.
        assert_eq!(value, json!("19.99"));
    }

    #[tokio::test]
    async fn test_no_match_keeps_raw_value() {
        let driver = StubDriver::new();
        let mut step = data_step();
        step.regex = Some(r"\d{10}".into());
        let collector = Collector::new();
        let value = apply_pipeline(&driver, &step, "k", Some("hello".into()), &collector, None)
            .await
            .unwrap();
        assert_eq!(value, json!("hello"));
    }

    #[tokio::test]
    async fn test_required_with_default_never_raises() {
        let driver = StubDriver::new();
        let mut step = data_step();
        step.required = Some(true);
        step.default_value = Some("N/A".into());
        let collector = Collector::new();
        let value = apply_pipeline(&driver, &step, "k", None, &collector, None)
            .await
            .unwrap();
        assert_eq!(value, json!("N/A"));
    }

    #[tokio::test]
    async fn test_required_without_default_raises_on_empty() {
        let driver = StubDriver::new();
        let mut step = data_step();
        step.required = Some(true);
        let collector = Collector::new();
        let err = apply_pipeline(&driver, &step, "k", Some(String::new()), &collector, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ExtractionRequired { .. }));
    }

    #[tokio::test]
    async fn test_failed_transform_keeps_value() {
        let driver = StubDriver::new();
        let mut step = data_step();
        step.transform = Some("not.scripted".into());
        let collector = Collector::new();
        let value = apply_pipeline(&driver, &step, "k", Some("raw".into()), &collector, None)
            .await
            .unwrap();
        assert_eq!(value, json!("raw"));
    }

    #[tokio::test]
    async fn test_transform_may_change_type() {
        let driver = StubDriver::new();
        driver.set_transform("parseInt(value.replace(/,/g, ''))", |v| {
            let digits: String = v
                .as_str()
                .unwrap_or_default()
                .chars()
                .filter(char::is_ascii_digit)
                .collect();
            json!(digits.parse::<i64>().unwrap_or_default())
        });
        let mut step = data_step();
        step.transform = Some("parseInt(value.replace(/,/g, ''))".into());
        let collector = Collector::new();
        let value = apply_pipeline(&driver, &step, "k", Some("12,345".into()), &collector, None)
            .await
            .unwrap();
        assert_eq!(value, json!(12345));
    }
}
