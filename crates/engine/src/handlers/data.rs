//! Data extraction handler

use crate::collector::Collector;
use crate::errors::EngineError;
use crate::executor::{wait_for_aux_selector, Frame};
use crate::extract;
use crate::handlers::record_key;
use crate::resolve;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use stepflow_driver::{ExtractKind, PageDriver};
use stepflow_model::{DataType, Step};
use tracing::{debug, warn};

/// `.../@attr` suffix on an attribute-extraction selector.
static ATTR_SUFFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/@(\w+)$").expect("valid attribute suffix regex"));

/// Extract one value into the collector under the step's key.
///
/// A failure on a non-required step degrades to the default value; only
/// `required` steps propagate extraction errors to the failure policy.
pub(crate) async fn extract_data(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    frame: Frame<'_>,
) -> Result<(), EngineError> {
    let key = record_key(step, "data", collector, frame.index);
    match extract_value(driver, step, &key, collector, frame).await {
        Ok(value) => {
            debug!(step = %step.id, key = %key, "data collected");
            collector.insert(key, value);
            Ok(())
        }
        Err(err) => {
            if step.is_required() {
                return Err(err);
            }
            warn!(step = %step.id, error = %err, "data extraction failed, using default");
            let fallback = step
                .default_value
                .as_ref()
                .map(|d| Value::String(d.clone()))
                .unwrap_or(Value::Null);
            collector.insert(key, fallback);
            Ok(())
        }
    }
}

async fn extract_value(
    driver: &dyn PageDriver,
    step: &Step,
    key: &str,
    collector: &Collector,
    frame: Frame<'_>,
) -> Result<Value, EngineError> {
    let data_type = step.data_type.unwrap_or_default();
    let raw_selector = step.object.as_deref().unwrap_or_default();
    let (check_selector, attribute) = split_attribute_suffix(raw_selector, data_type);

    wait_for_aux_selector(driver, step, collector, frame).await;

    let target = match resolve::find_with_fallbacks(
        driver,
        frame.scope,
        step,
        Some(&check_selector),
        collector,
        frame.index,
    )
    .await
    {
        Ok(target) => Some(target),
        Err(err @ EngineError::ElementNotFound { .. }) => {
            // A zero-match data selector is not an error unless the step
            // opted out of continueOnEmpty; the pipeline below still
            // applies the default and the required check.
            if step.continue_on_empty == Some(false) {
                return Err(err);
            }
            None
        }
        Err(err) => return Err(err),
    };

    let raw = match &target {
        Some(target) => {
            let kind = match data_type {
                DataType::Text | DataType::Default => ExtractKind::Text,
                DataType::Html => ExtractKind::Html,
                DataType::Value => ExtractKind::Value,
                DataType::Attribute => match attribute {
                    Some(name) => ExtractKind::Attribute(name),
                    None => ExtractKind::Text,
                },
            };
            driver.extract(target, &kind).await?
        }
        None => None,
    };

    extract::apply_pipeline(driver, step, key, raw, collector, frame.index).await
}

/// Split a trailing `/@attr` off an attribute selector, returning the
/// element selector and the attribute name.
fn split_attribute_suffix(selector: &str, data_type: DataType) -> (String, Option<String>) {
    if data_type != DataType::Attribute {
        return (selector.to_string(), None);
    }
    match ATTR_SUFFIX_RE.captures(selector) {
        Some(captures) => {
            let attribute = captures[1].to_string();
            let stripped = ATTR_SUFFIX_RE.replace(selector, "").into_owned();
            (stripped, Some(attribute))
        }
        None => (selector.to_string(), None),
    }
}
