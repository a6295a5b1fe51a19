//! skipIf / onlyIf condition evaluation
//!
//! Conditions are opaque script expressions evaluated in page context via
//! the driver. An expression that throws gates conservatively: it counts
//! as `false` and never aborts the step.

use crate::collector::Collector;
use crate::errors::EngineError;
use crate::placeholders;
use serde_json::Value;
use stepflow_driver::PageDriver;
use tracing::warn;

/// Evaluate a gating expression. Collector placeholders are substituted
/// before evaluation; an evaluation error yields `false`.
pub(crate) async fn evaluate_condition(
    driver: &dyn PageDriver,
    expression: &str,
    collector: &Collector,
    index: Option<usize>,
) -> bool {
    let resolved = placeholders::resolve(expression, collector, index);
    match try_evaluate(driver, &resolved).await {
        Ok(result) => is_truthy(&result),
        Err(err) => {
            warn!(expression = %resolved, error = %err, "condition evaluation failed, treating as false");
            false
        }
    }
}

async fn try_evaluate(driver: &dyn PageDriver, expression: &str) -> Result<Value, EngineError> {
    driver
        .evaluate(expression)
        .await
        .map_err(|_| EngineError::ConditionEval {
            expression: expression.to_string(),
        })
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(false, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stepflow_driver::stub::StubDriver;

    #[tokio::test]
    async fn test_truthy_result_gates_true() {
        let driver = StubDriver::new();
        driver.set_eval("document.title === 'Home'", json!(true));
        let collector = Collector::new();
        assert!(evaluate_condition(&driver, "document.title === 'Home'", &collector, None).await);
    }

    #[tokio::test]
    async fn test_eval_error_is_false() {
        let driver = StubDriver::new();
        let collector = Collector::new();
        assert!(!evaluate_condition(&driver, "window.someGlobal", &collector, None).await);
    }

    #[tokio::test]
    async fn test_placeholders_substituted_before_eval() {
        let driver = StubDriver::new();
        driver.set_eval("'premium' === 'premium'", json!(true));
        let mut collector = Collector::new();
        collector.insert("tier", json!("premium"));
        assert!(
            evaluate_condition(&driver, "'{{tier}}' === 'premium'", &collector, None).await
        );
    }

    #[test]
    fn test_truthiness_table() {
        assert!(!is_truthy(&json!(null)));
        assert!(!is_truthy(&json!(false)));
        assert!(!is_truthy(&json!(0)));
        assert!(!is_truthy(&json!("")));
        assert!(is_truthy(&json!(1)));
        assert!(is_truthy(&json!("x")));
        assert!(is_truthy(&json!([])));
    }
}
