//! Error types for step execution

use stepflow_driver::DriverError;
use stepflow_model::TemplateError;
use thiserror::Error;

/// Errors raised while executing a template.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The primary selector and every fallback matched nothing.
    #[error("element not found: {selector}")]
    ElementNotFound { selector: String },

    /// The element was resolved but is not visible.
    #[error("element not visible: {selector}")]
    ElementNotVisible { selector: String },

    /// The element was resolved but is not enabled.
    #[error("element not enabled: {selector}")]
    ElementNotEnabled { selector: String },

    /// A skipIf/onlyIf/transform expression threw during evaluation.
    #[error("condition evaluation failed: {expression}")]
    ConditionEval { expression: String },

    /// A step exceeded its configured timeout.
    #[error("step `{step}` timed out after {ms} ms")]
    ActionTimeout { step: String, ms: u64 },

    /// A required data step produced an empty value after the
    /// regex/transform/default pipeline.
    #[error("required data field `{key}` is empty")]
    ExtractionRequired { key: String },

    /// Pagination could not progress. A normal terminal condition, never a
    /// template fault.
    #[error("pagination could not advance")]
    AdvanceFailed,

    /// A step is missing a runtime requirement (value, selector, ...).
    #[error("invalid step `{id}`: {reason}")]
    InvalidStep { id: String, reason: String },

    /// The template failed validation before execution.
    #[error(transparent)]
    Template(#[from] TemplateError),

    /// A step failed and was marked terminating; carries enough context to
    /// diagnose without browser introspection.
    #[error("step `{id}` ({action}) failed")]
    StepFailed {
        id: String,
        action: String,
        #[source]
        source: Box<EngineError>,
    },

    /// The underlying driver call failed.
    #[error(transparent)]
    Driver(#[from] DriverError),
}

impl EngineError {
    /// Wrap an error with the failing step's identity.
    pub(crate) fn for_step(self, id: &str, action: &str) -> Self {
        EngineError::StepFailed {
            id: id.to_string(),
            action: action.to_string(),
            source: Box::new(self),
        }
    }
}
