//! Error types for template parsing and validation

use thiserror::Error;

/// Errors raised while loading or validating a template.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// A step has an empty id.
    #[error("step at position {position} in `{parent}` has an empty id")]
    EmptyStepId { parent: String, position: usize },

    /// A foreach step has no children to run.
    #[error("foreach step `{id}` has no subSteps")]
    MissingChildren { id: String },

    /// A step kind that targets elements is missing its selector.
    #[error("step `{id}` ({action}) requires an object selector")]
    MissingSelector { id: String, action: String },

    /// The document could not be parsed as JSON.
    #[error("invalid JSON template: {0}")]
    Json(#[from] serde_json::Error),

    /// The document could not be parsed as YAML.
    #[error("invalid YAML template: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The template file could not be read.
    #[error("failed to read template file: {0}")]
    Io(#[from] std::io::Error),

    /// The template file extension is not a supported format.
    #[error("unsupported template format: {0}")]
    UnsupportedFormat(String),
}
