//! Declarative data model for stepflow templates
//!
//! A template is a tree of [`Step`]s plus an optional pagination plan. This
//! crate owns the serde-facing shapes, validation, and the normalization
//! into the single internal form the engine executes.

pub mod errors;
pub mod loader;
pub mod normalize;
pub mod step;
pub mod template;

pub use errors::TemplateError;
pub use loader::{templates_from_file, templates_from_json_str, templates_from_yaml_str};
pub use normalize::{normalize, validate_template, NormalizedTemplate};
pub use step::{
    ActionKind, ClickModifier, DataType, FallbackSelector, RandomDelay, SelectorType, Step,
    WaitState, WaitUntil,
};
pub use template::{
    BrowserConfig, NextButtonConfig, PaginationConfig, PaginationStrategy, RunOptions,
    ScrollConfig, TabTemplate,
};
