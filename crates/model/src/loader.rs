//! Template loading from JSON and YAML documents

use crate::errors::TemplateError;
use crate::normalize::validate_template;
use crate::template::TabTemplate;
use std::path::Path;

/// Parse and validate a template list from a JSON document.
///
/// Accepts either a single template object or an array of templates.
pub fn templates_from_json_str(input: &str) -> Result<Vec<TabTemplate>, TemplateError> {
    let templates: Vec<TabTemplate> = if input.trim_start().starts_with('[') {
        serde_json::from_str(input)?
    } else {
        vec![serde_json::from_str(input)?]
    };
    for template in &templates {
        validate_template(template)?;
    }
    Ok(templates)
}

/// Parse and validate a template list from a YAML document.
pub fn templates_from_yaml_str(input: &str) -> Result<Vec<TabTemplate>, TemplateError> {
    let value: serde_yaml::Value = serde_yaml::from_str(input)?;
    let templates: Vec<TabTemplate> = if value.is_sequence() {
        serde_yaml::from_value(value)?
    } else {
        vec![serde_yaml::from_value(value)?]
    };
    for template in &templates {
        validate_template(template)?;
    }
    Ok(templates)
}

/// Load templates from a file, picking the format from the extension.
pub fn templates_from_file(path: impl AsRef<Path>) -> Result<Vec<TabTemplate>, TemplateError> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path)?;
    match path.extension().and_then(|e| e.to_str()) {
        Some("json") => templates_from_json_str(&contents),
        Some("yaml") | Some("yml") => templates_from_yaml_str(&contents),
        other => Err(TemplateError::UnsupportedFormat(
            other.unwrap_or("<none>").to_string(),
        )),
    }
}
