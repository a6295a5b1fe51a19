//! Template validation and normalization
//!
//! The serde-facing [`TabTemplate`] allows both the flat `steps` shape and
//! the `initSteps`/`perPageSteps` split. The engine only ever executes the
//! normalized form: init steps run once, per-page steps run per cycle, and
//! a flat `steps` list serves as the per-page list when no explicit one is
//! given (with no pagination that is a single cycle).

use crate::errors::TemplateError;
use crate::step::{ActionKind, Step};
use crate::template::{PaginationConfig, TabTemplate};

/// The single internal template shape the engine executes.
#[derive(Debug, Clone)]
pub struct NormalizedTemplate {
    pub name: String,
    pub init_steps: Vec<Step>,
    pub per_page_steps: Vec<Step>,
    pub pagination: Option<PaginationConfig>,
}

/// Collapse a [`TabTemplate`] into its normalized form.
pub fn normalize(template: &TabTemplate) -> NormalizedTemplate {
    let per_page_steps = if !template.per_page_steps.is_empty() {
        template.per_page_steps.clone()
    } else {
        template.steps.clone()
    };
    NormalizedTemplate {
        name: template.tab.clone(),
        init_steps: template.init_steps.clone(),
        per_page_steps,
        pagination: template.pagination.clone(),
    }
}

/// Validate a template before any browser work happens.
pub fn validate_template(template: &TabTemplate) -> Result<(), TemplateError> {
    validate_steps(&template.tab, &template.init_steps)?;
    validate_steps(&template.tab, &template.per_page_steps)?;
    validate_steps(&template.tab, &template.steps)?;
    Ok(())
}

fn validate_steps(parent: &str, steps: &[Step]) -> Result<(), TemplateError> {
    for (position, step) in steps.iter().enumerate() {
        if step.id.trim().is_empty() {
            return Err(TemplateError::EmptyStepId {
                parent: parent.to_string(),
                position,
            });
        }
        match step.action {
            ActionKind::ForEach | ActionKind::Open => {
                if step.object.as_deref().unwrap_or("").is_empty() {
                    return Err(TemplateError::MissingSelector {
                        id: step.id.clone(),
                        action: step.action.name().to_string(),
                    });
                }
                if step.children().is_empty() {
                    return Err(TemplateError::MissingChildren {
                        id: step.id.clone(),
                    });
                }
            }
            _ => {}
        }
        validate_steps(&step.id, step.children())?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::step::SelectorType;

    fn foreach_step(children: Vec<Step>) -> Step {
        Step::new("loop", ActionKind::ForEach)
            .with_target(SelectorType::Class, "row")
            .with_sub_steps(children)
    }

    #[test]
    fn test_flat_steps_become_per_page() {
        let template =
            TabTemplate::new("t").with_steps(vec![Step::new("nav", ActionKind::Navigate)]);
        let normalized = normalize(&template);
        assert_eq!(normalized.per_page_steps.len(), 1);
        assert!(normalized.init_steps.is_empty());
        assert!(normalized.pagination.is_none());
    }

    #[test]
    fn test_explicit_per_page_wins_over_flat() {
        let template = TabTemplate::new("t")
            .with_steps(vec![Step::new("flat", ActionKind::Navigate)])
            .with_per_page_steps(vec![Step::new("per_page", ActionKind::Scroll)]);
        let normalized = normalize(&template);
        assert_eq!(normalized.per_page_steps.len(), 1);
        assert_eq!(normalized.per_page_steps[0].id, "per_page");
    }

    #[test]
    fn test_foreach_without_children_rejected() {
        let mut step = foreach_step(Vec::new());
        step.sub_steps = None;
        let template = TabTemplate::new("t").with_steps(vec![step]);
        let err = validate_template(&template).unwrap_err();
        assert!(matches!(err, TemplateError::MissingChildren { .. }));
    }

    #[test]
    fn test_foreach_without_selector_rejected() {
        let mut step = foreach_step(vec![Step::new("child", ActionKind::Data)]);
        step.object = None;
        let template = TabTemplate::new("t").with_steps(vec![step]);
        let err = validate_template(&template).unwrap_err();
        assert!(matches!(err, TemplateError::MissingSelector { .. }));
    }

    #[test]
    fn test_nested_children_validated() {
        let inner = foreach_step(vec![Step::new("", ActionKind::Data)]);
        let outer = foreach_step(vec![inner]);
        let template = TabTemplate::new("t").with_steps(vec![outer]);
        let err = validate_template(&template).unwrap_err();
        assert!(matches!(err, TemplateError::EmptyStepId { .. }));
    }

    #[test]
    fn test_valid_template_passes() {
        let template = TabTemplate::new("t").with_steps(vec![foreach_step(vec![Step::new(
            "title",
            ActionKind::Data,
        )])]);
        assert!(validate_template(&template).is_ok());
    }
}
