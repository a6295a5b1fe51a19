//! Input and click handlers

use crate::collector::Collector;
use crate::errors::EngineError;
use crate::executor::{wait_for_aux_selector, Frame};
use crate::placeholders;
use crate::resolve;
use stepflow_driver::{ClickOptions, Locator, MouseButton, PageDriver};
use stepflow_model::Step;
use tracing::warn;

/// Fill (or type into) the resolved element.
pub(crate) async fn input(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    frame: Frame<'_>,
) -> Result<(), EngineError> {
    wait_for_aux_selector(driver, step, collector, frame).await;

    let target = match resolve::find_with_fallbacks(
        driver,
        frame.scope,
        step,
        None,
        collector,
        frame.index,
    )
    .await
    {
        Ok(target) => target,
        Err(err @ EngineError::ElementNotFound { .. }) => {
            if step.continue_on_empty == Some(false) {
                return Err(err);
            }
            warn!(step = %step.id, error = %err, "input element not found, skipping");
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    enforce_preconditions(driver, step, &target, false).await?;

    if step.clear_before_input() {
        driver.clear(&target).await?;
    }

    let value = placeholders::resolve(
        step.value.as_deref().unwrap_or_default(),
        collector,
        frame.index,
    );
    match step.input_delay.filter(|d| *d > 0) {
        Some(delay) => driver.type_text(&target, &value, delay).await?,
        None => driver.fill(&target, &value).await?,
    }
    Ok(())
}

/// Click the resolved element, honoring click variants and modifiers.
pub(crate) async fn click(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    frame: Frame<'_>,
) -> Result<(), EngineError> {
    wait_for_aux_selector(driver, step, collector, frame).await;

    let target = match resolve::find_with_fallbacks(
        driver,
        frame.scope,
        step,
        None,
        collector,
        frame.index,
    )
    .await
    {
        Ok(target) => target,
        Err(err @ EngineError::ElementNotFound { .. }) => {
            if step.continue_on_empty == Some(false) {
                return Err(err);
            }
            warn!(step = %step.id, error = %err, "click element not found, skipping");
            return Ok(());
        }
        Err(err) => return Err(err),
    };

    // Click defaults to requiring a visible element.
    enforce_preconditions(driver, step, &target, true).await?;

    let options = ClickOptions {
        button: if step.right_click.unwrap_or(false) {
            MouseButton::Right
        } else {
            MouseButton::Left
        },
        double: step.double_click.unwrap_or(false),
        modifiers: step.click_modifiers.clone().unwrap_or_default(),
        force: step.force_click.unwrap_or(false),
    };
    driver.click(&target, &options).await?;
    Ok(())
}

/// Visibility/enabled preconditions; `forceClick` bypasses the visibility
/// requirement for this action only.
async fn enforce_preconditions(
    driver: &dyn PageDriver,
    step: &Step,
    target: &Locator,
    visible_by_default: bool,
) -> Result<(), EngineError> {
    if step.require_visible.unwrap_or(visible_by_default) && !driver.is_visible(target).await? {
        if step.force_click.unwrap_or(false) {
            warn!(step = %step.id, "element not visible, force-clicking anyway");
        } else {
            return Err(EngineError::ElementNotVisible {
                selector: target.to_string(),
            });
        }
    }
    if step.require_enabled.unwrap_or(false) && !driver.is_enabled(target).await? {
        return Err(EngineError::ElementNotEnabled {
            selector: target.to_string(),
        });
    }
    Ok(())
}
