//! File artifact handlers: PDFs and downloads
//!
//! Each of these is a single driver call plus path bookkeeping; the saved
//! path (or null) always lands under the step key, success or not.

use crate::collector::Collector;
use crate::errors::EngineError;
use crate::executor::Frame;
use crate::handlers::{absolutize, ensure_parent_dir, record_key};
use crate::placeholders;
use crate::resolve;
use serde_json::Value;
use std::path::Path;
use stepflow_driver::{ExtractKind, PageDriver};
use stepflow_model::Step;
use tracing::warn;

/// Render the current page to a PDF at the step's target path.
pub(crate) async fn save_pdf(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    frame: Frame<'_>,
) -> Result<(), EngineError> {
    let raw_path = step_target_path(step)?;
    let path_str = placeholders::resolve_path(raw_path, collector, frame.index);
    let key = record_key(step, "file", collector, frame.index);

    ensure_parent_dir(Path::new(&path_str)).await?;
    match driver.save_pdf(Path::new(&path_str)).await {
        Ok(()) => {
            collector.insert(key, Value::String(path_str));
            Ok(())
        }
        Err(err) => {
            collector.insert(key, Value::Null);
            Err(err.into())
        }
    }
}

/// Follow a link's href and persist the fetched body.
pub(crate) async fn download(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    frame: Frame<'_>,
) -> Result<(), EngineError> {
    let raw_path = step_target_path(step)?;
    let key = record_key(step, "file", collector, frame.index);

    let selector = step.object.as_deref().unwrap_or_default();
    if selector.is_empty() {
        return Err(EngineError::InvalidStep {
            id: step.id.clone(),
            reason: "download requires an object locator".into(),
        });
    }
    let selector = placeholders::resolve(selector, collector, frame.index);
    let link = resolve::locator(frame.scope, step.object_type, &selector);
    if driver.count(&link).await? == 0 {
        warn!(step = %step.id, selector = %link, "download link not found");
        collector.insert(key, Value::Null);
        return Ok(());
    }

    let href = driver
        .extract(&link, &ExtractKind::Attribute("href".into()))
        .await?;
    let href = match href {
        Some(href) if !href.is_empty() && !href.starts_with("javascript") => href,
        _ => {
            collector.insert(key, Value::Null);
            return Err(EngineError::InvalidStep {
                id: step.id.clone(),
                reason: format!("link `{link}` has no resolvable href"),
            });
        }
    };
    let url = absolutize(driver, &href).await?;

    let path_str = placeholders::resolve_path(raw_path, collector, frame.index);
    ensure_parent_dir(Path::new(&path_str)).await?;
    match driver.download_url(&url, Path::new(&path_str)).await {
        Ok(()) => {
            collector.insert(key, Value::String(path_str));
            Ok(())
        }
        Err(err) => {
            collector.insert(key, Value::Null);
            Err(err.into())
        }
    }
}

/// Click an element and persist the download it triggers.
pub(crate) async fn event_download(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    frame: Frame<'_>,
) -> Result<(), EngineError> {
    let raw_path = step_target_path(step)?;
    let key = record_key(step, "file", collector, frame.index);

    let selector = step.object.as_deref().unwrap_or_default();
    let selector = placeholders::resolve(selector, collector, frame.index);
    let target = resolve::locator(frame.scope, step.object_type, &selector);

    let visible = driver.count(&target).await? > 0 && driver.is_visible(&target).await?;
    if !visible {
        warn!(step = %step.id, selector = %target, "download trigger not visible");
        collector.insert(key, Value::Null);
        return Ok(());
    }

    let path_str = placeholders::resolve_path(raw_path, collector, frame.index);
    ensure_parent_dir(Path::new(&path_str)).await?;
    match driver.download_via_click(&target, Path::new(&path_str)).await {
        Ok(()) => {
            collector.insert(key, Value::String(path_str));
            Ok(())
        }
        Err(err) => {
            collector.insert(key, Value::Null);
            Err(err.into())
        }
    }
}

fn step_target_path(step: &Step) -> Result<&str, EngineError> {
    step.value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| EngineError::InvalidStep {
            id: step.id.clone(),
            reason: "file action requires a value target path".into(),
        })
}
