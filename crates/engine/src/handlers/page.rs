//! Page-info, storage, cookie, viewport, screenshot, and scripting handlers

use crate::collector::Collector;
use crate::errors::EngineError;
use crate::executor::Frame;
use crate::handlers::{ensure_parent_dir, record_key};
use crate::placeholders;
use crate::resolve;
use serde_json::{json, Value};
use std::path::Path;
use stepflow_driver::{Cookie, PageDriver, StorageScope, Viewport};
use stepflow_model::{Step, WaitState, WaitUntil};
use tracing::{debug, warn};

fn require_value<'a>(step: &'a Step, what: &str) -> Result<&'a str, EngineError> {
    step.value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or_else(|| EngineError::InvalidStep {
            id: step.id.clone(),
            reason: format!("{} requires a value", what),
        })
}

fn require_object<'a>(step: &'a Step, what: &str) -> Result<&'a str, EngineError> {
    step.object
        .as_deref()
        .filter(|o| !o.is_empty())
        .ok_or_else(|| EngineError::InvalidStep {
            id: step.id.clone(),
            reason: format!("{} requires an object", what),
        })
}

/// Scroll by the step value (pixels), or by one viewport height.
pub(crate) async fn scroll(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &Collector,
    frame: Frame<'_>,
) -> Result<(), EngineError> {
    let offset = match step.value.as_deref() {
        Some(value) => {
            let resolved = placeholders::resolve(value, collector, frame.index);
            match resolved.parse::<i64>() {
                Ok(offset) => offset,
                Err(_) => driver.viewport().await?.height as i64,
            }
        }
        None => driver.viewport().await?.height as i64,
    };
    driver.scroll_by(offset).await?;
    Ok(())
}

pub(crate) async fn reload(driver: &dyn PageDriver, step: &Step) -> Result<(), EngineError> {
    let wait_until = step
        .wait_until
        .or_else(|| step.value.as_deref().and_then(parse_wait_until))
        .unwrap_or_default();
    driver.reload(wait_until).await?;
    Ok(())
}

pub(crate) async fn get_url(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    frame: Frame<'_>,
) -> Result<(), EngineError> {
    let url = driver.current_url().await?;
    let key = record_key(step, "url", collector, frame.index);
    collector.insert(key, Value::String(url));
    Ok(())
}

pub(crate) async fn get_title(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    frame: Frame<'_>,
) -> Result<(), EngineError> {
    let title = driver.title().await?;
    let key = record_key(step, "title", collector, frame.index);
    collector.insert(key, Value::String(title));
    Ok(())
}

/// One named meta tag, or every meta tag as an object.
pub(crate) async fn get_meta(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    frame: Frame<'_>,
) -> Result<(), EngineError> {
    let value = driver.meta(step.object.as_deref()).await?;
    let key = record_key(step, "meta", collector, frame.index);
    collector.insert(key, value);
    Ok(())
}

pub(crate) async fn get_cookies(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    frame: Frame<'_>,
) -> Result<(), EngineError> {
    let cookies = driver.cookies(step.value.as_deref()).await?;
    match step.object.as_deref() {
        Some(name) => {
            let value = cookies
                .iter()
                .find(|cookie| cookie.name == name)
                .map(|cookie| Value::String(cookie.value.clone()))
                .unwrap_or(Value::Null);
            let key = record_key(step, "cookie", collector, frame.index);
            collector.insert(key, value);
        }
        None => {
            let mut map = serde_json::Map::new();
            for cookie in cookies {
                map.insert(cookie.name, Value::String(cookie.value));
            }
            let key = record_key(step, "cookies", collector, frame.index);
            collector.insert(key, Value::Object(map));
        }
    }
    Ok(())
}

pub(crate) async fn set_cookies(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    frame: Frame<'_>,
) -> Result<(), EngineError> {
    let name = require_object(step, "setCookies")?;
    let value = require_value(step, "setCookies")?;
    let name = placeholders::resolve(name, collector, frame.index);
    let value = placeholders::resolve(value, collector, frame.index);
    let url = driver.current_url().await?;
    driver
        .set_cookie(Cookie {
            name,
            value,
            url: Some(url),
            ..Cookie::default()
        })
        .await?;
    Ok(())
}

pub(crate) async fn get_storage(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    frame: Frame<'_>,
    scope: StorageScope,
) -> Result<(), EngineError> {
    let fallback = match scope {
        StorageScope::Local => "localStorage",
        StorageScope::Session => "sessionStorage",
    };
    let value = driver.storage_get(scope, step.object.as_deref()).await?;
    let key = record_key(step, fallback, collector, frame.index);
    collector.insert(key, value);
    Ok(())
}

pub(crate) async fn set_storage(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    frame: Frame<'_>,
    scope: StorageScope,
) -> Result<(), EngineError> {
    let key = require_object(step, "storage set")?;
    let value = require_value(step, "storage set")?;
    let key = placeholders::resolve(key, collector, frame.index);
    let value = placeholders::resolve(value, collector, frame.index);
    driver.storage_set(scope, &key, &value).await?;
    Ok(())
}

pub(crate) async fn get_viewport(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    frame: Frame<'_>,
) -> Result<(), EngineError> {
    let viewport = driver.viewport().await?;
    let key = record_key(step, "viewportSize", collector, frame.index);
    collector.insert(
        key,
        json!({"width": viewport.width, "height": viewport.height}),
    );
    Ok(())
}

/// Accepts `1920x1080`, `1920,1080`, or `1920 1080`.
pub(crate) async fn set_viewport(driver: &dyn PageDriver, step: &Step) -> Result<(), EngineError> {
    let value = require_value(step, "setViewportSize")?;
    let viewport = parse_viewport(value).ok_or_else(|| EngineError::InvalidStep {
        id: step.id.clone(),
        reason: format!("invalid viewport size `{value}`, expected e.g. `1920x1080`"),
    })?;
    driver.set_viewport(viewport).await?;
    Ok(())
}

/// Screenshot the page or a target element. A missing target element
/// degrades to a full-page capture.
pub(crate) async fn screenshot(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    frame: Frame<'_>,
) -> Result<(), EngineError> {
    let raw_path = require_value(step, "screenshot")?;
    let path_str = placeholders::resolve_path(raw_path, collector, frame.index);
    let path = Path::new(&path_str);
    ensure_parent_dir(path).await?;

    match step.object.as_deref() {
        Some(selector) => {
            let value = placeholders::resolve(selector, collector, frame.index);
            let target = resolve::locator(frame.scope, step.object_type, &value);
            if driver.count(&target).await? == 0 {
                warn!(step = %step.id, selector = %target, "screenshot target not found, capturing full page");
                driver.screenshot(None, path, true).await?;
            } else {
                driver.screenshot(Some(&target), path, false).await?;
            }
        }
        None => {
            driver
                .screenshot(None, path, step.full_page.unwrap_or(false))
                .await?;
        }
    }

    if step.key.is_some() {
        let key = record_key(step, "screenshot", collector, frame.index);
        collector.insert(key, Value::String(path_str));
    }
    Ok(())
}

/// Standalone waitForSelector action. The outcome is recorded under the
/// step key (when set) before a failure is handed to the policy.
pub(crate) async fn wait_for_selector(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    frame: Frame<'_>,
) -> Result<(), EngineError> {
    let selector = require_object(step, "waitForSelector")?;
    let value = placeholders::resolve(selector, collector, frame.index);
    let target = resolve::locator(frame.scope, step.object_type, &value);
    let state = step
        .value
        .as_deref()
        .and_then(parse_wait_state)
        .unwrap_or_default();
    let timeout_ms = step.wait.unwrap_or(30_000);

    match driver.wait_for(&target, state, timeout_ms).await {
        Ok(()) => {
            debug!(step = %step.id, selector = %target, "selector settled");
            if step.key.is_some() {
                let key = record_key(step, "waited", collector, frame.index);
                collector.insert(key, Value::Bool(true));
            }
            Ok(())
        }
        Err(err) => {
            if step.key.is_some() {
                let key = record_key(step, "waited", collector, frame.index);
                collector.insert(key, Value::Bool(false));
            }
            Err(err.into())
        }
    }
}

/// Evaluate a script expression; the result lands under the step key. On
/// failure the key is nulled before the error reaches the policy.
pub(crate) async fn evaluate(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    frame: Frame<'_>,
) -> Result<(), EngineError> {
    let expression = require_value(step, "evaluate")?;
    let expression = placeholders::resolve(expression, collector, frame.index);
    match driver.evaluate(&expression).await {
        Ok(result) => {
            if step.key.is_some() {
                let key = record_key(step, "result", collector, frame.index);
                collector.insert(key, result);
            }
            Ok(())
        }
        Err(err) => {
            if step.key.is_some() {
                let key = record_key(step, "result", collector, frame.index);
                collector.insert(key, Value::Null);
            }
            Err(err.into())
        }
    }
}

fn parse_wait_until(value: &str) -> Option<WaitUntil> {
    match value {
        "load" => Some(WaitUntil::Load),
        "domcontentloaded" => Some(WaitUntil::DomContentLoaded),
        "networkidle" => Some(WaitUntil::NetworkIdle),
        "commit" => Some(WaitUntil::Commit),
        _ => None,
    }
}

fn parse_wait_state(value: &str) -> Option<WaitState> {
    match value {
        "visible" => Some(WaitState::Visible),
        "hidden" => Some(WaitState::Hidden),
        "attached" => Some(WaitState::Attached),
        "detached" => Some(WaitState::Detached),
        _ => None,
    }
}

fn parse_viewport(value: &str) -> Option<Viewport> {
    let normalized = value.replace(['x', ' '], ",");
    let mut parts = normalized.split(',').filter(|p| !p.is_empty());
    let width = parts.next()?.trim().parse().ok()?;
    let height = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Viewport { width, height })
}
