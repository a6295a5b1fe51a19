//! foreach and open-tab handlers

use crate::collector::Collector;
use crate::errors::EngineError;
use crate::executor::{execute_step, Frame};
use crate::placeholders;
use crate::resolve;
use crate::sink::ResultSink;
use stepflow_driver::{ExtractKind, PageDriver};
use stepflow_model::{Step, WaitState, WaitUntil};
use tracing::{debug, info, warn};

/// Run the step's children once per matched element.
///
/// Each iteration gets a child scope cloned from the parent collector and
/// runs against that element's subtree with the loop index bound for
/// `{{i}}`/`{{i_plus1}}`. Iteration results are stored back under
/// `item_<n>` and, at page level, emitted as records in element order.
/// Zero matches yield zero records, not an error.
pub(crate) async fn foreach(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    sink: &mut ResultSink<'_>,
    frame: Frame<'_>,
) -> Result<(), EngineError> {
    let selector = step.object.as_deref().unwrap_or_default();
    let selector = placeholders::resolve(selector, collector, frame.index);
    let base = resolve::locator(frame.scope, step.object_type, &selector);

    // Give the collection a chance to attach; a timeout just means we
    // count whatever is there.
    let attach_timeout = step.wait.unwrap_or(5000);
    if let Err(err) = driver
        .wait_for(&base, WaitState::Attached, attach_timeout)
        .await
    {
        debug!(step = %step.id, error = %err, "foreach collection did not attach in time");
    }

    let count = driver.count(&base).await?;
    info!(step = %step.id, selector = %base, count, "foreach resolved elements");

    for index in 0..count {
        let element = base.clone().nth(index);
        if step.auto_scroll() {
            if let Err(err) = driver.scroll_into_view(&element).await {
                debug!(step = %step.id, index, error = %err, "scroll into view failed, continuing");
            }
        }

        let mut item = collector.child_scope();
        for child in step.children() {
            execute_step(
                driver,
                child,
                &mut item,
                sink,
                Frame {
                    scope: Some(&element),
                    index: Some(index),
                    depth: frame.depth + 1,
                },
            )
            .await?;
        }

        let record = item.flatten_record();
        collector.insert_item(index, item.snapshot());
        // Only the outermost loop emits; nested iterations surface
        // through their parent's flattened record.
        if frame.depth == 0 {
            sink.emit(record).await;
        }
    }
    Ok(())
}

/// Open the link target in a fresh tab, run the children there against a
/// copy of the parent collector, merge the results back, and close the tab
/// on every path.
pub(crate) async fn open(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    sink: &mut ResultSink<'_>,
    frame: Frame<'_>,
) -> Result<(), EngineError> {
    let selector = step.object.as_deref().unwrap_or_default();
    let selector = placeholders::resolve(selector, collector, frame.index);
    let link = resolve::locator(frame.scope, step.object_type, &selector);
    if driver.count(&link).await? == 0 {
        warn!(step = %step.id, selector = %link, "open target not found, skipping");
        return Ok(());
    }

    let href = driver
        .extract(&link, &ExtractKind::Attribute("href".into()))
        .await?;
    let href = match href {
        Some(href) if !href.is_empty() && !href.starts_with("javascript") => href,
        _ => {
            return Err(EngineError::InvalidStep {
                id: step.id.clone(),
                reason: format!("open target `{link}` has no resolvable href"),
            })
        }
    };
    let url = crate::handlers::absolutize(driver, &href).await?;

    info!(step = %step.id, url = %url, "opening link in new tab");
    let tab = driver.open_tab().await?;
    let result = run_in_tab(tab.as_ref(), step, collector, sink, frame, &url).await;
    if let Err(err) = tab.close().await {
        warn!(step = %step.id, error = %err, "failed to close child tab");
    }
    result
}

async fn run_in_tab(
    tab: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    sink: &mut ResultSink<'_>,
    frame: Frame<'_>,
    url: &str,
) -> Result<(), EngineError> {
    tab.navigate(url, WaitUntil::NetworkIdle).await?;

    // The child tab sees the parent's data and folds its own back in.
    let mut inner = collector.clone();
    for child in step.children() {
        execute_step(
            tab,
            child,
            &mut inner,
            sink,
            Frame {
                scope: None,
                index: frame.index,
                depth: frame.depth,
            },
        )
        .await?;
    }
    collector.merge(inner);
    Ok(())
}
