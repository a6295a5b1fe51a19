//! Pagination: repeated page cycles under an advance strategy
//!
//! A failed advance is the normal way pagination ends; it never fails the
//! template. Ordering within a cycle is governed by the config flags:
//! collect-then-advance by default, advance-then-collect under
//! `paginationFirst` (from the second cycle), and advance-through-
//! everything-then-collect-once under `paginateAllFirst`.

use crate::collector::Collector;
use crate::errors::EngineError;
use crate::executor::{execute_step_list, Frame};
use crate::resolve;
use crate::sink::ResultSink;
use std::time::Duration;
use stepflow_driver::{ClickOptions, PageDriver};
use stepflow_model::{NormalizedTemplate, PaginationConfig, PaginationStrategy, Step};
use tracing::{debug, info, warn};

/// Run every page cycle of a normalized template. `base` is the run
/// collector (init-step results) each page scope is cloned from.
pub(crate) async fn run_pages(
    driver: &dyn PageDriver,
    template: &NormalizedTemplate,
    base: &Collector,
    sink: &mut ResultSink<'_>,
) -> Result<(), EngineError> {
    if let Some(config) = template.pagination.as_ref().filter(|c| c.paginate_all_first) {
        return paginate_all_first(driver, template, config, base, sink).await;
    }

    let mut page_index: u32 = 0;
    loop {
        debug!(page = page_index, "page cycle");
        let mut page_collector = base.child_scope();

        if let Some(config) = &template.pagination {
            if config.pagination_first && page_index > 0 && advance(driver, config).await.is_err() {
                break;
            }
        }

        execute_step_list(
            driver,
            &template.per_page_steps,
            &mut page_collector,
            sink,
            Frame::root(),
            false,
        )
        .await?;
        flush_page(&page_collector, &template.per_page_steps, sink).await;

        let Some(config) = &template.pagination else {
            debug!("no pagination configured, finishing after one cycle");
            break;
        };
        page_index += 1;
        if config.max_pages.is_some_and(|max| page_index >= max) {
            info!(pages = page_index, "pagination reached maxPages");
            break;
        }
        if !config.pagination_first && advance(driver, config).await.is_err() {
            break;
        }
    }
    Ok(())
}

/// `paginateAllFirst`: advance until the strategy is exhausted (or
/// maxPages advances happened), then collect once against the final page
/// state. For sites where content accumulates in one DOM.
async fn paginate_all_first(
    driver: &dyn PageDriver,
    template: &NormalizedTemplate,
    config: &PaginationConfig,
    base: &Collector,
    sink: &mut ResultSink<'_>,
) -> Result<(), EngineError> {
    let mut advanced: u32 = 0;
    loop {
        if config.max_pages.is_some_and(|max| advanced >= max) {
            break;
        }
        if advance(driver, config).await.is_err() {
            break;
        }
        advanced += 1;
    }
    info!(advanced, "paginateAllFirst advanced through all pages, collecting once");

    let mut page_collector = base.child_scope();
    execute_step_list(
        driver,
        &template.per_page_steps,
        &mut page_collector,
        sink,
        Frame::root(),
        false,
    )
    .await?;
    flush_page(&page_collector, &template.per_page_steps, sink).await;
    Ok(())
}

/// Emit the page-cycle record, unless a page-level foreach already emitted
/// per-element records for this cycle (or the cycle collected nothing).
async fn flush_page(page_collector: &Collector, steps: &[Step], sink: &mut ResultSink<'_>) {
    if steps.is_empty() || page_collector.has_items() || page_collector.is_empty() {
        return;
    }
    sink.emit(page_collector.snapshot()).await;
}

/// Attempt one page advance. `Err(AdvanceFailed)` is the terminal "no
/// further page" signal, never a template fault.
async fn advance(
    driver: &dyn PageDriver,
    config: &PaginationConfig,
) -> Result<(), EngineError> {
    match config.strategy {
        PaginationStrategy::Next => {
            let Some(button) = &config.next_button else {
                warn!("next-button pagination without a nextButton config");
                return Err(EngineError::AdvanceFailed);
            };
            let target = resolve::locator(None, Some(button.object_type), &button.object);
            match driver.count(&target).await {
                Ok(0) | Err(_) => {
                    debug!(selector = %target, "next button gone, stopping pagination");
                    return Err(EngineError::AdvanceFailed);
                }
                Ok(_) => {}
            }
            if let Err(err) = driver.click(&target, &ClickOptions::default()).await {
                debug!(selector = %target, error = %err, "next button click failed, stopping pagination");
                return Err(EngineError::AdvanceFailed);
            }
            tokio::time::sleep(Duration::from_millis(button.wait.unwrap_or(1000))).await;
            Ok(())
        }
        PaginationStrategy::Scroll => {
            let scroll = config.scroll.unwrap_or_default();
            let before = match driver.page_height().await {
                Ok(height) => height,
                Err(_) => return Err(EngineError::AdvanceFailed),
            };
            let offset = match scroll.offset {
                Some(offset) => offset,
                None => match driver.viewport().await {
                    Ok(viewport) => viewport.height as i64,
                    Err(_) => return Err(EngineError::AdvanceFailed),
                },
            };
            if driver.scroll_by(offset).await.is_err() {
                return Err(EngineError::AdvanceFailed);
            }
            tokio::time::sleep(Duration::from_millis(scroll.delay.unwrap_or(1000))).await;
            let after = driver.page_height().await.unwrap_or(before);
            if after > before {
                Ok(())
            } else {
                debug!(before, after, "no page-height growth after scroll, stopping pagination");
                Err(EngineError::AdvanceFailed)
            }
        }
    }
}
