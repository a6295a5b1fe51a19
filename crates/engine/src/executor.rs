//! Step execution: gating, retry, dispatch, and failure policy
//!
//! One step runs as: skipIf/onlyIf gating, random pre-action delay, then a
//! bounded-retry loop around the dispatched action (each attempt under the
//! step's timeout), a trailing fixed wait on success, and finally the
//! failure policy. `skipOnError` silences an error before
//! `terminateonerror` is consulted; the default is log-and-continue.

use crate::collector::Collector;
use crate::conditions::evaluate_condition;
use crate::errors::EngineError;
use crate::handlers;
use crate::placeholders;
use crate::resolve;
use crate::retry::RetryPolicy;
use crate::sink::ResultSink;
use async_recursion::async_recursion;
use rand::Rng;
use std::time::Duration;
use stepflow_driver::{Locator, PageDriver, StorageScope};
use stepflow_model::{ActionKind, RandomDelay, Step};
use tracing::{debug, warn};

/// Execution position: the enclosing foreach element (if any), the nearest
/// loop index, and the foreach nesting depth (0 = page level).
#[derive(Debug, Clone, Copy)]
pub(crate) struct Frame<'a> {
    pub scope: Option<&'a Locator>,
    pub index: Option<usize>,
    pub depth: usize,
}

impl Frame<'static> {
    pub fn root() -> Self {
        Self {
            scope: None,
            index: None,
            depth: 0,
        }
    }
}

/// How a step invocation ended, after the failure policy was applied.
#[derive(Debug)]
pub(crate) enum StepOutcome {
    Completed,
    /// Gated off by skipIf/onlyIf, or the error was silenced by
    /// `skipOnError`.
    Skipped,
    /// Failed, logged, and treated as a no-op (default policy).
    Failed(EngineError),
}

/// Execute one step under the full retry + failure policy.
#[async_recursion]
pub(crate) async fn execute_step(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    sink: &mut ResultSink<'_>,
    frame: Frame<'async_recursion>,
) -> Result<StepOutcome, EngineError> {
    debug!(step = %step.id, action = %step.action, "executing step");

    // skipIf is checked before onlyIf.
    if let Some(expression) = &step.skip_if {
        if evaluate_condition(driver, expression, collector, frame.index).await {
            debug!(step = %step.id, "skipping step (skipIf true)");
            return Ok(StepOutcome::Skipped);
        }
    }
    if let Some(expression) = &step.only_if {
        if !evaluate_condition(driver, expression, collector, frame.index).await {
            debug!(step = %step.id, "skipping step (onlyIf false)");
            return Ok(StepOutcome::Skipped);
        }
    }

    apply_random_delay(step.random_delay).await;

    let policy = RetryPolicy::from_step(step);
    let mut attempt: u32 = 0;
    let result = loop {
        match dispatch_timed(driver, step, collector, sink, frame).await {
            Ok(()) => break Ok(()),
            Err(err) => match policy.delay_before_retry(attempt) {
                Some(delay) => {
                    attempt += 1;
                    warn!(
                        step = %step.id,
                        attempt,
                        budget = policy.budget,
                        error = %err,
                        "step attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => break Err(err),
            },
        }
    };

    match result {
        Ok(()) => {
            if let Some(wait) = step.wait.filter(|w| *w > 0) {
                if trailing_wait_applies(step.action) {
                    tokio::time::sleep(Duration::from_millis(wait)).await;
                }
            }
            Ok(StepOutcome::Completed)
        }
        Err(err) => {
            if step.skips_on_error() {
                warn!(step = %step.id, error = %err, "step failed (skipOnError set), skipping");
                Ok(StepOutcome::Skipped)
            } else if step.terminates_on_error() {
                Err(err.for_step(&step.id, step.action.name()))
            } else {
                warn!(step = %step.id, error = %err, "step failed, continuing");
                Ok(StepOutcome::Failed(err))
            }
        }
    }
}

/// Execute a list of sibling steps in order. With `init` set, a failure
/// that the default policy would merely log aborts the run instead: init
/// steps are assumed prerequisite for everything after them.
pub(crate) async fn execute_step_list(
    driver: &dyn PageDriver,
    steps: &[Step],
    collector: &mut Collector,
    sink: &mut ResultSink<'_>,
    frame: Frame<'_>,
    init: bool,
) -> Result<(), EngineError> {
    for step in steps {
        match execute_step(driver, step, collector, sink, frame).await? {
            StepOutcome::Failed(err) if init => {
                return Err(err.for_step(&step.id, step.action.name()));
            }
            _ => {}
        }
    }
    Ok(())
}

/// One dispatch attempt under the step's own timeout.
async fn dispatch_timed(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    sink: &mut ResultSink<'_>,
    frame: Frame<'_>,
) -> Result<(), EngineError> {
    match step.timeout {
        Some(ms) => tokio::time::timeout(
            Duration::from_millis(ms),
            dispatch(driver, step, collector, sink, frame),
        )
        .await
        .map_err(|_| EngineError::ActionTimeout {
            step: step.id.clone(),
            ms,
        })?,
        None => dispatch(driver, step, collector, sink, frame).await,
    }
}

/// Map the step's action kind to its handler.
async fn dispatch(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &mut Collector,
    sink: &mut ResultSink<'_>,
    frame: Frame<'_>,
) -> Result<(), EngineError> {
    match step.action {
        ActionKind::Navigate => {
            let url = placeholders::resolve(
                step.value.as_deref().unwrap_or_default(),
                collector,
                frame.index,
            );
            if url.is_empty() {
                return Err(EngineError::InvalidStep {
                    id: step.id.clone(),
                    reason: "navigate requires a value URL".into(),
                });
            }
            driver
                .navigate(&url, step.wait_until.unwrap_or_default())
                .await?;
            Ok(())
        }
        ActionKind::Input => handlers::interact::input(driver, step, collector, frame).await,
        ActionKind::Click => handlers::interact::click(driver, step, collector, frame).await,
        ActionKind::Data => handlers::data::extract_data(driver, step, collector, frame).await,
        ActionKind::Scroll => handlers::page::scroll(driver, step, collector, frame).await,
        ActionKind::ForEach => handlers::loops::foreach(driver, step, collector, sink, frame).await,
        ActionKind::Open => handlers::loops::open(driver, step, collector, sink, frame).await,
        ActionKind::EventBaseDownload => {
            handlers::files::event_download(driver, step, collector, frame).await
        }
        ActionKind::SavePdf | ActionKind::PrintToPdf => {
            handlers::files::save_pdf(driver, step, collector, frame).await
        }
        ActionKind::DownloadPdf | ActionKind::DownloadFile => {
            handlers::files::download(driver, step, collector, frame).await
        }
        ActionKind::Reload => handlers::page::reload(driver, step).await,
        ActionKind::GetUrl => handlers::page::get_url(driver, step, collector, frame).await,
        ActionKind::GetTitle => handlers::page::get_title(driver, step, collector, frame).await,
        ActionKind::GetMeta => handlers::page::get_meta(driver, step, collector, frame).await,
        ActionKind::GetCookies => {
            handlers::page::get_cookies(driver, step, collector, frame).await
        }
        ActionKind::SetCookies => {
            handlers::page::set_cookies(driver, step, collector, frame).await
        }
        ActionKind::GetLocalStorage => {
            handlers::page::get_storage(driver, step, collector, frame, StorageScope::Local).await
        }
        ActionKind::SetLocalStorage => {
            handlers::page::set_storage(driver, step, collector, frame, StorageScope::Local).await
        }
        ActionKind::GetSessionStorage => {
            handlers::page::get_storage(driver, step, collector, frame, StorageScope::Session)
                .await
        }
        ActionKind::SetSessionStorage => {
            handlers::page::set_storage(driver, step, collector, frame, StorageScope::Session)
                .await
        }
        ActionKind::GetViewportSize => {
            handlers::page::get_viewport(driver, step, collector, frame).await
        }
        ActionKind::SetViewportSize => handlers::page::set_viewport(driver, step).await,
        ActionKind::Screenshot => {
            handlers::page::screenshot(driver, step, collector, frame).await
        }
        ActionKind::WaitForSelector => {
            handlers::page::wait_for_selector(driver, step, collector, frame).await
        }
        ActionKind::Evaluate => handlers::page::evaluate(driver, step, collector, frame).await,
    }
}

/// Auxiliary pre-action wait (`waitForSelector` on an element action). A
/// wait that never settles does not by itself fail the step.
pub(crate) async fn wait_for_aux_selector(
    driver: &dyn PageDriver,
    step: &Step,
    collector: &Collector,
    frame: Frame<'_>,
) {
    let Some(selector) = &step.wait_for_selector else {
        return;
    };
    let value = placeholders::resolve(selector, collector, frame.index);
    let target = resolve::locator(frame.scope, step.object_type, &value);
    let state = step.wait_for_selector_state.unwrap_or_default();
    let timeout_ms = step.wait_for_selector_timeout.unwrap_or(30_000);
    if let Err(err) = driver.wait_for(&target, state, timeout_ms).await {
        debug!(step = %step.id, error = %err, "auxiliary wait did not settle, continuing");
    }
}

async fn apply_random_delay(delay: Option<RandomDelay>) {
    let Some(RandomDelay { min, max }) = delay else {
        return;
    };
    if max <= min {
        return;
    }
    let ms = rand::thread_rng().gen_range(min..=max);
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

/// `wait` doubles as a timeout for foreach (attach wait) and the
/// waitForSelector action; everywhere else it is a trailing sleep.
fn trailing_wait_applies(action: ActionKind) -> bool {
    !matches!(action, ActionKind::ForEach | ActionKind::WaitForSelector)
}
