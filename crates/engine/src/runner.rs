//! Template runner: sessions, init steps, pagination hand-off, results
//!
//! Templates run strictly in order, each against its own page. The
//! browser session is closed on every exit path, including a
//! terminateonerror unwind.

use crate::collector::Collector;
use crate::errors::EngineError;
use crate::executor::{execute_step_list, Frame};
use crate::pagination;
use crate::sink::{OnResult, Record, ResultSink};
use stepflow_driver::{BrowserDriver, BrowserSession, PageDriver};
use stepflow_model::{normalize, validate_template, NormalizedTemplate, RunOptions, TabTemplate};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Run templates and return every produced record after the whole run
/// completes.
pub async fn run_templates(
    browser: &dyn BrowserDriver,
    templates: &[TabTemplate],
    options: &RunOptions,
) -> Result<Vec<Record>, EngineError> {
    run_with(browser, templates, options, None).await
}

/// Run templates, invoking `on_result` with `(record, index)` as each
/// record is produced. The streamed order equals the returned batch order.
pub async fn run_templates_streaming<'a>(
    browser: &dyn BrowserDriver,
    templates: &[TabTemplate],
    options: &RunOptions,
    on_result: OnResult<'a>,
) -> Result<Vec<Record>, EngineError> {
    run_with(browser, templates, options, Some(on_result)).await
}

async fn run_with(
    browser: &dyn BrowserDriver,
    templates: &[TabTemplate],
    options: &RunOptions,
    on_result: Option<OnResult<'_>>,
) -> Result<Vec<Record>, EngineError> {
    for template in templates {
        validate_template(template)?;
    }

    let mut sink = ResultSink::new(on_result);
    let session = browser.launch(&options.browser).await?;
    let result = run_session(session.as_ref(), templates, &mut sink).await;
    if let Err(err) = session.close().await {
        warn!(error = %err, "failed to close browser session");
    }
    result?;
    Ok(sink.into_records())
}

async fn run_session(
    session: &dyn BrowserSession,
    templates: &[TabTemplate],
    sink: &mut ResultSink<'_>,
) -> Result<(), EngineError> {
    for template in templates {
        let normalized = normalize(template);
        let span = info_span!(
            "template",
            tab = %normalized.name,
            run_id = %Uuid::new_v4(),
        );
        let page = session.new_page().await?;
        let before = sink.len();
        let result = run_template(page.as_ref(), &normalized, sink)
            .instrument(span)
            .await;
        if let Err(err) = page.close().await {
            warn!(tab = %normalized.name, error = %err, "failed to close page");
        }
        result?;
        info!(
            tab = %normalized.name,
            records = sink.len() - before,
            "template finished"
        );
    }
    Ok(())
}

async fn run_template(
    driver: &dyn PageDriver,
    template: &NormalizedTemplate,
    sink: &mut ResultSink<'_>,
) -> Result<(), EngineError> {
    let mut run_collector = Collector::new();
    if !template.init_steps.is_empty() {
        info!(steps = template.init_steps.len(), "running init steps");
        execute_step_list(
            driver,
            &template.init_steps,
            &mut run_collector,
            sink,
            Frame::root(),
            true,
        )
        .await?;
    }
    pagination::run_pages(driver, template, &run_collector, sink).await
}
