//! Pagination ordering, bounds, and termination tests

mod support;

use stepflow_driver::stub::{StubBrowser, StubDriver, StubElement};
use stepflow_engine::run_templates;
use stepflow_model::{
    NextButtonConfig, PaginationConfig, PaginationStrategy, RunOptions, ScrollConfig,
    SelectorType, TabTemplate,
};

fn next_button() -> NextButtonConfig {
    NextButtonConfig {
        object_type: SelectorType::Id,
        object: "next".into(),
        wait: Some(5),
    }
}

fn titles(records: &[serde_json::Value]) -> Vec<String> {
    records
        .iter()
        .map(|r| r["title"].as_str().unwrap_or_default().to_string())
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_next_pagination_respects_max_pages() -> anyhow::Result<()> {
    support::init_tracing();
    let page = StubDriver::new();
    for (key, elements) in support::rows_dom(&["A1", "A2"]) {
        page.set_elements(key, elements);
    }
    page.set_elements("css=#next", vec![StubElement::text("next")]);

    let mut page2 = support::rows_dom(&["B1"]);
    page2.insert("css=#next".into(), vec![StubElement::text("next")]);
    page.queue_dom_on_click("css=#next", page2);

    let browser = StubBrowser::with_page(page.clone());
    let template = TabTemplate::new("paged")
        .with_per_page_steps(support::rows_per_page_steps())
        .with_pagination(PaginationConfig {
            strategy: PaginationStrategy::Next,
            next_button: Some(next_button()),
            max_pages: Some(2),
            ..PaginationConfig::default()
        });

    let records = run_templates(&browser, &[template], &RunOptions::default()).await?;
    // Two pages collected, exactly one advance, even though the next
    // button never stops resolving.
    assert_eq!(titles(&records), vec!["A1", "A2", "B1"]);
    assert_eq!(page.clicks().len(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_next_pagination_stops_when_button_disappears() -> anyhow::Result<()> {
    let page = StubDriver::new();
    for (key, elements) in support::rows_dom(&["A1"]) {
        page.set_elements(key, elements);
    }
    page.set_elements("css=#next", vec![StubElement::text("next")]);
    // The second page has no next button: collect-then-advance stops there.
    page.queue_dom_on_click("css=#next", support::rows_dom(&["B1"]));

    let browser = StubBrowser::with_page(page);
    let template = TabTemplate::new("paged")
        .with_per_page_steps(support::rows_per_page_steps())
        .with_pagination(PaginationConfig {
            strategy: PaginationStrategy::Next,
            next_button: Some(next_button()),
            ..PaginationConfig::default()
        });

    let records = run_templates(&browser, &[template], &RunOptions::default()).await?;
    assert_eq!(titles(&records), vec!["A1", "B1"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_pagination_first_advances_before_collecting() -> anyhow::Result<()> {
    let page = StubDriver::new();
    for (key, elements) in support::rows_dom(&["A1"]) {
        page.set_elements(key, elements);
    }
    page.set_elements("css=#next", vec![StubElement::text("next")]);
    page.queue_dom_on_click("css=#next", support::rows_dom(&["B1"]));

    let browser = StubBrowser::with_page(page.clone());
    let template = TabTemplate::new("paged")
        .with_per_page_steps(support::rows_per_page_steps())
        .with_pagination(PaginationConfig {
            strategy: PaginationStrategy::Next,
            next_button: Some(next_button()),
            max_pages: Some(2),
            pagination_first: true,
            ..PaginationConfig::default()
        });

    let records = run_templates(&browser, &[template], &RunOptions::default()).await?;
    // First cycle collects the landing page, second advances then collects.
    assert_eq!(titles(&records), vec!["A1", "B1"]);
    assert_eq!(page.clicks().len(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_pagination_first_stops_without_collecting_after_failed_advance() -> anyhow::Result<()>
{
    let page = StubDriver::new();
    for (key, elements) in support::rows_dom(&["A1"]) {
        page.set_elements(key, elements);
    }
    // No next button at all: the second cycle's advance fails immediately.
    let browser = StubBrowser::with_page(page);
    let template = TabTemplate::new("paged")
        .with_per_page_steps(support::rows_per_page_steps())
        .with_pagination(PaginationConfig {
            strategy: PaginationStrategy::Next,
            next_button: Some(next_button()),
            pagination_first: true,
            ..PaginationConfig::default()
        });

    let records = run_templates(&browser, &[template], &RunOptions::default()).await?;
    assert_eq!(titles(&records), vec!["A1"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_paginate_all_first_collects_exactly_once() -> anyhow::Result<()> {
    let page = StubDriver::new();
    for (key, elements) in support::rows_dom(&["R1", "R2"]) {
        page.set_elements(key, elements);
    }
    // One successful growth, then the height plateaus.
    page.set_heights(vec![1000, 1500, 1500, 1500]);

    let browser = StubBrowser::with_page(page.clone());
    let template = TabTemplate::new("infinite")
        .with_per_page_steps(support::rows_per_page_steps())
        .with_pagination(PaginationConfig {
            strategy: PaginationStrategy::Scroll,
            scroll: Some(ScrollConfig {
                offset: Some(800),
                delay: Some(5),
            }),
            paginate_all_first: true,
            ..PaginationConfig::default()
        });

    let records = run_templates(&browser, &[template], &RunOptions::default()).await?;
    // Collected once, after the last successful advance.
    assert_eq!(titles(&records), vec!["R1", "R2"]);
    assert_eq!(page.scrolls(), vec![800, 800]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_paginate_all_first_bounded_by_max_pages() -> anyhow::Result<()> {
    let page = StubDriver::new();
    for (key, elements) in support::rows_dom(&["R1"]) {
        page.set_elements(key, elements);
    }
    // Height keeps growing; only maxPages stops the advance loop.
    page.set_heights(vec![1000, 1100, 1200, 1300, 1400, 1500, 1600, 1700]);

    let browser = StubBrowser::with_page(page.clone());
    let template = TabTemplate::new("infinite")
        .with_per_page_steps(support::rows_per_page_steps())
        .with_pagination(PaginationConfig {
            strategy: PaginationStrategy::Scroll,
            scroll: Some(ScrollConfig {
                offset: Some(400),
                delay: Some(5),
            }),
            max_pages: Some(3),
            paginate_all_first: true,
            ..PaginationConfig::default()
        });

    let records = run_templates(&browser, &[template], &RunOptions::default()).await?;
    assert_eq!(records.len(), 1);
    assert_eq!(page.scrolls().len(), 3);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_scroll_pagination_stops_on_no_height_growth() -> anyhow::Result<()> {
    let page = StubDriver::new();
    for (key, elements) in support::rows_dom(&["A1", "A2"]) {
        page.set_elements(key, elements);
    }
    page.set_heights(vec![1000, 1000]);

    let browser = StubBrowser::with_page(page.clone());
    let template = TabTemplate::new("scrolled")
        .with_per_page_steps(support::rows_per_page_steps())
        .with_pagination(PaginationConfig {
            strategy: PaginationStrategy::Scroll,
            scroll: Some(ScrollConfig {
                offset: None,
                delay: Some(5),
            }),
            ..PaginationConfig::default()
        });

    let records = run_templates(&browser, &[template], &RunOptions::default()).await?;
    // One page cycle; the first advance sees no growth and stops.
    assert_eq!(titles(&records), vec!["A1", "A2"]);
    assert_eq!(page.scrolls(), vec![720]);
    Ok(())
}
