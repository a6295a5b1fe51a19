//! Shared scripting helpers for the engine integration tests
#![allow(dead_code)]

use stepflow_driver::stub::{Dom, StubDriver, StubElement};
use stepflow_model::{ActionKind, SelectorType, Step, TabTemplate};

/// Opt-in engine logging for a test run: `RUST_LOG=stepflow_engine=debug`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Rendered locator key for the n-th `.row` element.
pub fn row_key(index: usize) -> String {
    if index == 0 {
        "css=.row".to_string()
    } else {
        format!("css=.row#{index}")
    }
}

/// A DOM of `.row` elements, each with an `h2` title inside.
pub fn rows_dom(titles: &[&str]) -> Dom {
    let mut dom = Dom::new();
    dom.insert(
        "css=.row".into(),
        titles.iter().map(|t| StubElement::text(*t)).collect(),
    );
    for (index, title) in titles.iter().enumerate() {
        dom.insert(
            format!("{} >> css=h2", row_key(index)),
            vec![StubElement::text(*title)],
        );
    }
    dom
}

/// A page with three `.row` listings carrying an `h2` title and a
/// `.author` byline.
pub fn listing_page() -> StubDriver {
    let driver = StubDriver::new();
    driver.set_url("https://example.com/listing");
    let entries = [("First", "Ada"), ("Second", "Grace"), ("Third", "Edsger")];
    driver.set_elements(
        "css=.row",
        entries.iter().map(|(t, _)| StubElement::text(*t)).collect(),
    );
    for (index, (title, author)) in entries.into_iter().enumerate() {
        driver.set_elements(
            format!("{} >> css=h2", row_key(index)),
            vec![StubElement::text(title)],
        );
        driver.set_elements(
            format!("{} >> css=.author", row_key(index)),
            vec![StubElement::text(author)],
        );
    }
    driver
}

/// navigate + foreach(.row){ title, author } over [`listing_page`].
pub fn listing_template() -> TabTemplate {
    TabTemplate::new("listing").with_steps(vec![
        Step::new("nav", ActionKind::Navigate).with_value("https://example.com/listing"),
        Step::new("rows", ActionKind::ForEach)
            .with_target(SelectorType::Class, "row")
            .with_sub_steps(vec![
                Step::new("title", ActionKind::Data)
                    .with_target(SelectorType::Tag, "h2")
                    .with_key("title"),
                Step::new("author", ActionKind::Data)
                    .with_target(SelectorType::Class, "author")
                    .with_key("author"),
            ]),
    ])
}

/// foreach(.row){ title } as per-page steps for pagination tests.
pub fn rows_per_page_steps() -> Vec<Step> {
    vec![Step::new("rows", ActionKind::ForEach)
        .with_target(SelectorType::Class, "row")
        .with_sub_steps(vec![Step::new("title", ActionKind::Data)
            .with_target(SelectorType::Tag, "h2")
            .with_key("title")])]
}
