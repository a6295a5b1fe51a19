//! Step-execution engine
//!
//! Interprets a declarative template tree against a live browser session
//! through the abstract [`stepflow_driver`] seam, producing an ordered
//! sequence of structured records. Execution is single cooperative flow
//! per template: depth-first, left-to-right, index ascending.
//!
//! ```no_run
//! use stepflow_engine::model::{ActionKind, RunOptions, SelectorType, Step, TabTemplate};
//! use stepflow_engine::run_templates;
//!
//! # async fn example(browser: &dyn stepflow_engine::driver::BrowserDriver) -> anyhow::Result<()> {
//! let template = TabTemplate::new("listing").with_steps(vec![
//!     Step::new("nav", ActionKind::Navigate).with_value("https://example.com"),
//!     Step::new("title", ActionKind::Data)
//!         .with_target(SelectorType::Tag, "h1")
//!         .with_key("title"),
//! ]);
//! let records = run_templates(browser, &[template], &RunOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

mod conditions;
mod executor;
mod extract;
mod handlers;
mod pagination;
mod resolve;
mod retry;

pub mod collector;
pub mod errors;
pub mod placeholders;
pub mod runner;
pub mod sink;

pub use collector::Collector;
pub use errors::EngineError;
pub use runner::{run_templates, run_templates_streaming};
pub use sink::{on_result_fn, OnResult, Record};

// Re-exported for downstream convenience.
pub use stepflow_driver as driver;
pub use stepflow_model as model;
