//! Action handlers, one module per action family

pub(crate) mod data;
pub(crate) mod files;
pub(crate) mod interact;
pub(crate) mod loops;
pub(crate) mod page;

use crate::collector::Collector;
use crate::errors::EngineError;
use crate::placeholders;
use std::path::Path;
use stepflow_driver::{DriverError, PageDriver};
use stepflow_model::Step;
use url::Url;

/// The collector key a step stores under, with placeholders resolved (a
/// key inside a foreach may carry `{{i}}`).
pub(crate) fn record_key(
    step: &Step,
    fallback: &str,
    collector: &Collector,
    index: Option<usize>,
) -> String {
    placeholders::resolve(&step.collector_key(fallback), collector, index)
}

/// Create the parent directories of an artifact path.
pub(crate) async fn ensure_parent_dir(path: &Path) -> Result<(), EngineError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| EngineError::Driver(DriverError::Io(err.to_string())))?;
        }
    }
    Ok(())
}

/// Resolve a possibly-relative href against the page's current URL.
pub(crate) async fn absolutize(
    driver: &dyn PageDriver,
    href: &str,
) -> Result<String, EngineError> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Ok(href.to_string());
    }
    let current = driver.current_url().await?;
    let base = Url::parse(&current).map_err(|err| {
        EngineError::Driver(DriverError::Navigation(format!(
            "cannot resolve `{href}` against `{current}`: {err}"
        )))
    })?;
    let joined = base.join(href).map_err(|err| {
        EngineError::Driver(DriverError::Navigation(format!(
            "cannot resolve `{href}` against `{current}`: {err}"
        )))
    })?;
    Ok(joined.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepflow_driver::stub::StubDriver;

    #[tokio::test]
    async fn test_absolutize_joins_relative_href() {
        let driver = StubDriver::new();
        driver.set_url("https://example.com/reports/index.html");
        let joined = absolutize(&driver, "files/a.pdf").await.unwrap();
        assert_eq!(joined, "https://example.com/reports/files/a.pdf");
        let rooted = absolutize(&driver, "/top.pdf").await.unwrap();
        assert_eq!(rooted, "https://example.com/top.pdf");
    }

    #[tokio::test]
    async fn test_absolutize_keeps_absolute_href() {
        let driver = StubDriver::new();
        let href = "https://cdn.example.com/a.pdf";
        assert_eq!(absolutize(&driver, href).await.unwrap(), href);
    }
}
