//! Abstract browser-automation seam
//!
//! The engine never talks to a concrete browser; it talks to the
//! [`PageDriver`] capability set defined here. A real implementation wraps
//! an automation library (CDP, WebDriver, ...); the `stub` feature provides
//! a scripted in-memory driver for tests.

pub mod driver;
pub mod errors;
#[cfg(any(test, feature = "stub"))]
pub mod stub;
pub mod types;

pub use driver::{BrowserDriver, BrowserSession, PageDriver};
pub use errors::DriverError;
pub use types::{
    ClickOptions, Cookie, ExtractKind, Locator, MouseButton, Query, StorageScope, Viewport,
};
