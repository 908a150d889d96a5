//! Zinc Viewer
//!
//! Headless front end for zinc scenes:
//! - HttpTransport: ureq for remote documents, the filesystem for the rest
//! - Fetcher: background fetching that feeds the metadata loader
//! - SceneReport: summary of a loaded and played scene

pub mod fetch;
pub mod report;

pub use fetch::*;
pub use report::*;
