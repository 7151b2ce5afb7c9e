//! Service layer for the monitor.
//!
//! This module contains the collaborators of a poll cycle:
//! - Page fetching (`PageFetcher`, `HttpFetcher`)
//! - Snapshot extraction (`SnapshotExtractor`)
//! - Notification delivery (`Notifier`, `LogNotifier`, `WebhookNotifier`)

pub mod extractor;
mod fetcher;
mod notifier;

pub use extractor::{SnapshotExtractor, extract_snapshot};
pub use fetcher::{HttpFetcher, PageFetcher};
pub use notifier::{LogNotifier, Notifier, WebhookNotifier, build_notifier};
