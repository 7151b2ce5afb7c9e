// src/pipeline/poll.rs

//! One pass over every monitored channel.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::error::{AppError, Result};
use crate::models::{HistoryEntry, MonitorConfig, MonitoredChannel};
use crate::pipeline::detect::ChangeDetector;
use crate::services::{Notifier, PageFetcher, SnapshotExtractor};
use crate::storage::ChannelStore;

/// Summary of a poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Channels attempted
    pub channels: usize,
    /// Channels abandoned because of an error
    pub failures: usize,
    /// Events raised and persisted
    pub events: usize,
    /// Notifications delivered
    pub notified: usize,
    /// Notifications that could not be delivered
    pub notify_failures: usize,
}

#[derive(Debug, Default)]
struct ChannelOutcome {
    events: usize,
    notified: usize,
    notify_failures: usize,
}

/// Drives fetch, extract, detect and notify for all channels.
pub struct PollCycle {
    fetcher: Arc<dyn PageFetcher>,
    store: Arc<dyn ChannelStore>,
    notifier: Arc<dyn Notifier>,
    extractor: SnapshotExtractor,
    detector: ChangeDetector,
    channel_delay: Duration,
    concurrency: usize,
}

impl PollCycle {
    /// Create a poll cycle with the given collaborators.
    pub fn new(
        config: &MonitorConfig,
        fetcher: Arc<dyn PageFetcher>,
        store: Arc<dyn ChannelStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let detector = if config.advance_disabled_categories {
            ChangeDetector::advancing_disabled()
        } else {
            ChangeDetector::new()
        };

        Self {
            fetcher,
            store,
            notifier,
            extractor: SnapshotExtractor::new(),
            detector,
            channel_delay: Duration::from_millis(config.channel_delay_ms),
            concurrency: config.max_concurrent.max(1),
        }
    }

    /// Run one cycle.
    ///
    /// Only a failure to list channels is returned; per-channel failures are
    /// logged and counted in the report.
    pub async fn run_once(&self) -> Result<CycleReport> {
        let channels = self.store.get_active_configs().await?;
        let mut report = CycleReport {
            channels: channels.len(),
            ..CycleReport::default()
        };
        if channels.is_empty() {
            return Ok(report);
        }

        log::info!("Checking {} channels", channels.len());

        let mut results = stream::iter(channels)
            .map(|channel| async move {
                let result = self.process_channel(&channel).await;
                (channel, result)
            })
            .buffer_unordered(self.concurrency);

        while let Some((channel, result)) = results.next().await {
            match result {
                Ok(outcome) => {
                    report.events += outcome.events;
                    report.notified += outcome.notified;
                    report.notify_failures += outcome.notify_failures;
                }
                Err(error) => {
                    report.failures += 1;
                    let name = &channel.config.youtube_name;
                    if error.is_transient() {
                        log::warn!("Skipping {name} this cycle: {error}");
                    } else {
                        log::error!("Failed to check {name}: {error}");
                    }
                }
            }

            if !self.channel_delay.is_zero() {
                tokio::time::sleep(self.channel_delay).await;
            }
        }

        log::info!(
            "Cycle done: {} channels, {} events, {} notified, {} failed",
            report.channels,
            report.events,
            report.notified,
            report.failures
        );
        Ok(report)
    }

    async fn process_channel(&self, channel: &MonitoredChannel) -> Result<ChannelOutcome> {
        let config = &channel.config;
        if !self.notifier.accepts(&config.destination) {
            return Err(AppError::Destination(config.destination.clone()));
        }

        let document = self.fetcher.fetch(&config.youtube_url).await?;
        let snapshot = self.extractor.extract(&document, &config.youtube_url);
        if snapshot.channel_id != config.youtube_id {
            log::debug!(
                "{}: page reports id {}, keeping stored id",
                config.youtube_name,
                snapshot.channel_id
            );
        }

        let detection = self
            .detector
            .detect(&snapshot, &channel.state, &config.notify);
        if !detection.has_changes() {
            log::debug!("{}: nothing new", config.youtube_name);
        }

        for update in &detection.silent_updates {
            if let Err(e) = self
                .store
                .update_category_state(&config.guild_id, &config.youtube_id, update)
                .await
            {
                log::warn!("{}: could not record {}: {e}", config.youtube_name, update.id);
            }
        }

        let mut outcome = ChannelOutcome::default();
        for event in &detection.events {
            // The event is only delivered once its state is durable.
            self.store
                .update_category_state(&config.guild_id, &config.youtube_id, &event.to_update())
                .await?;
            outcome.events += 1;

            let entry = HistoryEntry::from_event(&config.guild_id, &config.youtube_id, event);
            if let Err(e) = self.store.append_history(&entry).await {
                log::warn!("{}: history not recorded: {e}", config.youtube_name);
            }

            match self.notifier.notify(&config.destination, event).await {
                Ok(()) => {
                    log::info!("{} -> {}", event.summary(), config.destination);
                    outcome.notified += 1;
                }
                Err(e) => {
                    log::error!("{}: notification failed: {e}", config.youtube_name);
                    outcome.notify_failures += 1;
                }
            }
        }

        Ok(outcome)
    }
}
