// src/services/notifier.rs

//! Notification sinks for change events.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ChangeEvent, NotifierKind};

/// Destination for change events.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one event to `destination`.
    async fn notify(&self, destination: &str, event: &ChangeEvent) -> Result<()>;

    /// Whether `destination` can receive events at all.
    ///
    /// Checked before a channel is fetched so a missing destination costs no request.
    fn accepts(&self, destination: &str) -> bool {
        !destination.trim().is_empty()
    }
}

/// Writes every event to the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, destination: &str, event: &ChangeEvent) -> Result<()> {
        log::info!("[{destination}] {}", event.summary());
        Ok(())
    }
}

/// Embed colour per event kind.
fn embed_color(event: &ChangeEvent) -> u32 {
    match event {
        ChangeEvent::NewLive { .. } => 0xFF0000,
        ChangeEvent::NewScheduled { .. } => 0xFFA500,
        ChangeEvent::NewVideo { .. } => 0x00FF00,
    }
}

#[derive(Debug, Serialize)]
struct WebhookImage {
    url: String,
}

#[derive(Debug, Serialize)]
struct WebhookEmbed {
    title: String,
    description: String,
    url: String,
    color: u32,
    timestamp: String,
    image: WebhookImage,
}

/// Chat-webhook message: a plain line plus one rich embed.
///
/// The raw event is included so generic receivers need not parse the embed.
#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
    content: String,
    embeds: Vec<WebhookEmbed>,
    event: &'a ChangeEvent,
}

impl<'a> WebhookMessage<'a> {
    fn from_event(event: &'a ChangeEvent) -> Self {
        let item = event.item();
        let channel = event.channel_name();
        let (title, description) = match event {
            ChangeEvent::NewLive { .. } => (format!("{channel} is live!"), item.title.clone()),
            ChangeEvent::NewScheduled { scheduled, .. } => (
                format!("{channel} scheduled a live"),
                format!("{}\nStarts: {}", item.title, scheduled.scheduled_time),
            ),
            ChangeEvent::NewVideo { video, .. } => (
                format!("{channel} posted a new video"),
                match &video.published {
                    Some(published) => format!("{}\nPublished: {published}", item.title),
                    None => item.title.clone(),
                },
            ),
        };

        Self {
            content: event.summary(),
            embeds: vec![WebhookEmbed {
                title,
                description,
                url: item.url.clone(),
                color: embed_color(event),
                timestamp: chrono::Utc::now().to_rfc3339(),
                image: WebhookImage {
                    url: item.thumbnail_url.clone(),
                },
            }],
            event,
        }
    }
}

/// POSTs events as JSON to a webhook URL given as the destination.
#[derive(Clone)]
pub struct WebhookNotifier {
    client: Client,
}

impl WebhookNotifier {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, destination: &str, event: &ChangeEvent) -> Result<()> {
        let url = Url::parse(destination).map_err(|e| AppError::notify(destination, e))?;

        let response = self
            .client
            .post(url)
            .json(&WebhookMessage::from_event(event))
            .send()
            .await
            .map_err(|e| AppError::notify(destination, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::notify(
                destination,
                format!("webhook returned {status}"),
            ));
        }
        Ok(())
    }

    fn accepts(&self, destination: &str) -> bool {
        Url::parse(destination).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
    }
}

/// Build the sink selected in configuration.
pub fn build_notifier(kind: NotifierKind, client: Client) -> Arc<dyn Notifier> {
    match kind {
        NotifierKind::Log => Arc::new(LogNotifier),
        NotifierKind::Webhook => Arc::new(WebhookNotifier::new(client)),
    }
}
