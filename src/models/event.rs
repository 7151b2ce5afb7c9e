//! Change events and notification history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::channel::{Category, CategoryUpdate};
use super::snapshot::{LiveInfo, ScheduledInfo, VideoInfo};

/// A newly observed item, raised at most once per id and category.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    NewLive {
        channel_id: String,
        channel_name: String,
        live: LiveInfo,
    },
    NewScheduled {
        channel_id: String,
        channel_name: String,
        scheduled: ScheduledInfo,
    },
    NewVideo {
        channel_id: String,
        channel_name: String,
        video: VideoInfo,
    },
}

impl ChangeEvent {
    pub fn category(&self) -> Category {
        match self {
            ChangeEvent::NewLive { .. } => Category::Live,
            ChangeEvent::NewScheduled { .. } => Category::Scheduled,
            ChangeEvent::NewVideo { .. } => Category::Video,
        }
    }

    /// The item carried by the event.
    pub fn item(&self) -> &VideoInfo {
        match self {
            ChangeEvent::NewLive { live, .. } => live,
            ChangeEvent::NewScheduled { scheduled, .. } => &scheduled.video,
            ChangeEvent::NewVideo { video, .. } => video,
        }
    }

    pub fn channel_name(&self) -> &str {
        match self {
            ChangeEvent::NewLive { channel_name, .. }
            | ChangeEvent::NewScheduled { channel_name, .. }
            | ChangeEvent::NewVideo { channel_name, .. } => channel_name,
        }
    }

    /// State fields this event advances.
    pub fn to_update(&self) -> CategoryUpdate {
        let item = self.item();
        let time = match self {
            ChangeEvent::NewScheduled { scheduled, .. } => Some(scheduled.scheduled_time.clone()),
            ChangeEvent::NewVideo { video, .. } => video.published.clone(),
            ChangeEvent::NewLive { .. } => None,
        };
        CategoryUpdate {
            category: self.category(),
            id: item.id.clone(),
            title: item.title.clone(),
            time,
        }
    }

    /// One-line plain-text summary.
    pub fn summary(&self) -> String {
        let item = self.item();
        match self {
            ChangeEvent::NewLive { channel_name, .. } => {
                format!("{channel_name} is live: {} ({})", item.title, item.url)
            }
            ChangeEvent::NewScheduled {
                channel_name,
                scheduled,
                ..
            } => format!(
                "{channel_name} scheduled a live for {}: {} ({})",
                scheduled.scheduled_time, item.title, item.url
            ),
            ChangeEvent::NewVideo { channel_name, .. } => {
                format!("{channel_name} posted a new video: {} ({})", item.title, item.url)
            }
        }
    }
}

/// A notification that was sent, kept for operators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    pub guild_id: String,
    pub youtube_id: String,
    pub item_id: String,
    pub title: String,
    pub category: Category,
    pub channel_name: String,
    pub notified_at: DateTime<Utc>,
}

impl HistoryEntry {
    pub fn from_event(guild_id: &str, youtube_id: &str, event: &ChangeEvent) -> Self {
        let item = event.item();
        Self {
            guild_id: guild_id.to_string(),
            youtube_id: youtube_id.to_string(),
            item_id: item.id.clone(),
            title: item.title.clone(),
            category: event.category(),
            channel_name: event.channel_name().to_string(),
            notified_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheduled_update_carries_time() {
        let event = ChangeEvent::NewScheduled {
            channel_id: "UC1".into(),
            channel_name: "Chan".into(),
            scheduled: ScheduledInfo {
                video: VideoInfo::new("s1", "Premiere"),
                scheduled_time: "2026-10-20T18:00:00+00:00".into(),
            },
        };
        let update = event.to_update();
        assert_eq!(update.category, Category::Scheduled);
        assert_eq!(update.id, "s1");
        assert_eq!(update.time.as_deref(), Some("2026-10-20T18:00:00+00:00"));
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = ChangeEvent::NewVideo {
            channel_id: "UC1".into(),
            channel_name: "Chan".into(),
            video: VideoInfo::new("v1", "First"),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "new_video");
        assert_eq!(json["video"]["id"], "v1");
    }

    #[test]
    fn test_history_from_event() {
        let event = ChangeEvent::NewLive {
            channel_id: "UC1".into(),
            channel_name: "Chan".into(),
            live: VideoInfo::new("l1", "Live now"),
        };
        let entry = HistoryEntry::from_event("g1", "UC1", &event);
        assert_eq!(entry.category, Category::Live);
        assert_eq!(entry.item_id, "l1");
        assert_eq!(entry.channel_name, "Chan");
    }
}
