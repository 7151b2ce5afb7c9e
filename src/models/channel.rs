//! Monitored channel configuration and persisted detection state.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Recently recorded ids kept per category.
pub const SEEN_IDS_CAPACITY: usize = 25;

/// Independent detection track of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Video,
    Live,
    Scheduled,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Live, Category::Scheduled, Category::Video];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Video => "video",
            Category::Live => "live",
            Category::Scheduled => "scheduled",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "video" | "videos" => Ok(Category::Video),
            "live" | "lives" => Ok(Category::Live),
            "scheduled" | "schedule" => Ok(Category::Scheduled),
            other => Err(AppError::validation(format!("unknown category '{other}'"))),
        }
    }
}

/// Per-category notification switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifySettings {
    #[serde(default = "enabled")]
    pub videos: bool,
    #[serde(default = "enabled")]
    pub lives: bool,
    #[serde(default = "enabled")]
    pub scheduled: bool,
}

fn enabled() -> bool {
    true
}

impl Default for NotifySettings {
    fn default() -> Self {
        Self {
            videos: true,
            lives: true,
            scheduled: true,
        }
    }
}

impl NotifySettings {
    pub fn is_enabled(&self, category: Category) -> bool {
        match category {
            Category::Video => self.videos,
            Category::Live => self.lives,
            Category::Scheduled => self.scheduled,
        }
    }

    pub fn set(&mut self, category: Category, on: bool) {
        match category {
            Category::Video => self.videos = on,
            Category::Live => self.lives = on,
            Category::Scheduled => self.scheduled = on,
        }
    }

    pub fn any_enabled(&self) -> bool {
        self.videos || self.lives || self.scheduled
    }
}

/// A channel monitored on behalf of one guild.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Owning guild/server
    pub guild_id: String,

    /// Where notifications go (chat channel id or webhook URL)
    pub destination: String,

    pub youtube_url: String,

    pub youtube_name: String,

    /// Stable channel identifier, immutable once stored
    pub youtube_id: String,

    #[serde(default)]
    pub notify: NotifySettings,

    #[serde(default = "enabled")]
    pub active: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_by: Option<String>,

    /// When the channel was (re)added
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    /// Last write to this row's state or settings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_check: Option<DateTime<Utc>>,
}

impl ChannelConfig {
    /// A fresh, active config with every category enabled.
    pub fn new(
        guild_id: impl Into<String>,
        destination: impl Into<String>,
        youtube_url: impl Into<String>,
        youtube_name: impl Into<String>,
        youtube_id: impl Into<String>,
    ) -> Self {
        Self {
            guild_id: guild_id.into(),
            destination: destination.into(),
            youtube_url: youtube_url.into(),
            youtube_name: youtube_name.into(),
            youtube_id: youtube_id.into(),
            notify: NotifySettings::default(),
            active: true,
            added_by: None,
            created_at: Utc::now(),
            last_check: None,
        }
    }

    /// Whether `ident` names this channel: part of its id, or a
    /// case-insensitive part of its name.
    pub fn matches_ident(&self, ident: &str) -> bool {
        let ident = ident.trim();
        if ident.is_empty() {
            return false;
        }
        self.youtube_id.contains(ident)
            || self
                .youtube_name
                .to_lowercase()
                .contains(&ident.to_lowercase())
    }
}

/// Field values written when a category advances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryUpdate {
    pub category: Category,
    pub id: String,
    pub title: String,
    pub time: Option<String>,
}

/// Durable "last seen" record of a channel.
///
/// Empty strings mean nothing has been recorded yet.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ChannelState {
    pub last_video_id: String,
    pub last_video_title: String,
    pub last_video_time: String,
    pub last_live_id: String,
    pub last_live_title: String,
    pub scheduled_live_id: String,
    pub scheduled_live_title: String,
    pub scheduled_live_time: String,

    seen_video_ids: VecDeque<String>,
    seen_live_ids: VecDeque<String>,
    seen_scheduled_ids: VecDeque<String>,
}

impl ChannelState {
    /// Last recorded id for a category.
    pub fn last_id(&self, category: Category) -> &str {
        match category {
            Category::Video => &self.last_video_id,
            Category::Live => &self.last_live_id,
            Category::Scheduled => &self.scheduled_live_id,
        }
    }

    /// Whether `id` was recorded for the category, now or recently.
    pub fn has_seen(&self, category: Category, id: &str) -> bool {
        self.last_id(category) == id || self.seen(category).iter().any(|s| s == id)
    }

    /// State as it would be after recording `updates` in order.
    #[cfg(test)]
    pub(crate) fn from_updates<'a>(updates: impl IntoIterator<Item = &'a CategoryUpdate>) -> Self {
        let mut state = Self::default();
        for update in updates {
            state.record(update);
        }
        state
    }

    fn seen(&self, category: Category) -> &VecDeque<String> {
        match category {
            Category::Video => &self.seen_video_ids,
            Category::Live => &self.seen_live_ids,
            Category::Scheduled => &self.seen_scheduled_ids,
        }
    }

    fn seen_mut(&mut self, category: Category) -> &mut VecDeque<String> {
        match category {
            Category::Video => &mut self.seen_video_ids,
            Category::Live => &mut self.seen_live_ids,
            Category::Scheduled => &mut self.seen_scheduled_ids,
        }
    }

    /// Advance a category to a newly observed item.
    ///
    /// Empty ids are ignored so a category never moves back to "unset".
    pub fn record(&mut self, update: &CategoryUpdate) {
        if update.id.is_empty() {
            return;
        }
        match update.category {
            Category::Video => {
                self.last_video_id = update.id.clone();
                self.last_video_title = update.title.clone();
                self.last_video_time = update.time.clone().unwrap_or_default();
            }
            Category::Live => {
                self.last_live_id = update.id.clone();
                self.last_live_title = update.title.clone();
            }
            Category::Scheduled => {
                self.scheduled_live_id = update.id.clone();
                self.scheduled_live_title = update.title.clone();
                self.scheduled_live_time = update.time.clone().unwrap_or_default();
            }
        }

        let seen = self.seen_mut(update.category);
        if !seen.iter().any(|s| s == &update.id) {
            seen.push_front(update.id.clone());
            seen.truncate(SEEN_IDS_CAPACITY);
        }
    }
}

/// A config row together with its state, as read from the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonitoredChannel {
    pub config: ChannelConfig,
    #[serde(default)]
    pub state: ChannelState,
}
