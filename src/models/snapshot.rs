//! Channel snapshot produced by the extractor.

use serde::{Deserialize, Serialize};

/// Longest title kept before truncation.
pub const MAX_TITLE_CHARS: usize = 100;

/// Most entries kept in `recent_videos`.
pub const MAX_RECENT_VIDEOS: usize = 5;

/// Placeholder used when no channel name could be recovered.
pub const DEFAULT_CHANNEL_NAME: &str = "YouTube channel";

/// Truncate a title to [`MAX_TITLE_CHARS`] characters, appending `...` when cut.
pub fn truncate_title(title: &str) -> String {
    if title.chars().count() > MAX_TITLE_CHARS {
        let mut cut: String = title.chars().take(MAX_TITLE_CHARS).collect();
        cut.push_str("...");
        cut
    } else {
        title.to_string()
    }
}

/// A single platform item (upload or broadcast).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VideoInfo {
    /// Platform item identifier
    pub id: String,

    /// Display title, at most 100 characters plus `...`
    pub title: String,

    /// Short watch URL
    pub url: String,

    /// Thumbnail image URL
    pub thumbnail_url: String,

    /// Relative publish text as shown on the page ("2 hours ago")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<String>,
}

impl VideoInfo {
    /// Build an item with the platform's default URL and thumbnail.
    pub fn new(id: impl Into<String>, title: &str) -> Self {
        let id = id.into();
        Self {
            url: format!("https://youtu.be/{id}"),
            thumbnail_url: format!("https://img.youtube.com/vi/{id}/maxresdefault.jpg"),
            title: truncate_title(title),
            published: None,
            id,
        }
    }

    /// Replace the default thumbnail.
    pub fn with_thumbnail(mut self, thumbnail_url: impl Into<String>) -> Self {
        self.thumbnail_url = thumbnail_url.into();
        self
    }

    /// Attach publish text.
    pub fn with_published(mut self, published: impl Into<String>) -> Self {
        self.published = Some(published.into());
        self
    }
}

/// A live broadcast currently on air.
pub type LiveInfo = VideoInfo;

/// A broadcast announced for a future time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduledInfo {
    #[serde(flatten)]
    pub video: VideoInfo,

    /// Start time, RFC 3339 when the page gives an epoch timestamp
    pub scheduled_time: String,
}

/// Point-in-time extraction of a channel page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelSnapshot {
    pub channel_name: String,

    /// Stable identifier; never empty once extraction finishes
    pub channel_id: String,

    /// Page the snapshot was extracted from
    pub channel_url: String,

    pub is_live: bool,

    pub live_info: Option<LiveInfo>,

    pub scheduled_live: Option<ScheduledInfo>,

    pub latest_video: Option<VideoInfo>,

    /// Newest first, at most [`MAX_RECENT_VIDEOS`]
    pub recent_videos: Vec<VideoInfo>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_long_title() {
        let title = "a".repeat(150);
        let cut = truncate_title(&title);
        assert_eq!(cut.chars().count(), 103);
        assert!(cut.starts_with(&"a".repeat(100)));
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn test_truncate_keeps_short_title() {
        let title = "é".repeat(100);
        assert_eq!(truncate_title(&title), title);
    }

    #[test]
    fn test_video_info_defaults() {
        let video = VideoInfo::new("abc123DEF45", "Hello");
        assert_eq!(video.url, "https://youtu.be/abc123DEF45");
        assert_eq!(
            video.thumbnail_url,
            "https://img.youtube.com/vi/abc123DEF45/maxresdefault.jpg"
        );
        assert_eq!(video.published, None);
    }
}
