// src/services/extractor/mod.rs

//! Snapshot extraction.
//!
//! Turns a channel page into a [`ChannelSnapshot`]. Strategies run in priority
//! order and each one only fills fields the previous ones left unset:
//!
//! 1. the embedded `ytInitialData` blob ([`blob`])
//! 2. ordered textual patterns ([`patterns`])
//! 3. identity synthesis, so `channel_id` is never empty
//!
//! Extraction never fails. Missing information shows up as unset fields.

mod blob;
mod patterns;

pub use blob::find_initial_data;
pub use patterns::{FieldMatcher, PLACEHOLDER_VIDEO_TITLE, Page, PatternSet, unescape_text};

use crate::models::{
    ChannelSnapshot, DEFAULT_CHANNEL_NAME, LiveInfo, MAX_RECENT_VIDEOS, ScheduledInfo, VideoInfo,
};
use crate::utils::short_hash;

/// Maximum characters of the channel name used in a synthesized id.
const SYNTHETIC_ID_NAME_CHARS: usize = 20;

/// Fields gathered so far, shared by all strategies.
#[derive(Debug, Default)]
struct Partial {
    channel_name: Option<String>,
    channel_id: Option<String>,
    is_live: bool,
    live_info: Option<LiveInfo>,
    scheduled_live: Option<ScheduledInfo>,
    latest_video: Option<VideoInfo>,
    recent_videos: Vec<VideoInfo>,
}

impl Partial {
    /// Append to `recent_videos`, skipping duplicates and respecting the cap.
    ///
    /// Returns `false` once the list is full.
    fn push_recent(&mut self, video: VideoInfo) -> bool {
        if self.recent_videos.len() >= MAX_RECENT_VIDEOS {
            return false;
        }
        if !self.recent_videos.iter().any(|v| v.id == video.id) {
            self.recent_videos.push(video);
        }
        true
    }

    fn finish(self, source_url: &str) -> ChannelSnapshot {
        let channel_id = self
            .channel_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| synthesize_id(self.channel_name.as_deref(), source_url));

        ChannelSnapshot {
            channel_name: self
                .channel_name
                .unwrap_or_else(|| DEFAULT_CHANNEL_NAME.to_string()),
            channel_id,
            channel_url: source_url.to_string(),
            is_live: self.is_live,
            live_info: self.live_info,
            scheduled_live: self.scheduled_live,
            latest_video: self.latest_video,
            recent_videos: self.recent_videos,
        }
    }
}

/// Deterministic identity for a channel whose id could not be recovered.
fn synthesize_id(name: Option<&str>, source_url: &str) -> String {
    let sanitized: String = name
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(SYNTHETIC_ID_NAME_CHARS)
        .collect();

    if sanitized.is_empty() {
        format!("custom_{}", short_hash(source_url))
    } else {
        format!("custom_{sanitized}")
    }
}

/// Layered extractor for channel pages.
#[derive(Default)]
pub struct SnapshotExtractor {
    patterns: PatternSet,
}

impl SnapshotExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract a snapshot from `document`, fetched from `source_url`.
    pub fn extract(&self, document: &str, source_url: &str) -> ChannelSnapshot {
        let mut partial = Partial::default();

        match find_initial_data(document) {
            Some(data) => blob::apply(&data, &mut partial),
            None => log::debug!("{source_url}: no structured blob, using patterns only"),
        }

        let page = Page::new(document);
        self.patterns.apply(&page, source_url, &mut partial);

        let snapshot = partial.finish(source_url);
        log::debug!(
            "{source_url}: extracted '{}' ({}), live={}, latest={:?}",
            snapshot.channel_name,
            snapshot.channel_id,
            snapshot.is_live,
            snapshot.latest_video.as_ref().map(|v| v.id.as_str())
        );
        snapshot
    }
}

/// Extract with the default pattern set.
///
/// Convenience wrapper around [`SnapshotExtractor::extract`].
pub fn extract_snapshot(document: &str, source_url: &str) -> ChannelSnapshot {
    SnapshotExtractor::new().extract(document, source_url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MAX_TITLE_CHARS;

    const URL: &str = "https://www.youtube.com/@example";

    #[test]
    fn test_bare_watch_link_gives_placeholder_video() {
        let doc = r#"<html><body><a href="/watch?v=abcDEF12345">watch</a></body></html>"#;
        let snapshot = extract_snapshot(doc, URL);

        let latest = snapshot.latest_video.unwrap();
        assert_eq!(latest.id, "abcDEF12345");
        assert_eq!(latest.title, PLACEHOLDER_VIDEO_TITLE);
        assert_eq!(latest.url, "https://youtu.be/abcDEF12345");
    }

    #[test]
    fn test_blob_wins_over_patterns() {
        let doc = concat!(
            r#"<html><head><meta property="og:title" content="Pattern Name"></head>"#,
            r#"<body><script>var ytInitialData = {"metadata":{"channelMetadataRenderer":"#,
            r#"{"title":"Blob Name","externalId":"UCblob"}},"items":[{"videoRenderer":"#,
            r#"{"videoId":"blobvid","title":{"runs":[{"text":"From blob"}]}}}]};</script>"#,
            r#"{"channelId":"UCpattern"} <a href="/watch?v=patternvid">x</a></body></html>"#
        );
        let snapshot = extract_snapshot(doc, URL);

        assert_eq!(snapshot.channel_name, "Blob Name");
        assert_eq!(snapshot.channel_id, "UCblob");
        assert_eq!(snapshot.latest_video.unwrap().id, "blobvid");
    }

    #[test]
    fn test_patterns_fill_gaps_left_by_blob() {
        let doc = concat!(
            r#"<html><head><meta property="og:title" content="Pattern Name"></head>"#,
            r#"<script>var ytInitialData = {"items":[{"videoRenderer":"#,
            r#"{"videoId":"v1","title":{"simpleText":"Only video"}}}]};</script></html>"#
        );
        let snapshot = extract_snapshot(doc, URL);

        assert_eq!(snapshot.channel_name, "Pattern Name");
        assert_eq!(snapshot.channel_id, "@example");
        assert_eq!(snapshot.latest_video.unwrap().id, "v1");
    }

    #[test]
    fn test_malformed_blob_falls_through() {
        let doc = concat!(
            r#"<script>var ytInitialData = {"broken": ;</script>"#,
            r#"<meta property="og:title" content="Still Found">"#
        );
        let snapshot = extract_snapshot(doc, URL);
        assert_eq!(snapshot.channel_name, "Still Found");
    }

    #[test]
    fn test_identity_synthesized_from_name() {
        let doc = r#"<meta property="og:title" content="Só Música & Mais Coisas Legais!">"#;
        let snapshot = extract_snapshot(doc, "https://example.com/somewhere");

        assert_eq!(snapshot.channel_id, "custom_SMsicaMaisCoisasLega");
    }

    #[test]
    fn test_identity_keeps_ascii_only() {
        let doc = r#"<meta property="og:title" content="Canal Ação Música">"#;
        let snapshot = extract_snapshot(doc, "https://example.com/somewhere");

        assert_eq!(snapshot.channel_name, "Canal Ação Música");
        assert_eq!(snapshot.channel_id, "custom_CanalAoMsica");
        assert!(snapshot.channel_id.is_ascii());
    }

    #[test]
    fn test_identity_from_non_latin_name_uses_url_hash() {
        let url = "https://example.com/somewhere";
        let doc = r#"<meta property="og:title" content="音楽チャンネル">"#;
        let snapshot = extract_snapshot(doc, url);

        assert_eq!(snapshot.channel_id, format!("custom_{}", short_hash(url)));
    }

    #[test]
    fn test_push_recent_dedup_and_cap() {
        let mut partial = Partial::default();
        assert!(partial.push_recent(VideoInfo::new("a", "A")));
        assert!(partial.push_recent(VideoInfo::new("a", "A again")));
        for id in ["b", "c", "d", "e"] {
            partial.push_recent(VideoInfo::new(id, id));
        }
        assert_eq!(partial.recent_videos.len(), MAX_RECENT_VIDEOS);
        assert!(!partial.push_recent(VideoInfo::new("f", "F")));
        assert_eq!(partial.recent_videos[0].title, "A");
    }

    #[test]
    fn test_identity_synthesized_from_url_is_deterministic() {
        let url = "https://example.com/nothing";
        let first = extract_snapshot("<html></html>", url);
        let second = extract_snapshot("<html></html>", url);

        assert_eq!(first.channel_name, DEFAULT_CHANNEL_NAME);
        assert!(first.channel_id.starts_with("custom_"));
        assert_eq!(first.channel_id, second.channel_id);
        assert_ne!(
            first.channel_id,
            extract_snapshot("<html></html>", "https://example.com/other").channel_id
        );
    }

    #[test]
    fn test_long_title_truncated() {
        let title = "x".repeat(150);
        let doc = format!(
            r#"<script>var ytInitialData = {{"v":{{"videoId":"long","title":{{"simpleText":"{title}"}}}}}};</script>"#
        );
        let snapshot = extract_snapshot(&doc, URL);

        let latest = snapshot.latest_video.unwrap();
        assert_eq!(latest.title.chars().count(), MAX_TITLE_CHARS + 3);
        assert!(latest.title.ends_with("..."));
        assert_eq!(&latest.title[..MAX_TITLE_CHARS], &title[..MAX_TITLE_CHARS]);
    }

    #[test]
    fn test_empty_document() {
        let snapshot = extract_snapshot("", URL);
        assert_eq!(snapshot.channel_id, "@example");
        assert!(!snapshot.is_live);
        assert!(snapshot.latest_video.is_none());
        assert!(snapshot.recent_videos.is_empty());
    }
}
