//! Structured-blob strategy.
//!
//! Channel pages embed their render tree as a `ytInitialData` JSON assignment.
//! The tree is walked iteratively with an explicit stack so deeply nested
//! documents cannot exhaust the call stack.

use chrono::DateTime;
use serde_json::{Map, Value};

use super::Partial;
use crate::models::{ScheduledInfo, VideoInfo};

/// Assignments that introduce the blob.
const BLOB_MARKERS: &[&str] = &[
    "var ytInitialData",
    "window[\"ytInitialData\"]",
    "window['ytInitialData']",
];

/// Media sub-trees that are large and never carry identity or item data.
const SKIPPED_KEYS: &[&str] = &["thumbnail", "thumbnails", "avatar", "image", "banner"];

/// Renderers whose `title` is the channel's own name.
const CHANNEL_HEADER_KEYS: &[&str] = &[
    "channelMetadataRenderer",
    "c4TabbedHeaderRenderer",
    "microformatDataRenderer",
    "pageHeaderViewModel",
];

/// Badge styles marking a broadcast as on air.
const LIVE_STYLES: &[&str] = &["LIVE", "BADGE_STYLE_TYPE_LIVE_NOW"];

/// Locate and parse the embedded blob.
///
/// Returns `None` when no marker is present or the value after it is not a
/// well-formed JSON object.
pub fn find_initial_data(document: &str) -> Option<Value> {
    for marker in BLOB_MARKERS {
        let mut search_from = 0;
        while let Some(pos) = document[search_from..].find(marker) {
            let after = search_from + pos + marker.len();
            search_from = after;

            let rest = document[after..].trim_start();
            let Some(rest) = rest.strip_prefix('=') else {
                continue;
            };

            let mut values =
                serde_json::Deserializer::from_str(rest.trim_start()).into_iter::<Value>();
            match values.next() {
                Some(Ok(value)) if value.is_object() => return Some(value),
                Some(Err(e)) => log::debug!("ytInitialData present but malformed: {e}"),
                _ => {}
            }
        }
    }
    None
}

/// Text of a `title`-like field: first styled run, or `simpleText`.
fn rich_text(value: &Value) -> Option<&str> {
    let obj = value.as_object()?;
    if let Some(runs) = obj.get("runs").and_then(Value::as_array) {
        return runs
            .iter()
            .find_map(|run| run.get("text").and_then(Value::as_str));
    }
    obj.get("simpleText").and_then(Value::as_str)
}

/// Text of a field that may also be a plain string.
fn any_text(value: &Value) -> Option<&str> {
    value.as_str().or_else(|| rich_text(value))
}

fn non_empty(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn video_id(node: &Map<String, Value>) -> Option<&str> {
    node.get("videoId")
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

/// Build an item from a node carrying `videoId`.
fn video_from(node: &Map<String, Value>) -> Option<VideoInfo> {
    let id = video_id(node)?;
    let title = node.get("title").and_then(any_text).unwrap_or_default();
    let mut video = VideoInfo::new(id, title);
    if let Some(published) = node.get("publishedTimeText").and_then(rich_text) {
        video = video.with_published(published);
    }
    Some(video)
}

fn is_live_marker(node: &Map<String, Value>) -> bool {
    node.get("isLive").and_then(Value::as_bool) == Some(true)
        || node
            .get("style")
            .and_then(Value::as_str)
            .is_some_and(|style| LIVE_STYLES.contains(&style))
}

/// Epoch seconds become RFC 3339; anything else is kept verbatim.
pub(super) fn format_start_time(raw: &str) -> String {
    raw.parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| raw.to_string())
}

fn scheduled_from(node: &Map<String, Value>) -> Option<ScheduledInfo> {
    let start = node
        .get("upcomingEventData")?
        .get("startTime")
        .and_then(Value::as_str)?;
    Some(ScheduledInfo {
        video: video_from(node)?,
        scheduled_time: format_start_time(start),
    })
}

struct Frame<'a> {
    value: &'a Value,
    key: Option<&'a str>,
    /// Nearest node (self or ancestor) that carries a `videoId`
    video: Option<&'a Map<String, Value>>,
}

/// Fill unset fields of `partial` from the blob.
pub(super) fn apply(data: &Value, partial: &mut Partial) {
    let mut header_name: Option<String> = None;
    let mut header_id: Option<String> = None;
    let mut generic_name: Option<String> = None;
    let mut generic_id: Option<String> = None;

    let mut stack = vec![Frame {
        value: data,
        key: None,
        video: None,
    }];

    while let Some(frame) = stack.pop() {
        match frame.value {
            Value::Object(node) => {
                let is_video = video_id(node).is_some();
                let video_ctx = if is_video { Some(node) } else { frame.video };

                if frame.key.is_some_and(|k| CHANNEL_HEADER_KEYS.contains(&k)) {
                    if header_name.is_none() {
                        header_name = node.get("title").and_then(any_text).and_then(non_empty);
                    }
                    if header_id.is_none() {
                        header_id = node
                            .get("externalId")
                            .and_then(Value::as_str)
                            .and_then(non_empty);
                    }
                }

                if !is_video && generic_name.is_none() {
                    generic_name = node.get("title").and_then(rich_text).and_then(non_empty);
                }

                if generic_id.is_none() {
                    generic_id = node
                        .get("channelId")
                        .and_then(Value::as_str)
                        .and_then(non_empty)
                        .or_else(|| {
                            node.get("browseId")
                                .and_then(Value::as_str)
                                .filter(|id| id.contains("UC"))
                                .and_then(non_empty)
                        });
                }

                if is_live_marker(node) {
                    partial.is_live = true;
                    if partial.live_info.is_none() {
                        partial.live_info = video_ctx.and_then(video_from);
                    }
                }

                if partial.scheduled_live.is_none() {
                    partial.scheduled_live = scheduled_from(node);
                }

                if is_video && node.contains_key("title") {
                    if let Some(video) = video_from(node) {
                        if partial.latest_video.is_none() {
                            partial.latest_video = Some(video.clone());
                        }
                        partial.push_recent(video);
                    }
                }

                for (key, child) in node.iter().rev() {
                    if SKIPPED_KEYS.contains(&key.as_str()) || !child_may_matter(child) {
                        continue;
                    }
                    stack.push(Frame {
                        value: child,
                        key: Some(key.as_str()),
                        video: video_ctx,
                    });
                }
            }
            Value::Array(items) => {
                for item in items.iter().rev() {
                    if child_may_matter(item) {
                        stack.push(Frame {
                            value: item,
                            key: frame.key,
                            video: frame.video,
                        });
                    }
                }
            }
            _ => {}
        }
    }

    if partial.channel_name.is_none() {
        partial.channel_name = header_name.or(generic_name);
    }
    if partial.channel_id.is_none() {
        partial.channel_id = header_id.or(generic_id);
    }
}

fn child_may_matter(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::Array(_))
}
