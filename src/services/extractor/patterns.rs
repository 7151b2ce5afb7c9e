//! Pattern-fallback strategy.
//!
//! Each field has an ordered chain of matchers. A matcher is a pure function of
//! the page; the first acceptable result wins. For the video list the first
//! matcher yielding anything wins exclusively, results are never merged.

use std::cell::OnceCell;

use regex::Regex;
use scraper::{Html, Selector};

use super::Partial;
use super::blob::format_start_time;
use crate::models::{ScheduledInfo, VideoInfo};
use crate::utils::channel_id_from_url;

/// Title given to an item found only through a bare watch link.
pub const PLACEHOLDER_VIDEO_TITLE: &str = "Recent video";

const BRAND: &str = "YouTube";
const BRAND_SUFFIX: &str = " - YouTube";

/// Raw document plus a lazily parsed DOM for selector-based matchers.
pub struct Page<'a> {
    text: &'a str,
    html: OnceCell<Html>,
}

impl<'a> Page<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            html: OnceCell::new(),
        }
    }

    pub fn text(&self) -> &'a str {
        self.text
    }

    pub fn html(&self) -> &Html {
        self.html.get_or_init(|| Html::parse_document(self.text))
    }
}

/// One technique for recovering a field from a page.
pub trait FieldMatcher: Send + Sync {
    type Output;

    fn find(&self, page: &Page<'_>) -> Option<Self::Output>;
}

type Chain<T> = Vec<Box<dyn FieldMatcher<Output = T>>>;

/// Undo the JSON string escapes that survive in raw page text.
pub fn unescape_text(s: &str) -> String {
    s.replace("\\\"", "\"")
        .replace("\\u0026", "&")
        .replace("\\/", "/")
}

fn unescape_url(s: &str) -> String {
    s.replace("\\u0026", "&").replace("&amp;", "&")
}

/// Compile patterns, logging and dropping any that fail.
fn compile(pattern: &str) -> Option<Regex> {
    Regex::new(pattern)
        .map_err(|e| log::error!("Invalid extraction pattern {pattern:?}: {e}"))
        .ok()
}

/// First capture group of the first match.
pub struct CaptureMatcher {
    regex: Regex,
}

impl CaptureMatcher {
    pub fn new(pattern: &str) -> Option<Self> {
        compile(pattern).map(|regex| Self { regex })
    }
}

impl FieldMatcher for CaptureMatcher {
    type Output = String;

    fn find(&self, page: &Page<'_>) -> Option<String> {
        let caps = self.regex.captures(page.text())?;
        Some(caps.get(1)?.as_str().to_string())
    }
}

/// Attribute of the first element matching a CSS selector.
pub struct AttrMatcher {
    selector: &'static str,
    attr: &'static str,
}

impl AttrMatcher {
    pub fn new(selector: &'static str, attr: &'static str) -> Self {
        Self { selector, attr }
    }
}

impl FieldMatcher for AttrMatcher {
    type Output = String;

    fn find(&self, page: &Page<'_>) -> Option<String> {
        let selector = Selector::parse(self.selector).ok()?;
        let element = page.html().select(&selector).next()?;
        element.value().attr(self.attr).map(str::to_string)
    }
}

/// A single item from one match: an id group and a title group.
pub struct ItemMatcher {
    regex: Regex,
    id_group: usize,
    title_group: usize,
}

impl ItemMatcher {
    pub fn new(pattern: &str, id_group: usize, title_group: usize) -> Option<Self> {
        compile(pattern).map(|regex| Self {
            regex,
            id_group,
            title_group,
        })
    }
}

impl FieldMatcher for ItemMatcher {
    type Output = VideoInfo;

    fn find(&self, page: &Page<'_>) -> Option<VideoInfo> {
        let caps = self.regex.captures(page.text())?;
        let id = caps.get(self.id_group)?.as_str();
        let title = caps.get(self.title_group)?.as_str();
        Some(VideoInfo::new(id, &unescape_text(title)))
    }
}

/// Every match of a pattern yielding id, title and thumbnail.
pub struct ItemListMatcher {
    regex: Regex,
    id_group: usize,
    title_group: usize,
    thumbnail_group: usize,
}

impl ItemListMatcher {
    pub fn new(
        pattern: &str,
        id_group: usize,
        title_group: usize,
        thumbnail_group: usize,
    ) -> Option<Self> {
        compile(pattern).map(|regex| Self {
            regex,
            id_group,
            title_group,
            thumbnail_group,
        })
    }
}

impl FieldMatcher for ItemListMatcher {
    type Output = Vec<VideoInfo>;

    fn find(&self, page: &Page<'_>) -> Option<Vec<VideoInfo>> {
        let items: Vec<VideoInfo> = self
            .regex
            .captures_iter(page.text())
            .filter_map(|caps| {
                let id = caps.get(self.id_group)?.as_str();
                let title = caps.get(self.title_group)?.as_str();
                let mut video = VideoInfo::new(id, &unescape_text(title));
                if let Some(thumb) = caps.get(self.thumbnail_group) {
                    video = video.with_thumbnail(unescape_url(thumb.as_str()));
                }
                Some(video)
            })
            .collect();
        (!items.is_empty()).then_some(items)
    }
}

/// An upcoming-event start time paired with the closest preceding video id.
pub struct UpcomingMatcher {
    marker: Regex,
    video_id: Regex,
    title: Regex,
}

impl UpcomingMatcher {
    pub fn new() -> Option<Self> {
        Some(Self {
            marker: compile(r#""upcomingEventData":\{"startTime":"(\d+)""#)?,
            video_id: compile(r#""videoId":"([\w-]+)""#)?,
            title: compile(r#""title":\{(?:"runs":\[\{"text"|"simpleText"):"((?:[^"\\]|\\.)+)""#)?,
        })
    }
}

impl FieldMatcher for UpcomingMatcher {
    type Output = ScheduledInfo;

    fn find(&self, page: &Page<'_>) -> Option<ScheduledInfo> {
        let text = page.text();
        let caps = self.marker.captures(text)?;
        let marker_start = caps.get(0)?.start();
        let start_time = caps.get(1)?.as_str();

        let before = &text[..marker_start];
        let id_caps = self.video_id.captures_iter(before).last()?;
        let id_match = id_caps.get(1)?;
        let window = &before[id_match.end()..];
        let title = self
            .title
            .captures(window)
            .and_then(|c| c.get(1))
            .map(|m| unescape_text(m.as_str()))
            .unwrap_or_default();

        Some(ScheduledInfo {
            video: VideoInfo::new(id_match.as_str(), &title),
            scheduled_time: format_start_time(start_time),
        })
    }
}

/// First bare `watch?v=` link in the document.
pub struct WatchLinkMatcher {
    regex: Regex,
}

impl WatchLinkMatcher {
    pub fn new() -> Option<Self> {
        compile(r"watch\?v=([\w-]+)").map(|regex| Self { regex })
    }
}

impl FieldMatcher for WatchLinkMatcher {
    type Output = VideoInfo;

    fn find(&self, page: &Page<'_>) -> Option<VideoInfo> {
        let caps = self.regex.captures(page.text())?;
        Some(VideoInfo::new(caps.get(1)?.as_str(), PLACEHOLDER_VIDEO_TITLE))
    }
}

fn push<M>(chain: &mut Chain<M::Output>, matcher: Option<M>)
where
    M: FieldMatcher + 'static,
{
    if let Some(m) = matcher {
        chain.push(Box::new(m));
    }
}

fn first_accepted<T>(
    chain: &Chain<T>,
    page: &Page<'_>,
    accept: impl Fn(&T) -> bool,
) -> Option<T> {
    chain
        .iter()
        .filter_map(|m| m.find(page))
        .find(|value| accept(value))
}

/// The ordered matcher chains for every field.
pub struct PatternSet {
    names: Chain<String>,
    ids: Chain<String>,
    live_markers: Vec<Regex>,
    live_details: Chain<VideoInfo>,
    scheduled: Chain<ScheduledInfo>,
    video_lists: Chain<Vec<VideoInfo>>,
    simple_video: Chain<VideoInfo>,
}

impl Default for PatternSet {
    fn default() -> Self {
        let mut names: Chain<String> = Vec::new();
        names.push(Box::new(AttrMatcher::new(
            r#"meta[property="og:title"]"#,
            "content",
        )));
        names.push(Box::new(AttrMatcher::new(r#"meta[name="title"]"#, "content")));
        push(&mut names, CaptureMatcher::new(r"(?i)<title>([^<]+) - YouTube</title>"));
        push(&mut names, CaptureMatcher::new(r#"(?i)"author":"((?:[^"\\]|\\.)+)""#));
        push(&mut names, CaptureMatcher::new(r#"(?i)"channelName":"((?:[^"\\]|\\.)+)""#));
        push(
            &mut names,
            CaptureMatcher::new(r#"(?i)"title":"([^"]+)"[^}]*"canonicalBaseUrl":"/@[^"]+""#),
        );
        push(
            &mut names,
            CaptureMatcher::new(r#"(?i)"c4TabbedHeaderRenderer":\{[^}]*?"title":"([^"]+)""#),
        );

        let mut ids: Chain<String> = Vec::new();
        push(&mut ids, CaptureMatcher::new(r#""channelId":"([^"]+)""#));
        push(&mut ids, CaptureMatcher::new(r#""browseId":"([^"]+)""#));
        push(
            &mut ids,
            CaptureMatcher::new(
                r#"<link rel="canonical" href="https://www\.youtube\.com/channel/([^"]+)""#,
            ),
        );
        push(&mut ids, CaptureMatcher::new(r#""externalId":"([^"]+)""#));
        push(&mut ids, CaptureMatcher::new(r#"data-channel-external-id="([^"]+)""#));

        let live_markers = [
            r#"(?i)"isLive":true"#,
            r#"(?i)"isLiveBroadcast":true"#,
            r#"(?i)"style":"LIVE""#,
            r#"(?i)"badges":\[[^\]]*"live"[^\]]*\]"#,
            r#"(?i)<span[^>]*aria-label="[^"]*AO VIVO[^"]*""#,
            r#"(?i)<span[^>]*class="[^"]*badge-style-type-live[^"]*""#,
            r#"(?i)<link[^>]*content="https://www\.youtube\.com/watch\?v=[^"]*"[^>]*type="application/x\+youtube-live-message""#,
        ]
        .iter()
        .filter_map(|p| compile(p))
        .collect();

        let mut live_details: Chain<VideoInfo> = Vec::new();
        push(
            &mut live_details,
            ItemMatcher::new(
                r#"(?i)"videoId":"([^"]+)"[^}]*"title":\{"runs":\[\{"text":"([^"]+)""#,
                1,
                2,
            ),
        );
        push(
            &mut live_details,
            ItemMatcher::new(
                r#"(?i)"videoId":"([^"]+)"[^}]*"title":\{"simpleText":"([^"]+)""#,
                1,
                2,
            ),
        );
        push(
            &mut live_details,
            ItemMatcher::new(
                r#"(?i)watch\?v=([^"&]+)[^>]*title="([^"]+)"[^>]*aria-label="[^"]*AO VIVO"#,
                1,
                2,
            ),
        );
        push(
            &mut live_details,
            ItemMatcher::new(
                r#"(?i)<meta property="og:title" content="([^"]*AO VIVO[^"]*)"[^>]*>\s*<meta property="og:url" content="[^"]*v=([^"&]+)""#,
                2,
                1,
            ),
        );

        let mut scheduled: Chain<ScheduledInfo> = Vec::new();
        push(&mut scheduled, UpcomingMatcher::new());

        let mut video_lists: Chain<Vec<VideoInfo>> = Vec::new();
        push(
            &mut video_lists,
            ItemListMatcher::new(
                r#"(?i)"videoId":"([^"]+)"[^}]*"title":\{"runs":\[\{"text":"((?:[^"\\]|\\.)+)"\}\]\}[^}]*"thumbnail":\{"thumbnails":\[\{"url":"([^"]+)""#,
                1,
                2,
                3,
            ),
        );
        push(
            &mut video_lists,
            ItemListMatcher::new(
                r#"(?i)"videoId":"([^"]+)"[^}]*"title":\{"simpleText":"((?:[^"\\]|\\.)+)"\}[^}]*"thumbnail":\{"thumbnails":\[\{"url":"([^"]+)""#,
                1,
                2,
                3,
            ),
        );
        push(
            &mut video_lists,
            ItemListMatcher::new(
                r#"(?i)<a[^>]*href="/watch\?v=([^"&]+)"[^>]*title="([^"]+)"[^>]*><img[^>]*src="([^"]+)""#,
                1,
                2,
                3,
            ),
        );
        push(
            &mut video_lists,
            ItemListMatcher::new(
                r#"(?i)"videoId":"([^"]+)","thumbnail":\{"thumbnails":\[\{"url":"([^"]+)"[^\]]*\]\},"title":\{"runs":\[\{"text":"([^"]+)""#,
                1,
                3,
                2,
            ),
        );

        let mut simple_video: Chain<VideoInfo> = Vec::new();
        push(&mut simple_video, WatchLinkMatcher::new());

        Self {
            names,
            ids,
            live_markers,
            live_details,
            scheduled,
            video_lists,
            simple_video,
        }
    }
}

/// A channel name is usable if it has substance and is not the site's own title.
fn acceptable_name(name: &str) -> bool {
    let name = name.trim();
    name.chars().count() > 2 && !name.contains(BRAND)
}

fn clean_name(name: &str) -> String {
    unescape_text(name.trim().trim_end_matches(BRAND_SUFFIX)).trim().to_string()
}

/// Canonical ids carry the `UC` prefix; handles start with `@`.
fn acceptable_id(id: &str) -> bool {
    id.contains("UC") || id.starts_with('@')
}

impl PatternSet {
    /// Fill unset fields of `partial` from textual patterns.
    pub(super) fn apply(&self, page: &Page<'_>, source_url: &str, partial: &mut Partial) {
        if partial.channel_name.is_none() {
            partial.channel_name = first_accepted(&self.names, page, |n: &String| acceptable_name(n))
                .map(|n| clean_name(&n));
        }

        if partial.channel_id.is_none() {
            partial.channel_id = first_accepted(&self.ids, page, |id: &String| acceptable_id(id))
                .or_else(|| channel_id_from_url(source_url));
        }

        if !partial.is_live {
            partial.is_live = self.live_markers.iter().any(|re| re.is_match(page.text()));
        }

        if partial.is_live && partial.live_info.is_none() {
            partial.live_info = first_accepted(&self.live_details, page, |_| true);
        }

        if partial.scheduled_live.is_none() {
            partial.scheduled_live = first_accepted(&self.scheduled, page, |_| true);
        }

        if partial.latest_video.is_none() {
            if let Some(videos) = first_accepted(&self.video_lists, page, |_| true) {
                for video in videos {
                    if partial.latest_video.is_none() {
                        partial.latest_video = Some(video.clone());
                    }
                    if !partial.push_recent(video) {
                        break;
                    }
                }
            }
        }

        if partial.latest_video.is_none() {
            partial.latest_video = first_accepted(&self.simple_video, page, |_| true);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(doc: &str, url: &str) -> Partial {
        let mut partial = Partial::default();
        PatternSet::default().apply(&Page::new(doc), url, &mut partial);
        partial
    }

    #[test]
    fn test_all_patterns_compile() {
        let set = PatternSet::default();
        assert_eq!(set.names.len(), 7);
        assert_eq!(set.ids.len(), 5);
        assert_eq!(set.live_markers.len(), 7);
        assert_eq!(set.live_details.len(), 4);
        assert_eq!(set.scheduled.len(), 1);
        assert_eq!(set.video_lists.len(), 4);
        assert_eq!(set.simple_video.len(), 1);
    }

    #[test]
    fn test_name_and_id_acceptance() {
        assert!(acceptable_name("  Cool Channel "));
        assert!(!acceptable_name("ab"));
        assert!(!acceptable_name("Something - YouTube"));
        assert!(acceptable_id("UCabc"));
        assert!(acceptable_id("@handle"));
        assert!(!acceptable_id("handle"));
    }

    #[test]
    fn test_name_from_og_meta() {
        let doc = r#"<html><head><meta property="og:title" content="Cool Channel"></head></html>"#;
        let partial = run(doc, "https://youtube.com/@cool");
        assert_eq!(partial.channel_name.as_deref(), Some("Cool Channel"));
    }

    #[test]
    fn test_name_skips_brand_and_short_values() {
        let doc = concat!(
            r#"<html><head><meta property="og:title" content="YouTube">"#,
            r#"<meta name="title" content="AB">"#,
            r#"<title>YouTube</title></head></html>"#,
            r#"<script>{"author":"Author Name"}</script>"#
        );
        let partial = run(doc, "https://youtube.com/@x");
        assert_eq!(partial.channel_name.as_deref(), Some("Author Name"));
    }

    #[test]
    fn test_name_from_title_tag_strips_brand() {
        let doc = "<html><head><title>Real Name - YouTube</title></head></html>";
        let partial = run(doc, "https://youtube.com/@x");
        assert_eq!(partial.channel_name.as_deref(), Some("Real Name"));
    }

    #[test]
    fn test_name_unescapes_quotes() {
        let doc = r#"{"channelName":"The \"Best\" Channel"}"#;
        let partial = run(doc, "https://youtube.com/@x");
        assert_eq!(partial.channel_name.as_deref(), Some(r#"The "Best" Channel"#));
    }

    #[test]
    fn test_id_requires_canonical_shape() {
        let doc = r#"{"channelId":"xyz"} {"browseId":"FEwhat"} {"externalId":"UCreal"}"#;
        let partial = run(doc, "https://youtube.com/@x");
        assert_eq!(partial.channel_id.as_deref(), Some("UCreal"));
    }

    #[test]
    fn test_id_falls_back_to_url_shape() {
        let partial = run("<html></html>", "https://www.youtube.com/c/SomeName");
        assert_eq!(partial.channel_id.as_deref(), Some("c_SomeName"));
    }

    #[test]
    fn test_live_marker_and_details() {
        let doc = r#"{"isLiveBroadcast":true} {"videoId":"liveABC","x":1,"title":{"runs":[{"text":"Streaming now"}]}}"#;
        let partial = run(doc, "https://youtube.com/@x");
        assert!(partial.is_live);
        let live = partial.live_info.unwrap();
        assert_eq!(live.id, "liveABC");
        assert_eq!(live.title, "Streaming now");
    }

    #[test]
    fn test_no_live_details_when_not_live() {
        let doc = r#"{"videoId":"v1","title":{"runs":[{"text":"Regular"}]}}"#;
        let partial = run(doc, "https://youtube.com/@x");
        assert!(!partial.is_live);
        assert!(partial.live_info.is_none());
    }

    #[test]
    fn test_video_list_first_pattern_wins_and_caps() {
        // Thumbnail-first layout only the last pattern understands.
        let mut doc = String::from(
            r#"{"videoId":"other","thumbnail":{"thumbnails":[{"url":"x","width":1}]},"title":{"runs":[{"text":"Other"}]}}"#,
        );
        for i in 0..7 {
            doc.push_str(&format!(
                r#"{{"videoId":"vid{i}","title":{{"runs":[{{"text":"Video {i}"}}]}},"thumbnail":{{"thumbnails":[{{"url":"https://i.ytimg.com/vi/vid{i}/hq.jpg?a=1\u0026b=2"}}]}}}}"#
            ));
        }

        let partial = run(&doc, "https://youtube.com/@x");
        assert_eq!(partial.recent_videos.len(), 5);
        assert!(partial.recent_videos.iter().all(|v| v.id != "other"));
        let latest = partial.latest_video.unwrap();
        assert_eq!(latest.id, "vid0");
        assert_eq!(latest.title, "Video 0");
        assert_eq!(latest.thumbnail_url, "https://i.ytimg.com/vi/vid0/hq.jpg?a=1&b=2");
    }

    #[test]
    fn test_video_list_thumbnail_first_layout() {
        let doc = r#"{"videoId":"tf1","thumbnail":{"thumbnails":[{"url":"https://t/1.jpg","width":1},{"url":"https://t/2.jpg"}]},"title":{"runs":[{"text":"Thumb First"}]}}"#;
        let partial = run(doc, "https://youtube.com/@x");
        let latest = partial.latest_video.unwrap();
        assert_eq!(latest.id, "tf1");
        assert_eq!(latest.title, "Thumb First");
        assert_eq!(latest.thumbnail_url, "https://t/1.jpg");
    }

    #[test]
    fn test_video_title_truncated() {
        let title = "t".repeat(150);
        let doc = format!(
            r#"<a class="v" href="/watch?v=abc" title="{title}"><img src="https://img/abc.jpg"></a>"#
        );
        let partial = run(&doc, "https://youtube.com/@x");
        let latest = partial.latest_video.unwrap();
        assert_eq!(latest.title, format!("{}...", "t".repeat(100)));
        assert_eq!(latest.thumbnail_url, "https://img/abc.jpg");
    }

    #[test]
    fn test_simple_watch_link_fallback() {
        let doc = r#"<a href="/watch?v=dQw4w9WgXcQ&t=1">x</a> <a href="/watch?v=second">"#;
        let partial = run(doc, "https://youtube.com/@x");
        let latest = partial.latest_video.unwrap();
        assert_eq!(latest.id, "dQw4w9WgXcQ");
        assert_eq!(latest.title, PLACEHOLDER_VIDEO_TITLE);
        assert!(partial.recent_videos.is_empty());
    }

    #[test]
    fn test_upcoming_pairs_with_preceding_video() {
        let doc = concat!(
            r#"{"videoId":"old","title":{"simpleText":"Old"}},"#,
            r#"{"videoId":"soon1","thumbnail":{"thumbnails":[]},"title":{"runs":[{"text":"Premiere night"}]},"#,
            r#""upcomingEventData":{"startTime":"1760810400","isReminderSet":false}}"#
        );
        let partial = run(doc, "https://youtube.com/@x");
        let scheduled = partial.scheduled_live.unwrap();
        assert_eq!(scheduled.video.id, "soon1");
        assert_eq!(scheduled.video.title, "Premiere night");
        assert_eq!(scheduled.scheduled_time, "2025-10-18T18:00:00+00:00");
    }

    #[test]
    fn test_fills_only_unset_fields() {
        let mut partial = Partial {
            channel_name: Some("From Blob".into()),
            channel_id: Some("UCblob".into()),
            ..Partial::default()
        };
        let doc = r#"<meta property="og:title" content="From Meta"> {"channelId":"UCmeta"}"#;
        PatternSet::default().apply(&Page::new(doc), "https://youtube.com/@x", &mut partial);
        assert_eq!(partial.channel_name.as_deref(), Some("From Blob"));
        assert_eq!(partial.channel_id.as_deref(), Some("UCblob"));
    }
}
