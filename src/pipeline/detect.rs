//! Change detection.
//!
//! Compares a fresh snapshot with the persisted channel state and yields the
//! events to raise plus the state to persist. Each item id is raised at most
//! once per category, and a category's state only ever moves forward.

use crate::models::{
    Category, CategoryUpdate, ChangeEvent, ChannelSnapshot, ChannelState, NotifySettings,
    ScheduledInfo, VideoInfo,
};

/// Outcome of comparing one snapshot with prior state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detection {
    /// Events in category order: live, scheduled, video
    pub events: Vec<ChangeEvent>,
    /// Categories advanced without an event (disabled, but recorded)
    pub silent_updates: Vec<CategoryUpdate>,
    /// State to persist
    pub next_state: ChannelState,
}

impl Detection {
    /// Check if anything should be notified.
    pub fn has_changes(&self) -> bool {
        !self.events.is_empty()
    }
}

/// Detector for new items on a channel.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    /// Record items of disabled categories without raising events
    advance_disabled: bool,
}

impl ChangeDetector {
    /// Create a detector where disabled categories neither notify nor advance.
    pub fn new() -> Self {
        Self {
            advance_disabled: false,
        }
    }

    /// Create a detector that silently records items of disabled categories,
    /// so re-enabling a category does not replay what appeared meanwhile.
    pub fn advancing_disabled() -> Self {
        Self {
            advance_disabled: true,
        }
    }

    /// Compare `snapshot` with `prior` under the channel's notify settings.
    pub fn detect(
        &self,
        snapshot: &ChannelSnapshot,
        prior: &ChannelState,
        notify: &NotifySettings,
    ) -> Detection {
        let mut next_state = prior.clone();
        let mut events = Vec::new();
        let mut silent_updates = Vec::new();

        for category in Category::ALL {
            let Some(event) = candidate(snapshot, category) else {
                continue;
            };
            let id = event.item().id.as_str();
            if id.is_empty() || prior.has_seen(category, id) {
                continue;
            }

            if notify.is_enabled(category) {
                next_state.record(&event.to_update());
                events.push(event);
            } else if self.advance_disabled {
                log::debug!(
                    "{}: recording {category} {id} without notifying (disabled)",
                    snapshot.channel_id
                );
                let update = event.to_update();
                next_state.record(&update);
                silent_updates.push(update);
            }
        }

        Detection {
            events,
            silent_updates,
            next_state,
        }
    }
}

/// The event a snapshot would raise for `category`, ignoring prior state.
fn candidate(snapshot: &ChannelSnapshot, category: Category) -> Option<ChangeEvent> {
    let channel_id = snapshot.channel_id.clone();
    let channel_name = snapshot.channel_name.clone();
    match category {
        Category::Live => {
            let live: &VideoInfo = snapshot.live_info.as_ref().filter(|_| snapshot.is_live)?;
            Some(ChangeEvent::NewLive {
                channel_id,
                channel_name,
                live: live.clone(),
            })
        }
        Category::Scheduled => {
            let scheduled: &ScheduledInfo = snapshot.scheduled_live.as_ref()?;
            Some(ChangeEvent::NewScheduled {
                channel_id,
                channel_name,
                scheduled: scheduled.clone(),
            })
        }
        Category::Video => Some(ChangeEvent::NewVideo {
            channel_id,
            channel_name,
            video: snapshot.latest_video.clone()?,
        }),
    }
}

/// Convenience function to detect changes with the default detector.
pub fn detect_changes(
    snapshot: &ChannelSnapshot,
    prior: &ChannelState,
    notify: &NotifySettings,
) -> Detection {
    ChangeDetector::new().detect(snapshot, prior, notify)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ChannelSnapshot {
        ChannelSnapshot {
            channel_name: "Chan".into(),
            channel_id: "UCchan".into(),
            channel_url: "https://youtube.com/@chan".into(),
            is_live: false,
            live_info: None,
            scheduled_live: None,
            latest_video: None,
            recent_videos: Vec::new(),
        }
    }

    fn recorded(category: Category, id: &str) -> CategoryUpdate {
        CategoryUpdate {
            category,
            id: id.into(),
            title: format!("Earlier {id}"),
            time: None,
        }
    }

    fn with_video(id: &str) -> ChannelSnapshot {
        let mut snapshot = snapshot();
        snapshot.latest_video = Some(VideoInfo::new(id, &format!("Video {id}")));
        snapshot
    }

    fn with_live(id: &str) -> ChannelSnapshot {
        let mut snapshot = snapshot();
        snapshot.is_live = true;
        snapshot.live_info = Some(VideoInfo::new(id, "Live now"));
        snapshot
    }

    #[test]
    fn test_new_video_emits_and_advances() {
        let result = detect_changes(
            &with_video("v1"),
            &ChannelState::default(),
            &NotifySettings::default(),
        );

        assert_eq!(result.events.len(), 1);
        assert!(matches!(
            &result.events[0],
            ChangeEvent::NewVideo { video, .. } if video.id == "v1"
        ));
        assert_eq!(result.next_state.last_video_id, "v1");
        assert_eq!(result.next_state.last_video_title, "Video v1");
    }

    #[test]
    fn test_same_video_is_quiet() {
        let prior = ChannelState::from_updates(&[recorded(Category::Video, "v1")]);
        let result = detect_changes(&with_video("v1"), &prior, &NotifySettings::default());

        assert!(!result.has_changes());
        assert_eq!(result.next_state, prior);
        assert!(result.next_state.has_seen(Category::Video, "v1"));
    }

    #[test]
    fn test_detect_is_idempotent() {
        let mut snap = with_live("l1");
        snap.latest_video = Some(VideoInfo::new("v1", "Video"));
        let notify = NotifySettings::default();

        let first = detect_changes(&snap, &ChannelState::default(), &notify);
        assert_eq!(first.events.len(), 2);

        let second = detect_changes(&snap, &first.next_state, &notify);
        assert!(second.events.is_empty());
        assert_eq!(second.next_state, first.next_state);
    }

    #[test]
    fn test_disabled_category_neither_emits_nor_advances() {
        let notify = NotifySettings {
            lives: false,
            ..NotifySettings::default()
        };
        let prior = ChannelState::from_updates(&[recorded(Category::Live, "old")]);
        let result = detect_changes(&with_live("l2"), &prior, &notify);

        assert!(result.events.is_empty());
        assert!(result.silent_updates.is_empty());
        assert_eq!(result.next_state.last_live_id, "old");
        assert!(!result.next_state.has_seen(Category::Live, "l2"));
    }

    #[test]
    fn test_advancing_disabled_records_silently() {
        let notify = NotifySettings {
            lives: false,
            ..NotifySettings::default()
        };
        let result = ChangeDetector::advancing_disabled().detect(
            &with_live("l2"),
            &ChannelState::default(),
            &notify,
        );

        assert!(result.events.is_empty());
        assert_eq!(result.silent_updates.len(), 1);
        assert_eq!(result.next_state.last_live_id, "l2");

        // Re-enabling does not replay the item.
        let again = detect_changes(
            &with_live("l2"),
            &result.next_state,
            &NotifySettings::default(),
        );
        assert!(again.events.is_empty());
    }

    #[test]
    fn test_live_info_without_live_flag_ignored() {
        let mut snap = with_live("l1");
        snap.is_live = false;
        let result = detect_changes(&snap, &ChannelState::default(), &NotifySettings::default());
        assert!(result.events.is_empty());
    }

    #[test]
    fn test_multiple_events_in_category_order() {
        let mut snap = with_video("v1");
        snap.is_live = true;
        snap.live_info = Some(VideoInfo::new("l1", "Live"));
        snap.scheduled_live = Some(ScheduledInfo {
            video: VideoInfo::new("s1", "Later"),
            scheduled_time: "2026-10-20T18:00:00+00:00".into(),
        });

        let result = detect_changes(&snap, &ChannelState::default(), &NotifySettings::default());
        let categories: Vec<_> = result.events.iter().map(ChangeEvent::category).collect();

        assert_eq!(
            categories,
            vec![Category::Live, Category::Scheduled, Category::Video]
        );
        assert_eq!(result.next_state.scheduled_live_id, "s1");
        assert_eq!(
            result.next_state.scheduled_live_time,
            "2026-10-20T18:00:00+00:00"
        );
    }

    #[test]
    fn test_state_never_reverts_to_earlier_item() {
        let notify = NotifySettings::default();
        let mut state = ChannelState::default();
        let mut raised = Vec::new();

        for id in ["v1", "v2", "v1", "v3", "v2"] {
            let result = detect_changes(&with_video(id), &state, &notify);
            raised.extend(result.events.iter().map(|e| e.item().id.clone()));
            state = result.next_state;
        }

        assert_eq!(raised, vec!["v1", "v2", "v3"]);
        assert_eq!(state.last_video_id, "v3");
    }

    #[test]
    fn test_empty_id_ignored() {
        let result = detect_changes(
            &with_video(""),
            &ChannelState::default(),
            &NotifySettings::default(),
        );
        assert!(result.events.is_empty());
        assert_eq!(result.next_state, ChannelState::default());
    }
}
