// src/models/mod.rs

//! Domain models for the monitor.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod channel;
mod config;
mod event;
mod snapshot;

// Re-export all public types
pub use channel::{
    Category, CategoryUpdate, ChannelConfig, ChannelState, MonitoredChannel, NotifySettings,
    SEEN_IDS_CAPACITY,
};
pub use config::{
    Config, FetcherConfig, MonitorConfig, NotifierConfig, NotifierKind, StorageConfig,
};
pub use event::{ChangeEvent, HistoryEntry};
pub use snapshot::{
    ChannelSnapshot, DEFAULT_CHANNEL_NAME, LiveInfo, MAX_RECENT_VIDEOS, MAX_TITLE_CHARS,
    ScheduledInfo, VideoInfo, truncate_title,
};
