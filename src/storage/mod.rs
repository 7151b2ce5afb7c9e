//! Storage abstractions for monitored channels.
//!
//! The poll cycle only needs the three operations of [`ChannelStore`]; the
//! local implementation adds the management operations used by the CLI.
//!
//! ## Directory Structure
//!
//! ```text
//! storage/
//! ├── channels.json         # Channel configs with their detection state
//! └── history.json          # Sent notifications, oldest first
//! ```

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{CategoryUpdate, HistoryEntry, MonitoredChannel};

// Re-export for convenience
pub use local::LocalStore;

/// Contents of `channels.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelsData {
    /// ISO 8601 timestamp of last write
    pub updated_at: DateTime<Utc>,
    /// Every channel ever added, including deactivated ones
    pub channels: Vec<MonitoredChannel>,
}

impl ChannelsData {
    pub fn new(channels: Vec<MonitoredChannel>) -> Self {
        Self {
            updated_at: Utc::now(),
            channels,
        }
    }
}

/// Persistence used by the poll cycle.
#[async_trait]
pub trait ChannelStore: Send + Sync {
    /// Active channels with at least one category enabled, with their state.
    async fn get_active_configs(&self) -> Result<Vec<MonitoredChannel>>;

    /// Advance one category of an active channel.
    async fn update_category_state(
        &self,
        guild_id: &str,
        youtube_id: &str,
        update: &CategoryUpdate,
    ) -> Result<()>;

    /// Record a sent notification.
    async fn append_history(&self, entry: &HistoryEntry) -> Result<()>;
}
