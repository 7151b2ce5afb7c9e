//! Local filesystem storage implementation.
//!
//! Keeps all channels in a single JSON document and history in another.
//! Every read-modify-write runs under one async mutex, and files are replaced
//! atomically, so a crash never leaves a half-written document behind.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::{AppError, Result};
use crate::models::{
    Category, CategoryUpdate, ChannelConfig, ChannelState, HistoryEntry, MonitoredChannel,
};
use crate::storage::{ChannelStore, ChannelsData};

const CHANNELS_KEY: &str = "channels.json";
const HISTORY_KEY: &str = "history.json";

/// Oldest history entries are dropped past this size.
pub const HISTORY_CAPACITY: usize = 1_000;

/// Local filesystem storage backend.
#[derive(Clone)]
pub struct LocalStore {
    root_dir: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl LocalStore {
    /// Create a new LocalStore rooted at the given directory.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Get the full path for a relative key.
    fn path(&self, key: &str) -> PathBuf {
        self.root_dir.join(key)
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(self.path(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.read_bytes(key).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn load_channels(&self) -> Result<Vec<MonitoredChannel>> {
        Ok(self
            .read_json::<ChannelsData>(CHANNELS_KEY)
            .await?
            .map(|data| data.channels)
            .unwrap_or_default())
    }

    async fn save_channels(&self, channels: Vec<MonitoredChannel>) -> Result<()> {
        self.write_json(CHANNELS_KEY, &ChannelsData::new(channels))
            .await
    }

    async fn load_history(&self) -> Result<Vec<HistoryEntry>> {
        Ok(self.read_json(HISTORY_KEY).await?.unwrap_or_default())
    }

    /// Apply `f` to the active channel `(guild_id, youtube_id)`, stamp its
    /// `last_check`, and persist.
    async fn modify_active<F>(&self, guild_id: &str, youtube_id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut MonitoredChannel),
    {
        let _guard = self.lock.lock().await;
        let mut channels = self.load_channels().await?;
        let channel = channels
            .iter_mut()
            .find(|c| is_active_match(c, guild_id, youtube_id))
            .ok_or_else(|| AppError::NotFound(format!("{youtube_id} in guild {guild_id}")))?;
        f(channel);
        channel.config.last_check = Some(Utc::now());
        self.save_channels(channels).await
    }

    /// Start monitoring a channel for a guild.
    ///
    /// Returns `false` if the guild already monitors this channel. A channel
    /// that was removed earlier is reactivated with the given config and state.
    pub async fn add_channel(&self, config: ChannelConfig, state: ChannelState) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut channels = self.load_channels().await?;

        let existing = channels.iter_mut().find(|c| {
            c.config.guild_id == config.guild_id && c.config.youtube_id == config.youtube_id
        });

        match existing {
            Some(channel) if channel.config.active => return Ok(false),
            Some(channel) => {
                log::info!(
                    "Reactivating {} for guild {}",
                    config.youtube_id,
                    config.guild_id
                );
                *channel = MonitoredChannel { config, state };
            }
            None => channels.push(MonitoredChannel { config, state }),
        }

        self.save_channels(channels).await?;
        Ok(true)
    }

    /// Active channel `(guild_id, youtube_id)`, if any.
    pub async fn find(&self, guild_id: &str, youtube_id: &str) -> Result<Option<MonitoredChannel>> {
        Ok(self
            .load_channels()
            .await?
            .into_iter()
            .find(|c| is_active_match(c, guild_id, youtube_id)))
    }

    /// Active channel of a guild named by `ident`.
    ///
    /// An exact id wins; otherwise the first channel whose id contains
    /// `ident` or whose name contains it, ignoring case.
    pub async fn resolve(&self, guild_id: &str, ident: &str) -> Result<Option<MonitoredChannel>> {
        let channels = self.configs_for_guild(guild_id).await?;
        let ident = ident.trim();
        if let Some(exact) = channels.iter().find(|c| c.config.youtube_id == ident) {
            return Ok(Some(exact.clone()));
        }
        Ok(channels.into_iter().find(|c| c.config.matches_ident(ident)))
    }

    /// Every active channel, grouped by guild.
    pub async fn all_configs(&self) -> Result<Vec<MonitoredChannel>> {
        let mut channels: Vec<_> = self
            .load_channels()
            .await?
            .into_iter()
            .filter(|c| c.config.active)
            .collect();
        channels.sort_by(|a, b| a.config.guild_id.cmp(&b.config.guild_id));
        Ok(channels)
    }

    /// Active channels of one guild.
    pub async fn configs_for_guild(&self, guild_id: &str) -> Result<Vec<MonitoredChannel>> {
        Ok(self
            .all_configs()
            .await?
            .into_iter()
            .filter(|c| c.config.guild_id == guild_id)
            .collect())
    }

    pub async fn count_for_guild(&self, guild_id: &str) -> Result<usize> {
        Ok(self.configs_for_guild(guild_id).await?.len())
    }

    /// Stop monitoring one channel (or all, if `youtube_id` is `None`) of a
    /// guild and delete the matching history.
    ///
    /// Returns whether anything was deactivated.
    pub async fn remove(&self, guild_id: &str, youtube_id: Option<&str>) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let targeted = |guild: &str, id: &str| {
            guild == guild_id && youtube_id.is_none_or(|wanted| wanted == id)
        };

        let mut channels = self.load_channels().await?;
        let mut removed = false;
        for channel in channels
            .iter_mut()
            .filter(|c| c.config.active && targeted(&c.config.guild_id, &c.config.youtube_id))
        {
            channel.config.active = false;
            removed = true;
        }
        self.save_channels(channels).await?;

        let mut history = self.load_history().await?;
        let before = history.len();
        history.retain(|e| !targeted(&e.guild_id, &e.youtube_id));
        if history.len() != before {
            self.write_json(HISTORY_KEY, &history).await?;
        }

        Ok(removed)
    }

    /// Turn one category of an active channel on or off.
    pub async fn set_notify(
        &self,
        guild_id: &str,
        youtube_id: &str,
        category: Category,
        on: bool,
    ) -> Result<()> {
        self.modify_active(guild_id, youtube_id, |channel| {
            channel.config.notify.set(category, on)
        })
        .await
    }

    /// Most recent notifications of a guild, newest first.
    pub async fn history(&self, guild_id: &str, limit: usize) -> Result<Vec<HistoryEntry>> {
        let mut entries: Vec<_> = self
            .load_history()
            .await?
            .into_iter()
            .filter(|e| e.guild_id == guild_id)
            .collect();
        entries.sort_by(|a, b| b.notified_at.cmp(&a.notified_at));
        entries.truncate(limit);
        Ok(entries)
    }
}

fn is_active_match(channel: &MonitoredChannel, guild_id: &str, youtube_id: &str) -> bool {
    channel.config.active
        && channel.config.guild_id == guild_id
        && channel.config.youtube_id == youtube_id
}

#[async_trait]
impl ChannelStore for LocalStore {
    async fn get_active_configs(&self) -> Result<Vec<MonitoredChannel>> {
        Ok(self
            .all_configs()
            .await?
            .into_iter()
            .filter(|c| c.config.notify.any_enabled())
            .collect())
    }

    async fn update_category_state(
        &self,
        guild_id: &str,
        youtube_id: &str,
        update: &CategoryUpdate,
    ) -> Result<()> {
        self.modify_active(guild_id, youtube_id, |channel| channel.state.record(update))
            .await
    }

    async fn append_history(&self, entry: &HistoryEntry) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut history = self.load_history().await?;
        history.push(entry.clone());
        if history.len() > HISTORY_CAPACITY {
            let excess = history.len() - HISTORY_CAPACITY;
            history = history.split_off(excess);
        }
        self.write_json(HISTORY_KEY, &history).await
    }
}
