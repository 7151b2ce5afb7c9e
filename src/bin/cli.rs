//! yt-monitor CLI
//!
//! Local execution entry point: run the monitor and manage channels.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use yt_monitor::{
    error::{AppError, Result},
    models::{
        Category, ChannelConfig, ChannelSnapshot, ChannelState, Config, MonitoredChannel,
        NotifySettings,
    },
    pipeline::{PollCycle, Scheduler, detect_changes},
    services::{HttpFetcher, PageFetcher, SnapshotExtractor, build_notifier},
    storage::LocalStore,
    utils::{http, normalize_channel_url},
};

const DEFAULT_STORAGE_DIR: &str = "storage";

/// yt-monitor - channel upload and live notifier
#[derive(Parser, Debug)]
#[command(
    name = "yt-monitor",
    version,
    about = "Watch channels for new uploads, lives and scheduled lives"
)]
struct Cli {
    /// Storage directory (overrides `[storage] root_dir`)
    #[arg(short, long)]
    storage_dir: Option<PathBuf>,

    /// Config file (default: {storage_dir}/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Poll all channels on the configured interval until Ctrl-C
    Watch,

    /// Run a single poll cycle
    Poll,

    /// Fetch a channel page and print its snapshot as JSON
    Check {
        /// Channel URL, @handle or name
        url: String,
    },

    /// Start monitoring a channel for a guild
    Add {
        guild: String,
        /// Chat channel id or webhook URL receiving notifications
        destination: String,
        /// Channel URL, @handle or name
        url: String,
        /// Record what is currently on the page so the first poll is quiet
        #[arg(long)]
        prime: bool,
        /// Who added the channel
        #[arg(long)]
        by: Option<String>,
    },

    /// Show a channel's stored state and its current live status
    Info {
        guild: String,
        /// Channel id, part of it, or part of the name
        ident: String,
    },

    /// Check every channel of a guild now, without notifying
    Status { guild: String },

    /// Stop monitoring one channel, or every channel of a guild
    Remove {
        guild: String,
        /// Channel id, part of it, or part of the name
        ident: Option<String>,
    },

    /// List monitored channels
    List {
        #[arg(long)]
        guild: Option<String>,
    },

    /// Turn a notification category on or off
    Set {
        guild: String,
        /// Channel id, part of it, or part of the name
        ident: String,
        /// video, live or scheduled
        category: Category,
        value: Toggle,
    },

    /// Show recent notifications of a guild
    History {
        guild: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Validate configuration
    Validate,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Toggle {
    On,
    Off,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn flag(on: bool) -> &'static str {
    if on { "on" } else { "off" }
}

fn live_status(snapshot: &ChannelSnapshot) -> &'static str {
    if snapshot.is_live {
        "LIVE"
    } else if snapshot.scheduled_live.is_some() {
        "scheduled"
    } else {
        "offline"
    }
}

/// Resolve `ident` to an active channel of `guild`, or fail with NotFound.
async fn resolve(store: &LocalStore, guild: &str, ident: &str) -> Result<MonitoredChannel> {
    store
        .resolve(guild, ident)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("'{ident}' in guild {guild}")))
}

/// Wire the configured fetcher, store and notifier into a scheduler.
fn build_scheduler(config: &Config, store: Arc<LocalStore>) -> Result<Scheduler> {
    config.validate()?;
    let client = http::create_async_client(&config.fetcher)?;
    let fetcher = Arc::new(HttpFetcher::with_client(client.clone()));
    let notifier = build_notifier(config.notifier.kind, client);
    let cycle = PollCycle::new(&config.monitor, fetcher, store, notifier);
    Ok(Scheduler::new(
        Arc::new(cycle),
        Duration::from_secs(config.monitor.interval_secs),
    ))
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(|| {
        cli.storage_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR))
            .join("config.toml")
    });
    let config = Config::load_or_default(&config_path);
    let root_dir = cli
        .storage_dir
        .clone()
        .unwrap_or_else(|| config.storage.root_dir.clone());

    log::debug!(
        "Config {}, storage {}",
        config_path.display(),
        root_dir.display()
    );

    let store = Arc::new(LocalStore::new(&root_dir));

    match cli.command {
        Command::Watch => {
            let mut scheduler = build_scheduler(&config, store)?;
            scheduler.start()?;
            tokio::signal::ctrl_c().await?;
            log::info!("Shutting down...");
            scheduler.stop().await;
        }

        Command::Poll => {
            let report = build_scheduler(&config, store)?.run_once().await?;
            log::info!(
                "{} channels, {} events, {} notified, {} failed",
                report.channels,
                report.events,
                report.notified,
                report.failures
            );
        }

        Command::Check { url } => {
            let url = normalize_channel_url(&url);
            let fetcher = HttpFetcher::new(&config.fetcher)?;
            let document = fetcher.fetch(&url).await?;
            let snapshot = SnapshotExtractor::new().extract(&document, &url);
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
        }

        Command::Add {
            guild,
            destination,
            url,
            prime,
            by,
        } => {
            let url = normalize_channel_url(&url);
            log::info!("Analyzing {url}...");
            let fetcher = HttpFetcher::new(&config.fetcher)?;
            let document = fetcher.fetch(&url).await?;
            let snapshot = SnapshotExtractor::new().extract(&document, &url);

            let state = if prime {
                detect_changes(&snapshot, &ChannelState::default(), &NotifySettings::default())
                    .next_state
            } else {
                ChannelState::default()
            };

            let config = ChannelConfig {
                added_by: by,
                ..ChannelConfig::new(
                    guild.as_str(),
                    destination,
                    snapshot.channel_url.as_str(),
                    snapshot.channel_name.as_str(),
                    snapshot.channel_id.as_str(),
                )
            };
            let added = store.add_channel(config, state).await?;

            if added {
                let total = store.count_for_guild(&guild).await?;
                log::info!(
                    "Added {} ({}); guild {guild} now monitors {total} channels",
                    snapshot.channel_name,
                    snapshot.channel_id
                );
            } else {
                log::warn!(
                    "{} ({}) is already monitored in guild {guild}",
                    snapshot.channel_name,
                    snapshot.channel_id
                );
            }
        }

        Command::Info { guild, ident } => {
            let channel = resolve(&store, &guild, &ident).await?;
            let c = &channel.config;
            let s = &channel.state;

            let fetcher = HttpFetcher::new(&config.fetcher)?;
            let status = match fetcher.fetch(&c.youtube_url).await {
                Ok(document) => {
                    live_status(&SnapshotExtractor::new().extract(&document, &c.youtube_url))
                }
                Err(e) => {
                    log::warn!("Could not refresh {}: {e}", c.youtube_name);
                    "unknown"
                }
            };

            println!("{} ({})", c.youtube_name, c.youtube_id);
            println!("  url:           {}", c.youtube_url);
            println!("  destination:   {}", c.destination);
            println!("  status:        {status}");
            println!(
                "  notify:        videos:{} lives:{} scheduled:{}",
                flag(c.notify.videos),
                flag(c.notify.lives),
                flag(c.notify.scheduled)
            );
            println!(
                "  added:         {} by {}",
                c.created_at.format("%Y-%m-%d"),
                c.added_by.as_deref().unwrap_or("unknown")
            );
            if let Some(checked) = c.last_check {
                println!("  last update:   {}", checked.format("%Y-%m-%d %H:%M:%S"));
            }
            if !s.last_video_id.is_empty() {
                println!(
                    "  last video:    {} ({})",
                    s.last_video_title, s.last_video_time
                );
            }
            if !s.last_live_id.is_empty() {
                println!("  last live:     {}", s.last_live_title);
            }
            if !s.scheduled_live_id.is_empty() {
                println!(
                    "  scheduled:     {} at {}",
                    s.scheduled_live_title, s.scheduled_live_time
                );
            }
        }

        Command::Status { guild } => {
            let channels = store.configs_for_guild(&guild).await?;
            if channels.is_empty() {
                return Err(AppError::NotFound(format!("channels in guild {guild}")));
            }

            let fetcher = HttpFetcher::new(&config.fetcher)?;
            let extractor = SnapshotExtractor::new();
            let delay = Duration::from_millis(config.monitor.channel_delay_ms);
            let (mut live, mut scheduled) = (0, 0);

            log::info!("Checking {} channels...", channels.len());
            for channel in &channels {
                let c = &channel.config;
                let status = match fetcher.fetch(&c.youtube_url).await {
                    Ok(document) => {
                        let snapshot = extractor.extract(&document, &c.youtube_url);
                        if snapshot.is_live {
                            live += 1;
                        } else if snapshot.scheduled_live.is_some() {
                            scheduled += 1;
                        }
                        live_status(&snapshot)
                    }
                    Err(e) => {
                        log::warn!("Could not check {}: {e}", c.youtube_name);
                        "error"
                    }
                };
                println!("{status}\t{}\t{}", c.youtube_id, c.youtube_name);
                tokio::time::sleep(delay).await;
            }
            println!(
                "{} channels checked: {live} live, {scheduled} scheduled",
                channels.len()
            );
        }

        Command::Remove { guild, ident } => {
            let youtube_id = match ident.as_deref() {
                Some(ident) => Some(resolve(&store, &guild, ident).await?.config.youtube_id),
                None => None,
            };
            if store.remove(&guild, youtube_id.as_deref()).await? {
                let remaining = store.count_for_guild(&guild).await?;
                log::info!("Removed; {remaining} channels remain in guild {guild}");
            } else {
                return Err(AppError::NotFound(format!("channels in guild {guild}")));
            }
        }

        Command::List { guild } => {
            let channels = match &guild {
                Some(guild) => store.configs_for_guild(guild).await?,
                None => store.all_configs().await?,
            };
            if channels.is_empty() {
                log::info!("No channels monitored.");
            }
            for channel in channels {
                let c = &channel.config;
                println!(
                    "{}\t{}\t{}\t-> {}\tvideos:{} lives:{} scheduled:{}\tlast video: {}",
                    c.guild_id,
                    c.youtube_id,
                    c.youtube_name,
                    c.destination,
                    flag(c.notify.videos),
                    flag(c.notify.lives),
                    flag(c.notify.scheduled),
                    channel.state.last_video_title
                );
            }
        }

        Command::Set {
            guild,
            ident,
            category,
            value,
        } => {
            let channel = resolve(&store, &guild, &ident).await?;
            let on = matches!(value, Toggle::On);
            store
                .set_notify(&guild, &channel.config.youtube_id, category, on)
                .await?;
            log::info!(
                "{category} notifications {} for {}",
                flag(on),
                channel.config.youtube_name
            );
        }

        Command::History { guild, limit } => {
            for entry in store.history(&guild, limit).await? {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    entry.notified_at.format("%Y-%m-%d %H:%M:%S"),
                    entry.category,
                    entry.channel_name,
                    entry.item_id,
                    entry.title
                );
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("✓ Config OK");
            println!("{}", config.to_toml()?);
        }
    }

    Ok(())
}
