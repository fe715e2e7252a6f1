use std::sync::Arc;

use anyhow::Context;
use fuel_report::access::AllowList;
use fuel_report::analytics::Analytics;
use fuel_report::bot::Bot;
use fuel_report::channels::{Channel, CliChannel, TelegramChannel};
use fuel_report::config::{BotConfig, ChannelKind};
use fuel_report::dictionary::YamlDictionary;
use fuel_report::report::{ReportEngine, SessionRegistry, spawn_eviction_task};
use fuel_report::store::{LibSqlBackend, ReportStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = BotConfig::from_env()?;

    // Keep the guard alive so buffered file logs are flushed on exit.
    let _log_guard = init_tracing(&config);

    eprintln!("🚤 Fuel Report Bot v{}", env!("CARGO_PKG_VERSION"));

    // ── Reference data ──────────────────────────────────────────────────
    let dictionaries = Arc::new(
        YamlDictionary::load(&config.dictionaries_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to load dictionaries from {}",
                    config.dictionaries_path.display()
                )
            })?,
    );
    eprintln!("   Dictionaries: {}", config.dictionaries_path.display());

    let access = AllowList::load(&config.allowed_users_path)?;
    eprintln!(
        "   Allowed users: {}",
        if access.allows_everyone() {
            "everyone".to_string()
        } else if access.is_empty() {
            "none (deny all)".to_string()
        } else {
            access.len().to_string()
        }
    );

    // ── Database ────────────────────────────────────────────────────────
    let store: Arc<dyn ReportStore> = Arc::new(
        LibSqlBackend::new_local(&config.db_path)
            .await
            .with_context(|| format!("Failed to open database at {}", config.db_path.display()))?,
    );
    eprintln!("   Database: {}", config.db_path.display());

    // ── Sessions ────────────────────────────────────────────────────────
    let sessions = SessionRegistry::new();
    let _eviction_handle = match config.session_idle_timeout {
        Some(max_idle) => {
            eprintln!("   Session idle limit: {} min", max_idle.as_secs() / 60);
            Some(spawn_eviction_task(Arc::clone(&sessions), max_idle))
        }
        None => {
            eprintln!("   Session idle limit: none");
            None
        }
    };

    #[cfg(unix)]
    spawn_reload_on_hangup(Arc::clone(&dictionaries));

    let engine = ReportEngine::new(dictionaries, Arc::clone(&store), sessions);
    let bot = Arc::new(Bot::new(engine, Analytics::new(store), access));

    // ── Channel ─────────────────────────────────────────────────────────
    let channel: Arc<dyn Channel> = match config.channel {
        ChannelKind::Telegram => {
            let token = config
                .bot_token
                .clone()
                .context("TELEGRAM_BOT_TOKEN is required for the Telegram channel")?;
            Arc::new(TelegramChannel::new(token))
        }
        ChannelKind::Cli => {
            eprintln!("   CLI user id: {}", config.cli_user_id);
            Arc::new(CliChannel::new(config.cli_user_id))
        }
    };
    channel
        .health_check()
        .await
        .with_context(|| format!("{} channel is not reachable", channel.name()))?;
    eprintln!("   Channel: {}\n", channel.name());

    bot.run(channel).await?;
    Ok(())
}

/// stderr logging, plus a daily file when a log directory is configured.
fn init_tracing(config: &BotConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = fmt::layer().with_target(false).with_writer(std::io::stderr);

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "fuel-report.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr)
                .with(fmt::layer().with_target(false).with_ansi(false).with_writer(writer))
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(filter).with(stderr).init();
            None
        }
    }
}

/// Re-read the dictionaries file on SIGHUP.
#[cfg(unix)]
fn spawn_reload_on_hangup(dictionaries: Arc<YamlDictionary>) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangups = match signal(SignalKind::hangup()) {
        Ok(stream) => stream,
        Err(e) => {
            tracing::warn!("SIGHUP handler unavailable, dictionaries will not reload: {e}");
            return;
        }
    };
    tokio::spawn(async move {
        while hangups.recv().await.is_some() {
            if let Err(e) = dictionaries.reload().await {
                tracing::error!("Dictionary reload failed, keeping previous lists: {e}");
            }
        }
    });
}
