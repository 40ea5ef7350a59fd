use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::ChatId;
use tracing_subscriber::EnvFilter;

mod app;
mod bot;
mod config;
mod db;
mod delivery;
mod error;
mod feed;
mod models;
mod scheduler;
mod services;

use app::App;
use config::Config;
use db::HistoryStore;
use delivery::{DeliverySink, Language, LogSink, MessageFormatter, Pipeline, RunOptions};
use error::{AppError, Result};
use feed::FeedFetcher;
use scheduler::Scheduler;
use services::{GoogleTranslator, NoopTranslator, TelegramSink, Translator};

#[derive(Debug, Default, PartialEq, Eq)]
struct Flags {
    force: bool,
    dry_run: bool,
    no_translation: bool,
}

impl Flags {
    fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self> {
        let mut flags = Flags::default();
        for arg in args {
            match arg.as_str() {
                "--force" | "-f" => flags.force = true,
                "--dry" | "-d" => flags.dry_run = true,
                "--notr" | "-n" => flags.no_translation = true,
                other => return Err(AppError::Config(format!("unknown argument '{}'", other))),
            }
        }
        Ok(flags)
    }
}

/// `RUST_LOG` when set and valid, `info` otherwise.
fn log_filter(directives: Option<String>) -> EnvFilter {
    directives
        .and_then(|d| EnvFilter::try_new(d).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok()))
        .with_writer(std::io::stderr)
        .init();

    let flags = Flags::parse(std::env::args().skip(1))?;
    if flags.dry_run {
        tracing::info!("Dry run: nothing is sent or recorded");
    }

    let config = Config::load()?;
    config.validate(flags.dry_run)?;

    let store = HistoryStore::open(&config.db_path).await?;
    let fetcher = Arc::new(FeedFetcher::new()?);

    let translator: Arc<dyn Translator> = if flags.no_translation || !config.translate {
        tracing::info!("Translation disabled");
        Arc::new(NoopTranslator)
    } else {
        Arc::new(GoogleTranslator::new()?)
    };

    let bot = config.bot_token.as_deref().map(Bot::new);
    let sink: Arc<dyn DeliverySink> = match (&bot, config.target_chat) {
        (Some(telegram), Some(target)) if !flags.dry_run => Arc::new(TelegramSink::new(
            telegram.clone(),
            ChatId(target),
            config.admin_chat.map(ChatId),
        )),
        _ => Arc::new(LogSink),
    };

    let pipeline = Arc::new(Pipeline::new(
        store.clone(),
        fetcher.clone(),
        sink,
        translator,
        MessageFormatter::new(
            Language::from_code(&config.primary_language),
            Language::from_code(&config.secondary_language),
        ),
        RunOptions {
            max_articles: config.max_news_per_run,
            record_deliveries: !flags.dry_run,
            ..RunOptions::default()
        },
    ));

    if flags.force || flags.dry_run {
        pipeline.run().await?;
        return Ok(());
    }

    match (bot, config.admin_chat) {
        (Some(telegram), Some(admin)) => {
            let app = Arc::new(App::new(store.clone(), fetcher, pipeline.clone(), Some(admin)));
            tokio::spawn(bot::listen(telegram, app));
        }
        _ => tracing::warn!("Command listener disabled"),
    }

    let scheduler = Scheduler::new(
        pipeline,
        store,
        chrono::Duration::minutes(i64::from(config.post_interval_minutes)),
        config.prune_time()?,
        config.max_news_age_days,
    );
    tokio::select! {
        _ = scheduler.run() => {}
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down"),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn flags_accept_long_and_short_forms() {
        assert_eq!(Flags::parse(args(&[])).unwrap(), Flags::default());
        let flags = Flags::parse(args(&["-f", "--notr"])).unwrap();
        assert!(flags.force && flags.no_translation && !flags.dry_run);
        assert!(Flags::parse(args(&["--dry"])).unwrap().dry_run);
    }

    #[test]
    fn rust_log_overrides_the_default_level() {
        use tracing::level_filters::LevelFilter;

        assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(
            log_filter(Some("debug".into())).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
        assert_eq!(
            log_filter(Some("warn,feed_relay=trace".into())).max_level_hint(),
            Some(LevelFilter::TRACE)
        );
    }

    #[test]
    fn unknown_flag_is_fatal() {
        assert!(matches!(
            Flags::parse(args(&["--verbose"])),
            Err(AppError::Config(_))
        ));
    }
}
