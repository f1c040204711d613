//! Process bootstrap (§1, "Explicitly OUT of scope": configuration file
//! parsing, prefix-list file loading, process bootstrap): parses CLI flags,
//! builds the logger and configuration, loads the watch-list, wires the
//! feed client to the alert engine and the configured notifiers, and runs
//! until shutdown.

mod config;
mod watchlist;

use alert_engine::{AlertEngine, EngineConfig};
use anyhow::{Context, Result};
use clap::Parser;
use config::Config;
use logging::LogFormat;
use notifiers::{LogSink, MailSink, Severity, WebhookSink};
use ris_feed::{FeedClient, ProxyConfig};
use slog::{crit, info, Level, Logger};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use task_executor::TaskExecutor;

#[derive(Debug, Parser)]
#[command(name = "bgpalerter", about = "BGP route-anomaly detector for a watch-list of IP prefixes")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "config.yml")]
    config: PathBuf,

    /// Log output format.
    #[arg(long, value_enum, default_value = "plain")]
    log_format: CliLogFormat,

    /// Minimum log level emitted to the configured drain.
    #[arg(long, default_value = "info")]
    debug_level: String,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliLogFormat {
    Plain,
    Json,
}

impl From<CliLogFormat> for LogFormat {
    fn from(value: CliLogFormat) -> Self {
        match value {
            CliLogFormat::Plain => LogFormat::Plain,
            CliLogFormat::Json => LogFormat::Json,
        }
    }
}

fn build_engine(config: &Config, log: Logger) -> AlertEngine {
    let engine_config = EngineConfig {
        number_peers_before_hijack_alert: config.number_peers_before_hijack_alert,
        number_peers_before_low_visibility_alert: config.number_peers_before_low_visibility_alert,
        repeat_alert_after: Duration::from_secs(config.repeat_alert_after_seconds),
        reset_after: Duration::from_secs(config.reset_after_seconds),
        repeat_heartbeat_after: if config.repeat_status_heartbeat_after_seconds > 0 {
            Some(Duration::from_secs(config.repeat_status_heartbeat_after_seconds))
        } else {
            None
        },
        permitted_more_specific_announcements: config.permitted_more_specific_announcements.clone(),
    };
    AlertEngine::new(engine_config, log)
}

/// Register the notifier sinks this config selects, following the routing
/// the original `runner.py` wires by hand (SPEC_FULL.md, "Supplemented
/// features"): hijack/low-visibility go to webhook + log, difference goes to
/// webhook only, error goes to log only. A sink is only registered when its
/// config keys are present, so operators can omit any of them.
fn wire_notifiers(engine: &mut AlertEngine, config: &Config, log: &Logger) -> Result<()> {
    let log_sink_warn = || Box::new(LogSink::new(log.clone(), Level::Warning));
    let log_sink_error = || Box::new(LogSink::new(log.clone(), Level::Error));

    engine.on("hijack", log_sink_warn())?;
    engine.on("low-visibility", log_sink_warn())?;
    engine.on("error", log_sink_error())?;

    if let Some(webhook_url) = &config.slack_web_hook {
        let mut builder = reqwest::Client::builder();
        if let (Some(host), Some(port)) = (&config.proxy_host, config.proxy_port) {
            let proxy_url = format!("http://{host}:{port}");
            builder = builder.proxy(reqwest::Proxy::all(proxy_url).context("invalid proxy configuration")?);
        }
        let client = builder.build().context("failed to build webhook http client")?;

        engine.on(
            "hijack",
            Box::new(WebhookSink::new(client.clone(), webhook_url.as_str(), Severity::Danger, log.clone())),
        )?;
        engine.on(
            "low-visibility",
            Box::new(WebhookSink::new(client.clone(), webhook_url.as_str(), Severity::Warning, log.clone())),
        )?;
        engine.on(
            "difference",
            Box::new(WebhookSink::new(client, webhook_url.as_str(), Severity::Warning, log.clone())),
        )?;
    }

    if let (Some(from), false) = (&config.sender_notifications_email, config.notified_emails.is_empty()) {
        let from: lettre::message::Mailbox = from.parse().context("invalid sender-notifications-email")?;
        let to = config
            .notified_emails
            .iter()
            .map(|email| email.parse())
            .collect::<Result<Vec<lettre::message::Mailbox>, _>>()
            .context("invalid entry in notified-emails")?;
        let mailer = lettre::SmtpTransport::builder_dangerous("localhost").build();

        engine.on(
            "hijack",
            Box::new(MailSink::new(mailer.clone(), from.clone(), to.clone(), log.clone())),
        )?;
        engine.on("low-visibility", Box::new(MailSink::new(mailer, from, to, log.clone())))?;
    }

    Ok(())
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let level = logging::parse_level(&cli.debug_level).map_err(anyhow::Error::msg)?;
    let log = logging::root_logger(level, cli.log_format.into());

    let config = Config::load(&cli.config).context("failed to load configuration")?;
    let monitored = watchlist::load(&config.monitored_prefixes_files).context("failed to load watch-list")?;
    info!(log, "loaded watch-list"; "entries" => monitored.len());

    let mut engine = build_engine(&config, log.clone());
    wire_notifiers(&mut engine, &config, &log)?;

    let url: url::Url = config
        .websocket_data_service
        .parse()
        .context("invalid websocket-data-service url")?;
    let proxy = match (&config.proxy_host, config.proxy_port) {
        (Some(host), Some(port)) => Some(ProxyConfig { host: host.clone(), port }),
        _ => None,
    };
    let feed_client = FeedClient::new(url, proxy, monitored, log.clone());

    let (shutdown_tx, shutdown_rx) = task_executor::shutdown_channel();
    let executor = TaskExecutor::new(tokio::runtime::Handle::current(), shutdown_rx, log.clone());

    let (events_tx, events_rx) = tokio::sync::mpsc::unbounded_channel();
    let feed_shutdown = executor.exit();
    let feed_log = log.clone();
    let feed_handle = tokio::spawn(async move {
        let result = feed_client.run(events_tx, feed_shutdown).await;
        if let Err(e) = &result {
            crit!(feed_log, "feed client stopped"; "error" => %e);
        }
        result
    });

    info!(log, "Starting to monitor...");
    let engine_handle = tokio::spawn(alert_engine::actor::run(engine, events_rx, executor));

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!(log, "received ctrl-c, shutting down");
            drop(shutdown_tx);
        }
        feed_result = feed_handle => {
            drop(shutdown_tx);
            if matches!(feed_result, Ok(Err(ris_feed::ClientError::RetryBudgetExhausted))) {
                let _ = engine_handle.await;
                return Ok(ExitCode::from(ris_feed::EX_TEMPFAIL as u8));
            }
        }
    }

    let _ = engine_handle.await;
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("bgpalerter: {e:#}");
            ExitCode::FAILURE
        }
    }
}
