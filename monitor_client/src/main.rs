//! Monitor Client - command line entry point
//!
//! Query the monitor backend or follow a monitor's live feed.

use anyhow::{bail, Context};
use clap::{value_parser, Arg, ArgMatches, Command};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use monitor_client::{
    api::DEFAULT_METRIC_DAYS,
    feed::{FeedEvent, REFRESH_SUMMARY_ACTION},
    DashboardConfig, LiveFeedClient, MonitorApi, ResourceId, VERSION,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => DashboardConfig::load_from(path),
        None => DashboardConfig::load(),
    }
    .context("failed to load configuration")?;

    // --log-level wins over global.log_level
    init_logging(log_level(&matches, &config));

    info!(version = VERSION, "Starting monitor client");

    if let Some(host) = matches.get_one::<String>("host") {
        config.backend.host = host.clone();
        config.validate().context("invalid --host")?;
    }

    match matches.subcommand() {
        Some(("watch", sub)) => watch(&config, sub).await,
        Some((name, sub)) => query(&config, name, sub).await,
        None => unreachable!("subcommand is required"),
    }
}

fn cli() -> Command {
    let monitor = || {
        Arg::new("monitor")
            .value_name("MONITOR")
            .help("Monitor identifier, e.g. udpserver://0.0.0.0:8099/192.168.10.102")
            .required(true)
    };

    Command::new("monitor-client")
        .version(VERSION)
        .about("Workstation health monitor client")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path without extension")
                .global(true),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST:PORT")
                .help("Override backend host")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level (trace, debug, info, warn, error) [default: from config]")
                .global(true),
        )
        .subcommand(Command::new("list").about("List registered monitors"))
        .subcommand(Command::new("status").about("Show monitor status").arg(monitor()))
        .subcommand(
            Command::new("metrics")
                .about("Show health metrics history")
                .arg(monitor())
                .arg(
                    Arg::new("days")
                        .long("days")
                        .value_parser(value_parser!(u32))
                        .default_value("7"),
                ),
        )
        .subcommand(
            Command::new("history")
                .about("Show working sessions in a time window (defaults to the last 24 hours)")
                .arg(monitor())
                .arg(Arg::new("start").long("start").value_parser(value_parser!(i64)))
                .arg(Arg::new("end").long("end").value_parser(value_parser!(i64))),
        )
        .subcommand(
            Command::new("toggle-yolo")
                .about("Enable or disable YOLO analysis")
                .arg(monitor())
                .arg(
                    Arg::new("enable")
                        .value_name("on|off")
                        .value_parser(["on", "off"])
                        .required(true),
                ),
        )
        .subcommand(
            Command::new("signin")
                .about("Upload a face image for sign-in")
                .arg(Arg::new("image").value_name("IMAGE").required(true)),
        )
        .subcommand(
            Command::new("watch")
                .about("Follow a monitor's live feed")
                .arg(monitor())
                .arg(
                    Arg::new("refresh-summary")
                        .long("refresh-summary")
                        .help("Ask the backend to regenerate the health summary once connected")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
}

fn log_level<'a>(matches: &'a ArgMatches, config: &'a DashboardConfig) -> &'a str {
    matches
        .get_one::<String>("log-level")
        .map(String::as_str)
        .unwrap_or(&config.global.log_level)
}

/// Initialize logging with the specified level
fn init_logging(log_level: &str) {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => {
            eprintln!("Invalid log level: {}. Using 'info'", log_level);
            tracing::Level::INFO
        }
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("monitor_client={}", level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn monitor_arg(matches: &ArgMatches) -> ResourceId {
    ResourceId::new(
        matches
            .get_one::<String>("monitor")
            .cloned()
            .unwrap_or_default(),
    )
}

/// One-shot REST commands, printed as JSON on stdout
async fn query(config: &DashboardConfig, name: &str, matches: &ArgMatches) -> anyhow::Result<()> {
    let api = MonitorApi::from_config(config)?;

    let output = match name {
        "list" => serde_json::to_value(api.list_monitors().await?)?,
        "status" => api.status(&monitor_arg(matches)).await?,
        "metrics" => {
            let days = matches
                .get_one::<u32>("days")
                .copied()
                .unwrap_or(DEFAULT_METRIC_DAYS);
            serde_json::to_value(api.health_metrics(&monitor_arg(matches), days).await?)?
        }
        "history" => {
            let now = chrono::Utc::now().timestamp();
            let end = matches.get_one::<i64>("end").copied().unwrap_or(now);
            let start = matches
                .get_one::<i64>("start")
                .copied()
                .unwrap_or(end - 24 * 60 * 60);
            serde_json::to_value(api.history(&monitor_arg(matches), start, end).await?)?
        }
        "toggle-yolo" => {
            let enable = matches.get_one::<String>("enable").map(String::as_str) == Some("on");
            serde_json::to_value(api.toggle_yolo(&monitor_arg(matches), enable).await?)?
        }
        "signin" => {
            let path = matches
                .get_one::<String>("image")
                .context("missing image path")?;
            let image = tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read {}", path))?;
            let file_name = std::path::Path::new(path)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("signin.jpg");
            serde_json::to_value(api.face_signin(image, file_name).await?)?
        }
        other => bail!("unknown command: {}", other),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// Follow the live feed until Ctrl+C or until the retry budget runs out
async fn watch(config: &DashboardConfig, matches: &ArgMatches) -> anyhow::Result<()> {
    let resource = monitor_arg(matches);
    let mut client = LiveFeedClient::from_config(config)?;
    let mut events = client.subscribe(&resource)?;
    let mut refresh_pending = matches.get_flag("refresh-summary");

    let shutdown = setup_shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(FeedEvent::Opened) => {
                    if refresh_pending {
                        client.send_action(REFRESH_SUMMARY_ACTION)?;
                        refresh_pending = false;
                    }
                }
                Some(FeedEvent::Message(message)) => {
                    println!("{}", serde_json::to_string(&message)?);
                }
                Some(FeedEvent::Closed(info)) => {
                    warn!(code = ?info.code, reason = %info.reason, "Live feed disconnected");
                }
                None => {
                    let stats = client.stats();
                    error!(attempts = stats.attempt, "Live feed stopped");
                    bail!("live feed for {} gave up after {} attempts", resource, stats.attempt);
                }
            },
            _ = &mut shutdown => {
                info!("Shutdown signal received, closing live feed...");
                client.close();
                break;
            }
        }
    }

    Ok(())
}

/// Set up graceful shutdown signal handling
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_falls_back_to_config() {
        let mut config = DashboardConfig::default();
        config.global.log_level = "debug".to_string();

        let matches = cli().try_get_matches_from(["monitor-client", "list"]).unwrap();
        assert_eq!(log_level(&matches, &config), "debug");

        let matches = cli()
            .try_get_matches_from(["monitor-client", "--log-level", "warn", "list"])
            .unwrap();
        assert_eq!(log_level(&matches, &config), "warn");
    }
}
