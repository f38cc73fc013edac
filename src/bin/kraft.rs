//! Read a Kaifa meter and print its publications as JSON lines.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kraft::config::ReplayConfig;
use kraft::publish::{JsonLinesPublisher, Reporter};
use kraft::{Kraft, KraftConfig};

#[derive(Parser, Debug)]
#[command(name = "kraft", version, about = "Kaifa power meter HAN port reader")]
struct Cli {
    /// YAML configuration file. Flags override its values.
    #[arg(long, env = "KRAFT_CONFIG")]
    config: Option<PathBuf>,

    /// Serial device
    #[arg(long)]
    device: Option<String>,

    /// Serial speed in baud
    #[arg(long)]
    speed: Option<u32>,

    /// Topic of the feature-based device
    #[arg(long)]
    topic: Option<String>,

    /// Name of the feature-based device
    #[arg(long)]
    name: Option<String>,

    /// Name of the Home Assistant device, empty to disable discovery
    #[arg(long = "hass-name")]
    hass_name: Option<String>,

    /// Replay a raw capture instead of reading the serial port
    #[arg(long)]
    replay: Option<PathBuf>,

    /// Log filter directives, e.g. `kraft=debug`
    #[arg(long)]
    log_filter: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut KraftConfig) {
        if let Some(device) = self.device {
            config.serial.device = device;
        }
        if let Some(speed) = self.speed {
            config.serial.baud_rate = speed;
        }
        if let Some(topic) = self.topic {
            config.publish.topic = topic;
        }
        if let Some(name) = self.name {
            config.publish.name = name;
        }
        if let Some(hass_name) = self.hass_name {
            config.publish.hass_name = hass_name;
        }
        if let Some(path) = self.replay {
            config.replay = Some(ReplayConfig::new(path));
        }
        if let Some(filter) = self.log_filter {
            config.log_filter = Some(filter);
        }
    }
}

fn init_tracing(directives: Option<&str>) -> anyhow::Result<()> {
    let filter = match directives {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter `{directives}`"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    // Logs go to stderr so stdout carries only publications.
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => KraftConfig::load(path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?,
        None => KraftConfig::default(),
    };
    cli.apply(&mut config);

    init_tracing(config.log_filter.as_deref())?;
    config.validate().context("invalid configuration")?;

    let connection = match &config.replay {
        Some(replay) => Kraft::open_replay(replay)
            .await
            .with_context(|| format!("failed to open capture {}", replay.path.display()))?,
        None => Kraft::open_serial(&config.serial)
            .await
            .with_context(|| format!("failed to open {}", config.serial.device))?,
    };

    let mut publisher = JsonLinesPublisher::new(tokio::io::stdout());
    let mut reporter = Reporter::new(config.publish.clone());

    tokio::select! {
        result = reporter.run(&connection, &mut publisher) => {
            let reported = result.context("failed to publish")?;
            let stats = connection.stats();
            info!(
                reported,
                frames = stats.frames,
                decode_errors = stats.decode_errors,
                "Meter stream ended"
            );
            if config.replay.is_none() {
                warn!("Serial reader stopped");
                anyhow::bail!("serial reader stopped");
            }
        }
        _ = signal::ctrl_c() => {
            info!("Interrupted, shutting down");
            connection.close();
        }
    }

    Ok(())
}
