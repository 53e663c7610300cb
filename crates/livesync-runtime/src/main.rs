mod cli;
mod config;
mod host;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use livesync_process::SysinfoProcessLister;
use livesync_source_game::NativeOpener;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use config::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = std::env::var("LIVESYNC_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::load(cli.config.as_deref())?;
    if let Some(rate) = cli.tick_rate {
        config.host.tick_rate_hz = rate;
    }
    apply_overrides(&mut config, &cli.command);
    config.validate()?;

    let tick_rate = config.host.tick_rate_hz;
    let spacing = Duration::from_millis(config.host.print_interval_ms);
    let run_for = cli.duration_secs.map(Duration::from_secs);

    match cli.command {
        Command::Media(_) => {
            let mut engine = livesync_source_media::build_engine(
                &config.media,
                config.engine.clone(),
                SysinfoProcessLister::new(),
            )
            .context("failed to build media client")?;
            host::run(&mut engine, tick_rate, spacing, run_for).await
        }
        Command::Game(_) => {
            if config.game.fields.is_empty() {
                tracing::warn!("no [[game.fields]] configured, the model will stay empty");
            }
            let mut engine = livesync_source_game::build_engine(
                &config.game,
                config.engine.clone(),
                SysinfoProcessLister::new(),
                NativeOpener,
            );
            host::run(&mut engine, tick_rate, spacing, run_for).await
        }
        Command::Display(_) => {
            let runner = livesync_source_display::executor(&config.display);
            let mut engine =
                livesync_source_display::build_engine(&config.display, config.engine.clone(), runner);
            host::run(&mut engine, tick_rate, spacing, run_for).await
        }
        Command::Config => {
            let text =
                toml::to_string_pretty(&config).context("failed to encode configuration")?;
            print!("{text}");
            Ok(())
        }
    }
}

fn apply_overrides(config: &mut AppConfig, command: &Command) {
    match command {
        Command::Media(opts) => {
            if let Some(endpoint) = &opts.endpoint {
                config.media.endpoint = endpoint.clone();
            }
            if opts.no_process_check {
                config.media.require_process = false;
            }
        }
        Command::Game(opts) => {
            if let Some(process) = &opts.process {
                config.game.process_names = vec![process.clone()];
            }
        }
        Command::Display(opts) => {
            if let Some(xrandr) = &opts.xrandr {
                config.display.xrandr_bin = xrandr.clone();
            }
        }
        Command::Config => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cli::{GameOpts, MediaOpts};

    #[test]
    fn media_overrides_replace_config_values() {
        let mut config = AppConfig::default();
        apply_overrides(
            &mut config,
            &Command::Media(MediaOpts {
                endpoint: Some("http://127.0.0.1:1".into()),
                no_process_check: true,
            }),
        );
        assert_eq!(config.media.endpoint, "http://127.0.0.1:1");
        assert!(!config.media.require_process);
    }

    #[test]
    fn absent_overrides_keep_config() {
        let mut config = AppConfig::default();
        apply_overrides(&mut config, &Command::Game(GameOpts::default()));
        assert_eq!(config, AppConfig::default());
    }
}
