//! CLI definition using clap derive.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "livesync", about = "Project a live external source into a host model")]
pub struct Cli {
    /// TOML config file
    #[arg(long, short = 'c', global = true, env = "LIVESYNC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Host tick rate in Hz (overrides [host] tick_rate_hz)
    #[arg(long, global = true)]
    pub tick_rate: Option<f64>,

    /// Stop after this many seconds instead of waiting for ctrl-c
    #[arg(long, global = true)]
    pub duration_secs: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Follow the YouTube Music Desktop player
    Media(MediaOpts),
    /// Follow game values read from process memory
    Game(GameOpts),
    /// Follow the display configuration
    Display(DisplayOpts),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(clap::Args, Default)]
pub struct MediaOpts {
    /// Player endpoint (default: http://localhost:9863)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Query the endpoint even when the app process is not found
    #[arg(long)]
    pub no_process_check: bool,
}

#[derive(clap::Args, Default)]
pub struct GameOpts {
    /// Game process image name (default: re8)
    #[arg(long)]
    pub process: Option<String>,
}

#[derive(clap::Args, Default)]
pub struct DisplayOpts {
    /// xrandr binary
    #[arg(long)]
    pub xrandr: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_media_with_global_flags() {
        let cli = Cli::try_parse_from([
            "livesync",
            "media",
            "--endpoint",
            "http://127.0.0.1:9000",
            "--tick-rate",
            "60",
        ])
        .expect("parse");
        assert_eq!(cli.tick_rate, Some(60.0));
        let Command::Media(opts) = cli.command else {
            panic!("expected media");
        };
        assert_eq!(opts.endpoint.as_deref(), Some("http://127.0.0.1:9000"));
        assert!(!opts.no_process_check);
    }

    #[test]
    fn subcommand_is_required() {
        assert!(Cli::try_parse_from(["livesync"]).is_err());
    }

    #[test]
    fn config_path_flag() {
        let cli = Cli::try_parse_from(["livesync", "-c", "/etc/livesync.toml", "config"])
            .expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("/etc/livesync.toml")));
        assert!(matches!(cli.command, Command::Config));
    }
}
