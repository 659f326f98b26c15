//! CLI command definitions and handlers.

use anyhow::Result;
use clap::{Parser, Subcommand};

pub mod serve;
pub mod watch;

/// TrackPro - live event tracking
#[derive(Parser)]
#[command(name = "trackpro")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API, the live-update channel and the simulator
    Serve(serve::ServeArgs),

    /// Follow live updates and keep a dashboard's queries fresh
    Watch(watch::WatchArgs),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Serve(args) => serve::execute(args).await,
            Commands::Watch(args) => watch::execute(args).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_watch() {
        let cli = Cli::try_parse_from(["trackpro", "watch", "--event", "3"]).unwrap();
        match cli.command {
            Commands::Watch(args) => assert_eq!(args.event, Some(3)),
            _ => panic!("expected watch"),
        }
    }
}
