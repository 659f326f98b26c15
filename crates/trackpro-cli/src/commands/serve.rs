//! Server command.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use trackpro_db::EntityStore;
use trackpro_web::ServerConfig;

#[derive(Args)]
pub struct ServeArgs {
    /// Host to bind to
    #[arg(long, env = "TRACKPRO_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "TRACKPRO_PORT")]
    pub port: Option<u16>,

    /// TOML config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Do not run the position and alert simulator
    #[arg(long)]
    pub no_simulation: bool,

    /// Start with an empty store
    #[arg(long)]
    pub no_seed: bool,

    /// Also write logs to a file
    #[arg(long)]
    pub log: bool,

    /// Log file path (with --log)
    #[arg(long, requires = "log")]
    pub log_file: Option<PathBuf>,
}

impl ServeArgs {
    /// File settings first, then flags and environment on top.
    fn resolve_config(&self) -> Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.no_simulation {
            config.simulation.enabled = false;
        }
        if self.no_seed {
            config.seed_demo_data = false;
        }
        Ok(config)
    }
}

/// The URLs the server answers on.
fn endpoints(config: &ServerConfig) -> [(&'static str, String); 3] {
    let addr = config.bind_addr();
    [
        ("API", format!("http://{}/api", addr)),
        ("WebSocket", format!("ws://{}/ws", addr)),
        ("Health", format!("http://{}/health", addr)),
    ]
}

pub async fn execute(args: ServeArgs) -> Result<()> {
    let config = args.resolve_config()?;
    let store: Arc<dyn EntityStore> = trackpro_db::init_store(config.seed_demo_data).await?;

    println!();
    println!("  {} {}", "TrackPro".cyan().bold(), "Live Tracking".bold());
    println!();
    for (label, url) in endpoints(&config) {
        println!("  {:<10} {}", label.green(), url);
    }
    println!();
    if config.seed_demo_data {
        println!("  {}", "Demo event loaded".dimmed());
    }
    if !config.simulation.enabled {
        println!("  {}", "Simulation disabled".yellow());
    }
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    trackpro_web::run_server(config, store).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::{Cli, Commands};
    use clap::Parser;

    fn serve_args(argv: &[&str]) -> ServeArgs {
        let mut full = vec!["trackpro", "serve"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Commands::Serve(args) => args,
            _ => panic!("expected serve"),
        }
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = serve_args(&["--port", "6000", "--no-simulation", "--no-seed"])
            .resolve_config()
            .unwrap();
        assert_eq!(config.port, 6000);
        assert!(!config.simulation.enabled);
        assert!(!config.seed_demo_data);
    }

    #[test]
    fn test_banner_lists_only_served_paths() {
        let urls: Vec<String> = endpoints(&ServerConfig::default())
            .into_iter()
            .map(|(_, url)| url)
            .collect();
        assert_eq!(
            urls,
            vec![
                "http://127.0.0.1:5000/api",
                "ws://127.0.0.1:5000/ws",
                "http://127.0.0.1:5000/health",
            ]
        );
    }

    #[test]
    fn test_log_file_requires_log() {
        let parsed = Cli::try_parse_from(["trackpro", "serve", "--log-file", "x.log"]);
        assert!(parsed.is_err());
    }
}
