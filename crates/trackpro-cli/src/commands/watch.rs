//! Live-update watch command.

use anyhow::Result;
use async_trait::async_trait;
use clap::Args;
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use trackpro_client::{
    ApiClient, LiveReceiver, MessageHandler, QueryCache, QueryKey, ReceiverConfig, Reconciler,
    WsConnector,
};
use trackpro_core::live::AlertPayload;
use trackpro_core::LiveMessage;

#[derive(Args)]
pub struct WatchArgs {
    /// WebSocket endpoint
    #[arg(long, default_value = "ws://127.0.0.1:5000/ws")]
    pub url: String,

    /// REST API root used to refetch stale queries
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    pub api: String,

    /// Event whose dashboard queries are kept fresh
    #[arg(long)]
    pub event: Option<i64>,

    /// Seconds between refetches of stale queries
    #[arg(long, default_value = "2")]
    pub refresh_secs: u64,
}

/// Prints each message and the queries it made stale.
struct Printer {
    reconciler: Reconciler,
}

#[async_trait]
impl MessageHandler for Printer {
    async fn on_message(&self, msg: &LiveMessage) {
        let keys = self.reconciler.apply(msg);
        println!("{} {}", msg.kind().to_string().cyan().bold(), describe(msg));
        for key in keys {
            println!("  {} {}", "stale".yellow(), key);
        }
    }

    async fn on_connect(&self) {
        println!("{}", "connected".green());
    }

    async fn on_disconnect(&self) {
        println!("{}", "disconnected, retrying".red());
    }
}

fn describe(msg: &LiveMessage) -> String {
    match msg {
        LiveMessage::Connected(info) => format!("client {}", info.client_id),
        LiveMessage::PositionUpdate(point) => format!(
            "participant {} at {:.5},{:.5} battery {}",
            point.participant_id,
            point.location.lat,
            point.location.lng,
            point
                .battery
                .map(|b| format!("{:.1}%", b))
                .unwrap_or_else(|| "-".to_string()),
        ),
        LiveMessage::Alert(AlertPayload::Raised(alert)) => format!(
            "#{} {} raised {}",
            alert.participant_number, alert.participant_name, alert.alert_type
        ),
        LiveMessage::Alert(AlertPayload::Resolved(res)) => {
            format!("tracking point {} resolved", res.id)
        }
        LiveMessage::EventUpdate(event) => format!("event {} {}", event.id, event.name),
        LiveMessage::ParticipantStatus(p) => {
            format!("#{} {} {:?}", p.number, p.name, p.status)
        }
    }
}

pub async fn execute(args: WatchArgs) -> Result<()> {
    let api = ApiClient::new(&args.api)?;
    let cache = Arc::new(QueryCache::new());
    match args.event {
        Some(event_id) => QueryKey::dashboard(event_id)
            .into_iter()
            .for_each(|key| cache.track(key)),
        None => cache.track(QueryKey::Events),
    }

    let printer = Arc::new(Printer {
        reconciler: Reconciler::new(cache.clone(), args.event),
    });
    let config = ReceiverConfig {
        url: args.url.clone(),
        ..ReceiverConfig::default()
    };
    let handle = LiveReceiver::new(config, WsConnector::default())
        .with_handler(printer)
        .start();

    println!();
    println!("  {} {}", "TrackPro".cyan().bold(), "Watch".bold());
    println!("  {}  {}", "Live".green(), args.url);
    println!("  {}   {}", "API".green(), args.api);
    println!("  {}", "Ctrl+C to stop".dimmed());
    println!();

    let mut refresh = tokio::time::interval(Duration::from_secs(args.refresh_secs.max(1)));
    loop {
        tokio::select! {
            _ = refresh.tick() => match cache.refresh_stale(&api).await {
                Ok(refreshed) => {
                    for key in refreshed {
                        println!("  {} {}", "refetched".dimmed(), key);
                    }
                }
                Err(e) => warn!(error = %e, "Refresh failed"),
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    handle.shutdown().await;
    Ok(())
}
