//! TrackPro Web Server
//!
//! Axum server exposing the REST API, the `/ws` live-update channel and
//! the simulated telemetry generator.

pub mod config;
pub mod generator;
pub mod hub;
pub mod routes;
pub mod state;
pub mod websocket;

use axum::{
    routing::{get, post, put},
    Router,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tokio::sync::watch;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use trackpro_db::EntityStore;

pub use config::{ServerConfig, SimulationConfig};
pub use generator::EventGenerator;
pub use hub::{BroadcastHub, ConnectionId, InboundOutcome, SubscriberRegistry};
use state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Events
        .route("/events", get(routes::events::list_events).post(routes::events::create_event))
        .route("/events/{id}", get(routes::events::get_event).put(routes::events::update_event))
        .route("/events/{id}/stats", get(routes::events::get_event_stats))
        .route("/events/{id}/route", get(routes::events::get_event_route))
        .route("/events/{id}/participants", get(routes::participants::list_event_participants))
        .route(
            "/events/{id}/participants/tracking",
            get(routes::participants::list_event_participants_tracking),
        )
        .route("/events/{id}/alerts", get(routes::tracking::list_event_alerts))
        // Routes
        .route("/routes", get(routes::routes::list_routes).post(routes::routes::create_route))
        .route("/routes/{id}", get(routes::routes::get_route))
        .route("/routes/{id}/checkpoints", get(routes::routes::list_route_checkpoints))
        // Checkpoints
        .route("/checkpoints", post(routes::checkpoints::create_checkpoint))
        .route(
            "/checkpoints/{id}",
            put(routes::checkpoints::update_checkpoint).delete(routes::checkpoints::delete_checkpoint),
        )
        // Participants
        .route("/participants", post(routes::participants::create_participant))
        .route(
            "/participants/{id}",
            get(routes::participants::get_participant).put(routes::participants::update_participant),
        )
        .route("/participants/{id}/tracking", get(routes::participants::get_participant_tracking))
        .route("/participants/{id}/device", get(routes::participants::get_participant_device))
        // Tracking
        .route("/tracking", post(routes::tracking::create_tracking_point))
        .route("/tracking/{id}/resolve-alert", post(routes::tracking::resolve_alert))
        // Devices
        .route("/devices", get(routes::devices::list_devices).post(routes::devices::create_device))
        .route("/devices/unassigned", get(routes::devices::list_unassigned_devices))
        .route("/devices/type/{device_type}", get(routes::devices::list_devices_by_type))
        .route("/devices/{id}", get(routes::devices::get_device).put(routes::devices::update_device))
        .route(
            "/devices/{id}/assign/{participant_id}",
            post(routes::devices::assign_device),
        )
        .route("/devices/{id}/unassign", post(routes::devices::unassign_device))
        .with_state(state.clone());

    Router::new()
        .nest("/api", api_routes)
        .route("/ws", get(websocket::ws_handler))
        .route("/internal/notify", post(routes::internal::notify))
        .route("/health", get(routes::internal::health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Run the web server, and the event generator when enabled, until Ctrl-C.
pub async fn run_server(config: ServerConfig, store: Arc<dyn EntityStore>) -> anyhow::Result<()> {
    if config.simulation.enabled {
        config.simulation.validate()?;
    }
    let state = AppState::new(store.clone());
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let tasks = if config.simulation.enabled {
        let generator = Arc::new(EventGenerator::new(
            store,
            state.hub.clone(),
            config.simulation.clone(),
            StdRng::from_entropy(),
        ));
        generator.spawn(shutdown_rx)
    } else {
        tracing::info!("Event generator disabled");
        Vec::new()
    };

    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    tracing::info!("Web server listening on http://{}", config.bind_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown requested");
        })
        .await?;

    let _ = shutdown_tx.send(true);
    for task in tasks {
        let _ = task.await;
    }
    Ok(())
}
