//! Simulated telemetry.
//!
//! Stands in for real devices: moves active participants a little on every
//! motion tick and occasionally raises an alert on an alert tick. Positions
//! enter the system through [`BroadcastHub::ingest`], the same path a real
//! device report takes.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

use trackpro_core::participant::Participant;
use trackpro_core::tracking::{AlertInfo, AlertKind, AlertType, NewTrackingPoint, TrackingPoint};
use trackpro_core::{GeoPoint, LiveMessage};
use trackpro_db::{EntityStore, StoreResult};

use crate::config::SimulationConfig;
use crate::hub::BroadcastHub;

const DEFAULT_BATTERY: f64 = 100.0;
const DEFAULT_ELEVATION: f64 = 100.0;

/// Sampling bound for a configured magnitude. Non-finite values count as 0.
fn magnitude(value: f64) -> f64 {
    if value.is_finite() {
        value.abs()
    } else {
        0.0
    }
}

/// Next simulated point for a participant, derived from its last one.
///
/// An unknown battery or elevation starts at its default and is only
/// drained or jittered from the following tick on. Alert state is carried
/// forward unchanged.
pub fn next_position(prev: &TrackingPoint, config: &SimulationConfig, rng: &mut impl Rng) -> NewTrackingPoint {
    let offset = magnitude(config.max_offset_deg);
    let jitter = magnitude(config.elevation_jitter);

    let battery = match prev.battery {
        Some(level) => (level - magnitude(config.battery_drain)).clamp(0.0, 100.0),
        None => DEFAULT_BATTERY,
    };
    let elevation = match prev.elevation {
        Some(meters) => meters + rng.gen_range(-jitter..=jitter),
        None => DEFAULT_ELEVATION,
    };

    NewTrackingPoint {
        participant_id: prev.participant_id,
        event_id: prev.event_id,
        timestamp: None,
        location: GeoPoint::new(
            prev.location.lat + rng.gen_range(-offset..=offset),
            prev.location.lng + rng.gen_range(-offset..=offset),
        ),
        speed: Some(rng.gen_range(0.0..=magnitude(config.max_speed_kmh))),
        battery: Some(battery),
        elevation: Some(elevation),
        has_alert: prev.has_alert,
        alert_type: prev.alert_type,
    }
}

/// Timer-driven source of synthetic tracking points and alerts.
pub struct EventGenerator {
    store: Arc<dyn EntityStore>,
    hub: Arc<BroadcastHub>,
    config: SimulationConfig,
    rng: Mutex<StdRng>,
}

impl EventGenerator {
    pub fn new(
        store: Arc<dyn EntityStore>,
        hub: Arc<BroadcastHub>,
        config: SimulationConfig,
        rng: StdRng,
    ) -> Self {
        Self {
            store,
            hub,
            config,
            rng: Mutex::new(rng),
        }
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut rng)
    }

    /// Active participants of every event, each with its latest point.
    async fn active_positions(&self) -> StoreResult<Vec<(Participant, TrackingPoint)>> {
        let mut positions = Vec::new();
        for event in self.store.list_events().await? {
            for participant in self.store.participants_for_event(event.id).await? {
                if !participant.is_active() {
                    continue;
                }
                if let Some(latest) = self.store.latest_tracking_point(participant.id).await? {
                    positions.push((participant, latest));
                }
            }
        }
        Ok(positions)
    }

    /// Move every active participant with a known position one step.
    ///
    /// Returns the number of points persisted and broadcast. A failed
    /// participant is logged and skipped.
    pub async fn motion_tick(&self) -> StoreResult<usize> {
        let positions = self.active_positions().await?;
        let mut moved = 0;

        for (participant, latest) in positions {
            let next = self.with_rng(|rng| next_position(&latest, &self.config, rng));
            match self.hub.ingest(next).await {
                Ok(_) => moved += 1,
                Err(e) => error!(participant_id = participant.id, error = %e, "Motion tick failed"),
            }
        }

        debug!(moved, "Motion tick");
        Ok(moved)
    }

    /// Possibly raise an alert on one active participant without an open alert.
    pub async fn alert_tick(&self) -> StoreResult<Option<AlertInfo>> {
        let probability = if self.config.alert_probability.is_finite() {
            self.config.alert_probability.clamp(0.0, 1.0)
        } else {
            0.0
        };
        if !self.with_rng(|rng| rng.gen_bool(probability)) {
            return Ok(None);
        }

        let candidates: Vec<(Participant, TrackingPoint)> = self
            .active_positions()
            .await?
            .into_iter()
            .filter(|(_, latest)| !latest.has_alert)
            .collect();

        let picked = self.with_rng(|rng| {
            let index = (!candidates.is_empty()).then(|| rng.gen_range(0..candidates.len()));
            let kind = AlertKind::ALL.choose(rng).copied().unwrap_or(AlertKind::Sos);
            index.map(|i| (i, kind))
        });
        let Some((index, kind)) = picked else {
            debug!("Alert tick found no candidate");
            return Ok(None);
        };
        let (participant, latest) = &candidates[index];

        let report = NewTrackingPoint {
            timestamp: None,
            has_alert: true,
            alert_type: Some(AlertType::Open(kind)),
            ..latest.to_input()
        };
        let point = self.store.create_tracking_point(report).await?;

        let alert = AlertInfo::project(&point, participant);
        if let Some(alert) = &alert {
            info!(
                participant_id = participant.id,
                alert_type = %alert.alert_type,
                "Alert raised"
            );
            self.hub.broadcast(&LiveMessage::alert_raised(alert.clone()));
        }
        Ok(alert)
    }

    /// Run both ticks on their intervals until `shutdown` flips to `true`.
    pub fn spawn(self: Arc<Self>, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        info!(
            motion_secs = self.config.motion_interval_secs,
            alert_secs = self.config.alert_interval_secs,
            "Starting event generator"
        );

        let motion = {
            let generator = self.clone();
            spawn_ticker("motion", self.config.motion_interval(), shutdown.clone(), move || {
                let generator = generator.clone();
                async move { generator.motion_tick().await.map(|_| ()) }
            })
        };
        let alert = {
            let generator = self.clone();
            spawn_ticker("alert", self.config.alert_interval(), shutdown, move || {
                let generator = generator.clone();
                async move { generator.alert_tick().await.map(|_| ()) }
            })
        };

        vec![motion, alert]
    }
}

/// Call `tick` every `period`, first after one full period. A tick body
/// always completes before the next one starts.
fn spawn_ticker<F, Fut>(
    name: &'static str,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
    mut tick: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = StoreResult<()>> + Send,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = tick().await {
                        error!(tick = name, error = %e, "Generator tick failed");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
        debug!(tick = name, "Generator tick stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::SUBSCRIBER_BUFFER_SIZE;
    use rand::SeedableRng;
    use tokio::sync::mpsc;
    use trackpro_core::event::{EventStatus, NewEvent};
    use trackpro_core::participant::{NewParticipant, ParticipantStatus};
    use trackpro_core::live::AlertPayload;
    use trackpro_db::MemoryStore;

    struct Fixture {
        store: Arc<MemoryStore>,
        hub: Arc<BroadcastHub>,
    }

    impl Fixture {
        async fn new(statuses: &[ParticipantStatus]) -> Self {
            let store = Arc::new(MemoryStore::new());
            let now = chrono::Utc::now();
            store
                .create_event(NewEvent {
                    name: "Mountain Challenge".to_string(),
                    description: None,
                    start_date: now,
                    end_date: now + chrono::Duration::hours(5),
                    location: "San Francisco, CA".to_string(),
                    status: EventStatus::Active,
                    route_id: None,
                    created_by: None,
                    max_participants: None,
                })
                .await
                .unwrap();
            for (i, status) in statuses.iter().enumerate() {
                store
                    .create_participant(NewParticipant {
                        number: i as i64 + 1,
                        name: format!("Runner {}", i + 1),
                        event_id: 1,
                        status: *status,
                        emergency_contact: None,
                        emergency_phone: None,
                    })
                    .await
                    .unwrap();
            }
            let hub = Arc::new(BroadcastHub::new(store.clone()));
            Self { store, hub }
        }

        fn generator(&self, config: SimulationConfig) -> EventGenerator {
            EventGenerator::new(self.store.clone(), self.hub.clone(), config, StdRng::seed_from_u64(3))
        }

        async fn place(&self, participant_id: i64, battery: Option<f64>, alert: Option<AlertType>) -> TrackingPoint {
            self.store
                .create_tracking_point(NewTrackingPoint {
                    participant_id,
                    event_id: 1,
                    timestamp: None,
                    location: GeoPoint::new(37.7749, -122.4194),
                    speed: Some(5.0),
                    battery,
                    elevation: None,
                    has_alert: alert.is_some(),
                    alert_type: alert,
                })
                .await
                .unwrap()
        }

        fn subscribe(&self) -> mpsc::Receiver<String> {
            let (tx, mut rx) = mpsc::channel(SUBSCRIBER_BUFFER_SIZE);
            self.hub.accept(tx);
            rx.try_recv().unwrap();
            rx
        }
    }

    fn always_alert() -> SimulationConfig {
        SimulationConfig {
            alert_probability: 1.0,
            ..SimulationConfig::default()
        }
    }

    #[tokio::test]
    async fn test_motion_tick_moves_participant() {
        let fx = Fixture::new(&[ParticipantStatus::Active]).await;
        let prev = fx.place(1, Some(50.0), None).await;
        let mut rx = fx.subscribe();

        let moved = fx.generator(SimulationConfig::default()).motion_tick().await.unwrap();
        assert_eq!(moved, 1);

        let latest = fx.store.latest_tracking_point(1).await.unwrap().unwrap();
        assert_ne!(latest.id, prev.id);
        assert!((37.77465..=37.77515).contains(&latest.location.lat));
        assert!((-122.41965..=-122.41915).contains(&latest.location.lng));
        assert!((latest.battery.unwrap() - 49.9).abs() < 1e-9);
        assert_eq!(latest.has_alert, prev.has_alert);
        assert_eq!(latest.elevation.map(|e| (e - 100.0).abs() <= 1.0), Some(true));

        let history = fx.store.tracking_history(1, 10).await.unwrap();
        assert_eq!(history[0].id, latest.id);

        let msg: LiveMessage = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        match msg {
            LiveMessage::PositionUpdate(point) => {
                assert_eq!(point.participant_id, 1);
                assert_eq!(point.id, latest.id);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_motion_tick_floors_battery_and_carries_alert() {
        let fx = Fixture::new(&[ParticipantStatus::Active]).await;
        fx.place(1, Some(0.05), Some(AlertType::Open(AlertKind::LowBattery))).await;

        fx.generator(SimulationConfig::default()).motion_tick().await.unwrap();

        let latest = fx.store.latest_tracking_point(1).await.unwrap().unwrap();
        assert_eq!(latest.battery, Some(0.0));
        assert!(latest.has_alert);
        assert_eq!(latest.alert_type, Some(AlertType::Open(AlertKind::LowBattery)));
    }

    #[tokio::test]
    async fn test_motion_tick_defaults_unknown_battery() {
        let fx = Fixture::new(&[ParticipantStatus::Active]).await;
        fx.place(1, None, None).await;

        fx.generator(SimulationConfig::default()).motion_tick().await.unwrap();

        let latest = fx.store.latest_tracking_point(1).await.unwrap().unwrap();
        assert_eq!(latest.battery, Some(100.0));
    }

    #[test]
    fn test_non_finite_config_does_not_panic() {
        let prev = TrackingPoint {
            id: 1,
            participant_id: 1,
            event_id: 1,
            timestamp: chrono::Utc::now(),
            location: GeoPoint::new(37.7749, -122.4194),
            speed: None,
            battery: Some(50.0),
            elevation: Some(10.0),
            has_alert: false,
            alert_type: None,
        };
        let config = SimulationConfig {
            max_offset_deg: f64::NAN,
            elevation_jitter: f64::INFINITY,
            battery_drain: f64::NAN,
            max_speed_kmh: f64::INFINITY,
            ..SimulationConfig::default()
        };

        let next = next_position(&prev, &config, &mut StdRng::seed_from_u64(3));
        assert_eq!(next.location, prev.location);
        assert_eq!(next.battery, Some(50.0));
        assert_eq!(next.elevation, Some(10.0));
        assert_eq!(next.speed, Some(0.0));
    }

    #[tokio::test]
    async fn test_nan_alert_probability_never_fires() {
        let fx = Fixture::new(&[ParticipantStatus::Active]).await;
        fx.place(1, Some(80.0), None).await;
        let generator = fx.generator(SimulationConfig {
            alert_probability: f64::NAN,
            ..SimulationConfig::default()
        });

        for _ in 0..20 {
            assert!(generator.alert_tick().await.unwrap().is_none());
        }
    }

    #[tokio::test]
    async fn test_motion_tick_skips_unknown_and_inactive() {
        let fx = Fixture::new(&[
            ParticipantStatus::Active,
            ParticipantStatus::Withdrawn,
            ParticipantStatus::Active,
        ])
        .await;
        fx.place(2, Some(80.0), None).await;
        fx.place(3, Some(80.0), None).await;

        let moved = fx.generator(SimulationConfig::default()).motion_tick().await.unwrap();
        assert_eq!(moved, 1);
        assert!(fx.store.latest_tracking_point(1).await.unwrap().is_none());
        assert_eq!(fx.store.tracking_history(2, 10).await.unwrap().len(), 1);
        assert_eq!(fx.store.tracking_history(3, 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_alert_tick_never_fires_at_zero_probability() {
        let fx = Fixture::new(&[ParticipantStatus::Active]).await;
        fx.place(1, Some(80.0), None).await;
        let generator = fx.generator(SimulationConfig {
            alert_probability: 0.0,
            ..SimulationConfig::default()
        });

        for _ in 0..20 {
            assert!(generator.alert_tick().await.unwrap().is_none());
        }
        assert!(fx.store.active_alerts(1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_alert_tick_raises_alert_message() {
        let fx = Fixture::new(&[ParticipantStatus::Active]).await;
        let prev = fx.place(1, Some(80.0), None).await;
        let mut rx = fx.subscribe();

        let info = fx.generator(always_alert()).alert_tick().await.unwrap().unwrap();
        assert_eq!(info.participant_id, 1);
        assert!(info.alert_type.is_open());
        assert_eq!(info.location, prev.location);

        let latest = fx.store.latest_tracking_point(1).await.unwrap().unwrap();
        assert!(latest.has_alert);
        assert_eq!(latest.battery, prev.battery);
        assert_eq!(info.tracking_point_id, latest.id);

        let msg: LiveMessage = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
        assert_eq!(msg, LiveMessage::Alert(AlertPayload::Raised(info)));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_alert_tick_skips_participants_with_open_alerts() {
        let fx = Fixture::new(&[ParticipantStatus::Active, ParticipantStatus::Active]).await;
        fx.place(1, Some(80.0), Some(AlertType::Open(AlertKind::Sos))).await;
        fx.place(2, Some(80.0), None).await;
        let generator = fx.generator(always_alert());

        let info = generator.alert_tick().await.unwrap().unwrap();
        assert_eq!(info.participant_id, 2);

        assert!(generator.alert_tick().await.unwrap().is_none());
        assert_eq!(fx.store.tracking_history(1, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_resolved_participant_is_eligible_again() {
        let fx = Fixture::new(&[ParticipantStatus::Active]).await;
        let sos = fx.place(1, Some(80.0), Some(AlertType::Open(AlertKind::Sos))).await;
        let generator = fx.generator(always_alert());

        assert!(generator.alert_tick().await.unwrap().is_none());
        fx.store.resolve_alert(sos.id).await.unwrap();
        assert!(generator.alert_tick().await.unwrap().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_ticks_stop_on_shutdown() {
        let fx = Fixture::new(&[ParticipantStatus::Active]).await;
        fx.place(1, Some(80.0), None).await;
        let generator = Arc::new(fx.generator(SimulationConfig {
            alert_probability: 0.0,
            ..SimulationConfig::default()
        }));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let tasks = generator.spawn(shutdown_rx);

        tokio::time::sleep(std::time::Duration::from_millis(5_500)).await;
        assert_eq!(fx.store.tracking_history(1, 10).await.unwrap().len(), 2);

        shutdown_tx.send(true).unwrap();
        for task in tasks {
            task.await.unwrap();
        }
        tokio::time::sleep(std::time::Duration::from_secs(30)).await;
        assert_eq!(fx.store.tracking_history(1, 10).await.unwrap().len(), 2);
    }
}
