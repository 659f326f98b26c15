//! Application state.

use std::sync::Arc;

use trackpro_db::EntityStore;

use crate::hub::BroadcastHub;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn EntityStore>,
    pub hub: Arc<BroadcastHub>,
}

impl AppState {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        let hub = Arc::new(BroadcastHub::new(store.clone()));
        Self { store, hub }
    }
}
