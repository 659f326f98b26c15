//! TrackPro Entity Store.
//!
//! Async CRUD access to events, routes, checkpoints, participants, devices
//! and tracking points. [`MemoryStore`] keeps everything in process memory;
//! data is lost on restart.

pub mod memory;
pub mod seed;
pub mod store;

pub use memory::MemoryStore;
pub use seed::seed_demo_data;
pub use store::{EntityStore, StoreError, StoreResult};

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

/// Initialize a shared store, optionally filled with the demo event.
pub async fn init_store(with_demo_data: bool) -> StoreResult<Arc<MemoryStore>> {
    let store = Arc::new(MemoryStore::new());
    if with_demo_data {
        let mut rng = StdRng::from_entropy();
        seed_demo_data(store.as_ref(), &mut rng).await?;
    }
    Ok(store)
}
