//! TrackPro Core Library
//!
//! Domain models, the live-update message taxonomy and the pure
//! computations (geometry, derived statistics) shared by the server
//! and the dashboard client.

pub mod device;
pub mod error;
pub mod event;
pub mod geo;
pub mod live;
pub mod participant;
pub mod route;
pub mod tracking;

pub use error::{CoreError, CoreResult};
pub use geo::GeoPoint;
pub use live::LiveMessage;
