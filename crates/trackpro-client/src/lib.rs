//! TrackPro live-update client.
//!
//! A reconnecting subscriber to the server's `/ws` channel, and the policy
//! that turns each received message into stale marks on a polled query
//! cache.

pub mod api;
pub mod error;
pub mod receiver;
pub mod reconcile;

pub use api::ApiClient;
pub use error::{ClientError, ClientResult};
pub use receiver::{
    Connection, ConnectionState, Connector, LiveReceiver, MessageHandler, ReceiverConfig,
    ReceiverHandle, WsConnector,
};
pub use reconcile::{invalidations, QueryCache, QueryKey, Reconciler};
