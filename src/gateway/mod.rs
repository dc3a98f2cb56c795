//! Subscription gateway: maps client connections onto event bus topics.
//!
//! A connection may hold any number of subscriptions, each started and
//! stopped independently by a client-chosen id. Only events published after
//! a subscription starts are forwarded; there is no backlog.
//!
//! [`GatewayConnection`] is transport-agnostic: it consumes parsed
//! [`ClientFrame`]s and writes [`ServerFrame`]s to a queue. [`run_ws_session`]
//! binds it to an axum WebSocket.

mod connection;
mod protocol;
mod session;

pub use connection::{FrameOutcome, GatewayConnection};
pub use protocol::{ClientFrame, ErrorPayload, ServerFrame, StartPayload};
pub use session::run_ws_session;
