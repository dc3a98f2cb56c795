//! # Message Board
//!
//! A real-time message board backend. Clients list, post, update and delete
//! messages; every successful mutation is fanned out to the clients
//! subscribed to its topic.
//!
//! ## Core Concepts
//!
//! - **Record store**: durable storage of messages behind [`RecordStore`]
//! - **Event bus**: in-process fan-out over the added/updated/deleted topics
//! - **Mutation service**: validate, commit, then publish exactly one event
//! - **Subscription gateway**: per-connection streams of bus events
//!
//! ## Example
//!
//! ```ignore
//! use message_board::{Board, EventBus, MemoryStore, MutationOptions, NewMessage, Topic};
//!
//! let bus = Arc::new(EventBus::default());
//! let board = Board::new(Arc::new(MemoryStore::new()), bus, MutationOptions::default());
//!
//! let mut added = board.subscribe(Topic::Added);
//! board.mutations().post_message(NewMessage::new("A", "hi")).await?;
//!
//! let message = added.next().await;
//! ```

pub mod api;
pub mod bus;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod server;
pub mod service;
pub mod store;
pub mod types;

// Re-exports
pub use api::{Board, ErrorBody, Operation, Output, Response};
pub use bus::{BusConfig, DropReason, EventBus, Subscription, SubscriptionId, Topic};
pub use config::{BoardConfig, LogConfig, ServerConfig};
pub use error::{BoardError, Result};
pub use gateway::{ClientFrame, FrameOutcome, GatewayConnection, ServerFrame};
pub use server::BoardServer;
pub use service::{MutationOptions, MutationService, QueryService};
pub use store::{MemoryStore, RecordStore};
pub use types::*;
