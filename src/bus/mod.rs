//! In-process event bus for live message updates.
//!
//! Topics are the three mutation kinds (added, updated, deleted). The bus
//! provides:
//! - Fan-out: every subscriber of a topic gets every payload
//! - Per-topic ordering identical for all subscribers
//! - No replay: subscribers only see payloads published after registering
//! - Optional bounded buffers with slow-subscriber dropping
//!
//! # Example
//!
//! ```ignore
//! let bus = Arc::new(EventBus::new(BusConfig::default()));
//! let mut added = bus.subscribe(Topic::Added);
//!
//! bus.publish(Topic::Added, &message);
//!
//! while let Some(message) = added.next().await {
//!     println!("new message: {:?}", message);
//! }
//! ```

mod manager;
mod types;

pub use manager::{EventBus, Subscription};
pub use types::{BusConfig, DropReason, SubscriptionId, Topic};
