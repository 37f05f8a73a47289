//! Core types for hubbub: composable, single-threaded event emitters.

pub mod bus;
pub mod channel;
pub mod error;
pub mod hub;
pub mod reactive;
pub mod stack;
pub mod suggestions;

// Re-export reactive types for convenience
pub use reactive::{Effect, Scope, Signal, batch, in_scope, on_cleanup, untracked};

// Re-export the emitters and the hub
pub use bus::{Batched, EventBus, batch_emits};
pub use channel::{Accessor, AnyChannel, Channel, ChannelMap, ChannelSet, Unsubscribe};
pub use error::{HubError, Result};
pub use hub::{ChannelFactory, EventHub, HubEvent, Store};
pub use stack::{EventStack, StackOptions};
