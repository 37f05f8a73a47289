//! hubbub - composable event emitters for reactive UIs.
//!
//! hubbub provides small, synchronous, single-threaded event primitives meant
//! to be used inside a reactive component model:
//!
//! | Type | Purpose |
//! |------|---------|
//! | [`EventBus`] | Simple emitter: `listen`, `emit`, `clear` |
//! | [`EventStack`] | Emitter that keeps emitted values on a reactive stack |
//! | [`EventHub`] | Named channels with by-name dispatch, one global stream and a store |
//!
//! # Quick Start
//!
//! ```ignore
//! use hubbub::prelude::*;
//!
//! #[derive(ChannelSet)]
//! struct Channels {
//!     clicks: EventBus<u32>,
//!     toasts: EventStack<String>,
//! }
//!
//! fn main() -> hubbub::Result<()> {
//!     let hub = EventHub::from_factory(|cx| Channels {
//!         clicks: cx.bus(),
//!         toasts: cx.stack(),
//!     });
//!
//!     hub.listen(|event| println!("{} fired", event.name));
//!
//!     hub.clicks.emit(1);
//!     hub.emit("toasts", String::from("saved"))?;
//!
//!     let toasts: Vec<String> = hub.store().get("toasts").unwrap_or_default();
//!     assert_eq!(toasts, vec!["saved"]);
//!     Ok(())
//! }
//! ```
//!
//! # Lifetimes
//!
//! Every listen operation returns an [`Unsubscribe`] handle. Listeners,
//! channels and hubs created while a [`Scope`] runs are also released when
//! that scope is disposed, so a component's scope cleans up after it.

pub mod prelude {
    //! Common imports for hubbub users.
    pub use hubbub_core::{
        Channel, ChannelMap, ChannelSet, Effect, EventBus, EventHub, EventStack, HubError,
        HubEvent, Scope, Signal, StackOptions, Unsubscribe, batch, batch_emits, on_cleanup,
        untracked,
    };
    #[cfg(feature = "macros")]
    pub use hubbub_macros::ChannelSet;
}

// Re-export core types at crate root
pub use hubbub_core::{
    Accessor, AnyChannel, Batched, Channel, ChannelFactory, ChannelMap, ChannelSet, Effect,
    EventBus, EventHub, EventStack, HubError, HubEvent, Result, Scope, Signal, StackOptions, Store,
    Unsubscribe, batch, batch_emits, in_scope, on_cleanup, untracked,
};
#[cfg(feature = "macros")]
pub use hubbub_macros::ChannelSet;

pub use hubbub_core as core;
