//! Domain events and their distribution.
//!
//! Events describe committed changes (a component was added, kit stock moved).
//! They are published only after the store commit and are informational: the
//! store stays the source of truth.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::{EnvelopeError, EventEnvelope};
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
