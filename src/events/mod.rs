// Event system for freeze-mode transitions.
//
// Subscribers (audit sinks, notifiers) observe transitions without being in
// the transition path; publishing to zero subscribers is not an error.

pub mod publisher;

pub use publisher::{EventPublisher, FreezeTransitionEvent, PublishError};
