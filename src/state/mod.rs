//! Session state: value types, the registry, and the transition-timeout
//! sweeper.

pub mod registry;
pub mod sweeper;
pub mod types;

pub use registry::SessionRegistry;
pub use sweeper::TransitionSweeper;
pub use types::{maximal_state, AccountKey, Service, ServiceKey, State, StateValue};
