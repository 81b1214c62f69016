//! Event emitter interface and its supporting buffered-emission model.

pub mod buffer;
pub mod sink;
pub mod types;

pub use buffer::EventBuffer;
pub use sink::{EventSink, NullEventSink};
pub use types::{
    AccountStatusEvent, DomainEvent, SessionErrorBody, SessionStatusEvent, SessionStatusEventBody,
};
