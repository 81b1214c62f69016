//! The event emitter interface.
//!
//! Abstract sink that accepts typed domain events, either directly or
//! flushed from a `Buffer`. Modelled as an `#[async_trait]` the same way
//! the store's `Service` trait is, so the processor can be tested without
//! a live Kafka producer.

use async_trait::async_trait;

use crate::events::types::{AccountStatusEvent, SessionStatusEvent};

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit_account_status(&self, event: AccountStatusEvent);
    async fn emit_session_status(&self, event: SessionStatusEvent);
}

/// Discards every event. Useful for the sweeper's tests and for any
/// composition path that has no configured producer.
pub struct NullEventSink;

#[async_trait]
impl EventSink for NullEventSink {
    async fn emit_account_status(&self, _event: AccountStatusEvent) {}
    async fn emit_session_status(&self, _event: SessionStatusEvent) {}
}
