//! Per-operation event buffering.
//!
//! The processor's primary operations accumulate events into a `Buffer`
//! rather than publishing them as they're produced. On success the caller
//! flushes the buffer, publishing events to the sink in the order they were
//! recorded; on failure the caller simply drops the buffer and nothing is
//! published.

use crate::events::sink::EventSink;
use crate::events::types::{AccountStatusEvent, DomainEvent, SessionStatusEvent};

#[derive(Debug, Default)]
pub struct EventBuffer {
    events: Vec<DomainEvent>,
}

impl EventBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_account_status(&mut self, event: AccountStatusEvent) {
        self.events.push(DomainEvent::AccountStatus(event));
    }

    pub fn push_session_status(&mut self, event: SessionStatusEvent) {
        self.events.push(DomainEvent::SessionStatus(event));
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[DomainEvent] {
        &self.events
    }

    /// Publish every buffered event, in recorded order, then consume self.
    pub async fn flush(self, sink: &dyn EventSink) {
        for event in self.events {
            match event {
                DomainEvent::AccountStatus(e) => sink.emit_account_status(e).await,
                DomainEvent::SessionStatus(e) => sink.emit_session_status(e).await,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::sink::NullEventSink;
    use uuid::Uuid;

    #[tokio::test]
    async fn flush_publishes_in_recorded_order() {
        let mut buf = EventBuffer::new();
        buf.push_account_status(AccountStatusEvent::Created {
            account_id: 1,
            name: "alice".into(),
        });
        buf.push_session_status(SessionStatusEvent::created(Uuid::new_v4(), 1));

        let recorded: Vec<_> = buf.events().to_vec();
        assert_eq!(recorded.len(), 2);
        assert!(matches!(recorded[0], DomainEvent::AccountStatus(_)));
        assert!(matches!(recorded[1], DomainEvent::SessionStatus(_)));

        buf.flush(&NullEventSink).await;
    }

    #[test]
    fn discarding_an_unflushed_buffer_emits_nothing() {
        let mut buf = EventBuffer::new();
        buf.push_account_status(AccountStatusEvent::Created {
            account_id: 1,
            name: "alice".into(),
        });
        assert!(!buf.is_empty());
        drop(buf);
    }
}
