//! Kafka transport edge.
//!
//! Thin adapters only: the consumer deserializes command envelopes and
//! calls the dispatcher; the producer serializes domain commands/events and
//! publishes them, partitioned by `AccountId` so per-account ordering is
//! preserved. No business logic lives here.

pub mod consumer;
pub mod event_sink;
pub mod producer;

pub use consumer::CommandConsumer;
pub use event_sink::KafkaEventSink;
pub use producer::{CommandProducer, KafkaCommandProducer};
