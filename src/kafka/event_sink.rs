//! `EventSink` backed by the two outbound Kafka topics.

use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use tracing::error;

use crate::error::CoreError;
use crate::events::{AccountStatusEvent, EventSink, SessionStatusEvent};
use crate::metrics;

pub struct KafkaEventSink {
    producer: FutureProducer,
    event_topic_account_status: String,
    event_topic_account_session_status: String,
}

impl KafkaEventSink {
    pub fn new(
        bootstrap_servers: &str,
        event_topic_account_status: String,
        event_topic_account_session_status: String,
    ) -> Result<Self, CoreError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|e| CoreError::StorageError(e.to_string()))?;
        Ok(Self {
            producer,
            event_topic_account_status,
            event_topic_account_session_status,
        })
    }
}

#[async_trait]
impl EventSink for KafkaEventSink {
    async fn emit_account_status(&self, event: AccountStatusEvent) {
        let account_id = event.account_id();
        let Ok(payload) = serde_json::to_vec(&event) else {
            error!(account_id, "failed to serialize account status event");
            return;
        };
        let key = account_id.to_string();
        let record = FutureRecord::to(&self.event_topic_account_status)
            .payload(&payload)
            .key(&key);
        if self
            .producer
            .send(record, std::time::Duration::from_secs(5))
            .await
            .is_err()
        {
            error!(account_id, "failed to publish account status event");
            return;
        }
        match &event {
            AccountStatusEvent::LoggedIn { .. } => metrics::record_login(),
            AccountStatusEvent::LoggedOut { .. } => metrics::record_logout(),
            AccountStatusEvent::Created { .. } => {}
        }
    }

    async fn emit_session_status(&self, event: SessionStatusEvent) {
        let account_id = event.account_id();
        let Ok(payload) = serde_json::to_vec(&event) else {
            error!(account_id, "failed to serialize session status event");
            return;
        };
        let key = account_id.to_string();
        let record = FutureRecord::to(&self.event_topic_account_session_status)
            .payload(&payload)
            .key(&key);
        if self
            .producer
            .send(record, std::time::Duration::from_secs(5))
            .await
            .is_err()
        {
            error!(account_id, "failed to publish session status event");
        }
    }
}
