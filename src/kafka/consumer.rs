//! Inbound command consumption.
//!
//! One task per configured topic. Each message's tenant headers
//! (`TENANT_ID`/`REGION`/`MAJOR_VERSION`/`MINOR_VERSION`) are decoded into a
//! `TenantContext`, used to build a tenant-scoped `Dispatcher`, which then
//! handles the JSON command envelope. Consumer-group rebalancing and
//! partition assignment are left to `rdkafka`'s defaults; a command message
//! is never retried internally — at-least-once delivery from the broker
//! handles retry instead.

use std::sync::Arc;

use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::{ClientConfig, Message};
use tracing::{error, warn};
use uuid::Uuid;

use crate::account::AccountProcessor;
use crate::config::Config;
use crate::db::accounts::AccountStore;
use crate::dispatcher::{CreateAccountCommand, Dispatcher, SessionCommand};
use crate::events::EventSink;
use crate::state::SessionRegistry;
use crate::tenant::{TenantContext, TenantId};

pub struct CommandConsumer {
    consumer: StreamConsumer,
    store: Arc<dyn AccountStore>,
    registry: Arc<SessionRegistry>,
    events: Arc<dyn EventSink>,
    config: Config,
}

impl CommandConsumer {
    pub fn new(
        bootstrap_servers: &str,
        group_id: &str,
        topics: &[&str],
        store: Arc<dyn AccountStore>,
        registry: Arc<SessionRegistry>,
        events: Arc<dyn EventSink>,
        config: Config,
    ) -> Result<Self, crate::error::CoreError> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("group.id", group_id)
            .set("enable.auto.commit", "true")
            .create()
            .map_err(|e| crate::error::CoreError::StorageError(e.to_string()))?;
        consumer
            .subscribe(topics)
            .map_err(|e| crate::error::CoreError::StorageError(e.to_string()))?;
        Ok(Self {
            consumer,
            store,
            registry,
            events,
            config,
        })
    }

    fn dispatcher_for(&self, tenant: TenantId) -> Dispatcher {
        let processor = AccountProcessor::new(
            TenantContext::new(tenant),
            self.store.clone(),
            self.registry.clone(),
            self.events.clone(),
            self.config.clone(),
        );
        Dispatcher::new(processor)
    }

    /// Runs until the process shuts down, processing one message at a time.
    pub async fn run(self) {
        loop {
            match self.consumer.recv().await {
                Ok(message) => self.handle(&message).await,
                Err(e) => error!(error = %e, "kafka consume error"),
            }
        }
    }

    async fn handle(&self, message: &rdkafka::message::BorrowedMessage<'_>) {
        let Some(tenant) = extract_tenant(message) else {
            warn!("dropping message with no/invalid tenant headers");
            return;
        };
        let Some(payload) = message.payload() else {
            warn!("dropping message with empty payload");
            return;
        };
        let dispatcher = self.dispatcher_for(tenant);

        if let Ok(cmd) = serde_json::from_slice::<CreateAccountCommand>(payload) {
            if dispatcher.on_create_account(cmd).await.is_err() {
                warn!("create_account command failed, not retrying inline");
            }
            return;
        }
        match serde_json::from_slice::<SessionCommand>(payload) {
            Ok(cmd) => {
                if dispatcher.on_session_command(cmd).await.is_err() {
                    warn!("session command failed, not retrying inline");
                }
            }
            Err(e) => error!(error = %e, "unrecognized command envelope"),
        }
    }
}

fn extract_tenant(message: &rdkafka::message::BorrowedMessage<'_>) -> Option<TenantId> {
    let headers = message.headers()?;
    let mut id = None;
    let mut region = None;
    let mut major = None;
    let mut minor = None;
    for i in 0..headers.count() {
        let header = headers.get(i);
        let value = header.value.and_then(|v| std::str::from_utf8(v).ok());
        match header.key {
            "TENANT_ID" => id = value.and_then(|v| Uuid::parse_str(v).ok()),
            "REGION" => region = value.map(str::to_string),
            "MAJOR_VERSION" => major = value.and_then(|v| v.parse().ok()),
            "MINOR_VERSION" => minor = value.and_then(|v| v.parse().ok()),
            _ => {}
        }
    }
    Some(TenantId::new(id?, region?, major?, minor?))
}
