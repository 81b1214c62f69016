//! Outbound command publishing for the REST write paths: `POST`/`DELETE`
//! publish a command rather than calling the processor inline.

use async_trait::async_trait;
use rdkafka::producer::{FutureProducer, FutureRecord};
use rdkafka::ClientConfig;
use uuid::Uuid;

use crate::dispatcher::{CreateAccountCommand, SessionCommand};
use crate::error::CoreError;
use crate::tenant::TenantId;

#[async_trait]
pub trait CommandProducer: Send + Sync {
    async fn publish_create_account(
        &self,
        tenant: &TenantId,
        cmd: CreateAccountCommand,
    ) -> Result<(), CoreError>;

    async fn publish_session_command(
        &self,
        tenant: &TenantId,
        cmd: SessionCommand,
    ) -> Result<(), CoreError>;
}

pub struct KafkaCommandProducer {
    producer: FutureProducer,
    command_topic_create_account: String,
    command_topic_account_session: String,
}

impl KafkaCommandProducer {
    pub fn new(
        bootstrap_servers: &str,
        command_topic_create_account: String,
        command_topic_account_session: String,
    ) -> Result<Self, CoreError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", bootstrap_servers)
            .set("message.timeout.ms", "5000")
            .create()
            .map_err(|e| CoreError::StorageError(e.to_string()))?;
        Ok(Self {
            producer,
            command_topic_create_account,
            command_topic_account_session,
        })
    }

    fn tenant_headers(tenant: &TenantId) -> rdkafka::message::OwnedHeaders {
        rdkafka::message::OwnedHeaders::new()
            .insert(rdkafka::message::Header {
                key: "TENANT_ID",
                value: Some(&tenant.id.to_string()),
            })
            .insert(rdkafka::message::Header {
                key: "REGION",
                value: Some(&tenant.region),
            })
            .insert(rdkafka::message::Header {
                key: "MAJOR_VERSION",
                value: Some(&tenant.major_version.to_string()),
            })
            .insert(rdkafka::message::Header {
                key: "MINOR_VERSION",
                value: Some(&tenant.minor_version.to_string()),
            })
    }
}

#[async_trait]
impl CommandProducer for KafkaCommandProducer {
    async fn publish_create_account(
        &self,
        tenant: &TenantId,
        cmd: CreateAccountCommand,
    ) -> Result<(), CoreError> {
        let payload = serde_json::to_vec(&cmd).map_err(|e| CoreError::StorageError(e.to_string()))?;
        let key = cmd.name.clone();
        let headers = Self::tenant_headers(tenant);
        let record = FutureRecord::to(&self.command_topic_create_account)
            .payload(&payload)
            .key(&key)
            .headers(headers);
        self.producer
            .send(record, std::time::Duration::from_secs(5))
            .await
            .map_err(|(e, _)| CoreError::StorageError(e.to_string()))?;
        Ok(())
    }

    async fn publish_session_command(
        &self,
        tenant: &TenantId,
        cmd: SessionCommand,
    ) -> Result<(), CoreError> {
        let key = cmd.account_id.to_string();
        let payload = serde_json::to_vec(&cmd).map_err(|e| CoreError::StorageError(e.to_string()))?;
        let headers = Self::tenant_headers(tenant);
        let record = FutureRecord::to(&self.command_topic_account_session)
            .payload(&payload)
            .key(&key)
            .headers(headers);
        self.producer
            .send(record, std::time::Duration::from_secs(5))
            .await
            .map_err(|(e, _)| CoreError::StorageError(e.to_string()))?;
        Ok(())
    }
}

/// Session id used on the `DELETE /accounts/{id}/session` path: always nil,
/// since that path publishes a `Logout` with no session of its own.
pub fn nil_session_id() -> Uuid {
    Uuid::nil()
}
