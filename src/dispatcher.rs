//! Command dispatcher.
//!
//! Routes inbound commands to the processor and flushes its event buffer
//! on success. Deliberately free of HTTP and Kafka types — the REST
//! resource and the Kafka consumer both call through this same surface
//! from the composition root.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::account::AccountProcessor;
use crate::error::CoreResult;
use crate::events::EventBuffer;
use crate::metrics;
use crate::teardown::TeardownCoordinator;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountCommand {
    pub name: String,
    pub password: String,
}

/// `ACCOUNT_SESSION_COMMAND` payload. Shared envelope fields sit alongside
/// a `body` keyed by `type`, mirroring the producer's generic
/// `sessionId`/`accountId`/`author`/`type`/`body` wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCommand {
    pub session_id: Uuid,
    pub account_id: u32,
    #[serde(rename = "author")]
    pub issuer: String,
    #[serde(flatten)]
    pub body: SessionCommandBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "body")]
pub enum SessionCommandBody {
    #[serde(rename = "CREATE")]
    Create {
        #[serde(rename = "accountName")]
        account_name: String,
        password: String,
    },
    #[serde(rename = "PROGRESS_STATE")]
    ProgressState { state: u8, params: Value },
    #[serde(rename = "LOGOUT")]
    Logout,
}

pub struct Dispatcher {
    processor: AccountProcessor,
}

impl Dispatcher {
    pub fn new(processor: AccountProcessor) -> Self {
        Self { processor }
    }

    pub fn processor(&self) -> &AccountProcessor {
        &self.processor
    }

    pub async fn on_create_account(&self, cmd: CreateAccountCommand) -> CoreResult<()> {
        let mut buffer = EventBuffer::new();
        match self.processor.create(&mut buffer, &cmd.name, &cmd.password).await {
            Ok(_) => {
                buffer.flush(self.processor.events().as_ref()).await;
                Ok(())
            }
            Err(e) => {
                metrics::record_processor_error(e.error_code());
                Err(e)
            }
        }
    }

    pub async fn on_session_command(&self, cmd: SessionCommand) -> CoreResult<()> {
        let mut buffer = EventBuffer::new();
        let SessionCommand {
            session_id,
            account_id,
            issuer,
            body,
        } = cmd;
        match body {
            SessionCommandBody::Create { account_name, password } => {
                self.processor
                    .attempt_login(&mut buffer, session_id, &account_name, &password)
                    .await;
            }
            SessionCommandBody::ProgressState { state, params } => {
                self.processor
                    .progress_state(&mut buffer, session_id, &issuer, account_id, state, params)
                    .await;
            }
            SessionCommandBody::Logout => {
                if let Err(e) = self.processor.logout(&mut buffer, session_id, account_id, &issuer).await {
                    metrics::record_processor_error(e.error_code());
                }
            }
        }
        buffer.flush(self.processor.events().as_ref()).await;
        Ok(())
    }
}

/// Process-shutdown path: pure pass-through to the teardown coordinator,
/// kept here so the composition root calls a single dispatcher surface for
/// every inbound/outbound transition.
pub async fn on_shutdown(coordinator: &TeardownCoordinator) {
    coordinator.run().await;
}
