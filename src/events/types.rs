//! Domain event payloads.
//!
//! These are the only two outbound shapes the core produces. The core
//! treats `params` on `StateChanged` as opaque — it is never inspected,
//! only carried through.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// `EVENT_TOPIC_ACCOUNT_STATUS` payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatusEvent {
    Created { account_id: u32, name: String },
    LoggedIn { account_id: u32, name: String },
    LoggedOut { account_id: u32, name: String },
}

impl AccountStatusEvent {
    pub fn account_id(&self) -> u32 {
        match self {
            Self::Created { account_id, .. }
            | Self::LoggedIn { account_id, .. }
            | Self::LoggedOut { account_id, .. } => *account_id,
        }
    }
}

/// The `{code, reason, until}` error body carried by `SessionStatusEvent::Error`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionErrorBody {
    pub code: &'static str,
    pub reason: String,
    pub until: Option<i64>,
}

/// `EVENT_TOPIC_ACCOUNT_SESSION_STATUS` payload. Shared envelope fields sit
/// alongside a `body` keyed by `type`, mirroring the producer's generic
/// `sessionId`/`accountId`/`type`/`body` wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatusEvent {
    pub session_id: Uuid,
    pub account_id: u32,
    #[serde(flatten)]
    pub body: SessionStatusEventBody,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body")]
pub enum SessionStatusEventBody {
    #[serde(rename = "CREATED")]
    Created,
    #[serde(rename = "STATE_CHANGED")]
    StateChanged { state: u8, params: Value },
    #[serde(rename = "REQUEST_LICENSE_AGREEMENT")]
    RequestLicenseAgreement,
    #[serde(rename = "ERROR")]
    Error(SessionErrorBody),
}

impl SessionStatusEvent {
    pub fn created(session_id: Uuid, account_id: u32) -> Self {
        Self {
            session_id,
            account_id,
            body: SessionStatusEventBody::Created,
        }
    }

    pub fn state_changed(session_id: Uuid, account_id: u32, state: u8, params: Value) -> Self {
        Self {
            session_id,
            account_id,
            body: SessionStatusEventBody::StateChanged { state, params },
        }
    }

    pub fn request_license_agreement(session_id: Uuid, account_id: u32) -> Self {
        Self {
            session_id,
            account_id,
            body: SessionStatusEventBody::RequestLicenseAgreement,
        }
    }

    pub fn error(session_id: Uuid, account_id: u32, body: SessionErrorBody) -> Self {
        Self {
            session_id,
            account_id,
            body: SessionStatusEventBody::Error(body),
        }
    }

    pub fn account_id(&self) -> u32 {
        self.account_id
    }
}

/// A single buffered event, tagged by the topic it belongs to so the sink
/// can route it without re-inspecting the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DomainEvent {
    AccountStatus(AccountStatusEvent),
    SessionStatus(SessionStatusEvent),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_extraction_matches_variant() {
        let e = AccountStatusEvent::LoggedIn {
            account_id: 42,
            name: "alice".into(),
        };
        assert_eq!(e.account_id(), 42);
    }
}
