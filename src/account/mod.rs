//! Account processor.
//!
//! Binds a tenant, a store handle, the process-wide session registry, and
//! an event sink. Every externally-visible operation decorates its
//! returned `Account` by overwriting `state` with `Registry.MaximalState`
//! immediately before return, so callers never see a stale persisted value
//! (there isn't one — `state` is never a column).

pub mod model;

use serde_json::Value;
use uuid::Uuid;

use crate::config::Config;
use crate::db::accounts::AccountStore;
use crate::error::{CoreError, CoreResult};
use crate::events::{AccountStatusEvent, EventBuffer, EventSink, SessionErrorBody, SessionStatusEvent};
use crate::metrics;
use crate::security::password;
use crate::state::{AccountKey, Service, ServiceKey, SessionRegistry, State};
use crate::tenant::TenantContext;

use self::model::{Account, AccountUpdate};

use std::sync::Arc;

pub struct AccountProcessor {
    tenant: TenantContext,
    store: Arc<dyn AccountStore>,
    registry: Arc<SessionRegistry>,
    events: Arc<dyn EventSink>,
    config: Config,
}

impl AccountProcessor {
    pub fn new(
        tenant: TenantContext,
        store: Arc<dyn AccountStore>,
        registry: Arc<SessionRegistry>,
        events: Arc<dyn EventSink>,
        config: Config,
    ) -> Self {
        Self {
            tenant,
            store,
            registry,
            events,
            config,
        }
    }

    fn account_key(&self, account_id: u32) -> AccountKey {
        AccountKey::new(self.tenant.tenant.clone(), account_id)
    }

    fn decorate(&self, account: Account) -> Account {
        let ak = self.account_key(account.id);
        let state = self.registry.maximal_state(&ak);
        account.with_state(state)
    }

    /// Login-attempt throttle hook. Always returns 0 — the counter this
    /// would read from has no backing store yet, so the check is wired in
    /// and permanently inert rather than left unimplemented.
    fn check_login_attempts(&self, _session_id: Uuid) -> u32 {
        0
    }

    pub async fn create(
        &self,
        buffer: &mut EventBuffer,
        name: &str,
        password_plain: &str,
    ) -> CoreResult<Account> {
        let hash = password::hash_password(password_plain.to_string()).await?;
        let gender = if self.tenant.tenant.is_gms_post_83() { 10 } else { 0 };
        let row = self
            .store
            .create(self.tenant.tenant.id, name, &hash, gender)
            .await?;
        buffer.push_account_status(AccountStatusEvent::Created {
            account_id: row.id,
            name: row.name.clone(),
        });
        Ok(self.decorate(Account::from_row(row)))
    }

    pub async fn get_by_id(&self, id: u32) -> CoreResult<Account> {
        let row = self.store.get_by_id(self.tenant.tenant.id, id).await?;
        Ok(self.decorate(Account::from_row(row)))
    }

    pub async fn get_by_name(&self, name: &str) -> CoreResult<Account> {
        let row = self.store.find_by_name(self.tenant.tenant.id, name).await?;
        Ok(self.decorate(Account::from_row(row)))
    }

    pub async fn list_by_tenant(&self) -> CoreResult<Vec<Account>> {
        let rows = self.store.list_by_tenant(self.tenant.tenant.id).await?;
        Ok(rows
            .into_iter()
            .map(|r| self.decorate(Account::from_row(r)))
            .collect())
    }

    pub async fn get_or_create(
        &self,
        buffer: &mut EventBuffer,
        name: &str,
        password_plain: &str,
        auto_register: bool,
    ) -> CoreResult<Account> {
        match self.get_by_name(name).await {
            Ok(account) => Ok(account),
            Err(CoreError::AccountNotFound(_)) if auto_register => {
                self.create(buffer, name, password_plain).await
            }
            Err(CoreError::AccountNotFound(n)) => Err(CoreError::AccountNotFound(n)),
            Err(other) => Err(other),
        }
    }

    pub async fn update(&self, id: u32, input: AccountUpdate) -> CoreResult<Account> {
        let current = self.get_by_id(id).await?;
        let modifiers = input.diff(&current);
        if modifiers.is_empty() {
            return Ok(current);
        }
        self.store
            .update(self.tenant.tenant.id, id, &modifiers)
            .await?;
        self.get_by_id(id).await
    }

    pub async fn login(
        &self,
        buffer: &mut EventBuffer,
        session_id: Uuid,
        account_id: u32,
        issuer: &str,
    ) -> CoreResult<()> {
        let service = Service::from_issuer(issuer)
            .ok_or_else(|| CoreError::UndefinedService(issuer.to_string()))?;
        let ak = self.account_key(account_id);
        let sk = ServiceKey::new(session_id, service);
        self.registry.login(&ak, sk)?;
        if service == Service::Channel {
            metrics::record_handoff();
        }

        let row = self.store.get_by_id(self.tenant.tenant.id, account_id).await?;
        buffer.push_account_status(AccountStatusEvent::LoggedIn {
            account_id,
            name: row.name,
        });
        Ok(())
    }

    pub async fn logout(
        &self,
        buffer: &mut EventBuffer,
        session_id: Uuid,
        account_id: u32,
        issuer: &str,
    ) -> CoreResult<()> {
        let ak = self.account_key(account_id);
        let removed = if session_id.is_nil() {
            self.registry.terminate(&ak)
        } else {
            let service = Service::from_issuer(issuer)
                .ok_or_else(|| CoreError::UndefinedService(issuer.to_string()))?;
            self.registry.logout(&ak, ServiceKey::new(session_id, service))
        };
        if !removed {
            return Err(CoreError::LogoutRejected);
        }
        let row = self.store.get_by_id(self.tenant.tenant.id, account_id).await?;
        buffer.push_account_status(AccountStatusEvent::LoggedOut {
            account_id,
            name: row.name,
        });
        Ok(())
    }

    fn push_session_error(
        &self,
        buffer: &mut EventBuffer,
        session_id: Uuid,
        account_id: u32,
        err: &CoreError,
    ) {
        buffer.push_session_status(SessionStatusEvent::error(
            session_id,
            account_id,
            SessionErrorBody {
                code: err.session_error_code(),
                reason: err.to_string(),
                until: None,
            },
        ));
    }

    /// The full login workflow. Every failure is converted to a buffered
    /// `SessionStatus.Error` rather than propagated — this method never
    /// returns `Err` to its caller.
    pub async fn attempt_login(
        &self,
        buffer: &mut EventBuffer,
        session_id: Uuid,
        name: &str,
        password_plain: &str,
    ) {
        if self.check_login_attempts(session_id) > 4 {
            self.push_session_error(buffer, session_id, 0, &CoreError::TooManyAttempts);
            return;
        }

        let auto_register = self.config.automatic_register;
        let account = match self.get_or_create(buffer, name, password_plain, auto_register).await {
            Ok(account) => account,
            Err(CoreError::AccountNotFound(_)) if !auto_register => {
                self.push_session_error(buffer, session_id, 0, &CoreError::AccountNotFound(name.to_string()));
                return;
            }
            Err(_) => {
                self.push_session_error(buffer, session_id, 0, &CoreError::StorageError("get_or_create failed".into()));
                return;
            }
        };

        if account.banned {
            self.push_session_error(buffer, session_id, account.id, &CoreError::DeletedOrBlocked);
            return;
        }

        let ak = self.account_key(account.id);
        if self.registry.maximal_state(&ak) != State::NotLoggedIn {
            self.push_session_error(buffer, session_id, account.id, &CoreError::AlreadyLoggedIn);
            return;
        }

        let credential_ok = account.password_hash.starts_with("$2")
            && password::verify_password(password_plain.to_string(), account.password_hash.clone()).await;
        if !credential_ok {
            self.push_session_error(buffer, session_id, account.id, &CoreError::CredentialMismatch);
            return;
        }

        if let Err(e) = self.login(buffer, session_id, account.id, "LOGIN").await {
            self.push_session_error(buffer, session_id, account.id, &CoreError::StorageError(e.to_string()));
            return;
        }

        if !account.tos && !self.tenant.tenant.is_jms() {
            buffer.push_session_status(SessionStatusEvent::request_license_agreement(
                session_id,
                account.id,
            ));
        } else {
            buffer.push_session_status(SessionStatusEvent::created(session_id, account.id));
        }
    }

    /// Drives a session toward `target_state`. Also never propagates `Err`
    /// — every failure becomes a buffered `SessionStatus.Error`.
    pub async fn progress_state(
        &self,
        buffer: &mut EventBuffer,
        session_id: Uuid,
        issuer: &str,
        account_id: u32,
        target_state: u8,
        params: Value,
    ) {
        let account = match self.store.get_by_id(self.tenant.tenant.id, account_id).await {
            Ok(row) => row,
            Err(_) => {
                self.push_session_error(buffer, session_id, account_id, &CoreError::AccountNotFound(account_id.to_string()));
                return;
            }
        };
        let _ = account;

        let ak = self.account_key(account_id);
        tracing::debug!(
            account_id,
            states = ?self.registry.get_states(&ak),
            "progress_state: current session states"
        );

        if self.registry.maximal_state(&ak) == State::NotLoggedIn {
            self.push_session_error(buffer, session_id, account_id, &CoreError::StorageError("not logged in".into()));
            return;
        }

        match State::from_u8(target_state) {
            Some(State::NotLoggedIn) => {
                if let Err(e) = self.logout(buffer, session_id, account_id, issuer).await {
                    self.push_session_error(buffer, session_id, account_id, &e);
                    return;
                }
                buffer.push_session_status(SessionStatusEvent::state_changed(
                    session_id,
                    account_id,
                    State::NotLoggedIn as u8,
                    params,
                ));
            }
            Some(State::LoggedIn) => {
                if let Err(e) = self.login(buffer, session_id, account_id, issuer).await {
                    self.push_session_error(buffer, session_id, account_id, &e);
                    return;
                }
                buffer.push_session_status(SessionStatusEvent::state_changed(
                    session_id,
                    account_id,
                    State::LoggedIn as u8,
                    params,
                ));
            }
            Some(State::Transition) => {
                let service = match Service::from_issuer(issuer) {
                    Some(s) => s,
                    None => {
                        self.push_session_error(buffer, session_id, account_id, &CoreError::UndefinedService(issuer.to_string()));
                        return;
                    }
                };
                // Best-effort regardless of outcome.
                let _ = self.registry.transition(&ak, ServiceKey::new(session_id, service));
                buffer.push_session_status(SessionStatusEvent::state_changed(
                    session_id,
                    account_id,
                    State::Transition as u8,
                    params,
                ));
            }
            None => {
                self.push_session_error(buffer, session_id, account_id, &CoreError::StorageError("undefined target state".into()));
            }
        }
    }

    pub fn events(&self) -> &Arc<dyn EventSink> {
        &self.events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::accounts::fake::InMemoryAccountStore;
    use crate::events::NullEventSink;
    use crate::tenant::TenantId;

    fn processor(tenant: TenantId) -> AccountProcessor {
        AccountProcessor::new(
            TenantContext::new(tenant),
            Arc::new(InMemoryAccountStore::new()),
            Arc::new(SessionRegistry::new()),
            Arc::new(NullEventSink),
            Config::default(),
        )
    }

    fn gms_tenant() -> TenantId {
        TenantId::new(Uuid::nil(), "GMS", 83, 1)
    }

    // A fresh account with `tos` false on a non-JMS tenant gets a
    // RequestLicenseAgreement session event after a successful login.
    #[tokio::test]
    async fn happy_login_requests_license_agreement() {
        let proc = processor(gms_tenant());
        let mut buf = EventBuffer::new();
        let created = proc.create(&mut buf, "alice", "pw").await.unwrap();
        assert!(matches!(buf.events()[0], crate::events::DomainEvent::AccountStatus(crate::events::AccountStatusEvent::Created { .. })));

        let mut buf = EventBuffer::new();
        let session_id = Uuid::new_v4();
        proc.attempt_login(&mut buf, session_id, "alice", "pw").await;

        let events = buf.events();
        assert!(events.iter().any(|e| matches!(
            e,
            crate::events::DomainEvent::AccountStatus(crate::events::AccountStatusEvent::LoggedIn { account_id, .. })
                if *account_id == created.id
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            crate::events::DomainEvent::SessionStatus(ev)
                if matches!(ev.body, crate::events::SessionStatusEventBody::RequestLicenseAgreement)
        )));
    }

    // A wrong password yields an INCORRECT_PASSWORD session error and no
    // LoggedIn account-status event.
    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let proc = processor(gms_tenant());
        let mut buf = EventBuffer::new();
        proc.create(&mut buf, "alice", "pw").await.unwrap();

        let mut buf = EventBuffer::new();
        proc.attempt_login(&mut buf, Uuid::new_v4(), "alice", "wrong").await;

        let events = buf.events();
        assert!(!events.iter().any(|e| matches!(
            e,
            crate::events::DomainEvent::AccountStatus(crate::events::AccountStatusEvent::LoggedIn { .. })
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            crate::events::DomainEvent::SessionStatus(ev)
                if matches!(&ev.body, crate::events::SessionStatusEventBody::Error(body) if body.code == "INCORRECT_PASSWORD")
        )));
    }

    // Logging in twice while already logged in is rejected.
    #[tokio::test]
    async fn second_login_is_already_logged_in() {
        let proc = processor(gms_tenant());
        let mut buf = EventBuffer::new();
        proc.create(&mut buf, "alice", "pw").await.unwrap();

        let mut buf = EventBuffer::new();
        proc.attempt_login(&mut buf, Uuid::new_v4(), "alice", "pw").await;

        let mut buf2 = EventBuffer::new();
        proc.attempt_login(&mut buf2, Uuid::new_v4(), "alice", "pw").await;
        assert!(buf2.events().iter().any(|e| matches!(
            e,
            crate::events::DomainEvent::SessionStatus(ev)
                if matches!(&ev.body, crate::events::SessionStatusEventBody::Error(body) if body.code == "ALREADY_LOGGED_IN")
        )));
    }

    // A LOGIN->Transition->CHANNEL handoff leaves exactly one LoggedIn
    // entry, owned by the channel session.
    #[tokio::test]
    async fn handoff_leaves_single_channel_entry() {
        let proc = processor(gms_tenant());
        let mut buf = EventBuffer::new();
        let account = proc.create(&mut buf, "alice", "pw").await.unwrap();

        let mut buf = EventBuffer::new();
        let login_session = Uuid::new_v4();
        proc.attempt_login(&mut buf, login_session, "alice", "pw").await;

        let mut buf = EventBuffer::new();
        proc.progress_state(&mut buf, login_session, "LOGIN", account.id, State::Transition as u8, Value::Null).await;

        let channel_session = Uuid::new_v4();
        let mut buf = EventBuffer::new();
        proc.progress_state(&mut buf, channel_session, "CHANNEL", account.id, State::LoggedIn as u8, Value::Null).await;

        let ak = proc.account_key(account.id);
        let states = proc.registry.get_states(&ak);
        assert_eq!(states.len(), 1);
        assert!(states.keys().all(|k| k.session_id == channel_session));
    }

    #[tokio::test]
    async fn jms_tenant_never_requests_license_agreement() {
        let proc = processor(TenantId::new(Uuid::nil(), "JMS", 1, 1));
        let mut buf = EventBuffer::new();
        proc.create(&mut buf, "taro", "pw").await.unwrap();

        let mut buf = EventBuffer::new();
        proc.attempt_login(&mut buf, Uuid::new_v4(), "taro", "pw").await;
        assert!(buf.events().iter().any(|e| matches!(
            e,
            crate::events::DomainEvent::SessionStatus(ev)
                if matches!(ev.body, crate::events::SessionStatusEventBody::Created)
        )));
    }

    #[tokio::test]
    async fn update_applies_only_changed_fields() {
        let proc = processor(gms_tenant());
        let mut buf = EventBuffer::new();
        let account = proc.create(&mut buf, "alice", "pw").await.unwrap();

        let updated = proc
            .update(
                account.id,
                AccountUpdate {
                    pin: Some("4321".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.pin, "4321");
    }
}
