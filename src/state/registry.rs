//! The session registry.
//!
//! An in-memory, concurrent, process-wide singleton. Outer sharding is a
//! `DashMap` keyed by `AccountKey`; each entry guards its inner
//! `ServiceKey -> StateValue` map with a `parking_lot::Mutex` so that the
//! handoff logic in `login_channel` (read-then-write across several inner
//! entries) is atomic with respect to concurrent transitions and logouts on
//! the same account. No registry operation ever awaits — holding either
//! lock across an `.await` point is exactly the hazard a `DashMap` guard
//! held across a suspend point creates, so we never do it here.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;

use crate::error::CoreError;
use crate::state::types::{maximal_state, AccountKey, Service, ServiceKey, State, StateValue};

type InnerMap = HashMap<ServiceKey, StateValue>;

/// Process-wide singleton session registry. Construct exactly one at
/// startup and share it via `Arc`.
#[derive(Default)]
pub struct SessionRegistry {
    accounts: DashMap<AccountKey, Mutex<InnerMap>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            accounts: DashMap::new(),
        }
    }

    /// MaximalState over the current snapshot for `ak`.
    pub fn maximal_state(&self, ak: &AccountKey) -> State {
        match self.accounts.get(ak) {
            Some(entry) => maximal_state(entry.lock().values()),
            None => State::NotLoggedIn,
        }
    }

    pub fn is_logged_in(&self, ak: &AccountKey) -> bool {
        self.maximal_state(ak) != State::NotLoggedIn
    }

    /// Dispatches to the gate or handoff login path depending on which
    /// service is logging in.
    pub fn login(&self, ak: &AccountKey, sk: ServiceKey) -> Result<(), CoreError> {
        match sk.service {
            Service::Login => self.login_at_gate(ak, sk),
            Service::Channel => self.login_via_handoff(ak, sk),
        }
    }

    fn login_at_gate(&self, ak: &AccountKey, sk: ServiceKey) -> Result<(), CoreError> {
        let entry = self.accounts.entry(ak.clone()).or_default();
        let mut states = entry.lock();
        if states.values().any(|sv| sv.state > State::NotLoggedIn) {
            return Err(CoreError::AlreadyLoggedIn);
        }
        states.insert(sk, StateValue::new(State::LoggedIn));
        Ok(())
    }

    fn login_via_handoff(&self, ak: &AccountKey, sk: ServiceKey) -> Result<(), CoreError> {
        let entry = self.accounts.entry(ak.clone()).or_default();
        let mut states = entry.lock();
        let had_transition = states.values().any(|sv| sv.state == State::Transition);
        if !had_transition {
            return Err(CoreError::NoTransitionInProgress);
        }
        // Handoff consumed: the transitioning entries are removed and the
        // new CHANNEL entry becomes the sole LoggedIn session.
        states.retain(|_, sv| sv.state != State::Transition);
        states.insert(sk, StateValue::new(State::LoggedIn));
        Ok(())
    }

    /// Marks an active session as transitioning between services.
    pub fn transition(&self, ak: &AccountKey, sk: ServiceKey) -> Result<(), CoreError> {
        let entry = self.accounts.entry(ak.clone()).or_default();
        let mut states = entry.lock();
        match states.get(&sk) {
            Some(sv) if sv.state > State::NotLoggedIn => {
                states.insert(sk, StateValue::new(State::Transition));
                Ok(())
            }
            _ => Err(CoreError::AccountNotFound(
                "no active session to transition".to_string(),
            )),
        }
    }

    /// Removes a session entry. Returns `true` iff the entry was removed.
    pub fn logout(&self, ak: &AccountKey, sk: ServiceKey) -> bool {
        let Some(entry) = self.accounts.get(ak) else {
            return false;
        };
        let mut states = entry.lock();
        match states.get(&sk) {
            Some(sv) if sv.state == State::Transition => false,
            Some(_) => {
                states.remove(&sk);
                true
            }
            None => false,
        }
    }

    /// Unconditional wipe of every session entry for an account.
    pub fn terminate(&self, ak: &AccountKey) -> bool {
        if let Some(entry) = self.accounts.get(ak) {
            entry.lock().clear();
        }
        true
    }

    /// Accounts with a `Transition` entry older than `timeout`.
    pub fn get_expired_in_transition(&self, timeout: Duration) -> Vec<AccountKey> {
        let now = Utc::now();
        self.accounts
            .iter()
            .filter(|entry| {
                entry.value().lock().values().any(|sv| {
                    sv.state == State::Transition
                        && now.signed_duration_since(sv.updated_at)
                            > chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::MAX)
                })
            })
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Removes stale `Transition` entries for one account. Counts one
    /// `metrics::record_transition_expired()` per victim removed.
    pub fn expire_transition(&self, ak: &AccountKey, timeout: Duration) {
        let Some(entry) = self.accounts.get(ak) else {
            return;
        };
        let now = Utc::now();
        let max_age = chrono::Duration::from_std(timeout).unwrap_or(chrono::Duration::MAX);
        let mut expired = 0u32;
        entry.lock().retain(|_, sv| {
            let stale =
                sv.state == State::Transition && now.signed_duration_since(sv.updated_at) > max_age;
            if stale {
                expired += 1;
            }
            !stale
        });
        for _ in 0..expired {
            crate::metrics::record_transition_expired();
        }
    }

    /// Read-only snapshot for diagnostics.
    pub fn get_states(&self, ak: &AccountKey) -> HashMap<ServiceKey, StateValue> {
        self.accounts
            .get(ak)
            .map(|entry| entry.lock().clone())
            .unwrap_or_default()
    }

    /// All account keys currently present with `MaximalState != NotLoggedIn`
    /// (used by the teardown coordinator).
    pub fn logged_in_accounts(&self) -> Vec<AccountKey> {
        self.accounts
            .iter()
            .filter(|entry| maximal_state(entry.value().lock().values()) != State::NotLoggedIn)
            .map(|entry| entry.key().clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::TenantId;
    use uuid::Uuid;

    fn ak() -> AccountKey {
        AccountKey::new(TenantId::new(Uuid::nil(), "GMS", 83, 1), 1)
    }

    fn sk(service: Service) -> ServiceKey {
        ServiceKey::new(Uuid::new_v4(), service)
    }

    #[test]
    fn empty_account_is_not_logged_in() {
        let reg = SessionRegistry::new();
        assert_eq!(reg.maximal_state(&ak()), State::NotLoggedIn);
        assert!(!reg.is_logged_in(&ak()));
    }

    #[test]
    fn login_at_gate_succeeds_once() {
        let reg = SessionRegistry::new();
        let ak = ak();
        reg.login(&ak, sk(Service::Login)).unwrap();
        assert_eq!(reg.maximal_state(&ak), State::LoggedIn);
    }

    // Only one LOGIN session can be active for an account at a time.
    #[test]
    fn second_login_at_gate_fails_until_logout() {
        let reg = SessionRegistry::new();
        let ak = ak();
        let s1 = sk(Service::Login);
        reg.login(&ak, s1).unwrap();

        let s2 = sk(Service::Login);
        assert!(matches!(
            reg.login(&ak, s2),
            Err(CoreError::AlreadyLoggedIn)
        ));

        assert!(reg.logout(&ak, s1));
        // Now a fresh LOGIN can succeed.
        reg.login(&ak, s2).unwrap();
        assert_eq!(reg.maximal_state(&ak), State::LoggedIn);
    }

    #[test]
    fn channel_login_without_transition_fails() {
        let reg = SessionRegistry::new();
        let ak = ak();
        assert!(matches!(
            reg.login(&ak, sk(Service::Channel)),
            Err(CoreError::NoTransitionInProgress)
        ));
    }

    // The full handoff sequence leaves only the CHANNEL entry, LoggedIn.
    #[test]
    fn handoff_consumes_transition_and_leaves_single_channel_entry() {
        let reg = SessionRegistry::new();
        let ak = ak();
        let login_sk = sk(Service::Login);
        reg.login(&ak, login_sk).unwrap();
        reg.transition(&ak, login_sk).unwrap();

        let channel_sk = sk(Service::Channel);
        reg.login(&ak, channel_sk).unwrap();

        let states = reg.get_states(&ak);
        assert_eq!(states.len(), 1);
        let (only_key, only_value) = states.iter().next().unwrap();
        assert_eq!(*only_key, channel_sk);
        assert_eq!(only_value.state, State::LoggedIn);
    }

    #[test]
    fn transition_requires_existing_logged_in_session() {
        let reg = SessionRegistry::new();
        let ak = ak();
        let s1 = sk(Service::Login);
        assert!(reg.transition(&ak, s1).is_err());
        reg.login(&ak, s1).unwrap();
        assert!(reg.transition(&ak, s1).is_ok());
    }

    // Logout outside Transition is idempotent.
    #[test]
    fn logout_removes_entry_once_then_is_a_noop() {
        let reg = SessionRegistry::new();
        let ak = ak();
        let s1 = sk(Service::Login);
        reg.login(&ak, s1).unwrap();
        assert!(reg.logout(&ak, s1));
        assert!(!reg.logout(&ak, s1));
        assert_eq!(reg.maximal_state(&ak), State::NotLoggedIn);
    }

    #[test]
    fn logout_during_transition_is_rejected() {
        let reg = SessionRegistry::new();
        let ak = ak();
        let s1 = sk(Service::Login);
        reg.login(&ak, s1).unwrap();
        reg.transition(&ak, s1).unwrap();
        assert!(!reg.logout(&ak, s1));
    }

    #[test]
    fn terminate_wipes_all_entries() {
        let reg = SessionRegistry::new();
        let ak = ak();
        reg.login(&ak, sk(Service::Login)).unwrap();
        assert!(reg.terminate(&ak));
        assert_eq!(reg.maximal_state(&ak), State::NotLoggedIn);
    }

    #[test]
    fn expired_transition_is_swept() {
        let reg = SessionRegistry::new();
        let ak = ak();
        let s1 = sk(Service::Login);
        reg.login(&ak, s1).unwrap();
        reg.transition(&ak, s1).unwrap();

        // Not expired yet under a long timeout.
        assert!(reg
            .get_expired_in_transition(Duration::from_secs(3600))
            .is_empty());

        // Force expiry by sweeping with a zero timeout.
        let victims = reg.get_expired_in_transition(Duration::from_secs(0));
        assert_eq!(victims, vec![ak.clone()]);
        reg.expire_transition(&ak, Duration::from_secs(0));
        assert_eq!(reg.maximal_state(&ak), State::NotLoggedIn);

        // A fresh LOGIN now succeeds.
        reg.login(&ak, sk(Service::Login)).unwrap();
    }

    #[test]
    fn logged_in_accounts_lists_only_non_empty_states() {
        let reg = SessionRegistry::new();
        let ak1 = ak();
        let ak2 = AccountKey::new(TenantId::new(Uuid::new_v4(), "EMS", 1, 1), 2);
        reg.login(&ak1, sk(Service::Login)).unwrap();

        let logged_in = reg.logged_in_accounts();
        assert_eq!(logged_in, vec![ak1]);
        assert!(!logged_in.contains(&ak2));
    }

    // Same AccountId under different tenants never collides.
    #[test]
    fn tenant_isolation_holds_for_same_account_id() {
        let reg = SessionRegistry::new();
        let tenant_a = AccountKey::new(TenantId::new(Uuid::new_v4(), "GMS", 83, 1), 1);
        let tenant_b = AccountKey::new(TenantId::new(Uuid::new_v4(), "EMS", 1, 1), 1);

        reg.login(&tenant_a, sk(Service::Login)).unwrap();
        assert_eq!(reg.maximal_state(&tenant_a), State::LoggedIn);
        assert_eq!(reg.maximal_state(&tenant_b), State::NotLoggedIn);
    }
}
