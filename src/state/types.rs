//! Core value types for the session registry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::tenant::TenantId;

/// Session state, totally ordered with **lower = more privileged**. The
/// numeric order is load-bearing: `MaximalState` is computed as the
/// numeric minimum across an account's sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum State {
    NotLoggedIn = 0,
    LoggedIn = 1,
    Transition = 2,
}

/// Sentinel strictly greater than any real `State`, used as the starting
/// point for the `MaximalState` running-minimum.
const SENTINEL: u8 = 99;

impl State {
    fn as_u8(self) -> u8 {
        self as u8
    }

    /// Decode the wire-level `targetState` integer from a `ProgressState`
    /// command. Any value outside the three known states is `None` — the
    /// caller must treat that as `SystemError`.
    pub fn from_u8(v: u8) -> Option<State> {
        match v {
            0 => Some(State::NotLoggedIn),
            1 => Some(State::LoggedIn),
            2 => Some(State::Transition),
            _ => None,
        }
    }
}

/// A service that can hold a login slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Service {
    Login,
    Channel,
}

impl Service {
    /// Parse the wire-level issuer string (`LOGIN` / `CHANNEL` /
    /// `INTERNAL`). `INTERNAL` never names a registry service, so it maps
    /// to `None`, which callers must reject as `UndefinedService`.
    pub fn from_issuer(issuer: &str) -> Option<Self> {
        match issuer {
            "LOGIN" => Some(Service::Login),
            "CHANNEL" => Some(Service::Channel),
            _ => None,
        }
    }
}

/// `(SessionId, Service)` — the smallest unit of registry state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceKey {
    pub session_id: Uuid,
    pub service: Service,
}

impl ServiceKey {
    pub fn new(session_id: Uuid, service: Service) -> Self {
        Self {
            session_id,
            service,
        }
    }
}

/// `(TenantId, AccountId)` — the key the registry is sharded under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountKey {
    pub tenant: TenantId,
    pub account_id: u32,
}

impl AccountKey {
    pub fn new(tenant: TenantId, account_id: u32) -> Self {
        Self { tenant, account_id }
    }
}

/// A state paired with the wall-clock time it was last set.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StateValue {
    pub state: State,
    pub updated_at: DateTime<Utc>,
}

impl StateValue {
    pub fn new(state: State) -> Self {
        Self {
            state,
            updated_at: Utc::now(),
        }
    }
}

/// Compute the maximal (most-privileged) state across a snapshot of a
/// single account's sessions. Empty input means no registry entry for the
/// account, i.e. `NotLoggedIn`.
pub fn maximal_state<'a>(states: impl IntoIterator<Item = &'a StateValue>) -> State {
    let mut min = SENTINEL;
    for sv in states {
        min = min.min(sv.state.as_u8());
    }
    match min {
        0 => State::NotLoggedIn,
        1 => State::LoggedIn,
        2 => State::Transition,
        _ => State::NotLoggedIn, // sentinel never beaten => empty map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_matches_privilege() {
        assert!(State::LoggedIn < State::Transition);
        assert!(State::NotLoggedIn < State::LoggedIn);
    }

    #[test]
    fn maximal_state_of_empty_is_not_logged_in() {
        let values: Vec<StateValue> = Vec::new();
        assert_eq!(maximal_state(values.iter()), State::NotLoggedIn);
    }

    #[test]
    fn maximal_state_is_the_minimum_across_entries() {
        let values = vec![StateValue::new(State::Transition), StateValue::new(State::LoggedIn)];
        assert_eq!(maximal_state(values.iter()), State::LoggedIn);
    }

    #[test]
    fn state_from_u8_rejects_out_of_range() {
        assert_eq!(State::from_u8(0), Some(State::NotLoggedIn));
        assert_eq!(State::from_u8(1), Some(State::LoggedIn));
        assert_eq!(State::from_u8(2), Some(State::Transition));
        assert_eq!(State::from_u8(3), None);
    }

    #[test]
    fn service_from_issuer_rejects_internal() {
        assert_eq!(Service::from_issuer("LOGIN"), Some(Service::Login));
        assert_eq!(Service::from_issuer("CHANNEL"), Some(Service::Channel));
        assert_eq!(Service::from_issuer("INTERNAL"), None);
        assert_eq!(Service::from_issuer("bogus"), None);
    }
}
