//! Account data model — persisted row vs. domain view.
//!
//! `AccountRow` is the persisted shape — exactly the `accounts` table columns,
//! no `state`. `Account` is the domain view handed to callers; its `state`
//! field is always overwritten by the processor from the registry
//! immediately before return, never trusted from storage. `banned` has no
//! column either: the core has no ban enforcement (out of scope), so it is
//! always `false` — an inert hook, not a persisted flag.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state::State;

/// Row as persisted in the `accounts` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRow {
    pub tenant_id: Uuid,
    pub id: u32,
    pub name: String,
    pub password_hash: String,
    pub pin: String,
    pub pic: String,
    pub gender: u8,
    pub tos: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Domain view returned to callers. `state` and `banned` never round-trip
/// through storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub tenant_id: Uuid,
    pub id: u32,
    pub name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub pin: String,
    pub pic: String,
    pub gender: u8,
    pub tos: bool,
    pub banned: bool,
    pub state: State,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Build the domain view from a persisted row, defaulting `state` to
    /// `NotLoggedIn`. Callers in the processor must overwrite `state` with
    /// `Registry.MaximalState(ak)` before handing this out further.
    pub fn from_row(row: AccountRow) -> Self {
        Self {
            tenant_id: row.tenant_id,
            id: row.id,
            name: row.name,
            password_hash: row.password_hash,
            pin: row.pin,
            pic: row.pic,
            gender: row.gender,
            tos: row.tos,
            banned: false,
            state: State::NotLoggedIn,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }

    pub fn with_state(mut self, state: State) -> Self {
        self.state = state;
        self
    }
}

/// The fixed, closed modifier set for `Update`. No `SetState` — the State
/// belongs exclusively to the registry.
#[derive(Debug, Clone, PartialEq)]
pub enum AccountModifier {
    SetPin(String),
    SetPic(String),
    SetTos(bool),
    SetGender(u8),
}

/// Patch-style update input for `AccountProcessor::update`: only non-empty
/// strings and a `true` `tos` generate a modifier.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountUpdate {
    pub pin: Option<String>,
    pub pic: Option<String>,
    pub tos: Option<bool>,
    pub gender: Option<u8>,
}

impl AccountUpdate {
    /// Diff against `current`, producing the modifier list in field
    /// declaration order.
    pub fn diff(&self, current: &Account) -> Vec<AccountModifier> {
        let mut mods = Vec::new();
        if let Some(pin) = &self.pin {
            if !pin.is_empty() && pin != &current.pin {
                mods.push(AccountModifier::SetPin(pin.clone()));
            }
        }
        if let Some(pic) = &self.pic {
            if !pic.is_empty() && pic != &current.pic {
                mods.push(AccountModifier::SetPic(pic.clone()));
            }
        }
        if let Some(true) = self.tos {
            if !current.tos {
                mods.push(AccountModifier::SetTos(true));
            }
        }
        if let Some(gender) = self.gender {
            if gender != current.gender {
                mods.push(AccountModifier::SetGender(gender));
            }
        }
        mods
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> AccountRow {
        AccountRow {
            tenant_id: Uuid::nil(),
            id: 1,
            name: "alice".into(),
            password_hash: "$2hash".into(),
            pin: "1111".into(),
            pic: "".into(),
            gender: 0,
            tos: false,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn from_row_defaults_banned_false_and_state_not_logged_in() {
        let account = Account::from_row(row());
        assert!(!account.banned);
        assert_eq!(account.state, State::NotLoggedIn);
    }

    #[test]
    fn diff_skips_empty_strings_and_unset_fields() {
        let account = Account::from_row(row());
        let update = AccountUpdate {
            pin: Some(String::new()),
            pic: None,
            tos: Some(false),
            gender: None,
        };
        assert!(update.diff(&account).is_empty());
    }

    #[test]
    fn diff_produces_modifiers_for_changed_fields() {
        let account = Account::from_row(row());
        let update = AccountUpdate {
            pin: Some("2222".into()),
            pic: None,
            tos: Some(true),
            gender: Some(10),
        };
        let mods = update.diff(&account);
        assert_eq!(
            mods,
            vec![
                AccountModifier::SetPin("2222".into()),
                AccountModifier::SetTos(true),
                AccountModifier::SetGender(10),
            ]
        );
    }
}
