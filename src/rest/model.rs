//! `RestModel` — the JSON:API-shaped wire representation for `GET`/`PATCH`
//! responses. `password` never appears on the wire.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::account::model::Account;
use crate::state::State;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestModel {
    pub id: u32,
    pub name: String,
    pub pin: String,
    pub pic: String,
    pub logged_in: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub gender: u8,
    pub banned: bool,
    pub tos: bool,
    pub language: &'static str,
    pub country: &'static str,
    pub character_slots: u8,
}

impl From<Account> for RestModel {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            name: account.name,
            pin: account.pin,
            pic: account.pic,
            logged_in: account.state != State::NotLoggedIn,
            last_login: account.last_login,
            gender: account.gender,
            banned: account.banned,
            tos: account.tos,
            language: "en",
            country: "us",
            character_slots: 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn logged_in_reflects_decorated_state() {
        let account = Account {
            tenant_id: Uuid::nil(),
            id: 1,
            name: "alice".into(),
            password_hash: "$2hash".into(),
            pin: String::new(),
            pic: String::new(),
            gender: 0,
            tos: false,
            banned: false,
            state: State::LoggedIn,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let model = RestModel::from(account);
        assert!(model.logged_in);
        assert_eq!(model.character_slots, 4);
    }
}
