//! Account store.
//!
//! `AccountStore` is an `#[async_trait]` so the processor can be exercised
//! against an in-memory double without a live Postgres instance.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::FromRow;
use uuid::Uuid;

use crate::account::model::{AccountModifier, AccountRow};
use crate::error::{CoreError, CoreResult};

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn create(
        &self,
        tenant_id: Uuid,
        name: &str,
        password_hash: &str,
        gender: u8,
    ) -> CoreResult<AccountRow>;

    async fn get_by_id(&self, tenant_id: Uuid, id: u32) -> CoreResult<AccountRow>;

    /// Returns the first match by name within the tenant. The store never
    /// relies on DB-level uniqueness for this lookup.
    async fn find_by_name(&self, tenant_id: Uuid, name: &str) -> CoreResult<AccountRow>;

    async fn list_by_tenant(&self, tenant_id: Uuid) -> CoreResult<Vec<AccountRow>>;

    /// Applies exactly the declared modifiers, atomically, to one row.
    async fn update(
        &self,
        tenant_id: Uuid,
        id: u32,
        modifiers: &[AccountModifier],
    ) -> CoreResult<()>;
}

#[derive(Debug, FromRow)]
struct AccountSqlRow {
    tenant_id: Uuid,
    id: i64,
    name: String,
    password: String,
    pin: String,
    pic: String,
    gender: i16,
    tos: bool,
    last_login: Option<chrono::DateTime<Utc>>,
    created_at: chrono::DateTime<Utc>,
    updated_at: chrono::DateTime<Utc>,
}

impl From<AccountSqlRow> for AccountRow {
    fn from(r: AccountSqlRow) -> Self {
        AccountRow {
            tenant_id: r.tenant_id,
            id: r.id as u32,
            name: r.name,
            password_hash: r.password,
            pin: r.pin,
            pic: r.pic,
            gender: r.gender as u8,
            tos: r.tos,
            last_login: r.last_login,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

pub struct PostgresAccountStore {
    pool: sqlx::PgPool,
}

impl PostgresAccountStore {
    pub fn new(pool: sqlx::PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PostgresAccountStore {
    async fn create(
        &self,
        tenant_id: Uuid,
        name: &str,
        password_hash: &str,
        gender: u8,
    ) -> CoreResult<AccountRow> {
        let row = sqlx::query_as::<_, AccountSqlRow>(
            r#"
            INSERT INTO accounts (tenant_id, name, password, gender, pin, pic, tos, created_at, updated_at)
            VALUES ($1, $2, $3, $4, '', '', false, now(), now())
            RETURNING tenant_id, id, name, password, pin, pic, gender, tos, last_login, created_at, updated_at
            "#,
        )
        .bind(tenant_id)
        .bind(name)
        .bind(password_hash)
        .bind(gender as i16)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn get_by_id(&self, tenant_id: Uuid, id: u32) -> CoreResult<AccountRow> {
        let row = sqlx::query_as::<_, AccountSqlRow>(
            r#"
            SELECT tenant_id, id, name, password, pin, pic, gender, tos, last_login, created_at, updated_at
            FROM accounts WHERE tenant_id = $1 AND id = $2
            "#,
        )
        .bind(tenant_id)
        .bind(id as i64)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn find_by_name(&self, tenant_id: Uuid, name: &str) -> CoreResult<AccountRow> {
        let row = sqlx::query_as::<_, AccountSqlRow>(
            r#"
            SELECT tenant_id, id, name, password, pin, pic, gender, tos, last_login, created_at, updated_at
            FROM accounts WHERE tenant_id = $1 AND name = $2
            ORDER BY id ASC LIMIT 1
            "#,
        )
        .bind(tenant_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    async fn list_by_tenant(&self, tenant_id: Uuid) -> CoreResult<Vec<AccountRow>> {
        let rows = sqlx::query_as::<_, AccountSqlRow>(
            r#"
            SELECT tenant_id, id, name, password, pin, pic, gender, tos, last_login, created_at, updated_at
            FROM accounts WHERE tenant_id = $1 ORDER BY id ASC
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update(
        &self,
        tenant_id: Uuid,
        id: u32,
        modifiers: &[AccountModifier],
    ) -> CoreResult<()> {
        if modifiers.is_empty() {
            return Ok(());
        }
        let mut tx = self.pool.begin().await?;
        for modifier in modifiers {
            match modifier {
                AccountModifier::SetPin(pin) => {
                    sqlx::query("UPDATE accounts SET pin = $1, updated_at = now() WHERE tenant_id = $2 AND id = $3")
                        .bind(pin)
                        .bind(tenant_id)
                        .bind(id as i64)
                        .execute(&mut *tx)
                        .await?;
                }
                AccountModifier::SetPic(pic) => {
                    sqlx::query("UPDATE accounts SET pic = $1, updated_at = now() WHERE tenant_id = $2 AND id = $3")
                        .bind(pic)
                        .bind(tenant_id)
                        .bind(id as i64)
                        .execute(&mut *tx)
                        .await?;
                }
                AccountModifier::SetTos(tos) => {
                    sqlx::query("UPDATE accounts SET tos = $1, updated_at = now() WHERE tenant_id = $2 AND id = $3")
                        .bind(tos)
                        .bind(tenant_id)
                        .bind(id as i64)
                        .execute(&mut *tx)
                        .await?;
                }
                AccountModifier::SetGender(gender) => {
                    sqlx::query("UPDATE accounts SET gender = $1, updated_at = now() WHERE tenant_id = $2 AND id = $3")
                        .bind(*gender as i16)
                        .bind(tenant_id)
                        .bind(id as i64)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }
        tx.commit().await?;
        Ok(())
    }
}

/// In-memory double used by unit/integration tests and by the command
/// dispatcher's doc examples; never wired at the composition root.
#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    use std::collections::HashMap;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    pub struct InMemoryAccountStore {
        rows: Mutex<HashMap<(Uuid, u32), AccountRow>>,
        next_id: Mutex<u32>,
    }

    impl InMemoryAccountStore {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl AccountStore for InMemoryAccountStore {
        async fn create(
            &self,
            tenant_id: Uuid,
            name: &str,
            password_hash: &str,
            gender: u8,
        ) -> CoreResult<AccountRow> {
            let mut next_id = self.next_id.lock();
            *next_id += 1;
            let id = *next_id;
            let now = Utc::now();
            let row = AccountRow {
                tenant_id,
                id,
                name: name.to_string(),
                password_hash: password_hash.to_string(),
                pin: String::new(),
                pic: String::new(),
                gender,
                tos: false,
                last_login: None,
                created_at: now,
                updated_at: now,
            };
            self.rows.lock().insert((tenant_id, id), row.clone());
            Ok(row)
        }

        async fn get_by_id(&self, tenant_id: Uuid, id: u32) -> CoreResult<AccountRow> {
            self.rows
                .lock()
                .get(&(tenant_id, id))
                .cloned()
                .ok_or_else(|| CoreError::AccountNotFound(id.to_string()))
        }

        async fn find_by_name(&self, tenant_id: Uuid, name: &str) -> CoreResult<AccountRow> {
            self.rows
                .lock()
                .values()
                .filter(|r| r.tenant_id == tenant_id && r.name == name)
                .min_by_key(|r| r.id)
                .cloned()
                .ok_or_else(|| CoreError::AccountNotFound(name.to_string()))
        }

        async fn list_by_tenant(&self, tenant_id: Uuid) -> CoreResult<Vec<AccountRow>> {
            let mut rows: Vec<_> = self
                .rows
                .lock()
                .values()
                .filter(|r| r.tenant_id == tenant_id)
                .cloned()
                .collect();
            rows.sort_by_key(|r| r.id);
            Ok(rows)
        }

        async fn update(
            &self,
            tenant_id: Uuid,
            id: u32,
            modifiers: &[AccountModifier],
        ) -> CoreResult<()> {
            let mut rows = self.rows.lock();
            let row = rows
                .get_mut(&(tenant_id, id))
                .ok_or_else(|| CoreError::AccountNotFound(id.to_string()))?;
            for modifier in modifiers {
                match modifier {
                    AccountModifier::SetPin(pin) => row.pin = pin.clone(),
                    AccountModifier::SetPic(pic) => row.pic = pic.clone(),
                    AccountModifier::SetTos(tos) => row.tos = *tos,
                    AccountModifier::SetGender(gender) => row.gender = *gender,
                }
            }
            row.updated_at = Utc::now();
            Ok(())
        }
    }

    #[tokio::test]
    async fn create_then_find_by_name_round_trips() {
        let store = InMemoryAccountStore::new();
        let tenant = Uuid::new_v4();
        let created = store.create(tenant, "alice", "$2hash", 0).await.unwrap();
        let found = store.find_by_name(tenant, "alice").await.unwrap();
        assert_eq!(created.id, found.id);
    }

    #[tokio::test]
    async fn get_by_id_missing_is_not_found() {
        let store = InMemoryAccountStore::new();
        let err = store.get_by_id(Uuid::new_v4(), 1).await.unwrap_err();
        assert!(matches!(err, CoreError::AccountNotFound(_)));
    }

    #[tokio::test]
    async fn update_applies_only_declared_modifiers() {
        let store = InMemoryAccountStore::new();
        let tenant = Uuid::new_v4();
        let created = store.create(tenant, "alice", "$2hash", 0).await.unwrap();
        store
            .update(tenant, created.id, &[AccountModifier::SetPin("1234".into())])
            .await
            .unwrap();
        let reloaded = store.get_by_id(tenant, created.id).await.unwrap();
        assert_eq!(reloaded.pin, "1234");
        assert_eq!(reloaded.pic, "");
    }
}
