//! Teardown coordinator.
//!
//! On shutdown, emits `AccountStatus.LoggedOut` for every account the
//! registry still shows as logged in. The registry itself is left alone —
//! the process is ending — the events exist purely so subscribers can
//! reconcile. Must complete before the event sink is closed.

use std::sync::Arc;

use tracing::info;

use crate::db::accounts::AccountStore;
use crate::events::{AccountStatusEvent, EventSink};
use crate::state::SessionRegistry;

pub struct TeardownCoordinator {
    registry: Arc<SessionRegistry>,
    store: Arc<dyn AccountStore>,
    events: Arc<dyn EventSink>,
}

impl TeardownCoordinator {
    pub fn new(
        registry: Arc<SessionRegistry>,
        store: Arc<dyn AccountStore>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            registry,
            store,
            events,
        }
    }

    pub async fn run(&self) {
        let accounts = self.registry.logged_in_accounts();
        info!(count = accounts.len(), "teardown: emitting logout for logged-in accounts");
        for ak in accounts {
            let name = match self.store.get_by_id(ak.tenant.id, ak.account_id).await {
                Ok(row) => row.name,
                Err(_) => continue,
            };
            self.events
                .emit_account_status(AccountStatusEvent::LoggedOut {
                    account_id: ak.account_id,
                    name,
                })
                .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::accounts::fake::InMemoryAccountStore;
    use crate::state::{AccountKey, Service, ServiceKey};
    use crate::tenant::TenantId;
    use std::sync::Mutex;
    use uuid::Uuid;

    #[derive(Default)]
    struct RecordingSink {
        logged_out: Mutex<Vec<u32>>,
    }

    #[async_trait::async_trait]
    impl EventSink for RecordingSink {
        async fn emit_account_status(&self, event: AccountStatusEvent) {
            if let AccountStatusEvent::LoggedOut { account_id, .. } = event {
                self.logged_out.lock().unwrap().push(account_id);
            }
        }
        async fn emit_session_status(&self, _event: crate::events::SessionStatusEvent) {}
    }

    // Two accounts logged in under two different tenants produce exactly
    // two LoggedOut events on teardown.
    #[tokio::test]
    async fn shutdown_emits_one_logout_per_logged_in_account() {
        let registry = Arc::new(SessionRegistry::new());
        let store = Arc::new(InMemoryAccountStore::new());
        let sink = Arc::new(RecordingSink::default());

        let tenant_a = TenantId::new(Uuid::new_v4(), "GMS", 83, 1);
        let tenant_b = TenantId::new(Uuid::new_v4(), "EMS", 1, 1);

        let row_a = store.create(tenant_a.id, "alice", "$2hash", 0).await.unwrap();
        let row_b = store.create(tenant_b.id, "bob", "$2hash", 0).await.unwrap();

        let ak_a = AccountKey::new(tenant_a, row_a.id);
        let ak_b = AccountKey::new(tenant_b, row_b.id);
        registry.login(&ak_a, ServiceKey::new(Uuid::new_v4(), Service::Login)).unwrap();
        registry.login(&ak_b, ServiceKey::new(Uuid::new_v4(), Service::Login)).unwrap();

        let coordinator = TeardownCoordinator::new(registry, store, sink.clone());
        coordinator.run().await;

        let logged_out = sink.logged_out.lock().unwrap();
        assert_eq!(logged_out.len(), 2);
        assert!(logged_out.contains(&row_a.id));
        assert!(logged_out.contains(&row_b.id));
    }
}
