//! Transition-timeout sweeper.
//!
//! A single periodic background task that finds accounts stuck in
//! `Transition` past the configured timeout and force-expires them. This is
//! silent by design: no DB write, no event. Downstream reconciliation comes
//! from the next `LOGIN` attempt observing `MaximalState == NotLoggedIn`.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::state::registry::SessionRegistry;

pub struct TransitionSweeper {
    registry: Arc<SessionRegistry>,
    timeout: Duration,
    interval: Duration,
}

impl TransitionSweeper {
    pub fn new(registry: Arc<SessionRegistry>, timeout: Duration, interval: Duration) -> Self {
        Self {
            registry,
            timeout,
            interval,
        }
    }

    /// Runs until the process shuts down. Intended to be spawned once as its
    /// own `tokio::task` from the composition root.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        loop {
            ticker.tick().await;
            self.sweep_once();
        }
    }

    fn sweep_once(&self) {
        let expired = self.registry.get_expired_in_transition(self.timeout);
        for ak in &expired {
            warn!(account_id = ak.account_id, region = %ak.tenant.region, "transition expired, forcing logout");
            self.registry.expire_transition(ak, self.timeout);
        }
        if !expired.is_empty() {
            info!(count = expired.len(), "transition sweep complete");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::types::{AccountKey, Service, ServiceKey};
    use crate::tenant::TenantId;
    use uuid::Uuid;

    #[test]
    fn sweep_clears_stale_transitions() {
        let registry = Arc::new(SessionRegistry::new());
        let ak = AccountKey::new(TenantId::new(Uuid::nil(), "GMS", 83, 1), 7);
        let sk = ServiceKey::new(Uuid::new_v4(), Service::Login);
        registry.login(&ak, sk).unwrap();
        registry.transition(&ak, sk).unwrap();

        let sweeper = TransitionSweeper::new(
            registry.clone(),
            Duration::from_secs(0),
            Duration::from_millis(10),
        );
        sweeper.sweep_once();

        assert!(!registry.is_logged_in(&ak));
    }

    #[test]
    fn sweep_is_a_noop_when_nothing_expired() {
        let registry = Arc::new(SessionRegistry::new());
        let sweeper = TransitionSweeper::new(
            registry.clone(),
            Duration::from_secs(3600),
            Duration::from_millis(10),
        );
        sweeper.sweep_once();
    }
}
