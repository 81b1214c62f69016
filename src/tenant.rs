//! Tenant identity.
//!
//! A tenant is a game-world operator: a region plus a version pair. Every
//! account row and every registry entry is scoped by `TenantId`; nothing in
//! this crate is allowed to look up or mutate state across tenants.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a tenant: a UUID paired with the region/version the tenant is
/// currently routing on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId {
    pub id: Uuid,
    pub region: String,
    pub major_version: u16,
    pub minor_version: u16,
}

impl TenantId {
    pub fn new(id: Uuid, region: impl Into<String>, major_version: u16, minor_version: u16) -> Self {
        Self {
            id,
            region: region.into(),
            major_version,
            minor_version,
        }
    }

    /// The account processor's default-gender rule keys off this exact check.
    pub fn is_gms_post_83(&self) -> bool {
        self.region == "GMS" && self.major_version > 83
    }

    pub fn is_jms(&self) -> bool {
        self.region == "JMS"
    }
}

/// Request/message-scoped tenant context, extracted by the transport edges
/// (REST headers or Kafka message headers) and threaded through the
/// dispatcher into the processor. Never constructed by the core itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant: TenantId,
}

impl TenantContext {
    pub fn new(tenant: TenantId) -> Self {
        Self { tenant }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tid(region: &str, major: u16) -> TenantId {
        TenantId::new(Uuid::nil(), region, major, 1)
    }

    #[test]
    fn gms_post_83_defaults_user_choose_gender() {
        assert!(tid("GMS", 84).is_gms_post_83());
        assert!(!tid("GMS", 83).is_gms_post_83());
        assert!(!tid("GMS", 82).is_gms_post_83());
        assert!(!tid("EMS", 84).is_gms_post_83());
    }

    #[test]
    fn jms_suppresses_tos_prompt() {
        assert!(tid("JMS", 1).is_jms());
        assert!(!tid("GMS", 1).is_jms());
    }
}
