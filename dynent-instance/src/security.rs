//! Entity-level access control.
//!
//! Writes are gated by an entity's security mode alone. Reads consult the
//! read-only mode first and fall back to the security mode. An entity with
//! no mode configured is open to everyone.

use crate::error::{InstanceError, InstanceResult};
use dynent_model::{SecurityMode, TypeDescriptor};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use tracing::warn;

/// The operation a security check guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Read,
    Write,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read => f.write_str("read"),
            Self::Write => f.write_str("write"),
        }
    }
}

/// The authenticated principal an operation runs on behalf of.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub username: Option<String>,
    #[serde(default)]
    pub permissions: HashSet<String>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn user(username: &str) -> Self {
        Self {
            username: Some(username.into()),
            permissions: HashSet::new(),
        }
    }

    pub fn with_permission(mut self, permission: &str) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

/// Stateless read/write authorization over entity descriptors.
#[derive(Debug, Clone, Copy, Default)]
pub struct SecurityGate;

impl SecurityGate {
    pub fn new() -> Self {
        Self
    }

    pub fn can_read(&self, entity: &TypeDescriptor, caller: &Caller) -> bool {
        if let Some(mode) = entity.read_only_security_mode {
            if grants(mode, &entity.read_only_security_members, caller) {
                return true;
            }
        }
        self.can_write(entity, caller)
    }

    pub fn can_write(&self, entity: &TypeDescriptor, caller: &Caller) -> bool {
        match entity.security_mode {
            Some(mode) => grants(mode, &entity.security_members, caller),
            None => true,
        }
    }

    /// Fails with [`InstanceError::Security`] when `caller` may not perform
    /// `operation` on `entity`.
    pub fn authorize(&self, entity: &TypeDescriptor, caller: &Caller, operation: Operation) -> InstanceResult<()> {
        let allowed = match operation {
            Operation::Read => self.can_read(entity, caller),
            Operation::Write => self.can_write(entity, caller),
        };
        if allowed {
            return Ok(());
        }
        warn!(
            entity = %entity.name,
            operation = %operation,
            username = caller.username.as_deref().unwrap_or("<anonymous>"),
            "Access denied"
        );
        Err(InstanceError::Security {
            entity: entity.name.clone(),
            operation,
        })
    }
}

fn grants(mode: SecurityMode, members: &BTreeSet<String>, caller: &Caller) -> bool {
    match mode {
        SecurityMode::Everyone => true,
        SecurityMode::NoAccess => false,
        // Row-level ownership is enforced by storage; here an owner or
        // creator only needs to be someone.
        SecurityMode::Owner | SecurityMode::Creator => caller.is_authenticated(),
        SecurityMode::Users => caller
            .username
            .as_ref()
            .is_some_and(|name| members.contains(name)),
        SecurityMode::Permissions => members.iter().any(|p| caller.has_permission(p)),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use dynent_types::EntityId;

    fn make_entity() -> TypeDescriptor {
        TypeDescriptor::new(EntityId::new(1), "Sample", "org.dynent.Sample")
    }

    #[test]
    fn no_modes_allow_everything() {
        let gate = SecurityGate::new();
        let entity = make_entity();
        assert!(gate.can_read(&entity, &Caller::anonymous()));
        assert!(gate.can_write(&entity, &Caller::anonymous()));
    }

    #[test]
    fn no_access_denies_writes_regardless_of_read_only_mode() {
        let gate = SecurityGate::new();
        let entity = make_entity()
            .with_security(SecurityMode::NoAccess, &[])
            .with_read_only_security(SecurityMode::Everyone, &[]);
        let caller = Caller::user("alice");
        assert!(gate.can_read(&entity, &caller));
        assert!(!gate.can_write(&entity, &caller));
    }

    #[test]
    fn both_no_access_denies_reads() {
        let gate = SecurityGate::new();
        let entity = make_entity()
            .with_security(SecurityMode::NoAccess, &[])
            .with_read_only_security(SecurityMode::NoAccess, &[]);
        assert!(!gate.can_read(&entity, &Caller::user("alice")));
    }

    #[test]
    fn read_falls_back_to_security_mode() {
        let gate = SecurityGate::new();
        let entity = make_entity()
            .with_security(SecurityMode::Everyone, &[])
            .with_read_only_security(SecurityMode::NoAccess, &[]);
        assert!(gate.can_read(&entity, &Caller::anonymous()));
    }

    #[test]
    fn users_mode_checks_membership() {
        let gate = SecurityGate::new();
        let entity = make_entity().with_security(SecurityMode::Users, &["alice"]);
        assert!(gate.can_write(&entity, &Caller::user("alice")));
        assert!(!gate.can_write(&entity, &Caller::user("bob")));
        assert!(!gate.can_write(&entity, &Caller::anonymous()));
    }

    #[test]
    fn permissions_mode_checks_any_listed_permission() {
        let gate = SecurityGate::new();
        let entity = make_entity().with_security(SecurityMode::Permissions, &["edit", "admin"]);
        assert!(gate.can_write(&entity, &Caller::user("bob").with_permission("admin")));
        assert!(!gate.can_write(&entity, &Caller::user("bob").with_permission("view")));
    }

    #[test]
    fn owner_and_creator_require_authentication() {
        let gate = SecurityGate::new();
        for mode in [SecurityMode::Owner, SecurityMode::Creator] {
            let entity = make_entity().with_security(mode, &[]);
            assert!(gate.can_write(&entity, &Caller::user("alice")));
            assert!(!gate.can_write(&entity, &Caller::anonymous()));
        }
    }

    #[test]
    fn authorize_reports_entity_and_operation() {
        let gate = SecurityGate::new();
        let entity = make_entity().with_security(SecurityMode::NoAccess, &[]);
        let err = gate
            .authorize(&entity, &Caller::user("alice"), Operation::Write)
            .unwrap_err();
        assert!(matches!(
            err,
            InstanceError::Security { ref entity, operation: Operation::Write } if entity == "Sample"
        ));
        assert_eq!(err.to_string(), "write access to Sample denied");
    }
}
