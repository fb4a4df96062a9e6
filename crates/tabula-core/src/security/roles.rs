//! Per-schema role grants.

use super::identity::{AccessContext, Identity};
use std::collections::HashMap;

/// Schema roles, ordered from weakest to strongest. A grant confers
/// the granted role and every weaker one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    /// Read rows.
    Viewer,
    /// Read and write rows.
    Editor,
    /// Change the schema and manage grants; bypasses row security.
    Manager,
    /// Everything, including dropping the schema.
    Owner,
}

impl Role {
    /// Lowercase role name used in row security tags.
    pub fn name(self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Editor => "editor",
            Role::Manager => "manager",
            Role::Owner => "owner",
        }
    }

    /// Parse a role name.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "viewer" => Some(Role::Viewer),
            "editor" => Some(Role::Editor),
            "manager" => Some(Role::Manager),
            "owner" => Some(Role::Owner),
            _ => None,
        }
    }

    /// The granted role and every weaker one.
    pub fn conferred(self) -> impl Iterator<Item = Role> {
        [Role::Viewer, Role::Editor, Role::Manager, Role::Owner]
            .into_iter()
            .filter(move |r| *r <= self)
    }

    /// Whether this role permits writes.
    pub fn can_edit(self) -> bool {
        self >= Role::Editor
    }

    /// Whether this role bypasses row security.
    pub fn is_admin(self) -> bool {
        self >= Role::Manager
    }
}

/// Role grants of one schema, keyed by user name.
#[derive(Debug, Clone, Default)]
pub struct SchemaRoles {
    grants: HashMap<String, Role>,
}

impl SchemaRoles {
    /// No grants.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant a role, replacing any earlier grant for the user.
    pub fn grant(&mut self, user: impl Into<String>, role: Role) {
        self.grants.insert(user.into(), role);
    }

    /// Remove a user's grant.
    pub fn revoke(&mut self, user: &str) {
        self.grants.remove(user);
    }

    /// The role granted to a user.
    pub fn role_of(&self, user: &str) -> Option<Role> {
        self.grants.get(user).copied()
    }

    /// Resolve an identity to its access context. Unknown users get
    /// the anonymous context; manager and owner grants bypass row
    /// security.
    pub fn context_for(&self, identity: &Identity) -> AccessContext {
        let role = identity.name().and_then(|u| self.role_of(u));
        match role {
            None => AccessContext::anonymous(),
            Some(role) => {
                let ctx =
                    AccessContext::with_roles(role.conferred().map(|r| r.name().to_string()));
                if role.is_admin() {
                    ctx.into_admin()
                } else {
                    ctx
                }
            }
        }
    }

    /// Whether the identity may write rows.
    pub fn can_edit(&self, identity: &Identity) -> bool {
        identity
            .name()
            .and_then(|u| self.role_of(u))
            .is_some_and(Role::can_edit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_confers_weaker_roles() {
        let mut roles = SchemaRoles::new();
        roles.grant("donald", Role::Editor);
        let ctx = roles.context_for(&Identity::user("donald"));
        assert!(ctx.has_role("viewer"));
        assert!(ctx.has_role("editor"));
        assert!(!ctx.has_role("manager"));
        assert!(!ctx.is_admin());
    }

    #[test]
    fn test_owner_bypasses_row_security() {
        let mut roles = SchemaRoles::new();
        roles.grant("scrooge", Role::Owner);
        let ctx = roles.context_for(&Identity::user("scrooge"));
        assert!(ctx.is_admin());
        assert!(roles.can_edit(&Identity::user("scrooge")));
    }

    #[test]
    fn test_unknown_user_is_anonymous() {
        let roles = SchemaRoles::new();
        let ctx = roles.context_for(&Identity::user("stranger"));
        assert_eq!(ctx, AccessContext::anonymous());
        assert!(!roles.can_edit(&Identity::user("stranger")));
        assert!(!roles.can_edit(&Identity::anonymous()));
    }
}
