//! Acting identity and its resolved access context.

use std::collections::BTreeSet;

/// Role name attached to rows every caller may see.
pub const ANONYMOUS_ROLE: &str = "anonymous";

/// The identity a request acts as. Authentication happens elsewhere;
/// this layer only needs the resolved user name, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    user: Option<String>,
}

impl Identity {
    /// A signed-in user.
    pub fn user(name: impl Into<String>) -> Self {
        Self {
            user: Some(name.into()),
        }
    }

    /// The anonymous caller.
    pub fn anonymous() -> Self {
        Self { user: None }
    }

    /// User name, if signed in.
    pub fn name(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Whether this is the anonymous caller.
    pub fn is_anonymous(&self) -> bool {
        self.user.is_none()
    }
}

/// Roles an identity holds within one schema, resolved once per
/// request and pinned for the life of a transaction.
///
/// Admin contexts bypass row-level security entirely; everyone else
/// sees only rows tagged with one of their roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessContext {
    roles: BTreeSet<String>,
    admin: bool,
}

impl AccessContext {
    /// Context holding the given roles, without admin bypass.
    pub fn with_roles(roles: impl IntoIterator<Item = String>) -> Self {
        Self {
            roles: roles.into_iter().collect(),
            admin: false,
        }
    }

    /// Context of the anonymous caller: the anonymous role only.
    pub fn anonymous() -> Self {
        Self::with_roles([ANONYMOUS_ROLE.to_string()])
    }

    /// Unrestricted context for internal work.
    pub fn system() -> Self {
        Self {
            roles: BTreeSet::new(),
            admin: true,
        }
    }

    /// Mark this context as admin.
    pub fn into_admin(mut self) -> Self {
        self.admin = true;
        self
    }

    /// Whether row-level security is bypassed.
    pub fn is_admin(&self) -> bool {
        self.admin
    }

    /// Whether the context holds the named role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Roles visible to this context, sorted.
    pub fn roles(&self) -> Vec<String> {
        self.roles.iter().cloned().collect()
    }
}
