//! Identity, roles, and row-level security.

mod identity;
mod rls;
mod roles;

pub use identity::{AccessContext, Identity, ANONYMOUS_ROLE};
pub use rls::visibility_predicate;
pub use roles::{Role, SchemaRoles};
