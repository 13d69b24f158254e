//! Role-based authorization.
//!
//! Two gates exist and callers choose per use-case: an endpoint-level role
//! check (any shared role suffices) and a fine-grained permission check
//! (every required permission must be covered by the caller's roles).

use std::collections::{HashMap, HashSet};

/// Static mapping from role name to its permission set. Loaded once at
/// startup, immutable for the process lifetime.
#[derive(Debug, Clone)]
pub struct PermissionTable {
    roles: HashMap<String, HashSet<String>>,
}

impl PermissionTable {
    pub fn new(roles: HashMap<String, HashSet<String>>) -> Self {
        Self { roles }
    }

    /// The shipped role table.
    pub fn defaults() -> Self {
        let mut roles = HashMap::new();
        roles.insert(
            "admin".to_string(),
            permissions(&["read", "write", "delete", "generate_report", "manage_users"]),
        );
        roles.insert(
            "fraud_analyst".to_string(),
            permissions(&["read", "write", "generate_report"]),
        );
        roles.insert("viewer".to_string(), permissions(&["read"]));
        Self { roles }
    }

    /// Union of the permissions granted by `roles`. Unknown roles grant
    /// nothing.
    pub fn expand(&self, roles: &[String]) -> HashSet<String> {
        let mut expanded = HashSet::new();
        for role in roles {
            if let Some(perms) = self.roles.get(role) {
                expanded.extend(perms.iter().cloned());
            }
        }
        expanded
    }
}

fn permissions(names: &[&str]) -> HashSet<String> {
    names.iter().map(|p| p.to_string()).collect()
}

/// Decides allow/deny from a caller's roles.
#[derive(Debug, Clone)]
pub struct Authorizer {
    table: PermissionTable,
}

impl Authorizer {
    pub fn new(table: PermissionTable) -> Self {
        Self { table }
    }

    /// Endpoint-level gate: true iff the caller holds at least one of the
    /// allowed roles.
    pub fn any_role(&self, caller_roles: &[String], allowed: &[String]) -> bool {
        caller_roles.iter().any(|role| allowed.contains(role))
    }

    /// Fine-grained gate: true iff the caller's expanded permission set
    /// covers every required permission.
    pub fn has_permissions(&self, caller_roles: &[String], required: &[String]) -> bool {
        let granted = self.table.expand(caller_roles);
        required.iter().all(|perm| granted.contains(perm))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn authorizer() -> Authorizer {
        Authorizer::new(PermissionTable::defaults())
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_any_role_intersection() {
        let auth = authorizer();
        let allowed = names(&["admin", "fraud_analyst"]);

        assert!(auth.any_role(&names(&["fraud_analyst"]), &allowed));
        assert!(auth.any_role(&names(&["viewer", "admin"]), &allowed));
        assert!(!auth.any_role(&names(&["viewer"]), &allowed));
        assert!(!auth.any_role(&[], &allowed));
    }

    #[test]
    fn test_permission_expansion_per_table() {
        let auth = authorizer();

        // admin covers everything in the table
        for perm in ["read", "write", "delete", "generate_report", "manage_users"] {
            assert!(auth.has_permissions(&names(&["admin"]), &names(&[perm])));
        }

        // fraud_analyst lacks the admin-only permissions
        assert!(auth.has_permissions(
            &names(&["fraud_analyst"]),
            &names(&["read", "write", "generate_report"])
        ));
        assert!(!auth.has_permissions(&names(&["fraud_analyst"]), &names(&["delete"])));
        assert!(!auth.has_permissions(&names(&["fraud_analyst"]), &names(&["manage_users"])));

        // viewer is read-only
        assert!(auth.has_permissions(&names(&["viewer"]), &names(&["read"])));
        assert!(!auth.has_permissions(&names(&["viewer"]), &names(&["write"])));
    }

    #[test]
    fn test_permissions_union_across_roles() {
        let auth = authorizer();

        // viewer + fraud_analyst together still cannot delete
        let combined = names(&["viewer", "fraud_analyst"]);
        assert!(auth.has_permissions(&combined, &names(&["read", "generate_report"])));
        assert!(!auth.has_permissions(&combined, &names(&["delete"])));
    }

    #[test]
    fn test_unknown_roles_grant_nothing() {
        let auth = authorizer();
        assert!(!auth.has_permissions(&names(&["superuser"]), &names(&["read"])));
        // All-of over an empty requirement always holds
        assert!(auth.has_permissions(&names(&["superuser"]), &[]));
    }
}
