use std::fmt;

use super::identity::{Identity, ADMINISTRATOR_ROLE};

/// Permission name reserved for the "caller owns the resource" predicate.
pub const SELF_PERMISSION: &str = "self";

/// One entry of a route's required permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Permission {
    /// Caller id must equal the numeric id in the URL path.
    SelfOwned,
    /// Caller must hold this role (or be an administrator).
    Role(String),
}

impl Permission {
    pub fn as_str(&self) -> &str {
        match self {
            Permission::SelfOwned => SELF_PERMISSION,
            Permission::Role(role) => role,
        }
    }

    pub fn administrator() -> Self {
        Permission::Role(ADMINISTRATOR_ROLE.to_string())
    }

    fn is_satisfied_by(&self, identity: &Identity, resource_id: Option<i64>) -> bool {
        match self {
            // A missing id never matches; evaluation moves on to the next entry.
            Permission::SelfOwned => resource_id.is_some_and(|id| id == identity.id()),
            Permission::Role(role) => identity.is_admin() || identity.has_role(role),
        }
    }
}

impl From<&str> for Permission {
    fn from(s: &str) -> Self {
        match s {
            SELF_PERMISSION => Permission::SelfOwned,
            other => Permission::Role(other.to_string()),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered permissions attached to a route. Any single match grants access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequiredPermissions(Vec<Permission>);

impl RequiredPermissions {
    pub fn new<I, P>(permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Permission>,
    {
        Self(permissions.into_iter().map(Into::into).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Permission> {
        self.0.iter()
    }

    pub fn needs_resource_id(&self) -> bool {
        self.0.contains(&Permission::SelfOwned)
    }
}

impl fmt::Display for RequiredPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(Permission::as_str).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// Decides whether `identity` may access a route requiring `required`.
///
/// Entries are OR-ed in declaration order; the first satisfied one wins.
/// An empty requirement list denies.
pub fn authorize(identity: &Identity, required: &RequiredPermissions, resource_id: Option<i64>) -> bool {
    required
        .iter()
        .any(|permission| permission.is_satisfied_by(identity, resource_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, roles: &[&str]) -> Identity {
        Identity::new(id, format!("user-{}", id), roles.iter().copied())
    }

    #[test]
    fn parses_reserved_names() {
        assert_eq!(Permission::from("self"), Permission::SelfOwned);
        assert_eq!(Permission::from("administrator"), Permission::administrator());
        assert_eq!(Permission::from("user"), Permission::Role("user".into()));
    }

    #[test]
    fn admin_or_self_is_an_or() {
        let required = RequiredPermissions::new(["administrator", "self"]);

        // Owner without admin role.
        assert!(authorize(&user(5, &["user"]), &required, Some(5)));
        // Admin on someone else's resource.
        assert!(authorize(&user(1, &["administrator"]), &required, Some(5)));
        // Neither.
        assert!(!authorize(&user(6, &["user"]), &required, Some(5)));
    }

    #[test]
    fn administrator_overrides_any_role() {
        let required = RequiredPermissions::new(["editor"]);
        assert!(authorize(&user(1, &["administrator"]), &required, None));
        assert!(authorize(&user(2, &["editor"]), &required, None));
        assert!(!authorize(&user(3, &["user"]), &required, None));
    }

    #[test]
    fn administrator_does_not_satisfy_self_alone() {
        let required = RequiredPermissions::new(["self"]);
        assert!(!authorize(&user(1, &["administrator"]), &required, Some(5)));
        assert!(authorize(&user(5, &["user"]), &required, Some(5)));
    }

    #[test]
    fn self_without_resource_id_falls_through() {
        let only_self = RequiredPermissions::new(["self"]);
        assert!(!authorize(&user(5, &["user"]), &only_self, None));

        // The skipped entry does not stop later entries from matching.
        let self_then_user = RequiredPermissions::new(["self", "user"]);
        assert!(authorize(&user(5, &["user"]), &self_then_user, None));
    }

    #[test]
    fn empty_requirements_deny() {
        let required = RequiredPermissions::new(Vec::<&str>::new());
        assert!(!authorize(&user(1, &["administrator"]), &required, Some(1)));
    }

    #[test]
    fn display_lists_permissions_in_order() {
        let required = RequiredPermissions::new(["administrator", "self"]);
        assert_eq!(required.to_string(), "[administrator, self]");
        assert!(required.needs_resource_id());
    }
}
