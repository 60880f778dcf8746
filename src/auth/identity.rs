use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Role that implicitly satisfies every non-`self` permission.
pub const ADMINISTRATOR_ROLE: &str = "administrator";

/// Caller identity carried inside a token and reconstructed from it on every request.
///
/// Only obtainable from a verified token (or built by the issuer before signing),
/// so holding one means the signature was checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    id: i64,
    name: String,
    roles: BTreeSet<String>,
}

impl Identity {
    pub fn new<I, R>(id: i64, name: impl Into<String>, roles: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<String>,
    {
        Self {
            id,
            name: name.into(),
            roles: roles.into_iter().map(Into::into).collect(),
        }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn roles(&self) -> &BTreeSet<String> {
        &self.roles
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ADMINISTRATOR_ROLE)
    }
}

/// Login response body: the issued token plus the user it embeds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenMessage {
    pub user: Identity,
    pub token: String,
}

/// User details read from a token *without* checking its signature.
///
/// Good for display and session bookkeeping on the web tier. It deliberately
/// does not convert into [`Identity`], so it cannot reach the permission evaluator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    pub name: String,
    pub roles: BTreeSet<String>,
}

impl SessionUser {
    pub fn is_admin(&self) -> bool {
        self.roles.contains(ADMINISTRATOR_ROLE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_order_irrelevant() {
        let a = Identity::new(1, "alice", ["user", "administrator"]);
        let b = Identity::new(1, "alice", ["administrator", "user"]);
        assert_eq!(a, b);
        assert!(a.is_admin());
        assert!(a.has_role("user"));
        assert!(!a.has_role("editor"));
    }

    #[test]
    fn identity_serializes_as_plain_object() {
        let identity = Identity::new(5, "bob", ["user"]);
        let value = serde_json::to_value(&identity).unwrap();
        assert_eq!(value, serde_json::json!({"id": 5, "name": "bob", "roles": ["user"]}));
    }
}
