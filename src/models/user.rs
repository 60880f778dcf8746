use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Validate, Violations};

/// A user account as returned by the API. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub created: DateTime<Utc>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleType {
    pub id: i64,
    pub role: String,
    pub description: String,
    pub created: DateTime<Utc>,
}

/// Credentials posted to `/users/login`; `username` is the account email.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginUser {
    pub username: String,
    pub password: String,
}

impl Validate for LoginUser {
    fn validate(&self) -> Violations {
        let mut v = Violations::new();
        v.required("username", &self.username)
            .email("username", &self.username)
            .max_len("username", &self.username, 255);
        v.password("password", &self.password);
        v
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Role type ids.
    #[serde(default)]
    pub roles: Vec<i64>,
}

impl Validate for CreateUser {
    fn validate(&self) -> Violations {
        let mut v = Violations::new();
        v.required("name", &self.name)
            .min_len("name", &self.name, 10)
            .max_len("name", &self.name, 255);
        v.required("email", &self.email)
            .email("email", &self.email)
            .max_len("email", &self.email, 255);
        v.password("password", &self.password);
        v
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeUserPassword {
    pub old_password: String,
    pub new_password: String,
}

impl Validate for ChangeUserPassword {
    fn validate(&self) -> Violations {
        let mut v = Violations::new();
        v.password("oldPassword", &self.old_password);
        v.password("newPassword", &self.new_password);
        v
    }
}
