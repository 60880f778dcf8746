use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

use super::{Snippets, StoreError, Users, ADMINISTRATOR_ROLE_ID, LATEST_LIMIT, USER_ROLE_ID};
use crate::auth::ADMINISTRATOR_ROLE;
use crate::models::{RoleType, Snippet, User};

#[derive(Debug, Clone)]
struct UserRecord {
    id: i64,
    name: String,
    email: String,
    role_ids: Vec<i64>,
    password_hash: String,
    created: DateTime<Utc>,
    active: bool,
}

impl UserRecord {
    fn password_matches(&self, password: &str) -> bool {
        match bcrypt::verify(password, &self.password_hash) {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!("unreadable password hash for user {}: {}", self.id, e);
                false
            }
        }
    }

    fn has_email(&self, email: &str) -> bool {
        self.email.eq_ignore_ascii_case(email)
    }
}

fn hash_password(password: &str, cost: u32) -> Result<String, StoreError> {
    bcrypt::hash(password, cost).map_err(|e| StoreError::Internal(format!("password hashing failed: {}", e)))
}

#[derive(Debug, Default)]
struct Tables {
    snippets: Vec<Snippet>,
    users: Vec<UserRecord>,
    role_types: Vec<RoleType>,
}

impl Tables {
    fn next_snippet_id(&self) -> i64 {
        self.snippets.last().map_or(1, |s| s.id + 1)
    }

    fn next_user_id(&self) -> i64 {
        self.users.last().map_or(1, |u| u.id + 1)
    }

    fn user(&self, id: i64) -> Result<&UserRecord, StoreError> {
        self.users.iter().find(|u| u.id == id).ok_or(StoreError::NoRecord)
    }

    fn user_mut(&mut self, id: i64) -> Result<&mut UserRecord, StoreError> {
        self.users.iter_mut().find(|u| u.id == id).ok_or(StoreError::NoRecord)
    }

    fn to_user(&self, record: &UserRecord) -> User {
        let roles = record
            .role_ids
            .iter()
            .filter_map(|id| self.role_types.iter().find(|rt| rt.id == *id))
            .map(|rt| rt.role.clone())
            .collect();

        User {
            id: record.id,
            name: record.name.clone(),
            email: record.email.clone(),
            roles,
            created: record.created,
            active: record.active,
        }
    }
}

/// In-process store for snippets and users.
///
/// Starts with the `administrator` and `user` role types and no accounts.
#[derive(Debug)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    hash_cost: u32,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_hash_cost(bcrypt::DEFAULT_COST)
    }

    /// Store whose password hashes use bcrypt cost `hash_cost` (4 to 31).
    pub fn with_hash_cost(hash_cost: u32) -> Self {
        let now = Utc::now();
        let role_types = vec![
            RoleType {
                id: ADMINISTRATOR_ROLE_ID,
                role: ADMINISTRATOR_ROLE.to_string(),
                description: "Full access to every resource".to_string(),
                created: now,
            },
            RoleType {
                id: USER_ROLE_ID,
                role: "user".to_string(),
                description: "Creates snippets".to_string(),
                created: now,
            },
        ];

        Self {
            tables: RwLock::new(Tables {
                role_types,
                ..Tables::default()
            }),
            hash_cost,
        }
    }

    /// Creates an administrator account unless `email` is already taken.
    pub async fn ensure_admin(&self, name: &str, email: &str, password: &str) -> Result<i64, StoreError> {
        match Users::insert(self, name, email, password, &[ADMINISTRATOR_ROLE_ID, USER_ROLE_ID]).await {
            Err(StoreError::DuplicateEmail) => {
                let tables = self.tables.read().await;
                tables
                    .users
                    .iter()
                    .find(|u| u.has_email(email))
                    .map(|u| u.id)
                    .ok_or(StoreError::NoRecord)
            }
            other => other,
        }
    }

    /// Marks an account active or inactive. Inactive accounts cannot log in.
    pub async fn set_active(&self, id: i64, active: bool) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.user_mut(id)?.active = active;
        Ok(())
    }
}

#[async_trait]
impl Snippets for MemoryStore {
    async fn insert(&self, title: &str, content: &str, lifetime: Duration) -> Result<i64, StoreError> {
        let mut tables = self.tables.write().await;
        let id = tables.next_snippet_id();
        let created = Utc::now();

        tables.snippets.push(Snippet {
            id,
            title: title.to_string(),
            content: content.to_string(),
            created,
            expires: created + lifetime,
        });

        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Snippet, StoreError> {
        let now = Utc::now();
        let tables = self.tables.read().await;
        tables
            .snippets
            .iter()
            .find(|s| s.id == id && !s.is_expired_at(now))
            .cloned()
            .ok_or(StoreError::NoRecord)
    }

    async fn latest(&self) -> Result<Vec<Snippet>, StoreError> {
        let now = Utc::now();
        let tables = self.tables.read().await;

        let mut live: Vec<Snippet> = tables
            .snippets
            .iter()
            .filter(|s| !s.is_expired_at(now))
            .cloned()
            .collect();
        live.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        live.truncate(LATEST_LIMIT);

        Ok(live)
    }
}

#[async_trait]
impl Users for MemoryStore {
    async fn authenticate(&self, email: &str, password: &str) -> Result<i64, StoreError> {
        let tables = self.tables.read().await;
        tables
            .users
            .iter()
            .find(|u| u.active && u.has_email(email))
            .filter(|u| u.password_matches(password))
            .map(|u| u.id)
            .ok_or(StoreError::InvalidCredentials)
    }

    async fn insert(&self, name: &str, email: &str, password: &str, roles: &[i64]) -> Result<i64, StoreError> {
        let mut tables = self.tables.write().await;

        if tables.users.iter().any(|u| u.has_email(email)) {
            return Err(StoreError::DuplicateEmail);
        }
        if let Some(unknown) = roles
            .iter()
            .find(|id| !tables.role_types.iter().any(|rt| rt.id == **id))
        {
            return Err(StoreError::Validation(format!("unknown role type {}", unknown)));
        }

        let mut role_ids = roles.to_vec();
        role_ids.sort_unstable();
        role_ids.dedup();

        let record = UserRecord {
            id: tables.next_user_id(),
            name: name.to_string(),
            email: email.to_string(),
            role_ids,
            password_hash: hash_password(password, self.hash_cost)?,
            created: Utc::now(),
            active: true,
        };

        let id = record.id;
        tables.users.push(record);
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<User, StoreError> {
        let tables = self.tables.read().await;
        let record = tables.user(id)?;
        Ok(tables.to_user(record))
    }

    async fn get_all(&self) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().rev().map(|u| tables.to_user(u)).collect())
    }

    async fn change_password(&self, id: i64, old_password: &str, new_password: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let record = tables.user_mut(id)?;
        if !record.password_matches(old_password) {
            return Err(StoreError::InvalidCredentials);
        }
        record.password_hash = hash_password(new_password, self.hash_cost)?;
        Ok(())
    }

    async fn reset_password(&self, id: i64, new_password: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let record = tables.user_mut(id)?;
        record.password_hash = hash_password(new_password, self.hash_cost)?;
        Ok(())
    }

    async fn role_types(&self) -> Result<Vec<RoleType>, StoreError> {
        Ok(self.tables.read().await.role_types.clone())
    }
}
