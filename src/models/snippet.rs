use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{Validate, Violations};

/// Accepted lifetimes for a new snippet, in days.
pub const EXPIRY_OPTIONS: [&str; 3] = ["365", "7", "1"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created: DateTime<Utc>,
    pub expires: DateTime<Utc>,
}

impl Snippet {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnippetCreate {
    pub title: String,
    pub content: String,
    /// Lifetime in days, one of [`EXPIRY_OPTIONS`].
    pub expires: String,
}

impl SnippetCreate {
    /// Lifetime as a duration; `None` unless `expires` is a permitted value.
    pub fn lifetime(&self) -> Option<Duration> {
        if !EXPIRY_OPTIONS.contains(&self.expires.as_str()) {
            return None;
        }
        self.expires.parse::<i64>().ok().map(Duration::days)
    }
}

impl Validate for SnippetCreate {
    fn validate(&self) -> Violations {
        let mut v = Violations::new();
        v.required("title", &self.title).max_len("title", &self.title, 100);
        v.required("content", &self.content)
            .max_len("content", &self.content, 1000);
        v.required("expires", &self.expires)
            .one_of("expires", &self.expires, &EXPIRY_OPTIONS);
        v
    }
}
