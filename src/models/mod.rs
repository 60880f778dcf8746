pub mod json;
pub mod snippet;
pub mod user;

pub use json::ValidJson;
pub use snippet::{Snippet, SnippetCreate, EXPIRY_OPTIONS};
pub use user::{ChangeUserPassword, CreateUser, LoginUser, RoleType, User};

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

pub const PASSWORD_MIN: usize = 10;
pub const PASSWORD_MAX: usize = 60;

/// Payloads that check their own field constraints after deserialization.
pub trait Validate {
    fn validate(&self) -> Violations;
}

/// Field constraint failures, grouped by field name.
///
/// Blank values are only reported by [`Violations::required`]; the other
/// checks skip them so a blank field yields a single message.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Violations {
    fields: BTreeMap<String, Vec<String>>,
}

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn required(&mut self, field: &str, value: &str) -> &mut Self {
        if value.trim().is_empty() {
            self.add(field, "This field cannot be blank");
        }
        self
    }

    pub fn max_len(&mut self, field: &str, value: &str, max: usize) -> &mut Self {
        if !value.trim().is_empty() && value.chars().count() > max {
            self.add(field, format!("This field is too long (maximum is {} characters)", max));
        }
        self
    }

    pub fn min_len(&mut self, field: &str, value: &str, min: usize) -> &mut Self {
        if !value.trim().is_empty() && value.chars().count() < min {
            self.add(field, format!("This field is too short (minimum is {} characters)", min));
        }
        self
    }

    pub fn email(&mut self, field: &str, value: &str) -> &mut Self {
        if !value.trim().is_empty() && !is_valid_email(value) {
            self.add(field, "This field is invalid");
        }
        self
    }

    pub fn one_of(&mut self, field: &str, value: &str, permitted: &[&str]) -> &mut Self {
        if !value.trim().is_empty() && !permitted.contains(&value) {
            self.add(field, "This field is invalid");
        }
        self
    }

    pub fn password(&mut self, field: &str, value: &str) -> &mut Self {
        self.required(field, value)
            .min_len(field, value, PASSWORD_MIN)
            .max_len(field, value, PASSWORD_MAX)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// First message for `field`, for rendering next to a form input.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    /// Flat `field: message` list, the shape of a 422 body.
    pub fn messages(&self) -> Vec<String> {
        self.fields
            .iter()
            .flat_map(|(field, messages)| {
                messages
                    .iter()
                    .map(move |message| format!("{}: {}", field, message))
            })
            .collect()
    }

    pub fn into_result(self) -> Result<(), Violations> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?",
        r"(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    ))
    .unwrap_or_else(|e| unreachable!("email pattern is a literal: {}", e))
});

/// `local@domain` with a dotted or bare hostname of alphanumeric labels.
pub fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value)
}
