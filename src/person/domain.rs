use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{Error, auth::UserID};

/// The database ID of a person.
pub type PersonId = i64;

/// The name of a person, 2 to 50 characters with surrounding whitespace removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName(String);

impl PersonName {
    /// Create a person name from a string, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidName] if the trimmed name is not 2 to 50 characters long.
    pub fn new(raw_name: &str) -> Result<Self, Error> {
        let trimmed = raw_name.trim();

        match trimmed.chars().count() {
            2..=50 => Ok(Self(trimmed.to_owned())),
            _ => Err(Error::InvalidName),
        }
    }

    /// Create a person name without validation.
    pub fn new_unchecked(raw_name: &str) -> Self {
        Self(raw_name.to_owned())
    }
}

impl AsRef<str> for PersonName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for PersonName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A hex color code in the form "#RRGGBB", stored in upper case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color(String);

impl Color {
    /// Parse a hex color code, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidColor] if `raw_color` is not a "#" followed by six hex digits.
    pub fn new(raw_color: &str) -> Result<Self, Error> {
        let trimmed = raw_color.trim();

        match trimmed.strip_prefix('#') {
            Some(digits) if digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()) => {
                Ok(Self(trimmed.to_uppercase()))
            }
            _ => Err(Error::InvalidColor(trimmed.to_owned())),
        }
    }

    pub fn new_unchecked(raw_color: &str) -> Self {
        Self(raw_color.to_owned())
    }
}

impl AsRef<str> for Color {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Someone expenses are recorded for, e.g. the user themselves or a partner.
///
/// People without an owner are global and shared read-only by every user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    pub user_id: Option<UserID>,
    pub name: PersonName,
    pub color: Color,
    pub is_global: bool,
}

impl Person {
    /// Placeholder ID for a person that is shown in the cache before the
    /// database has assigned an ID.
    pub const PROVISIONAL_ID: PersonId = 0;
}

/// The data submitted to create or update a person.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonForm {
    pub name: String,
    pub color: String,
}
