use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::{Error, auth::UserID};

/// The database ID of a category.
pub type CategoryId = i64;

/// The icon names a category may use.
pub const CATEGORY_ICONS: [&str; 21] = [
    "ShoppingCart",
    "UtensilsCrossed",
    "Coffee",
    "Pizza",
    "Gamepad2",
    "Film",
    "Dog",
    "PawPrint",
    "Car",
    "Bus",
    "Plane",
    "Fuel",
    "Gift",
    "Home",
    "Shirt",
    "HeartPulse",
    "GraduationCap",
    "BookOpen",
    "Landmark",
    "HandCoins",
    "Puzzle",
];

/// The name of a category, 2 to 50 characters with surrounding whitespace removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name from a string, trimming surrounding whitespace.
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

    /// Create a category name without validation.
    pub fn new_unchecked(raw_name: &str) -> Self {
        Self(raw_name.to_owned())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// One of the [CATEGORY_ICONS].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryIcon(String);

impl CategoryIcon {
    /// # Errors
    ///
    /// Returns [Error::InvalidIcon] if `raw_icon` is not one of the [CATEGORY_ICONS].
    pub fn new(raw_icon: &str) -> Result<Self, Error> {
        let trimmed = raw_icon.trim();

        if CATEGORY_ICONS.contains(&trimmed) {
            Ok(Self(trimmed.to_owned()))
        } else {
            Err(Error::InvalidIcon(trimmed.to_owned()))
        }
    }

    /// Create an icon without validation.
    pub fn new_unchecked(raw_icon: &str) -> Self {
        Self(raw_icon.to_owned())
    }
}

impl AsRef<str> for CategoryIcon {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A spending category such as groceries or transport.
///
/// Categories without an owner are global and shared read-only by every user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub user_id: Option<UserID>,
    pub name: CategoryName,
    pub icon: CategoryIcon,
    pub is_global: bool,
}

impl Category {
    /// Placeholder ID for a category that is shown in the cache before the
    /// database has assigned an ID.
    pub const PROVISIONAL_ID: CategoryId = 0;
}

/// The data submitted to create or update a category.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryForm {
    pub name: String,
    pub icon: String,
}
