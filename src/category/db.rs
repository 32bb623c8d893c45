//! Database operations for categories.

use rusqlite::{Connection, OptionalExtension, Row};

use crate::{
    Error,
    auth::UserID,
    category::{Category, CategoryIcon, CategoryId, CategoryName},
};

/// The categories every user can see, created when the database is initialized.
const GLOBAL_CATEGORIES: [(&str, &str); 7] = [
    ("Groceries", "ShoppingCart"),
    ("Restaurants", "UtensilsCrossed"),
    ("Transport", "Car"),
    ("Home", "Home"),
    ("Health", "HeartPulse"),
    ("Leisure", "Gamepad2"),
    ("Other", "Puzzle"),
];

/// Initialize the category table and indexes.
pub fn create_category_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS category (
            id INTEGER PRIMARY KEY,
            user_id INTEGER,
            name TEXT NOT NULL,
            icon TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_category_user_id ON category(user_id);",
    )?;

    Ok(())
}

/// Insert the global categories if there are none yet.
pub fn seed_global_categories(connection: &Connection) -> Result<(), rusqlite::Error> {
    let global_count: i64 = connection.query_row(
        "SELECT COUNT(id) FROM category WHERE user_id IS NULL",
        [],
        |row| row.get(0),
    )?;

    if global_count > 0 {
        return Ok(());
    }

    let mut statement =
        connection.prepare("INSERT INTO category (user_id, name, icon) VALUES (NULL, ?1, ?2)")?;

    for (name, icon) in GLOBAL_CATEGORIES {
        statement.execute((name, icon))?;
    }

    Ok(())
}

/// Create a category owned by `owner` and return it with its generated ID.
pub fn create_category(
    owner: UserID,
    name: CategoryName,
    icon: CategoryIcon,
    connection: &Connection,
) -> Result<Category, Error> {
    connection.execute(
        "INSERT INTO category (user_id, name, icon) VALUES (?1, ?2, ?3)",
        (owner.as_i64(), name.as_ref(), icon.as_ref()),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Category {
        id,
        user_id: Some(owner),
        name,
        icon,
        is_global: false,
    })
}

/// Retrieve the global categories followed by the categories owned by
/// `owner`, each group ordered alphabetically by name.
pub fn get_visible_categories(
    owner: UserID,
    connection: &Connection,
) -> Result<Vec<Category>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, icon FROM category
            WHERE user_id = ?1 OR user_id IS NULL
            ORDER BY user_id IS NOT NULL, name COLLATE NOCASE ASC",
        )?
        .query_map([owner.as_i64()], map_row)?
        .map(|maybe_category| maybe_category.map_err(|error| error.into()))
        .collect()
}

/// Check whether `category_id` refers to a category visible to `owner`.
pub fn is_category_visible(
    category_id: CategoryId,
    owner: UserID,
    connection: &Connection,
) -> Result<bool, Error> {
    connection
        .query_row(
            "SELECT EXISTS(
                SELECT 1 FROM category WHERE id = ?1 AND (user_id = ?2 OR user_id IS NULL)
            )",
            (category_id, owner.as_i64()),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Update a category owned by `owner`.
///
/// # Errors
///
/// Returns [Error::GlobalRowReadOnly] if the category is global and
/// [Error::NotFound] if it does not exist or belongs to someone else.
pub fn update_category(
    category_id: CategoryId,
    owner: UserID,
    name: CategoryName,
    icon: CategoryIcon,
    connection: &Connection,
) -> Result<Category, Error> {
    let rows_affected = connection.execute(
        "UPDATE category SET name = ?1, icon = ?2 WHERE id = ?3 AND user_id = ?4",
        (name.as_ref(), icon.as_ref(), category_id, owner.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(explain_rejected_write(category_id, connection)?);
    }

    Ok(Category {
        id: category_id,
        user_id: Some(owner),
        name,
        icon,
        is_global: false,
    })
}

/// Delete a category owned by `owner`.
///
/// # Errors
///
/// Returns [Error::GlobalRowReadOnly] if the category is global,
/// [Error::NotFound] if it does not exist or belongs to someone else and
/// [Error::ReferencedRow] if expenses still use it.
pub fn delete_category(
    category_id: CategoryId,
    owner: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM category WHERE id = ?1 AND user_id = ?2",
        (category_id, owner.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(explain_rejected_write(category_id, connection)?);
    }

    Ok(())
}

fn explain_rejected_write(
    category_id: CategoryId,
    connection: &Connection,
) -> Result<Error, Error> {
    let owner: Option<Option<i64>> = connection
        .query_row(
            "SELECT user_id FROM category WHERE id = ?1",
            [category_id],
            |row| row.get(0),
        )
        .optional()?;

    match owner {
        Some(None) => {
            tracing::warn!("Rejected write to global category {category_id}");
            Ok(Error::GlobalRowReadOnly)
        }
        _ => Ok(Error::NotFound),
    }
}

fn map_row(row: &Row) -> Result<Category, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = row.get::<_, Option<i64>>(1)?.map(UserID::new);
    let name = CategoryName::new_unchecked(&row.get::<_, String>(2)?);
    let icon = CategoryIcon::new_unchecked(&row.get::<_, String>(3)?);

    Ok(Category {
        id,
        user_id,
        name,
        icon,
        is_global: user_id.is_none(),
    })
}
