//! Database operations for people.
//!
//! Every query is scoped to an owner. Rows without an owner are global: they
//! are returned alongside the owner's own rows but are never modified.

use rusqlite::{Connection, OptionalExtension, Row};

use crate::{
    Error,
    auth::UserID,
    person::{Color, Person, PersonId, PersonName},
};

/// The people every user can see, created when the database is initialized.
const GLOBAL_PEOPLE: [(&str, &str); 1] = [("Me", "#2563EB")];

/// Initialize the person table and indexes.
pub fn create_person_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS person (
            id INTEGER PRIMARY KEY,
            user_id INTEGER,
            name TEXT NOT NULL,
            color TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_person_user_id ON person(user_id);",
    )?;

    Ok(())
}

/// Insert the global people if there are none yet.
pub fn seed_global_people(connection: &Connection) -> Result<(), rusqlite::Error> {
    let global_count: i64 = connection.query_row(
        "SELECT COUNT(id) FROM person WHERE user_id IS NULL",
        [],
        |row| row.get(0),
    )?;

    if global_count > 0 {
        return Ok(());
    }

    let mut statement =
        connection.prepare("INSERT INTO person (user_id, name, color) VALUES (NULL, ?1, ?2)")?;

    for (name, color) in GLOBAL_PEOPLE {
        statement.execute((name, color))?;
    }

    Ok(())
}

/// Create a person owned by `owner` and return it with its generated ID.
pub fn create_person(
    owner: UserID,
    name: PersonName,
    color: Color,
    connection: &Connection,
) -> Result<Person, Error> {
    connection.execute(
        "INSERT INTO person (user_id, name, color) VALUES (?1, ?2, ?3)",
        (owner.as_i64(), name.as_ref(), color.as_ref()),
    )?;

    let id = connection.last_insert_rowid();

    Ok(Person {
        id,
        user_id: Some(owner),
        name,
        color,
        is_global: false,
    })
}

/// Retrieve the global people followed by the people owned by `owner`,
/// each group ordered alphabetically by name.
pub fn get_visible_people(owner: UserID, connection: &Connection) -> Result<Vec<Person>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, name, color FROM person
            WHERE user_id = ?1 OR user_id IS NULL
            ORDER BY user_id IS NOT NULL, name COLLATE NOCASE ASC",
        )?
        .query_map([owner.as_i64()], map_row)?
        .map(|maybe_person| maybe_person.map_err(|error| error.into()))
        .collect()
}

/// Check whether `person_id` refers to a person visible to `owner`.
pub fn is_person_visible(
    person_id: PersonId,
    owner: UserID,
    connection: &Connection,
) -> Result<bool, Error> {
    connection
        .query_row(
            "SELECT EXISTS(
                SELECT 1 FROM person WHERE id = ?1 AND (user_id = ?2 OR user_id IS NULL)
            )",
            (person_id, owner.as_i64()),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Update a person owned by `owner`.
///
/// # Errors
///
/// Returns [Error::GlobalRowReadOnly] if the person is global and
/// [Error::NotFound] if the person does not exist or belongs to someone else.
pub fn update_person(
    person_id: PersonId,
    owner: UserID,
    name: PersonName,
    color: Color,
    connection: &Connection,
) -> Result<Person, Error> {
    let rows_affected = connection.execute(
        "UPDATE person SET name = ?1, color = ?2 WHERE id = ?3 AND user_id = ?4",
        (name.as_ref(), color.as_ref(), person_id, owner.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(explain_rejected_write(person_id, connection)?);
    }

    Ok(Person {
        id: person_id,
        user_id: Some(owner),
        name,
        color,
        is_global: false,
    })
}

/// Delete a person owned by `owner`.
///
/// # Errors
///
/// Returns [Error::GlobalRowReadOnly] if the person is global,
/// [Error::NotFound] if the person does not exist or belongs to someone else
/// and [Error::ReferencedRow] if expenses still refer to the person.
pub fn delete_person(
    person_id: PersonId,
    owner: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM person WHERE id = ?1 AND user_id = ?2",
        (person_id, owner.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(explain_rejected_write(person_id, connection)?);
    }

    Ok(())
}

/// Work out why an owner-scoped write touched no rows.
fn explain_rejected_write(person_id: PersonId, connection: &Connection) -> Result<Error, Error> {
    let owner: Option<Option<i64>> = connection
        .query_row(
            "SELECT user_id FROM person WHERE id = ?1",
            [person_id],
            |row| row.get(0),
        )
        .optional()?;

    match owner {
        Some(None) => {
            tracing::warn!("Rejected write to global person {person_id}");
            Ok(Error::GlobalRowReadOnly)
        }
        _ => Ok(Error::NotFound),
    }
}

fn map_row(row: &Row) -> Result<Person, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = row.get::<_, Option<i64>>(1)?.map(UserID::new);
    let name = PersonName::new_unchecked(&row.get::<_, String>(2)?);
    let color = Color::new_unchecked(&row.get::<_, String>(3)?);

    Ok(Person {
        id,
        user_id,
        name,
        color,
        is_global: user_id.is_none(),
    })
}

#[cfg(test)]
mod person_query_tests {
    use rusqlite::Connection;

    use crate::{
        Error,
        auth::UserID,
        person::{Color, Person, PersonName},
        test_utils::{create_test_user, get_test_connection},
    };

    use super::{
        create_person, delete_person, get_visible_people, is_person_visible, update_person,
    };

    fn find_person(person_id: i64, owner: UserID, connection: &Connection) -> Option<Person> {
        get_visible_people(owner, connection)
            .unwrap()
            .into_iter()
            .find(|person| person.id == person_id)
    }

    fn get_global_person_id(connection: &Connection) -> i64 {
        connection
            .query_row(
                "SELECT id FROM person WHERE user_id IS NULL AND name = 'Me'",
                [],
                |row| row.get(0),
            )
            .unwrap()
    }

    #[test]
    fn global_people_are_seeded() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);

        let people = get_visible_people(user.id, &connection).unwrap();

        assert_eq!(people.len(), 1);
        assert_eq!(people[0].name.as_ref(), "Me");
        assert_eq!(people[0].color.as_ref(), "#2563EB");
        assert!(people[0].is_global);
        assert_eq!(people[0].user_id, None);
    }

    #[test]
    fn create_person_succeeds() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        let name = PersonName::new("Alex").unwrap();

        let person = create_person(
            user.id,
            name.clone(),
            Color::new("#ff0000").unwrap(),
            &connection,
        )
        .unwrap();

        assert!(person.id > 0);
        assert_eq!(person.name, name);
        assert_eq!(person.user_id, Some(user.id));
        assert_eq!(find_person(person.id, user.id, &connection), Some(person));
    }

    #[test]
    fn people_of_other_users_are_hidden() {
        let connection = get_test_connection();
        let owner = create_test_user(&connection);
        let other = UserID::new(owner.id.as_i64() + 1);
        let person = create_person(
            owner.id,
            PersonName::new_unchecked("Alex"),
            Color::new_unchecked("#FF0000"),
            &connection,
        )
        .unwrap();

        assert_eq!(find_person(person.id, other, &connection), None);
        assert_eq!(get_visible_people(other, &connection).unwrap().len(), 1);
        assert!(!is_person_visible(person.id, other, &connection).unwrap());
        assert!(is_person_visible(person.id, owner.id, &connection).unwrap());
    }

    #[test]
    fn visible_people_list_globals_first() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        for name in ["Zoe", "Alex"] {
            create_person(
                user.id,
                PersonName::new_unchecked(name),
                Color::new_unchecked("#FF0000"),
                &connection,
            )
            .unwrap();
        }

        let names: Vec<String> = get_visible_people(user.id, &connection)
            .unwrap()
            .into_iter()
            .map(|person| person.name.to_string())
            .collect();

        assert_eq!(names, ["Me", "Alex", "Zoe"]);
    }

    #[test]
    fn update_person_succeeds() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        let person = create_person(
            user.id,
            PersonName::new_unchecked("Alex"),
            Color::new_unchecked("#FF0000"),
            &connection,
        )
        .unwrap();

        update_person(
            person.id,
            user.id,
            PersonName::new_unchecked("Sam"),
            Color::new_unchecked("#00FF00"),
            &connection,
        )
        .unwrap();

        let got = find_person(person.id, user.id, &connection).unwrap();
        assert_eq!(got.name.as_ref(), "Sam");
        assert_eq!(got.color.as_ref(), "#00FF00");
    }

    #[test]
    fn update_global_person_is_rejected() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        let global_id = get_global_person_id(&connection);

        let result = update_person(
            global_id,
            user.id,
            PersonName::new_unchecked("Hacked"),
            Color::new_unchecked("#000000"),
            &connection,
        );

        assert_eq!(result, Err(Error::GlobalRowReadOnly));
        let unchanged = find_person(global_id, user.id, &connection).unwrap();
        assert_eq!(unchanged.name.as_ref(), "Me");
        assert_eq!(unchanged.color.as_ref(), "#2563EB");
    }

    #[test]
    fn delete_global_person_is_rejected() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        let global_id = get_global_person_id(&connection);

        let result = delete_person(global_id, user.id, &connection);

        assert_eq!(result, Err(Error::GlobalRowReadOnly));
        assert!(find_person(global_id, user.id, &connection).is_some());
    }

    #[test]
    fn delete_person_of_other_user_is_not_found() {
        let connection = get_test_connection();
        let owner = create_test_user(&connection);
        let person = create_person(
            owner.id,
            PersonName::new_unchecked("Alex"),
            Color::new_unchecked("#FF0000"),
            &connection,
        )
        .unwrap();

        let result = delete_person(person.id, UserID::new(owner.id.as_i64() + 1), &connection);

        assert_eq!(result, Err(Error::NotFound));
        assert!(find_person(person.id, owner.id, &connection).is_some());
    }

    #[test]
    fn delete_person_succeeds() {
        let connection = get_test_connection();
        let user = create_test_user(&connection);
        let person = create_person(
            user.id,
            PersonName::new_unchecked("Alex"),
            Color::new_unchecked("#FF0000"),
            &connection,
        )
        .unwrap();

        delete_person(person.id, user.id, &connection).unwrap();

        assert_eq!(find_person(person.id, user.id, &connection), None);
    }
}
