//! Endpoints for listing and managing people.
//!
//! Reads go through the people cache and writes are applied to the cache
//! optimistically before they reach the database.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, State},
    http::{StatusCode, header::LOCATION},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::Session,
    cache::CollectionCache,
    db::lock_connection,
    endpoints::{self, format_endpoint},
    person::{
        Color, Person, PersonForm, PersonId, PersonName,
        db::{create_person, delete_person, get_visible_people, update_person},
    },
};

/// The state needed by the people endpoints.
#[derive(Debug, Clone)]
pub struct PersonState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub person_cache: CollectionCache<Person>,
}

impl FromRef<AppState> for PersonState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            person_cache: state.person_cache.clone(),
        }
    }
}

/// List the global people and the people owned by the logged in user.
pub async fn list_people_endpoint(
    State(state): State<PersonState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<Person>>, Error> {
    let people = state.person_cache.read_through(session.user_id, || {
        let connection = lock_connection(&state.db_connection)?;
        get_visible_people(session.user_id, &connection)
    })?;

    Ok(Json(people))
}

/// Create a person owned by the logged in user.
pub async fn create_person_endpoint(
    State(state): State<PersonState>,
    Extension(session): Extension<Session>,
    Json(form): Json<PersonForm>,
) -> Result<Response, Error> {
    let name = PersonName::new(&form.name)?;
    let color = Color::new(&form.color)?;

    let provisional = Person {
        id: Person::PROVISIONAL_ID,
        user_id: Some(session.user_id),
        name: name.clone(),
        color: color.clone(),
        is_global: false,
    };

    let person = state.person_cache.mutate(
        session.user_id,
        |people| people.push(provisional),
        || {
            let connection = lock_connection(&state.db_connection)?;
            create_person(session.user_id, name, color, &connection)
        },
    )?;
    tracing::info!("User {} created person {}", session.user_id, person.id);

    Ok((
        StatusCode::CREATED,
        [(LOCATION, format_endpoint(endpoints::PERSON, person.id))],
        Json(person),
    )
        .into_response())
}

/// Update the name and color of a person owned by the logged in user.
pub async fn update_person_endpoint(
    State(state): State<PersonState>,
    Extension(session): Extension<Session>,
    Path(person_id): Path<PersonId>,
    Json(form): Json<PersonForm>,
) -> Result<Json<Person>, Error> {
    let name = PersonName::new(&form.name)?;
    let color = Color::new(&form.color)?;
    let owner = Some(session.user_id);

    let person = state.person_cache.mutate(
        session.user_id,
        |people| {
            if let Some(person) = people
                .iter_mut()
                .find(|person| person.id == person_id && person.user_id == owner)
            {
                person.name = name.clone();
                person.color = color.clone();
            }
        },
        || {
            let connection = lock_connection(&state.db_connection)?;
            update_person(person_id, session.user_id, name.clone(), color.clone(), &connection)
        },
    )?;

    Ok(Json(person))
}

/// Delete a person owned by the logged in user.
///
/// People that are still assigned to expenses cannot be deleted.
pub async fn delete_person_endpoint(
    State(state): State<PersonState>,
    Extension(session): Extension<Session>,
    Path(person_id): Path<PersonId>,
) -> Result<StatusCode, Error> {
    let owner = Some(session.user_id);

    state.person_cache.mutate(
        session.user_id,
        |people| people.retain(|person| !(person.id == person_id && person.user_id == owner)),
        || {
            let connection = lock_connection(&state.db_connection)?;
            delete_person(person_id, session.user_id, &connection)
        },
    )?;
    tracing::info!("User {} deleted person {person_id}", session.user_id);

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod person_endpoint_tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::{
        endpoints::{self, format_endpoint},
        person::Person,
        test_utils::{
            create_test_expense_for_person, get_global_person, get_logged_in_test_server,
        },
    };

    #[tokio::test]
    async fn list_people_includes_global_people() {
        let (server, cookie, _) = get_logged_in_test_server().await;

        let response = server.get(endpoints::PEOPLE).add_cookie(cookie).await;

        response.assert_status_ok();
        let people = response.json::<Vec<Person>>();
        assert_eq!(people.len(), 1);
        assert!(people[0].is_global);
    }

    #[tokio::test]
    async fn create_person_returns_created_person() {
        let (server, cookie, user) = get_logged_in_test_server().await;

        let response = server
            .post(endpoints::PEOPLE)
            .add_cookie(cookie.clone())
            .json(&json!({ "name": " Alex ", "color": "#10b981" }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let person = response.json::<Person>();
        assert!(person.id > 0);
        assert_eq!(person.name.as_ref(), "Alex");
        assert_eq!(person.color.as_ref(), "#10B981");
        assert_eq!(person.user_id, Some(user.id));
        assert_eq!(
            response.header("location"),
            format_endpoint(endpoints::PERSON, person.id)
        );

        let people = server
            .get(endpoints::PEOPLE)
            .add_cookie(cookie)
            .await
            .json::<Vec<Person>>();
        assert!(people.contains(&person));
    }

    #[tokio::test]
    async fn create_person_rejects_invalid_color() {
        let (server, cookie, _) = get_logged_in_test_server().await;

        server
            .post(endpoints::PEOPLE)
            .add_cookie(cookie)
            .json(&json!({ "name": "Alex", "color": "green" }))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_person_refreshes_cached_list() {
        let (server, cookie, user) = get_logged_in_test_server().await;
        server.get(endpoints::PEOPLE).add_cookie(cookie.clone()).await;

        server
            .post(endpoints::PEOPLE)
            .add_cookie(cookie.clone())
            .json(&json!({ "name": "Alex", "color": "#10B981" }))
            .await
            .assert_status(StatusCode::CREATED);

        assert_eq!(server.state.person_cache.get(user.id), None);
        let people = server
            .get(endpoints::PEOPLE)
            .add_cookie(cookie)
            .await
            .json::<Vec<Person>>();
        assert!(people.iter().all(|person| person.id != Person::PROVISIONAL_ID));
        assert_eq!(people.len(), 2);
    }

    #[tokio::test]
    async fn update_global_person_is_forbidden() {
        let (server, cookie, _) = get_logged_in_test_server().await;
        let global = get_global_person(&server);

        let response = server
            .put(&format_endpoint(endpoints::PERSON, global.id))
            .add_cookie(cookie)
            .json(&json!({ "name": "Hacked", "color": "#000000" }))
            .await;

        response.assert_status(StatusCode::FORBIDDEN);
        assert_eq!(get_global_person(&server), global);
    }

    #[tokio::test]
    async fn failed_delete_restores_cached_list() {
        let (server, cookie, user) = get_logged_in_test_server().await;
        let global = get_global_person(&server);
        server.get(endpoints::PEOPLE).add_cookie(cookie.clone()).await;
        let cached = server.state.person_cache.get(user.id);

        server
            .delete(&format_endpoint(endpoints::PERSON, global.id))
            .add_cookie(cookie)
            .await
            .assert_status(StatusCode::FORBIDDEN);

        assert_eq!(server.state.person_cache.get(user.id), cached);
    }

    #[tokio::test]
    async fn update_person_succeeds() {
        let (server, cookie, _) = get_logged_in_test_server().await;
        let person = server
            .post(endpoints::PEOPLE)
            .add_cookie(cookie.clone())
            .json(&json!({ "name": "Alex", "color": "#10B981" }))
            .await
            .json::<Person>();

        let response = server
            .put(&format_endpoint(endpoints::PERSON, person.id))
            .add_cookie(cookie)
            .json(&json!({ "name": "Sam", "color": "#F59E0B" }))
            .await;

        response.assert_status_ok();
        let updated = response.json::<Person>();
        assert_eq!(updated.id, person.id);
        assert_eq!(updated.name.as_ref(), "Sam");
    }

    #[tokio::test]
    async fn delete_person_succeeds() {
        let (server, cookie, _) = get_logged_in_test_server().await;
        let person = server
            .post(endpoints::PEOPLE)
            .add_cookie(cookie.clone())
            .json(&json!({ "name": "Alex", "color": "#10B981" }))
            .await
            .json::<Person>();

        server
            .delete(&format_endpoint(endpoints::PERSON, person.id))
            .add_cookie(cookie.clone())
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let people = server
            .get(endpoints::PEOPLE)
            .add_cookie(cookie)
            .await
            .json::<Vec<Person>>();
        assert!(!people.contains(&person));
    }

    #[tokio::test]
    async fn delete_person_with_expenses_is_conflict() {
        let (server, cookie, user) = get_logged_in_test_server().await;
        let person = server
            .post(endpoints::PEOPLE)
            .add_cookie(cookie.clone())
            .json(&json!({ "name": "Alex", "color": "#10B981" }))
            .await
            .json::<Person>();
        create_test_expense_for_person(&server, user.id, person.id);

        server
            .delete(&format_endpoint(endpoints::PERSON, person.id))
            .add_cookie(cookie)
            .await
            .assert_status(StatusCode::CONFLICT);
    }
}
