//! Endpoints for listing and managing categories.

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
    category::{
        Category, CategoryForm, CategoryIcon, CategoryId, CategoryName,
        db::{create_category, delete_category, get_visible_categories, update_category},
    },
    db::lock_connection,
    endpoints::{self, format_endpoint},
};

/// The state needed by the category endpoints.
#[derive(Debug, Clone)]
pub struct CategoryState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub category_cache: CollectionCache<Category>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            category_cache: state.category_cache.clone(),
        }
    }
}

pub async fn list_categories_endpoint(
    State(state): State<CategoryState>,
    Extension(session): Extension<Session>,
) -> Result<Json<Vec<Category>>, Error> {
    let categories = state.category_cache.read_through(session.user_id, || {
        let connection = lock_connection(&state.db_connection)?;
        get_visible_categories(session.user_id, &connection)
    })?;

    Ok(Json(categories))
}

pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    Extension(session): Extension<Session>,
    Json(form): Json<CategoryForm>,
) -> Result<Response, Error> {
    let name = CategoryName::new(&form.name)?;
    let icon = CategoryIcon::new(&form.icon)?;

    let provisional = Category {
        id: Category::PROVISIONAL_ID,
        user_id: Some(session.user_id),
        name: name.clone(),
        icon: icon.clone(),
        is_global: false,
    };

    let category = state.category_cache.mutate(
        session.user_id,
        |categories| categories.push(provisional),
        || {
            let connection = lock_connection(&state.db_connection)?;
            create_category(session.user_id, name, icon, &connection)
        },
    )?;
    tracing::info!("User {} created category {}", session.user_id, category.id);

    Ok((
        StatusCode::CREATED,
        [(LOCATION, format_endpoint(endpoints::CATEGORY, category.id))],
        Json(category),
    )
        .into_response())
}

pub async fn update_category_endpoint(
    State(state): State<CategoryState>,
    Extension(session): Extension<Session>,
    Path(category_id): Path<CategoryId>,
    Json(form): Json<CategoryForm>,
) -> Result<Json<Category>, Error> {
    let name = CategoryName::new(&form.name)?;
    let icon = CategoryIcon::new(&form.icon)?;
    let owner = Some(session.user_id);

    let category = state.category_cache.mutate(
        session.user_id,
        |categories| {
            if let Some(category) = categories
                .iter_mut()
                .find(|category| category.id == category_id && category.user_id == owner)
            {
                category.name = name.clone();
                category.icon = icon.clone();
            }
        },
        || {
            let connection = lock_connection(&state.db_connection)?;
            update_category(
                category_id,
                session.user_id,
                name.clone(),
                icon.clone(),
                &connection,
            )
        },
    )?;

    Ok(Json(category))
}

/// Delete a category owned by the logged in user.
///
/// Categories that are still assigned to expenses cannot be deleted.
pub async fn delete_category_endpoint(
    State(state): State<CategoryState>,
    Extension(session): Extension<Session>,
    Path(category_id): Path<CategoryId>,
) -> Result<StatusCode, Error> {
    let owner = Some(session.user_id);

    state.category_cache.mutate(
        session.user_id,
        |categories| {
            categories.retain(|category| !(category.id == category_id && category.user_id == owner))
        },
        || {
            let connection = lock_connection(&state.db_connection)?;
            delete_category(category_id, session.user_id, &connection)
        },
    )?;
    tracing::info!("User {} deleted category {category_id}", session.user_id);

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod category_endpoint_tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::{
        category::Category,
        endpoints::{self, format_endpoint},
        test_utils::get_logged_in_test_server,
    };

    #[tokio::test]
    async fn list_categories_includes_globals() {
        let (server, cookie, _) = get_logged_in_test_server().await;

        let response = server.get(endpoints::CATEGORIES).add_cookie(cookie).await;

        response.assert_status_ok();
        assert_eq!(response.json::<Vec<Category>>().len(), 7);
    }

    #[tokio::test]
    async fn create_update_delete_category() {
        let (server, cookie, _) = get_logged_in_test_server().await;

        let response = server
            .post(endpoints::CATEGORIES)
            .add_cookie(cookie.clone())
            .json(&json!({ "name": "Pets", "icon": "PawPrint" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let category = response.json::<Category>();

        let response = server
            .put(&format_endpoint(endpoints::CATEGORY, category.id))
            .add_cookie(cookie.clone())
            .json(&json!({ "name": "Dogs", "icon": "Dog" }))
            .await;
        response.assert_status_ok();
        assert_eq!(response.json::<Category>().name.as_ref(), "Dogs");

        server
            .delete(&format_endpoint(endpoints::CATEGORY, category.id))
            .add_cookie(cookie.clone())
            .await
            .assert_status(StatusCode::NO_CONTENT);

        let categories = server
            .get(endpoints::CATEGORIES)
            .add_cookie(cookie)
            .await
            .json::<Vec<Category>>();
        assert!(categories.iter().all(|c| c.id != category.id));
    }

    #[tokio::test]
    async fn create_category_rejects_unknown_icon() {
        let (server, cookie, _) = get_logged_in_test_server().await;

        let response = server
            .post(endpoints::CATEGORIES)
            .add_cookie(cookie)
            .json(&json!({ "name": "Space", "icon": "Rocket" }))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        response.assert_json(&json!({ "error": "\"Rocket\" is not a supported icon" }));
    }

    #[tokio::test]
    async fn delete_global_category_is_forbidden() {
        let (server, cookie, _) = get_logged_in_test_server().await;
        let categories = server
            .get(endpoints::CATEGORIES)
            .add_cookie(cookie.clone())
            .await
            .json::<Vec<Category>>();

        server
            .delete(&format_endpoint(endpoints::CATEGORY, categories[0].id))
            .add_cookie(cookie.clone())
            .await
            .assert_status(StatusCode::FORBIDDEN);

        let after = server
            .get(endpoints::CATEGORIES)
            .add_cookie(cookie)
            .await
            .json::<Vec<Category>>();
        assert_eq!(after, categories);
    }
}
