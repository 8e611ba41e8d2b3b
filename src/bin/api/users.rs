use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::{info, instrument};

use crate::{
    error::AppError,
    recipes::read_model::{author_view, AuthorView},
    store::recipe_store::{RecipeStore, StoreProvider},
    viewer::Viewer,
};

use super::{authenticated, AppState};

#[instrument(name = "users.subscribe", skip(state))]
pub async fn subscribe<P: StoreProvider>(
    State(state): State<AppState<P>>,
    viewer: Viewer,
    Path(author_id): Path<i32>,
) -> Result<(StatusCode, Json<AuthorView>), AppError> {
    state
        .run(move |store, _| {
            let user = authenticated(store, viewer)?;
            store.in_transaction(|store| {
                let author = store.user(author_id)?.ok_or(AppError::NotFound)?;
                if author.id == user.id {
                    return Err(AppError::validation("errors", "You cannot follow yourself."));
                }
                let already_following =
                    || AppError::validation("errors", "You are already following this author.");
                if store.is_following(user.id, author.id)? {
                    return Err(already_following());
                }

                store
                    .follow(user.id, author.id)
                    .map_err(|err| AppError::duplicate_as(err, already_following()))?;
                info!("User {} follows {}", user.id, author.id);
                author_view(store, author, viewer)
            })
        })
        .await
        .map(|view| (StatusCode::CREATED, Json(view)))
}

#[instrument(name = "users.unsubscribe", skip(state))]
pub async fn unsubscribe<P: StoreProvider>(
    State(state): State<AppState<P>>,
    viewer: Viewer,
    Path(author_id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state
        .run(move |store, _| {
            let user = authenticated(store, viewer)?;
            store.user(author_id)?.ok_or(AppError::NotFound)?;

            if store.unfollow(user.id, author_id)? == 0 {
                return Err(AppError::validation(
                    "errors",
                    "You are not following this author.",
                ));
            }

            Ok(StatusCode::NO_CONTENT)
        })
        .await
}
