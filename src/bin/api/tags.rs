use axum::{
    extract::{Path, State},
    Json,
};
use tracing::instrument;

use crate::{
    database::models::tag::Tag,
    error::AppError,
    store::recipe_store::{RecipeStore, StoreProvider},
    viewer::Viewer,
};

use super::AppState;

#[instrument(name = "tags.list", skip(state))]
pub async fn list_tags<P: StoreProvider>(
    State(state): State<AppState<P>>,
    _viewer: Viewer,
) -> Result<Json<Vec<Tag>>, AppError> {
    state
        .run(|store, _| Ok(store.tags()?))
        .await
        .map(Json)
}

#[instrument(name = "tags.get", skip(state))]
pub async fn get_tag<P: StoreProvider>(
    State(state): State<AppState<P>>,
    _viewer: Viewer,
    Path(id): Path<i32>,
) -> Result<Json<Tag>, AppError> {
    state
        .run(move |store, _| store.tag(id)?.ok_or(AppError::NotFound))
        .await
        .map(Json)
}
