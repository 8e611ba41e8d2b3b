use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use tracing::instrument;

use crate::{
    database::models::ingredient::Ingredient,
    error::AppError,
    store::recipe_store::{RecipeStore, StoreProvider},
    viewer::Viewer,
};

use super::AppState;

#[derive(Deserialize, Debug, Default)]
pub struct IngredientQuery {
    /// Case-insensitive name prefix
    pub name: Option<String>,
}

#[instrument(name = "ingredients.list", skip(state))]
pub async fn list_ingredients<P: StoreProvider>(
    State(state): State<AppState<P>>,
    _viewer: Viewer,
    Query(query): Query<IngredientQuery>,
) -> Result<Json<Vec<Ingredient>>, AppError> {
    state
        .run(move |store, _| Ok(store.ingredients(query.name.as_deref())?))
        .await
        .map(Json)
}

#[instrument(name = "ingredients.get", skip(state))]
pub async fn get_ingredient<P: StoreProvider>(
    State(state): State<AppState<P>>,
    _viewer: Viewer,
    Path(id): Path<i32>,
) -> Result<Json<Ingredient>, AppError> {
    state
        .run(move |store, _| store.ingredient(id)?.ok_or(AppError::NotFound))
        .await
        .map(Json)
}
