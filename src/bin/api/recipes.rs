use axum::{
    extract::{Path, Query, State},
    http::{
        header::{CONTENT_DISPOSITION, CONTENT_TYPE},
        StatusCode,
    },
    response::IntoResponse,
    Json,
};
use tracing::instrument;

use crate::{
    database::models::membership::Membership,
    error::AppError,
    recipes::{
        editor,
        read_model::{recipe_view, short_recipe_view, RecipeView, ShortRecipeView},
        shopping_list::{render, shopping_list},
    },
    store::recipe_store::{RecipeFilter, RecipeStore, StoreProvider},
    viewer::Viewer,
};

use super::{authenticated, payload::RecipeForm, AppState};

fn flag(value: &str) -> bool {
    matches!(value, "1" | "true" | "True")
}

/// Builds the listing filter from query pairs. `tags` may repeat. Membership
/// flags only apply to an authenticated viewer.
pub fn recipe_filter(query: &[(String, String)], viewer: Viewer) -> Result<RecipeFilter, AppError> {
    let mut filter = RecipeFilter::default();

    for (key, value) in query {
        match key.as_str() {
            "author" => {
                let author = value
                    .parse()
                    .map_err(|_| AppError::validation("author", "A valid integer is required."))?;
                filter.author_id = Some(author);
            }
            "tags" => filter.tag_slugs.push(value.clone()),
            "is_favorited" if flag(value) => filter.favorited_by = viewer.user_id(),
            "is_in_shopping_cart" if flag(value) => filter.in_cart_of = viewer.user_id(),
            _ => {}
        }
    }

    Ok(filter)
}

#[instrument(name = "recipes.list", skip(state, query))]
pub async fn list_recipes<P: StoreProvider>(
    State(state): State<AppState<P>>,
    viewer: Viewer,
    Query(query): Query<Vec<(String, String)>>,
) -> Result<Json<Vec<RecipeView>>, AppError> {
    let filter = recipe_filter(&query, viewer)?;

    state
        .run(move |store, media| {
            let recipes = store.recipes(&filter)?;
            recipes
                .iter()
                .map(|recipe| recipe_view(store, recipe, viewer, media))
                .collect()
        })
        .await
        .map(Json)
}

#[instrument(name = "recipes.get", skip(state))]
pub async fn get_recipe<P: StoreProvider>(
    State(state): State<AppState<P>>,
    viewer: Viewer,
    Path(id): Path<i32>,
) -> Result<Json<RecipeView>, AppError> {
    state
        .run(move |store, media| {
            let recipe = store.recipe(id)?.ok_or(AppError::NotFound)?;
            recipe_view(store, &recipe, viewer, media)
        })
        .await
        .map(Json)
}

#[instrument(name = "recipes.create", skip(state, form))]
pub async fn create_recipe<P: StoreProvider>(
    State(state): State<AppState<P>>,
    viewer: Viewer,
    form: RecipeForm,
) -> Result<(StatusCode, Json<RecipeView>), AppError> {
    viewer.require_user()?;
    let draft = form.into_draft()?;

    state
        .run(move |store, media| {
            let author = authenticated(store, viewer)?;
            editor::create_recipe(store, media, author.id, draft)
        })
        .await
        .map(|view| (StatusCode::CREATED, Json(view)))
}

#[instrument(name = "recipes.update", skip(state, form))]
pub async fn update_recipe<P: StoreProvider>(
    State(state): State<AppState<P>>,
    viewer: Viewer,
    Path(id): Path<i32>,
    form: RecipeForm,
) -> Result<Json<RecipeView>, AppError> {
    viewer.require_user()?;
    let draft = form.into_draft()?;

    state
        .run(move |store, media| {
            let user = authenticated(store, viewer)?;
            editor::update_recipe(store, media, user.id, id, draft)
        })
        .await
        .map(Json)
}

#[instrument(name = "recipes.delete", skip(state))]
pub async fn delete_recipe<P: StoreProvider>(
    State(state): State<AppState<P>>,
    viewer: Viewer,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    state
        .run(move |store, _| {
            let user = authenticated(store, viewer)?;
            editor::delete_recipe(store, user.id, id)
        })
        .await
        .map(|()| StatusCode::NO_CONTENT)
}

async fn add_membership<P: StoreProvider>(
    state: AppState<P>,
    viewer: Viewer,
    recipe_id: i32,
    membership: Membership,
) -> Result<(StatusCode, Json<ShortRecipeView>), AppError> {
    state
        .run(move |store, media| {
            let user = authenticated(store, viewer)?;
            let already_added = || {
                AppError::validation(
                    "errors",
                    format!("Recipe is already in {}.", membership.label()),
                )
            };

            store.in_transaction(|store| {
                let recipe = store.recipe(recipe_id)?.ok_or(AppError::NotFound)?;
                if store.membership_exists(membership, user.id, recipe.id)? {
                    return Err(already_added());
                }

                store
                    .add_membership(membership, user.id, recipe.id)
                    .map_err(|err| AppError::duplicate_as(err, already_added()))?;
                Ok(short_recipe_view(&recipe, media))
            })
        })
        .await
        .map(|view| (StatusCode::CREATED, Json(view)))
}

async fn remove_membership<P: StoreProvider>(
    state: AppState<P>,
    viewer: Viewer,
    recipe_id: i32,
    membership: Membership,
) -> Result<StatusCode, AppError> {
    state
        .run(move |store, _| {
            let user = authenticated(store, viewer)?;
            store.recipe(recipe_id)?.ok_or(AppError::NotFound)?;

            if store.remove_membership(membership, user.id, recipe_id)? == 0 {
                return Err(AppError::validation(
                    "errors",
                    format!("Recipe is not in {}.", membership.label()),
                ));
            }

            Ok(StatusCode::NO_CONTENT)
        })
        .await
}

#[instrument(name = "recipes.favorite.add", skip(state))]
pub async fn add_favorite<P: StoreProvider>(
    State(state): State<AppState<P>>,
    viewer: Viewer,
    Path(id): Path<i32>,
) -> Result<(StatusCode, Json<ShortRecipeView>), AppError> {
    add_membership(state, viewer, id, Membership::Favorite).await
}

#[instrument(name = "recipes.favorite.remove", skip(state))]
pub async fn remove_favorite<P: StoreProvider>(
    State(state): State<AppState<P>>,
    viewer: Viewer,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    remove_membership(state, viewer, id, Membership::Favorite).await
}

#[instrument(name = "recipes.shopping_cart.add", skip(state))]
pub async fn add_to_shopping_cart<P: StoreProvider>(
    State(state): State<AppState<P>>,
    viewer: Viewer,
    Path(id): Path<i32>,
) -> Result<(StatusCode, Json<ShortRecipeView>), AppError> {
    add_membership(state, viewer, id, Membership::ShoppingCart).await
}

#[instrument(name = "recipes.shopping_cart.remove", skip(state))]
pub async fn remove_from_shopping_cart<P: StoreProvider>(
    State(state): State<AppState<P>>,
    viewer: Viewer,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    remove_membership(state, viewer, id, Membership::ShoppingCart).await
}

#[instrument(name = "recipes.shopping_cart.download", skip(state))]
pub async fn download_shopping_cart<P: StoreProvider>(
    State(state): State<AppState<P>>,
    viewer: Viewer,
) -> Result<impl IntoResponse, AppError> {
    let text = state
        .run(move |store, _| {
            let user = authenticated(store, viewer)?;
            Ok(render(&shopping_list(store, user.id)?))
        })
        .await?;

    Ok((
        [
            (CONTENT_TYPE, "text/plain; charset=utf-8"),
            (CONTENT_DISPOSITION, "attachment; filename=\"shopping_list.txt\""),
        ],
        text,
    ))
}
