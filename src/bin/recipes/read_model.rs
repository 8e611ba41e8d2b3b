//! Response shapes. Every computed field is read from the store at render
//! time and never cached on the recipe.

use serde::Serialize;

use crate::{
    database::models::{membership::Membership, recipe::Recipe, tag::Tag, user::User},
    error::AppError,
    media::MediaStorage,
    store::recipe_store::RecipeStore,
    viewer::Viewer,
};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct IngredientLineView {
    /// Ingredient id, not the line id
    pub id: i32,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct AuthorView {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub is_subscribed: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RecipeView {
    pub id: i32,
    pub tags: Vec<Tag>,
    pub author: AuthorView,
    pub ingredients: Vec<IngredientLineView>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Recipe as listed in favorites and shopping cart responses.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ShortRecipeView {
    pub id: i32,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

pub fn recipe_view<S: RecipeStore>(
    store: &mut S,
    recipe: &Recipe,
    viewer: Viewer,
    media: &MediaStorage,
) -> Result<RecipeView, AppError> {
    let author = store.user(recipe.author_id)?.ok_or(AppError::NotFound)?;

    Ok(RecipeView {
        id: recipe.id,
        tags: store.recipe_tags(recipe.id)?,
        author: author_view(store, author, viewer)?,
        ingredients: ingredient_lines(store, recipe.id)?,
        is_favorited: is_member(store, Membership::Favorite, viewer, recipe.id)?,
        is_in_shopping_cart: is_member(store, Membership::ShoppingCart, viewer, recipe.id)?,
        name: recipe.name.clone(),
        image: media.url_for(&recipe.image),
        text: recipe.text.clone(),
        cooking_time: recipe.cooking_time,
    })
}

pub fn short_recipe_view(recipe: &Recipe, media: &MediaStorage) -> ShortRecipeView {
    ShortRecipeView {
        id: recipe.id,
        name: recipe.name.clone(),
        image: media.url_for(&recipe.image),
        cooking_time: recipe.cooking_time,
    }
}

pub fn ingredient_lines<S: RecipeStore>(
    store: &mut S,
    recipe_id: i32,
) -> Result<Vec<IngredientLineView>, AppError> {
    Ok(store
        .ingredient_lines_with_ingredients(recipe_id)?
        .into_iter()
        .map(|(line, ingredient)| IngredientLineView {
            id: ingredient.id,
            name: ingredient.name,
            measurement_unit: ingredient.measurement_unit,
            amount: line.amount,
        })
        .collect())
}

pub fn author_view<S: RecipeStore>(
    store: &mut S,
    author: User,
    viewer: Viewer,
) -> Result<AuthorView, AppError> {
    let is_subscribed = match viewer.user_id() {
        Some(user_id) if user_id != author.id => store.is_following(user_id, author.id)?,
        _ => false,
    };

    Ok(AuthorView {
        id: author.id,
        username: author.username,
        email: author.email,
        first_name: author.first_name,
        last_name: author.last_name,
        is_subscribed,
    })
}

/// Always `false` for anonymous viewers.
pub fn is_member<S: RecipeStore>(
    store: &mut S,
    membership: Membership,
    viewer: Viewer,
    recipe_id: i32,
) -> Result<bool, AppError> {
    match viewer.user_id() {
        Some(user_id) => Ok(store.membership_exists(membership, user_id, recipe_id)?),
        None => Ok(false),
    }
}
