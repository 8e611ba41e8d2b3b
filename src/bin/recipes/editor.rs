use std::collections::HashSet;

use diesel::QueryResult;
use itertools::Itertools;
use serde::Deserialize;
use tracing::{debug, info, trace_span};

use crate::{
    database::models::{
        ingredient_line::{IngredientLine, NewIngredientLine},
        recipe::{NewRecipe, RecipeChanges},
    },
    error::AppError,
    media::{DecodedImage, MediaStorage},
    store::recipe_store::RecipeStore,
    viewer::Viewer,
};

use super::read_model::{recipe_view, RecipeView};

const NAME_MAX_LENGTH: usize = 200;

/// One `{id, amount}` entry of a write payload.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngredientRequest {
    pub id: i32,
    pub amount: i32,
}

/// Everything a create or an edit supplies.
#[derive(Debug, Clone)]
pub struct RecipeDraft {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    /// Required on create. On edit `None` keeps the stored image.
    pub image: Option<DecodedImage>,
    pub ingredients: Vec<IngredientRequest>,
    pub tags: Vec<i32>,
}

pub fn create_recipe<S: RecipeStore>(
    store: &mut S,
    media: &MediaStorage,
    author_id: i32,
    draft: RecipeDraft,
) -> Result<RecipeView, AppError> {
    let span = trace_span!("create_recipe", author_id);
    let _guard = span.enter();

    let mut saved: Option<String> = None;
    let result = store.in_transaction(|store| {
        validate_draft(store, &draft)?;
        let image = draft
            .image
            .as_ref()
            .ok_or_else(|| AppError::validation("image", "No file was submitted."))?;
        let image = saved.insert(media.save(image)?).clone();

        let recipe = store.insert_recipe(&NewRecipe::new(
            author_id,
            draft.name.trim().to_owned(),
            image,
            draft.text.clone(),
            draft.cooking_time,
        ))?;
        store.insert_ingredient_lines(&new_lines(recipe.id, &draft.ingredients))?;
        store.replace_recipe_tags(recipe.id, &draft.tags)?;

        Ok(recipe)
    });
    let recipe = discard_if_failed(media, saved, result)?;

    info!("Created recipe {}", recipe.id);
    recipe_view(store, &recipe, Viewer::User(author_id), media)
}

pub fn update_recipe<S: RecipeStore>(
    store: &mut S,
    media: &MediaStorage,
    editor_id: i32,
    recipe_id: i32,
    draft: RecipeDraft,
) -> Result<RecipeView, AppError> {
    let span = trace_span!("update_recipe", editor_id, recipe_id);
    let _guard = span.enter();

    let mut saved: Option<String> = None;
    let mut replaced: Option<String> = None;
    let result = store.in_transaction(|store| {
        let recipe = store.recipe(recipe_id)?.ok_or(AppError::NotFound)?;
        if recipe.author_id != editor_id {
            return Err(AppError::Forbidden);
        }

        validate_draft(store, &draft)?;
        let image = match &draft.image {
            Some(image) => {
                replaced = Some(recipe.image.clone());
                Some(saved.insert(media.save(image)?).clone())
            }
            None => None,
        };

        let recipe = store.update_recipe(
            recipe.id,
            &RecipeChanges::new(
                draft.name.trim().to_owned(),
                draft.text.clone(),
                draft.cooking_time,
                image,
            ),
        )?;
        reconcile_ingredients(store, recipe.id, &draft.ingredients)?;
        store.replace_recipe_tags(recipe.id, &draft.tags)?;

        Ok(recipe)
    });
    let recipe = discard_if_failed(media, saved, result)?;

    if let Some(previous) = replaced.filter(|previous| *previous != recipe.image) {
        media.discard(&previous);
    }

    info!("Updated recipe {}", recipe.id);
    recipe_view(store, &recipe, Viewer::User(editor_id), media)
}

pub fn delete_recipe<S: RecipeStore>(
    store: &mut S,
    editor_id: i32,
    recipe_id: i32,
) -> Result<(), AppError> {
    store.in_transaction(|store| {
        let recipe = store.recipe(recipe_id)?.ok_or(AppError::NotFound)?;
        if recipe.author_id != editor_id {
            return Err(AppError::Forbidden);
        }

        store.delete_recipe(recipe.id)?;
        info!("Deleted recipe {}", recipe.id);
        Ok(())
    })
}

/// True when the stored lines and the request differ in ingredients or amounts.
/// Both sides are compared sorted by ingredient id, so order does not matter.
pub fn ingredients_changed(current: &[IngredientLine], requested: &[IngredientRequest]) -> bool {
    let current = current
        .iter()
        .map(|line| (line.ingredient_id, line.amount))
        .sorted_by_key(|(ingredient_id, _)| *ingredient_id);
    let requested = requested
        .iter()
        .map(|request| (request.id, request.amount))
        .sorted_by_key(|(ingredient_id, _)| *ingredient_id);

    !current.eq(requested)
}

/// Replaces every line of the recipe when the requested set differs from the
/// stored one, and writes nothing otherwise. Returns whether lines were rewritten.
pub fn reconcile_ingredients<S: RecipeStore>(
    store: &mut S,
    recipe_id: i32,
    requested: &[IngredientRequest],
) -> QueryResult<bool> {
    let current = store.ingredient_lines(recipe_id)?;

    if !ingredients_changed(&current, requested) {
        debug!("Ingredients of recipe {recipe_id} unchanged");
        return Ok(false);
    }

    let deleted = store.delete_ingredient_lines(recipe_id)?;
    let inserted = store.insert_ingredient_lines(&new_lines(recipe_id, requested))?;
    debug!("Rewrote ingredients of recipe {recipe_id}: {deleted} deleted, {inserted} inserted");

    Ok(true)
}

/// Removes the image a failed unit of work stored, since no row points at it.
fn discard_if_failed<T>(
    media: &MediaStorage,
    saved: Option<String>,
    result: Result<T, AppError>,
) -> Result<T, AppError> {
    if let (Err(_), Some(path)) = (&result, saved) {
        media.discard(&path);
    }

    result
}

fn new_lines(recipe_id: i32, requested: &[IngredientRequest]) -> Vec<NewIngredientLine> {
    requested
        .iter()
        .map(|request| NewIngredientLine::new(recipe_id, request.id, request.amount))
        .collect()
}

fn validate_draft<S: RecipeStore>(store: &mut S, draft: &RecipeDraft) -> Result<(), AppError> {
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(AppError::validation("name", "This field may not be blank."));
    }
    if name.chars().count() > NAME_MAX_LENGTH {
        return Err(AppError::validation(
            "name",
            format!("Ensure this field has no more than {NAME_MAX_LENGTH} characters."),
        ));
    }
    if draft.text.trim().is_empty() {
        return Err(AppError::validation("text", "This field may not be blank."));
    }
    if draft.cooking_time < 1 {
        return Err(AppError::validation(
            "cooking_time",
            "Ensure this value is greater than or equal to 1.",
        ));
    }

    validate_ingredients(store, &draft.ingredients)?;
    validate_tags(store, &draft.tags)
}

fn validate_ingredients<S: RecipeStore>(
    store: &mut S,
    ingredients: &[IngredientRequest],
) -> Result<(), AppError> {
    if ingredients.is_empty() {
        return Err(AppError::validation("ingredients", "This list may not be empty."));
    }

    if let Some(request) = ingredients.iter().find(|request| request.amount < 1) {
        return Err(AppError::validation(
            "ingredients",
            format!("Amount of ingredient {} must be at least 1.", request.id),
        ));
    }

    // the one-line-per-ingredient invariant would otherwise fail in the store
    if let Some(id) = ingredients.iter().map(|request| request.id).duplicates().next() {
        return Err(AppError::validation(
            "ingredients",
            format!("Ingredient {id} is listed more than once."),
        ));
    }

    let ids: Vec<_> = ingredients.iter().map(|request| request.id).collect();
    let existing: HashSet<_> = store.existing_ingredient_ids(&ids)?.into_iter().collect();
    if let Some(id) = ids.iter().find(|id| !existing.contains(*id)) {
        return Err(AppError::validation(
            "ingredients",
            format!("Ingredient {id} does not exist."),
        ));
    }

    Ok(())
}

fn validate_tags<S: RecipeStore>(store: &mut S, tags: &[i32]) -> Result<(), AppError> {
    if tags.is_empty() {
        return Err(AppError::validation("tags", "This list may not be empty."));
    }

    if let Some(id) = tags.iter().duplicates().next() {
        return Err(AppError::validation(
            "tags",
            format!("Tag {id} is listed more than once."),
        ));
    }

    let existing: HashSet<_> = store.existing_tag_ids(tags)?.into_iter().collect();
    if let Some(id) = tags.iter().find(|id| !existing.contains(*id)) {
        return Err(AppError::validation(
            "tags",
            format!("Invalid pk \"{id}\" - object does not exist."),
        ));
    }

    Ok(())
}
