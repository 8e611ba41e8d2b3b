use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use chrono::Utc;
use diesel::{
    result::{DatabaseErrorKind, Error},
    QueryResult,
};

use crate::{
    database::models::{
        ingredient::Ingredient,
        ingredient_line::{IngredientLine, NewIngredientLine},
        membership::Membership,
        recipe::{NewRecipe, Recipe, RecipeChanges},
        tag::Tag,
        user::User,
    },
    error::AppError,
};

use super::recipe_store::{RecipeFilter, RecipeStore, StoreProvider};

#[derive(Debug, Default, Clone)]
struct Tables {
    next_id: i32,
    users: BTreeMap<i32, User>,
    ingredients: BTreeMap<i32, Ingredient>,
    tags: BTreeMap<i32, Tag>,
    recipes: BTreeMap<i32, Recipe>,
    ingredient_lines: Vec<IngredientLine>,
    recipe_tags: BTreeSet<(i32, i32)>,
    favorites: BTreeSet<(i32, i32)>,
    shopping_carts: BTreeSet<(i32, i32)>,
    follows: BTreeSet<(i32, i32)>,
    ingredient_line_writes: usize,
}

impl Tables {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn memberships(&mut self, membership: Membership) -> &mut BTreeSet<(i32, i32)> {
        match membership {
            Membership::Favorite => &mut self.favorites,
            Membership::ShoppingCart => &mut self.shopping_carts,
        }
    }
}

fn violation(kind: DatabaseErrorKind, message: &str) -> Error {
    Error::DatabaseError(kind, Box::new(message.to_owned()))
}

/// In-process store with the same constraints as the SQL schema. Clones share
/// their tables. Counts every ingredient line insert and delete.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    /// Kept outside `Tables` so a rollback does not re-arm it.
    fail_line_insert: Arc<AtomicBool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap()
    }

    pub fn add_user(&self, username: &str) -> i32 {
        let mut tables = self.tables();
        let id = tables.next_id();
        tables.users.insert(
            id,
            User {
                id,
                username: username.to_owned(),
                email: format!("{username}@example.com"),
                first_name: username.to_owned(),
                last_name: "Cook".to_owned(),
            },
        );
        id
    }

    pub fn add_ingredient(&self, name: &str, measurement_unit: &str) -> i32 {
        let mut tables = self.tables();
        let id = tables.next_id();
        tables.ingredients.insert(
            id,
            Ingredient {
                id,
                name: name.to_owned(),
                measurement_unit: measurement_unit.to_owned(),
            },
        );
        id
    }

    pub fn add_tag(&self, name: &str, slug: &str) -> i32 {
        let mut tables = self.tables();
        let id = tables.next_id();
        tables.tags.insert(
            id,
            Tag {
                id,
                name: name.to_owned(),
                color: "#E26C2D".to_owned(),
                slug: slug.to_owned(),
                created: Utc::now(),
            },
        );
        id
    }

    /// Makes the next `insert_ingredient_lines` call fail like a lost connection.
    pub fn fail_next_line_insert(&self) {
        self.fail_line_insert.store(true, Ordering::SeqCst);
    }

    /// Inserted plus deleted ingredient lines so far.
    pub fn ingredient_line_writes(&self) -> usize {
        self.tables().ingredient_line_writes
    }
}

impl StoreProvider for MemoryStore {
    type Store = MemoryStore;

    fn store(&self) -> Result<Self::Store, AppError> {
        Ok(self.clone())
    }
}

impl RecipeStore for MemoryStore {
    fn in_transaction<T, F>(&mut self, work: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Self) -> Result<T, AppError>,
    {
        let snapshot = self.tables().clone();

        let result = work(self);
        if result.is_err() {
            *self.tables() = snapshot;
        }

        result
    }

    fn user(&mut self, id: i32) -> QueryResult<Option<User>> {
        Ok(self.tables().users.get(&id).cloned())
    }

    fn ingredients(&mut self, name_prefix: Option<&str>) -> QueryResult<Vec<Ingredient>> {
        let prefix = name_prefix.unwrap_or_default().to_lowercase();
        let mut ingredients: Vec<_> = self
            .tables()
            .ingredients
            .values()
            .filter(|ingredient| ingredient.name.to_lowercase().starts_with(&prefix))
            .cloned()
            .collect();
        ingredients.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(ingredients)
    }

    fn ingredient(&mut self, id: i32) -> QueryResult<Option<Ingredient>> {
        Ok(self.tables().ingredients.get(&id).cloned())
    }

    fn existing_ingredient_ids(&mut self, ids: &[i32]) -> QueryResult<Vec<i32>> {
        let tables = self.tables();
        Ok(ids
            .iter()
            .copied()
            .filter(|id| tables.ingredients.contains_key(id))
            .collect())
    }

    fn tags(&mut self) -> QueryResult<Vec<Tag>> {
        Ok(self.tables().tags.values().cloned().collect())
    }

    fn tag(&mut self, id: i32) -> QueryResult<Option<Tag>> {
        Ok(self.tables().tags.get(&id).cloned())
    }

    fn existing_tag_ids(&mut self, ids: &[i32]) -> QueryResult<Vec<i32>> {
        let tables = self.tables();
        Ok(ids
            .iter()
            .copied()
            .filter(|id| tables.tags.contains_key(id))
            .collect())
    }

    fn recipes(&mut self, filter: &RecipeFilter) -> QueryResult<Vec<Recipe>> {
        let tables = self.tables();
        let mut recipes: Vec<_> = tables
            .recipes
            .values()
            .filter(|recipe| filter.author_id.map_or(true, |id| recipe.author_id == id))
            .filter(|recipe| {
                filter.tag_slugs.is_empty()
                    || tables.recipe_tags.iter().any(|(recipe_id, tag_id)| {
                        *recipe_id == recipe.id
                            && tables
                                .tags
                                .get(tag_id)
                                .is_some_and(|tag| filter.tag_slugs.contains(&tag.slug))
                    })
            })
            .filter(|recipe| {
                filter
                    .favorited_by
                    .map_or(true, |user| tables.favorites.contains(&(user, recipe.id)))
            })
            .filter(|recipe| {
                filter
                    .in_cart_of
                    .map_or(true, |user| tables.shopping_carts.contains(&(user, recipe.id)))
            })
            .cloned()
            .collect();
        recipes.sort_by(|a, b| b.created.cmp(&a.created).then(b.id.cmp(&a.id)));
        Ok(recipes)
    }

    fn recipe(&mut self, id: i32) -> QueryResult<Option<Recipe>> {
        Ok(self.tables().recipes.get(&id).cloned())
    }

    fn insert_recipe(&mut self, recipe: &NewRecipe) -> QueryResult<Recipe> {
        let mut tables = self.tables();
        if !tables.users.contains_key(&recipe.author_id) {
            return Err(violation(
                DatabaseErrorKind::ForeignKeyViolation,
                "recipes_author_id_fkey",
            ));
        }
        if recipe.cooking_time < 1 {
            return Err(violation(
                DatabaseErrorKind::CheckViolation,
                "recipes_cooking_time_check",
            ));
        }

        let id = tables.next_id();
        let recipe = Recipe {
            id,
            author_id: recipe.author_id,
            name: recipe.name.clone(),
            image: recipe.image.clone(),
            text: recipe.text.clone(),
            cooking_time: recipe.cooking_time,
            created: Utc::now(),
        };
        tables.recipes.insert(id, recipe.clone());
        Ok(recipe)
    }

    fn update_recipe(&mut self, id: i32, changes: &RecipeChanges) -> QueryResult<Recipe> {
        let mut tables = self.tables();
        let recipe = tables.recipes.get_mut(&id).ok_or(Error::NotFound)?;
        recipe.name = changes.name.clone();
        recipe.text = changes.text.clone();
        recipe.cooking_time = changes.cooking_time;
        if let Some(image) = &changes.image {
            recipe.image = image.clone();
        }
        Ok(recipe.clone())
    }

    fn delete_recipe(&mut self, id: i32) -> QueryResult<usize> {
        let mut tables = self.tables();
        if tables.recipes.remove(&id).is_none() {
            return Ok(0);
        }
        tables.ingredient_lines.retain(|line| line.recipe_id != id);
        tables.recipe_tags.retain(|(recipe_id, _)| *recipe_id != id);
        tables.favorites.retain(|(_, recipe_id)| *recipe_id != id);
        tables.shopping_carts.retain(|(_, recipe_id)| *recipe_id != id);
        Ok(1)
    }

    fn ingredient_lines(&mut self, recipe_id: i32) -> QueryResult<Vec<IngredientLine>> {
        Ok(self
            .tables()
            .ingredient_lines
            .iter()
            .filter(|line| line.recipe_id == recipe_id)
            .cloned()
            .collect())
    }

    fn ingredient_lines_with_ingredients(
        &mut self,
        recipe_id: i32,
    ) -> QueryResult<Vec<(IngredientLine, Ingredient)>> {
        let tables = self.tables();
        Ok(tables
            .ingredient_lines
            .iter()
            .filter(|line| line.recipe_id == recipe_id)
            .filter_map(|line| {
                let ingredient = tables.ingredients.get(&line.ingredient_id)?;
                Some((line.clone(), ingredient.clone()))
            })
            .collect())
    }

    fn insert_ingredient_lines(&mut self, lines: &[NewIngredientLine]) -> QueryResult<usize> {
        if self.fail_line_insert.swap(false, Ordering::SeqCst) {
            return Err(violation(
                DatabaseErrorKind::ClosedConnection,
                "server closed the connection unexpectedly",
            ));
        }

        let mut tables = self.tables();
        let mut inserted = Vec::with_capacity(lines.len());

        for line in lines {
            if !tables.ingredients.contains_key(&line.ingredient_id)
                || !tables.recipes.contains_key(&line.recipe_id)
            {
                return Err(violation(
                    DatabaseErrorKind::ForeignKeyViolation,
                    "recipe_ingredients_fkey",
                ));
            }
            let duplicate = tables
                .ingredient_lines
                .iter()
                .chain(inserted.iter())
                .any(|existing: &IngredientLine| {
                    existing.recipe_id == line.recipe_id
                        && existing.ingredient_id == line.ingredient_id
                });
            if duplicate {
                return Err(violation(
                    DatabaseErrorKind::UniqueViolation,
                    "recipe_ingredients_recipe_id_ingredient_id_key",
                ));
            }

            let id = tables.next_id();
            inserted.push(IngredientLine {
                id,
                recipe_id: line.recipe_id,
                ingredient_id: line.ingredient_id,
                amount: line.amount,
            });
        }

        let count = inserted.len();
        tables.ingredient_lines.extend(inserted);
        tables.ingredient_line_writes += count;
        Ok(count)
    }

    fn delete_ingredient_lines(&mut self, recipe_id: i32) -> QueryResult<usize> {
        let mut tables = self.tables();
        let before = tables.ingredient_lines.len();
        tables
            .ingredient_lines
            .retain(|line| line.recipe_id != recipe_id);
        let deleted = before - tables.ingredient_lines.len();
        tables.ingredient_line_writes += deleted;
        Ok(deleted)
    }

    fn recipe_tags(&mut self, recipe_id: i32) -> QueryResult<Vec<Tag>> {
        let tables = self.tables();
        Ok(tables
            .recipe_tags
            .iter()
            .filter(|(id, _)| *id == recipe_id)
            .filter_map(|(_, tag_id)| tables.tags.get(tag_id).cloned())
            .collect())
    }

    fn replace_recipe_tags(&mut self, recipe_id: i32, tag_ids: &[i32]) -> QueryResult<()> {
        let mut tables = self.tables();
        if tag_ids.iter().any(|id| !tables.tags.contains_key(id)) {
            return Err(violation(
                DatabaseErrorKind::ForeignKeyViolation,
                "recipe_tags_tag_id_fkey",
            ));
        }
        tables.recipe_tags.retain(|(id, _)| *id != recipe_id);
        tables
            .recipe_tags
            .extend(tag_ids.iter().map(|tag_id| (recipe_id, *tag_id)));
        Ok(())
    }

    fn membership_exists(
        &mut self,
        membership: Membership,
        user_id: i32,
        recipe_id: i32,
    ) -> QueryResult<bool> {
        Ok(self
            .tables()
            .memberships(membership)
            .contains(&(user_id, recipe_id)))
    }

    fn add_membership(
        &mut self,
        membership: Membership,
        user_id: i32,
        recipe_id: i32,
    ) -> QueryResult<()> {
        let mut tables = self.tables();
        if !tables.recipes.contains_key(&recipe_id) || !tables.users.contains_key(&user_id) {
            return Err(violation(
                DatabaseErrorKind::ForeignKeyViolation,
                "membership_fkey",
            ));
        }
        if !tables.memberships(membership).insert((user_id, recipe_id)) {
            return Err(violation(
                DatabaseErrorKind::UniqueViolation,
                "membership_user_id_recipe_id_key",
            ));
        }
        Ok(())
    }

    fn remove_membership(
        &mut self,
        membership: Membership,
        user_id: i32,
        recipe_id: i32,
    ) -> QueryResult<usize> {
        let removed = self
            .tables()
            .memberships(membership)
            .remove(&(user_id, recipe_id));
        Ok(usize::from(removed))
    }

    fn is_following(&mut self, user_id: i32, author_id: i32) -> QueryResult<bool> {
        Ok(self.tables().follows.contains(&(user_id, author_id)))
    }

    fn follow(&mut self, user_id: i32, author_id: i32) -> QueryResult<()> {
        let mut tables = self.tables();
        if user_id == author_id {
            return Err(violation(
                DatabaseErrorKind::CheckViolation,
                "follows_check",
            ));
        }
        if !tables.follows.insert((user_id, author_id)) {
            return Err(violation(
                DatabaseErrorKind::UniqueViolation,
                "follows_user_id_author_id_key",
            ));
        }
        Ok(())
    }

    fn unfollow(&mut self, user_id: i32, author_id: i32) -> QueryResult<usize> {
        Ok(usize::from(self.tables().follows.remove(&(user_id, author_id))))
    }

    fn shopping_cart_lines(&mut self, user_id: i32) -> QueryResult<Vec<(Ingredient, i32)>> {
        let tables = self.tables();
        Ok(tables
            .ingredient_lines
            .iter()
            .filter(|line| tables.shopping_carts.contains(&(user_id, line.recipe_id)))
            .filter_map(|line| {
                let ingredient = tables.ingredients.get(&line.ingredient_id)?;
                Some((ingredient.clone(), line.amount))
            })
            .collect())
    }
}
