use diesel::QueryResult;

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

/// Which recipes a listing returns. Empty fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub author_id: Option<i32>,
    pub tag_slugs: Vec<String>,
    pub favorited_by: Option<i32>,
    pub in_cart_of: Option<i32>,
}

/// Persistence operations the recipe service needs. One value is one unit of
/// work (one pooled connection for the database implementation).
pub trait RecipeStore {
    /// Runs `work` atomically. Every write it made is rolled back when it
    /// returns an error.
    fn in_transaction<T, F>(&mut self, work: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Self) -> Result<T, AppError>;

    fn user(&mut self, id: i32) -> QueryResult<Option<User>>;

    /// Ordered by name. `name_prefix` matches case-insensitively.
    fn ingredients(&mut self, name_prefix: Option<&str>) -> QueryResult<Vec<Ingredient>>;
    fn ingredient(&mut self, id: i32) -> QueryResult<Option<Ingredient>>;
    fn existing_ingredient_ids(&mut self, ids: &[i32]) -> QueryResult<Vec<i32>>;

    fn tags(&mut self) -> QueryResult<Vec<Tag>>;
    fn tag(&mut self, id: i32) -> QueryResult<Option<Tag>>;
    fn existing_tag_ids(&mut self, ids: &[i32]) -> QueryResult<Vec<i32>>;

    /// Newest first.
    fn recipes(&mut self, filter: &RecipeFilter) -> QueryResult<Vec<Recipe>>;
    fn recipe(&mut self, id: i32) -> QueryResult<Option<Recipe>>;
    fn insert_recipe(&mut self, recipe: &NewRecipe) -> QueryResult<Recipe>;
    fn update_recipe(&mut self, id: i32, changes: &RecipeChanges) -> QueryResult<Recipe>;
    /// Ingredient lines, tag links and memberships go with the recipe.
    fn delete_recipe(&mut self, id: i32) -> QueryResult<usize>;

    fn ingredient_lines(&mut self, recipe_id: i32) -> QueryResult<Vec<IngredientLine>>;
    fn ingredient_lines_with_ingredients(
        &mut self,
        recipe_id: i32,
    ) -> QueryResult<Vec<(IngredientLine, Ingredient)>>;
    fn insert_ingredient_lines(&mut self, lines: &[NewIngredientLine]) -> QueryResult<usize>;
    fn delete_ingredient_lines(&mut self, recipe_id: i32) -> QueryResult<usize>;

    fn recipe_tags(&mut self, recipe_id: i32) -> QueryResult<Vec<Tag>>;
    fn replace_recipe_tags(&mut self, recipe_id: i32, tag_ids: &[i32]) -> QueryResult<()>;

    fn membership_exists(
        &mut self,
        membership: Membership,
        user_id: i32,
        recipe_id: i32,
    ) -> QueryResult<bool>;
    fn add_membership(
        &mut self,
        membership: Membership,
        user_id: i32,
        recipe_id: i32,
    ) -> QueryResult<()>;
    fn remove_membership(
        &mut self,
        membership: Membership,
        user_id: i32,
        recipe_id: i32,
    ) -> QueryResult<usize>;

    fn is_following(&mut self, user_id: i32, author_id: i32) -> QueryResult<bool>;
    fn follow(&mut self, user_id: i32, author_id: i32) -> QueryResult<()>;
    fn unfollow(&mut self, user_id: i32, author_id: i32) -> QueryResult<usize>;

    /// Every ingredient line of every recipe in the user's shopping cart.
    fn shopping_cart_lines(&mut self, user_id: i32) -> QueryResult<Vec<(Ingredient, i32)>>;
}

/// Hands out a store per request.
pub trait StoreProvider: Clone + Send + Sync + 'static {
    type Store: RecipeStore + Send + 'static;

    fn store(&self) -> Result<Self::Store, AppError>;
}
