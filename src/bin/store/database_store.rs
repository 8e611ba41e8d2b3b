use diesel::{
    dsl::exists,
    pg::PgConnection,
    prelude::*,
    r2d2::{ConnectionManager, PooledConnection},
};
use tracing::trace;

use crate::{
    database::{
        connection::PgPool,
        models::{
            follow::NewFollow,
            ingredient::Ingredient,
            ingredient_line::{IngredientLine, NewIngredientLine},
            membership::{Membership, NewFavorite, NewShoppingCartItem},
            recipe::{NewRecipe, Recipe, RecipeChanges},
            recipe_tag::RecipeTag,
            tag::Tag,
            user::User,
        },
        schema::{
            favorites, follows, ingredients, recipe_ingredients, recipe_tags, recipes,
            shopping_carts, tags, users,
        },
    },
    error::AppError,
};

use super::recipe_store::{RecipeFilter, RecipeStore, StoreProvider};

/// PostgreSQL store: one pooled connection is one unit of work.
pub type DatabaseStore = PooledConnection<ConnectionManager<PgConnection>>;

impl StoreProvider for PgPool {
    type Store = DatabaseStore;

    fn store(&self) -> Result<Self::Store, AppError> {
        Ok(self.get()?)
    }
}

fn pg(store: &mut DatabaseStore) -> &mut PgConnection {
    store
}

/// `LIKE` pattern matching names that start with `prefix`.
fn starts_with_pattern(prefix: &str) -> String {
    let escaped = prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");

    format!("{escaped}%")
}

impl RecipeStore for DatabaseStore {
    fn in_transaction<T, F>(&mut self, work: F) -> Result<T, AppError>
    where
        F: FnOnce(&mut Self) -> Result<T, AppError>,
    {
        let result = self.transaction(work);
        trace!("Transaction {}", if result.is_ok() { "committed" } else { "rolled back" });
        result
    }

    fn user(&mut self, id: i32) -> QueryResult<Option<User>> {
        users::table
            .find(id)
            .select(User::as_select())
            .first(pg(self))
            .optional()
    }

    fn ingredients(&mut self, name_prefix: Option<&str>) -> QueryResult<Vec<Ingredient>> {
        let mut query = ingredients::table
            .select(Ingredient::as_select())
            .order((ingredients::name, ingredients::id))
            .into_boxed();

        if let Some(prefix) = name_prefix.filter(|prefix| !prefix.is_empty()) {
            query = query.filter(ingredients::name.ilike(starts_with_pattern(prefix)));
        }

        query.load(pg(self))
    }

    fn ingredient(&mut self, id: i32) -> QueryResult<Option<Ingredient>> {
        ingredients::table
            .find(id)
            .select(Ingredient::as_select())
            .first(pg(self))
            .optional()
    }

    fn existing_ingredient_ids(&mut self, ids: &[i32]) -> QueryResult<Vec<i32>> {
        ingredients::table
            .filter(ingredients::id.eq_any(ids))
            .select(ingredients::id)
            .load(pg(self))
    }

    fn tags(&mut self) -> QueryResult<Vec<Tag>> {
        tags::table
            .select(Tag::as_select())
            .order(tags::id)
            .load(pg(self))
    }

    fn tag(&mut self, id: i32) -> QueryResult<Option<Tag>> {
        tags::table
            .find(id)
            .select(Tag::as_select())
            .first(pg(self))
            .optional()
    }

    fn existing_tag_ids(&mut self, ids: &[i32]) -> QueryResult<Vec<i32>> {
        tags::table
            .filter(tags::id.eq_any(ids))
            .select(tags::id)
            .load(pg(self))
    }

    fn recipes(&mut self, filter: &RecipeFilter) -> QueryResult<Vec<Recipe>> {
        let mut query = recipes::table
            .select(Recipe::as_select())
            .order((recipes::created.desc(), recipes::id.desc()))
            .into_boxed();

        if let Some(author_id) = filter.author_id {
            query = query.filter(recipes::author_id.eq(author_id));
        }

        if !filter.tag_slugs.is_empty() {
            let tagged = recipe_tags::table
                .inner_join(tags::table)
                .filter(tags::slug.eq_any(filter.tag_slugs.iter().map(String::as_str)))
                .select(recipe_tags::recipe_id);
            query = query.filter(recipes::id.eq_any(tagged));
        }

        if let Some(user_id) = filter.favorited_by {
            let favorited = favorites::table
                .filter(favorites::user_id.eq(user_id))
                .select(favorites::recipe_id);
            query = query.filter(recipes::id.eq_any(favorited));
        }

        if let Some(user_id) = filter.in_cart_of {
            let in_cart = shopping_carts::table
                .filter(shopping_carts::user_id.eq(user_id))
                .select(shopping_carts::recipe_id);
            query = query.filter(recipes::id.eq_any(in_cart));
        }

        query.load(pg(self))
    }

    fn recipe(&mut self, id: i32) -> QueryResult<Option<Recipe>> {
        recipes::table
            .find(id)
            .select(Recipe::as_select())
            .first(pg(self))
            .optional()
    }

    fn insert_recipe(&mut self, recipe: &NewRecipe) -> QueryResult<Recipe> {
        diesel::insert_into(recipes::table)
            .values(recipe)
            .returning(Recipe::as_returning())
            .get_result(pg(self))
    }

    fn update_recipe(&mut self, id: i32, changes: &RecipeChanges) -> QueryResult<Recipe> {
        diesel::update(recipes::table.find(id))
            .set(changes)
            .returning(Recipe::as_returning())
            .get_result(pg(self))
    }

    fn delete_recipe(&mut self, id: i32) -> QueryResult<usize> {
        // lines, tag links, favorites and cart rows cascade in the schema
        diesel::delete(recipes::table.find(id)).execute(pg(self))
    }

    fn ingredient_lines(&mut self, recipe_id: i32) -> QueryResult<Vec<IngredientLine>> {
        recipe_ingredients::table
            .filter(recipe_ingredients::recipe_id.eq(recipe_id))
            .select(IngredientLine::as_select())
            .order(recipe_ingredients::id)
            .load(pg(self))
    }

    fn ingredient_lines_with_ingredients(
        &mut self,
        recipe_id: i32,
    ) -> QueryResult<Vec<(IngredientLine, Ingredient)>> {
        recipe_ingredients::table
            .inner_join(ingredients::table)
            .filter(recipe_ingredients::recipe_id.eq(recipe_id))
            .select((IngredientLine::as_select(), Ingredient::as_select()))
            .order(recipe_ingredients::id)
            .load(pg(self))
    }

    fn insert_ingredient_lines(&mut self, lines: &[NewIngredientLine]) -> QueryResult<usize> {
        diesel::insert_into(recipe_ingredients::table)
            .values(lines)
            .execute(pg(self))
    }

    fn delete_ingredient_lines(&mut self, recipe_id: i32) -> QueryResult<usize> {
        diesel::delete(recipe_ingredients::table.filter(recipe_ingredients::recipe_id.eq(recipe_id)))
            .execute(pg(self))
    }

    fn recipe_tags(&mut self, recipe_id: i32) -> QueryResult<Vec<Tag>> {
        recipe_tags::table
            .inner_join(tags::table)
            .filter(recipe_tags::recipe_id.eq(recipe_id))
            .select(Tag::as_select())
            .order(tags::id)
            .load(pg(self))
    }

    fn replace_recipe_tags(&mut self, recipe_id: i32, tag_ids: &[i32]) -> QueryResult<()> {
        diesel::delete(recipe_tags::table.filter(recipe_tags::recipe_id.eq(recipe_id)))
            .execute(pg(self))?;

        let links: Vec<_> = tag_ids
            .iter()
            .map(|tag_id| RecipeTag::new(recipe_id, *tag_id))
            .collect();

        diesel::insert_into(recipe_tags::table)
            .values(&links)
            .execute(pg(self))?;

        Ok(())
    }

    fn membership_exists(
        &mut self,
        membership: Membership,
        user_id: i32,
        recipe_id: i32,
    ) -> QueryResult<bool> {
        match membership {
            Membership::Favorite => diesel::select(exists(
                favorites::table
                    .filter(favorites::user_id.eq(user_id))
                    .filter(favorites::recipe_id.eq(recipe_id)),
            ))
            .get_result(pg(self)),
            Membership::ShoppingCart => diesel::select(exists(
                shopping_carts::table
                    .filter(shopping_carts::user_id.eq(user_id))
                    .filter(shopping_carts::recipe_id.eq(recipe_id)),
            ))
            .get_result(pg(self)),
        }
    }

    fn add_membership(
        &mut self,
        membership: Membership,
        user_id: i32,
        recipe_id: i32,
    ) -> QueryResult<()> {
        match membership {
            Membership::Favorite => diesel::insert_into(favorites::table)
                .values(NewFavorite::new(user_id, recipe_id))
                .execute(pg(self))?,
            Membership::ShoppingCart => diesel::insert_into(shopping_carts::table)
                .values(NewShoppingCartItem::new(user_id, recipe_id))
                .execute(pg(self))?,
        };

        Ok(())
    }

    fn remove_membership(
        &mut self,
        membership: Membership,
        user_id: i32,
        recipe_id: i32,
    ) -> QueryResult<usize> {
        match membership {
            Membership::Favorite => diesel::delete(
                favorites::table
                    .filter(favorites::user_id.eq(user_id))
                    .filter(favorites::recipe_id.eq(recipe_id)),
            )
            .execute(pg(self)),
            Membership::ShoppingCart => diesel::delete(
                shopping_carts::table
                    .filter(shopping_carts::user_id.eq(user_id))
                    .filter(shopping_carts::recipe_id.eq(recipe_id)),
            )
            .execute(pg(self)),
        }
    }

    fn is_following(&mut self, user_id: i32, author_id: i32) -> QueryResult<bool> {
        diesel::select(exists(
            follows::table
                .filter(follows::user_id.eq(user_id))
                .filter(follows::author_id.eq(author_id)),
        ))
        .get_result(pg(self))
    }

    fn follow(&mut self, user_id: i32, author_id: i32) -> QueryResult<()> {
        diesel::insert_into(follows::table)
            .values(NewFollow::new(user_id, author_id))
            .execute(pg(self))?;

        Ok(())
    }

    fn unfollow(&mut self, user_id: i32, author_id: i32) -> QueryResult<usize> {
        diesel::delete(
            follows::table
                .filter(follows::user_id.eq(user_id))
                .filter(follows::author_id.eq(author_id)),
        )
        .execute(pg(self))
    }

    fn shopping_cart_lines(&mut self, user_id: i32) -> QueryResult<Vec<(Ingredient, i32)>> {
        let in_cart = shopping_carts::table
            .filter(shopping_carts::user_id.eq(user_id))
            .select(shopping_carts::recipe_id);

        recipe_ingredients::table
            .inner_join(ingredients::table)
            .filter(recipe_ingredients::recipe_id.eq_any(in_cart))
            .select((Ingredient::as_select(), recipe_ingredients::amount))
            .load(pg(self))
    }
}
