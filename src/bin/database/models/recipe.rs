use chrono::{DateTime, Utc};
use diesel::prelude::*;
use lombok::AllArgsConstructor;

use super::user::User;

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq, Eq)]
#[diesel(belongs_to(User, foreign_key = author_id))]
#[diesel(table_name = crate::database::schema::recipes)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Recipe {
    pub id: i32,
    pub author_id: i32,
    pub name: String,
    // Path relative to the media root
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
    pub created: DateTime<Utc>,
}

#[derive(Insertable, AllArgsConstructor, Debug, Clone)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct NewRecipe {
    pub author_id: i32,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Scalar fields written by an edit. `image` stays untouched when `None`.
#[derive(AsChangeset, AllArgsConstructor, Debug, Clone)]
#[diesel(table_name = crate::database::schema::recipes)]
pub struct RecipeChanges {
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
    pub image: Option<String>,
}
