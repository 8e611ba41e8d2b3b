pub mod follow;
pub mod ingredient;
pub mod ingredient_line;
pub mod membership;
pub mod recipe;
pub mod recipe_tag;
pub mod tag;
pub mod user;
