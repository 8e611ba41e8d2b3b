use diesel::prelude::*;
use lombok::AllArgsConstructor;

/// Existence-only links between a user and a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Membership {
    Favorite,
    ShoppingCart,
}

impl Membership {
    pub fn label(&self) -> &'static str {
        match self {
            Membership::Favorite => "favorites",
            Membership::ShoppingCart => "shopping cart",
        }
    }
}

#[derive(Insertable, AllArgsConstructor, Debug)]
#[diesel(table_name = crate::database::schema::favorites)]
pub struct NewFavorite {
    pub user_id: i32,
    pub recipe_id: i32,
}

#[derive(Insertable, AllArgsConstructor, Debug)]
#[diesel(table_name = crate::database::schema::shopping_carts)]
pub struct NewShoppingCartItem {
    pub user_id: i32,
    pub recipe_id: i32,
}
