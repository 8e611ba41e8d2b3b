use std::fmt::Write;

use itertools::Itertools;

use crate::{error::AppError, store::recipe_store::RecipeStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShoppingItem {
    pub name: String,
    pub measurement_unit: String,
    pub amount: i64,
}

/// Sums amounts per ingredient over every recipe in the user's cart, sorted by name.
pub fn shopping_list<S: RecipeStore>(
    store: &mut S,
    user_id: i32,
) -> Result<Vec<ShoppingItem>, AppError> {
    let lines = store.shopping_cart_lines(user_id)?;

    Ok(lines
        .into_iter()
        .map(|(ingredient, amount)| {
            (
                (ingredient.name, ingredient.measurement_unit),
                i64::from(amount),
            )
        })
        .into_grouping_map()
        .sum()
        .into_iter()
        .map(|((name, measurement_unit), amount)| ShoppingItem {
            name,
            measurement_unit,
            amount,
        })
        .sorted_by(|a, b| {
            a.name
                .cmp(&b.name)
                .then_with(|| a.measurement_unit.cmp(&b.measurement_unit))
        })
        .collect())
}

pub fn render(items: &[ShoppingItem]) -> String {
    let mut text = String::from("Shopping list\n\n");

    for item in items {
        // infallible for String
        let _ = writeln!(
            text,
            "{} ({}): {}",
            item.name, item.measurement_unit, item.amount
        );
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        database::models::{
            ingredient_line::NewIngredientLine, membership::Membership, recipe::NewRecipe,
        },
        store::memory_store::MemoryStore,
    };

    fn recipe(store: &mut MemoryStore, author: i32, lines: &[(i32, i32)]) -> i32 {
        let recipe = store
            .insert_recipe(&NewRecipe::new(
                author,
                "Soup".to_owned(),
                "recipes/images/soup.png".to_owned(),
                "Boil.".to_owned(),
                30,
            ))
            .unwrap();
        let lines: Vec<_> = lines
            .iter()
            .map(|&(ingredient, amount)| NewIngredientLine::new(recipe.id, ingredient, amount))
            .collect();
        store.insert_ingredient_lines(&lines).unwrap();
        recipe.id
    }

    #[test]
    fn sums_amounts_across_cart_recipes() {
        let mut store = MemoryStore::new();
        let cook = store.add_user("cook");
        let onion = store.add_ingredient("onion", "pcs");
        let carrot = store.add_ingredient("carrot", "g");
        let salt = store.add_ingredient("salt", "pinch");

        let first = recipe(&mut store, cook, &[(onion, 2), (carrot, 100)]);
        let second = recipe(&mut store, cook, &[(onion, 1), (salt, 1)]);
        recipe(&mut store, cook, &[(carrot, 500)]);

        store.add_membership(Membership::ShoppingCart, cook, first).unwrap();
        store.add_membership(Membership::ShoppingCart, cook, second).unwrap();

        let items = shopping_list(&mut store, cook).unwrap();

        assert_eq!(
            items,
            vec![
                ShoppingItem {
                    name: "carrot".to_owned(),
                    measurement_unit: "g".to_owned(),
                    amount: 100,
                },
                ShoppingItem {
                    name: "onion".to_owned(),
                    measurement_unit: "pcs".to_owned(),
                    amount: 3,
                },
                ShoppingItem {
                    name: "salt".to_owned(),
                    measurement_unit: "pinch".to_owned(),
                    amount: 1,
                },
            ]
        );
        assert_eq!(
            render(&items),
            "Shopping list\n\ncarrot (g): 100\nonion (pcs): 3\nsalt (pinch): 1\n"
        );
    }

    #[test]
    fn empty_cart_renders_header_only() {
        let mut store = MemoryStore::new();
        let cook = store.add_user("cook");

        assert!(shopping_list(&mut store, cook).unwrap().is_empty());
        assert_eq!(render(&[]), "Shopping list\n\n");
    }
}
