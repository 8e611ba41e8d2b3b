pub mod database_store;
#[cfg(test)]
pub mod memory_store;
pub mod recipe_store;
