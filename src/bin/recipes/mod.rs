pub mod editor;
pub mod read_model;
pub mod shopping_list;
