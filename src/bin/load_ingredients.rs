//! Loads reference ingredients from a JSON file:
//!
//! ```text
//! load-ingredients data/ingredients.json
//! ```
//!
//! The file holds an array of `{"name": ..., "measurement_unit": ...}`.
//! Pairs already in the table are skipped, so the command can be rerun.

use std::{env, error::Error, fs};

use diesel::{insert_into, PgConnection, QueryResult, RunQueryDsl};
use itertools::Itertools;
use tracing::{info, trace_span};
use tracing_subscriber::{prelude::*, EnvFilter, Registry};

use crate::{
    config::Config,
    database::{connection::establish_connection, models::ingredient::NewIngredient},
};

mod config;
mod database;

const CHUNK_SIZE: usize = 1000;

fn main() -> Result<(), Box<dyn Error>> {
    let subscriber = Registry::default()
        .with(tracing_subscriber::fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")));
    tracing::subscriber::set_global_default(subscriber)?;

    let path = env::args()
        .nth(1)
        .ok_or("usage: load-ingredients <ingredients.json>")?;

    let ingredients: Vec<NewIngredient> = serde_json::from_str(&fs::read_to_string(&path)?)?;
    info!("Read {} ingredients from {path}", ingredients.len());

    let config = Config::load()?;
    let mut connection = establish_connection(&config.database_url)?;

    let inserted = connection
        .build_transaction()
        .run(|connection| fill_ingredients(connection, ingredients))?;

    info!("Inserted {inserted} new ingredients");
    Ok(())
}

fn fill_ingredients(
    connection: &mut PgConnection,
    rows: Vec<NewIngredient>,
) -> QueryResult<usize> {
    use crate::database::schema::ingredients::dsl::*;

    let span = trace_span!("fill_ingredients");
    let _guard = span.enter();

    let unique: Vec<_> = rows.into_iter().unique().collect();
    let mut inserted = 0;

    for chunk in unique.chunks(CHUNK_SIZE) {
        inserted += insert_into(ingredients)
            .values(chunk)
            .on_conflict((name, measurement_unit))
            .do_nothing()
            .execute(connection)?;
    }

    Ok(inserted)
}
