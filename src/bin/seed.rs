use diesel::insert_into;
use diesel::prelude::*;
use dotenvy::dotenv;
use serde::de::DeserializeOwned;
use std::error::Error;
use std::fs;
use storefront_api::establish_connection;
use storefront_api::insertables::{NewCategory, NewGame, NewProduct, NewUser};
use storefront_api::schema::{categories, games, products, users};
use tracing::info;

fn load<T: DeserializeOwned>(file: &str) -> Result<Vec<T>, Box<dyn Error>> {
    let raw = fs::read_to_string(format!("seed/{file}"))
        .map_err(|e| format!("can't open seed/{file}: {e}"))?;
    Ok(serde_json::from_str(&raw)?)
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    tracing_subscriber::fmt().init();

    let database_url = std::env::var("DATABASE_URL")?;
    let connection = &mut establish_connection(&database_url)?;

    connection.transaction::<_, Box<dyn Error>, _>(|conn| {
        let inserted = insert_into(users::table)
            .values(load::<NewUser>("users.json")?)
            .execute(conn)?;
        info!(inserted, "users seeded");

        let inserted = insert_into(games::table)
            .values(load::<NewGame>("games.json")?)
            .execute(conn)?;
        info!(inserted, "games seeded");

        let inserted = insert_into(categories::table)
            .values(load::<NewCategory>("categories.json")?)
            .execute(conn)?;
        info!(inserted, "categories seeded");

        let inserted = insert_into(products::table)
            .values(load::<NewProduct>("products.json")?)
            .execute(conn)?;
        info!(inserted, "products seeded");
        Ok(())
    })
}
