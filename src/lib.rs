pub mod access;
pub mod auth;
pub mod config;
pub mod errors;
pub mod insertables;
pub mod models;
pub mod pricing;
pub mod schema;
pub mod services;
pub mod store;

#[cfg(test)]
mod test_utils;

use diesel::pg::PgConnection;
use diesel::prelude::*;

pub fn establish_connection(database_url: &str) -> ConnectionResult<PgConnection> {
    PgConnection::establish(database_url)
}
