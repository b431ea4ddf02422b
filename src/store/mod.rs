//! Relational persistence for the catalog.

use crate::Result;
use ohno::IntoAppError;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

mod catalog;
mod models;
mod seed;

pub use catalog::{Catalog, CatalogStats, CategoryCount, CategoryWithCount, EcosystemCount, LibraryFilter, SortOrder};
pub use models::{CategoryRow, LibraryRow, VersionRow};
pub use seed::seed_sample_data;

const LOG_TARGET: &str = "     store";

/// Open the database, creating it if necessary, and bring the schema up to
/// date.
pub async fn connect(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .into_app_err_with(|| format!("invalid database URL '{database_url}'"))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .into_app_err_with(|| format!("unable to open database '{database_url}'"))?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .into_app_err("unable to apply database migrations")?;

    log::debug!(target: LOG_TARGET, "Database ready at '{database_url}'");

    Ok(pool)
}
