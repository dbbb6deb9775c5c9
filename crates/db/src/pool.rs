//! MySQL connection pool and schema bootstrap.
//!
//! [`bootstrap`] is the only way to obtain a [`Database`], so anything that
//! holds one is guaranteed to see a migrated, verified schema.

use sqlx::mysql::{MySqlConnection, MySqlPoolOptions};
use sqlx::{Connection, MySqlPool};
use tracing::{error, info};

use crate::config::DatabaseConfig;
use crate::schema::{Entity, EntityRegistry};
use crate::DbError;

/// Type alias for the shared MySQL pool used across the whole application.
pub type DbPool = MySqlPool;

/// Entities the request service cannot run without.
const REQUIRED_ENTITIES: &[Entity] = &[Entity::Request, Entity::RequestItem];

/// Process-wide database context: the live pool plus the entities verified
/// to exist after migration.
#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
    registry: EntityRegistry,
}

impl Database {
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }
}

/// Run the full startup sequence: create the schema if absent, connect,
/// migrate, and verify the registry. Any failure aborts with an error.
pub async fn bootstrap(config: &DatabaseConfig) -> Result<Database, DbError> {
    ensure_database(config)
        .await
        .inspect_err(|e| error!(error = %e, "failed to ensure database exists"))?;

    let pool = create_pool(config)
        .await
        .inspect_err(|e| error!(error = %e, "failed to connect to database"))?;

    run_migrations(&pool)
        .await
        .inspect_err(|e| error!(error = %e, "database migration failed"))?;

    let registry = load_registry(&pool)
        .await
        .inspect_err(|e| error!(error = %e, "failed to read schema tables"))?;
    registry
        .require(REQUIRED_ENTITIES)
        .inspect_err(|e| error!(error = %e, "request tables not initialized"))?;

    info!(
        database = %config.database,
        entities = registry.entities().count(),
        "Database initialization completed"
    );
    Ok(Database { pool, registry })
}

/// Quote a schema name as a MySQL identifier.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

/// Connect to the server without selecting a schema and create the target
/// schema if it does not exist yet.
pub async fn ensure_database(config: &DatabaseConfig) -> Result<(), DbError> {
    info!(host = %config.host, port = config.port, "Connecting to database server");
    let mut conn = MySqlConnection::connect_with(&config.server_options()?).await?;

    let statement = format!(
        "CREATE DATABASE IF NOT EXISTS {}",
        quote_identifier(&config.database)
    );
    sqlx::raw_sql(&statement).execute(&mut conn).await?;
    conn.close().await?;

    info!(database = %config.database, "Database is present");
    Ok(())
}

/// Create a connection pool scoped to the configured database.
///
/// `config.max_connections` controls the pool ceiling.
pub async fn create_pool(config: &DatabaseConfig) -> Result<DbPool, DbError> {
    info!("Connecting to database (max_connections={})", config.max_connections);
    let pool = MySqlPoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(config.database_options()?)
        .await?;
    Ok(pool)
}

/// Run embedded SQLx migrations located in `./migrations` (relative to the
/// workspace root at build time).
pub async fn run_migrations(pool: &DbPool) -> Result<(), DbError> {
    info!("Running database migrations");
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

/// Read the tables of the current schema into an [`EntityRegistry`].
pub async fn load_registry(pool: &DbPool) -> Result<EntityRegistry, DbError> {
    let tables: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT CAST(table_name AS CHAR)
        FROM information_schema.tables
        WHERE table_schema = DATABASE()
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(EntityRegistry::from_table_names(tables))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_are_backtick_quoted() {
        assert_eq!(quote_identifier("hr_portal"), "`hr_portal`");
    }

    #[test]
    fn embedded_backticks_are_doubled() {
        assert_eq!(quote_identifier("hr`; DROP"), "`hr``; DROP`");
    }
}
