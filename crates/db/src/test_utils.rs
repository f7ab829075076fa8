//! Throwaway Postgres databases for integration tests.

use std::sync::Arc;

use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr, Statement};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::migrations::Migrator;

/// Where the test server lives, read from `TEST_DB_*` variables.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Role used for every test database.
    pub username: String,
    /// Password of the role.
    pub password: String,
    /// Name of the database to connect to.
    pub database: String,
}

fn env_or(name: &str, fallback: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| fallback.to_string())
}

impl Default for TestDbConfig {
    fn default() -> Self {
        Self {
            host: env_or("TEST_DB_HOST", "localhost"),
            port: std::env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: env_or("TEST_DB_USER", "travel_cost_test"),
            password: env_or("TEST_DB_PASSWORD", "travel_cost_test"),
            database: env_or("TEST_DB_NAME", "travel_cost_test"),
        }
    }
}

impl TestDbConfig {
    fn url_for(&self, database: &str) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{database}",
            self.username, self.password, self.host, self.port
        )
    }

    /// URL of the configured database.
    #[must_use]
    pub fn database_url(&self) -> String {
        self.url_for(&self.database)
    }

    /// URL of the maintenance database used to create and drop test databases.
    #[must_use]
    pub fn postgres_url(&self) -> String {
        self.url_for("postgres")
    }

    async fn run_admin(&self, sql: String) -> Result<(), DbErr> {
        let admin = Database::connect(&self.postgres_url()).await?;
        let result = admin
            .execute(Statement::from_string(DatabaseBackend::Postgres, sql))
            .await;
        admin.close().await?;
        result.map(|_| ())
    }
}

/// A migrated database that exists for one test.
pub struct TestDatabase {
    conn: Arc<DatabaseConnection>,
    config: TestDbConfig,
}

impl TestDatabase {
    /// Create and migrate a database with a random name.
    pub async fn create_unique() -> Result<Self, DbErr> {
        let mut config = TestDbConfig::default();
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        config.database = format!("travel_cost_test_{}", &suffix[..8]);

        config
            .run_admin(format!("CREATE DATABASE \"{}\"", config.database))
            .await?;

        let conn = Database::connect(&config.database_url()).await?;
        Migrator::up(&conn, None).await?;

        info!(database = %config.database, "Created test database");

        Ok(Self {
            conn: Arc::new(conn),
            config,
        })
    }

    /// Shared handle to the connection pool.
    #[must_use]
    pub fn connection(&self) -> Arc<DatabaseConnection> {
        self.conn.clone()
    }

    /// Drop the database, terminating any connections still open on it.
    pub async fn drop_database(self) -> Result<(), DbErr> {
        // Repositories may still hold the pool; only the last owner closes it.
        if let Ok(conn) = Arc::try_unwrap(self.conn) {
            conn.close().await?;
        }

        let name = &self.config.database;
        // The database may already have no sessions.
        self.config
            .run_admin(format!(
                "SELECT pg_terminate_backend(pid) FROM pg_stat_activity WHERE datname = '{name}'"
            ))
            .await
            .ok();
        self.config
            .run_admin(format!("DROP DATABASE IF EXISTS \"{name}\""))
            .await?;

        info!(database = %name, "Dropped test database");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_db_config_urls() {
        let config = TestDbConfig {
            host: "db".to_string(),
            port: 5433,
            username: "user".to_string(),
            password: "pass".to_string(),
            database: "travel".to_string(),
        };
        assert_eq!(config.database_url(), "postgres://user:pass@db:5433/travel");
        assert_eq!(config.postgres_url(), "postgres://user:pass@db:5433/postgres");
    }
}
