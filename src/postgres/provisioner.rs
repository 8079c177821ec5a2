//! Schema provisioner
//!
//! Creates the documents database on first run and applies the document
//! and access-grant schema in one transaction. Visibility is enforced by
//! the engine itself: a row-level security policy on documents requires
//! a matching document_access grant for the active session identity, and
//! FORCE keeps even privileged table owners subject to it.
//!
//! Fresh-install only: an existing database is left untouched, schema
//! migration is out of scope.

use async_trait::async_trait;
use sqlx::{Connection, PgConnection};

use crate::config::PostgresConfig;
use crate::error::StartupError;
use crate::postgres::lifecycle::StartupStage;
use crate::postgres::supervisor::probe;
use crate::search::PUBLIC_USER_ID;
use crate::utils::is_safe_identifier;

/// Result of an ensure-schema run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    Created,
    AlreadyExists,
}

/// Schema applied to a freshly created documents database, in order.
/// Table and index names are fixed internal identifiers.
fn schema_statements() -> [&'static str; 7] {
    [
        "CREATE TABLE documents (
            solid_url text NOT NULL PRIMARY KEY,
            document_text text NOT NULL,
            searchable_tsvector tsvector GENERATED ALWAYS AS (to_tsvector('english'::regconfig, document_text)) STORED
        )",
        "CREATE TABLE document_access (
            user_id text NOT NULL,
            solid_url text NOT NULL REFERENCES documents(solid_url) ON DELETE CASCADE,
            PRIMARY KEY (user_id, solid_url)
        )",
        "CREATE POLICY user_access_policy ON documents USING ((EXISTS ( SELECT 1
            FROM document_access
            WHERE ((document_access.solid_url = documents.solid_url) AND (document_access.user_id = current_setting('app.user_id'::text))))))",
        "ALTER TABLE documents ENABLE ROW LEVEL SECURITY",
        "ALTER TABLE ONLY documents FORCE ROW LEVEL SECURITY",
        "CREATE INDEX document_access_idx ON document_access USING btree (user_id, solid_url)",
        "CREATE INDEX documents_search_idx ON documents USING gin (searchable_tsvector)",
    ]
}

/// Creates the documents database and its schema if absent.
pub struct SchemaProvisioner {
    config: PostgresConfig,
}

impl SchemaProvisioner {
    pub fn new(config: PostgresConfig) -> Self {
        Self { config }
    }

    /// Check the catalog for the target database; create and provision it
    /// when absent, report `AlreadyExists` otherwise.
    pub async fn ensure_schema(&self) -> Result<ProvisionOutcome, StartupError> {
        let db_name = &self.config.database;
        if !is_safe_identifier(db_name) {
            return Err(StartupError::SchemaProvision(format!(
                "invalid database name '{}'",
                db_name
            )));
        }

        let mut admin = PgConnection::connect_with(&self.config.admin_connect_options()).await?;

        let exists: Option<(i32,)> =
            sqlx::query_as("SELECT 1 FROM pg_database WHERE datname = $1")
                .bind(db_name)
                .fetch_optional(&mut admin)
                .await
                .map_err(|e| StartupError::SchemaProvision(e.to_string()))?;

        if exists.is_some() {
            tracing::info!("Database '{}' already exists", db_name);
            admin.close().await.ok();
            return Ok(ProvisionOutcome::AlreadyExists);
        }

        tracing::info!("Database '{}' not found, creating...", db_name);
        // CREATE DATABASE cannot run in a transaction and cannot take a
        // bound parameter; db_name passed the identifier allow-list above.
        sqlx::query(&format!("CREATE DATABASE {}", db_name))
            .execute(&mut admin)
            .await
            .map_err(|e| StartupError::SchemaProvision(e.to_string()))?;
        admin.close().await.ok();

        self.apply_schema().await?;

        tracing::info!("Database '{}' created", db_name);
        Ok(ProvisionOutcome::Created)
    }

    /// Apply the full schema on a connection scoped to the new database.
    /// All statements commit or roll back together.
    async fn apply_schema(&self) -> Result<(), StartupError> {
        let mut conn = PgConnection::connect_with(&self.config.search_connect_options()).await?;

        let mut tx = conn
            .begin()
            .await
            .map_err(|e| StartupError::SchemaProvision(e.to_string()))?;
        for statement in schema_statements() {
            sqlx::query(statement)
                .execute(&mut *tx)
                .await
                .map_err(|e| StartupError::SchemaProvision(e.to_string()))?;
        }
        tx.commit()
            .await
            .map_err(|e| StartupError::SchemaProvision(e.to_string()))?;

        // Every new session starts as the public identity; the search
        // executor overrides it per request via set_config.
        sqlx::query(&format!(
            "ALTER DATABASE {} SET app.user_id = '{}'",
            self.config.database, PUBLIC_USER_ID
        ))
        .execute(&mut conn)
        .await
        .map_err(|e| StartupError::SchemaProvision(e.to_string()))?;

        conn.close().await.ok();
        Ok(())
    }
}

#[async_trait]
impl StartupStage for SchemaProvisioner {
    fn name(&self) -> &'static str {
        "postgres-schema"
    }

    /// The provisioner requires a reachable engine.
    async fn can_handle(&self) -> Result<(), StartupError> {
        probe(&self.config.admin_connect_options())
            .await
            .map_err(StartupError::Connection)
    }

    async fn handle(&self) -> Result<(), StartupError> {
        self.ensure_schema().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_statement_order() {
        let statements = schema_statements();
        assert!(statements[0].contains("CREATE TABLE documents"));
        assert!(statements[0].contains("GENERATED ALWAYS"));
        assert!(statements[1].contains("CREATE TABLE document_access"));
        assert!(statements[1].contains("ON DELETE CASCADE"));
        assert!(statements[2].contains("CREATE POLICY user_access_policy"));
        assert!(statements[2].contains("current_setting('app.user_id'::text)"));
        assert!(statements[3].contains("ENABLE ROW LEVEL SECURITY"));
        assert!(statements[4].contains("FORCE ROW LEVEL SECURITY"));
        assert!(statements[5].contains("USING btree (user_id, solid_url)"));
        assert!(statements[6].contains("USING gin (searchable_tsvector)"));
    }

    #[test]
    fn test_rls_is_forced_after_enable() {
        // FORCE must come after ENABLE so the policy also binds the
        // table owner.
        let statements = schema_statements();
        let enable = statements
            .iter()
            .position(|s| s.contains("ENABLE ROW LEVEL SECURITY"))
            .unwrap();
        let force = statements
            .iter()
            .position(|s| s.contains("FORCE ROW LEVEL SECURITY"))
            .unwrap();
        assert!(enable < force);
    }
}
