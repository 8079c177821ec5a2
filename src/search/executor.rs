//! Scoped search execution
//!
//! Each search call opens its own connection, binds the caller identity
//! into the session via set_config, runs one full-text predicate and
//! resets the identity to the public marker before the connection goes
//! away. The identity value gates row visibility through the RLS policy,
//! so it is always bound as a query parameter, never interpolated.

use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};

use crate::error::SearchError;

/// Marker identity consulted by the row-level security policy when no
/// caller identity is active.
pub const PUBLIC_USER_ID: &str = "public";

/// Session identity set/reset. set_config takes the value as a bound
/// parameter, which a plain SET statement cannot.
const SET_USER_ID_SQL: &str = "SELECT set_config('app.user_id', $1, false)";

/// The one full-text predicate. plainto_tsquery treats the bound phrase
/// as plain text, so multi-word input cannot produce a tsquery syntax
/// error. Rows the RLS policy hides never reach the result set.
const SEARCH_SQL: &str = "SELECT solid_url, document_text
    FROM documents
    WHERE searchable_tsvector @@ plainto_tsquery('english', $1)
    ORDER BY ts_rank(searchable_tsvector, plainto_tsquery('english', $1)) DESC, solid_url";

/// Executes identity-scoped searches against the documents database.
#[derive(Debug, Clone)]
pub struct SearchExecutor {
    options: PgConnectOptions,
}

impl SearchExecutor {
    pub fn new(options: PgConnectOptions) -> Self {
        Self { options }
    }

    /// Search all document text visible to `user_id`.
    /// Returns the locators of matching documents, best match first.
    pub async fn search(&self, user_id: &str, phrase: &str) -> Result<Vec<String>, SearchError> {
        let mut conn = PgConnection::connect_with(&self.options).await?;

        sqlx::query(SET_USER_ID_SQL)
            .bind(user_id)
            .execute(&mut conn)
            .await?;

        let result = sqlx::query_as::<_, (String, String)>(SEARCH_SQL)
            .bind(phrase)
            .fetch_all(&mut conn)
            .await;

        // Reset the session identity before the connection is released,
        // on the error path too.
        let reset = sqlx::query(SET_USER_ID_SQL)
            .bind(PUBLIC_USER_ID)
            .execute(&mut conn)
            .await;
        let closed = conn.close().await;

        let rows = result?;
        reset?;
        closed?;

        let mut results = Vec::with_capacity(rows.len());
        for (solid_url, document_text) in rows {
            tracing::debug!(
                "Search hit: {} ({} chars of text)",
                solid_url,
                document_text.len()
            );
            results.push(solid_url);
        }

        if results.is_empty() {
            tracing::debug!("No documents matched the search");
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_identity_is_a_bound_parameter() {
        assert!(SET_USER_ID_SQL.contains("set_config"));
        assert!(SET_USER_ID_SQL.contains("$1"));
    }

    #[test]
    fn test_search_phrase_is_a_bound_parameter() {
        assert!(SEARCH_SQL.contains("plainto_tsquery('english', $1)"));
        assert!(SEARCH_SQL.contains("searchable_tsvector @@"));
    }
}
