use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::ApiResponse;
use crate::auth;
use crate::state::AppState;
use podsearch_backend::error::SearchError;

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<String>,
    pub total: usize,
}

/// Precondition check: a search request must carry a non-empty query
/// phrase. Err is the reject reason.
fn can_handle(req: &SearchRequest) -> Result<(), String> {
    if req.query.trim().is_empty() {
        return Err("Search query must not be empty".to_string());
    }
    Ok(())
}

/// POST /api/search
///
/// Runs one identity-scoped full-text search. Authentication problems
/// come back as 401; database failures as 500 with a generic message,
/// the detail stays in the log.
pub async fn search(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<SearchRequest>,
) -> (StatusCode, Json<ApiResponse<SearchResponse>>) {
    if let Err(reason) = can_handle(&req) {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(400, &reason)),
        );
    }

    let identity = match auth::extract_identity(&headers) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::info!("Search rejected: {}", e);
            return (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error(401, "Authentication rejected")),
            );
        }
    };

    tracing::debug!("Search by '{}': {}", identity.as_str(), req.query.trim());

    match state.executor.search(identity.as_str(), req.query.trim()).await {
        Ok(results) => {
            let total = results.len();
            (
                StatusCode::OK,
                Json(ApiResponse::success(SearchResponse { results, total })),
            )
        }
        Err(SearchError::AuthenticationRejected(reason)) => {
            tracing::info!("Search rejected: {}", reason);
            (
                StatusCode::UNAUTHORIZED,
                Json(ApiResponse::error(401, "Authentication rejected")),
            )
        }
        Err(e) => {
            tracing::error!("Search failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ApiResponse::error(500, "Internal search error")),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_handle_rejects_empty_query() {
        assert!(can_handle(&SearchRequest {
            query: "".to_string()
        })
        .is_err());
        assert!(can_handle(&SearchRequest {
            query: "   ".to_string()
        })
        .is_err());
    }

    #[test]
    fn test_can_handle_accepts_query_text() {
        assert!(can_handle(&SearchRequest {
            query: "cats".to_string()
        })
        .is_ok());
    }
}
