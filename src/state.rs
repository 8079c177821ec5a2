use podsearch_backend::search::SearchExecutor;

/// Shared application state
pub struct AppState {
    pub executor: SearchExecutor,
}
