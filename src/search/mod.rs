//! Identity-scoped full-text search

pub mod executor;

pub use executor::{SearchExecutor, PUBLIC_USER_ID};
