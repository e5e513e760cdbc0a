/// Persistence backends for snippets, sessions, statistics and users.
pub mod content_store;
/// Database model definitions.
pub mod models;
/// Storage abstraction layer for database operations.
pub mod storage;
