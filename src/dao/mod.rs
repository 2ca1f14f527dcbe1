/// Game persistence backends.
pub mod game_store;
/// Records shared by every backend.
pub mod models;
/// Storage error taxonomy.
pub mod storage;
