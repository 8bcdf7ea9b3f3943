use crate::config::db::DB;
use crate::config::AppConfig;
use std::sync::Arc;

pub mod config;
pub mod errors;
pub mod model;
pub mod service;
pub mod util;

// There are a couple approaches to take when implementing storage tests. This
// approach adds tests on /src/tests, this way tests can reference private
// items inside the src folder. Another approach would be to have the tests in
// a /tests folder on the root of the project, which only sees the public API.
#[cfg(test)]
mod tests;

// Application state shared across callers.
// Cloning AppState is cheap because it uses Arc internally to share the DB pool.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DB>,
}

impl AppState {
    pub async fn new() -> Self {
        let config = AppConfig::from_env();

        let db = Arc::new(
            DB::new(&config.db.url, config.db.pool_size)
                .await
                .expect("Cannot connect to database"),
        );

        // This integrates database migrations into startup so callers always
        // run against a fully migrated schema.
        if config.db.auto_migrate {
            db.migrate().await.expect("Cannot migrate database");
        }

        AppState {
            config: Arc::new(config),
            db,
        }
    }
}
