/// Relational connection settings and schema management
pub mod database;

/// Application settings loaded from `hbnb.toml` and the environment
pub mod settings;

pub use database::DatabaseConfig;
pub use settings::{AppConfig, BackendKind, load_app_configuration};
