/// Database connection and schema management
pub mod database;

/// Service settings loaded from config.toml
pub mod settings;
