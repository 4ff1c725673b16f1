pub mod loader;
pub mod schema;

pub use loader::{default_config_path, default_data_dir, load_config, load_config_from_str};
pub use schema::{
    AppConfig, CredentialsConfig, IngestionConfig, LoggingConfig, SessionConfig, UserConfig,
};
