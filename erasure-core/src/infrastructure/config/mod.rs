pub mod app;

pub use app::{
    AnonymizationSettings, AppConfig, CatalogSettings, HttpSettings, RemediationSettings,
    ServerSettings, SqlServerSettings, TokenizationSettings, load_app_config, read_user_token,
};
