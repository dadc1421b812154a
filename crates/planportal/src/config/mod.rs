pub mod loader;
pub mod schema;

pub use loader::{apply_overrides, load_config, load_config_from_str, load_from_environment};
pub use schema::{LogFormat, LoggingConfig, PortalConfig, PropertyApiConfig};
