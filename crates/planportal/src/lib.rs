pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod model;
pub mod planning;
pub mod portal;
pub mod sanitize;
pub mod storage;

pub use config::{load_config, load_from_environment, PortalConfig};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, PortalError, Result, StorageError};
pub use http::{router, ApiError, AppState};
pub use planning::{DisabledLookup, PlanningPortalClient, PropertyError, PropertyLookup};
pub use portal::{ChangeSet, DocumentUpdate, NewJob, Portal, Upload};
pub use storage::DataPaths;
