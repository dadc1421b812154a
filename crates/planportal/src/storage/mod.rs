pub mod filesystem;
pub mod job_store;
pub mod paths;

pub use filesystem::{FileStorage, StoredFile};
pub use job_store::{JobSnapshot, JobStore};
pub use paths::DataPaths;
