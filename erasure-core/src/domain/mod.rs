pub mod action;
pub mod categories;
pub mod comments;
pub mod datasource;
pub mod error;
pub mod grouping;
pub mod pagination;
pub mod record;
pub mod sql;
pub mod unique_id;

// Re-exports pratiques pour simplifier les imports ailleurs
pub use datasource::{Credential, Credentials, DataSourceDescriptor, Dialect};
pub use error::DomainError;
pub use record::{FieldRecord, MinimizationRequest, ObjectName, RemediationObject};
pub use action::{ActionKind, ActionParams, ActionRequest, ActionResponse, ActionStatus};
