pub mod backend;
pub mod binding;
pub mod document;
pub mod manager;
pub mod memory;
pub mod models;
pub mod ownable;
pub mod record_access;
pub mod relational;
pub mod validation;

pub use backend::{id_from_path, Backend, BackendError, Filters, QueryOptions, Record};
pub use binding::{CollectionBinding, FieldKind, FieldSpec, DELETED_AT};
pub use document::PgDocumentBackend;
pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryBackend;
pub use ownable::Ownable;
pub use record_access::{AccessError, AccessResult, FindOptions, PageRequest, PageResult, RecordAccess};
pub use relational::PgTableBackend;
pub use validation::ValidationError;
