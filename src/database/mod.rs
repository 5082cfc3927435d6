pub mod collection;
pub mod manager;
pub mod memory;
pub mod postgres;
pub mod store;

pub use collection::Collection;
pub use manager::{DatabaseError, DatabaseManager};
pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;
pub use store::{Document, DocumentStore, NewDocument, Scope};
