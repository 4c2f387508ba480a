pub mod blob;
pub mod entity_store;

pub use blob::{BlobStore, MemoryBlobStore};
pub use entity_store::{CascadeReport, EntityStore, SharedStore};
