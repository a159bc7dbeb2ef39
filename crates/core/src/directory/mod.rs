//! Directory module: read-only entity lookups consumed by the engine.

mod directory_memory;
mod directory_model;
mod directory_traits;

pub use directory_memory::InMemoryDirectory;
pub use directory_model::{Branch, GeoPoint, Queue, Schedule};
pub use directory_traits::DirectoryTrait;
