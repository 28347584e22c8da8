pub mod file_store;
pub mod index;
pub mod names;

pub use file_store::FileStore;
pub use index::DirectoryIndex;
