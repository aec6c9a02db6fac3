pub mod format;
pub mod mime;
pub mod store;

pub use format::format_size;
pub use store::{encode_component, FileEntry, FileStore, FilesError};
