mod pack_utils;
mod reader;
mod types;
mod writer;

// Re-export from types
pub use types::{DType, MetaValue, PackError, TensorDesc, NO_DATA};
// Re-export from reader
pub use reader::PackReader;
// Re-export from writer
pub use writer::PackWriter;
// Re-export from pack_utils
pub use pack_utils::is_pack_file;
