mod savedmodel;
mod types;

// Re-export from types
pub use types::{IoSpec, Manifest, SavedModelError, Signature, TensorRecord, MANIFEST_FILE, MANIFEST_VERSION, WEIGHTS_FILE};
// Re-export from savedmodel
pub use savedmodel::SavedModel;
