use std::fmt::{self};
use std::error::Error;
use std::path::PathBuf;
use serde::{Serialize, Deserialize};
use crate::pack::DType;

/// Manifest format version this reader understands
pub const MANIFEST_VERSION: u32 = 1;

/// Filename of the manifest inside a saved model directory
pub const MANIFEST_FILE: &str = "model.json";

/// Filename of the tensor payload inside a saved model directory
pub const WEIGHTS_FILE: &str = "weights.bin";

/// Custom error types for saved model operations
#[derive(Debug)]
pub enum SavedModelError {
    /// Wraps std::io::Error for file operations
    IoError(std::io::Error),
    /// The directory or one of its required files does not exist
    NotFound(PathBuf),
    /// Malformed or inconsistent manifest contents
    InvalidManifest(String),
}

impl fmt::Display for SavedModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SavedModelError::IoError(e) => write!(f, "I/O error: {}", e),
            SavedModelError::NotFound(path) => write!(f, "Saved model not found: {}", path.display()),
            SavedModelError::InvalidManifest(msg) => write!(f, "Invalid saved model manifest: {}", msg),
        }
    }
}

impl Error for SavedModelError {}

impl From<std::io::Error> for SavedModelError {
    fn from(err: std::io::Error) -> Self {
        SavedModelError::IoError(err)
    }
}

/// One named input or output in the model's serving signature.
///
/// Signature shapes may use -1 for a dynamic dimension, typically the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IoSpec {
    pub name: String,
    pub shape: Vec<i64>,
    pub dtype: DType,
}

/// The model's serving signature: its named inputs and outputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signature {
    pub inputs: Vec<IoSpec>,
    pub outputs: Vec<IoSpec>,
}

/// One stored tensor in the payload. Shapes here are always concrete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TensorRecord {
    pub name: String,
    pub shape: Vec<u64>,
    pub dtype: DType,
    /// Byte offset into the payload file
    pub offset: u64,
    /// Length of the tensor data in bytes
    pub byte_len: u64,
}

impl TensorRecord {
    /// Total number of elements; a scalar (empty shape) counts as one
    pub fn element_count(&self) -> u64 {
        self.shape.iter().product()
    }
}

/// Top-level manifest of a saved model directory.
///
/// The manifest is the single source of truth for the payload layout; the
/// payload file is never scanned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub format_version: u32,
    pub name: String,
    pub signature: Signature,
    pub tensors: Vec<TensorRecord>,
}
