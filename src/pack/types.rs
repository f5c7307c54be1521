use std::fmt::{self};
use std::error::Error;
use serde::{Serialize, Deserialize};

/// Tensor element types that can be stored in an MLPK file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 32-bit IEEE 754 floating point
    Float32 = 0,
    /// 16-bit IEEE 754 floating point
    Float16 = 1,
    /// 8-bit signed integer, usually a quantized weight
    Int8 = 2,
    /// 32-bit signed integer
    Int32 = 3,
    /// 8-bit unsigned integer
    UInt8 = 4,
    /// Boolean stored as one byte
    Bool = 5,
}

impl DType {
    /// Size of a single element in bytes
    pub fn size(&self) -> usize {
        match self {
            DType::Float32 => 4,
            DType::Float16 => 2,
            DType::Int8 => 1,
            DType::Int32 => 4,
            DType::UInt8 => 1,
            DType::Bool => 1,
        }
    }

    /// Convert the dtype to a string representation
    pub fn type_string(&self) -> String {
        match self {
            DType::Float32 => "FLOAT32",
            DType::Float16 => "FLOAT16",
            DType::Int8 => "INT8",
            DType::Int32 => "INT32",
            DType::UInt8 => "UINT8",
            DType::Bool => "BOOL",
        }.to_string()
    }

    /// Numeric code written into the file for this dtype
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Decode a dtype from its file representation
    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(DType::Float32),
            1 => Some(DType::Float16),
            2 => Some(DType::Int8),
            3 => Some(DType::Int32),
            4 => Some(DType::UInt8),
            5 => Some(DType::Bool),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.type_string())
    }
}

/// Metadata values that can be stored in an MLPK file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum MetaValue {
    /// String value type for text data
    String(String),
    /// Integer value type for whole numbers, stored as i64
    Int(i64),
    /// Float value type for decimal numbers, stored as f32
    Float(f32),
    /// Boolean value type for true/false values
    Bool(bool),
}

impl MetaValue {
    /// Numeric code written into the file for this value type
    pub fn code(&self) -> u32 {
        match self {
            MetaValue::String(_) => 0,
            MetaValue::Int(_) => 1,
            MetaValue::Float(_) => 2,
            MetaValue::Bool(_) => 3,
        }
    }

    /// Attempts to convert the value to an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            MetaValue::Int(i) => Some(*i),
            MetaValue::Float(f) => Some(*f as i64),
            MetaValue::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Returns the string content if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            MetaValue::String(s) => write!(f, "{}", s),
            MetaValue::Int(i) => write!(f, "{}", i),
            MetaValue::Float(fl) => write!(f, "{}", fl),
            MetaValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Custom error types for MLPK operations
#[derive(Debug)]
pub enum PackError {
    /// Wraps std::io::Error for file operations
    IoError(std::io::Error),
    /// Invalid format errors with a message
    InvalidFormat(String),
    /// Missing metadata key errors
    MetadataNotFound(String),
}

impl fmt::Display for PackError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PackError::IoError(e) => write!(f, "I/O error: {}", e),
            PackError::InvalidFormat(msg) => write!(f, "Invalid MLPK format: {}", msg),
            PackError::MetadataNotFound(key) => write!(f, "Metadata key not found: {}", key),
        }
    }
}

impl Error for PackError {}

impl From<std::io::Error> for PackError {
    fn from(err: std::io::Error) -> Self {
        PackError::IoError(err)
    }
}

/// Sentinel offset for descriptors that carry no stored data
pub const NO_DATA: u64 = u64::MAX;

/// Descriptor for one tensor in an MLPK file.
///
/// Input and output tensors are descriptors without stored data; their
/// buffers only exist at runtime. Stored tensors are the converted weights.
#[derive(Debug, Clone, Serialize)]
pub struct TensorDesc {
    /// Position of the tensor in the descriptor table
    pub index: usize,
    /// Name/label of the tensor
    pub name: String,
    /// Size of each dimension, -1 marks a dynamic dimension
    pub dims: Vec<i64>,
    /// Element type of the tensor
    pub dtype: DType,
    /// Quantization scale, 0.0 when the tensor is not quantized
    pub scale: f32,
    /// Quantization zero point
    pub zero_point: i32,
    /// Offset into the data section, NO_DATA when nothing is stored
    pub offset: u64,
    /// Length of the stored data in bytes
    pub byte_len: u64,
}

impl TensorDesc {
    /// Whether the descriptor has stored data in the file
    pub fn has_data(&self) -> bool {
        self.offset != NO_DATA
    }

    /// Whether the tensor carries quantization parameters
    pub fn is_quantized(&self) -> bool {
        self.scale != 0.0
    }

    /// Element count with dynamic dimensions resolved to 1
    pub fn num_elements(&self) -> usize {
        self.dims.iter()
            .map(|d| if *d < 0 { 1 } else { *d as usize })
            .product()
    }
}

impl fmt::Display for TensorDesc {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} [{}]", self.name, self.dims.iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(" × "))
    }
}
