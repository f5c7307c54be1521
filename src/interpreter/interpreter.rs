use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{self};
use std::fs::File;
use std::path::{Path, PathBuf};
use memmap2::Mmap;
use serde::Serialize;
use tracing::{info, debug};
use crate::pack::{DType, MetaValue, PackReader, TensorDesc};
use crate::convert::quant::{Dequantizer, QuantParams};

/// Custom error types for interpreter operations
#[derive(Debug)]
pub enum InterpreterError {
    /// Tensor details were requested before allocate_tensors
    NotAllocated,
    /// The model file is structurally valid but semantically unusable
    InvalidModel(String),
}

impl fmt::Display for InterpreterError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InterpreterError::NotAllocated => {
                write!(f, "Tensors have not been allocated; call allocate_tensors first")
            }
            InterpreterError::InvalidModel(msg) => write!(f, "Invalid model: {}", msg),
        }
    }
}

impl Error for InterpreterError {}

/// Descriptor of one tensor as the runtime sees it
#[derive(Debug, Clone, Serialize)]
pub struct TensorDetails {
    /// Position in the model's descriptor table
    pub index: usize,
    /// Name/label of the tensor
    pub name: String,
    /// Shape with -1 marking dynamic dimensions
    pub shape: Vec<i64>,
    /// Element type
    pub dtype: DType,
    /// Quantization parameters; scale 0.0 means unquantized
    pub quant: QuantParams,
    /// Runtime buffer size in bytes, with dynamic dimensions resolved to 1
    pub byte_size: usize,
}

impl TensorDetails {
    fn from_desc(desc: &TensorDesc) -> Self {
        Self {
            index: desc.index,
            name: desc.name.clone(),
            shape: desc.dims.clone(),
            dtype: desc.dtype,
            quant: QuantParams { scale: desc.scale, zero_point: desc.zero_point },
            byte_size: desc.num_elements() * desc.dtype.size(),
        }
    }
}

/// Loads a converted MLPK model for introspection.
///
/// Mirrors the loading sequence of the mobile runtime: open the model,
/// allocate its tensors, then query the input and output descriptors.
/// Descriptor queries before allocation are an error.
pub struct Interpreter {
    /// Path to the model file
    pub path: PathBuf,
    reader: PackReader,
    data: Mmap,
    allocated: bool,
}

impl Interpreter {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let path = path.as_ref().to_path_buf();
        let reader = PackReader::new(&path)?;

        let file = File::open(&path)?;
        let data = unsafe { Mmap::map(&file)? };

        info!("Loaded model {} ({} bytes)", path.display(), data.len());

        Ok(Self { path, reader, data, allocated: false })
    }

    /// Resolve runtime buffer sizes and validate the stored tensors.
    ///
    /// Dynamic dimensions resolve to 1, the runtime's default batch size.
    /// Every stored tensor's byte length must agree with its resolved shape
    /// and dtype.
    pub fn allocate_tensors(&mut self) -> Result<(), Box<dyn Error + Send + Sync>> {
        for desc in &self.reader.tensors {
            let expected = desc.num_elements() * desc.dtype.size();
            if desc.has_data() && desc.byte_len as usize != expected {
                return Err(Box::new(InterpreterError::InvalidModel(
                    format!("Tensor {} stores {} bytes but its shape requires {}",
                            desc.name, desc.byte_len, expected)
                )));
            }
            debug!("Allocated tensor {}: {} bytes", desc.name, expected);
        }

        self.allocated = true;
        info!("Allocated {} tensors", self.reader.tensor_count);

        Ok(())
    }

    /// Descriptors of the model's input tensors, in signature order
    pub fn input_details(&self) -> Result<Vec<TensorDetails>, Box<dyn Error + Send + Sync>> {
        self.details_for(&self.reader.inputs)
    }

    /// Descriptors of the model's output tensors, in signature order
    pub fn output_details(&self) -> Result<Vec<TensorDetails>, Box<dyn Error + Send + Sync>> {
        self.details_for(&self.reader.outputs)
    }

    /// Descriptors of every tensor in the model
    pub fn tensor_details(&self) -> Result<Vec<TensorDetails>, Box<dyn Error + Send + Sync>> {
        if !self.allocated {
            return Err(Box::new(InterpreterError::NotAllocated));
        }
        Ok(self.reader.tensors.iter().map(TensorDetails::from_desc).collect())
    }

    fn details_for(&self, indices: &[u32]) -> Result<Vec<TensorDetails>, Box<dyn Error + Send + Sync>> {
        if !self.allocated {
            return Err(Box::new(InterpreterError::NotAllocated));
        }
        Ok(indices.iter()
            .map(|i| TensorDetails::from_desc(&self.reader.tensors[*i as usize]))
            .collect())
    }

    /// Decode every stored tensor, returning how many were readable.
    ///
    /// This is the deeper integrity check behind `inspect --verify`: it runs
    /// the stored payloads through the same format implementations the
    /// converter used to write them.
    pub fn verify_tensors(&self) -> Result<usize, Box<dyn Error + Send + Sync>> {
        if !self.allocated {
            return Err(Box::new(InterpreterError::NotAllocated));
        }

        let data = self.data_section();
        let mut verified = 0usize;

        for desc in self.reader.tensors.iter().filter(|d| d.has_data()) {
            let params = QuantParams { scale: desc.scale, zero_point: desc.zero_point };
            Dequantizer::dequantize(
                data,
                desc.offset as usize,
                desc.num_elements(),
                desc.dtype,
                &params,
            ).map_err(|e| format!("Tensor {} failed verification: {}", desc.name, e))?;
            verified += 1;
        }

        info!("Verified {} stored tensors", verified);

        Ok(verified)
    }

    /// Model metadata as read from the file
    pub fn metadata(&self) -> &BTreeMap<String, MetaValue> {
        &self.reader.metadata
    }

    /// Metadata lookup with a typed not-found error
    pub fn get_metadata_value(&self, key: &str) -> Result<MetaValue, Box<dyn Error + Send + Sync>> {
        self.reader.get_metadata_value(key)
    }

    /// Number of tensor descriptors in the model
    pub fn tensor_count(&self) -> u64 {
        self.reader.tensor_count
    }

    /// Total size of the model file in bytes
    pub fn model_size(&self) -> u64 {
        self.data.len() as u64
    }

    fn data_section(&self) -> &[u8] {
        let start = self.reader.data_start as usize;
        let end = start + self.reader.data_size as usize;
        &self.data[start..end]
    }
}
