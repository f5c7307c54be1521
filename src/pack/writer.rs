use std::error::Error;
use byteorder::{LittleEndian, WriteBytesExt};
use tracing::debug;
use super::types::{DType, MetaValue, PackError, NO_DATA};
use super::pack_utils::{PACK_MAGIC, PACK_VERSION, write_string, write_meta_value};

struct PendingTensor {
    name: String,
    dims: Vec<i64>,
    dtype: DType,
    scale: f32,
    zero_point: i32,
    offset: u64,
    byte_len: u64,
}

/// Builds an MLPK file in memory.
///
/// Tensors receive indices in insertion order; data offsets into the data
/// section are assigned by the writer as stored tensors are added. `finish`
/// serializes the header, metadata, descriptor table, input/output index
/// lists and the data section into a byte vector for the caller to write out.
pub struct PackWriter {
    metadata: Vec<(String, MetaValue)>,
    tensors: Vec<PendingTensor>,
    inputs: Vec<u32>,
    outputs: Vec<u32>,
    data: Vec<u8>,
}

impl PackWriter {
    pub fn new() -> Self {
        Self {
            metadata: Vec::new(),
            tensors: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            data: Vec::new(),
        }
    }

    /// Add a metadata key-value pair
    pub fn add_metadata(&mut self, key: &str, value: MetaValue) {
        self.metadata.push((key.to_string(), value));
    }

    /// Add a tensor descriptor without stored data.
    ///
    /// Used for the model's inputs and outputs, whose buffers only exist at
    /// runtime. Returns the index of the new descriptor.
    pub fn add_io_tensor(&mut self, name: &str, dims: &[i64], dtype: DType) -> u32 {
        let index = self.tensors.len() as u32;
        self.tensors.push(PendingTensor {
            name: name.to_string(),
            dims: dims.to_vec(),
            dtype,
            scale: 0.0,
            zero_point: 0,
            offset: NO_DATA,
            byte_len: 0,
        });
        index
    }

    /// Add a stored tensor with its converted payload.
    ///
    /// A scale of 0.0 marks the tensor as unquantized. Returns the index of
    /// the new descriptor.
    pub fn add_tensor(
        &mut self,
        name: &str,
        dims: &[i64],
        dtype: DType,
        scale: f32,
        zero_point: i32,
        data: &[u8],
    ) -> u32 {
        let index = self.tensors.len() as u32;
        let offset = self.data.len() as u64;
        self.data.extend_from_slice(data);
        debug!("Tensor {} stored at offset {} ({} bytes)", name, offset, data.len());
        self.tensors.push(PendingTensor {
            name: name.to_string(),
            dims: dims.to_vec(),
            dtype,
            scale,
            zero_point,
            offset,
            byte_len: data.len() as u64,
        });
        index
    }

    /// Record a descriptor index as a model input
    pub fn mark_input(&mut self, index: u32) {
        self.inputs.push(index);
    }

    /// Record a descriptor index as a model output
    pub fn mark_output(&mut self, index: u32) {
        self.outputs.push(index);
    }

    /// Serialize the accumulated model into MLPK bytes
    pub fn finish(self) -> Result<Vec<u8>, Box<dyn Error + Send + Sync>> {
        for &index in self.inputs.iter().chain(self.outputs.iter()) {
            if index as usize >= self.tensors.len() {
                return Err(Box::new(PackError::InvalidFormat(
                    format!("Input/output index {} out of range ({} tensors)", index, self.tensors.len())
                )));
            }
        }

        let mut out: Vec<u8> = Vec::new();

        out.write_u32::<LittleEndian>(PACK_MAGIC)?;
        out.write_u32::<LittleEndian>(PACK_VERSION)?;
        out.write_u64::<LittleEndian>(self.tensors.len() as u64)?;
        out.write_u64::<LittleEndian>(self.metadata.len() as u64)?;

        for (key, value) in &self.metadata {
            write_string(&mut out, key)?;
            write_meta_value(&mut out, value)?;
        }

        for tensor in &self.tensors {
            write_string(&mut out, &tensor.name)?;
            out.write_u32::<LittleEndian>(tensor.dims.len() as u32)?;
            for dim in &tensor.dims {
                out.write_i64::<LittleEndian>(*dim)?;
            }
            out.write_u32::<LittleEndian>(tensor.dtype.code())?;
            out.write_f32::<LittleEndian>(tensor.scale)?;
            out.write_i32::<LittleEndian>(tensor.zero_point)?;
            out.write_u64::<LittleEndian>(tensor.offset)?;
            out.write_u64::<LittleEndian>(tensor.byte_len)?;
        }

        out.write_u32::<LittleEndian>(self.inputs.len() as u32)?;
        for index in &self.inputs {
            out.write_u32::<LittleEndian>(*index)?;
        }
        out.write_u32::<LittleEndian>(self.outputs.len() as u32)?;
        for index in &self.outputs {
            out.write_u32::<LittleEndian>(*index)?;
        }

        out.write_u64::<LittleEndian>(self.data.len() as u64)?;
        out.extend_from_slice(&self.data);

        debug!("Serialized MLPK model: {} tensors, {} metadata entries, {} data bytes",
               self.tensors.len(), self.metadata.len(), self.data.len());

        Ok(out)
    }
}
