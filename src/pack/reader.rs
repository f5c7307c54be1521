use std::error::Error;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::collections::BTreeMap;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{Seek, SeekFrom};
use tracing::{info, debug};
use super::types::{DType, MetaValue, PackError, TensorDesc, NO_DATA};
use super::pack_utils::{PACK_VERSION, is_pack_file, read_string, read_meta_value};

/// Parses the structural sections of an MLPK file.
///
/// The reader consumes everything up to the data section: header, metadata,
/// tensor descriptors and the input/output index lists. Tensor payloads are
/// not read; `data_start` records where they begin so callers can map the
/// file and slice into it.
#[derive(Debug)]
pub struct PackReader {
    /// Path to the MLPK file
    pub path: PathBuf,
    /// Format version read from the header
    pub version: u32,
    /// Number of tensor descriptors in the file
    pub tensor_count: u64,
    /// Metadata key-value pairs
    pub metadata: BTreeMap<String, MetaValue>,
    /// Descriptor for each tensor, in index order
    pub tensors: Vec<TensorDesc>,
    /// Indices of the model's input tensors
    pub inputs: Vec<u32>,
    /// Indices of the model's output tensors
    pub outputs: Vec<u32>,
    /// Absolute file offset where the data section begins
    pub data_start: u64,
    /// Size of the data section in bytes
    pub data_size: u64,
}

impl PackReader {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let path = path.as_ref().to_path_buf();

        if !is_pack_file(&path) {
            return Err(Box::new(PackError::InvalidFormat("Invalid magic number".into())));
        }

        let mut file = File::open(&path)?;
        let file_len = file.metadata()?.len();

        // Skip past the magic number
        file.seek(SeekFrom::Start(4))?;

        let version = file.read_u32::<LittleEndian>()?;
        if version != PACK_VERSION {
            return Err(Box::new(PackError::InvalidFormat(
                format!("Unsupported MLPK version: {}", version)
            )));
        }

        let tensor_count = file.read_u64::<LittleEndian>()?;
        let metadata_count = file.read_u64::<LittleEndian>()?;

        debug!("Reading MLPK file: {} tensors, {} metadata entries", tensor_count, metadata_count);

        let mut metadata: BTreeMap<String, MetaValue> = BTreeMap::new();
        for _ in 0..metadata_count {
            let key = read_string(&mut file)?;
            let value_type = file.read_u32::<LittleEndian>()?;
            let value = read_meta_value(&mut file, value_type)?;
            metadata.insert(key, value);
        }

        let tensors = read_tensor_descs(&mut file, tensor_count)?;

        let inputs = read_index_list(&mut file, tensor_count)?;
        let outputs = read_index_list(&mut file, tensor_count)?;

        let data_size = file.read_u64::<LittleEndian>()?;
        let data_start = file.stream_position()?;

        if data_start + data_size > file_len {
            return Err(Box::new(PackError::InvalidFormat(
                format!("Data section truncated: expected {} bytes at offset {}, file is {} bytes",
                        data_size, data_start, file_len)
            )));
        }

        for tensor in &tensors {
            if tensor.has_data() && tensor.offset + tensor.byte_len > data_size {
                return Err(Box::new(PackError::InvalidFormat(
                    format!("Tensor {} data range [{}, {}) exceeds data section of {} bytes",
                            tensor.name, tensor.offset, tensor.offset + tensor.byte_len, data_size)
                )));
            }
        }

        info!("Read MLPK model {}: {} tensors, {} inputs, {} outputs",
              path.display(), tensor_count, inputs.len(), outputs.len());

        Ok(Self {
            path,
            version,
            tensor_count,
            metadata,
            tensors,
            inputs,
            outputs,
            data_start,
            data_size,
        })
    }

    pub fn get_metadata_value(&self, key: &str) -> Result<MetaValue, Box<dyn Error + Send + Sync>> {
        match self.metadata.get(key) {
            Some(value) => Ok(value.clone()),
            None => Err(Box::new(PackError::MetadataNotFound(key.to_string())))
        }
    }
}

fn read_tensor_descs(file: &mut File, tensor_count: u64) -> Result<Vec<TensorDesc>, Box<dyn Error + Send + Sync>> {
    let mut tensors = Vec::with_capacity(tensor_count as usize);

    for index in 0..tensor_count {
        let name = read_string(file)?;

        let n_dims = file.read_u32::<LittleEndian>()?;
        let mut dims = Vec::with_capacity(n_dims as usize);
        for _ in 0..n_dims {
            dims.push(file.read_i64::<LittleEndian>()?);
        }

        let dtype_code = file.read_u32::<LittleEndian>()?;
        let dtype = DType::from_code(dtype_code)
            .ok_or_else(|| Box::new(PackError::InvalidFormat(
                format!("Unknown dtype code {} for tensor {}", dtype_code, name)
            )))?;

        let scale = file.read_f32::<LittleEndian>()?;
        let zero_point = file.read_i32::<LittleEndian>()?;
        let offset = file.read_u64::<LittleEndian>()?;
        let byte_len = file.read_u64::<LittleEndian>()?;

        if offset == NO_DATA && byte_len != 0 {
            return Err(Box::new(PackError::InvalidFormat(
                format!("Tensor {} has no data offset but a byte length of {}", name, byte_len)
            )));
        }

        tensors.push(TensorDesc {
            index: index as usize,
            name,
            dims,
            dtype,
            scale,
            zero_point,
            offset,
            byte_len,
        });
    }

    Ok(tensors)
}

fn read_index_list(file: &mut File, tensor_count: u64) -> Result<Vec<u32>, Box<dyn Error + Send + Sync>> {
    let count = file.read_u32::<LittleEndian>()?;
    let mut indices = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let index = file.read_u32::<LittleEndian>()?;
        if index as u64 >= tensor_count {
            return Err(Box::new(PackError::InvalidFormat(
                format!("Tensor index {} out of range ({} tensors)", index, tensor_count)
            )));
        }
        indices.push(index);
    }
    Ok(indices)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::writer::PackWriter;
    use std::io::Write;

    fn write_temp(bytes: &[u8]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_write_then_read_descriptors() {
        let mut writer = PackWriter::new();
        writer.add_metadata("general.name", MetaValue::String("toy".into()));
        writer.add_metadata("general.stored_tensors", MetaValue::Int(1));

        let input = writer.add_io_tensor("serving/input", &[-1, 4], DType::Float32);
        writer.mark_input(input);
        let weight = writer.add_tensor("dense/kernel", &[4, 2], DType::Int8, 0.5, 0, &[1, 2, 3, 4, 5, 6, 7, 8]);
        let output = writer.add_io_tensor("serving/output", &[-1, 2], DType::Float32);
        writer.mark_output(output);

        let bytes = writer.finish().unwrap();
        let file = write_temp(&bytes);

        let reader = PackReader::new(file.path()).unwrap();
        assert_eq!(reader.version, PACK_VERSION);
        assert_eq!(reader.tensor_count, 3);
        assert_eq!(reader.inputs, vec![0]);
        assert_eq!(reader.outputs, vec![2]);
        assert_eq!(reader.data_size, 8);

        let desc = &reader.tensors[weight as usize];
        assert_eq!(desc.name, "dense/kernel");
        assert_eq!(desc.dims, vec![4, 2]);
        assert_eq!(desc.dtype, DType::Int8);
        assert!(desc.is_quantized());
        assert!(desc.has_data());
        assert_eq!(desc.byte_len, 8);

        let input_desc = &reader.tensors[0];
        assert!(!input_desc.has_data());
        assert!(!input_desc.is_quantized());
        assert_eq!(input_desc.num_elements(), 4);

        let name = reader.get_metadata_value("general.name").unwrap();
        assert_eq!(name.as_str(), Some("toy"));
        assert!(reader.get_metadata_value("general.missing").is_err());
    }

    #[test]
    fn test_rejects_bad_magic() {
        let file = write_temp(b"not a pack file at all");
        let err = PackReader::new(file.path()).unwrap_err();
        assert!(err.to_string().contains("Invalid magic number"));
    }

    #[test]
    fn test_rejects_truncated_data_section() {
        let mut writer = PackWriter::new();
        writer.add_tensor("w", &[2, 2], DType::Float32, 0.0, 0, &[0u8; 16]);
        let bytes = writer.finish().unwrap();

        // Drop the last 8 bytes of the payload
        let file = write_temp(&bytes[..bytes.len() - 8]);
        let err = PackReader::new(file.path()).unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }
}
