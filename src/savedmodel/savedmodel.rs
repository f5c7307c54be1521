use std::collections::HashSet;
use std::error::Error;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use memmap2::Mmap;
use tracing::{info, debug};
use super::types::{Manifest, SavedModelError, TensorRecord, MANIFEST_FILE, MANIFEST_VERSION, WEIGHTS_FILE};

/// A trained model loaded from its directory representation.
///
/// The directory holds a JSON manifest describing the serving signature and
/// the layout of the stored tensors, plus a flat little-endian payload file
/// the manifest indexes into. The payload is memory-mapped; tensor data is
/// borrowed out of the map rather than copied.
#[derive(Debug)]
pub struct SavedModel {
    /// Directory the model was loaded from
    pub dir: PathBuf,
    /// Parsed and validated manifest
    pub manifest: Manifest,
    /// Memory-mapped tensor payload
    data: Mmap,
}

impl SavedModel {
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let dir = dir.as_ref().to_path_buf();

        if !dir.is_dir() {
            return Err(Box::new(SavedModelError::NotFound(dir)));
        }

        let manifest_path = dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(Box::new(SavedModelError::NotFound(manifest_path)));
        }

        let content = fs::read_to_string(&manifest_path)?;
        let manifest: Manifest = serde_json::from_str(&content)
            .map_err(|e| Box::new(SavedModelError::InvalidManifest(format!("{}: {}", manifest_path.display(), e))))?;

        if manifest.format_version != MANIFEST_VERSION {
            return Err(Box::new(SavedModelError::InvalidManifest(
                format!("Unsupported manifest version: {}", manifest.format_version)
            )));
        }

        let weights_path = dir.join(WEIGHTS_FILE);
        if !weights_path.exists() {
            return Err(Box::new(SavedModelError::NotFound(weights_path)));
        }

        let file = File::open(&weights_path)?;
        let data = unsafe { Mmap::map(&file)? };

        validate_records(&manifest, data.len() as u64)?;

        info!("Opened saved model {} from {}: {} stored tensors, {} inputs, {} outputs",
              manifest.name, dir.display(), manifest.tensors.len(),
              manifest.signature.inputs.len(), manifest.signature.outputs.len());

        Ok(Self { dir, manifest, data })
    }

    /// Borrow the raw payload bytes of one stored tensor.
    ///
    /// The range was bounds-checked against the payload when the model was
    /// opened.
    pub fn tensor_data(&self, record: &TensorRecord) -> &[u8] {
        let start = record.offset as usize;
        let end = start + record.byte_len as usize;
        &self.data[start..end]
    }

    /// Name of the model as recorded in the manifest
    pub fn name(&self) -> &str {
        &self.manifest.name
    }

    /// Size of the tensor payload in bytes
    pub fn payload_size(&self) -> u64 {
        self.data.len() as u64
    }
}

fn validate_records(manifest: &Manifest, payload_len: u64) -> Result<(), Box<dyn Error + Send + Sync>> {
    let mut seen: HashSet<&str> = HashSet::new();

    for record in &manifest.tensors {
        if !seen.insert(record.name.as_str()) {
            return Err(Box::new(SavedModelError::InvalidManifest(
                format!("Duplicate tensor name: {}", record.name)
            )));
        }

        let end = record.offset.checked_add(record.byte_len)
            .ok_or_else(|| Box::new(SavedModelError::InvalidManifest(
                format!("Tensor {} offset overflows", record.name)
            )))?;
        if end > payload_len {
            return Err(Box::new(SavedModelError::InvalidManifest(
                format!("Tensor {} data range [{}, {}) exceeds payload of {} bytes",
                        record.name, record.offset, end, payload_len)
            )));
        }

        let expected = record.element_count() * record.dtype.size() as u64;
        if record.byte_len != expected {
            return Err(Box::new(SavedModelError::InvalidManifest(
                format!("Tensor {} byte length {} does not match shape {:?} of {} ({} bytes expected)",
                        record.name, record.byte_len, record.shape, record.dtype, expected)
            )));
        }

        debug!("Validated tensor {}: {:?} {} at offset {}",
               record.name, record.shape, record.dtype, record.offset);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pack::DType;
    use crate::savedmodel::types::{IoSpec, Signature};
    use std::io::Write;

    fn manifest_with_one_tensor(byte_len: u64) -> Manifest {
        Manifest {
            format_version: MANIFEST_VERSION,
            name: "toy".to_string(),
            signature: Signature {
                inputs: vec![IoSpec { name: "input".into(), shape: vec![-1, 2], dtype: DType::Float32 }],
                outputs: vec![IoSpec { name: "output".into(), shape: vec![-1, 1], dtype: DType::Float32 }],
            },
            tensors: vec![TensorRecord {
                name: "w".into(),
                shape: vec![2, 1],
                dtype: DType::Float32,
                offset: 0,
                byte_len,
            }],
        }
    }

    fn write_model(dir: &Path, manifest: &Manifest, payload: &[u8]) {
        let json = serde_json::to_string_pretty(manifest).unwrap();
        fs::write(dir.join(MANIFEST_FILE), json).unwrap();
        let mut f = File::create(dir.join(WEIGHTS_FILE)).unwrap();
        f.write_all(payload).unwrap();
    }

    #[test]
    fn test_open_and_read_tensor() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = manifest_with_one_tensor(8);
        let payload: Vec<u8> = [1.5f32, -2.0f32].iter().flat_map(|v| v.to_le_bytes()).collect();
        write_model(dir.path(), &manifest, &payload);

        let model = SavedModel::open(dir.path()).unwrap();
        assert_eq!(model.name(), "toy");
        assert_eq!(model.payload_size(), 8);

        let record = &model.manifest.tensors[0];
        assert_eq!(record.element_count(), 2);
        assert_eq!(model.tensor_data(record), payload.as_slice());
    }

    #[test]
    fn test_missing_directory() {
        let err = SavedModel::open("/nonexistent/model_dir").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_rejects_out_of_bounds_tensor() {
        let dir = tempfile::tempdir().unwrap();
        let manifest = manifest_with_one_tensor(8);
        // Payload is shorter than the manifest claims
        write_model(dir.path(), &manifest, &[0u8; 4]);

        let err = SavedModel::open(dir.path()).unwrap_err();
        assert!(err.to_string().contains("exceeds payload"));
    }

    #[test]
    fn test_rejects_shape_length_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        // shape [2, 1] of f32 needs 8 bytes, not 12
        let manifest = manifest_with_one_tensor(12);
        write_model(dir.path(), &manifest, &[0u8; 12]);

        let err = SavedModel::open(dir.path()).unwrap_err();
        assert!(err.to_string().contains("does not match shape"));
    }
}
