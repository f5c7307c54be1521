use std::error::Error;
use std::fmt::{self};
use std::path::Path;
use chrono::Utc;
use tracing::{info, debug};
use crate::pack::{DType, MetaValue, PackWriter};
use crate::savedmodel::{SavedModel, TensorRecord};
use super::quant::{get_format_by_dtype, Dequantizer, QuantParams, MIN_QUANT_ELEMENTS};

/// Optimization applied while converting a saved model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Optimization {
    /// Carry every tensor as float32
    None,
    /// Dynamic-range quantization: large float32 weights become int8
    Default,
    /// Store float32 tensors as half precision
    Float16,
}

impl Optimization {
    /// Parse an optimization name as it appears in configuration
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" => Some(Optimization::None),
            "default" => Some(Optimization::Default),
            "float16" => Some(Optimization::Float16),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Optimization::None => "none",
            Optimization::Default => "default",
            Optimization::Float16 => "float16",
        }
    }
}

impl fmt::Display for Optimization {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Converts a saved model directory into the MLPK mobile-inference format.
///
/// The converter loads the source once, then `convert` serializes it with the
/// selected optimization applied to the stored tensors. The returned bytes
/// are the finished file; writing them to disk is the caller's concern.
pub struct Converter {
    source: SavedModel,
    /// Optimization applied during `convert`
    pub optimization: Optimization,
    /// Float32 weights below this element count are left unquantized
    pub min_quant_elements: usize,
}

impl Converter {
    /// Load a saved model directory as the conversion source
    pub fn from_saved_model<P: AsRef<Path>>(dir: P) -> Result<Self, Box<dyn Error + Send + Sync>> {
        let source = SavedModel::open(dir)?;
        Ok(Self {
            source,
            optimization: Optimization::None,
            min_quant_elements: MIN_QUANT_ELEMENTS,
        })
    }

    /// Name of the source model
    pub fn model_name(&self) -> &str {
        self.source.name()
    }

    /// Serialize the source into MLPK bytes with the configured optimization
    pub fn convert(&self) -> Result<Vec<u8>, Box<dyn Error + Send + Sync>> {
        let mut writer = PackWriter::new();

        writer.add_metadata("general.name", MetaValue::String(self.source.name().to_string()));
        writer.add_metadata("general.source", MetaValue::String(self.source.dir.display().to_string()));
        writer.add_metadata("general.optimization", MetaValue::String(self.optimization.name().to_string()));
        writer.add_metadata("general.converter_version", MetaValue::String(env!("CARGO_PKG_VERSION").to_string()));
        writer.add_metadata("general.created", MetaValue::String(Utc::now().to_rfc3339()));

        // Signature order is preserved in the input/output index lists
        for spec in &self.source.manifest.signature.inputs {
            let index = writer.add_io_tensor(&spec.name, &spec.shape, spec.dtype);
            writer.mark_input(index);
        }

        let mut quantized = 0usize;
        for record in &self.source.manifest.tensors {
            if self.convert_tensor(&mut writer, record)? {
                quantized += 1;
            }
        }

        for spec in &self.source.manifest.signature.outputs {
            let index = writer.add_io_tensor(&spec.name, &spec.shape, spec.dtype);
            writer.mark_output(index);
        }

        info!("Converted {}: {} stored tensors, {} quantized, optimization {}",
              self.source.name(), self.source.manifest.tensors.len(), quantized, self.optimization);

        writer.finish()
    }

    /// Convert one stored tensor, returning whether its dtype changed
    fn convert_tensor(
        &self,
        writer: &mut PackWriter,
        record: &TensorRecord,
    ) -> Result<bool, Box<dyn Error + Send + Sync>> {
        let dims: Vec<i64> = record.shape.iter().map(|d| *d as i64).collect();

        let target = self.target_dtype(record);

        if target == record.dtype {
            // Passthrough of the stored bytes
            writer.add_tensor(&record.name, &dims, record.dtype, 0.0, 0, self.source.tensor_data(record));
            return Ok(false);
        }

        let values = Dequantizer::dequantize(
            self.source.tensor_data(record),
            0,
            record.element_count() as usize,
            record.dtype,
            &QuantParams::none(),
        )?;

        let format = get_format_by_dtype(target)
            .ok_or_else(|| format!("No quantization format registered for {:?}", target))?;

        let mut data = Vec::new();
        let params = format.quantize(&values, &mut data)?;

        debug!("Tensor {} converted {} -> {} ({} elements, scale {})",
               record.name, record.dtype, target, values.len(), params.scale);

        writer.add_tensor(&record.name, &dims, target, params.scale, params.zero_point, &data);
        Ok(true)
    }

    /// Target dtype for one stored tensor under the configured optimization
    fn target_dtype(&self, record: &TensorRecord) -> DType {
        match self.optimization {
            Optimization::None => record.dtype,
            Optimization::Default => {
                // Weights only: biases and small tensors stay float32
                if record.dtype == DType::Float32
                    && record.shape.len() >= 2
                    && record.element_count() as usize >= self.min_quant_elements
                {
                    DType::Int8
                } else {
                    record.dtype
                }
            }
            Optimization::Float16 => {
                if record.dtype == DType::Float32 {
                    DType::Float16
                } else {
                    record.dtype
                }
            }
        }
    }
}
