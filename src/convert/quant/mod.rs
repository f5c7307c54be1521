// Explicit module imports for better IDE support
pub mod float32;
pub mod float16;
pub mod int8;

mod dequantize;
pub use dequantize::Dequantizer;

#[cfg(test)]
mod tests;

use std::error::Error;
use std::sync::Mutex;
use once_cell::sync::Lazy;
use serde::Serialize;
use crate::pack::DType;

/// Weight tensors below this element count are left unquantized by the
/// dynamic-range pass, matching the converter defaults of the mobile runtime
pub const MIN_QUANT_ELEMENTS: usize = 1024;

/// Per-tensor quantization parameters.
///
/// real_value = scale * (quantized_value - zero_point). A scale of 0.0 marks
/// the tensor as unquantized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuantParams {
    pub scale: f32,
    pub zero_point: i32,
}

impl QuantParams {
    /// Parameters for an unquantized tensor
    pub fn none() -> Self {
        Self { scale: 0.0, zero_point: 0 }
    }

    pub fn is_none(&self) -> bool {
        self.scale == 0.0
    }
}

/// Trait that all quantization format implementations must implement
pub trait QuantImpl: Send + Sync + 'static {
    /// Returns the target dtype this implementation handles
    fn dtype(&self) -> DType;

    /// Name of the format
    fn name(&self) -> &'static str;

    /// Clone this format implementation
    fn clone_box(&self) -> Box<dyn QuantImpl>;

    /// Encode f32 values into this format, appending to `output`.
    /// Returns the quantization parameters needed to decode them again.
    fn quantize(
        &self,
        values: &[f32],
        output: &mut Vec<u8>,
    ) -> Result<QuantParams, Box<dyn Error + Send + Sync>>;

    /// Decode the data back to f32 values
    fn dequantize(
        &self,
        data: &[u8],
        offset: &mut usize,
        num_elements: usize,
        params: &QuantParams,
        result: &mut Vec<f32>,
    ) -> Result<(), Box<dyn Error + Send + Sync>>;
}

// When adding a new format:
// 1. Create your format file (e.g., int16.rs)
// 2. Add it as a pub mod above
// 3. Add it to the formats list below

// Registry of format implementations
static QUANT_REGISTRY: Lazy<Mutex<Vec<Box<dyn QuantImpl>>>> = Lazy::new(|| {
    let mut registry: Vec<Box<dyn QuantImpl>> = Vec::new();

    // Register all implemented formats
    registry.push(float32::create_format());
    registry.push(float16::create_format());
    registry.push(int8::create_format());
    // Add new formats here when implemented

    Mutex::new(registry)
});

/// Get a format implementation by target dtype
pub fn get_format_by_dtype(dtype: DType) -> Option<Box<dyn QuantImpl>> {
    let registry = QUANT_REGISTRY.lock().unwrap();

    for format in registry.iter() {
        if format.dtype() == dtype {
            // Create a new instance by cloning the implementation
            return Some(format.clone_box());
        }
    }

    None
}

/// Ensure a slice holds at least `bytes_needed` bytes past `offset`
pub(crate) fn check_data_availability(
    data: &[u8],
    offset: usize,
    bytes_needed: usize,
    format: &str,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    if offset + bytes_needed > data.len() {
        let available = if data.len() > offset { data.len() - offset } else { 0 };
        return Err(format!(
            "Not enough data to read {} values. Need {} bytes, but only have {}",
            format, bytes_needed, available
        ).into());
    }
    Ok(())
}
