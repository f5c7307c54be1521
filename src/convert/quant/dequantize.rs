use std::error::Error;
use tracing::debug;
use crate::pack::DType;
use super::{get_format_by_dtype, QuantParams};

/// Provides utilities for decoding tensor data from its stored format
pub struct Dequantizer;

impl Dequantizer {
    /// Decodes a tensor from its stored format to f32 values
    ///
    /// # Arguments
    /// * `data` - The raw tensor data
    /// * `offset` - The offset in bytes where the tensor data starts
    /// * `total_elements` - The number of elements in the tensor
    /// * `dtype` - The stored dtype of the tensor
    /// * `params` - The tensor's quantization parameters
    ///
    /// # Returns
    /// * A vector of f32 values representing the decoded tensor
    pub fn dequantize(
        data: &[u8],
        offset: usize,
        total_elements: usize,
        dtype: DType,
        params: &QuantParams,
    ) -> Result<Vec<f32>, Box<dyn Error + Send + Sync>> {
        if let Some(format) = get_format_by_dtype(dtype) {
            let mut result = Vec::with_capacity(total_elements);
            let mut current_offset = offset;

            format.dequantize(data, &mut current_offset, total_elements, params, &mut result)?;

            debug!("Dequantized {} elements of type {:?}", total_elements, dtype);

            Ok(result)
        } else {
            Err(format!(
                "Unsupported data type for dequantization: {:?}. No format implementation available.",
                dtype
            ).into())
        }
    }
}
