use std::error::Error;
use crate::pack::DType;
use super::{check_data_availability, QuantImpl, QuantParams};

/// FLOAT32 format - direct storage of 32-bit floating point values
#[derive(Clone)]
pub struct Float32Format;

impl Float32Format {
    pub fn new() -> Self {
        Self {}
    }
}

impl QuantImpl for Float32Format {
    fn dtype(&self) -> DType {
        DType::Float32
    }

    fn name(&self) -> &'static str {
        "FLOAT32"
    }

    fn clone_box(&self) -> Box<dyn QuantImpl> {
        Box::new(self.clone())
    }

    fn quantize(
        &self,
        values: &[f32],
        output: &mut Vec<u8>,
    ) -> Result<QuantParams, Box<dyn Error + Send + Sync>> {
        output.reserve(values.len() * 4);
        for value in values {
            output.extend_from_slice(&value.to_le_bytes());
        }
        Ok(QuantParams::none())
    }

    fn dequantize(
        &self,
        data: &[u8],
        offset: &mut usize,
        num_elements: usize,
        _params: &QuantParams,
        result: &mut Vec<f32>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        // For FLOAT32, we need 4 bytes per element
        let bytes_needed = num_elements * 4;

        check_data_availability(data, *offset, bytes_needed, "FLOAT32")?;

        result.reserve(num_elements);
        for i in 0..num_elements {
            let pos = *offset + i * 4;
            let bytes: [u8; 4] = data[pos..pos + 4].try_into()?;
            result.push(f32::from_le_bytes(bytes));
        }

        *offset += bytes_needed;

        Ok(())
    }
}

/// Create a new boxed instance of this format
pub fn create_format() -> Box<dyn QuantImpl> {
    Box::new(Float32Format::new())
}
