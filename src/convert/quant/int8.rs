use std::error::Error;
use crate::pack::DType;
use super::{check_data_availability, QuantImpl, QuantParams};

/// INT8 format - symmetric per-tensor dynamic-range quantization.
///
/// scale = absmax / 127, zero point 0; values are rounded and clamped to
/// [-127, 127] so the encoding stays symmetric around zero.
#[derive(Clone)]
pub struct Int8Format;

impl Int8Format {
    pub fn new() -> Self {
        Self {}
    }
}

impl QuantImpl for Int8Format {
    fn dtype(&self) -> DType {
        DType::Int8
    }

    fn name(&self) -> &'static str {
        "INT8"
    }

    fn clone_box(&self) -> Box<dyn QuantImpl> {
        Box::new(self.clone())
    }

    fn quantize(
        &self,
        values: &[f32],
        output: &mut Vec<u8>,
    ) -> Result<QuantParams, Box<dyn Error + Send + Sync>> {
        let absmax = values.iter().fold(0.0f32, |m, v| m.max(v.abs()));
        // An all-zero tensor still needs a usable scale
        let scale = if absmax == 0.0 { 1.0 } else { absmax / 127.0 };

        output.reserve(values.len());
        for value in values {
            let quantized = (value / scale).round().clamp(-127.0, 127.0) as i8;
            output.push(quantized as u8);
        }

        Ok(QuantParams { scale, zero_point: 0 })
    }

    fn dequantize(
        &self,
        data: &[u8],
        offset: &mut usize,
        num_elements: usize,
        params: &QuantParams,
        result: &mut Vec<f32>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        // One byte per element
        let bytes_needed = num_elements;

        check_data_availability(data, *offset, bytes_needed, "INT8")?;

        // Raw int8 tensors without parameters decode at unit scale
        let scale = if params.is_none() { 1.0 } else { params.scale };
        let zero_point = params.zero_point as f32;

        result.reserve(num_elements);
        for i in 0..num_elements {
            let quantized = data[*offset + i] as i8 as f32;
            result.push((quantized - zero_point) * scale);
        }

        *offset += bytes_needed;

        Ok(())
    }
}

/// Create a new boxed instance of this format
pub fn create_format() -> Box<dyn QuantImpl> {
    Box::new(Int8Format::new())
}
