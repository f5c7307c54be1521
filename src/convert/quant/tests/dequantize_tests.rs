use super::super::{Dequantizer, QuantParams};
use crate::pack::DType;

#[test]
fn test_dequantize_with_unsupported_type() {
    // No format implementation is registered for raw INT32 storage
    let result = Dequantizer::dequantize(
        &[0u8, 1, 2, 3],
        0,
        1,
        DType::Int32,
        &QuantParams::none(),
    );

    assert!(result.is_err());
    if let Err(e) = result {
        assert!(e.to_string().contains("Unsupported data type"));
    }
}

#[test]
fn test_dequantize_not_enough_data() {
    // Float32 needs 4 bytes per element
    let data = vec![0u8, 1, 2, 3, 4, 5, 6, 7]; // Only 8 bytes (2 float32s)

    let result = Dequantizer::dequantize(
        &data,
        0,
        3, // Asking for 3 elements (12 bytes) but only have 8
        DType::Float32,
        &QuantParams::none(),
    );

    assert!(result.is_err());
    if let Err(e) = result {
        assert!(e.to_string().contains("Not enough data"));
    }
}

#[test]
fn test_dequantize_int8_applies_scale() {
    let data = vec![2u8, (-4i8) as u8, 0];

    let result = Dequantizer::dequantize(
        &data,
        0,
        3,
        DType::Int8,
        &QuantParams { scale: 0.5, zero_point: 0 },
    ).unwrap();

    assert_eq!(result, vec![1.0, -2.0, 0.0]);
}

#[test]
fn test_dequantize_respects_offset() {
    let mut data = vec![0xffu8, 0xff]; // Garbage prefix
    data.extend_from_slice(&1.5f32.to_le_bytes());
    data.extend_from_slice(&(-3.0f32).to_le_bytes());

    let result = Dequantizer::dequantize(
        &data,
        2,
        2,
        DType::Float32,
        &QuantParams::none(),
    ).unwrap();

    assert_eq!(result, vec![1.5, -3.0]);
}
