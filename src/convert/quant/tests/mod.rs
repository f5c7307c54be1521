mod dequantize_tests;
