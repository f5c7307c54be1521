use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use mlprep::convert::{run_jobs, ConversionJob, Converter, Optimization};
use mlprep::interpreter::Interpreter;
use mlprep::pack::{is_pack_file, DType};
use mlprep::savedmodel::{IoSpec, Manifest, Signature, TensorRecord, MANIFEST_FILE, MANIFEST_VERSION, WEIGHTS_FILE};

/// Write a small classifier-shaped saved model: one input, a quantizable
/// kernel, a bias that should stay float32, one output.
fn write_saved_model(dir: &Path) {
    let kernel: Vec<f32> = (0..2048).map(|i| (i as f32 - 1024.0) / 100.0).collect();
    let bias: Vec<f32> = vec![0.5; 32];

    let mut payload = Vec::new();
    for v in kernel.iter().chain(bias.iter()) {
        payload.extend_from_slice(&v.to_le_bytes());
    }

    let manifest = Manifest {
        format_version: MANIFEST_VERSION,
        name: "toy_classifier".to_string(),
        signature: Signature {
            inputs: vec![IoSpec {
                name: "serving/input".into(),
                shape: vec![-1, 8, 8, 1],
                dtype: DType::Float32,
            }],
            outputs: vec![IoSpec {
                name: "serving/scores".into(),
                shape: vec![-1, 32],
                dtype: DType::Float32,
            }],
        },
        tensors: vec![
            TensorRecord {
                name: "dense/kernel".into(),
                shape: vec![64, 32],
                dtype: DType::Float32,
                offset: 0,
                byte_len: 2048 * 4,
            },
            TensorRecord {
                name: "dense/bias".into(),
                shape: vec![32],
                dtype: DType::Float32,
                offset: 2048 * 4,
                byte_len: 32 * 4,
            },
        ],
    };

    fs::write(dir.join(MANIFEST_FILE), serde_json::to_string_pretty(&manifest).unwrap()).unwrap();
    let mut f = File::create(dir.join(WEIGHTS_FILE)).unwrap();
    f.write_all(&payload).unwrap();
}

fn convert_to(dir: &Path, optimization: Optimization, output: &Path) {
    let mut converter = Converter::from_saved_model(dir).unwrap();
    converter.optimization = optimization;
    let bytes = converter.convert().unwrap();
    fs::write(output, &bytes).unwrap();
}

#[test]
fn test_default_optimization_quantizes_weights() {
    let tmp = tempfile::tempdir().unwrap();
    let model_dir = tmp.path().join("toy_savedmodel");
    fs::create_dir(&model_dir).unwrap();
    write_saved_model(&model_dir);

    let output = tmp.path().join("toy_quant.mlpk");
    convert_to(&model_dir, Optimization::Default, &output);

    // A converted file of nonzero size exists at the expected path
    assert!(output.exists());
    assert!(fs::metadata(&output).unwrap().len() > 0);
    assert!(is_pack_file(&output));

    let mut interpreter = Interpreter::new(&output).unwrap();
    interpreter.allocate_tensors().unwrap();

    let inputs = interpreter.input_details().unwrap();
    assert_eq!(inputs.len(), 1);
    assert_eq!(inputs[0].name, "serving/input");
    assert_eq!(inputs[0].shape, vec![-1, 8, 8, 1]);
    assert_eq!(inputs[0].dtype, DType::Float32);
    // Dynamic batch resolves to 1: 8 * 8 * 1 elements of f32
    assert_eq!(inputs[0].byte_size, 64 * 4);

    let outputs = interpreter.output_details().unwrap();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].name, "serving/scores");
    assert_eq!(outputs[0].byte_size, 32 * 4);

    let all = interpreter.tensor_details().unwrap();
    let kernel = all.iter().find(|t| t.name == "dense/kernel").unwrap();
    assert_eq!(kernel.dtype, DType::Int8);
    assert!(kernel.quant.scale > 0.0);
    assert_eq!(kernel.quant.zero_point, 0);
    assert_eq!(kernel.byte_size, 2048);

    // The bias is too small to quantize and stays float32
    let bias = all.iter().find(|t| t.name == "dense/bias").unwrap();
    assert_eq!(bias.dtype, DType::Float32);
    assert!(bias.quant.is_none());

    assert_eq!(interpreter.verify_tensors().unwrap(), 2);

    let name = interpreter.get_metadata_value("general.name").unwrap();
    assert_eq!(name.as_str(), Some("toy_classifier"));
    let optimization = interpreter.get_metadata_value("general.optimization").unwrap();
    assert_eq!(optimization.as_str(), Some("default"));
}

#[test]
fn test_no_optimization_keeps_float32() {
    let tmp = tempfile::tempdir().unwrap();
    let model_dir = tmp.path().join("toy_savedmodel");
    fs::create_dir(&model_dir).unwrap();
    write_saved_model(&model_dir);

    let output = tmp.path().join("toy.mlpk");
    convert_to(&model_dir, Optimization::None, &output);

    let mut interpreter = Interpreter::new(&output).unwrap();
    interpreter.allocate_tensors().unwrap();

    for tensor in interpreter.tensor_details().unwrap() {
        assert_eq!(tensor.dtype, DType::Float32);
        assert!(tensor.quant.is_none());
    }
    assert_eq!(interpreter.verify_tensors().unwrap(), 2);
}

#[test]
fn test_float16_optimization_halves_weights() {
    let tmp = tempfile::tempdir().unwrap();
    let model_dir = tmp.path().join("toy_savedmodel");
    fs::create_dir(&model_dir).unwrap();
    write_saved_model(&model_dir);

    let output = tmp.path().join("toy_f16.mlpk");
    convert_to(&model_dir, Optimization::Float16, &output);

    let mut interpreter = Interpreter::new(&output).unwrap();
    interpreter.allocate_tensors().unwrap();

    let all = interpreter.tensor_details().unwrap();
    let kernel = all.iter().find(|t| t.name == "dense/kernel").unwrap();
    assert_eq!(kernel.dtype, DType::Float16);
    assert_eq!(kernel.byte_size, 2048 * 2);
    // Float16 carries no quantization parameters
    assert!(kernel.quant.is_none());

    let bias = all.iter().find(|t| t.name == "dense/bias").unwrap();
    assert_eq!(bias.dtype, DType::Float16);

    assert_eq!(interpreter.verify_tensors().unwrap(), 2);
}

#[test]
fn test_details_require_allocation() {
    let tmp = tempfile::tempdir().unwrap();
    let model_dir = tmp.path().join("toy_savedmodel");
    fs::create_dir(&model_dir).unwrap();
    write_saved_model(&model_dir);

    let output = tmp.path().join("toy.mlpk");
    convert_to(&model_dir, Optimization::Default, &output);

    let interpreter = Interpreter::new(&output).unwrap();
    let err = interpreter.input_details().unwrap_err();
    assert!(err.to_string().contains("allocate_tensors"));
}

#[test]
fn test_model_without_stored_tensors() {
    let tmp = tempfile::tempdir().unwrap();
    let model_dir = tmp.path().join("empty_savedmodel");
    fs::create_dir(&model_dir).unwrap();

    let manifest = Manifest {
        format_version: MANIFEST_VERSION,
        name: "empty".to_string(),
        signature: Signature {
            inputs: vec![IoSpec { name: "in".into(), shape: vec![-1, 4], dtype: DType::Float32 }],
            outputs: vec![IoSpec { name: "out".into(), shape: vec![-1, 4], dtype: DType::Float32 }],
        },
        tensors: vec![],
    };
    fs::write(model_dir.join(MANIFEST_FILE), serde_json::to_string(&manifest).unwrap()).unwrap();
    fs::write(model_dir.join(WEIGHTS_FILE), Vec::<u8>::new()).unwrap();

    let output = tmp.path().join("empty.mlpk");
    convert_to(&model_dir, Optimization::Default, &output);

    let mut interpreter = Interpreter::new(&output).unwrap();
    interpreter.allocate_tensors().unwrap();
    assert_eq!(interpreter.tensor_count(), 2);
    assert_eq!(interpreter.verify_tensors().unwrap(), 0);
}

#[test]
fn test_optional_job_failure_does_not_fail_run() {
    let tmp = tempfile::tempdir().unwrap();
    let model_dir = tmp.path().join("toy_savedmodel");
    fs::create_dir(&model_dir).unwrap();
    write_saved_model(&model_dir);

    let jobs = vec![
        ConversionJob {
            name: "classifier".into(),
            source: model_dir.clone(),
            output: tmp.path().join("classifier_quant.mlpk"),
            optional: false,
            optimization: Optimization::Default,
        },
        ConversionJob {
            name: "segmenter".into(),
            source: tmp.path().join("missing_savedmodel"),
            output: tmp.path().join("segmenter_quant.mlpk"),
            optional: true,
            optimization: Optimization::Default,
        },
    ];

    let summary = run_jobs(&jobs, 1024).unwrap();
    assert_eq!(summary.converted, 1);
    assert_eq!(summary.skipped, 1);
    assert!(tmp.path().join("classifier_quant.mlpk").exists());
    assert!(!tmp.path().join("segmenter_quant.mlpk").exists());
}

#[test]
fn test_required_job_failure_fails_run() {
    let tmp = tempfile::tempdir().unwrap();

    let jobs = vec![ConversionJob {
        name: "classifier".into(),
        source: tmp.path().join("missing_savedmodel"),
        output: tmp.path().join("classifier_quant.mlpk"),
        optional: false,
        optimization: Optimization::Default,
    }];

    let err = run_jobs(&jobs, 1024).unwrap_err();
    assert!(err.to_string().contains("not found"));
}
