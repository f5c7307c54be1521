use comfy_table::{Table, Cell, ContentArrangement, Attribute, CellAlignment};
use colored::*;
use super::interpreter::{Interpreter, TensorDetails};

/// Print a summary of the loaded model: metadata, counts and file size
pub fn display_model_summary(interpreter: &Interpreter) {
    println!("\n{}", format!("Model: {}", interpreter.path.display()).bold());
    println!("{}", format!("Size: {:.2} MB, {} tensors",
            interpreter.model_size() as f64 / (1024.0 * 1024.0),
            interpreter.tensor_count()).bright_black());

    let metadata = interpreter.metadata();
    if metadata.is_empty() {
        println!("{}", "No metadata present".yellow());
        return;
    }

    let mut table = Table::new();
    table
        .set_header(vec![
            Cell::new("Key").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Value").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
        ])
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    for (key, value) in metadata {
        table.add_row(vec![
            Cell::new(key).fg(comfy_table::Color::Yellow),
            Cell::new(value.to_string()).fg(comfy_table::Color::White),
        ]);
    }

    println!("{}", table);
}

/// Print a table of tensor descriptors under a heading.
///
/// Mirrors the verification output of the original check script: index,
/// name, shape, dtype and quantization parameters for each descriptor.
pub fn display_tensor_table(title: &str, details: &[TensorDetails]) {
    println!("\n{}", format!("{}:", title).bold());

    if details.is_empty() {
        println!("{}", "  (none)".yellow());
        return;
    }

    let mut table = Table::new();
    table
        .set_header(vec![
            Cell::new("Index").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Name").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Shape").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("DType").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Quantization").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
            Cell::new("Bytes").fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold),
        ])
        .load_preset(comfy_table::presets::UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    for detail in details {
        let shape = format!("[{}]", detail.shape.iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", "));
        let quant = if detail.quant.is_none() {
            "-".to_string()
        } else {
            format!("scale={}, zero_point={}", detail.quant.scale, detail.quant.zero_point)
        };

        table.add_row(vec![
            Cell::new(detail.index.to_string()).fg(comfy_table::Color::White).set_alignment(CellAlignment::Center),
            Cell::new(&detail.name).fg(comfy_table::Color::Green),
            Cell::new(shape).fg(comfy_table::Color::Magenta).set_alignment(CellAlignment::Center),
            Cell::new(detail.dtype.to_string()).fg(comfy_table::Color::Cyan).set_alignment(CellAlignment::Center),
            Cell::new(quant).fg(comfy_table::Color::Yellow),
            Cell::new(detail.byte_size.to_string()).fg(comfy_table::Color::White).set_alignment(CellAlignment::Right),
        ]);
    }

    println!("{}", table);
}
