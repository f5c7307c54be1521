mod display;
mod interpreter;

// Re-export from interpreter
pub use interpreter::{Interpreter, InterpreterError, TensorDetails};
// Re-export from display
pub use display::{display_model_summary, display_tensor_table};
