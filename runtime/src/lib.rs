//! Mino Runtime
//!
//! Executes a checked [`compiler::Program`] by walking its statements.
//!
//! # Architecture
//!
//! - **Heap**: arena of instances addressed by [`InstanceId`]; identity is id
//!   equality. Integer, Float and String values are interned, Booleans are two
//!   fixed instances.
//! - **Frames**: one [`Frame`] per active call, holding the receiver, locals
//!   and the location being executed, which feeds the stack trace.
//! - **Dispatch**: calls and operators look the receiver's concrete class up
//!   in the dispatch tables built by the front-end.
//! - **Primitives**: native bodies for the built-in classes.

pub mod error;
pub mod frame;
pub mod heap;
pub mod interpreter;
pub mod primitives;

pub use error::{InterpreterError, RuntimeErrorKind, RuntimeResult, StackEntry};
pub use frame::Frame;
pub use heap::{Heap, Instance, InstanceData, InstanceId, Value};
pub use interpreter::{Flow, Interpreter, InterpreterOptions, DEFAULT_MAX_CALL_DEPTH};
pub use primitives::{float_to_string, PrimitiveError};

use compiler::Program;
use std::io::Write;

/// Run `program` with default options, writing program output to `out`
pub fn run_program<W: Write>(program: &Program, out: W) -> RuntimeResult<W> {
    let mut interpreter = Interpreter::new(program, out);
    interpreter.run()?;
    Ok(interpreter.into_output())
}
