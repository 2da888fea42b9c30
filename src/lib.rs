pub mod cmdline;
pub mod core;
pub mod environment;
pub mod evaluator;
pub mod heap;
pub mod interpreter;
pub mod macroexpand;
pub mod printer;
pub mod reader;
pub mod special_forms;
pub mod symbols;
pub mod types;

#[macro_use]
extern crate lazy_static;

mod tokens;

pub use evaluator::Error;
pub use interpreter::Interpreter;
pub use types::{ObjRef, Object};
