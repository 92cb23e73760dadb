// src/codegen/mod.rs
mod calls;
pub mod compiler;
pub mod context;
mod expr;
mod function;
mod ops;
pub mod registry;
mod stmt;
mod structs;
pub mod types;

pub use compiler::{Compiler, compile_package, emit_ir};
pub use context::Place;
pub use registry::{FunctionInfo, InterfaceType, StructType, TypeRegistry, VtableSlot, mangle};
pub use structs::{CallTarget, Callee, Member};
pub use types::{CompiledValue, Ty};
