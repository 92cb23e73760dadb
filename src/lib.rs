// src/lib.rs
//! Pi compiler backend: structural interface resolution over a package AST
//! and lowering to textual LLVM IR.

pub mod cli;
pub mod codegen;
pub mod commands;
pub mod config;
pub mod errors;
pub mod frontend;
pub mod sema;

pub use codegen::{compile_package, emit_ir};
pub use config::CodegenConfig;
pub use errors::CompileError;
