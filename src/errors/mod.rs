// src/errors/mod.rs
//! Structured error reporting for the Pi compiler.
//!
//! This module provides error types using miette for fancy diagnostics.

pub mod codegen;
pub mod report;
pub mod sema;

pub use codegen::{CodegenError, CodegenErrorKind, CodegenResult};
pub use report::{render_to_string, render_to_writer};
pub use sema::SemanticError;

use miette::Diagnostic;
use thiserror::Error;

/// Any error that aborts compilation of a package.
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum CompileError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Semantic(#[from] SemanticError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Codegen(#[from] CodegenError),
}
