// src/errors/sema.rs
//! Semantic analysis errors (E2xxx).

#![allow(unused_assignments)] // False positives from thiserror derive

use miette::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum SemanticError {
    #[error("receiver of method '{method}' references undefined type '{type_name}'")]
    #[diagnostic(code(E2101))]
    UndefinedReceiverType { method: String, type_name: String },

    #[error("receiver of method '{method}' must be a struct, but '{type_name}' is not")]
    #[diagnostic(code(E2102))]
    ReceiverNotStruct { method: String, type_name: String },

    #[error("invalid receiver type for method '{method}'")]
    #[diagnostic(
        code(E2103),
        help("a receiver takes the struct by value (`T`) or through one pointer (`*T`)")
    )]
    InvalidReceiverType { method: String },
}
