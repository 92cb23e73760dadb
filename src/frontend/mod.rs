// src/frontend/mod.rs
pub mod ast;

pub use ast::*;
