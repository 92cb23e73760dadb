// src/errors/codegen.rs
//! Code generation errors (E3xxx).
//!
//! Every one of these is fatal: lowering has no recovery path, the first
//! error aborts the package and no partial module is produced.
//!
//! Error code ranges:
//! - E2xxx: Semantic errors
//! - E3xxx: Codegen errors (this module)

use inkwell::builder::BuilderError;
use miette::Diagnostic;
use std::fmt;
use thiserror::Error;

/// The kind of code generation error.
#[derive(Debug, Clone, PartialEq)]
pub enum CodegenErrorKind {
    /// Expression or type form the lowerer does not handle
    UnsupportedFeature {
        feature: &'static str,
        context: Option<String>,
    },

    /// Call site supplies the wrong number of arguments
    ArgumentCount {
        function: String,
        expected: usize,
        found: usize,
    },

    /// Operand types disagree
    TypeMismatch {
        context: &'static str,
        expected: String,
        found: String,
    },

    /// Type, struct, interface, variable or function not found
    NotFound { kind: &'static str, name: String },

    /// `x.y` where `y` is neither a field nor a method of `x`
    UnknownMember { owner: String, member: String },

    /// Non-void function body falls off the end
    MissingReturn { function: String },

    /// Store into an immutable variable, parameter or field
    ImmutableAssignment { name: String },

    /// Two different functions lower to the same symbol
    DuplicateFunction { name: String },

    /// A module-level symbol is already taken by a different kind of item
    DuplicateSymbol {
        name: String,
        existing: &'static str,
        redefined_as: &'static str,
    },

    /// Receiver or parameter name bound twice in one signature
    DuplicateBinding {
        function: String,
        name: String,
        /// Zero-based position in the lowered parameter list
        position: usize,
    },

    /// Internal invariant violation, e.g. the driver broke its ordering
    InternalError {
        message: &'static str,
        context: Option<String>,
    },
}

/// Code generation error with the function being lowered, if any.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{kind}")]
pub struct CodegenError {
    pub kind: CodegenErrorKind,
    /// Emitted name of the function whose lowering failed
    pub function: Option<String>,
}

impl CodegenError {
    pub fn unsupported(feature: &'static str) -> Self {
        CodegenErrorKind::UnsupportedFeature {
            feature,
            context: None,
        }
        .into()
    }

    pub fn unsupported_with_context(feature: &'static str, context: impl Into<String>) -> Self {
        CodegenErrorKind::UnsupportedFeature {
            feature,
            context: Some(context.into()),
        }
        .into()
    }

    pub fn arg_count(function: impl Into<String>, expected: usize, found: usize) -> Self {
        CodegenErrorKind::ArgumentCount {
            function: function.into(),
            expected,
            found,
        }
        .into()
    }

    pub fn type_mismatch(
        context: &'static str,
        expected: impl fmt::Display,
        found: impl fmt::Display,
    ) -> Self {
        CodegenErrorKind::TypeMismatch {
            context,
            expected: expected.to_string(),
            found: found.to_string(),
        }
        .into()
    }

    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        CodegenErrorKind::NotFound {
            kind,
            name: name.into(),
        }
        .into()
    }

    pub fn unknown_member(owner: impl Into<String>, member: impl Into<String>) -> Self {
        CodegenErrorKind::UnknownMember {
            owner: owner.into(),
            member: member.into(),
        }
        .into()
    }

    pub fn missing_return(function: impl Into<String>) -> Self {
        CodegenErrorKind::MissingReturn {
            function: function.into(),
        }
        .into()
    }

    pub fn immutable_assignment(name: impl Into<String>) -> Self {
        CodegenErrorKind::ImmutableAssignment { name: name.into() }.into()
    }

    pub fn duplicate_function(name: impl Into<String>) -> Self {
        CodegenErrorKind::DuplicateFunction { name: name.into() }.into()
    }

    pub fn duplicate_symbol(
        name: impl Into<String>,
        existing: &'static str,
        redefined_as: &'static str,
    ) -> Self {
        CodegenErrorKind::DuplicateSymbol {
            name: name.into(),
            existing,
            redefined_as,
        }
        .into()
    }

    pub fn duplicate_binding(
        function: impl Into<String>,
        name: impl Into<String>,
        position: usize,
    ) -> Self {
        CodegenErrorKind::DuplicateBinding {
            function: function.into(),
            name: name.into(),
            position,
        }
        .into()
    }

    pub fn internal(message: &'static str) -> Self {
        CodegenErrorKind::InternalError {
            message,
            context: None,
        }
        .into()
    }

    pub fn internal_with_context(message: &'static str, context: impl Into<String>) -> Self {
        CodegenErrorKind::InternalError {
            message,
            context: Some(context.into()),
        }
        .into()
    }

    /// Attach the function being lowered; an existing one is kept.
    pub fn in_function(mut self, name: impl Into<String>) -> Self {
        if self.function.is_none() {
            self.function = Some(name.into());
        }
        self
    }
}

impl From<CodegenErrorKind> for CodegenError {
    fn from(kind: CodegenErrorKind) -> Self {
        CodegenError {
            kind,
            function: None,
        }
    }
}

impl From<BuilderError> for CodegenError {
    fn from(err: BuilderError) -> Self {
        CodegenError::internal_with_context("LLVM builder", err.to_string())
    }
}

impl Diagnostic for CodegenError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code: &'static str = match &self.kind {
            CodegenErrorKind::UnsupportedFeature { .. } => "E3001",
            CodegenErrorKind::ArgumentCount { .. } => "E3002",
            CodegenErrorKind::TypeMismatch { .. } => "E3003",
            CodegenErrorKind::NotFound { .. } => "E3004",
            CodegenErrorKind::UnknownMember { .. } => "E3005",
            CodegenErrorKind::MissingReturn { .. } => "E3006",
            CodegenErrorKind::ImmutableAssignment { .. } => "E3007",
            CodegenErrorKind::DuplicateFunction { .. } => "E3008",
            CodegenErrorKind::DuplicateSymbol { .. } => "E3009",
            CodegenErrorKind::DuplicateBinding { .. } => "E3010",
            CodegenErrorKind::InternalError { .. } => "E3099",
        };
        Some(Box::new(code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.function
            .as_ref()
            .map(|name| Box::new(format!("while lowering function '{}'", name)) as Box<dyn fmt::Display>)
    }
}

impl fmt::Display for CodegenErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodegenErrorKind::UnsupportedFeature { feature, context } => {
                write!(f, "unsupported feature: {}", feature)?;
                if let Some(ctx) = context {
                    write!(f, " ({})", ctx)?;
                }
                Ok(())
            }
            CodegenErrorKind::ArgumentCount {
                function,
                expected,
                found,
            } => {
                write!(
                    f,
                    "{} expects {} argument(s), got {}",
                    function, expected, found
                )
            }
            CodegenErrorKind::TypeMismatch {
                context,
                expected,
                found,
            } => {
                write!(f, "{}: expected {}, found {}", context, expected, found)
            }
            CodegenErrorKind::NotFound { kind, name } => {
                write!(f, "{} not found: {}", kind, name)
            }
            CodegenErrorKind::UnknownMember { owner, member } => {
                write!(f, "'{}' has no field or method '{}'", owner, member)
            }
            CodegenErrorKind::MissingReturn { function } => {
                write!(f, "function '{}' does not return a value on every path", function)
            }
            CodegenErrorKind::ImmutableAssignment { name } => {
                write!(f, "cannot assign to immutable variable '{}'", name)
            }
            CodegenErrorKind::DuplicateFunction { name } => {
                write!(f, "function '{}' is defined more than once", name)
            }
            CodegenErrorKind::DuplicateSymbol {
                name,
                existing,
                redefined_as,
            } => {
                write!(
                    f,
                    "'{}' is already defined as a {}, cannot redefine it as a {}",
                    name, existing, redefined_as
                )
            }
            CodegenErrorKind::DuplicateBinding {
                function,
                name,
                position,
            } => {
                write!(
                    f,
                    "parameter {} of '{}' rebinds '{}'",
                    position, function, name
                )
            }
            CodegenErrorKind::InternalError { message, context } => {
                write!(f, "internal error: {}", message)?;
                if let Some(ctx) = context {
                    write!(f, " ({})", ctx)?;
                }
                Ok(())
            }
        }
    }
}

/// Result type alias for codegen operations.
pub type CodegenResult<T> = Result<T, CodegenError>;
