// src/commands/common.rs
//! Shared utilities for CLI commands.

use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;

use crate::cli::ColorMode;
use crate::errors::render_to_writer;
use crate::frontend::Package;

/// Failure to obtain a package from disk or stdin.
#[derive(Error, Debug, Diagnostic)]
pub enum LoadError {
    #[error("could not read '{path}': {source}")]
    #[diagnostic(code(E0001))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("'{path}' is not a valid package: {source}")]
    #[diagnostic(code(E0002), help("expected the JSON form of a package AST"))]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// True when `path` is the stdin marker `-`.
pub fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Read and deserialize a package. `-` reads stdin.
pub fn load_package(path: &Path) -> Result<Package, LoadError> {
    let io_err = |source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    };
    let text = if is_stdin(path) {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).map_err(io_err)?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(io_err)?
    };
    let package = serde_json::from_str(&text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(package)
}

/// Render a diagnostic to stderr, honouring `--color`.
pub fn report(err: &dyn Diagnostic, color: ColorMode) {
    let fancy = match color {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => std::io::stderr().is_terminal(),
    };
    if let Err(e) = render_to_writer(err, std::io::stderr().lock(), fancy) {
        tracing::warn!(error = %e, "could not write diagnostic");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_package_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"name": "empty"}}"#).unwrap();
        let package = load_package(file.path()).unwrap();
        assert_eq!(package.name, "empty");
        assert!(package.functions().next().is_none());
    }

    #[test]
    fn bad_json_is_reported_with_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let err = load_package(file.path()).unwrap_err();
        assert!(matches!(err, LoadError::Json { .. }));
        assert!(err.to_string().contains("not a valid package"));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_package(Path::new("/nonexistent/pkg.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn dash_means_stdin() {
        assert!(is_stdin(Path::new("-")));
        assert!(!is_stdin(Path::new("pkg.json")));
    }
}
