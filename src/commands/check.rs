// src/commands/check.rs

use std::fmt::Write;
use std::path::Path;
use std::process::ExitCode;

use super::common::{load_package, report};
use crate::cli::ColorMode;
use crate::sema::{ImplementationMap, resolve};

/// Resolve a package and print what each struct implements.
pub fn check_package(path: &Path, color: ColorMode) -> ExitCode {
    let package = match load_package(path) {
        Ok(package) => package,
        Err(e) => {
            report(&e, color);
            return ExitCode::FAILURE;
        }
    };
    match resolve(&package) {
        Ok(map) => {
            print!("{}", summarize(&map));
            ExitCode::SUCCESS
        }
        Err(e) => {
            report(&e, color);
            ExitCode::FAILURE
        }
    }
}

/// One block per struct with any match:
///
/// ```text
/// Square implements Shape
///   area -> Shape.area
/// ```
pub fn summarize(map: &ImplementationMap) -> String {
    let mut out = String::new();
    for (name, entry) in map.iter() {
        let implements = entry.implements();
        if implements.is_empty() {
            let _ = writeln!(out, "{name} implements nothing");
        } else {
            let _ = writeln!(out, "{name} implements {}", implements.join(", "));
        }
        for m in entry.matches() {
            let _ = writeln!(out, "  {} -> {}.{}", m.method, m.interface, m.interface_method);
        }
    }
    out
}
