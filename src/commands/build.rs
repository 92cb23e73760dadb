// src/commands/build.rs

use std::io::Write;
use std::process::ExitCode;

use super::common::{is_stdin, load_package, report};
use crate::cli::{BuildArgs, ColorMode};
use crate::codegen::emit_ir;
use crate::config::CodegenConfig;

/// Map command-line flags onto a codegen configuration.
pub fn config_from_args(args: &BuildArgs) -> CodegenConfig {
    let mut config = CodegenConfig::default();
    if let Some(name) = &args.module_name {
        config = config.with_module_name(name);
    }
    if let Some(triple) = &args.target_triple {
        config = config.with_target_triple(triple);
    }
    if !is_stdin(&args.package) {
        config = config.with_source_filename(args.package.to_string_lossy());
    }
    if args.no_vtable_instances {
        config = config.without_vtable_instances();
    }
    config
}

/// Resolve and lower a package, writing textual IR to `-o` or stdout.
pub fn build_package(args: &BuildArgs, color: ColorMode) -> ExitCode {
    let package = match load_package(&args.package) {
        Ok(package) => package,
        Err(e) => {
            report(&e, color);
            return ExitCode::FAILURE;
        }
    };

    let config = config_from_args(args);
    let ir = match emit_ir(&package, &config) {
        Ok(ir) => ir,
        Err(e) => {
            report(&e, color);
            return ExitCode::FAILURE;
        }
    };

    let written = match &args.output {
        Some(path) => std::fs::write(path, ir).map_err(|e| (path.display().to_string(), e)),
        None => std::io::stdout()
            .write_all(ir.as_bytes())
            .map_err(|e| ("stdout".to_string(), e)),
    };
    match written {
        Ok(()) => ExitCode::SUCCESS,
        Err((target, e)) => {
            eprintln!("error: could not write '{}': {}", target, e);
            ExitCode::FAILURE
        }
    }
}
