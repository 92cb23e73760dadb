// src/cli/args.rs

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Color output mode
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect based on terminal
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

/// Pi compiler backend
#[derive(Parser)]
#[command(name = "pi")]
#[command(version)]
#[command(about = "Pi compiler backend: interface resolution and LLVM IR generation", long_about = None)]
pub struct Cli {
    /// Color output: auto, always, never
    #[arg(long, global = true, hide = true, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Lower a package to textual LLVM IR
    #[command(visible_alias = "b")]
    Build(BuildArgs),
    /// Resolve interfaces and report what each struct implements
    #[command(visible_alias = "c")]
    Check {
        /// Package JSON file, or "-" for stdin
        #[arg(value_name = "PACKAGE")]
        package: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Package JSON file, or "-" for stdin
    #[arg(value_name = "PACKAGE")]
    pub package: PathBuf,

    /// Write IR here instead of stdout
    #[arg(short, long, value_name = "OUT")]
    pub output: Option<PathBuf>,

    /// Module identifier (defaults to the package name)
    #[arg(long)]
    pub module_name: Option<String>,

    /// Target triple recorded in the module
    #[arg(long)]
    pub target_triple: Option<String>,

    /// Do not emit vtable constants; struct method calls stay direct
    #[arg(long)]
    pub no_vtable_instances: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_build_flags() {
        let cli = Cli::try_parse_from([
            "pi",
            "build",
            "shapes.json",
            "-o",
            "shapes.ll",
            "--target-triple",
            "x86_64-unknown-linux-gnu",
        ])
        .unwrap();
        let Commands::Build(args) = cli.command else {
            panic!("expected build");
        };
        assert_eq!(args.package, PathBuf::from("shapes.json"));
        assert_eq!(args.output, Some(PathBuf::from("shapes.ll")));
        assert_eq!(args.target_triple.as_deref(), Some("x86_64-unknown-linux-gnu"));
        assert!(!args.no_vtable_instances);
    }

    #[test]
    fn check_accepts_stdin_marker() {
        let cli = Cli::try_parse_from(["pi", "check", "-"]).unwrap();
        assert!(matches!(cli.command, Commands::Check { package } if package == PathBuf::from("-")));
    }
}
