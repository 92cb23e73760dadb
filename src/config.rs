// src/config.rs
//! Code generation settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    /// Module identifier; the package name when unset
    pub module_name: Option<String>,
    /// `source_filename` of the module; the module name when unset
    pub source_filename: Option<String>,
    pub target_triple: Option<String>,
    /// Emit a constant `@<Interface>_vtable` per interface with slots.
    /// Without it interface coercion is unavailable and struct method calls
    /// bind to their emitted names.
    pub emit_vtable_instances: bool,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        Self {
            module_name: None,
            source_filename: None,
            target_triple: None,
            emit_vtable_instances: true,
        }
    }
}

impl CodegenConfig {
    pub fn with_module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = Some(name.into());
        self
    }

    pub fn with_source_filename(mut self, name: impl Into<String>) -> Self {
        self.source_filename = Some(name.into());
        self
    }

    pub fn with_target_triple(mut self, triple: impl Into<String>) -> Self {
        self.target_triple = Some(triple.into());
        self
    }

    pub fn without_vtable_instances(mut self) -> Self {
        self.emit_vtable_instances = false;
        self
    }

    /// Module name for a package called `package`.
    pub fn module_name_for<'a>(&'a self, package: &'a str) -> &'a str {
        self.module_name.as_deref().unwrap_or(package)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_fall_back_to_package_name() {
        let config = CodegenConfig::default();
        assert!(config.emit_vtable_instances);
        assert_eq!(config.module_name_for("shapes"), "shapes");
        let named = config.with_module_name("custom");
        assert_eq!(named.module_name_for("shapes"), "custom");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: CodegenConfig = serde_json::from_str(r#"{ "target_triple": "x86_64-unknown-linux-gnu" }"#).unwrap();
        assert!(config.emit_vtable_instances);
        assert_eq!(config.target_triple.as_deref(), Some("x86_64-unknown-linux-gnu"));
    }
}
