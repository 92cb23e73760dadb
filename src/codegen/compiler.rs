// src/codegen/compiler.rs
//
// Package driver. Lowers all type declarations, then package variables,
// then declares every function (private first, then public), seals the
// vtable layouts and finally emits bodies in the same order. No body is
// lowered before every slot offset is final.

use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::targets::TargetTriple;
use inkwell::types::StructType;
use inkwell::values::BasicValueEnum;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::CodegenConfig;
use crate::errors::{CodegenError, CodegenResult, CompileError};
use crate::frontend::{Expr, Package, VarDecl};
use crate::sema::{ImplementationMap, resolve};

use super::context::Place;
use super::registry::{TypeRegistry, vtable_global_name};
use super::types::Ty;

/// Resolve and lower a package into a verified module.
#[tracing::instrument(skip(context, package, config), fields(package = %package.name))]
pub fn compile_package<'ctx>(
    context: &'ctx Context,
    package: &Package,
    config: &CodegenConfig,
) -> Result<Module<'ctx>, CompileError> {
    let implementations = resolve(package)?;
    let mut compiler = Compiler::new(context, package, &implementations, config);
    compiler.compile()?;
    Ok(compiler.finish())
}

/// Compile a package in a fresh context and print the module as textual IR.
pub fn emit_ir(package: &Package, config: &CodegenConfig) -> Result<String, CompileError> {
    let context = Context::create();
    let module = compile_package(&context, package, config)?;
    Ok(module.print_to_string().to_string())
}

pub struct Compiler<'a, 'ctx> {
    pub(crate) context: &'ctx Context,
    pub(crate) module: Module<'ctx>,
    pub(crate) builder: Builder<'ctx>,
    pub(crate) package: &'a Package,
    pub(crate) implementations: &'a ImplementationMap,
    pub(crate) config: &'a CodegenConfig,
    pub(crate) registry: TypeRegistry,
    /// Named LLVM structs: declared structs, interface handles, vtables
    pub(crate) struct_types: FxHashMap<String, StructType<'ctx>>,
    /// Package variables by name
    pub(crate) globals: FxHashMap<String, Place<'ctx>>,
    /// Alias declarations currently being resolved
    pub(crate) in_progress: FxHashSet<String>,
    pub(crate) vtables_sealed: bool,
}

impl<'a, 'ctx> Compiler<'a, 'ctx> {
    pub fn new(
        context: &'ctx Context,
        package: &'a Package,
        implementations: &'a ImplementationMap,
        config: &'a CodegenConfig,
    ) -> Self {
        let module = context.create_module(config.module_name_for(&package.name));
        if let Some(file) = &config.source_filename {
            module.set_source_file_name(file);
        }
        if let Some(triple) = &config.target_triple {
            module.set_triple(&TargetTriple::create(triple));
        }
        Self {
            context,
            module,
            builder: context.create_builder(),
            package,
            implementations,
            config,
            registry: TypeRegistry::new(),
            struct_types: FxHashMap::default(),
            globals: FxHashMap::default(),
            in_progress: FxHashSet::default(),
            vtables_sealed: false,
        }
    }

    /// Run every phase in order and verify the result.
    pub fn compile(&mut self) -> CodegenResult<()> {
        self.lower_types()?;
        self.lower_variables()?;
        self.declare_functions()?;
        self.seal_vtables()?;
        self.emit_functions()?;
        self.module.verify().map_err(|e| {
            CodegenError::internal_with_context("module verification failed", e.to_string())
        })
    }

    pub fn lower_types(&mut self) -> CodegenResult<()> {
        let package = self.package;
        for decl in package.types() {
            self.lower_type_decl(decl)?;
        }
        Ok(())
    }

    /// First pass: signatures, dispatch and vtable slots.
    pub fn declare_functions(&mut self) -> CodegenResult<()> {
        let package = self.package;
        for func in package.functions() {
            self.declare_function(func)?;
        }
        Ok(())
    }

    /// Fix every vtable layout and emit the vtable instances. Runs once.
    pub fn seal_vtables(&mut self) -> CodegenResult<()> {
        if self.vtables_sealed {
            return Ok(());
        }
        self.seal_vtable_types()?;
        if self.config.emit_vtable_instances {
            self.emit_vtable_instances()?;
        }
        Ok(())
    }

    /// Second pass: bodies. Declares and seals first when that has not
    /// happened yet.
    pub fn emit_functions(&mut self) -> CodegenResult<()> {
        self.declare_functions()?;
        self.seal_vtables()?;
        let package = self.package;
        for func in package.functions() {
            self.emit_function(func)?;
        }
        Ok(())
    }

    pub fn lower_variables(&mut self) -> CodegenResult<()> {
        let package = self.package;
        for decl in package.variables() {
            self.lower_package_variable(decl)?;
        }
        Ok(())
    }

    fn lower_package_variable(&mut self, decl: &VarDecl) -> CodegenResult<()> {
        let ty = self.lower_type(&decl.ty)?;
        if ty.is_void() {
            return Err(CodegenError::type_mismatch("package variable", "a value type", "void"));
        }
        let llvm_ty = self.basic_type(&ty)?;
        if decl.values.len() > decl.names.len() {
            tracing::warn!(
                names = decl.names.len(),
                values = decl.values.len(),
                "extra package variable initializers ignored"
            );
        }
        for (i, name) in decl.names.iter().enumerate() {
            self.claim_symbol(name, "package variable")?;
            let init = match decl.values.get(i).or(decl.values.first()) {
                Some(expr) => self.constant_initializer(expr, &ty)?,
                None => self.null_value(&ty)?,
            };
            let global = self.module.add_global(llvm_ty, None, name);
            global.set_linkage(Linkage::Private);
            global.set_constant(!decl.mutable);
            global.set_initializer(&init);
            self.globals.insert(
                name.clone(),
                Place {
                    ptr: global.as_pointer_value(),
                    ty: ty.clone(),
                    mutable: decl.mutable,
                    name: name.clone(),
                },
            );
        }
        Ok(())
    }

    /// One constant vtable per interface that received slots.
    fn emit_vtable_instances(&mut self) -> CodegenResult<()> {
        for iface in self.registry.interfaces() {
            if iface.slots.is_empty() {
                continue;
            }
            let name = vtable_global_name(&iface.name);
            self.claim_symbol(&name, "vtable instance")?;
            let members = iface
                .slots
                .iter()
                .map(|slot| {
                    self.module
                        .get_function(&slot.function)
                        .map(|f| f.as_global_value().as_pointer_value().into())
                        .ok_or_else(|| CodegenError::not_found("function", slot.function.as_str()))
                })
                .collect::<CodegenResult<Vec<BasicValueEnum<'ctx>>>>()?;
            let vtable = self.struct_type(&iface.vtable)?;
            let global = self.module.add_global(vtable, None, &name);
            global.set_linkage(Linkage::Private);
            global.set_constant(true);
            global.set_initializer(&vtable.const_named_struct(&members));
            tracing::debug!(name = %name, slots = members.len(), "emitted vtable instance");
        }
        Ok(())
    }

    /// Kind of the module-level item already called `name`, if any.
    fn symbol_kind(&self, name: &str) -> Option<&'static str> {
        if self.module.get_function(name).is_some() {
            Some("function")
        } else if self.globals.contains_key(name) {
            Some("package variable")
        } else if self.module.get_global(name).is_some() {
            Some("vtable instance")
        } else {
            None
        }
    }

    /// Fail unless `name` is still free for an item of kind `kind`.
    pub(crate) fn claim_symbol(&self, name: &str, kind: &'static str) -> CodegenResult<()> {
        match self.symbol_kind(name) {
            Some(existing) => Err(CodegenError::duplicate_symbol(name, existing, kind)),
            None => Ok(()),
        }
    }

    /// Literal initializer of a package variable.
    fn constant_initializer(&self, expr: &Expr, ty: &Ty) -> CodegenResult<BasicValueEnum<'ctx>> {
        let value = match (expr, ty) {
            (Expr::Int(v), _) => self.int_constant(ty, *v),
            (Expr::Float(v), _) => self.float_constant(ty, *v),
            (Expr::Bool(b), Ty::Bool) => Some(self.bool_constant(*b)),
            (Expr::Bool(_), _) => None,
            (Expr::Nil, _) => Some(self.null_value(ty)?),
            _ => {
                return Err(CodegenError::unsupported(
                    "non-literal package variable initializer",
                ));
            }
        };
        value.ok_or_else(|| {
            CodegenError::type_mismatch("package variable initializer", ty, literal_kind(expr))
        })
    }

    /// The named LLVM struct registered as `name`.
    pub fn struct_type(&self, name: &str) -> CodegenResult<StructType<'ctx>> {
        self.struct_types
            .get(name)
            .copied()
            .ok_or_else(|| CodegenError::not_found("type", name))
    }

    pub fn module(&self) -> &Module<'ctx> {
        &self.module
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn implementations(&self) -> &ImplementationMap {
        self.implementations
    }

    pub fn finish(self) -> Module<'ctx> {
        self.module
    }
}

fn literal_kind(expr: &Expr) -> &'static str {
    match expr {
        Expr::Int(_) => "integer literal",
        Expr::Float(_) => "float literal",
        Expr::Bool(_) => "bool literal",
        _ => "expression",
    }
}
