// src/codegen/function.rs
//
// Function declaration (signature, dispatch, vtable registration) and body
// emission.

use inkwell::values::BasicValue;
use rustc_hash::FxHashSet;

use crate::errors::{CodegenError, CodegenResult};
use crate::frontend::{Block, FnDecl};
use crate::sema::{Dispatch, classify, receiver_type_name};

use super::compiler::Compiler;
use super::context::{Cg, Place};
use super::registry::{FunctionInfo, mangle};
use super::types::Ty;

impl Compiler<'_, '_> {
    /// Declare `func`: compute its emitted name and signature, classify its
    /// dispatch and register it either in its struct's `method_names` or as a
    /// slot of every interface it satisfies. Declaring the same function
    /// again changes nothing. Returns the emitted name.
    pub fn declare_function(&mut self, func: &FnDecl) -> CodegenResult<String> {
        let info = self.function_info(func)?;
        let emitted = info.emitted.clone();

        if let Some(existing) = self.registry.function(&emitted) {
            if *existing == info {
                return Ok(emitted);
            }
            return Err(CodegenError::duplicate_function(&emitted));
        }
        self.claim_symbol(&emitted, "function")?;

        let abi_params = info.abi_params();
        let fn_type = self.fn_type(&abi_params, &info.ret)?;

        let implementations = self.implementations;
        match (&info.dispatch, &info.receiver) {
            (Dispatch::Virtual(interfaces), Some(struct_name)) => {
                for interface in interfaces {
                    let satisfies =
                        implementations.satisfied_methods(struct_name, interface, &func.name);
                    self.extend_vtable(interface, &emitted, &abi_params, &info.ret, &satisfies)?;
                }
            }
            (_, Some(struct_name)) => {
                let entry = self
                    .registry
                    .struct_type_mut(struct_name)
                    .ok_or_else(|| CodegenError::not_found("struct", struct_name.as_str()))?;
                if !entry.has_method(&emitted) {
                    entry.method_names.push(emitted.clone());
                }
            }
            (_, None) => {}
        }

        let function = self.module.add_function(&emitted, fn_type, None);
        for (param, name) in function.get_param_iter().zip(binding_names(func)) {
            param.set_name(name);
        }

        tracing::debug!(
            function = %emitted,
            dispatch = ?info.dispatch,
            "declared function"
        );
        self.registry.add_function(info);
        Ok(emitted)
    }

    /// Signature and dispatch of `func`, lowering referenced types on demand.
    fn function_info(&mut self, func: &FnDecl) -> CodegenResult<FunctionInfo> {
        let receiver = match &func.receiver {
            Some(receiver) => {
                let name = receiver_type_name(receiver, &func.name).map_err(|_| {
                    CodegenError::unsupported_with_context("receiver type", func.name.clone())
                })?;
                match self.lower_named(name)? {
                    Ty::Struct(s) => Some(s),
                    _ => return Err(CodegenError::not_found("struct", name)),
                }
            }
            None => None,
        };

        let emitted = match &receiver {
            Some(struct_name) => mangle(struct_name, &func.name),
            None => func.name.clone(),
        };

        let mut seen = FxHashSet::default();
        for (position, name) in binding_names(func).enumerate() {
            if !seen.insert(name) {
                return Err(CodegenError::duplicate_binding(&emitted, name, position));
            }
        }

        let mut params = Vec::with_capacity(func.params.len());
        for param in &func.params {
            let ty = self.lower_type(&param.ty)?;
            if ty.is_void() {
                return Err(CodegenError::type_mismatch("parameter", "a value type", "void"));
            }
            params.push(ty);
        }
        let ret = match &func.return_type {
            Some(ty) => self.lower_type(ty)?,
            None => Ty::Void,
        };

        Ok(FunctionInfo {
            name: func.name.clone(),
            emitted,
            receiver,
            params,
            ret,
            dispatch: classify(func, self.implementations),
            external: func.body.is_none(),
        })
    }

    /// Emit the body of `func`, declaring it first if needed. Functions
    /// without a body stay declarations.
    #[tracing::instrument(skip(self, func), fields(function = %func.name))]
    pub fn emit_function(&mut self, func: &FnDecl) -> CodegenResult<()> {
        let emitted = self.declare_function(func)?;
        let Some(body) = &func.body else {
            return Ok(());
        };
        self.emit_body(func, body, &emitted)
            .map_err(|e| e.in_function(&emitted))
    }

    fn emit_body(&mut self, func: &FnDecl, body: &Block, emitted: &str) -> CodegenResult<()> {
        let info = self
            .registry
            .function(emitted)
            .cloned()
            .ok_or_else(|| CodegenError::internal_with_context("function was not declared", emitted))?;
        let function = self
            .module
            .get_function(emitted)
            .ok_or_else(|| CodegenError::internal_with_context("function missing from module", emitted))?;
        if function.count_basic_blocks() > 0 {
            return Err(CodegenError::duplicate_function(emitted));
        }

        let mut cg = Cg::new(self, function, info.ret.clone());

        // Parameters live in the body's own block.
        let mut bindings = Vec::new();
        if let (Some(receiver), Some(struct_name)) = (&func.receiver, &info.receiver) {
            bindings.push((
                receiver.binder.clone(),
                Ty::pointer(Ty::Struct(struct_name.clone())),
                false,
            ));
        }
        for (param, ty) in func.params.iter().zip(&info.params) {
            bindings.push((param.name.clone(), ty.clone(), param.mutable));
        }
        for (index, (name, ty, mutable)) in bindings.into_iter().enumerate() {
            let value = function
                .get_nth_param(index as u32)
                .ok_or_else(|| CodegenError::internal_with_context("parameter out of range", name.clone()))?;
            let slot = cg
                .builder()
                .build_alloca(cg.ctx.basic_type(&ty)?, &format!("{name}.addr"))?;
            cg.builder().build_store(slot, value)?;
            cg.bind(Place {
                ptr: slot,
                ty,
                mutable,
                name,
            });
        }

        cg.stmts(&body.stmts)?;

        if !cg.is_terminated() {
            if info.ret.is_void() {
                cg.builder().build_return(None)?;
            } else {
                return Err(CodegenError::missing_return(emitted));
            }
        }
        Ok(())
    }
}

/// Receiver binder followed by parameter names, in emitted order.
fn binding_names(func: &FnDecl) -> impl Iterator<Item = &str> {
    let receiver = func.receiver.iter().map(|r| r.binder.as_str());
    receiver.chain(func.params.iter().map(|p| p.name.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodegenConfig;
    use crate::errors::CodegenErrorKind;
    use crate::frontend::{
        Expr, InterfaceTypeExpr, Method, Package, Param, PrimitiveType, Property, Stmt,
        StructTypeExpr, TypeDecl, TypeExpr, VarDecl,
    };
    use crate::sema::resolve;
    use inkwell::context::Context;

    fn shapes() -> Package {
        let mut pkg = Package::new("shapes");
        pkg.push_type(TypeDecl::new(
            "Shape",
            TypeExpr::Interface(InterfaceTypeExpr {
                methods: vec![Method::new("area", PrimitiveType::I32)],
            }),
        ));
        pkg.push_type(TypeDecl::new(
            "Square",
            TypeExpr::Struct(StructTypeExpr {
                properties: vec![Property::new(PrimitiveType::I32, ["side"])],
            }),
        ));
        pkg.push_function(
            FnDecl::method("Square", "s", "area")
                .returns(PrimitiveType::I32)
                .body(vec![Stmt::ret(Expr::Int(4))]),
        );
        pkg.push_function(
            FnDecl::method("Square", "s", "grow")
                .param(Param::new("by", PrimitiveType::I32))
                .body(vec![]),
        );
        pkg
    }

    #[test]
    fn redeclaring_is_idempotent() {
        let context = Context::create();
        let pkg = shapes();
        let map = resolve(&pkg).unwrap();
        let config = CodegenConfig::default();
        let mut compiler = Compiler::new(&context, &pkg, &map, &config);
        compiler.lower_types().unwrap();
        for _ in 0..2 {
            for func in pkg.functions() {
                compiler.declare_function(func).unwrap();
            }
        }
        let shape = compiler.registry().interface("Shape").unwrap();
        assert_eq!(shape.slots.len(), 1);
        let square = compiler.registry().struct_type("Square").unwrap();
        assert_eq!(square.method_names, vec!["Square_grow".to_string()]);
    }

    #[test]
    fn receiver_becomes_first_parameter() {
        let context = Context::create();
        let pkg = shapes();
        let map = resolve(&pkg).unwrap();
        let config = CodegenConfig::default();
        let mut compiler = Compiler::new(&context, &pkg, &map, &config);
        compiler.lower_types().unwrap();
        compiler.declare_functions().unwrap();
        let grow = compiler.module().get_function("Square_grow").unwrap();
        assert_eq!(grow.count_params(), 2);
        assert!(grow.get_nth_param(0).unwrap().is_pointer_value());
        assert!(grow.get_nth_param(1).unwrap().is_int_value());
        assert_eq!(grow.count_basic_blocks(), 0);
    }

    #[test]
    fn different_function_with_same_name_is_rejected() {
        let context = Context::create();
        let mut pkg = shapes();
        pkg.push_function(FnDecl::new("main").returns(PrimitiveType::I32).body(vec![Stmt::ret(Expr::Int(0))]));
        pkg.push_function(FnDecl::new("main").public().body(vec![]));
        let map = resolve(&pkg).unwrap();
        let config = CodegenConfig::default();
        let mut compiler = Compiler::new(&context, &pkg, &map, &config);
        compiler.lower_types().unwrap();
        let err = compiler.declare_functions().unwrap_err();
        assert!(err.to_string().contains("main"));
    }

    #[test]
    fn repeated_parameter_name_is_rejected_with_position() {
        let context = Context::create();
        let mut pkg = Package::new("params");
        pkg.push_function(
            FnDecl::new("add")
                .param(Param::new("a", PrimitiveType::I32))
                .param(Param::new("a", PrimitiveType::I32))
                .returns(PrimitiveType::I32)
                .body(vec![Stmt::ret(Expr::ident("a"))]),
        );
        let map = resolve(&pkg).unwrap();
        let config = CodegenConfig::default();
        let mut compiler = Compiler::new(&context, &pkg, &map, &config);
        let err = compiler.declare_functions().unwrap_err();
        assert_eq!(
            err.kind,
            CodegenErrorKind::DuplicateBinding {
                function: "add".to_string(),
                name: "a".to_string(),
                position: 1,
            }
        );
        assert!(compiler.module().get_function("add").is_none());
    }

    #[test]
    fn parameter_shadowing_receiver_is_rejected() {
        let context = Context::create();
        let mut pkg = shapes();
        pkg.push_function(
            FnDecl::method("Square", "s", "resize")
                .param(Param::new("s", PrimitiveType::I32))
                .body(vec![]),
        );
        let map = resolve(&pkg).unwrap();
        let config = CodegenConfig::default();
        let mut compiler = Compiler::new(&context, &pkg, &map, &config);
        compiler.lower_types().unwrap();
        let err = compiler.declare_functions().unwrap_err();
        assert!(matches!(
            err.kind,
            CodegenErrorKind::DuplicateBinding { ref name, position: 1, .. } if name == "s"
        ));
    }

    #[test]
    fn function_named_like_a_package_variable_is_rejected() {
        let context = Context::create();
        let mut pkg = Package::new("clash");
        pkg.push_variable(VarDecl::new(PrimitiveType::I32, ["main"], vec![Expr::Int(1)]));
        pkg.push_function(FnDecl::new("main").returns(PrimitiveType::I32).body(vec![Stmt::ret(Expr::Int(0))]));
        let map = resolve(&pkg).unwrap();
        let config = CodegenConfig::default();
        let mut compiler = Compiler::new(&context, &pkg, &map, &config);
        compiler.lower_variables().unwrap();
        let err = compiler.declare_functions().unwrap_err();
        assert_eq!(
            err.kind,
            CodegenErrorKind::DuplicateSymbol {
                name: "main".to_string(),
                existing: "package variable",
                redefined_as: "function",
            }
        );
    }

    #[test]
    fn falling_off_non_void_function_is_fatal() {
        let context = Context::create();
        let mut pkg = Package::new("ret");
        pkg.push_function(FnDecl::new("answer").returns(PrimitiveType::I32).body(vec![]));
        let map = resolve(&pkg).unwrap();
        let config = CodegenConfig::default();
        let mut compiler = Compiler::new(&context, &pkg, &map, &config);
        let err = compiler.emit_functions().unwrap_err();
        assert_eq!(err.function.as_deref(), Some("answer"));
        assert!(matches!(err.kind, CodegenErrorKind::MissingReturn { .. }));
    }

    #[test]
    fn void_function_gets_implicit_return() {
        let context = Context::create();
        let mut pkg = Package::new("ret");
        pkg.push_function(FnDecl::new("noop").body(vec![]));
        let map = resolve(&pkg).unwrap();
        let config = CodegenConfig::default();
        let mut compiler = Compiler::new(&context, &pkg, &map, &config);
        compiler.emit_functions().unwrap();
        let text = compiler.module().print_to_string().to_string();
        assert!(text.contains("define void @noop() {\nentry:\n  ret void\n}"));
    }
}
