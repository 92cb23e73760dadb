// src/sema/resolver.rs
//! Structural interface resolution.
//!
//! A struct implements an interface when its receiver methods cover the
//! interface's method set; nothing declares the relationship explicitly.
//! The resolver visits every receiver method once and records which
//! interface methods it satisfies in an [`ImplementationMap`].

use crate::errors::SemanticError;
use crate::frontend::{FnDecl, Method, Package, Receiver, TypeExpr};

use super::implementation_map::ImplementationMap;

/// Resolve every receiver method of `package` against its private interfaces.
pub fn resolve(package: &Package) -> Result<ImplementationMap, SemanticError> {
    Resolver::new(package).resolve()
}

/// Name of the struct a receiver is bound to: `T` or `*T`.
pub fn receiver_type_name<'a>(receiver: &'a Receiver, method: &str) -> Result<&'a str, SemanticError> {
    match &receiver.ty {
        TypeExpr::Named(name) => Ok(name),
        TypeExpr::Pointer(inner) => match inner.as_ref() {
            TypeExpr::Named(name) => Ok(name),
            _ => Err(SemanticError::InvalidReceiverType {
                method: method.to_string(),
            }),
        },
        _ => Err(SemanticError::InvalidReceiverType {
            method: method.to_string(),
        }),
    }
}

/// Whether `func` structurally satisfies interface method `method`.
///
/// Return types must be equal, and the parameter lists must have the same
/// length with equal mutability and equal declared type at every position.
/// Names are not compared.
pub fn implements_method(func: &FnDecl, method: &Method) -> bool {
    if func.return_type_or_void() != method.return_type {
        return false;
    }
    if func.params.len() != method.params.len() {
        return false;
    }
    func.params
        .iter()
        .zip(&method.params)
        .all(|(fp, mp)| fp.mutable == mp.mutable && fp.ty == mp.ty)
}

pub struct Resolver<'a> {
    package: &'a Package,
    map: ImplementationMap,
}

impl<'a> Resolver<'a> {
    pub fn new(package: &'a Package) -> Self {
        Self {
            package,
            map: ImplementationMap::new(),
        }
    }

    #[tracing::instrument(skip(self), fields(package = %self.package.name))]
    pub fn resolve(mut self) -> Result<ImplementationMap, SemanticError> {
        let package = self.package;
        for func in package.functions() {
            self.resolve_function(func)?;
        }
        Ok(self.map)
    }

    fn resolve_function(&mut self, func: &'a FnDecl) -> Result<(), SemanticError> {
        let Some(receiver) = &func.receiver else {
            return Ok(());
        };
        let struct_name = self.receiver_struct(receiver, &func.name)?;

        let package = self.package;
        for decl in &package.private_types {
            let Some(iface) = decl.as_interface() else {
                continue;
            };
            let method_names: Vec<&str> = iface.methods.iter().map(|m| m.name.as_str()).collect();
            for method in &iface.methods {
                if !implements_method(func, method) {
                    continue;
                }
                if self.map.record(
                    struct_name,
                    &decl.name,
                    &method_names,
                    &method.name,
                    &func.name,
                ) {
                    tracing::debug!(
                        struct_name,
                        interface = %decl.name,
                        interface_method = %method.name,
                        method = %func.name,
                        "recorded interface method match"
                    );
                }
            }
        }
        Ok(())
    }

    fn receiver_struct(&self, receiver: &'a Receiver, method: &str) -> Result<&'a str, SemanticError> {
        let name = receiver_type_name(receiver, method)?;
        let decl = self
            .package
            .find_type(name)
            .ok_or_else(|| SemanticError::UndefinedReceiverType {
                method: method.to_string(),
                type_name: name.to_string(),
            })?;
        if decl.as_struct().is_none() {
            return Err(SemanticError::ReceiverNotStruct {
                method: method.to_string(),
                type_name: name.to_string(),
            });
        }
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{
        Expr, InterfaceTypeExpr, Param, PrimitiveType, Property, Stmt, StructTypeExpr, TypeDecl,
    };

    fn shape_package() -> Package {
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
        pkg
    }

    #[test]
    fn matching_method_marks_struct_as_implementor() {
        let mut pkg = shape_package();
        pkg.push_function(
            FnDecl::method("Square", "s", "area")
                .returns(PrimitiveType::I32)
                .body(vec![Stmt::ret(Expr::Int(4))]),
        );
        let map = resolve(&pkg).unwrap();
        assert!(map.implements("Square", "Shape"));
        assert_eq!(map.interfaces_for_method("Square", "area"), vec!["Shape"]);
    }

    #[test]
    fn arity_mismatch_is_not_a_match() {
        let mut pkg = shape_package();
        pkg.push_function(
            FnDecl::method("Square", "s", "area")
                .param(Param::new("scale", PrimitiveType::I32))
                .returns(PrimitiveType::I32),
        );
        let map = resolve(&pkg).unwrap();
        assert!(!map.implements("Square", "Shape"));
        assert!(map.is_empty());
    }

    #[test]
    fn return_type_mismatch_is_not_a_match() {
        let mut pkg = shape_package();
        pkg.push_function(FnDecl::method("Square", "s", "area").returns(PrimitiveType::I64));
        assert!(resolve(&pkg).unwrap().is_empty());
    }

    #[test]
    fn parameters_compare_by_position() {
        let method = Method::new("mix", PrimitiveType::I32)
            .param(Param::new("a", PrimitiveType::I32))
            .param(Param::new("b", PrimitiveType::I64));
        let same = FnDecl::new("mix")
            .param(Param::new("x", PrimitiveType::I32))
            .param(Param::new("y", PrimitiveType::I64))
            .returns(PrimitiveType::I32);
        let swapped = FnDecl::new("mix")
            .param(Param::new("x", PrimitiveType::I64))
            .param(Param::new("y", PrimitiveType::I32))
            .returns(PrimitiveType::I32);
        let mutable = FnDecl::new("mix")
            .param(Param::new("x", PrimitiveType::I32).mutable())
            .param(Param::new("y", PrimitiveType::I64))
            .returns(PrimitiveType::I32);
        assert!(implements_method(&same, &method));
        assert!(!implements_method(&swapped, &method));
        assert!(!implements_method(&mutable, &method));
    }

    #[test]
    fn private_interfaces_only() {
        let mut pkg = Package::new("pub_iface");
        pkg.push_type(
            TypeDecl::new(
                "Shape",
                TypeExpr::Interface(InterfaceTypeExpr {
                    methods: vec![Method::new("area", PrimitiveType::I32)],
                }),
            )
            .public(),
        );
        pkg.push_type(TypeDecl::new("Square", TypeExpr::Struct(StructTypeExpr::default())));
        pkg.push_function(FnDecl::method("Square", "s", "area").returns(PrimitiveType::I32));
        assert!(resolve(&pkg).unwrap().is_empty());
    }

    #[test]
    fn undefined_receiver_is_fatal() {
        let mut pkg = shape_package();
        pkg.push_function(FnDecl::method("Circle", "c", "area").returns(PrimitiveType::I32));
        let err = resolve(&pkg).unwrap_err();
        assert!(matches!(err, SemanticError::UndefinedReceiverType { .. }));
    }

    #[test]
    fn receiver_on_interface_is_fatal() {
        let mut pkg = shape_package();
        pkg.push_function(FnDecl::method("Shape", "s", "area").returns(PrimitiveType::I32));
        let err = resolve(&pkg).unwrap_err();
        assert!(matches!(err, SemanticError::ReceiverNotStruct { .. }));
    }

    #[test]
    fn double_pointer_receiver_is_fatal() {
        let mut pkg = shape_package();
        let mut func = FnDecl::method("Square", "s", "area");
        func.receiver = Some(Receiver {
            ty: TypeExpr::pointer(TypeExpr::pointer(TypeExpr::named("Square"))),
            binder: "s".to_string(),
        });
        pkg.push_function(func);
        assert!(matches!(
            resolve(&pkg).unwrap_err(),
            SemanticError::InvalidReceiverType { .. }
        ));
    }

    #[test]
    fn one_method_may_serve_several_interfaces() {
        let mut pkg = shape_package();
        pkg.push_type(TypeDecl::new(
            "Sized",
            TypeExpr::Interface(InterfaceTypeExpr {
                methods: vec![Method::new("size", PrimitiveType::I32)],
            }),
        ));
        pkg.push_function(FnDecl::method("Square", "s", "area").returns(PrimitiveType::I32));
        let map = resolve(&pkg).unwrap();
        assert_eq!(
            map.interfaces_for_method("Square", "area"),
            vec!["Shape", "Sized"]
        );
        assert!(map.implements("Square", "Shape"));
        assert!(map.implements("Square", "Sized"));
    }

    #[test]
    fn two_candidates_for_one_interface_method_do_not_implement() {
        let mut pkg = shape_package();
        pkg.push_function(FnDecl::method("Square", "s", "area").returns(PrimitiveType::I32));
        pkg.push_function(FnDecl::method("Square", "s", "side_len").returns(PrimitiveType::I32));
        let map = resolve(&pkg).unwrap();
        assert!(!map.implements("Square", "Shape"));
        assert_eq!(map.get("Square").unwrap().matches().len(), 2);
    }
}
