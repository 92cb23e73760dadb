// src/codegen/types.rs
//
// Type lowering. Semantic types keep the signedness LLVM integer types lack;
// named declarations are lowered on first use and memoized in the registry.

use std::fmt;

use inkwell::AddressSpace;
use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum, FunctionType};
use inkwell::values::BasicValueEnum;

use crate::errors::{CodegenError, CodegenResult};
use crate::frontend::{InterfaceTypeExpr, PrimitiveType, StructTypeExpr, TypeDecl, TypeExpr};

use super::compiler::Compiler;
use super::registry::{Field, InterfaceType, StructType, VtableSlot, vtable_type_name};

/// Lowered type with signedness tracked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ty {
    Void,
    Bool,
    Int { bits: u32, signed: bool },
    Float { bits: u32 },
    Pointer(Box<Ty>),
    Struct(String),
    /// Interface handle
    Interface(String),
}

impl Ty {
    pub fn pointer(to: Ty) -> Self {
        Ty::Pointer(Box::new(to))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Ty::Void)
    }

    pub fn is_int(&self) -> bool {
        matches!(self, Ty::Int { .. })
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Ty::Float { .. })
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Ty::Pointer(_))
    }

    pub fn is_signed(&self) -> bool {
        match self {
            Ty::Int { signed, .. } => *signed,
            Ty::Float { .. } => true,
            _ => false,
        }
    }

    /// Width of integer and bool values.
    pub fn int_bits(&self) -> Option<u32> {
        match self {
            Ty::Bool => Some(1),
            Ty::Int { bits, .. } => Some(*bits),
            _ => None,
        }
    }

    /// Struct or interface this type names, looking through one pointer.
    pub fn aggregate(&self) -> Option<&Ty> {
        match self {
            Ty::Struct(_) | Ty::Interface(_) => Some(self),
            Ty::Pointer(inner) if matches!(**inner, Ty::Struct(_) | Ty::Interface(_)) => {
                Some(inner)
            }
            _ => None,
        }
    }
}

impl From<PrimitiveType> for Ty {
    fn from(prim: PrimitiveType) -> Self {
        match prim {
            PrimitiveType::Void => Ty::Void,
            PrimitiveType::Bool => Ty::Bool,
            PrimitiveType::F32 | PrimitiveType::F64 => Ty::Float { bits: prim.bits() },
            _ => Ty::Int {
                bits: prim.bits(),
                signed: prim.is_signed(),
            },
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Void => write!(f, "void"),
            Ty::Bool => write!(f, "bool"),
            Ty::Int { bits, signed: true } => write!(f, "i{bits}"),
            Ty::Int { bits, signed: false } => write!(f, "u{bits}"),
            Ty::Float { bits } => write!(f, "f{bits}"),
            Ty::Pointer(inner) => write!(f, "*{inner}"),
            Ty::Struct(name) | Ty::Interface(name) => write!(f, "{name}"),
        }
    }
}

/// Compiled value with its type. Void calls carry no value.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledValue<'ctx> {
    pub value: Option<BasicValueEnum<'ctx>>,
    pub ty: Ty,
}

impl<'ctx> CompiledValue<'ctx> {
    pub fn new(value: impl Into<BasicValueEnum<'ctx>>, ty: Ty) -> Self {
        Self {
            value: Some(value.into()),
            ty,
        }
    }

    /// Result of a void call
    pub fn void() -> Self {
        Self {
            value: None,
            ty: Ty::Void,
        }
    }

    /// The value, or a mismatch naming `context` when there is none.
    pub fn basic(&self, context: &'static str) -> CodegenResult<BasicValueEnum<'ctx>> {
        self.value
            .ok_or_else(|| CodegenError::type_mismatch(context, "a value", Ty::Void))
    }
}

impl<'ctx> Compiler<'_, 'ctx> {
    /// LLVM type of a value of type `ty`. Void has none.
    pub fn basic_type(&self, ty: &Ty) -> CodegenResult<BasicTypeEnum<'ctx>> {
        Ok(match ty {
            Ty::Void => {
                return Err(CodegenError::type_mismatch("value type", "a value type", ty));
            }
            Ty::Bool => self.context.bool_type().into(),
            Ty::Int { bits, .. } => self.context.custom_width_int_type(*bits).into(),
            Ty::Float { bits: 32 } => self.context.f32_type().into(),
            Ty::Float { .. } => self.context.f64_type().into(),
            Ty::Pointer(_) => self.context.ptr_type(AddressSpace::default()).into(),
            Ty::Struct(name) | Ty::Interface(name) => self.struct_type(name)?.into(),
        })
    }

    /// LLVM function type for an emitted parameter list and return type.
    pub fn fn_type(&self, params: &[Ty], ret: &Ty) -> CodegenResult<FunctionType<'ctx>> {
        let params = params
            .iter()
            .map(|ty| self.basic_type(ty).map(BasicMetadataTypeEnum::from))
            .collect::<CodegenResult<Vec<_>>>()?;
        Ok(match ret {
            Ty::Void => self.context.void_type().fn_type(&params, false),
            ty => self.basic_type(ty)?.fn_type(&params, false),
        })
    }

    /// Constant form of an integer literal in type `ty`.
    pub fn int_constant(&self, ty: &Ty, value: i64) -> Option<BasicValueEnum<'ctx>> {
        match ty {
            Ty::Int { bits, signed } => Some(
                self.context
                    .custom_width_int_type(*bits)
                    .const_int(value as u64, *signed)
                    .into(),
            ),
            Ty::Float { .. } => self.float_constant(ty, value as f64),
            _ => None,
        }
    }

    /// Constant form of a float literal in type `ty`.
    pub fn float_constant(&self, ty: &Ty, value: f64) -> Option<BasicValueEnum<'ctx>> {
        match ty {
            Ty::Float { bits: 32 } => Some(self.context.f32_type().const_float(value).into()),
            Ty::Float { .. } => Some(self.context.f64_type().const_float(value).into()),
            _ => None,
        }
    }

    pub fn bool_constant(&self, value: bool) -> BasicValueEnum<'ctx> {
        self.context.bool_type().const_int(value as u64, false).into()
    }

    /// All-zero constant of `ty`: `null` for pointers, `zeroinitializer`
    /// for aggregates.
    pub fn null_value(&self, ty: &Ty) -> CodegenResult<BasicValueEnum<'ctx>> {
        Ok(match self.basic_type(ty)? {
            BasicTypeEnum::IntType(t) => t.const_zero().into(),
            BasicTypeEnum::FloatType(t) => t.const_zero().into(),
            BasicTypeEnum::PointerType(t) => t.const_null().into(),
            BasicTypeEnum::StructType(t) => t.const_zero().into(),
            _ => return Err(CodegenError::unsupported_with_context("zero value", ty.to_string())),
        })
    }

    /// Lower a type expression.
    pub fn lower_type(&mut self, expr: &TypeExpr) -> CodegenResult<Ty> {
        match expr {
            TypeExpr::Primitive(prim) => Ok(Ty::from(*prim)),
            TypeExpr::Pointer(inner) => Ok(Ty::pointer(self.lower_type(inner)?)),
            TypeExpr::Named(name) => self.lower_named(name),
            TypeExpr::Struct(_) => Err(CodegenError::unsupported("anonymous struct type")),
            TypeExpr::Interface(_) => Err(CodegenError::unsupported("anonymous interface type")),
        }
    }

    /// Resolve a declared type name, lowering its declaration on first use.
    pub fn lower_named(&mut self, name: &str) -> CodegenResult<Ty> {
        if let Some(ty) = self.registry.lookup(name) {
            return Ok(ty);
        }
        let package = self.package;
        let decl = package
            .find_type(name)
            .ok_or_else(|| CodegenError::not_found("type", name))?;
        self.lower_type_decl(decl)
    }

    /// Lower one type declaration. Lowering an already lowered declaration
    /// returns the memoized type.
    #[tracing::instrument(skip(self, decl), fields(name = %decl.name))]
    pub fn lower_type_decl(&mut self, decl: &TypeDecl) -> CodegenResult<Ty> {
        if let Some(ty) = self.registry.lookup(&decl.name) {
            return Ok(ty);
        }
        match &decl.ty {
            TypeExpr::Struct(s) => self.lower_struct(&decl.name, s),
            TypeExpr::Interface(i) => self.lower_interface(&decl.name, i),
            alias => {
                if !self.in_progress.insert(decl.name.clone()) {
                    return Err(CodegenError::unsupported_with_context(
                        "recursive type alias",
                        decl.name.clone(),
                    ));
                }
                let resolved = self.lower_type(alias);
                self.in_progress.remove(&decl.name);
                let ty = resolved?;
                tracing::debug!(alias = %decl.name, target = %ty, "registered type alias");
                self.registry.add_alias(&decl.name, ty.clone());
                Ok(ty)
            }
        }
    }

    /// Create the named LLVM struct `name`, refusing names already taken.
    fn named_struct(&mut self, name: &str, kind: &'static str) -> CodegenResult<()> {
        if self.struct_types.contains_key(name) {
            return Err(CodegenError::duplicate_symbol(name, "type", kind));
        }
        let ty = self.context.opaque_struct_type(name);
        self.struct_types.insert(name.to_string(), ty);
        Ok(())
    }

    fn lower_struct(&mut self, name: &str, s: &StructTypeExpr) -> CodegenResult<Ty> {
        // Register before the body so fields may point back at the struct.
        self.named_struct(name, "struct")?;
        self.registry.register_struct(StructType::new(name));

        let mut fields = Vec::new();
        for property in &s.properties {
            let ty = self.lower_type(&property.ty)?;
            if ty.is_void() {
                return Err(CodegenError::type_mismatch("struct field", "a value type", "void"));
            }
            for field_name in &property.names {
                fields.push(Field {
                    name: field_name.clone(),
                    ty: ty.clone(),
                    mutable: property.mutable,
                    public: property.public,
                });
            }
        }

        let members = fields
            .iter()
            .map(|f| self.basic_type(&f.ty))
            .collect::<CodegenResult<Vec<_>>>()?;
        self.struct_type(name)?.set_body(&members, false);
        let entry = self
            .registry
            .struct_type_mut(name)
            .ok_or_else(|| CodegenError::internal_with_context("struct vanished from registry", name))?;
        entry.fields = fields;
        tracing::debug!(name, fields = entry.fields.len(), "lowered struct");
        Ok(Ty::Struct(name.to_string()))
    }

    /// `%I = type { ptr }` plus an opaque `%I_VTable`; the vtable body is set
    /// once every slot is known.
    fn lower_interface(&mut self, name: &str, i: &InterfaceTypeExpr) -> CodegenResult<Ty> {
        let vtable = vtable_type_name(name);
        self.named_struct(&vtable, "vtable type")?;
        self.named_struct(name, "interface")?;
        let vtable_ptr = self.context.ptr_type(AddressSpace::default());
        self.struct_type(name)?.set_body(&[vtable_ptr.into()], false);
        self.registry
            .register_interface(InterfaceType::new(name, i.methods.clone()));
        tracing::debug!(name, vtable = %vtable, "lowered interface");
        Ok(Ty::Interface(name.to_string()))
    }

    /// Append a slot for `function` to `interface`'s vtable. Lowering the
    /// same function again adds nothing. Returns the slot index if it is new.
    pub fn extend_vtable(
        &mut self,
        interface: &str,
        function: &str,
        params: &[Ty],
        ret: &Ty,
        satisfies: &[&str],
    ) -> CodegenResult<Option<u32>> {
        self.lower_named(interface)?;
        let sealed = self.vtables_sealed;
        let iface = self
            .registry
            .interface_mut(interface)
            .ok_or_else(|| CodegenError::not_found("interface", interface))?;
        if iface.slot_of_function(function).is_some() {
            return Ok(None);
        }
        if sealed {
            return Err(CodegenError::internal_with_context(
                "vtable extended after its layout was sealed",
                interface,
            ));
        }
        let slot = VtableSlot {
            function: function.to_string(),
            params: params.to_vec(),
            ret: ret.clone(),
            satisfies: satisfies.iter().map(|s| s.to_string()).collect(),
        };
        let index = iface.add_slot(slot);
        tracing::debug!(interface, function, slot = ?index, "extended vtable");
        Ok(index)
    }

    /// Give every `%I_VTable` one pointer member per slot, in slot order.
    pub(crate) fn seal_vtable_types(&mut self) -> CodegenResult<()> {
        let fn_ptr = self.context.ptr_type(AddressSpace::default());
        for iface in self.registry.interfaces() {
            let members: Vec<BasicTypeEnum<'ctx>> = vec![fn_ptr.into(); iface.slots.len()];
            self.struct_type(&iface.vtable)?.set_body(&members, false);
        }
        self.vtables_sealed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodegenConfig;
    use crate::frontend::{Method, Package, Property};
    use crate::sema::ImplementationMap;
    use inkwell::context::Context;

    fn package() -> Package {
        let mut pkg = Package::new("types");
        pkg.push_type(TypeDecl::new(
            "Node",
            TypeExpr::Struct(StructTypeExpr {
                properties: vec![
                    Property::new(PrimitiveType::I64, ["value"]),
                    Property::new(TypeExpr::pointer(TypeExpr::named("Node")), ["next", "prev"]),
                ],
            }),
        ));
        pkg.push_type(TypeDecl::new(
            "Shape",
            TypeExpr::Interface(InterfaceTypeExpr {
                methods: vec![Method::new("area", PrimitiveType::I32)],
            }),
        ));
        pkg.push_type(TypeDecl::new("Size", TypeExpr::Primitive(PrimitiveType::U32)));
        pkg.push_type(TypeDecl::new("Measure", TypeExpr::named("Size")));
        pkg.push_type(TypeDecl::new("Loop", TypeExpr::named("Loop")));
        pkg
    }

    fn node_ptr() -> Ty {
        Ty::pointer(Ty::Struct("Node".to_string()))
    }

    #[test]
    fn primitives_lower_with_signedness() {
        let context = Context::create();
        let pkg = Package::new("prims");
        let map = ImplementationMap::new();
        let config = CodegenConfig::default();
        let compiler = Compiler::new(&context, &pkg, &map, &config);
        assert_eq!(Ty::from(PrimitiveType::U8), Ty::Int { bits: 8, signed: false });
        assert_eq!(
            compiler.basic_type(&Ty::from(PrimitiveType::I64)).unwrap(),
            BasicTypeEnum::from(context.i64_type())
        );
        assert_eq!(
            compiler.basic_type(&Ty::from(PrimitiveType::F32)).unwrap(),
            BasicTypeEnum::from(context.f32_type())
        );
        assert_eq!(
            compiler.basic_type(&Ty::Bool).unwrap(),
            BasicTypeEnum::from(context.bool_type())
        );
        assert!(compiler.basic_type(&Ty::Void).is_err());
    }

    #[test]
    fn self_referential_struct_flattens_fields() {
        let context = Context::create();
        let pkg = package();
        let map = ImplementationMap::new();
        let config = CodegenConfig::default();
        let mut compiler = Compiler::new(&context, &pkg, &map, &config);
        let ty = compiler.lower_named("Node").unwrap();
        assert_eq!(ty, Ty::Struct("Node".to_string()));
        let node = compiler.struct_type("Node").unwrap();
        assert_eq!(node.count_fields(), 3);
        assert_eq!(
            node.get_field_type_at_index(0),
            Some(BasicTypeEnum::from(context.i64_type()))
        );
        assert!(node.get_field_type_at_index(1).unwrap().is_pointer_type());
        let entry = compiler.registry().struct_type("Node").unwrap();
        assert_eq!(entry.field("prev").map(|(i, _)| i), Some(2));
    }

    #[test]
    fn interface_gets_handle_and_opaque_vtable() {
        let context = Context::create();
        let pkg = package();
        let map = ImplementationMap::new();
        let config = CodegenConfig::default();
        let mut compiler = Compiler::new(&context, &pkg, &map, &config);
        compiler.lower_named("Shape").unwrap();
        let handle = compiler.struct_type("Shape").unwrap();
        assert_eq!(handle.count_fields(), 1);
        assert!(handle.get_field_type_at_index(0).unwrap().is_pointer_type());
        assert!(compiler.struct_type("Shape_VTable").unwrap().is_opaque());
    }

    #[test]
    fn vtable_grows_once_per_function() {
        let context = Context::create();
        let pkg = package();
        let map = ImplementationMap::new();
        let config = CodegenConfig::default();
        let mut compiler = Compiler::new(&context, &pkg, &map, &config);
        let i32_ty = Ty::Int { bits: 32, signed: true };
        let params = [node_ptr()];
        assert_eq!(
            compiler.extend_vtable("Shape", "Node_area", &params, &i32_ty, &["area"]).unwrap(),
            Some(0)
        );
        assert_eq!(
            compiler.extend_vtable("Shape", "Node_area", &params, &i32_ty, &["area"]).unwrap(),
            None
        );
        let shape = compiler.registry().interface("Shape").unwrap();
        assert_eq!(shape.slots.len(), 1);
        assert_eq!(shape.slots[0].ret, i32_ty);

        compiler.seal_vtable_types().unwrap();
        let vtable = compiler.struct_type("Shape_VTable").unwrap();
        assert_eq!(vtable.count_fields(), 1);
        assert!(vtable.get_field_type_at_index(0).unwrap().is_pointer_type());
    }

    #[test]
    fn sealed_vtable_rejects_new_slots() {
        let context = Context::create();
        let pkg = package();
        let map = ImplementationMap::new();
        let config = CodegenConfig::default();
        let mut compiler = Compiler::new(&context, &pkg, &map, &config);
        compiler.lower_named("Shape").unwrap();
        compiler.seal_vtable_types().unwrap();
        let err = compiler
            .extend_vtable("Shape", "Node_area", &[node_ptr()], &Ty::Void, &["area"])
            .unwrap_err();
        assert!(err.to_string().contains("sealed"));
    }

    #[test]
    fn aliases_resolve_through_chains() {
        let context = Context::create();
        let pkg = package();
        let map = ImplementationMap::new();
        let config = CodegenConfig::default();
        let mut compiler = Compiler::new(&context, &pkg, &map, &config);
        assert_eq!(
            compiler.lower_named("Measure").unwrap(),
            Ty::Int { bits: 32, signed: false }
        );
        assert!(compiler.registry().alias("Size").is_some());
    }

    #[test]
    fn recursive_alias_and_unknown_names_are_fatal() {
        let context = Context::create();
        let pkg = package();
        let map = ImplementationMap::new();
        let config = CodegenConfig::default();
        let mut compiler = Compiler::new(&context, &pkg, &map, &config);
        assert!(compiler.lower_named("Loop").is_err());
        let err = compiler.lower_named("Ghost").unwrap_err();
        assert!(err.to_string().contains("Ghost"));
    }

    #[test]
    fn struct_named_like_a_vtable_type_is_rejected() {
        let context = Context::create();
        let mut pkg = package();
        pkg.push_type(TypeDecl::new(
            "Shape_VTable",
            TypeExpr::Struct(StructTypeExpr::default()),
        ));
        let map = ImplementationMap::new();
        let config = CodegenConfig::default();
        let mut compiler = Compiler::new(&context, &pkg, &map, &config);
        compiler.lower_named("Shape").unwrap();
        let err = compiler.lower_named("Shape_VTable").unwrap_err();
        assert!(matches!(
            err.kind,
            crate::errors::CodegenErrorKind::DuplicateSymbol { .. }
        ));
    }
}
