// src/codegen/structs.rs
//
// Places and member access - impl Cg methods.

use inkwell::AddressSpace;
use inkwell::types::FunctionType;
use inkwell::values::{BasicValueEnum, FunctionValue, PointerValue};

use crate::errors::{CodegenError, CodegenResult};
use crate::frontend::{Expr, MemberExpr};

use super::context::{Cg, Place};
use super::registry::{mangle, vtable_global_name};
use super::types::Ty;

/// What `object.member` resolved to.
#[derive(Debug, Clone)]
pub enum Member<'ctx> {
    Field(Place<'ctx>),
    Method(Callee<'ctx>),
}

#[derive(Debug, Clone, Copy)]
pub enum CallTarget<'ctx> {
    Direct(FunctionValue<'ctx>),
    /// Function pointer loaded from a vtable
    Indirect(PointerValue<'ctx>),
}

/// A resolved call target together with the receiver it binds.
#[derive(Debug, Clone)]
pub struct Callee<'ctx> {
    pub target: CallTarget<'ctx>,
    pub fn_type: FunctionType<'ctx>,
    /// Parameter types, receiver excluded
    pub params: Vec<Ty>,
    pub ret: Ty,
    /// Prepended to the arguments
    pub receiver: Option<BasicValueEnum<'ctx>>,
    /// Emitted or interface-qualified name, for diagnostics
    pub name: String,
}

impl<'ctx> Cg<'_, '_, 'ctx> {
    /// Resolve an assignable expression to its storage.
    pub fn place(&mut self, expr: &Expr) -> CodegenResult<Place<'ctx>> {
        match expr {
            Expr::Ident(name) => self
                .lookup(name)
                .cloned()
                .ok_or_else(|| CodegenError::not_found("variable", name.as_str())),
            Expr::Member(member) => match self.member(member)? {
                Member::Field(place) => Ok(place),
                Member::Method(callee) => Err(CodegenError::unsupported_with_context(
                    "assignment target",
                    callee.name,
                )),
            },
            _ => Err(CodegenError::unsupported("assignment target")),
        }
    }

    /// Resolve `object.member` with an explicit receiver.
    pub fn member(&mut self, member: &MemberExpr) -> CodegenResult<Member<'ctx>> {
        let (object, owner) = self.object_address(&member.object)?;
        match owner {
            Ty::Struct(name) => self.struct_member(object, &name, &member.member),
            Ty::Interface(name) => self.interface_member(object, &name, &member.member),
            other => Err(CodegenError::type_mismatch(
                "member access",
                "a struct or interface",
                &other,
            )),
        }
    }

    /// Address of a struct or interface value and its aggregate type.
    /// Pointers to aggregates are followed once; rvalues are spilled.
    fn object_address(&mut self, object: &Expr) -> CodegenResult<(PointerValue<'ctx>, Ty)> {
        if matches!(object, Expr::Ident(_) | Expr::Member(_))
            && let Ok(place) = self.place(object)
        {
            return match place.ty {
                Ty::Struct(_) | Ty::Interface(_) => Ok((place.ptr, place.ty)),
                Ty::Pointer(inner) if inner.aggregate().is_some() => {
                    let ptr_ty = self.ctx.context.ptr_type(AddressSpace::default());
                    let ptr = self.builder().build_load(ptr_ty, place.ptr, "")?;
                    Ok((ptr.into_pointer_value(), *inner))
                }
                other => Err(CodegenError::type_mismatch(
                    "member access",
                    "a struct or interface",
                    &other,
                )),
            };
        }

        let value = self.expr(object, None)?;
        let raw = value.basic("member access")?;
        match value.ty {
            Ty::Struct(_) | Ty::Interface(_) => {
                let llvm_ty = self.ctx.basic_type(&value.ty)?;
                let slot = self.builder().build_alloca(llvm_ty, "tmp.addr")?;
                self.builder().build_store(slot, raw)?;
                Ok((slot, value.ty))
            }
            Ty::Pointer(inner) if inner.aggregate().is_some() => {
                Ok((raw.into_pointer_value(), *inner))
            }
            other => Err(CodegenError::type_mismatch(
                "member access",
                "a struct or interface",
                &other,
            )),
        }
    }

    /// Field GEP, direct method reference or vtable slot, in that order.
    fn struct_member(
        &mut self,
        object: PointerValue<'ctx>,
        struct_name: &str,
        name: &str,
    ) -> CodegenResult<Member<'ctx>> {
        let entry = self
            .ctx
            .registry
            .struct_type(struct_name)
            .ok_or_else(|| CodegenError::not_found("struct", struct_name))?;

        if let Some((index, field)) = entry.field(name) {
            let field = field.clone();
            let struct_ty = self.ctx.struct_type(struct_name)?;
            let ptr = self
                .builder()
                .build_struct_gep(struct_ty, object, index, &format!("{name}.ptr"))?;
            return Ok(Member::Field(Place {
                ptr,
                ty: field.ty,
                mutable: field.mutable,
                name: format!("{struct_name}.{name}"),
            }));
        }

        let emitted = mangle(struct_name, name);
        let direct = entry.has_method(&emitted);
        let Some(info) = self.ctx.registry.function(&emitted).cloned() else {
            return Err(CodegenError::unknown_member(struct_name, name));
        };
        let function = self
            .ctx
            .module
            .get_function(&emitted)
            .ok_or_else(|| CodegenError::not_found("function", emitted.as_str()))?;

        let target = if direct {
            CallTarget::Direct(function)
        } else {
            match self.ctx.registry.virtual_slot(struct_name, name) {
                Some((iface, slot)) if self.ctx.config.emit_vtable_instances => {
                    let vtable_ty = self.ctx.struct_type(&iface.vtable)?;
                    let interface = iface.name.clone();
                    let vtable = self
                        .ctx
                        .module
                        .get_global(&vtable_global_name(&interface))
                        .ok_or_else(|| CodegenError::not_found("vtable", interface.as_str()))?;
                    tracing::trace!(interface = %interface, slot, function = %emitted, "interface vtable dispatch");
                    let slot_ptr = self.builder().build_struct_gep(
                        vtable_ty,
                        vtable.as_pointer_value(),
                        slot,
                        "",
                    )?;
                    let fn_ptr = self.ctx.context.ptr_type(AddressSpace::default());
                    let loaded = self.builder().build_load(fn_ptr, slot_ptr, "")?;
                    CallTarget::Indirect(loaded.into_pointer_value())
                }
                Some(_) => CallTarget::Direct(function),
                None => return Err(CodegenError::unknown_member(struct_name, name)),
            }
        };
        Ok(Member::Method(Callee {
            target,
            fn_type: function.get_type(),
            params: info.params,
            ret: info.ret,
            receiver: Some(object.into()),
            name: emitted,
        }))
    }

    /// Load a method from the vtable behind an interface handle.
    fn interface_member(
        &mut self,
        handle: PointerValue<'ctx>,
        interface: &str,
        name: &str,
    ) -> CodegenResult<Member<'ctx>> {
        let iface = self
            .ctx
            .registry
            .interface(interface)
            .ok_or_else(|| CodegenError::not_found("interface", interface))?;
        let Some((slot, entry)) = iface.slot_for_method(name) else {
            if iface.declares(name) {
                return Err(CodegenError::not_found(
                    "vtable slot",
                    format!("{interface}.{name}"),
                ));
            }
            return Err(CodegenError::unknown_member(interface, name));
        };
        let entry = entry.clone();
        let vtable_name = iface.vtable.clone();
        let info = self
            .ctx
            .registry
            .function(&entry.function)
            .cloned()
            .ok_or_else(|| CodegenError::not_found("function", entry.function.as_str()))?;

        tracing::trace!(interface, slot, method = name, "interface handle dispatch");
        let handle_ty = self.ctx.struct_type(interface)?;
        let vtable_ty = self.ctx.struct_type(&vtable_name)?;
        let ptr_ty = self.ctx.context.ptr_type(AddressSpace::default());
        let field = self
            .builder()
            .build_struct_gep(handle_ty, handle, 0, "vtable.ptr")?;
        let vtable = self
            .builder()
            .build_load(ptr_ty, field, "vtable")?
            .into_pointer_value();
        let slot_ptr = self.builder().build_struct_gep(vtable_ty, vtable, slot, "")?;
        let target = self
            .builder()
            .build_load(ptr_ty, slot_ptr, "")?
            .into_pointer_value();

        Ok(Member::Method(Callee {
            target: CallTarget::Indirect(target),
            fn_type: self.ctx.fn_type(&entry.params, &entry.ret)?,
            params: info.params,
            ret: info.ret,
            receiver: Some(handle.into()),
            name: format!("{interface}.{name}"),
        }))
    }
}
