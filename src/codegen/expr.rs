// src/codegen/expr.rs
//
// Expression lowering - impl Cg methods.

use inkwell::context::Context;

use crate::errors::{CodegenError, CodegenResult};
use crate::frontend::{AssignExpr, Expr};

use super::context::Cg;
use super::registry::vtable_global_name;
use super::structs::Member;
use super::types::{CompiledValue, Ty};

impl<'ctx> Cg<'_, '_, 'ctx> {
    /// Lower an expression. `expected` types unconstrained literals; it is a
    /// hint, not a check.
    pub fn expr(&mut self, expr: &Expr, expected: Option<&Ty>) -> CodegenResult<CompiledValue<'ctx>> {
        match expr {
            Expr::Int(v) => Ok(int_literal(self.ctx.context, *v, expected)),
            Expr::Float(v) => Ok(float_literal(self.ctx.context, *v, expected)),
            Expr::Bool(b) => Ok(CompiledValue::new(self.ctx.bool_constant(*b), Ty::Bool)),
            Expr::Nil => self.nil(expected),
            Expr::Ident(name) => self.ident(name),
            Expr::Binary(bin) => self.binary(bin, expected),
            Expr::Assign(assign) => self.assign(assign),
            Expr::Member(member) => match self.member(member)? {
                Member::Field(place) => {
                    let ty = self.ctx.basic_type(&place.ty)?;
                    let value = self.builder().build_load(ty, place.ptr, "")?;
                    Ok(CompiledValue::new(value, place.ty))
                }
                Member::Method(callee) => Err(CodegenError::unsupported_with_context(
                    "method value outside a call",
                    callee.name,
                )),
            },
            Expr::Call(call) => self.call(call),
            Expr::Cast(cast) => self.cast(cast),
        }
    }

    /// `nil` is the zero value of the expected type: `null` for pointers.
    fn nil(&mut self, expected: Option<&Ty>) -> CodegenResult<CompiledValue<'ctx>> {
        let ty = match expected {
            Some(ty) if !ty.is_void() => ty.clone(),
            _ => return Err(CodegenError::type_mismatch("nil", "a typed context", "none")),
        };
        let value = self.ctx.null_value(&ty)?;
        Ok(CompiledValue::new(value, ty))
    }

    /// Load the current value of a variable.
    fn ident(&mut self, name: &str) -> CodegenResult<CompiledValue<'ctx>> {
        let place = self
            .lookup(name)
            .cloned()
            .ok_or_else(|| CodegenError::not_found("variable", name))?;
        let ty = self.ctx.basic_type(&place.ty)?;
        let value = self.builder().build_load(ty, place.ptr, "")?;
        Ok(CompiledValue::new(value, place.ty))
    }

    /// `target = value`; evaluates to the stored value.
    fn assign(&mut self, assign: &AssignExpr) -> CodegenResult<CompiledValue<'ctx>> {
        let place = self.place(&assign.target)?;
        if !place.mutable {
            return Err(CodegenError::immutable_assignment(&place.name));
        }
        let value = self.expr(&assign.value, Some(&place.ty))?;
        let value = self.coerce(value, &place.ty, "assignment")?;
        self.builder().build_store(place.ptr, value.basic("assignment")?)?;
        Ok(value)
    }

    /// Convert `value` to `to` where an implicit conversion exists: identity,
    /// or a struct (or pointer to one) into an interface it fully implements.
    pub fn coerce(
        &mut self,
        value: CompiledValue<'ctx>,
        to: &Ty,
        context: &'static str,
    ) -> CodegenResult<CompiledValue<'ctx>> {
        if value.ty == *to {
            return Ok(value);
        }
        let Ty::Interface(interface) = to else {
            return Err(CodegenError::type_mismatch(context, to, &value.ty));
        };
        let struct_name = match value.ty.aggregate() {
            Some(Ty::Struct(name)) => name.clone(),
            _ => return Err(CodegenError::type_mismatch(context, to, &value.ty)),
        };
        if !self.ctx.implementations.implements(&struct_name, interface) {
            return Err(CodegenError::type_mismatch(
                context,
                format!("an implementation of {interface}"),
                &struct_name,
            ));
        }
        if !self.ctx.config.emit_vtable_instances {
            return Err(CodegenError::unsupported_with_context(
                "interface value without vtable instances",
                interface.clone(),
            ));
        }
        let vtable = self
            .ctx
            .module
            .get_global(&vtable_global_name(interface))
            .ok_or_else(|| CodegenError::not_found("vtable", interface.as_str()))?;
        let handle_ty = self.ctx.struct_type(interface)?;
        let handle = self.builder().build_insert_value(
            handle_ty.get_undef(),
            vtable.as_pointer_value(),
            0,
            "",
        )?;
        tracing::trace!(interface = %interface, from = %struct_name, "built interface handle");
        Ok(CompiledValue::new(handle.into_struct_value(), to.clone()))
    }
}

/// Integer literal typed by context; `i32` when unconstrained.
fn int_literal<'ctx>(context: &'ctx Context, value: i64, expected: Option<&Ty>) -> CompiledValue<'ctx> {
    match expected {
        Some(ty @ Ty::Int { bits, signed }) => CompiledValue::new(
            context
                .custom_width_int_type(*bits)
                .const_int(value as u64, *signed),
            ty.clone(),
        ),
        Some(ty @ Ty::Float { .. }) => float_literal(context, value as f64, Some(ty)),
        _ => CompiledValue::new(
            context.i32_type().const_int(value as u64, true),
            Ty::Int { bits: 32, signed: true },
        ),
    }
}

/// Float literal typed by context; `f64` when unconstrained.
fn float_literal<'ctx>(context: &'ctx Context, value: f64, expected: Option<&Ty>) -> CompiledValue<'ctx> {
    match expected {
        Some(ty @ Ty::Float { bits: 32 }) => {
            CompiledValue::new(context.f32_type().const_float(value), ty.clone())
        }
        _ => CompiledValue::new(context.f64_type().const_float(value), Ty::Float { bits: 64 }),
    }
}
