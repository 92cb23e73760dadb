// src/codegen/calls.rs
//
// Call lowering - impl Cg methods.

use inkwell::values::BasicMetadataValueEnum;

use crate::errors::{CodegenError, CodegenResult};
use crate::frontend::{CallExpr, Expr};

use super::context::Cg;
use super::structs::{CallTarget, Callee, Member};
use super::types::CompiledValue;

impl<'ctx> Cg<'_, '_, 'ctx> {
    /// Lower a call to a package function or a method.
    #[tracing::instrument(skip(self, call), level = "trace")]
    pub fn call(&mut self, call: &CallExpr) -> CodegenResult<CompiledValue<'ctx>> {
        let callee = self.callee(&call.callee)?;

        if call.args.len() != callee.params.len() {
            return Err(CodegenError::arg_count(
                &callee.name,
                callee.params.len(),
                call.args.len(),
            ));
        }

        let mut args: Vec<BasicMetadataValueEnum<'ctx>> = Vec::with_capacity(call.args.len() + 1);
        if let Some(receiver) = callee.receiver {
            args.push(receiver.into());
        }
        for (arg, param) in call.args.iter().zip(&callee.params) {
            let value = self.expr(arg, Some(param))?;
            args.push(self.coerce(value, param, "argument")?.basic("argument")?.into());
        }

        let site = match callee.target {
            CallTarget::Direct(function) => self.builder().build_call(function, &args, "")?,
            CallTarget::Indirect(ptr) => {
                self.builder()
                    .build_indirect_call(callee.fn_type, ptr, &args, "")?
            }
        };
        match site.try_as_basic_value().left() {
            Some(value) => Ok(CompiledValue::new(value, callee.ret)),
            None => Ok(CompiledValue::void()),
        }
    }

    fn callee(&mut self, expr: &Expr) -> CodegenResult<Callee<'ctx>> {
        match expr {
            Expr::Ident(name) => {
                let info = self
                    .ctx
                    .registry
                    .function(name)
                    .filter(|info| info.receiver.is_none())
                    .ok_or_else(|| CodegenError::not_found("function", name.as_str()))?;
                let function = self
                    .ctx
                    .module
                    .get_function(&info.emitted)
                    .ok_or_else(|| CodegenError::not_found("function", info.emitted.as_str()))?;
                Ok(Callee {
                    target: CallTarget::Direct(function),
                    fn_type: function.get_type(),
                    params: info.params.clone(),
                    ret: info.ret.clone(),
                    receiver: None,
                    name: info.emitted.clone(),
                })
            }
            Expr::Member(member) => match self.member(member)? {
                Member::Method(callee) => Ok(callee),
                Member::Field(place) => Err(CodegenError::type_mismatch(
                    "call",
                    "a function",
                    &place.ty,
                )),
            },
            _ => Err(CodegenError::unsupported("indirect call")),
        }
    }
}
