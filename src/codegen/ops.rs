// src/codegen/ops.rs
//
// Binary operations and casts - impl Cg methods.

use inkwell::values::{BasicValueEnum, IntValue};
use inkwell::{FloatPredicate, IntPredicate};

use crate::errors::{CodegenError, CodegenResult};
use crate::frontend::{BinaryExpr, BinaryOp, CastExpr};

use super::context::Cg;
use super::types::{CompiledValue, Ty};

/// Instruction an arithmetic operator lowers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arith {
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    FAdd,
    FSub,
    FMul,
    FDiv,
}

impl<'ctx> Cg<'_, '_, 'ctx> {
    /// Compile a binary expression
    pub fn binary(
        &mut self,
        bin: &BinaryExpr,
        expected: Option<&Ty>,
    ) -> CodegenResult<CompiledValue<'ctx>> {
        let operand_hint = match bin.op {
            BinaryOp::And | BinaryOp::Or => Some(&Ty::Bool),
            op if op.is_arithmetic() => expected,
            _ => None,
        };

        // A literal takes its type from the other operand, so lower that first.
        let (left, right) = if bin.left.is_literal() && !bin.right.is_literal() {
            let right = self.expr(&bin.right, operand_hint)?;
            let left = self.expr(&bin.left, Some(&right.ty))?;
            (left, right)
        } else {
            let left = self.expr(&bin.left, operand_hint)?;
            let right = self.expr(&bin.right, Some(&left.ty))?;
            (left, right)
        };

        if left.ty != right.ty {
            return Err(CodegenError::type_mismatch(
                "binary operand",
                &left.ty,
                &right.ty,
            ));
        }
        let ty = left.ty.clone();
        let lhs = left.basic("binary operand")?;
        let rhs = right.basic("binary operand")?;

        if bin.op.is_arithmetic() {
            let op = arithmetic_op(bin.op, &ty).ok_or_else(|| {
                CodegenError::unsupported_with_context("arithmetic operand type", format!("{} {}", bin.op.symbol(), ty))
            })?;
            let value = self.arithmetic(op, lhs, rhs)?;
            return Ok(CompiledValue::new(value, ty));
        }

        if bin.op.is_comparison() {
            let value = if ty.is_float() {
                let pred = float_predicate(bin.op)
                    .ok_or_else(|| CodegenError::internal("comparison operator without predicate"))?;
                self.builder().build_float_compare(
                    pred,
                    lhs.into_float_value(),
                    rhs.into_float_value(),
                    "",
                )?
            } else if ty.is_int() || matches!(ty, Ty::Bool | Ty::Pointer(_)) {
                let pred = int_predicate(bin.op, ty.is_signed())
                    .ok_or_else(|| CodegenError::internal("comparison operator without predicate"))?;
                let lhs = self.comparable(lhs)?;
                let rhs = self.comparable(rhs)?;
                self.builder().build_int_compare(pred, lhs, rhs, "")?
            } else {
                return Err(CodegenError::unsupported_with_context(
                    "comparison operand type",
                    ty.to_string(),
                ));
            };
            return Ok(CompiledValue::new(value, Ty::Bool));
        }

        // && and || evaluate both sides
        if ty != Ty::Bool {
            return Err(CodegenError::type_mismatch("logical operand", Ty::Bool, &ty));
        }
        let (lhs, rhs) = (lhs.into_int_value(), rhs.into_int_value());
        let value = if bin.op == BinaryOp::And {
            self.builder().build_and(lhs, rhs, "")?
        } else {
            self.builder().build_or(lhs, rhs, "")?
        };
        Ok(CompiledValue::new(value, Ty::Bool))
    }

    fn arithmetic(
        &self,
        op: Arith,
        lhs: BasicValueEnum<'ctx>,
        rhs: BasicValueEnum<'ctx>,
    ) -> CodegenResult<BasicValueEnum<'ctx>> {
        let b = self.builder();
        Ok(match op {
            Arith::Add => b.build_int_add(lhs.into_int_value(), rhs.into_int_value(), "")?.into(),
            Arith::Sub => b.build_int_sub(lhs.into_int_value(), rhs.into_int_value(), "")?.into(),
            Arith::Mul => b.build_int_mul(lhs.into_int_value(), rhs.into_int_value(), "")?.into(),
            Arith::SDiv => b
                .build_int_signed_div(lhs.into_int_value(), rhs.into_int_value(), "")?
                .into(),
            Arith::UDiv => b
                .build_int_unsigned_div(lhs.into_int_value(), rhs.into_int_value(), "")?
                .into(),
            Arith::FAdd => b
                .build_float_add(lhs.into_float_value(), rhs.into_float_value(), "")?
                .into(),
            Arith::FSub => b
                .build_float_sub(lhs.into_float_value(), rhs.into_float_value(), "")?
                .into(),
            Arith::FMul => b
                .build_float_mul(lhs.into_float_value(), rhs.into_float_value(), "")?
                .into(),
            Arith::FDiv => b
                .build_float_div(lhs.into_float_value(), rhs.into_float_value(), "")?
                .into(),
        })
    }

    /// Integer view of a compare operand; pointers compare as addresses.
    fn comparable(&self, value: BasicValueEnum<'ctx>) -> CodegenResult<IntValue<'ctx>> {
        match value {
            BasicValueEnum::IntValue(v) => Ok(v),
            BasicValueEnum::PointerValue(p) => Ok(self.builder().build_ptr_to_int(
                p,
                self.ctx.context.i64_type(),
                "",
            )?),
            _ => Err(CodegenError::internal("comparison operand is neither integer nor pointer")),
        }
    }

    /// `expr as T`
    pub fn cast(&mut self, cast: &CastExpr) -> CodegenResult<CompiledValue<'ctx>> {
        let to = self.ctx.lower_type(&cast.ty)?;
        let hint = cast.expr.is_literal().then_some(&to);
        let value = self.expr(&cast.expr, hint)?;
        let from = value.ty.clone();
        if from == to {
            return Ok(value);
        }

        let unsupported = || {
            CodegenError::unsupported_with_context("cast", format!("from {from} to {to}"))
        };
        let raw = value.basic("cast operand")?;
        let target = self.ctx.basic_type(&to)?;
        let b = self.builder();
        let result: BasicValueEnum<'ctx> = match (&from, &to) {
            // pointers are untyped; only the semantic type changes
            (Ty::Pointer(_), Ty::Pointer(_)) => raw,
            (Ty::Int { .. } | Ty::Bool, Ty::Int { .. } | Ty::Bool) => {
                let from_bits = from.int_bits().ok_or_else(unsupported)?;
                let to_bits = to.int_bits().ok_or_else(unsupported)?;
                let (int, int_ty) = (raw.into_int_value(), target.into_int_type());
                if from_bits == to_bits {
                    // only signedness changes
                    raw
                } else if from_bits > to_bits {
                    b.build_int_truncate(int, int_ty, "")?.into()
                } else if from.is_signed() {
                    b.build_int_s_extend(int, int_ty, "")?.into()
                } else {
                    b.build_int_z_extend(int, int_ty, "")?.into()
                }
            }
            (Ty::Int { signed, .. }, Ty::Float { .. }) => {
                let (int, float_ty) = (raw.into_int_value(), target.into_float_type());
                if *signed {
                    b.build_signed_int_to_float(int, float_ty, "")?.into()
                } else {
                    b.build_unsigned_int_to_float(int, float_ty, "")?.into()
                }
            }
            (Ty::Float { .. }, Ty::Int { signed, .. }) => {
                let (float, int_ty) = (raw.into_float_value(), target.into_int_type());
                if *signed {
                    b.build_float_to_signed_int(float, int_ty, "")?.into()
                } else {
                    b.build_float_to_unsigned_int(float, int_ty, "")?.into()
                }
            }
            (Ty::Float { bits: a }, Ty::Float { bits: c }) => {
                let (float, float_ty) = (raw.into_float_value(), target.into_float_type());
                if a < c {
                    b.build_float_ext(float, float_ty, "")?.into()
                } else {
                    b.build_float_trunc(float, float_ty, "")?.into()
                }
            }
            _ => return Err(unsupported()),
        };
        Ok(CompiledValue::new(result, to))
    }
}

fn arithmetic_op(op: BinaryOp, ty: &Ty) -> Option<Arith> {
    let float = ty.is_float();
    if !float && !ty.is_int() {
        return None;
    }
    Some(match (op, float) {
        (BinaryOp::Add, false) => Arith::Add,
        (BinaryOp::Sub, false) => Arith::Sub,
        (BinaryOp::Mul, false) => Arith::Mul,
        (BinaryOp::Div, false) if ty.is_signed() => Arith::SDiv,
        (BinaryOp::Div, false) => Arith::UDiv,
        (BinaryOp::Add, true) => Arith::FAdd,
        (BinaryOp::Sub, true) => Arith::FSub,
        (BinaryOp::Mul, true) => Arith::FMul,
        (BinaryOp::Div, true) => Arith::FDiv,
        _ => return None,
    })
}

fn int_predicate(op: BinaryOp, signed: bool) -> Option<IntPredicate> {
    Some(match (op, signed) {
        (BinaryOp::Eq, _) => IntPredicate::EQ,
        (BinaryOp::Ne, _) => IntPredicate::NE,
        (BinaryOp::Lt, true) => IntPredicate::SLT,
        (BinaryOp::Le, true) => IntPredicate::SLE,
        (BinaryOp::Gt, true) => IntPredicate::SGT,
        (BinaryOp::Ge, true) => IntPredicate::SGE,
        (BinaryOp::Lt, false) => IntPredicate::ULT,
        (BinaryOp::Le, false) => IntPredicate::ULE,
        (BinaryOp::Gt, false) => IntPredicate::UGT,
        (BinaryOp::Ge, false) => IntPredicate::UGE,
        _ => return None,
    })
}

fn float_predicate(op: BinaryOp) -> Option<FloatPredicate> {
    Some(match op {
        BinaryOp::Eq => FloatPredicate::OEQ,
        BinaryOp::Ne => FloatPredicate::ONE,
        BinaryOp::Lt => FloatPredicate::OLT,
        BinaryOp::Le => FloatPredicate::OLE,
        BinaryOp::Gt => FloatPredicate::OGT,
        BinaryOp::Ge => FloatPredicate::OGE,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_follows_signedness() {
        let signed = Ty::Int { bits: 32, signed: true };
        let unsigned = Ty::Int { bits: 32, signed: false };
        assert_eq!(arithmetic_op(BinaryOp::Div, &signed), Some(Arith::SDiv));
        assert_eq!(arithmetic_op(BinaryOp::Div, &unsigned), Some(Arith::UDiv));
        assert_eq!(arithmetic_op(BinaryOp::Div, &Ty::Float { bits: 32 }), Some(Arith::FDiv));
        assert_eq!(arithmetic_op(BinaryOp::Add, &Ty::Bool), None);
    }

    #[test]
    fn comparison_predicates_follow_signedness() {
        assert_eq!(int_predicate(BinaryOp::Lt, true), Some(IntPredicate::SLT));
        assert_eq!(int_predicate(BinaryOp::Lt, false), Some(IntPredicate::ULT));
        assert_eq!(int_predicate(BinaryOp::Eq, false), Some(IntPredicate::EQ));
        assert_eq!(float_predicate(BinaryOp::Ge), Some(FloatPredicate::OGE));
        assert_eq!(int_predicate(BinaryOp::Add, true), None);
    }
}
