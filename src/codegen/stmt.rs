// src/codegen/stmt.rs
//
// Statement lowering - impl Cg methods.

use inkwell::basic_block::BasicBlock;
use inkwell::values::BasicValueEnum;

use crate::errors::{CodegenError, CodegenResult};
use crate::frontend::{Block, Expr, IfStmt, Stmt, VarDecl};

use super::context::{Cg, Place, Scope};
use super::types::Ty;

impl<'ctx> Cg<'_, '_, 'ctx> {
    /// Lower statements into the current block. Anything after a terminator
    /// is unreachable and skipped.
    pub fn stmts(&mut self, stmts: &[Stmt]) -> CodegenResult<()> {
        for stmt in stmts {
            if self.is_terminated() {
                break;
            }
            self.stmt(stmt)?;
        }
        Ok(())
    }

    /// Lower a nested block with its own variable scope.
    pub fn block(&mut self, block: &Block) -> CodegenResult<()> {
        self.scopes.push(Scope::default());
        let result = self.stmts(&block.stmts);
        self.scopes.pop();
        result
    }

    pub fn stmt(&mut self, stmt: &Stmt) -> CodegenResult<()> {
        match stmt {
            Stmt::VarDecl(decl) => self.var_decl(decl),
            Stmt::Return(value) => self.return_stmt(value.as_ref()),
            Stmt::Block(block) => self.block(block),
            Stmt::If(if_stmt) => self.if_stmt(if_stmt),
            Stmt::Expr(expr) => {
                self.expr(expr, None)?;
                Ok(())
            }
        }
    }

    /// `var a, b T = x, y`. With fewer initializers than names, the first
    /// initializer's value is stored into every name left over.
    fn var_decl(&mut self, decl: &VarDecl) -> CodegenResult<()> {
        let ty = self.ctx.lower_type(&decl.ty)?;
        if ty.is_void() {
            return Err(CodegenError::type_mismatch("variable", "a value type", "void"));
        }
        let llvm_ty = self.ctx.basic_type(&ty)?;
        if decl.values.len() > decl.names.len() {
            tracing::warn!(
                names = decl.names.len(),
                values = decl.values.len(),
                "extra initializers ignored"
            );
        }

        let mut values = Vec::with_capacity(decl.names.len());
        for init in decl.values.iter().take(decl.names.len()) {
            values.push(self.initializer(init, &ty)?);
        }
        let broadcast = values.first().copied();

        for (i, name) in decl.names.iter().enumerate() {
            let value = match values.get(i).copied().or(broadcast) {
                Some(value) => value,
                None => self.ctx.null_value(&ty)?,
            };
            let slot = self.builder().build_alloca(llvm_ty, &format!("{name}.addr"))?;
            self.builder().build_store(slot, value)?;
            self.bind(Place {
                ptr: slot,
                ty: ty.clone(),
                mutable: decl.mutable,
                name: name.clone(),
            });
        }
        Ok(())
    }

    fn initializer(&mut self, init: &Expr, ty: &Ty) -> CodegenResult<BasicValueEnum<'ctx>> {
        let value = self.expr(init, Some(ty))?;
        self.coerce(value, ty, "variable initializer")?
            .basic("variable initializer")
    }

    fn return_stmt(&mut self, value: Option<&Expr>) -> CodegenResult<()> {
        let ret = self.ret.clone();
        match value {
            None if ret.is_void() => {
                self.builder().build_return(None)?;
            }
            None => {
                return Err(CodegenError::type_mismatch("return", &ret, "no value"));
            }
            Some(expr) => {
                if ret.is_void() {
                    return Err(CodegenError::type_mismatch("return", "no value", "a value"));
                }
                let value = self.expr(expr, Some(&ret))?;
                let value = self.coerce(value, &ret, "return value")?.basic("return value")?;
                self.builder().build_return(Some(&value))?;
            }
        }
        Ok(())
    }

    /// `if c { .. } else { .. }`: branch on `c` to `then` and `else` (or
    /// straight to `continue` without an else), and bring every arm that
    /// falls through back to `continue`. When no arm falls through,
    /// `continue` is unreachable and ends the current path.
    fn if_stmt(&mut self, stmt: &IfStmt) -> CodegenResult<()> {
        let condition = self.expr(&stmt.condition, Some(&Ty::Bool))?;
        if condition.ty != Ty::Bool {
            return Err(CodegenError::type_mismatch("if condition", Ty::Bool, &condition.ty));
        }
        let condition = condition.basic("if condition")?.into_int_value();

        let then_bb = self.append_block("then");
        let else_bb = stmt.else_block.as_ref().map(|_| self.append_block("else"));
        let cont_bb = self.append_block("continue");
        self.builder()
            .build_conditional_branch(condition, then_bb, else_bb.unwrap_or(cont_bb))?;

        self.builder().position_at_end(then_bb);
        self.block(&stmt.then_block)?;
        let mut reaches_cont = self.fall_through(cont_bb)?;

        match (else_bb, &stmt.else_block) {
            (Some(else_bb), Some(block)) => {
                self.builder().position_at_end(else_bb);
                self.block(block)?;
                reaches_cont |= self.fall_through(cont_bb)?;
            }
            _ => reaches_cont = true,
        }

        self.builder().position_at_end(cont_bb);
        if !reaches_cont {
            self.builder().build_unreachable()?;
        }
        tracing::trace!(has_else = stmt.else_block.is_some(), reaches_cont, "lowered if");
        Ok(())
    }

    /// Branch to `target` unless the current block already ended. Returns
    /// whether a branch was added.
    fn fall_through(&mut self, target: BasicBlock<'ctx>) -> CodegenResult<bool> {
        if self.is_terminated() {
            return Ok(false);
        }
        self.builder().build_unconditional_branch(target)?;
        Ok(true)
    }
}
