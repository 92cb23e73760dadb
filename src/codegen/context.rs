// src/codegen/context.rs
//
// Function-body codegen context. Methods are implemented across multiple
// files using split impl blocks:
// - stmt.rs: block(), stmt(), var_decl(), if_stmt()
// - expr.rs: expr(), ident(), assign(), coerce()
// - ops.rs: binary(), cast()
// - calls.rs: call()
// - structs.rs: place(), member()

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::values::{FunctionValue, PointerValue};
use rustc_hash::FxHashMap;

use super::compiler::Compiler;
use super::types::Ty;

/// An addressable storage location: local slot, package variable or field.
#[derive(Debug, Clone, PartialEq)]
pub struct Place<'ctx> {
    pub ptr: PointerValue<'ctx>,
    pub ty: Ty,
    pub mutable: bool,
    /// Source name, for diagnostics
    pub name: String,
}

/// Variables declared directly in one block.
pub(crate) type Scope<'ctx> = FxHashMap<String, Place<'ctx>>;

pub(crate) struct Cg<'a, 'b, 'ctx> {
    pub ctx: &'a mut Compiler<'b, 'ctx>,
    pub function: FunctionValue<'ctx>,
    /// One scope per open block; only the innermost is searched
    pub scopes: Vec<Scope<'ctx>>,
    pub ret: Ty,
}

impl<'a, 'b, 'ctx> Cg<'a, 'b, 'ctx> {
    /// Start lowering the body of `function` at a fresh `entry` block.
    pub fn new(ctx: &'a mut Compiler<'b, 'ctx>, function: FunctionValue<'ctx>, ret: Ty) -> Self {
        let entry = ctx.context.append_basic_block(function, "entry");
        ctx.builder.position_at_end(entry);
        Self {
            ctx,
            function,
            scopes: vec![Scope::default()],
            ret,
        }
    }

    pub fn builder(&self) -> &Builder<'ctx> {
        &self.ctx.builder
    }

    pub fn append_block(&self, name: &str) -> BasicBlock<'ctx> {
        self.ctx.context.append_basic_block(self.function, name)
    }

    /// True once the current block ends in a terminator.
    pub fn is_terminated(&self) -> bool {
        self.builder()
            .get_insert_block()
            .and_then(|block| block.get_terminator())
            .is_some()
    }

    /// Bind `name` in the current block.
    pub fn bind(&mut self, place: Place<'ctx>) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(place.name.clone(), place);
        }
    }

    /// Look up a variable in the current block, then among package variables.
    /// Enclosing blocks are not searched.
    pub fn lookup(&self, name: &str) -> Option<&Place<'ctx>> {
        self.scopes
            .last()
            .and_then(|scope| scope.get(name))
            .or_else(|| self.ctx.globals.get(name))
    }
}
