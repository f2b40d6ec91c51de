//! Annotation resolution
//!
//! Turns `@Name(args)` occurrences into annotation descriptors: the annotation
//! type chosen by overload resolution plus the constant value of every bound
//! argument.
//!
//! 1. walker    — picks each declaration's expressions, scope and skip set
//! 2. scanner   — finds annotated expressions below a node
//! 3. entry     — resolves one entry as a constructor call
//! 4. arguments — binds resolved arguments to constants
//! 5. stubs     — placeholder descriptors, filled in place later
//!
//! Nothing here fails: unresolvable entries get the error type, non-constant
//! arguments become `None`.

pub mod arguments;
pub mod entry;
pub mod scanner;
pub mod stubs;
pub mod walker;


use crate::analysis::binding::{BindingContext, DescriptorId};
use crate::analysis::calls::CallResolution;
use crate::analysis::checker::ExpressionTyping;
use crate::analysis::collector::DeclarationTable;
use crate::analysis::symbols::ScopeId;
use crate::config::ResolverConfig;
use crate::syntax::ast::{AnnotationEntry, Expr, File};
use crate::types::Type;
use crate::types::constant::ConstantValue;

pub struct AnnotationResolver<'a> {
    calls: &'a dyn CallResolution,
    typing: &'a dyn ExpressionTyping,
    config: ResolverConfig,
}

impl<'a> AnnotationResolver<'a> {
    pub fn new(calls: &'a dyn CallResolution, typing: &'a dyn ExpressionTyping, config: ResolverConfig) -> Self {
        Self { calls, typing, config }
    }

    /// Resolve every annotation reachable from the declarations in `table`.
    pub fn process(&self, ctx: &mut BindingContext, table: &DeclarationTable, file: &File) {
        walker::walk(self, ctx, table, file);
    }

    pub fn resolve_annotations(&self, ctx: &mut BindingContext, scope: ScopeId, entries: &[AnnotationEntry]) -> Vec<DescriptorId> {
        entries.iter().map(|e| self.resolve_entry(ctx, scope, e)).collect()
    }

    pub fn resolve_entry(&self, ctx: &mut BindingContext, scope: ScopeId, entry: &AnnotationEntry) -> DescriptorId {
        entry::resolve_entry(self, ctx, scope, entry)
    }

    /// Constant value of one argument expression, or `None` if it is not a compile-time constant.
    pub fn resolve_annotation_argument(
        &self,
        ctx: &mut BindingContext,
        scope: ScopeId,
        expr: &Expr,
        expected: &Type,
    ) -> Option<ConstantValue> {
        arguments::extract_constant(self, ctx, scope, expr, expected)
    }

    pub fn create_annotation_stubs(&self, ctx: &mut BindingContext, entries: &[AnnotationEntry]) -> Vec<DescriptorId> {
        stubs::create_annotation_stubs(ctx, entries)
    }
}
