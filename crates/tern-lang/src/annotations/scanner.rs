use tracing::{trace, warn};

use super::AnnotationResolver;
use crate::analysis::binding::BindingContext;
use crate::analysis::collector::{infer_literal_type, resolve_type};
use crate::analysis::symbols::{ScopeId, ScopeKind, Symbol};
use crate::error::{DiagnosticSink, Error, ErrorCode};
use crate::syntax::ast::{ExprKind, PropertyDecl};
use crate::syntax::node::{Node, SkipSet};

/// Resolves every annotated expression below one root.
///
/// Children whose category is in the skip set are excluded with their whole
/// subtree; the root itself is never checked against it. Blocks and lambdas
/// open child scopes, and local `val`/`var` statements become visible to the
/// statements after them. A skipped local function, class or object records
/// the scope it appears in, and the statements after it continue in a fresh
/// child scope so that later locals stay invisible to it.
pub struct ExpressionScanner<'r, 'a> {
    resolver: &'r AnnotationResolver<'a>,
    scope: ScopeId,
    skip: SkipSet,
    overflowed: bool,
}

impl<'r, 'a> ExpressionScanner<'r, 'a> {
    pub fn new(resolver: &'r AnnotationResolver<'a>, scope: ScopeId, skip: SkipSet) -> Self {
        Self { resolver, scope, skip, overflowed: false }
    }

    pub fn scan(&mut self, ctx: &mut BindingContext, root: Node<'_>) {
        self.visit(ctx, root, self.scope, 0);
    }

    /// Returns the scope the following siblings of `node` continue in.
    fn visit(&mut self, ctx: &mut BindingContext, node: Node<'_>, scope: ScopeId, depth: usize) -> ScopeId {
        let max_depth = self.resolver.config.max_depth;
        if depth > max_depth {
            if !self.overflowed {
                self.overflowed = true;
                warn!(max_depth, line = node.span().line, "nesting too deep, skipping subtree");
                ctx.report(Error::at(
                    ErrorCode::A002,
                    node.span(),
                    format!("expression nesting exceeds {max_depth} levels; annotations below are not resolved"),
                ));
            }
            return scope;
        }

        let mut inner = scope;
        if let Node::Expr(expr) = node {
            match &expr.kind {
                // Each layer of `@A @B(1) expr` / `@A (@B expr)` resolves on its own.
                ExprKind::Annotated { annotations, .. } => {
                    let ids = self.resolver.resolve_annotations(ctx, scope, annotations);
                    ctx.annotated_expression.record_once(expr.id, ids);
                }
                ExprKind::Block(_) => inner = ctx.scopes.child(scope, ScopeKind::Block),
                ExprKind::Lambda { params, .. } => {
                    inner = ctx.scopes.child(scope, ScopeKind::Lambda);
                    for p in params {
                        let ty = resolve_type(&ctx.scopes, scope, &p.ty, &mut Vec::<Error>::new());
                        ctx.scopes.declare(inner, Symbol::variable(&p.name, Some(ty), false, p.span.clone()));
                    }
                }
                _ => {}
            }
        }

        let mut next = inner;
        for child in node.children() {
            if self.skip.contains(child.category()) {
                trace!(node = child.id().0, category = ?child.category(), "skipped subtree");
                if matches!(node, Node::Expr(_)) {
                    ctx.local_scope.record_once(child.id(), next);
                    next = ctx.scopes.child(next, ScopeKind::Block);
                }
                continue;
            }
            next = self.visit(ctx, child, next, depth + 1);
        }

        if let Node::LocalProperty(p) = node {
            declare_local(ctx, next, p);
        }
        if inner == scope { next } else { scope }
    }
}

/// Make a local `val`/`var` visible to later statements of its block.
/// Redeclarations are left for the typing services to report.
fn declare_local(ctx: &mut BindingContext, scope: ScopeId, p: &PropertyDecl) {
    let ty = match &p.ty {
        Some(tr) => Some(resolve_type(&ctx.scopes, scope, tr, &mut Vec::<Error>::new())),
        None => p.initializer.as_ref().and_then(infer_literal_type),
    };
    if !ctx.scopes.declare(scope, Symbol::variable(&p.name, ty, p.is_var, p.span.clone())) {
        trace!(name = %p.name, "local already declared");
    }
}
