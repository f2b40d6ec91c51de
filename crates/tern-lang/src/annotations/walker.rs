use tracing::debug;

use super::AnnotationResolver;
use super::scanner::ExpressionScanner;
use crate::analysis::binding::BindingContext;
use crate::analysis::collector::DeclarationTable;
use crate::analysis::symbols::ScopeId;
use crate::syntax::ast::{AnnotationEntry, File, NodeId};
use crate::syntax::node::{Node, SkipSet, annotation_arguments, preorder};

/// Visit every declaration the collector registered and scan what it owns:
///
/// | declaration     | scanned                        | scope              | skip set          |
/// |-----------------|--------------------------------|--------------------|-------------------|
/// | class / object  | ctor defaults, `init` blocks   | initializer scope  | own-body, property|
/// | property        | initializer                    | declaring scope    | none              |
/// | function        | parameter defaults             | declaring scope    | none              |
/// | function        | body                           | inner scope        | own-body          |
///
/// Modifier annotations of each declaration resolve in its declaring scope.
///
/// A local declaration is declared in the block scope the enclosing scan
/// recorded for it, so it sees the locals written before it. Enclosing
/// declarations come first in preorder, so that scope is known by then.
pub(crate) fn walk(resolver: &AnnotationResolver<'_>, ctx: &mut BindingContext, table: &DeclarationTable, file: &File) {
    // Registered declarations can sit anywhere, local functions included.
    for node in preorder(file) {
        let Some(registered) = table.declaring_scope(node.id()) else { continue };
        let scope = match ctx.local_scope.get(node.id()).copied() {
            Some(local) => {
                attach_to_local_scope(ctx, table, node, local);
                local
            }
            None => registered,
        };
        visit_declaration(resolver, ctx, table, node, scope);
    }
}

/// Hang the scopes a local declaration owns below its block scope.
fn attach_to_local_scope(ctx: &mut BindingContext, table: &DeclarationTable, node: Node<'_>, local: ScopeId) {
    let owned = match node {
        Node::Function(f) => table.function(f.id).map(|d| d.inner_scope()),
        Node::Class(c) => table.class(c.id).map(|d| d.scope_for_members),
        Node::Object(o) => table.class(o.id).map(|d| d.scope_for_members),
        _ => None,
    };
    if let Some(owned) = owned {
        ctx.scopes.reattach(owned, local);
    }
}

fn visit_declaration(
    resolver: &AnnotationResolver<'_>,
    ctx: &mut BindingContext,
    table: &DeclarationTable,
    node: Node<'_>,
    scope: ScopeId,
) {
    match node {
        Node::Class(c) => {
            debug!(class = %c.name, "visiting class");
            resolve_modifiers(resolver, ctx, scope, c.id, &c.annotations);
            if let Some(desc) = table.class(c.id) {
                ExpressionScanner::new(resolver, desc.scope_for_initializers, SkipSet::OWN_BODY_AND_PROPERTY)
                    .scan(ctx, node);
            }
        }
        Node::Object(o) => {
            debug!(object = %o.name, "visiting object");
            resolve_modifiers(resolver, ctx, scope, o.id, &o.annotations);
            if let Some(desc) = table.class(o.id) {
                ExpressionScanner::new(resolver, desc.scope_for_initializers, SkipSet::OWN_BODY_AND_PROPERTY)
                    .scan(ctx, node);
            }
        }
        Node::Property(p) => {
            debug!(property = %p.name, "visiting property");
            resolve_modifiers(resolver, ctx, scope, p.id, &p.annotations);
            if let Some(init) = &p.initializer {
                ExpressionScanner::new(resolver, scope, SkipSet::EMPTY).scan(ctx, Node::Expr(init));
            }
        }
        Node::Function(f) => {
            debug!(function = %f.name, "visiting function");
            resolve_modifiers(resolver, ctx, scope, f.id, &f.annotations);
            for default in f.params.iter().filter_map(|p| p.default.as_ref()) {
                ExpressionScanner::new(resolver, scope, SkipSet::EMPTY).scan(ctx, Node::Expr(default));
            }
            if let (Some(body), Some(desc)) = (&f.body, table.function(f.id)) {
                // Local functions and classes are registered and visited on their own.
                ExpressionScanner::new(resolver, desc.inner_scope(), SkipSet::OWN_BODY).scan(ctx, Node::Expr(body));
            }
        }
        // Only declarations are registered.
        Node::LocalProperty(_) | Node::Param(_) | Node::Init(_) | Node::Expr(_) => {}
    }
}

fn resolve_modifiers(
    resolver: &AnnotationResolver<'_>,
    ctx: &mut BindingContext,
    scope: ScopeId,
    decl: NodeId,
    entries: &[AnnotationEntry],
) {
    if entries.is_empty() {
        return;
    }
    let ids = resolver.resolve_annotations(ctx, scope, entries);
    ctx.declaration_annotations.record_once(decl, ids);
    // `@A(@B 1)`: annotations inside the arguments resolve in the same scope.
    for arg in annotation_arguments(entries) {
        ExpressionScanner::new(resolver, scope, SkipSet::EMPTY).scan(ctx, arg);
    }
}
