pub mod symbols;
pub mod binding;
pub mod collector;
pub mod checker;
pub mod calls;

#[cfg(test)]
mod tests;

use tracing::debug;

use crate::annotations::AnnotationResolver;
use crate::config::ResolverConfig;
use crate::syntax::ast::File;
use binding::BindingContext;
use calls::CallResolver;
use checker::ExpressionTypingServices;
use collector::{Collector, DeclarationTable};

// ─── Entry point ─────────────────────────────────────────────────────────────

/// Semantic pipeline for one parsed file:
/// 1. Collector          — scopes, declaration table, annotation stubs
/// 2. AnnotationResolver — resolves every annotation entry, filling the stubs
///
/// Never fails: every semantic problem is a diagnostic in the returned context.
pub fn resolve(file: &File, config: &ResolverConfig) -> (DeclarationTable, BindingContext) {
    // ── Pass 1: collect declarations ──────────────────────────────────────────
    let (table, mut ctx) = Collector::new().collect(file);

    // ── Pass 2: annotations ───────────────────────────────────────────────────
    let typing = ExpressionTypingServices::new();
    let calls = CallResolver::new(&typing);
    AnnotationResolver::new(&calls, &typing, config.clone()).process(&mut ctx, &table, file);

    debug!(
        descriptors = ctx.descriptor_count(),
        diagnostics = ctx.diagnostics().len(),
        "analysis finished"
    );
    (table, ctx)
}
