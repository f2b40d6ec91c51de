use tracing::trace;

use super::AnnotationResolver;
use crate::analysis::binding::BindingContext;
use crate::analysis::calls::ResolvedCall;
use crate::analysis::checker::FlowInfo;
use crate::analysis::symbols::ScopeId;
use crate::error::{DiagnosticSink, Error, ErrorCode};
use crate::syntax::ast::{Expr, ExprKind};
use crate::types::Type;
use crate::types::constant::ConstantValue;

/// Constants for every argument bound by `resolved`, in parameter order and,
/// within a `vararg` parameter, in argument order.
pub(crate) fn bind_arguments(
    resolver: &AnnotationResolver<'_>,
    ctx: &mut BindingContext,
    scope: ScopeId,
    resolved: &ResolvedCall<'_>,
) -> Vec<Option<ConstantValue>> {
    let mut values = Vec::new();
    for binding in &resolved.bindings {
        for expr in &binding.args {
            values.push(extract_constant(resolver, ctx, scope, expr, &binding.param.ty));
        }
    }
    values
}

/// Literal: typed against `expected` (which coerces and folds it), then read back.
/// String template: its fold from the argument check is read back.
/// Parentheses: unwrapped. Anything else is not a constant.
pub(crate) fn extract_constant(
    resolver: &AnnotationResolver<'_>,
    ctx: &mut BindingContext,
    scope: ScopeId,
    expr: &Expr,
    expected: &Type,
) -> Option<ConstantValue> {
    let mut current = expr;
    loop {
        match &current.kind {
            ExprKind::Paren(inner) => current = &**inner,

            ExprKind::Constant(_) => {
                resolver.typing.type_check(ctx, scope, current, Some(expected), &FlowInfo::empty());
                let value = ctx.compile_time_value.get(current.id).cloned();
                trace!(node = current.id.0, ?value, "literal argument");
                return value;
            }

            ExprKind::StringTemplate(_) => {
                let value = ctx.compile_time_value.get(current.id).cloned();
                trace!(node = current.id.0, ?value, "template argument");
                if value.is_none() {
                    report_non_constant(resolver, ctx, expr);
                }
                return value;
            }

            _ => {
                trace!(node = current.id.0, "non-constant argument");
                report_non_constant(resolver, ctx, expr);
                return None;
            }
        }
    }
}

fn report_non_constant(resolver: &AnnotationResolver<'_>, sink: &mut dyn DiagnosticSink, expr: &Expr) {
    if resolver.config.report_non_constant_arguments {
        sink.report(Error::at(ErrorCode::A001, &expr.span, "annotation argument must be a compile-time constant"));
    }
}
