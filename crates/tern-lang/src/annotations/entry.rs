use tracing::debug;

use super::{AnnotationResolver, arguments, stubs};
use crate::analysis::binding::{BindingContext, DescriptorId};
use crate::analysis::calls::Call;
use crate::analysis::checker::FlowInfo;
use crate::analysis::symbols::ScopeId;
use crate::syntax::ast::AnnotationEntry;
use crate::types::Type;

/// Resolve `entry` as a constructor call in `scope` and fill its descriptor.
///
/// The entry's existing descriptor (a stub, usually) is filled in place; one is
/// allocated only if the entry has none. Resolution failures leave the error
/// type in the descriptor and still bind whatever arguments the best candidate
/// accepted.
pub(crate) fn resolve_entry(
    resolver: &AnnotationResolver<'_>,
    ctx: &mut BindingContext,
    scope: ScopeId,
    entry: &AnnotationEntry,
) -> DescriptorId {
    let id = stubs::descriptor_for(ctx, entry);

    // Annotation arguments never see smart casts.
    let call = Call::from_entry(entry);
    let results = resolver.calls.resolve_call(ctx, scope, &call, None, &FlowInfo::empty());

    let annotation_type = if results.is_success() {
        results.result_type().clone()
    } else {
        Type::error(format!("annotation `{}` is unresolved", entry.name))
    };
    ctx.descriptor_mut(id).annotation_type = annotation_type;

    let value_arguments = arguments::bind_arguments(resolver, ctx, scope, &results.resolved);
    let descriptor = ctx.descriptor_mut(id);
    descriptor.value_arguments = value_arguments;

    debug!(
        annotation = %entry.name,
        line = entry.span.line,
        status = ?results.status,
        ty = %descriptor.annotation_type,
        arguments = descriptor.value_arguments.len(),
        "resolved annotation entry"
    );
    id
}
