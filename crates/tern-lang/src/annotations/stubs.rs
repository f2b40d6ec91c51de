use crate::analysis::binding::{BindingContext, DescriptorId};
use crate::syntax::ast::AnnotationEntry;

/// One placeholder descriptor per entry, recorded under the entry right away.
/// Entries that already have a descriptor keep it.
pub fn create_annotation_stubs(ctx: &mut BindingContext, entries: &[AnnotationEntry]) -> Vec<DescriptorId> {
    entries.iter().map(|entry| descriptor_for(ctx, entry)).collect()
}

/// The descriptor recorded for `entry`, allocating a stub on first use.
pub(crate) fn descriptor_for(ctx: &mut BindingContext, entry: &AnnotationEntry) -> DescriptorId {
    if let Some(&id) = ctx.annotation.get(entry.id) {
        return id;
    }
    let id = ctx.alloc_descriptor();
    ctx.annotation.record_once(entry.id, id);
    id
}
