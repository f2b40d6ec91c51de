//! Per-file result table shared by the collector, the typing services and the
//! annotation pass. Passed explicitly as `&mut BindingContext`.

use std::collections::HashMap;

use tracing::warn;

use crate::analysis::calls::ResolutionStatus;
use crate::analysis::symbols::{Callable, ScopeId, Scopes};
use crate::error::{DiagnosticSink, Error};
use crate::syntax::ast::NodeId;
use crate::types::Type;
use crate::types::constant::ConstantValue;

// ─── Annotation descriptors ───────────────────────────────────────────────────

/// Identity of an annotation descriptor: an index into the context's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DescriptorId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationDescriptor {
    /// Concrete class type, or `Type::Error` when resolution failed or has not run.
    pub annotation_type: Type,
    /// One entry per bound argument expression; `None` for non-constant arguments.
    pub value_arguments: Vec<Option<ConstantValue>>,
}

impl AnnotationDescriptor {
    pub fn stub() -> Self {
        Self {
            annotation_type: Type::error("annotation not resolved yet"),
            value_arguments: Vec::new(),
        }
    }
}

/// What a call or annotation entry resolved to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCallInfo {
    pub candidate: Callable,
    pub status: ResolutionStatus,
}

// ─── Slices ───────────────────────────────────────────────────────────────────

/// One node-keyed table of the binding context.
#[derive(Debug)]
pub struct Slice<V> {
    name: &'static str,
    map: HashMap<NodeId, V>,
}

impl<V> Slice<V> {
    fn new(name: &'static str) -> Self {
        Self { name, map: HashMap::new() }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn get(&self, key: NodeId) -> Option<&V> {
        self.map.get(&key)
    }

    pub fn contains(&self, key: NodeId) -> bool {
        self.map.contains_key(&key)
    }

    /// Insert or overwrite.
    pub fn record(&mut self, key: NodeId, value: V) {
        self.map.insert(key, value);
    }

    /// Insert unless the key is already present. Returns `false` and logs when it is.
    pub fn record_once(&mut self, key: NodeId, value: V) -> bool {
        if self.map.contains_key(&key) {
            warn!(slice = self.name, node = key.0, "ignoring second write to write-once slice");
            return false;
        }
        self.map.insert(key, value);
        true
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &V)> {
        self.map.iter()
    }
}

// ─── Context ──────────────────────────────────────────────────────────────────

pub struct BindingContext {
    pub scopes: Scopes,
    descriptors: Vec<AnnotationDescriptor>,

    /// Annotation entry → its descriptor.
    pub annotation: Slice<DescriptorId>,
    /// Annotated expression → descriptors of the entries attached to it.
    pub annotated_expression: Slice<Vec<DescriptorId>>,
    /// Declaration → descriptors of its modifier annotations.
    pub declaration_annotations: Slice<Vec<DescriptorId>>,
    pub expression_type: Slice<Type>,
    pub compile_time_value: Slice<ConstantValue>,
    /// Call expression or annotation entry → resolved callable.
    pub resolved_call: Slice<ResolvedCallInfo>,
    /// Local function, class or object → the block scope it appears in,
    /// holding the locals declared before it.
    pub local_scope: Slice<ScopeId>,

    diagnostics: Vec<Error>,
    forward: Option<Box<dyn DiagnosticSink>>,
}

impl BindingContext {
    pub fn new(scopes: Scopes) -> Self {
        Self {
            scopes,
            descriptors: Vec::new(),
            annotation: Slice::new("ANNOTATION"),
            annotated_expression: Slice::new("ANNOTATED_EXPRESSION"),
            declaration_annotations: Slice::new("DECLARATION_ANNOTATIONS"),
            expression_type: Slice::new("EXPRESSION_TYPE"),
            compile_time_value: Slice::new("COMPILE_TIME_VALUE"),
            resolved_call: Slice::new("RESOLVED_CALL"),
            local_scope: Slice::new("LOCAL_SCOPE"),
            diagnostics: Vec::new(),
            forward: None,
        }
    }

    // ── Descriptor arena ──────────────────────────────────────────────────────

    pub fn alloc_descriptor(&mut self) -> DescriptorId {
        let id = DescriptorId(self.descriptors.len() as u32);
        self.descriptors.push(AnnotationDescriptor::stub());
        id
    }

    pub fn descriptor(&self, id: DescriptorId) -> &AnnotationDescriptor {
        &self.descriptors[id.0 as usize]
    }

    pub fn descriptor_mut(&mut self, id: DescriptorId) -> &mut AnnotationDescriptor {
        &mut self.descriptors[id.0 as usize]
    }

    pub fn descriptor_count(&self) -> usize {
        self.descriptors.len()
    }

    // ── Diagnostics ───────────────────────────────────────────────────────────

    /// Additionally send every new diagnostic to `sink`.
    pub fn set_sink(&mut self, sink: Box<dyn DiagnosticSink>) {
        self.forward = Some(sink);
    }

    pub fn diagnostics(&self) -> &[Error] {
        &self.diagnostics
    }

    pub fn take_diagnostics(&mut self) -> Vec<Error> {
        std::mem::take(&mut self.diagnostics)
    }
}

impl DiagnosticSink for BindingContext {
    /// Identical diagnostics (same code, position and message) are kept once:
    /// trying several overload candidates type-checks the same arguments repeatedly.
    fn report(&mut self, error: Error) {
        if self.diagnostics.contains(&error) {
            return;
        }
        if let Some(sink) = self.forward.as_mut() {
            sink.report(error.clone());
        }
        self.diagnostics.push(error);
    }
}
