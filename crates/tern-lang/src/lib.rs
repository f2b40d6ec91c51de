pub mod syntax;
pub mod types;
pub mod analysis;
pub mod annotations;
pub mod config;
pub mod error;

pub use analysis::binding::{AnnotationDescriptor, BindingContext, DescriptorId};
pub use analysis::collector::DeclarationTable;
pub use config::ResolverConfig;
pub use error::{DiagnosticSink, Error, ErrorCode, Severity};
pub use syntax::token::{Token, TokenKind};
pub use types::Type;
pub use types::constant::ConstantValue;

use crate::syntax::ast::{AnnotationEntry, Expr, ExprKind, File, NodeId};
use crate::syntax::node::{Node, preorder};

// ─── Public API types ─────────────────────────────────────────────────────────

/// A parsed and analysed file. Produced by `analyze`.
pub struct Analysis {
    pub file: File,
    pub table: DeclarationTable,
    pub context: BindingContext,
}

impl Analysis {
    pub fn diagnostics(&self) -> &[Error] {
        self.context.diagnostics()
    }

    pub fn errors(&self) -> Vec<&Error> {
        self.diagnostics().iter().filter(|e| e.code.is_error()).collect()
    }

    pub fn warnings(&self) -> Vec<&Error> {
        self.diagnostics().iter().filter(|e| !e.code.is_error()).collect()
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics().iter().any(|e| e.code.is_error())
    }

    pub fn annotation_for_entry(&self, entry: NodeId) -> Option<&AnnotationDescriptor> {
        self.context.annotation.get(entry).map(|&id| self.context.descriptor(id))
    }

    /// Descriptors of the first declaration named `name`, in source order.
    /// A local `val` written as `@Ann val x = …` is found through its annotated statement.
    pub fn annotations_of(&self, name: &str) -> Vec<&AnnotationDescriptor> {
        for node in preorder(&self.file) {
            let ids = match node {
                Node::Class(c) if c.name == name => self.context.declaration_annotations.get(c.id),
                Node::Object(o) if o.name == name => self.context.declaration_annotations.get(o.id),
                Node::Function(f) if f.name == name => self.context.declaration_annotations.get(f.id),
                Node::Property(p) if p.name == name => self.context.declaration_annotations.get(p.id),
                Node::Expr(e) => match &e.kind {
                    ExprKind::Annotated { expr, .. } if declares(&expr.kind, name) => {
                        self.context.annotated_expression.get(e.id)
                    }
                    _ => continue,
                },
                _ => continue,
            };
            return ids
                .map(|ids| ids.iter().map(|&id| self.context.descriptor(id)).collect())
                .unwrap_or_default();
        }
        Vec::new()
    }

    /// Every annotation entry in the file with its descriptor, in source order.
    pub fn resolved_annotations(&self) -> Vec<(&AnnotationEntry, Option<&AnnotationDescriptor>)> {
        let mut entries: Vec<&AnnotationEntry> = Vec::new();
        for node in preorder(&self.file) {
            entries.extend(node.modifiers());
            if let Node::Expr(Expr { kind: ExprKind::Annotated { annotations, .. }, .. }) = node {
                entries.extend(annotations);
            }
        }
        entries.sort_by_key(|e| e.span.clone());
        entries.into_iter().map(|e| (e, self.annotation_for_entry(e.id))).collect()
    }
}

fn declares(kind: &ExprKind, name: &str) -> bool {
    match kind {
        ExprKind::Declaration(d) => d.name() == name,
        ExprKind::Annotated { expr, .. } => declares(&expr.kind, name),
        _ => false,
    }
}

// ─── Public API ───────────────────────────────────────────────────────────────

/// Parse the source and resolve its annotations with the default configuration.
pub fn analyze(source: &str) -> Result<Analysis, Vec<Error>> {
    analyze_with(source, &ResolverConfig::default())
}

/// Lexing and parsing errors are returned as `Err`; semantic problems are
/// diagnostics on the returned `Analysis`.
pub fn analyze_with(source: &str, config: &ResolverConfig) -> Result<Analysis, Vec<Error>> {
    let tokens = syntax::lexer::Lexer::new(source).tokenize()?;
    let file = syntax::parser::Parser::new(tokens).parse()?;
    let (table, context) = analysis::resolve(&file, config);
    Ok(Analysis { file, table, context })
}

