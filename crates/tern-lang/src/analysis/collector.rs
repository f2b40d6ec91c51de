//! Prior phase: Declaration Collector
//!
//! Walks the file once and builds the declaration table:
//! - Creates a scope per file, class (members + initializers) and function
//! - Registers classes and objects first, so types can be referenced before
//!   their declaration
//! - Resolves constructor, function and property signatures in a second step
//! - Registers local functions and classes found in function bodies and `init`
//!   blocks; local properties are left to the typing services
//! - Allocates annotation stubs for every registered declaration's modifiers

use std::collections::HashMap;

use tracing::debug;

use crate::annotations::stubs;
use crate::analysis::binding::BindingContext;
use crate::analysis::symbols::*;
use crate::error::{DiagnosticSink, Error, ErrorCode};
use crate::syntax::ast::*;
use crate::syntax::node::Node;
use crate::types::Type;

// ─── Declaration table ────────────────────────────────────────────────────────

/// Declaration node → descriptor, and declaration node → declaring scope.
#[derive(Debug, Default)]
pub struct DeclarationTable {
    classes: HashMap<NodeId, ClassDescriptor>,
    functions: HashMap<NodeId, FunctionDescriptor>,
    properties: HashMap<NodeId, PropertyDescriptor>,
    declaring_scopes: HashMap<NodeId, ScopeId>,
    order: Vec<NodeId>,
}

impl DeclarationTable {
    /// Class or object descriptor.
    pub fn class(&self, id: NodeId) -> Option<&ClassDescriptor> {
        self.classes.get(&id)
    }

    pub fn function(&self, id: NodeId) -> Option<&FunctionDescriptor> {
        self.functions.get(&id)
    }

    pub fn property(&self, id: NodeId) -> Option<&PropertyDescriptor> {
        self.properties.get(&id)
    }

    /// Scope the declaration is resolved in.
    pub fn declaring_scope(&self, id: NodeId) -> Option<ScopeId> {
        self.declaring_scopes.get(&id).copied()
    }

    /// Registered declarations in the order they were found.
    pub fn declarations(&self) -> &[NodeId] {
        &self.order
    }

    fn register(&mut self, id: NodeId, scope: ScopeId) {
        self.declaring_scopes.insert(id, scope);
        self.order.push(id);
    }
}

// ─── Collector ────────────────────────────────────────────────────────────────

/// Signature work deferred until every class name is known.
enum Pending<'a> {
    Class { decl: &'a ClassDecl, scope: ScopeId, members: ScopeId, initializers: ScopeId, declared: bool },
    Function { decl: &'a FunDecl, scope: ScopeId, inner: ScopeId },
    Property { decl: &'a PropertyDecl, scope: ScopeId, declared: bool },
}

pub struct Collector<'a> {
    scopes: Scopes,
    table: DeclarationTable,
    errors: Vec<Error>,
    pending: Vec<Pending<'a>>,
    modifiers: Vec<&'a [AnnotationEntry]>,
}

impl<'a> Collector<'a> {
    pub fn new() -> Self {
        Self {
            scopes: Scopes::new(),
            table: DeclarationTable::default(),
            errors: Vec::new(),
            pending: Vec::new(),
            modifiers: Vec::new(),
        }
    }

    /// Returns the table and a fresh binding context owning the scopes, already
    /// holding annotation stubs and any `D001`/`S001` diagnostics.
    pub fn collect(mut self, file: &'a File) -> (DeclarationTable, BindingContext) {
        let file_scope = self.scopes.file();
        for decl in &file.declarations {
            self.declare(decl, file_scope, file_scope);
        }

        for pending in std::mem::take(&mut self.pending) {
            self.resolve_signature(pending);
        }

        let mut ctx = BindingContext::new(self.scopes);
        for error in self.errors {
            ctx.report(error);
        }
        for entries in self.modifiers {
            stubs::create_annotation_stubs(&mut ctx, entries);
        }
        debug!(declarations = self.table.declarations().len(), stubs = ctx.descriptor_count(), "collected declarations");
        (self.table, ctx)
    }

    // ── Registration ──────────────────────────────────────────────────────────

    /// `scope` receives the symbol; `resolve_in` is the declaring scope recorded
    /// in the table (they differ only for member properties).
    fn declare(&mut self, decl: &'a Declaration, scope: ScopeId, resolve_in: ScopeId) {
        self.modifiers.push(decl.annotations());
        match decl {
            Declaration::Class(c)    => self.declare_class(c, scope),
            Declaration::Object(o)   => self.declare_object(o, scope),
            Declaration::Function(f) => self.declare_function(f, scope),
            Declaration::Property(p) => {
                self.table.register(p.id, resolve_in);
                let declared = self.declare_symbol(scope, Symbol::variable(&p.name, None, p.is_var, p.span.clone()));
                self.pending.push(Pending::Property { decl: p, scope: resolve_in, declared });
            }
        }
    }

    fn declare_class(&mut self, c: &'a ClassDecl, scope: ScopeId) {
        self.table.register(c.id, scope);
        let members = self.scopes.child(scope, ScopeKind::ClassMembers);
        let initializers = self.scopes.child(members, ScopeKind::ClassInitializers);

        let desc = ClassDescriptor {
            name: c.name.clone(),
            is_annotation: c.is_annotation,
            is_object: false,
            constructor: None,
            scope_for_initializers: initializers,
            scope_for_members: members,
        };
        let declared = self.declare_symbol(scope, Symbol::new(&c.name, SymbolKind::Class(desc.clone()), c.span.clone()));
        self.table.classes.insert(c.id, desc);

        self.declare_members(&c.members, members, initializers);
        self.pending.push(Pending::Class { decl: c, scope, members, initializers, declared });
    }

    fn declare_object(&mut self, o: &'a ObjectDecl, scope: ScopeId) {
        self.table.register(o.id, scope);
        let members = self.scopes.child(scope, ScopeKind::ClassMembers);
        let initializers = self.scopes.child(members, ScopeKind::ClassInitializers);

        let desc = ClassDescriptor {
            name: o.name.clone(),
            is_annotation: false,
            is_object: true,
            constructor: None,
            scope_for_initializers: initializers,
            scope_for_members: members,
        };
        self.declare_symbol(scope, Symbol::new(&o.name, SymbolKind::Class(desc.clone()), o.span.clone()));
        self.table.classes.insert(o.id, desc);

        self.declare_members(&o.members, members, initializers);
    }

    fn declare_members(&mut self, members: &'a [Member], member_scope: ScopeId, init_scope: ScopeId) {
        for member in members {
            match member {
                Member::Declaration(d @ Declaration::Property(_)) => self.declare(d, member_scope, init_scope),
                Member::Declaration(d) => self.declare(d, member_scope, member_scope),
                Member::Init(block) => self.declare_locals(Node::Init(block), init_scope),
            }
        }
    }

    fn declare_function(&mut self, f: &'a FunDecl, scope: ScopeId) {
        self.table.register(f.id, scope);
        let inner = self.scopes.child(scope, ScopeKind::Function);
        if let Some(body) = &f.body {
            self.declare_locals(Node::Expr(body), inner);
        }
        self.pending.push(Pending::Function { decl: f, scope, inner });
    }

    /// Local functions, classes and objects anywhere below `node`, lambdas included.
    /// Their own bodies are handled when they are declared.
    fn declare_locals(&mut self, node: Node<'a>, scope: ScopeId) {
        for child in node.children() {
            match child {
                Node::Function(f) => {
                    self.modifiers.push(&f.annotations);
                    self.declare_function(f, scope);
                }
                Node::Class(c) => {
                    self.modifiers.push(&c.annotations);
                    self.declare_class(c, scope);
                }
                Node::Object(o) => {
                    self.modifiers.push(&o.annotations);
                    self.declare_object(o, scope);
                }
                other => self.declare_locals(other, scope),
            }
        }
    }

    fn declare_symbol(&mut self, scope: ScopeId, sym: Symbol) -> bool {
        let (name, span) = (sym.name.clone(), sym.span.clone());
        if self.scopes.declare(scope, sym) {
            true
        } else {
            self.errors.push(Error::at(ErrorCode::D001, &span, format!("`{name}` is already declared in this scope")));
            false
        }
    }

    // ── Signatures ────────────────────────────────────────────────────────────

    fn resolve_signature(&mut self, pending: Pending<'a>) {
        match pending {
            Pending::Class { decl, scope, members, initializers, declared } => {
                let params = self.resolve_params(&decl.params, initializers);
                for (param, info) in decl.params.iter().zip(&params) {
                    let ty = Some(param_type(info));
                    let target = if param.is_property { members } else { initializers };
                    self.declare_symbol(target, Symbol::variable(&param.name, ty, false, param.span.clone()));
                }

                let constructor = Callable {
                    name: decl.name.clone(),
                    kind: CallableKind::Constructor,
                    params,
                    return_type: Type::Class(decl.name.clone()),
                };
                if let Some(desc) = self.table.classes.get_mut(&decl.id) {
                    desc.constructor = Some(constructor.clone());
                }
                if declared {
                    if let Some(Symbol { kind: SymbolKind::Class(desc), .. }) = self.scopes.get_mut(scope).get_mut(&decl.name) {
                        desc.constructor = Some(constructor);
                    }
                }
            }

            Pending::Function { decl, scope, inner } => {
                let params = self.resolve_params(&decl.params, scope);
                for (param, info) in decl.params.iter().zip(&params) {
                    self.declare_symbol(inner, Symbol::variable(&param.name, Some(param_type(info)), false, param.span.clone()));
                }

                let return_type = match (&decl.return_ty, &decl.body) {
                    (Some(tr), _) => resolve_type(&self.scopes, scope, tr, &mut self.errors),
                    (None, Some(Expr { kind: ExprKind::Block(_), .. })) | (None, None) => Type::Unit,
                    (None, Some(expr)) => infer_literal_type(expr)
                        .unwrap_or_else(|| Type::error(format!("return type of `{}` is not inferred", decl.name))),
                };

                let signature = Callable { name: decl.name.clone(), kind: CallableKind::Function, params, return_type };
                self.declare_symbol(scope, Symbol::new(&decl.name, SymbolKind::Functions(vec![signature.clone()]), decl.span.clone()));
                self.table.functions.insert(decl.id, FunctionDescriptor::new(signature, inner));
            }

            Pending::Property { decl, scope, declared } => {
                let ty = match &decl.ty {
                    Some(tr) => Some(resolve_type(&self.scopes, scope, tr, &mut self.errors)),
                    None => decl.initializer.as_ref().and_then(infer_literal_type),
                };
                if declared {
                    // Member properties are declared one scope above their initializer scope.
                    let mut current = Some(scope);
                    while let Some(id) = current {
                        if let Some(Symbol { kind: SymbolKind::Variable { ty: slot, .. }, .. }) = self.scopes.get_mut(id).get_mut(&decl.name) {
                            *slot = ty.clone();
                            break;
                        }
                        current = self.scopes.get(id).parent;
                    }
                }
                self.table.properties.insert(decl.id, PropertyDescriptor { name: decl.name.clone(), ty, is_var: decl.is_var });
            }
        }
    }

    fn resolve_params(&mut self, params: &[Param], scope: ScopeId) -> Vec<ParamInfo> {
        params
            .iter()
            .map(|p| ParamInfo {
                name: p.name.clone(),
                ty: resolve_type(&self.scopes, scope, &p.ty, &mut self.errors),
                is_vararg: p.is_vararg,
                has_default: p.default.is_some(),
            })
            .collect()
    }
}

impl Default for Collector<'_> {
    fn default() -> Self { Self::new() }
}

// ─── Helpers ──────────────────────────────────────────────────────────────────

/// Type of a parameter as a variable inside the body.
fn param_type(info: &ParamInfo) -> Type {
    if info.is_vararg { Type::Array(Box::new(info.ty.clone())) } else { info.ty.clone() }
}

/// Resolve a written type in `scope`. Unknown names report `S001` and yield the error type.
pub fn resolve_type(scopes: &Scopes, scope: ScopeId, tr: &TypeRef, sink: &mut dyn DiagnosticSink) -> Type {
    match scopes.lookup(scope, &tr.name).map(|s| &s.kind) {
        Some(SymbolKind::BuiltinType(None)) => match tr.args.as_slice() {
            [elem] => Type::Array(Box::new(resolve_type(scopes, scope, elem, sink))),
            _ => {
                sink.report(Error::at(ErrorCode::S005, &tr.span, "`Array` takes exactly one type argument"));
                Type::error("malformed array type")
            }
        },
        Some(SymbolKind::BuiltinType(Some(ty))) => ty.clone(),
        Some(SymbolKind::Class(desc)) => desc.ty(),
        _ => {
            sink.report(Error::at(ErrorCode::S001, &tr.span, format!("unresolved type `{}`", tr.name)));
            Type::error(format!("unresolved type `{}`", tr.name))
        }
    }
}

/// Type of a simple literal expression without a full inference pass.
/// Returns `None` for anything else.
pub fn infer_literal_type(expr: &Expr) -> Option<Type> {
    match &expr.kind {
        ExprKind::Constant(Literal::Int { value, long }) => {
            Some(if *long || i32::try_from(*value).is_err() { Type::Long } else { Type::Int })
        }
        ExprKind::Constant(Literal::Floating { float, .. }) => Some(if *float { Type::Float } else { Type::Double }),
        ExprKind::Constant(Literal::Bool(_)) => Some(Type::Boolean),
        ExprKind::Constant(Literal::Char(_)) => Some(Type::Char),
        ExprKind::StringTemplate(_)          => Some(Type::String),
        ExprKind::Paren(inner)               => infer_literal_type(inner),
        _ => None,
    }
}
