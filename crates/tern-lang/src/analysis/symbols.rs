use std::collections::HashMap;

use crate::syntax::ast::Span;
use crate::types::Type;

// ─── Callables ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ParamInfo {
    pub name: String,
    /// Declared type. For a `vararg` parameter this is the element type.
    pub ty: Type,
    pub is_vararg: bool,
    pub has_default: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableKind {
    Function,
    Constructor,
    /// Invocation of a function-typed variable.
    Invoke,
    /// Stand-in returned when nothing could be resolved.
    Error,
}

/// Anything a call can resolve to.
#[derive(Debug, Clone, PartialEq)]
pub struct Callable {
    pub name: String,
    pub kind: CallableKind,
    pub params: Vec<ParamInfo>,
    pub return_type: Type,
}

impl Callable {
    pub fn error(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            return_type: Type::error(format!("unresolved `{name}`")),
            name,
            kind: CallableKind::Error,
            params: Vec::new(),
        }
    }

    /// Parameter types as seen from inside the body (`vararg` becomes `Array<T>`).
    pub fn param_types(&self) -> Vec<Type> {
        self.params
            .iter()
            .map(|p| if p.is_vararg { Type::Array(Box::new(p.ty.clone())) } else { p.ty.clone() })
            .collect()
    }

    pub fn has_same_signature(&self, other: &Callable) -> bool {
        self.param_types() == other.param_types()
    }
}

// ─── Descriptors ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDescriptor {
    pub name: String,
    pub is_annotation: bool,
    pub is_object: bool,
    /// Primary constructor. `None` for objects.
    pub constructor: Option<Callable>,
    /// Constructor parameters and members: property initializers, `init` blocks
    /// and constructor default values resolve here.
    pub scope_for_initializers: ScopeId,
    /// Members only: member functions and nested classes are declared here.
    pub scope_for_members: ScopeId,
}

impl ClassDescriptor {
    pub fn ty(&self) -> Type {
        Type::Class(self.name.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDescriptor {
    pub signature: Callable,
    inner: ScopeId,
}

impl FunctionDescriptor {
    pub fn new(signature: Callable, inner: ScopeId) -> Self {
        Self { signature, inner }
    }

    /// Declaring scope extended with the parameters and local declarations.
    pub fn inner_scope(&self) -> ScopeId {
        self.inner
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub name: String,
    /// `None` when neither declared nor inferable from a literal initializer.
    pub ty: Option<Type>,
    pub is_var: bool,
}

// ─── Symbol ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum SymbolKind {
    /// `Int`, `String`, … `None` for `Array`, which needs an argument.
    BuiltinType(Option<Type>),
    Class(ClassDescriptor),
    /// All overloads declared under one name in one scope.
    Functions(Vec<Callable>),
    Variable { ty: Option<Type>, mutable: bool },
}

#[derive(Debug, Clone)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    pub span: Span,
}

impl Symbol {
    pub fn new(name: impl Into<String>, kind: SymbolKind, span: Span) -> Self {
        Self { name: name.into(), kind, span }
    }

    pub fn variable(name: impl Into<String>, ty: Option<Type>, mutable: bool, span: Span) -> Self {
        Self::new(name, SymbolKind::Variable { ty, mutable }, span)
    }
}

// ─── Scope ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Builtins,
    File,
    ClassMembers,
    ClassInitializers,
    Function,
    Block,
    Lambda,
}

#[derive(Debug)]
pub struct Scope {
    pub kind: ScopeKind,
    pub parent: Option<ScopeId>,
    symbols: HashMap<String, Symbol>,
}

impl Scope {
    fn new(kind: ScopeKind, parent: Option<ScopeId>) -> Self {
        Self { kind, parent, symbols: HashMap::new() }
    }

    /// Returns `false` if the name is already taken in this scope.
    /// Functions with distinct parameter types are merged as overloads.
    pub fn declare(&mut self, sym: Symbol) -> bool {
        if !self.symbols.contains_key(&sym.name) {
            self.symbols.insert(sym.name.clone(), sym);
            return true;
        }
        let Some(existing) = self.symbols.get_mut(&sym.name) else { return false };
        match (&mut existing.kind, sym.kind) {
            (SymbolKind::Functions(overloads), SymbolKind::Functions(new)) => {
                if new.iter().any(|n| overloads.iter().any(|o| o.has_same_signature(n))) {
                    return false;
                }
                overloads.extend(new);
                true
            }
            _ => false,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Symbol> {
        self.symbols.get_mut(name)
    }
}

// ─── Scopes arena ─────────────────────────────────────────────────────────────

/// Every lexical scope of one file. Scopes are never removed, so a `ScopeId`
/// stays valid for the lifetime of the arena.
#[derive(Debug)]
pub struct Scopes {
    scopes: Vec<Scope>,
    file: ScopeId,
}

impl Scopes {
    /// A builtins scope holding the primitive types, and a file scope below it.
    pub fn new() -> Self {
        let mut builtins = Scope::new(ScopeKind::Builtins, None);
        for name in Type::BUILTIN_NAMES {
            builtins.declare(Symbol::new(name, SymbolKind::BuiltinType(Type::builtin(name)), Span::new(0, 0)));
        }
        let mut scopes = Self { scopes: vec![builtins], file: ScopeId(0) };
        scopes.file = scopes.child(ScopeId(0), ScopeKind::File);
        scopes
    }

    pub fn file(&self) -> ScopeId {
        self.file
    }

    pub fn child(&mut self, parent: ScopeId, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len() as u32);
        self.scopes.push(Scope::new(kind, Some(parent)));
        id
    }

    pub fn get(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0 as usize]
    }

    pub fn get_mut(&mut self, id: ScopeId) -> &mut Scope {
        &mut self.scopes[id.0 as usize]
    }

    /// Hang `scope` below `parent` instead of its current parent.
    pub fn reattach(&mut self, scope: ScopeId, parent: ScopeId) {
        self.get_mut(scope).parent = Some(parent);
    }

    /// Declare in `scope`. Returns `false` on redeclaration.
    pub fn declare(&mut self, scope: ScopeId, sym: Symbol) -> bool {
        self.get_mut(scope).declare(sym)
    }

    /// Innermost-to-outermost lookup starting at `scope`.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<&Symbol> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let s = self.get(id);
            if let Some(sym) = s.get(name) {
                return Some(sym);
            }
            current = s.parent;
        }
        None
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }
}

impl Default for Scopes {
    fn default() -> Self { Self::new() }
}
