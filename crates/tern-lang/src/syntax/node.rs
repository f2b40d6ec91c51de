use crate::syntax::ast::*;

/// How a traversal treats a node when deciding whether to descend into it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeCategory {
    /// Named functions, classes and objects: resolved through their own entry point.
    OwnBody,
    /// Top-level and member properties.
    Property,
    Other,
}

/// A set of node categories a scan must exclude, subtree and all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SkipSet {
    own_body: bool,
    property: bool,
}

impl SkipSet {
    pub const EMPTY: SkipSet = SkipSet { own_body: false, property: false };
    pub const OWN_BODY: SkipSet = SkipSet { own_body: true, property: false };
    pub const OWN_BODY_AND_PROPERTY: SkipSet = SkipSet { own_body: true, property: true };

    pub fn contains(&self, category: NodeCategory) -> bool {
        match category {
            NodeCategory::OwnBody  => self.own_body,
            NodeCategory::Property => self.property,
            NodeCategory::Other    => false,
        }
    }
}

/// Borrowed view over every traversable node kind.
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    Class(&'a ClassDecl),
    Object(&'a ObjectDecl),
    Function(&'a FunDecl),
    /// Top-level or member property.
    Property(&'a PropertyDecl),
    /// `val`/`var` in statement position.
    LocalProperty(&'a PropertyDecl),
    Param(&'a Param),
    /// `init { … }` block of a class or object.
    Init(&'a Expr),
    Expr(&'a Expr),
}

impl<'a> Node<'a> {
    /// A declaration reached as a file or class member.
    pub fn member(decl: &'a Declaration) -> Self {
        match decl {
            Declaration::Class(c)    => Node::Class(c),
            Declaration::Object(o)   => Node::Object(o),
            Declaration::Function(f) => Node::Function(f),
            Declaration::Property(p) => Node::Property(p),
        }
    }

    /// A declaration reached as a statement inside a body.
    pub fn local(decl: &'a Declaration) -> Self {
        match decl {
            Declaration::Property(p) => Node::LocalProperty(p),
            other => Node::member(other),
        }
    }

    pub fn id(&self) -> NodeId {
        match self {
            Node::Class(c)         => c.id,
            Node::Object(o)        => o.id,
            Node::Function(f)      => f.id,
            Node::Property(p)      => p.id,
            Node::LocalProperty(p) => p.id,
            Node::Param(p)         => p.id,
            Node::Init(e)          => e.id,
            Node::Expr(e)          => e.id,
        }
    }

    pub fn span(&self) -> &'a Span {
        match *self {
            Node::Class(c)         => &c.span,
            Node::Object(o)        => &o.span,
            Node::Function(f)      => &f.span,
            Node::Property(p)      => &p.span,
            Node::LocalProperty(p) => &p.span,
            Node::Param(p)         => &p.span,
            Node::Init(e)          => &e.span,
            Node::Expr(e)          => &e.span,
        }
    }

    pub fn category(&self) -> NodeCategory {
        match self {
            Node::Class(_) | Node::Object(_) | Node::Function(_) => NodeCategory::OwnBody,
            Node::Property(_) => NodeCategory::Property,
            Node::LocalProperty(_) | Node::Param(_) | Node::Init(_) | Node::Expr(_) => NodeCategory::Other,
        }
    }

    /// Modifier annotations written on a declaration. Empty for other nodes.
    pub fn modifiers(&self) -> &'a [AnnotationEntry] {
        match *self {
            Node::Class(c) => &c.annotations,
            Node::Object(o) => &o.annotations,
            Node::Function(f) => &f.annotations,
            Node::Property(p) | Node::LocalProperty(p) => &p.annotations,
            Node::Param(_) | Node::Init(_) | Node::Expr(_) => &[],
        }
    }

    /// Direct children in source order. Arguments of an annotated expression's
    /// entries come before the expression; a declaration's modifier arguments
    /// are not children, they belong to the declaring scope.
    pub fn children(&self) -> Vec<Node<'a>> {
        match *self {
            Node::Class(c) => {
                let mut out: Vec<Node<'a>> = c.params.iter().map(Node::Param).collect();
                out.extend(c.members.iter().map(member_node));
                out
            }
            Node::Object(o) => o.members.iter().map(member_node).collect(),
            Node::Function(f) => {
                let mut out: Vec<Node<'a>> = f.params.iter().map(Node::Param).collect();
                out.extend(f.body.iter().map(Node::Expr));
                out
            }
            Node::Property(p) | Node::LocalProperty(p) => p.initializer.iter().map(Node::Expr).collect(),
            Node::Param(p) => p.default.iter().map(Node::Expr).collect(),
            Node::Init(block) => vec![Node::Expr(block)],
            Node::Expr(e) => expr_children(e),
        }
    }
}

/// Every node of `file` in source order, declarations and expressions alike,
/// modifier arguments included. Iterative, so tree depth does not grow the
/// call stack.
pub fn preorder(file: &File) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut stack: Vec<Node<'_>> = file.declarations.iter().rev().map(Node::member).collect();
    while let Some(node) = stack.pop() {
        let mut next: Vec<Node<'_>> = annotation_arguments(node.modifiers()).collect();
        next.extend(node.children());
        stack.extend(next.into_iter().rev());
        out.push(node);
    }
    out
}

/// Argument expressions of `entries`, in order.
pub fn annotation_arguments(entries: &[AnnotationEntry]) -> impl Iterator<Item = Node<'_>> {
    entries.iter().flat_map(|entry| entry.args.iter().map(|a| Node::Expr(&a.value)))
}

fn member_node(member: &Member) -> Node<'_> {
    match member {
        Member::Declaration(d) => Node::member(d),
        Member::Init(block)    => Node::Init(block),
    }
}

fn expr_children(expr: &Expr) -> Vec<Node<'_>> {
    match &expr.kind {
        ExprKind::Constant(_) | ExprKind::Name(_) | ExprKind::Return(None) => Vec::new(),

        ExprKind::StringTemplate(entries) => entries
            .iter()
            .filter_map(|e| match e {
                TemplateEntry::Expr(inner) => Some(Node::Expr(inner)),
                TemplateEntry::Text(_) => None,
            })
            .collect(),

        ExprKind::Annotated { annotations, expr: inner } => {
            let mut out: Vec<Node<'_>> = annotation_arguments(annotations).collect();
            out.push(Node::Expr(inner));
            out
        }

        ExprKind::Paren(inner)
        | ExprKind::Unary { operand: inner, .. }
        | ExprKind::Return(Some(inner))
        | ExprKind::Assign { value: inner, .. } => vec![Node::Expr(inner)],

        ExprKind::Call { args, .. } => args.iter().map(|a| Node::Expr(&a.value)).collect(),

        ExprKind::Binary { left, right, .. } => vec![Node::Expr(left), Node::Expr(right)],

        ExprKind::If { condition, then_branch, else_branch } => {
            let mut out = vec![Node::Expr(condition), Node::Expr(then_branch)];
            out.extend(else_branch.iter().map(|e| Node::Expr(e)));
            out
        }

        ExprKind::While { condition, body } => vec![Node::Expr(condition), Node::Expr(body)],

        ExprKind::Block(stmts) => stmts.iter().map(Node::Expr).collect(),

        ExprKind::Lambda { params, body } => {
            let mut out: Vec<Node<'_>> = params.iter().map(Node::Param).collect();
            out.extend(body.iter().map(Node::Expr));
            out
        }

        ExprKind::Declaration(decl) => vec![Node::local(decl)],
    }
}
