/// Source location attached to every node for error reporting.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

/// Identity of a syntax node within one file. Allocated by the parser, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

// ─── Top level ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct File {
    pub declarations: Vec<Declaration>,
}

/// `@Name` or `@Name(args…)`.
#[derive(Debug, Clone)]
pub struct AnnotationEntry {
    pub id: NodeId,
    /// The annotation's type reference; also the callee of its constructor call.
    pub name: String,
    pub args: Vec<ValueArgument>,
    pub span: Span,
}

/// `expr` or `name = expr` inside a call or annotation entry.
#[derive(Debug, Clone)]
pub struct ValueArgument {
    pub name: Option<String>,
    pub value: Expr,
}

// ─── Declarations ────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub enum Declaration {
    Class(ClassDecl),
    Object(ObjectDecl),
    Function(FunDecl),
    Property(PropertyDecl),
}

impl Declaration {
    pub fn id(&self) -> NodeId {
        match self {
            Declaration::Class(c)    => c.id,
            Declaration::Object(o)   => o.id,
            Declaration::Function(f) => f.id,
            Declaration::Property(p) => p.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Declaration::Class(c)    => &c.name,
            Declaration::Object(o)   => &o.name,
            Declaration::Function(f) => &f.name,
            Declaration::Property(p) => &p.name,
        }
    }

    /// Annotation entries written in front of the declaration.
    pub fn annotations(&self) -> &[AnnotationEntry] {
        match self {
            Declaration::Class(c)    => &c.annotations,
            Declaration::Object(o)   => &o.annotations,
            Declaration::Function(f) => &f.annotations,
            Declaration::Property(p) => &p.annotations,
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            Declaration::Class(c)    => &c.span,
            Declaration::Object(o)   => &o.span,
            Declaration::Function(f) => &f.span,
            Declaration::Property(p) => &p.span,
        }
    }
}

/// `annotation class Name(params) { members }` — `annotation` is optional.
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub id: NodeId,
    pub name: String,
    pub annotations: Vec<AnnotationEntry>,
    pub is_annotation: bool,
    /// Primary constructor parameters.
    pub params: Vec<Param>,
    pub members: Vec<Member>,
    pub span: Span,
}

/// `object Name { members }`
#[derive(Debug, Clone)]
pub struct ObjectDecl {
    pub id: NodeId,
    pub name: String,
    pub annotations: Vec<AnnotationEntry>,
    pub members: Vec<Member>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Member {
    Declaration(Declaration),
    /// `init { … }` — the block is an `ExprKind::Block`.
    Init(Expr),
}

#[derive(Debug, Clone)]
pub struct FunDecl {
    pub id: NodeId,
    pub name: String,
    pub annotations: Vec<AnnotationEntry>,
    pub params: Vec<Param>,
    pub return_ty: Option<TypeRef>,
    /// Block body (`ExprKind::Block`) or `= expr` body. `None` when abstract.
    pub body: Option<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub id: NodeId,
    pub name: String,
    pub ty: TypeRef,
    pub default: Option<Expr>,
    pub is_vararg: bool,
    /// `val`/`var` constructor parameter; also a member of the class.
    pub is_property: bool,
    pub span: Span,
}

/// `val x: T = init` or `var x = init`
#[derive(Debug, Clone)]
pub struct PropertyDecl {
    pub id: NodeId,
    pub name: String,
    pub annotations: Vec<AnnotationEntry>,
    pub is_var: bool,
    pub ty: Option<TypeRef>,
    pub initializer: Option<Expr>,
    pub span: Span,
}

/// A type as written: `Int`, `Array<String>`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub name: String,
    pub args: Vec<TypeRef>,
    pub span: Span,
}

// ─── Expressions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int { value: i64, long: bool },
    Floating { value: f64, float: bool },
    Bool(bool),
    Char(char),
    Null,
}

#[derive(Debug, Clone)]
pub enum TemplateEntry {
    Text(String),
    Expr(Expr),
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Numeric, boolean, char and `null` literals.
    Constant(Literal),

    /// `"text $name ${expr}"`
    StringTemplate(Vec<TemplateEntry>),

    /// A simple name reference.
    Name(String),

    /// `(expr)`
    Paren(Box<Expr>),

    /// `@A @B(1) expr` — annotations attached to an expression or local statement.
    Annotated {
        annotations: Vec<AnnotationEntry>,
        expr: Box<Expr>,
    },

    /// `name(args)`
    Call {
        callee: String,
        args: Vec<ValueArgument>,
    },

    /// `-x`, `!x`
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },

    /// `a + b`, `a == b`, etc.
    Binary {
        left: Box<Expr>,
        op: BinOp,
        right: Box<Expr>,
    },

    /// `if (cond) a else b`
    If {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
    },

    /// `while (cond) body`
    While {
        condition: Box<Expr>,
        body: Box<Expr>,
    },

    /// `{ stmt* }` — statements are expressions.
    Block(Vec<Expr>),

    /// `{ a: Int, b: Int -> body }`
    Lambda {
        params: Vec<Param>,
        body: Vec<Expr>,
    },

    /// `return` or `return expr`
    Return(Option<Box<Expr>>),

    /// `name = value`
    Assign {
        target: String,
        value: Box<Expr>,
    },

    /// A local `val`/`var`/`fun`/`class` in statement position.
    Declaration(Box<Declaration>),
}

// ─── Operators ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add, Sub, Mul, Div, Mod,
    Eq, NotEq,
    Lt, LtEq, Gt, GtEq,
    And, Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinOp::Add   => "+",
            BinOp::Sub   => "-",
            BinOp::Mul   => "*",
            BinOp::Div   => "/",
            BinOp::Mod   => "%",
            BinOp::Eq    => "==",
            BinOp::NotEq => "!=",
            BinOp::Lt    => "<",
            BinOp::LtEq  => "<=",
            BinOp::Gt    => ">",
            BinOp::GtEq  => ">=",
            BinOp::And   => "&&",
            BinOp::Or    => "||",
        };
        f.write_str(s)
    }
}
