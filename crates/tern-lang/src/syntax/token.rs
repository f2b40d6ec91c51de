#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// `42`, `42L`: `long` is set by the `L` suffix.
    Int { value: i64, long: bool },
    /// `1.5`, `1.5f`: `float` is set by the `f` suffix.
    Floating { value: f64, float: bool },
    Bool(bool),
    Char(char),
    Null,
    /// `"text $name ${expr}"` — plain strings are templates with one text part.
    StringTemplate(Vec<TemplatePart>),
    Ident(String),

    // Keywords
    Annotation,
    Class,
    Object,
    Fun,
    Val,
    Var,
    Vararg,
    Init,
    If,
    Else,
    While,
    Return,

    // Operators
    Plus,       // +
    Minus,      // -
    Star,       // *
    Slash,      // /
    Percent,    // %
    Eq,         // =
    EqEq,       // ==
    BangEq,     // !=
    Bang,       // !
    Lt,         // <
    LtEq,       // <=
    Gt,         // >
    GtEq,       // >=
    AndAnd,     // &&
    OrOr,       // ||
    Arrow,      // ->
    At,         // @

    // Punctuation
    Colon,      // :
    Comma,      // ,
    Semicolon,  // ;
    Dot,        // .
    LParen,     // (
    RParen,     // )
    LBrace,     // {
    RBrace,     // }

    Eof,
}

/// One piece of a string template.
#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
    Text(String),
    /// `$name` or `${expr}`, already tokenized (terminated by `Eof`).
    Code(Vec<Token>),
}

impl TokenKind {
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            Self::Int { .. } | Self::Floating { .. } | Self::Bool(_) | Self::Char(_) | Self::Null
                | Self::StringTemplate(_)
        )
    }

    pub fn is_keyword(&self) -> bool {
        matches!(
            self,
            Self::Annotation | Self::Class | Self::Object | Self::Fun | Self::Val | Self::Var
                | Self::Vararg | Self::Init | Self::If | Self::Else | Self::While | Self::Return
        )
    }

    /// Tokens that may start a declaration.
    pub fn starts_declaration(&self) -> bool {
        matches!(
            self,
            Self::Annotation | Self::Class | Self::Object | Self::Fun | Self::Val | Self::Var
        )
    }
}

/// Maps an identifier string to its keyword token, or returns `Ident`.
pub fn keyword_or_ident(s: String) -> TokenKind {
    match s.as_str() {
        "annotation" => TokenKind::Annotation,
        "class"      => TokenKind::Class,
        "object"     => TokenKind::Object,
        "fun"        => TokenKind::Fun,
        "val"        => TokenKind::Val,
        "var"        => TokenKind::Var,
        "vararg"     => TokenKind::Vararg,
        "init"       => TokenKind::Init,
        "if"         => TokenKind::If,
        "else"       => TokenKind::Else,
        "while"      => TokenKind::While,
        "return"     => TokenKind::Return,
        "true"       => TokenKind::Bool(true),
        "false"      => TokenKind::Bool(false),
        "null"       => TokenKind::Null,
        _            => TokenKind::Ident(s),
    }
}

// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize, column: usize) -> Self {
        Self { kind, line, column }
    }
}
