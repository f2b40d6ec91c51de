use crate::syntax::ast::*;
use crate::error::{Error, ErrorCode};
use crate::syntax::token::{TemplatePart, Token, TokenKind};

/// Deepest expression, statement or type nesting accepted before `P003`.
pub const MAX_NESTING: usize = 64;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    next_id: u32,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::nested_in(tokens, 0, 0)
    }

    fn nested_in(tokens: Vec<Token>, next_id: u32, depth: usize) -> Self {
        Self { tokens, pos: 0, next_id, depth }
    }

    pub fn parse(mut self) -> Result<File, Vec<Error>> {
        let mut errors = Vec::new();
        let mut declarations = Vec::new();

        while !self.is_at_end() {
            let pos_before = self.pos;

            match self.parse_declaration() {
                Ok(d) => declarations.push(d),
                Err(e) => { errors.push(e); self.recover(); }
            }

            // guarantee progress: if nothing was consumed, force-advance
            // to prevent an infinite loop on unrecognised tokens
            if self.pos == pos_before {
                self.advance();
            }
        }

        if errors.is_empty() {
            Ok(File { declarations })
        } else {
            Err(errors)
        }
    }

    // ─── Annotations ─────────────────────────────────────────────────────────

    /// Zero or more `@Name` / `@Name(args)` entries.
    fn parse_annotation_entries(&mut self) -> Result<Vec<AnnotationEntry>, Error> {
        let mut entries = Vec::new();
        while self.check(TokenKind::At) {
            let span = self.span();
            self.advance();
            let name = self.expect_ident()?;
            let args = if self.matches(TokenKind::LParen) {
                let args = self.parse_value_args()?;
                self.expect(TokenKind::RParen)?;
                args
            } else {
                Vec::new()
            };
            let id = self.node_id();
            entries.push(AnnotationEntry { id, name, args, span });
        }
        Ok(entries)
    }

    /// Positional and named arguments: `(1, "a", flag = true)`.
    fn parse_value_args(&mut self) -> Result<Vec<ValueArgument>, Error> {
        let mut args = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            let name = if matches!(self.peek_kind(), TokenKind::Ident(_)) && self.peek_next_is(TokenKind::Eq) {
                let name = self.expect_ident()?;
                self.expect(TokenKind::Eq)?;
                Some(name)
            } else {
                None
            };
            let value = self.parse_expr()?;
            args.push(ValueArgument { name, value });
            if !self.matches(TokenKind::Comma) { break; }
        }
        Ok(args)
    }

    // ─── Declarations ────────────────────────────────────────────────────────

    fn parse_declaration(&mut self) -> Result<Declaration, Error> {
        let span = self.span();
        let annotations = self.parse_annotation_entries()?;
        match self.peek_kind() {
            TokenKind::Annotation => {
                self.advance();
                self.parse_class(annotations, true, span).map(Declaration::Class)
            }
            TokenKind::Class  => self.parse_class(annotations, false, span).map(Declaration::Class),
            TokenKind::Object => self.parse_object(annotations, span).map(Declaration::Object),
            TokenKind::Fun    => self.parse_fun(annotations, span).map(Declaration::Function),
            TokenKind::Val | TokenKind::Var => {
                self.parse_property(annotations, span).map(Declaration::Property)
            }
            _ => Err(self.unexpected("declaration")),
        }
    }

    fn parse_class(&mut self, annotations: Vec<AnnotationEntry>, is_annotation: bool, span: Span) -> Result<ClassDecl, Error> {
        self.expect(TokenKind::Class)?;
        let name = self.expect_ident()?;
        let params = if self.matches(TokenKind::LParen) {
            let params = self.parse_param_list(true)?;
            self.expect(TokenKind::RParen)?;
            params
        } else {
            Vec::new()
        };
        let members = if self.check(TokenKind::LBrace) { self.parse_members()? } else { Vec::new() };
        let id = self.node_id();
        Ok(ClassDecl { id, name, annotations, is_annotation, params, members, span })
    }

    fn parse_object(&mut self, annotations: Vec<AnnotationEntry>, span: Span) -> Result<ObjectDecl, Error> {
        self.expect(TokenKind::Object)?;
        let name = self.expect_ident()?;
        let members = self.parse_members()?;
        let id = self.node_id();
        Ok(ObjectDecl { id, name, annotations, members, span })
    }

    fn parse_members(&mut self) -> Result<Vec<Member>, Error> {
        self.expect(TokenKind::LBrace)?;
        let mut members = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            if self.matches(TokenKind::Init) {
                members.push(Member::Init(self.parse_block()?));
            } else {
                members.push(Member::Declaration(self.parse_declaration()?));
            }
            self.matches(TokenKind::Semicolon);
        }
        self.expect(TokenKind::RBrace)?;
        Ok(members)
    }

    fn parse_fun(&mut self, annotations: Vec<AnnotationEntry>, span: Span) -> Result<FunDecl, Error> {
        self.expect(TokenKind::Fun)?;
        let name = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;
        let params = self.parse_param_list(false)?;
        self.expect(TokenKind::RParen)?;
        let return_ty = if self.matches(TokenKind::Colon) { Some(self.parse_type()?) } else { None };
        let body = if self.check(TokenKind::LBrace) {
            Some(self.parse_block()?)
        } else if self.matches(TokenKind::Eq) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let id = self.node_id();
        Ok(FunDecl { id, name, annotations, params, return_ty, body, span })
    }

    fn parse_param_list(&mut self, allow_property: bool) -> Result<Vec<Param>, Error> {
        let mut params = Vec::new();
        while !self.check(TokenKind::RParen) && !self.is_at_end() {
            params.push(self.parse_param(allow_property)?);
            if !self.matches(TokenKind::Comma) { break; }
        }
        Ok(params)
    }

    fn parse_param(&mut self, allow_property: bool) -> Result<Param, Error> {
        let span = self.span();
        let is_property = allow_property
            && (self.matches(TokenKind::Val) || self.matches(TokenKind::Var));
        let is_vararg = self.matches(TokenKind::Vararg);
        let name = self.expect_ident()?;
        self.expect(TokenKind::Colon)?;
        let ty = self.parse_type()?;
        let default = if self.matches(TokenKind::Eq) { Some(self.parse_expr()?) } else { None };
        let id = self.node_id();
        Ok(Param { id, name, ty, default, is_vararg, is_property, span })
    }

    fn parse_property(&mut self, annotations: Vec<AnnotationEntry>, span: Span) -> Result<PropertyDecl, Error> {
        let is_var = self.advance().kind == TokenKind::Var; // `val` or `var`
        let name = self.expect_ident()?;
        let ty = if self.matches(TokenKind::Colon) { Some(self.parse_type()?) } else { None };
        let initializer = if self.matches(TokenKind::Eq) { Some(self.parse_expr()?) } else { None };
        let id = self.node_id();
        Ok(PropertyDecl { id, name, annotations, is_var, ty, initializer, span })
    }

    // ─── Statements ──────────────────────────────────────────────────────────

    /// `{ stmt* }` as an `ExprKind::Block`.
    fn parse_block(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        self.expect(TokenKind::LBrace)?;
        let stmts = self.parse_stmts_until_rbrace()?;
        self.expect(TokenKind::RBrace)?;
        Ok(self.expr(ExprKind::Block(stmts), span))
    }

    fn parse_stmts_until_rbrace(&mut self) -> Result<Vec<Expr>, Error> {
        let mut stmts = Vec::new();
        while !self.check(TokenKind::RBrace) && !self.is_at_end() {
            stmts.push(self.parse_stmt()?);
            while self.matches(TokenKind::Semicolon) {}
        }
        Ok(stmts)
    }

    fn parse_stmt(&mut self) -> Result<Expr, Error> {
        self.nested(Self::parse_stmt_inner)
    }

    fn parse_stmt_inner(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        match self.peek_kind() {
            // `@Ann(1) val a = 0` — annotations wrap the whole statement
            TokenKind::At => {
                let annotations = self.parse_annotation_entries()?;
                let inner = self.parse_stmt()?;
                Ok(self.expr(ExprKind::Annotated { annotations, expr: Box::new(inner) }, span))
            }

            kind if kind.starts_declaration() => {
                let decl = self.parse_declaration()?;
                Ok(self.expr(ExprKind::Declaration(Box::new(decl)), span))
            }

            TokenKind::Return => {
                let tok = self.advance();
                let ends_here = matches!(self.peek_kind(), TokenKind::RBrace | TokenKind::Semicolon | TokenKind::Eof)
                    || self.peek().line != tok.line;
                let value = if ends_here { None } else { Some(Box::new(self.parse_expr()?)) };
                Ok(self.expr(ExprKind::Return(value), span))
            }

            TokenKind::Ident(_) if self.peek_next_is(TokenKind::Eq) => {
                let target = self.expect_ident()?;
                self.expect(TokenKind::Eq)?;
                let value = self.parse_expr()?;
                Ok(self.expr(ExprKind::Assign { target, value: Box::new(value) }, span))
            }

            _ => self.parse_expr(),
        }
    }

    // ─── Expressions (precedence climbing) ───────────────────────────────────

    pub fn parse_expr(&mut self) -> Result<Expr, Error> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_and()?;
        while self.matches(TokenKind::OrOr) {
            let right = self.parse_and()?;
            left = self.binary(left, BinOp::Or, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_equality()?;
        while self.matches(TokenKind::AndAnd) {
            let right = self.parse_equality()?;
            left = self.binary(left, BinOp::And, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_comparison()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::EqEq   => BinOp::Eq,
                TokenKind::BangEq => BinOp::NotEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_comparison()?;
            left = self.binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Lt   => BinOp::Lt,
                TokenKind::LtEq => BinOp::LtEq,
                TokenKind::Gt   => BinOp::Gt,
                TokenKind::GtEq => BinOp::GtEq,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = self.binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus  => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = self.binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expr, Error> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek_kind() {
                TokenKind::Star    => BinOp::Mul,
                TokenKind::Slash   => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = self.binary(left, op, right);
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        self.nested(Self::parse_prefixed)
    }

    fn parse_prefixed(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        if self.matches(TokenKind::Minus) {
            let operand = self.parse_unary()?;
            return Ok(self.expr(ExprKind::Unary { op: UnOp::Neg, operand: Box::new(operand) }, span));
        }
        if self.matches(TokenKind::Bang) {
            let operand = self.parse_unary()?;
            return Ok(self.expr(ExprKind::Unary { op: UnOp::Not, operand: Box::new(operand) }, span));
        }
        if self.check(TokenKind::At) {
            let annotations = self.parse_annotation_entries()?;
            let inner = self.parse_unary()?;
            return Ok(self.expr(ExprKind::Annotated { annotations, expr: Box::new(inner) }, span));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        let tok = self.peek().clone();
        let span = Span::new(tok.line, tok.column);

        let literal = match tok.kind {
            TokenKind::Int { value, long }       => Some(Literal::Int { value, long }),
            TokenKind::Floating { value, float } => Some(Literal::Floating { value, float }),
            TokenKind::Bool(v)                   => Some(Literal::Bool(v)),
            TokenKind::Char(c)                   => Some(Literal::Char(c)),
            TokenKind::Null                      => Some(Literal::Null),
            _ => None,
        };
        if let Some(literal) = literal {
            self.advance();
            return Ok(self.expr(ExprKind::Constant(literal), span));
        }

        match tok.kind {
            TokenKind::StringTemplate(parts) => {
                self.advance();
                let entries = self.parse_template_parts(parts)?;
                Ok(self.expr(ExprKind::StringTemplate(entries), span))
            }

            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(self.expr(ExprKind::Paren(Box::new(inner)), span))
            }

            TokenKind::LBrace => self.parse_lambda(),

            TokenKind::If => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let condition = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                let then_branch = self.parse_branch()?;
                let else_branch = if self.matches(TokenKind::Else) {
                    Some(Box::new(self.parse_branch()?))
                } else {
                    None
                };
                Ok(self.expr(ExprKind::If {
                    condition: Box::new(condition),
                    then_branch: Box::new(then_branch),
                    else_branch,
                }, span))
            }

            TokenKind::While => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let condition = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                let body = self.parse_branch()?;
                Ok(self.expr(ExprKind::While { condition: Box::new(condition), body: Box::new(body) }, span))
            }

            TokenKind::Ident(name) => {
                self.advance();
                if self.matches(TokenKind::LParen) {
                    let args = self.parse_value_args()?;
                    self.expect(TokenKind::RParen)?;
                    Ok(self.expr(ExprKind::Call { callee: name, args }, span))
                } else {
                    Ok(self.expr(ExprKind::Name(name), span))
                }
            }

            _ => Err(self.unexpected("expression")),
        }
    }

    /// Body of `if`/`else`/`while`: a block when braced, otherwise one statement.
    fn parse_branch(&mut self) -> Result<Expr, Error> {
        if self.check(TokenKind::LBrace) {
            self.parse_block()
        } else {
            self.parse_stmt()
        }
    }

    /// `{ a: Int, b: Int -> body }` or `{ body }`
    fn parse_lambda(&mut self) -> Result<Expr, Error> {
        let span = self.span();
        self.expect(TokenKind::LBrace)?;
        let mut params = Vec::new();
        if matches!(self.peek_kind(), TokenKind::Ident(_)) && self.peek_next_is(TokenKind::Colon) {
            loop {
                params.push(self.parse_param(false)?);
                if !self.matches(TokenKind::Comma) { break; }
            }
            self.expect(TokenKind::Arrow)?;
        }
        let body = self.parse_stmts_until_rbrace()?;
        self.expect(TokenKind::RBrace)?;
        Ok(self.expr(ExprKind::Lambda { params, body }, span))
    }

    fn parse_template_parts(&mut self, parts: Vec<TemplatePart>) -> Result<Vec<TemplateEntry>, Error> {
        let mut entries = Vec::with_capacity(parts.len());
        for part in parts {
            match part {
                TemplatePart::Text(s) => entries.push(TemplateEntry::Text(s)),
                TemplatePart::Code(tokens) => {
                    // Template code shares this file's node-id counter.
                    let mut sub = Parser::nested_in(tokens, self.next_id, self.depth);
                    let expr = sub.parse_expr()?;
                    if !sub.is_at_end() {
                        return Err(sub.unexpected("end of template expression"));
                    }
                    self.next_id = sub.next_id;
                    entries.push(TemplateEntry::Expr(expr));
                }
            }
        }
        Ok(entries)
    }

    // ─── Types ───────────────────────────────────────────────────────────────

    fn parse_type(&mut self) -> Result<TypeRef, Error> {
        self.nested(Self::parse_type_inner)
    }

    fn parse_type_inner(&mut self) -> Result<TypeRef, Error> {
        let span = self.span();
        let name = self.expect_ident()?;
        let mut args = Vec::new();
        if self.matches(TokenKind::Lt) {
            loop {
                args.push(self.parse_type()?);
                if !self.matches(TokenKind::Comma) { break; }
            }
            self.expect(TokenKind::Gt)?;
        }
        Ok(TypeRef { name, args, span })
    }

    // ─── Nesting ─────────────────────────────────────────────────────────────

    /// Runs `parse` one level deeper, failing with `P003` past `MAX_NESTING`.
    fn nested<T>(&mut self, parse: fn(&mut Self) -> Result<T, Error>) -> Result<T, Error> {
        if self.depth >= MAX_NESTING {
            let tok = self.peek();
            return Err(Error::new(ErrorCode::P003, tok.line, tok.column,
                format!("nesting exceeds {MAX_NESTING} levels")));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    // ─── Node construction ───────────────────────────────────────────────────

    fn node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn expr(&mut self, kind: ExprKind, span: Span) -> Expr {
        let id = self.node_id();
        Expr { id, kind, span }
    }

    fn binary(&mut self, left: Expr, op: BinOp, right: Expr) -> Expr {
        let span = left.span.clone();
        self.expr(ExprKind::Binary { left: Box::new(left), op, right: Box::new(right) }, span)
    }

    // ─── Token primitives ────────────────────────────────────────────────────

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek_kind(&self) -> TokenKind {
        self.tokens[self.pos].kind.clone()
    }

    fn peek_next_is(&self, kind: TokenKind) -> bool {
        if self.pos + 1 < self.tokens.len() {
            self.tokens[self.pos + 1].kind == kind
        } else {
            false
        }
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() { self.pos += 1; }
        tok
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.tokens[self.pos].kind == kind
    }

    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) { self.advance(); true } else { false }
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, Error> {
        if self.check(kind.clone()) {
            Ok(self.advance())
        } else {
            let tok = self.peek();
            Err(Error::new(
                ErrorCode::P002,
                tok.line,
                tok.column,
                format!("expected {:?}, found {:?}", kind, tok.kind),
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<String, Error> {
        let tok = self.advance();
        match tok.kind {
            TokenKind::Ident(s) => Ok(s),
            _ => Err(self.error_at(&tok, "expected identifier")),
        }
    }

    fn is_at_end(&self) -> bool {
        matches!(self.tokens[self.pos].kind, TokenKind::Eof)
    }

    fn span(&self) -> Span {
        let tok = self.peek();
        Span::new(tok.line, tok.column)
    }

    fn unexpected(&self, expected: &str) -> Error {
        let tok = self.peek();
        Error::new(
            ErrorCode::P001,
            tok.line,
            tok.column,
            format!("expected {}, found {:?}", expected, tok.kind),
        )
    }

    fn error_at(&self, tok: &Token, msg: &str) -> Error {
        Error::new(ErrorCode::P001, tok.line, tok.column, msg)
    }

    /// Skip tokens until something that looks like a new declaration.
    /// Used after a parse error to attempt recovery.
    fn recover(&mut self) {
        loop {
            match self.peek_kind() {
                TokenKind::Eof | TokenKind::At => break,
                kind if kind.starts_declaration() => break,
                _ => { self.advance(); }
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
