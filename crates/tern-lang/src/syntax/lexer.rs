use crate::error::{Error, ErrorCode};
use crate::syntax::token::{TemplatePart, Token, TokenKind, keyword_or_ident};

/// Deepest `"${ "${ … }" }"` nesting accepted.
const MAX_TEMPLATE_NESTING: usize = 16;

pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    line: usize,
    column: usize,
    template_depth: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self::new_at(source, 1, 1)
    }

    /// Lexer whose positions start at `line:column` — used for `${…}` template code.
    fn new_at(source: &'a str, line: usize, column: usize) -> Self {
        Self { source, bytes: source.as_bytes(), pos: 0, line, column, template_depth: 0 }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Vec<Error>> {
        let mut tokens = Vec::new();
        let mut errors = Vec::new();

        loop {
            self.skip_whitespace();

            if self.is_at_end() {
                tokens.push(Token::new(TokenKind::Eof, self.line, self.column));
                break;
            }

            match self.next_token() {
                Ok(Some(tok)) => tokens.push(tok),
                Ok(None) => {}
                Err(mut e) => errors.append(&mut e),
            }
        }

        if errors.is_empty() { Ok(tokens) } else { Err(errors) }
    }

    fn next_token(&mut self) -> Result<Option<Token>, Vec<Error>> {
        let line = self.line;
        let col = self.column;
        let ch = self.advance();

        let kind = match ch {
            b'+' => TokenKind::Plus,
            b'*' => TokenKind::Star,
            b'%' => TokenKind::Percent,
            b':' => TokenKind::Colon,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            b'.' => TokenKind::Dot,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b'@' => TokenKind::At,

            b'-' => {
                if self.peek() == b'>' { self.advance(); TokenKind::Arrow }
                else { TokenKind::Minus }
            }
            b'/' => {
                if self.peek() == b'/' { self.skip_line(); return Ok(None); }
                else if self.peek() == b'*' { self.skip_block_comment(); return Ok(None); }
                else { TokenKind::Slash }
            }
            b'=' => {
                if self.peek() == b'=' { self.advance(); TokenKind::EqEq }
                else { TokenKind::Eq }
            }
            b'!' => {
                if self.peek() == b'=' { self.advance(); TokenKind::BangEq }
                else { TokenKind::Bang }
            }
            b'<' => {
                if self.peek() == b'=' { self.advance(); TokenKind::LtEq }
                else { TokenKind::Lt }
            }
            b'>' => {
                if self.peek() == b'=' { self.advance(); TokenKind::GtEq }
                else { TokenKind::Gt }
            }
            b'&' if self.peek() == b'&' => { self.advance(); TokenKind::AndAnd }
            b'|' if self.peek() == b'|' => { self.advance(); TokenKind::OrOr }

            b'"' => TokenKind::StringTemplate(self.read_template(line, col)?),
            b'\'' => TokenKind::Char(self.read_char(line, col).map_err(|e| vec![e])?),
            b'0'..=b'9' => self.read_number(line, col).map_err(|e| vec![e])?,
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => keyword_or_ident(self.read_ident()),

            other => {
                // Consume the rest of a multi-byte character so columns stay sane.
                while !self.is_at_end() && (self.peek() & 0b1100_0000) == 0b1000_0000 {
                    self.pos += 1;
                }
                return Err(vec![Error::new(ErrorCode::L001, line, col,
                    format!("unexpected character `{}`", other as char))]);
            }
        };

        Ok(Some(Token::new(kind, line, col)))
    }

    // ─── Primitives ──────────────────────────────────────────────────────────

    fn advance(&mut self) -> u8 {
        let ch = self.bytes[self.pos];
        self.pos += 1;
        if ch == b'\n' { self.line += 1; self.column = 1; }
        else { self.column += 1; }
        ch
    }

    /// Consume one full UTF-8 character.
    fn advance_char(&mut self) -> char {
        let ch = self.source[self.pos..].chars().next().unwrap_or('\0');
        let len = ch.len_utf8().max(1);
        self.pos += len;
        if ch == '\n' { self.line += 1; self.column = 1; }
        else { self.column += 1; }
        ch
    }

    fn peek(&self) -> u8 {
        if self.is_at_end() { 0 } else { self.bytes[self.pos] }
    }

    fn peek_next(&self) -> u8 {
        if self.pos + 1 >= self.bytes.len() { 0 } else { self.bytes[self.pos + 1] }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn skip_whitespace(&mut self) {
        while !self.is_at_end() {
            match self.peek() {
                b' ' | b'\t' | b'\r' | b'\n' => { self.advance(); }
                _ => break,
            }
        }
    }

    fn skip_line(&mut self) {
        while !self.is_at_end() && self.peek() != b'\n' { self.advance(); }
    }

    fn skip_block_comment(&mut self) {
        self.advance(); // consume *
        while !self.is_at_end() {
            if self.peek() == b'*' && self.peek_next() == b'/' {
                self.advance(); // *
                self.advance(); // /
                break;
            }
            self.advance();
        }
    }

    // ─── Readers ─────────────────────────────────────────────────────────────

    fn read_escape(&mut self) -> Result<char, Error> {
        let line = self.line;
        let col = self.column;
        match self.advance_char() {
            'n'  => Ok('\n'),
            't'  => Ok('\t'),
            'r'  => Ok('\r'),
            '"'  => Ok('"'),
            '\'' => Ok('\''),
            '\\' => Ok('\\'),
            '$'  => Ok('$'),
            other => Err(Error::new(ErrorCode::L003, line, col,
                format!("unknown escape sequence `\\{other}`"))),
        }
    }

    fn read_template(&mut self, start_line: usize, start_col: usize) -> Result<Vec<TemplatePart>, Vec<Error>> {
        let mut parts = Vec::new();
        let mut text = String::new();
        let mut errors = Vec::new();

        loop {
            if self.is_at_end() || self.peek() == b'\n' {
                errors.push(Error::new(ErrorCode::L002, start_line, start_col,
                    "unterminated string literal"));
                return Err(errors);
            }
            match self.peek() {
                b'"' => { self.advance(); break; }
                b'\\' => {
                    self.advance();
                    // Keep consuming after a bad escape so the rest of the
                    // string does not produce cascading errors.
                    match self.read_escape() {
                        Ok(c) => text.push(c),
                        Err(e) => errors.push(e),
                    }
                }
                b'$' if self.peek_next() == b'{' => {
                    if !text.is_empty() { parts.push(TemplatePart::Text(std::mem::take(&mut text))); }
                    self.advance(); // $
                    self.advance(); // {
                    match self.read_template_code(start_line, start_col) {
                        Ok(tokens) => parts.push(TemplatePart::Code(tokens)),
                        Err(mut e) => { errors.append(&mut e); return Err(errors); }
                    }
                }
                b'$' if self.peek_next().is_ascii_alphabetic() || self.peek_next() == b'_' => {
                    if !text.is_empty() { parts.push(TemplatePart::Text(std::mem::take(&mut text))); }
                    self.advance(); // $
                    let (line, col) = (self.line, self.column);
                    let first = self.advance();
                    let name = self.read_ident_from(first);
                    parts.push(TemplatePart::Code(vec![
                        Token::new(keyword_or_ident(name), line, col),
                        Token::new(TokenKind::Eof, self.line, self.column),
                    ]));
                }
                _ => text.push(self.advance_char()),
            }
        }

        if !errors.is_empty() { return Err(errors); }
        if !text.is_empty() || parts.is_empty() {
            parts.push(TemplatePart::Text(text));
        }
        Ok(parts)
    }

    /// Tokenize the code of a `${…}` entry. The opening brace is already consumed.
    fn read_template_code(&mut self, start_line: usize, start_col: usize) -> Result<Vec<Token>, Vec<Error>> {
        let (line, col) = (self.line, self.column);
        let start = self.pos;
        let mut depth = 1usize;
        while !self.is_at_end() && self.peek() != b'\n' {
            match self.peek() {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 { break; }
                }
                _ => {}
            }
            self.advance();
        }
        if depth != 0 {
            return Err(vec![Error::new(ErrorCode::L002, start_line, start_col,
                "unterminated template expression")]);
        }
        let code = &self.source[start..self.pos];
        self.advance(); // closing }
        if self.template_depth >= MAX_TEMPLATE_NESTING {
            return Err(vec![Error::new(ErrorCode::L005, start_line, start_col,
                format!("string templates nested more than {MAX_TEMPLATE_NESTING} levels deep"))]);
        }
        let mut sub = Lexer::new_at(code, line, col);
        sub.template_depth = self.template_depth + 1;
        sub.tokenize()
    }

    fn read_char(&mut self, line: usize, col: usize) -> Result<char, Error> {
        if self.is_at_end() || self.peek() == b'\n' || self.peek() == b'\'' {
            return Err(Error::new(ErrorCode::L002, line, col, "empty or unterminated char literal"));
        }
        let c = if self.peek() == b'\\' {
            self.advance();
            self.read_escape()?
        } else {
            self.advance_char()
        };
        if self.peek() != b'\'' {
            return Err(Error::new(ErrorCode::L002, line, col, "unterminated char literal"));
        }
        self.advance();
        Ok(c)
    }

    fn read_number(&mut self, line: usize, col: usize) -> Result<TokenKind, Error> {
        let start = self.pos - 1;
        while !self.is_at_end() && self.peek().is_ascii_digit() {
            self.advance();
        }
        // consume decimal only if followed by at least one digit
        // (avoids treating `.` in `1.toString` as a decimal point)
        let mut floating = false;
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            floating = true;
            self.advance();
            while !self.is_at_end() && self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        let text = &self.source[start..self.pos];

        match self.peek() {
            b'f' | b'F' => {
                self.advance();
                let value = text.parse().map_err(|_| self.bad_number(line, col, text))?;
                Ok(TokenKind::Floating { value, float: true })
            }
            b'L' if !floating => {
                self.advance();
                let value = text.parse().map_err(|_| self.bad_number(line, col, text))?;
                Ok(TokenKind::Int { value, long: true })
            }
            _ if floating => {
                let value = text.parse().map_err(|_| self.bad_number(line, col, text))?;
                Ok(TokenKind::Floating { value, float: false })
            }
            _ => {
                let value = text.parse().map_err(|_| self.bad_number(line, col, text))?;
                Ok(TokenKind::Int { value, long: false })
            }
        }
    }

    fn bad_number(&self, line: usize, col: usize, text: &str) -> Error {
        Error::new(ErrorCode::L004, line, col, format!("number literal `{text}` is out of range"))
    }

    fn read_ident(&mut self) -> String {
        let first = self.bytes[self.pos - 1];
        self.read_ident_from(first)
    }

    fn read_ident_from(&mut self, first: u8) -> String {
        let mut s = String::new();
        s.push(first as char);
        while !self.is_at_end() && (self.peek().is_ascii_alphanumeric() || self.peek() == b'_') {
            s.push(self.advance() as char);
        }
        s
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<TokenKind> {
        Lexer::new(src).tokenize().unwrap().into_iter().map(|t| t.kind).collect()
    }

    fn lex_err(src: &str) -> Vec<Error> {
        Lexer::new(src).tokenize().unwrap_err()
    }

    fn text(s: &str) -> TokenKind {
        TokenKind::StringTemplate(vec![TemplatePart::Text(s.into())])
    }

    #[test]
    fn empty() {
        assert_eq!(lex(""), vec![TokenKind::Eof]);
    }

    #[test]
    fn integer_literal() {
        assert_eq!(lex("42"), vec![TokenKind::Int { value: 42, long: false }, TokenKind::Eof]);
    }

    #[test]
    fn long_suffix() {
        assert_eq!(lex("42L"), vec![TokenKind::Int { value: 42, long: true }, TokenKind::Eof]);
    }

    #[test]
    fn floating_literals() {
        assert_eq!(lex("3.5"), vec![TokenKind::Floating { value: 3.5, float: false }, TokenKind::Eof]);
        assert_eq!(lex("3.5f"), vec![TokenKind::Floating { value: 3.5, float: true }, TokenKind::Eof]);
        assert_eq!(lex("2f"), vec![TokenKind::Floating { value: 2.0, float: true }, TokenKind::Eof]);
    }

    #[test]
    fn dot_not_consumed_by_number() {
        assert_eq!(
            lex("1.x"),
            vec![TokenKind::Int { value: 1, long: false }, TokenKind::Dot, TokenKind::Ident("x".into()), TokenKind::Eof]
        );
    }

    #[test]
    fn keywords() {
        assert_eq!(lex("fun"),        vec![TokenKind::Fun,        TokenKind::Eof]);
        assert_eq!(lex("val"),        vec![TokenKind::Val,        TokenKind::Eof]);
        assert_eq!(lex("annotation"), vec![TokenKind::Annotation, TokenKind::Eof]);
        assert_eq!(lex("vararg"),     vec![TokenKind::Vararg,     TokenKind::Eof]);
        assert_eq!(lex("null"),       vec![TokenKind::Null,       TokenKind::Eof]);
    }

    #[test]
    fn bool_literals() {
        assert_eq!(lex("true"),  vec![TokenKind::Bool(true),  TokenKind::Eof]);
        assert_eq!(lex("false"), vec![TokenKind::Bool(false), TokenKind::Eof]);
    }

    #[test]
    fn char_literals() {
        assert_eq!(lex("'a'"), vec![TokenKind::Char('a'), TokenKind::Eof]);
        assert_eq!(lex(r"'\n'"), vec![TokenKind::Char('\n'), TokenKind::Eof]);
        assert_eq!(lex("'é'"), vec![TokenKind::Char('é'), TokenKind::Eof]);
    }

    #[test]
    fn two_char_operators() {
        assert_eq!(lex("=="), vec![TokenKind::EqEq,   TokenKind::Eof]);
        assert_eq!(lex("!="), vec![TokenKind::BangEq, TokenKind::Eof]);
        assert_eq!(lex("<="), vec![TokenKind::LtEq,   TokenKind::Eof]);
        assert_eq!(lex(">="), vec![TokenKind::GtEq,   TokenKind::Eof]);
        assert_eq!(lex("&&"), vec![TokenKind::AndAnd, TokenKind::Eof]);
        assert_eq!(lex("||"), vec![TokenKind::OrOr,   TokenKind::Eof]);
        assert_eq!(lex("->"), vec![TokenKind::Arrow,  TokenKind::Eof]);
    }

    #[test]
    fn comments_skipped() {
        assert_eq!(lex("// comment\n42"), vec![TokenKind::Int { value: 42, long: false }, TokenKind::Eof]);
        assert_eq!(lex("/* a\nb */42"), vec![TokenKind::Int { value: 42, long: false }, TokenKind::Eof]);
    }

    #[test]
    fn plain_string() {
        assert_eq!(lex(r#""hello""#), vec![text("hello"), TokenKind::Eof]);
        assert_eq!(lex(r#""""#), vec![text(""), TokenKind::Eof]);
    }

    #[test]
    fn string_escapes() {
        assert_eq!(lex(r#""a\nb""#), vec![text("a\nb"), TokenKind::Eof]);
        assert_eq!(lex(r#""cost \$5""#), vec![text("cost $5"), TokenKind::Eof]);
    }

    #[test]
    fn template_simple_name() {
        let kinds = lex(r#""hi $name!""#);
        match &kinds[0] {
            TokenKind::StringTemplate(parts) => {
                assert_eq!(parts.len(), 3);
                assert_eq!(parts[0], TemplatePart::Text("hi ".into()));
                match &parts[1] {
                    TemplatePart::Code(tokens) => {
                        assert_eq!(tokens[0].kind, TokenKind::Ident("name".into()));
                        assert_eq!(tokens[1].kind, TokenKind::Eof);
                    }
                    other => panic!("expected code part, got {other:?}"),
                }
                assert_eq!(parts[2], TemplatePart::Text("!".into()));
            }
            other => panic!("expected template, got {other:?}"),
        }
    }

    #[test]
    fn template_block_expression() {
        let kinds = lex(r#""${1 + 2}""#);
        match &kinds[0] {
            TokenKind::StringTemplate(parts) => {
                assert_eq!(parts.len(), 1);
                match &parts[0] {
                    TemplatePart::Code(tokens) => {
                        let k: Vec<_> = tokens.iter().map(|t| t.kind.clone()).collect();
                        assert_eq!(k, vec![
                            TokenKind::Int { value: 1, long: false },
                            TokenKind::Plus,
                            TokenKind::Int { value: 2, long: false },
                            TokenKind::Eof,
                        ]);
                    }
                    other => panic!("expected code part, got {other:?}"),
                }
            }
            other => panic!("expected template, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_string_error() {
        let errs = lex_err(r#""oops"#);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, ErrorCode::L002);
    }

    #[test]
    fn invalid_escape_error() {
        let errs = lex_err(r#""\q""#);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, ErrorCode::L003);
    }

    #[test]
    fn number_out_of_range() {
        let errs = lex_err("99999999999999999999");
        assert_eq!(errs[0].code, ErrorCode::L004);
    }

    #[test]
    fn unexpected_character() {
        let errs = lex_err("#");
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].code, ErrorCode::L001);
    }

    #[test]
    fn line_and_column_tracking() {
        let tokens = Lexer::new("a\n  b").tokenize().unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
    }

    #[test]
    fn annotated_property() {
        assert_eq!(
            lex("@Ann(1) val x = 0"),
            vec![
                TokenKind::At,
                TokenKind::Ident("Ann".into()),
                TokenKind::LParen,
                TokenKind::Int { value: 1, long: false },
                TokenKind::RParen,
                TokenKind::Val,
                TokenKind::Ident("x".into()),
                TokenKind::Eq,
                TokenKind::Int { value: 0, long: false },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn token_kind_helpers() {
        assert!(TokenKind::Int { value: 1, long: false }.is_literal());
        assert!(TokenKind::Fun.is_keyword());
        assert!(TokenKind::Val.starts_declaration());
        assert!(!TokenKind::Ident("x".into()).is_keyword());
    }

    fn nested_template(levels: usize) -> String {
        (0..levels).fold("1".to_string(), |inner, _| format!("\"${{{inner}}}\""))
    }

    #[test]
    fn nested_templates_within_limit() {
        assert!(Lexer::new(&nested_template(3)).tokenize().is_ok());
    }

    #[test]
    fn templates_nested_too_deeply() {
        let errs = lex_err(&nested_template(MAX_TEMPLATE_NESTING + 4));
        assert!(errs.iter().any(|e| e.code == ErrorCode::L005), "{errs:?}");
    }
}
