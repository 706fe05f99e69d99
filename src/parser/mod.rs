use crate::ast::*;
use crate::lexer::Token;

pub struct Parser {
    tokens: Vec<(Token, Span)>,
    pos: usize,
}

#[derive(Debug, thiserror::Error)]
#[error("Parse error at token {position}: {message}")]
pub struct ParseError {
    pub code: &'static str,
    pub position: usize,
    pub span: Span,
    pub message: String,
}

type Result<T> = std::result::Result<T, ParseError>;

/// Binding power of an infix operator, higher binds tighter. All are left-associative.
fn infix_precedence(token: &Token) -> Option<(u8, BinOp)> {
    let entry = match token {
        Token::OrOr => (1, BinOp::LogicalOr),
        Token::AndAnd => (2, BinOp::LogicalAnd),
        Token::EqualEqual => (3, BinOp::Equal),
        Token::NotEqual => (3, BinOp::NotEqual),
        Token::Greater => (4, BinOp::GreaterThan),
        Token::GreaterEqual => (4, BinOp::GreaterThanOrEqual),
        Token::Less => (4, BinOp::LessThan),
        Token::LessEqual => (4, BinOp::LessThanOrEqual),
        Token::Plus => (5, BinOp::Add),
        Token::Minus => (5, BinOp::Sub),
        Token::Star => (6, BinOp::Mul),
        Token::Slash => (6, BinOp::Div),
        Token::Percent => (6, BinOp::Mod),
        _ => return None,
    };
    Some(entry)
}

impl Parser {
    pub fn new(tokens: Vec<(Token, Span)>) -> Self {
        Parser { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|(_, s)| *s)
            .or_else(|| self.tokens.last().map(|(_, s)| Span { start: s.end, end: s.end }))
            .unwrap_or(Span::UNKNOWN)
    }

    /// Span of the most recently consumed token.
    fn prev_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|(_, s)| *s)
            .unwrap_or(Span::UNKNOWN)
    }

    fn token_at(&self, idx: usize) -> Option<&Token> {
        self.tokens.get(idx).map(|(t, _)| t)
    }

    fn advance(&mut self) -> Option<&Token> {
        let tok = self.tokens.get(self.pos).map(|(t, _)| t);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<Span> {
        match self.peek() {
            Some(tok) if tok == expected => {
                let span = self.peek_span();
                self.advance();
                Ok(span)
            }
            Some(tok) => Err(self.error(
                "MS-P001",
                format!("expected {}, got {}", expected.describe(), tok.describe()),
            )),
            None => Err(self.error("MS-P002", format!("expected {}, got EOF", expected.describe()))),
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.peek().cloned() {
            Some(Token::Ident(name)) => {
                self.advance();
                Ok(name)
            }
            Some(tok) => Err(self.error("MS-P003", format!("expected identifier, got {}", tok.describe()))),
            None => Err(self.error("MS-P002", "expected identifier, got EOF".into())),
        }
    }

    fn expect_type(&mut self) -> Result<Type> {
        let span = self.peek_span();
        let name = self.expect_ident()?;
        Type::from_name(&name).ok_or_else(|| ParseError {
            code: "MS-P004",
            position: self.pos - 1,
            span,
            message: format!("unknown type '{name}' (expected Int, Float, String, Bool, Unit or Array)"),
        })
    }

    fn error(&self, code: &'static str, message: String) -> ParseError {
        ParseError {
            code,
            position: self.pos,
            span: self.peek_span(),
            message,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    // ---- Top-level parsing ----

    pub fn parse_program(&mut self) -> (Program, Vec<ParseError>) {
        let mut stmts = Vec::new();
        let mut errors: Vec<ParseError> = Vec::new();
        const MAX_ERRORS: usize = 20;

        while !self.at_end() {
            if errors.len() >= MAX_ERRORS {
                break;
            }
            if self.eat(&Token::Semicolon) {
                continue;
            }
            match self.parse_stmt() {
                Ok(stmt) => stmts.push(stmt),
                Err(e) => {
                    errors.push(e);
                    self.sync_to_stmt_boundary();
                }
            }
        }

        (Program { stmts, source: None }, errors)
    }

    /// Skip ahead to something that can start a statement, stepping over
    /// whole `{…}` groups so a broken function body is discarded as a unit.
    fn sync_to_stmt_boundary(&mut self) {
        let mut depth: usize = 0;
        let start = self.pos;
        while let Some(tok) = self.peek() {
            match tok {
                Token::LBrace => depth += 1,
                Token::RBrace => {
                    if depth <= 1 {
                        self.advance();
                        return;
                    }
                    depth -= 1;
                }
                Token::Semicolon if depth == 0 => {
                    self.advance();
                    return;
                }
                Token::Var | Token::Val | Token::Def | Token::If | Token::While | Token::Return
                    if depth == 0 && self.pos > start =>
                {
                    return;
                }
                _ => {}
            }
            self.advance();
        }
    }

    // ---- Statements ----

    fn parse_stmt(&mut self) -> Result<Spanned<Stmt>> {
        let start = self.peek_span();
        let stmt = match self.peek() {
            Some(Token::Var) => {
                self.advance();
                let (name, value) = self.parse_binding()?;
                Stmt::VarDecl { name, value }
            }
            Some(Token::Val) => {
                self.advance();
                let (name, value) = self.parse_binding()?;
                Stmt::ValDecl { name, value }
            }
            Some(Token::Def) => self.parse_def()?,
            Some(Token::If) => self.parse_if()?,
            Some(Token::While) => {
                self.advance();
                let cond = self.parse_condition()?;
                let body = self.parse_block()?;
                Stmt::While { cond, body }
            }
            Some(Token::Return) => {
                self.advance();
                let value = if self.starts_expr() { Some(self.parse_expr()?) } else { None };
                Stmt::Return(value)
            }
            Some(Token::LBrace) => Stmt::Block(self.parse_block()?),
            Some(Token::Ident(_)) => match self.token_at(self.pos + 1) {
                Some(Token::Assign) => {
                    let name = self.expect_ident()?;
                    self.advance();
                    let value = self.parse_expr()?;
                    Stmt::Assignment { name, value }
                }
                Some(Token::LParen) => Stmt::Expr(self.parse_call()?),
                Some(tok) => {
                    let message = format!("expected '(' or '=' after identifier, got {}", tok.describe());
                    self.advance();
                    return Err(self.error("MS-P005", message));
                }
                None => {
                    self.advance();
                    return Err(self.error("MS-P002", "expected '(' or '=' after identifier, got EOF".into()));
                }
            },
            Some(tok) => {
                return Err(self.error("MS-P006", format!("expected a statement, got {}", tok.describe())));
            }
            None => return Err(self.error("MS-P002", "expected a statement, got EOF".into())),
        };
        self.eat(&Token::Semicolon);
        Ok(Spanned::new(stmt, start.merge(self.prev_span())))
    }

    /// `name = expr` after `var`/`val`
    fn parse_binding(&mut self) -> Result<(String, Spanned<Expr>)> {
        let name = self.expect_ident()?;
        self.expect(&Token::Assign)?;
        let value = self.parse_expr()?;
        Ok((name, value))
    }

    fn parse_def(&mut self) -> Result<Stmt> {
        self.expect(&Token::Def)?;
        let name = self.expect_ident()?;
        self.expect(&Token::LParen)?;
        let mut params = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                let param_name = self.expect_ident()?;
                self.expect(&Token::Colon)?;
                let ty = self.expect_type()?;
                params.push(Param { name: param_name, ty });
                if self.eat(&Token::Comma) {
                    continue;
                }
                self.expect(&Token::RParen)?;
                break;
            }
        }
        if self.peek() != Some(&Token::Colon) {
            return Err(self.error("MS-P007", format!("function '{name}' needs a return type, e.g. ': Unit'")));
        }
        self.advance();
        let return_type = self.expect_type()?;
        let body = self.parse_block()?;
        Ok(Stmt::DefDecl { name, params, return_type, body })
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        self.expect(&Token::If)?;
        let cond = self.parse_condition()?;
        let then_body = self.parse_block()?;
        let else_body = if self.eat(&Token::Else) {
            let start = self.peek_span();
            let stmt = match self.peek() {
                Some(Token::If) => self.parse_if()?,
                _ => Stmt::Block(self.parse_block()?),
            };
            Some(Box::new(Spanned::new(stmt, start.merge(self.prev_span()))))
        } else {
            None
        };
        Ok(Stmt::If { cond, then_body, else_body })
    }

    /// `( expr )` for `if`/`while`
    fn parse_condition(&mut self) -> Result<Spanned<Expr>> {
        self.expect(&Token::LParen)?;
        let cond = self.parse_expr()?;
        self.expect(&Token::RParen)?;
        Ok(cond)
    }

    fn parse_block(&mut self) -> Result<Block> {
        self.expect(&Token::LBrace)?;
        let mut stmts = Vec::new();
        loop {
            match self.peek() {
                Some(Token::RBrace) => {
                    self.advance();
                    return Ok(Block { stmts });
                }
                Some(Token::Semicolon) => {
                    self.advance();
                }
                None => return Err(self.error("MS-P008", "unclosed block, expected '}'".into())),
                Some(_) => stmts.push(self.parse_stmt()?),
            }
        }
    }

    // ---- Expressions ----

    fn starts_expr(&self) -> bool {
        matches!(
            self.peek(),
            Some(
                Token::Int(_)
                    | Token::Float(_)
                    | Token::Str(_)
                    | Token::Ident(_)
                    | Token::True
                    | Token::False
                    | Token::Null
                    | Token::LParen
                    | Token::Minus
                    | Token::Bang
            )
        )
    }

    pub fn parse_expr(&mut self) -> Result<Spanned<Expr>> {
        self.parse_binary(1)
    }

    /// Precedence climbing: parse operators whose precedence is at least `min_prec`.
    fn parse_binary(&mut self, min_prec: u8) -> Result<Spanned<Expr>> {
        let mut lhs = self.parse_unary()?;
        while let Some((prec, op)) = self.peek().and_then(infix_precedence) {
            if prec < min_prec {
                break;
            }
            self.advance();
            let rhs = self.parse_binary(prec + 1)?;
            let span = lhs.span.merge(rhs.span);
            lhs = Spanned::new(Expr::Operation { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }, span);
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Spanned<Expr>> {
        let start = self.peek_span();
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Negate,
            Some(Token::Bang) => UnaryOp::Not,
            _ => return self.parse_atom(),
        };
        self.advance();
        let operand = self.parse_unary()?;
        let span = start.merge(operand.span);
        Ok(Spanned::new(Expr::Unary { op, operand: Box::new(operand) }, span))
    }

    fn parse_atom(&mut self) -> Result<Spanned<Expr>> {
        let span = self.peek_span();
        let literal = match self.peek().cloned() {
            Some(Token::Int(n)) => Literal::Int(n),
            Some(Token::Float(n)) => Literal::Float(n),
            Some(Token::Str(s)) => Literal::String(s),
            Some(Token::True) => Literal::Bool(true),
            Some(Token::False) => Literal::Bool(false),
            Some(Token::Null) => Literal::Null,
            Some(Token::LParen) => {
                self.advance();
                let inner = self.parse_expr()?;
                self.expect(&Token::RParen)?;
                return Ok(inner);
            }
            Some(Token::Ident(name)) => {
                if self.token_at(self.pos + 1) == Some(&Token::LParen) {
                    return self.parse_call();
                }
                self.advance();
                return Ok(Spanned::new(Expr::Name(name), span));
            }
            Some(tok) => {
                return Err(self.error("MS-P009", format!("expected an expression, got {}", tok.describe())));
            }
            None => return Err(self.error("MS-P002", "expected an expression, got EOF".into())),
        };
        self.advance();
        Ok(Spanned::new(Expr::Literal(literal), span))
    }

    fn parse_call(&mut self) -> Result<Spanned<Expr>> {
        let start = self.peek_span();
        let callee = self.expect_ident()?;
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        if !self.eat(&Token::RParen) {
            loop {
                args.push(self.parse_expr()?);
                if self.eat(&Token::Comma) {
                    continue;
                }
                self.expect(&Token::RParen)?;
                break;
            }
        }
        Ok(Spanned::new(Expr::Call { callee, args }, start.merge(self.prev_span())))
    }
}

/// Parse a token stream. Returns the first error if any were found; use
/// [`Parser::parse_program`] directly to see all of them.
pub fn parse(tokens: Vec<(Token, Span)>) -> Result<Program> {
    let mut parser = Parser::new(tokens);
    let (program, errors) = parser.parse_program();
    match errors.into_iter().next() {
        Some(e) => Err(e),
        None => Ok(program),
    }
}
