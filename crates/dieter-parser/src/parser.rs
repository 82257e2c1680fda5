//! Recursive-descent parser for Dieter.
//!
//! The parser consumes the token stream from `dieter-lexer` and builds the
//! AST directly, one grammar rule per method. Lookahead is a single
//! significant token; comment trivia is skipped transparently.
//!
//! Error handling follows the scanner-recovery discipline of the language:
//! a mismatch in `expect` records a [`ParseError`] at the offending token
//! and consumes it, then parsing continues. Nothing here ever panics or
//! aborts; the caller decides what to do with an errored parse.

use dieter_common::span::Span;
use dieter_common::token::{Token, TokenKind};

use crate::ast::{
    Expr, ExprKind, ForwardDecl, Module, Ordering, PrimitiveKind, ProcDecl, Program, Stmt,
    TypeExpr, TypeExprKind, VarDecl,
};
use crate::error::ParseError;

pub(crate) struct Parser<'src> {
    /// All tokens from the lexer (including the final Eof).
    tokens: Vec<Token>,
    /// Current position in the token stream.
    pos: usize,
    /// Original source text, for extracting token text via spans.
    source: &'src str,
    /// Span of the most recently consumed significant token.
    last_span: Span,
    /// Collected parse errors.
    errors: Vec<ParseError>,
}

impl<'src> Parser<'src> {
    pub(crate) fn new(tokens: Vec<Token>, source: &'src str) -> Self {
        Self {
            tokens,
            pos: 0,
            source,
            last_span: Span::new(0, 0),
            errors: Vec::new(),
        }
    }

    pub(crate) fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    // ── Lookahead ──────────────────────────────────────────────────────

    /// Index of the next significant (non-comment) token.
    fn significant_pos(&self) -> usize {
        let mut pos = self.pos;
        while pos < self.tokens.len() && self.tokens[pos].kind == TokenKind::Comment {
            pos += 1;
        }
        pos.min(self.tokens.len() - 1)
    }

    /// Kind of the current significant token.
    fn current(&self) -> TokenKind {
        self.tokens[self.significant_pos()].kind
    }

    /// Text of the current significant token.
    fn current_text(&self) -> &'src str {
        let span = self.current_span();
        &self.source[span.start as usize..span.end as usize]
    }

    /// Span of the current significant token.
    fn current_span(&self) -> Span {
        self.tokens[self.significant_pos()].span
    }

    /// Whether the current significant token matches the given kind.
    fn at(&self, kind: TokenKind) -> bool {
        self.current() == kind
    }

    // ── Consumption ────────────────────────────────────────────────────

    /// Consume the current significant token. A no-op at end of input.
    fn advance(&mut self) {
        let pos = self.significant_pos();
        if self.tokens[pos].kind != TokenKind::Eof {
            self.last_span = self.tokens[pos].span;
            self.pos = pos + 1;
        }
    }

    /// If the current token matches `kind`, consume it and return true.
    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Require the current token to be `kind`. On a mismatch, record an
    /// error and consume one token anyway (best-effort recovery).
    fn expect(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            self.error(format!(
                "expected {}, found {}",
                kind.describe(),
                self.current().describe()
            ));
            self.advance();
            false
        }
    }

    /// Return the current token's text and consume it. The grammar calls
    /// this where it needs a name; a non-identifier is reported but its
    /// text is still used so parsing can continue.
    fn grab_name(&mut self) -> String {
        if !self.at(TokenKind::Ident) {
            self.error(format!(
                "expected identifier, found {}",
                self.current().describe()
            ));
        }
        let text = self.current_text().to_string();
        self.advance();
        text
    }

    /// Record a parse error at the current position.
    fn error(&mut self, message: impl Into<String>) {
        let span = self.current_span();
        self.errors.push(ParseError::new(message, span));
    }

    // ── Grammar ────────────────────────────────────────────────────────

    /// Program := { Ordering | Forward | Module }*
    pub(crate) fn parse_program(&mut self) -> Program {
        let mut program = Program {
            forwards: Vec::new(),
            orderings: Vec::new(),
            modules: Vec::new(),
        };
        loop {
            match self.current() {
                TokenKind::Order => program.orderings.push(self.parse_ordering()),
                TokenKind::Forward => program.forwards.push(self.parse_forward()),
                TokenKind::Module => program.modules.push(self.parse_module()),
                TokenKind::Eof => break,
                _ => {
                    self.error(format!(
                        "expected `order`, `forward`, or `module`, found {}",
                        self.current().describe()
                    ));
                    self.advance();
                }
            }
        }
        program
    }

    /// Ordering := "order" Ident "<" Ident
    fn parse_ordering(&mut self) -> Ordering {
        let start = self.current_span();
        self.expect(TokenKind::Order);
        let before = self.grab_name();
        self.expect(TokenKind::Lt);
        let after = self.grab_name();
        Ordering {
            before,
            after,
            span: start.merge(self.last_span),
        }
    }

    /// Forward := "forward" Ident "(" [ TypeExpr { "," TypeExpr } ] ")" ":" TypeExpr
    fn parse_forward(&mut self) -> ForwardDecl {
        let start = self.current_span();
        self.expect(TokenKind::Forward);
        let name = self.grab_name();
        let sig_start = self.current_span();
        self.expect(TokenKind::LParen);
        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
            args.push(self.parse_type_expr());
            while self.eat(TokenKind::Comma) {
                args.push(self.parse_type_expr());
            }
        }
        self.expect(TokenKind::RParen);
        self.expect(TokenKind::Colon);
        let ret = self.parse_type_expr();
        let type_expr = TypeExpr {
            kind: TypeExprKind::Proc {
                args,
                ret: Box::new(ret),
            },
            span: sig_start.merge(self.last_span),
        };
        ForwardDecl {
            name,
            type_expr,
            span: start.merge(self.last_span),
        }
    }

    /// Module := "module" Ident [ "fails" ] { "var" VarDecl }* { ProcDecl }* "end"
    fn parse_module(&mut self) -> Module {
        let start = self.current_span();
        self.expect(TokenKind::Module);
        let name = self.grab_name();
        let fails = self.eat(TokenKind::Fails);
        let mut locals = Vec::new();
        while self.eat(TokenKind::Var) {
            locals.push(self.parse_var_decl());
        }
        let mut procs = Vec::new();
        while self.at(TokenKind::Procedure) {
            procs.push(self.parse_proc_decl());
        }
        self.expect(TokenKind::End);
        Module {
            name,
            fails,
            locals,
            procs,
            span: start.merge(self.last_span),
        }
    }

    /// VarDecl := Ident ":" TypeExpr
    fn parse_var_decl(&mut self) -> VarDecl {
        let start = self.current_span();
        let name = self.grab_name();
        self.expect(TokenKind::Colon);
        let type_expr = self.parse_type_expr();
        VarDecl {
            name,
            type_expr,
            span: start.merge(self.last_span),
        }
    }

    /// ProcDecl := "procedure" Ident "(" [ VarDecl { "," VarDecl } ] ")" ":" TypeExpr
    ///             { "var" VarDecl }* Statement
    fn parse_proc_decl(&mut self) -> ProcDecl {
        let start = self.current_span();
        self.expect(TokenKind::Procedure);
        let name = self.grab_name();
        self.expect(TokenKind::LParen);
        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
            args.push(self.parse_var_decl());
            while self.eat(TokenKind::Comma) {
                args.push(self.parse_var_decl());
            }
        }
        self.expect(TokenKind::RParen);
        self.expect(TokenKind::Colon);
        let return_type_expr = self.parse_type_expr();
        let mut locals = Vec::new();
        while self.eat(TokenKind::Var) {
            locals.push(self.parse_var_decl());
        }
        let body = self.parse_stmt();
        ProcDecl {
            name,
            args,
            locals,
            return_type_expr,
            body,
            span: start.merge(self.last_span),
        }
    }

    /// Statement := "begin" { Statement }* "end"
    ///            | "if" Expr "then" Statement [ "else" Statement ]
    ///            | "while" Expr "do" Statement
    ///            | "return" [ "final" ] Expr
    ///            | Ident "(" [ Expr { "," Expr } ] ")"
    ///            | Ident [ "[" Expr "]" ] ":=" Expr
    fn parse_stmt(&mut self) -> Stmt {
        let start = self.current_span();
        match self.current() {
            TokenKind::Begin => {
                self.advance();
                let mut steps = Vec::new();
                while !self.at(TokenKind::End) && !self.at(TokenKind::Eof) {
                    steps.push(self.parse_stmt());
                }
                self.expect(TokenKind::End);
                Stmt::Compound {
                    steps,
                    span: start.merge(self.last_span),
                }
            }
            TokenKind::If => {
                self.advance();
                let test = self.parse_expr();
                self.expect(TokenKind::Then);
                let then_branch = Box::new(self.parse_stmt());
                let else_branch = if self.eat(TokenKind::Else) {
                    Some(Box::new(self.parse_stmt()))
                } else {
                    None
                };
                Stmt::If {
                    test,
                    then_branch,
                    else_branch,
                    span: start.merge(self.last_span),
                }
            }
            TokenKind::While => {
                self.advance();
                let test = self.parse_expr();
                self.expect(TokenKind::Do);
                let body = Box::new(self.parse_stmt());
                Stmt::While {
                    test,
                    body,
                    span: start.merge(self.last_span),
                }
            }
            TokenKind::Return => {
                self.advance();
                self.eat(TokenKind::Final);
                let expr = self.parse_expr();
                Stmt::Return {
                    expr,
                    span: start.merge(self.last_span),
                }
            }
            _ => {
                let name = self.grab_name();
                if self.at(TokenKind::LParen) {
                    let args = self.parse_call_args();
                    Stmt::Call {
                        name,
                        args,
                        span: start.merge(self.last_span),
                    }
                } else {
                    let index = if self.eat(TokenKind::LBracket) {
                        let index = self.parse_expr();
                        self.expect(TokenKind::RBracket);
                        Some(index)
                    } else {
                        None
                    };
                    self.expect(TokenKind::Assign);
                    let expr = self.parse_expr();
                    Stmt::Assign {
                        name,
                        index,
                        expr,
                        span: start.merge(self.last_span),
                    }
                }
            }
        }
    }

    /// Expr := "(" Expr ")"
    ///       | "bestow" Ident Expr
    ///       | "super"
    ///       | IntLit | StringLit
    ///       | Ident [ "(" [ Expr { "," Expr } ] ")" ]
    ///       | Ident "[" Expr "]"
    fn parse_expr(&mut self) -> Expr {
        let start = self.current_span();
        match self.current() {
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr();
                self.expect(TokenKind::RParen);
                expr
            }
            TokenKind::Bestow => {
                self.advance();
                let qual = self.grab_name();
                let expr = Box::new(self.parse_expr());
                Expr {
                    kind: ExprKind::Bestow { qual, expr },
                    span: start.merge(self.last_span),
                }
            }
            TokenKind::Super => {
                self.advance();
                Expr {
                    kind: ExprKind::Super,
                    span: start,
                }
            }
            TokenKind::IntLiteral => {
                let text = self.current_text();
                let value = match text.parse::<i64>() {
                    Ok(value) => value,
                    Err(_) => {
                        self.error(format!("integer literal `{text}` out of range"));
                        0
                    }
                };
                self.advance();
                Expr {
                    kind: ExprKind::IntConst(value),
                    span: start,
                }
            }
            TokenKind::StringLiteral => {
                let text = self.current_text();
                // strip the surrounding quotes; there are no escapes
                let value = text[1..text.len() - 1].to_string();
                self.advance();
                Expr {
                    kind: ExprKind::StringConst(value),
                    span: start,
                }
            }
            _ => {
                let name = self.grab_name();
                if self.at(TokenKind::LParen) {
                    let args = self.parse_call_args();
                    Expr {
                        kind: ExprKind::Call { name, args },
                        span: start.merge(self.last_span),
                    }
                } else {
                    let index = if self.eat(TokenKind::LBracket) {
                        let index = Box::new(self.parse_expr());
                        self.expect(TokenKind::RBracket);
                        Some(index)
                    } else {
                        None
                    };
                    Expr {
                        kind: ExprKind::VarRef { name, index },
                        span: start.merge(self.last_span),
                    }
                }
            }
        }
    }

    /// `"(" [ Expr { "," Expr } ] ")"` -- shared by call statements and
    /// call expressions.
    fn parse_call_args(&mut self) -> Vec<Expr> {
        self.expect(TokenKind::LParen);
        let mut args = Vec::new();
        if !self.at(TokenKind::RParen) && !self.at(TokenKind::Eof) {
            args.push(self.parse_expr());
            while self.eat(TokenKind::Comma) {
                args.push(self.parse_expr());
            }
        }
        self.expect(TokenKind::RParen);
        args
    }

    /// TypeExpr := { Ident }* BareTypeExpr
    ///
    /// Leading identifiers accumulate as qualifiers: `a b int` parses to
    /// `Qualified(b, Qualified(a, int))`, the rightmost qualifier outermost.
    fn parse_type_expr(&mut self) -> TypeExpr {
        let start = self.current_span();
        let mut quals = Vec::new();
        while self.at(TokenKind::Ident) {
            quals.push(self.grab_name());
        }
        let mut type_expr = self.parse_bare_type_expr();
        for qual in quals {
            let span = start.merge(type_expr.span);
            type_expr = TypeExpr {
                kind: TypeExprKind::Qualified {
                    qual,
                    inner: Box::new(type_expr),
                },
                span,
            };
        }
        type_expr
    }

    /// BareType := "void"|"bool"|"int"|"rat"|"string"|"ref"
    ///           | "map" [ "from" TypeExpr ] "to" TypeExpr
    ///           | "♥" Ident
    fn parse_bare_type_expr(&mut self) -> TypeExpr {
        let start = self.current_span();
        let primitive = match self.current() {
            TokenKind::Void => Some(PrimitiveKind::Void),
            TokenKind::Bool => Some(PrimitiveKind::Bool),
            TokenKind::Int => Some(PrimitiveKind::Int),
            TokenKind::Rat => Some(PrimitiveKind::Rat),
            TokenKind::String => Some(PrimitiveKind::String),
            TokenKind::Ref => Some(PrimitiveKind::Ref),
            _ => None,
        };
        if let Some(kind) = primitive {
            self.advance();
            return TypeExpr {
                kind: TypeExprKind::Primitive(kind),
                span: start,
            };
        }
        match self.current() {
            TokenKind::Map => {
                self.advance();
                let from = if self.eat(TokenKind::From) {
                    Some(Box::new(self.parse_type_expr()))
                } else {
                    None
                };
                self.expect(TokenKind::To);
                let to = Box::new(self.parse_type_expr());
                TypeExpr {
                    kind: TypeExprKind::Map { to, from },
                    span: start.merge(self.last_span),
                }
            }
            TokenKind::Heart => {
                self.advance();
                let name = self.grab_name();
                TypeExpr {
                    kind: TypeExprKind::Var(name),
                    span: start.merge(self.last_span),
                }
            }
            _ => {
                self.error(format!(
                    "expected type expression, found {}",
                    self.current().describe()
                ));
                self.advance();
                // recovery placeholder; the driver will not typecheck an
                // errored parse
                TypeExpr {
                    kind: TypeExprKind::Primitive(PrimitiveKind::Void),
                    span: start,
                }
            }
        }
    }
}
