//! Recursive-descent parser
//!
//! Statements and declarations descend directly; binary expressions use
//! precedence climbing. Parenthesized heads are parsed speculatively and
//! re-interpreted as arrow parameters when a `=>` follows. Early errors
//! (duplicate lexical declarations, invalid assignment targets, restricted
//! productions, private-name resolution) are raised here so the compiler
//! only sees well-formed programs.

use std::collections::HashSet;

use crate::ast::*;
use crate::error::{ParseError, ParseResult, SyntaxErrorKind};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind, TokenValue};

/// Scope used for duplicate-declaration early errors.
#[derive(Debug, Default)]
struct EarlyScope {
    is_function: bool,
    lexical: HashSet<Box<str>>,
    vars: HashSet<Box<str>>,
}

/// Saved function-context flags.
#[derive(Debug, Clone, Copy)]
struct FunctionContext {
    allow_await: bool,
    allow_yield: bool,
    allow_super_property: bool,
    allow_super_call: bool,
    in_derived_ctor: bool,
    in_function: bool,
    in_ctor: bool,
}

/// The parser.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    source: &'a str,
    strict: bool,
    is_module: bool,
    allow_in: bool,
    allow_await: bool,
    allow_yield: bool,
    allow_super_property: bool,
    allow_super_call: bool,
    in_derived_ctor: bool,
    in_ctor: bool,
    in_function: bool,
    iteration_depth: u32,
    switch_depth: u32,
    labels: Vec<(Box<str>, bool)>,
    scopes: Vec<EarlyScope>,
    /// Private names declared by enclosing class bodies.
    private_env: Vec<HashSet<Box<str>>>,
    /// Position of a `{ a = 1 }` shorthand initializer awaiting
    /// reinterpretation as a destructuring pattern.
    cover_init: Option<Span>,
}

/// Parse a classic script.
pub fn parse_script(source: &str) -> ParseResult<Program> {
    Parser::new(source, false)?.parse_program()
}

/// Parse a module.
pub fn parse_module(source: &str) -> ParseResult<Program> {
    Parser::new(source, true)?.parse_program()
}

/// Parse a single expression (the whole source must be one expression).
pub fn parse_expression(source: &str) -> ParseResult<Expr> {
    let mut parser = Parser::new(source, false)?;
    let expr = parser.parse_expression_value()?;
    parser.expect_eof()?;
    Ok(expr)
}

impl<'a> Parser<'a> {
    fn new(source: &'a str, is_module: bool) -> ParseResult<Self> {
        let mut lexer = Lexer::new(source)?;
        if is_module {
            lexer.set_strict_mode(true);
        }
        Ok(Self {
            lexer,
            source,
            strict: is_module,
            is_module,
            allow_in: true,
            // Top-level await is legal in modules only.
            allow_await: is_module,
            allow_yield: false,
            allow_super_property: false,
            allow_super_call: false,
            in_derived_ctor: false,
            in_ctor: false,
            in_function: false,
            iteration_depth: 0,
            switch_depth: 0,
            labels: Vec::new(),
            scopes: vec![EarlyScope {
                is_function: true,
                ..Default::default()
            }],
            private_env: Vec::new(),
            cover_init: None,
        })
    }

    // ---------------------------------------------------------------
    // Token plumbing
    // ---------------------------------------------------------------

    fn peek(&self) -> &Token {
        self.lexer.peek()
    }

    fn kind(&self) -> TokenKind {
        self.lexer.peek().kind
    }

    fn bump(&mut self) -> ParseResult<Token> {
        self.lexer.next()
    }

    fn eat(&mut self, kind: TokenKind) -> ParseResult<bool> {
        if self.kind() == kind {
            self.bump()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> ParseResult<Token> {
        if self.kind() == kind {
            self.bump()
        } else {
            Err(self.unexpected(what))
        }
    }

    fn expect_eof(&mut self) -> ParseResult<()> {
        if self.kind() == TokenKind::Eof {
            Ok(())
        } else {
            Err(self.unexpected("end of input"))
        }
    }

    fn unexpected(&self, what: &str) -> ParseError {
        let token = self.peek();
        let kind = if token.kind == TokenKind::Eof {
            SyntaxErrorKind::UnexpectedEof
        } else {
            SyntaxErrorKind::UnexpectedToken
        };
        ParseError::new(
            kind,
            format!("unexpected token, expected {what}"),
            token.line,
            token.column,
        )
    }

    fn error_at(&self, span: Span, kind: SyntaxErrorKind, message: impl Into<String>) -> ParseError {
        ParseError::new(kind, message, span.line, span.column)
    }

    fn error_here(&self, kind: SyntaxErrorKind, message: impl Into<String>) -> ParseError {
        let token = self.peek();
        ParseError::new(kind, message, token.line, token.column)
    }

    fn span_of(token: &Token) -> Span {
        Span {
            start: token.start,
            end: token.end,
            line: token.line,
            column: token.column,
        }
    }

    fn span_from(&self, start: Span) -> Span {
        Span {
            start: start.start,
            end: self.peek().start,
            line: start.line,
            column: start.column,
        }
    }

    /// A shorthand initializer that never became a pattern is an error.
    fn take_cover_init_error(&mut self) -> ParseResult<()> {
        if let Some(span) = self.cover_init.take() {
            return Err(self.error_at(
                span,
                SyntaxErrorKind::InvalidAssignmentTarget,
                "shorthand property initializer is only valid in a destructuring pattern",
            ));
        }
        Ok(())
    }

    /// Automatic semicolon insertion.
    fn expect_semicolon(&mut self) -> ParseResult<()> {
        self.take_cover_init_error()?;
        if self.eat(TokenKind::Semicolon)? {
            return Ok(());
        }
        let token = self.peek();
        if token.kind == TokenKind::RBrace || token.kind == TokenKind::Eof || token.newline_before {
            return Ok(());
        }
        Err(self.unexpected("';'"))
    }

    // ---------------------------------------------------------------
    // Early-error scopes
    // ---------------------------------------------------------------

    fn push_scope(&mut self, is_function: bool) {
        self.scopes.push(EarlyScope {
            is_function,
            ..Default::default()
        });
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare_lexical(&mut self, name: &str, span: Span) -> ParseResult<()> {
        let scope = self.scopes.last_mut().expect("scope stack empty");
        if scope.lexical.contains(name) || scope.vars.contains(name) {
            return Err(self.error_at(
                span,
                SyntaxErrorKind::DuplicateDeclaration,
                format!("identifier '{name}' has already been declared"),
            ));
        }
        scope.lexical.insert(name.into());
        Ok(())
    }

    fn declare_var(&mut self, name: &str, span: Span) -> ParseResult<()> {
        // A var conflicts with a lexical binding in any scope between the
        // declaration and the enclosing function body.
        let mut idx = self.scopes.len();
        loop {
            idx -= 1;
            let scope = &mut self.scopes[idx];
            if scope.lexical.contains(name) {
                return Err(self.error_at(
                    span,
                    SyntaxErrorKind::DuplicateDeclaration,
                    format!("identifier '{name}' has already been declared"),
                ));
            }
            scope.vars.insert(name.into());
            if scope.is_function || idx == 0 {
                break;
            }
        }
        Ok(())
    }

    /// Function declarations hoist like vars at the top level of a
    /// function or script and are lexical inside blocks.
    fn declare_function_name(&mut self, name: &str, span: Span) -> ParseResult<()> {
        let top = self.scopes.last().expect("scope stack empty");
        if top.is_function {
            // Duplicate function declarations at the same level are legal.
            let scope = self.scopes.last_mut().unwrap();
            if scope.lexical.contains(name) {
                return Err(self.error_at(
                    span,
                    SyntaxErrorKind::DuplicateDeclaration,
                    format!("identifier '{name}' has already been declared"),
                ));
            }
            scope.vars.insert(name.into());
            Ok(())
        } else {
            self.declare_lexical(name, span)
        }
    }

    fn declare_pattern(&mut self, pattern: &Pattern, kind: VarKind) -> ParseResult<()> {
        match pattern {
            Pattern::Ident { name, span } => match kind {
                VarKind::Var => self.declare_var(name, *span),
                VarKind::Let | VarKind::Const => self.declare_lexical(name, *span),
            },
            Pattern::Array { elements, rest, .. } => {
                for el in elements {
                    if let ArrayPatternElement::Element { pattern, .. } = el {
                        self.declare_pattern(pattern, kind)?;
                    }
                }
                if let Some(rest) = rest {
                    self.declare_pattern(rest, kind)?;
                }
                Ok(())
            }
            Pattern::Object { properties, rest, .. } => {
                for prop in properties {
                    self.declare_pattern(&prop.value, kind)?;
                }
                if let Some(rest) = rest {
                    self.declare_pattern(rest, kind)?;
                }
                Ok(())
            }
            Pattern::Member(expr) => Err(self.error_at(
                expr.span(),
                SyntaxErrorKind::InvalidAssignmentTarget,
                "invalid destructuring declaration target",
            )),
        }
    }

    fn check_binding_name(&self, name: &str, span: Span) -> ParseResult<()> {
        if self.strict && matches!(name, "eval" | "arguments") {
            return Err(self.error_at(
                span,
                SyntaxErrorKind::StrictModeViolation,
                format!("cannot bind '{name}' in strict mode"),
            ));
        }
        if self.strict && matches!(name, "let" | "static" | "implements" | "interface" | "package" | "private" | "protected" | "public") {
            return Err(self.error_at(
                span,
                SyntaxErrorKind::StrictModeViolation,
                format!("'{name}' is a reserved identifier in strict mode"),
            ));
        }
        if name == "await" && (self.is_module || self.allow_await) {
            return Err(self.error_at(
                span,
                SyntaxErrorKind::IllegalAwait,
                "'await' is not a valid identifier here",
            ));
        }
        if name == "yield" && (self.strict || self.allow_yield) {
            return Err(self.error_at(
                span,
                SyntaxErrorKind::IllegalYield,
                "'yield' is not a valid identifier here",
            ));
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Program
    // ---------------------------------------------------------------

    fn parse_program(&mut self) -> ParseResult<Program> {
        let mut items = Vec::new();
        self.parse_directive_prologue(&mut items)?;
        while self.kind() != TokenKind::Eof {
            let item = if self.is_module {
                self.parse_module_item()?
            } else {
                ModuleItem::Stmt(self.parse_statement_or_decl()?)
            };
            items.push(item);
        }
        Ok(Program {
            kind: if self.is_module {
                ProgramKind::Module
            } else {
                ProgramKind::Script
            },
            items,
            is_strict: self.strict,
        })
    }

    /// Consume leading string-literal expression statements; `"use strict"`
    /// switches the unit to strict mode.
    fn parse_directive_prologue(&mut self, items: &mut Vec<ModuleItem>) -> ParseResult<()> {
        while self.kind() == TokenKind::String {
            let token = self.peek().clone();
            // A directive must be a full expression statement; `"a" + 1;`
            // is not a directive.
            let stmt = self.parse_statement_or_decl()?;
            let is_directive = matches!(
                &stmt,
                Stmt::Expr { expr: Expr::String { .. }, .. }
            );
            if !is_directive {
                // Not a directive; keep the parsed statement and stop.
                items.push(ModuleItem::Stmt(stmt));
                return Ok(());
            }
            if let TokenValue::String { value, .. } = &token.value {
                if value == "use strict" {
                    self.strict = true;
                    self.lexer.set_strict_mode(true);
                }
            }
            items.push(ModuleItem::Stmt(stmt));
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Statements
    // ---------------------------------------------------------------

    fn parse_statement_or_decl(&mut self) -> ParseResult<Stmt> {
        match self.kind() {
            TokenKind::Const => self.parse_var_statement(VarKind::Const),
            TokenKind::Let if self.let_starts_declaration() => {
                self.parse_var_statement(VarKind::Let)
            }
            TokenKind::Function => {
                let func = self.parse_function_decl(false)?;
                Ok(Stmt::Function(Box::new(func)))
            }
            TokenKind::Identifier
                if self.peek().is_contextual("async") && self.async_starts_function() =>
            {
                self.bump()?;
                let func = self.parse_function_decl(true)?;
                Ok(Stmt::Function(Box::new(func)))
            }
            TokenKind::Class => {
                let class = self.parse_class(true)?;
                Ok(Stmt::Class(Box::new(class)))
            }
            _ => self.parse_statement(),
        }
    }

    /// `let` begins a declaration when followed by an identifier, `[` or `{`.
    fn let_starts_declaration(&mut self) -> bool {
        if self.strict {
            return true;
        }
        let state = self.lexer.save_state();
        let decides = if self.bump().is_ok() {
            matches!(
                self.kind(),
                TokenKind::Identifier
                    | TokenKind::LBracket
                    | TokenKind::LBrace
                    | TokenKind::Let
                    | TokenKind::Yield
                    | TokenKind::Await
            )
        } else {
            false
        };
        self.lexer.restore_state(state);
        decides
    }

    /// `async` begins a function declaration when followed by `function`
    /// on the same line.
    fn async_starts_function(&mut self) -> bool {
        let state = self.lexer.save_state();
        let decides = if self.bump().is_ok() {
            self.kind() == TokenKind::Function && !self.peek().newline_before
        } else {
            false
        };
        self.lexer.restore_state(state);
        decides
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        let start = Self::span_of(self.peek());
        match self.kind() {
            TokenKind::LBrace => {
                self.bump()?;
                self.push_scope(false);
                let body = self.parse_statement_list(TokenKind::RBrace)?;
                self.pop_scope();
                self.expect(TokenKind::RBrace, "'}'")?;
                Ok(Stmt::Block {
                    body,
                    span: self.span_from(start),
                })
            }
            TokenKind::Semicolon => {
                self.bump()?;
                Ok(Stmt::Empty { span: start })
            }
            TokenKind::Var => self.parse_var_statement(VarKind::Var),
            TokenKind::If => self.parse_if(),
            TokenKind::For => self.parse_for(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do_while(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break | TokenKind::Continue => self.parse_break_continue(),
            TokenKind::Switch => self.parse_switch(),
            TokenKind::Throw => self.parse_throw(),
            TokenKind::Try => self.parse_try(),
            TokenKind::Debugger => {
                self.bump()?;
                self.expect_semicolon()?;
                Ok(Stmt::Debugger { span: start })
            }
            TokenKind::With => Err(self.error_here(
                SyntaxErrorKind::Unsupported,
                "'with' statements are not supported",
            )),
            TokenKind::Function => Err(self.error_here(
                SyntaxErrorKind::UnexpectedToken,
                "function declarations are not allowed here",
            )),
            TokenKind::Identifier | TokenKind::Let | TokenKind::Yield | TokenKind::Await
                if self.is_label_start() =>
            {
                self.parse_labeled()
            }
            _ => {
                let expr = self.parse_expression_stmt_value()?;
                self.expect_semicolon()?;
                Ok(Stmt::Expr {
                    expr,
                    span: self.span_from(start),
                })
            }
        }
    }

    fn parse_statement_list(&mut self, terminator: TokenKind) -> ParseResult<Vec<Stmt>> {
        let mut body = Vec::new();
        while self.kind() != terminator && self.kind() != TokenKind::Eof {
            body.push(self.parse_statement_or_decl()?);
        }
        Ok(body)
    }

    fn is_label_start(&mut self) -> bool {
        // identifier `:` — but not `let:` in strict (reserved) etc.; the
        // identifier validity is rechecked when the label is consumed.
        let state = self.lexer.save_state();
        let is_label = if self.bump().is_ok() {
            self.kind() == TokenKind::Colon
        } else {
            false
        };
        self.lexer.restore_state(state);
        is_label
    }

    fn parse_labeled(&mut self) -> ParseResult<Stmt> {
        let start = Self::span_of(self.peek());
        let name_token = self.bump()?;
        let name: Box<str> = match name_token.value {
            TokenValue::Ident(name) => name.into(),
            _ => return Err(self.unexpected("label")),
        };
        self.check_binding_name(&name, start)?;
        self.expect(TokenKind::Colon, "':'")?;
        if self.labels.iter().any(|(l, _)| **l == *name) {
            return Err(self.error_at(
                start,
                SyntaxErrorKind::DuplicateDeclaration,
                format!("label '{name}' has already been declared"),
            ));
        }
        let is_iteration = matches!(
            self.kind(),
            TokenKind::For | TokenKind::While | TokenKind::Do
        );
        self.labels.push((name.clone(), is_iteration));
        let body = self.parse_statement()?;
        self.labels.pop();
        Ok(Stmt::Labeled {
            label: name,
            body: Box::new(body),
            span: self.span_from(start),
        })
    }

    fn parse_var_statement(&mut self, kind: VarKind) -> ParseResult<Stmt> {
        let start = Self::span_of(self.peek());
        self.bump()?;
        let declarations = self.parse_declarator_list(kind, true)?;
        self.expect_semicolon()?;
        Ok(Stmt::VarDecl {
            kind,
            declarations,
            span: self.span_from(start),
        })
    }

    fn parse_declarator_list(
        &mut self,
        kind: VarKind,
        require_const_init: bool,
    ) -> ParseResult<Vec<Declarator>> {
        let mut declarations = Vec::new();
        loop {
            let pattern = self.parse_binding_pattern()?;
            self.declare_pattern(&pattern, kind)?;
            let init = if self.eat(TokenKind::Assign)? {
                Some(self.parse_assignment_expr()?)
            } else {
                if matches!(pattern, Pattern::Array { .. } | Pattern::Object { .. }) {
                    return Err(self.error_here(
                        SyntaxErrorKind::UnexpectedToken,
                        "destructuring declaration must have an initializer",
                    ));
                }
                if kind == VarKind::Const && require_const_init {
                    return Err(self.error_here(
                        SyntaxErrorKind::UnexpectedToken,
                        "const declaration must have an initializer",
                    ));
                }
                None
            };
            declarations.push(Declarator { pattern, init });
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        Ok(declarations)
    }

    fn parse_if(&mut self) -> ParseResult<Stmt> {
        let start = Self::span_of(self.peek());
        self.bump()?;
        self.expect(TokenKind::LParen, "'('")?;
        let test = self.parse_expression_value()?;
        self.expect(TokenKind::RParen, "')'")?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat(TokenKind::Else)? {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            test,
            consequent,
            alternate,
            span: self.span_from(start),
        })
    }

    fn parse_while(&mut self) -> ParseResult<Stmt> {
        let start = Self::span_of(self.peek());
        self.bump()?;
        self.expect(TokenKind::LParen, "'('")?;
        let test = self.parse_expression_value()?;
        self.expect(TokenKind::RParen, "')'")?;
        self.iteration_depth += 1;
        let body = Box::new(self.parse_statement()?);
        self.iteration_depth -= 1;
        Ok(Stmt::While {
            test,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_do_while(&mut self) -> ParseResult<Stmt> {
        let start = Self::span_of(self.peek());
        self.bump()?;
        self.iteration_depth += 1;
        let body = Box::new(self.parse_statement()?);
        self.iteration_depth -= 1;
        self.expect(TokenKind::While, "'while'")?;
        self.expect(TokenKind::LParen, "'('")?;
        let test = self.parse_expression_value()?;
        self.expect(TokenKind::RParen, "')'")?;
        // The semicolon after do-while is always optional.
        self.eat(TokenKind::Semicolon)?;
        Ok(Stmt::DoWhile {
            body,
            test,
            span: self.span_from(start),
        })
    }

    fn parse_for(&mut self) -> ParseResult<Stmt> {
        let start = Self::span_of(self.peek());
        self.bump()?;
        let is_await = if self.kind() == TokenKind::Await {
            if !self.allow_await {
                return Err(self.error_here(
                    SyntaxErrorKind::IllegalAwait,
                    "'for await' is only valid in async functions and modules",
                ));
            }
            self.bump()?;
            true
        } else {
            false
        };
        self.expect(TokenKind::LParen, "'('")?;
        self.push_scope(false);
        let result = self.parse_for_tail(start, is_await);
        self.pop_scope();
        result
    }

    fn parse_for_tail(&mut self, start: Span, is_await: bool) -> ParseResult<Stmt> {
        // Empty initializer.
        if self.kind() == TokenKind::Semicolon {
            if is_await {
                return Err(self.unexpected("'of'"));
            }
            self.bump()?;
            return self.parse_classic_for(start, None);
        }

        let decl_kind = match self.kind() {
            TokenKind::Var => Some(VarKind::Var),
            TokenKind::Const => Some(VarKind::Const),
            TokenKind::Let if self.let_starts_declaration() => Some(VarKind::Let),
            _ => None,
        };

        if let Some(kind) = decl_kind {
            self.bump()?;
            let pattern = self.parse_binding_pattern()?;
            match self.kind() {
                TokenKind::In => {
                    if is_await {
                        return Err(self.unexpected("'of'"));
                    }
                    self.declare_pattern(&pattern, kind)?;
                    self.bump()?;
                    let right = self.parse_expression_value()?;
                    self.expect(TokenKind::RParen, "')'")?;
                    let body = self.parse_iteration_body()?;
                    return Ok(Stmt::ForIn {
                        left: ForTarget::Decl { kind, pattern },
                        right,
                        body,
                        span: self.span_from(start),
                    });
                }
                TokenKind::Identifier if self.peek().is_contextual("of") => {
                    self.declare_pattern(&pattern, kind)?;
                    self.bump()?;
                    let right = self.parse_assignment_expr()?;
                    self.expect(TokenKind::RParen, "')'")?;
                    let body = self.parse_iteration_body()?;
                    return Ok(Stmt::ForOf {
                        left: ForTarget::Decl { kind, pattern },
                        right,
                        body,
                        is_await,
                        span: self.span_from(start),
                    });
                }
                _ => {
                    if is_await {
                        return Err(self.unexpected("'of'"));
                    }
                    // Classic for with declarations; re-use the declarator
                    // tail for the first binding.
                    self.declare_pattern(&pattern, kind)?;
                    let init = if self.eat(TokenKind::Assign)? {
                        let saved = self.allow_in;
                        self.allow_in = false;
                        let e = self.parse_assignment_expr();
                        self.allow_in = saved;
                        Some(e?)
                    } else {
                        if matches!(pattern, Pattern::Array { .. } | Pattern::Object { .. }) {
                            return Err(self.error_here(
                                SyntaxErrorKind::UnexpectedToken,
                                "destructuring declaration must have an initializer",
                            ));
                        }
                        if kind == VarKind::Const {
                            return Err(self.error_here(
                                SyntaxErrorKind::UnexpectedToken,
                                "const declaration must have an initializer",
                            ));
                        }
                        None
                    };
                    let mut declarations = vec![Declarator { pattern, init }];
                    while self.eat(TokenKind::Comma)? {
                        let saved = self.allow_in;
                        self.allow_in = false;
                        let more = self.parse_declarator_list(kind, true);
                        self.allow_in = saved;
                        declarations.extend(more?);
                        break;
                    }
                    self.expect(TokenKind::Semicolon, "';'")?;
                    return self.parse_classic_for(
                        start,
                        Some(ForInit::VarDecl { kind, declarations }),
                    );
                }
            }
        }

        // Expression initializer (or for-in/for-of assignment target).
        let saved = self.allow_in;
        self.allow_in = false;
        let expr = self.parse_expression_value();
        self.allow_in = saved;
        let expr = expr?;

        match self.kind() {
            TokenKind::In => {
                if is_await {
                    return Err(self.unexpected("'of'"));
                }
                let pattern = self.expr_to_pattern(expr)?;
                self.bump()?;
                let right = self.parse_expression_value()?;
                self.expect(TokenKind::RParen, "')'")?;
                let body = self.parse_iteration_body()?;
                Ok(Stmt::ForIn {
                    left: ForTarget::Pattern(pattern),
                    right,
                    body,
                    span: self.span_from(start),
                })
            }
            TokenKind::Identifier if self.peek().is_contextual("of") => {
                let pattern = self.expr_to_pattern(expr)?;
                self.bump()?;
                let right = self.parse_assignment_expr()?;
                self.expect(TokenKind::RParen, "')'")?;
                let body = self.parse_iteration_body()?;
                Ok(Stmt::ForOf {
                    left: ForTarget::Pattern(pattern),
                    right,
                    body,
                    is_await,
                    span: self.span_from(start),
                })
            }
            _ => {
                if is_await {
                    return Err(self.unexpected("'of'"));
                }
                self.expect(TokenKind::Semicolon, "';'")?;
                self.parse_classic_for(start, Some(ForInit::Expr(expr)))
            }
        }
    }

    fn parse_classic_for(&mut self, start: Span, init: Option<ForInit>) -> ParseResult<Stmt> {
        let test = if self.kind() == TokenKind::Semicolon {
            None
        } else {
            Some(self.parse_expression_value()?)
        };
        self.expect(TokenKind::Semicolon, "';'")?;
        let update = if self.kind() == TokenKind::RParen {
            None
        } else {
            Some(self.parse_expression_value()?)
        };
        self.expect(TokenKind::RParen, "')'")?;
        let body = self.parse_iteration_body()?;
        Ok(Stmt::For {
            init,
            test,
            update,
            body,
            span: self.span_from(start),
        })
    }

    fn parse_iteration_body(&mut self) -> ParseResult<Box<Stmt>> {
        self.iteration_depth += 1;
        let body = self.parse_statement();
        self.iteration_depth -= 1;
        Ok(Box::new(body?))
    }

    fn parse_return(&mut self) -> ParseResult<Stmt> {
        let start = Self::span_of(self.peek());
        if !self.in_function {
            return Err(self.error_here(
                SyntaxErrorKind::IllegalReturn,
                "'return' outside of a function",
            ));
        }
        self.bump()?;
        let argument = if self.kind() == TokenKind::Semicolon
            || self.kind() == TokenKind::RBrace
            || self.kind() == TokenKind::Eof
            || self.peek().newline_before
        {
            None
        } else {
            Some(self.parse_expression_value()?)
        };
        self.expect_semicolon()?;
        Ok(Stmt::Return {
            argument,
            span: self.span_from(start),
        })
    }

    fn parse_break_continue(&mut self) -> ParseResult<Stmt> {
        let start = Self::span_of(self.peek());
        let is_break = self.kind() == TokenKind::Break;
        self.bump()?;
        let label = if self.kind() == TokenKind::Identifier && !self.peek().newline_before {
            let token = self.bump()?;
            let name: Box<str> = match token.value {
                TokenValue::Ident(name) => name.into(),
                _ => unreachable!(),
            };
            match self.labels.iter().find(|(l, _)| **l == *name) {
                None => {
                    return Err(self.error_at(
                        start,
                        if is_break {
                            SyntaxErrorKind::IllegalBreak
                        } else {
                            SyntaxErrorKind::IllegalContinue
                        },
                        format!("undefined label '{name}'"),
                    ));
                }
                Some((_, is_iteration)) => {
                    if !is_break && !is_iteration {
                        return Err(self.error_at(
                            start,
                            SyntaxErrorKind::IllegalContinue,
                            "continue label must target an iteration statement",
                        ));
                    }
                }
            }
            Some(name)
        } else {
            if is_break {
                if self.iteration_depth == 0 && self.switch_depth == 0 {
                    return Err(self.error_at(
                        start,
                        SyntaxErrorKind::IllegalBreak,
                        "'break' outside of a loop or switch",
                    ));
                }
            } else if self.iteration_depth == 0 {
                return Err(self.error_at(
                    start,
                    SyntaxErrorKind::IllegalContinue,
                    "'continue' outside of a loop",
                ));
            }
            None
        };
        self.expect_semicolon()?;
        Ok(if is_break {
            Stmt::Break {
                label,
                span: self.span_from(start),
            }
        } else {
            Stmt::Continue {
                label,
                span: self.span_from(start),
            }
        })
    }

    fn parse_switch(&mut self) -> ParseResult<Stmt> {
        let start = Self::span_of(self.peek());
        self.bump()?;
        self.expect(TokenKind::LParen, "'('")?;
        let discriminant = self.parse_expression_value()?;
        self.expect(TokenKind::RParen, "')'")?;
        self.expect(TokenKind::LBrace, "'{'")?;
        self.push_scope(false);
        self.switch_depth += 1;
        let mut cases = Vec::new();
        let mut saw_default = false;
        while self.kind() != TokenKind::RBrace && self.kind() != TokenKind::Eof {
            let test = if self.eat(TokenKind::Case)? {
                let test = self.parse_expression_value()?;
                Some(test)
            } else {
                self.expect(TokenKind::Default, "'case' or 'default'")?;
                if saw_default {
                    self.switch_depth -= 1;
                    self.pop_scope();
                    return Err(self.error_here(
                        SyntaxErrorKind::DuplicateDeclaration,
                        "more than one default clause in switch",
                    ));
                }
                saw_default = true;
                None
            };
            self.expect(TokenKind::Colon, "':'")?;
            let mut body = Vec::new();
            while !matches!(
                self.kind(),
                TokenKind::Case | TokenKind::Default | TokenKind::RBrace | TokenKind::Eof
            ) {
                body.push(self.parse_statement_or_decl()?);
            }
            cases.push(SwitchCase { test, body });
        }
        self.switch_depth -= 1;
        self.pop_scope();
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Stmt::Switch {
            discriminant,
            cases,
            span: self.span_from(start),
        })
    }

    fn parse_throw(&mut self) -> ParseResult<Stmt> {
        let start = Self::span_of(self.peek());
        self.bump()?;
        if self.peek().newline_before {
            return Err(self.error_here(
                SyntaxErrorKind::RestrictedProduction,
                "newline is not allowed after 'throw'",
            ));
        }
        let argument = self.parse_expression_value()?;
        self.expect_semicolon()?;
        Ok(Stmt::Throw {
            argument,
            span: self.span_from(start),
        })
    }

    fn parse_try(&mut self) -> ParseResult<Stmt> {
        let start = Self::span_of(self.peek());
        self.bump()?;
        self.expect(TokenKind::LBrace, "'{'")?;
        self.push_scope(false);
        let block = self.parse_statement_list(TokenKind::RBrace)?;
        self.pop_scope();
        self.expect(TokenKind::RBrace, "'}'")?;

        let handler = if self.eat(TokenKind::Catch)? {
            self.push_scope(false);
            let param = if self.eat(TokenKind::LParen)? {
                let pattern = self.parse_binding_pattern()?;
                self.declare_pattern(&pattern, VarKind::Let)?;
                self.expect(TokenKind::RParen, "')'")?;
                Some(pattern)
            } else {
                None
            };
            self.expect(TokenKind::LBrace, "'{'")?;
            let body = self.parse_statement_list(TokenKind::RBrace)?;
            self.expect(TokenKind::RBrace, "'}'")?;
            self.pop_scope();
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finalizer = if self.eat(TokenKind::Finally)? {
            self.expect(TokenKind::LBrace, "'{'")?;
            self.push_scope(false);
            let body = self.parse_statement_list(TokenKind::RBrace)?;
            self.pop_scope();
            self.expect(TokenKind::RBrace, "'}'")?;
            Some(body)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.error_here(
                SyntaxErrorKind::UnexpectedToken,
                "missing catch or finally after try",
            ));
        }

        Ok(Stmt::Try {
            block,
            handler,
            finalizer,
            span: self.span_from(start),
        })
    }

    // ---------------------------------------------------------------
    // Binding patterns
    // ---------------------------------------------------------------

    fn parse_binding_pattern(&mut self) -> ParseResult<Pattern> {
        match self.kind() {
            TokenKind::LBracket => self.parse_array_binding(),
            TokenKind::LBrace => self.parse_object_binding(),
            _ => {
                let span = Self::span_of(self.peek());
                let name = self.parse_binding_identifier()?;
                Ok(Pattern::Ident { name, span })
            }
        }
    }

    fn parse_binding_identifier(&mut self) -> ParseResult<Box<str>> {
        let span = Self::span_of(self.peek());
        let token = self.peek().clone();
        let name: Box<str> = match token.kind {
            TokenKind::Identifier => match token.value {
                TokenValue::Ident(name) => name.into(),
                _ => unreachable!(),
            },
            // Contextually legal identifiers.
            TokenKind::Let | TokenKind::Yield | TokenKind::Await => match token.value {
                TokenValue::Ident(name) => name.into(),
                _ => unreachable!(),
            },
            _ => return Err(self.unexpected("identifier")),
        };
        self.check_binding_name(&name, span)?;
        self.bump()?;
        Ok(name)
    }

    fn parse_array_binding(&mut self) -> ParseResult<Pattern> {
        let start = Self::span_of(self.peek());
        self.expect(TokenKind::LBracket, "'['")?;
        let mut elements = Vec::new();
        let mut rest = None;
        loop {
            match self.kind() {
                TokenKind::RBracket => break,
                TokenKind::Comma => {
                    self.bump()?;
                    elements.push(ArrayPatternElement::Hole);
                    continue;
                }
                TokenKind::DotDotDot => {
                    self.bump()?;
                    rest = Some(Box::new(self.parse_binding_pattern()?));
                    if self.kind() == TokenKind::Comma {
                        return Err(self.error_here(
                            SyntaxErrorKind::UnexpectedToken,
                            "rest element must be the last element",
                        ));
                    }
                    break;
                }
                _ => {
                    let pattern = self.parse_binding_pattern()?;
                    let default = if self.eat(TokenKind::Assign)? {
                        Some(self.parse_assignment_expr()?)
                    } else {
                        None
                    };
                    elements.push(ArrayPatternElement::Element { pattern, default });
                    if !self.eat(TokenKind::Comma)? {
                        break;
                    }
                }
            }
        }
        self.expect(TokenKind::RBracket, "']'")?;
        Ok(Pattern::Array {
            elements,
            rest,
            span: self.span_from(start),
        })
    }

    fn parse_object_binding(&mut self) -> ParseResult<Pattern> {
        let start = Self::span_of(self.peek());
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut properties = Vec::new();
        let mut rest = None;
        while self.kind() != TokenKind::RBrace {
            if self.eat(TokenKind::DotDotDot)? {
                let span = Self::span_of(self.peek());
                let name = self.parse_binding_identifier()?;
                rest = Some(Box::new(Pattern::Ident { name, span }));
                break;
            }
            let key = self.parse_property_key(false)?;
            let (value, default) = if self.eat(TokenKind::Colon)? {
                let value = self.parse_binding_pattern()?;
                let default = if self.eat(TokenKind::Assign)? {
                    Some(self.parse_assignment_expr()?)
                } else {
                    None
                };
                (value, default)
            } else {
                // Shorthand `{ a }` / `{ a = 1 }`.
                let span = Self::span_of(self.peek());
                let name: Box<str> = match &key {
                    PropertyKey::Ident(name) => name.clone(),
                    _ => return Err(self.unexpected("':'")),
                };
                self.check_binding_name(&name, span)?;
                let default = if self.eat(TokenKind::Assign)? {
                    Some(self.parse_assignment_expr()?)
                } else {
                    None
                };
                (Pattern::Ident { name, span }, default)
            };
            properties.push(ObjectPatternProp { key, value, default });
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Pattern::Object {
            properties,
            rest,
            span: self.span_from(start),
        })
    }

    /// Re-interpret an already-parsed expression as an assignment target
    /// pattern (destructuring assignment, for-in/of targets).
    fn expr_to_pattern(&mut self, expr: Expr) -> ParseResult<Pattern> {
        // Conversion legitimizes any pending shorthand initializer.
        self.cover_init = None;
        match expr {
            Expr::Ident { name, span } => {
                if self.strict && matches!(&*name, "eval" | "arguments") {
                    return Err(self.error_at(
                        span,
                        SyntaxErrorKind::StrictModeViolation,
                        format!("cannot assign to '{name}' in strict mode"),
                    ));
                }
                Ok(Pattern::Ident { name, span })
            }
            Expr::Member { optional, .. } | Expr::Call { optional, .. }
                if optional =>
            {
                Err(ParseError::new(
                    SyntaxErrorKind::InvalidAssignmentTarget,
                    "optional chain cannot be an assignment target",
                    0,
                    0,
                ))
            }
            Expr::Member { .. } | Expr::SuperMember { .. } => Ok(Pattern::Member(Box::new(expr))),
            Expr::Array { elements, span } => {
                let mut out = Vec::new();
                let mut rest = None;
                let count = elements.len();
                for (i, el) in elements.into_iter().enumerate() {
                    match el {
                        ArrayElement::Hole => out.push(ArrayPatternElement::Hole),
                        ArrayElement::Expr(e) => {
                            let (pattern, default) = self.expr_to_pattern_with_default(e)?;
                            out.push(ArrayPatternElement::Element { pattern, default });
                        }
                        ArrayElement::Spread(e) => {
                            if i + 1 != count {
                                return Err(self.error_at(
                                    span,
                                    SyntaxErrorKind::InvalidAssignmentTarget,
                                    "rest element must be the last element",
                                ));
                            }
                            rest = Some(Box::new(self.expr_to_pattern(e)?));
                        }
                    }
                }
                Ok(Pattern::Array { elements: out, rest, span })
            }
            Expr::Object { properties, span } => {
                let mut out = Vec::new();
                let mut rest = None;
                let count = properties.len();
                for (i, prop) in properties.into_iter().enumerate() {
                    match prop {
                        ObjectProperty::KeyValue { key, value, .. } => {
                            let (pattern, default) = self.expr_to_pattern_with_default(value)?;
                            out.push(ObjectPatternProp { key, value: pattern, default });
                        }
                        ObjectProperty::Spread(e) => {
                            if i + 1 != count {
                                return Err(self.error_at(
                                    span,
                                    SyntaxErrorKind::InvalidAssignmentTarget,
                                    "rest element must be the last element",
                                ));
                            }
                            rest = Some(Box::new(self.expr_to_pattern(e)?));
                        }
                        ObjectProperty::Method { .. } => {
                            return Err(self.error_at(
                                span,
                                SyntaxErrorKind::InvalidAssignmentTarget,
                                "invalid destructuring assignment target",
                            ));
                        }
                    }
                }
                Ok(Pattern::Object { properties: out, rest, span })
            }
            other => Err(self.error_at(
                other.span(),
                SyntaxErrorKind::InvalidAssignmentTarget,
                "invalid assignment target",
            )),
        }
    }

    fn expr_to_pattern_with_default(&mut self, expr: Expr) -> ParseResult<(Pattern, Option<Expr>)> {
        match expr {
            Expr::Assign { op: AssignOp::Assign, target, value, .. } => {
                Ok((self.expr_to_pattern(*target)?, Some(*value)))
            }
            other => Ok((self.expr_to_pattern(other)?, None)),
        }
    }

    // ---------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------

    /// Comma-expression.
    fn parse_expression_value(&mut self) -> ParseResult<Expr> {
        let start = Self::span_of(self.peek());
        let first = self.parse_assignment_expr()?;
        if self.kind() != TokenKind::Comma {
            return Ok(first);
        }
        let mut exprs = vec![first];
        while self.eat(TokenKind::Comma)? {
            exprs.push(self.parse_assignment_expr()?);
        }
        Ok(Expr::Sequence {
            exprs,
            span: self.span_from(start),
        })
    }

    /// Expression statement; rejects an ambiguous leading `{`, `function`
    /// or `class` (those are handled as statements before we get here).
    fn parse_expression_stmt_value(&mut self) -> ParseResult<Expr> {
        if matches!(self.kind(), TokenKind::LBrace | TokenKind::Class) {
            return Err(self.unexpected("expression"));
        }
        self.parse_expression_value()
    }

    pub(crate) fn parse_assignment_expr(&mut self) -> ParseResult<Expr> {
        let start = Self::span_of(self.peek());

        // yield expression
        if self.kind() == TokenKind::Yield && self.allow_yield {
            return self.parse_yield();
        }

        // Arrow functions: ident => …, async ident => …, ( … ) => …,
        // async ( … ) => …
        if let Some(arrow) = self.try_parse_arrow()? {
            return Ok(arrow);
        }

        let left = self.parse_conditional()?;

        let op = match self.kind() {
            TokenKind::Assign => AssignOp::Assign,
            TokenKind::PlusAssign => AssignOp::Add,
            TokenKind::MinusAssign => AssignOp::Sub,
            TokenKind::StarAssign => AssignOp::Mul,
            TokenKind::SlashAssign => AssignOp::Div,
            TokenKind::PercentAssign => AssignOp::Mod,
            TokenKind::StarStarAssign => AssignOp::Pow,
            TokenKind::ShlAssign => AssignOp::Shl,
            TokenKind::ShrAssign => AssignOp::Shr,
            TokenKind::UshrAssign => AssignOp::Ushr,
            TokenKind::AmpAssign => AssignOp::BitAnd,
            TokenKind::PipeAssign => AssignOp::BitOr,
            TokenKind::CaretAssign => AssignOp::BitXor,
            TokenKind::AmpAmpAssign => AssignOp::And,
            TokenKind::PipePipeAssign => AssignOp::Or,
            TokenKind::QuestionQuestionAssign => AssignOp::Nullish,
            _ => return Ok(left),
        };
        self.bump()?;
        let value = self.parse_assignment_expr()?;

        // Destructuring assignment only with plain `=`.
        if op == AssignOp::Assign
            && matches!(left, Expr::Array { .. } | Expr::Object { .. })
        {
            let pattern = self.expr_to_pattern(left)?;
            return Ok(Expr::AssignPattern {
                pattern: Box::new(pattern),
                value: Box::new(value),
                span: self.span_from(start),
            });
        }

        self.check_simple_assignment_target(&left)?;
        Ok(Expr::Assign {
            op,
            target: Box::new(left),
            value: Box::new(value),
            span: self.span_from(start),
        })
    }

    fn check_simple_assignment_target(&self, target: &Expr) -> ParseResult<()> {
        match target {
            Expr::Ident { name, span } => {
                if self.strict && matches!(&**name, "eval" | "arguments") {
                    return Err(self.error_at(
                        *span,
                        SyntaxErrorKind::StrictModeViolation,
                        format!("cannot assign to '{name}' in strict mode"),
                    ));
                }
                Ok(())
            }
            Expr::Member { optional: false, .. } | Expr::SuperMember { .. } => Ok(()),
            Expr::Member { optional: true, span, .. } => Err(self.error_at(
                *span,
                SyntaxErrorKind::InvalidAssignmentTarget,
                "optional chain cannot be an assignment target",
            )),
            other => Err(self.error_at(
                other.span(),
                SyntaxErrorKind::InvalidAssignmentTarget,
                "invalid assignment target",
            )),
        }
    }

    fn parse_yield(&mut self) -> ParseResult<Expr> {
        let start = Self::span_of(self.peek());
        self.bump()?;
        let delegate = !self.peek().newline_before && self.eat(TokenKind::Star)?;
        let argument = if delegate {
            Some(Box::new(self.parse_assignment_expr()?))
        } else if self.peek().newline_before
            || matches!(
                self.kind(),
                TokenKind::Semicolon
                    | TokenKind::RParen
                    | TokenKind::RBrace
                    | TokenKind::RBracket
                    | TokenKind::Comma
                    | TokenKind::Colon
                    | TokenKind::Eof
            )
        {
            None
        } else {
            Some(Box::new(self.parse_assignment_expr()?))
        };
        Ok(Expr::Yield {
            argument,
            delegate,
            span: self.span_from(start),
        })
    }

    /// Speculative arrow-head parse. Returns `Some` when the tokens up to
    /// and including `=>` form an arrow head; otherwise the lexer is
    /// rewound and `None` is returned.
    fn try_parse_arrow(&mut self) -> ParseResult<Option<Expr>> {
        let start = Self::span_of(self.peek());
        let is_async = self.peek().is_contextual("async")
            && !self.peek().newline_before
            && {
                let state = self.lexer.save_state();
                let ok = self.bump().is_ok()
                    && !self.peek().newline_before
                    && matches!(self.kind(), TokenKind::LParen | TokenKind::Identifier);
                self.lexer.restore_state(state);
                ok
            };

        let head_kind = if is_async {
            let state = self.lexer.save_state();
            self.bump()?; // async
            let k = self.kind();
            self.lexer.restore_state(state);
            k
        } else {
            self.kind()
        };

        match head_kind {
            TokenKind::Identifier | TokenKind::Let | TokenKind::Yield | TokenKind::Await => {
                // ident => body
                let state = self.lexer.save_state();
                if is_async {
                    self.bump()?;
                }
                let token = self.peek().clone();
                if !matches!(
                    token.kind,
                    TokenKind::Identifier | TokenKind::Let | TokenKind::Yield | TokenKind::Await
                ) {
                    self.lexer.restore_state(state);
                    return Ok(None);
                }
                self.bump()?;
                if self.kind() == TokenKind::Arrow && !self.peek().newline_before {
                    let span = Self::span_of(&token);
                    let name: Box<str> = match token.value {
                        TokenValue::Ident(name) => name.into(),
                        _ => unreachable!(),
                    };
                    self.check_binding_name(&name, span)?;
                    self.bump()?; // =>
                    let params = vec![Param {
                        pattern: Pattern::Ident { name, span },
                        default: None,
                    }];
                    let arrow = self.parse_arrow_tail(start, params, None, is_async)?;
                    return Ok(Some(arrow));
                }
                self.lexer.restore_state(state);
                Ok(None)
            }
            TokenKind::LParen => {
                let state = self.lexer.save_state();
                let saved_strict = self.strict;
                if is_async {
                    self.bump()?;
                }
                match self.try_parse_arrow_params() {
                    Ok(Some((params, rest))) => {
                        let arrow = self.parse_arrow_tail(start, params, rest, is_async)?;
                        Ok(Some(arrow))
                    }
                    Ok(None) | Err(_) => {
                        self.lexer.restore_state(state);
                        self.strict = saved_strict;
                        Ok(None)
                    }
                }
            }
            _ => Ok(None),
        }
    }

    /// Parse `( params )` followed by `=>`; `None` when no `=>` follows.
    #[allow(clippy::type_complexity)]
    fn try_parse_arrow_params(
        &mut self,
    ) -> ParseResult<Option<(Vec<Param>, Option<Pattern>)>> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        let mut rest = None;
        while self.kind() != TokenKind::RParen {
            if self.eat(TokenKind::DotDotDot)? {
                rest = Some(self.parse_binding_pattern()?);
                break;
            }
            let pattern = self.parse_binding_pattern()?;
            let default = if self.eat(TokenKind::Assign)? {
                Some(self.parse_assignment_expr()?)
            } else {
                None
            };
            params.push(Param { pattern, default });
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'")?;
        if self.kind() == TokenKind::Arrow && !self.peek().newline_before {
            self.bump()?;
            Ok(Some((params, rest)))
        } else {
            Ok(None)
        }
    }

    fn parse_arrow_tail(
        &mut self,
        start: Span,
        params: Vec<Param>,
        rest: Option<Pattern>,
        is_async: bool,
    ) -> ParseResult<Expr> {
        let ctx = self.enter_function(false, is_async, false, true);
        self.push_scope(true);
        self.declare_params(&params, &rest)?;

        let saved_strict = self.strict;
        let (body, expr_body) = if self.kind() == TokenKind::LBrace {
            self.bump()?;
            let body = self.parse_function_body()?;
            self.expect(TokenKind::RBrace, "'}'")?;
            (body, None)
        } else {
            let expr = self.parse_assignment_expr()?;
            (Vec::new(), Some(Box::new(expr)))
        };
        let body_strict = self.strict;
        self.strict = saved_strict;
        self.lexer.set_strict_mode(saved_strict);

        self.pop_scope();
        self.exit_function(ctx);

        let span = self.span_from(start);
        let source = self.slice(span);
        Ok(Expr::Arrow(Box::new(Function {
            name: None,
            params,
            rest,
            body,
            expr_body,
            is_arrow: true,
            is_async,
            is_generator: false,
            is_strict: body_strict,
            source: Some(source),
            span,
        })))
    }

    fn parse_conditional(&mut self) -> ParseResult<Expr> {
        let start = Self::span_of(self.peek());
        let test = self.parse_binary_expr(0)?;
        if !self.eat(TokenKind::Question)? {
            return Ok(test);
        }
        let saved = self.allow_in;
        self.allow_in = true;
        let consequent = self.parse_assignment_expr();
        self.allow_in = saved;
        let consequent = consequent?;
        self.expect(TokenKind::Colon, "':'")?;
        let alternate = self.parse_assignment_expr()?;
        Ok(Expr::Conditional {
            test: Box::new(test),
            consequent: Box::new(consequent),
            alternate: Box::new(alternate),
            span: self.span_from(start),
        })
    }

    /// Precedence climbing over binary and logical operators.
    fn parse_binary_expr(&mut self, min_prec: u8) -> ParseResult<Expr> {
        let start = Self::span_of(self.peek());
        let mut left = self.parse_unary()?;
        let mut saw_and_or = false;
        let mut saw_nullish = false;

        loop {
            let kind = self.kind();
            if kind == TokenKind::In && !self.allow_in {
                break;
            }
            let prec = kind.binary_precedence();
            if prec == 0 || prec < min_prec {
                break;
            }

            // `a && b ?? c` requires parentheses.
            match kind {
                TokenKind::QuestionQuestion => {
                    if saw_and_or {
                        return Err(self.error_here(
                            SyntaxErrorKind::UnexpectedToken,
                            "nullish coalescing cannot be mixed with && or || without parentheses",
                        ));
                    }
                    saw_nullish = true;
                }
                TokenKind::AmpAmp | TokenKind::PipePipe => {
                    if saw_nullish {
                        return Err(self.error_here(
                            SyntaxErrorKind::UnexpectedToken,
                            "nullish coalescing cannot be mixed with && or || without parentheses",
                        ));
                    }
                    saw_and_or = true;
                }
                _ => {}
            }

            self.bump()?;
            // `**` is right-associative; everything else is left.
            let next_min = if kind == TokenKind::StarStar { prec } else { prec + 1 };
            let right = self.parse_binary_expr(next_min)?;
            let span = self.span_from(start);

            left = match kind {
                TokenKind::AmpAmp => Expr::Logical {
                    op: LogicalOp::And,
                    left: Box::new(left),
                    right: Box::new(right),
                    span,
                },
                TokenKind::PipePipe => Expr::Logical {
                    op: LogicalOp::Or,
                    left: Box::new(left),
                    right: Box::new(right),
                    span,
                },
                TokenKind::QuestionQuestion => Expr::Logical {
                    op: LogicalOp::Nullish,
                    left: Box::new(left),
                    right: Box::new(right),
                    span,
                },
                _ => Expr::Binary {
                    op: Self::binary_op(kind),
                    left: Box::new(left),
                    right: Box::new(right),
                    span,
                },
            };
        }
        Ok(left)
    }

    fn binary_op(kind: TokenKind) -> BinaryOp {
        match kind {
            TokenKind::Plus => BinaryOp::Add,
            TokenKind::Minus => BinaryOp::Sub,
            TokenKind::Star => BinaryOp::Mul,
            TokenKind::Slash => BinaryOp::Div,
            TokenKind::Percent => BinaryOp::Mod,
            TokenKind::StarStar => BinaryOp::Pow,
            TokenKind::Shl => BinaryOp::Shl,
            TokenKind::Shr => BinaryOp::Shr,
            TokenKind::Ushr => BinaryOp::Ushr,
            TokenKind::Amp => BinaryOp::BitAnd,
            TokenKind::Pipe => BinaryOp::BitOr,
            TokenKind::Caret => BinaryOp::BitXor,
            TokenKind::Eq => BinaryOp::Eq,
            TokenKind::NotEq => BinaryOp::NotEq,
            TokenKind::StrictEq => BinaryOp::StrictEq,
            TokenKind::StrictNotEq => BinaryOp::StrictNotEq,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::LtEq => BinaryOp::LtEq,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::GtEq => BinaryOp::GtEq,
            TokenKind::In => BinaryOp::In,
            TokenKind::InstanceOf => BinaryOp::InstanceOf,
            _ => unreachable!("not a binary operator: {kind:?}"),
        }
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let start = Self::span_of(self.peek());

        // `#name in obj` brand check.
        if self.kind() == TokenKind::PrivateName {
            let token = self.bump()?;
            let name: Box<str> = match token.value {
                TokenValue::Ident(name) => name.into(),
                _ => unreachable!(),
            };
            self.check_private_name(&name, start)?;
            self.expect(TokenKind::In, "'in'")?;
            if !self.allow_in {
                return Err(self.error_at(
                    start,
                    SyntaxErrorKind::UnexpectedToken,
                    "'in' is not allowed here",
                ));
            }
            let object = self.parse_binary_expr(9)?;
            return Ok(Expr::PrivateIn {
                name,
                object: Box::new(object),
                span: self.span_from(start),
            });
        }

        let op = match self.kind() {
            TokenKind::Plus => Some(UnaryOp::Plus),
            TokenKind::Minus => Some(UnaryOp::Minus),
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Tilde => Some(UnaryOp::BitNot),
            TokenKind::TypeOf => Some(UnaryOp::TypeOf),
            TokenKind::Void => Some(UnaryOp::Void),
            TokenKind::Delete => Some(UnaryOp::Delete),
            _ => None,
        };
        if let Some(op) = op {
            self.bump()?;
            let expr = self.parse_unary()?;
            if op == UnaryOp::Delete {
                self.check_delete_target(&expr)?;
            }
            return Ok(Expr::Unary {
                op,
                expr: Box::new(expr),
                span: self.span_from(start),
            });
        }

        if self.kind() == TokenKind::Await && self.allow_await {
            self.bump()?;
            let argument = self.parse_unary()?;
            return Ok(Expr::Await {
                argument: Box::new(argument),
                span: self.span_from(start),
            });
        }

        if matches!(self.kind(), TokenKind::Inc | TokenKind::Dec) {
            let op = if self.kind() == TokenKind::Inc {
                UpdateOp::Inc
            } else {
                UpdateOp::Dec
            };
            self.bump()?;
            let target = self.parse_unary()?;
            self.check_simple_assignment_target(&target)?;
            return Ok(Expr::Update {
                op,
                prefix: true,
                target: Box::new(target),
                span: self.span_from(start),
            });
        }

        let mut expr = self.parse_postfix()?;

        // `**` must not follow an unparenthesized unary expression; that
        // is enforced by grammar shape here (unary operators recurse into
        // parse_unary, so `-a ** b` parses `-` then sees `**` at the
        // binary level operating on the Unary node).
        if matches!(self.kind(), TokenKind::Inc | TokenKind::Dec) && !self.peek().newline_before {
            let op = if self.kind() == TokenKind::Inc {
                UpdateOp::Inc
            } else {
                UpdateOp::Dec
            };
            self.check_simple_assignment_target(&expr)?;
            self.bump()?;
            expr = Expr::Update {
                op,
                prefix: false,
                target: Box::new(expr),
                span: self.span_from(start),
            };
        }
        Ok(expr)
    }

    fn check_delete_target(&self, expr: &Expr) -> ParseResult<()> {
        match expr {
            Expr::Ident { span, .. } if self.strict => Err(self.error_at(
                *span,
                SyntaxErrorKind::StrictModeViolation,
                "cannot delete a variable in strict mode",
            )),
            Expr::Member { property: MemberKey::Private(_), span, .. } => Err(self.error_at(
                *span,
                SyntaxErrorKind::UnexpectedToken,
                "cannot delete a private field",
            )),
            _ => Ok(()),
        }
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let start = Self::span_of(self.peek());
        let mut expr = if self.kind() == TokenKind::New {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        expr = self.parse_call_tail(expr, start, true)?;
        Ok(expr)
    }

    fn parse_new(&mut self) -> ParseResult<Expr> {
        let start = Self::span_of(self.peek());
        self.bump()?; // new

        // new.target
        if self.eat(TokenKind::Dot)? {
            let token = self.bump()?;
            if token.ident() != Some("target") {
                return Err(self.unexpected("'target'"));
            }
            if !self.in_function {
                return Err(self.error_at(
                    start,
                    SyntaxErrorKind::IllegalNewTarget,
                    "new.target is only allowed in functions",
                ));
            }
            return Ok(Expr::NewTarget {
                span: self.span_from(start),
            });
        }

        let callee = if self.kind() == TokenKind::New {
            self.parse_new()?
        } else {
            self.parse_primary()?
        };
        // Member accesses bind tighter than the `new` arguments; calls do
        // not.
        let callee = self.parse_call_tail(callee, start, false)?;

        let args = if self.kind() == TokenKind::LParen {
            self.parse_arguments()?
        } else {
            Vec::new()
        };
        let new_expr = Expr::New {
            callee: Box::new(callee),
            args,
            span: self.span_from(start),
        };
        Ok(new_expr)
    }

    /// Postfix chain: member accesses, calls, tagged templates, optional
    /// chains.
    fn parse_call_tail(&mut self, mut expr: Expr, start: Span, allow_call: bool) -> ParseResult<Expr> {
        loop {
            match self.kind() {
                TokenKind::Dot => {
                    self.bump()?;
                    let property = self.parse_member_field()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                        optional: false,
                        span: self.span_from(start),
                    };
                }
                TokenKind::QuestionDot => {
                    if !allow_call {
                        return Err(self.error_here(
                            SyntaxErrorKind::UnexpectedToken,
                            "optional chain is not allowed in new expressions",
                        ));
                    }
                    self.bump()?;
                    match self.kind() {
                        TokenKind::LParen => {
                            let args = self.parse_arguments()?;
                            expr = Expr::Call {
                                callee: Box::new(expr),
                                args,
                                optional: true,
                                span: self.span_from(start),
                            };
                        }
                        TokenKind::LBracket => {
                            self.bump()?;
                            let index = self.parse_expression_value()?;
                            self.expect(TokenKind::RBracket, "']'")?;
                            expr = Expr::Member {
                                object: Box::new(expr),
                                property: MemberKey::Index(Box::new(index)),
                                optional: true,
                                span: self.span_from(start),
                            };
                        }
                        _ => {
                            let property = self.parse_member_field()?;
                            expr = Expr::Member {
                                object: Box::new(expr),
                                property,
                                optional: true,
                                span: self.span_from(start),
                            };
                        }
                    }
                }
                TokenKind::LBracket => {
                    self.bump()?;
                    let index = self.parse_expression_value()?;
                    self.expect(TokenKind::RBracket, "']'")?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property: MemberKey::Index(Box::new(index)),
                        optional: false,
                        span: self.span_from(start),
                    };
                }
                TokenKind::LParen if allow_call => {
                    let args = self.parse_arguments()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        optional: false,
                        span: self.span_from(start),
                    };
                }
                TokenKind::Template => {
                    let token = self.bump()?;
                    let quasi = self.template_from_token(token, true)?;
                    expr = Expr::TaggedTemplate {
                        tag: Box::new(expr),
                        quasi: Box::new(quasi),
                        span: self.span_from(start),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_member_field(&mut self) -> ParseResult<MemberKey> {
        let token = self.bump()?;
        match token.kind {
            TokenKind::PrivateName => {
                let span = Self::span_of(&token);
                let name: Box<str> = match token.value {
                    TokenValue::Ident(name) => name.into(),
                    _ => unreachable!(),
                };
                self.check_private_name(&name, span)?;
                Ok(MemberKey::Private(name))
            }
            _ => match token.value {
                // Keywords are valid property names.
                TokenValue::Ident(name) => Ok(MemberKey::Field(name.into())),
                _ => Err(self.unexpected("property name")),
            },
        }
    }

    fn check_private_name(&self, name: &str, span: Span) -> ParseResult<()> {
        if self.private_env.iter().any(|env| env.contains(name)) {
            Ok(())
        } else {
            Err(self.error_at(
                span,
                SyntaxErrorKind::UndeclaredPrivateName,
                format!("private name '#{name}' is not defined"),
            ))
        }
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Argument>> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut args = Vec::new();
        let saved = self.allow_in;
        self.allow_in = true;
        while self.kind() != TokenKind::RParen {
            let arg = if self.eat(TokenKind::DotDotDot)? {
                Argument::Spread(self.parse_assignment_expr()?)
            } else {
                Argument::Expr(self.parse_assignment_expr()?)
            };
            args.push(arg);
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.allow_in = saved;
        self.expect(TokenKind::RParen, "')'")?;
        self.take_cover_init_error()?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let start = Self::span_of(self.peek());
        match self.kind() {
            TokenKind::Number => {
                let token = self.bump()?;
                let value = match token.value {
                    TokenValue::Number(n) => n,
                    _ => unreachable!(),
                };
                Ok(Expr::Number { value, span: start })
            }
            TokenKind::BigInt => {
                let token = self.bump()?;
                let digits: Box<str> = match token.value {
                    TokenValue::BigInt(digits) => digits.into(),
                    _ => unreachable!(),
                };
                Ok(Expr::BigInt { digits, span: start })
            }
            TokenKind::String => {
                let token = self.bump()?;
                let value: Box<str> = match token.value {
                    TokenValue::String { value, legacy_octal } => {
                        if legacy_octal && self.strict {
                            return Err(self.error_at(
                                start,
                                SyntaxErrorKind::StrictModeViolation,
                                "octal escape sequences are not allowed in strict mode",
                            ));
                        }
                        value.into()
                    }
                    _ => unreachable!(),
                };
                Ok(Expr::String { value, span: start })
            }
            TokenKind::Template => {
                let token = self.bump()?;
                let template = self.template_from_token(token, false)?;
                Ok(Expr::Template(Box::new(template)))
            }
            TokenKind::Regex => {
                let token = self.bump()?;
                let (pattern, flags) = match token.value {
                    TokenValue::Regex { pattern, flags } => (pattern, flags),
                    _ => unreachable!(),
                };
                Ok(Expr::Regex {
                    pattern: pattern.into(),
                    flags: flags.into(),
                    span: start,
                })
            }
            TokenKind::True => {
                self.bump()?;
                Ok(Expr::Boolean { value: true, span: start })
            }
            TokenKind::False => {
                self.bump()?;
                Ok(Expr::Boolean { value: false, span: start })
            }
            TokenKind::Null => {
                self.bump()?;
                Ok(Expr::Null { span: start })
            }
            TokenKind::This => {
                self.bump()?;
                Ok(Expr::This { span: start })
            }
            TokenKind::Super => {
                self.bump()?;
                match self.kind() {
                    TokenKind::LParen => {
                        if !self.allow_super_call {
                            return Err(self.error_at(
                                start,
                                SyntaxErrorKind::IllegalSuper,
                                "'super' call is only allowed in derived constructors",
                            ));
                        }
                        let args = self.parse_arguments()?;
                        Ok(Expr::SuperCall {
                            args,
                            span: self.span_from(start),
                        })
                    }
                    TokenKind::Dot | TokenKind::LBracket => {
                        if !self.allow_super_property {
                            return Err(self.error_at(
                                start,
                                SyntaxErrorKind::IllegalSuper,
                                "'super' property access is only allowed in methods",
                            ));
                        }
                        let property = if self.eat(TokenKind::Dot)? {
                            match self.parse_member_field()? {
                                MemberKey::Private(_) => {
                                    return Err(self.error_at(
                                        start,
                                        SyntaxErrorKind::IllegalSuper,
                                        "cannot access a private field on 'super'",
                                    ));
                                }
                                key => key,
                            }
                        } else {
                            self.bump()?;
                            let index = self.parse_expression_value()?;
                            self.expect(TokenKind::RBracket, "']'")?;
                            MemberKey::Index(Box::new(index))
                        };
                        Ok(Expr::SuperMember {
                            property,
                            span: self.span_from(start),
                        })
                    }
                    _ => Err(self.error_at(
                        start,
                        SyntaxErrorKind::IllegalSuper,
                        "unexpected 'super'",
                    )),
                }
            }
            TokenKind::LParen => {
                self.bump()?;
                let saved = self.allow_in;
                self.allow_in = true;
                let expr = self.parse_expression_value();
                self.allow_in = saved;
                let expr = expr?;
                self.expect(TokenKind::RParen, "')'")?;
                if !matches!(
                    self.kind(),
                    TokenKind::Assign | TokenKind::Arrow
                ) {
                    self.take_cover_init_error()?;
                }
                Ok(expr)
            }
            TokenKind::LBracket => self.parse_array_literal(),
            TokenKind::LBrace => self.parse_object_literal(),
            TokenKind::Function => {
                let func = self.parse_function_expr(false)?;
                Ok(Expr::Function(Box::new(func)))
            }
            TokenKind::Class => {
                let class = self.parse_class(false)?;
                Ok(Expr::Class(Box::new(class)))
            }
            TokenKind::Identifier
                if self.peek().is_contextual("async") && self.async_starts_function() =>
            {
                self.bump()?;
                let func = self.parse_function_expr(true)?;
                Ok(Expr::Function(Box::new(func)))
            }
            TokenKind::Identifier => {
                let token = self.bump()?;
                let name: Box<str> = match token.value {
                    TokenValue::Ident(name) => name.into(),
                    _ => unreachable!(),
                };
                Ok(Expr::Ident { name, span: start })
            }
            // Contextually-identifier keywords.
            TokenKind::Let | TokenKind::Yield | TokenKind::Await => {
                let token = self.peek().clone();
                let name = match &token.value {
                    TokenValue::Ident(name) => name.clone(),
                    _ => unreachable!(),
                };
                self.check_binding_name(&name, start)?;
                self.bump()?;
                Ok(Expr::Ident {
                    name: name.into(),
                    span: start,
                })
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    fn parse_array_literal(&mut self) -> ParseResult<Expr> {
        let start = Self::span_of(self.peek());
        self.expect(TokenKind::LBracket, "'['")?;
        let mut elements = Vec::new();
        let saved = self.allow_in;
        self.allow_in = true;
        loop {
            match self.kind() {
                TokenKind::RBracket => break,
                TokenKind::Comma => {
                    self.bump()?;
                    elements.push(ArrayElement::Hole);
                }
                TokenKind::DotDotDot => {
                    self.bump()?;
                    elements.push(ArrayElement::Spread(self.parse_assignment_expr()?));
                    if !self.eat(TokenKind::Comma)? {
                        break;
                    }
                }
                _ => {
                    elements.push(ArrayElement::Expr(self.parse_assignment_expr()?));
                    if !self.eat(TokenKind::Comma)? {
                        break;
                    }
                }
            }
        }
        self.allow_in = saved;
        self.expect(TokenKind::RBracket, "']'")?;
        Ok(Expr::Array {
            elements,
            span: self.span_from(start),
        })
    }

    fn parse_object_literal(&mut self) -> ParseResult<Expr> {
        let start = Self::span_of(self.peek());
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut properties = Vec::new();
        let saved = self.allow_in;
        self.allow_in = true;
        let mut saw_proto = false;
        while self.kind() != TokenKind::RBrace {
            if self.eat(TokenKind::DotDotDot)? {
                properties.push(ObjectProperty::Spread(self.parse_assignment_expr()?));
                if !self.eat(TokenKind::Comma)? {
                    break;
                }
                continue;
            }

            // get / set / async / * method prefixes.
            let is_generator = self.eat(TokenKind::Star)?;
            let checkpoint = self.lexer.save_state();
            let mut kind = MethodKind::Method;
            let mut is_async = false;
            if !is_generator {
                if self.peek().is_contextual("get") {
                    self.bump()?;
                    if self.is_property_key_start() {
                        kind = MethodKind::Getter;
                    } else {
                        self.lexer.restore_state(checkpoint.clone());
                    }
                } else if self.peek().is_contextual("set") {
                    self.bump()?;
                    if self.is_property_key_start() {
                        kind = MethodKind::Setter;
                    } else {
                        self.lexer.restore_state(checkpoint.clone());
                    }
                } else if self.peek().is_contextual("async") && !self.peek().newline_before {
                    self.bump()?;
                    if self.is_property_key_start() || self.kind() == TokenKind::Star {
                        is_async = true;
                    } else {
                        self.lexer.restore_state(checkpoint.clone());
                    }
                }
            }
            let is_generator = is_generator || (is_async && self.eat(TokenKind::Star)?);

            let key = self.parse_property_key(false)?;

            match self.kind() {
                TokenKind::LParen => {
                    let function =
                        self.parse_method_body(key_name(&key), kind, is_async, is_generator)?;
                    properties.push(ObjectProperty::Method {
                        key,
                        kind,
                        function: Box::new(function),
                    });
                }
                TokenKind::Colon if kind == MethodKind::Method && !is_async && !is_generator => {
                    self.bump()?;
                    let value = self.parse_assignment_expr()?;
                    let is_proto = matches!(&key, PropertyKey::Ident(k) | PropertyKey::String(k) if &**k == "__proto__");
                    if is_proto {
                        if saw_proto {
                            return Err(self.error_here(
                                SyntaxErrorKind::DuplicateDeclaration,
                                "duplicate __proto__ fields are not allowed",
                            ));
                        }
                        saw_proto = true;
                    }
                    properties.push(ObjectProperty::KeyValue { key, value, is_proto });
                }
                _ if kind == MethodKind::Method && !is_async && !is_generator => {
                    // Shorthand `{ a }` or `{ a = 1 }` (cover grammar for
                    // destructuring).
                    let name: Box<str> = match &key {
                        PropertyKey::Ident(name) => name.clone(),
                        _ => return Err(self.unexpected("':'")),
                    };
                    let span = self.span_from(start);
                    let ident = Expr::Ident { name: name.clone(), span };
                    let value = if self.eat(TokenKind::Assign)? {
                        // Only valid when the literal is reinterpreted as a
                        // pattern; expr_to_pattern re-validates.
                        if self.cover_init.is_none() {
                            self.cover_init = Some(span);
                        }
                        let default = self.parse_assignment_expr()?;
                        Expr::Assign {
                            op: AssignOp::Assign,
                            target: Box::new(ident),
                            value: Box::new(default),
                            span,
                        }
                    } else {
                        ident
                    };
                    properties.push(ObjectProperty::KeyValue {
                        key,
                        value,
                        is_proto: false,
                    });
                }
                _ => return Err(self.unexpected("':' or '('")),
            }
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.allow_in = saved;
        self.expect(TokenKind::RBrace, "'}'")?;
        Ok(Expr::Object {
            properties,
            span: self.span_from(start),
        })
    }

    fn is_property_key_start(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::Identifier
                | TokenKind::String
                | TokenKind::Number
                | TokenKind::LBracket
                | TokenKind::PrivateName
        ) || KEYWORD_KINDS.contains(&self.kind())
    }

    /// Property name: identifier, keyword, string, number, computed, or
    /// (in class bodies) a private name.
    fn parse_property_key(&mut self, allow_private: bool) -> ParseResult<PropertyKey> {
        match self.kind() {
            TokenKind::LBracket => {
                self.bump()?;
                let saved = self.allow_in;
                self.allow_in = true;
                let expr = self.parse_assignment_expr();
                self.allow_in = saved;
                let expr = expr?;
                self.expect(TokenKind::RBracket, "']'")?;
                Ok(PropertyKey::Computed(Box::new(expr)))
            }
            TokenKind::String => {
                let token = self.bump()?;
                match token.value {
                    TokenValue::String { value, .. } => Ok(PropertyKey::String(value.into())),
                    _ => unreachable!(),
                }
            }
            TokenKind::Number => {
                let token = self.bump()?;
                match token.value {
                    TokenValue::Number(value) => Ok(PropertyKey::Number(value)),
                    _ => unreachable!(),
                }
            }
            TokenKind::PrivateName => {
                if !allow_private {
                    return Err(self.error_here(
                        SyntaxErrorKind::UnexpectedToken,
                        "private names are only allowed in class bodies",
                    ));
                }
                let token = self.bump()?;
                match token.value {
                    TokenValue::Ident(name) => {
                        if name == "constructor" {
                            return Err(self.error_here(
                                SyntaxErrorKind::UnexpectedToken,
                                "#constructor is not a valid private name",
                            ));
                        }
                        Ok(PropertyKey::Private(name.into()))
                    }
                    _ => unreachable!(),
                }
            }
            _ => {
                let token = self.bump()?;
                match token.value {
                    // Keywords double as property names.
                    TokenValue::Ident(name) => Ok(PropertyKey::Ident(name.into())),
                    _ => Err(self.unexpected("property name")),
                }
            }
        }
    }

    fn template_from_token(&mut self, token: Token, tagged: bool) -> ParseResult<TemplateLiteral> {
        let span = Self::span_of(&token);
        let parts = match token.value {
            TokenValue::Template(parts) => parts,
            _ => unreachable!(),
        };
        let mut quasis = Vec::new();
        let mut exprs = Vec::new();
        for part in parts {
            if part.cooked.is_none() && !tagged {
                return Err(self.error_at(
                    span,
                    SyntaxErrorKind::InvalidEscape,
                    "invalid escape sequence in template literal",
                ));
            }
            quasis.push(TemplatePart {
                cooked: part.cooked.map(Into::into),
                raw: part.raw.into(),
            });
            if let Some((start, end)) = part.expr_range {
                let sub_source = &self.source[start as usize..end as usize];
                let mut sub = Parser::new(sub_source, false)?;
                sub.lexer = Lexer::with_origin(sub_source, start, span.line)?;
                sub.strict = self.strict;
                sub.is_module = self.is_module;
                sub.allow_await = self.allow_await;
                sub.allow_yield = self.allow_yield;
                sub.allow_super_property = self.allow_super_property;
                sub.allow_super_call = self.allow_super_call;
                sub.in_function = self.in_function;
                sub.private_env = std::mem::take(&mut self.private_env);
                sub.lexer.set_strict_mode(self.strict);
                let expr = sub.parse_expression_value()?;
                sub.expect_eof()?;
                self.private_env = std::mem::take(&mut sub.private_env);
                exprs.push(expr);
            }
        }
        Ok(TemplateLiteral { quasis, exprs, span })
    }

    // ---------------------------------------------------------------
    // Functions and classes
    // ---------------------------------------------------------------

    fn enter_function(
        &mut self,
        is_generator: bool,
        is_async: bool,
        is_method_like: bool,
        is_arrow: bool,
    ) -> FunctionContext {
        let saved = FunctionContext {
            allow_await: self.allow_await,
            allow_yield: self.allow_yield,
            allow_super_property: self.allow_super_property,
            allow_super_call: self.allow_super_call,
            in_derived_ctor: self.in_derived_ctor,
            in_function: self.in_function,
            in_ctor: self.in_ctor,
        };
        if !is_arrow {
            self.allow_await = is_async;
            self.allow_yield = is_generator;
            self.in_function = true;
            if !is_method_like {
                self.allow_super_property = false;
                self.allow_super_call = false;
                self.in_derived_ctor = false;
                self.in_ctor = false;
            }
        } else {
            // Arrows inherit await/yield/super permissions lexically,
            // except that an async arrow allows await.
            if is_async {
                self.allow_await = true;
            }
            self.in_function = true;
        }
        saved
    }

    fn exit_function(&mut self, saved: FunctionContext) {
        self.allow_await = saved.allow_await;
        self.allow_yield = saved.allow_yield;
        self.allow_super_property = saved.allow_super_property;
        self.allow_super_call = saved.allow_super_call;
        self.in_derived_ctor = saved.in_derived_ctor;
        self.in_function = saved.in_function;
        self.in_ctor = saved.in_ctor;
    }

    fn parse_function_decl(&mut self, is_async: bool) -> ParseResult<Function> {
        let start = Self::span_of(self.peek());
        self.expect(TokenKind::Function, "'function'")?;
        let is_generator = self.eat(TokenKind::Star)?;
        let name_span = Self::span_of(self.peek());
        let name = self.parse_binding_identifier()?;
        self.declare_function_name(&name, name_span)?;
        self.parse_function_rest(start, Some(name), is_async, is_generator, false)
    }

    fn parse_function_expr(&mut self, is_async: bool) -> ParseResult<Function> {
        let start = Self::span_of(self.peek());
        self.expect(TokenKind::Function, "'function'")?;
        let is_generator = self.eat(TokenKind::Star)?;
        let name = if matches!(
            self.kind(),
            TokenKind::Identifier | TokenKind::Let | TokenKind::Yield | TokenKind::Await
        ) {
            Some(self.parse_binding_identifier()?)
        } else {
            None
        };
        self.parse_function_rest(start, name, is_async, is_generator, false)
    }

    /// Common tail: parameters and body.
    fn parse_function_rest(
        &mut self,
        start: Span,
        name: Option<Box<str>>,
        is_async: bool,
        is_generator: bool,
        is_method_like: bool,
    ) -> ParseResult<Function> {
        let ctx = self.enter_function(is_generator, is_async, is_method_like, false);
        self.push_scope(true);
        let saved_labels = std::mem::take(&mut self.labels);
        let saved_iter = std::mem::replace(&mut self.iteration_depth, 0);
        let saved_switch = std::mem::replace(&mut self.switch_depth, 0);
        let saved_strict = self.strict;

        let (params, rest) = self.parse_params()?;

        self.expect(TokenKind::LBrace, "'{'")?;
        let body = self.parse_function_body()?;
        self.expect(TokenKind::RBrace, "'}'")?;
        let body_strict = self.strict;
        if body_strict && !saved_strict {
            // A directive inside the body retroactively constrains the
            // parameter list.
            self.check_strict_params(&params, &rest)?;
        }

        self.strict = saved_strict;
        self.lexer.set_strict_mode(saved_strict);
        self.labels = saved_labels;
        self.iteration_depth = saved_iter;
        self.switch_depth = saved_switch;
        self.pop_scope();
        self.exit_function(ctx);

        let span = self.span_from(start);
        Ok(Function {
            name,
            params,
            rest,
            body,
            expr_body: None,
            is_arrow: false,
            is_async,
            is_generator,
            is_strict: body_strict,
            source: Some(self.slice(span)),
            span,
        })
    }

    fn parse_params(&mut self) -> ParseResult<(Vec<Param>, Option<Pattern>)> {
        self.expect(TokenKind::LParen, "'('")?;
        let mut params = Vec::new();
        let mut rest = None;
        while self.kind() != TokenKind::RParen {
            if self.eat(TokenKind::DotDotDot)? {
                rest = Some(self.parse_binding_pattern()?);
                if self.kind() == TokenKind::Comma {
                    return Err(self.error_here(
                        SyntaxErrorKind::UnexpectedToken,
                        "rest parameter must be the last parameter",
                    ));
                }
                break;
            }
            let pattern = self.parse_binding_pattern()?;
            let default = if self.eat(TokenKind::Assign)? {
                Some(self.parse_assignment_expr()?)
            } else {
                None
            };
            params.push(Param { pattern, default });
            if !self.eat(TokenKind::Comma)? {
                break;
            }
        }
        self.expect(TokenKind::RParen, "')'")?;

        // Declare parameters in the function scope; duplicates are legal
        // only for simple sloppy parameter lists.
        let simple = rest.is_none()
            && params
                .iter()
                .all(|p| p.default.is_none() && matches!(p.pattern, Pattern::Ident { .. }));
        let strict = self.strict;
        let mut seen: HashSet<Box<str>> = HashSet::new();
        let mut check = |this: &Self, name: &str, span: Span| {
            if !seen.insert(name.into()) && (strict || !simple) {
                return Err(this.error_at(
                    span,
                    SyntaxErrorKind::DuplicateParameter,
                    format!("duplicate parameter name '{name}'"),
                ));
            }
            Ok(())
        };
        for param in &params {
            collect_pattern_names(&param.pattern, &mut |name, span| check(self, name, span))?;
        }
        if let Some(rest) = &rest {
            collect_pattern_names(rest, &mut |name, span| check(self, name, span))?;
        }
        self.declare_params(&params, &rest)?;
        Ok((params, rest))
    }

    fn declare_params(&mut self, params: &[Param], rest: &Option<Pattern>) -> ParseResult<()> {
        for param in params {
            self.declare_pattern(&param.pattern, VarKind::Var)?;
        }
        if let Some(rest) = rest {
            self.declare_pattern(rest, VarKind::Var)?;
        }
        Ok(())
    }

    fn check_strict_params(&self, params: &[Param], rest: &Option<Pattern>) -> ParseResult<()> {
        let simple = rest.is_none()
            && params
                .iter()
                .all(|p| p.default.is_none() && matches!(p.pattern, Pattern::Ident { .. }));
        if !simple {
            return Err(ParseError::new(
                SyntaxErrorKind::StrictModeViolation,
                "'use strict' directive is not allowed with a non-simple parameter list",
                0,
                0,
            ));
        }
        for param in params {
            if let Pattern::Ident { name, span } = &param.pattern {
                if matches!(&**name, "eval" | "arguments") {
                    return Err(self.error_at(
                        *span,
                        SyntaxErrorKind::StrictModeViolation,
                        format!("cannot bind '{name}' in strict mode"),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Function body statements with a directive prologue.
    fn parse_function_body(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut body = Vec::new();
        while self.kind() == TokenKind::String {
            let token = self.peek().clone();
            let stmt = self.parse_statement_or_decl()?;
            let is_directive = matches!(&stmt, Stmt::Expr { expr: Expr::String { .. }, .. });
            body.push(stmt);
            if !is_directive {
                break;
            }
            if let TokenValue::String { value, .. } = &token.value {
                if value == "use strict" {
                    self.strict = true;
                    self.lexer.set_strict_mode(true);
                }
            }
        }
        while self.kind() != TokenKind::RBrace && self.kind() != TokenKind::Eof {
            body.push(self.parse_statement_or_decl()?);
        }
        Ok(body)
    }

    /// Method body shared by object literals and class bodies.
    fn parse_method_body(
        &mut self,
        name: Option<Box<str>>,
        kind: MethodKind,
        is_async: bool,
        is_generator: bool,
    ) -> ParseResult<Function> {
        let start = Self::span_of(self.peek());
        let saved_super = self.allow_super_property;
        let saved_super_call = self.allow_super_call;
        self.allow_super_property = true;
        self.allow_super_call = false;
        let result = self.parse_function_rest(start, name, is_async, is_generator, true);
        self.allow_super_property = saved_super;
        self.allow_super_call = saved_super_call;
        let function = result?;
        match kind {
            MethodKind::Getter => {
                if !function.params.is_empty() || function.rest.is_some() {
                    return Err(self.error_at(
                        function.span,
                        SyntaxErrorKind::UnexpectedToken,
                        "getter must not have parameters",
                    ));
                }
            }
            MethodKind::Setter => {
                if function.params.len() != 1 || function.rest.is_some() {
                    return Err(self.error_at(
                        function.span,
                        SyntaxErrorKind::UnexpectedToken,
                        "setter must have exactly one parameter",
                    ));
                }
            }
            MethodKind::Method => {}
        }
        Ok(function)
    }

    fn parse_class(&mut self, is_declaration: bool) -> ParseResult<ClassDef> {
        let start = Self::span_of(self.peek());
        self.expect(TokenKind::Class, "'class'")?;
        // Class bodies are always strict.
        let saved_strict = self.strict;
        self.strict = true;
        self.lexer.set_strict_mode(true);

        let name = if matches!(self.kind(), TokenKind::Identifier) {
            let span = Self::span_of(self.peek());
            let name = self.parse_binding_identifier()?;
            if is_declaration {
                self.declare_lexical(&name, span)?;
            }
            Some(name)
        } else {
            if is_declaration {
                return Err(self.unexpected("class name"));
            }
            None
        };

        let parent = if self.eat(TokenKind::Extends)? {
            Some(Box::new(self.parse_postfix()?))
        } else {
            None
        };
        let is_derived = parent.is_some();

        self.expect(TokenKind::LBrace, "'{'")?;

        // Collect private names declared anywhere in the body first, so
        // earlier members can reference later private names.
        let private_names = self.scan_private_names()?;
        self.private_env.push(private_names);

        let mut members = Vec::new();
        let mut saw_ctor = false;
        while self.kind() != TokenKind::RBrace && self.kind() != TokenKind::Eof {
            if self.eat(TokenKind::Semicolon)? {
                continue;
            }
            let member = self.parse_class_member(is_derived, &mut saw_ctor)?;
            members.push(member);
        }
        self.expect(TokenKind::RBrace, "'}'")?;
        self.private_env.pop();

        self.strict = saved_strict;
        self.lexer.set_strict_mode(saved_strict);

        Ok(ClassDef {
            name,
            parent,
            members,
            span: self.span_from(start),
        })
    }

    /// Pre-scan the class body for declared private names, validating
    /// duplicates. The lexer is rewound afterwards. A getter/setter pair
    /// may share a name; every other duplicate is an error.
    fn scan_private_names(&mut self) -> ParseResult<HashSet<Box<str>>> {
        let state = self.lexer.save_state();
        // name -> (declared plain, declared getter, declared setter)
        let mut declared: std::collections::HashMap<Box<str>, (bool, bool, bool)> =
            std::collections::HashMap::new();
        let mut depth = 0u32;
        let mut accessor: Option<bool> = None;
        // A private name is a declaration only in member-name position;
        // `this.#y` inside a field initializer is a use.
        let mut prev_kind = TokenKind::LBrace;
        loop {
            let token = self.peek().clone();
            let decl_position = matches!(
                prev_kind,
                TokenKind::LBrace | TokenKind::RBrace | TokenKind::Semicolon | TokenKind::Star
                    | TokenKind::Identifier | TokenKind::RParen
            );
            prev_kind = token.kind;
            match token.kind {
                TokenKind::Eof => break,
                TokenKind::LBrace => {
                    depth += 1;
                    self.bump()?;
                }
                TokenKind::RBrace => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    self.bump()?;
                }
                TokenKind::PrivateName if depth == 0 && decl_position => {
                    let name: Box<str> = match &token.value {
                        TokenValue::Ident(name) => name.clone().into(),
                        _ => unreachable!(),
                    };
                    let entry = declared.entry(name.clone()).or_default();
                    let conflict = match accessor {
                        None => entry.0 || entry.1 || entry.2,
                        Some(true) => entry.0 || entry.1,
                        Some(false) => entry.0 || entry.2,
                    };
                    if conflict {
                        return Err(self.error_here(
                            SyntaxErrorKind::DuplicatePrivateName,
                            format!("duplicate private name '#{name}'"),
                        ));
                    }
                    match accessor {
                        None => entry.0 = true,
                        Some(true) => entry.1 = true,
                        Some(false) => entry.2 = true,
                    }
                    self.bump()?;
                }
                TokenKind::Identifier if depth == 0 && token.is_contextual("get") => {
                    accessor = Some(true);
                    self.bump()?;
                    continue;
                }
                TokenKind::Identifier if depth == 0 && token.is_contextual("set") => {
                    accessor = Some(false);
                    self.bump()?;
                    continue;
                }
                _ => {
                    self.bump()?;
                }
            }
            accessor = None;
        }
        self.lexer.restore_state(state);
        Ok(declared.into_keys().collect())
    }

    fn parse_class_member(
        &mut self,
        is_derived: bool,
        saw_ctor: &mut bool,
    ) -> ParseResult<ClassMember> {
        // static prefix (but `static` may itself be a member name).
        let mut is_static = false;
        if self.peek().is_contextual("static") {
            let state = self.lexer.save_state();
            self.bump()?;
            match self.kind() {
                TokenKind::LParen | TokenKind::Assign | TokenKind::Semicolon | TokenKind::RBrace => {
                    // `static()`, `static = 1`, `static;` — a member named
                    // static.
                    self.lexer.restore_state(state);
                }
                TokenKind::LBrace => {
                    // Static initialization block: super.* is visible,
                    // super(), await and return are not.
                    self.bump()?;
                    let ctx = self.enter_function(false, false, true, false);
                    self.allow_super_property = true;
                    self.allow_super_call = false;
                    self.in_function = false;
                    self.push_scope(true);
                    let body = self.parse_statement_list(TokenKind::RBrace)?;
                    self.pop_scope();
                    self.exit_function(ctx);
                    self.expect(TokenKind::RBrace, "'}'")?;
                    return Ok(ClassMember::StaticBlock(body));
                }
                _ => is_static = true,
            }
        }

        // get / set / async / * prefixes, with name fallbacks.
        let mut kind = MethodKind::Method;
        let mut is_async = false;
        let mut is_generator = self.eat(TokenKind::Star)?;
        if !is_generator {
            let checkpoint = self.lexer.save_state();
            if self.peek().is_contextual("get") {
                self.bump()?;
                if self.is_property_key_start() {
                    kind = MethodKind::Getter;
                } else {
                    self.lexer.restore_state(checkpoint);
                }
            } else if self.peek().is_contextual("set") {
                self.bump()?;
                if self.is_property_key_start() {
                    kind = MethodKind::Setter;
                } else {
                    self.lexer.restore_state(checkpoint);
                }
            } else if self.peek().is_contextual("async") && !self.peek().newline_before {
                self.bump()?;
                if self.is_property_key_start() || self.kind() == TokenKind::Star {
                    is_async = true;
                    is_generator = self.eat(TokenKind::Star)?;
                } else {
                    self.lexer.restore_state(checkpoint);
                }
            }
        }

        let key = self.parse_property_key(true)?;
        let is_ctor_name = !is_static
            && matches!(&key, PropertyKey::Ident(name) | PropertyKey::String(name) if &**name == "constructor");

        match self.kind() {
            TokenKind::LParen => {
                if is_ctor_name {
                    if kind != MethodKind::Method || is_async || is_generator {
                        return Err(self.error_here(
                            SyntaxErrorKind::UnexpectedToken,
                            "constructor cannot be a getter, setter, async method or generator",
                        ));
                    }
                    if *saw_ctor {
                        return Err(self.error_here(
                            SyntaxErrorKind::DuplicateDeclaration,
                            "a class may only have one constructor",
                        ));
                    }
                    *saw_ctor = true;
                    let ctx = self.enter_function(false, false, true, false);
                    self.allow_super_property = true;
                    self.allow_super_call = is_derived;
                    self.in_derived_ctor = is_derived;
                    self.in_ctor = true;
                    let start = Self::span_of(self.peek());
                    let result = self.parse_function_rest(
                        start,
                        Some("constructor".into()),
                        false,
                        false,
                        true,
                    );
                    self.exit_function(ctx);
                    return Ok(ClassMember::Constructor(Box::new(result?)));
                }
                if is_static && matches!(&key, PropertyKey::Ident(n) | PropertyKey::String(n) if &**n == "prototype")
                {
                    return Err(self.error_here(
                        SyntaxErrorKind::UnexpectedToken,
                        "classes may not have a static method named 'prototype'",
                    ));
                }
                let function = self.parse_method_body(key_name(&key), kind, is_async, is_generator)?;
                Ok(ClassMember::Method {
                    key,
                    kind,
                    is_static,
                    function: Box::new(function),
                })
            }
            _ => {
                // Field definition.
                if kind != MethodKind::Method || is_async || is_generator {
                    return Err(self.unexpected("'('"));
                }
                if is_ctor_name {
                    return Err(self.error_here(
                        SyntaxErrorKind::UnexpectedToken,
                        "classes may not have a field named 'constructor'",
                    ));
                }
                let value = if self.eat(TokenKind::Assign)? {
                    // Field initializers may reference `this` and `super.*`.
                    let ctx = self.enter_function(false, false, true, false);
                    self.allow_super_property = true;
                    self.allow_super_call = false;
                    let value = self.parse_assignment_expr();
                    self.exit_function(ctx);
                    Some(value?)
                } else {
                    None
                };
                self.expect_semicolon()?;
                Ok(ClassMember::Field {
                    key,
                    value,
                    is_static,
                })
            }
        }
    }

    // ---------------------------------------------------------------
    // Modules
    // ---------------------------------------------------------------

    fn parse_module_item(&mut self) -> ParseResult<ModuleItem> {
        match self.kind() {
            TokenKind::Import => self.parse_import(),
            TokenKind::Export => self.parse_export(),
            _ => Ok(ModuleItem::Stmt(self.parse_statement_or_decl()?)),
        }
    }

    fn parse_import(&mut self) -> ParseResult<ModuleItem> {
        let start = Self::span_of(self.peek());
        self.bump()?; // import

        // `import "m";`
        if self.kind() == TokenKind::String {
            let source = self.parse_module_specifier()?;
            self.expect_semicolon()?;
            return Ok(ModuleItem::Import(ImportDecl {
                specifiers: Vec::new(),
                source,
                span: self.span_from(start),
            }));
        }

        let mut specifiers = Vec::new();
        // Default import.
        if matches!(self.kind(), TokenKind::Identifier) {
            let span = Self::span_of(self.peek());
            let local = self.parse_binding_identifier()?;
            self.declare_lexical(&local, span)?;
            specifiers.push(ImportSpecifier::Default { local });
            if !self.eat(TokenKind::Comma)? {
                let source = self.parse_from_clause()?;
                self.expect_semicolon()?;
                return Ok(ModuleItem::Import(ImportDecl {
                    specifiers,
                    source,
                    span: self.span_from(start),
                }));
            }
        }

        match self.kind() {
            TokenKind::Star => {
                self.bump()?;
                let token = self.bump()?;
                if token.ident() != Some("as") {
                    return Err(self.unexpected("'as'"));
                }
                let span = Self::span_of(self.peek());
                let local = self.parse_binding_identifier()?;
                self.declare_lexical(&local, span)?;
                specifiers.push(ImportSpecifier::Namespace { local });
            }
            TokenKind::LBrace => {
                self.bump()?;
                while self.kind() != TokenKind::RBrace {
                    let imported = self.parse_module_export_name()?;
                    let (local, span) = if self.peek().is_contextual("as") {
                        self.bump()?;
                        let span = Self::span_of(self.peek());
                        (self.parse_binding_identifier()?, span)
                    } else {
                        let span = Self::span_of(self.peek());
                        // Re-validate the spelling as a binding name.
                        self.check_binding_name(&imported, span)?;
                        (imported.clone(), span)
                    };
                    self.declare_lexical(&local, span)?;
                    specifiers.push(ImportSpecifier::Named { imported, local });
                    if !self.eat(TokenKind::Comma)? {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace, "'}'")?;
            }
            _ => return Err(self.unexpected("import specifiers")),
        }

        let source = self.parse_from_clause()?;
        self.expect_semicolon()?;
        Ok(ModuleItem::Import(ImportDecl {
            specifiers,
            source,
            span: self.span_from(start),
        }))
    }

    /// An exported or imported name: identifier, keyword, or string.
    fn parse_module_export_name(&mut self) -> ParseResult<Box<str>> {
        let token = self.bump()?;
        match token.value {
            TokenValue::Ident(name) => Ok(name.into()),
            TokenValue::String { value, .. } => Ok(value.into()),
            _ => Err(self.unexpected("export name")),
        }
    }

    fn parse_from_clause(&mut self) -> ParseResult<Box<str>> {
        let token = self.bump()?;
        if token.ident() != Some("from") {
            return Err(self.unexpected("'from'"));
        }
        self.parse_module_specifier()
    }

    fn parse_module_specifier(&mut self) -> ParseResult<Box<str>> {
        let token = self.expect(TokenKind::String, "module specifier")?;
        match token.value {
            TokenValue::String { value, .. } => Ok(value.into()),
            _ => unreachable!(),
        }
    }

    fn parse_export(&mut self) -> ParseResult<ModuleItem> {
        let start = Self::span_of(self.peek());
        self.bump()?; // export

        match self.kind() {
            TokenKind::Star => {
                self.bump()?;
                let alias = if self.peek().is_contextual("as") {
                    self.bump()?;
                    Some(self.parse_module_export_name()?)
                } else {
                    None
                };
                let source = self.parse_from_clause()?;
                self.expect_semicolon()?;
                Ok(ModuleItem::ExportAll {
                    source,
                    alias,
                    span: self.span_from(start),
                })
            }
            TokenKind::Default => {
                self.bump()?;
                let expr = match self.kind() {
                    TokenKind::Function => {
                        let func = self.parse_default_exported_function(false)?;
                        Expr::Function(Box::new(func))
                    }
                    TokenKind::Identifier
                        if self.peek().is_contextual("async") && self.async_starts_function() =>
                    {
                        self.bump()?;
                        let func = self.parse_default_exported_function(true)?;
                        Expr::Function(Box::new(func))
                    }
                    TokenKind::Class => {
                        let class = self.parse_class(false)?;
                        Expr::Class(Box::new(class))
                    }
                    _ => {
                        let expr = self.parse_assignment_expr()?;
                        self.expect_semicolon()?;
                        expr
                    }
                };
                Ok(ModuleItem::ExportDefault {
                    expr,
                    span: self.span_from(start),
                })
            }
            TokenKind::LBrace => {
                self.bump()?;
                let mut specifiers = Vec::new();
                while self.kind() != TokenKind::RBrace {
                    let local = self.parse_module_export_name()?;
                    let exported = if self.peek().is_contextual("as") {
                        self.bump()?;
                        self.parse_module_export_name()?
                    } else {
                        local.clone()
                    };
                    specifiers.push(ExportSpecifier { local, exported });
                    if !self.eat(TokenKind::Comma)? {
                        break;
                    }
                }
                self.expect(TokenKind::RBrace, "'}'")?;
                let source = if self.peek().is_contextual("from") {
                    self.bump()?;
                    Some(self.parse_module_specifier()?)
                } else {
                    None
                };
                self.expect_semicolon()?;
                Ok(ModuleItem::ExportNamed {
                    specifiers,
                    source,
                    span: self.span_from(start),
                })
            }
            TokenKind::Var | TokenKind::Const | TokenKind::Let | TokenKind::Function
            | TokenKind::Class => {
                let stmt = self.parse_statement_or_decl()?;
                Ok(ModuleItem::ExportDecl(stmt))
            }
            TokenKind::Identifier if self.peek().is_contextual("async") => {
                let stmt = self.parse_statement_or_decl()?;
                Ok(ModuleItem::ExportDecl(stmt))
            }
            _ => Err(self.unexpected("export declaration")),
        }
    }

    /// `export default function [name] (…) {…}` — the name is optional.
    fn parse_default_exported_function(&mut self, is_async: bool) -> ParseResult<Function> {
        let start = Self::span_of(self.peek());
        self.expect(TokenKind::Function, "'function'")?;
        let is_generator = self.eat(TokenKind::Star)?;
        let name = if matches!(self.kind(), TokenKind::Identifier) {
            let span = Self::span_of(self.peek());
            let name = self.parse_binding_identifier()?;
            self.declare_function_name(&name, span)?;
            Some(name)
        } else {
            None
        };
        self.parse_function_rest(start, name, is_async, is_generator, false)
    }

    fn slice(&self, span: Span) -> Box<str> {
        let start = span.start as usize;
        let end = (span.end as usize).min(self.source.len());
        self.source
            .get(start..end)
            .unwrap_or_default()
            .trim_end()
            .into()
    }
}

/// Keyword kinds usable as property names.
const KEYWORD_KINDS: &[TokenKind] = &[
    TokenKind::Break,
    TokenKind::Case,
    TokenKind::Catch,
    TokenKind::Class,
    TokenKind::Const,
    TokenKind::Continue,
    TokenKind::Debugger,
    TokenKind::Default,
    TokenKind::Delete,
    TokenKind::Do,
    TokenKind::Else,
    TokenKind::Enum,
    TokenKind::Export,
    TokenKind::Extends,
    TokenKind::False,
    TokenKind::Finally,
    TokenKind::For,
    TokenKind::Function,
    TokenKind::If,
    TokenKind::Import,
    TokenKind::In,
    TokenKind::InstanceOf,
    TokenKind::New,
    TokenKind::Null,
    TokenKind::Return,
    TokenKind::Super,
    TokenKind::Switch,
    TokenKind::This,
    TokenKind::Throw,
    TokenKind::True,
    TokenKind::Try,
    TokenKind::TypeOf,
    TokenKind::Var,
    TokenKind::Void,
    TokenKind::While,
    TokenKind::With,
    TokenKind::Let,
    TokenKind::Yield,
    TokenKind::Await,
];

fn key_name(key: &PropertyKey) -> Option<Box<str>> {
    match key {
        PropertyKey::Ident(name) | PropertyKey::String(name) => Some(name.clone()),
        PropertyKey::Private(name) => Some(format!("#{name}").into()),
        _ => None,
    }
}

fn collect_pattern_names<'p>(
    pattern: &'p Pattern,
    f: &mut impl FnMut(&'p str, Span) -> ParseResult<()>,
) -> ParseResult<()> {
    match pattern {
        Pattern::Ident { name, span } => f(name, *span),
        Pattern::Array { elements, rest, .. } => {
            for el in elements {
                if let ArrayPatternElement::Element { pattern, .. } = el {
                    collect_pattern_names(pattern, f)?;
                }
            }
            if let Some(rest) = rest {
                collect_pattern_names(rest, f)?;
            }
            Ok(())
        }
        Pattern::Object { properties, rest, .. } => {
            for prop in properties {
                collect_pattern_names(&prop.value, f)?;
            }
            if let Some(rest) = rest {
                collect_pattern_names(rest, f)?;
            }
            Ok(())
        }
        Pattern::Member(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(source: &str) -> Program {
        parse_script(source).unwrap()
    }

    fn first_stmt(program: &Program) -> &Stmt {
        match &program.items[0] {
            ModuleItem::Stmt(stmt) => stmt,
            other => panic!("expected statement, got {other:?}"),
        }
    }

    #[test]
    fn test_binary_precedence() {
        let program = script("1 + 2 * 3;");
        let Stmt::Expr { expr, .. } = first_stmt(&program) else {
            panic!()
        };
        let Expr::Binary { op: BinaryOp::Add, right, .. } = expr else {
            panic!("expected add at the root, got {expr:?}")
        };
        assert!(matches!(&**right, Expr::Binary { op: BinaryOp::Mul, .. }));
    }

    #[test]
    fn test_pow_right_assoc() {
        let program = script("2 ** 3 ** 2;");
        let Stmt::Expr { expr, .. } = first_stmt(&program) else {
            panic!()
        };
        let Expr::Binary { op: BinaryOp::Pow, right, .. } = expr else {
            panic!()
        };
        assert!(matches!(&**right, Expr::Binary { op: BinaryOp::Pow, .. }));
    }

    #[test]
    fn test_arrow_vs_grouping() {
        let program = script("(a, b) => a + b;");
        assert!(matches!(
            first_stmt(&program),
            Stmt::Expr { expr: Expr::Arrow(_), .. }
        ));

        let program = script("(a, b);");
        assert!(matches!(
            first_stmt(&program),
            Stmt::Expr { expr: Expr::Sequence { .. }, .. }
        ));
    }

    #[test]
    fn test_arrow_with_defaults_and_rest() {
        let program = script("(a = 1, [b, c], ...rest) => a;");
        let Stmt::Expr { expr: Expr::Arrow(func), .. } = first_stmt(&program) else {
            panic!()
        };
        assert_eq!(func.params.len(), 2);
        assert!(func.rest.is_some());
        assert!(func.expr_body.is_some());
    }

    #[test]
    fn test_duplicate_let_rejected() {
        assert!(parse_script("let x; x; let x;").is_err());
        assert!(parse_script("let x; var x;").is_err());
        assert!(parse_script("var x; var x;").is_ok());
        assert!(parse_script("{ let x; } let x;").is_ok());
    }

    #[test]
    fn test_const_requires_init() {
        assert!(parse_script("const x;").is_err());
        assert!(parse_script("const x = 1;").is_ok());
    }

    #[test]
    fn test_for_of_target_validation() {
        assert!(parse_script("for (const x of xs) {}").is_ok());
        assert!(parse_script("for (x of xs) {}").is_ok());
        assert!(parse_script("for ([a, b] of xs) {}").is_ok());
        assert!(parse_script("for (1 of xs) {}").is_err());
        assert!(parse_script("for (x + 1 in o) {}").is_err());
    }

    #[test]
    fn test_for_await_only_in_async() {
        assert!(parse_script("async function f(xs) { for await (const x of xs) {} }").is_ok());
        assert!(parse_script("function f(xs) { for await (const x of xs) {} }").is_err());
        assert!(parse_module("for await (const x of xs) {}").is_ok());
    }

    #[test]
    fn test_top_level_await_module_only() {
        assert!(parse_module("await p;").is_ok());
        // In a script, `await p` is `await` as an identifier followed by
        // an identifier, which does not parse as a statement.
        assert!(parse_script("await p;").is_err());
        assert!(parse_script("var await = 1;").is_ok());
        assert!(parse_module("var await = 1;").is_err());
    }

    #[test]
    fn test_private_names() {
        let source = "class C { #x = 1; get() { return this.#x; } has(o) { return #x in o; } }";
        assert!(parse_script(source).is_ok());
        // Undeclared private name.
        assert!(parse_script("class C { m() { return this.#y; } }").is_err());
        assert!(parse_script("const o = {}; o.#x;").is_err());
        // Duplicate private names.
        assert!(parse_script("class C { #x; #x; }").is_err());
    }

    #[test]
    fn test_class_constructor_rules() {
        assert!(parse_script("class C { constructor() {} }").is_ok());
        assert!(parse_script("class C { constructor() {} constructor() {} }").is_err());
        assert!(parse_script("class C { async constructor() {} }").is_err());
        assert!(parse_script("class C { static prototype() {} }").is_err());
    }

    #[test]
    fn test_super_rules() {
        assert!(parse_script("class C extends B { constructor() { super(); } }").is_ok());
        assert!(parse_script("class C { constructor() { super(); } }").is_err());
        assert!(parse_script("class C { m() { return super.m(); } }").is_ok());
        assert!(parse_script("function f() { super(); }").is_err());
    }

    #[test]
    fn test_restricted_productions() {
        // return with a newline returns undefined; the argument becomes an
        // unreachable expression statement.
        let program = script("function f() { return\n1; }");
        let Stmt::Function(func) = first_stmt(&program) else {
            panic!()
        };
        assert!(matches!(func.body[0], Stmt::Return { argument: None, .. }));

        assert!(parse_script("throw\n1;").is_err());
    }

    #[test]
    fn test_strict_mode_directive() {
        assert!(parse_script("'use strict'; x = 07;").is_err());
        assert!(parse_script("'use strict'; delete x;").is_err());
        assert!(parse_script("delete x;").is_ok());
        assert!(parse_script("'use strict'; var eval = 1;").is_err());
    }

    #[test]
    fn test_labels() {
        assert!(parse_script("outer: for (;;) { break outer; }").is_ok());
        assert!(parse_script("outer: for (;;) { continue outer; }").is_ok());
        assert!(parse_script("outer: { continue outer; }").is_err());
        assert!(parse_script("break;").is_err());
        assert!(parse_script("x: y: for(;;) break x;").is_ok());
    }

    #[test]
    fn test_optional_chaining() {
        assert!(parse_script("a?.b?.[c]?.();").is_ok());
        assert!(parse_script("a?.b = 1;").is_err());
        assert!(parse_script("new a?.b();").is_err());
    }

    #[test]
    fn test_nullish_mixing() {
        assert!(parse_script("a ?? b;").is_ok());
        assert!(parse_script("(a && b) ?? c;").is_ok());
        assert!(parse_script("a && b ?? c;").is_err());
        assert!(parse_script("a ?? b || c;").is_err());
    }

    #[test]
    fn test_destructuring_assignment() {
        let program = script("[a, b] = pair;");
        assert!(matches!(
            first_stmt(&program),
            Stmt::Expr { expr: Expr::AssignPattern { .. }, .. }
        ));
        assert!(parse_script("({x, y: [z]} = o);").is_ok());
        assert!(parse_script("[a, ...r, b] = xs;").is_err());
    }

    #[test]
    fn test_template_expressions() {
        let program = script("`a${1 + 2}b`;");
        let Stmt::Expr { expr: Expr::Template(template), .. } = first_stmt(&program) else {
            panic!()
        };
        assert_eq!(template.quasis.len(), 2);
        assert_eq!(template.exprs.len(), 1);
        assert!(matches!(template.exprs[0], Expr::Binary { .. }));
    }

    #[test]
    fn test_tagged_template_invalid_escape() {
        // Invalid escape is fatal for untagged templates…
        assert!(parse_script(r"`\u{FFFFFFFF}`;").is_err());
        // …but produces an undefined cooked segment for tagged ones.
        let program = script(r"tag`\u{FFFFFFFF}`;");
        let Stmt::Expr { expr: Expr::TaggedTemplate { quasi, .. }, .. } = first_stmt(&program)
        else {
            panic!()
        };
        assert!(quasi.quasis[0].cooked.is_none());
    }

    #[test]
    fn test_module_items() {
        let module = parse_module(
            "import d, { a as b } from 'm';\nimport * as ns from 'n';\nexport const x = 1;\nexport { x as y };\nexport default 42;\nexport * from 'o';",
        )
        .unwrap();
        assert_eq!(module.items.len(), 6);
        assert!(module.is_strict);
    }

    #[test]
    fn test_generator_yield() {
        let program = script("function* g() { yield 1; yield* inner(); }");
        let Stmt::Function(func) = first_stmt(&program) else {
            panic!()
        };
        assert!(func.is_generator);
        // `yield` is an identifier outside generators in sloppy mode.
        assert!(parse_script("var yield = 1;").is_ok());
        assert!(parse_script("'use strict'; var yield = 1;").is_err());
    }

    #[test]
    fn test_getter_setter_arity() {
        assert!(parse_script("({ get x() { return 1; } });").is_ok());
        assert!(parse_script("({ get x(a) { return 1; } });").is_err());
        assert!(parse_script("({ set x(v) {} });").is_ok());
        assert!(parse_script("({ set x() {} });").is_err());
    }

    #[test]
    fn test_async_arrow() {
        let program = script("async (x) => x;");
        let Stmt::Expr { expr: Expr::Arrow(func), .. } = first_stmt(&program) else {
            panic!()
        };
        assert!(func.is_async);
        // `async(x)` without `=>` is a call.
        let program = script("async(x);");
        assert!(matches!(
            first_stmt(&program),
            Stmt::Expr { expr: Expr::Call { .. }, .. }
        ));
    }

    #[test]
    fn test_new_member_binding() {
        // `new a.b()` constructs a.b; `new a().b` accesses on the result.
        let program = script("new a.b(1);");
        let Stmt::Expr { expr: Expr::New { callee, args, .. }, .. } = first_stmt(&program) else {
            panic!()
        };
        assert!(matches!(&**callee, Expr::Member { .. }));
        assert_eq!(args.len(), 1);
    }

    #[test]
    fn test_parse_expression_entry() {
        assert!(parse_expression("1 + 2").is_ok());
        assert!(parse_expression("1 +").is_err());
    }
}
