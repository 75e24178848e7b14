//! ECMAScript lexer
//!
//! Produces a forward token stream with one-token lookahead. The previous
//! token kind decides whether a `/` starts a regular expression or a
//! division (see [`TokenKind::regex_allowed_after`]). Template literals are
//! scanned as one balanced token; the parser re-parses the embedded
//! expressions from the recorded source ranges.

use boa_unicode::UnicodeProperties;

use crate::error::{ParseError, ParseResult, SyntaxErrorKind};
use crate::token::{KEYWORDS, TemplateRawPart, Token, TokenKind, TokenValue};

/// Saved lexer position for speculative parsing.
#[derive(Debug, Clone)]
pub struct LexerState {
    index: usize,
    line: u32,
    column: u32,
    prev_kind: TokenKind,
    token: Token,
}

/// The lexer.
#[derive(Debug)]
pub struct Lexer<'a> {
    source: &'a str,
    /// Current codepoint, `None` at end of input
    codepoint: Option<char>,
    /// Byte index of `codepoint`
    index: usize,
    /// 1-based line of `codepoint`
    line: u32,
    /// 1-based column of `codepoint`
    column: u32,
    /// Base byte offset added to every span (template sub-lexers)
    base_offset: u32,
    /// Kind of the previously returned token, for regex disambiguation
    prev_kind: TokenKind,
    /// Strict-mode flag; affects legacy octal acceptance
    strict: bool,
    /// One-token lookahead
    token: Token,
}

impl<'a> Lexer<'a> {
    /// Create a lexer and scan the first token.
    pub fn new(source: &'a str) -> ParseResult<Self> {
        Self::with_origin(source, 0, 1)
    }

    /// Create a lexer whose spans are offset into an enclosing source
    /// (used for the expressions inside template literals).
    pub fn with_origin(source: &'a str, base_offset: u32, base_line: u32) -> ParseResult<Self> {
        let mut lexer = Self {
            source,
            codepoint: source.chars().next(),
            index: 0,
            line: base_line,
            column: 1,
            base_offset,
            // Source start expects an expression, so `/…/` lexes as a regex.
            prev_kind: TokenKind::Semicolon,
            strict: false,
            token: Token {
                kind: TokenKind::Eof,
                start: base_offset,
                end: base_offset,
                line: base_line,
                column: 1,
                newline_before: true,
                had_escape: false,
                value: TokenValue::None,
            },
        };
        lexer.token = lexer.scan_token()?;
        Ok(lexer)
    }

    /// Toggle strict mode (affects octal escapes in subsequent tokens).
    pub fn set_strict_mode(&mut self, strict: bool) {
        self.strict = strict;
    }

    /// Whether strict mode is on.
    pub fn strict_mode(&self) -> bool {
        self.strict
    }

    /// The lookahead token.
    pub fn peek(&self) -> &Token {
        &self.token
    }

    /// Consume and return the lookahead, scanning the next token.
    pub fn next(&mut self) -> ParseResult<Token> {
        self.prev_kind = self.token.kind;
        let next = self.scan_token()?;
        Ok(std::mem::replace(&mut self.token, next))
    }

    /// Snapshot the lexer position.
    pub fn save_state(&self) -> LexerState {
        LexerState {
            index: self.index,
            line: self.line,
            column: self.column,
            prev_kind: self.prev_kind,
            token: self.token.clone(),
        }
    }

    /// Rewind to a previously saved position.
    pub fn restore_state(&mut self, state: LexerState) {
        self.index = state.index;
        self.line = state.line;
        self.column = state.column;
        self.prev_kind = state.prev_kind;
        self.codepoint = self.source[self.index..].chars().next();
        self.token = state.token;
    }

    fn error(&self, kind: SyntaxErrorKind, message: impl Into<String>) -> ParseError {
        ParseError::new(kind, message, self.line, self.column)
    }

    /// Step one codepoint forwards.
    fn step(&mut self) {
        if let Some(cp) = self.codepoint {
            self.index += cp.len_utf8();
            if matches!(cp, '\n' | '\u{2028}' | '\u{2029}') {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
            self.codepoint = self.source[self.index..].chars().next();
        }
    }

    fn peek_char(&self, ahead: usize) -> Option<char> {
        self.source[self.index..].chars().nth(ahead)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.codepoint == Some(expected) {
            self.step();
            true
        } else {
            false
        }
    }

    fn scan_token(&mut self) -> ParseResult<Token> {
        let mut newline_before = false;

        loop {
            let Some(ch) = self.codepoint else {
                return Ok(self.make_token(TokenKind::Eof, self.index, newline_before, false, TokenValue::None));
            };
            match ch {
                ' ' | '\t' | '\u{0B}' | '\u{0C}' | '\u{A0}' | '\u{FEFF}' => self.step(),
                '\n' | '\u{2028}' | '\u{2029}' => {
                    newline_before = true;
                    self.step();
                }
                '\r' => {
                    newline_before = true;
                    self.step();
                    // \r\n counts as one terminator; the \n resets the
                    // column again which is harmless.
                }
                '/' if self.peek_char(1) == Some('/') => {
                    self.skip_line_comment();
                }
                '/' if self.peek_char(1) == Some('*') => {
                    if self.skip_block_comment()? {
                        newline_before = true;
                    }
                }
                '<' if self.source[self.index..].starts_with("<!--") => {
                    // Annex B HTML-open comment.
                    self.skip_line_comment();
                }
                '-' if newline_before && self.source[self.index..].starts_with("-->") => {
                    // Annex B HTML-close comment, only after a line terminator.
                    self.skip_line_comment();
                }
                _ if ch.is_whitespace() || ch.is_pattern_whitespace() => self.step(),
                _ => break,
            }
        }

        let start = self.index;
        let line = self.line;
        let column = self.column;
        let ch = self.codepoint.unwrap();

        let mut had_escape = false;
        let (kind, value) = match ch {
            'a'..='z' | 'A'..='Z' | '_' | '$' => self.scan_identifier(&mut had_escape)?,
            '\\' => self.scan_identifier(&mut had_escape)?,
            '0'..='9' => self.scan_number()?,
            '.' => {
                if matches!(self.peek_char(1), Some('0'..='9')) {
                    self.scan_number()?
                } else {
                    self.step();
                    if self.codepoint == Some('.') && self.peek_char(1) == Some('.') {
                        self.step();
                        self.step();
                        (TokenKind::DotDotDot, TokenValue::None)
                    } else {
                        (TokenKind::Dot, TokenValue::None)
                    }
                }
            }
            '"' | '\'' => self.scan_string(ch)?,
            '`' => self.scan_template()?,
            '#' => {
                self.step();
                let mut esc = false;
                // Any IdentifierName is legal after `#`, keywords included.
                let (_, value) = self.scan_private_ident(&mut esc)?;
                had_escape = esc;
                (TokenKind::PrivateName, value)
            }
            '/' => {
                if self.prev_kind.regex_allowed_after() {
                    self.scan_regex()?
                } else {
                    self.step();
                    if self.eat('=') {
                        (TokenKind::SlashAssign, TokenValue::None)
                    } else {
                        (TokenKind::Slash, TokenValue::None)
                    }
                }
            }
            _ if ch.is_id_start() => self.scan_identifier(&mut had_escape)?,
            _ => self.scan_punctuator(ch)?,
        };

        let end = self.index;
        let mut token = self.make_token(kind, start, newline_before, had_escape, value);
        token.start = start as u32 + self.base_offset;
        token.end = end as u32 + self.base_offset;
        token.line = line;
        token.column = column;
        Ok(token)
    }

    fn make_token(
        &self,
        kind: TokenKind,
        start: usize,
        newline_before: bool,
        had_escape: bool,
        value: TokenValue,
    ) -> Token {
        Token {
            kind,
            start: start as u32 + self.base_offset,
            end: self.index as u32 + self.base_offset,
            line: self.line,
            column: self.column,
            newline_before,
            had_escape,
            value,
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.codepoint {
            if matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}') {
                break;
            }
            self.step();
        }
    }

    /// Returns true when the comment spanned a line terminator.
    fn skip_block_comment(&mut self) -> ParseResult<bool> {
        self.step(); // /
        self.step(); // *
        let mut saw_newline = false;
        loop {
            match self.codepoint {
                None => {
                    return Err(self.error(
                        SyntaxErrorKind::UnterminatedComment,
                        "unterminated block comment",
                    ));
                }
                Some('*') if self.peek_char(1) == Some('/') => {
                    self.step();
                    self.step();
                    return Ok(saw_newline);
                }
                Some('\n' | '\r' | '\u{2028}' | '\u{2029}') => {
                    saw_newline = true;
                    self.step();
                }
                Some(_) => self.step(),
            }
        }
    }

    // ---------------------------------------------------------------
    // Identifiers
    // ---------------------------------------------------------------

    fn scan_identifier(&mut self, had_escape: &mut bool) -> ParseResult<(TokenKind, TokenValue)> {
        let mut name = String::new();
        let mut first = true;
        loop {
            match self.codepoint {
                Some('\\') => {
                    if self.peek_char(1) != Some('u') {
                        return Err(self.error(
                            SyntaxErrorKind::InvalidEscape,
                            "invalid escape in identifier",
                        ));
                    }
                    self.step();
                    self.step();
                    let cp = self.scan_unicode_escape()?;
                    let valid = if first { cp.is_id_start() || cp == '$' || cp == '_' } else { cp.is_id_continue() || cp == '$' || cp == '\u{200C}' || cp == '\u{200D}' };
                    if !valid {
                        return Err(self.error(
                            SyntaxErrorKind::InvalidIdentifier,
                            "invalid identifier character from escape",
                        ));
                    }
                    *had_escape = true;
                    name.push(cp);
                }
                Some(ch)
                    if (first && (ch.is_id_start() || ch == '$' || ch == '_'))
                        || (!first
                            && (ch.is_id_continue()
                                || ch == '$'
                                || ch == '\u{200C}'
                                || ch == '\u{200D}')) =>
                {
                    name.push(ch);
                    self.step();
                }
                _ => break,
            }
            first = false;
        }
        if name.is_empty() {
            return Err(self.error(SyntaxErrorKind::InvalidIdentifier, "expected identifier"));
        }
        if let Some(&kw) = KEYWORDS.get(name.as_str()) {
            if *had_escape {
                return Err(self.error(
                    SyntaxErrorKind::InvalidEscape,
                    "keyword must not contain escape sequences",
                ));
            }
            return Ok((kw, TokenValue::Ident(name)));
        }
        Ok((TokenKind::Identifier, TokenValue::Ident(name)))
    }

    /// Like [`scan_identifier`], but keyword spellings stay plain names.
    fn scan_private_ident(&mut self, had_escape: &mut bool) -> ParseResult<(TokenKind, TokenValue)> {
        let (_, value) = self.scan_identifier(had_escape)?;
        Ok((TokenKind::Identifier, value))
    }

    /// Scan the payload of `\u`: either four hex digits or `{…}`.
    fn scan_unicode_escape(&mut self) -> ParseResult<char> {
        let cp = if self.eat('{') {
            let mut v: u32 = 0;
            let mut any = false;
            while let Some(ch) = self.codepoint {
                if ch == '}' {
                    break;
                }
                let d = ch
                    .to_digit(16)
                    .ok_or_else(|| self.error(SyntaxErrorKind::InvalidEscape, "invalid unicode escape"))?;
                v = v
                    .checked_mul(16)
                    .and_then(|v| v.checked_add(d))
                    .filter(|&v| v <= 0x10FFFF)
                    .ok_or_else(|| {
                        self.error(SyntaxErrorKind::InvalidEscape, "unicode escape out of range")
                    })?;
                any = true;
                self.step();
            }
            if !any || !self.eat('}') {
                return Err(self.error(SyntaxErrorKind::InvalidEscape, "invalid unicode escape"));
            }
            v
        } else {
            let mut v: u32 = 0;
            for _ in 0..4 {
                let ch = self
                    .codepoint
                    .ok_or_else(|| self.error(SyntaxErrorKind::InvalidEscape, "invalid unicode escape"))?;
                let d = ch
                    .to_digit(16)
                    .ok_or_else(|| self.error(SyntaxErrorKind::InvalidEscape, "invalid unicode escape"))?;
                v = v * 16 + d;
                self.step();
            }
            v
        };
        // Lone surrogate halves cannot be represented in a Rust string.
        Ok(char::from_u32(cp).unwrap_or('\u{FFFD}'))
    }

    // ---------------------------------------------------------------
    // Numbers
    // ---------------------------------------------------------------

    fn scan_number(&mut self) -> ParseResult<(TokenKind, TokenValue)> {
        let start = self.index;

        if self.codepoint == Some('0') {
            match self.peek_char(1) {
                Some('x' | 'X') => return self.scan_radix_number(16),
                Some('o' | 'O') => return self.scan_radix_number(8),
                Some('b' | 'B') => return self.scan_radix_number(2),
                Some('0'..='7') => return self.scan_legacy_octal(),
                Some('8' | '9') => {
                    if self.strict {
                        return Err(self.error(
                            SyntaxErrorKind::InvalidNumber,
                            "decimal with leading zero is not allowed in strict mode",
                        ));
                    }
                    // Sloppy NonOctalDecimalIntegerLiteral; falls through to
                    // the plain decimal scan below.
                }
                _ => {}
            }
        }

        let mut saw_dot = false;
        let mut saw_exp = false;
        self.scan_decimal_digits()?;
        if self.codepoint == Some('.') {
            saw_dot = true;
            self.step();
            if matches!(self.codepoint, Some('0'..='9')) {
                self.scan_decimal_digits()?;
            }
        }
        if matches!(self.codepoint, Some('e' | 'E')) {
            saw_exp = true;
            self.step();
            if matches!(self.codepoint, Some('+' | '-')) {
                self.step();
            }
            if !matches!(self.codepoint, Some('0'..='9')) {
                return Err(self.error(SyntaxErrorKind::InvalidNumber, "missing exponent digits"));
            }
            self.scan_decimal_digits()?;
        }

        if self.codepoint == Some('n') {
            if saw_dot || saw_exp {
                return Err(self.error(
                    SyntaxErrorKind::InvalidBigInt,
                    "invalid BigInt literal",
                ));
            }
            let text: String = self.source[start..self.index].chars().filter(|&c| c != '_').collect();
            if text.len() > 1 && text.starts_with('0') {
                return Err(self.error(
                    SyntaxErrorKind::InvalidBigInt,
                    "BigInt literal must not have a leading zero",
                ));
            }
            self.step();
            self.check_after_number()?;
            return Ok((TokenKind::BigInt, TokenValue::BigInt(text)));
        }

        self.check_after_number()?;
        let mut text: String = self.source[start..self.index]
            .chars()
            .filter(|&c| c != '_')
            .collect();
        if text.ends_with('.') {
            text.pop();
        }
        if text.starts_with('.') {
            text.insert(0, '0');
        }
        let value: f64 = fast_float::parse(&text)
            .map_err(|_| self.error(SyntaxErrorKind::InvalidNumber, "invalid number literal"))?;
        Ok((TokenKind::Number, TokenValue::Number(value)))
    }

    /// Digits with `_` separators: not leading, not trailing, not adjacent.
    fn scan_decimal_digits(&mut self) -> ParseResult<()> {
        let mut last_sep = false;
        let mut any = false;
        loop {
            match self.codepoint {
                Some('0'..='9') => {
                    last_sep = false;
                    any = true;
                    self.step();
                }
                Some('_') => {
                    if !any || last_sep {
                        return Err(self.error(
                            SyntaxErrorKind::InvalidNumber,
                            "misplaced numeric separator",
                        ));
                    }
                    last_sep = true;
                    self.step();
                }
                _ => break,
            }
        }
        if last_sep {
            return Err(self.error(
                SyntaxErrorKind::InvalidNumber,
                "numeric separator at end of digits",
            ));
        }
        Ok(())
    }

    fn scan_radix_number(&mut self, radix: u32) -> ParseResult<(TokenKind, TokenValue)> {
        self.step(); // 0
        self.step(); // x / o / b
        let digits_start = self.index;
        let mut last_sep = false;
        let mut any = false;
        loop {
            match self.codepoint {
                Some('_') => {
                    // Also rejects a separator right after the radix prefix.
                    if !any || last_sep {
                        return Err(self.error(
                            SyntaxErrorKind::InvalidNumber,
                            "misplaced numeric separator",
                        ));
                    }
                    last_sep = true;
                    self.step();
                }
                Some(ch) if ch.to_digit(radix).is_some() => {
                    last_sep = false;
                    any = true;
                    self.step();
                }
                _ => break,
            }
        }
        if !any || last_sep {
            return Err(self.error(SyntaxErrorKind::InvalidNumber, "invalid digits"));
        }
        let digits: String = self.source[digits_start..self.index]
            .chars()
            .filter(|&c| c != '_')
            .collect();

        if self.codepoint == Some('n') {
            self.step();
            self.check_after_number()?;
            let big = num_bigint::BigInt::parse_bytes(digits.as_bytes(), radix)
                .ok_or_else(|| self.error(SyntaxErrorKind::InvalidBigInt, "invalid BigInt literal"))?;
            return Ok((TokenKind::BigInt, TokenValue::BigInt(big.to_string())));
        }

        self.check_after_number()?;
        let value = radix_digits_to_f64(&digits, radix);
        Ok((TokenKind::Number, TokenValue::Number(value)))
    }

    fn scan_legacy_octal(&mut self) -> ParseResult<(TokenKind, TokenValue)> {
        if self.strict {
            return Err(self.error(
                SyntaxErrorKind::InvalidNumber,
                "octal literals are not allowed in strict mode",
            ));
        }
        self.step(); // 0
        let digits_start = self.index;
        while matches!(self.codepoint, Some('0'..='7')) {
            self.step();
        }
        if matches!(self.codepoint, Some('8' | '9')) {
            // 0778 is a decimal literal in sloppy mode; rescan as decimal.
            while matches!(self.codepoint, Some('0'..='9')) {
                self.step();
            }
            self.check_after_number()?;
            let text = &self.source[digits_start..self.index];
            let value: f64 = fast_float::parse(text)
                .map_err(|_| self.error(SyntaxErrorKind::InvalidNumber, "invalid number literal"))?;
            return Ok((TokenKind::Number, TokenValue::Number(value)));
        }
        self.check_after_number()?;
        let digits = &self.source[digits_start..self.index];
        Ok((TokenKind::Number, TokenValue::Number(radix_digits_to_f64(digits, 8))))
    }

    /// A numeric literal must not be immediately followed by an identifier
    /// start or digit.
    fn check_after_number(&self) -> ParseResult<()> {
        if let Some(ch) = self.codepoint {
            if ch.is_id_start() || ch == '$' || ch == '_' || ch.is_ascii_digit() {
                return Err(self.error(
                    SyntaxErrorKind::InvalidNumber,
                    "identifier starts immediately after numeric literal",
                ));
            }
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Strings and templates
    // ---------------------------------------------------------------

    fn scan_string(&mut self, quote: char) -> ParseResult<(TokenKind, TokenValue)> {
        self.step();
        let mut value = String::new();
        let mut legacy_octal = false;
        loop {
            match self.codepoint {
                None | Some('\n' | '\r' | '\u{2028}' | '\u{2029}') => {
                    return Err(self.error(SyntaxErrorKind::InvalidString, "unterminated string"));
                }
                Some(ch) if ch == quote => {
                    self.step();
                    break;
                }
                Some('\\') => {
                    self.step();
                    if let Some(decoded) = self.scan_escape(&mut legacy_octal)? {
                        value.push_str(&decoded);
                    }
                }
                Some(ch) => {
                    value.push(ch);
                    self.step();
                }
            }
        }
        Ok((TokenKind::String, TokenValue::String { value, legacy_octal }))
    }

    /// Decode one escape after the backslash. Returns `None` for a line
    /// continuation.
    fn scan_escape(&mut self, legacy_octal: &mut bool) -> ParseResult<Option<String>> {
        let Some(ch) = self.codepoint else {
            return Err(self.error(SyntaxErrorKind::InvalidEscape, "unterminated escape"));
        };
        let out = match ch {
            'n' => {
                self.step();
                "\n".to_string()
            }
            't' => {
                self.step();
                "\t".to_string()
            }
            'r' => {
                self.step();
                "\r".to_string()
            }
            'b' => {
                self.step();
                "\u{8}".to_string()
            }
            'f' => {
                self.step();
                "\u{C}".to_string()
            }
            'v' => {
                self.step();
                "\u{B}".to_string()
            }
            'x' => {
                self.step();
                let mut v: u32 = 0;
                for _ in 0..2 {
                    let d = self
                        .codepoint
                        .and_then(|c| c.to_digit(16))
                        .ok_or_else(|| self.error(SyntaxErrorKind::InvalidEscape, "invalid hex escape"))?;
                    v = v * 16 + d;
                    self.step();
                }
                char::from_u32(v).unwrap_or('\u{FFFD}').to_string()
            }
            'u' => {
                self.step();
                self.scan_unicode_escape()?.to_string()
            }
            '\r' => {
                self.step();
                self.eat('\n');
                return Ok(None);
            }
            '\n' | '\u{2028}' | '\u{2029}' => {
                self.step();
                return Ok(None);
            }
            '0'..='7' => {
                // \0 alone is NUL; anything else is a legacy octal escape.
                let mut v = ch.to_digit(8).unwrap();
                self.step();
                let mut len = 1;
                if !(v == 0 && !matches!(self.codepoint, Some('0'..='9'))) {
                    *legacy_octal = true;
                    while len < 3 && v < 32 {
                        match self.codepoint.and_then(|c| c.to_digit(8)) {
                            Some(d) => {
                                v = v * 8 + d;
                                self.step();
                                len += 1;
                            }
                            None => break,
                        }
                    }
                }
                char::from_u32(v).unwrap_or('\u{FFFD}').to_string()
            }
            '8' | '9' => {
                *legacy_octal = true;
                self.step();
                ch.to_string()
            }
            _ => {
                self.step();
                ch.to_string()
            }
        };
        Ok(Some(out))
    }

    /// Scan a whole template literal as one balanced token. Tracks nested
    /// `${…}` with brace depth while honoring strings, comments, regexes
    /// and nested templates, without interpreting the expressions.
    fn scan_template(&mut self) -> ParseResult<(TokenKind, TokenValue)> {
        self.step(); // `
        let mut parts = Vec::new();
        let mut raw = String::new();
        let mut cooked = Some(String::new());

        loop {
            match self.codepoint {
                None => {
                    return Err(self.error(
                        SyntaxErrorKind::InvalidTemplate,
                        "unterminated template literal",
                    ));
                }
                Some('`') => {
                    self.step();
                    parts.push(TemplateRawPart {
                        cooked,
                        raw,
                        expr_range: None,
                    });
                    return Ok((TokenKind::Template, TokenValue::Template(parts)));
                }
                Some('$') if self.peek_char(1) == Some('{') => {
                    self.step();
                    self.step();
                    let expr_start = self.index as u32 + self.base_offset;
                    let expr_end = self.skip_balanced_interpolation()?;
                    parts.push(TemplateRawPart {
                        cooked: cooked.take(),
                        raw: std::mem::take(&mut raw),
                        expr_range: Some((expr_start, expr_end)),
                    });
                    cooked = Some(String::new());
                }
                Some('\\') => {
                    raw.push('\\');
                    self.step();
                    // Raw text keeps the escape verbatim.
                    let escape_start = self.index;
                    let mut legacy = false;
                    match self.scan_escape(&mut legacy) {
                        Ok(Some(decoded)) => {
                            raw.push_str(&self.source[escape_start..self.index]);
                            if legacy {
                                // Octal escapes invalidate the cooked value.
                                cooked = None;
                            } else if let Some(c) = cooked.as_mut() {
                                c.push_str(&decoded);
                            }
                        }
                        Ok(None) => {
                            raw.push_str(&self.source[escape_start..self.index]);
                        }
                        Err(_) => {
                            // Invalid escape: this segment's cooked value
                            // becomes undefined (observable only through
                            // tagged templates; the parser rejects it in
                            // untagged ones).
                            cooked = None;
                            raw.push_str(&self.source[escape_start..self.index]);
                        }
                    }
                }
                Some('\r') => {
                    // Normalized to \n in both cooked and raw.
                    self.step();
                    self.eat('\n');
                    raw.push('\n');
                    if let Some(c) = cooked.as_mut() {
                        c.push('\n');
                    }
                }
                Some(ch) => {
                    raw.push(ch);
                    if let Some(c) = cooked.as_mut() {
                        c.push(ch);
                    }
                    self.step();
                }
            }
        }
    }

    /// Skip a `${…}` interpolation body, returning the byte offset of the
    /// closing `}` (exclusive end of the expression source).
    fn skip_balanced_interpolation(&mut self) -> ParseResult<u32> {
        let mut depth: u32 = 1;
        let mut prev_significant: Option<char> = None;
        loop {
            let Some(ch) = self.codepoint else {
                return Err(self.error(
                    SyntaxErrorKind::InvalidTemplate,
                    "unterminated template expression",
                ));
            };
            match ch {
                '{' => {
                    depth += 1;
                    prev_significant = Some(ch);
                    self.step();
                }
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        let end = self.index as u32 + self.base_offset;
                        self.step();
                        return Ok(end);
                    }
                    prev_significant = Some(ch);
                    self.step();
                }
                '\'' | '"' => {
                    self.skip_quoted(ch)?;
                    prev_significant = Some(ch);
                }
                '`' => {
                    self.step();
                    self.skip_nested_template()?;
                    prev_significant = Some('`');
                }
                '/' if self.peek_char(1) == Some('/') => self.skip_line_comment(),
                '/' if self.peek_char(1) == Some('*') => {
                    self.skip_block_comment()?;
                }
                '/' => {
                    // Approximate regex detection from the previous
                    // significant character; a regex class may contain
                    // braces that must not count toward the depth.
                    let starts_regex = match prev_significant {
                        None => true,
                        Some(p) => matches!(
                            p,
                            '(' | ',' | '=' | ':' | '[' | '!' | '&' | '|' | '?' | '{' | '}' | ';' | '<' | '>' | '+' | '-' | '*' | '%' | '^' | '~'
                        ),
                    };
                    if starts_regex {
                        self.skip_regex_body()?;
                    } else {
                        self.step();
                    }
                    prev_significant = Some('/');
                }
                c if c.is_whitespace() => self.step(),
                c => {
                    prev_significant = Some(c);
                    self.step();
                }
            }
        }
    }

    fn skip_quoted(&mut self, quote: char) -> ParseResult<()> {
        self.step();
        loop {
            match self.codepoint {
                None => {
                    return Err(self.error(SyntaxErrorKind::InvalidString, "unterminated string"));
                }
                Some('\\') => {
                    self.step();
                    self.step();
                }
                Some(ch) if ch == quote => {
                    self.step();
                    return Ok(());
                }
                Some(_) => self.step(),
            }
        }
    }

    fn skip_nested_template(&mut self) -> ParseResult<()> {
        loop {
            match self.codepoint {
                None => {
                    return Err(self.error(
                        SyntaxErrorKind::InvalidTemplate,
                        "unterminated template literal",
                    ));
                }
                Some('`') => {
                    self.step();
                    return Ok(());
                }
                Some('\\') => {
                    self.step();
                    self.step();
                }
                Some('$') if self.peek_char(1) == Some('{') => {
                    self.step();
                    self.step();
                    self.skip_balanced_interpolation()?;
                }
                Some(_) => self.step(),
            }
        }
    }

    fn skip_regex_body(&mut self) -> ParseResult<()> {
        self.step(); // /
        let mut in_class = false;
        loop {
            match self.codepoint {
                None | Some('\n' | '\r' | '\u{2028}' | '\u{2029}') => {
                    return Err(self.error(SyntaxErrorKind::InvalidRegExp, "unterminated regexp"));
                }
                Some('\\') => {
                    self.step();
                    self.step();
                }
                Some('[') => {
                    in_class = true;
                    self.step();
                }
                Some(']') => {
                    in_class = false;
                    self.step();
                }
                Some('/') if !in_class => {
                    self.step();
                    return Ok(());
                }
                Some(_) => self.step(),
            }
        }
    }

    // ---------------------------------------------------------------
    // Regular expressions
    // ---------------------------------------------------------------

    fn scan_regex(&mut self) -> ParseResult<(TokenKind, TokenValue)> {
        self.step(); // /
        let body_start = self.index;
        let mut in_class = false;
        loop {
            match self.codepoint {
                None | Some('\n' | '\r' | '\u{2028}' | '\u{2029}') => {
                    return Err(self.error(
                        SyntaxErrorKind::InvalidRegExp,
                        "unterminated regular expression",
                    ));
                }
                Some('\\') => {
                    self.step();
                    if self.codepoint.is_none() {
                        return Err(self.error(
                            SyntaxErrorKind::InvalidRegExp,
                            "unterminated regular expression",
                        ));
                    }
                    self.step();
                }
                Some('[') => {
                    in_class = true;
                    self.step();
                }
                Some(']') => {
                    in_class = false;
                    self.step();
                }
                Some('/') if !in_class => break,
                Some(_) => self.step(),
            }
        }
        let pattern = self.source[body_start..self.index].to_string();
        self.step(); // /
        let flags_start = self.index;
        while let Some(ch) = self.codepoint {
            if ch.is_id_continue() || ch == '$' {
                self.step();
            } else {
                break;
            }
        }
        let flags = self.source[flags_start..self.index].to_string();
        for ch in flags.chars() {
            if !matches!(ch, 'd' | 'g' | 'i' | 'm' | 's' | 'u' | 'v' | 'y') {
                return Err(self.error(SyntaxErrorKind::InvalidRegExp, "invalid regexp flag"));
            }
        }
        Ok((TokenKind::Regex, TokenValue::Regex { pattern, flags }))
    }

    // ---------------------------------------------------------------
    // Punctuators
    // ---------------------------------------------------------------

    fn scan_punctuator(&mut self, ch: char) -> ParseResult<(TokenKind, TokenValue)> {
        use TokenKind::*;
        self.step();
        let kind = match ch {
            '(' => LParen,
            ')' => RParen,
            '{' => LBrace,
            '}' => RBrace,
            '[' => LBracket,
            ']' => RBracket,
            ';' => Semicolon,
            ',' => Comma,
            ':' => Colon,
            '~' => Tilde,
            '+' => {
                if self.eat('+') {
                    Inc
                } else if self.eat('=') {
                    PlusAssign
                } else {
                    Plus
                }
            }
            '-' => {
                if self.eat('-') {
                    Dec
                } else if self.eat('=') {
                    MinusAssign
                } else {
                    Minus
                }
            }
            '*' => {
                if self.eat('*') {
                    if self.eat('=') { StarStarAssign } else { StarStar }
                } else if self.eat('=') {
                    StarAssign
                } else {
                    Star
                }
            }
            '%' => {
                if self.eat('=') { PercentAssign } else { Percent }
            }
            '&' => {
                if self.eat('&') {
                    if self.eat('=') { AmpAmpAssign } else { AmpAmp }
                } else if self.eat('=') {
                    AmpAssign
                } else {
                    Amp
                }
            }
            '|' => {
                if self.eat('|') {
                    if self.eat('=') { PipePipeAssign } else { PipePipe }
                } else if self.eat('=') {
                    PipeAssign
                } else {
                    Pipe
                }
            }
            '^' => {
                if self.eat('=') { CaretAssign } else { Caret }
            }
            '!' => {
                if self.eat('=') {
                    if self.eat('=') { StrictNotEq } else { NotEq }
                } else {
                    Bang
                }
            }
            '=' => {
                if self.eat('=') {
                    if self.eat('=') { StrictEq } else { Eq }
                } else if self.eat('>') {
                    Arrow
                } else {
                    Assign
                }
            }
            '<' => {
                if self.eat('<') {
                    if self.eat('=') { ShlAssign } else { Shl }
                } else if self.eat('=') {
                    LtEq
                } else {
                    Lt
                }
            }
            '>' => {
                if self.eat('>') {
                    if self.eat('>') {
                        if self.eat('=') { UshrAssign } else { Ushr }
                    } else if self.eat('=') {
                        ShrAssign
                    } else {
                        Shr
                    }
                } else if self.eat('=') {
                    GtEq
                } else {
                    Gt
                }
            }
            '?' => {
                if self.codepoint == Some('.') && !matches!(self.peek_char(1), Some('0'..='9')) {
                    self.step();
                    QuestionDot
                } else if self.eat('?') {
                    if self.eat('=') { QuestionQuestionAssign } else { QuestionQuestion }
                } else {
                    Question
                }
            }
            _ => {
                return Err(ParseError::new(
                    SyntaxErrorKind::UnexpectedToken,
                    format!("unexpected character '{ch}'"),
                    self.line,
                    self.column,
                ));
            }
        };
        Ok((kind, TokenValue::None))
    }
}

/// Convert radix digits to a double, exactly while the value fits in the
/// 53-bit mantissa.
fn radix_digits_to_f64(digits: &str, radix: u32) -> f64 {
    let mut acc: u128 = 0;
    let mut overflow = false;
    for ch in digits.chars() {
        let d = ch.to_digit(radix).unwrap() as u128;
        match acc.checked_mul(radix as u128).and_then(|v| v.checked_add(d)) {
            Some(v) => acc = v,
            None => {
                overflow = true;
                break;
            }
        }
    }
    if !overflow {
        return acc as f64;
    }
    let mut value = 0.0f64;
    for ch in digits.chars() {
        value = value * radix as f64 + ch.to_digit(radix).unwrap() as f64;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(source).unwrap();
        let mut out = Vec::new();
        loop {
            let token = lexer.next().unwrap();
            if token.kind == TokenKind::Eof {
                break;
            }
            out.push(token.kind);
        }
        out
    }

    #[test]
    fn test_division_after_number() {
        // `1/2/3` is two divisions, not a regex.
        assert_eq!(
            kinds("1/2/3"),
            vec![
                TokenKind::Number,
                TokenKind::Slash,
                TokenKind::Number,
                TokenKind::Slash,
                TokenKind::Number,
            ]
        );
    }

    #[test]
    fn test_regex_after_operator() {
        assert_eq!(
            kinds("a = /b/g"),
            vec![TokenKind::Identifier, TokenKind::Assign, TokenKind::Regex]
        );
        let mut lexer = Lexer::new("= /ab[/]c/y").unwrap();
        lexer.next().unwrap();
        let token = lexer.next().unwrap();
        assert_eq!(token.kind, TokenKind::Regex);
        match token.value {
            TokenValue::Regex { pattern, flags } => {
                assert_eq!(pattern, "ab[/]c");
                assert_eq!(flags, "y");
            }
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn test_numbers() {
        let mut lexer = Lexer::new("0xff 0b101 0o17 1_000_000 1.5e3 .25 10n").unwrap();
        let expect = [255.0, 5.0, 15.0, 1_000_000.0, 1500.0, 0.25];
        for want in expect {
            let token = lexer.next().unwrap();
            assert_eq!(token.kind, TokenKind::Number);
            match token.value {
                TokenValue::Number(n) => assert_eq!(n, want),
                other => panic!("unexpected value {other:?}"),
            }
        }
        let big = lexer.next().unwrap();
        assert_eq!(big.kind, TokenKind::BigInt);
        assert_eq!(big.value, TokenValue::BigInt("10".to_string()));
    }

    #[test]
    fn test_hex_bigint_normalized() {
        let mut lexer = Lexer::new("0x10n").unwrap();
        let token = lexer.next().unwrap();
        assert_eq!(token.value, TokenValue::BigInt("16".to_string()));
    }

    #[test]
    fn test_bad_separators() {
        assert!(Lexer::new("1__0").is_err());
        assert!(Lexer::new("1_").is_err());
        assert!(Lexer::new("0x_1").is_err());
        // A leading underscore is an identifier, not a separator error.
        let mut lexer = Lexer::new("_1").unwrap();
        assert_eq!(lexer.next().unwrap().kind, TokenKind::Identifier);
    }

    #[test]
    fn test_bigint_rejects_fraction_and_exponent() {
        assert!(Lexer::new("1.5n").is_err());
        assert!(Lexer::new("1e3n").is_err());
    }

    #[test]
    fn test_string_escapes() {
        let mut lexer = Lexer::new(r#"'a\nbA\u{1F600}\x41'"#).unwrap();
        let token = lexer.next().unwrap();
        match token.value {
            TokenValue::String { value, legacy_octal } => {
                assert_eq!(value, "a\nbA\u{1F600}A");
                assert!(!legacy_octal);
            }
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn test_legacy_octal_escape_flagged() {
        let mut lexer = Lexer::new(r"'\101'").unwrap();
        let token = lexer.next().unwrap();
        match token.value {
            TokenValue::String { value, legacy_octal } => {
                assert_eq!(value, "A");
                assert!(legacy_octal);
            }
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn test_strict_octal_number_rejected() {
        let mut lexer = Lexer::new("077").unwrap();
        let token = lexer.next().unwrap();
        assert_eq!(token.value, TokenValue::Number(63.0));

        // Same literal after the lexer switches to strict mode.
        let mut strict = Lexer::new("1; 077").unwrap();
        strict.set_strict_mode(true);
        strict.next().unwrap();
        assert!(strict.next().is_err());
    }

    #[test]
    fn test_template_parts() {
        let mut lexer = Lexer::new("`a${x}b${y}c`").unwrap();
        let token = lexer.next().unwrap();
        assert_eq!(token.kind, TokenKind::Template);
        match token.value {
            TokenValue::Template(parts) => {
                assert_eq!(parts.len(), 3);
                assert_eq!(parts[0].cooked.as_deref(), Some("a"));
                assert!(parts[0].expr_range.is_some());
                assert_eq!(parts[2].cooked.as_deref(), Some("c"));
                assert!(parts[2].expr_range.is_none());
            }
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn test_template_nested_braces_and_strings() {
        let mut lexer = Lexer::new("`v=${ {a:'}'}.a }!`").unwrap();
        let token = lexer.next().unwrap();
        match token.value {
            TokenValue::Template(parts) => {
                assert_eq!(parts.len(), 2);
                let (start, end) = parts[0].expr_range.unwrap();
                assert_eq!(" {a:'}'}.a ", &"`v=${ {a:'}'}.a }!`"[start as usize..end as usize]);
            }
            other => panic!("unexpected value {other:?}"),
        }
    }

    #[test]
    fn test_unicode_escape_identifier() {
        let mut lexer = Lexer::new(r"\u0061bc").unwrap();
        let token = lexer.next().unwrap();
        assert_eq!(token.kind, TokenKind::Identifier);
        assert!(token.had_escape);
        assert_eq!(token.ident(), Some("abc"));

        let mut braced = Lexer::new(r"\u{61}bc").unwrap();
        assert_eq!(braced.next().unwrap().ident(), Some("abc"));

        // An escape decoding to a non-identifier char fails.
        assert!(Lexer::new(r"\u0020x").is_err());
        // Escaped keywords are rejected outright.
        assert!(Lexer::new(r"\u0069f").is_err());
    }

    #[test]
    fn test_newline_before_flag() {
        let mut lexer = Lexer::new("a\nb c").unwrap();
        let a = lexer.next().unwrap();
        assert!(a.newline_before);
        let b = lexer.next().unwrap();
        assert!(b.newline_before);
        let c = lexer.next().unwrap();
        assert!(!c.newline_before);
    }

    #[test]
    fn test_html_comments() {
        assert_eq!(kinds("<!-- hello\n1"), vec![TokenKind::Number]);
        assert_eq!(kinds("1\n--> trailing\n2"), vec![TokenKind::Number, TokenKind::Number]);
        // `-->` without a preceding line terminator is just operators.
        assert_eq!(
            kinds("a --> b")[1],
            TokenKind::Dec
        );
    }

    #[test]
    fn test_private_name() {
        let mut lexer = Lexer::new("#field").unwrap();
        let token = lexer.next().unwrap();
        assert_eq!(token.kind, TokenKind::PrivateName);
        assert_eq!(token.ident(), Some("field"));
    }

    #[test]
    fn test_optional_chain_vs_ternary() {
        assert_eq!(
            kinds("a?.b"),
            vec![TokenKind::Identifier, TokenKind::QuestionDot, TokenKind::Identifier]
        );
        // `a?.5:0` is a conditional, not an optional chain.
        assert_eq!(kinds("a?.5:0")[1], TokenKind::Question);
    }

    #[test]
    fn test_save_restore() {
        let mut lexer = Lexer::new("a + b * c").unwrap();
        lexer.next().unwrap();
        let state = lexer.save_state();
        assert_eq!(lexer.peek().kind, TokenKind::Plus);
        lexer.next().unwrap();
        lexer.next().unwrap();
        assert_eq!(lexer.peek().kind, TokenKind::Star);
        lexer.restore_state(state);
        assert_eq!(lexer.peek().kind, TokenKind::Plus);
    }

    #[test]
    fn test_positions() {
        let mut lexer = Lexer::new("a\n  bb").unwrap();
        let a = lexer.next().unwrap();
        assert_eq!((a.line, a.column), (1, 1));
        let b = lexer.next().unwrap();
        assert_eq!((b.line, b.column), (2, 3));
        assert_eq!((b.start, b.end), (4, 6));
    }
}
