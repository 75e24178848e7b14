//! Tokens and keyword tables

/// Token kinds.
///
/// Contextual keywords (`async`, `of`, `get`, `set`, `static`, `as`,
/// `from`) are lexed as `Identifier` and recognized by spelling in the
/// parser; only reserved words get their own kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Eof,
    Identifier,
    PrivateName,
    Number,
    BigInt,
    String,
    /// `` `text` `` — a template literal scanned as one balanced token
    Template,
    Regex,

    // Punctuation
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Dot,
    DotDotDot,
    Colon,
    Question,
    QuestionDot,
    QuestionQuestion,
    QuestionQuestionAssign,
    Arrow,

    // Operators
    Assign,
    Plus,
    PlusAssign,
    Inc,
    Minus,
    MinusAssign,
    Dec,
    Star,
    StarAssign,
    StarStar,
    StarStarAssign,
    Slash,
    SlashAssign,
    Percent,
    PercentAssign,
    Amp,
    AmpAssign,
    AmpAmp,
    AmpAmpAssign,
    Pipe,
    PipeAssign,
    PipePipe,
    PipePipeAssign,
    Caret,
    CaretAssign,
    Tilde,
    Bang,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Shl,
    ShlAssign,
    Shr,
    ShrAssign,
    Ushr,
    UshrAssign,

    // Reserved words
    Break,
    Case,
    Catch,
    Class,
    Const,
    Continue,
    Debugger,
    Default,
    Delete,
    Do,
    Else,
    Enum,
    Export,
    Extends,
    False,
    Finally,
    For,
    Function,
    If,
    Import,
    In,
    InstanceOf,
    New,
    Null,
    Return,
    Super,
    Switch,
    This,
    Throw,
    True,
    Try,
    TypeOf,
    Var,
    Void,
    While,
    With,
    // Contextually reserved
    Let,
    Yield,
    Await,
}

/// Reserved-word lookup, keyed by source spelling.
pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "break" => TokenKind::Break,
    "case" => TokenKind::Case,
    "catch" => TokenKind::Catch,
    "class" => TokenKind::Class,
    "const" => TokenKind::Const,
    "continue" => TokenKind::Continue,
    "debugger" => TokenKind::Debugger,
    "default" => TokenKind::Default,
    "delete" => TokenKind::Delete,
    "do" => TokenKind::Do,
    "else" => TokenKind::Else,
    "enum" => TokenKind::Enum,
    "export" => TokenKind::Export,
    "extends" => TokenKind::Extends,
    "false" => TokenKind::False,
    "finally" => TokenKind::Finally,
    "for" => TokenKind::For,
    "function" => TokenKind::Function,
    "if" => TokenKind::If,
    "import" => TokenKind::Import,
    "in" => TokenKind::In,
    "instanceof" => TokenKind::InstanceOf,
    "new" => TokenKind::New,
    "null" => TokenKind::Null,
    "return" => TokenKind::Return,
    "super" => TokenKind::Super,
    "switch" => TokenKind::Switch,
    "this" => TokenKind::This,
    "throw" => TokenKind::Throw,
    "true" => TokenKind::True,
    "try" => TokenKind::Try,
    "typeof" => TokenKind::TypeOf,
    "var" => TokenKind::Var,
    "void" => TokenKind::Void,
    "while" => TokenKind::While,
    "with" => TokenKind::With,
    "let" => TokenKind::Let,
    "yield" => TokenKind::Yield,
    "await" => TokenKind::Await,
};

impl TokenKind {
    /// Binary operators eligible for precedence climbing.
    /// <https://developer.mozilla.org/en-US/docs/Web/JavaScript/Reference/Operators/Operator_precedence>
    pub fn binary_precedence(self) -> u8 {
        match self {
            TokenKind::QuestionQuestion => 1,
            TokenKind::PipePipe => 2,
            TokenKind::AmpAmp => 3,
            TokenKind::Pipe => 4,
            TokenKind::Caret => 5,
            TokenKind::Amp => 6,
            TokenKind::Eq | TokenKind::NotEq | TokenKind::StrictEq | TokenKind::StrictNotEq => 7,
            TokenKind::Lt
            | TokenKind::LtEq
            | TokenKind::Gt
            | TokenKind::GtEq
            | TokenKind::In
            | TokenKind::InstanceOf => 8,
            TokenKind::Shl | TokenKind::Shr | TokenKind::Ushr => 9,
            TokenKind::Plus | TokenKind::Minus => 10,
            TokenKind::Star | TokenKind::Slash | TokenKind::Percent => 11,
            TokenKind::StarStar => 12,
            _ => 0,
        }
    }

    /// Compound and plain assignment operators.
    pub fn is_assignment_op(self) -> bool {
        matches!(
            self,
            TokenKind::Assign
                | TokenKind::PlusAssign
                | TokenKind::MinusAssign
                | TokenKind::StarAssign
                | TokenKind::StarStarAssign
                | TokenKind::SlashAssign
                | TokenKind::PercentAssign
                | TokenKind::ShlAssign
                | TokenKind::ShrAssign
                | TokenKind::UshrAssign
                | TokenKind::AmpAssign
                | TokenKind::PipeAssign
                | TokenKind::CaretAssign
                | TokenKind::AmpAmpAssign
                | TokenKind::PipePipeAssign
                | TokenKind::QuestionQuestionAssign
        )
    }

    /// True when a `/` following a token of this kind starts a regular
    /// expression rather than a division.
    pub fn regex_allowed_after(self) -> bool {
        !matches!(
            self,
            TokenKind::Identifier
                | TokenKind::PrivateName
                | TokenKind::Number
                | TokenKind::BigInt
                | TokenKind::String
                | TokenKind::Template
                | TokenKind::Regex
                | TokenKind::RParen
                | TokenKind::RBracket
                | TokenKind::Inc
                | TokenKind::Dec
                | TokenKind::This
                | TokenKind::Super
                | TokenKind::True
                | TokenKind::False
                | TokenKind::Null
        )
    }
}

/// A scanned segment of a template literal.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateRawPart {
    /// Cooked text; `None` when the segment contains an invalid escape
    /// (legal only in tagged templates)
    pub cooked: Option<String>,
    /// Raw text between the delimiters
    pub raw: String,
    /// Source range of the `${…}` expression following this segment,
    /// exclusive of the delimiters; `None` on the final segment
    pub expr_range: Option<(u32, u32)>,
}

/// Decoded payload carried by a token.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum TokenValue {
    #[default]
    None,
    /// Numeric literal value
    Number(f64),
    /// BigInt literal, normalized decimal digits
    BigInt(String),
    /// String literal: cooked contents + whether a legacy octal escape
    /// appeared (banned in strict code)
    String {
        value: String,
        legacy_octal: bool,
    },
    /// Identifier or private name spelling (escapes decoded)
    Ident(String),
    /// Balanced template literal split into parts
    Template(Vec<TemplateRawPart>),
    /// Regular expression literal
    Regex {
        pattern: String,
        flags: String,
    },
}

/// A lexed token.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character
    pub start: u32,
    /// Byte offset one past the last character
    pub end: u32,
    /// 1-based source line
    pub line: u32,
    /// 1-based source column
    pub column: u32,
    /// A line terminator appeared between the previous token and this one
    pub newline_before: bool,
    /// The token contained a `\u` escape (escaped keywords are rejected
    /// where a contextual keyword is required)
    pub had_escape: bool,
    pub value: TokenValue,
}

impl Token {
    /// Identifier spelling, if this token carries one.
    pub fn ident(&self) -> Option<&str> {
        match &self.value {
            TokenValue::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// True for an unescaped identifier with the given spelling.
    pub fn is_contextual(&self, word: &str) -> bool {
        self.kind == TokenKind::Identifier && !self.had_escape && self.ident() == Some(word)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_lookup() {
        assert_eq!(KEYWORDS.get("function"), Some(&TokenKind::Function));
        assert_eq!(KEYWORDS.get("await"), Some(&TokenKind::Await));
        assert_eq!(KEYWORDS.get("async"), None);
        assert_eq!(KEYWORDS.get("of"), None);
    }

    #[test]
    fn test_regex_disambiguation_table() {
        // `1/2/3` must lex as divisions: a `/` after a number divides.
        assert!(!TokenKind::Number.regex_allowed_after());
        assert!(!TokenKind::RParen.regex_allowed_after());
        assert!(TokenKind::Assign.regex_allowed_after());
        assert!(TokenKind::LParen.regex_allowed_after());
        assert!(TokenKind::Return.regex_allowed_after());
        assert!(TokenKind::Comma.regex_allowed_after());
    }

    #[test]
    fn test_precedence_ordering() {
        assert!(
            TokenKind::Star.binary_precedence() > TokenKind::Plus.binary_precedence()
        );
        assert!(
            TokenKind::Plus.binary_precedence() > TokenKind::Shl.binary_precedence()
        );
        assert!(TokenKind::StarStar.binary_precedence() > TokenKind::Star.binary_precedence());
        assert_eq!(TokenKind::Assign.binary_precedence(), 0);
    }
}
