//! Abstract syntax tree
//!
//! Nodes are plain sum types with a [`Span`] carrying the source position.
//! Shared behavior lives in functions over the enums, not in trait objects.

/// Source position of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Byte offset of the first character
    pub start: u32,
    /// Byte offset one past the last character
    pub end: u32,
    /// 1-based line
    pub line: u32,
    /// 1-based column
    pub column: u32,
}

/// A property name in an object literal or class body.
#[derive(Debug, Clone)]
pub enum PropertyKey {
    /// `{ a: … }`
    Ident(Box<str>),
    /// `{ "a b": … }`
    String(Box<str>),
    /// `{ 1.5: … }`
    Number(f64),
    /// `{ [expr]: … }`
    Computed(Box<Expr>),
    /// `#name` (class bodies only)
    Private(Box<str>),
}

impl PropertyKey {
    /// Static spelling, when the key is not computed.
    pub fn static_name(&self) -> Option<&str> {
        match self {
            PropertyKey::Ident(name) | PropertyKey::String(name) => Some(name),
            _ => None,
        }
    }
}

/// One cooked/raw segment of a template literal.
#[derive(Debug, Clone)]
pub struct TemplatePart {
    /// `None` when the segment contained an invalid escape (tagged only)
    pub cooked: Option<Box<str>>,
    pub raw: Box<str>,
}

/// `` `a${x}b` `` — quasis.len() == exprs.len() + 1.
#[derive(Debug, Clone)]
pub struct TemplateLiteral {
    pub quasis: Vec<TemplatePart>,
    pub exprs: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Minus,
    Plus,
    Not,
    BitNot,
    TypeOf,
    Void,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Shl,
    Shr,
    Ushr,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    NotEq,
    StrictEq,
    StrictNotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    In,
    InstanceOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
    Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Shl,
    Shr,
    Ushr,
    BitAnd,
    BitOr,
    BitXor,
    /// `&&=`
    And,
    /// `||=`
    Or,
    /// `??=`
    Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOp {
    Inc,
    Dec,
}

/// An element of an array literal.
#[derive(Debug, Clone)]
pub enum ArrayElement {
    /// Elision
    Hole,
    Expr(Expr),
    Spread(Expr),
}

/// A property of an object literal.
#[derive(Debug, Clone)]
pub enum ObjectProperty {
    /// `key: value`, `key` shorthand and `__proto__: value`
    KeyValue {
        key: PropertyKey,
        value: Expr,
        /// `__proto__: v` sets the prototype instead of defining a property
        is_proto: bool,
    },
    /// `method() {}`, `get x() {}`, `set x(v) {}`, `*gen() {}`
    Method {
        key: PropertyKey,
        kind: MethodKind,
        function: Box<Function>,
    },
    /// `...expr`
    Spread(Expr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    Method,
    Getter,
    Setter,
}

/// A call or `new` argument.
#[derive(Debug, Clone)]
pub enum Argument {
    Expr(Expr),
    Spread(Expr),
}

/// The property part of a member expression.
#[derive(Debug, Clone)]
pub enum MemberKey {
    /// `obj.name`
    Field(Box<str>),
    /// `obj[expr]`
    Index(Box<Expr>),
    /// `obj.#name`
    Private(Box<str>),
}

#[derive(Debug, Clone)]
pub enum Expr {
    Ident {
        name: Box<str>,
        span: Span,
    },
    Number {
        value: f64,
        span: Span,
    },
    BigInt {
        /// Normalized decimal digits
        digits: Box<str>,
        span: Span,
    },
    String {
        value: Box<str>,
        span: Span,
    },
    Boolean {
        value: bool,
        span: Span,
    },
    Null {
        span: Span,
    },
    This {
        span: Span,
    },
    NewTarget {
        span: Span,
    },
    Regex {
        pattern: Box<str>,
        flags: Box<str>,
        span: Span,
    },
    Template(Box<TemplateLiteral>),
    TaggedTemplate {
        tag: Box<Expr>,
        quasi: Box<TemplateLiteral>,
        span: Span,
    },
    Array {
        elements: Vec<ArrayElement>,
        span: Span,
    },
    Object {
        properties: Vec<ObjectProperty>,
        span: Span,
    },
    Function(Box<Function>),
    Arrow(Box<Function>),
    Class(Box<ClassDef>),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
        span: Span,
    },
    Update {
        op: UpdateOp,
        prefix: bool,
        target: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Logical {
        op: LogicalOp,
        left: Box<Expr>,
        right: Box<Expr>,
        span: Span,
    },
    Assign {
        op: AssignOp,
        target: Box<Expr>,
        value: Box<Expr>,
        span: Span,
    },
    /// Destructuring assignment: `[a, b] = rhs`, `({x} = rhs)`
    AssignPattern {
        pattern: Box<Pattern>,
        value: Box<Expr>,
        span: Span,
    },
    Conditional {
        test: Box<Expr>,
        consequent: Box<Expr>,
        alternate: Box<Expr>,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Argument>,
        /// `f?.(…)`
        optional: bool,
        span: Span,
    },
    New {
        callee: Box<Expr>,
        args: Vec<Argument>,
        span: Span,
    },
    Member {
        object: Box<Expr>,
        property: MemberKey,
        /// `obj?.prop`
        optional: bool,
        span: Span,
    },
    /// `super.x` / `super[x]`
    SuperMember {
        property: MemberKey,
        span: Span,
    },
    /// `super(…)`
    SuperCall {
        args: Vec<Argument>,
        span: Span,
    },
    Sequence {
        exprs: Vec<Expr>,
        span: Span,
    },
    Yield {
        argument: Option<Box<Expr>>,
        delegate: bool,
        span: Span,
    },
    Await {
        argument: Box<Expr>,
        span: Span,
    },
    /// `#name in obj`
    PrivateIn {
        name: Box<str>,
        object: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    /// Source position of this expression.
    pub fn span(&self) -> Span {
        match self {
            Expr::Ident { span, .. }
            | Expr::Number { span, .. }
            | Expr::BigInt { span, .. }
            | Expr::String { span, .. }
            | Expr::Boolean { span, .. }
            | Expr::Null { span }
            | Expr::This { span }
            | Expr::NewTarget { span }
            | Expr::Regex { span, .. }
            | Expr::TaggedTemplate { span, .. }
            | Expr::Array { span, .. }
            | Expr::Object { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Update { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Logical { span, .. }
            | Expr::Assign { span, .. }
            | Expr::AssignPattern { span, .. }
            | Expr::Conditional { span, .. }
            | Expr::Call { span, .. }
            | Expr::New { span, .. }
            | Expr::Member { span, .. }
            | Expr::SuperMember { span, .. }
            | Expr::SuperCall { span, .. }
            | Expr::Sequence { span, .. }
            | Expr::Yield { span, .. }
            | Expr::Await { span, .. }
            | Expr::PrivateIn { span, .. } => *span,
            Expr::Template(t) => t.span,
            Expr::Function(f) | Expr::Arrow(f) => f.span,
            Expr::Class(c) => c.span,
        }
    }
}

/// A destructuring target.
#[derive(Debug, Clone)]
pub enum Pattern {
    Ident {
        name: Box<str>,
        span: Span,
    },
    Array {
        elements: Vec<ArrayPatternElement>,
        rest: Option<Box<Pattern>>,
        span: Span,
    },
    Object {
        properties: Vec<ObjectPatternProp>,
        rest: Option<Box<Pattern>>,
        span: Span,
    },
    /// Member expression target, legal only in destructuring assignments
    Member(Box<Expr>),
}

impl Pattern {
    /// Source position of this pattern.
    pub fn span(&self) -> Span {
        match self {
            Pattern::Ident { span, .. }
            | Pattern::Array { span, .. }
            | Pattern::Object { span, .. } => *span,
            Pattern::Member(expr) => expr.span(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ArrayPatternElement {
    /// Elision
    Hole,
    Element {
        pattern: Pattern,
        /// Fires only when the bound value is undefined
        default: Option<Expr>,
    },
}

#[derive(Debug, Clone)]
pub struct ObjectPatternProp {
    pub key: PropertyKey,
    pub value: Pattern,
    pub default: Option<Expr>,
}

/// A formal parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub pattern: Pattern,
    pub default: Option<Expr>,
}

/// A function of any flavor: declaration, expression, arrow, method.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: Option<Box<str>>,
    pub params: Vec<Param>,
    pub rest: Option<Pattern>,
    pub body: Vec<Stmt>,
    /// Arrow concise body; `body` is empty when set
    pub expr_body: Option<Box<Expr>>,
    pub is_arrow: bool,
    pub is_async: bool,
    pub is_generator: bool,
    /// Resolved after parsing the body prologue
    pub is_strict: bool,
    /// Source text of the whole function, for `Function.prototype.toString`
    pub source: Option<Box<str>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ClassDef {
    pub name: Option<Box<str>>,
    pub parent: Option<Box<Expr>>,
    pub members: Vec<ClassMember>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ClassMember {
    Constructor(Box<Function>),
    Method {
        key: PropertyKey,
        kind: MethodKind,
        is_static: bool,
        function: Box<Function>,
    },
    Field {
        key: PropertyKey,
        value: Option<Expr>,
        is_static: bool,
    },
    StaticBlock(Vec<Stmt>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarKind {
    Var,
    Let,
    Const,
}

#[derive(Debug, Clone)]
pub struct Declarator {
    pub pattern: Pattern,
    pub init: Option<Expr>,
}

/// `for (init; …)` initializer.
#[derive(Debug, Clone)]
pub enum ForInit {
    VarDecl {
        kind: VarKind,
        declarations: Vec<Declarator>,
    },
    Expr(Expr),
}

/// The left side of for-in / for-of.
#[derive(Debug, Clone)]
pub enum ForTarget {
    Decl { kind: VarKind, pattern: Pattern },
    Pattern(Pattern),
}

#[derive(Debug, Clone)]
pub struct SwitchCase {
    /// `None` for `default:`
    pub test: Option<Expr>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub struct CatchClause {
    /// `None` for `catch {}`
    pub param: Option<Pattern>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr {
        expr: Expr,
        span: Span,
    },
    Block {
        body: Vec<Stmt>,
        span: Span,
    },
    Empty {
        span: Span,
    },
    VarDecl {
        kind: VarKind,
        declarations: Vec<Declarator>,
        span: Span,
    },
    Function(Box<Function>),
    Class(Box<ClassDef>),
    Return {
        argument: Option<Expr>,
        span: Span,
    },
    If {
        test: Expr,
        consequent: Box<Stmt>,
        alternate: Option<Box<Stmt>>,
        span: Span,
    },
    For {
        init: Option<ForInit>,
        test: Option<Expr>,
        update: Option<Expr>,
        body: Box<Stmt>,
        span: Span,
    },
    ForIn {
        left: ForTarget,
        right: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    ForOf {
        left: ForTarget,
        right: Expr,
        body: Box<Stmt>,
        is_await: bool,
        span: Span,
    },
    While {
        test: Expr,
        body: Box<Stmt>,
        span: Span,
    },
    DoWhile {
        body: Box<Stmt>,
        test: Expr,
        span: Span,
    },
    Break {
        label: Option<Box<str>>,
        span: Span,
    },
    Continue {
        label: Option<Box<str>>,
        span: Span,
    },
    Labeled {
        label: Box<str>,
        body: Box<Stmt>,
        span: Span,
    },
    Switch {
        discriminant: Expr,
        cases: Vec<SwitchCase>,
        span: Span,
    },
    Throw {
        argument: Expr,
        span: Span,
    },
    Try {
        block: Vec<Stmt>,
        handler: Option<CatchClause>,
        finalizer: Option<Vec<Stmt>>,
        span: Span,
    },
    Debugger {
        span: Span,
    },
}

impl Stmt {
    /// Source position of this statement.
    pub fn span(&self) -> Span {
        match self {
            Stmt::Expr { span, .. }
            | Stmt::Block { span, .. }
            | Stmt::Empty { span }
            | Stmt::VarDecl { span, .. }
            | Stmt::Return { span, .. }
            | Stmt::If { span, .. }
            | Stmt::For { span, .. }
            | Stmt::ForIn { span, .. }
            | Stmt::ForOf { span, .. }
            | Stmt::While { span, .. }
            | Stmt::DoWhile { span, .. }
            | Stmt::Break { span, .. }
            | Stmt::Continue { span, .. }
            | Stmt::Labeled { span, .. }
            | Stmt::Switch { span, .. }
            | Stmt::Throw { span, .. }
            | Stmt::Try { span, .. }
            | Stmt::Debugger { span } => *span,
            Stmt::Function(f) => f.span,
            Stmt::Class(c) => c.span,
        }
    }
}

// ---------------------------------------------------------------
// Modules
// ---------------------------------------------------------------

#[derive(Debug, Clone)]
pub enum ImportSpecifier {
    /// `import x from "m"`
    Default { local: Box<str> },
    /// `import * as ns from "m"`
    Namespace { local: Box<str> },
    /// `import { a as b } from "m"`
    Named { imported: Box<str>, local: Box<str> },
}

#[derive(Debug, Clone)]
pub struct ImportDecl {
    pub specifiers: Vec<ImportSpecifier>,
    pub source: Box<str>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ExportSpecifier {
    pub local: Box<str>,
    pub exported: Box<str>,
}

#[derive(Debug, Clone)]
pub enum ModuleItem {
    Import(ImportDecl),
    /// `export { a, b as c }` and the re-export form with `from`
    ExportNamed {
        specifiers: Vec<ExportSpecifier>,
        source: Option<Box<str>>,
        span: Span,
    },
    /// `export var/let/const/function/class …`
    ExportDecl(Stmt),
    /// `export default …`
    ExportDefault {
        expr: Expr,
        span: Span,
    },
    /// `export * from "m"` / `export * as ns from "m"`
    ExportAll {
        source: Box<str>,
        alias: Option<Box<str>>,
        span: Span,
    },
    Stmt(Stmt),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramKind {
    Script,
    Module,
}

/// A parsed compilation unit.
#[derive(Debug, Clone)]
pub struct Program {
    pub kind: ProgramKind,
    pub items: Vec<ModuleItem>,
    /// The whole unit is strict (`"use strict"` prologue or module)
    pub is_strict: bool,
}
