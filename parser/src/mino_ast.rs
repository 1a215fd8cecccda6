//! Mino syntax tree
//!
//! A closed set of tagged variants, one per grammar production. Every node
//! carries a byte [`Span`] into the file it came from; class declarations and
//! files also record their [`FileId`] so later passes can build full
//! [`SourceLocation`]s.

use diagnostics::{FileId, SourceLocation};
use std::fmt;

/// Byte range in the original input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn merge(self, other: Span) -> Span {
        Span::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Attach a file to produce a location
    pub fn at(self, file: FileId) -> SourceLocation {
        SourceLocation::new(file, self.start, self.end)
    }
}

/// A name as written in the source, with its span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self {
            name: name.into(),
            span,
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// One parsed source file: class definitions followed by the main program
#[derive(Debug, Clone, PartialEq)]
pub struct MinoFile {
    pub file_id: FileId,
    pub name: String,
    pub classes: Vec<ClassDecl>,
    pub statements: Vec<Stmt>,
    pub span: Span,
}

/// `class Name (special Parent)? { members }`
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: Ident,
    /// Declared supertype; `None` means the root class
    pub special: Option<Ident>,
    pub members: Vec<Member>,
    pub file_id: FileId,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Field(FieldDecl),
    Method(MethodDecl),
}

/// `var _name: Type;`
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: Ident,
    pub ty: Ident,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: MethodName,
    pub params: Vec<Param>,
    pub return_type: Option<Ident>,
    pub body: MethodBody,
    pub span: Span,
}

/// Methods are named by an identifier or by an operator symbol
#[derive(Debug, Clone, PartialEq)]
pub enum MethodName {
    Id(Ident),
    Operator(Operator, Span),
}

impl MethodName {
    pub fn span(&self) -> Span {
        match self {
            MethodName::Id(ident) => ident.span,
            MethodName::Operator(_, span) => *span,
        }
    }
}

impl fmt::Display for MethodName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodName::Id(ident) => f.write_str(&ident.name),
            MethodName::Operator(op, _) => f.write_str(op.symbol()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MethodBody {
    /// `fun` members
    Block(Vec<Stmt>),
    /// `primitive` members, implemented natively
    Primitive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: Ident,
    pub ty: Ident,
}

/// Overloadable operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    Plus,
    Minus,
    Mult,
    Div,
    Modul,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    pub const ALL: [Operator; 11] = [
        Operator::Plus,
        Operator::Minus,
        Operator::Mult,
        Operator::Div,
        Operator::Modul,
        Operator::Eq,
        Operator::NotEq,
        Operator::Lt,
        Operator::Le,
        Operator::Gt,
        Operator::Ge,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Mult => "*",
            Operator::Div => "/",
            Operator::Modul => "%",
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Operator> {
        Operator::ALL.into_iter().find(|op| op.symbol() == symbol)
    }

    /// `=` and `!=`
    pub fn is_equality(self) -> bool {
        matches!(self, Operator::Eq | Operator::NotEq)
    }

    /// `< <= > >=`
    pub fn is_ordering(self) -> bool {
        matches!(self, Operator::Lt | Operator::Le | Operator::Gt | Operator::Ge)
    }

    /// `+ - * / %`
    pub fn is_arithmetic(self) -> bool {
        !self.is_equality() && !self.is_ordering()
    }

    /// `* / %` (and `-`, which types the same way)
    pub fn is_multiplicative(self) -> bool {
        matches!(
            self,
            Operator::Minus | Operator::Mult | Operator::Div | Operator::Modul
        )
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// `var x: T (= e)?;`
    VarDecl {
        name: Ident,
        ty: Ident,
        init: Option<Expr>,
    },
    /// `x = e;`
    Assign { name: Ident, value: Expr },
    /// `_f = e;`
    FieldAssign { field: Ident, value: Expr },
    While { cond: Expr, body: Vec<Stmt> },
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    Return(Option<Expr>),
    /// A call evaluated for its effect; always `ExprKind::Call` or `ExprKind::SelfCall`
    Call(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Binary {
        op: Operator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Reference identity, `a is b`
    Is { left: Box<Expr>, right: Box<Expr> },
    /// Dynamic type test, `a isa C`
    Isa { expr: Box<Expr>, class: Ident },
    Not(Box<Expr>),
    Call {
        receiver: Box<Expr>,
        method: Ident,
        args: Vec<Expr>,
    },
    SelfCall { method: Ident, args: Vec<Expr> },
    New(Ident),
    Field(Ident),
    Var(Ident),
    /// Decimal digits, arbitrary length
    Integer(String),
    Float(f32),
    /// Contents without the quotes
    String(String),
    True,
    False,
    Null,
    SelfRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operator_symbols_round_trip() {
        for op in Operator::ALL {
            assert_eq!(Operator::from_symbol(op.symbol()), Some(op));
        }
        assert_eq!(Operator::from_symbol("=="), None);
    }

    #[test]
    fn test_operator_families() {
        assert!(Operator::NotEq.is_equality());
        assert!(Operator::Ge.is_ordering());
        assert!(!Operator::Eq.is_ordering());
        assert!(Operator::Minus.is_multiplicative());
        assert!(!Operator::Plus.is_multiplicative());
    }

    #[test]
    fn test_span_merge_and_location() {
        let span = Span::new(4, 8).merge(Span::new(2, 5));
        assert_eq!(span, Span::new(2, 8));
        let location = span.at(FileId::new(3));
        assert_eq!(location.file, FileId::new(3));
        assert_eq!((location.start, location.end), (2, 8));
    }
}
