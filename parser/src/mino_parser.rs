//! Mino parser with full span tracking
//!
//! Hand-written nom combinators over `&str`. Every parser takes the full
//! input next to the remaining input so spans can be computed as byte
//! offsets. After a keyword has committed to a construct the rest is wrapped
//! in `cut` so errors point at the real problem instead of a backtrack point.

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_until, take_while},
    character::complete::{char, digit1, multispace1, satisfy},
    combinator::{cut, map, map_res, not, opt, peek, recognize, value, verify},
    error::{ErrorKind, context},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated},
};

use crate::custom_error::{ContextWithLocation, ContextualError};
use crate::mino_ast::*;
use diagnostics::{FileId, SourceLocation};

/// Parser result type with contextual errors to capture context strings
pub type PResult<'a, T> = IResult<&'a str, T, ContextualError<&'a str>>;

/// A syntax error with the byte offset it was detected at
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub offset: usize,
}

impl ParseError {
    pub fn location(&self, file: FileId) -> SourceLocation {
        SourceLocation::new(file, self.offset, self.offset + 1)
    }
}

/// Parse a complete Mino source file
pub fn parse_mino_file(file_id: FileId, file_name: &str, input: &str) -> Result<MinoFile, ParseError> {
    log::debug!("parsing {} ({} bytes)", file_name, input.len());
    match mino_file(file_id, file_name, input, input) {
        Ok((_, file)) => Ok(file),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(ParseError {
            message: e.message(),
            offset: input.len() - e.remaining(),
        }),
        Err(nom::Err::Incomplete(_)) => Err(ParseError {
            message: "unexpected end of input".to_string(),
            offset: input.len(),
        }),
    }
}

fn mino_file<'a>(file_id: FileId, file_name: &str, full: &'a str, input: &'a str) -> PResult<'a, MinoFile> {
    let (input, classes) = many0(|i| class_decl(file_id, full, i)).parse(input)?;
    let (input, statements) = many0(|i| statement(full, i)).parse(input)?;
    let (input, _) = ws(input)?;

    if !input.is_empty() {
        // Re-run the parser that stopped so its error surfaces
        if keyword("class").parse(input).is_ok() {
            class_decl(file_id, full, input)?;
            return fail(input, "class definitions must precede the main program");
        }
        statement(full, input)?;
        return fail(input, "expected statement");
    }

    Ok((input, MinoFile {
        file_id,
        name: file_name.to_string(),
        classes,
        statements,
        span: Span::new(0, full.len()),
    }))
}

/// Get current position in the original input
pub fn position(full: &str, current: &str) -> usize {
    full.len() - current.len()
}

fn span_from(full: &str, start: usize, current: &str) -> Span {
    Span::new(start, position(full, current))
}

/// Build a committed failure carrying a context label
fn fail<'a, T>(input: &'a str, ctx: &'static str) -> PResult<'a, T> {
    let mut error = ContextualError::new(input, ErrorKind::Verify);
    error.contexts.push(ContextWithLocation {
        context: ctx,
        remaining: input.len(),
    });
    Err(nom::Err::Failure(error))
}

// =============================================================================
// Whitespace and Comments
// =============================================================================

/// Skip whitespace and comments
pub fn ws(input: &str) -> PResult<'_, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), line_comment),
            value((), block_comment),
        ))),
    )
    .parse(input)
}

/// Line comment: // comment
fn line_comment(input: &str) -> PResult<'_, &str> {
    recognize((tag("//"), take_while(|c: char| c != '\n'))).parse(input)
}

/// Block comment: /* comment */
fn block_comment(input: &str) -> PResult<'_, &str> {
    recognize((tag("/*"), take_until("*/"), tag("*/"))).parse(input)
}

// =============================================================================
// Basic Elements
// =============================================================================

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Reserved keywords
fn is_keyword(s: &str) -> bool {
    matches!(
        s,
        "class" | "special" | "var" | "fun" | "primitive" | "while" | "if" | "else"
            | "return" | "new" | "not" | "is" | "isa" | "true" | "false" | "null" | "self"
    )
}

/// Parse a keyword
pub fn keyword<'a>(kw: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    move |input| {
        let (input, _) = ws(input)?;
        terminated(tag(kw), peek(not(satisfy(is_ident_char)))).parse(input)
    }
}

/// Parse a symbol with whitespace
pub fn symbol<'a>(sym: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    move |input| {
        let (input, _) = ws(input)?;
        tag(sym).parse(input)
    }
}

/// Variable and method names: lowercase first letter
pub fn identifier<'a>(full: &'a str, input: &'a str) -> PResult<'a, Ident> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (rest, id) = verify(
        recognize(pair(
            satisfy(|c: char| c.is_ascii_lowercase()),
            take_while(is_ident_char),
        )),
        |s: &str| !is_keyword(s),
    )
    .parse(input)?;
    Ok((rest, Ident::new(id, span_from(full, start, rest))))
}

/// Class names: uppercase first letter
pub fn class_name<'a>(full: &'a str, input: &'a str) -> PResult<'a, Ident> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (rest, name) = recognize(pair(
        satisfy(|c: char| c.is_ascii_uppercase()),
        take_while(is_ident_char),
    ))
    .parse(input)?;
    Ok((rest, Ident::new(name, span_from(full, start, rest))))
}

/// Field names: leading underscore
pub fn field_name<'a>(full: &'a str, input: &'a str) -> PResult<'a, Ident> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (rest, name) = recognize(pair(char('_'), take_while(is_ident_char))).parse(input)?;
    Ok((rest, Ident::new(name, span_from(full, start, rest))))
}

/// Longest symbols first so `<=` is never read as `<`
const COMPARISON_OPS: &[(&str, Operator)] = &[
    ("<=", Operator::Le),
    (">=", Operator::Ge),
    ("!=", Operator::NotEq),
    ("=", Operator::Eq),
    ("<", Operator::Lt),
    (">", Operator::Gt),
];

const ADDITIVE_OPS: &[(&str, Operator)] = &[("+", Operator::Plus), ("-", Operator::Minus)];

const MULTIPLICATIVE_OPS: &[(&str, Operator)] = &[
    ("*", Operator::Mult),
    ("/", Operator::Div),
    ("%", Operator::Modul),
];

const ALL_OPS: &[(&str, Operator)] = &[
    ("<=", Operator::Le),
    (">=", Operator::Ge),
    ("!=", Operator::NotEq),
    ("+", Operator::Plus),
    ("-", Operator::Minus),
    ("*", Operator::Mult),
    ("/", Operator::Div),
    ("%", Operator::Modul),
    ("=", Operator::Eq),
    ("<", Operator::Lt),
    (">", Operator::Gt),
];

/// Parse operator from a list
fn one_of_ops<'a>(ops: &'static [(&'static str, Operator)]) -> impl FnMut(&'a str) -> PResult<'a, Operator> {
    move |input| {
        let (input, _) = ws(input)?;
        for (op_str, op) in ops {
            if let Some(rest) = input.strip_prefix(*op_str) {
                return Ok((rest, *op));
            }
        }
        Err(nom::Err::Error(ContextualError::new(input, ErrorKind::Tag)))
    }
}

// =============================================================================
// Class definitions
// =============================================================================

/// `class Name (special Parent)? { member* }`
pub fn class_decl<'a>(file_id: FileId, full: &'a str, input: &'a str) -> PResult<'a, ClassDecl> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, _) = keyword("class").parse(input)?;

    let (input, name) = cut(context("expected class name", |i| class_name(full, i))).parse(input)?;
    let (input, special) = opt(preceded(
        keyword("special"),
        cut(context("expected parent class name after 'special'", |i| class_name(full, i))),
    ))
    .parse(input)?;
    let (input, _) = cut(context("expected '{' to open class body", symbol("{"))).parse(input)?;
    let (input, members) = many0(|i| member(full, i)).parse(input)?;
    let (input, _) = cut(context("expected member or '}' to close class body", symbol("}"))).parse(input)?;

    Ok((input, ClassDecl {
        name,
        special,
        members,
        file_id,
        span: span_from(full, start, input),
    }))
}

fn member<'a>(full: &'a str, input: &'a str) -> PResult<'a, Member> {
    alt((
        map(|i| field_decl(full, i), Member::Field),
        map(|i| method_decl(full, i), Member::Method),
    ))
    .parse(input)
}

/// `var _name: Type;`
fn field_decl<'a>(full: &'a str, input: &'a str) -> PResult<'a, FieldDecl> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, _) = keyword("var").parse(input)?;
    let (input, name) = cut(context("expected field name starting with '_'", |i| field_name(full, i))).parse(input)?;
    let (input, _) = cut(context("expected ':' after field name", symbol(":"))).parse(input)?;
    let (input, ty) = cut(context("expected field type", |i| class_name(full, i))).parse(input)?;
    let (input, _) = cut(context("expected ';' after field declaration", symbol(";"))).parse(input)?;

    Ok((input, FieldDecl {
        name,
        ty,
        span: span_from(full, start, input),
    }))
}

/// `fun name(params) (: R)? { ... }` or `primitive name(params) (: R)?;`
fn method_decl<'a>(full: &'a str, input: &'a str) -> PResult<'a, MethodDecl> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, is_primitive) = alt((
        value(false, keyword("fun")),
        value(true, keyword("primitive")),
    ))
    .parse(input)?;

    let (input, name) = cut(context("expected method name or operator", |i| method_name(full, i))).parse(input)?;
    let (input, _) = cut(context("expected '(' to start parameter list", symbol("("))).parse(input)?;
    let (input, params) = separated_list0(symbol(","), |i| param(full, i)).parse(input)?;
    let (input, _) = cut(context("expected ')' to close parameter list", symbol(")"))).parse(input)?;
    let (input, return_type) = opt(preceded(
        symbol(":"),
        cut(context("expected return type", |i| class_name(full, i))),
    ))
    .parse(input)?;

    let (input, body) = if is_primitive {
        let (input, _) = cut(context("expected ';' after primitive declaration", symbol(";"))).parse(input)?;
        (input, MethodBody::Primitive)
    } else {
        let (input, stmts) = cut(|i| block(full, i)).parse(input)?;
        (input, MethodBody::Block(stmts))
    };

    Ok((input, MethodDecl {
        name,
        params,
        return_type,
        body,
        span: span_from(full, start, input),
    }))
}

fn method_name<'a>(full: &'a str, input: &'a str) -> PResult<'a, MethodName> {
    alt((
        map(|i| identifier(full, i), MethodName::Id),
        |i| operator_method_name(full, i),
    ))
    .parse(input)
}

fn operator_method_name<'a>(full: &'a str, input: &'a str) -> PResult<'a, MethodName> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (rest, op) = one_of_ops(ALL_OPS).parse(input)?;
    Ok((rest, MethodName::Operator(op, span_from(full, start, rest))))
}

/// `name: Type`
fn param<'a>(full: &'a str, input: &'a str) -> PResult<'a, Param> {
    let (input, name) = identifier(full, input)?;
    let (input, _) = cut(context("expected ':' after parameter name", symbol(":"))).parse(input)?;
    let (input, ty) = cut(context("expected parameter type", |i| class_name(full, i))).parse(input)?;
    Ok((input, Param { name, ty }))
}

/// `{ stm* }`
fn block<'a>(full: &'a str, input: &'a str) -> PResult<'a, Vec<Stmt>> {
    delimited(
        context("expected '{' to open block", symbol("{")),
        many0(|i| statement(full, i)),
        cut(context("expected statement or '}' to close block", symbol("}"))),
    )
    .parse(input)
}

// =============================================================================
// Statements
// =============================================================================

/// Parse one statement
pub fn statement<'a>(full: &'a str, input: &'a str) -> PResult<'a, Stmt> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, kind) = context(
        "expected statement",
        alt((
            |i| var_decl_stmt(full, i),
            |i| while_stmt(full, i),
            |i| if_stmt(full, i),
            |i| return_stmt(full, i),
            |i| assign_stmt(full, i),
            |i| field_assign_stmt(full, i),
            |i| call_stmt(full, i),
        )),
    )
    .parse(input)?;

    Ok((input, Stmt {
        kind,
        span: span_from(full, start, input),
    }))
}

/// `var x: T (= e)?;`
fn var_decl_stmt<'a>(full: &'a str, input: &'a str) -> PResult<'a, StmtKind> {
    let (input, _) = keyword("var").parse(input)?;
    let (input, name) = cut(context("expected variable name", |i| identifier(full, i))).parse(input)?;
    let (input, _) = cut(context("expected ':' after variable name", symbol(":"))).parse(input)?;
    let (input, ty) = cut(context("expected variable type", |i| class_name(full, i))).parse(input)?;
    let (input, init) = opt(preceded(
        symbol("="),
        cut(context("expected expression after '='", |i| expression(full, i))),
    ))
    .parse(input)?;
    let (input, _) = cut(context("expected ';' after variable declaration", symbol(";"))).parse(input)?;
    Ok((input, StmtKind::VarDecl { name, ty, init }))
}

/// `x = e;`
fn assign_stmt<'a>(full: &'a str, input: &'a str) -> PResult<'a, StmtKind> {
    let (input, name) = identifier(full, input)?;
    let (input, _) = symbol("=").parse(input)?;
    let (input, value) = cut(context("expected expression after '='", |i| expression(full, i))).parse(input)?;
    let (input, _) = cut(context("expected ';' after assignment", symbol(";"))).parse(input)?;
    Ok((input, StmtKind::Assign { name, value }))
}

/// `_f = e;`
fn field_assign_stmt<'a>(full: &'a str, input: &'a str) -> PResult<'a, StmtKind> {
    let (input, field) = field_name(full, input)?;
    let (input, _) = symbol("=").parse(input)?;
    let (input, value) = cut(context("expected expression after '='", |i| expression(full, i))).parse(input)?;
    let (input, _) = cut(context("expected ';' after assignment", symbol(";"))).parse(input)?;
    Ok((input, StmtKind::FieldAssign { field, value }))
}

/// `while (e) { ... }`
fn while_stmt<'a>(full: &'a str, input: &'a str) -> PResult<'a, StmtKind> {
    let (input, _) = keyword("while").parse(input)?;
    let (input, cond) = cut(|i| condition(full, i)).parse(input)?;
    let (input, body) = cut(|i| block(full, i)).parse(input)?;
    Ok((input, StmtKind::While { cond, body }))
}

/// `if (e) { ... } (else { ... })?`
fn if_stmt<'a>(full: &'a str, input: &'a str) -> PResult<'a, StmtKind> {
    let (input, _) = keyword("if").parse(input)?;
    let (input, cond) = cut(|i| condition(full, i)).parse(input)?;
    let (input, then_body) = cut(|i| block(full, i)).parse(input)?;
    let (input, else_body) = opt(preceded(keyword("else"), cut(|i| block(full, i)))).parse(input)?;
    Ok((input, StmtKind::If {
        cond,
        then_body,
        else_body,
    }))
}

fn condition<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    delimited(
        context("expected '(' before condition", symbol("(")),
        context("expected condition", |i| expression(full, i)),
        context("expected ')' after condition", symbol(")")),
    )
    .parse(input)
}

/// `return e?;`
fn return_stmt<'a>(full: &'a str, input: &'a str) -> PResult<'a, StmtKind> {
    let (input, _) = keyword("return").parse(input)?;
    let (input, value) = opt(|i| expression(full, i)).parse(input)?;
    let (input, _) = cut(context("expected ';' after return", symbol(";"))).parse(input)?;
    Ok((input, StmtKind::Return(value)))
}

/// `exp.m(args);` or `m(args);`
fn call_stmt<'a>(full: &'a str, input: &'a str) -> PResult<'a, StmtKind> {
    let (rest, expr) = expression(full, input)?;
    if !matches!(expr.kind, ExprKind::Call { .. } | ExprKind::SelfCall { .. }) {
        let (at, _) = ws(input)?;
        return fail(at, "only method calls can be used as statements");
    }
    let (rest, _) = cut(context("expected ';' after call", symbol(";"))).parse(rest)?;
    Ok((rest, StmtKind::Call(expr)))
}

// =============================================================================
// Expressions
// =============================================================================

enum ExprTail {
    Isa(Ident),
    Is(Expr),
    Compare(Operator, Expr),
}

/// Parse an expression (comparison level, non associative)
pub fn expression<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (input, left) = additive_expr(full, input)?;

    let (input, tail) = opt(alt((
        map(
            preceded(
                keyword("isa"),
                cut(context("expected class name after 'isa'", |i| class_name(full, i))),
            ),
            ExprTail::Isa,
        ),
        map(
            preceded(
                keyword("is"),
                cut(context("expected expression after 'is'", |i| additive_expr(full, i))),
            ),
            ExprTail::Is,
        ),
        map(
            pair(
                one_of_ops(COMPARISON_OPS),
                cut(context("expected expression after comparison", |i| additive_expr(full, i))),
            ),
            |(op, right): (Operator, Expr)| ExprTail::Compare(op, right),
        ),
    )))
    .parse(input)?;

    let span = span_from(full, start, input);
    let kind = match tail {
        None => return Ok((input, left)),
        Some(ExprTail::Isa(class)) => ExprKind::Isa {
            expr: Box::new(left),
            class,
        },
        Some(ExprTail::Is(right)) => ExprKind::Is {
            left: Box::new(left),
            right: Box::new(right),
        },
        Some(ExprTail::Compare(op, right)) => ExprKind::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        },
    };
    Ok((input, Expr::new(kind, span)))
}

/// Parse additive expression: `a + b`, `a - b`
fn additive_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    binary_expr(full, input, multiplicative_expr, ADDITIVE_OPS)
}

/// Parse multiplicative expression: `a * b`, `a / b`, `a % b`
fn multiplicative_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    binary_expr(full, input, unary_expr, MULTIPLICATIVE_OPS)
}

/// Generic left-associative binary expression parser
fn binary_expr<'a>(
    full: &'a str,
    input: &'a str,
    sub_expr: fn(&'a str, &'a str) -> PResult<'a, Expr>,
    ops: &'static [(&'static str, Operator)],
) -> PResult<'a, Expr> {
    let (input, mut left) = sub_expr(full, input)?;
    let (input, rest) = many0(pair(
        one_of_ops(ops),
        cut(context("expected operand", |i| sub_expr(full, i))),
    ))
    .parse(input)?;

    for (op, right) in rest {
        let span = left.span.merge(right.span);
        left = Expr::new(
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
            span,
        );
    }

    Ok((input, left))
}

/// `not e` or a postfix expression
fn unary_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    alt((
        map(
            preceded(
                keyword("not"),
                cut(context("expected operand after 'not'", |i| unary_expr(full, i))),
            ),
            move |operand: Expr| {
                let end = operand.span.end;
                Expr::new(ExprKind::Not(Box::new(operand)), Span::new(start, end))
            },
        ),
        |i| postfix_expr(full, i),
    ))
    .parse(input)
}

/// `term (.id(args))*`
fn postfix_expr<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    let (input, mut expr) = term(full, input)?;
    let (input, calls) = many0(preceded(
        symbol("."),
        cut(pair(
            context("expected method name after '.'", |i| identifier(full, i)),
            |i| arguments(full, i),
        )),
    ))
    .parse(input)?;

    for (method, args) in calls {
        let end = args.last().map_or(method.span.end, |a| a.span.end);
        let span = Span::new(expr.span.start, end.max(method.span.end));
        expr = Expr::new(
            ExprKind::Call {
                receiver: Box::new(expr),
                method,
                args,
            },
            span,
        );
    }

    Ok((input, expr))
}

/// `( exp (, exp)* )`
fn arguments<'a>(full: &'a str, input: &'a str) -> PResult<'a, Vec<Expr>> {
    delimited(
        context("expected '(' before arguments", symbol("(")),
        separated_list0(symbol(","), |i| expression(full, i)),
        cut(context("expected ')' after arguments", symbol(")"))),
    )
    .parse(input)
}

fn term<'a>(full: &'a str, input: &'a str) -> PResult<'a, Expr> {
    let (input, _) = ws(input)?;
    let start = position(full, input);
    let (rest, kind) = context(
        "expected expression",
        alt((
            float_literal,
            integer_literal,
            string_literal,
            value(ExprKind::True, keyword("true")),
            value(ExprKind::False, keyword("false")),
            value(ExprKind::Null, keyword("null")),
            value(ExprKind::SelfRef, keyword("self")),
            map(
                preceded(
                    keyword("new"),
                    cut(context("expected class name after 'new'", |i| class_name(full, i))),
                ),
                ExprKind::New,
            ),
            map(|i| field_name(full, i), ExprKind::Field),
            map(
                pair(|i| identifier(full, i), |i| arguments(full, i)),
                |(method, args): (Ident, Vec<Expr>)| ExprKind::SelfCall { method, args },
            ),
            map(|i| identifier(full, i), ExprKind::Var),
            |i| parenthesized(full, i),
        )),
    )
    .parse(input)?;
    Ok((rest, Expr::new(kind, span_from(full, start, rest))))
}

fn parenthesized<'a>(full: &'a str, input: &'a str) -> PResult<'a, ExprKind> {
    let (input, inner) = delimited(
        symbol("("),
        cut(context("expected expression after '('", |i| expression(full, i))),
        cut(context("expected ')'", symbol(")"))),
    )
    .parse(input)?;
    Ok((input, inner.kind))
}

fn float_literal(input: &str) -> PResult<'_, ExprKind> {
    map_res(recognize((digit1, char('.'), digit1)), |s: &str| {
        s.parse::<f32>().map(ExprKind::Float)
    })
    .parse(input)
}

fn integer_literal(input: &str) -> PResult<'_, ExprKind> {
    map(digit1, |s: &str| ExprKind::Integer(s.to_string())).parse(input)
}

fn string_literal(input: &str) -> PResult<'_, ExprKind> {
    map(
        delimited(char('"'), take_while(|c: char| c != '"' && c != '\n'), char('"')),
        |s: &str| ExprKind::String(s.to_string()),
    )
    .parse(input)
}
