#![allow(clippy::items_after_statements)]

use std::fmt;

use crate::{
    ast::{BinaryOperator, UnaryOperator},
    parser,
    token::{Span, Spanned, TokenKind},
    type_checker,
    util::fmt::{Context, Show},
};

/// Writes the `line:column: ` prefix used by the alternate form.
fn location(f: &mut fmt::Formatter<'_>, span: Span, ctx: &Context<'_>) -> fmt::Result {
    let loc = span.location(ctx.src);
    write!(f, "{}:{}: ", loc.line, loc.column)
}

impl Show for Spanned<type_checker::Error> {
    fn show(&self, f: &mut fmt::Formatter<'_>, ctx: &Context<'_>) -> fmt::Result {
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            location(f, *span, ctx)?;
        }

        use type_checker::Error::*;
        match error {
            UndeclaredIdentifier(name) => write!(f, "{name} is not declared"),
            Redeclaration(name) => write!(f, "{name} is already declared"),
            ReservedName(name) => write!(f, "{name} is a reserved routine name"),
            Mismatch { expected, actual } => {
                write!(f, "expected type {expected}, but got {actual}")
            }
            OperandMismatch { op, lhs, rhs } => {
                let op = binary_operator(*op);
                write!(f, "operator {op} cannot be applied to {lhs} and {rhs}")
            }
            UnaryOperandMismatch { op, actual } => {
                let op = unary_operator(*op);
                write!(f, "operator {op} cannot be applied to {actual}")
            }
            ArgumentMismatch {
                routine,
                position,
                expected,
                actual,
            } => write!(
                f,
                "argument {position} of {routine}: expected type {expected}, but got {actual}"
            ),
            IncorrectNumberOfArguments {
                routine,
                expected,
                actual,
            } => write!(
                f,
                "incorrect number of arguments to {routine}. expected {expected}, but got {actual}"
            ),
            NotAValue(name) => write!(f, "{name} does not produce a value"),
            NotIndexable(name) => write!(f, "{name} cannot be indexed"),
            NotARoutine(name) => write!(f, "{name} is not a routine"),
            UnsupportedType { name, ty } => {
                write!(f, "unsupported type {ty} for {name}")
            }
            UnsupportedArgument { routine } => {
                write!(f, "unsupported argument to {}", routine.name())
            }
            Unsupported(what) => write!(f, "unsupported construct: {what}"),
            Internal(what) => write!(f, "internal compiler error: {what}"),
        }
    }
}

impl Show for Spanned<parser::Error> {
    fn show(&self, f: &mut fmt::Formatter<'_>, ctx: &Context<'_>) -> fmt::Result {
        let Spanned { span, inner: error } = self;

        if f.alternate() {
            location(f, *span, ctx)?;
        }

        use parser::Error::*;
        match error {
            Unexpected { actual, expected } => match &expected[..] {
                [single] => write!(f, "expected {single}, but got {actual}"),
                many => {
                    f.write_str("expected one of ")?;
                    for (i, kind) in many.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{kind}")?;
                    }
                    write!(f, ", but got {actual}")
                }
            },
            ParseInt => write!(f, "integer literal out of range"),
            Lexer(kind @ (TokenKind::ErrorUnexpectedChar
            | TokenKind::ErrorUnclosedComment
            | TokenKind::ErrorUnclosedString)) => f.write_str(kind.describe()),
            Lexer(_) => unreachable!("not error token"),
        }
    }
}

fn binary_operator(op: BinaryOperator) -> &'static str {
    use BinaryOperator::*;
    match op {
        Or => "`or`",
        And => "`and`",
        Eq => "`=`",
        NotEq => "`<>`",
        Less => "`<`",
        Greater => "`>`",
        LessEq => "`<=`",
        GreaterEq => "`>=`",
        Add => "`+`",
        Sub => "`-`",
        Mul => "`*`",
        Div => "`div`",
        RealDiv => "`/`",
        Mod => "`mod`",
    }
}

fn unary_operator(op: UnaryOperator) -> &'static str {
    match op {
        UnaryOperator::Plus => "unary `+`",
        UnaryOperator::Minus => "unary `-`",
        UnaryOperator::Not => "`not`",
    }
}
