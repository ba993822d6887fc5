use crate::{
    ast::{BinaryOperator, Call, Expr, ExprKind, Name, UnaryOperator},
    scope::{self, Scope},
    token::{Span, Spanned},
    types::{
        builtins::{self, Builtin},
        Scalar, Signature, SignatureTable, Type,
    },
    ErrorKind,
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Structural type inference over expressions.
///
/// Names are looked up in the scope first, falling back to the routine
/// signatures. Inference never mutates either table.
pub struct Inferencer<'a> {
    scope: &'a Scope,
    signatures: &'a SignatureTable,
}

impl<'a> Inferencer<'a> {
    pub fn new(scope: &'a Scope, signatures: &'a SignatureTable) -> Inferencer<'a> {
        Inferencer { scope, signatures }
    }

    pub fn infer(&self, expr: &Expr) -> Result<Scalar> {
        match &expr.kind {
            ExprKind::Int(_) | ExprKind::Char(_) => Ok(Scalar::Integer),
            ExprKind::String(_) => Ok(Scalar::String),
            ExprKind::Bool(_) => Ok(Scalar::Boolean),
            ExprKind::Real(_) => Err(expr.span.wrap(Error::Unsupported("real literal"))),
            ExprKind::Paren(inner) => self.infer(inner),
            ExprKind::Name(name) => self.infer_name(name),
            ExprKind::Index { target, index } => self.infer_index(target, index),
            ExprKind::Call(call) => self.infer_call(call),
            ExprKind::Unary { op, expr: operand } => {
                let expected = match op {
                    UnaryOperator::Plus | UnaryOperator::Minus => Scalar::Integer,
                    UnaryOperator::Not => Scalar::Boolean,
                };
                let actual = self.infer(operand)?;
                if actual != expected {
                    let error = Error::UnaryOperandMismatch { op: *op, actual };
                    return Err(expr.span.wrap(error));
                }
                Ok(expected)
            }
            ExprKind::Binary { op, lhs, rhs } => self.infer_binary(expr.span, *op, lhs, rhs),
        }
    }

    /// Checks that `expr` infers to `expected`. A character literal is
    /// accepted where a string is expected.
    pub fn check(&self, expr: &Expr, expected: Scalar) -> Result<()> {
        if expected == Scalar::String && is_char_literal(expr) {
            return Ok(());
        }
        let actual = self.infer(expr)?;
        if actual == expected {
            Ok(())
        } else {
            Err(expr.span.wrap(Error::Mismatch { expected, actual }))
        }
    }

    /// Returns the type both operands of `=` or `<>` are compared as.
    pub fn equality_operand(&self, op: BinaryOperator, lhs: &Expr, rhs: &Expr) -> Result<Scalar> {
        let (l, r) = (self.infer(lhs)?, self.infer(rhs)?);
        let ty = match (l, r) {
            (Scalar::String, Scalar::Integer) if is_char_literal(rhs) => Scalar::String,
            (Scalar::Integer, Scalar::String) if is_char_literal(lhs) => Scalar::String,
            (l, r) if l == r && l != Scalar::Boolean => l,
            _ => {
                let error = Error::OperandMismatch { op, lhs: l, rhs: r };
                return Err(lhs.span.to(rhs.span).wrap(error));
            }
        };
        Ok(ty)
    }

    /// Resolves the routine `call` refers to, checking its arguments.
    pub fn check_call(&self, call: &Call) -> Result<&'a Signature> {
        let name = call.callee.as_str();
        let Some(signature) = self.signatures.get(name) else {
            let error = if self.scope.contains(name) {
                Error::NotARoutine(name.into())
            } else {
                Error::UndeclaredIdentifier(name.into())
            };
            return Err(call.callee.span().wrap(error));
        };
        self.check_args(name, call.span, &call.args, &signature.params)?;
        Ok(signature)
    }

    /// Checks arity, then each argument against its positional parameter.
    pub fn check_args(
        &self,
        routine: &str,
        span: Span,
        args: &[Expr],
        params: &[Scalar],
    ) -> Result<()> {
        if args.len() != params.len() {
            let error = Error::IncorrectNumberOfArguments {
                routine: routine.into(),
                expected: params.len(),
                actual: args.len(),
            };
            return Err(span.wrap(error));
        }
        for (position, (arg, &expected)) in args.iter().zip(params).enumerate() {
            self.check(arg, expected).map_err(|error| match error.inner {
                Error::Mismatch { expected, actual } => arg.span.wrap(Error::ArgumentMismatch {
                    routine: routine.into(),
                    position: position + 1,
                    expected,
                    actual,
                }),
                _ => error,
            })?;
        }
        Ok(())
    }

    /// The scalar type of a name in scope, or an error if the name holds no
    /// value.
    pub fn declared_scalar(&self, name: &Name) -> Result<Scalar> {
        match &name.declared_type {
            Some(ty) => ty.scalar().ok_or_else(|| {
                let error = match ty {
                    Type::Array(_) => Error::NotAValue(name.as_str().into()),
                    _ => Error::UnsupportedType {
                        name: name.as_str().into(),
                        ty: ty.clone(),
                    },
                };
                name.span().wrap(error)
            }),
            None => Err(name
                .span()
                .wrap(Error::UndeclaredIdentifier(name.as_str().into()))),
        }
    }

    fn infer_name(&self, name: &Name) -> Result<Scalar> {
        if self.scope.contains(name.as_str()) {
            return self.declared_scalar(name);
        }
        // A bare function name is a call without arguments.
        if let Some(signature) = self.signatures.get(name.as_str()) {
            self.check_args(name.as_str(), name.span(), &[], &signature.params)?;
            return signature
                .return_ty
                .ok_or_else(|| name.span().wrap(Error::NotAValue(name.as_str().into())));
        }
        if builtins::get(name.as_str()).is_some() {
            return Err(name.span().wrap(Error::NotAValue(name.as_str().into())));
        }
        Err(name
            .span()
            .wrap(Error::UndeclaredIdentifier(name.as_str().into())))
    }

    fn infer_index(&self, target: &Name, index: &Expr) -> Result<Scalar> {
        if !self.scope.contains(target.as_str()) {
            let error = Error::UndeclaredIdentifier(target.as_str().into());
            return Err(target.span().wrap(error));
        }
        let elem = match &target.declared_type {
            Some(Type::Array(array)) => array.elem.scalar().ok_or_else(|| {
                target.span().wrap(Error::UnsupportedType {
                    name: target.as_str().into(),
                    ty: array.elem.clone(),
                })
            })?,
            // Characters of a string are read as their code.
            Some(Type::String) => Scalar::Integer,
            _ => return Err(target.span().wrap(Error::NotIndexable(target.as_str().into()))),
        };
        self.check(index, Scalar::Integer)?;
        Ok(elem)
    }

    fn infer_call(&self, call: &Call) -> Result<Scalar> {
        match builtins::get(call.callee.as_str()) {
            Some(Builtin::Length) => {
                let name = call.callee.as_str();
                self.check_args(name, call.span, &call.args, &[Scalar::String])?;
                Ok(Scalar::Integer)
            }
            Some(_) => Err(call
                .span
                .wrap(Error::NotAValue(call.callee.as_str().into()))),
            None => {
                let signature = self.check_call(call)?;
                signature
                    .return_ty
                    .ok_or_else(|| call.span.wrap(Error::NotAValue(call.callee.as_str().into())))
            }
        }
    }

    fn infer_binary(&self, span: Span, op: BinaryOperator, lhs: &Expr, rhs: &Expr) -> Result<Scalar> {
        use BinaryOperator::*;
        let (operand, result) = match op {
            Eq | NotEq => {
                self.equality_operand(op, lhs, rhs)?;
                return Ok(Scalar::Boolean);
            }
            RealDiv => return Err(span.wrap(Error::Unsupported("real division"))),
            Add | Sub | Mul | Div | Mod => (Scalar::Integer, Scalar::Integer),
            Less | Greater | LessEq | GreaterEq => (Scalar::Integer, Scalar::Boolean),
            And | Or => (Scalar::Boolean, Scalar::Boolean),
        };
        let (l, r) = (self.infer(lhs)?, self.infer(rhs)?);
        if l != operand || r != operand {
            return Err(span.wrap(Error::OperandMismatch { op, lhs: l, rhs: r }));
        }
        Ok(result)
    }
}

pub fn is_char_literal(expr: &Expr) -> bool {
    matches!(expr.unparen().kind, ExprKind::Char(_))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    UndeclaredIdentifier(Box<str>),
    Redeclaration(Box<str>),
    /// Routine names which may not be defined by programs.
    ReservedName(Box<str>),
    Mismatch {
        expected: Scalar,
        actual: Scalar,
    },
    OperandMismatch {
        op: BinaryOperator,
        lhs: Scalar,
        rhs: Scalar,
    },
    UnaryOperandMismatch {
        op: UnaryOperator,
        actual: Scalar,
    },
    ArgumentMismatch {
        routine: Box<str>,
        /// 1-based.
        position: usize,
        expected: Scalar,
        actual: Scalar,
    },
    IncorrectNumberOfArguments {
        routine: Box<str>,
        expected: usize,
        actual: usize,
    },
    /// Procedures, built-in procedures and whole arrays have no value.
    NotAValue(Box<str>),
    NotIndexable(Box<str>),
    /// A variable used as the callee of a call.
    NotARoutine(Box<str>),
    UnsupportedType {
        name: Box<str>,
        ty: Type,
    },
    UnsupportedArgument {
        routine: Builtin,
    },
    Unsupported(&'static str),
    Internal(&'static str),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        use Error::*;
        match self {
            UndeclaredIdentifier(_) => ErrorKind::UndeclaredIdentifier,
            Redeclaration(_) | ReservedName(_) => ErrorKind::Redeclaration,
            Mismatch { .. }
            | OperandMismatch { .. }
            | UnaryOperandMismatch { .. }
            | ArgumentMismatch { .. }
            | NotAValue(_)
            | NotIndexable(_)
            | NotARoutine(_) => ErrorKind::TypeMismatch,
            IncorrectNumberOfArguments { .. } => ErrorKind::Arity,
            UnsupportedType { .. } | UnsupportedArgument { .. } | Unsupported(_) => {
                ErrorKind::UnsupportedConstruct
            }
            Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<scope::Error> for Error {
    fn from(error: scope::Error) -> Self {
        match error {
            scope::Error::Underflow => Error::Internal("scope underflow"),
            scope::Error::AlreadyDeclared(name) => Error::Redeclaration(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::test_utils::parse_expr;
    use pretty_assertions::assert_eq;

    fn infer(src: &str) -> Result<Scalar> {
        let scope = Scope::new();
        let signatures = SignatureTable::new();
        Inferencer::new(&scope, &signatures).infer(&parse_expr(src))
    }

    fn infer_with_signatures(src: &str, signatures: &SignatureTable) -> Result<Scalar> {
        let scope = Scope::new();
        Inferencer::new(&scope, signatures).infer(&parse_expr(src))
    }

    fn kind(result: Result<Scalar>) -> ErrorKind {
        result.unwrap_err().inner.kind()
    }

    fn signatures() -> SignatureTable {
        let mut table = SignatureTable::new();
        table.insert(
            "max".into(),
            Signature {
                return_ty: Some(Scalar::Integer),
                params: vec![Scalar::Integer, Scalar::Integer],
            },
        );
        table.insert(
            "greet".into(),
            Signature {
                return_ty: None,
                params: vec![Scalar::String],
            },
        );
        table.insert(
            "answer".into(),
            Signature {
                return_ty: Some(Scalar::Integer),
                params: vec![],
            },
        );
        table
    }

    #[test]
    fn arithmetic_and_comparisons() {
        assert_eq!(infer("1 + 2"), Ok(Scalar::Integer));
        assert_eq!(infer("7 div 2 mod 3 * -1"), Ok(Scalar::Integer));
        assert_eq!(infer("1 < 2"), Ok(Scalar::Boolean));
        assert_eq!(infer("(1 <= 2) and not (3 > 4) or false"), Ok(Scalar::Boolean));
    }

    #[test]
    fn equality_of_strings_and_integers() {
        assert_eq!(infer("'xy' = 'xy'"), Ok(Scalar::Boolean));
        assert_eq!(infer("1 <> 2"), Ok(Scalar::Boolean));
        assert_eq!(infer("'x' = 'ab'"), Ok(Scalar::Boolean));
        assert_eq!(kind(infer("true = false")), ErrorKind::TypeMismatch);
    }

    #[test]
    fn mismatched_operands() {
        let error = infer("1 + 'ab'").unwrap_err();
        assert_eq!(
            error.inner,
            Error::OperandMismatch {
                op: BinaryOperator::Add,
                lhs: Scalar::Integer,
                rhs: Scalar::String,
            }
        );
        assert_eq!(kind(infer("1 < 'ab'")), ErrorKind::TypeMismatch);
        assert_eq!(kind(infer("1 and true")), ErrorKind::TypeMismatch);
        assert_eq!(kind(infer("not 1")), ErrorKind::TypeMismatch);
    }

    #[test]
    fn characters_are_integers() {
        assert_eq!(infer("'a'"), Ok(Scalar::Integer));
        assert_eq!(infer("'a' + 1"), Ok(Scalar::Integer));
    }

    #[test]
    fn reals_are_unsupported() {
        assert_eq!(kind(infer("1.5")), ErrorKind::UnsupportedConstruct);
        assert_eq!(kind(infer("4 / 2")), ErrorKind::UnsupportedConstruct);
    }

    #[test]
    fn undeclared_names() {
        assert_eq!(
            infer("x + 1").unwrap_err().inner,
            Error::UndeclaredIdentifier("x".into())
        );
    }

    #[test]
    fn calls() {
        let table = signatures();
        assert_eq!(infer_with_signatures("max(1, 2)", &table), Ok(Scalar::Integer));
        assert_eq!(infer_with_signatures("answer + 1", &table), Ok(Scalar::Integer));
        assert_eq!(infer_with_signatures("length('abc')", &table), Ok(Scalar::Integer));
        assert_eq!(infer_with_signatures("length('a')", &table), Ok(Scalar::Integer));
    }

    #[test]
    fn call_arity_and_argument_types() {
        let table = signatures();
        assert_eq!(
            infer_with_signatures("max(1)", &table).unwrap_err().inner,
            Error::IncorrectNumberOfArguments {
                routine: "max".into(),
                expected: 2,
                actual: 1,
            }
        );
        assert_eq!(
            infer_with_signatures("max(1, 'a' = 'b')", &table)
                .unwrap_err()
                .inner,
            Error::ArgumentMismatch {
                routine: "max".into(),
                position: 2,
                expected: Scalar::Integer,
                actual: Scalar::Boolean,
            }
        );
        assert_eq!(
            kind(infer_with_signatures("length(1)", &table)),
            ErrorKind::TypeMismatch
        );
    }

    #[test]
    fn variables_are_not_routines() {
        let mut scope = Scope::new();
        scope.declare("x").unwrap();
        let table = signatures();
        let ExprKind::Call(call) = parse_expr("x(1)").kind else {
            panic!("not a call");
        };
        assert_eq!(
            Inferencer::new(&scope, &table).check_call(&call).unwrap_err().inner,
            Error::NotARoutine("x".into())
        );
    }

    #[test]
    fn procedures_are_not_values() {
        let table = signatures();
        assert_eq!(
            kind(infer_with_signatures("greet('x')", &table)),
            ErrorKind::TypeMismatch
        );
        assert_eq!(
            kind(infer_with_signatures("writeln", &table)),
            ErrorKind::TypeMismatch
        );
    }
}
