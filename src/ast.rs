// program     ::= 'program' ID ';' block '.'
// block       ::= declaration* compound
// declaration ::= 'var' (group ';')+
//               | 'procedure' ID params ';' block ';'
//               | 'function' ID params ':' type ';' block ';'
// params      ::= [ '(' [group (';' group)*] ')' ]
// group       ::= ID (',' ID)* ':' type
// type        ::= simple | 'array' '[' bound '..' bound ']' 'of' simple
// compound    ::= 'begin' [stmt (';' stmt)*] ';'* 'end'
//
// stmt        ::= open
// open        ::= 'if' expr 'then' stmt
//               | 'if' expr 'then' closed 'else' open
//               | 'while' expr 'do' open
//               | 'for' ID ':=' expr ('to' | 'downto') expr 'do' open
//               | simple
// closed      ::= 'if' expr 'then' closed 'else' closed
//               | 'while' expr 'do' closed
//               | 'for' ID ':=' expr ('to' | 'downto') expr 'do' closed
//               | simple
// simple      ::= compound
//               | ID ':=' expr
//               | ID '[' expr ']' ':=' expr
//               | ID ['(' [expr (',' expr)*] ')']

// Precedence
//
// not, unary - +
// * / div mod
// + -
// = <> < > <= >=
// and
// or

use crate::{token::Span, types::Type};

#[derive(Debug, PartialEq)]
pub struct Program {
    pub name: Ident,
    pub block: Block,
}

#[derive(Debug, PartialEq)]
pub struct Block {
    pub declarations: Vec<Declaration>,
    pub body: Compound,
}

#[derive(Debug, PartialEq)]
pub enum Declaration {
    /// Non empty list of variable groups.
    Var(Vec<VarGroup>),
    Routine(Routine),
}

/// A list of names sharing the same declared type, as in `a, b: integer`.
#[derive(Debug, PartialEq)]
pub struct VarGroup {
    pub names: Vec<Ident>,
    pub ty: Type,
    pub ty_span: Span,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum RoutineKind {
    Procedure,
    Function,
}

#[derive(Debug, PartialEq)]
pub struct Routine {
    pub kind: RoutineKind,
    pub name: Ident,
    pub params: Vec<VarGroup>,
    /// Always present for functions, never for procedures.
    pub return_ty: Option<Type>,
    pub block: Block,
}

impl Routine {
    /// Iterates over the parameter names in positional order.
    pub fn param_names(&self) -> impl Iterator<Item = (&Ident, &Type)> {
        self.params
            .iter()
            .flat_map(|group| group.names.iter().map(move |name| (name, &group.ty)))
    }

    pub fn param_count(&self) -> usize {
        self.params.iter().map(|group| group.names.len()).sum()
    }
}

#[derive(Debug, PartialEq)]
pub struct Compound {
    pub body: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub enum StmtKind {
    Compound(Compound),
    Assignment {
        target: Target,
        value: Expr,
    },
    Call(Call),
    IfThen {
        predicate: Expr,
        then_arm: Box<Stmt>,
    },
    IfThenElse {
        predicate: Expr,
        then_arm: Box<Stmt>,
        else_arm: Box<Stmt>,
    },
    While {
        predicate: Expr,
        body: Box<Stmt>,
    },
    For {
        var: Name,
        init: Expr,
        direction: Direction,
        limit: Expr,
        body: Box<Stmt>,
    },
}

#[derive(Debug, PartialEq)]
pub enum Target {
    Name(Name),
    Index { target: Name, index: Expr },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    To,
    Downto,
}

#[derive(Debug, PartialEq)]
pub struct Call {
    pub callee: Name,
    pub args: Vec<Expr>,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, PartialEq)]
pub enum ExprKind {
    Binary {
        op: BinaryOperator,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnaryOperator,
        expr: Box<Expr>,
    },
    Paren(Box<Expr>),
    Call(Call),
    Index {
        target: Name,
        index: Box<Expr>,
    },
    Name(Name),
    Int(i64),
    /// Kept as written; reals are never evaluated.
    Real(Box<str>),
    String(Box<str>),
    Char(char),
    Bool(bool),
}

impl Expr {
    /// Strips any redundant parentheses.
    pub fn unparen(&self) -> &Expr {
        let mut curr = self;
        while let ExprKind::Paren(inner) = &curr.kind {
            curr = inner;
        }
        curr
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Minus,
    Not,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Or,
    And,
    Eq,
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    Add,
    Sub,
    Mul,
    /// Integer division, `div`.
    Div,
    /// `/`
    RealDiv,
    Mod,
}

/// An identifier reference, tagged with the type its name was declared with
/// at the moment the reference was parsed.
#[derive(Debug, PartialEq)]
pub struct Name {
    pub ident: Ident,
    /// `None` if the name had no declared type when it was parsed.
    pub declared_type: Option<Type>,
}

impl Name {
    pub fn as_str(&self) -> &str {
        &self.ident.name
    }

    pub fn span(&self) -> Span {
        self.ident.span
    }
}

#[derive(Debug, PartialEq)]
pub struct Ident {
    /// Always lowercase.
    pub name: Box<str>,
    pub span: Span,
}
