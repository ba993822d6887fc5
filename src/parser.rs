use crate::{
    ast::{
        BinaryOperator, Block, Call, Compound, Declaration, Direction, Expr, ExprKind, Ident,
        Name, Program, Routine, RoutineKind, Stmt, StmtKind, Target, UnaryOperator, VarGroup,
    },
    lexer::{self, extract},
    token::{Span, Spanned, Token, TokenKind},
    types::{ArrayType, Type, TypeEnv},
};

type Result<T, E = Spanned<Error>> = std::result::Result<T, E>;

/// Parses a whole program.
///
/// Declarations are recorded in `env` as they are parsed, so that every name
/// reference built afterwards carries its declared type.
pub fn parse_program(src: &str, tokens: &mut Vec<Token>, env: &mut TypeEnv) -> Result<Program> {
    parse(src, tokens, env, Parser::parse_program)
}

pub fn parse_expr(src: &str, tokens: &mut Vec<Token>, env: &mut TypeEnv) -> Result<Expr> {
    parse(src, tokens, env, Parser::parse_expr)
}

fn parse<'src, 'tok, 'env, T>(
    src: &'src str,
    tokens: &'tok mut Vec<Token>,
    env: &'env mut TypeEnv,
    f: impl for<'a> FnOnce(&'a mut Parser<'src, 'tok, 'env>) -> Result<T>,
) -> Result<T> {
    assert!(tokens.is_empty());

    lexer::lex(src, tokens);
    if let Some(bad) = tokens.iter().find(|t| t.kind.is_error()) {
        return Err(bad.span().wrap(Error::Lexer(bad.kind)));
    }

    let mut p = Parser::new(src, tokens, env);
    let parsed = f(&mut p)?;
    p.consume(TokenKind::Eof)?;
    Ok(parsed)
}

const STMT_START: &[TokenKind] = &[
    TokenKind::Begin,
    TokenKind::Identifier,
    TokenKind::If,
    TokenKind::While,
    TokenKind::For,
];

const EXPR_START: &[TokenKind] = &[
    TokenKind::Identifier,
    TokenKind::Int,
    TokenKind::Real,
    TokenKind::String,
    TokenKind::Char,
    TokenKind::True,
    TokenKind::False,
    TokenKind::LParen,
    TokenKind::Minus,
    TokenKind::Plus,
    TokenKind::Not,
];

const TYPE_START: &[TokenKind] = &[
    TokenKind::TypeInteger,
    TokenKind::TypeString,
    TokenKind::TypeBoolean,
    TokenKind::TypeChar,
    TokenKind::TypeReal,
    TokenKind::Array,
];

const SIMPLE_TYPE: &[TokenKind] = &[
    TokenKind::TypeInteger,
    TokenKind::TypeString,
    TokenKind::TypeBoolean,
    TokenKind::TypeChar,
    TokenKind::TypeReal,
];

struct Parser<'src, 'tok, 'env> {
    src: &'src str,
    tokens: &'tok mut Vec<Token>,
    env: &'env mut TypeEnv,
    cursor: usize,
}

impl Parser<'_, '_, '_> {
    fn parse_program(&mut self) -> Result<Program> {
        self.consume(TokenKind::Program)?;
        let name = self.parse_ident()?;
        self.consume(TokenKind::Semicolon)?;
        let block = self.parse_block()?;
        self.consume(TokenKind::Dot)?;
        Ok(Program { name, block })
    }

    fn parse_block(&mut self) -> Result<Block> {
        let mut declarations = Vec::new();
        loop {
            let declaration = match self.peek().kind {
                TokenKind::Var => self.parse_var_declaration()?,
                TokenKind::Procedure | TokenKind::Function => {
                    Declaration::Routine(self.parse_routine()?)
                }
                _ => break,
            };
            declarations.push(declaration);
        }
        let body = self.parse_compound()?;
        Ok(Block { declarations, body })
    }

    fn parse_var_declaration(&mut self) -> Result<Declaration> {
        self.consume(TokenKind::Var)?;
        let mut groups = Vec::with_capacity(4);
        loop {
            groups.push(self.parse_var_group()?);
            self.consume(TokenKind::Semicolon)?;
            if !self.is(TokenKind::Identifier) {
                break;
            }
        }
        Ok(Declaration::Var(groups))
    }

    fn parse_routine(&mut self) -> Result<Routine> {
        let kind = match self
            .consume_any(&[TokenKind::Procedure, TokenKind::Function])?
            .kind
        {
            TokenKind::Procedure => RoutineKind::Procedure,
            TokenKind::Function => RoutineKind::Function,
            _ => unreachable!(),
        };
        let name = self.parse_ident()?;

        let mut params = Vec::new();
        if self.take(TokenKind::LParen) && !self.take(TokenKind::RParen) {
            loop {
                params.push(self.parse_var_group()?);
                let t = self.consume_any(&[TokenKind::Semicolon, TokenKind::RParen])?;
                if t.kind == TokenKind::RParen {
                    break;
                }
            }
        }

        let return_ty = match kind {
            RoutineKind::Procedure => None,
            RoutineKind::Function => {
                self.consume(TokenKind::Colon)?;
                let (ty, _) = self.parse_type()?;
                // Registered before the body so the result variable is typed.
                self.env.declared.insert(name.name.clone(), ty.clone());
                Some(ty)
            }
        };

        self.consume(TokenKind::Semicolon)?;
        let block = self.parse_block()?;
        self.consume(TokenKind::Semicolon)?;

        Ok(Routine {
            kind,
            name,
            params,
            return_ty,
            block,
        })
    }

    fn parse_var_group(&mut self) -> Result<VarGroup> {
        let mut names = vec![self.parse_ident()?];
        while self.take(TokenKind::Comma) {
            names.push(self.parse_ident()?);
        }
        self.consume(TokenKind::Colon)?;
        let (ty, ty_span) = self.parse_type()?;
        for name in &names {
            self.env.declared.insert(name.name.clone(), ty.clone());
        }
        Ok(VarGroup {
            names,
            ty,
            ty_span,
        })
    }

    fn parse_type(&mut self) -> Result<(Type, Span)> {
        let token = self.consume_any(TYPE_START)?;
        if token.kind != TokenKind::Array {
            return Ok((Self::simple_type(token.kind), token.span()));
        }

        self.consume(TokenKind::LBracket)?;
        let lo = self.parse_bound()?;
        self.consume(TokenKind::DotDot)?;
        let hi = self.parse_bound()?;
        self.consume(TokenKind::RBracket)?;
        self.consume(TokenKind::Of)?;
        let elem = self.consume_any(SIMPLE_TYPE)?;

        let ty = Type::Array(Box::new(ArrayType {
            lo,
            hi,
            elem: Self::simple_type(elem.kind),
        }));
        Ok((ty, token.span().to(elem.span())))
    }

    fn simple_type(kind: TokenKind) -> Type {
        match kind {
            TokenKind::TypeInteger => Type::Integer,
            TokenKind::TypeString => Type::String,
            TokenKind::TypeBoolean => Type::Boolean,
            TokenKind::TypeChar => Type::Char,
            TokenKind::TypeReal => Type::Real,
            _ => unreachable!("not a simple type"),
        }
    }

    /// Array bounds are literal: an optionally negated integer or a character,
    /// which stands for its code.
    fn parse_bound(&mut self) -> Result<i64> {
        if self.take(TokenKind::Minus) {
            let token = self.consume(TokenKind::Int)?;
            return self.int(token).map(|n| -n);
        }
        let token = self.consume_any(&[TokenKind::Int, TokenKind::Char])?;
        match token.kind {
            TokenKind::Int => self.int(token),
            TokenKind::Char => Ok(i64::from(u32::from(extract::char(token, self.src)))),
            _ => unreachable!(),
        }
    }

    fn parse_compound(&mut self) -> Result<Compound> {
        let begin = self.consume(TokenKind::Begin)?;
        let mut body = Vec::new();

        if !self.is(TokenKind::End) && !self.is(TokenKind::Semicolon) {
            body.push(self.parse_stmt()?);
            while self.take(TokenKind::Semicolon) {
                if self.is(TokenKind::Semicolon) || self.is(TokenKind::End) {
                    break;
                }
                body.push(self.parse_stmt()?);
            }
        }
        // Trailing empty statements.
        while self.take(TokenKind::Semicolon) {}

        if !self.is(TokenKind::End) {
            return Err(self.unexpected(&[TokenKind::Semicolon, TokenKind::End]));
        }
        let end = self.advance();
        Ok(Compound {
            body,
            span: begin.span().to(end.span()),
        })
    }

    fn parse_stmt(&mut self) -> Result<Stmt> {
        let token = self.peek();
        match token.kind {
            TokenKind::If => self.parse_if(),

            // While: while expr do stmt
            TokenKind::While => {
                self.advance();
                let predicate = self.parse_expr()?;
                self.consume(TokenKind::Do)?;
                let body = self.parse_stmt()?;
                let span = token.span().to(body.span);
                let kind = StmtKind::While {
                    predicate,
                    body: Box::new(body),
                };
                Ok(Stmt { kind, span })
            }

            // For: for ID := expr (to | downto) expr do stmt
            TokenKind::For => {
                self.advance();
                let var = self.parse_name()?;
                self.consume(TokenKind::Assign)?;
                let init = self.parse_expr()?;
                let direction = match self
                    .consume_any(&[TokenKind::To, TokenKind::Downto])?
                    .kind
                {
                    TokenKind::To => Direction::To,
                    TokenKind::Downto => Direction::Downto,
                    _ => unreachable!(),
                };
                let limit = self.parse_expr()?;
                self.consume(TokenKind::Do)?;
                let body = self.parse_stmt()?;
                let span = token.span().to(body.span);
                let kind = StmtKind::For {
                    var,
                    init,
                    direction,
                    limit,
                    body: Box::new(body),
                };
                Ok(Stmt { kind, span })
            }

            TokenKind::Begin => {
                let compound = self.parse_compound()?;
                let span = compound.span;
                Ok(Stmt {
                    kind: StmtKind::Compound(compound),
                    span,
                })
            }

            TokenKind::Identifier => self.parse_simple_stmt(),

            _ => Err(self.unexpected(STMT_START)),
        }
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        let if_token = self.consume(TokenKind::If)?;
        let predicate = self.parse_expr()?;
        self.consume(TokenKind::Then)?;

        // The branch takes every `else` it can. If it ends in an `if` without
        // one, that `if` has already claimed a following `else`, so an `else`
        // seen here always follows a closed branch.
        let then_arm = self.parse_stmt()?;
        if self.take(TokenKind::Else) {
            let else_arm = self.parse_stmt()?;
            return Ok(Self::if_then_else(if_token, predicate, then_arm, else_arm));
        }
        let span = if_token.span().to(then_arm.span);
        let kind = StmtKind::IfThen {
            predicate,
            then_arm: Box::new(then_arm),
        };
        Ok(Stmt { kind, span })
    }

    fn if_then_else(if_token: Token, predicate: Expr, then_arm: Stmt, else_arm: Stmt) -> Stmt {
        let span = if_token.span().to(else_arm.span);
        let kind = StmtKind::IfThenElse {
            predicate,
            then_arm: Box::new(then_arm),
            else_arm: Box::new(else_arm),
        };
        Stmt { kind, span }
    }

    /// Assignments and procedure calls, which all start with an identifier.
    fn parse_simple_stmt(&mut self) -> Result<Stmt> {
        let name = self.parse_name()?;
        let start = name.span();

        match self.peek().kind {
            // ID := expr
            TokenKind::Assign => {
                self.advance();
                let value = self.parse_expr()?;
                let span = start.to(value.span);
                let kind = StmtKind::Assignment {
                    target: Target::Name(name),
                    value,
                };
                Ok(Stmt { kind, span })
            }
            // ID [ expr ] := expr
            TokenKind::LBracket => {
                self.advance();
                let index = self.parse_expr()?;
                self.consume(TokenKind::RBracket)?;
                self.consume(TokenKind::Assign)?;
                let value = self.parse_expr()?;
                let span = start.to(value.span);
                let kind = StmtKind::Assignment {
                    target: Target::Index {
                        target: name,
                        index,
                    },
                    value,
                };
                Ok(Stmt { kind, span })
            }
            // ID ( args )
            TokenKind::LParen => {
                self.advance();
                let call = self.parse_call_args(name)?;
                let span = call.span;
                Ok(Stmt {
                    kind: StmtKind::Call(call),
                    span,
                })
            }
            // Bare procedure call, as in `writeln`.
            _ => {
                let call = Call {
                    callee: name,
                    args: Vec::new(),
                    span: start,
                };
                Ok(Stmt {
                    kind: StmtKind::Call(call),
                    span: start,
                })
            }
        }
    }

    /// Parses the arguments after an already consumed `(`, including the
    /// closing parenthesis.
    fn parse_call_args(&mut self, callee: Name) -> Result<Call> {
        let mut args = Vec::new();
        if !self.is(TokenKind::RParen) {
            loop {
                args.push(self.parse_expr()?);
                let t = self.consume_any(&[TokenKind::Comma, TokenKind::RParen])?;
                if t.kind == TokenKind::RParen {
                    let span = callee.span().to(t.span());
                    return Ok(Call { callee, args, span });
                }
            }
        }
        let end = self.consume(TokenKind::RParen)?;
        let span = callee.span().to(end.span());
        Ok(Call { callee, args, span })
    }

    fn parse_name(&mut self) -> Result<Name> {
        let ident = self.parse_ident()?;
        Ok(self.name(ident))
    }

    /// Tags the identifier with its currently declared type.
    fn name(&self, ident: Ident) -> Name {
        let declared_type = self.env.declared_type(&ident.name).cloned();
        Name {
            ident,
            declared_type,
        }
    }

    fn parse_ident(&mut self) -> Result<Ident> {
        let token = self.consume(TokenKind::Identifier)?;
        Ok(Ident {
            name: extract::ident(token, self.src),
            span: token.span(),
        })
    }

    fn parse_expr(&mut self) -> Result<Expr> {
        self.parse_expr_bp(0)
    }

    fn parse_expr_bp(&mut self, min_bp: u8) -> Result<Expr> {
        let lhs_token = self.peek();
        let mut lhs = self.parse_nud(lhs_token)?;

        loop {
            let op_token = self.peek();
            let Some((op, (lbp, rbp))) = Self::infix_binding_power(op_token.kind) else {
                break;
            };
            if lbp < min_bp {
                break;
            }
            self.advance(); // Operator

            let rhs = self.parse_expr_bp(rbp)?;
            let span = lhs.span.to(rhs.span);
            lhs = Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            };
        }

        Ok(lhs)
    }

    /// nud: Parses tokens that start an expression
    /// (prefix operators, literals, grouping, names)
    fn parse_nud(&mut self, token: Token) -> Result<Expr> {
        if !EXPR_START.contains(&token.kind) {
            return Err(self.unexpected(EXPR_START));
        }
        self.advance();

        let (kind, span) = match token.kind {
            TokenKind::Identifier => {
                let ident = Ident {
                    name: extract::ident(token, self.src),
                    span: token.span(),
                };
                let name = self.name(ident);
                if self.take(TokenKind::LParen) {
                    let call = self.parse_call_args(name)?;
                    let span = call.span;
                    (ExprKind::Call(call), span)
                } else if self.take(TokenKind::LBracket) {
                    let index = self.parse_expr()?;
                    let end = self.consume(TokenKind::RBracket)?;
                    let kind = ExprKind::Index {
                        target: name,
                        index: Box::new(index),
                    };
                    (kind, token.span().to(end.span()))
                } else {
                    (ExprKind::Name(name), token.span())
                }
            }
            TokenKind::Int => (ExprKind::Int(self.int(token)?), token.span()),
            TokenKind::Real => (ExprKind::Real(extract::real(token, self.src)), token.span()),
            TokenKind::String => (
                ExprKind::String(extract::string(token, self.src)),
                token.span(),
            ),
            TokenKind::Char => (ExprKind::Char(extract::char(token, self.src)), token.span()),
            TokenKind::True => (ExprKind::Bool(true), token.span()),
            TokenKind::False => (ExprKind::Bool(false), token.span()),

            // Grouping: ( expr )
            TokenKind::LParen => {
                let expr = self.parse_expr()?;
                let end = self.consume(TokenKind::RParen)?;
                (ExprKind::Paren(Box::new(expr)), token.span().to(end.span()))
            }

            // Prefix operators: -, +, not
            kind @ (TokenKind::Minus | TokenKind::Plus | TokenKind::Not) => {
                let op = match kind {
                    TokenKind::Minus => UnaryOperator::Minus,
                    TokenKind::Plus => UnaryOperator::Plus,
                    TokenKind::Not => UnaryOperator::Not,
                    _ => unreachable!(),
                };
                let expr = self.parse_expr_bp(Self::PREFIX_BINDING_POWER)?;
                let span = token.span().to(expr.span);
                let unary = ExprKind::Unary {
                    op,
                    expr: Box::new(expr),
                };
                (unary, span)
            }

            _ => unreachable!("checked against EXPR_START"),
        };

        Ok(Expr { kind, span })
    }

    const PREFIX_BINDING_POWER: u8 = 11;

    fn infix_binding_power(kind: TokenKind) -> Option<(BinaryOperator, (u8, u8))> {
        let op = match kind {
            TokenKind::Or => (BinaryOperator::Or, (1, 2)),

            TokenKind::And => (BinaryOperator::And, (3, 4)),

            TokenKind::Eq => (BinaryOperator::Eq, (5, 6)),
            TokenKind::NotEq => (BinaryOperator::NotEq, (5, 6)),
            TokenKind::Less => (BinaryOperator::Less, (5, 6)),
            TokenKind::Greater => (BinaryOperator::Greater, (5, 6)),
            TokenKind::LessEq => (BinaryOperator::LessEq, (5, 6)),
            TokenKind::GreaterEq => (BinaryOperator::GreaterEq, (5, 6)),

            TokenKind::Plus => (BinaryOperator::Add, (7, 8)),
            TokenKind::Minus => (BinaryOperator::Sub, (7, 8)),

            TokenKind::Star => (BinaryOperator::Mul, (9, 10)),
            TokenKind::Div => (BinaryOperator::Div, (9, 10)),
            TokenKind::Slash => (BinaryOperator::RealDiv, (9, 10)),
            TokenKind::Mod => (BinaryOperator::Mod, (9, 10)),

            _ => return None,
        };
        Some(op)
    }

    fn int(&self, token: Token) -> Result<i64> {
        extract::int(token, self.src).map_err(|e| token.span().wrap(Error::from(e)))
    }
}

impl Parser<'_, '_, '_> {
    pub fn new<'src, 'tok, 'env>(
        src: &'src str,
        tokens: &'tok mut Vec<Token>,
        env: &'env mut TypeEnv,
    ) -> Parser<'src, 'tok, 'env> {
        let mut p = Parser {
            src,
            tokens,
            env,
            cursor: 0,
        };
        p.setup();
        p
    }

    /// Setups the parser, skipping any trivia if necessary.
    fn setup(&mut self) {
        while self.peek().kind.is_trivia() {
            self.advance();
        }
    }

    /// Returns the current token.
    #[inline]
    fn peek(&self) -> Token {
        match self.tokens.get(self.cursor) {
            Some(token) => *token,
            None => Token::eof_for(self.src),
        }
    }

    /// Returns the current token and advances. Skips any trivia.
    fn advance(&mut self) -> Token {
        let c = self.peek(); // Before any advancement
        while {
            self.cursor += 1;
            self.peek().kind.is_trivia()
        } {}
        c
    }

    /// Checks whether the current token matches the given one.
    fn is(&self, expect: TokenKind) -> bool {
        self.peek().kind == expect
    }

    /// Advances if the current token matches the provided one, returning true.
    /// If not, returns false and doesn't advance.
    fn take(&mut self, expect: TokenKind) -> bool {
        if self.is(expect) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Advances if the current token matches the provided one.
    fn consume(&mut self, expect: TokenKind) -> Result<Token> {
        if self.is(expect) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(&[expect]))
        }
    }

    /// Advances if the current token matches any of the provided tokens.
    fn consume_any(&mut self, expect: &'static [TokenKind]) -> Result<Token> {
        for t in expect {
            if self.is(*t) {
                return Ok(self.advance());
            }
        }
        Err(self.unexpected(expect))
    }

    /// Builds an error for the current token.
    fn unexpected(&self, expected: &[TokenKind]) -> Spanned<Error> {
        let c = self.peek();
        c.span().wrap(Error::Unexpected {
            actual: c.kind,
            expected: Box::from(expected),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    Unexpected {
        actual: TokenKind,
        expected: Box<[TokenKind]>,
    },
    ParseInt,
    /// A token kind which holds the [`TokenKind::is_error`] property.
    Lexer(TokenKind),
}

impl From<std::num::ParseIntError> for Error {
    fn from(_: std::num::ParseIntError) -> Self {
        Error::ParseInt
    }
}


#[cfg(test)]
mod tests {
    use super::parse_program;
    use crate::{ast::StmtKind, types::TypeEnv, util::test_utils::tree_tests};

    tree_tests!(
        use parser;

        fn test_simple_expression() {
            let expr = "(1 * 2 + 3) - (1 + 2 * 3)";
            let tree_ok = "
                binary Sub
                  paren
                    binary Add
                      binary Mul
                        int 1
                        int 2
                      int 3
                  paren
                    binary Add
                      int 1
                      binary Mul
                        int 2
                        int 3
            ";
        }

        fn test_logical_precedence() {
            let expr = "a or b and not c = d";
            let tree_ok = "
                binary Or
                  name a: unknown
                  binary And
                    name b: unknown
                    binary Eq
                      unary Not
                        name c: unknown
                      name d: unknown
            ";
        }

        fn test_keyword_operators() {
            let expr = "x div 2 mod 3 <> -y";
            let tree_ok = "
                binary NotEq
                  binary Mod
                    binary Div
                      name x: unknown
                      int 2
                    int 3
                  unary Minus
                    name y: unknown
            ";
        }

        fn test_literals() {
            let expr = "f('abc', 'c', true, 1.5)";
            let tree_ok = r#"
                call f
                  string "abc"
                  char 'c'
                  bool true
                  real 1.5
            "#;
        }

        fn test_index_expr() {
            let expr = "A[i + 1]";
            let tree_ok = "
                index a: unknown
                  binary Add
                    name i: unknown
                    int 1
            ";
        }

        fn test_missing_operand() {
            let expr = "1 +";
            let expected_errors = &[
                "1:4: expected one of identifier, integer literal, real literal, \
                string literal, character literal, `true`, `false`, `(`, `-`, `+`, `not`, \
                but got end of input",
            ];
        }

        fn test_declared_types_annotate_names() {
            let program = "
                program Demo;
                var x, y: integer;
                    s: string;
                    v: array[1..10] of integer;
                begin
                    x := y;
                    s := 'hi';
                    v[x] := z
                end.
            ";
            let tree_ok = r#"
                program demo
                  var
                    x, y: Integer
                    s: String
                    v: array[1..10] of Integer
                  begin
                    assign
                      name x: Integer
                      name y: Integer
                    assign
                      name s: String
                      string "hi"
                    assign
                      index v: array[1..10] of Integer
                        name x: Integer
                      name z: unknown
            "#;
        }

        fn test_routines() {
            let program = "
                program p;
                procedure greet(name: string; times, gap: integer);
                begin
                    writeln(name)
                end;
                function fact(n: integer): integer;
                var acc: integer;
                begin
                    fact := n
                end;
                begin
                    greet('x', 1, 2);
                    writeln
                end.
            ";
            let tree_ok = r#"
                program p
                  procedure greet(name: String; times, gap: Integer)
                    begin
                      call writeln
                        name name: String
                  function fact(n: Integer): Integer
                    var
                      acc: Integer
                    begin
                      assign
                        name fact: Integer
                        name n: Integer
                  begin
                    call greet
                      char 'x'
                      int 1
                      int 2
                    call writeln
            "#;
        }

        fn test_dangling_else_binds_to_nearest_if() {
            let program = "
                program p;
                begin
                    if a then if b then x := 1 else x := 2
                end.
            ";
            let tree_ok = "
                program p
                  begin
                    if-then
                      name a: unknown
                      if-then-else
                        name b: unknown
                        assign
                          name x: unknown
                          int 1
                        assign
                          name x: unknown
                          int 2
            ";
        }

        fn test_else_after_closed_branch() {
            let program = "
                program p;
                begin
                    if a then while b do x := 1 else if c then x := 2
                end.
            ";
            let tree_ok = "
                program p
                  begin
                    if-then-else
                      name a: unknown
                      while
                        name b: unknown
                        assign
                          name x: unknown
                          int 1
                      if-then
                        name c: unknown
                        assign
                          name x: unknown
                          int 2
            ";
        }

        fn test_nested_if_else_chain() {
            let program = "
                program p;
                begin
                    if a then if b then x := 1 else x := 2 else x := 3
                end.
            ";
            let tree_ok = "
                program p
                  begin
                    if-then-else
                      name a: unknown
                      if-then-else
                        name b: unknown
                        assign
                          name x: unknown
                          int 1
                        assign
                          name x: unknown
                          int 2
                      assign
                        name x: unknown
                        int 3
            ";
        }

        fn test_for_loops() {
            let program = "
                program p;
                var i: integer;
                begin
                    for i := 1 to 10 do writeln(i);
                    for i := 10 downto 1 do begin end;
                end.
            ";
            let tree_ok = "
                program p
                  var
                    i: Integer
                  begin
                    for i: Integer to
                      int 1
                      int 10
                      call writeln
                        name i: Integer
                    for i: Integer downto
                      int 10
                      int 1
                      begin
            ";
        }

        fn test_char_and_negative_bounds() {
            let program = "
                program p;
                var a: array[-2..2] of integer;
                    b: array['a'..'z'] of string;
                begin
                end.
            ";
            let tree_ok = "
                program p
                  var
                    a: array[-2..2] of Integer
                    b: array[97..122] of String
                  begin
            ";
        }

        fn test_trailing_semicolons() {
            let program = "program p; begin x := 1;; end.";
            let tree_ok = "
                program p
                  begin
                    assign
                      name x: unknown
                      int 1
            ";
        }

        fn test_missing_semicolon_between_statements() {
            let program = "program p;\nbegin\n  x := 1\n  y := 2\nend.";
            let expected_errors = &["4:3: expected one of `;`, `end`, but got identifier"];
        }

        fn test_statement_after_empty_statement() {
            let program = "program p; begin x := 1;; y := 2 end.";
            let expected_errors = &["1:27: expected one of `;`, `end`, but got identifier"];
        }

        fn test_missing_final_dot() {
            let program = "program p; begin end";
            let expected_errors = &["1:21: expected `.`, but got end of input"];
        }

        fn test_unexpected_statement_start() {
            let program = "program p; begin 1 end.";
            let expected_errors = &[
                "1:18: expected one of `begin`, identifier, `if`, `while`, `for`, \
                but got integer literal",
            ];
        }

        fn test_lexer_error_is_reported_first() {
            let program = "program p; begin x := 1 # end.";
            let expected_errors = &["1:25: unexpected character"];
        }

        fn test_unclosed_string() {
            let program = "program p; begin writeln('oops) end.";
            let expected_errors = &["1:26: unclosed string"];
        }

        fn test_integer_out_of_range() {
            let expr = "99999999999999999999";
            let expected_errors = &["1:1: integer literal out of range"];
        }
    );

    /// Nests `if` statements without `else`, alternating bare and
    /// `begin`-wrapped branches.
    fn nested_ifs(depth: usize) -> String {
        let mut src = String::from("program p; begin ");
        for _ in 0..depth {
            src.push_str("if a then begin if b then ");
        }
        src.push_str("x := 1");
        for _ in 0..depth {
            src.push_str(" end");
        }
        src.push_str(" end.");
        src
    }

    #[test]
    fn test_deeply_nested_ifs() {
        let src = nested_ifs(40);
        let mut env = TypeEnv::new();
        let program = parse_program(&src, &mut Vec::new(), &mut env).unwrap();

        let mut depth = 0;
        let mut stmt = &program.block.body.body[0];
        loop {
            match &stmt.kind {
                StmtKind::IfThen { then_arm, .. } => {
                    depth += 1;
                    stmt = then_arm;
                }
                StmtKind::Compound(compound) => stmt = &compound.body[0],
                StmtKind::Assignment { .. } => break,
                other => panic!("unexpected statement {other:?}"),
            }
        }
        assert_eq!(depth, 80);
    }
}
