use log::{debug, log_enabled, Level};

use crate::{
    token::{Span, Spanned},
    types::TypeEnv,
    util::fmt::{tree, Context, Show},
};

/// The lexer takes the source input, mapping it into a sequence of tokens.
pub mod lexer;

/// The parser takes a sequence of tokens, mapping it into an AST annotated
/// with declared types.
pub mod parser;

/// Type inference over expressions, shared by the code generator.
pub mod type_checker;

/// The code generator walks the AST, emitting stack machine instructions.
pub mod codegen;

pub mod ast;
pub mod scope;
pub mod token;
pub mod types;

pub mod util {
    pub mod fmt;
    #[cfg(test)]
    pub(crate) mod test_utils;
}

/// The output of a successful compilation.
#[derive(Debug)]
pub struct Compiled {
    /// Name from the `program` header, lowercased.
    pub program_name: Box<str>,
    pub code: String,
}

/// Compiles a whole program. The first error aborts the compilation.
pub fn compile(src: &str) -> Result<Compiled, CompileError> {
    let mut tokens = Vec::with_capacity(lexer::SUGGESTED_TOKENS_CAPACITY);
    let mut env = TypeEnv::new();

    debug!("parsing {} bytes", src.len());
    let program =
        parser::parse_program(src, &mut tokens, &mut env).map_err(CompileError::Syntax)?;
    if log_enabled!(Level::Debug) {
        debug!("syntax tree:\n{}", tree::print_program_string(&program));
    }

    debug!("generating code");
    let code = codegen::generate(&program, &mut env).map_err(CompileError::Semantic)?;
    debug!("generated {} line(s)", code.lines().count());

    Ok(Compiled {
        program_name: program.name.name,
        code,
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CompileError {
    Syntax(Spanned<parser::Error>),
    Semantic(Spanned<type_checker::Error>),
}

/// Error category of a failed compilation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Syntax,
    UndeclaredIdentifier,
    Redeclaration,
    TypeMismatch,
    UnsupportedConstruct,
    Arity,
    Internal,
}

impl CompileError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CompileError::Syntax(_) => ErrorKind::Syntax,
            CompileError::Semantic(error) => error.inner.kind(),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            CompileError::Syntax(error) => error.span,
            CompileError::Semantic(error) => error.span,
        }
    }

    /// Renders the diagnostic: the located message, the offending source
    /// line, and a caret under the error column.
    pub fn render(&self, src: &str) -> String {
        let ctx = Context { src };
        let loc = self.span().location(src);
        let line = loc.line_text(src);

        // Tabs are kept so that the caret lines up in the terminal.
        let pad: String = line
            .chars()
            .take(loc.column - 1)
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();

        let gutter = " ".repeat(loc.line.to_string().len());
        format!(
            "error: {:#}\n{gutter} |\n{} | {line}\n{gutter} | {pad}^\n",
            self.display(&ctx),
            loc.line,
        )
    }
}

impl Show for CompileError {
    fn show(&self, f: &mut std::fmt::Formatter<'_>, ctx: &Context<'_>) -> std::fmt::Result {
        match self {
            CompileError::Syntax(error) => error.show(f, ctx),
            CompileError::Semantic(error) => error.show(f, ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[test]
    fn render_points_at_the_error() {
        let src = "program p;\nbegin\n\tx := 1\nend.";
        let error = compile(src).unwrap_err();
        assert_eq!(error.kind(), ErrorKind::UndeclaredIdentifier);
        assert_eq!(
            error.render(src),
            "error: 3:2: x is not declared\n  |\n3 | \tx := 1\n  | \t^\n"
        );
    }

    #[test]
    fn compile_reports_the_program_name() {
        let compiled = compile(indoc! {"
            program Hello;
            begin
                writeln('hi')
            end.
        "})
        .unwrap();
        assert_eq!(&*compiled.program_name, "hello");
        assert!(compiled.code.starts_with("JUMP main\n"));
    }

    #[test]
    fn error_kinds() {
        let kind = |src| compile(src).unwrap_err().kind();
        assert_eq!(kind("program p; begin end"), ErrorKind::Syntax);
        assert_eq!(
            kind("program p; begin writeln(1 + 'ab') end."),
            ErrorKind::TypeMismatch
        );
        assert_eq!(
            kind("program p; var x: integer; x: string; begin end."),
            ErrorKind::Redeclaration
        );
        assert_eq!(
            kind("program p; var r: real; begin end."),
            ErrorKind::UnsupportedConstruct
        );
        assert_eq!(
            kind("program p; function f(a: integer): integer; begin f := a end; begin writeln(f) end."),
            ErrorKind::Arity
        );
        assert_eq!(
            kind("program p; begin writeln(y) end."),
            ErrorKind::UndeclaredIdentifier
        );
        assert_eq!(
            kind("program p; var x: integer; begin x end."),
            ErrorKind::TypeMismatch
        );
    }
}
