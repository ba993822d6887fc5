use std::{fmt, ops::Range};

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    lo: usize,
    len: u32,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Token {
        Token {
            kind,
            len: span.len,
            lo: span.lo,
        }
    }

    /// Returns an end-of-file token positioned at the end of `src`.
    pub fn eof_for(src: &str) -> Token {
        Token::new(TokenKind::Eof, Span::new_of_length(src.len(), 0))
    }

    pub fn span(&self) -> Span {
        Span {
            len: self.len,
            lo: self.lo,
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({:?}, {})", self.kind, self.span())
    }
}

#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Span {
    pub len: u32,
    pub lo: usize,
}

impl Span {
    pub fn new_of_bounds(Range { start: lo, end: hi }: Range<usize>) -> Span {
        debug_assert!(hi >= lo);
        let len = u32::try_from(hi - lo).unwrap_or(u32::MAX);
        Self::new_of_length(lo, len)
    }

    pub const fn new_of_length(lo: usize, len: u32) -> Span {
        Span { len, lo }
    }

    pub fn hi(self) -> usize {
        self.lo + self.len as usize
    }

    /// Returns a span which covers both `self` and `other`.
    pub fn to(self, other: Span) -> Span {
        Span::new_of_bounds(self.lo.min(other.lo)..self.hi().max(other.hi()))
    }

    /// Shrinks (or grows) the span by the provided deltas on each side.
    pub fn offset(self, lo_delta: isize, hi_delta: isize) -> Span {
        let lo = self.lo.saturating_add_signed(lo_delta);
        let hi = self.hi().saturating_add_signed(hi_delta).max(lo);
        Span::new_of_bounds(lo..hi)
    }

    pub fn substr(self, src: &str) -> &str {
        &src[self.lo..self.hi()]
    }

    pub fn wrap<T>(self, inner: T) -> Spanned<T> {
        Spanned { span: self, inner }
    }

    /// Computes the 1-based line and column of the span start within `src`.
    ///
    /// Columns count characters, not bytes.
    pub fn location(self, src: &str) -> Location {
        let lo = self.lo.min(src.len());
        let before = &src[..lo];
        let line_start = before.rfind('\n').map_or(0, |i| i + 1);
        Location {
            line: before.matches('\n').count() + 1,
            column: before[line_start..].chars().count() + 1,
            line_start,
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({self}, len: {})", self.len)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lo = self.lo;
        let hi = self.hi();
        write!(f, "{lo}..{hi}")
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    /// Byte offset where the line starts.
    pub line_start: usize,
}

impl Location {
    /// Returns the full source line this location points into.
    pub fn line_text(self, src: &str) -> &str {
        let rest = &src[self.line_start..];
        rest.split('\n').next().unwrap_or_default().trim_end_matches('\r')
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Spanned<T> {
    pub span: Span,
    pub inner: T,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Program,
    Procedure,
    Function,
    Var,
    Begin,
    End,
    If,
    Then,
    Else,
    While,
    Do,
    For,
    To,
    Downto,
    Of,
    Array,
    Div,
    Mod,
    And,
    Or,
    Not,

    True,
    False,

    TypeInteger,
    TypeString,
    TypeBoolean,
    TypeReal,
    TypeChar,

    /// `..`
    DotDot,
    Dot,
    Semicolon,
    Colon,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,

    /// `:=`
    Assign,
    Plus,
    Minus,
    Star,
    /// Real division, `/`.
    Slash,
    Eq,
    /// `<>`
    NotEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,

    Identifier,
    Int,
    Real,
    String,
    Char,

    Whitespace,
    Comment,

    Eof,

    ErrorUnexpectedChar,
    ErrorUnclosedComment,
    ErrorUnclosedString,
}

impl TokenKind {
    pub fn is_trivia(self) -> bool {
        matches!(self, TokenKind::Whitespace | TokenKind::Comment)
    }

    pub fn is_error(self) -> bool {
        matches!(
            self,
            TokenKind::ErrorUnexpectedChar
                | TokenKind::ErrorUnclosedComment
                | TokenKind::ErrorUnclosedString
        )
    }

    /// A short human description, used in diagnostics.
    pub fn describe(self) -> &'static str {
        use TokenKind::*;
        match self {
            Program => "`program`",
            Procedure => "`procedure`",
            Function => "`function`",
            Var => "`var`",
            Begin => "`begin`",
            End => "`end`",
            If => "`if`",
            Then => "`then`",
            Else => "`else`",
            While => "`while`",
            Do => "`do`",
            For => "`for`",
            To => "`to`",
            Downto => "`downto`",
            Of => "`of`",
            Array => "`array`",
            Div => "`div`",
            Mod => "`mod`",
            And => "`and`",
            Or => "`or`",
            Not => "`not`",
            True => "`true`",
            False => "`false`",
            TypeInteger => "`integer`",
            TypeString => "`string`",
            TypeBoolean => "`boolean`",
            TypeReal => "`real`",
            TypeChar => "`char`",
            DotDot => "`..`",
            Dot => "`.`",
            Semicolon => "`;`",
            Colon => "`:`",
            Comma => "`,`",
            LParen => "`(`",
            RParen => "`)`",
            LBracket => "`[`",
            RBracket => "`]`",
            Assign => "`:=`",
            Plus => "`+`",
            Minus => "`-`",
            Star => "`*`",
            Slash => "`/`",
            Eq => "`=`",
            NotEq => "`<>`",
            Less => "`<`",
            Greater => "`>`",
            LessEq => "`<=`",
            GreaterEq => "`>=`",
            Identifier => "identifier",
            Int => "integer literal",
            Real => "real literal",
            String => "string literal",
            Char => "character literal",
            Whitespace => "whitespace",
            Comment => "comment",
            Eof => "end of input",
            ErrorUnexpectedChar => "unexpected character",
            ErrorUnclosedComment => "unclosed comment",
            ErrorUnclosedString => "unclosed string",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Keywords are matched against the lowercased lexeme.
pub static KEYWORDS: phf::Map<&'static str, TokenKind> = phf::phf_map! {
    "program" => TokenKind::Program,
    "procedure" => TokenKind::Procedure,
    "function" => TokenKind::Function,
    "var" => TokenKind::Var,
    "begin" => TokenKind::Begin,
    "end" => TokenKind::End,
    "if" => TokenKind::If,
    "then" => TokenKind::Then,
    "else" => TokenKind::Else,
    "while" => TokenKind::While,
    "do" => TokenKind::Do,
    "for" => TokenKind::For,
    "to" => TokenKind::To,
    "downto" => TokenKind::Downto,
    "of" => TokenKind::Of,
    "array" => TokenKind::Array,
    "div" => TokenKind::Div,
    "mod" => TokenKind::Mod,
    "and" => TokenKind::And,
    "or" => TokenKind::Or,
    "not" => TokenKind::Not,
    "true" => TokenKind::True,
    "false" => TokenKind::False,
    "integer" => TokenKind::TypeInteger,
    "string" => TokenKind::TypeString,
    "boolean" => TokenKind::TypeBoolean,
    "real" => TokenKind::TypeReal,
    "char" => TokenKind::TypeChar,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_counts_lines_and_columns() {
        let src = "program p;\nbegin\n  x := 1\nend.";
        let lo = src.find('x').unwrap();
        let loc = Span::new_of_length(lo, 1).location(src);
        assert_eq!((loc.line, loc.column), (3, 3));
        assert_eq!(loc.line_text(src), "  x := 1");
    }

    #[test]
    fn location_of_first_byte() {
        let loc = Span::new_of_length(0, 0).location("abc");
        assert_eq!((loc.line, loc.column), (1, 1));
        assert_eq!(loc.line_text("abc"), "abc");
    }

    #[test]
    fn span_to_covers_both() {
        let a = Span::new_of_bounds(2..4);
        let b = Span::new_of_bounds(7..9);
        assert_eq!(a.to(b), Span::new_of_bounds(2..9));
        assert_eq!(b.to(a), Span::new_of_bounds(2..9));
    }
}
