use std::{iter::Peekable, num::ParseIntError};

use crate::token::{Span, Token, TokenKind, KEYWORDS};

pub const SUGGESTED_TOKENS_CAPACITY: usize = 8_192;

/// Lexes the provided string, producing the tokens into the provided buffer.
pub fn lex(src: &str, tokens: &mut Vec<Token>) {
    Lexer::new(src, tokens).lex();
}

/// A convenience function that allocates a new buffer per lexed input and
/// returns it.
pub fn lex_in_new(src: &str) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(SUGGESTED_TOKENS_CAPACITY);
    lex(src, &mut tokens);
    tokens
}

/// The Pascal lexer
struct Lexer<'src, 'tok> {
    src: &'src str,
    iter: Peekable<std::str::Chars<'src>>,
    cursor: usize,
    current_lo: usize,
    tokens: &'tok mut Vec<Token>,
}

impl Lexer<'_, '_> {
    /// Scans the source string until the input is exhausted.
    ///
    /// Tokens are written into the provided tokens buffer.
    fn lex(mut self) {
        assert_eq!(self.tokens.len(), 0, "must pass clean tokens buffer");
        loop {
            let next = self.scan_token_kind();
            let is_eof = matches!(next, TokenKind::Eof);
            self.produce(next);
            if is_eof {
                break;
            }
        }
    }

    /// Tries to scan the current character.
    fn scan_token_kind(&mut self) -> TokenKind {
        use TokenKind::*;
        match self.mark_advance() {
            '\0' => Eof,
            '+' => Plus,
            '-' => Minus,
            '*' => Star,
            '/' => match self.peek() {
                '/' => self.line_comment(),
                _ => Slash,
            },
            '=' => Eq,
            '<' => match self.peek() {
                '=' => self.advance_with(LessEq),
                '>' => self.advance_with(NotEq),
                _ => Less,
            },
            '>' => match self.peek() {
                '=' => self.advance_with(GreaterEq),
                _ => Greater,
            },
            ':' => match self.peek() {
                '=' => self.advance_with(Assign),
                _ => Colon,
            },
            ';' => Semicolon,
            ',' => Comma,
            '.' => match self.peek() {
                '.' => self.advance_with(DotDot),
                _ => Dot,
            },
            '(' => match self.peek() {
                '*' => self.paren_comment(),
                _ => LParen,
            },
            ')' => RParen,
            '[' => LBracket,
            ']' => RBracket,
            '{' => self.brace_comment(),
            '\'' => self.quoted(),
            c if c.is_ascii_alphabetic() || c == '_' || c == '$' => self.identifier_or_keyword(),
            c if c.is_ascii_digit() => self.number(),
            c if c.is_ascii_whitespace() => self.whitespace(),
            _ => TokenKind::ErrorUnexpectedChar,
        }
    }

    /// Lexes a quoted literal. A literal holding exactly one character is a
    /// character literal; anything else (including `''`) is a string.
    fn quoted(&mut self) -> TokenKind {
        let mut chars = 0_usize;
        loop {
            match self.advance() {
                '\0' => return TokenKind::ErrorUnclosedString,
                '\'' => break,
                _ => chars += 1,
            }
        }
        if chars == 1 {
            TokenKind::Char
        } else {
            TokenKind::String
        }
    }

    fn identifier_or_keyword(&mut self) -> TokenKind {
        let valid_identifier_suffix = |c: char| c.is_ascii_alphanumeric() || c == '_' || c == '$';

        while valid_identifier_suffix(self.peek()) {
            self.advance();
        }
        let lower = self.substr().to_ascii_lowercase();
        KEYWORDS
            .get(lower.as_str())
            .copied()
            .unwrap_or(TokenKind::Identifier)
    }

    fn number(&mut self) -> TokenKind {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        // A dot only starts a fractional part if a digit follows it, which
        // keeps `1..10` lexing as a range.
        if self.peek() == '.' && self.peek_second().is_ascii_digit() {
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
            return TokenKind::Real;
        }
        TokenKind::Int
    }

    fn whitespace(&mut self) -> TokenKind {
        while self.peek().is_ascii_whitespace() {
            self.advance();
        }
        TokenKind::Whitespace
    }

    fn line_comment(&mut self) -> TokenKind {
        assert_eq!(self.advance(), '/');
        while !matches!(self.peek(), '\n' | '\0') {
            self.advance();
        }
        TokenKind::Comment
    }

    fn brace_comment(&mut self) -> TokenKind {
        loop {
            match self.advance() {
                '}' => return TokenKind::Comment,
                '\0' => return TokenKind::ErrorUnclosedComment,
                _ => continue,
            }
        }
    }

    fn paren_comment(&mut self) -> TokenKind {
        assert_eq!(self.advance(), '*');
        loop {
            match self.advance() {
                '*' => (), // start closing comment
                '\0' => return TokenKind::ErrorUnclosedComment,
                _ => continue,
            }
            // Consecutive stars may precede the closing paren.
            while self.peek() == '*' {
                self.advance();
            }
            match self.advance() {
                ')' => break,
                '\0' => return TokenKind::ErrorUnclosedComment,
                _ => continue,
            }
        }
        TokenKind::Comment
    }
}

impl Lexer<'_, '_> {
    /// Constructs a new lexer with the default state.
    fn new<'src, 'tok>(src: &'src str, tokens: &'tok mut Vec<Token>) -> Lexer<'src, 'tok> {
        Lexer {
            src,
            iter: src.chars().peekable(),
            cursor: 0,
            current_lo: 0,
            tokens,
        }
    }

    /// Starts a new token "mark" and advances the iterator.
    fn mark_advance(&mut self) -> char {
        self.current_lo = self.cursor;
        self.advance()
    }

    /// Returns the next char and advances the iterator.
    fn advance(&mut self) -> char {
        self.iter
            .next()
            .inspect(|c| self.cursor += c.len_utf8())
            .unwrap_or('\0')
    }

    /// Advances and returns the provided value.
    fn advance_with<T>(&mut self, value: T) -> T {
        self.advance();
        value
    }

    /// Returns the next char without advancing the iterator.
    fn peek(&mut self) -> char {
        self.iter.peek().copied().unwrap_or('\0')
    }

    /// Returns the char after the next one without advancing.
    fn peek_second(&self) -> char {
        self.src[self.cursor..].chars().nth(1).unwrap_or('\0')
    }

    /// Returns the current span.
    fn span(&self) -> Span {
        Span::new_of_bounds(self.current_lo..self.cursor)
    }

    /// Returns the substring of the current marked bounds.
    fn substr(&self) -> &str {
        self.span().substr(self.src)
    }

    /// Produces a token using the marked bounds.
    fn produce(&mut self, kind: TokenKind) {
        let span = self.span();
        self.tokens.push(Token::new(kind, span));
    }
}

pub mod extract {
    use super::*;

    pub fn int(token: Token, src: &str) -> Result<i64, ParseIntError> {
        debug_assert_eq!(token.kind, TokenKind::Int);
        token.span().substr(src).parse()
    }

    /// Identifiers are case insensitive, hence always lowercased.
    pub fn ident(token: Token, src: &str) -> Box<str> {
        debug_assert_eq!(token.kind, TokenKind::Identifier);
        token.span().substr(src).to_ascii_lowercase().into_boxed_str()
    }

    pub fn string(token: Token, src: &str) -> Box<str> {
        debug_assert_eq!(token.kind, TokenKind::String);
        token.span().offset(1, -1).substr(src).into()
    }

    pub fn char(token: Token, src: &str) -> char {
        debug_assert_eq!(token.kind, TokenKind::Char);
        let inner = token.span().offset(1, -1).substr(src);
        inner.chars().next().unwrap_or('\0')
    }

    pub fn real(token: Token, src: &str) -> Box<str> {
        debug_assert_eq!(token.kind, TokenKind::Real);
        token.span().substr(src).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_demo_programs_have_no_errors() {
        for input in [
            include_str!("../demos/factorial.pas"),
            include_str!("../demos/arrays.pas"),
            include_str!("../demos/strings.pas"),
        ] {
            let has_errors = lex_in_new(input).into_iter().any(|t| t.kind.is_error());
            assert!(!has_errors);
        }
    }

    #[test]
    fn tests_with_span() {
        use TokenKind::*;
        let cases = cases!(match .. {
            "+-*/" => [
                (Plus, 0..1),
                (Minus, 1..2),
                (Star, 2..3),
                (Slash, 3..4),
                (Eof, 4..4),
            ],
            "begin/Begin/bEgIn/BEGIN" => [
                (Begin, 0..5),
                (Slash, 5..6),
                (Begin, 6..11),
                (Slash, 11..12),
                (Begin, 12..17),
                (Slash, 17..18),
                (Begin, 18..23),
                (Eof, 23..23),
            ],
            "1/11/1.5/1..10" => [
                (Int, 0..1),
                (Slash, 1..2),
                (Int, 2..4),
                (Slash, 4..5),
                (Real, 5..8),
                (Slash, 8..9),
                (Int, 9..10),
                (DotDot, 10..12),
                (Int, 12..14),
                (Eof, 14..14),
            ],
            "a/Foo_1/$x" => [
                (Identifier, 0..1),
                (Slash, 1..2),
                (Identifier, 2..7),
                (Slash, 7..8),
                (Identifier, 8..10),
                (Eof, 10..10),
            ],
            "'a' '' 'ab' 'oops" => [
                (Char, 0..3),
                (Whitespace, 3..4),
                (String, 4..6),
                (Whitespace, 6..7),
                (String, 7..11),
                (Whitespace, 11..12),
                (ErrorUnclosedString, 12..17),
                (Eof, 17..17),
            ],
            "x { c } (* c **) // c\ny" => [
                (Identifier, 0..1),
                (Whitespace, 1..2),
                (Comment, 2..7),
                (Whitespace, 7..8),
                (Comment, 8..16),
                (Whitespace, 16..17),
                (Comment, 17..21),
                (Whitespace, 21..22),
                (Identifier, 22..23),
                (Eof, 23..23),
            ],
            "{ unclosed" => [
                (ErrorUnclosedComment, 0..10),
                (Eof, 10..10),
            ],
            ":= : <> <= >= < > = . ; , ( ) [ ] #" => [
                (Assign, 0..2),
                (Whitespace, 2..3),
                (Colon, 3..4),
                (Whitespace, 4..5),
                (NotEq, 5..7),
                (Whitespace, 7..8),
                (LessEq, 8..10),
                (Whitespace, 10..11),
                (GreaterEq, 11..13),
                (Whitespace, 13..14),
                (Less, 14..15),
                (Whitespace, 15..16),
                (Greater, 16..17),
                (Whitespace, 17..18),
                (Eq, 18..19),
                (Whitespace, 19..20),
                (Dot, 20..21),
                (Whitespace, 21..22),
                (Semicolon, 22..23),
                (Whitespace, 23..24),
                (Comma, 24..25),
                (Whitespace, 25..26),
                (LParen, 26..27),
                (Whitespace, 27..28),
                (RParen, 28..29),
                (Whitespace, 29..30),
                (LBracket, 30..31),
                (Whitespace, 31..32),
                (RBracket, 32..33),
                (Whitespace, 33..34),
                (ErrorUnexpectedChar, 34..35),
                (Eof, 35..35),
            ],
        });

        for (input, tokens) in cases {
            let lexed = lex_in_new(input);
            assert_eq!(lexed, tokens.as_slice());
        }
    }

    #[test]
    fn extract_literals() {
        let src = "Foo 42 'hi' 'c'";
        let tokens: Vec<_> = lex_in_new(src)
            .into_iter()
            .filter(|t| !t.kind.is_trivia())
            .collect();
        assert_eq!(&*extract::ident(tokens[0], src), "foo");
        assert_eq!(extract::int(tokens[1], src), Ok(42));
        assert_eq!(&*extract::string(tokens[2], src), "hi");
        assert_eq!(extract::char(tokens[3], src), 'c');
    }

    macro_rules! cases {
        (match .. {
            $($str:expr => [$(($kind:expr, $range:expr)),* $(,)?]),* $(,)?
        }) => {{
            &[$((
                $str,
                vec![
                    $(Token::new($kind, Span::new_of_bounds($range.start..$range.end))),*
                ],
            )),*]
        }};
    }
    use cases;
}
