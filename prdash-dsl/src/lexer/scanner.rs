//! Lexer implementation

use super::token::*;
use std::iter::Peekable;
use std::str::CharIndices;

// ============================================================================
// LEXER IMPLEMENTATION
// ============================================================================

/// Lexer for the filter DSL. Offsets are byte positions into the source.
pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given source.
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            pos: 0,
        }
    }

    /// Byte offset of the next unread character.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Tokenize the entire source, ending with an `Eof` token.
    pub fn tokenize(&mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                break;
            }
        }

        Ok(tokens)
    }

    /// Scan the next token. Returns `Eof` repeatedly once input is exhausted.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();

        let start = self.pos;

        let kind = match self.peek_char() {
            None => TokenKind::Eof,
            Some(c) => match c {
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                ',' => self.single(TokenKind::Comma),

                '=' => self.single(TokenKind::Eq),
                '!' => self.operator(TokenKind::Bang, TokenKind::Ne),
                '>' => self.operator(TokenKind::Gt, TokenKind::Ge),
                '<' => self.operator(TokenKind::Lt, TokenKind::Le),

                '"' => self.scan_string()?,

                c if c.is_alphabetic() || c == '_' => self.scan_identifier(),

                c if c == '-' || c.is_ascii_digit() => self.scan_number_date_or_duration()?,

                c => return Err(LexError::UnexpectedChar { ch: c, offset: start }),
            },
        };

        Ok(Token {
            kind,
            span: Span {
                start,
                end: self.pos,
            },
        })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    /// One-character operator, or its two-character `=` suffixed form.
    fn operator(&mut self, short: TokenKind, with_eq: TokenKind) -> TokenKind {
        self.advance();
        if self.peek_char() == Some('=') {
            self.advance();
            with_eq
        } else {
            short
        }
    }

    /// Scan an identifier or keyword.
    fn scan_identifier(&mut self) -> TokenKind {
        let start = self.pos;

        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }

        let ident = &self.source[start..self.pos];

        // Check keywords (case-insensitive)
        match ident.to_lowercase().as_str() {
            "and" => TokenKind::And,
            "or" => TokenKind::Or,
            "not" => TokenKind::Not,
            "in" => TokenKind::In,
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),
            _ => TokenKind::Ident(ident.to_string()),
        }
    }

    /// Scan a double-quoted string. Only `\"` and `\\` are escapes; any other
    /// backslash is kept as written.
    fn scan_string(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        self.advance(); // consume opening quote
        let mut value = String::new();

        loop {
            match self.advance() {
                None => return Err(LexError::UnterminatedString { offset: start }),
                Some('"') => break,
                Some('\\') => match self.advance() {
                    None => return Err(LexError::UnterminatedString { offset: start }),
                    Some(c @ ('"' | '\\')) => value.push(c),
                    Some(c) => {
                        value.push('\\');
                        value.push(c);
                    }
                },
                Some(c) => value.push(c),
            }
        }

        Ok(TokenKind::String(value))
    }

    /// Scan a number, date (`YYYY-MM-DD`, validated by the parser) or
    /// duration (`7d`, `-2h`).
    fn scan_number_date_or_duration(&mut self) -> Result<TokenKind, LexError> {
        let start = self.pos;
        let negative = self.peek_char() == Some('-');
        if negative {
            self.advance();
        }

        let digits_start = self.pos;
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.advance();
        }
        if digits_start == self.pos {
            return Err(LexError::ExpectedDigits { offset: self.pos });
        }

        if !negative && self.peek_char() == Some('-') {
            while self
                .peek_char()
                .is_some_and(|c| c.is_ascii_digit() || c == '-')
            {
                self.advance();
            }
            return Ok(TokenKind::Date(self.source[start..self.pos].to_string()));
        }

        if matches!(self.peek_char(), Some('m' | 'h' | 'd' | 'w')) {
            self.advance();
            return Ok(TokenKind::Duration(self.source[start..self.pos].to_string()));
        }

        Ok(TokenKind::Number(self.source[start..self.pos].to_string()))
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn advance(&mut self) -> Option<char> {
        let (idx, c) = self.chars.next()?;
        self.pos = idx + c.len_utf8();
        Some(c)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_lexer_keywords_case_insensitive() {
        assert_eq!(
            kinds("AND Or not IN True FALSE"),
            vec![
                TokenKind::And,
                TokenKind::Or,
                TokenKind::Not,
                TokenKind::In,
                TokenKind::Bool(true),
                TokenKind::Bool(false),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_operators() {
        assert_eq!(
            kinds("= != > >= < <= !"),
            vec![
                TokenKind::Eq,
                TokenKind::Ne,
                TokenKind::Gt,
                TokenKind::Ge,
                TokenKind::Lt,
                TokenKind::Le,
                TokenKind::Bang,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_delimiters() {
        assert_eq!(
            kinds("( ) [ ] ,"),
            vec![
                TokenKind::LParen,
                TokenKind::RParen,
                TokenKind::LBracket,
                TokenKind::RBracket,
                TokenKind::Comma,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_identifiers() {
        assert_eq!(
            kinds("review_requested _x last"),
            vec![
                TokenKind::Ident("review_requested".to_string()),
                TokenKind::Ident("_x".to_string()),
                TokenKind::Ident("last".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_string_escapes() {
        let tokens = kinds(r#""a \"quoted\" \\ back\nslash""#);
        assert_eq!(
            tokens[0],
            TokenKind::String(r#"a "quoted" \ back\nslash"#.to_string())
        );
    }

    #[test]
    fn test_lexer_unterminated_string() {
        let err = Lexer::new(r#"label = "bug"#).tokenize().unwrap_err();
        assert_eq!(err, LexError::UnterminatedString { offset: 8 });

        let err = Lexer::new(r#""trailing\"#).tokenize().unwrap_err();
        assert_eq!(err, LexError::UnterminatedString { offset: 0 });
    }

    #[test]
    fn test_lexer_numbers_dates_durations() {
        assert_eq!(
            kinds("42 -7 2025-12-01 7d -2h 30m 1w"),
            vec![
                TokenKind::Number("42".to_string()),
                TokenKind::Number("-7".to_string()),
                TokenKind::Date("2025-12-01".to_string()),
                TokenKind::Duration("7d".to_string()),
                TokenKind::Duration("-2h".to_string()),
                TokenKind::Duration("30m".to_string()),
                TokenKind::Duration("1w".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_date_is_greedy_and_unvalidated() {
        assert_eq!(kinds("2025-1-")[0], TokenKind::Date("2025-1-".to_string()));
    }

    #[test]
    fn test_lexer_negative_number_is_not_a_date() {
        assert_eq!(
            kinds("-2025-12"),
            vec![
                TokenKind::Number("-2025".to_string()),
                TokenKind::Number("-12".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_lexer_dash_without_digits() {
        let err = Lexer::new("x = -").tokenize().unwrap_err();
        assert_eq!(err, LexError::ExpectedDigits { offset: 5 });
    }

    #[test]
    fn test_lexer_unexpected_character() {
        let err = Lexer::new("label : bug").tokenize().unwrap_err();
        assert_eq!(err, LexError::UnexpectedChar { ch: ':', offset: 6 });
    }

    #[test]
    fn test_lexer_spans_are_byte_offsets() {
        let tokens = Lexer::new("é = \"ü\"").tokenize().unwrap();
        assert_eq!(tokens[0].span, Span { start: 0, end: 2 });
        assert_eq!(tokens[1].span, Span { start: 3, end: 4 });
        assert_eq!(tokens[2].span, Span { start: 5, end: 9 });
        assert_eq!(tokens[3].span, Span { start: 9, end: 9 });
    }

    #[test]
    fn test_lexer_eof_is_sticky() {
        let mut lexer = Lexer::new("  ");
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::Eof);
        assert_eq!(lexer.position(), 2);
    }
}
