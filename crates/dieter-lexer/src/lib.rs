// Dieter lexer -- tokenizer for the Dieter programming language.

mod cursor;

use cursor::Cursor;
use dieter_common::token::{keyword_from_str, Token, TokenKind};

/// The Dieter lexer. Converts source text into a stream of tokens.
///
/// Wraps a [`Cursor`] for character-level iteration and implements
/// `Iterator<Item = Token>` so callers can consume tokens lazily or collect
/// them into a `Vec`. Whitespace (including newlines) separates tokens and
/// is never emitted; block comments are emitted as `Comment` trivia so the
/// parser can skip them uniformly.
pub struct Lexer<'src> {
    cursor: Cursor<'src>,
    /// Whether we have already emitted the `Eof` token.
    emitted_eof: bool,
}

impl<'src> Lexer<'src> {
    /// Create a new lexer for the given source text.
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
            emitted_eof: false,
        }
    }

    /// Convenience: tokenize the entire source into a `Vec<Token>`.
    ///
    /// The returned vector includes the final `Eof` token.
    pub fn tokenize(source: &str) -> Vec<Token> {
        Lexer::new(source).collect()
    }

    /// Produce the next token.
    fn produce_token(&mut self) -> Token {
        self.cursor.eat_while(char::is_whitespace);

        let start = self.cursor.pos();

        let Some(c) = self.cursor.peek() else {
            return Token::new(TokenKind::Eof, start, start);
        };

        match c {
            // ── Single-character delimiters ─────────────────────────────
            '(' => self.single_char_token(TokenKind::LParen, start),
            ')' => self.single_char_token(TokenKind::RParen, start),
            '[' => self.single_char_token(TokenKind::LBracket, start),
            ']' => self.single_char_token(TokenKind::RBracket, start),
            ',' => self.single_char_token(TokenKind::Comma, start),
            '<' => self.single_char_token(TokenKind::Lt, start),
            '♥' => self.single_char_token(TokenKind::Heart, start),

            // ── `:` / `:=` ──────────────────────────────────────────────
            ':' => self.lex_colon(start),

            // ── Comments ────────────────────────────────────────────────
            '/' if self.cursor.peek_next() == Some('*') => self.lex_comment(start),

            // ── Literals ────────────────────────────────────────────────
            '0'..='9' => self.lex_number(start),
            '"' => self.lex_string(start),

            // ── Identifiers and keywords ────────────────────────────────
            c if c.is_alphabetic() => self.lex_ident(start),

            // ── Unknown character (error recovery) ──────────────────────
            _ => {
                self.cursor.advance();
                Token::new(TokenKind::Error, start, self.cursor.pos())
            }
        }
    }

    /// Consume one character and return a token of the given kind.
    fn single_char_token(&mut self, kind: TokenKind, start: u32) -> Token {
        self.cursor.advance();
        Token::new(kind, start, self.cursor.pos())
    }

    /// `:` -> `Colon`, `:=` -> `Assign`
    fn lex_colon(&mut self, start: u32) -> Token {
        self.cursor.advance(); // consume ':'
        if self.cursor.peek() == Some('=') {
            self.cursor.advance();
            Token::new(TokenKind::Assign, start, self.cursor.pos())
        } else {
            Token::new(TokenKind::Colon, start, self.cursor.pos())
        }
    }

    /// Lex a block comment `/* ... */`.
    ///
    /// Comments do not nest: the comment ends at the first `*/`. An
    /// unterminated comment produces an `Error` token.
    fn lex_comment(&mut self, start: u32) -> Token {
        self.cursor.advance(); // consume '/'
        self.cursor.advance(); // consume '*'

        loop {
            match self.cursor.peek() {
                None => {
                    return Token::new(TokenKind::Error, start, self.cursor.pos());
                }
                Some('*') if self.cursor.peek_next() == Some('/') => {
                    self.cursor.advance();
                    self.cursor.advance();
                    return Token::new(TokenKind::Comment, start, self.cursor.pos());
                }
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
    }

    /// Lex an integer literal: a run of ASCII digits.
    fn lex_number(&mut self, start: u32) -> Token {
        self.cursor.eat_while(|c| c.is_ascii_digit());
        Token::new(TokenKind::IntLiteral, start, self.cursor.pos())
    }

    /// Lex a string literal: `"` up to the next `"`. No escape sequences.
    ///
    /// An unterminated string produces an `Error` token.
    fn lex_string(&mut self, start: u32) -> Token {
        self.cursor.advance(); // consume opening '"'
        self.cursor.eat_while(|c| c != '"');
        if self.cursor.peek().is_none() {
            return Token::new(TokenKind::Error, start, self.cursor.pos());
        }
        self.cursor.advance(); // consume closing '"'
        Token::new(TokenKind::StringLiteral, start, self.cursor.pos())
    }

    /// Lex an identifier or keyword. Identifiers start with an alphabetic
    /// character and continue with alphanumerics or underscores.
    fn lex_ident(&mut self, start: u32) -> Token {
        self.cursor.advance(); // consume first char
        self.cursor.eat_while(|c| c.is_alphanumeric() || c == '_');
        let text = self.cursor.slice(start, self.cursor.pos());

        let kind = keyword_from_str(text).unwrap_or(TokenKind::Ident);
        Token::new(kind, start, self.cursor.pos())
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.emitted_eof {
            return None;
        }
        let token = self.produce_token();
        if token.kind == TokenKind::Eof {
            self.emitted_eof = true;
        }
        Some(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::tokenize(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lex_simple_module() {
        assert_eq!(
            kinds("module m end"),
            vec![
                TokenKind::Module,
                TokenKind::Ident,
                TokenKind::End,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_assign_and_colon() {
        assert_eq!(
            kinds("x := 1"),
            vec![
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::IntLiteral,
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds("x : int"),
            vec![
                TokenKind::Ident,
                TokenKind::Colon,
                TokenKind::Int,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_heart_type_variable() {
        assert_eq!(
            kinds("♥T"),
            vec![TokenKind::Heart, TokenKind::Ident, TokenKind::Eof]
        );
    }

    #[test]
    fn lex_string_literal() {
        let tokens = Lexer::tokenize(r#""hello world""#);
        assert_eq!(tokens[0].kind, TokenKind::StringLiteral);
        assert_eq!(tokens[0].span.start, 0);
        assert_eq!(tokens[0].span.end, 13);
    }

    #[test]
    fn lex_unterminated_string_is_error() {
        assert_eq!(
            kinds("\"oops"),
            vec![TokenKind::Error, TokenKind::Eof]
        );
    }

    #[test]
    fn lex_block_comment() {
        assert_eq!(
            kinds("/* a comment */ end"),
            vec![TokenKind::Comment, TokenKind::End, TokenKind::Eof]
        );
    }

    #[test]
    fn lex_comment_does_not_nest() {
        // comment ends at the first `*/`; the rest is tokenized normally
        assert_eq!(
            kinds("/* outer /* inner */ end"),
            vec![TokenKind::Comment, TokenKind::End, TokenKind::Eof]
        );
    }

    #[test]
    fn lex_unterminated_comment_is_error() {
        assert_eq!(kinds("/* nope"), vec![TokenKind::Error, TokenKind::Eof]);
    }

    #[test]
    fn lex_spans_accurate() {
        let tokens = Lexer::tokenize("var m : map");
        // var: 0-3
        assert_eq!(tokens[0].span.start, 0);
        assert_eq!(tokens[0].span.end, 3);
        // m: 4-5
        assert_eq!(tokens[1].span.start, 4);
        assert_eq!(tokens[1].span.end, 5);
        // :: 6-7
        assert_eq!(tokens[2].span.start, 6);
        assert_eq!(tokens[2].span.end, 7);
        // map: 8-11
        assert_eq!(tokens[3].span.start, 8);
        assert_eq!(tokens[3].span.end, 11);
    }

    #[test]
    fn lex_newlines_are_whitespace() {
        assert_eq!(
            kinds("module m\nend"),
            vec![
                TokenKind::Module,
                TokenKind::Ident,
                TokenKind::End,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_unknown_char_is_error() {
        assert_eq!(
            kinds("x + y"),
            vec![
                TokenKind::Ident,
                TokenKind::Error,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn lex_ident_with_underscore_and_digits() {
        let tokens = Lexer::tokenize("my_var2");
        assert_eq!(tokens[0].kind, TokenKind::Ident);
        assert_eq!(tokens[0].span.end, 7);
    }
}
