use std::iter::Peekable;
use std::str::CharIndices;

use crate::error::{Error, Result};
use crate::token::{Token, TokenKind};

pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self { source, chars: source.char_indices().peekable(), line: 1, column: 1 }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let is_eof = token.kind == TokenKind::Eof;
            tokens.push(token);
            if is_eof {
                return Ok(tokens);
            }
        }
    }

    fn next_token(&mut self) -> Result<Token> {
        self.skip_whitespace_and_comments();

        let line = self.line;
        let column = self.column;

        let kind = match self.peek_char() {
            None => TokenKind::Eof,
            Some(c) => match c {
                '{' => self.single(TokenKind::LBrace),
                '}' => self.single(TokenKind::RBrace),
                '[' => self.single(TokenKind::LBracket),
                ']' => self.single(TokenKind::RBracket),
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                ':' => self.single(TokenKind::Colon),
                ',' => self.single(TokenKind::Comma),
                '"' | '\'' => self.scan_string(c, line, column)?,
                '-' | '+' | '0'..='9' => self.scan_number(line, column)?,
                c if is_ident_start(c) => self.scan_ident(),
                found => return Err(Error::UnexpectedChar { found, line, column }),
            },
        };

        Ok(Token { kind, line, column })
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.advance();
        kind
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn peek_offset(&mut self) -> usize {
        self.chars.peek().map(|(i, _)| *i).unwrap_or(self.source.len())
    }

    fn rest(&mut self) -> &'a str {
        let source = self.source;
        &source[self.peek_offset()..]
    }

    fn consumed(&mut self) -> &'a str {
        let source = self.source;
        &source[..self.peek_offset()]
    }

    fn advance(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.advance();
                }
                Some('/') if self.rest().starts_with("//") => {
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => return,
            }
        }
    }

    fn scan_string(&mut self, quote: char, line: usize, column: usize) -> Result<TokenKind> {
        self.advance();
        let mut value = String::new();

        loop {
            let Some(c) = self.advance() else {
                return Err(Error::UnterminatedString { line, column });
            };

            match c {
                c if c == quote => return Ok(TokenKind::Str(value)),
                '\\' => {
                    let esc_line = self.line;
                    let esc_column = self.column;
                    let Some(esc) = self.advance() else {
                        return Err(Error::UnterminatedString { line, column });
                    };
                    match esc {
                        '"' | '\'' | '\\' | '/' => value.push(esc),
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        'b' => value.push('\u{8}'),
                        'f' => value.push('\u{c}'),
                        'u' => value.push(self.scan_unicode(esc_line, esc_column)?),
                        found => {
                            return Err(Error::InvalidEscape {
                                found,
                                line: esc_line,
                                column: esc_column,
                            });
                        }
                    }
                }
                c => value.push(c),
            }
        }
    }

    fn scan_unicode(&mut self, line: usize, column: usize) -> Result<char> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .advance()
                .and_then(|c| c.to_digit(16))
                .ok_or(Error::InvalidEscape { found: 'u', line, column })?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or(Error::InvalidEscape { found: 'u', line, column })
    }

    fn scan_number(&mut self, line: usize, column: usize) -> Result<TokenKind> {
        let start = self.peek_offset();
        if matches!(self.peek_char(), Some('-' | '+')) {
            self.advance();
        }

        while let Some(c) = self.peek_char() {
            if c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '_') {
                self.advance();
            } else if matches!(c, '-' | '+') && self.consumed().ends_with(['e', 'E']) {
                self.advance();
            } else {
                break;
            }
        }

        let source = self.source;
        let text = &source[start..self.peek_offset()];
        let valid = text
            .trim_start_matches(['-', '+'])
            .starts_with(|c: char| c.is_ascii_digit());
        if !valid {
            return Err(Error::InvalidNumber { text: text.to_string(), line, column });
        }
        Ok(TokenKind::Number(text.replace('_', "")))
    }

    fn scan_ident(&mut self) -> TokenKind {
        let start = self.peek_offset();
        while let Some(c) = self.peek_char() {
            if is_ident_continue(c) {
                self.advance();
            } else {
                break;
            }
        }
        let source = self.source;
        TokenKind::Ident(source[start..self.peek_offset()].to_string())
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '$' | '.')
}
