use marquee_domain::{format_datetime, parse_datetime};
use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};

const MAX_DEPTH: usize = 128;

/// Parses `source` as a single literal value.
///
/// Constructors map onto extended JSON: `Date("s")` and `ISODate("s")`
/// become `{"$date": "<rfc3339 utc>"}`, `ObjectId("s")` becomes
/// `{"$oid": "s"}`. A date argument that does not parse is an error.
pub fn parse(source: &str) -> Result<Value> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser { tokens, pos: 0, depth: 0 };
    let value = parser.parse_value()?;
    parser.expect_eof()?;
    Ok(value)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // The lexer always terminates the stream with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn unexpected(&self, expected: &'static str) -> Error {
        let token = self.peek();
        Error::Unexpected {
            expected,
            found: token.kind.describe(),
            line: token.line,
            column: token.column,
        }
    }

    fn expect(&mut self, kind: TokenKind, expected: &'static str) -> Result<()> {
        if self.peek().kind == kind {
            self.bump();
            Ok(())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_eof(&self) -> Result<()> {
        match self.peek().kind {
            TokenKind::Eof => Ok(()),
            _ => Err(self.unexpected("end of input")),
        }
    }

    fn parse_value(&mut self) -> Result<Value> {
        match self.peek().kind.clone() {
            TokenKind::LBrace => self.nested(Self::parse_object),
            TokenKind::LBracket => self.nested(Self::parse_array),
            TokenKind::Str(s) => {
                self.bump();
                Ok(Value::String(s))
            }
            TokenKind::Number(text) => {
                let token = self.bump();
                parse_number(&text, &token)
            }
            TokenKind::Ident(name) => {
                let token = self.bump();
                self.parse_word(name, &token)
            }
            _ => Err(self.unexpected("a value")),
        }
    }

    fn nested(&mut self, f: fn(&mut Self) -> Result<Value>) -> Result<Value> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(Error::TooDeep(MAX_DEPTH));
        }
        let value = f(self);
        self.depth -= 1;
        value
    }

    fn parse_word(&mut self, name: String, token: &Token) -> Result<Value> {
        match name.as_str() {
            "true" | "True" => Ok(Value::Bool(true)),
            "false" | "False" => Ok(Value::Bool(false)),
            "null" | "None" => Ok(Value::Null),
            "Date" | "ISODate" | "new.Date" => self.parse_constructor("$date"),
            "ObjectId" => self.parse_constructor("$oid"),
            // `new Date("...")` arrives as two identifiers.
            "new" => match self.peek().kind.clone() {
                TokenKind::Ident(inner) if inner == "Date" || inner == "ISODate" => {
                    self.bump();
                    self.parse_constructor("$date")
                }
                _ => Err(not_a_literal(name, token)),
            },
            _ => Err(not_a_literal(name, token)),
        }
    }

    fn parse_constructor(&mut self, key: &str) -> Result<Value> {
        self.expect(TokenKind::LParen, "'('")?;
        let token = self.peek().clone();
        let TokenKind::Str(arg) = token.kind else {
            return Err(self.unexpected("a string argument"));
        };
        self.bump();
        self.expect(TokenKind::RParen, "')'")?;

        let arg = if key == "$date" {
            let date = parse_datetime(&arg).ok_or(Error::InvalidDate {
                text: arg,
                line: token.line,
                column: token.column,
            })?;
            format_datetime(&date)
        } else {
            arg
        };

        let mut map = Map::new();
        map.insert(key.to_string(), Value::String(arg));
        Ok(Value::Object(map))
    }

    fn parse_object(&mut self) -> Result<Value> {
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut map = Map::new();

        loop {
            let key = match self.peek().kind.clone() {
                TokenKind::RBrace => {
                    self.bump();
                    return Ok(Value::Object(map));
                }
                TokenKind::Str(key) | TokenKind::Ident(key) | TokenKind::Number(key) => {
                    self.bump();
                    key
                }
                _ => return Err(self.unexpected("a key or '}'")),
            };

            self.expect(TokenKind::Colon, "':'")?;
            let value = self.parse_value()?;
            map.insert(key, value);

            match self.peek().kind {
                TokenKind::Comma => {
                    self.bump();
                }
                TokenKind::RBrace => {}
                _ => return Err(self.unexpected("',' or '}'")),
            }
        }
    }

    fn parse_array(&mut self) -> Result<Value> {
        self.expect(TokenKind::LBracket, "'['")?;
        let mut items = Vec::new();

        loop {
            if self.peek().kind == TokenKind::RBracket {
                self.bump();
                return Ok(Value::Array(items));
            }

            items.push(self.parse_value()?);

            match self.peek().kind {
                TokenKind::Comma => {
                    self.bump();
                }
                TokenKind::RBracket => {}
                _ => return Err(self.unexpected("',' or ']'")),
            }
        }
    }
}

fn parse_number(text: &str, token: &Token) -> Result<Value> {
    let text = text.strip_prefix('+').unwrap_or(text);
    if let Ok(n) = text.parse::<i64>() {
        return Ok(Value::Number(n.into()));
    }
    if let Ok(n) = text.parse::<u64>() {
        return Ok(Value::Number(n.into()));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .ok_or_else(|| Error::InvalidNumber {
            text: text.to_string(),
            line: token.line,
            column: token.column,
        })
}

fn not_a_literal(name: String, token: &Token) -> Error {
    Error::NotALiteral { name, line: token.line, column: token.column }
}
