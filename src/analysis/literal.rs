//! A forgiving parser for Python-literal-like text.
//!
//! Models asked for JSON sometimes answer with `{'key': ['a', 'b'], ...}`,
//! `True`/`None`, tuples or trailing commas. This parser accepts that looser
//! grammar and produces the same [`Value`] tree a strict JSON decoder would.

use serde_json::{Map, Number, Value};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum LiteralError {
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unexpected character {found:?} at position {position}")]
    Unexpected { found: char, position: usize },
    #[error("trailing input at position {0}")]
    TrailingInput(usize),
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
    #[error("invalid escape sequence at position {0}")]
    InvalidEscape(usize),
    #[error("dictionary key at position {0} is not a string or number")]
    InvalidKey(usize),
    #[error("nesting deeper than 128 levels at position {0}")]
    TooDeep(usize),
}

/// Same recursion limit as serde_json.
const MAX_DEPTH: usize = 128;

type LiteralResult<T> = Result<T, LiteralError>;

/// Parses the whole input as a single literal.
pub fn parse_literal(input: &str) -> LiteralResult<Value> {
    let mut parser = Parser {
        chars: input.chars().collect(),
        pos: 0,
        depth: 0,
    };
    let value = parser.value()?;
    parser.skip_trivia();
    if parser.pos < parser.chars.len() {
        return Err(LiteralError::TrailingInput(parser.pos));
    }
    Ok(value)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> LiteralResult<char> {
        let c = self.peek().ok_or(LiteralError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(c)
    }

    fn unexpected(&self) -> LiteralError {
        match self.peek() {
            Some(found) => LiteralError::Unexpected {
                found,
                position: self.pos,
            },
            None => LiteralError::UnexpectedEnd,
        }
    }

    fn expect(&mut self, want: char) -> LiteralResult<()> {
        self.skip_trivia();
        if self.peek() == Some(want) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    /// Skips whitespace and `#` comments.
    fn skip_trivia(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.pos += 1;
            } else if c == '#' {
                while let Some(c) = self.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn value(&mut self) -> LiteralResult<Value> {
        self.skip_trivia();
        match self.peek() {
            None => Err(LiteralError::UnexpectedEnd),
            Some('{' | '[' | '(') => {
                if self.depth >= MAX_DEPTH {
                    return Err(LiteralError::TooDeep(self.pos));
                }
                self.depth += 1;
                let value = self.container();
                self.depth -= 1;
                value
            }
            Some('\'' | '"') => self.strings().map(Value::String),
            Some(c) if c == '-' || c == '+' || c == '.' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_alphabetic() || c == '_' => self.keyword(),
            Some(_) => Err(self.unexpected()),
        }
    }

    fn container(&mut self) -> LiteralResult<Value> {
        match self.peek() {
            Some('{') => self.dict(),
            Some('(') => self.tuple(),
            _ => {
                self.expect('[')?;
                Ok(Value::Array(self.sequence(']')?.0))
            }
        }
    }

    fn dict(&mut self) -> LiteralResult<Value> {
        self.expect('{')?;
        let mut map = Map::new();
        loop {
            self.skip_trivia();
            if self.peek() == Some('}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }

            let key_position = self.pos;
            let key = match self.value()? {
                Value::String(s) => s,
                Value::Number(n) => n.to_string(),
                _ => return Err(LiteralError::InvalidKey(key_position)),
            };
            self.expect(':')?;
            let value = self.value()?;
            map.insert(key, value);

            self.skip_trivia();
            match self.bump()? {
                ',' => continue,
                '}' => return Ok(Value::Object(map)),
                found => {
                    return Err(LiteralError::Unexpected {
                        found,
                        position: self.pos - 1,
                    })
                }
            }
        }
    }

    /// Parses comma separated values up to `close`, which must already be
    /// past the opening delimiter. Also reports whether any comma was seen.
    fn sequence(&mut self, close: char) -> LiteralResult<(Vec<Value>, bool)> {
        let mut items = Vec::new();
        let mut saw_comma = false;
        loop {
            self.skip_trivia();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok((items, saw_comma));
            }

            items.push(self.value()?);

            self.skip_trivia();
            match self.bump()? {
                ',' => saw_comma = true,
                c if c == close => return Ok((items, saw_comma)),
                found => {
                    return Err(LiteralError::Unexpected {
                        found,
                        position: self.pos - 1,
                    })
                }
            }
        }
    }

    fn tuple(&mut self) -> LiteralResult<Value> {
        self.expect('(')?;
        let (mut items, saw_comma) = self.sequence(')')?;
        // `(x)` is just a parenthesised value
        if items.len() == 1 && !saw_comma {
            return Ok(items.remove(0));
        }
        Ok(Value::Array(items))
    }

    /// Parses one or more adjacent string literals and concatenates them.
    fn strings(&mut self) -> LiteralResult<String> {
        let mut out = self.string()?;
        loop {
            let checkpoint = self.pos;
            self.skip_trivia();
            match self.peek() {
                Some('\'' | '"') => out.push_str(&self.string()?),
                _ => {
                    self.pos = checkpoint;
                    return Ok(out);
                }
            }
        }
    }

    fn string(&mut self) -> LiteralResult<String> {
        let quote = self.bump()?;
        let mut out = String::new();
        loop {
            match self.bump()? {
                c if c == quote => return Ok(out),
                '\\' => {
                    let escape_position = self.pos - 1;
                    match self.bump()? {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        '\\' => out.push('\\'),
                        '\'' => out.push('\''),
                        '"' => out.push('"'),
                        '\n' => {}
                        'x' => out.push(self.hex_escape(2, escape_position)?),
                        'u' => out.push(self.hex_escape(4, escape_position)?),
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                c => out.push(c),
            }
        }
    }

    fn hex_escape(&mut self, digits: usize, escape_position: usize) -> LiteralResult<char> {
        let mut code = 0u32;
        for _ in 0..digits {
            let digit = self
                .bump()?
                .to_digit(16)
                .ok_or(LiteralError::InvalidEscape(escape_position))?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or(LiteralError::InvalidEscape(escape_position))
    }

    fn number(&mut self) -> LiteralResult<Value> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.pos += 1;
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' | '_' => {}
                '.' => is_float = true,
                'e' | 'E' => {
                    is_float = true;
                    if matches!(self.chars.get(self.pos + 1), Some('-' | '+')) {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
            self.pos += 1;
        }

        let raw: String = self.chars[start..self.pos].iter().collect();
        let text = raw.replace('_', "");
        let number = if is_float {
            text.parse::<f64>().ok().and_then(Number::from_f64)
        } else {
            text.parse::<i64>()
                .map(Number::from)
                .ok()
                .or_else(|| text.parse::<f64>().ok().and_then(Number::from_f64))
        };
        number
            .map(Value::Number)
            .ok_or(LiteralError::InvalidNumber(raw))
    }

    fn keyword(&mut self) -> LiteralResult<Value> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' {
                self.pos += 1;
            } else {
                break;
            }
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        match word.as_str() {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            _ => {
                self.pos = start;
                Err(self.unexpected())
            }
        }
    }
}
