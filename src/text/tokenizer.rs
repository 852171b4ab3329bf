use std::str::Chars;

use serde::Serialize;

use crate::error::{ParseError, Result, SithError};
use crate::math::{Vector2f, Vector3f, Vector4f};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenType {
    Invalid,
    Eof,
    Eol,
    Identifier,
    HexInteger,
    Integer,
    Float,
    String,
    Punctuator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub begin_line: usize,
    pub begin_column: usize,
    pub end_line: usize,
    pub end_column: usize,
}

impl Token {
    fn new(line: usize, column: usize) -> Self {
        Self {
            token_type: TokenType::Invalid,
            value: String::new(),
            begin_line: line,
            begin_column: column,
            end_line: line,
            end_column: column,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(
            self.token_type,
            TokenType::Integer | TokenType::HexInteger | TokenType::Float
        )
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> SithError {
        ParseError::new(message, self.begin_line, self.begin_column).into()
    }

    pub fn to_int_number(&self) -> Result<i64> {
        match self.token_type {
            TokenType::Integer => self
                .value
                .parse::<i64>()
                .map_err(|_| self.error(format!("Expected integer number, found '{}'!", self.value))),
            TokenType::HexInteger => {
                let (negative, body) = match self.value.strip_prefix('-') {
                    Some(rest) => (true, rest),
                    None => (false, self.value.trim_start_matches('+')),
                };
                let digits = &body[2.min(body.len())..];
                let value = i64::from_str_radix(digits, 16).map_err(|_| {
                    self.error(format!("Expected hex integer number, found '{}'!", self.value))
                })?;
                Ok(if negative { -value } else { value })
            }
            _ => Err(self.error(format!("Expected integer number, found '{}'!", self.value))),
        }
    }

    pub fn to_float_number(&self) -> Result<f32> {
        match self.token_type {
            TokenType::Float | TokenType::Integer => self
                .value
                .parse::<f32>()
                .or_else(|_| parse_special_float(&self.value).ok_or(()))
                .map_err(|_| self.error(format!("Expected float number, found '{}'!", self.value))),
            _ => Err(self.error(format!("Expected float number, found '{}'!", self.value))),
        }
    }
}

/// Tolerates a truncated exponent ("1e", "2.5e-") by dropping it.
fn parse_special_float(value: &str) -> Option<f32> {
    let trimmed = value.trim_end_matches(['e', 'E', '+', '-']);
    trimmed.parse::<f32>().ok()
}

fn is_punct(c: char) -> bool {
    c.is_ascii_graphic() && !c.is_ascii_alphanumeric()
}

fn is_identifier_prefix(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Character-stream lexer for the Sith text formats.
///
/// Whitespace and `#` comments are skipped. End of line is skipped as well
/// unless `report_eol` is set, in which case it is returned as [`TokenType::Eol`].
pub struct Tokenizer<'a> {
    chars: Chars<'a>,
    current: Option<char>,
    next: Option<char>,
    line: usize,
    column: usize,
    pub report_eol: bool,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        let mut chars = source.chars();
        let current = chars.next();
        let next = chars.next();
        Self {
            chars,
            current,
            next,
            line: 1,
            column: 1,
            report_eol: false,
        }
    }

    pub fn line(&self) -> usize {
        self.line
    }

    pub fn column(&self) -> usize {
        self.column
    }

    pub fn get_token(&mut self) -> Result<Token> {
        self.skip_whitespace();

        let mut t = Token::new(self.line, self.column);
        match self.current {
            None => t.token_type = TokenType::Eof,
            Some('\n') => {
                t.token_type = TokenType::Eol;
                self.read_next();
            }
            Some('"') => self.read_string(&mut t)?,
            Some(c) if is_identifier_prefix(c) => self.read_identifier(&mut t),
            Some(c) if c.is_ascii_digit() => self.read_numeric_literal(&mut t),
            Some(c) if is_punct(c) => {
                let next_is_digit = self.next.is_some_and(|n| n.is_ascii_digit());
                if (c == '.' && next_is_digit) || (c == '-' && (next_is_digit || self.next == Some('.'))) {
                    self.read_numeric_literal(&mut t);
                } else {
                    t.token_type = TokenType::Punctuator;
                    t.value.push(c);
                    self.read_next();
                }
            }
            Some(c) => {
                t.token_type = TokenType::Invalid;
                t.value.push(c);
                self.read_next();
            }
        }

        t.end_line = self.line;
        t.end_column = self.column;
        Ok(t)
    }

    /// Reads raw text up to (not including) the first character for which
    /// `is_delim` returns true, after skipping leading whitespace.
    pub fn get_delimited_string_token<F>(&mut self, is_delim: F) -> Token
    where
        F: Fn(char) -> bool,
    {
        self.skip_whitespace();

        let mut t = Token::new(self.line, self.column);
        while let Some(c) = self.current {
            if is_delim(c) {
                break;
            }
            t.value.push(c);
            self.read_next();
        }

        t.token_type = TokenType::String;
        t.end_line = self.line;
        t.end_column = self.column;
        t
    }

    pub fn get_identifier(&mut self) -> Result<String> {
        let t = self.get_token()?;
        if t.token_type != TokenType::Identifier {
            return Err(t.error(format!("Expected identifier, found '{}'!", t.value)));
        }
        Ok(t.value)
    }

    pub fn get_string(&mut self) -> Result<String> {
        let t = self.get_token()?;
        if t.token_type != TokenType::String {
            return Err(t.error(format!("Expected string, found '{}'!", t.value)));
        }
        Ok(t.value)
    }

    pub fn get_space_delimited_string(&mut self) -> Result<String> {
        let t = self.get_delimited_string_token(char::is_whitespace);
        if t.value.is_empty() {
            return Err(t.error("Expected string, found ''!"));
        }
        Ok(t.value)
    }

    /// Reads the rest of the current line, trimmed. Used for free-text names.
    pub fn get_line_string(&mut self) -> Result<String> {
        let t = self.get_delimited_string_token(|c| c == '\n');
        let value = t.value.trim();
        if value.is_empty() {
            return Err(t.error("Expected string, found ''!"));
        }
        Ok(value.to_string())
    }

    pub fn get_int_number(&mut self) -> Result<i64> {
        self.get_token()?.to_int_number()
    }

    pub fn get_float_number(&mut self) -> Result<f32> {
        self.get_token()?.to_float_number()
    }

    pub fn get_pair_of_ints(&mut self) -> Result<(i64, i64)> {
        let x = self.get_int_number()?;
        self.assert_punctuator(",")?;
        let y = self.get_int_number()?;
        Ok((x, y))
    }

    pub fn get_vector2f(&mut self) -> Result<Vector2f> {
        let x = self.get_float_number()?;
        let y = self.get_float_number()?;
        Ok(Vector2f::new(x, y))
    }

    pub fn get_vector3f(&mut self) -> Result<Vector3f> {
        let x = self.get_float_number()?;
        let y = self.get_float_number()?;
        let z = self.get_float_number()?;
        Ok(Vector3f::new(x, y, z))
    }

    /// Reads either four bare floats, or the tuple form `(x/y/z/w)`.
    pub fn get_vector4f(&mut self) -> Result<Vector4f> {
        let t = self.get_token()?;
        if t.is_number() {
            let x = t.to_float_number()?;
            let y = self.get_float_number()?;
            let z = self.get_float_number()?;
            let w = self.get_float_number()?;
            return Ok(Vector4f::new(x, y, z, w));
        }

        if t.token_type != TokenType::Punctuator || t.value != "(" {
            return Err(t.error(format!("Expected punctuator '(', found '{}'!", t.value)));
        }
        let x = self.get_float_number()?;
        self.assert_punctuator("/")?;
        let y = self.get_float_number()?;
        self.assert_punctuator("/")?;
        let z = self.get_float_number()?;
        self.assert_punctuator("/")?;
        let w = self.get_float_number()?;
        self.assert_punctuator(")")?;
        Ok(Vector4f::new(x, y, z, w))
    }

    /// Case-insensitive.
    pub fn assert_identifier(&mut self, id: &str) -> Result<()> {
        let t = self.get_token()?;
        if t.token_type != TokenType::Identifier || !t.value.eq_ignore_ascii_case(id) {
            return Err(t.error(format!("Expected identifier '{}', found '{}'!", id, t.value)));
        }
        Ok(())
    }

    pub fn assert_integer(&mut self, num: i64) -> Result<()> {
        let t = self.get_token()?;
        let matches = t.token_type == TokenType::Integer && t.to_int_number().ok() == Some(num);
        if !matches {
            return Err(t.error(format!("Expected integer '{}', found '{}'!", num, t.value)));
        }
        Ok(())
    }

    pub fn assert_punctuator(&mut self, punc: &str) -> Result<()> {
        let t = self.get_token()?;
        if t.token_type != TokenType::Punctuator || t.value != punc {
            return Err(t.error(format!("Expected punctuator '{}', found '{}'!", punc, t.value)));
        }
        Ok(())
    }

    /// Asserts `label` followed by `:`.
    pub fn assert_label(&mut self, label: &str) -> Result<()> {
        self.assert_identifier(label)?;
        self.assert_punctuator(":")
    }

    pub fn assert_end_of_file(&mut self) -> Result<()> {
        let t = self.get_token()?;
        if t.token_type != TokenType::Eof {
            return Err(t.error(format!("Expected end of file, found '{}'!", t.value)));
        }
        Ok(())
    }

    /// Advances to the next `SECTION:` marker. Returns `false` at end of file.
    pub fn skip_to_next_section(&mut self) -> Result<bool> {
        loop {
            let t = self.get_token()?;
            match t.token_type {
                TokenType::Eof => return Ok(false),
                TokenType::Identifier if t.value.eq_ignore_ascii_case("SECTION") => {
                    self.assert_punctuator(":")?;
                    return Ok(true);
                }
                _ => {}
            }
        }
    }

    fn read_next(&mut self) {
        self.column += 1;
        if self.current == Some('\n') {
            self.line += 1;
            self.column = 1;
        }
        self.current = self.next;
        self.next = self.chars.next();
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.current {
            if c == '\n' && self.report_eol {
                return;
            } else if c.is_whitespace() {
                self.read_next();
            } else if c == '#' {
                self.skip_to_next_line();
            } else {
                return;
            }
        }
    }

    fn skip_to_next_line(&mut self) {
        while !matches!(self.current, None | Some('\n')) {
            self.read_next();
        }
    }

    fn read_digits(&mut self, token: &mut Token, hex: bool) {
        while let Some(c) = self.current {
            let ok = if hex { c.is_ascii_hexdigit() } else { c.is_ascii_digit() };
            if !ok {
                break;
            }
            token.value.push(c);
            self.read_next();
        }
    }

    fn read_numeric_literal(&mut self, token: &mut Token) {
        if let Some(sign @ ('-' | '+')) = self.current {
            token.value.push(sign);
            self.read_next();
        }

        if self.current == Some('0') && matches!(self.next, Some('x' | 'X')) {
            token.token_type = TokenType::HexInteger;
            token.value.push('0');
            token.value.push('x');
            self.read_next();
            self.read_next();
            self.read_digits(token, true);
            return;
        }

        token.token_type = TokenType::Integer;
        self.read_digits(token, false);

        // '#' guard keeps tokens like ".#QNAN0" from swallowing the comment marker
        let fraction_follows = self.next.is_some_and(|n| n.is_ascii_digit() || n == '#');
        if self.current == Some('.') && fraction_follows {
            if !token.value.ends_with(|c: char| c.is_ascii_digit()) {
                token.value.push('0');
            }
            token.value.push('.');
            self.read_next();
            self.read_digits(token, false);
            token.token_type = TokenType::Float;
        }

        if matches!(self.current, Some('e' | 'E')) {
            token.value.push('e');
            self.read_next();
            if let Some(sign @ ('-' | '+')) = self.current {
                token.value.push(sign);
                self.read_next();
            }
            self.read_digits(token, false);
            token.token_type = TokenType::Float;
        }
    }

    fn read_identifier(&mut self, token: &mut Token) {
        token.token_type = TokenType::Identifier;
        while let Some(c) = self.current {
            if !is_identifier_char(c) {
                break;
            }
            token.value.push(c);
            self.read_next();
        }
    }

    fn read_string(&mut self, token: &mut Token) -> Result<()> {
        loop {
            self.read_next();
            match self.current {
                None => {
                    return Err(ParseError::new("Unexpected end of a file!", self.line, self.column).into())
                }
                Some('\n') => {
                    return Err(ParseError::new(
                        "Unexpected newline in string literal!",
                        self.line,
                        self.column,
                    )
                    .into())
                }
                Some('"') => {
                    token.token_type = TokenType::String;
                    self.read_next();
                    return Ok(());
                }
                Some('\\') => {
                    self.read_next();
                    match self.current {
                        Some('\n') => {}
                        Some(c @ ('\'' | '"' | '\\')) => token.value.push(c),
                        Some('n') => token.value.push('\n'),
                        Some('t') => token.value.push('\t'),
                        _ => {
                            token.token_type = TokenType::Invalid;
                            self.read_next();
                            return Ok(());
                        }
                    }
                }
                Some(c) => token.value.push(c),
            }
        }
    }
}
