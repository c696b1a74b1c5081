//! Tokenizer for template source text.
//!
//! The lexer splits a source into literal text and `{{ ... }}` actions, and
//! tokenizes the inside of each action. Trim markers (`{{- ` and ` -}}`) are
//! applied here, so the parser never sees the whitespace they remove.
//! Comments (`{{/* ... */}}`) produce no tokens at all.

use crate::error::{Location, TemplateError};

const LEFT_DELIM: &str = "{{";
const RIGHT_DELIM: &str = "}}";
const LEFT_COMMENT: &str = "/*";
const RIGHT_COMMENT: &str = "*/";

/// A numeric literal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Int(i64),
    Float(f64),
}

/// Token types produced by the tokenizer.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    /// Literal text outside of actions.
    Text(String),
    /// `{{`
    LeftDelim,
    /// `}}`
    RightDelim,
    /// A keyword or function name.
    Identifier(String),
    /// `.a.b.c`
    Field(Vec<String>),
    /// `$x` or `$x.a.b`; the name includes the `$`.
    Variable(String, Vec<String>),
    /// `.`
    Dot,
    /// A quoted string, already unescaped.
    Str(String),
    Number(Number),
    Bool(bool),
    Nil,
    Pipe,
    LeftParen,
    RightParen,
    /// `:=`
    Declare,
    /// `=`
    Assign,
    Comma,
}

/// A token with its byte offset in the source.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub pos: usize,
    /// Whether whitespace separated this token from the previous one.
    pub space_before: bool,
}

/// Tokenizes `input`, reporting errors against template `name`.
pub(crate) fn tokenize(name: &str, input: &str) -> Result<Vec<Token>, TemplateError> {
    Lexer {
        name,
        input,
        pos: 0,
        tokens: Vec::new(),
    }
    .run()
}

struct Lexer<'a> {
    name: &'a str,
    input: &'a str,
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn run(mut self) -> Result<Vec<Token>, TemplateError> {
        let input = self.input;
        let mut trim_leading = false;

        while self.pos < input.len() {
            let rest = &input[self.pos..];
            let delim = rest.find(LEFT_DELIM);
            let raw = match delim {
                Some(offset) => &rest[..offset],
                None => rest,
            };

            let lead = if trim_leading {
                raw.len() - raw.trim_start_matches(is_space).len()
            } else {
                0
            };
            let mut text = &raw[lead..];
            let text_pos = self.pos + lead;
            self.pos += raw.len();

            if delim.is_none() {
                self.push_text(text_pos, text);
                break;
            }

            let after_delim = &input[self.pos + LEFT_DELIM.len()..];
            let trim_left = has_left_trim_marker(after_delim);
            if trim_left {
                text = text.trim_end_matches(is_space);
            }
            self.push_text(text_pos, text);

            let delim_pos = self.pos;
            self.pos += LEFT_DELIM.len();
            if trim_left {
                self.pos += 2;
            }
            trim_leading = self.lex_action(delim_pos)?;
        }

        Ok(self.tokens)
    }

    fn push_text(&mut self, pos: usize, text: &str) {
        if !text.is_empty() {
            self.push(TokenKind::Text(text.to_string()), pos, false);
        }
    }

    fn push(&mut self, kind: TokenKind, pos: usize, space_before: bool) {
        self.tokens.push(Token {
            kind,
            pos,
            space_before,
        });
    }

    fn error(&self, pos: usize, message: impl Into<String>) -> TemplateError {
        TemplateError::Parse {
            location: Location::at(self.name, self.input, pos),
            message: message.into(),
        }
    }

    /// Lexes one action starting after its left delimiter.
    ///
    /// Returns whether the action ended with a right trim marker.
    fn lex_action(&mut self, delim_pos: usize) -> Result<bool, TemplateError> {
        let input = self.input;

        if input[self.pos..].starts_with(LEFT_COMMENT) {
            return self.lex_comment(delim_pos);
        }

        self.push(TokenKind::LeftDelim, delim_pos, false);
        let mut paren_depth = 0usize;

        loop {
            let ws_start = self.pos;
            self.skip_space();
            let space_before = self.pos > ws_start;
            let rest = &input[self.pos..];

            let Some(c) = rest.chars().next() else {
                return Err(self.error(delim_pos, "unclosed action"));
            };

            let closes_with_trim = space_before && rest.starts_with("-}}");
            if closes_with_trim || rest.starts_with(RIGHT_DELIM) {
                if paren_depth > 0 {
                    return Err(self.error(self.pos, "unclosed left paren"));
                }
                self.push(TokenKind::RightDelim, self.pos, space_before);
                self.pos += if closes_with_trim { 3 } else { 2 };
                return Ok(closes_with_trim);
            }

            match c {
                '|' => self.single(TokenKind::Pipe, 1, space_before),
                '(' => {
                    paren_depth += 1;
                    self.single(TokenKind::LeftParen, 1, space_before);
                }
                ')' => {
                    if paren_depth == 0 {
                        return Err(self.error(self.pos, "unexpected right paren"));
                    }
                    paren_depth -= 1;
                    self.single(TokenKind::RightParen, 1, space_before);
                }
                ',' => self.single(TokenKind::Comma, 1, space_before),
                ':' => {
                    if !rest.starts_with(":=") {
                        return Err(self.error(self.pos, "expected :="));
                    }
                    self.single(TokenKind::Declare, 2, space_before);
                }
                '=' => self.single(TokenKind::Assign, 1, space_before),
                '"' => self.lex_quote(space_before)?,
                '`' => self.lex_raw_quote(space_before)?,
                '\'' => self.lex_char(space_before)?,
                '$' => self.lex_variable(space_before),
                '.' if next_is_digit(rest, 1) => self.lex_number(space_before)?,
                '.' => self.lex_field(space_before),
                '0'..='9' => self.lex_number(space_before)?,
                '+' | '-' if next_is_digit(rest, 1) || rest[1..].starts_with('.') => {
                    self.lex_number(space_before)?
                }
                c if is_ident_start(c) => self.lex_identifier(space_before),
                other => {
                    return Err(self.error(self.pos, format!("unexpected {:?} in command", other)))
                }
            }
        }
    }

    fn lex_comment(&mut self, delim_pos: usize) -> Result<bool, TemplateError> {
        let input = self.input;
        let Some(end) = input[self.pos..].find(RIGHT_COMMENT) else {
            return Err(self.error(delim_pos, "unclosed comment"));
        };
        self.pos += end + RIGHT_COMMENT.len();

        let rest = &input[self.pos..];
        if rest.starts_with(RIGHT_DELIM) {
            self.pos += RIGHT_DELIM.len();
            return Ok(false);
        }
        let trimmed = rest.trim_start_matches(is_space);
        if trimmed.len() < rest.len() && trimmed.starts_with("-}}") {
            self.pos += rest.len() - trimmed.len() + 3;
            return Ok(true);
        }
        Err(self.error(delim_pos, "comment ends before closing delimiter"))
    }

    fn skip_space(&mut self) {
        let input = self.input;
        let rest = &input[self.pos..];
        let trimmed = rest.trim_start_matches(is_space);
        self.pos += rest.len() - trimmed.len();
    }

    fn single(&mut self, kind: TokenKind, len: usize, space_before: bool) {
        self.push(kind, self.pos, space_before);
        self.pos += len;
    }

    /// Reads `[A-Za-z0-9_]*` starting at the current position.
    fn read_ident(&mut self) -> &'a str {
        let input = self.input;
        let rest = &input[self.pos..];
        let len = rest
            .find(|c: char| !is_ident_char(c))
            .unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    /// Reads `.ident` segments while they follow immediately.
    fn read_field_chain(&mut self) -> Vec<String> {
        let mut fields = Vec::new();
        loop {
            let input = self.input;
            let rest = &input[self.pos..];
            let starts_field = rest.starts_with('.')
                && rest[1..].chars().next().is_some_and(is_ident_start);
            if !starts_field {
                return fields;
            }
            self.pos += 1;
            fields.push(self.read_ident().to_string());
        }
    }

    fn lex_field(&mut self, space_before: bool) {
        let start = self.pos;
        let fields = self.read_field_chain();
        if fields.is_empty() {
            self.pos += 1;
            self.push(TokenKind::Dot, start, space_before);
        } else {
            self.push(TokenKind::Field(fields), start, space_before);
        }
    }

    fn lex_variable(&mut self, space_before: bool) {
        let start = self.pos;
        self.pos += 1;
        let name = format!("${}", self.read_ident());
        let fields = self.read_field_chain();
        self.push(TokenKind::Variable(name, fields), start, space_before);
    }

    fn lex_identifier(&mut self, space_before: bool) {
        let start = self.pos;
        let word = self.read_ident();
        let kind = match word {
            "true" => TokenKind::Bool(true),
            "false" => TokenKind::Bool(false),
            "nil" => TokenKind::Nil,
            _ => TokenKind::Identifier(word.to_string()),
        };
        self.push(kind, start, space_before);
    }

    fn lex_number(&mut self, space_before: bool) -> Result<(), TemplateError> {
        let start = self.pos;
        let input = self.input;
        let rest = &input[self.pos..];
        let mut len = 0;
        let mut prev = '\0';
        for (i, c) in rest.char_indices() {
            let sign = (c == '+' || c == '-') && (i == 0 || matches!(prev, 'e' | 'E'));
            if !(c.is_ascii_alphanumeric() || c == '_' || c == '.' || sign) {
                break;
            }
            len = i + c.len_utf8();
            prev = c;
        }
        let text = &rest[..len];
        self.pos += len;

        let number =
            parse_number(text).ok_or_else(|| self.error(start, format!("bad number syntax: {:?}", text)))?;
        self.push(TokenKind::Number(number), start, space_before);
        Ok(())
    }

    fn lex_quote(&mut self, space_before: bool) -> Result<(), TemplateError> {
        let start = self.pos;
        let input = self.input;
        let rest = &input[self.pos + 1..];
        let mut value = String::new();
        let mut chars = rest.char_indices();

        while let Some((i, c)) = chars.next() {
            match c {
                '"' => {
                    self.pos += 1 + i + 1;
                    self.push(TokenKind::Str(value), start, space_before);
                    return Ok(());
                }
                '\n' => break,
                '\\' => {
                    let Some((_, escaped)) = chars.next() else {
                        break;
                    };
                    match escaped {
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        'r' => value.push('\r'),
                        '0' => value.push('\0'),
                        'a' => value.push('\u{07}'),
                        'b' => value.push('\u{08}'),
                        'f' => value.push('\u{0c}'),
                        'v' => value.push('\u{0b}'),
                        '\\' | '"' | '\'' => value.push(escaped),
                        'x' | 'u' | 'U' => {
                            let width = match escaped {
                                'x' => 2,
                                'u' => 4,
                                _ => 8,
                            };
                            let digits: String = chars.by_ref().take(width).map(|(_, d)| d).collect();
                            let decoded = u32::from_str_radix(&digits, 16)
                                .ok()
                                .filter(|_| digits.len() == width)
                                .and_then(char::from_u32);
                            match decoded {
                                Some(ch) => value.push(ch),
                                None => {
                                    return Err(self.error(start, "invalid escape sequence in string"))
                                }
                            }
                        }
                        other => {
                            return Err(self.error(
                                start,
                                format!("unknown escape sequence: \\{}", other),
                            ))
                        }
                    }
                }
                c => value.push(c),
            }
        }

        Err(self.error(start, "unterminated quoted string"))
    }

    fn lex_raw_quote(&mut self, space_before: bool) -> Result<(), TemplateError> {
        let start = self.pos;
        let input = self.input;
        let rest = &input[self.pos + 1..];
        let Some(end) = rest.find('`') else {
            return Err(self.error(start, "unterminated raw quoted string"));
        };
        let value = rest[..end].to_string();
        self.pos += 1 + end + 1;
        self.push(TokenKind::Str(value), start, space_before);
        Ok(())
    }

    fn lex_char(&mut self, space_before: bool) -> Result<(), TemplateError> {
        let start = self.pos;
        let input = self.input;
        let rest = &input[self.pos + 1..];
        let mut chars = rest.char_indices();
        let value = match chars.next() {
            Some((_, '\\')) => match chars.next() {
                Some((_, 'n')) => '\n',
                Some((_, 't')) => '\t',
                Some((_, 'r')) => '\r',
                Some((_, '0')) => '\0',
                Some((_, c @ ('\\' | '\'' | '"'))) => c,
                _ => return Err(self.error(start, "invalid character constant")),
            },
            Some((_, '\'')) | Some((_, '\n')) | None => {
                return Err(self.error(start, "invalid character constant"))
            }
            Some((_, c)) => c,
        };
        match chars.next() {
            Some((i, '\'')) => {
                self.pos += 1 + i + 1;
                self.push(
                    TokenKind::Number(Number::Int(i64::from(u32::from(value)))),
                    start,
                    space_before,
                );
                Ok(())
            }
            _ => Err(self.error(start, "unterminated character constant")),
        }
    }
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn next_is_digit(s: &str, offset: usize) -> bool {
    s[offset..].chars().next().is_some_and(|c| c.is_ascii_digit())
}

/// A left trim marker is a dash followed by whitespace, right after `{{`.
fn has_left_trim_marker(after_delim: &str) -> bool {
    after_delim.starts_with('-') && after_delim[1..].chars().next().is_some_and(is_space)
}

fn parse_number(text: &str) -> Option<Number> {
    let cleaned = text.replace('_', "");
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };

    let radix = [("0x", 16), ("0X", 16), ("0o", 8), ("0O", 8), ("0b", 2), ("0B", 2)]
        .iter()
        .find_map(|(prefix, radix)| digits.strip_prefix(prefix).map(|d| (d, *radix)));
    if let Some((body, radix)) = radix {
        let magnitude = i64::from_str_radix(body, radix).ok()?;
        return Some(Number::Int(if negative { -magnitude } else { magnitude }));
    }

    if !digits.chars().all(|c| c.is_ascii_digit() || matches!(c, '.' | 'e' | 'E' | '+' | '-')) {
        return None;
    }
    if let Ok(int) = cleaned.parse::<i64>() {
        return Some(Number::Int(int));
    }
    cleaned.parse::<f64>().ok().map(Number::Float)
}
