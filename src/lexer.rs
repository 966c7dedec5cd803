// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::cmp;
use core::fmt::{self, Debug, Formatter};
use core::iter::Peekable;
use core::str::CharIndices;
use std::sync::Arc;

use anyhow::{anyhow, bail, Result};

#[derive(Clone)]
struct SourceInternal {
    pub file: String,
    pub contents: String,
    pub lines: Vec<(u32, u32)>,
}

/// Rule text together with the line table used to render diagnostics.
#[derive(Clone)]
pub struct Source {
    src: Arc<SourceInternal>,
}

impl cmp::PartialEq for Source {
    fn eq(&self, other: &Source) -> bool {
        Arc::ptr_eq(&self.src, &other.src)
    }
}

impl cmp::Eq for Source {}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        self.src.file.fmt(f)
    }
}

impl Source {
    pub fn from_contents(file: String, contents: String) -> Result<Source> {
        let max_size = u32::MAX as usize - 2; // Account for rows, cols possibly starting at 1, EOF etc.
        if contents.len() > max_size {
            bail!("{file} exceeds maximum allowed rule size {max_size}");
        }
        let mut lines = vec![];
        let mut prev_ch = ' ';
        let mut prev_pos = 0u32;
        let mut start = 0u32;
        for (i, ch) in contents.char_indices() {
            if ch == '\n' {
                let end = match prev_ch {
                    '\r' => prev_pos,
                    _ => i as u32,
                };
                lines.push((start, end));
                start = i as u32 + 1;
            }
            prev_ch = ch;
            prev_pos = i as u32;
        }

        if (start as usize) < contents.len() {
            lines.push((start, contents.len() as u32));
        } else if contents.is_empty() {
            lines.push((0, 0));
        } else {
            let s = (contents.len() - 1) as u32;
            lines.push((s, s));
        }
        Ok(Self {
            src: Arc::new(SourceInternal {
                file,
                contents,
                lines,
            }),
        })
    }

    pub fn file(&self) -> &String {
        &self.src.file
    }

    pub fn contents(&self) -> &String {
        &self.src.contents
    }

    pub fn line(&self, idx: u32) -> &str {
        let idx = idx as usize;
        if idx < self.src.lines.len() {
            let (start, end) = self.src.lines[idx];
            &self.src.contents[start as usize..end as usize]
        } else {
            ""
        }
    }

    pub fn message(&self, line: u32, col: u32, kind: &str, msg: &str) -> String {
        if line as usize > self.src.lines.len() || line == 0 {
            return format!("{}: invalid line {} specified", self.src.file, line);
        }

        let line_str = format!("{line}");
        let line_num_width = line_str.len() + 1;
        let col_spaces = col.saturating_sub(1) as usize;

        format!(
            "\n--> {}:{}:{}\n{:<line_num_width$}|\n\
		{:<line_num_width$}| {}\n\
		{:<line_num_width$}| {:<col_spaces$}^\n\
		{}: {}",
            self.src.file,
            line,
            col,
            "",
            line,
            self.line(line - 1),
            "",
            "",
            kind,
            msg
        )
    }

    pub fn error(&self, line: u32, col: u32, msg: &str) -> anyhow::Error {
        anyhow!(self.message(line, col, "error", msg))
    }
}

/// Location of a token or AST node within its [`Source`].
#[derive(Clone)]
pub struct Span {
    pub source: Source,
    pub line: u32,
    pub col: u32,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn text(&self) -> &str {
        &self.source.contents()[self.start as usize..self.end as usize]
    }

    pub fn message(&self, kind: &str, msg: &str) -> String {
        self.source.message(self.line, self.col, kind, msg)
    }

    pub fn error(&self, msg: &str) -> anyhow::Error {
        self.source.error(self.line, self.col, msg)
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), fmt::Error> {
        let t = self.text().escape_debug().to_string();
        let max = 32;
        let (txt, trailer) = if t.len() > max {
            (&t[0..max], "...")
        } else {
            (t.as_str(), "")
        };

        f.write_fmt(format_args!(
            "{}:{}:{}:{}, \"{}{}\"",
            self.line, self.col, self.start, self.end, txt, trailer
        ))
    }
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub enum TokenKind {
    Symbol,
    String,
    Pattern,
    Regexp,
    Number,
    Duration,
    Ident,
    Eof,
}

#[derive(Debug, Clone)]
pub struct Token(pub TokenKind, pub Span);

/// Duration suffixes and their length in nanoseconds.
const DURATION_UNITS: [(&str, i64); 6] = [
    ("ns", 1),
    ("us", 1_000),
    ("ms", 1_000_000),
    ("s", 1_000_000_000),
    ("m", 60 * 1_000_000_000),
    ("h", 60 * 60 * 1_000_000_000),
];

/// Keywords that terminate an identifier before a `[` array literal.
const KEYWORDS: [&str; 5] = ["in", "notin", "not", "and", "or"];

/// Parses the text of a [`TokenKind::Number`] token.
pub fn parse_number(text: &str) -> Option<i64> {
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => text.parse::<i64>().ok(),
    }
}

/// Parses the text of a [`TokenKind::Duration`] token into nanoseconds.
pub fn parse_duration(text: &str) -> Option<i64> {
    let digits = text.find(|c: char| !c.is_ascii_digit())?;
    let (value, unit) = text.split_at(digits);
    let (_, factor) = DURATION_UNITS.iter().find(|(u, _)| *u == unit)?;
    value.parse::<i64>().ok()?.checked_mul(*factor)
}

#[derive(Clone)]
pub struct Lexer<'source> {
    source: Source,
    iter: Peekable<CharIndices<'source>>,
    line: u32,
    col: u32,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source Source) -> Self {
        Self {
            source: source.clone(),
            iter: source.contents().char_indices().peekable(),
            line: 1,
            col: 1,
        }
    }

    fn peek(&mut self) -> (usize, char) {
        match self.iter.peek() {
            Some((index, chr)) => (*index, *chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    fn peekahead(&mut self, n: usize) -> (usize, char) {
        match self.iter.clone().nth(n) {
            Some((index, chr)) => (index, chr),
            _ => (self.source.contents().len(), '\x00'),
        }
    }

    fn span(&self, line: u32, col: u32, start: usize, end: usize) -> Span {
        Span {
            source: self.source.clone(),
            line,
            col,
            start: start as u32,
            end: end as u32,
        }
    }

    fn is_ident_char(ch: char) -> bool {
        ch.is_ascii_alphanumeric() || ch == '_' || ch == '.'
    }

    // Reads a bracketed register group, e.g. `[_]`, if one immediately follows.
    fn read_register_group(&mut self) -> bool {
        let mut n = 1;
        loop {
            match self.peekahead(n).1 {
                ']' => break,
                ch if ch.is_ascii_alphanumeric() || ch == '_' => n += 1,
                _ => return false,
            }
        }
        for _ in 0..=n {
            self.iter.next();
        }
        true
    }

    fn read_ident(&mut self) -> Result<Token> {
        let start = self.peek().0;
        let col = self.col;
        loop {
            let ch = self.peek().1;
            if Self::is_ident_char(ch) {
                self.iter.next();
            } else if ch == '[' {
                let here = self.peek().0;
                let word = &self.source.contents()[start..here];
                if KEYWORDS.contains(&word) || !self.read_register_group() {
                    break;
                }
            } else {
                break;
            }
        }
        let end = self.peek().0;
        self.col += (end - start) as u32;
        let text = &self.source.contents()[start..end];
        if text.ends_with('.') || text.contains("..") {
            return Err(self.source.error(self.line, col, "invalid identifier"));
        }
        Ok(Token(TokenKind::Ident, self.span(self.line, col, start, end)))
    }

    fn read_digits(&mut self) {
        while self.peek().1.is_ascii_digit() {
            self.iter.next();
        }
    }

    // Integers, hexadecimal integers and durations such as `10s`.
    fn read_number(&mut self) -> Result<Token> {
        let (start, chr) = self.peek();
        let col = self.col;
        self.iter.next();

        let mut kind = TokenKind::Number;
        if chr == '0' && matches!(self.peek().1, 'x' | 'X') {
            self.iter.next();
            while self.peek().1.is_ascii_hexdigit() {
                self.iter.next();
            }
        } else {
            self.read_digits();
            if self.peek().1.is_ascii_alphabetic() {
                while self.peek().1.is_ascii_alphabetic() {
                    self.iter.next();
                }
                kind = TokenKind::Duration;
            }
        }

        let end = self.peek().0;
        self.col += (end - start) as u32;

        let ch = self.peek().1;
        if ch == '_' || ch == '.' || ch.is_ascii_alphanumeric() {
            return Err(self.source.error(self.line, self.col, "invalid number"));
        }

        let text = &self.source.contents()[start..end];
        match kind {
            TokenKind::Duration if parse_duration(text).is_none() => {
                return Err(self.source.error(self.line, col, "invalid duration"));
            }
            TokenKind::Number if parse_number(text).is_none() => {
                return Err(self.source.error(self.line, col, "invalid number. out of range"));
            }
            _ => (),
        }

        Ok(Token(kind, self.span(self.line, col, start, end)))
    }

    // Patterns `~"..."` and regular expressions `r"..."` keep their text
    // verbatim; only `\"` is recognized so that quotes can be embedded.
    fn read_verbatim_string(&mut self, kind: TokenKind) -> Result<Token> {
        let (line, col) = (self.line, self.col);
        // prefix and opening quote
        self.iter.next();
        self.iter.next();
        self.col += 2;
        let (start, _) = self.peek();
        loop {
            let (_, ch) = self.peek();
            match ch {
                '"' => break,
                '\x00' | '\n' => return Err(self.source.error(line, col, "unmatched \"")),
                '\\' if self.peekahead(1).1 == '"' => {
                    self.iter.next();
                    self.iter.next();
                    self.col += 2;
                }
                _ => {
                    self.iter.next();
                    self.col += 1;
                }
            }
        }
        let end = self.peek().0;
        self.iter.next();
        self.col += 1;
        Ok(Token(kind, self.span(line, col + 2, start, end)))
    }

    fn read_string(&mut self) -> Result<Token> {
        let (line, col) = (self.line, self.col);
        self.iter.next();
        self.col += 1;
        let (start, _) = self.peek();
        loop {
            let (offset, ch) = self.peek();
            let col = self.col + (offset - start) as u32;
            match ch {
                '"' | '\x00' => {
                    break;
                }
                '\\' => {
                    self.iter.next();
                    let (_, ch) = self.peek();
                    self.iter.next();
                    match ch {
                        // json escape sequence
                        '"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't' => (),
                        'u' => {
                            for _i in 0..4 {
                                let (offset, ch) = self.peek();
                                let col = self.col + (offset - start) as u32;
                                if !ch.is_ascii_hexdigit() {
                                    return Err(self.source.error(
                                        line,
                                        col,
                                        "invalid hex escape sequence",
                                    ));
                                }
                                self.iter.next();
                            }
                        }
                        _ => return Err(self.source.error(line, col, "invalid escape sequence")),
                    }
                }
                _ => {
                    // check for valid json chars
                    if !('\u{0020}'..='\u{10FFFF}').contains(&ch) {
                        return Err(self.source.error(line, col, "invalid character in string"));
                    }
                    self.iter.next();
                }
            }
        }

        if self.peek().1 != '"' {
            return Err(self.source.error(line, col, "unmatched \""));
        }

        self.iter.next();
        let end = self.peek().0;
        self.col += (end - start) as u32;

        // Ensure that the string is parsable in Rust.
        if let Err(e) = serde_json::from_str::<String>(&self.source.contents()[start - 1..end]) {
            bail!(
                "{} {}",
                self.source
                    .error(self.line, col, "serde_json cannot parse string:"),
                e
            )
        }

        Ok(Token(
            TokenKind::String,
            self.span(line, col + 1, start, end - 1),
        ))
    }

    fn skip_ws(&mut self) -> Result<()> {
        // A tab is considered 4 space characters; `#` starts a comment.
        'outer: loop {
            match self.peek().1 {
                ' ' => self.col += 1,
                '\t' => self.col += 4,
                '\r' => {
                    if self.peekahead(1).1 != '\n' {
                        return Err(self.source.error(
                            self.line,
                            self.col,
                            "\\r must be followed by \\n",
                        ));
                    }
                }
                '\n' => {
                    self.col = 1;
                    self.line += 1;
                }
                '#' => {
                    self.iter.next();
                    loop {
                        match self.peek().1 {
                            '\n' | '\x00' => continue 'outer,
                            _ => self.iter.next(),
                        };
                    }
                }
                _ => break,
            }
            self.iter.next();
        }
        Ok(())
    }

    fn symbol(&mut self, start: usize, col: u32, len: usize) -> Result<Token> {
        for _ in 0..len {
            self.iter.next();
        }
        self.col += len as u32;
        Ok(Token(
            TokenKind::Symbol,
            self.span(self.line, col, start, start + len),
        ))
    }

    pub fn next_token(&mut self) -> Result<Token> {
        self.skip_ws()?;

        let (start, chr) = self.peek();
        let col = self.col;
        let next = self.peekahead(1).1;

        match chr {
            // grouping characters and separators
            '(' | ')' | '[' | ']' | ',' |
            // bitwise operators and unary minus
            '^' | '-' => self.symbol(start, col, 1),
            '&' | '|' if next == chr => self.symbol(start, col, 2),
            '&' | '|' => self.symbol(start, col, 1),
            // == =~ != !~ < <= > >=
            '=' if next == '=' || next == '~' => self.symbol(start, col, 2),
            '!' if next == '=' || next == '~' => self.symbol(start, col, 2),
            '!' => self.symbol(start, col, 1),
            '<' | '>' if next == '=' => self.symbol(start, col, 2),
            '<' | '>' => self.symbol(start, col, 1),
            '~' if next == '"' => self.read_verbatim_string(TokenKind::Pattern),
            'r' if next == '"' => self.read_verbatim_string(TokenKind::Regexp),
            '"' => self.read_string(),
            '\x00' => Ok(Token(
                TokenKind::Eof,
                self.span(self.line, col, start, start),
            )),
            _ if chr.is_ascii_digit() => self.read_number(),
            _ if chr.is_ascii_alphabetic() || chr == '_' => self.read_ident(),
            _ => Err(self.source.error(self.line, self.col, "invalid character")),
        }
    }
}
