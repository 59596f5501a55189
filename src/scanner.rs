//! Hand-rolled tokenizer for SCORINFO definition text: identifiers, quoted
//! strings, numbers, and punctuation, with line-numbered errors and an
//! expectation-style API for the parser.

use std::fmt;

#[derive(Clone, PartialEq, Debug)]
pub enum Token {
    Identifier(String),
    Str(String),
    Int(i32),
    Float(f32),
    Symbol(char),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Identifier(s) => write!(f, "'{s}'"),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Symbol(c) => write!(f, "'{c}'"),
        }
    }
}

pub struct Scanner<'a> {
    src: &'a [u8],
    pos: usize,
    line: u32,
    pushed_back: Option<Token>,
}

impl<'a> Scanner<'a> {
    pub fn new(src: &'a str) -> Self {
        Self {
            src: src.as_bytes(),
            pos: 0,
            line: 1,
            pushed_back: None,
        }
    }

    #[inline(always)]
    pub const fn line(&self) -> u32 {
        self.line
    }

    /// Formats an error message carrying the current line number.
    pub fn err(&self, msg: impl fmt::Display) -> String {
        format!("line {}: {msg}", self.line)
    }

    /// Returns a token to the stream; the next read yields it again.
    pub fn put_back(&mut self, token: Token) {
        debug_assert!(self.pushed_back.is_none(), "single-token pushback only");
        self.pushed_back = Some(token);
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), String> {
        loop {
            while let Some(&b) = self.src.get(self.pos) {
                if b == b'\n' {
                    self.line += 1;
                    self.pos += 1;
                } else if b.is_ascii_whitespace() {
                    self.pos += 1;
                } else {
                    break;
                }
            }
            match (self.src.get(self.pos), self.src.get(self.pos + 1)) {
                (Some(b'/'), Some(b'/')) => {
                    while let Some(&b) = self.src.get(self.pos) {
                        self.pos += 1;
                        if b == b'\n' {
                            self.line += 1;
                            break;
                        }
                    }
                }
                (Some(b'/'), Some(b'*')) => {
                    let open_line = self.line;
                    self.pos += 2;
                    loop {
                        match (self.src.get(self.pos), self.src.get(self.pos + 1)) {
                            (Some(b'*'), Some(b'/')) => {
                                self.pos += 2;
                                break;
                            }
                            (Some(&b), _) => {
                                if b == b'\n' {
                                    self.line += 1;
                                }
                                self.pos += 1;
                            }
                            (None, _) => {
                                return Err(format!(
                                    "line {open_line}: unterminated block comment"
                                ));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    /// Next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>, String> {
        if let Some(tok) = self.pushed_back.take() {
            return Ok(Some(tok));
        }
        self.skip_whitespace_and_comments()?;
        let Some(&b) = self.src.get(self.pos) else {
            return Ok(None);
        };

        if b == b'"' {
            return self.scan_string().map(Some);
        }
        if b.is_ascii_digit()
            || (b == b'-' && self.src.get(self.pos + 1).is_some_and(u8::is_ascii_digit))
        {
            return self.scan_number().map(Some);
        }
        if b.is_ascii_alphabetic() || b == b'_' {
            let start = self.pos;
            while self
                .src
                .get(self.pos)
                .is_some_and(|&b| b.is_ascii_alphanumeric() || b == b'_')
            {
                self.pos += 1;
            }
            let text = std::str::from_utf8(&self.src[start..self.pos])
                .map_err(|_| self.err("identifier is not valid UTF-8"))?;
            return Ok(Some(Token::Identifier(text.to_string())));
        }

        self.pos += 1;
        Ok(Some(Token::Symbol(b as char)))
    }

    fn scan_string(&mut self) -> Result<Token, String> {
        let open_line = self.line;
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.src.get(self.pos) {
                Some(b'"') => {
                    self.pos += 1;
                    return Ok(Token::Str(out));
                }
                Some(b'\\') => {
                    self.pos += 1;
                    match self.src.get(self.pos) {
                        Some(b'n') => out.push('\n'),
                        Some(b'c') => out.push(crate::color::COLOR_ESCAPE),
                        Some(&b) => out.push(b as char),
                        None => return Err(format!("line {open_line}: unterminated string")),
                    }
                    self.pos += 1;
                }
                Some(b'\n') | None => {
                    return Err(format!("line {open_line}: unterminated string"));
                }
                Some(&b) => {
                    // Definition text is treated as Latin-1 inside strings.
                    out.push(b as char);
                    self.pos += 1;
                }
            }
        }
    }

    fn scan_number(&mut self) -> Result<Token, String> {
        let start = self.pos;
        if self.src[self.pos] == b'-' {
            self.pos += 1;
        }
        let mut saw_dot = false;
        while let Some(&b) = self.src.get(self.pos) {
            if b.is_ascii_digit() {
                self.pos += 1;
            } else if b == b'.' && !saw_dot {
                saw_dot = true;
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap_or("");
        if saw_dot {
            text.parse::<f32>()
                .map(Token::Float)
                .map_err(|_| self.err(format!("malformed number '{text}'")))
        } else {
            text.parse::<i32>()
                .map(Token::Int)
                .map_err(|_| self.err(format!("malformed number '{text}'")))
        }
    }

    /// Next token, end of input being an error.
    pub fn must_get_token(&mut self) -> Result<Token, String> {
        self.next_token()?
            .ok_or_else(|| self.err("unexpected end of definition"))
    }

    pub fn must_get_identifier(&mut self) -> Result<String, String> {
        match self.must_get_token()? {
            Token::Identifier(s) => Ok(s),
            other => Err(self.err(format!("expected an identifier, got {other}"))),
        }
    }

    /// A quoted string, or a bare identifier where quoting is optional.
    pub fn must_get_string(&mut self) -> Result<String, String> {
        match self.must_get_token()? {
            Token::Str(s) | Token::Identifier(s) => Ok(s),
            other => Err(self.err(format!("expected a string, got {other}"))),
        }
    }

    pub fn must_get_number(&mut self) -> Result<i32, String> {
        match self.must_get_token()? {
            Token::Int(v) => Ok(v),
            other => Err(self.err(format!("expected a number, got {other}"))),
        }
    }

    pub fn must_get_float(&mut self) -> Result<f32, String> {
        match self.must_get_token()? {
            Token::Int(v) => Ok(v as f32),
            Token::Float(v) => Ok(v),
            other => Err(self.err(format!("expected a number, got {other}"))),
        }
    }

    pub fn must_get_symbol(&mut self, symbol: char) -> Result<(), String> {
        match self.must_get_token()? {
            Token::Symbol(c) if c == symbol => Ok(()),
            other => Err(self.err(format!("expected '{symbol}', got {other}"))),
        }
    }

    /// Consumes the given symbol if it is next; otherwise leaves the stream
    /// untouched.
    pub fn check_symbol(&mut self, symbol: char) -> Result<bool, String> {
        match self.next_token()? {
            Some(Token::Symbol(c)) if c == symbol => Ok(true),
            Some(other) => {
                self.put_back(other);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    /// Consumes the given keyword (case-insensitive) if it is next.
    pub fn check_keyword(&mut self, keyword: &str) -> Result<bool, String> {
        match self.next_token()? {
            Some(Token::Identifier(s)) if s.eq_ignore_ascii_case(keyword) => Ok(true),
            Some(other) => {
                self.put_back(other);
                Ok(false)
            }
            None => Ok(false),
        }
    }
}
