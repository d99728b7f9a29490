// lexer.rs - Forth source tokenizer
//
// Forward-only producer of whitespace-separated tokens. Comments are
// consumed here so every downstream consumer of tokens (including the
// name-reading paths of `:`, CONSTANT and VARIABLE) skips them for free.

use crate::errors::ErrorKind;

/// Maximum token length in bytes. Longer runs are truncated silently;
/// the cursor still advances past the full run.
pub const MAX_TOKEN_LEN: usize = 256;

/// A token slice plus its byte offset in the source (for diagnostics).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub text: &'a str,
    pub offset: usize,
}

pub struct Tokenizer<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(source: &'a str) -> Self {
        Tokenizer {
            src: source.as_bytes(),
            pos: 0,
        }
    }

    /// Current byte offset (start of the next unread token, comment or
    /// whitespace run).
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Produce the next token, skipping whitespace and comments.
    /// Returns `Ok(None)` at end of input. The only lexical error is an
    /// unterminated `(` comment, reported with the offset of the `(`.
    pub fn next_token(&mut self) -> Result<Option<Token<'a>>, (ErrorKind, usize)> {
        loop {
            self.skip_whitespace();

            if self.pos >= self.src.len() {
                return Ok(None);
            }

            match self.src[self.pos] {
                b'\\' => {
                    self.skip_line_comment();
                    continue;
                }
                // `(` opens a comment only when followed by whitespace or
                // end of input; `(TOKEN)` is an ordinary token.
                b'(' if self.pos + 1 >= self.src.len()
                    || self.src[self.pos + 1].is_ascii_whitespace() =>
                {
                    self.skip_paren_comment()?;
                    continue;
                }
                _ => break,
            }
        }

        let start = self.pos;
        while self.pos < self.src.len() && !self.src[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }

        let mut len = self.pos - start;
        if len > MAX_TOKEN_LEN {
            len = MAX_TOKEN_LEN;
        }

        // Source is treated as ASCII; non-UTF8 runs become unknown tokens
        // downstream rather than a tokenizer failure.
        let text = std::str::from_utf8(&self.src[start..start + len]).unwrap_or("");
        Ok(Some(Token {
            text,
            offset: start,
        }))
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    fn skip_line_comment(&mut self) {
        while self.pos < self.src.len() && self.src[self.pos] != b'\n' {
            self.pos += 1;
        }
    }

    /// Discard bytes through the next `)`. Nesting is not supported; the
    /// first `)` closes the comment.
    fn skip_paren_comment(&mut self) -> Result<(), (ErrorKind, usize)> {
        let open = self.pos;
        self.pos += 1;
        while self.pos < self.src.len() {
            if self.src[self.pos] == b')' {
                self.pos += 1;
                return Ok(());
            }
            self.pos += 1;
        }
        Err((ErrorKind::UnterminatedComment, open))
    }
}

// ============================================================================
// INTEGER LITERALS
// ============================================================================

/// Outcome of trying to read a token as an integer literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntParse {
    /// Token does not look like a number (or has trailing garbage); the
    /// dispatcher falls through to the next classification.
    NotANumber,
    /// Token is numeric but the value leaves the signed 32-bit range.
    Overflow,
    Value(i32),
}

/// Parse an integer literal: decimal, `0x`/`0X` hex, or leading-`0`
/// octal, with an optional sign. Mirrors `strtol(str, end, 0)` followed
/// by a full-consumption and range check.
pub fn parse_int(token: &str) -> IntParse {
    let bytes = token.as_bytes();
    let mut i = 0;

    let negative = match bytes.first() {
        Some(b'-') => {
            i += 1;
            true
        }
        Some(b'+') => {
            i += 1;
            false
        }
        _ => false,
    };

    if i >= bytes.len() {
        return IntParse::NotANumber;
    }

    let (radix, digits): (u32, &[u8]) = if bytes[i] == b'0' && i + 1 < bytes.len() {
        match bytes[i + 1] {
            b'x' | b'X' => (16, &bytes[i + 2..]),
            _ => (8, &bytes[i + 1..]),
        }
    } else {
        (10, &bytes[i..])
    };

    if digits.is_empty() {
        // "0x" with nothing after it.
        return IntParse::NotANumber;
    }

    // Reject trailing garbage before worrying about range.
    if !digits.iter().all(|&b| (b as char).is_digit(radix)) {
        return IntParse::NotANumber;
    }

    let mut value: i64 = 0;
    for &b in digits {
        let d = (b as char).to_digit(radix).unwrap() as i64;
        value = value * radix as i64 + d;
        if value > (i32::MAX as i64) + 1 {
            return IntParse::Overflow;
        }
    }

    let signed = if negative { -value } else { value };
    if signed < i32::MIN as i64 || signed > i32::MAX as i64 {
        return IntParse::Overflow;
    }
    IntParse::Value(signed as i32)
}
