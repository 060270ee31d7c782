//! Token recognition on top of the buffered window (spec §4.D).

use super::buffer::TokenBuffer;
use crate::error::{PbrtError, PbrtResult};
use crate::numeric;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Bare identifier: a directive name or an unquoted enum keyword slot.
    Identifier(String),
    /// Contents of a `"..."` string literal, unescaped (PBRT strings cannot
    /// contain `"` at all).
    Str(String),
    Number(f64),
    /// `[` or `]`.
    LBracket,
    RBracket,
    Eof,
}

/// The full tokenizer: a [`TokenBuffer`] plus the sticky first-error slot
/// (spec §7 "the tokenizer holds at most one error").
pub struct Tokenizer {
    pub buffer: TokenBuffer,
    error: Option<PbrtError>,
}

impl Tokenizer {
    pub fn new(buffer: TokenBuffer) -> Self {
        Tokenizer { buffer, error: None }
    }

    pub fn set_error(&mut self, err: PbrtError) {
        if self.error.is_none() {
            self.error = Some(err);
        }
    }

    pub fn take_error(&mut self) -> Option<PbrtError> {
        self.error.take()
    }

    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    fn ensure_lookahead(&mut self, needed_past_pos: usize) -> PbrtResult<()> {
        while self.buffer.end + needed_past_pos >= self.buffer.buf_end()
            && !self.buffer.at_eof_with_empty_window()
        {
            if self.buffer.end >= self.buffer.buf_end() {
                self.buffer.refill()?;
                if self.buffer.buf_end() == 0 {
                    break;
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    fn peek(&self, offset: usize) -> u8 {
        let idx = self.buffer.end + offset;
        if idx < self.buffer.buf().len() {
            self.buffer.buf()[idx]
        } else {
            0
        }
    }

    /// Skip whitespace, newlines, and `#...\n` comments. Returns `false` at
    /// EOF (spec §4.D `advance`).
    fn skip_trivia(&mut self) -> PbrtResult<bool> {
        loop {
            self.ensure_lookahead(0)?;
            if self.buffer.end >= self.buffer.buf_end() && self.buffer.at_eof_with_empty_window() {
                return Ok(false);
            }
            let c = self.peek(0);
            match c {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.buffer.end += 1;
                    self.buffer.pos = self.buffer.end;
                }
                b'#' => {
                    loop {
                        self.ensure_lookahead(0)?;
                        if self.buffer.end >= self.buffer.buf_end() && self.buffer.at_eof_with_empty_window()
                        {
                            break;
                        }
                        let cc = self.peek(0);
                        self.buffer.end += 1;
                        if cc == b'\n' {
                            break;
                        }
                    }
                    self.buffer.pos = self.buffer.end;
                }
                _ => return Ok(true),
            }
        }
    }

    /// Recognize and return the next token.
    pub fn next_token(&mut self) -> PbrtResult<Token> {
        if !self.skip_trivia()? {
            return Ok(Token::Eof);
        }
        self.buffer.pos = self.buffer.end;

        let c = self.peek(0);
        match c {
            b'[' => {
                self.buffer.end += 1;
                self.buffer.pos = self.buffer.end;
                Ok(Token::LBracket)
            }
            b']' => {
                self.buffer.end += 1;
                self.buffer.pos = self.buffer.end;
                Ok(Token::RBracket)
            }
            b'"' => self.scan_string(),
            b'-' | b'+' | b'.' | b'0'..=b'9' => self.scan_number(),
            c if is_ident_start(c) => self.scan_identifier(),
            other => {
                let offset = self.buffer.absolute_offset();
                let filename = self.buffer.current_filename().to_path_buf();
                Err(PbrtError::lexical(
                    filename,
                    offset,
                    format!("unrecognized character '{}'", other as char),
                ))
            }
        }
    }

    fn scan_string(&mut self) -> PbrtResult<Token> {
        let start_offset = self.buffer.absolute_offset();
        self.buffer.end += 1; // consume opening quote
        let mut out = Vec::new();
        loop {
            self.ensure_lookahead(0)?;
            if self.buffer.end >= self.buffer.buf_end() && self.buffer.at_eof_with_empty_window() {
                let filename = self.buffer.current_filename().to_path_buf();
                return Err(PbrtError::lexical(
                    filename,
                    start_offset,
                    "unterminated string literal",
                ));
            }
            let c = self.peek(0);
            if c == b'"' {
                self.buffer.end += 1;
                self.buffer.pos = self.buffer.end;
                let s = String::from_utf8(out).map_err(|_| {
                    PbrtError::lexical(
                        self.buffer.current_filename().to_path_buf(),
                        start_offset,
                        "string literal is not valid UTF-8",
                    )
                })?;
                return Ok(Token::Str(s));
            }
            if c == b'\n' {
                let filename = self.buffer.current_filename().to_path_buf();
                return Err(PbrtError::lexical(
                    filename,
                    start_offset,
                    "unterminated string literal (hit end of line)",
                ));
            }
            out.push(c);
            self.buffer.end += 1;

            if out.len() >= self.buffer.buf().len().saturating_sub(2) {
                let filename = self.buffer.current_filename().to_path_buf();
                return Err(PbrtError::lexical(
                    filename,
                    start_offset,
                    "string literal exceeds input buffer size",
                ));
            }
        }
    }

    fn scan_number(&mut self) -> PbrtResult<Token> {
        let start = self.buffer.end;
        let data = self.buffer.buf();
        if let Some((value, end)) = numeric::double_literal(data, start) {
            self.buffer.end = end;
            self.buffer.pos = self.buffer.end;
            Ok(Token::Number(value))
        } else {
            let offset = self.buffer.absolute_offset();
            let filename = self.buffer.current_filename().to_path_buf();
            Err(PbrtError::lexical(filename, offset, "invalid numeric literal"))
        }
    }

    fn scan_identifier(&mut self) -> PbrtResult<Token> {
        let start = self.buffer.end;
        loop {
            self.ensure_lookahead(0)?;
            let c = self.peek(0);
            if is_ident_continue(c) {
                self.buffer.end += 1;
            } else {
                break;
            }
        }
        let data = self.buffer.buf();
        let s = String::from_utf8_lossy(&data[start..self.buffer.end]).into_owned();
        self.buffer.pos = self.buffer.end;
        Ok(Token::Identifier(s))
    }
}

fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_'
}

fn is_ident_continue(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'_'
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::buffer::{TokenBuffer, DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_INCLUDE_DEPTH};
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;

    fn write_temp(contents: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!(
            "pbrt_scene_token_test_{}_{}.pbrt",
            std::process::id(),
            rand_suffix()
        ));
        let mut f = File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    fn rand_suffix() -> u64 {
        use std::time::{SystemTime, UNIX_EPOCH};
        SystemTime::now().duration_since(UNIX_EPOCH).unwrap().subsec_nanos() as u64
    }

    fn tokenize_all(contents: &str) -> Vec<Token> {
        let path = write_temp(contents);
        let buffer = TokenBuffer::open(&path, DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_INCLUDE_DEPTH).unwrap();
        let mut tz = Tokenizer::new(buffer);
        let mut out = Vec::new();
        loop {
            let t = tz.next_token().unwrap();
            if t == Token::Eof {
                break;
            }
            out.push(t);
        }
        std::fs::remove_file(path).ok();
        out
    }

    #[test]
    fn tokenizes_identifiers_and_brackets() {
        let toks = tokenize_all("WorldBegin [ 1 2.5 -3 ] WorldEnd");
        assert_eq!(
            toks,
            vec![
                Token::Identifier("WorldBegin".into()),
                Token::LBracket,
                Token::Number(1.0),
                Token::Number(2.5),
                Token::Number(-3.0),
                Token::RBracket,
                Token::Identifier("WorldEnd".into()),
            ]
        );
    }

    #[test]
    fn tokenizes_string_literal() {
        let toks = tokenize_all("\"float fov\" 45");
        assert_eq!(toks, vec![Token::Str("float fov".into()), Token::Number(45.0)]);
    }

    #[test]
    fn skips_comments() {
        let toks = tokenize_all("# a comment\nIdentity # trailing\n");
        assert_eq!(toks, vec![Token::Identifier("Identity".into())]);
    }

    #[test]
    fn unterminated_string_is_lexical_error() {
        let path = write_temp("\"unterminated");
        let buffer = TokenBuffer::open(&path, DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_INCLUDE_DEPTH).unwrap();
        let mut tz = Tokenizer::new(buffer);
        let err = tz.next_token();
        assert!(matches!(err, Err(PbrtError::Lexical(_))));
        std::fs::remove_file(path).ok();
    }
}
