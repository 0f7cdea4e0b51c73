//! Character sources.
//!
//! The parser only needs "next code point or end of input". [`StrSource`] serves in-memory text,
//! [`ReaderSource`] decodes a byte stream as UTF-8 one line at a time.

use std::io::{BufRead, BufReader, Read};

use crate::error::SourceError;

pub trait CharSource {
    /// Next code point, `Ok(None)` at end of input.
    fn next_char(&mut self) -> Result<Option<char>, SourceError>;
}

impl<S: CharSource + ?Sized> CharSource for &mut S {
    fn next_char(&mut self) -> Result<Option<char>, SourceError> {
        (**self).next_char()
    }
}

impl<S: CharSource + ?Sized> CharSource for Box<S> {
    fn next_char(&mut self) -> Result<Option<char>, SourceError> {
        (**self).next_char()
    }
}

/// In-memory text.
#[derive(Debug, Clone)]
pub struct StrSource<'a> {
    chars: std::str::Chars<'a>,
}

impl<'a> StrSource<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { chars: text.chars() }
    }
}

impl<'a> From<&'a str> for StrSource<'a> {
    fn from(text: &'a str) -> Self {
        Self::new(text)
    }
}

impl CharSource for StrSource<'_> {
    fn next_char(&mut self) -> Result<Option<char>, SourceError> {
        Ok(self.chars.next())
    }
}

/// UTF-8 byte stream.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    bytes: Vec<u8>,
    line: String,
    cursor: usize,
    line_number: usize,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            bytes: Vec::new(),
            line: String::new(),
            cursor: 0,
            line_number: 0,
        }
    }

    /// Load the next line into the buffer. Returns `false` at end of stream.
    fn fill(&mut self) -> Result<bool, SourceError> {
        self.bytes.clear();
        if self.reader.read_until(b'\n', &mut self.bytes)? == 0 {
            return Ok(false);
        }
        self.line_number += 1;
        let bytes = std::mem::take(&mut self.bytes);
        self.line = String::from_utf8(bytes).map_err(|_| SourceError::InvalidUtf8 {
            line: self.line_number,
        })?;
        self.cursor = 0;
        Ok(true)
    }
}

impl<R: Read> ReaderSource<BufReader<R>> {
    pub fn from_read(reader: R) -> Self {
        Self::new(BufReader::new(reader))
    }
}

impl<R: BufRead> CharSource for ReaderSource<R> {
    fn next_char(&mut self) -> Result<Option<char>, SourceError> {
        loop {
            if let Some(c) = self.line[self.cursor..].chars().next() {
                self.cursor += c.len_utf8();
                return Ok(Some(c));
            }
            if !self.fill()? {
                return Ok(None);
            }
        }
    }
}
