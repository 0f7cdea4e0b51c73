//! Input positions.
//!
//! Positions are counted in Unicode code points. Lines and columns are 1-based, the offset is 0-based.
//! `\n`, `\r\n` and a lone `\r` each terminate a line.

use std::fmt;

/// Location of a character in the parsed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputPosition {
    pub line: u32,
    pub column: u32,
    /// Code point offset from the start of the input.
    pub offset: usize,
}

impl InputPosition {
    /// Position of the first character.
    pub const START: InputPosition = InputPosition {
        line: 1,
        column: 1,
        offset: 0,
    };

    pub fn new(line: u32, column: u32, offset: usize) -> Self {
        Self { line, column, offset }
    }
}

impl Default for InputPosition {
    fn default() -> Self {
        Self::START
    }
}

impl fmt::Display for InputPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Tracks the position of the next character while the input is consumed.
#[derive(Debug, Clone, Default)]
pub(crate) struct PositionTracker {
    current: InputPosition,
    after_cr: bool,
}

impl PositionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Position of the character about to be read.
    pub fn current(&self) -> InputPosition {
        self.current
    }

    pub fn advance(&mut self, c: char) {
        self.current.offset += 1;
        match c {
            // second half of "\r\n": the line was already ended by '\r'
            '\n' if self.after_cr => self.after_cr = false,
            '\n' => self.new_line(),
            '\r' => {
                self.new_line();
                self.after_cr = true;
            }
            _ => {
                self.current.column += 1;
                self.after_cr = false;
            }
        }
    }

    fn new_line(&mut self) {
        self.current.line += 1;
        self.current.column = 1;
    }
}
