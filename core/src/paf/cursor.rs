//! Physical-line reader with push-back.

use std::collections::VecDeque;
use std::io::BufRead;

use crate::error::{PolicyError, Result};

/// Reads lines from a stream, letting the parser return unconsumed
/// remainders to be read again.
///
/// The line counter is decremented on push-back, so a remainder re-read
/// later reports the number of the physical line it came from.
pub(crate) struct LineCursor<'a> {
    input: &'a mut dyn BufRead,
    pending: VecDeque<String>,
    line_number: usize,
}

impl<'a> LineCursor<'a> {
    pub(crate) fn new(input: &'a mut dyn BufRead) -> Self {
        Self {
            input,
            pending: VecDeque::new(),
            line_number: 0,
        }
    }

    /// Returns the next line without its terminator, or `None` at end of
    /// input.
    pub(crate) fn next_line(&mut self) -> Result<Option<String>> {
        if let Some(line) = self.pending.pop_front() {
            self.line_number += 1;
            return Ok(Some(line));
        }

        let mut line = String::new();
        let read = self
            .input
            .read_line(&mut line)
            .map_err(|source| PolicyError::Io { path: None, source })?;
        if read == 0 {
            return Ok(None);
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        self.line_number += 1;
        Ok(Some(line))
    }

    /// Makes `line` the next line returned by [`next_line`](Self::next_line).
    pub(crate) fn push_back(&mut self, line: String) {
        self.pending.push_front(line);
        self.line_number = self.line_number.saturating_sub(1);
    }

    /// Number of the most recently read physical line (1-based).
    pub(crate) fn line_number(&self) -> usize {
        self.line_number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_back_keeps_line_numbers() {
        let mut input = "first\r\nsecond\n".as_bytes();
        let mut cursor = LineCursor::new(&mut input);

        assert_eq!(cursor.next_line().unwrap().as_deref(), Some("first"));
        assert_eq!(cursor.line_number(), 1);

        cursor.push_back("rest of first".to_string());
        assert_eq!(cursor.line_number(), 0);
        assert_eq!(cursor.next_line().unwrap().as_deref(), Some("rest of first"));
        assert_eq!(cursor.line_number(), 1);

        assert_eq!(cursor.next_line().unwrap().as_deref(), Some("second"));
        assert_eq!(cursor.line_number(), 2);
        assert_eq!(cursor.next_line().unwrap(), None);
    }
}
