//! Byte-at-a-time scanner with a two-byte lookback window.

use std::io::{self, BufRead};

/// Sequential reader over a source document.
///
/// Yields one byte at a time and remembers the byte before the current one,
/// which is all the context the directive lexer needs. A single byte of
/// lookahead is available through [`Scanner::peek`].
pub struct Scanner<R> {
    reader: R,
    prev: Option<u8>,
    current: Option<u8>,
    line: usize,
}

impl<R: BufRead> Scanner<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            prev: None,
            current: None,
            line: 1,
        }
    }

    /// Advance to the next byte. Returns `None` at end of input.
    pub fn next_byte(&mut self) -> io::Result<Option<u8>> {
        let byte = match self.reader.fill_buf()?.first() {
            Some(&byte) => byte,
            None => return Ok(None),
        };
        self.reader.consume(1);

        if self.current == Some(b'\n') {
            self.line += 1;
        }
        self.prev = self.current;
        self.current = Some(byte);

        Ok(Some(byte))
    }

    /// Look at the next byte without consuming it.
    pub fn peek(&mut self) -> io::Result<Option<u8>> {
        Ok(self.reader.fill_buf()?.first().copied())
    }

    /// Consume up to `count` bytes, stopping early at end of input.
    pub fn skip(&mut self, count: usize) -> io::Result<()> {
        for _ in 0..count {
            if self.next_byte()?.is_none() {
                break;
            }
        }
        Ok(())
    }

    /// The byte consumed before the current one.
    pub fn prev(&self) -> Option<u8> {
        self.prev
    }

    /// The most recently consumed byte.
    pub fn current(&self) -> Option<u8> {
        self.current
    }

    /// 1-based line of the current byte.
    pub fn line(&self) -> usize {
        self.line
    }
}
