//! Bounded, offset-tracked log buffer with a cursor read protocol.
//!
//! Readers hold a cursor counting lines ever appended. `offset` counts lines
//! discarded from the front, so `offset + len` is always the total appended
//! and a cursor maps into the buffer as `cursor - offset`.

use std::collections::VecDeque;

/// Default retention cap per job.
pub const DEFAULT_MAX_LOGS: usize = 600;

#[derive(Debug, Clone)]
pub struct LogBuffer {
    lines: VecDeque<String>,
    offset: u64,
    max: usize,
}

/// Result of [`LogBuffer::fetch_since`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSlice {
    pub lines: Vec<String>,
    /// Cursor to send on the next poll.
    pub next: u64,
    /// Lines after the supplied cursor were discarded before this read.
    pub truncated: bool,
}

impl LogBuffer {
    /// A cap of 0 is treated as 1.
    pub fn new(max: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            offset: 0,
            max: max.max(1),
        }
    }

    pub fn append(&mut self, line: impl Into<String>) {
        self.lines.push_back(line.into());
        while self.lines.len() > self.max {
            self.lines.pop_front();
            self.offset += 1;
        }
    }

    pub fn fetch_since(&self, cursor: u64) -> LogSlice {
        let start = cursor.saturating_sub(self.offset).min(self.lines.len() as u64) as usize;
        LogSlice {
            lines: self.lines.iter().skip(start).cloned().collect(),
            next: self.total(),
            truncated: cursor < self.offset,
        }
    }

    /// Lines discarded so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Lines ever appended.
    pub fn total(&self) -> u64 {
        self.offset + self.lines.len() as u64
    }

    pub fn max(&self) -> usize {
        self.max
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LOGS)
    }
}
