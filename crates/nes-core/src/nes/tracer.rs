//! Bounded instruction history for post-mortem debugging.
//!
//! Only filled when the `tracing` feature is on; see [`crate::trace!`].

use once_cell::sync::Lazy;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::Mutex;

pub mod macros;

const TRACE_CAPACITY: usize = 500_000;

pub static TRACER: Lazy<Mutex<TraceLog>> = Lazy::new(|| Mutex::new(TraceLog::new(TRACE_CAPACITY)));

pub struct TraceLog {
    entries: VecDeque<String>,
    capacity: usize,
}

impl TraceLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(4096)),
            capacity,
        }
    }

    /// Appends one line, evicting the oldest when full
    pub fn push(&mut self, line: String) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(line);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Writes every line, numbered from the oldest
    pub fn dump(&self, out: &mut impl Write) -> io::Result<()> {
        for (index, line) in self.entries.iter().enumerate() {
            writeln!(out, "{index:06} {line}")?;
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
