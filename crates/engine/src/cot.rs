// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Streaming chain-of-thought parser.
//!
//! Partitions an agent's chunk stream into visible text and thought,
//! delimited by the literal tags `<thought>` and `</thought>`. The parser
//! holds back a trailing fragment only while it can still be a prefix of
//! the expected tag, so tags split across chunk boundaries are matched
//! and everything else passes through verbatim. Concatenating all
//! emissions in order recovers the input minus the matched tag literals.

const OPEN_TAG: &str = "<thought>";
const CLOSE_TAG: &str = "</thought>";

/// One parsed region of the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Thought(String),
}

/// Incremental tag-splitting state machine.
///
/// Nesting is not honored: once inside a thought region, the next
/// `</thought>` closes it and further `<thought>` literals pass through
/// as thought content.
#[derive(Debug, Default)]
pub struct CotParser {
    in_thought: bool,
    /// Trailing bytes that may still become the expected tag
    held: String,
}

impl CotParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk; returns the segments completed by it.
    pub fn push(&mut self, chunk: &str) -> Vec<Segment> {
        let mut data = std::mem::take(&mut self.held);
        data.push_str(chunk);

        let mut out = Vec::new();
        let mut emit = String::new();
        let mut i = 0;
        loop {
            let Some(off) = data[i..].find('<') else {
                emit.push_str(&data[i..]);
                break;
            };
            emit.push_str(&data[i..i + off]);
            i += off;

            let rest = &data[i..];
            let tag = if self.in_thought { CLOSE_TAG } else { OPEN_TAG };
            if rest.starts_with(tag) {
                self.emit_segment(&mut out, &mut emit);
                self.in_thought = !self.in_thought;
                i += tag.len();
            } else if rest.len() < tag.len() && tag.starts_with(rest) {
                // Could still become the tag; wait for more input.
                self.held = rest.to_string();
                break;
            } else {
                // A bare '<' that does not begin the expected tag.
                emit.push('<');
                i += 1;
            }
        }
        self.emit_segment(&mut out, &mut emit);
        out
    }

    /// End of stream: whatever is held can no longer become a tag.
    pub fn flush(&mut self) -> Vec<Segment> {
        let held = std::mem::take(&mut self.held);
        if held.is_empty() {
            return Vec::new();
        }
        vec![self.segment(held)]
    }

    fn emit_segment(&self, out: &mut Vec<Segment>, emit: &mut String) {
        if emit.is_empty() {
            return;
        }
        out.push(self.segment(std::mem::take(emit)));
    }

    fn segment(&self, content: String) -> Segment {
        if self.in_thought {
            Segment::Thought(content)
        } else {
            Segment::Text(content)
        }
    }
}

#[cfg(test)]
#[path = "cot_tests.rs"]
mod tests;
