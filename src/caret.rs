use std::cmp::{max, min};

/// Caret or selection inside a [`crate::styled_buffer::StyledBuffer`].
///
/// Always normalized so that `start <= end`; `start == end` is a collapsed
/// caret.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Caret {
    start: usize,
    end: usize,
}

impl Caret {
    pub fn new(start: usize, end: usize) -> Self {
        Caret {
            start: min(start, end),
            end: max(start, end),
        }
    }

    /// A collapsed caret at `pos`
    pub fn at(pos: usize) -> Self {
        Caret {
            start: pos,
            end: pos,
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    pub fn length(&self) -> usize {
        self.end - self.start
    }

    /// Clamp both ends to a buffer of `len` characters
    pub fn clamp(&self, len: usize) -> Self {
        Caret::new(min(self.start, len), min(self.end, len))
    }
}
