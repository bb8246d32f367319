// Styled Text Buffer
// A flat sequence of characters with all formatting kept out of band as
// style ranges. Ranges live in an arena keyed by RangeKey and are shifted and
// clipped explicitly on every mutation, so merging or splitting paragraphs can
// never leave a range pointing at text that no longer exists.

use std::cmp::{max, min};

use slotmap::{SlotMap, new_key_type};

use crate::error::{EditError, SpanBoundaryError};
use crate::image::{ImageElement, ImageHandle};

/// Placeholder character standing in for separator lines and images
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

new_key_type! {
    /// Handle of a style range inside a buffer's arena
    pub struct RangeKey;
}

/// Rendering parameters of a quote paragraph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteStyle {
    pub color: u32,
    pub indent: u32,
    pub stripe_width: u32,
}

/// Rendering parameters of a horizontal separator line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeparatorStyle {
    pub color: u32,
    pub stroke_width: f32,
}

/// An inline image sitting on a placeholder character
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSpan {
    pub element: ImageElement,
    pub handle: ImageHandle,
}

/// What a style range means
#[derive(Debug, Clone, PartialEq)]
pub enum StyleKind {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Link(String),
    Quote(QuoteStyle),
    Separator(SeparatorStyle),
    Image(ImageSpan),
}

impl StyleKind {
    /// Paragraph-scoped kinds must start and end at paragraph boundaries
    pub fn is_paragraph_scoped(&self) -> bool {
        matches!(self, StyleKind::Quote(_))
    }

    /// Character-level formatting that may be split into runs freely
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            StyleKind::Bold
                | StyleKind::Italic
                | StyleKind::Underline
                | StyleKind::Strikethrough
                | StyleKind::Link(_)
        )
    }

    pub fn name(&self) -> &'static str {
        match self {
            StyleKind::Bold => "bold",
            StyleKind::Italic => "italic",
            StyleKind::Underline => "underline",
            StyleKind::Strikethrough => "strikethrough",
            StyleKind::Link(_) => "link",
            StyleKind::Quote(_) => "quote",
            StyleKind::Separator(_) => "separator",
            StyleKind::Image(_) => "image",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            StyleKind::Quote(_) => 0,
            StyleKind::Separator(_) => 1,
            StyleKind::Image(_) => 2,
            StyleKind::Link(_) => 3,
            StyleKind::Bold => 4,
            StyleKind::Italic => 5,
            StyleKind::Underline => 6,
            StyleKind::Strikethrough => 7,
        }
    }
}

/// An annotation over `[start, end)` of the buffer
#[derive(Debug, Clone, PartialEq)]
pub struct StyleRange {
    pub kind: StyleKind,
    pub start: usize,
    pub end: usize,
}

impl StyleRange {
    pub fn new(kind: StyleKind, start: usize, end: usize) -> Self {
        StyleRange { kind, start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether this range shares at least one character with `[start, end)`.
    /// Empty ranges count when they sit inside the interval.
    pub fn overlaps(&self, start: usize, end: usize) -> bool {
        if start == end {
            return false;
        }
        if self.is_empty() {
            self.start >= start && self.start < end
        } else {
            self.start < end && self.end > start
        }
    }
}

/// Characters plus an arena of style ranges
#[derive(Debug, Clone, Default)]
pub struct StyledBuffer {
    chars: Vec<char>,
    ranges: SlotMap<RangeKey, StyleRange>,
}

impl StyledBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A buffer holding `text` without any styling
    pub fn from_text(text: &str) -> Self {
        StyledBuffer {
            chars: text.chars().collect(),
            ranges: SlotMap::with_key(),
        }
    }

    /// Length in characters (code points)
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    pub fn chars(&self) -> &[char] {
        &self.chars
    }

    pub fn char_at(&self, pos: usize) -> Option<char> {
        self.chars.get(pos).copied()
    }

    pub fn last_char(&self) -> Option<char> {
        self.chars.last().copied()
    }

    /// Text of `[start, end)`
    pub fn slice_text(&self, start: usize, end: usize) -> Result<String, EditError> {
        self.check_bounds(start, end)?;
        Ok(self.chars[start..end].iter().collect())
    }

    /// `0`, `len`, or any position directly after a newline
    pub fn is_paragraph_boundary(&self, pos: usize) -> bool {
        is_boundary(&self.chars, pos)
    }

    pub fn push_char(&mut self, ch: char) {
        self.chars.push(ch);
    }

    pub fn push_str(&mut self, text: &str) {
        self.chars.extend(text.chars());
    }

    /// Append `text` and cover it with a range of `kind`
    pub fn push_styled(&mut self, text: &str, kind: StyleKind) -> Result<RangeKey, EditError> {
        let start = self.len();
        self.push_str(text);
        let end = self.len();
        match self.add_range(kind, start, end) {
            Ok(key) => Ok(key),
            Err(err) => {
                self.chars.truncate(start);
                Err(err)
            }
        }
    }

    /// Drop a single trailing newline; returns whether one was removed
    pub fn trim_trailing_newline(&mut self) -> bool {
        if self.last_char() != Some('\n') {
            return false;
        }
        let len = self.len();
        self.delete(len - 1, len).is_ok()
    }

    /// Add a style range over `[start, end)`
    pub fn add_range(
        &mut self,
        kind: StyleKind,
        start: usize,
        end: usize,
    ) -> Result<RangeKey, EditError> {
        self.check_bounds(start, end)?;
        if kind.is_paragraph_scoped()
            && !(self.is_paragraph_boundary(start) && self.is_paragraph_boundary(end))
        {
            return Err(SpanBoundaryError {
                kind: kind.name(),
                start,
                end,
            }
            .into());
        }
        Ok(self.ranges.insert(StyleRange::new(kind, start, end)))
    }

    pub fn remove_range(&mut self, key: RangeKey) -> Option<StyleRange> {
        self.ranges.remove(key)
    }

    pub fn range(&self, key: RangeKey) -> Option<&StyleRange> {
        self.ranges.get(key)
    }

    pub fn range_count(&self) -> usize {
        self.ranges.len()
    }

    /// All ranges ordered by start, longer ranges first on ties
    pub fn ranges(&self) -> Vec<&StyleRange> {
        self.ranges_with_keys()
            .into_iter()
            .map(|(_, range)| range)
            .collect()
    }

    pub fn ranges_with_keys(&self) -> Vec<(RangeKey, &StyleRange)> {
        let mut ranges: Vec<(RangeKey, &StyleRange)> = self.ranges.iter().collect();
        ranges.sort_by(|(_, a), (_, b)| {
            a.start
                .cmp(&b.start)
                .then(b.end.cmp(&a.end))
                .then(a.kind.rank().cmp(&b.kind.rank()))
        });
        ranges
    }

    /// Insert a styled fragment at `pos`; returns the inserted length
    pub fn insert(&mut self, pos: usize, fragment: &StyledBuffer) -> Result<usize, EditError> {
        self.replace_range(pos, pos, fragment)
    }

    pub fn insert_str(&mut self, pos: usize, text: &str) -> Result<usize, EditError> {
        self.replace_range(pos, pos, &StyledBuffer::from_text(text))
    }

    pub fn delete(&mut self, start: usize, end: usize) -> Result<(), EditError> {
        self.replace_range(start, end, &StyledBuffer::new())
            .map(|_| ())
    }

    /// Replace `[start, end)` with `fragment`; returns the inserted length.
    ///
    /// The edit is computed on a scratch copy and committed only when every
    /// paragraph-scoped range still sits on paragraph boundaries. Otherwise a
    /// [`SpanBoundaryError`] is returned and the buffer is left untouched.
    pub fn replace_range(
        &mut self,
        start: usize,
        end: usize,
        fragment: &StyledBuffer,
    ) -> Result<usize, EditError> {
        self.check_bounds(start, end)?;
        let inserted = fragment.len();

        let mut chars = Vec::with_capacity(self.chars.len() - (end - start) + inserted);
        chars.extend_from_slice(&self.chars[..start]);
        chars.extend_from_slice(&fragment.chars);
        chars.extend_from_slice(&self.chars[end..]);

        let mut ranges = self.ranges.clone();
        let mut dropped = Vec::new();
        for (key, range) in ranges.iter_mut() {
            match adjust_range(range.start, range.end, start, end, inserted) {
                Some((new_start, new_end)) => {
                    range.start = new_start;
                    range.end = new_end;
                }
                None => dropped.push(key),
            }
        }
        for key in dropped {
            ranges.remove(key);
        }
        for range in fragment.ranges.values() {
            ranges.insert(StyleRange::new(
                range.kind.clone(),
                range.start + start,
                range.end + start,
            ));
        }

        validate_ranges(&chars, &ranges)?;

        self.chars = chars;
        self.ranges = ranges;
        Ok(inserted)
    }

    /// Copy `[start, end)` together with every overlapping range, clipped to
    /// the interval and re-based to zero
    pub fn sub_range(&self, start: usize, end: usize) -> Result<StyledBuffer, EditError> {
        self.check_bounds(start, end)?;
        let mut out = StyledBuffer {
            chars: self.chars[start..end].to_vec(),
            ranges: SlotMap::with_key(),
        };
        for (_, range) in self.ranges_with_keys() {
            if !range.overlaps(start, end) {
                continue;
            }
            let clipped_start = max(range.start, start) - start;
            let clipped_end = min(range.end, end) - start;
            out.ranges.insert(StyleRange::new(
                range.kind.clone(),
                clipped_start,
                clipped_end,
            ));
        }
        Ok(out)
    }

    /// Check every paragraph-scoped range
    pub fn validate(&self) -> Result<(), SpanBoundaryError> {
        validate_ranges(&self.chars, &self.ranges)
    }

    /// Merge nested or overlapping quotes into one range and coalesce
    /// touching runs of identical inline formatting
    pub fn normalize(&mut self) {
        let mut ranges: Vec<StyleRange> = self.ranges().into_iter().cloned().collect();
        let mut merged: Vec<StyleRange> = Vec::with_capacity(ranges.len());
        for range in ranges.drain(..) {
            if let Some(target) = merged.iter_mut().rev().find(|m| mergeable(m, &range)) {
                target.end = max(target.end, range.end);
                continue;
            }
            merged.push(range);
        }

        self.ranges.clear();
        for range in merged {
            self.ranges.insert(range);
        }
    }

    /// Give every quote range the same rendering parameters
    pub fn restyle_quotes(&mut self, style: QuoteStyle) {
        for range in self.ranges.values_mut() {
            if let StyleKind::Quote(quote) = &mut range.kind {
                *quote = style;
            }
        }
    }

    fn check_bounds(&self, start: usize, end: usize) -> Result<(), EditError> {
        if start > end || end > self.chars.len() {
            return Err(EditError::OutOfBounds {
                start,
                end,
                len: self.chars.len(),
            });
        }
        Ok(())
    }
}

impl PartialEq for StyledBuffer {
    fn eq(&self, other: &Self) -> bool {
        if self.chars != other.chars || self.ranges.len() != other.ranges.len() {
            return false;
        }
        let mut unmatched: Vec<&StyleRange> = other.ranges.values().collect();
        for range in self.ranges.values() {
            match unmatched.iter().position(|candidate| *candidate == range) {
                Some(idx) => {
                    unmatched.swap_remove(idx);
                }
                None => return false,
            }
        }
        true
    }
}

fn is_boundary(chars: &[char], pos: usize) -> bool {
    pos == 0 || pos == chars.len() || chars.get(pos - 1) == Some(&'\n')
}

fn validate_ranges(
    chars: &[char],
    ranges: &SlotMap<RangeKey, StyleRange>,
) -> Result<(), SpanBoundaryError> {
    for range in ranges.values() {
        if range.kind.is_paragraph_scoped()
            && !(is_boundary(chars, range.start) && is_boundary(chars, range.end))
        {
            return Err(SpanBoundaryError {
                kind: range.kind.name(),
                start: range.start,
                end: range.end,
            });
        }
    }
    Ok(())
}

/// New position of a range after `[start, end)` was replaced by `inserted`
/// characters, or `None` when the range disappears with the replaced text.
fn adjust_range(
    range_start: usize,
    range_end: usize,
    start: usize,
    end: usize,
    inserted: usize,
) -> Option<(usize, usize)> {
    let shift = |pos: usize| pos - (end - start) + inserted;

    if start == end {
        // Pure insertion: range ends are exclusive, so text typed at the
        // end of a range stays outside of it
        if range_start >= start {
            return Some((range_start + inserted, range_end + inserted));
        }
        if range_end <= start {
            return Some((range_start, range_end));
        }
        return Some((range_start, range_end + inserted));
    }

    if range_end <= start {
        if range_start == range_end && range_start == start {
            return Some((start + inserted, start + inserted));
        }
        return Some((range_start, range_end));
    }
    if range_start >= end {
        return Some((shift(range_start), shift(range_end)));
    }
    if range_start >= start && range_end <= end {
        return None;
    }
    if range_start < start && range_end > end {
        return Some((range_start, shift(range_end)));
    }
    if range_start < start {
        // Tail of the range was replaced
        return Some((range_start, start));
    }
    // Head of the range was replaced
    Some((start + inserted, shift(range_end)))
}

fn mergeable(existing: &StyleRange, next: &StyleRange) -> bool {
    match (&existing.kind, &next.kind) {
        (StyleKind::Quote(_), StyleKind::Quote(_)) => next.start < existing.end,
        (a, b) if a.is_inline() && a == b => next.start <= existing.end,
        _ => false,
    }
}
