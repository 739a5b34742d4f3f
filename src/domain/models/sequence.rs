//! Unit sequences: ordered, sliceable views over a shared arena of atomic units.
//!
//! A [`UnitSequence`] never copies units when it is sliced or when a range is
//! removed from it. Every sequence derived from the same input shares one
//! `Arc<[U]>` arena and only differs in its list of [`Span`]s.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// An atomic unit of reducible content (a byte, a character, a line, a token).
pub trait Unit: Clone + Send + Sync + 'static {
    /// Append the byte representation of this unit to `out`.
    fn encode(&self, out: &mut Vec<u8>);
}

impl Unit for u8 {
    fn encode(&self, out: &mut Vec<u8>) {
        out.push(*self);
    }
}

impl Unit for char {
    fn encode(&self, out: &mut Vec<u8>) {
        let mut buf = [0u8; 4];
        out.extend_from_slice(self.encode_utf8(&mut buf).as_bytes());
    }
}

impl Unit for String {
    fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }
}

/// Half-open range `[start, end)` of arena indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub const fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub const fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

/// Ordered sequence of units backed by a shared arena.
///
/// Spans are kept normalized: none is empty and no two consecutive spans are
/// adjacent in the arena. Two sequences over the same arena with equal spans
/// therefore have equal content, which makes [`UnitSequence::spans`] usable
/// as a cache key within one reduction run.
#[derive(Clone)]
pub struct UnitSequence<U> {
    arena: Arc<[U]>,
    spans: Vec<Span>,
    len: usize,
}

impl<U: Unit> UnitSequence<U> {
    /// Create a sequence owning a fresh arena.
    pub fn new(units: Vec<U>) -> Self {
        let arena: Arc<[U]> = Arc::from(units);
        let len = arena.len();
        let spans = if len == 0 {
            Vec::new()
        } else {
            vec![Span { start: 0, end: len }]
        };
        Self { arena, spans, len }
    }

    /// Number of units in the sequence.
    pub const fn len(&self) -> usize {
        self.len
    }

    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Normalized arena spans making up this sequence, in order.
    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    /// Whether both sequences slice the same arena.
    pub fn shares_arena(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.arena, &other.arena)
    }

    /// Iterate over the units in order.
    pub fn iter(&self) -> impl Iterator<Item = &U> + '_ {
        self.chunks().flat_map(<[U]>::iter)
    }

    /// Iterate over the contiguous arena slices making up the sequence.
    pub fn chunks(&self) -> impl Iterator<Item = &[U]> + '_ {
        self.spans.iter().map(|span| &self.arena[span.start..span.end])
    }

    /// Sub-sequence covering the logical index range. Out-of-bounds ends are clamped.
    pub fn slice(&self, range: Range<usize>) -> Self {
        let (start, end) = self.clamp_range(range);
        let mut spans = Vec::new();
        self.collect_spans(start, end, &mut spans);
        Self::from_spans(Arc::clone(&self.arena), spans)
    }

    /// Sequence with the logical index range removed.
    pub fn without(&self, range: Range<usize>) -> Self {
        let (start, end) = self.clamp_range(range);
        let mut spans = Vec::with_capacity(self.spans.len() + 1);
        self.collect_spans(0, start, &mut spans);
        self.collect_spans(end, self.len, &mut spans);
        Self::from_spans(Arc::clone(&self.arena), spans)
    }

    /// Concatenate sequences sharing one arena, in order.
    ///
    /// Returns `None` for an empty slice or when the arenas differ.
    pub fn concat(parts: &[Self]) -> Option<Self> {
        let (first, rest) = parts.split_first()?;
        if rest.iter().any(|part| !first.shares_arena(part)) {
            return None;
        }
        let spans = parts
            .iter()
            .flat_map(|part| part.spans.iter().copied())
            .collect();
        Some(Self::from_spans(Arc::clone(&first.arena), spans))
    }

    /// Copy the units out into an owned vector.
    pub fn to_vec(&self) -> Vec<U> {
        self.iter().cloned().collect()
    }

    /// Encode the sequence as bytes, unit by unit.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.len);
        for unit in self.iter() {
            unit.encode(&mut out);
        }
        out
    }

    /// Encoded bytes interpreted as UTF-8, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.to_bytes()).into_owned()
    }

    fn clamp_range(&self, range: Range<usize>) -> (usize, usize) {
        let start = range.start.min(self.len);
        let end = range.end.clamp(start, self.len);
        (start, end)
    }

    fn collect_spans(&self, start: usize, end: usize, out: &mut Vec<Span>) {
        if start >= end {
            return;
        }
        let mut offset = 0;
        for span in &self.spans {
            let span_end = offset + span.len();
            if span_end > start && offset < end {
                let from = start.max(offset) - offset;
                let to = end.min(span_end) - offset;
                out.push(Span {
                    start: span.start + from,
                    end: span.start + to,
                });
            }
            if span_end >= end {
                break;
            }
            offset = span_end;
        }
    }

    fn from_spans(arena: Arc<[U]>, spans: Vec<Span>) -> Self {
        let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
        for span in spans.into_iter().filter(|span| !span.is_empty()) {
            match merged.last_mut() {
                Some(last) if last.end == span.start => last.end = span.end,
                _ => merged.push(span),
            }
        }
        let len = merged.iter().map(Span::len).sum();
        Self {
            arena,
            spans: merged,
            len,
        }
    }
}

impl<U: Unit> From<Vec<U>> for UnitSequence<U> {
    fn from(units: Vec<U>) -> Self {
        Self::new(units)
    }
}

impl<U: Unit> FromIterator<U> for UnitSequence<U> {
    fn from_iter<I: IntoIterator<Item = U>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl From<&str> for UnitSequence<char> {
    fn from(text: &str) -> Self {
        text.chars().collect()
    }
}

impl From<&[u8]> for UnitSequence<u8> {
    fn from(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }
}

impl<U: Unit + PartialEq> PartialEq for UnitSequence<U> {
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().eq(other.iter())
    }
}

impl<U: Unit + Eq> Eq for UnitSequence<U> {}

impl<U: Unit + fmt::Debug> fmt::Debug for UnitSequence<U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl fmt::Display for UnitSequence<char> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use fmt::Write;
        self.iter().try_for_each(|c| f.write_char(*c))
    }
}
