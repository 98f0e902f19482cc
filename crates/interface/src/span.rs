use crate::BytePos;
use std::{cmp, fmt, ops::Range};

/// A source code location.
///
/// Essentially a `lo..hi` range into a [`SourceMap`](crate::SourceMap) file's
/// source code.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Span {
    // `lo` and `hi` packed into a single value for:
    // - improved codegen of derived traits
    // - passed in a single register as an argument/return value
    data: u64,
}

impl Default for Span {
    #[inline(always)]
    fn default() -> Self {
        Self::DUMMY
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Span({lo}..{hi})", lo = self.lo().0, hi = self.hi().0)
    }
}

impl PartialOrd for Span {
    #[inline]
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Span {
    #[inline]
    fn cmp(&self, other: &Self) -> cmp::Ordering {
        self.lo().cmp(&other.lo()).then(self.hi().cmp(&other.hi()))
    }
}

impl Span {
    /// A dummy span.
    pub const DUMMY: Self = Self::new_(BytePos(0), BytePos(0));

    /// Creates a new span from two byte positions.
    #[inline]
    pub fn new(mut lo: BytePos, mut hi: BytePos) -> Self {
        if lo > hi {
            std::mem::swap(&mut lo, &mut hi);
        }
        Self::new_(lo, hi)
    }

    /// Creates a new span from two byte positions, without checking that `lo`
    /// is less than or equal to `hi`.
    ///
    /// The behavior of various methods is unspecified if `lo > hi`.
    #[inline]
    #[cfg_attr(debug_assertions, track_caller)]
    pub fn new_unchecked(lo: BytePos, hi: BytePos) -> Self {
        debug_assert!(lo <= hi, "creating span with lo {lo:?} > hi {hi:?}");
        Self::new_(lo, hi)
    }

    #[inline(always)]
    const fn new_(lo: BytePos, hi: BytePos) -> Self {
        Self { data: (lo.0 as u64) | ((hi.0 as u64) << 32) }
    }

    /// Creates a span covering a single byte at `pos`.
    #[inline]
    pub fn point(pos: BytePos) -> Self {
        Self::new_(pos, pos + 1)
    }

    /// Returns the span's start position.
    #[inline(always)]
    pub fn lo(self) -> BytePos {
        BytePos(self.data as u32)
    }

    /// Creates a new span with the same hi position as this span and the given lo position.
    #[inline]
    pub fn with_lo(self, lo: BytePos) -> Self {
        Self::new(lo, self.hi())
    }

    /// Returns the span's end position.
    #[inline(always)]
    pub fn hi(self) -> BytePos {
        BytePos((self.data >> 32) as u32)
    }

    /// Creates a new span with the same lo position as this span and the given hi position.
    #[inline]
    pub fn with_hi(self, hi: BytePos) -> Self {
        Self::new(self.lo(), hi)
    }

    /// Returns the span as a `Range<usize>`.
    #[inline]
    pub fn to_range(self) -> Range<usize> {
        self.lo().to_usize()..self.hi().to_usize()
    }

    /// Returns the length of the span in bytes.
    #[inline]
    pub fn len(self) -> usize {
        (self.hi() - self.lo()).to_usize()
    }

    /// Returns `true` if the span covers no bytes.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.lo() == self.hi()
    }

    /// Creates a new span representing an empty span at the beginning of this span.
    #[inline]
    pub fn shrink_to_lo(self) -> Self {
        Self::new_unchecked(self.lo(), self.lo())
    }

    /// Creates a new span representing an empty span at the end of this span.
    #[inline]
    pub fn shrink_to_hi(self) -> Self {
        Self::new_unchecked(self.hi(), self.hi())
    }

    /// Returns `true` if this is a dummy span.
    #[inline]
    pub fn is_dummy(self) -> bool {
        self == Self::DUMMY
    }

    /// Returns `true` if `self` fully encloses `other`.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.lo() <= other.lo() && other.hi() <= self.hi()
    }

    /// Returns `true` if `pos` lies inside `self`.
    #[inline]
    pub fn contains_pos(self, pos: BytePos) -> bool {
        self.lo() <= pos && pos < self.hi()
    }

    /// Returns `true` if `self` touches `other`.
    #[inline]
    pub fn overlaps(self, other: Self) -> bool {
        self.lo() < other.hi() && other.lo() < self.hi()
    }

    /// Returns a `Span` that would enclose both `self` and `end`.
    ///
    /// ```text
    ///     ____             ___
    ///     self lorem ipsum end
    ///     ^^^^^^^^^^^^^^^^^^^^
    /// ```
    #[inline]
    pub fn to(self, end: Self) -> Self {
        Self::new(cmp::min(self.lo(), end.lo()), cmp::max(self.hi(), end.hi()))
    }

    /// Returns a `Span` from the beginning of `self` until the beginning of `end`.
    ///
    /// ```text
    ///     ____             ___
    ///     self lorem ipsum end
    ///     ^^^^^^^^^^^^^^^^^
    /// ```
    #[inline]
    pub fn until(self, end: Self) -> Self {
        Self::new(self.lo(), end.lo())
    }

    /// Joins all the spans in the given iterator using [`to`](Self::to).
    ///
    /// Returns [`DUMMY`](Self::DUMMY) if the iterator is empty.
    #[inline]
    pub fn join_many(spans: impl IntoIterator<Item = Self>) -> Self {
        spans.into_iter().reduce(Self::to).unwrap_or_default()
    }
}
