use core::pin::Pin;
use core::task::{Context, Poll};
use std::cmp::Ordering;
use std::iter::Peekable;
use std::mem;

use futures::{Stream, ready};
use pin_project_lite::pin_project;
use tracing::debug;

use crate::error::EtlResult;
use crate::normalize::{ChangelogNormalizer, is_carry_over_pair, is_update_pair};
use crate::types::{Cell, ChangeRecord, ChangeType, ChangelogSchema, IdentifierColumns};

/// Record held back by the streaming state machine between steps.
#[derive(Debug, Default)]
enum Lookahead {
    /// Nothing is buffered.
    #[default]
    Empty,
    /// The successor of the last emitted record, not yet classified.
    Pending(ChangeRecord),
    /// The `UPDATE_AFTER` half of a pair whose `UPDATE_BEFORE` half was already emitted.
    PendingUpdate(ChangeRecord),
}

/// Classifies `current` against its successor.
///
/// Returns the record to emit, if any, and what must be buffered for the next step.
fn classify(
    identifier: &IdentifierColumns,
    current: ChangeRecord,
    next: Option<ChangeRecord>,
) -> (Option<ChangeRecord>, Lookahead) {
    match next {
        None => (Some(current), Lookahead::Empty),
        Some(next) if is_update_pair(identifier, &current, &next) => {
            if is_carry_over_pair(&current, &next) {
                return (None, Lookahead::Empty);
            }

            (
                Some(current.relabel(ChangeType::UpdateBefore)),
                Lookahead::PendingUpdate(next.relabel(ChangeType::UpdateAfter)),
            )
        }
        Some(next) => (Some(current), Lookahead::Pending(next)),
    }
}

/// Single-pass changelog normalizer with one record of lookahead.
///
/// The input must be sorted by identifier columns, with `DELETE` before `INSERT` for equal
/// identifiers. Only adjacent records are compared, so unsorted input yields unmatched records
/// that pass through unchanged. A `DELETE` followed by an `INSERT` of the same logical row
/// becomes `UPDATE_BEFORE`/`UPDATE_AFTER`, or is dropped entirely when both records are
/// identical in every field.
#[derive(Debug)]
pub struct ChangelogIterator<I: Iterator<Item = ChangeRecord>> {
    upstream: Peekable<I>,
    identifier: IdentifierColumns,
    lookahead: Lookahead,
}

impl<I> ChangelogIterator<I>
where
    I: Iterator<Item = ChangeRecord>,
{
    /// Creates a new [`ChangelogIterator`] over `upstream`.
    pub fn new(upstream: I, identifier: IdentifierColumns) -> Self {
        Self {
            upstream: upstream.peekable(),
            identifier,
            lookahead: Lookahead::Empty,
        }
    }

    /// Returns `true` while a record is buffered or upstream has more records.
    pub fn has_next(&mut self) -> bool {
        !matches!(self.lookahead, Lookahead::Empty) || self.upstream.peek().is_some()
    }

    /// Advances the state machine by one record.
    ///
    /// Returns [`None`] when the step dropped a carry-over pair. Must only be called while
    /// [`ChangelogIterator::has_next`] holds.
    fn step(&mut self) -> Option<ChangeRecord> {
        let current = match mem::take(&mut self.lookahead) {
            Lookahead::PendingUpdate(record) => return Some(record),
            Lookahead::Pending(record) => record,
            Lookahead::Empty => self.upstream.next()?,
        };

        let next = self.upstream.next();
        let (output, lookahead) = classify(&self.identifier, current, next);
        self.lookahead = lookahead;

        output
    }
}

impl<I> Iterator for ChangelogIterator<I>
where
    I: Iterator<Item = ChangeRecord>,
{
    type Item = ChangeRecord;

    fn next(&mut self) -> Option<Self::Item> {
        while self.has_next() {
            if let Some(record) = self.step() {
                return Some(record);
            }
        }

        None
    }
}

pin_project! {
    /// A stream adapter applying the streaming normalization state machine to an async source.
    ///
    /// Behaves exactly like [`ChangelogIterator`], including its sorting precondition.
    #[must_use = "streams do nothing unless polled"]
    #[derive(Debug)]
    pub struct ChangelogStream<S: Stream<Item = ChangeRecord>> {
        #[pin]
        stream: S,
        identifier: IdentifierColumns,
        lookahead: Lookahead,
        current: Option<ChangeRecord>,
        upstream_ended: bool,
    }
}

impl<S> ChangelogStream<S>
where
    S: Stream<Item = ChangeRecord>,
{
    /// Creates a new [`ChangelogStream`] wrapping `stream`.
    pub fn wrap(stream: S, identifier: IdentifierColumns) -> Self {
        Self {
            stream,
            identifier,
            lookahead: Lookahead::Empty,
            current: None,
            upstream_ended: false,
        }
    }
}

impl<S> Stream for ChangelogStream<S>
where
    S: Stream<Item = ChangeRecord>,
{
    type Item = ChangeRecord;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            match mem::take(this.lookahead) {
                Lookahead::PendingUpdate(record) => return Poll::Ready(Some(record)),
                Lookahead::Pending(record) => *this.current = Some(record),
                Lookahead::Empty => {}
            }

            // The current record is stored before polling its successor so that it survives
            // a pending poll.
            if this.current.is_none() {
                if *this.upstream_ended {
                    return Poll::Ready(None);
                }

                match ready!(this.stream.as_mut().poll_next(cx)) {
                    Some(record) => *this.current = Some(record),
                    None => {
                        *this.upstream_ended = true;
                        return Poll::Ready(None);
                    }
                }
            }

            let next = if *this.upstream_ended {
                None
            } else {
                let next = ready!(this.stream.as_mut().poll_next(cx));
                if next.is_none() {
                    *this.upstream_ended = true;
                }
                next
            };

            let Some(current) = this.current.take() else {
                return Poll::Ready(None);
            };

            let (output, lookahead) = classify(this.identifier, current, next);
            *this.lookahead = lookahead;

            if let Some(record) = output {
                return Poll::Ready(Some(record));
            }
        }
    }
}

/// [`ChangelogNormalizer`] backed by [`ChangelogIterator`].
///
/// Callers are responsible for sorting the input, see [`sort_for_streaming`].
#[derive(Debug, Clone)]
pub struct StreamingNormalizer {
    identifier: IdentifierColumns,
}

impl StreamingNormalizer {
    /// Creates a new [`StreamingNormalizer`].
    pub fn new(identifier: IdentifierColumns) -> Self {
        Self { identifier }
    }

    /// Creates a [`StreamingNormalizer`] by resolving column names against `schema`.
    ///
    /// When the schema has a change ordinal column it is appended to the identifier, so records
    /// from different snapshot transitions are never paired. Whole-row identity already covers
    /// the ordinal and is kept as is.
    pub fn from_schema<S: AsRef<str>>(
        schema: &ChangelogSchema,
        identifier_columns: &[S],
    ) -> EtlResult<Self> {
        let identifier = schema.identifier_columns(identifier_columns)?;

        let identifier = match schema.change_ordinal_index() {
            Some(ordinal_index) if !identifier.positions().is_empty() => {
                let mut positions = identifier.positions().to_vec();
                if !positions.contains(&ordinal_index) {
                    positions.push(ordinal_index);
                }
                IdentifierColumns::new(positions)
            }
            _ => identifier,
        };

        Ok(Self::new(identifier))
    }

    /// Returns the identifier columns used to pair records.
    pub fn identifier(&self) -> &IdentifierColumns {
        &self.identifier
    }
}

impl ChangelogNormalizer for StreamingNormalizer {
    fn normalize(&self, records: Vec<ChangeRecord>) -> Vec<ChangeRecord> {
        let input = records.len();
        let output: Vec<ChangeRecord> =
            ChangelogIterator::new(records.into_iter(), self.identifier.clone()).collect();

        debug!(input, output = output.len(), "normalized changelog stream");

        output
    }
}

/// Sorts records into the order [`ChangelogIterator`] expects.
///
/// Records are ordered by identifier values, then by change ordinal when `ordinal_index` is
/// set, then by operation tag name so that `DELETE` precedes `INSERT`. The sort is stable.
pub fn sort_for_streaming(
    records: &mut [ChangeRecord],
    identifier: &IdentifierColumns,
    ordinal_index: Option<usize>,
) {
    records.sort_by(|a, b| {
        let a_key = identifier.key(&a.row);
        let b_key = identifier.key(&b.row);

        compare_cells(a_key.values(), b_key.values())
            .then_with(|| match ordinal_index {
                Some(index) => match (a.row.get(index), b.row.get(index)) {
                    (Some(a), Some(b)) => a.sort_cmp(b),
                    (a, b) => a.is_some().cmp(&b.is_some()),
                },
                None => Ordering::Equal,
            })
            .then_with(|| a.change_type.as_str().cmp(b.change_type.as_str()))
    });
}

fn compare_cells(a: &[Cell], b: &[Cell]) -> Ordering {
    a.iter()
        .zip(b.iter())
        .map(|(a, b)| a.sort_cmp(b))
        .find(|ordering| ordering.is_ne())
        .unwrap_or_else(|| a.len().cmp(&b.len()))
}
