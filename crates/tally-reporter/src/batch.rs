//! Partitioning of a cycle's data points into request-sized batches.

use std::num::NonZeroUsize;
use std::slice::Chunks;

/// Split `items` into consecutive batches of at most `max_size`.
///
/// Order is preserved, only the last batch may be short, and an empty
/// input yields no batches at all.
pub fn batches<T>(items: &[T], max_size: NonZeroUsize) -> Chunks<'_, T> {
    items.chunks(max_size.get())
}
