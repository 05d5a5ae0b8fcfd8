//! Reading a sparse selection of rows from a chunked store.
//!
//! A selection is a strictly increasing list of row indices. Reading it happens in stages:
//!
//! 1. [`compress`] turns the selection into the minimal [`RangeSet`] of contiguous runs.
//! 2. [`align`] widens every run to the enclosing storage chunks of a [`ChunkGrid`] and merges
//!    runs whose chunk footprints touch or overlap.
//! 3. [`BulkReader`] issues one store read per range straight into a single preallocated
//!    [`RowBuffer`](rowsift_io::RowBuffer).
//! 4. [`extract`] gathers exactly the selected rows back out of the over-read buffer.
//!
//! The *direct* pipeline skips stages 2 and 4 and reads every compressed range as-is, while the
//! *coalesced* pipeline trades some wasted transfer for fewer, larger reads. [`IndexedReader`]
//! picks between them according to its [`ReadOptions`].

pub use align::*;
pub use bulk::*;
pub use compress::*;
pub use extract::*;
pub use metrics::*;
pub use options::*;
pub use range_set::*;
pub use reader::*;
pub use selection::*;

mod align;
mod bulk;
mod compress;
mod extract;
mod metrics;
mod options;
mod range_set;
mod reader;
mod selection;
