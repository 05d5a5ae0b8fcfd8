//! Row stores and the types exchanged with them.
//!
//! A [`RowStore`] is the backing storage engine a selection is read from. It reports its length
//! and chunking, and reads one contiguous range of rows directly into a caller-provided region of
//! a [`RowBuffer`]. Everything else about opening datasets or discovering their metadata is left
//! to the caller.

pub use buffer::*;
pub use columns::*;
pub use file::*;
pub use instrumented::*;
pub use memory::*;
pub use native::*;
pub use offset::*;
pub use serial::*;
pub use store::*;

mod buffer;
mod columns;
mod file;
mod instrumented;
mod memory;
mod native;
mod offset;
mod serial;
mod store;
