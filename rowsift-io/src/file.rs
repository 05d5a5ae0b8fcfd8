use std::fs::File;
use std::marker::PhantomData;
use std::ops::{Deref, Range};
use std::os::unix::fs::FileExt;
use std::path::Path;
use std::sync::Arc;

use rowsift_error::{RowsiftError, RowsiftResult, rowsift_bail, rowsift_err};

use crate::{ColumnSelector, NativeValue, RowStore, check_read_range, le_to_native};

/// Upper bound on the scratch space used when reading a subset of columns.
const SCRATCH_BYTES: usize = 1 << 16;

/// Describes how rows are laid out in a headerless, row-major file of little-endian values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileLayout {
    /// Bytes to skip before the first row.
    pub header_bytes: u64,
    pub ndim: usize,
    /// Values per row, 1 for one-dimensional data.
    pub row_width: usize,
    /// Rows per storage chunk, if the data was written in chunks.
    pub chunk_size: Option<usize>,
    pub max_concurrent_reads: usize,
}

impl Default for FileLayout {
    fn default() -> Self {
        Self {
            header_bytes: 0,
            ndim: 1,
            row_width: 1,
            chunk_size: None,
            max_concurrent_reads: 8,
        }
    }
}

impl FileLayout {
    pub fn one_dimensional() -> Self {
        Self::default()
    }

    pub fn two_dimensional(row_width: usize) -> Self {
        Self {
            ndim: 2,
            row_width,
            ..Self::default()
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    pub fn with_header_bytes(mut self, header_bytes: u64) -> Self {
        self.header_bytes = header_bytes;
        self
    }

    pub fn with_max_concurrent_reads(mut self, max_concurrent_reads: usize) -> Self {
        self.max_concurrent_reads = max_concurrent_reads.max(1);
        self
    }
}

/// A cheaply cloneable, read-only [`RowStore`] backed by a file on the local file system.
///
/// Reads are positioned (`pread`), so a single file descriptor serves concurrent readers
/// without any shared cursor. When the last clone is dropped, the file descriptor is closed.
#[derive(Debug)]
pub struct FileStore<T> {
    file: Arc<File>,
    layout: FileLayout,
    len: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for FileStore<T> {
    fn clone(&self) -> Self {
        Self {
            file: self.file.clone(),
            layout: self.layout,
            len: self.len,
            _marker: PhantomData,
        }
    }
}

impl<T: NativeValue> FileStore<T> {
    /// Open a file on the current file system.
    pub fn open(path: impl AsRef<Path>, layout: FileLayout) -> RowsiftResult<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            RowsiftError::from(e).with_context(format!("opening {}", path.display()))
        })?;
        Self::try_new(file, layout)
    }

    /// Wrap an already-open file.
    pub fn try_new(file: File, layout: FileLayout) -> RowsiftResult<Self> {
        if layout.row_width == 0 {
            rowsift_bail!("Row width must be positive");
        }
        if layout.ndim <= 1 && layout.row_width != 1 {
            rowsift_bail!(
                "One-dimensional layouts have a row width of 1, got {}",
                layout.row_width
            );
        }

        let size = file.metadata()?.len();
        let Some(payload) = size.checked_sub(layout.header_bytes) else {
            rowsift_bail!(
                ShapeMismatch: "File of {} bytes is shorter than its {} byte header",
                size,
                layout.header_bytes
            );
        };
        let row_bytes = (layout.row_width * T::PTYPE.byte_width()) as u64;
        if payload % row_bytes != 0 {
            rowsift_bail!(
                ShapeMismatch: "Payload of {} bytes does not divide into {} byte rows of {}",
                payload,
                row_bytes,
                T::PTYPE
            );
        }
        let len = usize::try_from(payload / row_bytes)
            .map_err(|_| rowsift_err!("Row count does not fit into a usize"))?;

        log::debug!(
            "Opened file store with {} rows of {} x {}",
            len,
            layout.row_width,
            T::PTYPE
        );

        Ok(Self {
            file: Arc::new(file),
            layout,
            len,
            _marker: PhantomData,
        })
    }

    pub fn layout(&self) -> &FileLayout {
        &self.layout
    }

    fn row_bytes(&self) -> usize {
        self.layout.row_width * T::PTYPE.byte_width()
    }
}

// Implement deref coercion for non-mut `File` methods on `FileStore`.
impl<T> Deref for FileStore<T> {
    type Target = File;

    fn deref(&self) -> &Self::Target {
        &self.file
    }
}

impl<T: NativeValue> RowStore<T> for FileStore<T> {
    fn len(&self) -> usize {
        self.len
    }

    fn chunk_size(&self) -> Option<usize> {
        self.layout.chunk_size
    }

    fn ndim(&self) -> usize {
        self.layout.ndim
    }

    fn row_width(&self) -> usize {
        self.layout.row_width
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, dest)))]
    fn read_range(
        &self,
        rows: Range<usize>,
        columns: &ColumnSelector,
        dest: &mut [T],
    ) -> RowsiftResult<()> {
        let width = check_read_range(
            self.len,
            self.layout.ndim,
            self.layout.row_width,
            &rows,
            columns,
            dest.len(),
        )?;
        if rows.is_empty() {
            return Ok(());
        }

        let row_bytes = self.row_bytes();
        let offset = self.layout.header_bytes + (rows.start * row_bytes) as u64;

        log::trace!(
            "Reading rows {}..{} ({} bytes at offset {})",
            rows.start,
            rows.end,
            rows.len() * row_bytes,
            offset
        );

        if columns.selects_all(self.layout.ndim, self.layout.row_width) {
            self.file
                .read_exact_at(bytemuck::cast_slice_mut(&mut *dest), offset)?;
            le_to_native(dest);
            return Ok(());
        }

        // Column subsets go through a scratch block of whole rows, bounded in size.
        let value_bytes = T::PTYPE.byte_width();
        let block_rows = (SCRATCH_BYTES / row_bytes).clamp(1, rows.len());
        let mut raw = vec![0u8; block_rows * row_bytes];
        for (block, dest_block) in dest.chunks_mut(block_rows * width).enumerate() {
            let block_len = dest_block.len() / width;
            let raw = &mut raw[..block_len * row_bytes];
            self.file
                .read_exact_at(raw, offset + (block * block_rows * row_bytes) as u64)?;

            for (src_row, dest_row) in raw
                .chunks_exact(row_bytes)
                .zip(dest_block.chunks_exact_mut(width))
            {
                for (slot, col) in dest_row
                    .iter_mut()
                    .zip(columns.columns_for(self.layout.ndim, self.layout.row_width))
                {
                    *slot = T::from_le_slice(&src_row[col * value_bytes..(col + 1) * value_bytes]);
                }
            }
        }
        Ok(())
    }

    fn max_concurrent_reads(&self) -> usize {
        self.layout.max_concurrent_reads
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rowsift_error::ErrorKind;
    use tempfile::NamedTempFile;

    use super::*;

    fn write_values(values: &[u32], header: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(header).unwrap();
        for v in values {
            file.write_all(&v.to_le_bytes()).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn read_one_dimensional_file() {
        let values: Vec<u32> = (100..120).collect();
        let file = write_values(&values, &[]);
        let store =
            FileStore::<u32>::open(file.path(), FileLayout::one_dimensional().with_chunk_size(5))
                .unwrap();

        assert_eq!(store.len(), 20);
        assert_eq!(store.chunk_size(), Some(5));

        let mut dest = vec![0u32; 4];
        store.read_range(3..7, &ColumnSelector::All, &mut dest).unwrap();
        assert_eq!(dest, vec![103, 104, 105, 106]);
    }

    #[test]
    fn read_columns_after_header() {
        let values: Vec<u32> = (0..12).collect();
        let file = write_values(&values, b"HEAD");
        let store = FileStore::<u32>::open(
            file.path(),
            FileLayout::two_dimensional(3).with_header_bytes(4),
        )
        .unwrap();

        assert_eq!(store.len(), 4);
        let mut dest = vec![0u32; 2];
        store
            .read_range(2..4, &ColumnSelector::Range(1..2), &mut dest)
            .unwrap();
        assert_eq!(dest, vec![7, 10]);
    }

    #[test]
    fn whole_rows_fill_destination_directly() {
        let mut file = NamedTempFile::new().unwrap();
        for v in 0..64u32 {
            file.write_all(&(f64::from(v) * 0.5).to_le_bytes()).unwrap();
        }
        file.flush().unwrap();
        let store = FileStore::<f64>::open(file.path(), FileLayout::two_dimensional(4)).unwrap();

        let mut dest = vec![0f64; 8];
        store.read_range(14..16, &ColumnSelector::All, &mut dest).unwrap();
        assert_eq!(dest, (56..64).map(|v| f64::from(v) * 0.5).collect::<Vec<_>>());
    }

    #[test]
    fn column_subset_across_scratch_blocks() {
        // Rows of 8 bytes, so the read spans several scratch blocks.
        let rows = 3 * SCRATCH_BYTES / 8 + 17;
        let values = (0u32..).take(2 * rows).collect::<Vec<_>>();
        let file = write_values(&values, &[]);
        let store = FileStore::<u32>::open(file.path(), FileLayout::two_dimensional(2)).unwrap();

        let mut dest = vec![0u32; rows - 1];
        store
            .read_range(1..rows, &ColumnSelector::Indices(vec![1]), &mut dest)
            .unwrap();
        assert!(
            dest.iter()
                .zip((1u32..).map(|row| 2 * row + 1))
                .all(|(&v, expected)| v == expected)
        );
    }

    #[test]
    fn ragged_file_is_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 7]).unwrap();
        file.flush().unwrap();

        let err = FileStore::<u32>::open(file.path(), FileLayout::one_dimensional()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn clones_share_the_descriptor() {
        let file = write_values(&[1, 2, 3], &[]);
        let store = FileStore::<u32>::open(file.path(), FileLayout::one_dimensional()).unwrap();
        let cloned = store.clone();
        drop(store);

        let mut dest = vec![0u32; 1];
        cloned.read_range(2..3, &ColumnSelector::All, &mut dest).unwrap();
        assert_eq!(dest, vec![3]);
    }
}
