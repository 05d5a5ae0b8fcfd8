use std::sync::Arc;

use rayon::{ThreadPool, ThreadPoolBuilder};
use rowsift_error::{RowsiftResult, rowsift_err};
use rowsift_io::{ColumnSelector, NativeValue, RowBuffer, RowStore};
use rowsift_mask::Mask;
use rowsift_metrics::RowsiftMetrics;

use crate::{
    AlignedRanges, BulkReader, ChunkGrid, RangeExtractor, RangeSet, ReadKind, ReadOptions,
    ReadStrategy, RowSelector, ScanMetrics, align,
};

/// The reads chosen to serve one selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadPlan {
    /// Read every compressed range as-is.
    Direct { ranges: RangeSet },
    /// Read whole chunks, then extract the compressed ranges from them.
    Coalesced {
        ranges: RangeSet,
        aligned: AlignedRanges,
    },
}

impl ReadPlan {
    pub fn kind(&self) -> ReadKind {
        match self {
            ReadPlan::Direct { .. } => ReadKind::Direct,
            ReadPlan::Coalesced { .. } => ReadKind::Coalesced,
        }
    }

    /// The compressed ranges of the selection.
    pub fn ranges(&self) -> &RangeSet {
        match self {
            ReadPlan::Direct { ranges } | ReadPlan::Coalesced { ranges, .. } => ranges,
        }
    }

    /// The ranges actually issued to the store, one read each.
    pub fn reads(&self) -> &RangeSet {
        match self {
            ReadPlan::Direct { ranges } => ranges,
            ReadPlan::Coalesced { aligned, .. } => aligned.ranges(),
        }
    }
}

/// Reads a sparse selection of rows out of a [`RowStore`].
///
/// A selection is compressed into contiguous ranges, which are then either read one by one or,
/// when the store is chunked, widened to whole chunks so that neighbouring ranges share a single
/// read. Either way the rows come back in selection order.
///
/// Readers hold no per-query state and may be shared between threads.
#[derive(Clone)]
pub struct IndexedReader {
    options: ReadOptions,
    pool: Option<Arc<ThreadPool>>,
    metrics: ScanMetrics,
}

impl IndexedReader {
    /// Create a reader, starting a dedicated thread pool if more than one worker is requested.
    pub fn new(options: ReadOptions) -> RowsiftResult<Self> {
        options.validate()?;
        let pool = if options.workers() > 1 {
            let pool = ThreadPoolBuilder::new()
                .num_threads(options.workers())
                .thread_name(|idx| format!("rowsift-read-{idx}"))
                .build()
                .map_err(|err| rowsift_err!("Failed to start read thread pool: {}", err))?;
            Some(Arc::new(pool))
        } else {
            None
        };
        Ok(Self {
            options,
            pool,
            metrics: ScanMetrics::default(),
        })
    }

    /// Record scan metrics into `metrics`.
    pub fn with_metrics(mut self, metrics: &RowsiftMetrics) -> Self {
        self.metrics = ScanMetrics::from(metrics);
        self
    }

    pub fn options(&self) -> &ReadOptions {
        &self.options
    }

    /// Read the selected rows of `store`, restricted to `columns`, in selection order.
    ///
    /// The selection may be raw row indices, a validated [`Selection`](crate::Selection), or a
    /// [`Mask`] over every row of the store. Malformed selections and out-of-range rows are
    /// rejected before any read is issued.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all))]
    pub fn read_selected<'a, T: NativeValue, S: RowStore<T> + ?Sized>(
        &self,
        store: &S,
        selector: impl Into<RowSelector<'a>>,
        columns: &ColumnSelector,
    ) -> RowsiftResult<RowBuffer<T>> {
        let ranges = selector.into().to_ranges(store.len())?;
        let plan = self.plan(store, ranges)?;
        self.execute(store, &plan, columns)
    }

    /// Read every column of the rows of `store` where `mask` is true.
    pub fn index_dataset<T: NativeValue, S: RowStore<T> + ?Sized>(
        &self,
        store: &S,
        mask: &Mask,
    ) -> RowsiftResult<RowBuffer<T>> {
        self.read_selected(store, mask, &ColumnSelector::All)
    }

    /// Decide how to read `ranges` from `store`.
    pub fn plan<T: NativeValue, S: RowStore<T> + ?Sized>(
        &self,
        store: &S,
        ranges: RangeSet,
    ) -> RowsiftResult<ReadPlan> {
        let grid = match (self.options.strategy(), ChunkGrid::for_store::<T, S>(store)) {
            (ReadStrategy::Direct, _) => return Ok(ReadPlan::Direct { ranges }),
            (strategy, None) => {
                if strategy == ReadStrategy::Coalesced {
                    log::debug!("Store is not chunked, reading {} ranges directly", ranges.len());
                }
                return Ok(ReadPlan::Direct { ranges });
            }
            (_, Some(grid)) => grid,
        };

        let aligned = align(&ranges, &grid)?;
        if self.options.strategy() == ReadStrategy::Auto && aligned.len() >= ranges.len() {
            log::debug!(
                "Coalescing {} ranges to chunks of {} rows saves no reads, reading directly",
                ranges.len(),
                grid.chunk_size()
            );
            return Ok(ReadPlan::Direct { ranges });
        }
        Ok(ReadPlan::Coalesced { ranges, aligned })
    }

    /// Read every range of `ranges` as-is.
    pub fn read_direct<T: NativeValue, S: RowStore<T> + ?Sized>(
        &self,
        store: &S,
        ranges: &RangeSet,
        columns: &ColumnSelector,
    ) -> RowsiftResult<RowBuffer<T>> {
        let buffer = self.bulk().read(store, ranges, columns)?;
        self.metrics
            .record(ReadKind::Direct, ranges.row_count(), ranges);
        Ok(buffer)
    }

    /// Read the chunks of `grid` covering `ranges` and extract `ranges` from them.
    pub fn read_coalesced<T: NativeValue, S: RowStore<T> + ?Sized>(
        &self,
        store: &S,
        ranges: &RangeSet,
        grid: &ChunkGrid,
        columns: &ColumnSelector,
    ) -> RowsiftResult<RowBuffer<T>> {
        let aligned = align(ranges, grid)?;
        self.read_aligned(store, ranges, &aligned, columns)
    }

    fn execute<T: NativeValue, S: RowStore<T> + ?Sized>(
        &self,
        store: &S,
        plan: &ReadPlan,
        columns: &ColumnSelector,
    ) -> RowsiftResult<RowBuffer<T>> {
        match plan {
            ReadPlan::Direct { ranges } => {
                log::debug!(
                    "Reading {} rows directly in {} reads",
                    ranges.row_count(),
                    ranges.len()
                );
                self.read_direct(store, ranges, columns)
            }
            ReadPlan::Coalesced { ranges, aligned } => {
                log::debug!(
                    "Reading {} rows in {} coalesced reads instead of {}, over-reading {} rows",
                    ranges.row_count(),
                    aligned.len(),
                    ranges.len(),
                    aligned.row_count() - ranges.row_count()
                );
                self.read_aligned(store, ranges, aligned, columns)
            }
        }
    }

    fn read_aligned<T: NativeValue, S: RowStore<T> + ?Sized>(
        &self,
        store: &S,
        ranges: &RangeSet,
        aligned: &AlignedRanges,
        columns: &ColumnSelector,
    ) -> RowsiftResult<RowBuffer<T>> {
        let buffer = self.bulk().read(store, aligned, columns)?;
        self.metrics
            .record(ReadKind::Coalesced, ranges.row_count(), aligned);
        self.extractor().extract(&buffer, aligned.ranges(), ranges)
    }

    fn bulk(&self) -> BulkReader<'_> {
        match &self.pool {
            Some(pool) => BulkReader::with_pool(pool, self.options.workers()),
            None => BulkReader::serial(),
        }
    }

    fn extractor(&self) -> RangeExtractor<'_> {
        match &self.pool {
            Some(pool) => RangeExtractor::with_pool(pool, self.options.parallel_gather_threshold()),
            None => RangeExtractor::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rowsift_error::ErrorKind;
    use rowsift_io::{InMemoryStore, InstrumentedStore};
    use rstest::rstest;

    use super::*;
    use crate::Selection;

    fn store(len: u32, chunk_size: usize) -> InMemoryStore<u32> {
        InMemoryStore::new((0..len).collect()).with_chunk_size(chunk_size)
    }

    #[rstest]
    #[case(ReadStrategy::Auto, ReadKind::Coalesced)]
    #[case(ReadStrategy::Coalesced, ReadKind::Coalesced)]
    #[case(ReadStrategy::Direct, ReadKind::Direct)]
    fn plan_follows_strategy(#[case] strategy: ReadStrategy, #[case] kind: ReadKind) {
        let reader = IndexedReader::new(ReadOptions::default().with_strategy(strategy)).unwrap();
        let ranges = RangeSet::try_new(vec![3..7, 12..13]).unwrap();
        let plan = reader.plan(&store(20, 5), ranges).unwrap();
        assert_eq!(plan.kind(), kind);
    }

    #[test]
    fn auto_reads_directly_when_coalescing_saves_nothing() {
        let reader = IndexedReader::new(ReadOptions::default()).unwrap();
        let ranges = RangeSet::try_new(vec![1..2, 11..12]).unwrap();
        let plan = reader.plan(&store(20, 5), ranges).unwrap();
        assert_eq!(plan.kind(), ReadKind::Direct);
        assert_eq!(plan.reads().len(), 2);
    }

    #[rstest]
    #[case(ReadStrategy::Auto)]
    #[case(ReadStrategy::Coalesced)]
    fn unchunked_store_reads_directly(#[case] strategy: ReadStrategy) {
        let reader = IndexedReader::new(ReadOptions::default().with_strategy(strategy)).unwrap();
        let store = InMemoryStore::new((0..20u32).collect());
        let plan = reader
            .plan(&store, RangeSet::try_new(vec![3..7, 12..13]).unwrap())
            .unwrap();
        assert_eq!(plan.kind(), ReadKind::Direct);
    }

    #[test]
    fn end_to_end_single_read() {
        let metrics = RowsiftMetrics::default();
        let store = InstrumentedStore::new(store(20, 5), &metrics);
        let reader = IndexedReader::new(ReadOptions::default())
            .unwrap()
            .with_metrics(&metrics);

        let rows = reader
            .read_selected(&store, &[3usize, 4, 5, 6, 12][..], &ColumnSelector::All)
            .unwrap();
        assert_eq!(rows.into_vec(), vec![3, 4, 5, 6, 12]);
        assert_eq!(store.read_count(), 1);
        assert_eq!(store.row_count(), 15);
        assert_eq!(metrics.counter("rowsift.scan.rows.requested").count(), 5);
        assert_eq!(metrics.counter("rowsift.scan.rows.read").count(), 15);
    }

    #[test]
    fn index_dataset_with_mask() {
        let store = InMemoryStore::try_new_2d((0..40u32).collect(), 2)
            .unwrap()
            .with_chunk_size(4);
        let mask = Mask::from_indices(20, &[0, 7, 14]).unwrap();
        let reader = IndexedReader::new(ReadOptions::default()).unwrap();
        let rows = reader.index_dataset(&store, &mask).unwrap();
        assert_eq!(rows.row_width(), 2);
        assert_eq!(rows.into_vec(), vec![0, 1, 14, 15, 28, 29]);
    }

    #[test]
    fn mask_length_must_match_store() {
        let reader = IndexedReader::new(ReadOptions::default()).unwrap();
        let mask = Mask::new_true(10);
        let err = reader
            .index_dataset::<u32, _>(&store(20, 5), &mask)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[rstest]
    #[case(vec![], ErrorKind::InvalidInput)]
    #[case(vec![4, 3], ErrorKind::InvalidInput)]
    #[case(vec![2, 2], ErrorKind::InvalidInput)]
    #[case(vec![5, 20], ErrorKind::InvalidInput)]
    fn invalid_selections_issue_no_reads(#[case] indices: Vec<usize>, #[case] kind: ErrorKind) {
        let metrics = RowsiftMetrics::default();
        let store = InstrumentedStore::new(store(20, 5), &metrics);
        let reader = IndexedReader::new(ReadOptions::default()).unwrap();
        let err = reader
            .read_selected::<u32, _>(&store, &indices, &ColumnSelector::All)
            .unwrap_err();
        assert_eq!(err.kind(), kind);
        assert_eq!(store.read_count(), 0);
    }

    #[test]
    fn zero_workers_rejected() {
        assert!(IndexedReader::new(ReadOptions::default().with_workers(0)).is_err());
    }

    #[test]
    fn selection_reused_across_reads() {
        let reader = IndexedReader::new(ReadOptions::default().with_workers(2)).unwrap();
        let store = store(100, 8);
        let selection = Selection::try_new(vec![0, 9, 10, 50, 99]).unwrap();
        let first = reader
            .read_selected(&store, &selection, &ColumnSelector::All)
            .unwrap();
        let second = reader
            .read_selected(&store, &selection, &ColumnSelector::All)
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(first.into_vec(), vec![0, 9, 10, 50, 99]);
    }
}
