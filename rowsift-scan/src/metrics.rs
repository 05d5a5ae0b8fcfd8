use std::ops::Range;
use std::sync::Arc;

use rowsift_metrics::{Counter, Histogram, MetricId, RowsiftMetrics};

/// Which pipeline served a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadKind {
    /// One read per compressed range.
    Direct,
    /// One read per chunk-aligned range, followed by a gather.
    Coalesced,
}

impl ReadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadKind::Direct => "direct",
            ReadKind::Coalesced => "coalesced",
        }
    }
}

/// Per-query counters recorded by an [`IndexedReader`](crate::IndexedReader).
///
/// `rowsift.scan.rows.read` includes the padding rows of coalesced reads, so comparing it to
/// `rowsift.scan.rows.requested` shows how much transfer coalescing wastes.
#[derive(Clone)]
pub struct ScanMetrics {
    reads_direct: Arc<Counter>,
    reads_coalesced: Arc<Counter>,
    rows_requested: Arc<Counter>,
    rows_read: Arc<Counter>,
    read_rows: Arc<Histogram>,
}

impl From<&RowsiftMetrics> for ScanMetrics {
    fn from(metrics: &RowsiftMetrics) -> Self {
        let reads = MetricId::new("rowsift.scan.reads");
        Self {
            reads_direct: metrics.counter(reads.clone().with_tag("kind", ReadKind::Direct.as_str())),
            reads_coalesced: metrics.counter(reads.with_tag("kind", ReadKind::Coalesced.as_str())),
            rows_requested: metrics.counter("rowsift.scan.rows.requested"),
            rows_read: metrics.counter("rowsift.scan.rows.read"),
            read_rows: metrics.histogram("rowsift.scan.read.rows"),
        }
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::from(&RowsiftMetrics::default())
    }
}

impl ScanMetrics {
    /// Record the reads issued to serve `requested` selected rows.
    pub fn record(&self, kind: ReadKind, requested: usize, reads: &[Range<usize>]) {
        let counter = match kind {
            ReadKind::Direct => &self.reads_direct,
            ReadKind::Coalesced => &self.reads_coalesced,
        };
        if let Ok(count) = reads.len().try_into() {
            counter.add(count);
        }
        if let Ok(requested) = requested.try_into() {
            self.rows_requested.add(requested);
        }

        let mut total = 0i64;
        for range in reads {
            if let Ok(rows) = i64::try_from(range.len()) {
                self.read_rows.update(rows);
                total += rows;
            }
        }
        self.rows_read.add(total);
    }
}
