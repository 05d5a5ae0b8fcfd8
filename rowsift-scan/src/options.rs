use std::fmt::{Display, Formatter};

use rowsift_error::{RowsiftResult, rowsift_bail};

/// Gathers of fewer rows than this run on the calling thread.
pub const DEFAULT_PARALLEL_GATHER_THRESHOLD: usize = 1 << 16;

/// How an [`IndexedReader`](crate::IndexedReader) turns compressed ranges into store reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ReadStrategy {
    /// Coalesce when the store is chunked and coalescing saves at least one read.
    #[default]
    Auto,
    /// Read every compressed range as-is.
    Direct,
    /// Always read whole chunks and gather the selected rows out of them.
    Coalesced,
}

impl Display for ReadStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ReadStrategy::Auto => write!(f, "auto"),
            ReadStrategy::Direct => write!(f, "direct"),
            ReadStrategy::Coalesced => write!(f, "coalesced"),
        }
    }
}

/// Options controlling how selected rows are read.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReadOptions {
    /// Upper bound on the threads used for bulk reads and the final gather.
    workers: usize,
    strategy: ReadStrategy,
    parallel_gather_threshold: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            workers: 1,
            strategy: ReadStrategy::Auto,
            parallel_gather_threshold: DEFAULT_PARALLEL_GATHER_THRESHOLD,
        }
    }
}

impl ReadOptions {
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_strategy(mut self, strategy: ReadStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_parallel_gather_threshold(mut self, threshold: usize) -> Self {
        self.parallel_gather_threshold = threshold;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn strategy(&self) -> ReadStrategy {
        self.strategy
    }

    pub fn parallel_gather_threshold(&self) -> usize {
        self.parallel_gather_threshold
    }

    pub fn validate(&self) -> RowsiftResult<()> {
        if self.workers == 0 {
            rowsift_bail!("Worker count must be at least 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = ReadOptions::default();
        assert_eq!(options.workers(), 1);
        assert_eq!(options.strategy(), ReadStrategy::Auto);
        assert_eq!(options.parallel_gather_threshold(), 65536);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn zero_workers_is_invalid() {
        assert!(ReadOptions::default().with_workers(0).validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn deserialize_partial_options() {
        let options: ReadOptions =
            serde_json::from_str(r#"{"workers": 4, "strategy": "coalesced"}"#).unwrap();
        assert_eq!(
            options,
            ReadOptions::default()
                .with_workers(4)
                .with_strategy(ReadStrategy::Coalesced)
        );

        let json = serde_json::to_string(&options).unwrap();
        assert_eq!(serde_json::from_str::<ReadOptions>(&json).unwrap(), options);
    }
}
