#![deny(missing_docs)]
//! Metrics for rowsift reads.
//!
//! Stores and readers record how many I/O calls they issue and how many rows they move, so the
//! benefit of coalescing can be observed from the outside.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::Arc;

use witchcraft_metrics::{Metric, MetricRegistry, Metrics, MetricsIter};
// re-export exposed metric types
pub use witchcraft_metrics::{Counter, Histogram, MetricId};

/// A cheaply cloneable handle on a metric registry.
///
/// Clones share the same underlying registry, so a handle given to a store and another given
/// to a reader record into the same place.
#[derive(Default, Clone)]
pub struct RowsiftMetrics {
    registry: Arc<MetricRegistry>,
    default_tags: Arc<DefaultTags>,
}

/// Tags applied to every metric read out of a [`RowsiftMetrics`] snapshot.
#[derive(Default, Clone)]
pub struct DefaultTags(BTreeMap<Cow<'static, str>, Cow<'static, str>>);

impl<K, V> From<&[(K, V)]> for DefaultTags
where
    K: Clone + Into<Cow<'static, str>>,
    V: Clone + Into<Cow<'static, str>>,
{
    fn from(pairs: &[(K, V)]) -> Self {
        DefaultTags(
            pairs
                .iter()
                .map(|(k, v)| (k.clone().into(), v.clone().into()))
                .collect(),
        )
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for DefaultTags
where
    K: Into<Cow<'static, str>>,
    V: Into<Cow<'static, str>>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        DefaultTags(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl RowsiftMetrics {
    /// Create an empty metric registry with default tags.
    pub fn default_with_tags(default_tags: impl Into<DefaultTags>) -> Self {
        Self {
            registry: Arc::default(),
            default_tags: Arc::new(default_tags.into()),
        }
    }

    /// A handle on the same registry whose snapshots carry the additional tags.
    ///
    /// Tags present on both sides take the value from `additional_tags`.
    pub fn child_with_tags(&self, additional_tags: impl Into<DefaultTags>) -> Self {
        let mut tags = self.default_tags.0.clone();
        tags.extend(additional_tags.into().0);
        Self {
            registry: self.registry.clone(),
            default_tags: Arc::new(DefaultTags(tags)),
        }
    }

    /// Returns the counter with the specified ID, creating a default instance if absent.
    ///
    /// # Panics
    ///
    /// Panics if a metric is registered with the ID that is not a counter.
    pub fn counter<T>(&self, id: T) -> Arc<Counter>
    where
        T: Into<MetricId>,
    {
        self.registry.counter(id)
    }

    /// Returns the histogram with the specified ID, creating a default instance if absent.
    ///
    /// # Panics
    ///
    /// Panics if a metric is registered with the ID that is not a histogram.
    pub fn histogram<T>(&self, id: T) -> Arc<Histogram>
    where
        T: Into<MetricId>,
    {
        self.registry.histogram(id)
    }

    /// Returns a snapshot of the metrics in the registry.
    ///
    /// Modifications to the registry after this method is called will not affect the state of
    /// the returned [`MetricsSnapshot`].
    pub fn metrics(&self) -> MetricsSnapshot<'_> {
        MetricsSnapshot {
            snapshot: self.registry.metrics(),
            default_tags: &self.default_tags,
        }
    }
}

/// A snapshot of the metrics in a registry with default tags.
pub struct MetricsSnapshot<'a> {
    snapshot: Metrics,
    default_tags: &'a DefaultTags,
}

impl MetricsSnapshot<'_> {
    /// Create an iterator over the metrics snapshot.
    pub fn iter(&self) -> RowsiftMetricsIter<'_> {
        RowsiftMetricsIter {
            iter: self.snapshot.iter(),
            default_tags: self.default_tags,
        }
    }

    /// The current value of every counter in the snapshot whose name is `name`, summed across
    /// tag sets.
    pub fn counter_total(&self, name: &str) -> i64 {
        self.snapshot
            .iter()
            .filter(|(id, _)| id.name() == name)
            .filter_map(|(_, metric)| match metric {
                Metric::Counter(counter) => Some(counter.count()),
                _ => None,
            })
            .sum()
    }
}

/// Metrics Iterator that applies the default tags to each metric in the inner iterator.
pub struct RowsiftMetricsIter<'a> {
    iter: MetricsIter<'a>,
    default_tags: &'a DefaultTags,
}

impl<'a> Iterator for RowsiftMetricsIter<'a> {
    type Item = (MetricId, &'a Metric);

    #[inline]
    fn next(&mut self) -> Option<(MetricId, &'a Metric)> {
        self.iter.next().map(|(k, v)| {
            let mut metric_id = k.clone();
            for (tag_key, tag_value) in self.default_tags.0.iter() {
                metric_id = metric_id.with_tag(tag_key.clone(), tag_value.clone())
            }

            (metric_id, v)
        })
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        self.iter.size_hint()
    }
}
