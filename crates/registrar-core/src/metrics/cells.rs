use dashmap::DashMap;

use super::descriptor::{LabelValues, MetricDescriptor};
use crate::error::{RegistrarError, Result};

/// Label-keyed cell storage shared by every metric type.
pub(crate) struct Cells<T> {
    map: DashMap<LabelValues, T>,
}

impl<T> Default for Cells<T> {
    fn default() -> Self {
        Self {
            map: DashMap::new(),
        }
    }
}

impl<T> Cells<T> {
    /// Run `f` on the cell for `labels`, creating it with `init` if absent.
    ///
    /// Once the descriptor's label-set cap is reached, a new label set goes to
    /// the descriptor's overflow cell, or is refused when none is configured.
    /// The cap check is best-effort under concurrent inserts.
    pub(crate) fn with_cell<R>(
        &self,
        desc: &MetricDescriptor,
        labels: &[(&str, &str)],
        init: impl FnOnce() -> T,
        f: impl FnOnce(&T) -> R,
    ) -> Result<R> {
        let key = desc.label_values(labels)?;
        if let Some(cell) = self.map.get(&key) {
            return Ok(f(cell.value()));
        }
        if let Some(limit) = desc.max_label_sets() {
            if self.map.len() >= limit {
                let Some(folded) = desc.overflow_key(&key) else {
                    return Err(RegistrarError::CardinalityExceeded {
                        metric: desc.name().to_string(),
                        limit,
                    });
                };
                let cell = self.map.entry(folded).or_insert_with(init);
                return Ok(f(cell.value()));
            }
        }
        let cell = self.map.entry(key).or_insert_with(init);
        Ok(f(cell.value()))
    }

    /// Read one cell without creating it.
    pub(crate) fn read<R>(
        &self,
        desc: &MetricDescriptor,
        labels: &[(&str, &str)],
        f: impl FnOnce(&T) -> R,
    ) -> Result<Option<R>> {
        let key = desc.label_values(labels)?;
        Ok(self.map.get(&key).map(|cell| f(cell.value())))
    }

    /// Read every cell, sorted by label values for deterministic output.
    pub(crate) fn snapshot<R>(&self, f: impl Fn(&T) -> R) -> Vec<(LabelValues, R)> {
        let mut rows: Vec<(LabelValues, R)> = self
            .map
            .iter()
            .map(|r| (r.key().clone(), f(r.value())))
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0));
        rows
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }
}
