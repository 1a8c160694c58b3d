use crate::error::{RegistrarError, Result};

/// Immutable description of a metric: name, help text, ordered label names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDescriptor {
    name: String,
    help: String,
    label_names: Vec<String>,
    max_label_sets: Option<usize>,
    overflow: Option<(usize, String)>,
}

/// Label values ordered by the descriptor's label names.
///
/// This is the canonical key of one aggregate cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LabelValues(Vec<String>);

impl LabelValues {
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl MetricDescriptor {
    /// Build and validate a descriptor.
    pub fn new(name: &str, help: &str, label_names: &[&str]) -> Result<Self> {
        let desc = Self {
            name: name.to_string(),
            help: help.to_string(),
            label_names: label_names.iter().map(|l| l.to_string()).collect(),
            max_label_sets: None,
            overflow: None,
        };
        desc.validate()?;
        Ok(desc)
    }

    /// Cap the number of distinct label sets this metric may hold.
    pub fn with_max_label_sets(mut self, limit: usize) -> Self {
        self.max_label_sets = Some(limit.max(1));
        self
    }

    /// Once the cap is reached, fold new label sets into the cell where
    /// `label` is replaced by `value` instead of refusing them.
    ///
    /// Overflow cells are created even past the cap, so their count is bounded
    /// by the combinations of the remaining labels.
    pub fn with_overflow(mut self, label: &str, value: &str) -> Result<Self> {
        let Some(idx) = self.label_names.iter().position(|l| l == label) else {
            return Err(self.invalid(&format!("overflow label is not declared: {label}")));
        };
        self.overflow = Some((idx, value.to_string()));
        Ok(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    pub fn max_label_sets(&self) -> Option<usize> {
        self.max_label_sets
    }

    /// The cell key a capped-out label set folds into, if overflow is set.
    pub(crate) fn overflow_key(&self, key: &LabelValues) -> Option<LabelValues> {
        let (idx, value) = self.overflow.as_ref()?;
        let mut values = key.0.clone();
        values[*idx] = value.clone();
        Some(LabelValues(values))
    }

    fn validate(&self) -> Result<()> {
        if !valid_metric_name(&self.name) {
            return Err(self.invalid("name must match [a-zA-Z_:][a-zA-Z0-9_:]*"));
        }
        for (i, label) in self.label_names.iter().enumerate() {
            if !valid_label_name(label) {
                return Err(self.invalid(&format!("invalid label name: {label}")));
            }
            if label.starts_with("__") {
                return Err(self.invalid(&format!("label name is reserved: {label}")));
            }
            if self.label_names[..i].contains(label) {
                return Err(self.invalid(&format!("duplicate label name: {label}")));
            }
        }
        Ok(())
    }

    pub(crate) fn invalid(&self, reason: &str) -> RegistrarError {
        RegistrarError::InvalidMetric {
            metric: self.name.clone(),
            reason: reason.to_string(),
        }
    }

    /// Canonicalize a label set against this descriptor.
    ///
    /// The pairs may come in any order but must name exactly the declared labels.
    pub fn label_values(&self, labels: &[(&str, &str)]) -> Result<LabelValues> {
        if labels.len() != self.label_names.len() {
            return Err(self.mismatch(format!(
                "expected {} labels, got {}",
                self.label_names.len(),
                labels.len()
            )));
        }
        let mut values = Vec::with_capacity(self.label_names.len());
        for name in &self.label_names {
            let mut hits = labels.iter().filter(|(k, _)| *k == name.as_str());
            let Some((_, v)) = hits.next() else {
                return Err(self.mismatch(format!("missing label: {name}")));
            };
            if hits.next().is_some() {
                return Err(self.mismatch(format!("label given twice: {name}")));
            }
            values.push((*v).to_string());
        }
        Ok(LabelValues(values))
    }

    fn mismatch(&self, reason: String) -> RegistrarError {
        RegistrarError::LabelMismatch {
            metric: self.name.clone(),
            reason,
        }
    }
}

fn valid_metric_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn valid_label_name(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
