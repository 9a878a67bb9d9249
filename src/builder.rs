use crate::analysis::Analysis;
use crate::error::{ModelError, Result};
use crate::item::Item;

/// Collects raw, possibly invalid input and validates it in [`build`](Self::build).
///
/// Capacity defaults to zero.
#[derive(Debug, Clone, Default)]
pub struct AnalysisBuilder {
    items: Vec<(i64, i64)>,
    capacity: i64,
}

impl AnalysisBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn item(mut self, value: i64, weight: i64) -> Self {
        self.items.push((value, weight));
        self
    }
    pub fn items(mut self, pairs: &[(i64, i64)]) -> Self {
        self.items.extend_from_slice(pairs);
        self
    }
    pub fn capacity(mut self, capacity: i64) -> Self {
        self.capacity = capacity;
        self
    }
    pub fn build(self) -> Result<Analysis> {
        if self.capacity < 0 {
            return Err(ModelError::NegativeCapacity(self.capacity));
        }
        let items = self
            .items
            .iter()
            .map(|&(v, w)| Item::from_signed(v, w))
            .collect::<Result<Vec<_>>>()?;
        Analysis::new(items, self.capacity as u64)
    }
}
