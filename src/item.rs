//! Knapsack items and the pairwise dominance relation.
//!
//! An item carries two identities:
//! - an [`InstanceKey`] (its [`ItemId`]), unique per constructed item even when
//!   value and weight repeat. Dominance bookkeeping and committed paths use it.
//! - a [`StructuralKey`] (value, weight), ordered by density then value. Node
//!   keys use it for the remaining-item multiset so convergent branches merge,
//!   and reports use it to fold duplicates together.

use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::error::{ModelError, Result};

static NEXT_ITEM_ID: AtomicU64 = AtomicU64::new(0);

/// Sequence-assigned item identity, never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(u64);

impl ItemId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Identity used for dominance and graph merging semantics.
pub type InstanceKey = ItemId;

/// Content identity of an item.
///
/// Ordered by density (compared exactly by cross-multiplication), then value,
/// then weight, which makes the order total over distinct (value, weight)
/// pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StructuralKey {
    pub value: u64,
    pub weight: u64,
}

impl Ord for StructuralKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = u128::from(self.value) * u128::from(other.weight);
        let rhs = u128::from(other.value) * u128::from(self.weight);
        lhs.cmp(&rhs)
            .then(self.value.cmp(&other.value))
            .then(self.weight.cmp(&other.weight))
    }
}

impl PartialOrd for StructuralKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A candidate item with a cached set of dominating identities.
#[derive(Debug, Clone)]
pub struct Item {
    value: u64,
    weight: u64,
    density: f64,
    id: ItemId,
    dominators: Option<BTreeSet<ItemId>>,
}

impl Item {
    /// Create an item and assign it the next sequence id.
    pub fn new(value: u64, weight: u64) -> Result<Self> {
        if weight == 0 {
            return Err(ModelError::InvalidWeight(0));
        }
        let id = ItemId(NEXT_ITEM_ID.fetch_add(1, AtomicOrdering::Relaxed));
        Ok(Self {
            value,
            weight,
            density: value as f64 / weight as f64,
            id,
            dominators: None,
        })
    }

    /// Create an item from signed input, rejecting negative values and
    /// non-positive weights.
    pub fn from_signed(value: i64, weight: i64) -> Result<Self> {
        if value < 0 {
            return Err(ModelError::NegativeValue(value));
        }
        if weight <= 0 {
            return Err(ModelError::InvalidWeight(weight));
        }
        Self::new(value as u64, weight as u64)
    }

    /// Create items in order from parallel value and weight slices.
    pub fn from_lists(values: &[i64], weights: &[i64]) -> Result<Vec<Self>> {
        if values.len() != weights.len() {
            return Err(ModelError::LengthMismatch {
                values: values.len(),
                weights: weights.len(),
            });
        }
        values
            .iter()
            .zip(weights)
            .map(|(&v, &w)| Self::from_signed(v, w))
            .collect()
    }

    /// Create items in order from (value, weight) pairs.
    pub fn from_pairs(pairs: &[(u64, u64)]) -> Result<Vec<Self>> {
        pairs.iter().map(|&(v, w)| Self::new(v, w)).collect()
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn weight(&self) -> u64 {
        self.weight
    }

    pub fn density(&self) -> f64 {
        self.density
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn instance_key(&self) -> InstanceKey {
        self.id
    }

    pub fn structural_key(&self) -> StructuralKey {
        StructuralKey {
            value: self.value,
            weight: self.weight,
        }
    }

    /// Whether `self` dominates `other`.
    ///
    /// Strictly better in one of value or weight and no worse in the other.
    /// Exact duplicates are ordered by sequence id: the earlier item dominates.
    pub fn dominates(&self, other: &Item) -> bool {
        (self.value > other.value && self.weight <= other.weight)
            || (self.value >= other.value && self.weight < other.weight)
            || (self.value == other.value
                && self.weight == other.weight
                && self.id < other.id)
    }

    /// Record which of `candidates` dominate this item.
    ///
    /// Replaces any previously cached set.
    pub fn set_dominance<'a, I>(&mut self, candidates: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Item>,
    {
        let mut dominators = BTreeSet::new();
        for candidate in candidates {
            if candidate.id == self.id {
                return Err(ModelError::SelfDominance(self.id));
            }
            if candidate.dominates(self) {
                dominators.insert(candidate.id);
            }
        }
        self.dominators = Some(dominators);
        Ok(())
    }

    /// Whether any of `candidates` was recorded as dominating this item.
    pub fn check_dominance<I>(&self, candidates: I) -> Result<bool>
    where
        I: IntoIterator<Item = ItemId>,
    {
        let dominators = self
            .dominators
            .as_ref()
            .ok_or(ModelError::DominanceNotSet(self.id))?;
        Ok(candidates.into_iter().any(|id| dominators.contains(&id)))
    }

    pub fn is_dominance_set(&self) -> bool {
        self.dominators.is_some()
    }

    pub fn dominators(&self) -> Option<&BTreeSet<ItemId>> {
        self.dominators.as_ref()
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(v: {}, w: {})", self.value, self.weight)
    }
}

/// Items owned by a search graph, addressed by id.
#[derive(Debug, Default, Clone)]
pub struct ItemTable {
    items: HashMap<ItemId, Item>,
}

impl ItemTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) an item, returning its id.
    pub fn insert(&mut self, item: Item) -> ItemId {
        let id = item.id;
        self.items.insert(id, item);
        id
    }

    pub fn get(&self, id: ItemId) -> Result<&Item> {
        self.items.get(&id).ok_or(ModelError::UnknownItem(id))
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Establish dominance for each of `ids` against all the others.
    pub fn set_dominance_among(&mut self, ids: &[ItemId]) -> Result<()> {
        let mut snapshot = Vec::with_capacity(ids.len());
        for &id in ids {
            snapshot.push(self.get(id)?.clone());
        }
        for (i, &id) in ids.iter().enumerate() {
            let others = snapshot
                .iter()
                .enumerate()
                .filter(|&(j, _)| j != i)
                .map(|(_, item)| item);
            if let Some(item) = self.items.get_mut(&id) {
                item.set_dominance(others)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_and_negative_weight() {
        assert_eq!(Item::new(3, 0).unwrap_err(), ModelError::InvalidWeight(0));
        assert_eq!(
            Item::from_signed(3, -2).unwrap_err(),
            ModelError::InvalidWeight(-2)
        );
        assert_eq!(
            Item::from_signed(-1, 2).unwrap_err(),
            ModelError::NegativeValue(-1)
        );
    }

    #[test]
    fn ids_are_unique_for_duplicates() {
        let a = Item::new(5, 5).unwrap();
        let b = Item::new(5, 5).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(a.structural_key(), b.structural_key());
        assert!(a.id() < b.id());
    }

    #[test]
    fn from_lists_checks_lengths() {
        let err = Item::from_lists(&[1, 2], &[3]).unwrap_err();
        assert_eq!(
            err,
            ModelError::LengthMismatch {
                values: 2,
                weights: 1
            }
        );
        let items = Item::from_lists(&[1, 2], &[3, 4]).unwrap();
        assert_eq!(items[1].value(), 2);
        assert_eq!(items[1].weight(), 4);
    }

    #[test]
    fn structural_order_is_density_then_value() {
        let low = StructuralKey { value: 1, weight: 2 };
        let high = StructuralKey { value: 3, weight: 2 };
        let same_density_bigger = StructuralKey { value: 2, weight: 4 };
        assert!(low < high);
        assert!(low < same_density_bigger);
        assert_eq!(low.cmp(&low), Ordering::Equal);
    }

    #[test]
    fn dominance_relation() {
        let a = Item::new(10, 5).unwrap();
        let b = Item::new(8, 5).unwrap();
        let c = Item::new(10, 7).unwrap();
        let d = Item::new(12, 9).unwrap();
        assert!(a.dominates(&b));
        assert!(a.dominates(&c));
        assert!(!a.dominates(&d));
        assert!(!d.dominates(&a));
        assert!(!b.dominates(&a));
    }

    #[test]
    fn earlier_duplicate_dominates_later() {
        let first = Item::new(4, 4).unwrap();
        let second = Item::new(4, 4).unwrap();
        assert!(first.dominates(&second));
        assert!(!second.dominates(&first));
    }

    #[test]
    fn check_before_set_is_an_error() {
        let a = Item::new(1, 1).unwrap();
        let b = Item::new(2, 1).unwrap();
        assert_eq!(
            a.check_dominance([b.id()]).unwrap_err(),
            ModelError::DominanceNotSet(a.id())
        );
    }

    #[test]
    fn set_then_check() {
        let mut a = Item::new(1, 2).unwrap();
        let b = Item::new(2, 1).unwrap();
        let c = Item::new(0, 5).unwrap();
        a.set_dominance([&b, &c]).unwrap();
        assert!(a.check_dominance([b.id()]).unwrap());
        assert!(!a.check_dominance([c.id()]).unwrap());
        assert!(!a.check_dominance(std::iter::empty::<ItemId>()).unwrap());
    }

    #[test]
    fn self_dominance_is_rejected() {
        let mut a = Item::new(1, 2).unwrap();
        let copy = a.clone();
        assert_eq!(
            a.set_dominance([&copy]).unwrap_err(),
            ModelError::SelfDominance(a.id())
        );
        assert!(!a.is_dominance_set());
    }

    #[test]
    fn table_sets_dominance_among_members() {
        let mut table = ItemTable::new();
        let ids: Vec<ItemId> = Item::from_pairs(&[(10, 5), (8, 5), (3, 1)])
            .unwrap()
            .into_iter()
            .map(|item| table.insert(item))
            .collect();
        table.set_dominance_among(&ids).unwrap();
        let weaker = table.get(ids[1]).unwrap();
        assert!(weaker.check_dominance([ids[0]]).unwrap());
        assert!(!weaker.check_dominance([ids[2]]).unwrap());
        assert!(!table.get(ids[0]).unwrap().check_dominance(ids.clone()).unwrap());
    }

    #[test]
    fn display_matches_report_format() {
        let item = Item::new(12, 7).unwrap();
        assert_eq!(item.to_string(), "(v: 12, w: 7)");
    }
}
